// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::accumulators::ChecksumStore;
use crate::chain::{ChainBackend, ChainState};
use crate::consensus::{Money, COIN};
use crate::primitives::{BlockHeader, OutPoint, Script, Transaction, TxIn, TxOut};
use crate::stake::StakeErr;
use crate::wallet::StakeWallet;
use log::*;

/// Stake backed by a plain transaction output
#[derive(Debug, Clone)]
pub struct UtxoStake {
    tx_from: Transaction,
    position: u32,
    index_from: Option<BlockHeader>,
}

impl UtxoStake {
    pub fn new(tx_from: Transaction, position: u32) -> Result<Self, StakeErr> {
        if position as usize >= tx_from.outputs.len() {
            return Err(StakeErr::InvalidPosition);
        }

        Ok(Self {
            tx_from,
            position,
            index_from: None,
        })
    }

    fn output(&self) -> &TxOut {
        &self.tx_from.outputs[self.position as usize]
    }

    #[must_use]
    pub fn value(&self) -> Money {
        self.output().value
    }

    #[must_use]
    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            txid: self.tx_from.hash(),
            index: self.position,
        }
    }

    #[must_use]
    pub fn tx_from(&self) -> &Transaction {
        &self.tx_from
    }

    /// Active chain block containing the funding transaction. Cached once found.
    pub fn index_from<B: ChainBackend, S: ChecksumStore>(
        &mut self,
        state: &ChainState<B, S>,
    ) -> Result<BlockHeader, StakeErr> {
        if let Some(header) = &self.index_from {
            return Ok(header.clone());
        }

        let txid = self.tx_from.hash();
        let Some(block_hash) = state.backend().transaction_block(&txid)? else {
            debug!("Failed to find transaction {txid:?}");
            return Err(StakeErr::TxNotFound);
        };

        if !state.backend().contains(&block_hash)? {
            return Err(StakeErr::NotInActiveChain);
        }

        let header = state
            .backend()
            .header_by_hash(&block_hash)?
            .ok_or(StakeErr::NotInActiveChain)?;
        self.index_from = Some(header.clone());
        Ok(header)
    }

    /// Kernel stake modifier: the modifier of the first block at least the
    /// stake modifier interval after the funding block
    pub fn modifier<B: ChainBackend, S: ChecksumStore>(
        &mut self,
        state: &ChainState<B, S>,
    ) -> Result<u64, StakeErr> {
        let from = self.index_from(state)?;
        let interval = state.config().stake_modifier_interval;
        let tip = state.height()?;

        for height in from.height..=tip {
            let header = state.backend().expect_header(height)?;

            if header.timestamp - from.timestamp >= interval {
                return Ok(header.stake_modifier);
            }
        }

        Err(StakeErr::ModifierNotAvailable)
    }

    /// Unique identifier of the stake, the funding outpoint
    #[must_use]
    pub fn uniqueness(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(36);
        out.extend_from_slice(&self.position.to_le_bytes());
        out.extend_from_slice(self.tx_from.hash().as_bytes());
        out
    }

    #[must_use]
    pub fn create_tx_in(&self) -> TxIn {
        TxIn::Prevout(self.outpoint())
    }

    /// Outputs paying the stake back to its owner, values left at zero for
    /// the coinstake builder. Pay to pubkey hash kernels are converted to
    /// pay to pubkey. Stakes of more than twice the split threshold get two
    /// outputs.
    pub fn create_tx_outs(
        &self,
        wallet: &dyn StakeWallet,
        total: Money,
    ) -> Result<Vec<TxOut>, StakeErr> {
        let script = match &self.output().script {
            Script::PayToPubKey(key) => Script::PayToPubKey(*key),
            Script::PayToPubKeyHash(key_hash) => {
                let key = wallet
                    .public_key(key_hash)
                    .ok_or(StakeErr::KeyNotFound)?;
                Script::PayToPubKey(key)
            }
            _ => {
                debug!("Unsupported kernel script in {:?}", self.outpoint());
                return Err(StakeErr::UnsupportedScript);
            }
        };

        let mut outputs = vec![TxOut::new(0, script.clone())];

        if total / 2 > wallet.stake_split_threshold() * COIN {
            outputs.push(TxOut::new(0, script));
        }

        Ok(outputs)
    }
}
