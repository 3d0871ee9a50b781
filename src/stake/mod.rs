// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

//! Stake inputs and coinstake construction.

mod utxo;
mod zerocoin;

pub use utxo::*;
pub use zerocoin::*;

use crate::accumulators::{AccumulatorErr, ChecksumStore, WitnessErr};
use crate::chain::{ChainBackend, ChainBackendErr, ChainErr, ChainState};
use crate::consensus::{masternode_payment, Money, STAKE_MIN_AGE};
use crate::primitives::{hash_outputs, BlockHeader, Hash256, Script, Transaction, TxOut};
use crate::wallet::{StakeWallet, WalletErr};
use log::*;

/// Kernel of a coinstake
#[derive(Debug, Clone)]
pub enum StakeInput {
    Utxo(UtxoStake),
    Zerocoin(ZerocoinStake),
}

impl StakeInput {
    #[must_use]
    pub fn value(&self) -> Money {
        match self {
            Self::Utxo(stake) => stake.value(),
            Self::Zerocoin(stake) => stake.value(),
        }
    }

    #[must_use]
    pub fn is_zerocoin(&self) -> bool {
        matches!(self, Self::Zerocoin(_))
    }

    pub fn index_from<B: ChainBackend, S: ChecksumStore>(
        &mut self,
        state: &ChainState<B, S>,
    ) -> Result<BlockHeader, StakeErr> {
        match self {
            Self::Utxo(stake) => stake.index_from(state),
            Self::Zerocoin(stake) => stake.index_from(state),
        }
    }

    pub fn modifier<B: ChainBackend, S: ChecksumStore>(
        &mut self,
        state: &ChainState<B, S>,
    ) -> Result<u64, StakeErr> {
        match self {
            Self::Utxo(stake) => stake.modifier(state),
            Self::Zerocoin(stake) => stake.modifier(state),
        }
    }

    #[must_use]
    pub fn uniqueness(&self) -> Vec<u8> {
        match self {
            Self::Utxo(stake) => stake.uniqueness(),
            Self::Zerocoin(stake) => stake.uniqueness(),
        }
    }

    pub fn mark_spent(&self, wallet: &dyn StakeWallet, txid: Hash256) -> Result<(), StakeErr> {
        match self {
            // Plain outputs are tracked by the chain, not the mint store
            Self::Utxo(_) => Ok(()),
            Self::Zerocoin(stake) => stake.mark_spent(wallet, txid),
        }
    }
}

/// Coinstake transaction together with the kernel data it was built from
#[derive(Debug, Clone)]
pub struct CoinStake {
    pub transaction: Transaction,
    pub stake_modifier: u64,
    pub index_from_height: u64,
}

/// Builds the coinstake of the block on top of the current tip.
///
/// The first output is always empty. A zerocoin kernel re-mints the staked
/// denomination and mints the staker reward, a plain kernel pays value and
/// reward back to its owner. The masternode output, if any, comes last.
///
/// Without a masternode a plain kernel keeps the whole reward, while a
/// zerocoin kernel still mints only the staker share and the masternode
/// share is forfeited.
pub fn create_coin_stake<B: ChainBackend, S: ChecksumStore>(
    state: &ChainState<B, S>,
    wallet: &dyn StakeWallet,
    input: &mut StakeInput,
    reward: Money,
    masternode: Option<Script>,
) -> Result<CoinStake, StakeErr> {
    let tip = state.tip()?;
    let height = tip.height + 1;
    let index_from = input.index_from(state)?;

    if let StakeInput::Utxo(_) = input {
        if tip.timestamp - index_from.timestamp < STAKE_MIN_AGE {
            debug!(
                "Stake from block {} is too young to stake at {height}",
                index_from.height
            );
            return Err(StakeErr::StakeTooYoung);
        }
    }

    let stake_modifier = input.modifier(state)?;
    let masternode_value = masternode
        .as_ref()
        .map_or(0, |_| masternode_payment(height, reward, input.is_zerocoin()));
    let mut outputs = vec![TxOut::empty()];

    match input {
        StakeInput::Utxo(stake) => {
            let total = stake.value() + reward - masternode_value;
            let mut outs = stake.create_tx_outs(wallet, total)?;

            if outs.len() == 2 {
                let half = total / 2;
                outs[0].value = half;
                outs[1].value = total - half;
            } else {
                outs[0].value = total;
            }

            outputs.extend(outs);
        }
        StakeInput::Zerocoin(stake) => {
            outputs.extend(stake.create_tx_outs(wallet, reward, height)?);
        }
    }

    if let Some(script) = masternode {
        if masternode_value > 0 {
            outputs.push(TxOut::new(masternode_value, script));
        }
    }

    let inputs = match input {
        StakeInput::Utxo(stake) => vec![stake.create_tx_in()],
        StakeInput::Zerocoin(stake) => {
            let tx_out_hash = hash_outputs(&outputs);
            vec![stake.create_tx_in(wallet, state, tx_out_hash)?]
        }
    };

    let transaction = Transaction::new(inputs, outputs);
    info!(
        "Created coinstake {} at height {height} backed by block {}",
        transaction.hash().to_hex(),
        index_from.height
    );

    Ok(CoinStake {
        transaction,
        stake_modifier,
        index_from_height: index_from.height,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum StakeErr {
    /// Output position is outside of the funding transaction
    InvalidPosition,

    /// Funding transaction is not in any known block
    TxNotFound,

    /// Funding block is not in the active chain
    NotInActiveChain,

    /// Block backing the stake could not be resolved
    IndexFromNotFound,

    /// Chain does not yet extend a full modifier interval past the backing block
    ModifierNotAvailable,

    /// Kernel script cannot be staked
    UnsupportedScript,

    /// Kernel key is not owned by the wallet
    KeyNotFound,

    /// Staked mint is not in the wallet
    MintNotFound,

    /// Mint version cannot be staked
    MintVersion { version: u8 },

    /// Kernel has not reached the minimum stake age
    StakeTooYoung,

    /// Witness error
    Witness(WitnessErr),

    /// Wallet error
    Wallet(WalletErr),

    /// Chain state error
    Chain(ChainErr),

    /// Chain backend error
    Backend(ChainBackendErr),

    /// Accumulator error
    Accumulator(AccumulatorErr),
}

impl From<WitnessErr> for StakeErr {
    fn from(other: WitnessErr) -> Self {
        Self::Witness(other)
    }
}

impl From<WalletErr> for StakeErr {
    fn from(other: WalletErr) -> Self {
        Self::Wallet(other)
    }
}

impl From<ChainErr> for StakeErr {
    fn from(other: ChainErr) -> Self {
        Self::Chain(other)
    }
}

impl From<ChainBackendErr> for StakeErr {
    fn from(other: ChainBackendErr) -> Self {
        Self::Backend(other)
    }
}

impl From<AccumulatorErr> for StakeErr {
    fn from(other: AccumulatorErr) -> Self {
        Self::Accumulator(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::tests::{coin, mint_tx, TestChain};
    use crate::chain::ChainConfig;
    use crate::consensus::{BLOCK_REWARD, COIN};
    use crate::primitives::{Denomination, OutPoint, PublicKey, SpendType, TxIn};
    use crate::wallet::{MemoryMintStore, MintStore, Wallet};

    fn test_wallet(chain: &TestChain) -> Wallet<MemoryMintStore> {
        Wallet::new(
            [21; 32],
            chain.state.config().zerocoin_params().clone(),
            MemoryMintStore::new(),
        )
    }

    fn payee() -> Script {
        Script::PayToPubKey(PublicKey([5; 32]))
    }

    #[test]
    fn utxo_coinstake_pays_owner_and_masternode() {
        let mut chain = TestChain::new();
        let wallet = test_wallet(&chain);
        let key = PublicKey([4; 32]);
        let tx = Transaction::new(
            vec![TxIn::Prevout(OutPoint {
                txid: Hash256::zero(),
                index: 0,
            })],
            vec![TxOut::new(100 * COIN, Script::PayToPubKey(key))],
        );
        let outpoint = OutPoint {
            txid: tx.hash(),
            index: 0,
        };
        chain.mine_with(vec![tx.clone()]);
        chain.mine_empty(70);

        let mut input = StakeInput::Utxo(UtxoStake::new(tx, 0).unwrap());
        let stake = create_coin_stake(&chain.state, &wallet, &mut input, BLOCK_REWARD, Some(payee()))
            .unwrap();
        let tx = &stake.transaction;
        let masternode = masternode_payment(72, BLOCK_REWARD, false);

        assert!(tx.is_coinstake());
        assert_eq!(stake.index_from_height, 1);
        assert_eq!(tx.outputs.len(), 3);
        assert_eq!(
            tx.outputs[1],
            TxOut::new(100 * COIN + BLOCK_REWARD - masternode, Script::PayToPubKey(key))
        );
        assert_eq!(tx.outputs[2], TxOut::new(masternode, payee()));
        assert_eq!(tx.inputs, vec![TxIn::Prevout(outpoint)]);
    }

    #[test]
    fn utxo_coinstake_splits_large_stakes() {
        let mut chain = TestChain::new();
        let mut wallet = test_wallet(&chain);
        wallet.set_stake_split_threshold(10);
        let tx = Transaction::new(vec![], vec![TxOut::new(30 * COIN, payee())]);
        chain.mine_with(vec![tx.clone()]);
        chain.mine_empty(70);

        let mut input = StakeInput::Utxo(UtxoStake::new(tx, 0).unwrap());
        let stake = create_coin_stake(&chain.state, &wallet, &mut input, 3 * COIN, None).unwrap();
        let values: Vec<_> = stake.transaction.outputs.iter().map(|o| o.value).collect();

        assert_eq!(values, vec![0, 16 * COIN + COIN / 2, 16 * COIN + COIN / 2]);
    }

    #[test]
    fn young_utxo_cannot_stake() {
        let mut chain = TestChain::new();
        let wallet = test_wallet(&chain);
        let tx = Transaction::new(vec![], vec![TxOut::new(COIN, payee())]);
        chain.mine_with(vec![tx.clone()]);
        chain.mine_empty(30);

        let mut input = StakeInput::Utxo(UtxoStake::new(tx, 0).unwrap());
        assert!(matches!(
            create_coin_stake(&chain.state, &wallet, &mut input, BLOCK_REWARD, None),
            Err(StakeErr::StakeTooYoung)
        ));
    }

    #[test]
    fn zerocoin_coinstake_spends_and_remints() {
        let mut config = ChainConfig::new("regtest");
        config.required_stake_depth = 20;
        let mut chain = TestChain::with_config(config);
        let wallet = test_wallet(&chain);

        chain.mine_empty(4);
        let (out, mint) = wallet.create_zerocoin_output(Denomination::Ten).unwrap();
        wallet.mints().record_mint(mint.clone()).unwrap();
        let mut tx = mint_tx(5, vec![]);
        tx.outputs.push(out);
        let block = chain.mine_with(vec![tx]);
        wallet.sync_block(&block).unwrap();

        for i in 0..12 {
            chain.mine(vec![coin(i, Denomination::Ten)]);
        }
        chain.mine_empty(100 - chain.state.height().unwrap());

        let mut input = StakeInput::Zerocoin(ZerocoinStake::new_from_mint(&mint));
        let stake = create_coin_stake(&chain.state, &wallet, &mut input, BLOCK_REWARD, Some(payee()))
            .unwrap();
        let tx = &stake.transaction;

        assert!(tx.is_coinstake());
        assert_eq!(stake.index_from_height, 17);

        // Empty marker, re-minted ten, two ones and the masternode share
        let values: Vec<_> = tx.outputs.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![0, 10 * COIN, COIN, COIN, 3 * COIN]);

        let spend = tx.spends().next().unwrap();
        assert_eq!(spend.spend_type, SpendType::Stake);
        assert_eq!(spend.serial_hash(), mint.serial_hash());
        assert_eq!(spend.tx_out_hash, hash_outputs(&tx.outputs));

        input.mark_spent(&wallet, tx.hash()).unwrap();
        assert!(wallet
            .mints()
            .meta_by_serial_hash(&mint.serial_hash())
            .unwrap()
            .is_used());
    }

    #[test]
    fn zerocoin_stake_at_default_depth() {
        let mut chain = TestChain::new();
        let wallet = test_wallet(&chain);

        chain.mine_empty(999);
        let (out, mint) = wallet.create_zerocoin_output(Denomination::Ten).unwrap();
        wallet.mints().record_mint(mint.clone()).unwrap();
        let mut tx = mint_tx(1000, vec![]);
        tx.outputs.push(out);
        chain.mine_with(vec![tx]);

        for i in 0..12 {
            chain.mine(vec![coin(i, Denomination::Ten)]);
        }
        chain.mine_empty(1300 - chain.state.height().unwrap());

        let mut input = StakeInput::Zerocoin(ZerocoinStake::new_from_mint(&mint));
        let stake = create_coin_stake(&chain.state, &wallet, &mut input, BLOCK_REWARD, None).unwrap();
        assert_eq!(stake.index_from_height, 1012);

        // No masternode output, its three coins are not minted either
        let values: Vec<_> = stake.transaction.outputs.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![0, 10 * COIN, COIN, COIN]);

        let expected = chain
            .state
            .backend()
            .expect_header(1072)
            .unwrap()
            .accumulator_checkpoint
            .stake_modifier();
        assert_eq!(stake.stake_modifier, expected);

        let StakeInput::Zerocoin(from_mint) = &input else {
            unreachable!();
        };
        let spend = stake.transaction.spends().next().unwrap();
        let mut from_spend = StakeInput::Zerocoin(ZerocoinStake::new_from_spend(spend));
        assert_eq!(from_spend.index_from(&chain.state).unwrap().height, 1012);
        assert_eq!(from_spend.uniqueness(), from_mint.uniqueness());
    }
}
