// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::accumulators::ZerocoinParams;
use crate::primitives::{Checkpoint, Denomination, Hash256, PublicCoin, Transaction};
use bincode::{Decode, Encode};

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct BlockHeader {
    pub version: u32,
    pub height: u64,
    pub prev_hash: Hash256,

    /// Block timestamp, seconds since the unix epoch
    pub timestamp: i64,

    /// Accumulator checksums after folding the mints of this block
    pub accumulator_checkpoint: Checkpoint,

    /// Kernel stake modifier. Computed by the staking engine
    pub stake_modifier: u64,
}

impl BlockHeader {
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        crate::codec::encode_to_vec(self).unwrap_or_default()
    }

    #[must_use]
    pub fn hash(&self) -> Hash256 {
        Hash256::hash_from_slice(self.to_bytes(), "block.header")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    #[must_use]
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
        }
    }

    #[must_use]
    pub fn height(&self) -> u64 {
        self.header.height
    }

    #[must_use]
    pub fn hash(&self) -> Hash256 {
        self.header.hash()
    }

    /// All public coins minted in this block, in transaction then output
    /// order. Fails on the first malformed mint.
    pub fn public_coins(&self, params: &ZerocoinParams) -> Result<Vec<PublicCoin>, BlockVerifyErr> {
        let mut out = vec![];

        for (i, tx) in self.transactions.iter().enumerate() {
            for coin in tx.mints() {
                if !coin.is_valid(params) {
                    return Err(BlockVerifyErr::InvalidMint { tx: i });
                }

                out.push(coin.clone());
            }
        }

        Ok(out)
    }

    /// Public coins of a single denomination
    pub fn public_coins_of(
        &self,
        denomination: Denomination,
        params: &ZerocoinParams,
    ) -> Result<Vec<PublicCoin>, BlockVerifyErr> {
        let mut coins = self.public_coins(params)?;
        coins.retain(|c| c.denomination == denomination);
        Ok(coins)
    }

    #[must_use]
    pub fn contains_mint(&self, coin: &PublicCoin) -> bool {
        self.transactions
            .iter()
            .any(|tx| tx.mints().any(|c| c == coin))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockVerifyErr {
    /// Mint output in transaction `tx` carries a malformed public coin
    InvalidMint { tx: usize },

    /// The accumulator checkpoint in the header does not match the mints
    InvalidCheckpoint,

    /// Block does not extend the current tip
    InvalidParent,

    /// Block height is not tip height + 1
    InvalidHeight,
}
