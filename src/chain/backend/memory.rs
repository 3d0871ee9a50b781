// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::chain::backend::{ChainBackend, ChainBackendErr};
use crate::primitives::{Block, BlockHeader, Hash256, PublicCoin};
use std::collections::HashMap;

/// Chain backend keeping every block in memory. Used by memory only nodes
/// and throughout the tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    blocks: Vec<Block>,
    heights: HashMap<Hash256, u64>,
    transactions: HashMap<Hash256, Hash256>,
    mints: HashMap<Hash256, u64>,
    /// Headers that left the active chain on rewind
    stale_headers: HashMap<Hash256, BlockHeader>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChainBackend for MemoryBackend {
    fn height(&self) -> Result<u64, ChainBackendErr> {
        match self.blocks.len() {
            0 => Err(ChainBackendErr::Error("chain has no genesis")),
            len => Ok(len as u64 - 1),
        }
    }

    fn header_at_height(&self, height: u64) -> Result<Option<BlockHeader>, ChainBackendErr> {
        Ok(self.blocks.get(height as usize).map(|b| b.header.clone()))
    }

    fn header_by_hash(&self, hash: &Hash256) -> Result<Option<BlockHeader>, ChainBackendErr> {
        if let Some(height) = self.heights.get(hash) {
            return self.header_at_height(*height);
        }

        Ok(self.stale_headers.get(hash).cloned())
    }

    fn block_at_height(&self, height: u64) -> Result<Option<Block>, ChainBackendErr> {
        Ok(self.blocks.get(height as usize).cloned())
    }

    fn contains(&self, hash: &Hash256) -> Result<bool, ChainBackendErr> {
        Ok(self.heights.contains_key(hash))
    }

    fn transaction_block(&self, txid: &Hash256) -> Result<Option<Hash256>, ChainBackendErr> {
        Ok(self.transactions.get(txid).copied())
    }

    fn find_mint_height(&self, coin: &PublicCoin) -> Result<Option<u64>, ChainBackendErr> {
        Ok(self.mints.get(&coin.hash()).copied())
    }

    fn append_block(&mut self, block: Block) -> Result<(), ChainBackendErr> {
        if block.height() != self.blocks.len() as u64 {
            return Err(ChainBackendErr::InvalidHeight);
        }

        let hash = block.hash();
        let height = block.height();

        for tx in &block.transactions {
            self.transactions.insert(tx.hash(), hash);

            for coin in tx.mints() {
                self.mints.entry(coin.hash()).or_insert(height);
            }
        }

        self.stale_headers.remove(&hash);
        self.heights.insert(hash, height);
        self.blocks.push(block);
        Ok(())
    }

    fn rewind(&mut self, height: u64) -> Result<(), ChainBackendErr> {
        if height >= self.blocks.len() as u64 {
            return Err(ChainBackendErr::PosOutOfBounds);
        }

        while self.blocks.len() as u64 > height + 1 {
            let block = self.blocks.pop().ok_or(ChainBackendErr::CorruptData)?;
            let hash = block.hash();

            for tx in &block.transactions {
                self.transactions.remove(&tx.hash());

                for coin in tx.mints() {
                    if self.mints.get(&coin.hash()) == Some(&block.height()) {
                        self.mints.remove(&coin.hash());
                    }
                }
            }

            self.heights.remove(&hash);
            self.stale_headers.insert(hash, block.header);
        }

        Ok(())
    }

    fn is_empty(&self) -> Result<bool, ChainBackendErr> {
        Ok(self.blocks.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{Checkpoint, Denomination, Script, Transaction, TxIn, TxOut};
    use ibig::UBig;

    fn block(height: u64, prev_hash: Hash256, coins: Vec<PublicCoin>) -> Block {
        let tx = Transaction::new(
            vec![TxIn::Coinbase { height }],
            coins
                .into_iter()
                .map(|c| TxOut::new(c.denomination.amount(), Script::ZerocoinMint(c)))
                .collect(),
        );

        Block::new(
            BlockHeader {
                version: 1,
                height,
                prev_hash,
                timestamp: height as i64 * 60,
                accumulator_checkpoint: Checkpoint::default(),
                stake_modifier: 0,
            },
            vec![tx],
        )
    }

    #[test]
    fn it_indexes_and_rewinds() {
        let mut backend = MemoryBackend::new();
        let coin = PublicCoin::new(UBig::from(1_000_003_u32), Denomination::Ten);
        let genesis = block(0, Hash256::zero(), vec![]);
        let one = block(1, genesis.hash(), vec![]);
        let two = block(2, one.hash(), vec![coin.clone()]);
        let two_hash = two.hash();
        let txid = two.transactions[0].hash();

        backend.append_block(genesis).unwrap();
        backend.append_block(one).unwrap();
        backend.append_block(two).unwrap();

        assert_eq!(backend.height().unwrap(), 2);
        assert_eq!(backend.find_mint_height(&coin).unwrap(), Some(2));
        assert_eq!(backend.transaction_block(&txid).unwrap(), Some(two_hash));
        assert!(backend.contains(&two_hash).unwrap());

        backend.rewind(1).unwrap();

        assert_eq!(backend.height().unwrap(), 1);
        assert_eq!(backend.find_mint_height(&coin).unwrap(), None);
        assert_eq!(backend.transaction_block(&txid).unwrap(), None);
        assert!(!backend.contains(&two_hash).unwrap());
        assert!(backend.header_by_hash(&two_hash).unwrap().is_some());
    }

    #[test]
    fn it_rejects_gaps() {
        let mut backend = MemoryBackend::new();
        assert_eq!(
            backend.append_block(block(1, Hash256::zero(), vec![])),
            Err(ChainBackendErr::InvalidHeight)
        );
        assert!(backend.is_empty().unwrap());
    }
}
