// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

pub mod backend;
pub mod chain;
pub mod chain_config;

pub use backend::*;
pub use chain::*;
pub use chain_config::*;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::accumulators::{ChecksumStore, MemoryChecksumStore};
    use crate::consensus::BLOCK_TIME_SECONDS;
    use crate::primitives::*;
    use ibig::UBig;
    use triomphe::Arc;

    /// Well formed public coin, distinct for every `v`
    pub fn coin(v: u64, denomination: Denomination) -> PublicCoin {
        PublicCoin::new(UBig::from(1_000_003_u64) + UBig::from(v) * UBig::from(2_u8), denomination)
    }

    /// Coinbase at `height` minting `coins`
    pub fn mint_tx(height: u64, coins: Vec<PublicCoin>) -> Transaction {
        Transaction::new(
            vec![TxIn::Coinbase { height }],
            coins
                .into_iter()
                .map(|c| TxOut::new(c.denomination.amount(), Script::ZerocoinMint(c)))
                .collect(),
        )
    }

    /// Regtest chain producing blocks one minute apart
    pub struct TestChain<S: ChecksumStore = MemoryChecksumStore> {
        pub state: ChainState<MemoryBackend, S>,
    }

    impl TestChain {
        pub fn new() -> Self {
            Self::with_config(ChainConfig::new("regtest"))
        }

        pub fn with_config(config: ChainConfig) -> Self {
            TestChain::with_store(config, MemoryChecksumStore::new())
        }
    }

    impl<S: ChecksumStore> TestChain<S> {
        pub fn with_store(config: ChainConfig, store: S) -> Self {
            let state = ChainState::new(Arc::new(config), MemoryBackend::new(), store).unwrap();
            Self { state }
        }

        /// Builds a valid block on top of the tip containing `transactions`
        pub fn next_block_with(&self, transactions: Vec<Transaction>) -> Block {
            let tip = self.state.tip().unwrap();
            let mut block = Block::new(
                BlockHeader {
                    version: 1,
                    height: tip.height + 1,
                    prev_hash: tip.hash(),
                    timestamp: tip.timestamp + BLOCK_TIME_SECONDS as i64,
                    accumulator_checkpoint: Checkpoint::default(),
                    stake_modifier: tip.stake_modifier.wrapping_mul(31).wrapping_add(tip.height + 1),
                },
                transactions,
            );
            let coins = block
                .public_coins(self.state.config().zerocoin_params())
                .unwrap();
            block.header.accumulator_checkpoint = self.state.next_checkpoint(&coins).unwrap();
            block
        }

        pub fn next_block(&self, coins: Vec<PublicCoin>) -> Block {
            let height = self.state.height().unwrap() + 1;
            self.next_block_with(vec![mint_tx(height, coins)])
        }

        pub fn connect(&mut self, block: Block) {
            self.state.connect_block(block).unwrap();
        }

        pub fn mine(&mut self, coins: Vec<PublicCoin>) -> Block {
            let block = self.next_block(coins);
            self.connect(block.clone());
            block
        }

        pub fn mine_with(&mut self, transactions: Vec<Transaction>) -> Block {
            let block = self.next_block_with(transactions);
            self.connect(block.clone());
            block
        }

        pub fn mine_empty(&mut self, count: u64) {
            for _ in 0..count {
                self.mine(vec![]);
            }
        }
    }
}
