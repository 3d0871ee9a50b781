// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::accumulators::{AccumulatorEngine, AccumulatorErr, ChecksumStore};
use crate::chain::{ChainBackend, ChainBackendErr, ChainConfig};
use crate::primitives::{Block, BlockHeader, BlockVerifyErr, Checkpoint, Hash256, PublicCoin};
use log::*;
use parking_lot::RwLock;
use triomphe::Arc;

/// Chain state shared between the block connection path, the wallet, the
/// staking loop and the light worker. This is the single chain state lock.
pub type SharedChainState<B, S> = Arc<RwLock<ChainState<B, S>>>;

/// Active chain together with the accumulators as of its tip.
pub struct ChainState<B: ChainBackend, S: ChecksumStore> {
    config: Arc<ChainConfig>,
    backend: B,
    accumulators: AccumulatorEngine<S>,
    memory_only: bool,
}

impl<B: ChainBackend, S: ChecksumStore> ChainState<B, S> {
    /// Creates the genesis block on an empty backend, otherwise restores the
    /// accumulators from the checkpoint committed at the tip.
    pub fn new(config: Arc<ChainConfig>, mut backend: B, store: S) -> Result<Self, ChainErr> {
        let mut accumulators = AccumulatorEngine::new(config.zerocoin_params().clone(), store)?;

        if backend.is_empty()? {
            let genesis = Block::new(
                BlockHeader {
                    version: 1,
                    height: 0,
                    prev_hash: Hash256::zero(),
                    timestamp: config.genesis_timestamp,
                    accumulator_checkpoint: accumulators.compute_checkpoint(),
                    stake_modifier: 0,
                },
                vec![],
            );
            info!("Creating {} genesis block", config.network_name());
            backend.append_block(genesis)?;
        } else {
            let tip = backend.tip()?;
            accumulators.load_from_checkpoint(tip.height, &tip.accumulator_checkpoint)?;
            info!("Restored accumulators at height {}", tip.height);
        }

        Ok(Self {
            config,
            backend,
            accumulators,
            memory_only: false,
        })
    }

    /// Keep checksums of connected blocks in memory only. Used for
    /// speculative chains that must not touch the checksum store.
    pub fn set_memory_only(&mut self, memory_only: bool) {
        self.memory_only = memory_only;
    }

    pub fn config(&self) -> &Arc<ChainConfig> {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn accumulators(&self) -> &AccumulatorEngine<S> {
        &self.accumulators
    }

    pub fn height(&self) -> Result<u64, ChainErr> {
        Ok(self.backend.height()?)
    }

    pub fn tip(&self) -> Result<BlockHeader, ChainErr> {
        Ok(self.backend.tip()?)
    }

    /// Checkpoint a block minting `coins` on top of the tip must commit to
    pub fn next_checkpoint(&self, coins: &[PublicCoin]) -> Result<Checkpoint, ChainErr> {
        Ok(self.accumulators.next_checkpoint(coins)?)
    }

    /// Validates the accumulator checkpoint of `block`, folds its mints and
    /// appends it to the active chain. A checkpoint mismatch rejects the block.
    ///
    /// Either the block is connected or the chain state is left as it was:
    /// when persisting checksums or appending the block fails the
    /// accumulators are reloaded at the tip, so the block can be retried.
    pub fn connect_block(&mut self, block: Block) -> Result<(), ChainErr> {
        let tip = self.backend.tip()?;

        if block.header.prev_hash != tip.hash() {
            return Err(ChainErr::Block(BlockVerifyErr::InvalidParent));
        }

        if block.height() != tip.height + 1 {
            return Err(ChainErr::Block(BlockVerifyErr::InvalidHeight));
        }

        if !self.accumulators.validate_checkpoint(&block)? {
            error!("Rejecting block {:?}: invalid accumulator checkpoint", block.hash());
            return Err(ChainErr::Block(BlockVerifyErr::InvalidCheckpoint));
        }

        let height = block.height();
        let coins = block.public_coins(self.config.zerocoin_params())?;
        let checkpoint = block.header.accumulator_checkpoint;
        self.accumulators.fold_block(height, &coins)?;

        if let Err(err) = self.commit_block(block) {
            error!("Failed to connect block at height {height}: {err:?}");
            self.accumulators
                .abandon_block(tip.height, &tip.accumulator_checkpoint, &checkpoint)?;
            return Err(err);
        }

        debug!("Connected block at height {height} with {} mints", coins.len());
        Ok(())
    }

    /// Persists the checksums of the freshly folded accumulators and appends `block`
    fn commit_block(&mut self, block: Block) -> Result<(), ChainErr> {
        let mapping = self.accumulators.checksum_map();
        self.accumulators
            .persist_checksums(&mapping, block.height(), self.memory_only)?;
        self.backend.append_block(block)?;
        Ok(())
    }

    /// Disconnects every block above `height`, rewinding the accumulators first
    pub fn disconnect_to(&mut self, height: u64) -> Result<(), ChainErr> {
        let tip = self.backend.height()?;

        if height > tip {
            return Err(ChainErr::Backend(ChainBackendErr::PosOutOfBounds));
        }

        self.accumulators.rewind(&self.backend, height)?;
        self.backend.rewind(height)?;
        debug!("Disconnected blocks {}..={tip}", height + 1);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChainErr {
    /// Consensus failure, the block must be rejected
    Block(BlockVerifyErr),

    /// Accumulator error
    Accumulator(AccumulatorErr),

    /// Chain backend error
    Backend(ChainBackendErr),
}

impl From<BlockVerifyErr> for ChainErr {
    fn from(other: BlockVerifyErr) -> Self {
        Self::Block(other)
    }
}

impl From<AccumulatorErr> for ChainErr {
    fn from(other: AccumulatorErr) -> Self {
        Self::Accumulator(other)
    }
}

impl From<ChainBackendErr> for ChainErr {
    fn from(other: ChainBackendErr) -> Self {
        Self::Backend(other)
    }
}
