// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

pub mod memory;

pub use memory::*;

use crate::primitives::{Block, BlockHeader, BlockVerifyErr, Hash256, PublicCoin};

/// Read and append access to the active chain, as needed by the accumulator
/// subsystem and the staking engine.
pub trait ChainBackend: Send + Sync {
    /// Height of the active chain tip
    fn height(&self) -> Result<u64, ChainBackendErr>;

    /// Returns the header of the active chain at `height`
    fn header_at_height(&self, height: u64) -> Result<Option<BlockHeader>, ChainBackendErr>;

    /// Returns the header with the given hash if it is known, whether or not
    /// it is in the active chain.
    fn header_by_hash(&self, hash: &Hash256) -> Result<Option<BlockHeader>, ChainBackendErr>;

    /// Returns the active chain block at `height`
    fn block_at_height(&self, height: u64) -> Result<Option<Block>, ChainBackendErr>;

    /// Returns true if the block with the given hash is in the active chain
    fn contains(&self, hash: &Hash256) -> Result<bool, ChainBackendErr>;

    /// Returns the hash of the active chain block containing transaction `txid`
    fn transaction_block(&self, txid: &Hash256) -> Result<Option<Hash256>, ChainBackendErr>;

    /// Returns the height at which `coin` was minted in the active chain
    fn find_mint_height(&self, coin: &PublicCoin) -> Result<Option<u64>, ChainBackendErr>;

    /// Appends a block on top of the active chain. Validation is done by the caller.
    fn append_block(&mut self, block: Block) -> Result<(), ChainBackendErr>;

    /// Drops every block above `height`
    fn rewind(&mut self, height: u64) -> Result<(), ChainBackendErr>;

    /// Returns true if not even the genesis block is present
    fn is_empty(&self) -> Result<bool, ChainBackendErr>;

    /// Header of the active chain tip
    fn tip(&self) -> Result<BlockHeader, ChainBackendErr> {
        let height = self.height()?;
        self.header_at_height(height)?
            .ok_or(ChainBackendErr::CorruptData)
    }

    /// Header at `height`, failing if it does not exist
    fn expect_header(&self, height: u64) -> Result<BlockHeader, ChainBackendErr> {
        self.header_at_height(height)?
            .ok_or(ChainBackendErr::PosOutOfBounds)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChainBackendErr {
    /// Given position is past the current bounds
    PosOutOfBounds,

    /// Backend data is corrupted
    CorruptData,

    /// Given height is invalid
    InvalidHeight,

    /// Block verify error
    Block(BlockVerifyErr),

    /// Generic error
    Error(&'static str),
}

impl From<BlockVerifyErr> for ChainBackendErr {
    fn from(other: BlockVerifyErr) -> Self {
        Self::Block(other)
    }
}
