// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

//! Zerocoin accumulators, their per block checkpoints and membership witnesses.

mod accumulator;
mod engine;
pub mod light_worker;
mod params;
pub mod store;
mod witness;

pub use accumulator::*;
pub use engine::*;
pub use light_worker::{GenWit, LightWorker, WitnessResponse, WorkerErr};
pub use params::*;
pub use store::{ChecksumStore, ChecksumStoreErr, MemoryChecksumStore};
pub use witness::*;

use crate::chain::ChainBackendErr;
use crate::primitives::{BlockVerifyErr, Checksum, Denomination, Hash256};
use ibig::UBig;

/// Checksum of an accumulator value. First four bytes of its keyed hash.
#[must_use]
pub fn checksum_of(value: &UBig) -> Checksum {
    let hash = Hash256::hash_from_slice(value.to_be_bytes(), "accumulator.checksum");
    let mut buf = [0; 4];
    buf.copy_from_slice(&hash.0[..4]);
    Checksum::from_le_bytes(buf)
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccumulatorErr {
    /// Coin denomination does not match the accumulator
    WrongDenomination,

    /// Coin value is outside of the accepted range
    InvalidCoin,

    /// Blocks must be folded strictly in height order
    OutOfOrder { expected: u64, got: u64 },

    /// Checksum is neither cached nor in the checksum store. Never happens
    /// for checkpoints of the active chain unless local data is corrupted.
    ChecksumNotFound {
        checksum: Checksum,
        denomination: Option<Denomination>,
    },

    /// Block verify error
    Block(BlockVerifyErr),

    /// Checksum store error
    Store(ChecksumStoreErr),

    /// Chain backend error
    Chain(ChainBackendErr),
}

impl From<BlockVerifyErr> for AccumulatorErr {
    fn from(other: BlockVerifyErr) -> Self {
        Self::Block(other)
    }
}

impl From<ChecksumStoreErr> for AccumulatorErr {
    fn from(other: ChecksumStoreErr) -> Self {
        Self::Store(other)
    }
}

impl From<ChainBackendErr> for AccumulatorErr {
    fn from(other: ChainBackendErr) -> Self {
        Self::Chain(other)
    }
}
