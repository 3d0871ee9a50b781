// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::accumulators::{
    Accumulator, AccumulatorEngine, AccumulatorErr, AccumulatorWitness, ChecksumStore,
};
use crate::chain::{ChainBackend, ChainBackendErr};
use crate::consensus::required_mints;
use crate::primitives::{BloomFilterHash256, Checksum, PublicCoin};
use log::*;

/// Parameters of a single witness generation
#[derive(Debug, Clone)]
pub struct WitnessRequest<'a> {
    /// Coin the witness proves membership of
    pub coin: PublicCoin,

    /// Height of the checkpoint the scan starts from. Clamped to the block
    /// before the mint of `coin` so the starting state never contains it.
    pub start_height: u64,
    pub security_level: u8,

    /// Most blocks the scan may cover, skipped blocks included
    pub max_blocks: u64,

    /// End the witness exactly at this height instead of as soon as enough
    /// mints were folded in
    pub target_height: Option<u64>,

    /// Blocks whose hash is not in the filter are assumed to hold no mint of
    /// the coin's denomination and are skipped
    pub filter: Option<&'a BloomFilterHash256>,
}

impl<'a> WitnessRequest<'a> {
    /// Request scanning from the block before the mint onwards
    #[must_use]
    pub fn new(coin: PublicCoin, security_level: u8, max_blocks: u64) -> Self {
        Self {
            coin,
            start_height: u64::MAX,
            security_level,
            max_blocks,
            target_height: None,
            filter: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedWitness {
    pub witness: AccumulatorWitness,

    /// Accumulator state the witness verifies against
    pub accumulator: Accumulator,

    /// Height of `accumulator`
    pub height: u64,
    pub checksum: Checksum,

    /// Other coins folded into the witness
    pub mints_added: u64,
    pub blocks_scanned: u64,
}

/// Rebuilds membership witnesses by replaying chain history on top of a
/// checkpointed accumulator value. Must be used under the chain state lock.
pub struct WitnessGenerator<'a, B: ChainBackend, S: ChecksumStore> {
    chain: &'a B,
    accumulators: &'a AccumulatorEngine<S>,
}

impl<'a, B: ChainBackend, S: ChecksumStore> WitnessGenerator<'a, B, S> {
    pub fn new(chain: &'a B, accumulators: &'a AccumulatorEngine<S>) -> Self {
        Self {
            chain,
            accumulators,
        }
    }

    pub fn generate(&self, req: &WitnessRequest<'_>) -> Result<GeneratedWitness, WitnessErr> {
        let denomination = req.coin.denomination;
        let params = self.accumulators.params();
        let required = required_mints(req.security_level);

        let mint_height = match self.chain.find_mint_height(&req.coin)? {
            Some(height) if height > 0 => height,
            _ => {
                warn!("Could not locate mint of coin {:?}", req.coin.hash());
                return Err(WitnessErr::MintHeightSearchFailure);
            }
        };

        let tip = self.chain.height()?;
        let start = req.start_height.min(mint_height - 1);

        if let Some(target) = req.target_height {
            if target < mint_height || target > tip {
                return Err(WitnessErr::TargetOutOfRange);
            }
        }

        let start_checkpoint = self.chain.expect_header(start)?.accumulator_checkpoint;
        let value = self
            .accumulators
            .lookup_value(&start_checkpoint, denomination)
            .map_err(|err| match err {
                AccumulatorErr::ChecksumNotFound { checksum, .. } => WitnessErr::ChecksumNotFound {
                    checksum,
                    height: start,
                },
                err => WitnessErr::Accumulator(err),
            })?;

        let mut accumulator = Accumulator::with_value(params.clone(), denomination, value);
        let mut witness = AccumulatorWitness::new(accumulator.clone(), req.coin.clone());
        let end = match req.target_height {
            Some(target) => target,
            None => tip.min(start.saturating_add(req.max_blocks)),
        };
        let mut mints_added = 0;
        let mut blocks_scanned = 0;
        let mut seen = false;
        let mut height = start;

        debug!(
            "Generating witness for {denomination} coin minted at {mint_height}, scanning {}..={end}",
            start + 1
        );

        while height < end && blocks_scanned < req.max_blocks {
            height += 1;
            blocks_scanned += 1;

            let block = self
                .chain
                .block_at_height(height)?
                .ok_or(ChainBackendErr::PosOutOfBounds)?;

            if let Some(filter) = req.filter {
                if height != mint_height && !filter.may_contain(&block.hash()) {
                    continue;
                }
            }

            let coins = block
                .public_coins_of(denomination, params)
                .map_err(|_| WitnessErr::GetPubcoinFailure { height })?;

            for coin in &coins {
                accumulator.accumulate(coin)?;

                if coin == &req.coin {
                    seen = true;
                } else {
                    witness.add_element(coin)?;
                    mints_added += 1;
                }
            }

            if req.target_height.is_none() && seen && mints_added >= required {
                break;
            }
        }

        let reached_target = req.target_height.map_or(true, |target| height == target);

        if !seen || mints_added < required || !reached_target {
            debug!(
                "Not enough mints for witness: {mints_added}/{required} after {blocks_scanned} blocks"
            );
            return Err(WitnessErr::NotEnoughMints {
                mints_added,
                required,
                blocks_scanned,
            });
        }

        let committed = self
            .chain
            .expect_header(height)?
            .accumulator_checkpoint
            .checksum(denomination);

        if committed != accumulator.checksum() {
            error!("Witness accumulator diverges from checkpoint at height {height}");
            return Err(WitnessErr::CheckpointMismatch { height });
        }

        if !witness.verify(&accumulator) {
            error!("Generated witness does not verify at height {height}");
            return Err(WitnessErr::InvalidWitness);
        }

        debug!("Generated witness at height {height} with {mints_added} mints");

        Ok(GeneratedWitness {
            witness,
            checksum: accumulator.checksum(),
            accumulator,
            height,
            mints_added,
            blocks_scanned,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WitnessErr {
    /// The scan budget was exhausted before enough coins were folded in
    NotEnoughMints {
        mints_added: u64,
        required: u64,
        blocks_scanned: u64,
    },

    /// A scanned block holds a malformed mint
    GetPubcoinFailure { height: u64 },

    /// The starting checkpoint could not be resolved to a value
    ChecksumNotFound { checksum: Checksum, height: u64 },

    /// The coin is not minted in the active chain
    MintHeightSearchFailure,

    /// Target height is before the mint or above the tip
    TargetOutOfRange,

    /// Replayed accumulator differs from the checkpoint committed at `height`
    CheckpointMismatch { height: u64 },

    /// Witness does not verify against the replayed accumulator
    InvalidWitness,

    /// Chain backend error
    Chain(ChainBackendErr),

    /// Accumulator error
    Accumulator(AccumulatorErr),
}

impl From<ChainBackendErr> for WitnessErr {
    fn from(other: ChainBackendErr) -> Self {
        Self::Chain(other)
    }
}

impl From<AccumulatorErr> for WitnessErr {
    fn from(other: AccumulatorErr) -> Self {
        Self::Accumulator(other)
    }
}
