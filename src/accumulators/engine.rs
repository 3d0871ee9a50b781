// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::accumulators::{Accumulator, AccumulatorErr, ChecksumStore, ZerocoinParams};
use crate::chain::ChainBackend;
use crate::primitives::{Block, Checkpoint, Checksum, Denomination, PublicCoin, DENOMINATIONS};
use ibig::UBig;
use log::*;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use triomphe::Arc;

/// Checksum and value of every denomination at a given height
pub type ChecksumMap = BTreeMap<Denomination, (Checksum, UBig)>;

#[derive(Debug, Default)]
struct ChecksumCache {
    values: HashMap<Checksum, UBig>,
    heights: HashMap<(Denomination, Checksum), u64>,
}

/// Owns the accumulator of every denomination as of `height`.
///
/// Created empty at genesis or restored from the checksum store at startup.
/// Every mutation happens under the exclusive chain state lock; reads
/// (`lookup_value`, `compute_checkpoint`, ...) only need the shared lock.
pub struct AccumulatorEngine<S: ChecksumStore> {
    params: Arc<ZerocoinParams>,
    accumulators: Vec<Accumulator>,
    height: u64,
    cache: ChecksumCache,
    store: S,
}

impl<S: ChecksumStore> AccumulatorEngine<S> {
    /// Genesis state. The empty accumulators are recorded at height 0.
    pub fn new(params: Arc<ZerocoinParams>, store: S) -> Result<Self, AccumulatorErr> {
        let mut engine = Self {
            accumulators: Self::empty_accumulators(&params),
            params,
            height: 0,
            cache: ChecksumCache::default(),
            store,
        };

        let genesis = engine.checksum_map();
        engine.persist_checksums(&genesis, 0, false)?;
        Ok(engine)
    }

    fn empty_accumulators(params: &Arc<ZerocoinParams>) -> Vec<Accumulator> {
        Denomination::ALL
            .iter()
            .map(|d| Accumulator::new(params.clone(), *d))
            .collect()
    }

    #[must_use]
    pub fn height(&self) -> u64 {
        self.height
    }

    #[must_use]
    pub fn params(&self) -> &Arc<ZerocoinParams> {
        &self.params
    }

    #[must_use]
    pub fn accumulator(&self, denomination: Denomination) -> &Accumulator {
        &self.accumulators[denomination.index()]
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Folds the public coins minted at `height` into their accumulators,
    /// in the order they appear in the block. Does not persist anything.
    pub fn fold_block(&mut self, height: u64, coins: &[PublicCoin]) -> Result<(), AccumulatorErr> {
        if height != self.height + 1 {
            return Err(AccumulatorErr::OutOfOrder {
                expected: self.height + 1,
                got: height,
            });
        }

        Self::fold_into(&self.params, &mut self.accumulators, coins)?;
        self.height = height;
        Ok(())
    }

    /// Coins are validated up front so a malformed mint leaves `accumulators` untouched.
    fn fold_into(
        params: &ZerocoinParams,
        accumulators: &mut [Accumulator],
        coins: &[PublicCoin],
    ) -> Result<(), AccumulatorErr> {
        if coins.iter().any(|c| !c.is_valid(params)) {
            return Err(AccumulatorErr::InvalidCoin);
        }

        let mut by_denomination: Vec<Vec<&PublicCoin>> = vec![vec![]; DENOMINATIONS];

        for coin in coins {
            by_denomination[coin.denomination.index()].push(coin);
        }

        accumulators
            .par_iter_mut()
            .zip(by_denomination.par_iter())
            .try_for_each(|(acc, coins)| coins.iter().try_for_each(|c| acc.accumulate(c)))
    }

    /// Packs the checksum of every accumulator
    #[must_use]
    pub fn compute_checkpoint(&self) -> Checkpoint {
        Self::checkpoint_of(&self.accumulators)
    }

    fn checkpoint_of(accumulators: &[Accumulator]) -> Checkpoint {
        let mut checkpoint = Checkpoint::default();

        for acc in accumulators {
            checkpoint.set_checksum(acc.denomination(), acc.checksum());
        }

        checkpoint
    }

    /// Checkpoint the next block must commit to if it mints `coins`
    pub fn next_checkpoint(&self, coins: &[PublicCoin]) -> Result<Checkpoint, AccumulatorErr> {
        let mut accumulators = self.accumulators.clone();
        Self::fold_into(&self.params, &mut accumulators, coins)?;
        Ok(Self::checkpoint_of(&accumulators))
    }

    /// Recomputes the checkpoint of `block` on top of the current state and
    /// compares it with the one in its header. The engine is left unchanged.
    pub fn validate_checkpoint(&self, block: &Block) -> Result<bool, AccumulatorErr> {
        if block.height() != self.height + 1 {
            return Err(AccumulatorErr::OutOfOrder {
                expected: self.height + 1,
                got: block.height(),
            });
        }

        let coins = block.public_coins(&self.params)?;
        let expected = self.next_checkpoint(&coins)?;

        if expected != block.header.accumulator_checkpoint {
            warn!(
                "Checkpoint mismatch at height {}: expected {}, got {}",
                block.height(),
                expected.to_hex(),
                block.header.accumulator_checkpoint.to_hex()
            );
            return Ok(false);
        }

        Ok(true)
    }

    /// Checksum and value of every denomination in the current state
    #[must_use]
    pub fn checksum_map(&self) -> ChecksumMap {
        self.accumulators
            .iter()
            .map(|acc| (acc.denomination(), (acc.checksum(), acc.value().clone())))
            .collect()
    }

    /// Records `mapping` as committed at `height`. Memory only mappings stay
    /// in the process cache and never reach the checksum store.
    pub fn persist_checksums(
        &mut self,
        mapping: &ChecksumMap,
        height: u64,
        memory_only: bool,
    ) -> Result<(), AccumulatorErr> {
        for (denomination, (checksum, value)) in mapping {
            if memory_only {
                self.cache.values.insert(*checksum, value.clone());

                // A durable first height always predates a speculative one
                if self.store.get_height(*denomination, *checksum)?.is_none() {
                    self.cache
                        .heights
                        .entry((*denomination, *checksum))
                        .or_insert(height);
                }
            } else {
                self.store.put_value(*checksum, value)?;
                self.store
                    .put_height_if_absent(*denomination, *checksum, height)?;
            }
        }

        Ok(())
    }

    /// Resolves the checksum of `denomination` in `checkpoint` to its accumulator value
    pub fn lookup_value(
        &self,
        checkpoint: &Checkpoint,
        denomination: Denomination,
    ) -> Result<UBig, AccumulatorErr> {
        self.lookup_value_by_checksum(checkpoint.checksum(denomination))
            .map_err(|err| match err {
                AccumulatorErr::ChecksumNotFound { checksum, .. } => {
                    AccumulatorErr::ChecksumNotFound {
                        checksum,
                        denomination: Some(denomination),
                    }
                }
                err => err,
            })
    }

    pub fn lookup_value_by_checksum(&self, checksum: Checksum) -> Result<UBig, AccumulatorErr> {
        if let Some(value) = self.cache.values.get(&checksum) {
            return Ok(value.clone());
        }

        match self.store.get_value(checksum)? {
            Some(value) => Ok(value),
            None => {
                error!("Accumulator checksum {checksum:08x} not found");
                Err(AccumulatorErr::ChecksumNotFound {
                    checksum,
                    denomination: None,
                })
            }
        }
    }

    /// First height at which `checksum` was committed for `denomination`
    pub fn checksum_height(
        &self,
        checksum: Checksum,
        denomination: Denomination,
    ) -> Result<u64, AccumulatorErr> {
        if let Some(height) = self.cache.heights.get(&(denomination, checksum)) {
            return Ok(*height);
        }

        self.store
            .get_height(denomination, checksum)?
            .ok_or(AccumulatorErr::ChecksumNotFound {
                checksum,
                denomination: Some(denomination),
            })
    }

    /// Restores every accumulator from the values behind `checkpoint`
    pub fn load_from_checkpoint(
        &mut self,
        height: u64,
        checkpoint: &Checkpoint,
    ) -> Result<(), AccumulatorErr> {
        let mut accumulators = Vec::with_capacity(DENOMINATIONS);

        for denomination in Denomination::ALL {
            let value = self.lookup_value(checkpoint, denomination)?;
            accumulators.push(Accumulator::with_value(
                self.params.clone(),
                denomination,
                value,
            ));
        }

        self.accumulators = accumulators;
        self.height = height;
        debug!("Loaded accumulators at height {height}");
        Ok(())
    }

    /// Forgets the checksums introduced by the block committing `erase`
    /// whose parent committed `previous`
    pub fn erase_checkpoint(
        &mut self,
        erase: &Checkpoint,
        previous: &Checkpoint,
    ) -> Result<(), AccumulatorErr> {
        for denomination in Denomination::ALL {
            let checksum = erase.checksum(denomination);

            if checksum != previous.checksum(denomination) {
                self.cache.values.remove(&checksum);
                self.cache.heights.remove(&(denomination, checksum));
            }
        }

        self.store.erase_checkpoint(erase, previous)?;
        Ok(())
    }

    /// Drops a block folded on top of `height` that never made it into the
    /// chain and reloads the accumulators committed by `checkpoint` at
    /// `height`. Checksums already recorded for `abandoned` are erased.
    pub fn abandon_block(
        &mut self,
        height: u64,
        checkpoint: &Checkpoint,
        abandoned: &Checkpoint,
    ) -> Result<(), AccumulatorErr> {
        if self.height == height {
            return Ok(());
        }

        self.load_from_checkpoint(height, checkpoint)?;

        if let Err(err) = self.erase_checkpoint(abandoned, checkpoint) {
            warn!("Could not erase checksums of abandoned block at height {}: {err:?}", height + 1);
        }

        Ok(())
    }

    /// Discards the state above `to_height` and reloads the accumulators
    /// from the checkpoint committed at `to_height`. The headers of every
    /// height being discarded must still be readable from `chain`.
    pub fn rewind<B: ChainBackend>(
        &mut self,
        chain: &B,
        to_height: u64,
    ) -> Result<(), AccumulatorErr> {
        if to_height > self.height {
            return Err(AccumulatorErr::OutOfOrder {
                expected: self.height,
                got: to_height,
            });
        }

        let mut erase = chain.expect_header(self.height)?.accumulator_checkpoint;

        for height in (to_height..self.height).rev() {
            let previous = chain.expect_header(height)?.accumulator_checkpoint;
            self.erase_checkpoint(&erase, &previous)?;
            erase = previous;
        }

        // `erase` now holds the checkpoint at `to_height`
        self.load_from_checkpoint(to_height, &erase)?;
        info!("Rewound accumulators to height {to_height}");
        Ok(())
    }

    /// Recomputes all accumulators from genesis up to and including `height`
    pub fn replay<B: ChainBackend>(
        params: &Arc<ZerocoinParams>,
        chain: &B,
        height: u64,
    ) -> Result<Vec<Accumulator>, AccumulatorErr> {
        let mut accumulators = Self::empty_accumulators(params);

        for h in 1..=height {
            let block = chain
                .block_at_height(h)?
                .ok_or(crate::chain::ChainBackendErr::PosOutOfBounds)?;
            let coins = block.public_coins(params)?;
            Self::fold_into(params, &mut accumulators, &coins)?;
        }

        Ok(accumulators)
    }
}
