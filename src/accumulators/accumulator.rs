// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::accumulators::{checksum_of, AccumulatorErr, ZerocoinParams};
use crate::primitives::{Checksum, Denomination, PublicCoin};
use ibig::UBig;
use std::fmt;
use triomphe::Arc;

/// RSA accumulator over the public coins of a single denomination.
#[derive(Clone)]
pub struct Accumulator {
    params: Arc<ZerocoinParams>,
    denomination: Denomination,
    value: UBig,
}

impl Accumulator {
    /// Empty accumulator, as of genesis
    #[must_use]
    pub fn new(params: Arc<ZerocoinParams>, denomination: Denomination) -> Self {
        let value = params.accumulator_base().clone();
        Self::with_value(params, denomination, value)
    }

    #[must_use]
    pub fn with_value(params: Arc<ZerocoinParams>, denomination: Denomination, value: UBig) -> Self {
        Self {
            params,
            denomination,
            value,
        }
    }

    /// Folds `coin` into the accumulator: `value = value ^ coin mod N`
    pub fn accumulate(&mut self, coin: &PublicCoin) -> Result<(), AccumulatorErr> {
        if coin.denomination != self.denomination {
            return Err(AccumulatorErr::WrongDenomination);
        }

        if !coin.is_valid(&self.params) {
            return Err(AccumulatorErr::InvalidCoin);
        }

        self.value = self.params.pow_mod(&self.value, coin.value());
        Ok(())
    }

    #[must_use]
    pub fn value(&self) -> &UBig {
        &self.value
    }

    #[must_use]
    pub fn denomination(&self) -> Denomination {
        self.denomination
    }

    #[must_use]
    pub fn checksum(&self) -> Checksum {
        checksum_of(&self.value)
    }

    #[must_use]
    pub fn params(&self) -> &Arc<ZerocoinParams> {
        &self.params
    }
}

impl PartialEq for Accumulator {
    fn eq(&self, other: &Self) -> bool {
        self.denomination == other.denomination && self.value == other.value
    }
}

impl Eq for Accumulator {}

impl fmt::Debug for Accumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accumulator")
            .field("denomination", &self.denomination)
            .field("checksum", &self.checksum())
            .finish()
    }
}

/// Membership witness of `element`. Holds the accumulation of every coin
/// except the element itself.
#[derive(Clone, Debug)]
pub struct AccumulatorWitness {
    witness: Accumulator,
    element: PublicCoin,
}

impl AccumulatorWitness {
    /// Starts a witness from an accumulator state that does not contain `element`
    #[must_use]
    pub fn new(checkpoint: Accumulator, element: PublicCoin) -> Self {
        Self {
            witness: checkpoint,
            element,
        }
    }

    /// Folds `coin` into the witness unless it is the element itself
    pub fn add_element(&mut self, coin: &PublicCoin) -> Result<(), AccumulatorErr> {
        if coin == &self.element {
            return Ok(());
        }

        self.witness.accumulate(coin)
    }

    #[must_use]
    pub fn value(&self) -> &UBig {
        self.witness.value()
    }

    #[must_use]
    pub fn element(&self) -> &PublicCoin {
        &self.element
    }

    /// `witness ^ element mod N == accumulator`. A witness only verifies
    /// against the exact accumulator state it was generated for.
    #[must_use]
    pub fn verify(&self, accumulator: &Accumulator) -> bool {
        if accumulator.denomination() != self.element.denomination
            || self.witness.denomination() != self.element.denomination
        {
            return false;
        }

        let params = self.witness.params();
        &params.pow_mod(self.witness.value(), self.element.value()) == accumulator.value()
    }
}
