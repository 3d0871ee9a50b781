// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use ibig::modular::ModuloRing;
use ibig::UBig;
use std::fmt;
use std::str::FromStr;

/// RSA-2048 factoring challenge number. Nobody knows its factorization.
const RSA_2048_MODULUS: &str = "25195908475657893494027183240048398571429282126204032027777137836043662020707595556264018525880784406918290641249515082189298559149176184502808489120072844992687392807287776735971418347270261896375014971824691165077613379859095700097330459748808428401797429100642458691817195118746121515172654632282216869987549182422433637259085141865462043576798423387184774447920739934236584823824281198163815010674810451660377306056201619676256133844143603833904414952634432190114657544454178424020924616515723350778707749817125772467962926386356373289912154831438167899885040445364023527381951378636564391212010397122822120720357";

/// RSA-100 challenge number. Factored long ago, only fit for regtest.
const RSA_100_MODULUS: &str = "1522605027922533360535618378132637429718068114961380688657908494580122963258952897654000350692006139";

/// Value every accumulator starts from
const ACCUMULATOR_BASE: u32 = 961;

pub struct ZerocoinParams {
    modulus: UBig,
    base: UBig,
    ring: ModuloRing,
}

impl ZerocoinParams {
    /// Panics if `modulus` is zero.
    #[must_use]
    pub fn new(modulus: UBig, base: UBig) -> Self {
        let ring = ModuloRing::new(&modulus);

        Self {
            modulus,
            base,
            ring,
        }
    }

    #[must_use]
    pub fn mainnet() -> Self {
        Self::from_decimal(RSA_2048_MODULUS)
    }

    #[must_use]
    pub fn regtest() -> Self {
        Self::from_decimal(RSA_100_MODULUS)
    }

    fn from_decimal(modulus: &str) -> Self {
        // Both moduli are compile time constants
        let modulus = UBig::from_str(modulus).unwrap();
        Self::new(modulus, UBig::from(ACCUMULATOR_BASE))
    }

    #[must_use]
    pub fn modulus(&self) -> &UBig {
        &self.modulus
    }

    /// Starting value of every accumulator
    #[must_use]
    pub fn accumulator_base(&self) -> &UBig {
        &self.base
    }

    /// `base ^ exponent mod N`
    #[must_use]
    pub fn pow_mod(&self, base: &UBig, exponent: &UBig) -> UBig {
        self.ring.from(base.clone()).pow(exponent).residue()
    }
}

impl fmt::Debug for ZerocoinParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZerocoinParams")
            .field("modulus_bits", &self.modulus.bit_len())
            .field("base", &self.base)
            .finish()
    }
}
