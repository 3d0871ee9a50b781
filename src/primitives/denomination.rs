// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::consensus::{Money, COIN};
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of zerocoin denominations
pub const DENOMINATIONS: usize = 8;

/// Zerocoin face value. The order of the variants is the order of the
/// checksum slices inside a checkpoint and must never change.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Encode,
    Decode,
    Serialize,
    Deserialize,
)]
pub enum Denomination {
    One,
    Five,
    Ten,
    Fifty,
    OneHundred,
    FiveHundred,
    OneThousand,
    FiveThousand,
}

impl Denomination {
    /// All denominations, smallest first
    pub const ALL: [Denomination; DENOMINATIONS] = [
        Denomination::One,
        Denomination::Five,
        Denomination::Ten,
        Denomination::Fifty,
        Denomination::OneHundred,
        Denomination::FiveHundred,
        Denomination::OneThousand,
        Denomination::FiveThousand,
    ];

    /// Face value in whole coins
    #[must_use]
    pub const fn value(&self) -> u32 {
        match self {
            Self::One => 1,
            Self::Five => 5,
            Self::Ten => 10,
            Self::Fifty => 50,
            Self::OneHundred => 100,
            Self::FiveHundred => 500,
            Self::OneThousand => 1000,
            Self::FiveThousand => 5000,
        }
    }

    /// Face value in smallest units
    #[must_use]
    pub const fn amount(&self) -> Money {
        self.value() as Money * COIN
    }

    /// Slice index inside a checkpoint
    #[must_use]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub fn from_value(value: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.value() == value)
    }

    #[must_use]
    pub fn from_amount(amount: Money) -> Option<Self> {
        if amount <= 0 || amount % COIN != 0 {
            return None;
        }

        u32::try_from(amount / COIN).ok().and_then(Self::from_value)
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}
