// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::primitives::{Denomination, DENOMINATIONS};
use bincode::{Decode, Encode};
use std::fmt;

/// 32 bit digest of a single accumulator value
pub type Checksum = u32;

const CHECKSUM_BYTES: usize = 4;

/// The accumulator checkpoint committed in every block header. Packs one
/// checksum per denomination, big-endian, with the smallest denomination in
/// the most significant slice.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Encode, Decode)]
pub struct Checkpoint(pub [u8; 32]);

impl Checkpoint {
    #[must_use]
    pub fn from_checksums(checksums: &[Checksum; DENOMINATIONS]) -> Self {
        let mut out = Self::default();

        for (denomination, checksum) in Denomination::ALL.iter().zip(checksums.iter()) {
            out.set_checksum(*denomination, *checksum);
        }

        out
    }

    #[must_use]
    pub fn checksum(&self, denomination: Denomination) -> Checksum {
        let i = denomination.index() * CHECKSUM_BYTES;
        let mut buf = [0; CHECKSUM_BYTES];
        buf.copy_from_slice(&self.0[i..i + CHECKSUM_BYTES]);
        Checksum::from_be_bytes(buf)
    }

    pub fn set_checksum(&mut self, denomination: Denomination, checksum: Checksum) {
        let i = denomination.index() * CHECKSUM_BYTES;
        self.0[i..i + CHECKSUM_BYTES].copy_from_slice(&checksum.to_be_bytes());
    }

    #[must_use]
    pub fn checksums(&self) -> [Checksum; DENOMINATIONS] {
        let mut out = [0; DENOMINATIONS];

        for d in Denomination::ALL {
            out[d.index()] = self.checksum(d);
        }

        out
    }

    /// Low 64 bits, mixed into the stake modifier of zerocoin stakes
    #[must_use]
    pub fn stake_modifier(&self) -> u64 {
        let mut buf = [0; 8];
        buf.copy_from_slice(&self.0[24..]);
        u64::from_be_bytes(buf)
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Checkpoint").field(&self.to_hex()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn smallest_denomination_is_most_significant() {
        let mut checkpoint = Checkpoint::default();
        checkpoint.set_checksum(Denomination::One, 0xdead_beef);
        assert_eq!(&checkpoint.0[..4], &[0xde, 0xad, 0xbe, 0xef]);
        assert!(checkpoint.0[4..].iter().all(|b| *b == 0));
    }

    #[test]
    fn stake_modifier_reads_two_largest_denominations() {
        let mut checkpoint = Checkpoint::default();
        checkpoint.set_checksum(Denomination::OneThousand, 1);
        checkpoint.set_checksum(Denomination::FiveThousand, 2);
        assert_eq!(checkpoint.stake_modifier(), (1 << 32) | 2);
    }

    #[quickcheck]
    fn slices_do_not_overlap(checksums: Vec<u32>, slot: usize, replacement: u32) -> bool {
        let mut packed = [0; DENOMINATIONS];
        for (i, c) in checksums.iter().take(DENOMINATIONS).enumerate() {
            packed[i] = *c;
        }

        let mut checkpoint = Checkpoint::from_checksums(&packed);
        let denomination = Denomination::ALL[slot % DENOMINATIONS];
        checkpoint.set_checksum(denomination, replacement);
        packed[denomination.index()] = replacement;

        checkpoint.checksums() == packed
    }
}
