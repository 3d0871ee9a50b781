// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::accumulators::ZerocoinParams;
use crate::primitives::{BigNum, Checksum, Denomination, Hash256};
use bincode::{Decode, Encode};
use ibig::UBig;

/// Public part of a zerocoin mint, as committed in a mint output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Encode, Decode)]
pub struct PublicCoin {
    pub value: BigNum,
    pub denomination: Denomination,
}

impl PublicCoin {
    #[must_use]
    pub fn new(value: UBig, denomination: Denomination) -> Self {
        Self {
            value: BigNum(value),
            denomination,
        }
    }

    #[must_use]
    pub fn value(&self) -> &UBig {
        &self.value.0
    }

    /// Hash of the coin value. Identifies a mint in the wallet and chain indexes.
    #[must_use]
    pub fn hash(&self) -> Hash256 {
        Hash256::hash_from_slice(self.value.to_be_bytes(), "zerocoin.pubcoin")
    }

    /// A coin is well formed when `1 < value < modulus`
    #[must_use]
    pub fn is_valid(&self, params: &ZerocoinParams) -> bool {
        let one = UBig::from(1_u8);
        self.value() > &one && self.value() < params.modulus()
    }
}

/// Hash of a serial number, revealed on spend.
#[must_use]
pub fn serial_hash(serial: &UBig) -> Hash256 {
    Hash256::hash_from_slice(serial.to_be_bytes(), "zerocoin.serial")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum SpendType {
    Spend,
    Stake,
}

/// Zerocoin spend as carried by a transaction input. The proof bytes are
/// opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct CoinSpend {
    pub version: u8,
    pub denomination: Denomination,

    /// Checksum of the accumulator the spend proves membership in
    pub accumulator_checksum: Checksum,
    pub serial: BigNum,
    pub spend_type: SpendType,

    /// Hash of the outputs the spend is bound to
    pub tx_out_hash: Hash256,
    pub proof: Vec<u8>,
}

impl CoinSpend {
    #[must_use]
    pub fn serial_hash(&self) -> Hash256 {
        serial_hash(&self.serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainConfig;

    #[test]
    fn it_validates_coin_range() {
        let config = ChainConfig::new("regtest");
        let params = config.zerocoin_params();

        assert!(!PublicCoin::new(UBig::from(0_u8), Denomination::One).is_valid(params));
        assert!(!PublicCoin::new(UBig::from(1_u8), Denomination::One).is_valid(params));
        assert!(PublicCoin::new(UBig::from(7_u8), Denomination::One).is_valid(params));
        assert!(!PublicCoin::new(params.modulus().clone(), Denomination::One).is_valid(params));
    }

    #[test]
    fn serial_hash_matches_spend() {
        let serial = UBig::from(0xabcdef_u32);
        let spend = CoinSpend {
            version: 2,
            denomination: Denomination::Ten,
            accumulator_checksum: 0,
            serial: BigNum(serial.clone()),
            spend_type: SpendType::Stake,
            tx_out_hash: Hash256::zero(),
            proof: vec![],
        };

        assert_eq!(spend.serial_hash(), serial_hash(&serial));
    }
}
