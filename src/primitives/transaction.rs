// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::consensus::Money;
use crate::primitives::{CoinSpend, Hash160, Hash256, PublicCoin, PublicKey};
use bincode::{Decode, Encode};

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum Script {
    /// Empty script. Marks the first output of a coinstake
    Empty,
    PayToPubKey(PublicKey),
    PayToPubKeyHash(Hash160),
    ZerocoinMint(PublicCoin),
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct TxOut {
    pub value: Money,
    pub script: Script,
}

impl TxOut {
    #[must_use]
    pub fn new(value: Money, script: Script) -> Self {
        Self { value, script }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            value: 0,
            script: Script::Empty,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value == 0 && self.script == Script::Empty
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub struct OutPoint {
    pub txid: Hash256,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum TxIn {
    Coinbase { height: u64 },
    Prevout(OutPoint),
    ZerocoinSpend(CoinSpend),
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    #[must_use]
    pub fn new(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Self {
        Self {
            version: 1,
            inputs,
            outputs,
            lock_time: 0,
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        // Transactions are bounded well below the codec limit
        crate::codec::encode_to_vec(self).unwrap_or_default()
    }

    #[must_use]
    pub fn hash(&self) -> Hash256 {
        Hash256::hash_from_slice(self.to_bytes(), "transaction")
    }

    /// Coinstakes have at least one input and an empty first output
    #[must_use]
    pub fn is_coinstake(&self) -> bool {
        !self.inputs.is_empty() && self.outputs.len() >= 2 && self.outputs[0].is_empty()
    }

    /// Zerocoin mints in output order
    pub fn mints(&self) -> impl Iterator<Item = &PublicCoin> {
        self.outputs.iter().filter_map(|o| match &o.script {
            Script::ZerocoinMint(coin) => Some(coin),
            _ => None,
        })
    }

    pub fn spends(&self) -> impl Iterator<Item = &CoinSpend> {
        self.inputs.iter().filter_map(|i| match i {
            TxIn::ZerocoinSpend(spend) => Some(spend),
            _ => None,
        })
    }
}

/// Hash committing to a list of outputs, bound into zerocoin spends.
#[must_use]
pub fn hash_outputs(outputs: &[TxOut]) -> Hash256 {
    let bytes = crate::codec::encode_to_vec(&outputs.to_vec()).unwrap_or_default();
    Hash256::hash_from_slice(bytes, "transaction.outputs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Denomination;
    use ibig::UBig;

    #[test]
    fn it_lists_mints_in_output_order() {
        let a = PublicCoin::new(UBig::from(11_u8), Denomination::Ten);
        let b = PublicCoin::new(UBig::from(13_u8), Denomination::One);
        let tx = Transaction::new(
            vec![TxIn::Coinbase { height: 1 }],
            vec![
                TxOut::new(10, Script::ZerocoinMint(a.clone())),
                TxOut::new(5, Script::PayToPubKey(PublicKey::zero())),
                TxOut::new(1, Script::ZerocoinMint(b.clone())),
            ],
        );

        let mints: Vec<_> = tx.mints().cloned().collect();
        assert_eq!(mints, vec![a, b]);
    }

    #[test]
    fn it_detects_coinstake() {
        let input = TxIn::Prevout(OutPoint {
            txid: Hash256::zero(),
            index: 0,
        });
        let out = TxOut::new(1, Script::PayToPubKey(PublicKey::zero()));

        assert!(Transaction::new(vec![input.clone()], vec![TxOut::empty(), out.clone()]).is_coinstake());
        assert!(!Transaction::new(vec![input], vec![out.clone(), out]).is_coinstake());
    }

    #[test]
    fn hash_changes_with_content() {
        let tx = Transaction::new(vec![TxIn::Coinbase { height: 1 }], vec![]);
        let other = Transaction::new(vec![TxIn::Coinbase { height: 2 }], vec![]);
        assert_ne!(tx.hash(), other.hash());
        assert_eq!(tx.hash(), tx.clone().hash());
    }
}
