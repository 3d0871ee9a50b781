// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use bincode::{Decode, Encode};
use bloomfilter::Bloom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash as HashTrait;
use zeroize::Zeroize;

const HASH_KEY_PREFIX: &str = "zerocoin.hash.";

#[inline]
fn derive_key(width: usize, key: &str) -> String {
    format!("{HASH_KEY_PREFIX}{width}.{key}")
}

#[derive(PartialEq, Eq, Encode, Decode, Clone, Copy, HashTrait, Zeroize, Serialize, Deserialize)]
pub struct Hash160(pub [u8; 20]);

impl Hash160 {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn zero() -> Self {
        Self([0; 20])
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Truncated keyed hash. The key is domain separated from the 256 bit variant.
    #[inline]
    pub fn hash_from_slice<T: AsRef<[u8]>>(slice: T, key: &str) -> Self {
        let mut out_hash = Hash160([0; 20]);
        let mut hasher = blake3::Hasher::new_derive_key(&derive_key(20, key));
        hasher.update(slice.as_ref());
        let mut out = hasher.finalize_xof();
        out.fill(&mut out_hash.0);
        out_hash
    }
}

impl fmt::Debug for Hash160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hash160").field(&self.to_hex()).finish()
    }
}

#[derive(
    PartialEq,
    Eq,
    Encode,
    Decode,
    Clone,
    HashTrait,
    Zeroize,
    PartialOrd,
    Ord,
    Default,
    Copy,
    Serialize,
    Deserialize,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn zero() -> Self {
        Self([0; 32])
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    #[inline]
    pub fn hash_from_slice<T: AsRef<[u8]>>(slice: T, key: &str) -> Self {
        let mut out_hash = Hash256([0; 32]);
        let mut hasher = blake3::Hasher::new_derive_key(&derive_key(32, key));
        hasher.update(slice.as_ref());
        let mut out = hasher.finalize_xof();
        out.fill(&mut out_hash.0);
        out_hash
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hash256").field(&self.to_hex()).finish()
    }
}

/// Staking key. Signature schemes are handled by the wallet, the node only
/// needs the key bytes to build pay-to-pubkey outputs.
#[derive(PartialEq, Eq, Encode, Decode, Clone, Copy, HashTrait, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    #[must_use]
    pub fn zero() -> Self {
        Self([0; 32])
    }

    #[must_use]
    pub fn to_key_hash(&self) -> Hash160 {
        Hash160::hash_from_slice(self.0, "pubkey")
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&hex::encode(self.0)).finish()
    }
}

/// Probabilistic set of block hashes. Used by witness requesters to tell the
/// generator which blocks can be skipped without extracting their mints.
#[derive(Debug, Clone)]
pub struct BloomFilterHash256 {
    pub inner: Bloom<Hash256>,
}

impl BloomFilterHash256 {
    #[must_use]
    pub fn new(items_count: usize, fp_rate: f64, seed: &[u8; 32]) -> Self {
        Self {
            inner: Bloom::new_for_fp_rate_with_seed(items_count, fp_rate, seed),
        }
    }

    pub fn insert(&mut self, hash: &Hash256) {
        self.inner.set(hash);
    }

    #[must_use]
    pub fn may_contain(&self, hash: &Hash256) -> bool {
        self.inner.check(hash)
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![];
        let bitmap = self.inner.bitmap();
        let bits = self.inner.number_of_bits();
        let num_hashes = self.inner.number_of_hash_functions();
        out.extend_from_slice(&num_hashes.to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(&bitmap);
        out
    }

    pub fn from_bytes(bytes: &[u8], sip_keys: [(u64, u64); 2]) -> Result<Self, &'static str> {
        if bytes.len() < 12 {
            return Err("Invalid bytes len, expected at least 12");
        }

        let mut num_bits_buf = [0; 8];
        let mut num_hashes_buf = [0; 4];
        num_hashes_buf.copy_from_slice(&bytes[..4]);
        num_bits_buf.copy_from_slice(&bytes[4..12]);
        let num_bits = u64::from_le_bytes(num_bits_buf);
        let num_hashes = u32::from_le_bytes(num_hashes_buf);

        Ok(Self {
            inner: Bloom::from_existing(&bytes[12..], num_bits, num_hashes, sip_keys),
        })
    }
}

impl PartialEq for BloomFilterHash256 {
    fn eq(&self, other: &Self) -> bool {
        self.inner.sip_keys() == other.inner.sip_keys() && self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BloomFilterHash256 {}
