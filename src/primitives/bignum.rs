// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use bincode::de::Decoder;
use bincode::enc::Encoder;
use bincode::error::{DecodeError, EncodeError};
use bincode::{Decode, Encode};
use ibig::UBig;
use std::fmt;
use std::ops::Deref;

/// Arbitrary precision unsigned integer as it appears on the wire.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BigNum(pub UBig);

impl BigNum {
    #[must_use]
    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.0.to_be_bytes()
    }

    #[must_use]
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        Self(UBig::from_be_bytes(bytes))
    }

    #[must_use]
    pub fn into_inner(self) -> UBig {
        self.0
    }
}

impl Deref for BigNum {
    type Target = UBig;

    fn deref(&self) -> &UBig {
        &self.0
    }
}

impl From<UBig> for BigNum {
    fn from(v: UBig) -> Self {
        Self(v)
    }
}

impl Encode for BigNum {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        crate::codec::encode_big_int(&self.0, encoder)
    }
}

impl Decode for BigNum {
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        Ok(Self(crate::codec::decode_big_int(decoder)?))
    }
}

bincode::impl_borrow_decode!(BigNum);

impl fmt::Debug for BigNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BigNum")
            .field(&hex::encode(self.to_be_bytes()))
            .finish()
    }
}
