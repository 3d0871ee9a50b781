// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use bincode::enc::write::Writer;
use ibig::UBig;

pub const CODEC_BYTES_LIMIT: usize = 1_000_000;

/// Upper bound for an encoded big integer. Fits a 4096 bit value.
pub const BIG_INT_BYTES_LIMIT: usize = 512;

pub fn encode_to_vec<T: bincode::Encode>(val: &T) -> Result<Vec<u8>, bincode::error::EncodeError> {
    let config = bincode::config::standard()
        .with_little_endian()
        .with_variable_int_encoding()
        .with_limit::<CODEC_BYTES_LIMIT>();

    bincode::encode_to_vec(val, config)
}

pub fn encode<W: Writer, T: bincode::Encode>(
    writer: W,
    val: &T,
) -> Result<(), bincode::error::EncodeError> {
    let config = bincode::config::standard()
        .with_little_endian()
        .with_variable_int_encoding()
        .with_limit::<CODEC_BYTES_LIMIT>();

    bincode::encode_into_writer(val, writer, config)
}

pub fn decode<T: bincode::Decode>(bytes: &[u8]) -> Result<T, bincode::error::DecodeError> {
    let config = bincode::config::standard()
        .with_little_endian()
        .with_variable_int_encoding()
        .with_limit::<CODEC_BYTES_LIMIT>();

    bincode::decode_from_slice(bytes, config).map(|r| r.0)
}

/// Big integers travel as length prefixed big-endian bytes.
#[inline]
pub fn encode_big_int<E: bincode::enc::Encoder>(
    value: &UBig,
    encoder: &mut E,
) -> Result<(), bincode::error::EncodeError> {
    let bytes = value.to_be_bytes();

    if bytes.len() > BIG_INT_BYTES_LIMIT {
        return Err(bincode::error::EncodeError::Other("big integer too large"));
    }

    bincode::Encode::encode(&bytes, encoder)
}

#[inline]
pub fn decode_big_int<D: bincode::de::Decoder>(
    decoder: &mut D,
) -> Result<UBig, bincode::error::DecodeError> {
    let bytes: Vec<u8> = bincode::Decode::decode(decoder)?;

    if bytes.len() > BIG_INT_BYTES_LIMIT {
        return Err(bincode::error::DecodeError::Other("big integer too large"));
    }

    Ok(UBig::from_be_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(bincode::Encode, bincode::Decode, Debug, PartialEq)]
    struct Sample {
        height: u64,
        payload: Vec<u8>,
    }

    #[test]
    fn it_encodes_and_decodes() {
        let sample = Sample {
            height: 1300,
            payload: vec![1, 2, 3],
        };
        let bytes = encode_to_vec(&sample).unwrap();
        assert_eq!(decode::<Sample>(&bytes).unwrap(), sample);
    }

    #[test]
    fn it_uses_variable_int_encoding() {
        let bytes = encode_to_vec(&7_u64).unwrap();
        assert_eq!(bytes.len(), 1);
    }

    #[test]
    fn it_rejects_truncated_input() {
        let sample = Sample {
            height: u64::MAX,
            payload: vec![9; 64],
        };
        let bytes = encode_to_vec(&sample).unwrap();
        assert!(decode::<Sample>(&bytes[..bytes.len() - 1]).is_err());
    }
}
