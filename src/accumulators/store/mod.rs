// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

#[cfg(feature = "disk")]
pub mod disk;
pub mod memory;

#[cfg(feature = "disk")]
pub use disk::*;
pub use memory::*;

use crate::primitives::{Checkpoint, Checksum, Denomination};
use ibig::UBig;

/// Durable mapping of checksums to accumulator values and to the first height
/// at which a checksum was committed for a denomination.
pub trait ChecksumStore: Send + Sync {
    /// Associates `checksum` with the accumulator `value`
    fn put_value(&self, checksum: Checksum, value: &UBig) -> Result<(), ChecksumStoreErr>;

    /// Returns the accumulator value behind `checksum`
    fn get_value(&self, checksum: Checksum) -> Result<Option<UBig>, ChecksumStoreErr>;

    /// Records `height` for `checksum` unless a height is already known. The
    /// first height a checksum appeared at is the one that sticks.
    fn put_height_if_absent(
        &self,
        denomination: Denomination,
        checksum: Checksum,
        height: u64,
    ) -> Result<(), ChecksumStoreErr>;

    /// Returns the first height `checksum` was committed at for `denomination`
    fn get_height(
        &self,
        denomination: Denomination,
        checksum: Checksum,
    ) -> Result<Option<u64>, ChecksumStoreErr>;

    /// Removes both the value and the height entries of `checksum`
    fn erase(&self, denomination: Denomination, checksum: Checksum)
        -> Result<(), ChecksumStoreErr>;

    /// Removes the entries introduced by the block with checkpoint `erase`.
    /// Slices that did not change since the parent checkpoint `previous` are
    /// kept, since they are still referenced by the parent.
    fn erase_checkpoint(
        &self,
        erase: &Checkpoint,
        previous: &Checkpoint,
    ) -> Result<(), ChecksumStoreErr> {
        for denomination in Denomination::ALL {
            let checksum = erase.checksum(denomination);

            if checksum != previous.checksum(denomination) {
                self.erase(denomination, checksum)?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChecksumStoreErr {
    /// Stored bytes could not be decoded
    CorruptData,

    /// Rocksdb error
    #[cfg(feature = "disk")]
    RocksDB(rocksdb::Error),
}

#[cfg(feature = "disk")]
impl From<rocksdb::Error> for ChecksumStoreErr {
    fn from(other: rocksdb::Error) -> Self {
        Self::RocksDB(other)
    }
}
