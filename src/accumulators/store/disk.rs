// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::accumulators::store::{ChecksumStore, ChecksumStoreErr};
use crate::primitives::{Checkpoint, Checksum, Denomination};
use ibig::UBig;
use rocksdb::{ColumnFamilyDescriptor, LogLevel, MultiThreaded, Options, TransactionDB, TransactionDBOptions};
use std::path::Path;
use triomphe::Arc;

pub type DB = TransactionDB<MultiThreaded>;

pub const CHECKSUM_VALUES_CF: &str = "checksum_values";
pub const CHECKSUM_HEIGHTS_CF: &str = "checksum_heights";

/// Checksum store backed by rocksdb
#[derive(Clone)]
pub struct DiskChecksumStore {
    db: Arc<DB>,
}

impl DiskChecksumStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self { db }
    }

    /// Opens or creates the checksum database under `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ChecksumStoreErr> {
        let mut cf_opts = Options::default();
        cf_opts.set_max_write_buffer_number(3);
        let cfs = vec![
            ColumnFamilyDescriptor::new(CHECKSUM_VALUES_CF, cf_opts.clone()),
            ColumnFamilyDescriptor::new(CHECKSUM_HEIGHTS_CF, cf_opts),
        ];

        let mut db_opts = Options::default();
        db_opts.create_missing_column_families(true);
        db_opts.create_if_missing(true);
        db_opts.set_log_level(LogLevel::Warn);
        db_opts.set_keep_log_file_num(1);
        let db = DB::open_cf_descriptors(&db_opts, &TransactionDBOptions::default(), path, cfs)?;
        Ok(Self::new(Arc::new(db)))
    }

    fn value_key(checksum: Checksum) -> [u8; 4] {
        checksum.to_be_bytes()
    }

    fn height_key(denomination: Denomination, checksum: Checksum) -> Vec<u8> {
        [&[denomination.index() as u8][..], &checksum.to_be_bytes()].concat()
    }
}

impl ChecksumStore for DiskChecksumStore {
    fn put_value(&self, checksum: Checksum, value: &UBig) -> Result<(), ChecksumStoreErr> {
        let cf = self
            .db
            .cf_handle(CHECKSUM_VALUES_CF)
            .ok_or(ChecksumStoreErr::CorruptData)?;
        self.db
            .put_cf(&cf, Self::value_key(checksum), value.to_be_bytes())?;
        Ok(())
    }

    fn get_value(&self, checksum: Checksum) -> Result<Option<UBig>, ChecksumStoreErr> {
        let cf = self
            .db
            .cf_handle(CHECKSUM_VALUES_CF)
            .ok_or(ChecksumStoreErr::CorruptData)?;
        let bytes = self.db.get_cf(&cf, Self::value_key(checksum))?;
        Ok(bytes.map(|b| UBig::from_be_bytes(&b)))
    }

    fn put_height_if_absent(
        &self,
        denomination: Denomination,
        checksum: Checksum,
        height: u64,
    ) -> Result<(), ChecksumStoreErr> {
        let cf = self
            .db
            .cf_handle(CHECKSUM_HEIGHTS_CF)
            .ok_or(ChecksumStoreErr::CorruptData)?;
        let key = Self::height_key(denomination, checksum);
        let tx = self.db.transaction();

        if tx.get_for_update_cf(&cf, &key, true)?.is_none() {
            tx.put_cf(&cf, &key, height.to_le_bytes())?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_height(
        &self,
        denomination: Denomination,
        checksum: Checksum,
    ) -> Result<Option<u64>, ChecksumStoreErr> {
        let cf = self
            .db
            .cf_handle(CHECKSUM_HEIGHTS_CF)
            .ok_or(ChecksumStoreErr::CorruptData)?;

        match self.db.get_cf(&cf, Self::height_key(denomination, checksum))? {
            Some(bytes) => {
                let bytes: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| ChecksumStoreErr::CorruptData)?;
                Ok(Some(u64::from_le_bytes(bytes)))
            }
            None => Ok(None),
        }
    }

    fn erase(
        &self,
        denomination: Denomination,
        checksum: Checksum,
    ) -> Result<(), ChecksumStoreErr> {
        let values_cf = self
            .db
            .cf_handle(CHECKSUM_VALUES_CF)
            .ok_or(ChecksumStoreErr::CorruptData)?;
        let heights_cf = self
            .db
            .cf_handle(CHECKSUM_HEIGHTS_CF)
            .ok_or(ChecksumStoreErr::CorruptData)?;
        let tx = self.db.transaction();
        tx.delete_cf(&values_cf, Self::value_key(checksum))?;
        tx.delete_cf(&heights_cf, Self::height_key(denomination, checksum))?;
        tx.commit()?;
        Ok(())
    }

    fn erase_checkpoint(
        &self,
        erase: &Checkpoint,
        previous: &Checkpoint,
    ) -> Result<(), ChecksumStoreErr> {
        let values_cf = self
            .db
            .cf_handle(CHECKSUM_VALUES_CF)
            .ok_or(ChecksumStoreErr::CorruptData)?;
        let heights_cf = self
            .db
            .cf_handle(CHECKSUM_HEIGHTS_CF)
            .ok_or(ChecksumStoreErr::CorruptData)?;
        let tx = self.db.transaction();

        for denomination in Denomination::ALL {
            let checksum = erase.checksum(denomination);

            if checksum != previous.checksum(denomination) {
                tx.delete_cf(&values_cf, Self::value_key(checksum))?;
                tx.delete_cf(&heights_cf, Self::height_key(denomination, checksum))?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}
