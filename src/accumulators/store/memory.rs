// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::accumulators::store::{ChecksumStore, ChecksumStoreErr};
use crate::primitives::{Checksum, Denomination};
use ibig::UBig;
use parking_lot::RwLock;
use std::collections::HashMap;
use triomphe::Arc;

type Store<K, V> = RwLock<HashMap<K, V>>;

/// In memory checksum store. Clones share the same maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryChecksumStore {
    values: Arc<Store<Checksum, UBig>>,
    heights: Arc<Store<(Denomination, Checksum), u64>>,
}

impl MemoryChecksumStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl ChecksumStore for MemoryChecksumStore {
    fn put_value(&self, checksum: Checksum, value: &UBig) -> Result<(), ChecksumStoreErr> {
        self.values.write().insert(checksum, value.clone());
        Ok(())
    }

    fn get_value(&self, checksum: Checksum) -> Result<Option<UBig>, ChecksumStoreErr> {
        Ok(self.values.read().get(&checksum).cloned())
    }

    fn put_height_if_absent(
        &self,
        denomination: Denomination,
        checksum: Checksum,
        height: u64,
    ) -> Result<(), ChecksumStoreErr> {
        self.heights
            .write()
            .entry((denomination, checksum))
            .or_insert(height);
        Ok(())
    }

    fn get_height(
        &self,
        denomination: Denomination,
        checksum: Checksum,
    ) -> Result<Option<u64>, ChecksumStoreErr> {
        Ok(self.heights.read().get(&(denomination, checksum)).copied())
    }

    fn erase(
        &self,
        denomination: Denomination,
        checksum: Checksum,
    ) -> Result<(), ChecksumStoreErr> {
        self.values.write().remove(&checksum);
        self.heights.write().remove(&(denomination, checksum));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Checkpoint;

    #[test]
    fn first_height_sticks() {
        let store = MemoryChecksumStore::new();
        store.put_height_if_absent(Denomination::Ten, 7, 100).unwrap();
        store.put_height_if_absent(Denomination::Ten, 7, 150).unwrap();
        assert_eq!(store.get_height(Denomination::Ten, 7).unwrap(), Some(100));
        assert_eq!(store.get_height(Denomination::Five, 7).unwrap(), None);
    }

    #[test]
    fn erase_checkpoint_keeps_unchanged_slices() {
        let store = MemoryChecksumStore::new();
        let mut previous = Checkpoint::default();
        previous.set_checksum(Denomination::One, 1);
        previous.set_checksum(Denomination::Ten, 2);
        let mut erase = previous;
        erase.set_checksum(Denomination::Ten, 3);

        for (d, c, h) in [(Denomination::One, 1, 4), (Denomination::Ten, 2, 4), (Denomination::Ten, 3, 5)] {
            store.put_value(c, &UBig::from(c)).unwrap();
            store.put_height_if_absent(d, c, h).unwrap();
        }

        store.erase_checkpoint(&erase, &previous).unwrap();

        assert_eq!(store.get_value(3).unwrap(), None);
        assert_eq!(store.get_height(Denomination::Ten, 3).unwrap(), None);
        assert_eq!(store.get_value(2).unwrap(), Some(UBig::from(2_u8)));
        assert_eq!(store.get_height(Denomination::One, 1).unwrap(), Some(4));
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryChecksumStore::new();
        let clone = store.clone();
        store.put_value(9, &UBig::from(81_u8)).unwrap();
        assert_eq!(clone.get_value(9).unwrap(), Some(UBig::from(81_u8)));
    }
}
