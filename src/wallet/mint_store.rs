// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::primitives::Hash256;
use crate::wallet::{MintMeta, WalletErr, ZerocoinMint};
use log::*;
use parking_lot::Mutex;
use std::collections::HashMap;
use triomphe::Arc;

/// Wallet side record of owned mints.
///
/// Shared between the staking path and the spend path. Implementations must
/// serialise writers so that two concurrent stakes cannot both mark the same
/// coin spent.
pub trait MintStore: Send + Sync {
    /// Records a freshly created mint. Fails if it is already known.
    fn record_mint(&self, mint: ZerocoinMint) -> Result<(), WalletErr>;

    fn mint_by_serial_hash(&self, serial_hash: &Hash256) -> Option<ZerocoinMint>;

    fn mint_by_pubcoin_hash(&self, pubcoin_hash: &Hash256) -> Option<ZerocoinMint>;

    /// Records the block and transaction a mint was confirmed in
    fn set_mint_confirmed(
        &self,
        pubcoin_hash: &Hash256,
        height: u64,
        txid: Hash256,
    ) -> Result<(), WalletErr>;

    /// Marks a mint as spent by `txid`. Marking it again with the same
    /// transaction is a no-op, with a different one an error.
    fn set_pubcoin_used(&self, pubcoin_hash: &Hash256, txid: Hash256) -> Result<(), WalletErr>;

    /// Metadata of every known mint
    fn list_mints(&self) -> Vec<MintMeta>;

    fn meta_by_serial_hash(&self, serial_hash: &Hash256) -> Option<MintMeta> {
        self.mint_by_serial_hash(serial_hash).map(|mint| mint.meta())
    }
}

#[derive(Default)]
struct MintIndex {
    /// Pubcoin hash to mint
    mints: HashMap<Hash256, ZerocoinMint>,

    /// Serial hash to pubcoin hash
    serials: HashMap<Hash256, Hash256>,
}

/// In memory mint store. Clones share the same records.
#[derive(Clone, Default)]
pub struct MemoryMintStore {
    index: Arc<Mutex<MintIndex>>,
}

impl MemoryMintStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.lock().mints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MintStore for MemoryMintStore {
    fn record_mint(&self, mint: ZerocoinMint) -> Result<(), WalletErr> {
        let mut index = self.index.lock();
        let pubcoin_hash = mint.pubcoin_hash();

        if index.mints.contains_key(&pubcoin_hash) {
            return Err(WalletErr::DuplicateMint);
        }

        index.serials.insert(mint.serial_hash(), pubcoin_hash);
        index.mints.insert(pubcoin_hash, mint);
        Ok(())
    }

    fn mint_by_serial_hash(&self, serial_hash: &Hash256) -> Option<ZerocoinMint> {
        let index = self.index.lock();
        index
            .serials
            .get(serial_hash)
            .and_then(|pubcoin_hash| index.mints.get(pubcoin_hash))
            .cloned()
    }

    fn mint_by_pubcoin_hash(&self, pubcoin_hash: &Hash256) -> Option<ZerocoinMint> {
        self.index.lock().mints.get(pubcoin_hash).cloned()
    }

    fn set_mint_confirmed(
        &self,
        pubcoin_hash: &Hash256,
        height: u64,
        txid: Hash256,
    ) -> Result<(), WalletErr> {
        let mut index = self.index.lock();
        let mint = index
            .mints
            .get_mut(pubcoin_hash)
            .ok_or(WalletErr::MintNotFound)?;

        mint.height = Some(height);
        mint.txid = Some(txid);
        Ok(())
    }

    fn set_pubcoin_used(&self, pubcoin_hash: &Hash256, txid: Hash256) -> Result<(), WalletErr> {
        let mut index = self.index.lock();
        let mint = index
            .mints
            .get_mut(pubcoin_hash)
            .ok_or(WalletErr::MintNotFound)?;

        match mint.spent_txid {
            Some(spent) if spent == txid => Ok(()),
            Some(spent) => {
                warn!("Mint {pubcoin_hash:?} is already spent in {spent:?}");
                Err(WalletErr::AlreadySpent { txid: spent })
            }
            None => {
                mint.spent_txid = Some(txid);
                Ok(())
            }
        }
    }

    fn list_mints(&self) -> Vec<MintMeta> {
        self.index
            .lock()
            .mints
            .values()
            .map(ZerocoinMint::meta)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainConfig;
    use crate::primitives::Denomination;
    use crate::wallet::Wallet;
    use std::thread;

    fn mint(index: u64) -> ZerocoinMint {
        let config = ChainConfig::new("regtest");
        let wallet = Wallet::new([1; 32], config.zerocoin_params().clone(), MemoryMintStore::new());
        wallet.mint_at(index, Denomination::Ten)
    }

    #[test]
    fn it_records_and_fetches_mints() {
        let store = MemoryMintStore::new();
        let mint = mint(0);
        store.record_mint(mint.clone()).unwrap();

        assert_eq!(store.record_mint(mint.clone()), Err(WalletErr::DuplicateMint));
        assert_eq!(store.mint_by_serial_hash(&mint.serial_hash()), Some(mint.clone()));
        assert_eq!(store.mint_by_pubcoin_hash(&mint.pubcoin_hash()), Some(mint.clone()));
        assert_eq!(store.meta_by_serial_hash(&mint.serial_hash()), Some(mint.meta()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn it_confirms_mints() {
        let store = MemoryMintStore::new();
        let mint = mint(1);
        let txid = Hash256::hash_from_slice([1_u8], "test");
        store.record_mint(mint.clone()).unwrap();
        store.set_mint_confirmed(&mint.pubcoin_hash(), 42, txid).unwrap();

        let meta = store.list_mints().pop().unwrap();
        assert_eq!(meta.height, Some(42));
        assert_eq!(meta.txid, Some(txid));
        assert_eq!(
            store.set_mint_confirmed(&Hash256::zero(), 1, txid),
            Err(WalletErr::MintNotFound)
        );
    }

    #[test]
    fn it_rejects_double_spend_marks() {
        let store = MemoryMintStore::new();
        let mint = mint(2);
        let first = Hash256::hash_from_slice([1_u8], "test");
        let second = Hash256::hash_from_slice([2_u8], "test");
        store.record_mint(mint.clone()).unwrap();

        store.set_pubcoin_used(&mint.pubcoin_hash(), first).unwrap();
        store.set_pubcoin_used(&mint.pubcoin_hash(), first).unwrap();
        assert_eq!(
            store.set_pubcoin_used(&mint.pubcoin_hash(), second),
            Err(WalletErr::AlreadySpent { txid: first })
        );
    }

    #[test]
    fn concurrent_spends_mark_once() {
        let store = MemoryMintStore::new();
        let mint = mint(3);
        store.record_mint(mint.clone()).unwrap();

        let handles: Vec<_> = (0..8_u8)
            .map(|i| {
                let store = store.clone();
                let pubcoin_hash = mint.pubcoin_hash();
                thread::spawn(move || {
                    store
                        .set_pubcoin_used(&pubcoin_hash, Hash256::hash_from_slice([i], "test"))
                        .is_ok()
                })
            })
            .collect();

        let succeeded = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(succeeded, 1);
    }
}
