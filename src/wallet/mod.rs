// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

pub mod denominations;
mod mint_store;

pub use denominations::*;
pub use mint_store::*;

use crate::accumulators::{GeneratedWitness, ZerocoinParams};
use crate::chain::ChainConfig;
use crate::consensus::{Money, DEFAULT_STAKE_SPLIT_THRESHOLD};
use crate::primitives::{
    serial_hash, BigNum, Block, CoinSpend, Denomination, Hash160, Hash256, PublicCoin, PublicKey,
    Script, SpendType, TxIn, TxOut,
};
use bincode::{Decode, Encode};
use ibig::UBig;
use log::*;
use parking_lot::{Mutex, RwLock};
use rand::prelude::*;
use std::collections::HashMap;
use std::fmt;
use triomphe::Arc;
use zeroize::Zeroize;

/// Version of mints generated by this wallet. Only mints of version 2 and
/// above may be staked.
pub const MINT_VERSION: u8 = 2;

const SEED_BYTES: usize = 32;

/// Private data of an owned zerocoin mint
#[derive(Clone, PartialEq, Eq, Encode, Decode)]
pub struct ZerocoinMint {
    pub version: u8,
    pub denomination: Denomination,

    /// Public coin value
    pub value: BigNum,
    pub serial: BigNum,
    pub randomness: BigNum,

    /// Derivation index of the mint
    pub index: u64,

    /// Height and transaction of the confirming block
    pub height: Option<u64>,
    pub txid: Option<Hash256>,
    pub spent_txid: Option<Hash256>,
}

impl ZerocoinMint {
    #[must_use]
    pub fn public_coin(&self) -> PublicCoin {
        PublicCoin::new(self.value.0.clone(), self.denomination)
    }

    #[must_use]
    pub fn pubcoin_hash(&self) -> Hash256 {
        self.public_coin().hash()
    }

    #[must_use]
    pub fn serial_hash(&self) -> Hash256 {
        serial_hash(&self.serial)
    }

    #[must_use]
    pub fn is_used(&self) -> bool {
        self.spent_txid.is_some()
    }

    #[must_use]
    pub fn meta(&self) -> MintMeta {
        MintMeta {
            pubcoin_hash: self.pubcoin_hash(),
            serial_hash: self.serial_hash(),
            denomination: self.denomination,
            version: self.version,
            height: self.height,
            txid: self.txid,
            spent_txid: self.spent_txid,
        }
    }
}

impl fmt::Debug for ZerocoinMint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZerocoinMint")
            .field("version", &self.version)
            .field("denomination", &self.denomination)
            .field("value", &self.value)
            .field("serial", &"[PRIVATE]")
            .field("randomness", &"[PRIVATE]")
            .field("height", &self.height)
            .field("spent_txid", &self.spent_txid)
            .finish()
    }
}

/// Public bookkeeping of an owned mint
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MintMeta {
    pub pubcoin_hash: Hash256,
    pub serial_hash: Hash256,
    pub denomination: Denomination,
    pub version: u8,
    pub height: Option<u64>,
    pub txid: Option<Hash256>,
    pub spent_txid: Option<Hash256>,
}

impl MintMeta {
    #[must_use]
    pub fn is_used(&self) -> bool {
        self.spent_txid.is_some()
    }
}

/// Wallet capabilities needed to build coinstakes
pub trait StakeWallet: Send + Sync {
    fn mint_store(&self) -> &dyn MintStore;

    /// Public key behind `key_hash` if it belongs to the wallet
    fn public_key(&self, key_hash: &Hash160) -> Option<PublicKey>;

    /// Creates a new mint and its output. The mint is not recorded.
    fn create_zerocoin_output(
        &self,
        denomination: Denomination,
    ) -> Result<(TxOut, ZerocoinMint), WalletErr>;

    /// Builds the spend of `mint` proving membership through `witness`,
    /// bound to the outputs hashing to `tx_out_hash`
    fn prove_spend(
        &self,
        mint: &ZerocoinMint,
        witness: &GeneratedWitness,
        spend_type: SpendType,
        tx_out_hash: Hash256,
    ) -> Result<CoinSpend, WalletErr>;

    /// UTXO stakes above twice this many whole coins are split in two outputs
    fn stake_split_threshold(&self) -> Money;
}

/// Zerocoin wallet deriving its mints from a seed
pub struct Wallet<M: MintStore> {
    seed: [u8; SEED_BYTES],
    next_index: Mutex<u64>,
    keys: RwLock<HashMap<Hash160, PublicKey>>,
    mints: M,
    params: Arc<ZerocoinParams>,
    stake_split_threshold: Money,
}

impl<M: MintStore> Wallet<M> {
    #[must_use]
    pub fn new(seed: [u8; SEED_BYTES], params: Arc<ZerocoinParams>, mints: M) -> Self {
        Self {
            seed,
            next_index: Mutex::new(0),
            keys: RwLock::new(HashMap::new()),
            mints,
            params,
            stake_split_threshold: DEFAULT_STAKE_SPLIT_THRESHOLD,
        }
    }

    #[must_use]
    pub fn from_random_seed(params: Arc<ZerocoinParams>, mints: M) -> Self {
        let mut rng = rand::thread_rng();
        let mut seed: [u8; SEED_BYTES] = rng.gen();
        let wallet = Self::new(seed, params, mints);
        seed.zeroize();
        wallet
    }

    pub fn set_stake_split_threshold(&mut self, threshold: Money) {
        self.stake_split_threshold = threshold;
    }

    pub fn add_key(&self, key: PublicKey) {
        self.keys.write().insert(key.to_key_hash(), key);
    }

    #[must_use]
    pub fn mints(&self) -> &M {
        &self.mints
    }

    fn derive(&self, index: u64, key: &str) -> [u8; 32] {
        let mut buf = Vec::with_capacity(SEED_BYTES + 8);
        buf.extend_from_slice(&self.seed);
        buf.extend_from_slice(&index.to_le_bytes());
        let out = Hash256::hash_from_slice(&buf, key).0;
        buf.zeroize();
        out
    }

    /// Deterministic mint at derivation `index`
    #[must_use]
    pub fn mint_at(&self, index: u64, denomination: Denomination) -> ZerocoinMint {
        let serial = UBig::from_be_bytes(&self.derive(index, "zerocoin.mint.serial"));
        let randomness = UBig::from_be_bytes(&self.derive(index, "zerocoin.mint.randomness"));

        let mut commitment_preimage = serial.to_be_bytes();
        commitment_preimage.extend_from_slice(&randomness.to_be_bytes());
        let mut commitment = Hash256::hash_from_slice(&commitment_preimage, "zerocoin.mint.commitment").0;
        commitment_preimage.zeroize();

        // Full width and odd, always a well formed coin
        commitment[0] |= 0x80;
        commitment[31] |= 0x01;

        ZerocoinMint {
            version: MINT_VERSION,
            denomination,
            value: BigNum(UBig::from_be_bytes(&commitment)),
            serial: BigNum(serial),
            randomness: BigNum(randomness),
            index,
            height: None,
            txid: None,
            spent_txid: None,
        }
    }

    /// Next mint in derivation order
    #[must_use]
    pub fn generate_mint(&self, denomination: Denomination) -> ZerocoinMint {
        let mut next_index = self.next_index.lock();
        let mint = self.mint_at(*next_index, denomination);
        *next_index += 1;
        mint
    }

    /// Chooses owned mints paying `target` at `tip`. Mints need the number of
    /// confirmations `config` requires before they may be spent.
    #[must_use]
    pub fn select_spendable_mints(
        &self,
        target: Money,
        max_spends: u64,
        minimize_change: bool,
        tip: u64,
        config: &ChainConfig,
    ) -> MintSelection {
        select_mints_from_list(
            target,
            max_spends,
            minimize_change,
            &self.mints.list_mints(),
            tip,
            config.mint_required_confirmations,
        )
    }

    /// Updates owned mints with the mints confirmed and the serials revealed in `block`
    pub fn sync_block(&self, block: &Block) -> Result<(), WalletErr> {
        for tx in &block.transactions {
            let txid = tx.hash();

            for coin in tx.mints() {
                let pubcoin_hash = coin.hash();

                if self.mints.mint_by_pubcoin_hash(&pubcoin_hash).is_some() {
                    self.mints
                        .set_mint_confirmed(&pubcoin_hash, block.height(), txid)?;
                }
            }

            for input in &tx.inputs {
                if let TxIn::ZerocoinSpend(spend) = input {
                    if let Some(meta) = self.mints.meta_by_serial_hash(&spend.serial_hash()) {
                        self.mints.set_pubcoin_used(&meta.pubcoin_hash, txid)?;
                    }
                }
            }
        }

        Ok(())
    }
}

impl<M: MintStore> StakeWallet for Wallet<M> {
    fn mint_store(&self) -> &dyn MintStore {
        &self.mints
    }

    fn public_key(&self, key_hash: &Hash160) -> Option<PublicKey> {
        self.keys.read().get(key_hash).copied()
    }

    fn create_zerocoin_output(
        &self,
        denomination: Denomination,
    ) -> Result<(TxOut, ZerocoinMint), WalletErr> {
        let mint = self.generate_mint(denomination);
        let coin = mint.public_coin();

        if !coin.is_valid(&self.params) {
            return Err(WalletErr::InvalidMint);
        }

        Ok((
            TxOut::new(denomination.amount(), Script::ZerocoinMint(coin)),
            mint,
        ))
    }

    fn prove_spend(
        &self,
        mint: &ZerocoinMint,
        witness: &GeneratedWitness,
        spend_type: SpendType,
        tx_out_hash: Hash256,
    ) -> Result<CoinSpend, WalletErr> {
        if witness.witness.element() != &mint.public_coin() {
            return Err(WalletErr::WitnessMismatch);
        }

        if !witness.witness.verify(&witness.accumulator) {
            return Err(WalletErr::InvalidWitness);
        }

        // The zero knowledge proof is produced by the proof system from
        // these bytes, the wallet only binds the witness to the outputs
        let proof = crate::codec::encode_to_vec(&(
            BigNum(witness.witness.value().clone()),
            witness.checksum,
            tx_out_hash,
        ))
        .map_err(|_| WalletErr::InvalidWitness)?;

        debug!(
            "Built {spend_type:?} spend of {} coin against checksum {:08x}",
            mint.denomination, witness.checksum
        );

        Ok(CoinSpend {
            version: mint.version,
            denomination: mint.denomination,
            accumulator_checksum: witness.checksum,
            serial: mint.serial.clone(),
            spend_type,
            tx_out_hash,
            proof,
        })
    }

    fn stake_split_threshold(&self) -> Money {
        self.stake_split_threshold
    }
}

impl<M: MintStore> Drop for Wallet<M> {
    fn drop(&mut self) {
        self.seed.zeroize();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletErr {
    /// No owned mint matches
    MintNotFound,

    /// The mint is already recorded
    DuplicateMint,

    /// The mint was already spent by `txid`
    AlreadySpent { txid: Hash256 },

    /// Generated mint is not a well formed coin
    InvalidMint,

    /// Key is not owned by the wallet
    KeyNotFound,

    /// Witness is for another coin
    WitnessMismatch,

    /// Witness does not verify against its accumulator
    InvalidWitness,
}
