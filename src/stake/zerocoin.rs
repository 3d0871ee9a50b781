// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::accumulators::{ChecksumStore, WitnessGenerator, WitnessRequest};
use crate::chain::{ChainBackend, ChainState};
use crate::consensus::{masternode_payment, Money};
use crate::primitives::{
    BlockHeader, Checksum, CoinSpend, Denomination, Hash256, SpendType, TxIn, TxOut,
};
use crate::stake::StakeErr;
use crate::wallet::{calculate_outputs, whole_coins, StakeWallet, ZerocoinMint};
use log::*;

/// Minimum mint version that may be staked
pub const MIN_STAKE_MINT_VERSION: u8 = 2;

/// Stake backed by a zerocoin mint, identified by its serial hash.
///
/// The backing block is the first block at which the accumulator checksum
/// used by the stake appears. Built from an owned mint the checksum is read
/// `required_stake_depth` blocks behind the tip; rebuilt from a received
/// spend it is the checksum the spend proves against. Both must resolve to
/// the same block for the same coin.
#[derive(Debug, Clone)]
pub struct ZerocoinStake {
    checksum: Option<Checksum>,
    denomination: Denomination,
    serial_hash: Hash256,
    from_mint: bool,
    index_from: Option<BlockHeader>,
}

impl ZerocoinStake {
    /// Stake of an owned mint, as built by the staking wallet
    #[must_use]
    pub fn new_from_mint(mint: &ZerocoinMint) -> Self {
        Self {
            checksum: None,
            denomination: mint.denomination,
            serial_hash: mint.serial_hash(),
            from_mint: true,
            index_from: None,
        }
    }

    /// Stake reconstructed from the spend in a received coinstake
    #[must_use]
    pub fn new_from_spend(spend: &CoinSpend) -> Self {
        Self {
            checksum: Some(spend.accumulator_checksum),
            denomination: spend.denomination,
            serial_hash: spend.serial_hash(),
            from_mint: false,
            index_from: None,
        }
    }

    #[must_use]
    pub fn value(&self) -> Money {
        self.denomination.amount()
    }

    #[must_use]
    pub fn denomination(&self) -> Denomination {
        self.denomination
    }

    #[must_use]
    pub fn serial_hash(&self) -> &Hash256 {
        &self.serial_hash
    }

    /// Checksum backing the stake, once resolved
    #[must_use]
    pub fn checksum(&self) -> Option<Checksum> {
        self.checksum
    }

    fn checksum_height_from_mint<B: ChainBackend, S: ChecksumStore>(
        &mut self,
        state: &ChainState<B, S>,
    ) -> Result<u64, StakeErr> {
        let tip = state.height()?;
        let depth = state.config().required_stake_depth;
        let height = tip.checked_sub(depth).ok_or(StakeErr::IndexFromNotFound)?;
        let checksum = state
            .backend()
            .expect_header(height)?
            .accumulator_checkpoint
            .checksum(self.denomination);

        self.checksum = Some(checksum);

        // First occurrence, so that validators reading the spend land on
        // the same block
        Ok(state
            .accumulators()
            .checksum_height(checksum, self.denomination)?)
    }

    fn checksum_height_from_spend<B: ChainBackend, S: ChecksumStore>(
        &self,
        state: &ChainState<B, S>,
    ) -> Result<u64, StakeErr> {
        let checksum = self.checksum.ok_or(StakeErr::IndexFromNotFound)?;
        Ok(state
            .accumulators()
            .checksum_height(checksum, self.denomination)?)
    }

    /// Block backing the stake. Cached once found.
    pub fn index_from<B: ChainBackend, S: ChecksumStore>(
        &mut self,
        state: &ChainState<B, S>,
    ) -> Result<BlockHeader, StakeErr> {
        if let Some(header) = &self.index_from {
            return Ok(header.clone());
        }

        let height = if self.from_mint {
            self.checksum_height_from_mint(state)?
        } else {
            self.checksum_height_from_spend(state)?
        };

        if height > state.height()? {
            return Err(StakeErr::IndexFromNotFound);
        }

        let header = state
            .backend()
            .header_at_height(height)?
            .ok_or(StakeErr::IndexFromNotFound)?;
        self.index_from = Some(header.clone());
        Ok(header)
    }

    /// Stake modifier taken from the checkpoint of the first block at least
    /// the stake modifier interval after the backing block
    pub fn modifier<B: ChainBackend, S: ChecksumStore>(
        &mut self,
        state: &ChainState<B, S>,
    ) -> Result<u64, StakeErr> {
        let from = self.index_from(state)?;
        let interval = state.config().stake_modifier_interval;
        let tip = state.height()?;

        for height in from.height..=tip {
            let header = state.backend().expect_header(height)?;

            if header.timestamp - from.timestamp >= interval {
                return Ok(header.accumulator_checkpoint.stake_modifier());
            }
        }

        Err(StakeErr::ModifierNotAvailable)
    }

    /// Unique identifier of the stake, the serial hash
    #[must_use]
    pub fn uniqueness(&self) -> Vec<u8> {
        self.serial_hash.as_bytes().to_vec()
    }

    /// Spends the staked mint with a witness ending exactly at the backing
    /// block, at the security level of the chain configuration
    pub fn create_tx_in<B: ChainBackend, S: ChecksumStore>(
        &mut self,
        wallet: &dyn StakeWallet,
        state: &ChainState<B, S>,
        tx_out_hash: Hash256,
    ) -> Result<TxIn, StakeErr> {
        let from = self.index_from(state)?;
        let mint = wallet
            .mint_store()
            .mint_by_serial_hash(&self.serial_hash)
            .ok_or(StakeErr::MintNotFound)?;

        if mint.version < MIN_STAKE_MINT_VERSION {
            return Err(StakeErr::MintVersion {
                version: mint.version,
            });
        }

        let req = WitnessRequest {
            coin: mint.public_coin(),
            start_height: u64::MAX,
            security_level: state.config().default_security_level,
            max_blocks: from.height,
            target_height: Some(from.height),
            filter: None,
        };
        let generated = WitnessGenerator::new(state.backend(), state.accumulators()).generate(&req)?;

        if Some(generated.checksum) != self.checksum {
            error!(
                "Stake witness checksum {:08x} differs from backing checksum {:?}",
                generated.checksum, self.checksum
            );
            return Err(StakeErr::IndexFromNotFound);
        }

        let spend = wallet.prove_spend(&mint, &generated, SpendType::Stake, tx_out_hash)?;
        Ok(TxIn::ZerocoinSpend(spend))
    }

    /// Re-mints the staked denomination and mints the staker share of
    /// `reward` in standard denominations. Every new mint is recorded in the
    /// wallet before the outputs are returned.
    ///
    /// The masternode share is always withheld from the minted reward. When
    /// the block pays no masternode that share is forfeited.
    pub fn create_tx_outs(
        &self,
        wallet: &dyn StakeWallet,
        reward: Money,
        height: u64,
    ) -> Result<Vec<TxOut>, StakeErr> {
        let mut outputs = vec![];
        let (out, mint) = wallet.create_zerocoin_output(self.denomination)?;
        wallet.mint_store().record_mint(mint)?;
        outputs.push(out);

        let masternode = masternode_payment(height, reward, true);
        let to_mint = reward - masternode;
        info!(
            "Zerocoin stake reward: total={} masternode={} staker={}",
            whole_coins(reward),
            whole_coins(masternode),
            whole_coins(to_mint)
        );

        let (mints, _) = calculate_outputs(to_mint);

        for (denomination, count) in mints {
            for _ in 0..count {
                let (out, mint) = wallet.create_zerocoin_output(denomination)?;
                wallet.mint_store().record_mint(mint)?;
                outputs.push(out);
            }
        }

        Ok(outputs)
    }

    /// Marks the staked mint spent by `txid` in the wallet
    pub fn mark_spent(&self, wallet: &dyn StakeWallet, txid: Hash256) -> Result<(), StakeErr> {
        let meta = wallet
            .mint_store()
            .meta_by_serial_hash(&self.serial_hash)
            .ok_or_else(|| {
                error!("Wallet has no mint with serial hash {:?}", self.serial_hash);
                StakeErr::MintNotFound
            })?;

        wallet.mint_store().set_pubcoin_used(&meta.pubcoin_hash, txid)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulators::{AccumulatorErr, WitnessErr};
    use crate::chain::tests::{coin, mint_tx, TestChain};
    use crate::chain::ChainConfig;
    use crate::consensus::{BLOCK_REWARD, COIN};
    use crate::primitives::{Script, Transaction};
    use crate::wallet::{MemoryMintStore, MintStore, Wallet};

    struct Staking {
        chain: TestChain,
        wallet: Wallet<MemoryMintStore>,
        mint: ZerocoinMint,
    }

    fn staking_chain(depth: u64, mint_height: u64, others: u64, tip: u64) -> Staking {
        let mut config = ChainConfig::new("regtest");
        config.required_stake_depth = depth;
        staking_chain_with(config, mint_height, others, tip)
    }

    /// Mines `mint_height - 1` empty blocks, the wallet mint at `mint_height`,
    /// `others` blocks with one more coin of the same denomination each and
    /// empty blocks up to `tip`
    fn staking_chain_with(config: ChainConfig, mint_height: u64, others: u64, tip: u64) -> Staking {
        let mut chain = TestChain::with_config(config);
        let wallet = Wallet::new(
            [11; 32],
            chain.state.config().zerocoin_params().clone(),
            MemoryMintStore::new(),
        );

        chain.mine_empty(mint_height - 1);
        let (out, mint) = wallet.create_zerocoin_output(Denomination::Ten).unwrap();
        wallet.mints().record_mint(mint.clone()).unwrap();
        let mut tx = mint_tx(mint_height, vec![]);
        tx.outputs.push(out);
        let block = chain.mine_with(vec![tx]);
        wallet.sync_block(&block).unwrap();

        for i in 0..others {
            chain.mine(vec![coin(i, Denomination::Ten)]);
        }

        chain.mine_empty(tip - chain.state.height().unwrap());
        let mint = wallet.mints().mint_by_serial_hash(&mint.serial_hash()).unwrap();

        Staking {
            chain,
            wallet,
            mint,
        }
    }

    #[test]
    fn mint_and_spend_paths_resolve_same_block() {
        let staking = staking_chain(200, 1000, 12, 1300);
        let state = &staking.chain.state;
        let mut from_mint = ZerocoinStake::new_from_mint(&staking.mint);
        let index_from = from_mint.index_from(state).unwrap();

        // The denomination checksum last changed with the twelfth extra mint
        assert_eq!(index_from.height, 1012);

        let tx_in = from_mint
            .create_tx_in(&staking.wallet, state, Hash256::zero())
            .unwrap();
        let TxIn::ZerocoinSpend(spend) = tx_in else {
            panic!("expected a zerocoin spend");
        };
        assert_eq!(spend.spend_type, SpendType::Stake);
        assert_eq!(Some(spend.accumulator_checksum), from_mint.checksum());

        let mut from_spend = ZerocoinStake::new_from_spend(&spend);
        assert_eq!(from_spend.index_from(state).unwrap(), index_from);
        assert_eq!(from_spend.uniqueness(), from_mint.uniqueness());
        assert_eq!(
            from_spend.modifier(state).unwrap(),
            from_mint.modifier(state).unwrap()
        );
    }

    #[test]
    fn modifier_is_an_hour_after_backing_block() {
        let staking = staking_chain(20, 5, 12, 120);
        let state = &staking.chain.state;
        let mut stake = ZerocoinStake::new_from_mint(&staking.mint);
        let from = stake.index_from(state).unwrap();
        assert_eq!(from.height, 17);

        let expected = state
            .backend()
            .expect_header(from.height + 60)
            .unwrap()
            .accumulator_checkpoint
            .stake_modifier();
        assert_eq!(stake.modifier(state).unwrap(), expected);
    }

    #[test]
    fn modifier_needs_an_hour_of_chain() {
        let staking = staking_chain(20, 5, 12, 60);
        let mut stake = ZerocoinStake::new_from_mint(&staking.mint);
        assert!(matches!(
            stake.modifier(&staking.chain.state),
            Err(StakeErr::ModifierNotAvailable)
        ));
    }

    #[test]
    fn too_short_chain_has_no_backing_block() {
        let staking = staking_chain(200, 5, 0, 50);
        let mut stake = ZerocoinStake::new_from_mint(&staking.mint);
        assert!(matches!(
            stake.index_from(&staking.chain.state),
            Err(StakeErr::IndexFromNotFound)
        ));
    }

    #[test]
    fn unknown_spend_checksum_is_rejected() {
        let staking = staking_chain(20, 5, 12, 60);
        let spend = CoinSpend {
            version: 2,
            denomination: Denomination::Ten,
            accumulator_checksum: 0xdead_beef,
            serial: staking.mint.serial.clone(),
            spend_type: SpendType::Stake,
            tx_out_hash: Hash256::zero(),
            proof: vec![],
        };
        let mut stake = ZerocoinStake::new_from_spend(&spend);
        assert!(matches!(
            stake.index_from(&staking.chain.state),
            Err(StakeErr::Accumulator(_))
        ));
    }

    #[test]
    fn stake_witness_uses_configured_security_level() {
        // Backed by the fifth extra mint at height 10
        let full = staking_chain(20, 5, 5, 60);
        let mut stake = ZerocoinStake::new_from_mint(&full.mint);
        assert!(matches!(
            stake.create_tx_in(&full.wallet, &full.chain.state, Hash256::zero()),
            Err(StakeErr::Witness(WitnessErr::NotEnoughMints {
                mints_added: 5,
                required: 10,
                ..
            }))
        ));

        let mut config = ChainConfig::new("regtest");
        config.required_stake_depth = 20;
        config.default_security_level = 50;
        let half = staking_chain_with(config, 5, 5, 60);
        let mut stake = ZerocoinStake::new_from_mint(&half.mint);
        let tx_in = stake
            .create_tx_in(&half.wallet, &half.chain.state, Hash256::zero())
            .unwrap();
        assert!(matches!(tx_in, TxIn::ZerocoinSpend(_)));
        assert_eq!(stake.index_from(&half.chain.state).unwrap().height, 10);
    }

    #[test]
    fn stake_resolves_on_the_fork_after_a_reorg() {
        let mut staking = staking_chain(20, 5, 5, 60);
        let old_checksum = staking
            .chain
            .state
            .backend()
            .expect_header(10)
            .unwrap()
            .accumulator_checkpoint
            .checksum(Denomination::Ten);

        // Replace the last extra mint with another coin on a new fork
        staking.chain.state.disconnect_to(9).unwrap();
        staking.chain.mine(vec![coin(77, Denomination::Ten)]);
        staking.chain.mine_empty(50);

        let state = &staking.chain.state;
        let new_checksum = state
            .backend()
            .expect_header(10)
            .unwrap()
            .accumulator_checkpoint
            .checksum(Denomination::Ten);
        assert_ne!(old_checksum, new_checksum);

        let mut stake = ZerocoinStake::new_from_mint(&staking.mint);
        assert_eq!(stake.index_from(state).unwrap().height, 10);
        assert_eq!(stake.checksum(), Some(new_checksum));

        let spend = CoinSpend {
            version: 2,
            denomination: Denomination::Ten,
            accumulator_checksum: old_checksum,
            serial: staking.mint.serial.clone(),
            spend_type: SpendType::Stake,
            tx_out_hash: Hash256::zero(),
            proof: vec![],
        };
        let mut stale = ZerocoinStake::new_from_spend(&spend);
        assert!(matches!(
            stale.index_from(state),
            Err(StakeErr::Accumulator(AccumulatorErr::ChecksumNotFound { .. }))
        ));
    }

    #[test]
    fn old_mint_versions_cannot_stake() {
        let staking = staking_chain(20, 5, 12, 60);
        let mut old = staking.wallet.mint_at(500, Denomination::Ten);
        old.version = 1;
        staking.wallet.mints().record_mint(old.clone()).unwrap();

        let mut stake = ZerocoinStake::new_from_mint(&old);
        assert!(matches!(
            stake.create_tx_in(&staking.wallet, &staking.chain.state, Hash256::zero()),
            Err(StakeErr::MintVersion { version: 1 })
        ));
    }

    #[test]
    fn tx_outs_are_recorded_in_the_wallet() {
        let staking = staking_chain(20, 5, 0, 10);
        let stake = ZerocoinStake::new_from_mint(&staking.mint);
        let before = staking.wallet.mints().len();

        // 5 coins of reward, 3 to the masternode, 2 minted as ones
        let outputs = stake
            .create_tx_outs(&staking.wallet, BLOCK_REWARD, 11)
            .unwrap();
        let values: Vec<_> = outputs.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![10 * COIN, COIN, COIN]);
        assert_eq!(staking.wallet.mints().len(), before + 3);

        for out in &outputs {
            let Script::ZerocoinMint(coin) = &out.script else {
                panic!("expected a mint output");
            };
            assert!(staking.wallet.mints().mint_by_pubcoin_hash(&coin.hash()).is_some());
        }
    }

    #[test]
    fn masternode_share_is_withheld_without_a_payee() {
        let staking = staking_chain(20, 5, 0, 10);
        let stake = ZerocoinStake::new_from_mint(&staking.mint);

        let outputs = stake
            .create_tx_outs(&staking.wallet, BLOCK_REWARD, 11)
            .unwrap();
        let minted: Money = outputs.iter().skip(1).map(|o| o.value).sum();
        assert_eq!(minted, BLOCK_REWARD - masternode_payment(11, BLOCK_REWARD, true));
        assert_eq!(minted, 2 * COIN);
    }

    #[test]
    fn mark_spent_requires_the_wallet_record() {
        let staking = staking_chain(20, 5, 0, 10);
        let stake = ZerocoinStake::new_from_mint(&staking.mint);
        let txid = Transaction::new(vec![], vec![]).hash();

        stake.mark_spent(&staking.wallet, txid).unwrap();
        assert!(staking
            .wallet
            .mints()
            .meta_by_serial_hash(&staking.mint.serial_hash())
            .unwrap()
            .is_used());

        let stranger = ZerocoinStake::new_from_mint(&staking.wallet.mint_at(900, Denomination::Ten));
        assert!(matches!(
            stranger.mark_spent(&staking.wallet, txid),
            Err(StakeErr::MintNotFound)
        ));
    }
}
