// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use static_assertions::*;
use std::cmp;

/// Money type
pub type Money = i128;

/// Smallest units per coin
pub const COIN: Money = 100_000_000;

/// Target spacing between blocks, in seconds
pub const BLOCK_TIME_SECONDS: u64 = 60;

/// Block reward paid to the staker and the masternode together
pub const BLOCK_REWARD: Money = 5 * COIN;

/// Percentage of the block reward paid to the masternode
pub const MASTERNODE_PAYMENT_PERCENT: Money = 60;

/// A mint is eligible to be staked only once the chain has advanced this many
/// blocks past it. The backing checkpoint of a zerocoin stake is resolved at
/// `tip - REQUIRED_STAKE_DEPTH`.
pub const REQUIRED_STAKE_DEPTH: u64 = 200;

/// Security level used when none is requested explicitly
pub const DEFAULT_SECURITY_LEVEL: u8 = 100;

/// Highest accepted security level
pub const MAX_SECURITY_LEVEL: u8 = 100;

/// Number of other coins a witness must fold in at `MAX_SECURITY_LEVEL`
pub const MINTS_AT_FULL_SECURITY: u64 = 10;

/// Confirmations before a mint may be spent
pub const MINT_REQUIRED_CONFIRMATIONS: u64 = 20;

/// Max zerocoin spends in a single transaction
pub const MAX_ZEROCOIN_SPENDS_PER_TRANSACTION: u32 = 7;

/// Minimum age of a UTXO before it is allowed to stake, in seconds
pub const STAKE_MIN_AGE: i64 = 60 * 60;

/// The stake modifier of a coin is taken from the first block at least `n`
/// seconds after the block backing the stake
pub const STAKE_MODIFIER_INTERVAL: i64 = 60 * 60;

/// Number of blocks the light worker scans at most for a single witness,
/// which is roughly one day of blocks
pub const WITNESS_SCAN_CEILING: u64 = 24 * 60 * 60 / BLOCK_TIME_SECONDS;

/// Default stake split threshold, in whole coins
pub const DEFAULT_STAKE_SPLIT_THRESHOLD: Money = 2_000;

/// Money check
pub fn money_check(amount: Money) -> bool {
    amount >= 0
}

/// Number of other coins that must be folded into a witness generated at
/// `security_level`. Levels are clamped to `1..=MAX_SECURITY_LEVEL`.
pub fn required_mints(security_level: u8) -> u64 {
    let level = security_level.clamp(1, MAX_SECURITY_LEVEL) as u64;
    let required = (level * MINTS_AT_FULL_SECURITY + MAX_SECURITY_LEVEL as u64 - 1)
        / MAX_SECURITY_LEVEL as u64;
    cmp::max(1, required)
}

/// Masternode share of `block_value` at `height`.
///
/// For zerocoin stakes the staker share is rounded down to whole coins, as it
/// is paid out in freshly minted denominations. The masternode receives what
/// is left.
pub fn masternode_payment(height: u64, block_value: Money, is_zerocoin_stake: bool) -> Money {
    if height == 0 || block_value <= 0 {
        return 0;
    }

    let payment = block_value * MASTERNODE_PAYMENT_PERCENT / 100;

    if is_zerocoin_stake {
        let staker = block_value - payment;
        let staker = staker - staker % COIN;
        block_value - staker
    } else {
        payment
    }
}

const_assert!(COIN > 0);
const_assert!(MASTERNODE_PAYMENT_PERCENT < 100);
const_assert!(REQUIRED_STAKE_DEPTH > MINT_REQUIRED_CONFIRMATIONS);
const_assert!(MINTS_AT_FULL_SECURITY > 0);
const_assert!(WITNESS_SCAN_CEILING > REQUIRED_STAKE_DEPTH);
const_assert_eq!(WITNESS_SCAN_CEILING, 1440);
const_assert_eq!(STAKE_MODIFIER_INTERVAL, STAKE_MIN_AGE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_money_checks() {
        assert!(!money_check(-1));
        assert!(money_check(0));
        assert!(money_check(1));
    }

    #[test]
    fn it_maps_security_level_to_required_mints() {
        assert_eq!(required_mints(0), 1);
        assert_eq!(required_mints(1), 1);
        assert_eq!(required_mints(10), 1);
        assert_eq!(required_mints(11), 2);
        assert_eq!(required_mints(50), 5);
        assert_eq!(required_mints(100), MINTS_AT_FULL_SECURITY);
        assert_eq!(required_mints(255), MINTS_AT_FULL_SECURITY);
    }

    #[test]
    fn it_computes_masternode_payment() {
        assert_eq!(masternode_payment(0, BLOCK_REWARD, false), 0);
        assert_eq!(masternode_payment(10, BLOCK_REWARD, false), 3 * COIN);
        assert_eq!(masternode_payment(10, BLOCK_REWARD, true), 3 * COIN);

        let odd_reward = 5 * COIN + COIN / 2;
        let mn = masternode_payment(10, odd_reward, true);
        assert_eq!((odd_reward - mn) % COIN, 0);
        assert!(mn >= masternode_payment(10, odd_reward, false));
    }
}
