// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::accumulators::ZerocoinParams;
use crate::consensus::*;
use triomphe::Arc;

/// Network wide consensus configuration
#[derive(Debug, Clone)]
pub struct ChainConfig {
    network_name: &'static str,

    /// Zerocoin accumulator parameters
    zerocoin_params: Arc<ZerocoinParams>,

    /// Genesis block timestamp
    pub genesis_timestamp: i64,

    /// Depth behind the tip at which the checkpoint backing a new zerocoin
    /// stake is resolved
    pub required_stake_depth: u64,

    /// Confirmations before a mint may be spent
    pub mint_required_confirmations: u64,

    /// Security level used for stake spends
    pub default_security_level: u8,

    /// Seconds between the block backing a stake and the block providing its modifier
    pub stake_modifier_interval: i64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::new("testnet")
    }
}

impl ChainConfig {
    /// Returns the configuration of `network_name`. Unknown names fall back to
    /// testnet parameters under the given name.
    pub fn new(network_name: &'static str) -> Self {
        let (zerocoin_params, genesis_timestamp) = match network_name {
            "mainnet" => (ZerocoinParams::mainnet(), 1_700_000_000),
            "regtest" => (ZerocoinParams::regtest(), 1_600_000_000),
            _ => (ZerocoinParams::mainnet(), 1_650_000_000),
        };

        Self {
            network_name,
            zerocoin_params: Arc::new(zerocoin_params),
            genesis_timestamp,
            required_stake_depth: REQUIRED_STAKE_DEPTH,
            mint_required_confirmations: MINT_REQUIRED_CONFIRMATIONS,
            default_security_level: DEFAULT_SECURITY_LEVEL,
            stake_modifier_interval: STAKE_MODIFIER_INTERVAL,
        }
    }

    pub fn network_name(&self) -> &'static str {
        self.network_name
    }

    pub fn zerocoin_params(&self) -> &Arc<ZerocoinParams> {
        &self.zerocoin_params
    }
}
