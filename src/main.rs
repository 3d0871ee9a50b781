// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use anyhow::anyhow;
use log::*;
use mimalloc::MiMalloc;
use parking_lot::RwLock;
use std::thread;
use std::time::Duration;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;
use triomphe::Arc;
use zerocoin_node::accumulators::{ChecksumStore, LightWorker, MemoryChecksumStore};
use zerocoin_node::chain::{ChainConfig, ChainState, MemoryBackend, SharedChainState};
use zerocoin_node::consensus::Money;
use zerocoin_node::global::*;
use zerocoin_node::settings::SETTINGS;
use zerocoin_node::wallet::{MemoryMintStore, StakeWallet, Wallet};

#[cfg(feature = "disk")]
use zerocoin_node::accumulators::store::DiskChecksumStore;

#[cfg(not(windows))]
use signal_hook::consts::TERM_SIGNALS;
#[cfg(not(windows))]
use signal_hook::flag;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> anyhow::Result<()> {
    init_tracing()?;

    #[cfg(not(windows))]
    for sig in TERM_SIGNALS {
        // A second term signal exits with code 1. The first one only arms it.
        flag::register_conditional_shutdown(*sig, 1, EXIT_SIGNAL.clone())?;
        flag::register(*sig, EXIT_SIGNAL.clone())?;
    }

    SETTINGS.validate()?;
    let mut config = ChainConfig::new(network_name(&SETTINGS.node.network_name)?);
    config.default_security_level = SETTINGS.zerocoin.security_level;
    let config = Arc::new(config);

    if SETTINGS.node.memory_only {
        info!(
            "Running Zerocoin Node v{} on {} in memory only mode",
            env!("CARGO_PKG_VERSION"),
            config.network_name()
        );
    } else {
        info!(
            "Running Zerocoin Node v{} on {}",
            env!("CARGO_PKG_VERSION"),
            config.network_name()
        );
    }

    #[cfg(feature = "disk")]
    if !SETTINGS.node.memory_only {
        let path = SETTINGS.node.checksums_dir();
        std::fs::create_dir_all(&path)?;
        let store = DiskChecksumStore::open(&path)
            .map_err(|err| anyhow!("failed to open checksum store at {path:?}: {err:?}"))?;
        return run(config, store);
    }

    run(config, MemoryChecksumStore::new())
}

fn run<S: ChecksumStore + 'static>(config: Arc<ChainConfig>, store: S) -> anyhow::Result<()> {
    let state = ChainState::new(config, MemoryBackend::new(), store)
        .map_err(|err| anyhow!("failed to load chain state: {err:?}"))?;
    let chain: SharedChainState<MemoryBackend, S> = Arc::new(RwLock::new(state));
    let height = chain
        .read()
        .height()
        .map_err(|err| anyhow!("failed to read chain height: {err:?}"))?;
    info!("Chain loaded at height {height}");

    let worker = LightWorker::with_max_blocks(chain.clone(), SETTINGS.zerocoin.witness_scan_ceiling);

    if SETTINGS.zerocoin.light_worker_enabled {
        worker.start();
    }

    // Held until shutdown, staking reads the split threshold from it
    let _staking_wallet = if SETTINGS.staking.staking_enabled {
        let config = chain.read().config().clone();
        let mut wallet =
            Wallet::from_random_seed(config.zerocoin_params().clone(), MemoryMintStore::new());
        wallet.set_stake_split_threshold(SETTINGS.staking.stake_split_threshold as Money);
        info!(
            "Staking enabled with a split threshold of {} coins",
            wallet.stake_split_threshold()
        );
        Some(wallet)
    } else {
        None
    };

    // Blocks until the exit signal is received
    while !exit_requested() {
        thread::sleep(Duration::from_millis(200));
    }

    info!(
        "Zerocoin Node v{} shutting down...",
        env!("CARGO_PKG_VERSION")
    );
    worker.stop();
    Ok(())
}

fn network_name(name: &str) -> anyhow::Result<&'static str> {
    match name {
        "mainnet" => Ok("mainnet"),
        "testnet" => Ok("testnet"),
        "regtest" => Ok("regtest"),
        other => Err(anyhow!("invalid network name: {other}")),
    }
}

/// Installs the tracing subscriber. `log` records of the library are
/// forwarded to it. Filtered through `RUST_LOG`, `info` by default.
fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}
