// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

//! # Zerocoin node
//! Accumulator and staking core of a proof of stake node with zerocoin privacy.
//!
//! ## Components
//! * **Accumulators**: one RSA accumulator per coin denomination, folded block by block and
//!   checkpointed into every block header. Checksums of past accumulator values are kept in a
//!   `ChecksumStore` so that any historical accumulator can be restored.
//! * **Witnesses**: membership witnesses for a coin are rebuilt by rescanning the chain from just
//!   before its mint, either inline through `WitnessGenerator` or off the critical path through
//!   the `LightWorker`.
//! * **Staking**: `StakeInput` lets the coinstake builder treat plain outputs and zerocoin mints
//!   the same way. Zerocoin stakes resolve their backing block from the accumulator checksums so
//!   that every node agrees on it.
//! * **Wallet**: owned mints, denomination selection and the wallet side of staking.

pub mod accumulators;
pub mod chain;
pub mod codec;
pub mod consensus;
pub mod global;
pub mod primitives;
pub mod settings;
pub mod stake;
pub mod wallet;
