// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use lazy_static::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

lazy_static! {
    /// Set once a termination signal is received. Shared with `signal-hook`,
    /// hence the std `Arc`.
    pub static ref EXIT_SIGNAL: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
}

/// Returns true once the node has been asked to shut down
pub fn exit_requested() -> bool {
    EXIT_SIGNAL.load(Ordering::Relaxed)
}

/// Asks every long running loop of the node to stop
pub fn request_exit() {
    EXIT_SIGNAL.store(true, Ordering::Relaxed);
}
