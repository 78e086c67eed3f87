//! `tracing` initialisation for the CLI process.
//!
//! Every stage in `suo-core` logs through `tracing` (frame arrivals, dropped
//! late frames, framer/decoder failures); this just wires a subscriber so
//! those events reach the terminal. Level is controlled by `RUST_LOG`,
//! falling back to `info` so a default run is not silent.

use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
