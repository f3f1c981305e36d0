// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Logging setup for the command-line front end.
//!
//! Logs go to stderr so stdout stays clean for paths and version lists.
//! `RUST_LOG` takes precedence over the verbosity flag:
//!
//! - `RUST_LOG=xwalk_fetch=debug xwalk-fetch download stable` (lookup details)
//! - `xwalk-fetch -v download stable` (same, via the flag)

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Default filter directive for a verbosity flag.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "xwalk_fetch=debug,warn"
    } else {
        "warn"
    }
}

/// Install the global subscriber.
pub fn init(verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize tracing subscriber: {}", e))
}
