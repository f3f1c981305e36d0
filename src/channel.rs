// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Release channels.
//!
//! A channel is a named release track on the download server. The set is
//! fixed and ordered by preference: `stable` first, `canary` last.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ResolverError;

/// A release track on the download server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Production releases
    Stable,
    /// Release candidates
    Beta,
    /// Nightly builds
    Canary,
}

impl Channel {
    /// All channels in preference order.
    pub const ALL: [Channel; 3] = [Channel::Stable, Channel::Beta, Channel::Canary];

    /// The channel name as used in remote URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Stable => "stable",
            Channel::Beta => "beta",
            Channel::Canary => "canary",
        }
    }
}

impl Default for Channel {
    fn default() -> Self {
        Channel::Stable
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = ResolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "stable" => Ok(Channel::Stable),
            "beta" => Ok(Channel::Beta),
            "canary" => Ok(Channel::Canary),
            other => Err(ResolverError::InvalidChannel(other.to_string())),
        }
    }
}
