// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Download result types.

use std::path::PathBuf;

use serde::Serialize;

use crate::channel::Channel;

/// Where a resolved artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    /// Found in one of the candidate directories; no network access.
    Local,
    /// Fetched from the download server during this call.
    Downloaded,
}

/// A (channel, version) pair resolved to a file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    pub channel: Channel,
    pub version: String,
    pub path: PathBuf,
    pub source: EntrySource,
}

impl CacheEntry {
    pub fn new(channel: Channel, version: impl Into<String>, path: PathBuf, source: EntrySource) -> Self {
        Self {
            channel,
            version: version.into(),
            path,
            source,
        }
    }

    pub fn was_downloaded(&self) -> bool {
        self.source == EntrySource::Downloaded
    }
}
