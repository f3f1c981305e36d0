// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Resolver configuration.
//!
//! The resolver never reads the environment itself. Everything it needs is
//! carried by [`ResolverConfig`], which the CLI assembles from defaults, the
//! optional `config.json`, the cache override variable and command-line
//! flags, in that order.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::artifact::{Arch, Platform};

/// Environment variable naming an extra cache directory.
pub const CACHE_DIR_ENV: &str = "CROSSWALK_APP_TOOLS_CACHE_DIR";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 3600;
const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub platform: Platform,
    pub arch: Arch,
    /// Overrides the platform's release listing root.
    pub base_url: Option<String>,
    /// Consulted before downloading and populated afterwards.
    pub cache_dir: Option<PathBuf>,
    /// Directory treated as the working directory for local lookups.
    /// Falls back to the process cwd.
    pub work_dir: Option<PathBuf>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub lock_timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            arch: Arch::default(),
            base_url: None,
            cache_dir: None,
            work_dir: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            lock_timeout_secs: DEFAULT_LOCK_TIMEOUT_SECS,
        }
    }
}

impl ResolverConfig {
    /// Defaults plus the cache override from the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load `config.json` from the user config directory if present, then
    /// apply the environment override.
    pub fn load() -> Result<Self> {
        let mut config = match config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    fn apply_env(&mut self) {
        self.apply_cache_override(std::env::var_os(CACHE_DIR_ENV).map(PathBuf::from));
    }

    /// An empty override counts as unset.
    fn apply_cache_override(&mut self, value: Option<PathBuf>) {
        if let Some(dir) = value.filter(|d| !d.as_os_str().is_empty()) {
            self.cache_dir = Some(dir);
        }
    }

    pub fn with_platform(mut self, platform: Platform, arch: Arch) -> Self {
        self.platform = platform;
        self.arch = arch;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Listing root without a trailing slash.
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => self.platform.default_base_url(),
        }
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }
}

/// `<config dir>/xwalk-fetch/config.json`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("xwalk-fetch").join("config.json"))
}
