// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Dependency resolver for Crosswalk runtime archives.
//!
//! The resolver answers three questions for a packaging run: which versions
//! a channel publishes, whether an archive is already on disk, and where the
//! archive ends up after downloading it. Each download goes through the same
//! linear path: candidate directories, then the network, then finalize.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use xwalk_fetch::{Channel, DependencyResolver, ResolverConfig};
//!
//! let resolver = DependencyResolver::new("stable", ResolverConfig::from_env())?;
//! let version = resolver.resolve_version(Channel::Stable, "latest")?;
//! let path = resolver.download_with_progress(Channel::Stable, &version, Path::new("."), |f| {
//!     println!("{:.0}%", f * 100.0);
//! })?;
//! println!("{}", path.display());
//! # Ok::<(), xwalk_fetch::ResolverError>(())
//! ```

use std::path::{Path, PathBuf};

use crate::artifact::artifact_file_name;
use crate::channel::Channel;
use crate::config::ResolverConfig;
use crate::download::{
    stream_body, CacheEntry, DownloadHandler, EntrySource, HttpTransport, ProgressTracker,
    Transport,
};
use crate::error::{ResolverError, ResolverResult};
use crate::index::{parse_index_bytes, validate_version, VersionIndex};

/// Version specifier resolving to the newest entry of a channel.
pub const LATEST: &str = "latest";

/// Resolves and downloads runtime archives for one configuration.
pub struct DependencyResolver<T: Transport = HttpTransport> {
    channel: Channel,
    config: ResolverConfig,
    transport: T,
    handler: DownloadHandler,
}

impl DependencyResolver<HttpTransport> {
    /// Create a resolver backed by the blocking HTTP client.
    ///
    /// Fails with [`ResolverError::InvalidChannel`] when `channel` is not
    /// one of `stable`, `beta` or `canary`.
    pub fn new(channel: &str, config: ResolverConfig) -> ResolverResult<Self> {
        let channel: Channel = channel.parse()?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self::from_parts(channel, config, transport))
    }
}

impl<T: Transport> DependencyResolver<T> {
    /// Create a resolver with a caller-supplied transport.
    pub fn with_transport(channel: &str, config: ResolverConfig, transport: T) -> ResolverResult<Self> {
        let channel: Channel = channel.parse()?;
        Ok(Self::from_parts(channel, config, transport))
    }

    fn from_parts(channel: Channel, config: ResolverConfig, transport: T) -> Self {
        let handler = DownloadHandler::new(config.lock_timeout());
        Self {
            channel,
            config,
            transport,
            handler,
        }
    }

    /// The channel this resolver was created for.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn artifact_file_name(&self, version: &str) -> String {
        artifact_file_name(self.config.platform, self.config.arch, version)
    }

    /// `<base>/<channel>/`
    pub fn index_url(&self, channel: Channel) -> String {
        format!("{}/{}/", self.config.base_url(), channel)
    }

    /// `<base>/<channel>/<version>/<file name>`
    pub fn artifact_url(&self, channel: Channel, version: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.config.base_url(),
            channel,
            version,
            self.artifact_file_name(version)
        )
    }

    /// Fetch and parse the version listing of `channel`.
    ///
    /// One GET, no retry. The listing order is preserved.
    pub fn fetch_versions(&self, channel: Channel) -> ResolverResult<VersionIndex> {
        let url = self.index_url(channel);
        tracing::debug!("Fetching {} index from {}", channel, url);

        let body = self.transport.get(&url)?.into_bytes()?;
        let index = parse_index_bytes(&body)?;

        tracing::debug!("{} lists {} versions", channel, index.len());
        Ok(index)
    }

    /// Look for the archive of `version` in the working directory, then in
    /// its parent. A malformed version never matches.
    pub fn find_locally(&self, version: &str) -> Option<PathBuf> {
        validate_version(version).ok()?;
        let file_name = self.artifact_file_name(version);
        let work_dir = self.config.work_dir();

        let mut dirs = vec![work_dir.clone()];
        if let Some(parent) = work_dir.parent() {
            dirs.push(parent.to_path_buf());
        }

        dirs.into_iter()
            .map(|dir| dir.join(&file_name))
            .find(|path| path.is_file())
    }

    /// Turn `latest` into the newest published version; anything else is
    /// checked for shape and returned without touching the network.
    pub fn resolve_version(&self, channel: Channel, requested: &str) -> ResolverResult<String> {
        let requested = requested.trim();
        if !requested.eq_ignore_ascii_case(LATEST) {
            return validate_version(requested).map(str::to_string);
        }

        let index = self.fetch_versions(channel)?;
        index
            .latest()
            .map(str::to_string)
            .ok_or_else(|| ResolverError::ParseError(format!("{} lists no versions", channel)))
    }

    /// First channel, in preference order, whose listing contains `version`.
    pub fn find_channel(&self, version: &str) -> ResolverResult<Channel> {
        for channel in Channel::ALL {
            if self.fetch_versions(channel)?.contains(version) {
                return Ok(channel);
            }
        }
        Err(ResolverError::UnknownVersion(version.to_string()))
    }

    /// Directories searched for an existing archive, in order.
    pub fn candidate_dirs(&self, destination: &Path) -> Vec<PathBuf> {
        let mut dirs = vec![destination.to_path_buf(), self.config.work_dir()];
        if let Some(cache) = &self.config.cache_dir {
            dirs.push(cache.clone());
        }
        dirs
    }

    /// Download the archive of `version` into `destination` unless a copy
    /// already exists. Returns the path of the archive.
    pub fn download(&self, channel: Channel, version: &str, destination: &Path) -> ResolverResult<PathBuf> {
        self.download_with_progress(channel, version, destination, |_| {})
    }

    /// Like [`download`](Self::download), reporting completion fractions.
    pub fn download_with_progress<F>(
        &self,
        channel: Channel,
        version: &str,
        destination: &Path,
        progress: F,
    ) -> ResolverResult<PathBuf>
    where
        F: FnMut(f64),
    {
        self.download_entry(channel, version, destination, progress)
            .map(|entry| entry.path)
    }

    /// Full form of [`download`](Self::download), also telling whether the
    /// archive was found locally or transferred.
    pub fn download_entry<F>(
        &self,
        channel: Channel,
        version: &str,
        destination: &Path,
        progress: F,
    ) -> ResolverResult<CacheEntry>
    where
        F: FnMut(f64),
    {
        validate_version(version)?;
        let file_name = self.artifact_file_name(version);
        let candidates = self.candidate_dirs(destination);

        if let Some(existing) = self.handler.find_existing(&candidates, &file_name) {
            tracing::info!("Using existing {:?}", existing);
            return Ok(CacheEntry::new(channel, version, existing, EntrySource::Local));
        }

        let url = self.artifact_url(channel, version);
        tracing::info!("Downloading {}", url);

        let mut response = self.transport.get(&url)?;
        let mut partial = self.handler.create_temp(destination, &file_name)?;
        let mut tracker = ProgressTracker::new(progress);

        let temp_path = partial.temp_path().to_path_buf();
        let bytes = stream_body(
            &mut response.body,
            &mut partial,
            &temp_path,
            response.content_length,
            &mut tracker,
        )?;
        drop(response);

        let path = self.handler.finalize(partial, self.config.cache_dir.as_deref())?;
        tracker.finish();

        tracing::info!("Downloaded {} bytes to {:?}", bytes, path);
        Ok(CacheEntry::new(channel, version, path, EntrySource::Downloaded))
    }
}
