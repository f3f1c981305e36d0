// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! xwalk-fetch - Crosswalk runtime resolver library
//!
//! Finds, downloads and caches the Crosswalk runtime archives that app
//! packaging embeds into a project:
//!
//! **Destination dir** -> **Working dir** -> **Cache dir** -> **Download server**
//!
//! # Core Modules
//!
//! - [`resolver`] - Channel listings, local lookup and downloads
//! - [`download`] - Transport seam, streaming, temp files and finalize
//! - [`index`] - Version listing parser
//! - [`channel`] - Release channels
//! - [`artifact`] - Archive naming per platform and architecture
//! - [`config`] - Resolver configuration
//! - [`error`] - Error taxonomy and user-facing formatting
//! - [`logging`] - Tracing subscriber setup for the CLI

pub mod artifact;
pub mod channel;
pub mod config;
pub mod download;
pub mod error;
pub mod index;
pub mod logging;
pub mod resolver;

pub use artifact::{artifact_file_name, Arch, Platform};
pub use channel::Channel;
pub use config::{ResolverConfig, CACHE_DIR_ENV};
pub use download::{CacheEntry, EntrySource, HttpTransport, Transport, TransportResponse};
pub use error::{ErrorBuilder, ResolverError, ResolverResult};
pub use index::{parse_index, VersionIndex};
pub use resolver::{DependencyResolver, LATEST};
