// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Artifact transfer and on-disk placement.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │ Transport       │────▶│ stream_body     │
//! │ (HTTP GET)      │     │ (progress)      │
//! └─────────────────┘     └────────┬────────┘
//!                                  │
//!                                  ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ DownloadHandler │────▶│ PartialFile     │
//! │ (find/finalize) │     │ (<name>.*.part) │
//! └─────────────────┘     └─────────────────┘
//! ```
//!
//! A transfer writes into its own `<name>.<random>.part` next to the final
//! path. Only a complete transfer is renamed into place, under an advisory
//! lock, so the final path never holds a partial archive.

pub mod handler;
pub mod progress;
pub mod transport;
pub mod types;

pub use handler::{sha256_file, DownloadHandler, PartialFile};
pub use progress::{stream_body, ProgressTracker};
pub use transport::{HttpTransport, Transport, TransportResponse};
pub use types::{CacheEntry, EntrySource};
