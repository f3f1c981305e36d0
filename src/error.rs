// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types and user-facing error formatting.
//!
//! [`ResolverError`] is the single error channel of the resolver. Every
//! library operation returns it; nothing is retried internally. The CLI
//! renders it with [`ErrorBuilder`], which adds possible causes and
//! suggested fixes.

use std::fmt::{self, Write as _};
use std::path::PathBuf;

/// Closing line of every formatted error.
pub const DETAILS_HINT: &str = "Run again with --verbose (or RUST_LOG=xwalk_fetch=debug) for details.";

/// Result alias used throughout the library.
pub type ResolverResult<T> = std::result::Result<T, ResolverError>;

/// Errors reported by the dependency resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// Channel name outside the fixed set.
    InvalidChannel(String),
    /// Transfer failure: unreachable host, timeout, non-success status.
    NetworkError(String),
    /// Malformed remote listing or response.
    ParseError(String),
    /// Destination not writable, or the downloaded file could not be placed.
    FileCreationFailed { path: PathBuf, reason: String },
    /// No channel lists the requested version.
    UnknownVersion(String),
}

impl ResolverError {
    pub(crate) fn file_creation(path: impl Into<PathBuf>, err: impl fmt::Display) -> Self {
        Self::FileCreationFailed {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Render this error with causes and fixes for terminal output.
    pub fn report(&self) -> String {
        match self {
            Self::InvalidChannel(name) => ErrorBuilder::new(format!("Unknown channel '{}'", name))
                .fix("Use one of: stable, beta, canary")
                .build(),
            Self::NetworkError(msg) => ErrorBuilder::new(format!("Download failed: {}", msg))
                .cause("No network connection")
                .cause("Download server unreachable or moved")
                .cause("Version does not exist on this channel")
                .fix("Check connectivity and try again")
                .fix("List published versions: xwalk-fetch versions <channel>")
                .build(),
            Self::ParseError(msg) => ErrorBuilder::new(format!("Unexpected server response: {}", msg))
                .cause("Base URL does not point to a release listing")
                .fix("Check --base-url or the base_url config entry")
                .build(),
            Self::FileCreationFailed { path, reason } => {
                ErrorBuilder::new(format!("Cannot write {}: {}", path.display(), reason))
                    .cause("Destination directory is read-only")
                    .cause("Disk is full")
                    .fix("Pick another directory with --dir")
                    .build()
            }
            Self::UnknownVersion(version) => {
                ErrorBuilder::new(format!("Version {} is not published on any channel", version))
                    .fix("List published versions: xwalk-fetch versions stable")
                    .build()
            }
        }
    }
}

impl fmt::Display for ResolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChannel(name) => {
                write!(f, "Invalid channel '{}': expected stable, beta or canary", name)
            }
            Self::NetworkError(msg) => write!(f, "Network error: {}", msg),
            Self::ParseError(msg) => write!(f, "Parse error: {}", msg),
            Self::FileCreationFailed { path, reason } => {
                write!(f, "Failed to create {}: {}", path.display(), reason)
            }
            Self::UnknownVersion(version) => write!(f, "Unknown version: {}", version),
        }
    }
}

impl std::error::Error for ResolverError {}

/// Terminal rendering of a failure: title, bulleted causes, numbered fixes
/// and the verbosity hint.
pub fn format_error(title: &str, causes: &[&str], fixes: &[&str]) -> String {
    // Writing into a String cannot fail.
    let mut out = format!("[✗] {}\n\n", title);

    if !causes.is_empty() {
        out.push_str("Possible causes:\n");
        for cause in causes {
            let _ = writeln!(out, "  - {}", cause);
        }
        out.push('\n');
    }

    if !fixes.is_empty() {
        out.push_str("Try these fixes:\n");
        for (n, fix) in (1..).zip(fixes) {
            let _ = writeln!(out, "  {}. {}", n, fix);
        }
        out.push('\n');
    }

    out.push_str(DETAILS_HINT);
    out
}

/// Builder for constructing formatted error messages.
///
/// # Example
///
/// ```
/// use xwalk_fetch::error::ErrorBuilder;
///
/// let error = ErrorBuilder::new("Download failed")
///     .cause("Server unreachable")
///     .fix("Try again later")
///     .build();
/// assert!(error.contains("Server unreachable"));
/// ```
#[derive(Debug, Clone)]
pub struct ErrorBuilder {
    title: String,
    causes: Vec<String>,
    fixes: Vec<String>,
}

impl ErrorBuilder {
    /// Create a new error builder with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            causes: Vec::new(),
            fixes: Vec::new(),
        }
    }

    /// Add a possible cause.
    pub fn cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    /// Add a suggested fix.
    pub fn fix(mut self, fix: impl Into<String>) -> Self {
        self.fixes.push(fix.into());
        self
    }

    /// Build the formatted error message.
    pub fn build(self) -> String {
        let causes: Vec<&str> = self.causes.iter().map(|s| s.as_str()).collect();
        let fixes: Vec<&str> = self.fixes.iter().map(|s| s.as_str()).collect();
        format_error(&self.title, &causes, &fixes)
    }
}

impl fmt::Display for ErrorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.clone().build())
    }
}
