// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Version index of a release channel.
//!
//! The download server exposes each channel as a directory listing. The
//! parser accepts either a plain list (one version per line) or an HTML
//! autoindex page whose anchors point at version directories. Order is the
//! server's order, oldest first; entries are neither sorted nor deduplicated.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ResolverError, ResolverResult};

/// A bare version line, optionally with a trailing slash.
static BARE_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)+)/?$").expect("valid regex"));

/// A version identifier on its own, as accepted from callers.
static VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)+$").expect("valid regex"));

/// An autoindex anchor pointing at a version directory.
static HREF_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href="(?:\./)?(\d+(?:\.\d+)+)/?""#).expect("valid regex"));

/// Ordered, immutable list of versions published on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionIndex {
    versions: Vec<String>,
}

impl VersionIndex {
    pub fn new(versions: Vec<String>) -> Self {
        Self { versions }
    }

    /// Newest version, i.e. the last entry of the listing.
    pub fn latest(&self) -> Option<&str> {
        self.versions.last().map(|v| v.as_str())
    }

    pub fn contains(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v == version)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.versions.iter().map(|v| v.as_str())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.versions
    }

    pub fn into_vec(self) -> Vec<String> {
        self.versions
    }
}

impl<'a> IntoIterator for &'a VersionIndex {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.versions.iter()
    }
}

/// Check that `version` looks like `14.44.360.4` before it is used in a
/// file name or URL.
pub fn validate_version(version: &str) -> ResolverResult<&str> {
    if VERSION.is_match(version) {
        Ok(version)
    } else {
        Err(ResolverError::ParseError(format!("invalid version '{}'", version)))
    }
}

/// Parse a raw listing body.
pub fn parse_index_bytes(body: &[u8]) -> ResolverResult<VersionIndex> {
    let text = std::str::from_utf8(body)
        .map_err(|e| ResolverError::ParseError(format!("listing is not valid UTF-8: {}", e)))?;
    parse_index(text)
}

/// Parse a listing into a [`VersionIndex`].
///
/// Fails when the body contains no version entries at all.
pub fn parse_index(body: &str) -> ResolverResult<VersionIndex> {
    let mut versions = Vec::new();

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = BARE_VERSION.captures(line) {
            versions.push(caps[1].to_string());
            continue;
        }

        for caps in HREF_VERSION.captures_iter(line) {
            versions.push(caps[1].to_string());
        }
    }

    if versions.is_empty() {
        return Err(ResolverError::ParseError(if body.trim().is_empty() {
            "empty version listing".to_string()
        } else {
            "no versions found in listing".to_string()
        }));
    }

    Ok(VersionIndex::new(versions))
}
