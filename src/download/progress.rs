// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Streaming copy with progress reporting.

use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use crate::error::{ResolverError, ResolverResult};

const CHUNK_SIZE: usize = 64 * 1024;

/// Forwards completion fractions to a callback, never going backwards.
///
/// Values are clamped to `[0, 1]`; a value equal to or below the last one
/// reported is dropped.
pub struct ProgressTracker<F: FnMut(f64)> {
    callback: F,
    last: Option<f64>,
}

impl<F: FnMut(f64)> ProgressTracker<F> {
    pub fn new(callback: F) -> Self {
        Self { callback, last: None }
    }

    pub fn report(&mut self, fraction: f64) {
        if fraction.is_nan() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        if self.last.map_or(true, |last| fraction > last) {
            self.last = Some(fraction);
            (self.callback)(fraction);
        }
    }

    /// Report completion.
    pub fn finish(&mut self) {
        self.report(1.0);
    }

    pub fn last(&self) -> Option<f64> {
        self.last
    }
}

/// Copy `body` into `out`, reporting `received / total` after every chunk.
///
/// Read failures surface as [`ResolverError::NetworkError`], write failures
/// as [`ResolverError::FileCreationFailed`] against `out_path`. When the
/// server announced a length, a short body is a network error. Completion
/// (`1.0`) is only reported by the caller once the file is in place.
pub fn stream_body<F: FnMut(f64)>(
    body: &mut dyn Read,
    out: &mut dyn Write,
    out_path: &Path,
    total: Option<u64>,
    progress: &mut ProgressTracker<F>,
) -> ResolverResult<u64> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut received: u64 = 0;

    progress.report(0.0);

    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(ResolverError::NetworkError(format!(
                    "Transfer interrupted after {} bytes: {}",
                    received, e
                )))
            }
        };

        out.write_all(&buf[..n])
            .map_err(|e| ResolverError::file_creation(out_path, e))?;
        received += n as u64;

        if let Some(total) = total.filter(|t| *t > 0) {
            // Hold back the final step until the caller finalizes.
            progress.report((received as f64 / total as f64).min(0.999));
        }
    }

    if let Some(total) = total {
        if received < total {
            return Err(ResolverError::NetworkError(format!(
                "Connection closed after {} of {} bytes",
                received, total
            )));
        }
    }

    out.flush().map_err(|e| ResolverError::file_creation(out_path, e))?;
    Ok(received)
}
