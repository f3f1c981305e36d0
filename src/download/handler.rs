// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! On-disk side of a download: candidate lookup, temporary files, and the
//! finalize step that moves a completed transfer into place.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use sha2::{Digest, Sha256};
use tempfile::{Builder, NamedTempFile};

use crate::error::{ResolverError, ResolverResult};

/// Retry interval when waiting for lock acquisition
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(50);

const PART_SUFFIX: &str = ".part";
const LOCK_SUFFIX: &str = "lock";
const CHECKSUM_SUFFIX: &str = "sha256";

/// `crosswalk-1.2.zip` -> `crosswalk-1.2.zip.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// A download in progress, written to `<final>.<random>.part`.
///
/// Each transfer gets its own temporary file, so concurrent transfers of the
/// same artifact never share one. Dropping it without a successful
/// [`DownloadHandler::finalize`] removes the temporary file.
#[derive(Debug)]
pub struct PartialFile {
    file: NamedTempFile,
    final_path: PathBuf,
}

impl PartialFile {
    pub fn temp_path(&self) -> &Path {
        self.file.path()
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }
}

impl Write for PartialFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Finds, creates and finalizes artifact files.
#[derive(Debug, Clone)]
pub struct DownloadHandler {
    lock_timeout: Duration,
}

impl DownloadHandler {
    pub fn new(lock_timeout: Duration) -> Self {
        Self { lock_timeout }
    }

    /// First `<dir>/<file_name>` that exists, searching `candidates` in order.
    ///
    /// This is an existence check. The only content check applies when a
    /// `.sha256` sidecar sits next to the file: a mismatch skips the candidate.
    pub fn find_existing(&self, candidates: &[PathBuf], file_name: &str) -> Option<PathBuf> {
        candidates.iter().find_map(|dir| {
            let path = dir.join(file_name);
            tracing::debug!("Probing {:?}", path);
            if !path.is_file() {
                return None;
            }
            if checksum_matches(&path) {
                Some(path)
            } else {
                tracing::warn!("Ignoring {:?}: checksum does not match its .sha256 sidecar", path);
                None
            }
        })
    }

    /// Open a fresh `<dir>/<file_name>.<random>.part` for writing, creating
    /// `dir` if needed.
    pub fn create_temp(&self, dir: &Path, file_name: &str) -> ResolverResult<PartialFile> {
        fs::create_dir_all(dir).map_err(|e| ResolverError::file_creation(dir, e))?;

        let final_path = dir.join(file_name);
        let prefix = format!("{}.", file_name);
        let file = Builder::new()
            .prefix(&prefix)
            .suffix(PART_SUFFIX)
            .tempfile_in(dir)
            .map_err(|e| ResolverError::file_creation(dir, e))?;

        Ok(PartialFile { file, final_path })
    }

    /// Move a completed transfer into place and optionally mirror it into
    /// `cache_dir`.
    ///
    /// Runs under an exclusive lock on `<final>.lock`. If another process
    /// placed an intact final file first, that file wins and the transfer is
    /// discarded. A final file failing its `.sha256` sidecar is replaced.
    /// Cache population failures are logged, not returned.
    pub fn finalize(&self, partial: PartialFile, cache_dir: Option<&Path>) -> ResolverResult<PathBuf> {
        let PartialFile { file, final_path } = partial;
        file.as_file()
            .sync_all()
            .map_err(|e| ResolverError::file_creation(file.path(), e))?;

        let _lock = self.lock(&final_path)?;

        if final_path.is_file() {
            if checksum_matches(&final_path) {
                tracing::info!("{:?} appeared during download, keeping existing file", final_path);
                return Ok(final_path);
            }
            tracing::warn!("Replacing {:?}: checksum does not match its .sha256 sidecar", final_path);
        }

        file.persist(&final_path)
            .map_err(|e| ResolverError::file_creation(&final_path, e.error))?;
        tracing::info!("Saved {:?}", final_path);

        if let Some(cache_dir) = cache_dir {
            let result = if final_path.parent() == Some(cache_dir) {
                write_checksum(&final_path).map(|_| final_path.clone())
            } else {
                self.populate_cache(&final_path, cache_dir)
            };
            if let Err(e) = result {
                tracing::warn!("Failed to populate cache {:?}: {}", cache_dir, e);
            }
        }

        Ok(final_path)
    }

    /// Copy `source` into `cache_dir` via a temporary file and write its
    /// checksum sidecar.
    pub fn populate_cache(&self, source: &Path, cache_dir: &Path) -> ResolverResult<PathBuf> {
        let file_name = source
            .file_name()
            .ok_or_else(|| ResolverError::file_creation(source, "not a file path"))?;
        fs::create_dir_all(cache_dir).map_err(|e| ResolverError::file_creation(cache_dir, e))?;

        let cached = cache_dir.join(file_name);
        let _lock = self.lock(&cached)?;

        let temp = sibling(&cached, &format!("{}{}", std::process::id(), PART_SUFFIX));
        let copied = fs::copy(source, &temp).and_then(|_| fs::rename(&temp, &cached));
        if let Err(e) = copied {
            let _ = fs::remove_file(&temp);
            return Err(ResolverError::file_creation(&cached, e));
        }

        write_checksum(&cached)?;
        tracing::info!("Cached {:?}", cached);
        Ok(cached)
    }

    /// Acquire an exclusive lock on `<path>.lock`, retrying until the
    /// configured timeout.
    fn lock(&self, path: &Path) -> ResolverResult<File> {
        let lock_path = sibling(path, LOCK_SUFFIX);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| ResolverError::file_creation(&lock_path, e))?;

        let start = Instant::now();
        loop {
            match lock_file.try_lock_exclusive() {
                Ok(()) => return Ok(lock_file),
                Err(e) if is_contended(&e) => {
                    if start.elapsed() >= self.lock_timeout {
                        return Err(ResolverError::file_creation(
                            &lock_path,
                            format!(
                                "timed out after {:?} waiting for another process to finish",
                                self.lock_timeout
                            ),
                        ));
                    }
                    thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(e) => return Err(ResolverError::file_creation(&lock_path, e)),
            }
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Hex SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn write_checksum(path: &Path) -> ResolverResult<()> {
    let sidecar = sibling(path, CHECKSUM_SUFFIX);
    let digest = sha256_file(path).map_err(|e| ResolverError::file_creation(path, e))?;
    fs::write(&sidecar, format!("{}\n", digest)).map_err(|e| ResolverError::file_creation(&sidecar, e))
}

/// True when there is no readable sidecar or the sidecar matches.
fn checksum_matches(path: &Path) -> bool {
    let expected = match fs::read_to_string(sibling(path, CHECKSUM_SUFFIX)) {
        Ok(s) => s,
        Err(_) => return true,
    };
    let expected = expected.split_whitespace().next().unwrap_or("");
    match sha256_file(path) {
        Ok(actual) => actual.eq_ignore_ascii_case(expected),
        Err(e) => {
            tracing::warn!("Cannot hash {:?}: {}", path, e);
            false
        }
    }
}
