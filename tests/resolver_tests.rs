//! Integration tests for the dependency resolver
//!
//! Every test drives the resolver through `MockTransport`, which serves
//! canned bodies, records each requested URL, and can cut a transfer off
//! mid-stream. No test touches the network.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use xwalk_fetch::{
    Channel, DependencyResolver, EntrySource, ResolverConfig, ResolverError, ResolverResult,
    Transport, TransportResponse,
};

const BASE: &str = "http://mirror.test/android";

// =============================================================================
// Test Doubles
// =============================================================================

enum MockBody {
    Complete(Vec<u8>),
    /// Sends the bytes, then the connection drops.
    CutOff { sent: Vec<u8>, announced: u64 },
    Status(u16),
}

#[derive(Default)]
struct MockTransport {
    routes: HashMap<String, MockBody>,
    calls: RefCell<Vec<String>>,
}

impl MockTransport {
    fn serve(mut self, url: impl Into<String>, body: &[u8]) -> Self {
        self.routes.insert(url.into(), MockBody::Complete(body.to_vec()));
        self
    }

    fn cut_off(mut self, url: impl Into<String>, sent: &[u8], announced: u64) -> Self {
        self.routes.insert(
            url.into(),
            MockBody::CutOff {
                sent: sent.to_vec(),
                announced,
            },
        );
        self
    }

    fn status(mut self, url: impl Into<String>, code: u16) -> Self {
        self.routes.insert(url.into(), MockBody::Status(code));
        self
    }

    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

struct CutOffReader {
    data: Cursor<Vec<u8>>,
}

impl Read for CutOffReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.read(buf)? {
            0 => Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
            n => Ok(n),
        }
    }
}

impl Transport for MockTransport {
    fn get(&self, url: &str) -> ResolverResult<TransportResponse> {
        self.calls.borrow_mut().push(url.to_string());
        match self.routes.get(url) {
            Some(MockBody::Complete(body)) => Ok(TransportResponse::new(
                Some(body.len() as u64),
                Cursor::new(body.clone()),
            )),
            Some(MockBody::CutOff { sent, announced }) => Ok(TransportResponse::new(
                Some(*announced),
                CutOffReader {
                    data: Cursor::new(sent.clone()),
                },
            )),
            Some(MockBody::Status(code)) => {
                Err(ResolverError::NetworkError(format!("HTTP {} for {}", code, url)))
            }
            None => Err(ResolverError::NetworkError(format!("HTTP 404 for {}", url))),
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// `<root>/parent/work` plus `<root>/out` and `<root>/cache`.
struct Layout {
    _root: TempDir,
    parent: PathBuf,
    work: PathBuf,
    out: PathBuf,
    cache: PathBuf,
}

impl Layout {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let parent = root.path().join("parent");
        let work = parent.join("work");
        fs::create_dir_all(&work).unwrap();
        Self {
            out: root.path().join("out"),
            cache: root.path().join("cache"),
            parent,
            work,
            _root: root,
        }
    }

    fn config(&self) -> ResolverConfig {
        ResolverConfig::default()
            .with_base_url(BASE)
            .with_work_dir(&self.work)
    }

    fn cached_config(&self) -> ResolverConfig {
        self.config().with_cache_dir(&self.cache)
    }
}

fn artifact_url(version: &str) -> String {
    format!("{}/stable/{}/crosswalk-{}.zip", BASE, version, version)
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn leftovers(dir: &Path) -> Vec<String> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.ends_with(".lock"))
            .collect(),
        Err(_) => Vec::new(),
    }
}

// =============================================================================
// Construction and Listing Tests
// =============================================================================

#[test]
fn test_invalid_channel_fails_construction() {
    for name in ["nightly", "STABLE", "", "dev"] {
        let result = DependencyResolver::with_transport(name, ResolverConfig::default(), MockTransport::default());
        assert!(
            matches!(result, Err(ResolverError::InvalidChannel(_))),
            "{:?} should be rejected",
            name
        );
    }
}

#[test]
fn test_fetch_versions_preserves_listing_order() {
    let transport = MockTransport::default().serve(format!("{}/stable/", BASE), b"14.43.343.25\n14.44.360.4\n");
    let resolver = DependencyResolver::with_transport("stable", ResolverConfig::default().with_base_url(BASE), &transport).unwrap();

    let index = resolver.fetch_versions(Channel::Stable).unwrap();
    assert_eq!(index.into_vec(), vec!["14.43.343.25", "14.44.360.4"]);
    assert_eq!(transport.call_count(), 1);
}

#[test]
fn test_fetch_versions_errors_are_not_retried() {
    let transport = MockTransport::default()
        .status(format!("{}/beta/", BASE), 503)
        .serve(format!("{}/canary/", BASE), b"<html><body>Moved</body></html>");
    let resolver = DependencyResolver::with_transport("beta", ResolverConfig::default().with_base_url(BASE), &transport).unwrap();

    assert!(matches!(resolver.fetch_versions(Channel::Beta), Err(ResolverError::NetworkError(_))));
    assert_eq!(transport.call_count(), 1);

    assert!(matches!(resolver.fetch_versions(Channel::Canary), Err(ResolverError::ParseError(_))));
    assert_eq!(transport.call_count(), 2);
}

// =============================================================================
// Local Lookup Tests
// =============================================================================

#[test]
fn test_find_locally_checks_work_dir_then_parent() {
    let layout = Layout::new();
    let resolver = DependencyResolver::with_transport("stable", layout.config(), MockTransport::default()).unwrap();

    assert_eq!(resolver.find_locally("14.44.360.4"), None);

    let in_parent = layout.parent.join("crosswalk-14.44.360.4.zip");
    fs::write(&in_parent, b"parent").unwrap();
    assert_eq!(resolver.find_locally("14.44.360.4"), Some(in_parent));

    let in_work = layout.work.join("crosswalk-14.44.360.4.zip");
    fs::write(&in_work, b"work").unwrap();
    assert_eq!(resolver.find_locally("14.44.360.4"), Some(in_work));

    assert_eq!(resolver.find_locally("14.43.343.25"), None);
    assert_eq!(resolver.transport().call_count(), 0);
}

#[test]
fn test_find_locally_ignores_directories() {
    let layout = Layout::new();
    fs::create_dir(layout.work.join("crosswalk-1.2.3.4.zip")).unwrap();
    let resolver = DependencyResolver::with_transport("stable", layout.config(), MockTransport::default()).unwrap();
    assert_eq!(resolver.find_locally("1.2.3.4"), None);
}

// =============================================================================
// Download Tests
// =============================================================================

#[test]
fn test_download_skips_network_when_present_in_any_candidate() {
    let version = "14.44.360.4";
    let file_name = format!("crosswalk-{}.zip", version);

    for place in ["out", "work", "cache"] {
        let layout = Layout::new();
        let dir = match place {
            "out" => &layout.out,
            "work" => &layout.work,
            _ => &layout.cache,
        };
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(&file_name), b"zip").unwrap();

        let transport = MockTransport::default();
        let resolver = DependencyResolver::with_transport("stable", layout.cached_config(), &transport).unwrap();

        let entry = resolver
            .download_entry(Channel::Stable, version, &layout.out, |_| {})
            .unwrap();
        assert_eq!(entry.path, dir.join(&file_name), "candidate {}", place);
        assert_eq!(entry.source, EntrySource::Local);
        assert_eq!(transport.call_count(), 0, "candidate {}", place);
    }
}

#[test]
fn test_download_returns_cached_copy_without_network() {
    let layout = Layout::new();
    fs::create_dir_all(&layout.cache).unwrap();
    let cached = layout.cache.join("crosswalk-14.44.360.4.zip");
    fs::write(&cached, b"cached archive").unwrap();

    let transport = MockTransport::default();
    let resolver = DependencyResolver::with_transport("stable", layout.cached_config(), &transport).unwrap();

    let path = resolver.download(Channel::Stable, "14.44.360.4", &layout.out).unwrap();
    assert_eq!(path, cached);
    assert_eq!(transport.call_count(), 0);
}

#[test]
fn test_download_fetches_finalizes_and_caches() {
    let layout = Layout::new();
    let version = "14.44.360.4";
    let body = payload(200 * 1024);
    let transport = MockTransport::default().serve(artifact_url(version), &body);
    let resolver = DependencyResolver::with_transport("stable", layout.cached_config(), &transport).unwrap();

    let mut fractions = Vec::new();
    let entry = resolver
        .download_entry(Channel::Stable, version, &layout.out, |f| fractions.push(f))
        .unwrap();

    assert_eq!(entry.source, EntrySource::Downloaded);
    assert_eq!(entry.path, layout.out.join("crosswalk-14.44.360.4.zip"));
    assert_eq!(fs::read(&entry.path).unwrap(), body);
    assert_eq!(*transport.calls.borrow(), vec![artifact_url(version)]);

    assert!(fractions.len() >= 2);
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)));
    assert_eq!(fractions.last(), Some(&1.0));

    let cached = layout.cache.join("crosswalk-14.44.360.4.zip");
    assert_eq!(fs::read(&cached).unwrap(), body);
    assert!(layout.cache.join("crosswalk-14.44.360.4.zip.sha256").is_file());

    let mut out_files = leftovers(&layout.out);
    out_files.sort();
    assert_eq!(out_files, vec!["crosswalk-14.44.360.4.zip"]);
}

#[test]
fn test_second_download_is_served_locally() {
    let layout = Layout::new();
    let version = "14.43.343.25";
    let transport = MockTransport::default().serve(artifact_url(version), &payload(4096));
    let resolver = DependencyResolver::with_transport("stable", layout.config(), &transport).unwrap();

    let first = resolver.download(Channel::Stable, version, &layout.work).unwrap();
    let second = resolver.download(Channel::Stable, version, &layout.work).unwrap();

    assert_eq!(first, second);
    assert_eq!(transport.call_count(), 1);
    assert_eq!(resolver.find_locally(version), Some(first));
}

#[test]
fn test_interrupted_transfer_leaves_nothing_behind() {
    let layout = Layout::new();
    let version = "14.44.360.4";
    let transport = MockTransport::default().cut_off(artifact_url(version), &payload(100 * 1024), 1024 * 1024);
    let resolver = DependencyResolver::with_transport("stable", layout.cached_config(), &transport).unwrap();

    let mut fractions = Vec::new();
    let err = resolver
        .download_with_progress(Channel::Stable, version, &layout.out, |f| fractions.push(f))
        .unwrap_err();

    assert!(matches!(err, ResolverError::NetworkError(_)), "got {:?}", err);
    assert!(!layout.out.join("crosswalk-14.44.360.4.zip").exists());
    assert!(leftovers(&layout.out).is_empty(), "left: {:?}", leftovers(&layout.out));
    assert!(leftovers(&layout.cache).is_empty());
    assert!(fractions.iter().all(|f| *f < 1.0));
}

#[test]
fn test_http_error_leaves_nothing_behind() {
    let layout = Layout::new();
    let transport = MockTransport::default().status(artifact_url("99.0.0.0"), 404);
    let resolver = DependencyResolver::with_transport("stable", layout.config(), &transport).unwrap();

    let err = resolver.download(Channel::Stable, "99.0.0.0", &layout.out).unwrap_err();
    assert!(matches!(err, ResolverError::NetworkError(_)));
    assert!(!layout.out.exists(), "destination created before a response arrived");
    assert_eq!(transport.call_count(), 1);
}

#[test]
fn test_unwritable_destination_is_file_creation_failure() {
    let layout = Layout::new();
    let not_a_dir = layout.work.join("blocker");
    fs::write(&not_a_dir, b"file").unwrap();

    let transport = MockTransport::default().serve(artifact_url("14.44.360.4"), b"zip");
    let resolver = DependencyResolver::with_transport("stable", layout.config(), &transport).unwrap();

    let err = resolver
        .download(Channel::Stable, "14.44.360.4", &not_a_dir.join("sub"))
        .unwrap_err();
    assert!(matches!(err, ResolverError::FileCreationFailed { .. }), "got {:?}", err);
    assert_eq!(transport.call_count(), 1);
}

#[test]
fn test_cache_failure_does_not_fail_download() {
    let layout = Layout::new();
    fs::write(&layout.cache, b"not a directory").unwrap();

    let transport = MockTransport::default().serve(artifact_url("14.44.360.4"), b"zip bytes");
    let resolver = DependencyResolver::with_transport("stable", layout.cached_config(), &transport).unwrap();

    let path = resolver.download(Channel::Stable, "14.44.360.4", &layout.out).unwrap();
    assert_eq!(fs::read(path).unwrap(), b"zip bytes");
}

#[test]
fn test_corrupted_cache_entry_is_refetched() {
    let layout = Layout::new();
    let version = "14.44.360.4";
    let body = payload(8192);

    let transport = MockTransport::default().serve(artifact_url(version), &body);
    let resolver = DependencyResolver::with_transport("stable", layout.cached_config(), &transport).unwrap();
    let first_out = layout.out.join("first");
    resolver.download(Channel::Stable, version, &first_out).unwrap();
    assert_eq!(transport.call_count(), 1);

    // Damage the cached copy; its sidecar still holds the original digest.
    fs::write(layout.cache.join("crosswalk-14.44.360.4.zip"), b"truncated").unwrap();

    let second_out = layout.out.join("second");
    let path = resolver.download(Channel::Stable, version, &second_out).unwrap();
    assert_eq!(path, second_out.join("crosswalk-14.44.360.4.zip"));
    assert_eq!(fs::read(&path).unwrap(), body);
    assert_eq!(transport.call_count(), 2);
}

#[test]
fn test_corrupted_entry_in_cache_destination_is_replaced() {
    let layout = Layout::new();
    let version = "1.2.3.4";
    let file_name = "crosswalk-1.2.3.4.zip";

    let transport = MockTransport::default().serve(artifact_url(version), b"GOOD-ARCHIVE");
    let resolver = DependencyResolver::with_transport("stable", layout.cached_config(), &transport).unwrap();

    let first = resolver.download(Channel::Stable, version, &layout.cache).unwrap();
    assert_eq!(first, layout.cache.join(file_name));
    assert!(layout.cache.join(format!("{}.sha256", file_name)).exists());

    fs::write(&first, b"corrupt").unwrap();

    let second = resolver.download(Channel::Stable, version, &layout.cache).unwrap();
    assert_eq!(second, first);
    assert_eq!(fs::read(&second).unwrap(), b"GOOD-ARCHIVE");
    assert_eq!(transport.call_count(), 2);

    // The sidecar was rewritten, so the repaired copy is served locally.
    let third = resolver.download(Channel::Stable, version, &layout.cache).unwrap();
    assert_eq!(third, first);
    assert_eq!(transport.call_count(), 2);
}

#[test]
fn test_resolve_latest_then_download() {
    let layout = Layout::new();
    let transport = MockTransport::default()
        .serve(format!("{}/stable/", BASE), b"14.43.343.25\n14.44.360.4\n")
        .serve(artifact_url("14.44.360.4"), b"newest");
    let resolver = DependencyResolver::with_transport("stable", layout.config(), &transport).unwrap();

    let version = resolver.resolve_version(Channel::Stable, "latest").unwrap();
    assert_eq!(version, "14.44.360.4");

    let path = resolver.download(Channel::Stable, &version, &layout.out).unwrap();
    assert_eq!(fs::read(path).unwrap(), b"newest");
    assert_eq!(transport.call_count(), 2);
}
