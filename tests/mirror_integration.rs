//! Integration tests for the download pipeline and full mirror runs.
//!
//! A wiremock server plays the Caddy file server: JSON listings on directory
//! paths and file bodies with validators on file paths.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use mirror_core::{
    CacheRecord, DownloadOutcome, DownloadPipeline, FileRef, HttpClient, MetadataStore, Mirror,
    MirrorConfig,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

mod support;
use support::socket_guard::{socket_skip_return, start_mock_server_or_skip};

macro_rules! require_mock_server {
    () => {{
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return socket_skip_return();
        };
        mock_server
    }};
}

fn pipeline_in(dir: &Path, concurrency: usize) -> Result<DownloadPipeline, Box<dyn std::error::Error>> {
    Ok(DownloadPipeline::new(
        HttpClient::new(),
        MetadataStore::new(dir.join(".metadata")),
        dir,
        concurrency,
    )?)
}

/// Serves a file: `304` when the client presents `etag`, otherwise the body.
async fn mount_versioned_file(server: &MockServer, file_path: &str, body: &str, etag: &str) {
    Mock::given(method("GET"))
        .and(path(file_path))
        .and(header("If-None-Match", etag))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(file_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("ETag", etag)
                .insert_header("Last-Modified", "Mon, 01 Jan 2024 00:00:00 GMT"),
        )
        .mount(server)
        .await;
}

// ==================== Conditional GET ====================

#[tokio::test]
async fn test_not_modified_keeps_local_file_and_record() -> Result<(), Box<dyn std::error::Error>> {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/a.txt"))
        .and(header("If-None-Match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new()?;
    std::fs::write(dir.path().join("a.txt"), b"local copy")?;
    let store = MetadataStore::new(dir.path().join(".metadata"));
    store.save("a.txt", Some("\"v1\""), None).await?;
    let record_before = std::fs::read_to_string(store.record_path("a.txt"))?;

    let outcomes = pipeline_in(dir.path(), 4)?
        .download_all(vec![FileRef::new("a.txt", format!("{}/a.txt", server.uri()))])
        .await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].outcome, DownloadOutcome::Skipped);
    assert_eq!(std::fs::read(dir.path().join("a.txt"))?, b"local copy");
    assert_eq!(
        std::fs::read_to_string(store.record_path("a.txt"))?,
        record_before
    );
    assert!(!dir.path().join("a.txt.tmp").exists());
    Ok(())
}

#[tokio::test]
async fn test_fresh_download_writes_file_and_validators() -> Result<(), Box<dyn std::error::Error>> {
    let server = require_mock_server!();
    mount_versioned_file(&server, "/docs/guide.md", "# guide", "\"g1\"").await;

    let dir = TempDir::new()?;
    let outcomes = pipeline_in(dir.path(), 4)?
        .download_all(vec![FileRef::new(
            "docs/guide.md",
            format!("{}/docs/guide.md", server.uri()),
        )])
        .await;

    assert_eq!(outcomes[0].outcome, DownloadOutcome::Downloaded);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("docs/guide.md"))?,
        "# guide"
    );
    let record = MetadataStore::new(dir.path().join(".metadata"))
        .load("docs/guide.md")
        .await;
    assert_eq!(
        record,
        CacheRecord::new(Some("\"g1\""), Some("Mon, 01 Jan 2024 00:00:00 GMT"))
    );
    Ok(())
}

// ==================== Failure isolation ====================

#[tokio::test]
async fn test_failed_file_does_not_affect_others() -> Result<(), Box<dyn std::error::Error>> {
    let server = require_mock_server!();
    mount_versioned_file(&server, "/ok1", "one", "\"1\"").await;
    mount_versioned_file(&server, "/ok2", "two", "\"2\"").await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new()?;
    let files = ["ok1", "gone", "ok2"]
        .iter()
        .map(|name| FileRef::new(*name, format!("{}/{name}", server.uri())))
        .collect();
    let outcomes = pipeline_in(dir.path(), 2)?.download_all(files).await;

    let by_path = |p: &str| outcomes.iter().find(|o| o.path == p).map(|o| o.outcome);
    assert_eq!(by_path("ok1"), Some(DownloadOutcome::Downloaded));
    assert_eq!(by_path("ok2"), Some(DownloadOutcome::Downloaded));
    assert_eq!(by_path("gone"), Some(DownloadOutcome::Failed));
    assert!(!dir.path().join("gone").exists());
    assert!(!dir.path().join(".metadata/gone.meta").exists());

    let mut sequences: Vec<usize> = outcomes.iter().map(|o| o.sequence).collect();
    sequences.sort_unstable();
    assert_eq!(sequences, vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn test_server_error_keeps_previous_content() -> Result<(), Box<dyn std::error::Error>> {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new()?;
    std::fs::write(dir.path().join("data.csv"), b"previous")?;

    let outcomes = pipeline_in(dir.path(), 1)?
        .download_all(vec![FileRef::new(
            "data.csv",
            format!("{}/data.csv", server.uri()),
        )])
        .await;

    assert_eq!(outcomes[0].outcome, DownloadOutcome::Failed);
    assert!(outcomes[0].error.as_deref().is_some_and(|e| e.contains("503")));
    assert_eq!(std::fs::read(dir.path().join("data.csv"))?, b"previous");
    Ok(())
}

// ==================== Concurrency ====================

const SERVE_DELAY: Duration = Duration::from_millis(300);

/// Records when each file GET arrives and answers after `SERVE_DELAY`.
///
/// The delay is applied by wiremock asynchronously, so the server keeps
/// accepting overlapping requests while earlier ones are still pending.
struct ArrivalRecorder {
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl Respond for ArrivalRecorder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        ResponseTemplate::new(200)
            .set_body_bytes(b"content")
            .set_delay(SERVE_DELAY)
    }
}

/// Largest number of requests that arrived within one serve window.
///
/// A request cannot be answered before `SERVE_DELAY` has passed, so requests
/// arriving closer together than that were in flight at the same time.
fn peak_in_flight(arrivals: &[Instant]) -> usize {
    let window = SERVE_DELAY - Duration::from_millis(50);
    arrivals
        .iter()
        .map(|start| {
            arrivals
                .iter()
                .filter(|other| **other >= *start && **other < *start + window)
                .count()
        })
        .max()
        .unwrap_or(0)
}

async fn run_timed_batch(
    concurrency: usize,
) -> Result<(usize, Duration), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    let arrivals = Arc::new(Mutex::new(Vec::new()));
    Mock::given(method("GET"))
        .respond_with(ArrivalRecorder {
            arrivals: Arc::clone(&arrivals),
        })
        .mount(&server)
        .await;

    let dir = TempDir::new()?;
    let files = (0..5)
        .map(|i| FileRef::new(format!("f{i}.bin"), format!("{}/f{i}.bin", server.uri())))
        .collect();
    let pipeline = pipeline_in(dir.path(), concurrency)?;

    let started = Instant::now();
    let outcomes = pipeline.download_all(files).await;
    let elapsed = started.elapsed();

    assert_eq!(outcomes.len(), 5);
    assert!(
        outcomes
            .iter()
            .all(|o| o.outcome == DownloadOutcome::Downloaded)
    );
    let peak = peak_in_flight(&arrivals.lock().unwrap());
    Ok((peak, elapsed))
}

#[tokio::test]
async fn test_concurrency_limit_bounds_in_flight_transfers()
-> Result<(), Box<dyn std::error::Error>> {
    if support::socket_guard::should_skip_socket_bound_test() {
        return socket_skip_return();
    }

    let (peak, elapsed) = run_timed_batch(2).await?;
    assert_eq!(peak, 2, "limit 2 must be reached and never exceeded");
    assert!(
        elapsed >= SERVE_DELAY * 3,
        "5 files at 2 at a time need three rounds, took {elapsed:?}"
    );

    let (peak, elapsed) = run_timed_batch(5).await?;
    assert_eq!(peak, 5, "limit 5 lets every file start at once");
    assert!(
        elapsed < SERVE_DELAY * 3,
        "5 files at 5 at a time need one round, took {elapsed:?}"
    );
    Ok(())
}

// ==================== Full runs ====================

async fn mount_small_tree(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header_exists("Accept"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "a.txt", "url": "./a.txt", "is_dir": false},
            {"name": "sub/", "url": "./sub/", "is_dir": true}
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sub/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "b.txt", "url": "./b.txt", "is_dir": false}
        ])))
        .mount(server)
        .await;
    mount_versioned_file(server, "/a.txt", "alpha", "\"a1\"").await;
    mount_versioned_file(server, "/sub/b.txt", "beta", "\"b1\"").await;
}

#[tokio::test]
async fn test_second_run_is_all_unchanged() -> Result<(), Box<dyn std::error::Error>> {
    let server = require_mock_server!();
    mount_small_tree(&server).await;
    let dir = TempDir::new()?;

    let first = Mirror::new(MirrorConfig::new(&server.uri(), dir.path())?)?
        .run()
        .await?;
    assert_eq!(first.total, 2);
    assert_eq!(first.downloaded, 2);
    assert_eq!(std::fs::read_to_string(dir.path().join("sub/b.txt"))?, "beta");

    let second = Mirror::new(MirrorConfig::new(&server.uri(), dir.path())?)?
        .run()
        .await?;
    assert_eq!(second.total, 2);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.downloaded, 0);
    assert!(!second.has_failures());
    assert_eq!(std::fs::read_to_string(dir.path().join("a.txt"))?, "alpha");
    Ok(())
}

#[tokio::test]
async fn test_run_outcomes_add_up_to_discovered_total() -> Result<(), Box<dyn std::error::Error>> {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "new.txt", "url": "./new.txt", "is_dir": false},
            {"name": "same.txt", "url": "./same.txt", "is_dir": false},
            {"name": "broken.txt", "url": "./broken.txt", "is_dir": false}
        ])))
        .mount(&server)
        .await;
    mount_versioned_file(&server, "/new.txt", "new", "\"n\"").await;
    mount_versioned_file(&server, "/same.txt", "same", "\"s\"").await;
    Mock::given(method("GET"))
        .and(path("/broken.txt"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new()?;
    MetadataStore::new(dir.path().join(".metadata"))
        .save("same.txt", Some("\"s\""), None)
        .await?;

    let mirror = Mirror::new(MirrorConfig::new(&server.uri(), dir.path())?.with_concurrency(2)?)?;
    let summary = mirror.run().await?;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(
        summary.downloaded + summary.skipped + summary.failed,
        summary.total
    );
    assert!(summary.has_failures());
    assert_eq!(mirror.found_counter().get(), 3);
    assert_eq!(mirror.completed_counter().get(), 3);
    Ok(())
}

#[tokio::test]
async fn test_run_with_empty_remote_tree_succeeds() -> Result<(), Box<dyn std::error::Error>> {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let dir = TempDir::new()?;
    let target = dir.path().join("fresh");
    let summary = Mirror::new(MirrorConfig::new(&server.uri(), &target)?)?
        .run()
        .await?;

    assert_eq!(summary.total, 0);
    assert!(!summary.has_failures());
    assert!(target.join(".metadata").is_dir());
    Ok(())
}
