//! Download pipeline for bounded-concurrency conditional mirroring.
//!
//! The pipeline takes the flat file list produced by the crawler and, for
//! each entry, decides between download, skip and fail:
//!
//! 1. Load the file's [`CacheRecord`] and send a conditional GET.
//! 2. `304 Not Modified` → `Skipped`; the record and local file stay as they are.
//! 3. Error status or transport failure → `Failed`; the record stays as it is.
//! 4. Fresh 2xx content → stream into `<dest>.<id>.tmp`, rename over `<dest>`,
//!    persist the new validators → `Downloaded`.
//!
//! Every transfer gets its own temporary file, so two entries for the same
//! path never share one; the last rename wins.
//!
//! A semaphore of `concurrency` permits bounds the transfers in flight.
//!
//! # Example
//!
//! ```no_run
//! use mirror_core::download::{DownloadPipeline, HttpClient};
//! use mirror_core::listing::FileRef;
//! use mirror_core::metadata::MetadataStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = DownloadPipeline::new(
//!     HttpClient::new(),
//!     MetadataStore::new("./mirror/.metadata"),
//!     "./mirror",
//!     50,
//! )?;
//! let files = vec![FileRef::new("a.txt", "https://files.example.com/a.txt")];
//! let outcomes = pipeline.download_all(files).await;
//! # Ok(())
//! # }
//! ```

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};

use super::client::{self, ConditionalResponse};
use super::constants::{MAX_CONCURRENCY, TEMP_SUFFIX};
use super::{DownloadError, HttpClient};
use crate::listing::FileRef;
use crate::metadata::MetadataStore;
use crate::progress::ProgressCounter;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Error type for pipeline construction.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadOutcome {
    /// Fresh content was written and its validators persisted.
    Downloaded,
    /// The server answered 304; nothing changed locally.
    Skipped,
    /// The transfer or the local write failed; nothing changed locally.
    Failed,
}

impl DownloadOutcome {
    /// Lowercase label used in log output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Downloaded => "downloaded",
            Self::Skipped => "unmodified",
            Self::Failed => "failed",
        }
    }
}

/// Outcome for one input [`FileRef`].
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// Relative path of the file.
    pub path: String,
    /// Remote URL of the file.
    pub url: String,
    /// Result of the transfer.
    pub outcome: DownloadOutcome,
    /// Completion order, 1-based: the `n` of `[n/total]`.
    pub sequence: usize,
    /// Error message when `outcome` is `Failed`.
    pub error: Option<String>,
}

/// Shared state each spawned transfer needs.
#[derive(Debug)]
struct Shared {
    client: HttpClient,
    store: MetadataStore,
    download_dir: PathBuf,
    completed: Arc<ProgressCounter>,
    temp_ids: ProgressCounter,
}

/// Bounded-concurrency conditional download pipeline.
///
/// # Concurrency Model
///
/// - Each file runs in its own Tokio task
/// - A semaphore permit is acquired before spawning each task
/// - Permits are released automatically when a transfer finishes (RAII)
/// - One file's failure never cancels or delays another file
#[derive(Debug)]
pub struct DownloadPipeline {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    shared: Arc<Shared>,
}

impl DownloadPipeline {
    /// Creates a pipeline writing under `download_dir` with at most
    /// `concurrency` transfers in flight.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConcurrency`] if the value is outside
    /// the valid range.
    #[instrument(level = "debug", skip(client, store, download_dir))]
    pub fn new(
        client: HttpClient,
        store: MetadataStore,
        download_dir: impl Into<PathBuf>,
        concurrency: usize,
    ) -> Result<Self, PipelineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(PipelineError::InvalidConcurrency { value: concurrency });
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            shared: Arc::new(Shared {
                client,
                store,
                download_dir: download_dir.into(),
                completed: Arc::new(ProgressCounter::new()),
                temp_ids: ProgressCounter::new(),
            }),
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the counter of finished transfers (the `n` in `[n/total]`).
    #[must_use]
    pub fn completed_counter(&self) -> Arc<ProgressCounter> {
        Arc::clone(&self.shared.completed)
    }

    /// Transfers every file, returning exactly one outcome per input.
    ///
    /// Outcomes are in input order; their `sequence` reflects completion order.
    #[instrument(skip(self, files), fields(total = files.len(), concurrency = self.concurrency))]
    pub async fn download_all(&self, files: Vec<FileRef>) -> Vec<FileOutcome> {
        let total = files.len();
        let mut handles = Vec::with_capacity(total);

        for file in files {
            // A closed semaphore cannot happen (we never close it); if it did,
            // the task simply runs without admission control.
            let permit = Arc::clone(&self.semaphore).acquire_owned().await.ok();
            let shared = Arc::clone(&self.shared);
            let task_file = file.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                mirror_one(&shared, &task_file, total).await
            });
            handles.push((file, handle));
        }

        debug!(task_count = handles.len(), "waiting for transfers to complete");

        let mut outcomes = Vec::with_capacity(total);
        for (file, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    let sequence = self.shared.completed.increment();
                    error!(path = %file.path, error = %e, "[{sequence}/{total}] transfer task panicked");
                    outcomes.push(FileOutcome {
                        path: file.path,
                        url: file.url,
                        outcome: DownloadOutcome::Failed,
                        sequence,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        outcomes
    }
}

/// Runs one file to an outcome, logging the `[n/total]` line.
async fn mirror_one(shared: &Shared, file: &FileRef, total: usize) -> FileOutcome {
    let result = transfer(shared, file).await;
    let sequence = shared.completed.increment();

    let (outcome, error) = match result {
        Ok(outcome) => {
            info!(path = %file.path, "[{sequence}/{total}] {}", outcome.as_str());
            (outcome, None)
        }
        Err(e) => {
            error!(path = %file.path, error = %e, "[{sequence}/{total}] failed");
            (DownloadOutcome::Failed, Some(e.to_string()))
        }
    };

    FileOutcome {
        path: file.path.clone(),
        url: file.url.clone(),
        outcome,
        sequence,
        error,
    }
}

/// Conditional GET, atomic replace and record update for one file.
#[instrument(level = "debug", skip(shared), fields(path = %file.path))]
async fn transfer(shared: &Shared, file: &FileRef) -> Result<DownloadOutcome, DownloadError> {
    let destination = resolve_destination(&shared.download_dir, &file.path)?;

    let record = shared.store.load(&file.path).await;
    let response = match shared.client.conditional_get(&file.url, &record).await? {
        ConditionalResponse::NotModified => return Ok(DownloadOutcome::Skipped),
        ConditionalResponse::Fresh(response) => response,
    };

    let (etag, last_modified) = client::response_validators(&response);
    let temp_path = temp_path_for(&destination, shared.temp_ids.increment());

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::io(parent, e))?;
    }

    if let Err(e) = client::stream_to_file(response, &file.url, &temp_path).await {
        discard_temp(&temp_path).await;
        return Err(e);
    }

    if let Err(e) = tokio::fs::rename(&temp_path, &destination).await {
        discard_temp(&temp_path).await;
        return Err(DownloadError::io(&destination, e));
    }

    if let Err(e) = shared
        .store
        .save(&file.path, etag.as_deref(), last_modified.as_deref())
        .await
    {
        warn!(path = %file.path, error = %e, "content replaced but cache record not saved");
    }

    Ok(DownloadOutcome::Downloaded)
}

/// Joins `path` under `root`, refusing absolute paths and `..` components.
fn resolve_destination(root: &Path, path: &str) -> Result<PathBuf, DownloadError> {
    let relative = Path::new(path);
    let safe = !path.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe {
        return Err(DownloadError::unsafe_path(path));
    }
    Ok(root.join(relative))
}

/// `<destination>.<id>.tmp`, in the same directory so the rename is atomic.
fn temp_path_for(destination: &Path, id: usize) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(format!(".{id}{TEMP_SUFFIX}"));
    PathBuf::from(name)
}

async fn discard_temp(temp_path: &Path) {
    match tokio::fs::remove_file(temp_path).await {
        Ok(()) => debug!(path = %temp_path.display(), "removed leftover temporary file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => debug!(path = %temp_path.display(), error = %e, "could not remove temporary file"),
    }
}
