//! Run coordination: crawl, then download, then tally.
//!
//! [`Mirror::run`] is the whole run in one call. Callers that drive a live
//! display can instead call the phases one at a time ([`Mirror::prepare`],
//! [`Mirror::discover`], [`Mirror::mirror_files`]) and read the counters in
//! between.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use crate::config::{ConfigError, MirrorConfig};
use crate::crawl::TreeCrawler;
use crate::download::{
    DownloadError, DownloadOutcome, DownloadPipeline, FileOutcome, HttpClient, PipelineError,
};
use crate::listing::{FileRef, ListingFetcher};
use crate::metadata::MetadataStore;
use crate::progress::ProgressCounter;

/// Fatal errors: problems that stop a run before any file is attempted.
///
/// Per-file and per-directory failures are never reported here; they become
/// `Failed` outcomes or truncated subtrees.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Client(#[from] DownloadError),

    /// The download pipeline rejected its settings.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The destination or metadata root could not be created.
    #[error("cannot create directory {path}: {source}")]
    Io {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Tally of one run.
#[derive(Debug, Clone, Default)]
pub struct MirrorSummary {
    /// Files discovered by the crawl.
    pub total: usize,
    /// Files with fresh content written.
    pub downloaded: usize,
    /// Files the server reported unchanged.
    pub skipped: usize,
    /// Files that could not be mirrored.
    pub failed: usize,
    /// One entry per discovered file.
    pub outcomes: Vec<FileOutcome>,
}

impl MirrorSummary {
    /// Tallies outcomes by kind.
    #[must_use]
    pub fn from_outcomes(outcomes: Vec<FileOutcome>) -> Self {
        let count = |kind| outcomes.iter().filter(|o| o.outcome == kind).count();
        Self {
            total: outcomes.len(),
            downloaded: count(DownloadOutcome::Downloaded),
            skipped: count(DownloadOutcome::Skipped),
            failed: count(DownloadOutcome::Failed),
            outcomes,
        }
    }

    /// True when at least one file failed; the process should exit non-zero.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// One configured mirror of a remote tree into a local directory.
#[derive(Debug)]
pub struct Mirror {
    config: MirrorConfig,
    crawler: TreeCrawler,
    pipeline: DownloadPipeline,
}

impl Mirror {
    /// Builds the HTTP client, crawler and pipeline for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Client`] if the HTTP client cannot be built and
    /// [`MirrorError::Pipeline`] if the concurrency limit is rejected.
    pub fn new(config: MirrorConfig) -> Result<Self, MirrorError> {
        let client = HttpClient::with_timeouts(config.connect_timeout(), config.total_timeout())?;

        let mut crawler = TreeCrawler::new(ListingFetcher::new(client.clone()));
        if let Some(limit) = config.listing_concurrency() {
            crawler = crawler.with_listing_limit(limit);
        }

        let pipeline = DownloadPipeline::new(
            client,
            MetadataStore::new(config.metadata_dir()),
            config.download_dir(),
            config.concurrency(),
        )?;

        Ok(Self {
            config,
            crawler,
            pipeline,
        })
    }

    /// The run's configuration.
    #[must_use]
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Files found so far by the crawl.
    #[must_use]
    pub fn found_counter(&self) -> Arc<ProgressCounter> {
        self.crawler.found_counter()
    }

    /// Transfers finished so far.
    #[must_use]
    pub fn completed_counter(&self) -> Arc<ProgressCounter> {
        self.pipeline.completed_counter()
    }

    /// Creates the destination and metadata roots.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Io`] if either directory cannot be created.
    pub async fn prepare(&self) -> Result<(), MirrorError> {
        info!(
            base_url = %self.config.base_url(),
            download_dir = %self.config.download_dir().display(),
            "starting mirror"
        );
        for dir in [
            self.config.download_dir().to_path_buf(),
            self.config.metadata_dir(),
        ] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| MirrorError::Io { path: dir.clone(), source })?;
        }
        Ok(())
    }

    /// Crawls the whole remote tree.
    pub async fn discover(&self) -> Vec<FileRef> {
        let files = self.crawler.crawl(self.config.base_url()).await;
        info!(total = files.len(), "found files to process");
        files
    }

    /// Mirrors `files` and tallies the outcomes. An empty list is a
    /// successful run with nothing to do.
    #[instrument(skip(self, files), fields(total = files.len()))]
    pub async fn mirror_files(&self, files: Vec<FileRef>) -> MirrorSummary {
        if files.is_empty() {
            info!("no files to download");
            return MirrorSummary::default();
        }

        info!(
            total = files.len(),
            concurrency = self.pipeline.concurrency(),
            "downloading files"
        );
        let summary = MirrorSummary::from_outcomes(self.pipeline.download_all(files).await);
        info!(
            "Mirror complete: {} downloaded, {} unchanged, {} failed",
            summary.downloaded, summary.skipped, summary.failed
        );
        summary
    }

    /// Runs prepare, discovery and download in sequence.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Io`] if the destination cannot be prepared.
    /// File and directory failures are reported in the summary instead.
    pub async fn run(&self) -> Result<MirrorSummary, MirrorError> {
        self.prepare().await?;
        let files = self.discover().await;
        Ok(self.mirror_files(files).await)
    }
}
