//! Mirror Core Library
//!
//! This library mirrors a remote directory tree exposed by a browsable HTTP
//! file server (Caddy `file_server browse` with JSON listings) onto local
//! storage, skipping files that have not changed since the last mirror.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`metadata`] - Per-file sidecar records holding cache validators
//! - [`listing`] - One directory listing fetch, parsed into typed references
//! - [`crawl`] - Recursive, concurrent discovery of the whole remote tree
//! - [`download`] - Bounded-concurrency conditional download pipeline
//! - [`mirror`] - Run coordination: crawl, download, tally
//! - [`config`] - Validated run configuration
//! - [`progress`] - Shared monotonic counters for progress reporting

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod crawl;
pub mod download;
pub mod listing;
pub mod metadata;
pub mod mirror;
pub mod progress;
mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::{ConfigError, MirrorConfig};
pub use crawl::TreeCrawler;
pub use download::{
    DEFAULT_CONCURRENCY, DownloadError, DownloadOutcome, DownloadPipeline, FileOutcome,
    HttpClient, PipelineError,
};
pub use listing::{DirRef, DirectoryEntry, FileRef, Listing, ListingError, ListingFetcher};
pub use metadata::{CacheRecord, MetadataStore};
pub use mirror::{Mirror, MirrorError, MirrorSummary};
pub use progress::ProgressCounter;
