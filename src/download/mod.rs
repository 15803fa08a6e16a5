//! Conditional download pipeline for mirrored files.
//!
//! This module fetches every discovered file under a global concurrency cap,
//! revalidating against the cache record persisted by the previous run.
//!
//! # Features
//!
//! - Conditional GET (`If-None-Match` / `If-Modified-Since`), 304 → skip
//! - Streaming writes to a colocated temporary file, atomic rename into place
//! - Semaphore-bounded concurrency (default 50 transfers)
//! - Configurable timeouts (60s connect, 5min total by default)
//! - Per-file failure isolation: one outcome per input, always
//!
//! # Example
//!
//! ```no_run
//! use mirror_core::download::HttpClient;
//! use mirror_core::metadata::CacheRecord;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let record = CacheRecord::new(Some("\"v1\""), None);
//! let response = client
//!     .conditional_get("https://files.example.com/report.csv", &record)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod engine;
mod error;

pub use client::{ConditionalResponse, HttpClient};
pub(crate) use client::trace_response;
pub use constants::DEFAULT_CONCURRENCY;
pub use engine::{DownloadOutcome, DownloadPipeline, FileOutcome, PipelineError};
pub use error::DownloadError;

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
