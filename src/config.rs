//! Validated configuration for one mirror run.
//!
//! The binary builds a [`MirrorConfig`] from command-line flags and the
//! `PARALLEL_JOBS` environment variable; the core only ever sees this
//! immutable value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::download::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_CONCURRENCY, MAX_CONCURRENCY, METADATA_DIR_NAME,
    TOTAL_TIMEOUT_SECS,
};

/// Errors from configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The base URL is not an absolute http(s) URL.
    #[error("invalid base URL {url}: {reason}")]
    InvalidBaseUrl {
        /// The rejected input.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Concurrency outside `1..=MAX_CONCURRENCY`.
    #[error("invalid concurrency value {value}: must be between 1 and {MAX_CONCURRENCY}")]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },
}

/// Everything a mirror run needs to know.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    base_url: String,
    download_dir: PathBuf,
    concurrency: usize,
    listing_concurrency: Option<usize>,
    connect_timeout: Duration,
    total_timeout: Duration,
}

impl MirrorConfig {
    /// Creates a configuration with default concurrency and timeouts.
    ///
    /// Trailing `/` characters are stripped from `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] unless `base_url` parses as an
    /// absolute `http` or `https` URL.
    pub fn new(base_url: &str, download_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        Ok(Self {
            base_url: trimmed.to_string(),
            download_dir: download_dir.into(),
            concurrency: DEFAULT_CONCURRENCY,
            listing_concurrency: None,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            total_timeout: Duration::from_secs(TOTAL_TIMEOUT_SECS),
        })
    }

    /// Sets the maximum number of file transfers in flight.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConcurrency`] for 0 or values above the cap.
    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self, ConfigError> {
        if !(1..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(ConfigError::InvalidConcurrency { value: concurrency });
        }
        self.concurrency = concurrency;
        Ok(self)
    }

    /// Caps simultaneous directory listing requests; `None` leaves discovery unbounded.
    #[must_use]
    pub fn with_listing_concurrency(mut self, limit: Option<usize>) -> Self {
        self.listing_concurrency = limit.filter(|n| *n > 0);
        self
    }

    /// Sets the per-request connect and total timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, connect: Duration, total: Duration) -> Self {
        self.connect_timeout = connect;
        self.total_timeout = total;
        self
    }

    /// Base URL without trailing `/`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Destination root.
    #[must_use]
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Directory holding the cache records, `<download_dir>/.metadata`.
    #[must_use]
    pub fn metadata_dir(&self) -> PathBuf {
        self.download_dir.join(METADATA_DIR_NAME)
    }

    /// Maximum file transfers in flight.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Optional cap on simultaneous listing requests.
    #[must_use]
    pub fn listing_concurrency(&self) -> Option<usize> {
        self.listing_concurrency
    }

    /// Connect timeout per HTTP request.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Total timeout per HTTP request.
    #[must_use]
    pub fn total_timeout(&self) -> Duration {
        self.total_timeout
    }
}
