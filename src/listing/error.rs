//! Error types for directory listing fetches.

use thiserror::Error;

/// Errors that can occur while listing one directory.
///
/// The crawler never propagates these: a failing directory contributes no
/// files and no subdirectories, and its siblings carry on.
#[derive(Debug, Error)]
pub enum ListingError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error listing {url}: {source}")]
    Network {
        /// The directory URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout listing {url}")]
    Timeout {
        /// The directory URL.
        url: String,
    },

    /// Non-success HTTP status.
    #[error("HTTP {status} listing {url}")]
    HttpStatus {
        /// The directory URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The body was not a JSON array of directory entries.
    #[error("unparseable listing from {url}: {source}")]
    Parse {
        /// The directory URL.
        url: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl ListingError {
    /// Creates a network error, promoting timeouts to [`ListingError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::Timeout { url: url.into() };
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a parse error.
    pub fn parse(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            url: url.into(),
            source,
        }
    }
}
