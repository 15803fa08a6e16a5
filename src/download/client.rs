//! HTTP client wrapper shared by the listing fetcher and the download pipeline.
//!
//! This module provides the `HttpClient` struct, which owns one pooled
//! `reqwest::Client` with the mirror's timeouts and User-Agent, and knows how
//! to issue conditional GETs and stream a body into a local file.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ETAG, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::{Client, Response, StatusCode};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument, trace};

use super::constants::{CONNECT_TIMEOUT_SECS, TOTAL_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::metadata::CacheRecord;
use crate::user_agent;

/// HTTP client for listing and downloading.
///
/// Create once per run and clone freely: clones share the connection pool.
///
/// # Example
///
/// ```no_run
/// use mirror_core::download::HttpClient;
/// use mirror_core::metadata::CacheRecord;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let response = client
///     .conditional_get("https://files.example.com/a.txt", &CacheRecord::default())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

/// Result of a conditional GET that did not fail.
#[derive(Debug)]
pub enum ConditionalResponse {
    /// The server answered 304; the body is ignored.
    NotModified,
    /// The server sent fresh content with a 2xx status.
    Fresh(Response),
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 60 seconds
    /// - Total request timeout: 5 minutes
    /// - Gzip decompression: enabled
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_timeouts(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(TOTAL_TIMEOUT_SECS),
        )
        .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a new HTTP client with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the TLS backend or system
    /// configuration prevents building a client.
    #[instrument(level = "debug")]
    pub fn with_timeouts(
        connect_timeout: Duration,
        total_timeout: Duration,
    ) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(total_timeout)
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|source| DownloadError::ClientBuild { source })?;
        Ok(Self { client })
    }

    /// Issues a GET carrying the validators in `record` as
    /// `If-None-Match` / `If-Modified-Since`. Absent validators send no header.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Network`] or [`DownloadError::Timeout`] on
    /// transport failure and [`DownloadError::HttpStatus`] for any status
    /// that is neither 2xx nor 304.
    #[instrument(level = "debug", skip(self, record), fields(url = %url))]
    pub async fn conditional_get(
        &self,
        url: &str,
        record: &CacheRecord,
    ) -> Result<ConditionalResponse, DownloadError> {
        let mut request = self.client.get(url);
        if let Some(etag) = &record.etag {
            request = request.header(IF_NONE_MATCH, etag.as_str());
        }
        if let Some(last_modified) = &record.last_modified {
            request = request.header(IF_MODIFIED_SINCE, last_modified.as_str());
        }

        trace!(
            method = "GET",
            url,
            if_none_match = ?record.etag,
            if_modified_since = ?record.last_modified,
            "sending request"
        );

        let response = request
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        trace_response(url, &response);

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            return Ok(ConditionalResponse::NotModified);
        }
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        Ok(ConditionalResponse::Fresh(response))
    }

    /// Returns a reference to the underlying reqwest client.
    ///
    /// The listing fetcher uses this for its JSON requests.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Emits the response status and every header at trace level.
pub(crate) fn trace_response(url: &str, response: &Response) {
    trace!(url, status = response.status().as_u16(), "received response");
    for (name, value) in response.headers() {
        if let Ok(value) = value.to_str() {
            trace!(url, header = %name, value, "response header");
        }
    }
}

/// Validators carried by a fresh response, empty values dropped.
pub(crate) fn response_validators(response: &Response) -> (Option<String>, Option<String>) {
    let header = |name: HeaderName| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
    };
    (header(ETAG), header(LAST_MODIFIED))
}

/// Streams the whole response body into a newly created file at `file_path`,
/// returning bytes written. The caller owns cleanup on error.
pub(crate) async fn stream_to_file(
    response: Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let file = File::create(file_path)
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    // Ensure all data is flushed before the caller renames the file.
    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    debug!(path = %file_path.display(), bytes = bytes_written, "body written");
    Ok(bytes_written)
}
