//! One-directory listing fetch.

use reqwest::header::ACCEPT;
use tracing::{debug, error, instrument, trace};

use super::entry::{DirRef, DirectoryEntry, FileRef, Listing};
use super::error::ListingError;
use crate::download::HttpClient;

/// Fetches and parses the JSON listing of a single directory.
#[derive(Debug, Clone)]
pub struct ListingFetcher {
    client: HttpClient,
}

impl ListingFetcher {
    /// Creates a fetcher sharing `client`'s connection pool and timeouts.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Lists `dir`, failing soft.
    ///
    /// Any error is logged and yields an empty [`Listing`], which ends the
    /// crawl of that branch without affecting its siblings.
    pub async fn fetch(&self, dir: &DirRef) -> Listing {
        match self.try_fetch(dir).await {
            Ok(listing) => listing,
            Err(e) => {
                error!(url = %dir.normalized_url(), error = %e, "failed to fetch directory listing");
                Listing::default()
            }
        }
    }

    /// Lists `dir`, returning the error instead of swallowing it.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError`] on transport failure, non-2xx status, or a
    /// body that is not a JSON array of entries.
    #[instrument(level = "debug", skip(self, dir), fields(url = %dir.url, prefix = %dir.path_prefix))]
    pub async fn try_fetch(&self, dir: &DirRef) -> Result<Listing, ListingError> {
        let url = dir.normalized_url();
        debug!(url = %url, "fetching directory listing");
        trace!(method = "GET", url = %url, accept = "application/json", "sending request");

        let response = self
            .client
            .inner()
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ListingError::network(&url, e))?;

        crate::download::trace_response(&url, &response);

        let status = response.status();
        if !status.is_success() {
            return Err(ListingError::http_status(&url, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ListingError::network(&url, e))?;
        let entries: Vec<DirectoryEntry> =
            serde_json::from_slice(&body).map_err(|e| ListingError::parse(&url, e))?;

        Ok(parse_listing(&url, &dir.path_prefix, entries))
    }
}

/// Turns raw entries of the directory at `dir_url` into references.
///
/// `dir_url` must already end with `/`. Entry URLs are joined by plain
/// concatenation after stripping a leading `./`; entry paths are
/// `prefix + name`, and subdirectory prefixes gain a trailing `/`.
#[must_use]
pub fn parse_listing(dir_url: &str, prefix: &str, entries: Vec<DirectoryEntry>) -> Listing {
    let mut listing = Listing::default();

    for entry in entries {
        if entry.is_ignored() {
            continue;
        }

        let full_path = format!("{prefix}{}", entry.normalized_name());
        let full_url = format!("{dir_url}{}", entry.relative_url());

        if entry.is_dir {
            listing.dirs.push(DirRef::new(full_url, format!("{full_path}/")));
        } else {
            debug!(path = %full_path, url = %full_url, "found file");
            listing.files.push(FileRef::new(full_path, full_url));
        }
    }

    listing
}
