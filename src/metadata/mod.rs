//! Per-file sidecar records holding HTTP cache validators.
//!
//! Every mirrored file `<path>` has a record at `<root>/<path>.meta`, where
//! `<root>` is normally `<download_dir>/.metadata`. The format is plain
//! `key=value` lines:
//!
//! ```text
//! etag="v1"
//! last_modified=Wed, 21 Oct 2015 07:28:00 GMT
//! ```
//!
//! Only `etag` and `last_modified` are recognized. A validator that is absent,
//! empty or the literal `null` is treated as unknown and never written, so no
//! empty conditional header is ever sent.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tracing::{debug, instrument};

/// Suffix appended to a mirrored file's relative path to name its record.
pub const RECORD_SUFFIX: &str = ".meta";

const ETAG_KEY: &str = "etag";
const LAST_MODIFIED_KEY: &str = "last_modified";

/// Distinguishes concurrent saves of the same record.
static SAVE_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Errors produced when persisting a record.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// I/O error creating directories or writing the record.
    #[error("IO error writing cache record {path}: {source}")]
    Io {
        /// The record path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Cache validators known for one mirrored file.
///
/// `None` means "no validator known"; it is never represented as an empty
/// string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheRecord {
    /// Opaque `ETag` from the last successful download.
    pub etag: Option<String>,
    /// `Last-Modified` from the last successful download.
    pub last_modified: Option<String>,
}

impl CacheRecord {
    /// Builds a record, dropping empty and `null` validators.
    #[must_use]
    pub fn new(etag: Option<&str>, last_modified: Option<&str>) -> Self {
        Self {
            etag: normalize_validator(etag),
            last_modified: normalize_validator(last_modified),
        }
    }

    /// Returns true when neither validator is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }

    /// Parses sidecar content. Unknown keys and lines without `=` are ignored.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut record = Self::default();
        for line in content.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key.trim() {
                ETAG_KEY => record.etag = normalize_validator(Some(value)),
                LAST_MODIFIED_KEY => record.last_modified = normalize_validator(Some(value)),
                _ => {}
            }
        }
        record
    }

    /// Renders the record in sidecar format, omitting absent validators.
    #[must_use]
    pub fn to_sidecar_string(&self) -> String {
        let mut out = String::new();
        if let Some(etag) = &self.etag {
            out.push_str(ETAG_KEY);
            out.push('=');
            out.push_str(etag);
            out.push('\n');
        }
        if let Some(last_modified) = &self.last_modified {
            out.push_str(LAST_MODIFIED_KEY);
            out.push('=');
            out.push_str(last_modified);
            out.push('\n');
        }
        out
    }
}

fn normalize_validator(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "null")
        .map(ToString::to_string)
}

/// Reads and writes cache records under a metadata root directory.
///
/// Records are keyed 1:1 by mirrored path, so concurrent tasks working on
/// different files never touch the same record and no locking is needed.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    root: PathBuf,
}

impl MetadataStore {
    /// Creates a store rooted at `root` (typically `<download_dir>/.metadata`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the metadata root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the record path for a mirrored relative path.
    #[must_use]
    pub fn record_path(&self, path: &str) -> PathBuf {
        self.root.join(format!("{path}{RECORD_SUFFIX}"))
    }

    /// Loads the record for `path`.
    ///
    /// Fails soft: a missing, unreadable or malformed record yields an empty
    /// [`CacheRecord`].
    #[instrument(level = "debug", skip(self))]
    pub async fn load(&self, path: &str) -> CacheRecord {
        let record_path = self.record_path(path);
        match tokio::fs::read_to_string(&record_path).await {
            Ok(content) => CacheRecord::parse(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => CacheRecord::default(),
            Err(e) => {
                debug!(path = %record_path.display(), error = %e, "unreadable cache record, ignoring");
                CacheRecord::default()
            }
        }
    }

    /// Persists validators for `path`, replacing any previous record.
    ///
    /// Parent directories are created as needed. The record is written to a
    /// temporary file and renamed into place, so a concurrent reader sees
    /// either the old record or the new one.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Io`] if the directories or the record cannot
    /// be written.
    #[instrument(level = "debug", skip(self))]
    pub async fn save(
        &self,
        path: &str,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<(), MetadataError> {
        let record = CacheRecord::new(etag, last_modified);
        let record_path = self.record_path(path);
        let io_err = |source| MetadataError::Io {
            path: record_path.clone(),
            source,
        };

        if let Some(parent) = record_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let seq = SAVE_SEQ.fetch_add(1, Ordering::Relaxed);
        let temp_path = self.root.join(format!("{path}{RECORD_SUFFIX}.{seq}.tmp"));
        tokio::fs::write(&temp_path, record.to_sidecar_string())
            .await
            .map_err(io_err)?;
        if let Err(e) = tokio::fs::rename(&temp_path, &record_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(io_err(e));
        }

        debug!(path = %record_path.display(), "cache record saved");
        Ok(())
    }
}
