//! Listing data types.

use serde::{Deserialize, Deserializer};

/// One raw entry of a JSON directory listing.
///
/// Only the fields the mirror needs are read; everything else the server
/// sends (`size`, `mod_time`, `mode`, ...) is ignored. Missing or `null`
/// fields fall back to empty / `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DirectoryEntry {
    /// Entry name; directories may carry a trailing `/`.
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the entry is a directory.
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_dir: bool,
    /// URL of the entry relative to the directory URL, often `./`-prefixed.
    #[serde(default)]
    pub url: Option<String>,
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl DirectoryEntry {
    /// Name with any trailing `/` removed.
    #[must_use]
    pub fn normalized_name(&self) -> &str {
        self.name.as_deref().unwrap_or("").trim_end_matches('/')
    }

    /// Relative URL with a leading `./` removed.
    #[must_use]
    pub fn relative_url(&self) -> &str {
        let url = self.url.as_deref().unwrap_or("");
        url.strip_prefix("./").unwrap_or(url)
    }

    /// True for the entries every listing skips: `.`, `..` and nameless ones.
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        matches!(self.normalized_name(), "" | "." | "..")
    }
}

/// A remote file to mirror.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileRef {
    /// Location relative to the mirror root, `/`-separated, no leading `./`.
    pub path: String,
    /// Fully resolved remote URL.
    pub url: String,
}

impl FileRef {
    /// Creates a file reference.
    pub fn new(path: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
        }
    }
}

/// A remote directory still to be listed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirRef {
    /// Directory URL.
    pub url: String,
    /// Relative path of the directory; empty for the root, otherwise ends with `/`.
    pub path_prefix: String,
}

impl DirRef {
    /// Creates a directory reference.
    pub fn new(url: impl Into<String>, path_prefix: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            path_prefix: path_prefix.into(),
        }
    }

    /// The mirror root: `base_url` with an empty prefix.
    pub fn root(base_url: impl Into<String>) -> Self {
        Self::new(base_url, String::new())
    }

    /// Directory URL with exactly one trailing `/`.
    #[must_use]
    pub fn normalized_url(&self) -> String {
        format!("{}/", self.url.trim_end_matches('/'))
    }
}

/// The direct children of one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Files in listing order.
    pub files: Vec<FileRef>,
    /// Subdirectories in listing order.
    pub dirs: Vec<DirRef>,
}

impl Listing {
    /// True when the directory contributed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }
}
