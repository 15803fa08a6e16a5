//! Constants for the download module (timeouts, concurrency, local layout).

/// Default HTTP connect timeout (60 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 60;

/// Default total timeout for one HTTP request, body included (5 minutes).
pub const TOTAL_TIMEOUT_SECS: u64 = 300;

/// Default number of file transfers allowed in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 50;

/// Upper bound accepted for the download concurrency limit.
pub const MAX_CONCURRENCY: usize = 1024;

/// Suffix of the temporary artifact written next to each destination file.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Name of the reserved subdirectory of the destination root holding cache records.
pub const METADATA_DIR_NAME: &str = ".metadata";
