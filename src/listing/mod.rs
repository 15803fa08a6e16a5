//! Directory listing fetch and normalization.
//!
//! A browsable Caddy server answers `GET <dir>/` with `Accept: application/json`
//! by returning the immediate children of that directory:
//!
//! ```json
//! [
//!   {"name": "sub/", "url": "./sub/", "is_dir": true, "size": 4096},
//!   {"name": "a.txt", "url": "./a.txt", "is_dir": false, "size": 5}
//! ]
//! ```
//!
//! [`ListingFetcher`] turns one such response into [`FileRef`]s and
//! [`DirRef`]s. It never recurses; that is the crawler's job.

mod entry;
mod error;
mod fetcher;

pub use entry::{DirRef, DirectoryEntry, FileRef, Listing};
pub use error::ListingError;
pub use fetcher::{ListingFetcher, parse_listing};
