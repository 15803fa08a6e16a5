//! Recursive, concurrent discovery of the remote tree.
//!
//! Every directory is listed by its own Tokio task and every subdirectory it
//! reports is spawned immediately, so discovery fans out as wide as the tree
//! is. A directory's task returns only after all of its children have
//! returned, and the root call returns the merged file list of the whole
//! reachable tree.
//!
//! The order of the returned files follows task completion and carries no
//! meaning.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use crate::listing::{DirRef, FileRef, ListingFetcher};
use crate::progress::ProgressCounter;

#[derive(Debug)]
struct CrawlShared {
    fetcher: ListingFetcher,
    found: Arc<ProgressCounter>,
    listing_gate: Option<Arc<Semaphore>>,
}

/// Walks a remote directory tree through a [`ListingFetcher`].
#[derive(Debug, Clone)]
pub struct TreeCrawler {
    shared: Arc<CrawlShared>,
}

impl TreeCrawler {
    /// Creates an unbounded crawler with a fresh found-files counter.
    #[must_use]
    pub fn new(fetcher: ListingFetcher) -> Self {
        Self::with_counter(fetcher, Arc::new(ProgressCounter::new()))
    }

    /// Creates an unbounded crawler advancing `found` by each directory's file count.
    #[must_use]
    pub fn with_counter(fetcher: ListingFetcher, found: Arc<ProgressCounter>) -> Self {
        Self {
            shared: Arc::new(CrawlShared {
                fetcher,
                found,
                listing_gate: None,
            }),
        }
    }

    /// Caps simultaneous directory fetches at `limit` (`0` keeps it unbounded).
    ///
    /// A permit covers one listing request only and is released before the
    /// directory waits on its children, so nesting depth cannot exhaust it.
    #[must_use]
    pub fn with_listing_limit(self, limit: usize) -> Self {
        let gate = (limit > 0).then(|| Arc::new(Semaphore::new(limit)));
        Self {
            shared: Arc::new(CrawlShared {
                fetcher: self.shared.fetcher.clone(),
                found: Arc::clone(&self.shared.found),
                listing_gate: gate,
            }),
        }
    }

    /// The counter of files found so far, for live progress display.
    #[must_use]
    pub fn found_counter(&self) -> Arc<ProgressCounter> {
        Arc::clone(&self.shared.found)
    }

    /// Discovers every file reachable from `base_url`.
    ///
    /// Directories whose listing fails contribute nothing; their siblings are
    /// still crawled.
    #[instrument(skip(self), fields(bounded = self.shared.listing_gate.is_some()))]
    pub async fn crawl(&self, base_url: &str) -> Vec<FileRef> {
        let files = visit(Arc::clone(&self.shared), DirRef::root(base_url)).await;
        debug!(files = files.len(), "crawl complete");
        files
    }
}

/// Lists `dir`, then crawls each of its subdirectories in its own task.
fn visit(shared: Arc<CrawlShared>, dir: DirRef) -> BoxFuture<'static, Vec<FileRef>> {
    async move {
        let listing = {
            let _permit = match &shared.listing_gate {
                Some(gate) => Arc::clone(gate).acquire_owned().await.ok(),
                None => None,
            };
            shared.fetcher.fetch(&dir).await
        };

        let mut files = listing.files;
        shared.found.add(files.len());
        debug!(
            prefix = %dir.path_prefix,
            files = files.len(),
            subdirs = listing.dirs.len(),
            "directory listed"
        );

        let mut children = JoinSet::new();
        for sub in listing.dirs {
            children.spawn(visit(Arc::clone(&shared), sub));
        }
        while let Some(joined) = children.join_next().await {
            match joined {
                Ok(mut sub_files) => files.append(&mut sub_files),
                Err(e) => warn!(prefix = %dir.path_prefix, error = %e, "directory task panicked"),
            }
        }

        files
    }
    .boxed()
}
