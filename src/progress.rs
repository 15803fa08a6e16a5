//! Monotonic progress counters shared between concurrent tasks.
//!
//! The crawler advances one counter per discovered file and the download
//! pipeline advances another per finished transfer. Readers (a spinner, the
//! `[n/total]` labels) only ever take snapshots; no decision in the core
//! depends on an intermediate value.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Atomic counter with an increment and a snapshot read.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    value: AtomicUsize,
}

impl ProgressCounter {
    /// Creates a counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `n` and returns the value after the addition.
    pub fn add(&self, n: usize) -> usize {
        self.value.fetch_add(n, Ordering::Relaxed) + n
    }

    /// Adds one and returns the value after the addition.
    ///
    /// Concurrent callers each observe a distinct result, which is what the
    /// `[n/total]` labels rely on.
    pub fn increment(&self) -> usize {
        self.add(1)
    }

    /// Returns the current value.
    #[must_use]
    pub fn get(&self) -> usize {
        self.value.load(Ordering::Relaxed)
    }
}
