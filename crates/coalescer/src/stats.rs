//! Coalescer counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters of one coalescer
#[derive(Debug, Default)]
pub struct CoalescerStats {
    edits: AtomicU64,
    superseded: AtomicU64,
    commits: AtomicU64,
    commits_failed: AtomicU64,
    abandoned: AtomicU64,
    resets: AtomicU64,
}

/// Point-in-time copy of [`CoalescerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Edits received
    pub edits: u64,
    /// Edits that replaced a still-pending timer
    pub superseded: u64,
    /// Sink calls that succeeded
    pub commits: u64,
    /// Sink calls that returned an error
    pub commits_failed: u64,
    /// Pending timers dropped without a commit
    pub abandoned: u64,
    /// Upstream resyncs
    pub resets: u64,
}

impl StatsSnapshot {
    /// Sink invocations, successful or not
    pub fn sink_calls(&self) -> u64 {
        self.commits + self.commits_failed
    }
}

impl CoalescerStats {
    pub(crate) fn record_edit(&self, superseded: bool) {
        self.edits.fetch_add(1, Ordering::Relaxed);
        if superseded {
            self.superseded.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_commit(&self, ok: bool) {
        if ok {
            self.commits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.commits_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_abandoned(&self, count: usize) {
        self.abandoned.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            edits: self.edits.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            commits_failed: self.commits_failed.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
        }
    }
}
