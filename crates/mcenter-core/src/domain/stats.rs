//! Per-type counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one `(message, type)` pair.
///
/// Every work item accepted for the message adds one `pending` to each type it
/// still has to run. A pending entry leaves either through `started` (then
/// `finished`) or through `skipped` when shutdown stops the loop.
#[derive(Debug, Default)]
pub struct TypeStats {
    pending: AtomicU64,
    doing: AtomicU64,
    done: AtomicU64,
    errors: AtomicU64,
    timeouts: AtomicU64,
}

impl TypeStats {
    pub fn enqueued(&self) {
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    pub fn skipped(&self) {
        self.pending.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn started(&self) {
        self.pending.fetch_sub(1, Ordering::Relaxed);
        self.doing.fetch_add(1, Ordering::Relaxed);
    }

    pub fn finished(&self, ok: bool) {
        self.doing.fetch_sub(1, Ordering::Relaxed);
        if ok {
            self.done.fetch_add(1, Ordering::Relaxed);
        } else {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn timed_out(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TypeStatsSnapshot {
        TypeStatsSnapshot {
            pending: self.pending.load(Ordering::Relaxed),
            doing: self.doing.load(Ordering::Relaxed),
            done: self.done.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeStatsSnapshot {
    pub pending: u64,
    pub doing: u64,
    pub done: u64,
    pub errors: u64,
    pub timeouts: u64,
}
