use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Registry counters with atomic updates
#[derive(Debug, Default)]
pub struct RegistryStats {
    adds: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    updates: AtomicU64,
    stale_updates: AtomicU64,
    deletions: AtomicU64,
    decode_failures: AtomicU64,
}

/// Point-in-time copy of [`RegistryStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RegistryStatsSnapshot {
    pub adds: u64,
    pub hits: u64,
    pub misses: u64,
    pub updates: u64,
    /// Updates that found the ticket already purged
    pub stale_updates: u64,
    pub deletions: u64,
    pub decode_failures: u64,
}

impl RegistryStats {
    pub fn record_add(&self) {
        self.adds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_update(&self, written: bool) {
        if written {
            self.updates.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stale_updates.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_deletion(&self) {
        self.deletions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn snapshot(&self) -> RegistryStatsSnapshot {
        RegistryStatsSnapshot {
            adds: self.adds.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            stale_updates: self.stale_updates.load(Ordering::Relaxed),
            deletions: self.deletions.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
        }
    }
}
