use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;

use crate::error::Tier;

/// Outcome of a single `get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit(Tier),
    Miss,
}

/// Lock-free hit/miss counters.
#[derive(Default)]
pub struct StatsCollector {
    memory_hits: AtomicU64,
    file_hits: AtomicU64,
    remote_hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    last_cleanup: Mutex<Option<OffsetDateTime>>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, lookup: Lookup) {
        match lookup {
            Lookup::Hit(tier) => {
                let counter = match tier {
                    Tier::Memory => &self.memory_hits,
                    Tier::File => &self.file_hits,
                    Tier::Remote => &self.remote_hits,
                };
                counter.fetch_add(1, Ordering::Relaxed);
                crate::metrics::record_cache_hit(tier);
            }
            Lookup::Miss => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                crate::metrics::record_cache_miss();
            }
        }
    }

    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cleanup(&self) {
        *self.last_cleanup.lock() = Some(OffsetDateTime::now_utc());
    }

    pub fn total_requests(&self) -> u64 {
        self.hits() + self.misses.load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> u64 {
        self.memory_hits.load(Ordering::Relaxed)
            + self.file_hits.load(Ordering::Relaxed)
            + self.remote_hits.load(Ordering::Relaxed)
    }

    /// `hits / (hits + misses)`, 0.0 before the first request.
    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits(), self.misses.load(Ordering::Relaxed))
    }

    /// Counter part of a [`CacheStats`]; tier sizes are filled by the caller.
    pub fn snapshot(&self) -> CacheStats {
        let memory_hits = self.memory_hits.load(Ordering::Relaxed);
        let file_hits = self.file_hits.load(Ordering::Relaxed);
        let remote_hits = self.remote_hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let hits = memory_hits + file_hits + remote_hits;
        CacheStats {
            total_requests: hits + misses,
            hits,
            misses,
            hit_rate: hit_rate(hits, misses),
            memory_hits,
            file_hits,
            remote_hits,
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            last_cleanup: *self.last_cleanup.lock(),
            ..CacheStats::default()
        }
    }
}

fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Cache statistics as returned by `get_stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
    /// Between 0.0 and 1.0.
    pub hit_rate: f64,
    pub memory_hits: u64,
    pub file_hits: u64,
    pub remote_hits: u64,
    pub sets: u64,
    pub deletes: u64,
    /// Entries evicted from the memory tier under capacity pressure.
    pub evictions: u64,
    pub memory_entries: usize,
    pub memory_capacity: usize,
    pub file_bytes: u64,
    /// `None` when the shared tier is not configured or not reachable.
    pub remote_entries: Option<u64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_cleanup: Option<OffsetDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_without_requests_is_zero() {
        let stats = StatsCollector::new();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.snapshot().hit_rate, 0.0);
        assert_eq!(stats.total_requests(), 0);
    }

    #[test]
    fn test_counts_per_tier() {
        let stats = StatsCollector::new();
        stats.record(Lookup::Hit(Tier::Memory));
        stats.record(Lookup::Hit(Tier::Memory));
        stats.record(Lookup::Hit(Tier::File));
        stats.record(Lookup::Hit(Tier::Remote));
        stats.record(Lookup::Miss);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.memory_hits, 2);
        assert_eq!(snapshot.file_hits, 1);
        assert_eq!(snapshot.remote_hits, 1);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.total_requests, 5);
        assert!((snapshot.hit_rate - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cleanup_timestamp_serializes() {
        let stats = StatsCollector::new();
        assert!(stats.snapshot().last_cleanup.is_none());
        stats.record_cleanup();
        let snapshot = stats.snapshot();
        assert!(snapshot.last_cleanup.is_some());

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json["last_cleanup"].as_str().unwrap().contains('T'));
    }
}
