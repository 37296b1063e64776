//! In-process tier: bounded, recency-ordered, volatile.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::entry::{CacheEntry, now_millis};
use crate::error::CacheError;

/// LRU-bounded memory tier.
///
/// All operations are non-suspending; the mutex is never held across an
/// `.await`.
pub struct MemoryTier {
    entries: Mutex<LruCache<String, CacheEntry>>,
    evictions: AtomicU64,
}

impl MemoryTier {
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| CacheError::configuration("memory capacity must be greater than 0"))?;
        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
            evictions: AtomicU64::new(0),
        })
    }

    /// Look up `key`, marking it most recently used.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_expired_at(now_millis()) => return Some(entry.clone()),
            Some(_) => {}
            None => return None,
        }
        entries.pop(key);
        None
    }

    /// Look up without touching recency or purging.
    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.lock();
        entries
            .peek(key)
            .filter(|entry| !entry.is_expired_at(now_millis()))
            .cloned()
    }

    /// Insert or overwrite. When full and `entry.key` is new, the least
    /// recently used entry is evicted first and its key returned.
    pub fn insert(&self, entry: CacheEntry) -> Option<String> {
        let mut entries = self.entries.lock();
        let mut evicted = None;
        if !entries.contains(&entry.key) && entries.len() >= entries.cap().get() {
            if let Some((key, _)) = entries.pop_lru() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                crate::metrics::record_evictions(1);
                evicted = Some(key);
            }
        }
        entries.put(entry.key.clone(), entry);
        evicted
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.lock().pop(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Canonical keys of all live entries.
    pub fn keys(&self) -> Vec<String> {
        let now = now_millis();
        self.entries
            .lock()
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Live entries ordered least- to most-recently used.
    pub fn snapshot(&self) -> Vec<CacheEntry> {
        let now = now_millis();
        self.entries
            .lock()
            .iter()
            .rev()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    /// Replace the whole content in one locked step. `entries` are expected
    /// least- to most-recently used; the tail wins if it exceeds capacity.
    pub fn replace_all(&self, entries: Vec<CacheEntry>) {
        let mut guard = self.entries.lock();
        guard.clear();
        for entry in entries {
            guard.put(entry.key.clone(), entry);
        }
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = now_millis();
        let mut entries = self.entries.lock();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    /// Remove every entry, or only those whose canonical key starts with
    /// `"<namespace>:"`. Returns the removed keys.
    pub fn clear(&self, namespace: Option<&str>) -> Vec<String> {
        let mut entries = self.entries.lock();
        let doomed: Vec<String> = match namespace {
            None => entries.iter().map(|(key, _)| key.clone()).collect(),
            Some(ns) => {
                let prefix = format!("{ns}:");
                entries
                    .iter()
                    .filter(|(key, _)| key.starts_with(&prefix))
                    .map(|(key, _)| key.clone())
                    .collect()
            }
        };
        for key in &doomed {
            entries.pop(key);
        }
        doomed
    }
}
