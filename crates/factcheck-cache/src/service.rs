//! The orchestrator composing memory, file and Redis tiers.
//!
//! ## Lookup Order
//!
//! ```text
//! get → Memory ──miss──→ File ──miss──→ Remote ──miss──→ None
//!         │hit             │hit            │hit
//!         ▼                ▼               ▼
//!       value        promote → Memory  promote → File + Memory
//! ```
//!
//! The first tier that hits is authoritative for the promoted value and no
//! tier is asked twice within one `get`. Tier failures are logged at warn
//! level and count as a miss for that tier only.
//!
//! ## Write Strategy
//!
//! `set` writes memory first (cannot fail), then file and Redis
//! concurrently with the same absolute expiry. File/Redis failures are
//! logged and surface only through `health_check`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::codec;
use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::error::{CacheError, Tier};
use crate::key::{CacheKey, KeyPattern, validate_namespace};
use crate::memo::InFlightRegistry;
use crate::stats::{CacheStats, Lookup, StatsCollector};
use crate::tier::{FileTier, MemoryTier, RemoteTier};

pub(crate) struct CacheInner {
    pub(crate) config: CacheConfig,
    pub(crate) memory: MemoryTier,
    pub(crate) file: FileTier,
    pub(crate) remote: RemoteTier,
    pub(crate) stats: StatsCollector,
    pub(crate) in_flight: InFlightRegistry,
    pub(crate) shutdown: CancellationToken,
    pub(crate) tasks: TaskTracker,
    closed: AtomicBool,
}

impl Drop for CacheInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Tiered cache service.
///
/// Construct one per process and pass clones to collaborators; clones share
/// all state. Call [`close`](Self::close) before shutdown to stop background
/// tasks and release Redis connections.
#[derive(Clone)]
pub struct CacheService {
    pub(crate) inner: Arc<CacheInner>,
}

impl CacheService {
    /// Build the service from validated configuration.
    ///
    /// Fails with `CacheError::Configuration` if the cache directory is
    /// unusable or the Redis URL is malformed. An unreachable Redis is not
    /// an error; the shared tier simply starts degraded.
    pub async fn new(config: CacheConfig) -> Result<Self, CacheError> {
        config.validate()?;

        let memory = MemoryTier::new(config.memory_capacity)?;
        let file = FileTier::open(&config.cache_dir, config.file_timeout()).await?;
        let remote = RemoteTier::connect(&config.redis).await?;

        tracing::info!(
            cache_dir = %config.cache_dir.display(),
            memory_capacity = config.memory_capacity,
            remote = remote.is_configured(),
            "Cache service initialized"
        );

        let service = Self {
            inner: Arc::new(CacheInner {
                config,
                memory,
                file,
                remote,
                stats: StatsCollector::new(),
                in_flight: InFlightRegistry::default(),
                shutdown: CancellationToken::new(),
                tasks: TaskTracker::new(),
                closed: AtomicBool::new(false),
            }),
        };
        service.start_cleanup_task();
        Ok(service)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Periodically purge expired entries until `close()` or drop.
    fn start_cleanup_task(&self) {
        let Some(period) = self.inner.config.cleanup_interval() else {
            return;
        };
        let weak = Arc::downgrade(&self.inner);
        let shutdown = self.inner.shutdown.clone();
        self.inner.tasks.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(inner) = weak.upgrade() else { break };
                        let removed = CacheService { inner }.cleanup_expired().await;
                        if removed > 0 {
                            tracing::debug!(removed, "Background cleanup purged expired entries");
                        }
                    }
                }
            }
        });
    }

    fn tier_failure(&self, tier: Tier, key: &str, error: &CacheError) {
        crate::metrics::record_tier_error(tier);
        tracing::warn!(key = %key, tier = %tier, error = %error, "Cache tier operation failed");
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Find `canonical` in the fastest tier that has it, promoting upward.
    async fn lookup(&self, canonical: &str) -> (Option<CacheEntry>, Lookup) {
        let inner = &self.inner;

        if let Some(entry) = inner.memory.get(canonical) {
            tracing::debug!(key = %canonical, "cache hit (memory)");
            return (Some(entry), Lookup::Hit(Tier::Memory));
        }

        match inner.file.get(canonical).await {
            Ok(Some(entry)) => {
                tracing::debug!(key = %canonical, "cache hit (file)");
                inner.memory.insert(entry.clone());
                return (Some(entry), Lookup::Hit(Tier::File));
            }
            Ok(None) => {}
            Err(e) => self.tier_failure(Tier::File, canonical, &e),
        }

        if inner.remote.is_configured() {
            match inner.remote.get(canonical).await {
                Ok(Some(entry)) => {
                    tracing::debug!(key = %canonical, "cache hit (remote)");
                    inner.memory.insert(entry.clone());
                    if let Err(e) = inner.file.put(&entry).await {
                        self.tier_failure(Tier::File, canonical, &e);
                    }
                    return (Some(entry), Lookup::Hit(Tier::Remote));
                }
                Ok(None) => {}
                Err(e) => self.tier_failure(Tier::Remote, canonical, &e),
            }
        }

        tracing::debug!(key = %canonical, "cache miss");
        (None, Lookup::Miss)
    }

    /// Raw framed bytes for `key`, or `None` on a miss.
    ///
    /// Never fails: a total tier failure looks exactly like a miss.
    pub async fn get_raw(&self, key: &str, namespace: &str) -> Option<Arc<Vec<u8>>> {
        let canonical = match CacheKey::new(namespace, key) {
            Ok(key) => key.canonical(),
            Err(e) => {
                tracing::warn!(namespace, error = %e, "Rejected cache lookup");
                return None;
            }
        };
        let (entry, lookup) = self.lookup(&canonical).await;
        self.inner.stats.record(lookup);
        entry.map(|entry| entry.value)
    }

    /// Typed lookup.
    ///
    /// `Ok(None)` is a miss. `Err(Serialization)` means a value exists but
    /// cannot be decoded as `T`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        namespace: &str,
    ) -> Result<Option<T>, CacheError> {
        match self.get_raw(key, namespace).await {
            Some(bytes) => codec::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Store framed bytes under a canonical key in every tier.
    pub(crate) async fn store(&self, canonical: &str, value: Arc<Vec<u8>>, ttl: Option<Duration>) {
        let inner = &self.inner;
        let ttl = ttl.or_else(|| inner.config.default_ttl());
        let entry = CacheEntry::with_value(canonical, value, ttl);

        if let Some(evicted) = inner.memory.insert(entry.clone()) {
            tracing::debug!(key = %evicted, "evicted from memory tier");
        }

        let remote_write = async {
            if inner.remote.is_configured() {
                inner.remote.put(&entry).await
            } else {
                Ok(())
            }
        };
        let (file_result, remote_result) = tokio::join!(inner.file.put(&entry), remote_write);
        if let Err(e) = file_result {
            self.tier_failure(Tier::File, canonical, &e);
        }
        if let Err(e) = remote_result {
            self.tier_failure(Tier::Remote, canonical, &e);
        }
        inner.stats.record_set();
        tracing::debug!(key = %canonical, ttl = ?ttl, "cache set");
    }

    /// Store already-framed bytes (see [`codec::encode`]).
    pub async fn set_raw(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
        namespace: &str,
    ) -> Result<(), CacheError> {
        // Reject bytes that could never be read back
        codec::decode::<serde::de::IgnoredAny>(&value)?;
        let canonical = CacheKey::new(namespace, key)?.canonical();
        self.store(&canonical, Arc::new(value), ttl).await;
        Ok(())
    }

    /// Serialize and store `value`.
    ///
    /// Succeeds once the memory tier holds the value; file and Redis writes
    /// are best effort. `ttl = None` applies the configured default TTL.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        namespace: &str,
    ) -> Result<(), CacheError> {
        let canonical = CacheKey::new(namespace, key)?.canonical();
        let bytes = codec::encode(value)?;
        self.store(&canonical, Arc::new(bytes), ttl).await;
        Ok(())
    }

    /// Remove `key` from every tier. Returns `true` if any tier held it.
    pub async fn delete(&self, key: &str, namespace: &str) -> bool {
        let inner = &self.inner;
        let canonical = match CacheKey::new(namespace, key) {
            Ok(key) => key.canonical(),
            Err(e) => {
                tracing::warn!(namespace, error = %e, "Rejected cache delete");
                return false;
            }
        };

        let mut removed = inner.memory.remove(&canonical);
        let remote_delete = async {
            if inner.remote.is_configured() {
                inner.remote.remove(&canonical).await
            } else {
                Ok(false)
            }
        };
        let (file_result, remote_result) = tokio::join!(inner.file.remove(&canonical), remote_delete);
        match file_result {
            Ok(hit) => removed |= hit,
            Err(e) => self.tier_failure(Tier::File, &canonical, &e),
        }
        match remote_result {
            Ok(hit) => removed |= hit,
            Err(e) => self.tier_failure(Tier::Remote, &canonical, &e),
        }
        inner.stats.record_delete();
        tracing::debug!(key = %canonical, removed, "cache delete");
        removed
    }

    /// Remove everything, or everything in `namespace`, from all tiers.
    ///
    /// Returns the number of distinct keys removed from memory and file
    /// tiers; Redis deletions are best effort. A full clear only touches
    /// Redis keys in namespaces found in the memory or file tier, so other
    /// applications sharing the server keep their data.
    pub async fn clear(&self, namespace: Option<&str>) -> usize {
        if let Some(ns) = namespace {
            if let Err(e) = validate_namespace(ns) {
                tracing::warn!(namespace = ns, error = %e, "Rejected cache clear");
                return 0;
            }
        }
        let inner = &self.inner;
        let remote_namespaces: BTreeSet<String> = match namespace {
            Some(ns) => BTreeSet::from([ns.to_string()]),
            None if inner.remote.is_configured() => namespaces_of(&self.local_keys().await),
            None => BTreeSet::new(),
        };

        let mut removed: BTreeSet<String> = inner.memory.clear(namespace).into_iter().collect();
        match inner.file.clear(namespace).await {
            Ok(keys) => removed.extend(keys),
            Err(e) => self.tier_failure(Tier::File, namespace.unwrap_or("*"), &e),
        }
        if inner.remote.is_configured() {
            for ns in &remote_namespaces {
                let pattern = format!("{}:*", escape_redis_glob(ns));
                if let Err(e) = inner.remote.clear(&pattern).await {
                    self.tier_failure(Tier::Remote, &pattern, &e);
                }
            }
        }
        tracing::info!(namespace = ?namespace, removed = removed.len(), "cache cleared");
        removed.len()
    }

    /// Purge expired entries from memory and file tiers now.
    pub async fn cleanup_expired(&self) -> usize {
        let inner = &self.inner;
        let mut removed = inner.memory.purge_expired();
        match inner.file.purge_expired().await {
            Ok(count) => removed += count,
            Err(e) => self.tier_failure(Tier::File, "*", &e),
        }
        inner.stats.record_cleanup();
        removed
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Canonical keys held by the memory and file tiers.
    async fn local_keys(&self) -> Vec<String> {
        let mut keys = self.inner.memory.keys();
        match self.inner.file.keys().await {
            Ok(file_keys) => keys.extend(file_keys),
            Err(e) => self.tier_failure(Tier::File, "*", &e),
        }
        keys
    }

    /// Canonical keys from every tier, optionally limited to `namespace`.
    async fn canonical_keys(&self, namespace: Option<&str>) -> Vec<String> {
        let inner = &self.inner;
        let mut keys = self.local_keys().await;
        if inner.remote.is_configured() {
            let pattern = match namespace {
                Some(ns) => format!("{}:*", escape_redis_glob(ns)),
                None => "*".to_string(),
            };
            match inner.remote.keys(&pattern).await {
                Ok(remote_keys) => keys.extend(remote_keys),
                Err(e) => self.tier_failure(Tier::Remote, &pattern, &e),
            }
        }
        keys
    }

    /// Raw keys matching the glob `pattern` across all tiers, de-duplicated
    /// and sorted. With `namespace = None` every namespace is searched.
    pub async fn get_keys(&self, pattern: &str, namespace: Option<&str>) -> Vec<String> {
        let matcher = match KeyPattern::new(pattern) {
            Ok(matcher) => matcher,
            Err(e) => {
                tracing::warn!(pattern, error = %e, "Invalid key pattern");
                return Vec::new();
            }
        };
        let keys: BTreeSet<String> = self
            .canonical_keys(namespace)
            .await
            .iter()
            .filter_map(|canonical| CacheKey::parse(canonical))
            .filter(|key| namespace.is_none_or(|ns| key.namespace() == ns))
            .filter(|key| matcher.matches(key.raw()))
            .map(|key| key.raw().to_string())
            .collect();
        keys.into_iter().collect()
    }

    /// Namespaces observed in any tier, sorted.
    pub async fn get_namespaces(&self) -> Vec<String> {
        namespaces_of(&self.canonical_keys(None).await)
            .into_iter()
            .collect()
    }

    /// Counters plus current tier sizes.
    pub async fn get_stats(&self) -> CacheStats {
        let inner = &self.inner;
        let mut stats = inner.stats.snapshot();
        stats.evictions = inner.memory.evictions();
        stats.memory_entries = inner.memory.len();
        stats.memory_capacity = inner.memory.capacity();
        stats.file_bytes = match inner.file.size_bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.tier_failure(Tier::File, "*", &e);
                0
            }
        };
        stats.remote_entries = if inner.remote.is_configured() {
            inner.remote.dbsize().await.ok()
        } else {
            None
        };

        crate::metrics::set_cache_entries(Tier::Memory, stats.memory_entries as u64);
        if let Some(count) = stats.remote_entries {
            crate::metrics::set_cache_entries(Tier::Remote, count);
        }
        stats
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Stop background tasks and release Redis connections. Idempotent.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.shutdown.cancel();
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.inner.remote.close();
        tracing::info!("Cache service closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

/// Distinct namespaces of the given canonical keys.
fn namespaces_of(canonical_keys: &[String]) -> BTreeSet<String> {
    canonical_keys
        .iter()
        .filter_map(|canonical| CacheKey::parse(canonical))
        .map(|key| key.namespace().to_string())
        .collect()
}

/// Escape Redis glob metacharacters in a literal.
fn escape_redis_glob(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for ch in literal.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn service(dir: &std::path::Path, capacity: usize) -> CacheService {
        let mut config = CacheConfig::with_cache_dir(dir.join("cache"));
        config.memory_capacity = capacity;
        CacheService::new(config).await.unwrap()
    }

    #[tokio::test]
    async fn test_set_then_get_hits_memory() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = service(tmp.path(), 16).await;

        cache
            .set("claim:123", &json!({"status": "VERIFIED"}), Some(Duration::from_secs(60)), "factcheck")
            .await
            .unwrap();
        let value: Option<serde_json::Value> = cache.get("claim:123", "factcheck").await.unwrap();
        assert_eq!(value, Some(json!({"status": "VERIFIED"})));

        let stats = cache.get_stats().await;
        assert_eq!(stats.memory_hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.sets, 1);
        cache.close().await;
    }

    #[tokio::test]
    async fn test_file_hit_is_promoted() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = service(tmp.path(), 16).await;
        cache.set("k", &42u32, None, "ns").await.unwrap();

        // Drop the memory copy so the next read must go to disk
        assert!(cache.inner.memory.remove("ns:k"));
        assert_eq!(cache.get::<u32>("k", "ns").await.unwrap(), Some(42));
        assert!(cache.inner.memory.peek("ns:k").is_some());
        assert_eq!(cache.get::<u32>("k", "ns").await.unwrap(), Some(42));

        let stats = cache.get_stats().await;
        assert_eq!(stats.file_hits, 1);
        assert_eq!(stats.memory_hits, 1);
    }

    #[tokio::test]
    async fn test_promotion_keeps_expiry() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = service(tmp.path(), 16).await;
        cache.set("k", "v", Some(Duration::from_secs(30)), "ns").await.unwrap();
        let written = cache.inner.memory.peek("ns:k").unwrap();

        cache.inner.memory.remove("ns:k");
        cache.get::<String>("k", "ns").await.unwrap();
        let promoted = cache.inner.memory.peek("ns:k").unwrap();
        assert_eq!(promoted.expires_at_ms, written.expires_at_ms);
    }

    #[tokio::test]
    async fn test_unknown_key_counts_one_miss() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = service(tmp.path(), 16).await;
        assert_eq!(cache.get::<String>("nope", "ns").await.unwrap(), None);
        let stats = cache.get_stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_serialization_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = service(tmp.path(), 16).await;
        cache.set("k", "text", None, "ns").await.unwrap();
        let err = cache.get::<u64>("k", "ns").await.unwrap_err();
        assert!(err.is_serialization());
    }

    #[tokio::test]
    async fn test_set_raw_rejects_unframed_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = service(tmp.path(), 16).await;
        let err = cache.set_raw("k", b"plain".to_vec(), None, "ns").await.unwrap_err();
        assert!(err.is_serialization());

        let framed = codec::encode(&"ok").unwrap();
        cache.set_raw("k", framed, None, "ns").await.unwrap();
        assert_eq!(cache.get::<String>("k", "ns").await.unwrap().as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_delete_removes_from_all_tiers() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = service(tmp.path(), 16).await;
        cache.set("k", &1u8, None, "ns").await.unwrap();
        assert!(cache.inner.file.path_for("ns:k").exists());

        assert!(cache.delete("k", "ns").await);
        assert!(!cache.inner.file.path_for("ns:k").exists());
        assert!(cache.inner.memory.peek("ns:k").is_none());
        assert!(!cache.delete("k", "ns").await);
    }

    #[tokio::test]
    async fn test_file_failure_degrades_to_memory() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = service(tmp.path(), 16).await;
        tokio::fs::remove_dir_all(cache.inner.file.dir()).await.unwrap();

        // Memory write still succeeds, file write is logged and skipped
        cache.set("k", "v", None, "ns").await.unwrap();
        assert_eq!(cache.get::<String>("k", "ns").await.unwrap().as_deref(), Some("v"));
        assert_eq!(cache.get::<String>("other", "ns").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_and_namespaces() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = service(tmp.path(), 2).await;
        cache.set("claim:1", &1, None, "factcheck").await.unwrap();
        cache.set("claim:2", &2, None, "factcheck").await.unwrap();
        // Evicts "claim:1" from memory; it stays on disk
        cache.set("img:9", &9, None, "ocr").await.unwrap();

        assert_eq!(
            cache.get_keys("claim:*", Some("factcheck")).await,
            vec!["claim:1".to_string(), "claim:2".to_string()]
        );
        assert_eq!(cache.get_keys("*", Some("ocr")).await, vec!["img:9".to_string()]);
        assert_eq!(cache.get_keys("*:9", None).await, vec!["img:9".to_string()]);
        assert_eq!(
            cache.get_namespaces().await,
            vec!["factcheck".to_string(), "ocr".to_string()]
        );
    }

    #[tokio::test]
    async fn test_clear_namespace() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = service(tmp.path(), 16).await;
        cache.set("a", &1, None, "x").await.unwrap();
        cache.set("b", &2, None, "x").await.unwrap();
        cache.set("a", &3, None, "y").await.unwrap();

        assert_eq!(cache.clear(Some("x")).await, 2);
        assert_eq!(cache.get::<i32>("a", "x").await.unwrap(), None);
        assert_eq!(cache.get::<i32>("a", "y").await.unwrap(), Some(3));
        assert_eq!(cache.clear(None).await, 1);
        assert!(cache.get_namespaces().await.is_empty());
    }

    #[tokio::test]
    async fn test_colon_namespace_is_rejected_everywhere() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = service(tmp.path(), 16).await;
        cache.set("v2:k1", &1, None, "nlp").await.unwrap();

        let err = cache.set("k1", &1, None, "nlp:v2").await.unwrap_err();
        assert!(matches!(err, CacheError::Configuration(_)));
        assert!(cache.set_raw("k1", codec::encode(&1).unwrap(), None, "nlp:v2").await.is_err());
        assert_eq!(cache.get::<i32>("k1", "nlp:v2").await.unwrap(), None);
        assert!(!cache.delete("k1", "nlp:v2").await);
        // Must not reach into namespace "nlp"
        assert_eq!(cache.clear(Some("nlp:v2")).await, 0);

        assert_eq!(cache.get_keys("*", Some("nlp")).await, vec!["v2:k1".to_string()]);
        assert_eq!(cache.get_namespaces().await, vec!["nlp".to_string()]);
    }

    #[test]
    fn test_namespaces_of_canonical_keys() {
        let keys = vec![
            "factcheck:claim:1".to_string(),
            "ocr:img".to_string(),
            "factcheck:claim:2".to_string(),
            "stray".to_string(),
        ];
        let namespaces: Vec<String> = namespaces_of(&keys).into_iter().collect();
        assert_eq!(namespaces, vec!["factcheck".to_string(), "ocr".to_string()]);
    }

    #[tokio::test]
    async fn test_cleanup_expired_records_timestamp() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = service(tmp.path(), 16).await;
        cache.set("short", "v", Some(Duration::from_millis(20)), "ns").await.unwrap();
        cache.set("long", "v", Some(Duration::from_secs(60)), "ns").await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        // memory + file copy of "short"
        assert_eq!(cache.cleanup_expired().await, 2);
        let stats = cache.get_stats().await;
        assert!(stats.last_cleanup.is_some());
        assert_eq!(stats.memory_entries, 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = service(tmp.path(), 16).await;
        cache.close().await;
        cache.close().await;
        assert!(cache.is_closed());
    }

    #[test]
    fn test_escape_redis_glob() {
        assert_eq!(escape_redis_glob("plain"), "plain");
        assert_eq!(escape_redis_glob("a*b?[c]"), "a\\*b\\?\\[c\\]");
    }
}
