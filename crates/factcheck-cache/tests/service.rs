//! Integration tests for the tiered cache through its public API.
//!
//! Redis is disabled here; see `redis_tier.rs` for the shared tier.

use factcheck_cache::{CacheConfig, CacheService, HealthStatus};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::time::Duration;

async fn cache_in(dir: &Path, capacity: usize) -> CacheService {
    let mut config = CacheConfig::with_cache_dir(dir.join("cache"));
    config.memory_capacity = capacity;
    CacheService::new(config).await.expect("construct cache")
}

async fn entry_files(dir: &Path) -> usize {
    let mut count = 0;
    let mut listing = tokio::fs::read_dir(dir.join("cache")).await.unwrap();
    while let Some(item) = listing.next_entry().await.unwrap() {
        if item.path().extension().is_some_and(|ext| ext == "cache") {
            count += 1;
        }
    }
    count
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Verdict {
    claim_id: u64,
    status: String,
    confidence: f32,
    sources: Vec<String>,
}

#[tokio::test]
async fn test_claim_verdict_scenario() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 100).await;

    cache
        .set(
            "claim:123",
            &json!({"status": "VERIFIED"}),
            Some(Duration::from_secs(60)),
            "factcheck",
        )
        .await
        .unwrap();

    let value: Option<serde_json::Value> = cache.get("claim:123", "factcheck").await.unwrap();
    assert_eq!(value, Some(json!({"status": "VERIFIED"})));
    assert_eq!(cache.get_stats().await.memory_hits, 1);

    cache.close().await;
}

#[tokio::test]
async fn test_health_without_remote() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 100).await;

    assert_eq!(
        cache.health_check().await,
        HealthStatus {
            memory: true,
            file: true,
            remote: false,
        }
    );
}

#[tokio::test]
async fn test_unreachable_redis_degrades_to_local_tiers() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = CacheConfig::with_cache_dir(tmp.path().join("cache"));
    config.redis.enabled = true;
    config.redis.url = "redis://127.0.0.1:1".to_string();
    config.redis.pool_size = 1;
    config.redis.timeout_ms = 200;
    let cache = CacheService::new(config).await.expect("construct cache");

    cache.set("claim:1", "FALSE", None, "factcheck").await.unwrap();
    assert_eq!(
        cache.get::<String>("claim:1", "factcheck").await.unwrap().as_deref(),
        Some("FALSE")
    );
    assert_eq!(cache.get::<String>("claim:404", "factcheck").await.unwrap(), None);

    let stats = cache.get_stats().await;
    assert_eq!(stats.memory_hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.remote_entries, None);
    assert_eq!(entry_files(tmp.path()).await, 1);

    let health = cache.health_check().await;
    assert!(health.memory && health.file);
    assert!(!health.remote);

    assert!(cache.delete("claim:1", "factcheck").await);
    assert_eq!(cache.clear(None).await, 0);
    cache.close().await;
}

#[tokio::test]
async fn test_struct_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 100).await;
    let verdict = Verdict {
        claim_id: 7,
        status: "FALSE".to_string(),
        confidence: 0.92,
        sources: vec!["https://example.org/a".to_string()],
    };

    cache
        .set("claim:7", &verdict, Some(Duration::from_secs(60)), "factcheck")
        .await
        .unwrap();
    let cached: Option<Verdict> = cache.get("claim:7", "factcheck").await.unwrap();
    assert_eq!(cached, Some(verdict));
}

#[tokio::test]
async fn test_same_key_different_namespaces() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 100).await;

    cache.set("lang", "en", None, "translation").await.unwrap();
    cache.set("lang", "fr", None, "ocr").await.unwrap();
    assert_eq!(
        cache.get::<String>("lang", "translation").await.unwrap().as_deref(),
        Some("en")
    );
    assert_eq!(cache.get::<String>("lang", "ocr").await.unwrap().as_deref(), Some("fr"));
}

#[tokio::test]
async fn test_last_write_wins() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 100).await;

    cache
        .set("k", "first", Some(Duration::from_millis(50)), "ns")
        .await
        .unwrap();
    cache
        .set("k", "second", Some(Duration::from_secs(60)), "ns")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;

    // The new TTL replaced the old one
    assert_eq!(cache.get::<String>("k", "ns").await.unwrap().as_deref(), Some("second"));
}

#[tokio::test]
async fn test_expired_entry_is_gone_from_every_tier() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 100).await;

    cache
        .set("ocr:img1", "text", Some(Duration::from_millis(50)), "ocr")
        .await
        .unwrap();
    assert_eq!(entry_files(tmp.path()).await, 1);
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(cache.get::<String>("ocr:img1", "ocr").await.unwrap(), None);
    assert_eq!(entry_files(tmp.path()).await, 0);
    assert!(cache.get_keys("*", None).await.is_empty());
    assert_eq!(cache.get_stats().await.memory_entries, 0);
}

#[tokio::test]
async fn test_unknown_key_is_one_miss() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 100).await;

    let before = cache.get_stats().await;
    assert_eq!(before.hit_rate, 0.0);
    assert_eq!(cache.get::<String>("nothing", "ns").await.unwrap(), None);
    let after = cache.get_stats().await;
    assert_eq!(after.misses, before.misses + 1);
    assert_eq!(after.total_requests, 1);
}

#[tokio::test]
async fn test_lru_eviction_falls_back_to_file() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 3).await;

    for i in 0..3 {
        cache.set(&format!("k{i}"), &i, None, "ns").await.unwrap();
    }
    // Touch k0 so k1 becomes least recently used
    assert_eq!(cache.get::<i32>("k0", "ns").await.unwrap(), Some(0));
    cache.set("k3", &3, None, "ns").await.unwrap();

    let stats = cache.get_stats().await;
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.memory_entries, 3);
    assert_eq!(stats.memory_capacity, 3);

    // Evicted from memory, still on disk
    assert_eq!(cache.get::<i32>("k1", "ns").await.unwrap(), Some(1));
    let stats = cache.get_stats().await;
    assert_eq!(stats.file_hits, 1);
    assert_eq!(stats.memory_hits, 1);
}

#[tokio::test]
async fn test_file_tier_survives_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 100).await;
    cache
        .set("translation:42", "Bonjour", Some(Duration::from_secs(60)), "translate")
        .await
        .unwrap();
    cache.close().await;
    drop(cache);

    let reopened = cache_in(tmp.path(), 100).await;
    assert_eq!(
        reopened
            .get::<String>("translation:42", "translate")
            .await
            .unwrap()
            .as_deref(),
        Some("Bonjour")
    );
    assert_eq!(reopened.get_stats().await.file_hits, 1);
}

#[tokio::test]
async fn test_keys_namespaces_and_clear() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 100).await;
    cache.set("claim:1", &1, None, "factcheck").await.unwrap();
    cache.set("claim:2", &2, None, "factcheck").await.unwrap();
    cache.set("user:1", &1, None, "factcheck").await.unwrap();
    cache.set("img:1", &1, None, "ocr").await.unwrap();

    assert_eq!(
        cache.get_keys("claim:*", Some("factcheck")).await,
        vec!["claim:1", "claim:2"]
    );
    assert_eq!(cache.get_keys("*:1", None).await, vec!["claim:1", "img:1", "user:1"]);
    assert_eq!(cache.get_namespaces().await, vec!["factcheck", "ocr"]);

    assert_eq!(cache.clear(Some("factcheck")).await, 3);
    assert_eq!(cache.get_namespaces().await, vec!["ocr"]);
    assert!(cache.delete("img:1", "ocr").await);
    assert!(cache.get_namespaces().await.is_empty());
}

#[tokio::test]
async fn test_default_ttl_applies() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = CacheConfig::with_cache_dir(tmp.path().join("cache"));
    config.default_ttl_secs = 1;
    let cache = CacheService::new(config).await.unwrap();

    cache.set("k", "v", None, "ns").await.unwrap();
    assert!(cache.get::<String>("k", "ns").await.unwrap().is_some());
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(cache.get::<String>("k", "ns").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unusable_cache_dir_is_configuration_error() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("not-a-dir");
    tokio::fs::write(&blocker, b"x").await.unwrap();

    let err = CacheService::new(CacheConfig::with_cache_dir(blocker.join("cache")))
        .await
        .err()
        .expect("construction must fail");
    assert!(matches!(err, factcheck_cache::CacheError::Configuration(_)));
}

#[tokio::test]
async fn test_background_cleanup_purges() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = CacheConfig::with_cache_dir(tmp.path().join("cache"));
    config.cleanup_interval_secs = 1;
    let cache = CacheService::new(config).await.unwrap();

    cache
        .set("k", "v", Some(Duration::from_millis(100)), "ns")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1300)).await;

    let stats = cache.get_stats().await;
    assert!(stats.last_cleanup.is_some());
    assert_eq!(stats.memory_entries, 0);
    assert_eq!(entry_files(tmp.path()).await, 0);
    cache.close().await;
}
