//! Tiered cache service for the fact-checking pipeline.
//!
//! Expensive analyses (NLP inference, OCR, translation, external fact-check
//! APIs) are cached across three tiers:
//!
//! - **memory**: LRU-bounded, in process
//! - **file**: one file per entry under the cache directory
//! - **remote**: Redis, shared between nodes (optional)
//!
//! Build one [`CacheService`] at startup and hand clones to collaborators.
//! Reads go through the tiers fastest first and promote hits upward; writes
//! go to every tier. Only memory is required to succeed: the other tiers
//! are best effort and their failures show up in [`CacheService::health_check`].
//!
//! ```no_run
//! use std::time::Duration;
//! use factcheck_cache::{CacheConfig, CacheService};
//!
//! # async fn demo() -> Result<(), factcheck_cache::CacheError> {
//! let cache = CacheService::new(CacheConfig::default()).await?;
//! cache
//!     .set("claim:123", &serde_json::json!({"status": "VERIFIED"}), Some(Duration::from_secs(60)), "factcheck")
//!     .await?;
//! let verdict: Option<serde_json::Value> = cache.get("claim:123", "factcheck").await?;
//! assert!(verdict.is_some());
//! cache.close().await;
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod codec;
pub mod config;
pub mod entry;
pub mod error;
pub mod health;
pub mod key;
pub mod memo;
pub mod metrics;
pub mod monitor;
pub mod observability;
pub mod service;
pub mod stats;
pub mod tier;

pub use backup::{BackupInfo, RestoreInfo};
pub use config::loader::load_config;
pub use config::{CacheConfig, FileTierConfig, RedisConfig};
pub use entry::CacheEntry;
pub use error::{CacheError, CacheResult, Tier};
pub use health::HealthStatus;
pub use key::{CacheKey, DEFAULT_NAMESPACE, KeyPattern, MemoKey, validate_namespace};
pub use memo::Memoizer;
pub use monitor::{MonitorHandle, MonitorSample};
pub use service::CacheService;
pub use stats::CacheStats;
