use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CacheError;

/// Cache service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding one file per FileTier entry
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// MemoryTier max entries (LRU bound)
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,

    /// TTL applied when `set` is called without one, in seconds.
    /// 0 means entries written without a TTL never expire.
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Period of the background expiry sweep in seconds (0 disables it)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// FileTier settings
    #[serde(default)]
    pub file: FileTierConfig,

    /// Redis (RemoteTier) settings
    #[serde(default)]
    pub redis: RedisConfig,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_memory_capacity() -> usize {
    10_000
}

fn default_ttl_secs() -> u64 {
    3600 // 1 hour
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            memory_capacity: default_memory_capacity(),
            default_ttl_secs: default_ttl_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            file: FileTierConfig::default(),
            redis: RedisConfig::default(),
        }
    }
}

/// FileTier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTierConfig {
    /// Per-operation timeout in milliseconds
    #[serde(default = "default_file_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_file_timeout_ms() -> u64 {
    2000
}

impl Default for FileTierConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_file_timeout_ms(),
        }
    }
}

/// Redis configuration for the shared tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable Redis (gracefully degrades without it)
    /// Default: false (single-node deployments)
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Per-operation and liveness probe timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_enabled() -> bool {
    false
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    1000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

impl RedisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl CacheConfig {
    /// Config rooted at `cache_dir`, everything else defaulted.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CacheError> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(CacheError::configuration("cache_dir must not be empty"));
        }
        if self.memory_capacity == 0 {
            return Err(CacheError::configuration("memory_capacity must be > 0"));
        }
        if self.file.timeout_ms == 0 {
            return Err(CacheError::configuration("file.timeout_ms must be > 0"));
        }
        if self.redis.enabled {
            let url = self.redis.url.trim();
            if url.is_empty() {
                return Err(CacheError::configuration(
                    "redis.enabled=true requires redis.url",
                ));
            }
            let allowed = ["redis://", "rediss://", "unix://", "redis+unix://"];
            if !allowed.iter().any(|scheme| url.starts_with(scheme)) {
                return Err(CacheError::configuration(format!(
                    "redis.url must start with one of {allowed:?}"
                )));
            }
            if self.redis.pool_size == 0 {
                return Err(CacheError::configuration("redis.pool_size must be > 0"));
            }
            if self.redis.timeout_ms == 0 {
                return Err(CacheError::configuration("redis.timeout_ms must be > 0"));
            }
        }
        Ok(())
    }

    /// TTL used when the caller passes none. `None` means "never expires".
    pub fn default_ttl(&self) -> Option<Duration> {
        (self.default_ttl_secs > 0).then(|| Duration::from_secs(self.default_ttl_secs))
    }

    pub fn file_timeout(&self) -> Duration {
        Duration::from_millis(self.file.timeout_ms)
    }

    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_secs > 0).then(|| Duration::from_secs(self.cleanup_interval_secs))
    }
}

pub mod loader {
    use super::CacheConfig;
    use crate::error::CacheError;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Loads configuration from an optional TOML file plus environment
    /// overrides, e.g. `FACTCHECK_CACHE__REDIS__URL=redis://cache:6379`.
    pub fn load_config(path: Option<&str>) -> Result<CacheConfig, CacheError> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(CacheError::configuration(format!(
                        "config file not found: {p}"
                    )));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                let default_path = PathBuf::from("factcheck-cache.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        builder = builder.add_source(
            Environment::with_prefix("FACTCHECK_CACHE")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| CacheError::configuration(format!("config build error: {e}")))?;
        let merged: CacheConfig = cfg
            .try_deserialize()
            .map_err(|e| CacheError::configuration(format!("config deserialize error: {e}")))?;
        merged.validate()?;
        Ok(merged)
    }
}
