//! Shared network tier backed by Redis.
//!
//! Records are stored under the literal canonical key and expire through
//! Redis' own TTL. When Redis is disabled or unreachable every call fails
//! fast with `TierUnavailable`, which the orchestrator treats as a miss.

use std::future::Future;
use std::time::Duration;

use deadpool_redis::{Connection, Pool};
use redis::AsyncCommands;

use crate::codec;
use crate::config::RedisConfig;
use crate::entry::CacheEntry;
use crate::error::{CacheError, Tier};

pub struct RemoteTier {
    pool: Option<Pool>,
    timeout: Duration,
}

impl RemoteTier {
    /// A tier that is not configured: always a miss, never healthy.
    pub fn disabled() -> Self {
        Self {
            pool: None,
            timeout: Duration::from_millis(0),
        }
    }

    /// Build the connection pool from configuration.
    ///
    /// A malformed URL is a configuration error. An unreachable server is
    /// not: the tier starts degraded and every call retries the pool.
    pub async fn connect(config: &RedisConfig) -> Result<Self, CacheError> {
        if !config.enabled {
            tracing::info!("Redis disabled, running without the shared tier");
            return Ok(Self::disabled());
        }

        redis::Client::open(config.url.as_str()).map_err(|e| {
            CacheError::configuration(format!("malformed redis url {:?}: {e}", config.url))
        })?;

        let timeout = config.timeout();
        let mut redis_config = deadpool_redis::Config::from_url(&config.url);
        let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
        pool_config.timeouts.wait = Some(timeout);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.recycle = Some(timeout);
        redis_config.pool = Some(pool_config);

        let pool = redis_config
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .map_err(|e| CacheError::configuration(format!("failed to create Redis pool: {e}")))?;

        let tier = Self {
            pool: Some(pool),
            timeout,
        };
        match tier.ping().await {
            Ok(()) => tracing::info!(url = %config.url, "Connected to Redis"),
            Err(e) => tracing::warn!(
                url = %config.url,
                error = %e,
                "Redis unreachable, shared tier starts degraded"
            ),
        }
        Ok(tier)
    }

    pub fn is_configured(&self) -> bool {
        self.pool.is_some()
    }

    /// Run `op` on a pooled connection, bounded by the tier timeout.
    async fn with_conn<T, F, Fut>(&self, op: &str, f: F) -> Result<T, CacheError>
    where
        F: FnOnce(Connection) -> Fut,
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        let Some(pool) = &self.pool else {
            return Err(CacheError::tier(Tier::Remote, "not configured"));
        };
        let work = async {
            let conn = pool
                .get()
                .await
                .map_err(|e| CacheError::tier(Tier::Remote, format!("{op}: pool: {e}")))?;
            f(conn)
                .await
                .map_err(|e| CacheError::tier(Tier::Remote, format!("{op}: {e}")))
        };
        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::tier(
                Tier::Remote,
                format!("{op}: timed out after {:?}", self.timeout),
            )),
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let data = self
            .with_conn("GET", |mut conn| async move {
                conn.get::<_, Option<Vec<u8>>>(key).await
            })
            .await?;
        let Some(data) = data else {
            return Ok(None);
        };
        match codec::decode::<CacheEntry>(&data) {
            Ok(entry) if entry.key == key && !entry.is_expired() => Ok(Some(entry)),
            Ok(_) => Ok(None),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Unreadable Redis record");
                Ok(None)
            }
        }
    }

    /// Write with the entry's remaining TTL (`PSETEX`), or no TTL at all.
    pub async fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let ttl = entry.remaining_ttl();
        if ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Ok(());
        }
        let bytes = codec::encode(entry)?;
        let key = entry.key.as_str();
        self.with_conn("SET", |mut conn| async move {
            match ttl {
                Some(ttl) => {
                    let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
                    conn.pset_ex::<_, _, ()>(key, bytes, millis).await
                }
                None => conn.set::<_, _, ()>(key, bytes).await,
            }
        })
        .await
    }

    pub async fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let removed = self
            .with_conn("DEL", |mut conn| async move { conn.del::<_, u64>(key).await })
            .await?;
        Ok(removed > 0)
    }

    /// Canonical keys matching a Redis glob.
    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        self.with_conn("KEYS", |mut conn| async move {
            redis::cmd("KEYS").arg(pattern).query_async(&mut conn).await
        })
        .await
    }

    pub async fn dbsize(&self) -> Result<u64, CacheError> {
        self.with_conn("DBSIZE", |mut conn| async move {
            redis::cmd("DBSIZE").query_async(&mut conn).await
        })
        .await
    }

    /// Delete every key matching a Redis glob; returns how many went away.
    pub async fn clear(&self, pattern: &str) -> Result<u64, CacheError> {
        let keys = self.keys(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        self.with_conn("DEL", |mut conn| async move { conn.del::<_, u64>(keys).await })
            .await
    }

    /// Liveness probe, bounded by the tier timeout.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let reply: String = self
            .with_conn("PING", |mut conn| async move {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;
        if reply.eq_ignore_ascii_case("PONG") {
            Ok(())
        } else {
            Err(CacheError::tier(Tier::Remote, format!("unexpected PING reply {reply:?}")))
        }
    }

    /// Ask Redis to persist its dataset. Completion is out of our control.
    pub async fn request_persistence(&self) -> Result<(), CacheError> {
        let _: String = self
            .with_conn("BGSAVE", |mut conn| async move {
                redis::cmd("BGSAVE").query_async(&mut conn).await
            })
            .await?;
        Ok(())
    }

    /// Release pooled connections. Further calls fail as unavailable.
    pub fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close();
        }
    }
}
