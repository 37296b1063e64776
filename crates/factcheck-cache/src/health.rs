use serde::{Deserialize, Serialize};

use crate::service::CacheService;

/// Per-tier health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always `true`: the memory tier has no external dependency.
    pub memory: bool,
    /// A sentinel write and delete in the cache directory succeeded.
    pub file: bool,
    /// Redis is configured and answered `PING` within the timeout.
    pub remote: bool,
}

impl HealthStatus {
    pub fn all_healthy(&self) -> bool {
        self.memory && self.file && self.remote
    }
}

impl CacheService {
    /// Probe every tier. Never fails; a failed probe reports `false`.
    pub async fn health_check(&self) -> HealthStatus {
        let inner = &self.inner;
        let (file, remote) = tokio::join!(inner.file.probe(), async {
            if inner.remote.is_configured() {
                inner.remote.ping().await
            } else {
                Err(crate::error::CacheError::tier(
                    crate::error::Tier::Remote,
                    "not configured",
                ))
            }
        });

        if let Err(e) = &file {
            tracing::warn!(error = %e, "File tier health check failed");
        }
        if let Err(e) = &remote {
            if inner.remote.is_configured() {
                tracing::warn!(error = %e, "Remote tier health check failed");
            }
        }

        HealthStatus {
            memory: true,
            file: file.is_ok(),
            remote: remote.is_ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    #[tokio::test]
    async fn test_without_remote() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = CacheService::new(CacheConfig::with_cache_dir(tmp.path().join("cache")))
            .await
            .unwrap();
        let health = cache.health_check().await;
        assert_eq!(
            health,
            HealthStatus {
                memory: true,
                file: true,
                remote: false
            }
        );
        assert!(!health.all_healthy());
    }

    #[tokio::test]
    async fn test_missing_directory_is_unhealthy() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = CacheService::new(CacheConfig::with_cache_dir(tmp.path().join("cache")))
            .await
            .unwrap();
        tokio::fs::remove_dir_all(tmp.path().join("cache")).await.unwrap();
        assert!(!cache.health_check().await.file);
        assert!(cache.health_check().await.memory);
    }
}
