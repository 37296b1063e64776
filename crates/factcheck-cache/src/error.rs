//! Error types for the cache service.
//!
//! Only `Configuration` is fatal, and only at construction. Tier adapters
//! return `TierUnavailable`, which the orchestrator logs and downgrades to a
//! miss (reads) or a best-effort skip (writes).

use std::fmt;
use std::sync::Arc;

/// Identifies one of the three backing stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Memory,
    File,
    Remote,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Memory => "memory",
            Tier::File => "file",
            Tier::Remote => "remote",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during cache operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// Unusable cache directory or malformed remote endpoint.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A value could not cross the serialization boundary.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Transient I/O, network or timeout failure in a single tier.
    #[error("{tier} tier unavailable: {message}")]
    TierUnavailable {
        /// The tier that failed.
        tier: Tier,
        /// Description of the failure.
        message: String,
    },

    /// The memoized operation itself failed. Every waiter sees the same error.
    #[error("Computation failed: {0}")]
    Computation(Arc<anyhow::Error>),

    /// The task running a memoized operation panicked or was aborted.
    #[error("Computation aborted: {0}")]
    ComputationAborted(String),

    /// Snapshot or restore failure.
    #[error("Backup error: {0}")]
    Backup(String),
}

impl CacheError {
    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Creates a new `TierUnavailable` error.
    #[must_use]
    pub fn tier(tier: Tier, message: impl Into<String>) -> Self {
        Self::TierUnavailable {
            tier,
            message: message.into(),
        }
    }

    /// Creates a new `Backup` error.
    #[must_use]
    pub fn backup(message: impl Into<String>) -> Self {
        Self::Backup(message.into())
    }

    /// Wraps the failure of a memoized operation.
    #[must_use]
    pub fn computation(error: anyhow::Error) -> Self {
        Self::Computation(Arc::new(error))
    }

    /// Returns `true` if this is a per-tier transient failure.
    pub fn is_tier_unavailable(&self) -> bool {
        matches!(self, Self::TierUnavailable { .. })
    }

    /// Returns `true` if this is a serialization failure.
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization(_))
    }
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::tier(Tier::Remote, "connection refused");
        assert_eq!(err.to_string(), "remote tier unavailable: connection refused");
        assert!(err.is_tier_unavailable());

        let err = CacheError::serialization("bad value");
        assert_eq!(err.to_string(), "Serialization error: bad value");
        assert!(err.is_serialization());
    }

    #[test]
    fn test_computation_error_is_shared() {
        let err = CacheError::computation(anyhow::anyhow!("model crashed"));
        let cloned = err.clone();
        match (&err, &cloned) {
            (CacheError::Computation(a), CacheError::Computation(b)) => {
                assert!(Arc::ptr_eq(a, b));
            }
            _ => panic!("expected computation errors"),
        }
    }
}
