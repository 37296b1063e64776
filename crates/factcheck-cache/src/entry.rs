use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

/// Wall-clock unix time in milliseconds.
///
/// Expiry is stored as wall-clock time so file records keep their meaning
/// across process restarts.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// A cached value together with its lifetime.
///
/// The value is wrapped in `Arc` so tier hits and promotions share one
/// buffer instead of copying it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Canonical `"namespace:rawkey"`.
    pub key: String,
    /// Framed, serialized value.
    pub value: Arc<Vec<u8>>,
    pub created_at_ms: i64,
    /// `None` means the entry never expires.
    pub expires_at_ms: Option<i64>,
}

impl CacheEntry {
    /// Create an entry stamped now.
    ///
    /// TTLs below one millisecond are rounded up so that
    /// `expires_at_ms > created_at_ms` always holds.
    pub fn new(key: impl Into<String>, value: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self::with_value(key, Arc::new(value), ttl)
    }

    pub fn with_value(key: impl Into<String>, value: Arc<Vec<u8>>, ttl: Option<Duration>) -> Self {
        let created_at_ms = now_millis();
        let expires_at_ms = ttl.map(|ttl| {
            let millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX).max(1);
            created_at_ms.saturating_add(millis)
        });
        Self {
            key: key.into(),
            value,
            created_at_ms,
            expires_at_ms,
        }
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at_ms.is_some_and(|expires| expires <= now_ms)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    /// Time left before expiry. `None` for entries without a TTL;
    /// `Some(Duration::ZERO)` once expired.
    pub fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at_ms.map(|expires| {
            let left = expires.saturating_sub(now_millis()).max(0);
            Duration::from_millis(left as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry() {
        let entry = CacheEntry::new("ns:k", vec![1, 2, 3], Some(Duration::from_secs(60)));
        assert!(!entry.is_expired());
        let expires = entry.expires_at_ms.unwrap();
        assert!(expires > entry.created_at_ms);
        assert!(entry.is_expired_at(expires));
        assert!(!entry.is_expired_at(expires - 1));
    }

    #[test]
    fn test_no_ttl_never_expires() {
        let entry = CacheEntry::new("ns:k", vec![], None);
        assert!(!entry.is_expired_at(i64::MAX));
        assert_eq!(entry.remaining_ttl(), None);
    }

    #[test]
    fn test_sub_millisecond_ttl_rounds_up() {
        let entry = CacheEntry::new("ns:k", vec![], Some(Duration::from_micros(10)));
        assert_eq!(entry.expires_at_ms, Some(entry.created_at_ms + 1));
    }

    #[test]
    fn test_remaining_ttl_saturates_at_zero() {
        let mut entry = CacheEntry::new("ns:k", vec![], Some(Duration::from_secs(1)));
        entry.expires_at_ms = Some(entry.created_at_ms - 10);
        assert_eq!(entry.remaining_ttl(), Some(Duration::ZERO));

        let fresh = CacheEntry::new("ns:k", vec![], Some(Duration::from_secs(30)));
        let left = fresh.remaining_ttl().unwrap();
        assert!(left <= Duration::from_secs(30));
        assert!(left > Duration::from_secs(29));
    }
}
