//! Metrics emitted through the `metrics` facade.
//!
//! No exporter is installed here; the embedding process decides whether to
//! install one (e.g. Prometheus). Without a recorder these calls are no-ops.

use metrics::{counter, gauge};

use crate::error::Tier;

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
    pub const CACHE_EVICTIONS_TOTAL: &str = "cache_evictions_total";
    pub const CACHE_ENTRIES: &str = "cache_entries";
    pub const CACHE_TIER_ERRORS_TOTAL: &str = "cache_tier_errors_total";
}

/// Record a cache hit.
pub fn record_cache_hit(tier: Tier) {
    counter!(names::CACHE_HITS_TOTAL, "tier" => tier.as_str()).increment(1);
}

/// Record a cache miss.
pub fn record_cache_miss() {
    counter!(names::CACHE_MISSES_TOTAL).increment(1);
}

/// Record memory evictions under capacity pressure.
pub fn record_evictions(count: u64) {
    counter!(names::CACHE_EVICTIONS_TOTAL).increment(count);
}

/// Record a failed tier operation.
pub fn record_tier_error(tier: Tier) {
    counter!(names::CACHE_TIER_ERRORS_TOTAL, "tier" => tier.as_str()).increment(1);
}

/// Set the number of entries held by a tier.
pub fn set_cache_entries(tier: Tier, count: u64) {
    gauge!(names::CACHE_ENTRIES, "tier" => tier.as_str()).set(count as f64);
}
