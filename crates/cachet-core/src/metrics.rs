//! Metrics for cache operations.
//!
//! Every counter carries a `backend` label naming the adapter that served the call.

use metrics::{counter, describe_counter};

/// Metric names for the cache facade.
pub mod names {
    /// Lookups that found a live entry.
    pub const CACHE_HITS_TOTAL: &str = "cachet_cache_hits_total";
    /// Lookups that found nothing.
    pub const CACHE_MISSES_TOTAL: &str = "cachet_cache_misses_total";
    /// Successful writes.
    pub const CACHE_SETS_TOTAL: &str = "cachet_cache_sets_total";
    /// Successful removals.
    pub const CACHE_REMOVALS_TOTAL: &str = "cachet_cache_removals_total";
    /// Failed operations.
    pub const CACHE_ERRORS_TOTAL: &str = "cachet_cache_errors_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        names::CACHE_HITS_TOTAL,
        "Total number of cache lookups that returned a value"
    );
    describe_counter!(
        names::CACHE_MISSES_TOTAL,
        "Total number of cache lookups that returned nothing"
    );
    describe_counter!(
        names::CACHE_SETS_TOTAL,
        "Total number of cache entries written"
    );
    describe_counter!(
        names::CACHE_REMOVALS_TOTAL,
        "Total number of cache entries removed"
    );
    describe_counter!(
        names::CACHE_ERRORS_TOTAL,
        "Total number of failed cache operations"
    );
}

/// Cache metrics recorder.
#[derive(Clone, Copy, Debug)]
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a lookup result.
    pub fn lookup(backend: &'static str, hit: bool) {
        let name = if hit {
            names::CACHE_HITS_TOTAL
        } else {
            names::CACHE_MISSES_TOTAL
        };
        counter!(name, "backend" => backend).increment(1);
    }

    /// Record a write.
    pub fn set(backend: &'static str) {
        counter!(names::CACHE_SETS_TOTAL, "backend" => backend).increment(1);
    }

    /// Record a removal.
    pub fn removed(backend: &'static str) {
        counter!(names::CACHE_REMOVALS_TOTAL, "backend" => backend).increment(1);
    }

    /// Record a failed operation.
    pub fn error(backend: &'static str, operation: &'static str, code: &'static str) {
        counter!(
            names::CACHE_ERRORS_TOTAL,
            "backend" => backend,
            "operation" => operation,
            "code" => code
        )
        .increment(1);
    }
}
