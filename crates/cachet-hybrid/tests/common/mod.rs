//! Common test infrastructure for Redis integration tests.

use cachet_config::{HybridSettings, RedisSettings};

/// Returns the Redis URL to test against.
///
/// Run the ignored tests with
/// `REDIS_URL=redis://localhost:6379 cargo test -- --ignored`.
pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

pub fn redis_settings() -> RedisSettings {
    RedisSettings {
        url: redis_url(),
        pool_size: 4,
    }
}

/// Hybrid settings on a channel private to one test.
pub fn hybrid_settings() -> HybridSettings {
    HybridSettings {
        invalidation_channel: format!("cachet-test:invalidate:{}", uuid::Uuid::new_v4()),
        ..HybridSettings::default()
    }
}

/// Returns a key prefix unique to one test run.
pub fn unique_prefix() -> String {
    format!("cachet-test-{}", uuid::Uuid::new_v4())
}
