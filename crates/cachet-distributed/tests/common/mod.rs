//! Common test infrastructure for Redis integration tests.

use cachet_config::RedisSettings;
use cachet_distributed::create_pool;
use deadpool_redis::Pool;

/// Returns the Redis URL to test against.
///
/// Tests that need Redis are `#[ignore]`d; run them with
/// `REDIS_URL=redis://localhost:6379 cargo test -- --ignored`.
pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// Creates a pool against the test server.
pub async fn test_pool() -> Pool {
    let settings = RedisSettings {
        url: redis_url(),
        pool_size: 4,
    };
    create_pool(&settings)
        .await
        .expect("Failed to connect to Redis")
}

/// Returns a key prefix unique to one test run.
pub fn unique_prefix() -> String {
    format!("cachet-test-{}", uuid::Uuid::new_v4())
}
