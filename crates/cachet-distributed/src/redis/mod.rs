//! Redis-backed byte store.

mod store;

pub use store::RedisByteStore;

use cachet_config::RedisSettings;
use cachet_core::{CacheError, CacheResult};
use deadpool_redis::{Config, Pool, Runtime};
use tracing::info;

/// Create a Redis connection pool and check that the server answers.
///
/// # Errors
///
/// Returns [`CacheError::Configuration`] for an unusable URL and
/// [`CacheError::Backend`] when the server cannot be reached.
pub async fn create_pool(settings: &RedisSettings) -> CacheResult<Pool> {
    info!("Creating Redis connection pool for cache...");

    let pool = Config::from_url(&settings.url)
        .builder()
        .map_err(|e| CacheError::configuration(format!("Invalid Redis config: {}", e)))?
        .max_size(settings.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| CacheError::configuration(format!("Failed to create pool: {}", e)))?;

    // Test connection
    let mut conn = pool.get().await.map_err(|e| {
        CacheError::backend("redis", format!("Failed to get Redis connection: {}", e))
    })?;
    redis::cmd("PING")
        .query_async::<String>(&mut *conn)
        .await
        .map_err(|e| CacheError::backend("redis", format!("PING failed: {}", e)))?;

    info!("Redis connection pool created successfully");

    Ok(pool)
}

pub(crate) fn redis_error(operation: &str, key: &str, err: impl std::fmt::Display) -> CacheError {
    CacheError::backend("redis", format!("Failed to {} key '{}': {}", operation, key, err))
}
