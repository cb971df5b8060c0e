//! Hybrid store contract.

use async_trait::async_trait;
use cachet_core::CacheResult;
use std::time::Duration;

/// Two-tier byte storage.
///
/// Entries live for `ttl` in both tiers, or until removed when `ttl` is `None`.
/// Local tiers of other instances may serve a stale value until the
/// invalidation message for a write reaches them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HybridStore: Send + Sync + 'static {
    /// Reads the payload stored under `key`.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Writes `payload` under `key` in both tiers.
    async fn set(&self, key: &str, payload: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()>;

    /// Removes the payload from both tiers.
    async fn remove(&self, key: &str) -> CacheResult<()>;
}
