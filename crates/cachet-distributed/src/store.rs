//! Byte store contract.

use async_trait::async_trait;
use cachet_core::{blocking, CacheResult, ResolvedExpiration};

/// Raw byte storage addressed by final cache keys.
///
/// The sync forms default to blocking on the async forms; they fail with
/// [`cachet_core::CacheError::BlockingInAsyncContext`] on a current-thread
/// runtime instead of deadlocking it.
#[async_trait]
pub trait ByteStore: Send + Sync + 'static {
    /// Short store name used in logs.
    const NAME: &'static str;

    /// Reads the payload stored under `key`.
    async fn get_async(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Writes `payload` under `key`, replacing any previous entry.
    async fn set_async(
        &self,
        key: &str,
        payload: Vec<u8>,
        expiration: ResolvedExpiration,
    ) -> CacheResult<()>;

    /// Removes the payload stored under `key`.
    async fn remove_async(&self, key: &str) -> CacheResult<()>;

    /// Blocking form of [`ByteStore::get_async`].
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        blocking::block_on(self.get_async(key))?
    }

    /// Blocking form of [`ByteStore::set_async`].
    fn set(&self, key: &str, payload: Vec<u8>, expiration: ResolvedExpiration) -> CacheResult<()> {
        blocking::block_on(self.set_async(key, payload, expiration))?
    }

    /// Blocking form of [`ByteStore::remove_async`].
    fn remove(&self, key: &str) -> CacheResult<()> {
        blocking::block_on(self.remove_async(key))?
    }
}
