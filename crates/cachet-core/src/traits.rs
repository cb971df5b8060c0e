//! Store primitives implemented by every cache adapter.

use crate::{blocking, CacheKey, CacheResult, EntryExpirationPolicy};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// Bound shared by every value stored in a cache.
pub trait CacheValue: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Raw store operations addressed by a fully built [`CacheKey`].
///
/// Adapters implement the async forms. The sync forms default to driving the
/// async form through [`blocking::block_on`]; stores with a native synchronous
/// path override them.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// Short backend name used in logs and metric labels.
    const NAME: &'static str;

    /// Reads the entry stored under `key`.
    async fn get_raw_async<T: CacheValue>(&self, key: &CacheKey) -> CacheResult<Option<T>>;

    /// Writes `value` under `key`, replacing any previous entry.
    async fn set_raw_async<T: CacheValue>(
        &self,
        key: &CacheKey,
        value: &T,
        expiration: &EntryExpirationPolicy,
    ) -> CacheResult<()>;

    /// Removes the entry stored under `key`. Missing keys are not an error.
    async fn remove_raw_async(&self, key: &CacheKey) -> CacheResult<()>;

    /// Blocking form of [`CacheBackend::get_raw_async`].
    fn get_raw<T: CacheValue>(&self, key: &CacheKey) -> CacheResult<Option<T>> {
        blocking::block_on(self.get_raw_async(key))?
    }

    /// Blocking form of [`CacheBackend::set_raw_async`].
    fn set_raw<T: CacheValue>(
        &self,
        key: &CacheKey,
        value: &T,
        expiration: &EntryExpirationPolicy,
    ) -> CacheResult<()> {
        blocking::block_on(self.set_raw_async(key, value, expiration))?
    }

    /// Blocking form of [`CacheBackend::remove_raw_async`].
    fn remove_raw(&self, key: &CacheKey) -> CacheResult<()> {
        blocking::block_on(self.remove_raw_async(key))?
    }
}
