//! In-process byte store.

use crate::ByteStore;
use async_trait::async_trait;
use cachet_core::{CacheResult, ResolvedExpiration};
use cachet_memory::ExpiringStore;
use std::sync::Arc;

/// Byte store kept in process memory.
///
/// Behaves like a shared store for a single instance, which makes it useful
/// for development and tests.
#[derive(Clone, Debug)]
pub struct MemoryByteStore {
    entries: ExpiringStore<Arc<Vec<u8>>>,
}

impl Default for MemoryByteStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl MemoryByteStore {
    /// Creates a store, bounded to `max_capacity` entries when set.
    #[must_use]
    pub fn new(max_capacity: Option<u64>) -> Self {
        Self {
            entries: ExpiringStore::new(max_capacity),
        }
    }
}

#[async_trait]
impl ByteStore for MemoryByteStore {
    const NAME: &'static str = "memory-bytes";

    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|payload| payload.as_ref().clone()))
    }

    fn set(&self, key: &str, payload: Vec<u8>, expiration: ResolvedExpiration) -> CacheResult<()> {
        self.entries.insert(key, Arc::new(payload), expiration);
        Ok(())
    }

    fn remove(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn get_async(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.get(key)
    }

    async fn set_async(
        &self,
        key: &str,
        payload: Vec<u8>,
        expiration: ResolvedExpiration,
    ) -> CacheResult<()> {
        self.set(key, payload, expiration)
    }

    async fn remove_async(&self, key: &str) -> CacheResult<()> {
        self.remove(key)
    }
}
