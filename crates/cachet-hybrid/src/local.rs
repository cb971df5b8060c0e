//! Single-instance hybrid store.

use crate::HybridStore;
use async_trait::async_trait;
use cachet_core::CacheResult;
use cachet_memory::ExpiringStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Hybrid store without a shared tier.
///
/// Suitable for a single instance, where there is nobody to invalidate.
#[derive(Clone, Debug)]
pub struct LocalHybridStore {
    local: ExpiringStore<Arc<Vec<u8>>>,
}

impl Default for LocalHybridStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl LocalHybridStore {
    /// Creates a store, bounded to `max_capacity` entries when set.
    #[must_use]
    pub fn new(max_capacity: Option<u64>) -> Self {
        Self {
            local: ExpiringStore::new(max_capacity),
        }
    }
}

#[async_trait]
impl HybridStore for LocalHybridStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let payload = self.local.get(key).map(|data| data.as_ref().clone());
        debug!(key = %key, hit = payload.is_some(), "hybrid lookup (local)");
        Ok(payload)
    }

    async fn set(&self, key: &str, payload: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        self.local.insert_for(key, Arc::new(payload), ttl);
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        self.local.remove(key);
        Ok(())
    }
}
