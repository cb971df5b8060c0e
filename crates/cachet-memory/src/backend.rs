//! Memory adapter: live object references in a process-local store.

use crate::ExpiringStore;
use async_trait::async_trait;
use cachet_config::MemorySettings;
use cachet_core::{
    CacheBackend, CacheError, CacheKey, CacheNamespace, CacheResult, CacheValue,
    EntryExpirationPolicy, KeyOptions, TypedCache,
};
use chrono::Utc;
use std::any::{type_name, Any};
use std::sync::Arc;
use tracing::debug;

/// Object held by the memory backend.
pub type StoredObject = Arc<dyn Any + Send + Sync>;

/// Cache backend holding values as objects, without serialization.
///
/// Reads must ask for the type that was written; anything else is a
/// [`CacheError::TypeMismatch`].
#[derive(Clone, Debug)]
pub struct MemoryBackend {
    store: ExpiringStore<StoredObject>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(None)
    }
}

impl MemoryBackend {
    /// Creates a backend, bounded to `max_capacity` entries when set.
    #[must_use]
    pub fn new(max_capacity: Option<u64>) -> Self {
        Self {
            store: ExpiringStore::new(max_capacity),
        }
    }

    /// Creates a backend from configuration.
    #[must_use]
    pub fn from_settings(settings: &MemorySettings) -> Self {
        Self::new(settings.max_capacity)
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &ExpiringStore<StoredObject> {
        &self.store
    }
}

/// Creates a process-local typed cache.
///
/// Keys are neither encoded nor length-checked, since they never leave the process.
///
/// # Errors
///
/// Fails if the namespace table declares a blank or duplicate key.
pub fn memory_cache<N: CacheNamespace>() -> CacheResult<TypedCache<N, MemoryBackend>> {
    TypedCache::new(MemoryBackend::default(), KeyOptions::local())
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    const NAME: &'static str = "memory";

    fn get_raw<T: CacheValue>(&self, key: &CacheKey) -> CacheResult<Option<T>> {
        let Some(object) = self.store.get(key.as_str()) else {
            debug!("Cache miss for key '{}'", key);
            return Ok(None);
        };

        let value = object
            .downcast::<T>()
            .map_err(|_| CacheError::TypeMismatch {
                key: key.to_string(),
                expected: type_name::<T>(),
            })?;

        debug!("Cache hit for key '{}'", key);
        Ok(Some(T::clone(&value)))
    }

    fn set_raw<T: CacheValue>(
        &self,
        key: &CacheKey,
        value: &T,
        expiration: &EntryExpirationPolicy,
    ) -> CacheResult<()> {
        let object: StoredObject = Arc::new(value.clone());
        self.store
            .insert(key.as_str(), object, expiration.resolve(Utc::now()));
        debug!("Cached key '{}'", key);
        Ok(())
    }

    fn remove_raw(&self, key: &CacheKey) -> CacheResult<()> {
        self.store.remove(key.as_str());
        debug!("Removed key '{}'", key);
        Ok(())
    }

    async fn get_raw_async<T: CacheValue>(&self, key: &CacheKey) -> CacheResult<Option<T>> {
        self.get_raw(key)
    }

    async fn set_raw_async<T: CacheValue>(
        &self,
        key: &CacheKey,
        value: &T,
        expiration: &EntryExpirationPolicy,
    ) -> CacheResult<()> {
        self.set_raw(key, value, expiration)
    }

    async fn remove_raw_async(&self, key: &CacheKey) -> CacheResult<()> {
        self.remove_raw(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> CacheKey {
        CacheKey::new(raw)
    }

    #[test]
    fn test_stores_objects() {
        let backend = MemoryBackend::default();
        let policy = EntryExpirationPolicy::default();
        backend
            .set_raw(&key("k"), &vec![1_u8, 2, 3], &policy)
            .unwrap();
        let value: Option<Vec<u8>> = backend.get_raw(&key("k")).unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_type_mismatch() {
        let backend = MemoryBackend::default();
        backend
            .set_raw(&key("k"), &42_u32, &EntryExpirationPolicy::default())
            .unwrap();
        let err = backend.get_raw::<String>(&key("k")).unwrap_err();
        match err {
            CacheError::TypeMismatch { key, expected } => {
                assert_eq!(key, "k");
                assert!(expected.contains("String"));
            }
            other => panic!("Expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_settings_capacity() {
        let backend = MemoryBackend::from_settings(&MemorySettings {
            max_capacity: Some(5),
        });
        for i in 0..100_u32 {
            backend
                .set_raw(&key(&i.to_string()), &i, &EntryExpirationPolicy::default())
                .unwrap();
        }
        assert!(backend.store().entry_count() <= 5);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_async_forms_do_not_block() {
        // Native sync path, so a current-thread runtime is fine
        let backend = MemoryBackend::default();
        backend
            .set_raw_async(&key("k"), &"v".to_string(), &EntryExpirationPolicy::default())
            .await
            .unwrap();
        let value: Option<String> = backend.get_raw_async(&key("k")).await.unwrap();
        assert_eq!(value.as_deref(), Some("v"));
        backend.remove_raw_async(&key("k")).await.unwrap();
        assert!(backend.get_raw_async::<String>(&key("k")).await.unwrap().is_none());
    }
}
