//! Hybrid adapter: encoded payloads in a two-tier store.

use crate::HybridStore;
use async_trait::async_trait;
use cachet_config::HybridSettings;
use cachet_core::{
    CacheBackend, CacheKey, CacheNamespace, CacheResult, CacheValue, CodecOptions,
    EntryExpirationPolicy, KeyOptions, MessagePackCodec, PayloadCodec, TypedCache,
};
use std::fmt;
use tracing::warn;

/// Cache backend over a [`HybridStore`].
///
/// Only the relative absolute expiration reaches the store. Absolute dates and
/// sliding windows are dropped with a warning, so an entry written with only
/// those dimensions never expires on its own.
pub struct HybridBackend<S, C = MessagePackCodec> {
    store: S,
    codec: C,
}

impl<S: HybridStore> HybridBackend<S> {
    /// Creates a backend with an uncompressed MessagePack codec.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_codec(store, MessagePackCodec::new(CodecOptions::uncompressed()))
    }

    /// Creates a backend from configuration.
    #[must_use]
    pub fn from_settings(store: S, settings: &HybridSettings) -> Self {
        Self::with_codec(store, MessagePackCodec::new(settings.codec))
    }
}

impl<S: HybridStore, C: PayloadCodec> HybridBackend<S, C> {
    /// Creates a backend with a custom codec.
    #[must_use]
    pub fn with_codec(store: S, codec: C) -> Self {
        Self { store, codec }
    }

    /// Returns the hybrid store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Wraps this backend in a typed cache.
    ///
    /// # Errors
    ///
    /// Fails if the namespace table declares a blank or duplicate key.
    pub fn into_cache<N: CacheNamespace>(
        self,
        options: KeyOptions,
    ) -> CacheResult<TypedCache<N, Self>> {
        TypedCache::new(self, options)
    }
}

impl<S, C: PayloadCodec> fmt::Debug for HybridBackend<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridBackend")
            .field("codec", &self.codec.name())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S, C> CacheBackend for HybridBackend<S, C>
where
    S: HybridStore,
    C: PayloadCodec,
{
    const NAME: &'static str = "hybrid";

    async fn get_raw_async<T: CacheValue>(&self, key: &CacheKey) -> CacheResult<Option<T>> {
        self.store
            .get(key.as_str())
            .await?
            .map(|bytes| self.codec.deserialize(&bytes))
            .transpose()
    }

    async fn set_raw_async<T: CacheValue>(
        &self,
        key: &CacheKey,
        value: &T,
        expiration: &EntryExpirationPolicy,
    ) -> CacheResult<()> {
        if expiration.absolute_expiration().is_some() || expiration.sliding_expiration().is_some()
        {
            warn!(
                key = %key,
                "hybrid cache ignores absolute and sliding expiration; only the relative expiration is applied"
            );
        }

        let payload = self.codec.serialize(value)?;
        self.store
            .set(
                key.as_str(),
                payload,
                expiration.absolute_expiration_relative_to_now(),
            )
            .await
    }

    async fn remove_raw_async(&self, key: &CacheKey) -> CacheResult<()> {
        self.store.remove(key.as_str()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocalHybridStore, MockHybridStore};
    use cachet_core::CacheError;
    use chrono::Utc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_only_relative_expiration_is_forwarded() {
        let mut store = MockHybridStore::new();
        store
            .expect_set()
            .withf(|key, payload, ttl| {
                key.to_string() == "k"
                    && !payload.is_empty()
                    && *ttl == Some(Duration::from_secs(600))
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let backend = HybridBackend::new(store);
        let policy = EntryExpirationPolicy::new()
            .with_absolute_expiration(Utc::now() + chrono::Duration::hours(1))
            .with_absolute_expiration_relative_to_now(chrono::Duration::minutes(10))
            .unwrap()
            .with_sliding_expiration(chrono::Duration::minutes(1))
            .unwrap();

        backend
            .set_raw_async(&CacheKey::new("k"), &"v".to_string(), &policy)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sliding_only_means_no_ttl() {
        let mut store = MockHybridStore::new();
        store
            .expect_set()
            .withf(|_, _, ttl| ttl.is_none())
            .times(1)
            .returning(|_, _, _| Ok(()));

        let backend = HybridBackend::new(store);
        let policy = EntryExpirationPolicy::new()
            .with_sliding_expiration(chrono::Duration::seconds(5))
            .unwrap();

        backend
            .set_raw_async(&CacheKey::new("k"), &1_u32, &policy)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let mut store = MockHybridStore::new();
        store
            .expect_get()
            .times(1)
            .returning(|_| Err(CacheError::backend("redis", "connection refused")));
        store
            .expect_remove()
            .times(1)
            .returning(|_| Err(CacheError::backend("redis", "connection refused")));

        let backend = HybridBackend::new(store);
        let key = CacheKey::new("k");

        let err = backend.get_raw_async::<String>(&key).await.unwrap_err();
        assert!(err.is_retriable());
        let err = backend.remove_raw_async(&key).await.unwrap_err();
        assert!(matches!(err, CacheError::Backend { .. }));
    }

    #[tokio::test]
    async fn test_undecodable_payload() {
        let mut store = MockHybridStore::new();
        store
            .expect_get()
            .returning(|_| Ok(Some(vec![0xC1, 0xFF, 0xFF])));

        let backend = HybridBackend::new(store);
        let err = backend
            .get_raw_async::<String>(&CacheKey::new("k"))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }

    #[test]
    fn test_sync_call_outside_runtime() {
        let backend = HybridBackend::new(LocalHybridStore::default());
        let key = CacheKey::new("k");
        backend
            .set_raw(&key, &"v".to_string(), &EntryExpirationPolicy::default())
            .unwrap();
        assert_eq!(backend.get_raw::<String>(&key).unwrap().as_deref(), Some("v"));
        backend.remove_raw(&key).unwrap();
        assert!(backend.get_raw::<String>(&key).unwrap().is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_sync_call_on_current_thread_runtime_fails() {
        let backend = HybridBackend::new(LocalHybridStore::default());
        let err = backend.get_raw::<u8>(&CacheKey::new("k")).unwrap_err();
        assert!(matches!(err, CacheError::BlockingInAsyncContext));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_sync_call_from_spawn_blocking_on_current_thread_runtime() {
        let backend = HybridBackend::new(LocalHybridStore::default());
        let value = tokio::task::spawn_blocking(move || {
            let key = CacheKey::new("k");
            backend.set_raw(&key, &3_u16, &EntryExpirationPolicy::default())?;
            backend.get_raw::<u16>(&key)
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(value, Some(3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sync_call_on_multi_thread_runtime() {
        let backend = HybridBackend::new(LocalHybridStore::default());
        let key = CacheKey::new("k");
        backend
            .set_raw(&key, &42_i64, &EntryExpirationPolicy::default())
            .unwrap();
        assert_eq!(backend.get_raw::<i64>(&key).unwrap(), Some(42));
    }

    #[test]
    fn test_settings_codec() {
        let backend =
            HybridBackend::from_settings(LocalHybridStore::default(), &HybridSettings::default());
        assert!(format!("{backend:?}").contains("msgpack"));
    }
}
