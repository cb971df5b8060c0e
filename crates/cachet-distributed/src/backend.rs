//! Distributed adapter: encoded payloads in a byte store.

use crate::ByteStore;
use async_trait::async_trait;
use cachet_config::DistributedSettings;
use cachet_core::{
    CacheBackend, CacheKey, CacheNamespace, CacheResult, CacheValue, EntryExpirationPolicy,
    KeyOptions, MessagePackCodec, PayloadCodec, TypedCache,
};
use chrono::Utc;
use std::fmt;

/// Cache backend that encodes values and keeps the bytes in a [`ByteStore`].
pub struct DistributedBackend<S, C = MessagePackCodec> {
    store: S,
    codec: C,
}

impl<S: ByteStore> DistributedBackend<S> {
    /// Creates a backend with the default MessagePack codec (compression on).
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_codec(store, MessagePackCodec::default())
    }

    /// Creates a backend from configuration.
    #[must_use]
    pub fn from_settings(store: S, settings: &DistributedSettings) -> Self {
        Self::with_codec(store, MessagePackCodec::new(settings.codec))
    }
}

impl<S: ByteStore, C: PayloadCodec> DistributedBackend<S, C> {
    /// Creates a backend with a custom codec.
    #[must_use]
    pub fn with_codec(store: S, codec: C) -> Self {
        Self { store, codec }
    }

    /// Returns the byte store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the codec.
    #[must_use]
    pub fn codec(&self) -> &C {
        &self.codec
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

    fn decode<T: CacheValue>(&self, payload: Option<Vec<u8>>) -> CacheResult<Option<T>> {
        payload
            .map(|bytes| self.codec.deserialize(&bytes))
            .transpose()
    }
}

impl<S, C> fmt::Debug for DistributedBackend<S, C>
where
    S: ByteStore,
    C: PayloadCodec,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedBackend")
            .field("store", &S::NAME)
            .field("codec", &self.codec.name())
            .finish()
    }
}

#[async_trait]
impl<S, C> CacheBackend for DistributedBackend<S, C>
where
    S: ByteStore,
    C: PayloadCodec,
{
    const NAME: &'static str = "distributed";

    fn get_raw<T: CacheValue>(&self, key: &CacheKey) -> CacheResult<Option<T>> {
        let payload = self.store.get(key.as_str())?;
        self.decode(payload)
    }

    fn set_raw<T: CacheValue>(
        &self,
        key: &CacheKey,
        value: &T,
        expiration: &EntryExpirationPolicy,
    ) -> CacheResult<()> {
        let payload = self.codec.serialize(value)?;
        self.store
            .set(key.as_str(), payload, expiration.resolve(Utc::now()))
    }

    fn remove_raw(&self, key: &CacheKey) -> CacheResult<()> {
        self.store.remove(key.as_str())
    }

    async fn get_raw_async<T: CacheValue>(&self, key: &CacheKey) -> CacheResult<Option<T>> {
        let payload = self.store.get_async(key.as_str()).await?;
        self.decode(payload)
    }

    async fn set_raw_async<T: CacheValue>(
        &self,
        key: &CacheKey,
        value: &T,
        expiration: &EntryExpirationPolicy,
    ) -> CacheResult<()> {
        let payload = self.codec.serialize(value)?;
        self.store
            .set_async(key.as_str(), payload, expiration.resolve(Utc::now()))
            .await
    }

    async fn remove_raw_async(&self, key: &CacheKey) -> CacheResult<()> {
        self.store.remove_async(key.as_str()).await
    }
}
