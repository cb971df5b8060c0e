//! Typed cache facade.
//!
//! [`TypedCache`] is what callers hold. Each operation builds the key for a
//! namespace member and hands it to the backend primitive; errors from either
//! step reach the caller unchanged.

use crate::metrics::CacheMetrics;
use crate::{
    validate_namespace, CacheBackend, CacheError, CacheKey, CacheNamespace, CacheResult,
    CacheValue, EntryExpirationPolicy, KeyBuilder, KeyOptions,
};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A cache scoped to one namespace type.
pub struct TypedCache<N, B> {
    backend: Arc<B>,
    keys: KeyBuilder,
    _namespace: PhantomData<fn() -> N>,
}

impl<N, B> Clone for TypedCache<N, B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            keys: self.keys.clone(),
            _namespace: PhantomData,
        }
    }
}

impl<N, B> fmt::Debug for TypedCache<N, B>
where
    N: CacheNamespace,
    B: CacheBackend,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedCache")
            .field("namespace", &N::TYPE_NAME)
            .field("backend", &B::NAME)
            .field("keys", self.keys.options())
            .finish()
    }
}

impl<N, B> TypedCache<N, B>
where
    N: CacheNamespace,
    B: CacheBackend,
{
    /// Creates a cache over `backend`.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error if the namespace table declares a
    /// blank or duplicate key.
    pub fn new(backend: B, options: KeyOptions) -> CacheResult<Self> {
        Self::with_shared_backend(Arc::new(backend), options)
    }

    /// Creates a cache over a backend shared with other caches.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error if the namespace table declares a
    /// blank or duplicate key.
    pub fn with_shared_backend(backend: Arc<B>, options: KeyOptions) -> CacheResult<Self> {
        validate_namespace::<N>()?;
        Ok(Self {
            backend,
            keys: KeyBuilder::new(options),
            _namespace: PhantomData,
        })
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the key options of this cache.
    #[must_use]
    pub fn key_options(&self) -> &KeyOptions {
        self.keys.options()
    }

    /// Builds the key an operation on `id` would use.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::KeyTooLong`] if the key exceeds the length limit.
    pub fn key(&self, id: N, sub_key: Option<&str>) -> CacheResult<CacheKey> {
        self.keys.build(id, sub_key)
    }

    // ==================== Sync ====================

    /// Reads the value stored for `id`.
    ///
    /// # Errors
    ///
    /// Fails on key validation or backend errors. A missing entry is `Ok(None)`.
    pub fn get<T: CacheValue>(&self, id: N, sub_key: Option<&str>) -> CacheResult<Option<T>> {
        let result = self
            .key(id, sub_key)
            .and_then(|key| self.backend.get_raw(&key));
        self.observe_get(result)
    }

    /// Stores `value` for `id` without expiration.
    ///
    /// # Errors
    ///
    /// Fails on key validation or backend errors.
    pub fn set<T: CacheValue>(&self, id: N, sub_key: Option<&str>, value: &T) -> CacheResult<()> {
        self.set_with_options(id, sub_key, value, &EntryExpirationPolicy::default())
    }

    /// Stores `value` for `id` with an expiration policy.
    ///
    /// # Errors
    ///
    /// Fails on key validation or backend errors.
    pub fn set_with_options<T: CacheValue>(
        &self,
        id: N,
        sub_key: Option<&str>,
        value: &T,
        expiration: &EntryExpirationPolicy,
    ) -> CacheResult<()> {
        let result = self
            .key(id, sub_key)
            .and_then(|key| self.backend.set_raw(&key, value, expiration));
        self.observe_write("set", result)
    }

    /// Removes the value stored for `id`.
    ///
    /// # Errors
    ///
    /// Fails on key validation or backend errors. Removing a missing entry succeeds.
    pub fn remove(&self, id: N, sub_key: Option<&str>) -> CacheResult<()> {
        let result = self
            .key(id, sub_key)
            .and_then(|key| self.backend.remove_raw(&key));
        self.observe_write("remove", result)
    }

    // ==================== Async ====================

    /// Reads the value stored for `id`.
    ///
    /// # Errors
    ///
    /// Fails on key validation or backend errors, or with
    /// [`CacheError::Cancelled`] once `cancel` fires.
    pub async fn get_async<T: CacheValue>(
        &self,
        id: N,
        sub_key: Option<&str>,
        cancel: &CancellationToken,
    ) -> CacheResult<Option<T>> {
        let result = cancellable(cancel, async {
            let key = self.key(id, sub_key)?;
            self.backend.get_raw_async(&key).await
        })
        .await;
        self.observe_get(result)
    }

    /// Stores `value` for `id` without expiration.
    ///
    /// # Errors
    ///
    /// Fails on key validation or backend errors, or with
    /// [`CacheError::Cancelled`] once `cancel` fires.
    pub async fn set_async<T: CacheValue>(
        &self,
        id: N,
        sub_key: Option<&str>,
        value: &T,
        cancel: &CancellationToken,
    ) -> CacheResult<()> {
        self.set_with_options_async(id, sub_key, value, &EntryExpirationPolicy::default(), cancel)
            .await
    }

    /// Stores `value` for `id` with an expiration policy.
    ///
    /// A write the store already committed is not rolled back on cancellation.
    ///
    /// # Errors
    ///
    /// Fails on key validation or backend errors, or with
    /// [`CacheError::Cancelled`] once `cancel` fires.
    pub async fn set_with_options_async<T: CacheValue>(
        &self,
        id: N,
        sub_key: Option<&str>,
        value: &T,
        expiration: &EntryExpirationPolicy,
        cancel: &CancellationToken,
    ) -> CacheResult<()> {
        let result = cancellable(cancel, async {
            let key = self.key(id, sub_key)?;
            self.backend.set_raw_async(&key, value, expiration).await
        })
        .await;
        self.observe_write("set", result)
    }

    /// Removes the value stored for `id`.
    ///
    /// # Errors
    ///
    /// Fails on key validation or backend errors, or with
    /// [`CacheError::Cancelled`] once `cancel` fires.
    pub async fn remove_async(
        &self,
        id: N,
        sub_key: Option<&str>,
        cancel: &CancellationToken,
    ) -> CacheResult<()> {
        let result = cancellable(cancel, async {
            let key = self.key(id, sub_key)?;
            self.backend.remove_raw_async(&key).await
        })
        .await;
        self.observe_write("remove", result)
    }

    fn observe_get<T>(&self, result: CacheResult<Option<T>>) -> CacheResult<Option<T>> {
        match &result {
            Ok(value) => CacheMetrics::lookup(B::NAME, value.is_some()),
            Err(e) => self.observe_error("get", e),
        }
        result
    }

    fn observe_write(&self, operation: &'static str, result: CacheResult<()>) -> CacheResult<()> {
        match (&result, operation) {
            (Ok(()), "remove") => CacheMetrics::removed(B::NAME),
            (Ok(()), _) => CacheMetrics::set(B::NAME),
            (Err(e), _) => self.observe_error(operation, e),
        }
        result
    }

    fn observe_error(&self, operation: &'static str, err: &CacheError) {
        debug!(
            backend = B::NAME,
            namespace = N::TYPE_NAME,
            operation,
            code = err.error_code(),
            "Cache operation failed: {}",
            err
        );
        CacheMetrics::error(B::NAME, operation, err.error_code());
    }
}

async fn cancellable<F, R>(cancel: &CancellationToken, operation: F) -> CacheResult<R>
where
    F: Future<Output = CacheResult<R>>,
{
    if cancel.is_cancelled() {
        return Err(CacheError::Cancelled);
    }

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CacheError::Cancelled),
        result = operation => result,
    }
}
