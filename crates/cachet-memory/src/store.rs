//! Expiring process-local store.

use cachet_core::ResolvedExpiration;
use chrono::Utc;
use moka::sync::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

/// A stored value with the expiration it was written with.
#[derive(Clone)]
struct Slot<V> {
    value: V,
    expiration: ResolvedExpiration,
}

/// Per-entry expiry driven by each slot's resolved expiration.
struct SlotExpiry;

impl<V> Expiry<String, Slot<V>> for SlotExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        slot: &Slot<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        slot.expiration.time_to_live(Utc::now())
    }

    fn expire_after_read(
        &self,
        _key: &String,
        slot: &Slot<V>,
        _read_at: Instant,
        duration_until_expiry: Option<Duration>,
        _last_modified_at: Instant,
    ) -> Option<Duration> {
        // Only sliding entries are renewed by reads
        match slot.expiration.sliding() {
            Some(_) => slot.expiration.time_to_live(Utc::now()),
            None => duration_until_expiry,
        }
    }

    fn expire_after_update(
        &self,
        _key: &String,
        slot: &Slot<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        slot.expiration.time_to_live(Utc::now())
    }
}

/// Concurrent in-memory map whose entries expire individually.
///
/// Absolute deadlines and sliding windows are honored per entry; a sliding
/// window is renewed on every read but never passes the deadline.
#[derive(Clone)]
pub struct ExpiringStore<V> {
    cache: Cache<String, Slot<V>>,
}

impl<V> ExpiringStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a store, bounded to `max_capacity` entries when set.
    #[must_use]
    pub fn new(max_capacity: Option<u64>) -> Self {
        let mut builder = Cache::builder().expire_after(SlotExpiry);
        if let Some(capacity) = max_capacity {
            builder = builder.max_capacity(capacity);
        }
        Self {
            cache: builder.build(),
        }
    }

    /// Returns the live value stored under `key`.
    pub fn get(&self, key: &str) -> Option<V> {
        self.cache.get(key).map(|slot| slot.value)
    }

    /// Stores `value` under `key`.
    ///
    /// An entry whose deadline has already passed is removed instead.
    pub fn insert(&self, key: &str, value: V, expiration: ResolvedExpiration) {
        if expiration.is_expired(Utc::now()) {
            self.cache.invalidate(key);
            return;
        }
        self.cache
            .insert(key.to_string(), Slot { value, expiration });
    }

    /// Stores `value` under `key` for a fixed time, or forever when `ttl` is `None`.
    pub fn insert_for(&self, key: &str, value: V, ttl: Option<Duration>) {
        let now = Utc::now();
        let deadline = ttl.map(|ttl| {
            chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|ttl| now.checked_add_signed(ttl))
                .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC)
        });
        self.insert(key, value, ResolvedExpiration::new(deadline, None));
    }

    /// Removes the entry stored under `key`.
    pub fn remove(&self, key: &str) {
        self.cache.invalidate(key);
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Approximate number of live entries.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl<V> std::fmt::Debug for ExpiringStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringStore")
            .field("entries", &self.cache.entry_count())
            .field("max_capacity", &self.cache.policy().max_capacity())
            .finish()
    }
}
