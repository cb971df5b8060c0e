//! Local tier in front of Redis.

use super::{InvalidationListener, InvalidationMessage};
use crate::HybridStore;
use async_trait::async_trait;
use cachet_config::{HybridSettings, RedisSettings};
use cachet_core::{CacheError, CacheResult};
use cachet_distributed::create_pool;
use cachet_memory::ExpiringStore;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Two-tier store: process-local L1 and Redis L2.
///
/// ## Lookup Order
///
/// 1. L1, without I/O
/// 2. L2; a hit is promoted to L1 for the entry's remaining Redis TTL
///
/// Writes and removals go to L2 first, then evict the L1 copy, then publish an
/// [`InvalidationMessage`] so other instances drop theirs. Writes never fill
/// L1: with two concurrent writers on one instance, the next read promotes the
/// value that reached L2 last.
///
/// A read that fetched L2 just before a concurrent write may still promote the
/// older value. That copy lives until its remaining TTL runs out or the key is
/// written or removed again.
#[derive(Clone)]
pub struct RedisHybridStore {
    pool: Pool,
    local: ExpiringStore<Arc<Vec<u8>>>,
    channel: String,
    origin: Uuid,
}

impl RedisHybridStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: Pool, settings: &HybridSettings) -> Self {
        Self {
            pool,
            local: ExpiringStore::new(settings.local_max_capacity),
            channel: settings.invalidation_channel.clone(),
            origin: Uuid::new_v4(),
        }
    }

    /// Connects to Redis and starts the invalidation listener.
    ///
    /// The listener runs until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Fails if the pool cannot be created or the server does not answer.
    pub async fn connect(
        redis: &RedisSettings,
        hybrid: &HybridSettings,
        cancel: CancellationToken,
    ) -> CacheResult<(Self, JoinHandle<()>)> {
        let pool = create_pool(redis).await?;
        let store = Self::new(pool, hybrid);
        let handle = store.listener(redis.url.clone()).spawn(cancel);
        info!(channel = %store.channel, origin = %store.origin, "Hybrid cache connected");
        Ok((store, handle))
    }

    /// Builds the listener that keeps this store's L1 in sync with other instances.
    #[must_use]
    pub fn listener(&self, redis_url: impl Into<String>) -> InvalidationListener {
        InvalidationListener::new(
            redis_url,
            self.channel.clone(),
            self.origin,
            self.local.clone(),
        )
    }

    /// Identifier stamped on invalidation messages from this instance.
    #[must_use]
    pub fn origin(&self) -> Uuid {
        self.origin
    }

    /// Returns the local tier.
    #[must_use]
    pub fn local(&self) -> &ExpiringStore<Arc<Vec<u8>>> {
        &self.local
    }

    async fn conn(&self, key: &str) -> CacheResult<deadpool_redis::Connection> {
        self.pool.get().await.map_err(|e| {
            CacheError::backend(
                "redis",
                format!("Failed to get Redis connection for key '{}': {}", key, e),
            )
        })
    }

    async fn publish(&self, conn: &mut deadpool_redis::Connection, key: &str) -> CacheResult<()> {
        let message = serde_json::to_string(&InvalidationMessage {
            origin: self.origin,
            key: key.to_string(),
        })?;

        conn.publish::<_, _, ()>(&self.channel, message)
            .await
            .map_err(|e| redis_error("publish invalidation for", key, e))?;

        debug!(key = %key, channel = %self.channel, "published cache invalidation");
        Ok(())
    }
}

fn redis_error(operation: &str, key: &str, err: redis::RedisError) -> CacheError {
    CacheError::backend("redis", format!("Failed to {} key '{}': {}", operation, key, err))
}

/// Remaining lifetime of an L2 entry, as reported by `PTTL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Remaining {
    /// The key does not exist (`-2`).
    Missing,
    /// The key has no expiry (`-1`).
    Persistent,
    Expires(Duration),
}

impl Remaining {
    fn from_pttl(pttl: i64) -> Self {
        match pttl {
            -1 => Self::Persistent,
            ms => u64::try_from(ms).map_or(Self::Missing, |ms| {
                Self::Expires(Duration::from_millis(ms))
            }),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl HybridStore for RedisHybridStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        // 1. Check L1
        if let Some(data) = self.local.get(key) {
            debug!(key = %key, "cache hit (L1)");
            return Ok(Some(data.as_ref().clone()));
        }

        // 2. Check L2
        let mut conn = self.conn(key).await?;
        let (payload, pttl): (Option<Vec<u8>>, i64) = redis::pipe()
            .atomic()
            .get(key)
            .pttl(key)
            .query_async(&mut *conn)
            .await
            .map_err(|e| redis_error("get", key, e))?;

        let (data, ttl) = match (payload, Remaining::from_pttl(pttl)) {
            (Some(data), Remaining::Persistent) => (data, None),
            (Some(data), Remaining::Expires(ttl)) => (data, Some(ttl)),
            _ => {
                debug!(key = %key, "cache miss");
                return Ok(None);
            }
        };

        debug!(key = %key, "cache hit (L2)");
        self.local.insert_for(key, Arc::new(data.clone()), ttl);

        Ok(Some(data))
    }

    async fn set(&self, key: &str, payload: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        let mut conn = self.conn(key).await?;

        match ttl {
            Some(ttl) => conn
                .pset_ex::<_, _, ()>(key, payload.as_slice(), millis(ttl))
                .await,
            None => conn.set::<_, _, ()>(key, payload.as_slice()).await,
        }
        .map_err(|e| redis_error("set", key, e))?;

        // The next read promotes whichever write reached L2 last
        self.local.remove(key);
        debug!(key = %key, ttl = ?ttl, "cache set (L2, L1 evicted)");

        self.publish(&mut conn, key).await
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn(key).await?;

        conn.del::<_, ()>(key)
            .await
            .map_err(|e| redis_error("delete", key, e))?;

        self.local.remove(key);
        debug!(key = %key, "cache invalidated (L1+L2)");

        self.publish(&mut conn, key).await
    }
}
