//! Redis byte store.
//!
//! Each entry is a hash with three fields: `absexp` (absolute deadline in unix
//! milliseconds), `sldexp` (sliding window in milliseconds) and `data`. A
//! missing dimension is stored as `-1`. The key's own `PEXPIRE` always reflects
//! the earliest point the entry may disappear; reads of sliding entries push it
//! forward, never past `absexp`.

use super::redis_error;
use crate::ByteStore;
use async_trait::async_trait;
use cachet_core::{CacheResult, ResolvedExpiration};
use chrono::Utc;
use deadpool_redis::Pool;
use redis::{AsyncCommands, Script};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

const ABSOLUTE_FIELD: &str = "absexp";
const SLIDING_FIELD: &str = "sldexp";
const DATA_FIELD: &str = "data";
const NOT_PRESENT: i64 = -1;

/// Reads the payload and renews the sliding window in one round trip.
///
/// KEYS[1] = entry key, ARGV[1] = caller's clock in unix milliseconds.
static GET_AND_REFRESH: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
local entry = redis.call('HMGET', KEYS[1], 'absexp', 'sldexp', 'data')
local data = entry[3]
if not data then
  return false
end
local sliding = tonumber(entry[2])
if sliding and sliding > 0 then
  local ttl = sliding
  local absolute = tonumber(entry[1])
  if absolute and absolute > 0 then
    local remaining = absolute - tonumber(ARGV[1])
    if remaining <= 0 then
      redis.call('DEL', KEYS[1])
      return false
    end
    if remaining < ttl then
      ttl = remaining
    end
  end
  redis.call('PEXPIRE', KEYS[1], ttl)
end
return data
",
    )
});

/// Byte store backed by a Redis connection pool.
#[derive(Clone)]
pub struct RedisByteStore {
    pool: Pool,
}

impl RedisByteStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool.
    async fn conn(&self, key: &str) -> CacheResult<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| redis_error("connect for", key, e))
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX).max(1)
}

#[async_trait]
impl ByteStore for RedisByteStore {
    const NAME: &'static str = "redis";

    async fn get_async(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn(key).await?;

        let payload: Option<Vec<u8>> = GET_AND_REFRESH
            .key(key)
            .arg(Utc::now().timestamp_millis())
            .invoke_async(&mut *conn)
            .await
            .map_err(|e| redis_error("get", key, e))?;

        match &payload {
            Some(_) => debug!("Cache hit for key '{}'", key),
            None => debug!("Cache miss for key '{}'", key),
        }

        Ok(payload)
    }

    async fn set_async(
        &self,
        key: &str,
        payload: Vec<u8>,
        expiration: ResolvedExpiration,
    ) -> CacheResult<()> {
        let now = Utc::now();
        let mut conn = self.conn(key).await?;

        if expiration.is_expired(now) {
            conn.del::<_, ()>(key)
                .await
                .map_err(|e| redis_error("delete", key, e))?;
            debug!("Deleted key '{}': deadline already passed", key);
            return Ok(());
        }

        let absolute = expiration
            .deadline()
            .map_or(NOT_PRESENT, |deadline| deadline.timestamp_millis());
        let sliding = expiration.sliding().map_or(NOT_PRESENT, millis);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(key)
            .ignore()
            .cmd("HSET")
            .arg(key)
            .arg(ABSOLUTE_FIELD)
            .arg(absolute)
            .arg(SLIDING_FIELD)
            .arg(sliding)
            .arg(DATA_FIELD)
            .arg(payload)
            .ignore();

        let ttl = expiration.time_to_live(now);
        if let Some(ttl) = ttl {
            pipe.pexpire(key, millis(ttl)).ignore();
        }

        let _: () = pipe
            .query_async(&mut *conn)
            .await
            .map_err(|e| redis_error("set", key, e))?;

        debug!("Cached key '{}' with TTL {:?}", key, ttl);
        Ok(())
    }

    async fn remove_async(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn(key).await?;
        let deleted: i64 = conn
            .del(key)
            .await
            .map_err(|e| redis_error("delete", key, e))?;

        debug!("Deleted key '{}': {}", key, deleted > 0);
        Ok(())
    }
}
