//! Redis-backed hybrid store and its invalidation listener.

mod listener;
mod store;

pub use listener::InvalidationListener;
pub use store::RedisHybridStore;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message published on the invalidation channel after every write or removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationMessage {
    /// Instance that changed the entry.
    pub origin: Uuid,
    /// Final cache key of the entry.
    pub key: String,
}
