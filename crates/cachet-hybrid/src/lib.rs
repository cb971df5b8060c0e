//! # Cachet Hybrid
//!
//! Two-tier caching for Cachet: a process-local tier in front of a shared
//! Redis tier, kept loosely consistent by pub/sub invalidation messages.
//!
//! Coherence lives entirely in the [`HybridStore`]; [`HybridBackend`] only
//! encodes payloads and forwards the relative expiration.

mod backend;
mod local;
pub mod redis;
mod store;

pub use backend::*;
pub use local::*;
pub use crate::redis::{InvalidationListener, InvalidationMessage, RedisHybridStore};
pub use store::*;
