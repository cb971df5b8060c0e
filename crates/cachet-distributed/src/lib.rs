//! # Cachet Distributed
//!
//! Distributed caching for Cachet.
//! Values are encoded by a [`PayloadCodec`](cachet_core::PayloadCodec) and kept
//! in a [`ByteStore`]: either in-process ([`MemoryByteStore`]) or in Redis
//! ([`RedisByteStore`]).

mod backend;
mod memory;
pub mod redis;
mod store;

pub use backend::*;
pub use memory::*;
pub use crate::redis::{create_pool, RedisByteStore};
pub use store::*;
