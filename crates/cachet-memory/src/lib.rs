//! # Cachet Memory
//!
//! Process-local caching for Cachet.
//! [`ExpiringStore`] is the expiring map shared by every local tier;
//! [`MemoryBackend`] adapts it to the typed cache contract.

mod backend;
mod store;

pub use backend::*;
pub use store::*;
