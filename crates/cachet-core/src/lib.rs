//! # Cachet Core
//!
//! Typed caching facade for Cachet.
//! This crate provides the pieces every backend shares: the error taxonomy,
//! entry expiration policies, namespace registration, the cache key builder,
//! payload codecs and the typed cache contract that adapters implement.

pub mod blocking;
pub mod cache;
pub mod codec;
pub mod error;
pub mod expiration;
pub mod key;
pub mod metrics;
pub mod namespace;
pub mod result;
pub mod telemetry;
pub mod traits;

pub use cache::*;
pub use codec::*;
pub use error::*;
pub use expiration::*;
pub use key::*;
pub use namespace::*;
pub use result::*;
pub use traits::*;

// Re-exported so adapters and callers share one token type.
pub use tokio_util::sync::CancellationToken;
