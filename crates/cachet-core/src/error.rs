//! Unified error type for the cache facade and its backends.

use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for all Cachet crates.
///
/// Variants fall into two families: invalid arguments raised before any I/O
/// happens (bad expiration values, oversized keys, broken namespace tables) and
/// backend failures surfaced by a store or codec. A missing entry is never an
/// error; lookups return `Ok(None)` instead.
#[derive(Error, Debug)]
pub enum CacheError {
    // ============ Argument Errors ============
    /// Invalid argument supplied by the caller
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Built key is longer than the backend limit
    #[error(
        "Generated cache key exceeds maximum length of {limit} bytes. \
         Current key is {length} bytes: '{key}'. \
         Consider using a shorter optional key or shorter namespace names."
    )]
    KeyTooLong {
        key: String,
        length: usize,
        limit: usize,
    },

    /// Two namespace members resolve to the same base key
    #[error("Duplicate cache key '{key}' in namespace {namespace}")]
    DuplicateKeyOverride { namespace: &'static str, key: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ============ Backend Errors ============
    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored object is not of the requested type
    #[error("Cached value for key '{key}' is not of type {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    /// Raw store failure (connectivity, protocol, pool exhaustion)
    #[error("Cache backend error: {backend} - {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    // ============ Execution Errors ============
    /// Asynchronous operation was cancelled by the caller
    #[error("Cache operation cancelled")]
    Cancelled,

    /// Synchronous call would block a single-threaded runtime
    #[error(
        "Synchronous cache call made from a current-thread runtime; \
         use the async form or a multi-threaded runtime"
    )]
    BlockingInAsyncContext,

    /// Generic error wrapper for third-party store implementations
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CacheError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::KeyTooLong { .. } => "KEY_TOO_LONG",
            Self::DuplicateKeyOverride { .. } => "DUPLICATE_KEY_OVERRIDE",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::Backend { .. } => "BACKEND_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::BlockingInAsyncContext => "BLOCKING_IN_ASYNC_CONTEXT",
            Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument<T: Into<String>>(message: T) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization<T: ToString>(err: T) -> Self {
        Self::Serialization(err.to_string())
    }

    /// Creates a backend error for the named store.
    #[must_use]
    pub fn backend<T: Into<String>>(backend: &'static str, message: T) -> Self {
        Self::Backend {
            backend,
            message: message.into(),
        }
    }

    /// Checks if this error was raised by argument validation.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_)
                | Self::KeyTooLong { .. }
                | Self::DuplicateKeyOverride { .. }
                | Self::Configuration(_)
        )
    }

    /// Checks if this error was surfaced by a store or codec.
    #[must_use]
    pub const fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Self::Serialization(_) | Self::TypeMismatch { .. } | Self::Backend { .. } | Self::Other(_)
        )
    }

    /// Checks if retrying the same call could succeed.
    ///
    /// The cache never retries on its own; this is a hint for callers.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }
}

impl From<rmp_serde::encode::Error> for CacheError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::Serialization(format!("MessagePack encode error: {}", err))
    }
}

impl From<rmp_serde::decode::Error> for CacheError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::Serialization(format!("MessagePack decode error: {}", err))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON serialization error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CacheError::invalid_argument("bad").error_code(), "INVALID_ARGUMENT");
        assert_eq!(CacheError::Cancelled.error_code(), "CANCELLED");
        assert_eq!(CacheError::backend("redis", "down").error_code(), "BACKEND_ERROR");
        assert_eq!(
            CacheError::KeyTooLong {
                key: "k".to_string(),
                length: 300,
                limit: 250,
            }
            .error_code(),
            "KEY_TOO_LONG"
        );
    }

    #[test]
    fn test_invalid_argument_family() {
        assert!(CacheError::invalid_argument("bad").is_invalid_argument());
        assert!(CacheError::configuration("missing").is_invalid_argument());
        assert!(CacheError::DuplicateKeyOverride {
            namespace: "TestCacheId",
            key: "dup".to_string(),
        }
        .is_invalid_argument());
        assert!(!CacheError::backend("redis", "down").is_invalid_argument());
    }

    #[test]
    fn test_backend_failure_family() {
        assert!(CacheError::backend("redis", "down").is_backend_failure());
        assert!(CacheError::serialization("eof").is_backend_failure());
        assert!(CacheError::Other(anyhow::anyhow!("boom")).is_backend_failure());
        assert!(!CacheError::Cancelled.is_backend_failure());
        assert!(!CacheError::invalid_argument("bad").is_backend_failure());
    }

    #[test]
    fn test_retriable_errors() {
        assert!(CacheError::backend("redis", "connection refused").is_retriable());
        assert!(!CacheError::serialization("eof").is_retriable());
        assert!(!CacheError::Cancelled.is_retriable());
    }

    #[test]
    fn test_key_too_long_message() {
        let err = CacheError::KeyTooLong {
            key: "TestCacheId:Foobar_xxx".to_string(),
            length: 301,
            limit: 250,
        };
        let msg = err.to_string();
        assert!(msg.contains("exceeds maximum length"));
        assert!(msg.contains("250 bytes"));
        assert!(msg.contains("301 bytes"));
        assert!(msg.contains("TestCacheId:Foobar_xxx"));
    }

    #[test]
    fn test_backend_error_display() {
        let err = CacheError::backend("redis", "Failed to get key 'a': timeout");
        let msg = err.to_string();
        assert!(msg.contains("redis") && msg.contains("timeout"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err = CacheError::from(json_err);
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
