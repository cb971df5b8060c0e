//! Configuration validation.
//!
//! Every problem is collected so one failed start reports all of them.

use crate::CacheSettings;
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// Redis URL cannot be parsed or uses an unsupported scheme.
    InvalidUrl { message: String },
    /// Pool size must be positive.
    InvalidPoolSize { value: usize },
    /// A capacity limit of zero would reject every entry.
    ZeroCapacity { name: String },
    /// Invalidation channel name is blank.
    BlankInvalidationChannel,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl { message } => write!(f, "Invalid redis URL: {}", message),
            Self::InvalidPoolSize { value } => {
                write!(f, "Invalid redis pool size: {} (must be positive)", value)
            }
            Self::ZeroCapacity { name } => {
                write!(f, "Capacity '{}' must be positive when set", name)
            }
            Self::BlankInvalidationChannel => {
                write!(f, "Hybrid invalidation channel cannot be blank")
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// URL schemes accepted by the Redis client.
    const REDIS_SCHEMES: &'static [&'static str] = &["redis", "rediss", "unix", "redis+unix"];

    /// Validates the cache configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(settings: &CacheSettings) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_memory(settings, &mut errors);
        if settings.uses_redis() {
            Self::validate_redis(settings, &mut errors);
        }
        if matches!(settings.backend, crate::BackendKind::Hybrid) {
            Self::validate_hybrid(settings, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_memory(settings: &CacheSettings, errors: &mut Vec<ConfigValidationError>) {
        if settings.memory.max_capacity == Some(0) {
            errors.push(ConfigValidationError::ZeroCapacity {
                name: "memory.max_capacity".to_string(),
            });
        }
    }

    fn validate_redis(settings: &CacheSettings, errors: &mut Vec<ConfigValidationError>) {
        match Url::parse(&settings.redis.url) {
            Ok(url) if Self::REDIS_SCHEMES.contains(&url.scheme()) => {}
            Ok(url) => errors.push(ConfigValidationError::InvalidUrl {
                message: format!(
                    "unsupported scheme '{}' (expected redis, rediss or unix)",
                    url.scheme()
                ),
            }),
            Err(e) => errors.push(ConfigValidationError::InvalidUrl {
                message: e.to_string(),
            }),
        }

        if settings.redis.pool_size == 0 {
            errors.push(ConfigValidationError::InvalidPoolSize { value: 0 });
        }
    }

    fn validate_hybrid(settings: &CacheSettings, errors: &mut Vec<ConfigValidationError>) {
        if settings.hybrid.invalidation_channel.trim().is_empty() {
            errors.push(ConfigValidationError::BlankInvalidationChannel);
        }
        if settings.hybrid.local_max_capacity == Some(0) {
            errors.push(ConfigValidationError::ZeroCapacity {
                name: "hybrid.local_max_capacity".to_string(),
            });
        }
    }
}
