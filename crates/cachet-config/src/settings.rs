//! Cache configuration structures.

use cachet_core::telemetry::TelemetryConfig;
use cachet_core::{CodecOptions, KeyOptions};
use serde::{Deserialize, Serialize};

/// Root cache configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Key construction options shared by every cache built from these settings.
    #[serde(default)]
    pub keys: KeyOptions,

    /// Which adapter to build.
    #[serde(default)]
    pub backend: BackendKind,

    /// Process-local adapter settings.
    #[serde(default)]
    pub memory: MemorySettings,

    /// Distributed adapter settings.
    #[serde(default)]
    pub distributed: DistributedSettings,

    /// Hybrid adapter settings.
    #[serde(default)]
    pub hybrid: HybridSettings,

    /// Redis connection settings, used by the distributed and hybrid adapters.
    #[serde(default)]
    pub redis: RedisSettings,

    /// Tracing subscriber settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl CacheSettings {
    /// Returns true if the selected backend talks to Redis.
    #[must_use]
    pub fn uses_redis(&self) -> bool {
        !matches!(self.backend, BackendKind::Memory)
    }
}

/// Cache adapter selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local object store.
    #[default]
    Memory,
    /// Byte store shared between instances.
    Distributed,
    /// Local tier in front of a shared tier.
    Hybrid,
}

/// Process-local adapter settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySettings {
    /// Maximum number of entries; unbounded when unset.
    #[serde(default)]
    pub max_capacity: Option<u64>,
}

/// Distributed adapter settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributedSettings {
    /// Payload codec options. Compression is on by default.
    #[serde(default)]
    pub codec: CodecOptions,
}

/// Hybrid adapter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HybridSettings {
    /// Payload codec options. Compression is off by default.
    #[serde(default = "default_hybrid_codec")]
    pub codec: CodecOptions,

    /// Pub/sub channel carrying invalidation messages between instances.
    #[serde(default = "default_invalidation_channel")]
    pub invalidation_channel: String,

    /// Maximum number of entries in the local tier; unbounded when unset.
    #[serde(default)]
    pub local_max_capacity: Option<u64>,
}

fn default_hybrid_codec() -> CodecOptions {
    CodecOptions::uncompressed()
}

fn default_invalidation_channel() -> String {
    "cachet:invalidate".to_string()
}

impl Default for HybridSettings {
    fn default() -> Self {
        Self {
            codec: default_hybrid_codec(),
            invalidation_channel: default_invalidation_channel(),
            local_max_capacity: None,
        }
    }
}

/// Redis connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisSettings {
    /// Connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Maximum pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_pool_size() -> usize {
    10
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_pool_size(),
        }
    }
}
