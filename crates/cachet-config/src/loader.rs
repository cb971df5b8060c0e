//! Configuration loader with layered sources.

use crate::{CacheSettings, ConfigValidator};
use cachet_core::CacheError;
use config::{Config, ConfigError, Environment, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Environment variable selecting the environment-specific config file.
pub const ENVIRONMENT_VAR: &str = "CACHET_ENVIRONMENT";

/// Configuration loader with runtime refresh support.
///
/// Caches built from a snapshot keep that snapshot; a reload only affects
/// caches built afterwards.
#[derive(Clone)]
pub struct ConfigLoader {
    settings: Arc<RwLock<CacheSettings>>,
    config_dir: PathBuf,
    environment: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `{config_dir}/default.toml` - Default values
    /// 2. `{config_dir}/{environment}.toml` - Environment-specific overrides
    /// 3. `{config_dir}/local.toml` - Local overrides
    /// 4. Environment variables with `CACHET__` prefix
    ///
    /// The environment comes from `CACHET_ENVIRONMENT` and defaults to
    /// `development`.
    pub fn new(config_dir: impl AsRef<Path>) -> Result<Self, CacheError> {
        // Load .env file if present
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| "development".to_string());
        Self::with_environment(config_dir, environment)
    }

    /// Creates a loader for an explicit environment name.
    pub fn with_environment(
        config_dir: impl AsRef<Path>,
        environment: impl Into<String>,
    ) -> Result<Self, CacheError> {
        let config_dir = config_dir.as_ref().to_path_buf();
        let environment = environment.into();
        let settings = Self::load_settings(&config_dir, &environment)?;

        Ok(Self {
            settings: Arc::new(RwLock::new(settings)),
            config_dir,
            environment,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, CacheError> {
        Self::new("./config")
    }

    /// Returns the environment name used to pick the override file.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Returns the current settings.
    pub async fn get(&self) -> CacheSettings {
        self.settings.read().await.clone()
    }

    /// Reloads the configuration from disk.
    ///
    /// The current settings are kept if the new ones fail to load or validate.
    pub async fn reload(&self) -> Result<(), CacheError> {
        let new_settings = Self::load_settings(&self.config_dir, &self.environment)?;
        let mut settings = self.settings.write().await;
        *settings = new_settings;
        info!("Cache configuration reloaded successfully");
        Ok(())
    }

    fn load_settings(config_dir: &Path, environment: &str) -> Result<CacheSettings, CacheError> {
        info!("Loading cache configuration for environment: {}", environment);

        let mut builder = Config::builder();

        for name in ["default", environment, "local"] {
            let path = config_dir.join(format!("{}.toml", name));
            if path.exists() {
                debug!("Loading config from: {}", path.display());
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("CACHET")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings: CacheSettings = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(config_error_to_cache_error)?;

        ConfigValidator::validate(&settings).map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            CacheError::configuration(messages.join("; "))
        })?;

        Ok(settings)
    }
}

fn config_error_to_cache_error(err: ConfigError) -> CacheError {
    CacheError::configuration(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackendKind;

    #[tokio::test]
    async fn test_missing_directory_yields_defaults() {
        let loader =
            ConfigLoader::with_environment("./does-not-exist", "test-missing-dir").unwrap();
        let settings = loader.get().await;
        assert_eq!(settings.backend, BackendKind::Memory);
        assert_eq!(loader.environment(), "test-missing-dir");
    }
}
