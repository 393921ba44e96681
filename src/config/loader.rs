//! Configuration Loader
//!
//! Environment-aware configuration loading. Discovers the configuration
//! directory, layers base, environment and process-environment sources through
//! the `config` crate, and validates the result before handing it out.

use super::error::{ConfigResult, ConfigurationError};
use super::InvestigationCoreConfig;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Prefix of environment variable overrides (`INVESTIGATION__RETRY__MAX_RETRIES=5`)
const ENV_PREFIX: &str = "INVESTIGATION";
const ENV_SEPARATOR: &str = "__";

/// Loaded and validated configuration
#[derive(Debug)]
pub struct ConfigManager {
    config: InvestigationCoreConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Useful for tests that must not touch process-wide variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = environment,
            config_directory = %config_directory.display(),
            "Loading configuration"
        );

        let base_file = config_directory.join("base.toml");
        if !base_file.is_file() {
            return Err(ConfigurationError::config_file_not_found(vec![base_file]));
        }
        let environment_file = config_directory.join(format!("{environment}.toml"));

        let config = Config::builder()
            .add_source(File::from(base_file.as_path()).required(true))
            .add_source(File::from(environment_file.as_path()).required(false))
            .add_source(Self::environment_source())
            .build()
            .map_err(|e| ConfigurationError::parse_error(config_directory.display().to_string(), e))?
            .try_deserialize::<InvestigationCoreConfig>()
            .map_err(|e| ConfigurationError::environment_config_error(environment, e))?;

        config.validate()?;

        info!(
            environment = environment,
            component_overrides = config.circuit_breakers.component_configs.len(),
            max_retries = config.retry.max_retries,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Load a single TOML file, still honoring environment variable overrides
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Arc<ConfigManager>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigurationError::config_file_not_found(vec![
                path.to_path_buf()
            ]));
        }

        let config = Config::builder()
            .add_source(File::from(path).required(true))
            .add_source(Self::environment_source())
            .build()
            .and_then(|built| built.try_deserialize::<InvestigationCoreConfig>())
            .map_err(|e| ConfigurationError::parse_error(path.display().to_string(), e))?;

        config.validate()?;

        debug!(path = %path.display(), "Configuration loaded from file");

        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            config_directory: path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }))
    }

    /// Wrap an already built configuration, validating it first
    pub fn from_config(config: InvestigationCoreConfig, environment: &str) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: Self::default_config_directory(),
        }))
    }

    pub fn config(&self) -> &InvestigationCoreConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Configuration as JSON for diagnostics
    pub fn debug_config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }

    /// Environment name from `INVESTIGATION_ENV`, then `APP_ENV`, else `development`
    pub fn detect_environment() -> String {
        env::var("INVESTIGATION_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    /// `INVESTIGATION_CONFIG_DIR`, else `config/` under the crate root
    fn default_config_directory() -> PathBuf {
        if let Ok(dir) = env::var("INVESTIGATION_CONFIG_DIR") {
            return PathBuf::from(dir);
        }

        env::var("CARGO_MANIFEST_DIR")
            .map(|root| PathBuf::from(root).join("config"))
            .unwrap_or_else(|_| PathBuf::from("config"))
    }

    fn environment_source() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
    }
}
