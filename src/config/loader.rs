//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered with the `config`
//! crate, lowest precedence first:
//!
//! 1. the base TOML file (`config/changeflow.toml` or `CHANGEFLOW_CONFIG_PATH`)
//! 2. an environment overlay next to it (`changeflow.{environment}.toml`)
//! 3. `CHANGEFLOW_*` environment variables, `__` separating nested keys
//!    (`CHANGEFLOW_QUEUE__BATCH_SIZE=20`, `CHANGEFLOW_ENGINE__IDENTITIES=a,b`)

use super::error::{ConfigResult, ConfigurationError};
use super::ChangeflowConfig;
use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_CONFIG_PATH: &str = "config/changeflow.toml";

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: ChangeflowConfig,
    environment: String,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        let path = env::var("CHANGEFLOW_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from_path_with_env(&path, &Self::detect_environment())
    }

    /// Load configuration from a specific file with explicit environment.
    /// Useful for tests that must not touch global environment variables.
    pub fn load_from_path_with_env(
        path: &Path,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        debug!(
            path = %path.display(),
            environment = %environment,
            "Loading configuration"
        );

        let overlay = Self::overlay_path(path, environment);
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                File::from(overlay.as_path())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("CHANGEFLOW")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("engine.identities"),
            )
            .build()
            .map_err(|e| ConfigurationError::load_failed(path.display().to_string(), e))?;

        let config: ChangeflowConfig = settings
            .try_deserialize()
            .map_err(|e| ConfigurationError::load_failed(path.display().to_string(), e))?;

        config.validate()?;

        info!(
            environment = %environment,
            tenants = config.tenants.len(),
            engine_identities = config.engine.identities.len(),
            "Configuration loaded successfully"
        );
        debug!(
            config = %Self::sanitize_config_for_logging(&config),
            "Effective configuration"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_path: path.to_path_buf(),
        }))
    }

    /// Wrap an already-built configuration after validating it
    pub fn from_config(
        config: ChangeflowConfig,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_path: PathBuf::new(),
        }))
    }

    pub fn config(&self) -> &ChangeflowConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Configuration as JSON with credential fields masked
    pub fn debug_config(&self) -> serde_json::Value {
        Self::sanitize_config_for_logging(&self.config)
    }

    /// Detect current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("CHANGEFLOW_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn overlay_path(path: &Path, environment: &str) -> PathBuf {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("changeflow");
        path.with_file_name(format!("{stem}.{environment}.toml"))
    }

    fn sanitize_config_for_logging(config: &ChangeflowConfig) -> serde_json::Value {
        let mut config_json = serde_json::to_value(config).unwrap_or(serde_json::Value::Null);
        let sensitive_patterns = ["secret", "token", "credential", "external_id", "password"];
        Self::sanitize_json_recursive(&mut config_json, &sensitive_patterns);
        config_json
    }

    fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let is_sensitive = sensitive_patterns
                        .iter()
                        .any(|pattern| key_lower.contains(pattern));

                    if is_sensitive && !val.is_null() {
                        *val = serde_json::Value::String("[MASKED]".to_string());
                    } else {
                        Self::sanitize_json_recursive(val, sensitive_patterns);
                    }
                }
            }
            serde_json::Value::Array(arr) => {
                for item in arr.iter_mut() {
                    Self::sanitize_json_recursive(item, sensitive_patterns);
                }
            }
            _ => {}
        }
    }
}
