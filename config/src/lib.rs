//! # Configuration Management for CacheHaus
//!
//! This crate provides the configuration surface of the cache layer. It is bound
//! once at startup and is read-only afterwards.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::CacheConfig;
//!
//! let cache_config = CacheConfig::new("redis://localhost:6379".to_string())
//!     .with_project_alias("eiu")
//!     .with_default_duration(120);
//! assert_eq!(cache_config.namespace(), "eiu");
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [cache]
//! connection_string = "redis://localhost:6379"
//! project_alias = "eiu"
//! auto_key_by_parameters = true
//! default_duration_seconds = 60
//! enabled = true
//! connection_timeout_ms = 5000
//! store_fault_mode = "propagate"
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Load from cachehaus.toml (or the path in CACHEHAUS_CONFIG)
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::{env, path::Path, time::Duration};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./cachehaus.toml";
const CONFIG_PATH_ENV: &str = "CACHEHAUS_CONFIG";

/// Namespace used when no project alias is configured
pub const DEFAULT_PROJECT_ALIAS: &str = "default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Environment variable error: {0}")]
    Env(#[from] env::VarError),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub cache: CacheConfig,
}

/// How the read path reacts when the backing store cannot be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreFaultMode {
    /// Surface the store error to the caller
    #[default]
    Propagate,
    /// Log the fault and run the wrapped operation uncached
    Bypass,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis connection string (redis://localhost:6379)
    #[serde(default)]
    pub connection_string: String,

    /// Project alias used as the first key segment
    #[serde(default)]
    pub project_alias: Option<String>,

    /// Derive a key suffix from the operation's arguments
    #[serde(default = "default_true")]
    pub auto_key_by_parameters: bool,

    /// Default TTL for cache entries (in seconds)
    #[serde(default = "default_duration_seconds")]
    pub default_duration_seconds: u64,

    /// When false the whole layer is a pass-through and no connection is made
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Connection timeout in milliseconds
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    #[serde(default)]
    pub store_fault_mode: StoreFaultMode,
}

fn default_true() -> bool {
    true
}

fn default_duration_seconds() -> u64 {
    60
}

fn default_connection_timeout_ms() -> u64 {
    5000
}

impl AppConfig {
    /// Load configuration from TOML file specified in .env or defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = {
            // A missing .env file is fine, a malformed one is not
            match dotenvy::dotenv() {
                Ok(_) => {}
                Err(e) if e.not_found() => {}
                Err(e) => return Err(e.into()),
            }

            if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
                Self::from_file(&config_path)
            } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
                Self::from_file(DEFAULT_CONFIG_PATH)
            } else {
                Err(ConfigError::Invalid(format!(
                    "Config path must be specified in .env file as {} or in {} file",
                    CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH
                )))
            }
        }?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()
    }
}

impl CacheConfig {
    /// Create a new cache configuration with reference defaults
    pub fn new(connection_string: String) -> Self {
        Self {
            connection_string,
            ..Self::default()
        }
    }

    /// Configuration for a layer that never touches a store
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_project_alias(mut self, alias: impl Into<String>) -> Self {
        self.project_alias = Some(alias.into());
        self
    }

    pub fn with_default_duration(mut self, seconds: u64) -> Self {
        self.default_duration_seconds = seconds;
        self
    }

    pub fn with_auto_key_by_parameters(mut self, enabled: bool) -> Self {
        self.auto_key_by_parameters = enabled;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_connection_timeout(mut self, timeout_ms: u64) -> Self {
        self.connection_timeout_ms = timeout_ms;
        self
    }

    pub fn with_store_fault_mode(mut self, mode: StoreFaultMode) -> Self {
        self.store_fault_mode = mode;
        self
    }

    /// Key namespace: the project alias, or `default`
    pub fn namespace(&self) -> &str {
        self.project_alias
            .as_deref()
            .filter(|alias| !alias.is_empty())
            .unwrap_or(DEFAULT_PROJECT_ALIAS)
    }

    /// Get default TTL as Duration
    pub fn ttl_duration(&self) -> Duration {
        Duration::from_secs(self.default_duration_seconds)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(alias) = &self.project_alias {
            if alias.contains([':', '*', '?', '[', ']', '\\']) {
                return Err(ConfigError::Invalid(format!(
                    "Project alias '{}' cannot contain ':' or glob characters",
                    alias
                )));
            }
        }

        // A disabled layer needs nothing else
        if !self.enabled {
            return Ok(());
        }

        if self.connection_string.is_empty() {
            return Err(ConfigError::Invalid(
                "Cache connection_string cannot be empty".to_string(),
            ));
        }
        if self.default_duration_seconds == 0 {
            return Err(ConfigError::Invalid(
                "Cache default_duration_seconds must be greater than 0".to_string(),
            ));
        }
        if self.connection_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Cache connection_timeout_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            project_alias: None,
            auto_key_by_parameters: true,
            default_duration_seconds: default_duration_seconds(),
            enabled: true,
            connection_timeout_ms: default_connection_timeout_ms(),
            store_fault_mode: StoreFaultMode::Propagate,
        }
    }
}
