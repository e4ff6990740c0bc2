//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "RENTSHELF_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "RENTSHELF";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "RENTSHELF_LOG";

/// Storage backend identifiers.
pub const STORAGE_MEMORY: &str = "memory";
pub const STORAGE_SQLITE: &str = "sqlite";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog store configuration.
    pub storage: StorageConfig,
    /// Retry policy applied to every catalog store call.
    pub retry: RetryConfig,
    /// Checkout limits.
    pub checkout: CheckoutConfig,
    /// Notification feed configuration.
    pub notifications: NotificationConfig,
}

/// Catalog store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type (memory, sqlite).
    #[serde(rename = "type")]
    pub storage_type: String,
    /// Path to database file (sqlite only).
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: STORAGE_MEMORY.to_string(),
            path: "./data/rentshelf.db".to_string(),
        }
    }
}

/// Backoff parameters for transient store failures.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub min_delay_ms: u64,
    /// Upper bound for any single delay.
    pub max_delay_ms: u64,
    /// Retries after the initial attempt (0 disables retrying).
    pub max_times: usize,
    /// Randomize delays to avoid synchronized retries.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 20,
            max_delay_ms: 1000,
            max_times: 3,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Maximum books per checkout; 0 means unlimited.
    pub max_items: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Buffered changes per live feed before slow subscribers lag.
    pub feed_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { feed_capacity: 256 }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        Ok(config)
    }

    /// Create config for testing: in-memory store, fast retries.
    pub fn for_test() -> Self {
        Self {
            retry: RetryConfig {
                min_delay_ms: 1,
                max_delay_ms: 5,
                max_times: 3,
                jitter: false,
            },
            ..Self::default()
        }
    }
}
