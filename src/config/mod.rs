//! # Configuration Management Module
//!
//! Loads, validates and writes the `config.toml` used by the `lootkeeper`
//! binary. The library itself never reads configuration files; callers turn a
//! [`Config`] into the values the world store needs ([`Config::db_path`],
//! [`Config::capacity_policy`]).
//!
//! ## Configuration Structure
//!
//! - [`StorageConfig`] - where the sled database lives
//! - [`LoggingConfig`] - log level and optional log file
//! - [`InventoryConfig`] - embedded item limits per document
//! - [`ShopConfig`] - default pricing for seeded shops
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lootkeeper::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("World database: {}", config.db_path());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [storage]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//! file = "lootkeeper.log"
//!
//! [inventory]
//! max_embedded_items = 64
//!
//! [shop]
//! default_markup = 1.0
//! ```
//!
//! Every section except `[storage]` and `[logging]` may be omitted and falls
//! back to its defaults.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::world::types::{CapacityPolicy, DEFAULT_MAX_EMBEDDED_ITEMS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub shop: ShopConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Optional override for the sled database path; defaults to `<data_dir>/world`.
    #[serde(default)]
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Items a single character, room or container document may embed.
    #[serde(default = "default_max_embedded_items")]
    pub max_embedded_items: usize,
}

fn default_max_embedded_items() -> usize {
    DEFAULT_MAX_EMBEDDED_ITEMS
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            max_embedded_items: DEFAULT_MAX_EMBEDDED_ITEMS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopConfig {
    /// Multiplier on item base price for shops that do not set their own.
    #[serde(default = "default_markup")]
    pub default_markup: f64,
}

fn default_markup() -> f64 {
    1.0
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            default_markup: default_markup(),
        }
    }
}

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config
            .validate()
            .map_err(|e| anyhow!("Invalid config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(anyhow!(
                "logging.level '{}' is not one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }
        if self.inventory.max_embedded_items == 0 {
            return Err(anyhow!("inventory.max_embedded_items must be at least 1"));
        }
        let markup = self.shop.default_markup;
        if !markup.is_finite() || markup <= 0.0 {
            return Err(anyhow!(
                "shop.default_markup must be a positive number, got {}",
                markup
            ));
        }
        Ok(())
    }

    /// Where the world database lives.
    pub fn db_path(&self) -> String {
        match &self.storage.db_path {
            Some(path) => path.clone(),
            None => Path::new(&self.storage.data_dir)
                .join("world")
                .to_string_lossy()
                .into_owned(),
        }
    }

    pub fn capacity_policy(&self) -> CapacityPolicy {
        CapacityPolicy {
            max_embedded_items: self.inventory.max_embedded_items,
        }
    }

    /// Configured log level, `info` when unrecognized.
    pub fn log_level(&self) -> log::LevelFilter {
        self.logging
            .level
            .parse()
            .unwrap_or(log::LevelFilter::Info)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                db_path: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("lootkeeper.log".to_string()),
            },
            inventory: InventoryConfig::default(),
            shop: ShopConfig::default(),
        }
    }
}
