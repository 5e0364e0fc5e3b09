//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHOPFRONT_*)
//! 2. TOML config file (if SHOPFRONT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

use crate::query::PageLimits;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHOPFRONT_*)
/// 2. TOML config file (if SHOPFRONT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding catalog collections and the read cache.
    ///
    /// Set via SHOPFRONT_DB_PATH environment variable. `:memory:` opens a
    /// throwaway in-memory database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Revalidation window for cached reads, in seconds.
    ///
    /// Set via SHOPFRONT_REVALIDATE_SECS environment variable.
    #[serde(default = "default_revalidate_secs")]
    pub revalidate_secs: u64,

    /// Page size used when `per_page` is absent or unusable.
    ///
    /// Set via SHOPFRONT_DEFAULT_PAGE_SIZE environment variable.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    /// Upper bound for `per_page`; larger requests are clamped.
    ///
    /// Set via SHOPFRONT_MAX_PAGE_SIZE environment variable.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,

    /// Number of related products returned for a product.
    ///
    /// Set via SHOPFRONT_RELATED_LIMIT environment variable.
    #[serde(default = "default_related_limit")]
    pub related_limit: u64,

    /// Maximum number of products returned by a name search.
    ///
    /// Set via SHOPFRONT_SEARCH_LIMIT environment variable.
    #[serde(default = "default_search_limit")]
    pub search_limit: u64,

    /// Optional JSON file with categories, subcategories and products
    /// loaded into the store on startup.
    ///
    /// Set via SHOPFRONT_SEED_FILE environment variable.
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shopfront.sqlite")
}

fn default_revalidate_secs() -> u64 {
    3600
}

fn default_page_size() -> u64 {
    10
}

fn default_max_page_size() -> u64 {
    100
}

fn default_related_limit() -> u64 {
    4
}

fn default_search_limit() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            revalidate_secs: default_revalidate_secs(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            related_limit: default_related_limit(),
            search_limit: default_search_limit(),
            seed_file: None,
        }
    }
}

impl AppConfig {
    /// Revalidation window as Duration.
    pub fn revalidate(&self) -> Duration {
        Duration::from_secs(self.revalidate_secs)
    }

    /// Pagination bounds handed to the search-parameter validator.
    pub fn page_limits(&self) -> PageLimits {
        PageLimits { default_per_page: self.default_page_size, max_per_page: self.max_page_size }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHOPFRONT_`
    /// 2. TOML file from `SHOPFRONT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHOPFRONT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHOPFRONT_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Whether the configured database lives in memory only.
    pub fn is_in_memory(&self) -> bool {
        self.db_path.as_os_str() == ":memory:"
    }
}
