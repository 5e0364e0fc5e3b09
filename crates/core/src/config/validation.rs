//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `db_path` is empty
    /// - `revalidate_secs` is 0 or exceeds one week
    /// - `max_page_size` is 0 or exceeds 1000
    /// - `default_page_size` is 0 or exceeds `max_page_size`
    /// - `related_limit` is outside 1..=50 or `search_limit` outside 1..=100
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(invalid("db_path", "must not be empty"));
        }

        if self.revalidate_secs == 0 {
            return Err(invalid("revalidate_secs", "must be greater than 0"));
        }
        if self.revalidate_secs > 604_800 {
            return Err(invalid("revalidate_secs", "must not exceed one week (604800s)"));
        }

        if self.max_page_size == 0 || self.max_page_size > 1000 {
            return Err(invalid("max_page_size", "must be between 1 and 1000"));
        }
        if self.default_page_size == 0 {
            return Err(invalid("default_page_size", "must be greater than 0"));
        }
        if self.default_page_size > self.max_page_size {
            return Err(invalid("default_page_size", "must not exceed max_page_size"));
        }

        if self.related_limit == 0 || self.related_limit > 50 {
            return Err(invalid("related_limit", "must be between 1 and 50"));
        }
        if self.search_limit == 0 || self.search_limit > 100 {
            return Err(invalid("search_limit", "must be between 1 and 100"));
        }

        if let Some(seed) = &self.seed_file
            && seed.as_os_str().is_empty()
        {
            tracing::warn!("seed_file is set but empty; seeding will be skipped");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_db_path() {
        let config = AppConfig { db_path: PathBuf::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "db_path"));
    }

    #[test]
    fn test_validate_revalidate_zero() {
        let config = AppConfig { revalidate_secs: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "revalidate_secs"));
    }

    #[test]
    fn test_validate_revalidate_exceeds_limit() {
        let config = AppConfig { revalidate_secs: 604_801, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "revalidate_secs"));
    }

    #[test]
    fn test_validate_default_page_size_above_max() {
        let config = AppConfig { default_page_size: 30, max_page_size: 20, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "default_page_size"));
    }

    #[test]
    fn test_validate_max_page_size_bounds() {
        let config = AppConfig { max_page_size: 1001, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_page_size"));
    }

    #[test]
    fn test_validate_limits() {
        let config = AppConfig { related_limit: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "related_limit"));

        let config = AppConfig { search_limit: 101, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "search_limit"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig {
            revalidate_secs: 1,
            default_page_size: 1,
            max_page_size: 1,
            related_limit: 1,
            search_limit: 1,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_values() {
        let config = AppConfig {
            revalidate_secs: 604_800,
            default_page_size: 1000,
            max_page_size: 1000,
            related_limit: 50,
            search_limit: 100,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
