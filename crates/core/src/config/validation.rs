//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values after they
//! have been loaded from the environment or defaults. Validation runs before
//! the listener binds; a failure here aborts startup.

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

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_tabs` is 0
    /// - `img_width` is outside [1000, 2500]
    /// - `img_quality` is outside [1, 100]
    /// - `persist_browser` is not a parsable duration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tabs < 1 {
            return Err(ConfigError::Invalid { field: "max_tabs".into(), reason: "must be at least 1".into() });
        }

        if self.img_width < 1000.0 || self.img_width > 2500.0 {
            return Err(ConfigError::Invalid {
                field: "img_width".into(),
                reason: "must be between 1000 and 2500".into(),
            });
        }

        if self.img_quality < 1 || self.img_quality > 100 {
            return Err(ConfigError::Invalid {
                field: "img_quality".into(),
                reason: "must be between 1 and 100".into(),
            });
        }

        if let Err(e) = humantime::parse_duration(&self.persist_browser) {
            return Err(ConfigError::Invalid { field: "persist_browser".into(), reason: e.to_string() });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_tabs_zero() {
        let config = AppConfig { max_tabs: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_tabs"));
    }

    #[test]
    fn test_validate_img_width_too_small() {
        let config = AppConfig { img_width: 999.0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "img_width"));
    }

    #[test]
    fn test_validate_img_width_too_large() {
        let config = AppConfig { img_width: 2501.0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "img_width"));
    }

    #[test]
    fn test_validate_img_quality_bounds() {
        let config = AppConfig { img_quality: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = AppConfig { img_quality: 101, ..Default::default() };
        assert!(config.validate().is_err());

        let config = AppConfig { img_quality: 1, ..Default::default() };
        assert!(config.validate().is_ok());

        let config = AppConfig { img_quality: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_persist_browser_unparsable() {
        let config = AppConfig { persist_browser: "whenever".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "persist_browser"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_tabs: 1, img_width: 1000.0, ..Default::default() };
        assert!(config.validate().is_ok());

        let config = AppConfig { img_width: 2500.0, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
