//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::cache::Generation;
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

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `app_id` is empty or `generation` is not a valid generation tag
    /// - `origin` is not an http(s) URL, or `scope` is not a `/`-delimited path
    /// - `manifest` is empty or a `network_first_paths` entry is not a regex
    /// - `timeout_ms` or `max_bytes` is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_id.is_empty() {
            return Err(invalid("app_id", "must not be empty"));
        }
        Generation::new(self.generation.clone()).map_err(|e| invalid("generation", e.to_string()))?;

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(origin) => return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme()))),
            Err(e) => return Err(invalid("origin", e.to_string())),
        }

        if !self.scope.starts_with('/') || !self.scope.ends_with('/') {
            return Err(invalid("scope", "must start and end with `/`"));
        }

        if self.manifest.is_empty() {
            return Err(invalid("manifest", "must list at least one asset"));
        }

        for pattern in &self.network_first_paths {
            regex::Regex::new(pattern).map_err(|e| invalid("network_first_paths", e.to_string()))?;
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 512 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 512MB"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !self.manifest.iter().any(|asset| asset == &self.offline_shell) {
            tracing::warn!(
                offline_shell = %self.offline_shell,
                "offline shell is not pre-cached by the manifest; offline navigations may fail"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<(), ConfigError>) -> String {
        match result {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("expected invalid config, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_default_config() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_app_id() {
        let config = AppConfig { app_id: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "app_id");
    }

    #[test]
    fn test_validate_generation_with_separator() {
        let config = AppConfig { generation: "v2-beta".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "generation");
    }

    #[test]
    fn test_validate_origin_scheme() {
        let config = AppConfig { origin: "file:///srv/www".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "origin");

        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "origin");
    }

    #[test]
    fn test_validate_scope_shape() {
        let config = AppConfig { scope: "/tour".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "scope");

        let config = AppConfig { scope: "/tour/".into(), ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_manifest() {
        let config = AppConfig { manifest: Vec::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "manifest");
    }

    #[test]
    fn test_validate_bad_regex() {
        let config = AppConfig { network_first_paths: vec!["(".into()], ..Default::default() };
        assert_eq!(field_of(config.validate()), "network_first_paths");
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert_eq!(field_of(config.validate()), "timeout_ms");

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert_eq!(field_of(config.validate()), "timeout_ms");

        let config = AppConfig { timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes_bounds() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()), "max_bytes");

        let config = AppConfig { max_bytes: 513 * 1024 * 1024, ..Default::default() };
        assert_eq!(field_of(config.validate()), "max_bytes");
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "user_agent");
    }
}
