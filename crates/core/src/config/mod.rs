//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (GLASSBOAT_*)
//! 2. TOML config file (if GLASSBOAT_CONFIG_FILE set)
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

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (GLASSBOAT_*)
/// 2. TOML config file (if GLASSBOAT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prefix of every cache name this app owns.
    ///
    /// Set via GLASSBOAT_APP_ID environment variable.
    #[serde(default = "default_app_id")]
    pub app_id: String,

    /// Version tag of the deploy being served. Must change on every deploy.
    ///
    /// Set via GLASSBOAT_GENERATION environment variable.
    #[serde(default = "default_generation")]
    pub generation: String,

    /// Origin the app is served from.
    ///
    /// Set via GLASSBOAT_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path prefix the worker is registered for.
    ///
    /// Set via GLASSBOAT_SCOPE environment variable.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Assets pre-cached at install time, relative to the scope.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Document served to navigations when both network and cache miss.
    ///
    /// Set via GLASSBOAT_OFFLINE_SHELL environment variable.
    #[serde(default = "default_offline_shell")]
    pub offline_shell: String,

    /// Drop the query string when building cache keys.
    ///
    /// Set via GLASSBOAT_IGNORE_SEARCH environment variable.
    #[serde(default)]
    pub ignore_search: bool,

    /// Path regexes routed network-first in addition to documents and scripts.
    #[serde(default = "default_network_first_paths")]
    pub network_first_paths: Vec<String>,

    /// Activate a freshly installed generation without waiting for old pages to close.
    ///
    /// Set via GLASSBOAT_SKIP_WAITING environment variable.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Path to SQLite cache database.
    ///
    /// Set via GLASSBOAT_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via GLASSBOAT_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via GLASSBOAT_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes accepted per response. Audio guides are the largest assets.
    ///
    /// Set via GLASSBOAT_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_app_id() -> String {
    "islai".into()
}

fn default_generation() -> String {
    "v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_scope() -> String {
    "/".into()
}

fn default_manifest() -> Vec<String> {
    [
        "./",
        "./index.html",
        "./guide.html",
        "./about.html",
        "./settings.html",
        "./style.css",
        "./app.js",
        "./splash-lottie.css",
        "./splash-lottie.js",
        "./ISLAI_logo_main.PNG",
        "./manifest.json",
        "./icon-192.PNG",
        "./icon-512.PNG",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_offline_shell() -> String {
    "./index.html".into()
}

fn default_network_first_paths() -> Vec<String> {
    vec![r"/locales/[^/]+\.json$".into()]
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./glassboat-cache.sqlite")
}

fn default_user_agent() -> String {
    "glassboat/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            generation: default_generation(),
            origin: default_origin(),
            scope: default_scope(),
            manifest: default_manifest(),
            offline_shell: default_offline_shell(),
            ignore_search: false,
            network_first_paths: default_network_first_paths(),
            skip_waiting: true,
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed, or
    /// if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// The layered provider stack, exposed so callers can merge overrides.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("GLASSBOAT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("GLASSBOAT_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    /// Extract and validate a config from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Same configuration, pointed at a different deploy.
    pub fn with_generation(&self, generation: impl Into<String>) -> Self {
        Self { generation: generation.into(), ..self.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.app_id, "islai");
        assert_eq!(config.generation, "v1");
        assert_eq!(config.scope, "/");
        assert_eq!(config.offline_shell, "./index.html");
        assert!(config.manifest.contains(&"./index.html".to_string()));
        assert!(config.skip_waiting);
        assert!(!config.ignore_search);
        assert_eq!(config.db_path, PathBuf::from("./glassboat-cache.sqlite"));
        assert_eq!(config.user_agent, "glassboat/0.1");
    }

    #[test]
    fn test_default_manifest_covers_splash_assets() {
        let manifest = AppConfig::default().manifest;
        assert_eq!(manifest.len(), 13);
        for asset in ["./splash-lottie.css", "./splash-lottie.js", "./ISLAI_logo_main.PNG", "./icon-512.PNG"] {
            assert!(manifest.iter().any(|entry| entry == asset), "{asset} missing");
        }
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_with_generation() {
        let config = AppConfig::default().with_generation("v10");
        assert_eq!(config.generation, "v10");
        assert_eq!(config.app_id, "islai");
    }

    #[test]
    fn test_load_layers_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "glassboat.toml",
                r#"
                generation = "v9"
                manifest = ["./index.html", "./app.js", "./style.css"]
                "#,
            )?;
            jail.set_env("GLASSBOAT_CONFIG_FILE", "glassboat.toml");
            jail.set_env("GLASSBOAT_SKIP_WAITING", "false");

            let config = AppConfig::load().expect("config loads");
            assert_eq!(config.generation, "v9");
            assert_eq!(config.manifest.len(), 3);
            assert!(!config.skip_waiting);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_generation() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("GLASSBOAT_GENERATION", "v9-rc1");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { .. })));
            Ok(())
        });
    }
}
