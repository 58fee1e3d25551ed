//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::message::FailureCategory;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the manifests are resolved against, e.g. `https://rules.example.com`.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite cache database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Precache manifest artifact (path → content hash).
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: PathBuf,

    /// Runtime manifest artifact (path → revision).
    #[serde(default = "default_runtime_manifest")]
    pub runtime_manifest: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum concurrent fetches during install and warm requests.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Entry bound of the external image cache.
    #[serde(default = "default_image_max_entries")]
    pub image_max_entries: usize,

    /// Age bound of the external image cache, in seconds.
    #[serde(default = "default_image_max_age_secs")]
    pub image_max_age_secs: u64,

    /// Cool-down between generic fetch-failure notifications, in seconds.
    #[serde(default = "default_cooldown_generic_secs")]
    pub cooldown_generic_secs: u64,

    /// Cool-down between data (json) fetch-failure notifications, in seconds.
    #[serde(default = "default_cooldown_json_secs")]
    pub cooldown_json_secs: u64,

    /// Cool-down between image fetch-failure notifications, in seconds.
    #[serde(default = "default_cooldown_image_secs")]
    pub cooldown_image_secs: u64,
}

fn default_origin() -> String {
    "http://localhost:5000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_precache_manifest() -> PathBuf {
    PathBuf::from("./precache-manifest.json")
}

fn default_runtime_manifest() -> PathBuf {
    PathBuf::from("./runtime-manifest.json")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_000_000 // 5MB, same limit the build step applies
}

fn default_fetch_concurrency() -> usize {
    4
}

fn default_image_max_entries() -> usize {
    100
}

fn default_image_max_age_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_cooldown_generic_secs() -> u64 {
    600
}

fn default_cooldown_json_secs() -> u64 {
    60
}

fn default_cooldown_image_secs() -> u64 {
    600
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            db_path: default_db_path(),
            precache_manifest: default_precache_manifest(),
            runtime_manifest: default_runtime_manifest(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            fetch_concurrency: default_fetch_concurrency(),
            image_max_entries: default_image_max_entries(),
            image_max_age_secs: default_image_max_age_secs(),
            cooldown_generic_secs: default_cooldown_generic_secs(),
            cooldown_json_secs: default_cooldown_json_secs(),
            cooldown_image_secs: default_cooldown_image_secs(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not a URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    pub fn image_max_age(&self) -> Duration {
        Duration::from_secs(self.image_max_age_secs)
    }

    /// Notification cool-down for a failure category.
    pub fn cooldown(&self, category: FailureCategory) -> Duration {
        let secs = match category {
            FailureCategory::Generic => self.cooldown_generic_secs,
            FailureCategory::Json => self.cooldown_json_secs,
            FailureCategory::Image => self.cooldown_image_secs,
        };
        Duration::from_secs(secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
