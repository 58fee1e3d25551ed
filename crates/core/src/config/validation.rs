//! Configuration validation rules.
//!
//! Validation logic for `AppConfig` values after they have been loaded
//! from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

const MAX_IMAGE_ENTRIES: usize = 1_000_000;
const MAX_FETCH_CONCURRENCY: usize = 16;

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
    /// - `origin` is not an absolute http(s) URL without a path
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `image_max_entries` or `image_max_age_secs` is 0
    /// - `image_max_entries` exceeds 1,000,000
    /// - `fetch_concurrency` is 0 or exceeds 16
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid { field: "origin".into(), reason: "must use http or https".into() });
        }
        if origin.path() != "/" || origin.query().is_some() {
            return Err(ConfigError::Invalid {
                field: "origin".into(),
                reason: "must not carry a path or query".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.fetch_concurrency == 0 || self.fetch_concurrency > MAX_FETCH_CONCURRENCY {
            return Err(ConfigError::Invalid {
                field: "fetch_concurrency".into(),
                reason: format!("must be between 1 and {MAX_FETCH_CONCURRENCY}"),
            });
        }

        if self.image_max_entries == 0 {
            return Err(ConfigError::Invalid {
                field: "image_max_entries".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.image_max_entries > MAX_IMAGE_ENTRIES {
            return Err(ConfigError::Invalid {
                field: "image_max_entries".into(),
                reason: format!("must not exceed {MAX_IMAGE_ENTRIES}"),
            });
        }
        if self.image_max_age_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "image_max_age_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.cooldown_json_secs > self.cooldown_image_secs {
            tracing::warn!(
                json = self.cooldown_json_secs,
                image = self.cooldown_image_secs,
                "data failures are throttled longer than image failures"
            );
        }

        Ok(())
    }
}
