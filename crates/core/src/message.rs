//! Messages exchanged with the page.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static IMAGE_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(?:png|gif|webm|jpg|webp|jpeg|svg)$").expect("valid image regex"));

static JSON_EXTENSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.json$").expect("valid json regex"));

/// What kind of resource failed to load, as reported to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FailureCategory {
    Generic,
    Json,
    Image,
}

impl FailureCategory {
    pub const ALL: [FailureCategory; 3] = [FailureCategory::Generic, FailureCategory::Json, FailureCategory::Image];

    /// Classify a resource by the extension of its path.
    ///
    /// Query string and fragment are ignored.
    pub fn classify(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if IMAGE_EXTENSION.is_match(path) {
            FailureCategory::Image
        } else if JSON_EXTENSION.is_match(path) {
            FailureCategory::Json
        } else {
            FailureCategory::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::Generic => "generic",
            FailureCategory::Json => "json",
            FailureCategory::Image => "image",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound message from the reconciler to the page.
///
/// Serialized as `{"type": "FETCH_ERROR", "payload": "json"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageMessage {
    FetchError(FailureCategory),
}
