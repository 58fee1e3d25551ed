//! cache_keys tool implementation.
//!
//! Lists the keys stored in one named cache.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, CacheName};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// The named cache to list.
    pub cache: CacheName,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub cache: CacheName,
    pub keys: Vec<String>,
}

pub async fn keys_impl(cache: &CacheDb, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let keys = cache.cache_keys(params.cache).await?;
    json_result(&CacheKeysOutput { cache: params.cache, keys })
}
