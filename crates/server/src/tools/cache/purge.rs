//! cache_purge tool implementation.
//!
//! Purges entries of one named cache by age, by count, or entirely.

use chrono::{Duration, Utc};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, CacheName, Error};

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// The named cache to purge.
    pub cache: CacheName,

    /// Purge entries stored more than this many days ago.
    pub older_than_days: Option<i64>,

    /// Keep only the N most recently used entries.
    pub max_entries: Option<usize>,

    /// Delete every entry in the cache.
    #[serde(default)]
    pub clear: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(cache: &CacheDb, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.older_than_days.is_none() && params.max_entries.is_none() && !params.clear {
        return Err(Error::InvalidInput(
            "At least one of older_than_days, max_entries, or clear must be specified".to_string(),
        )
        .into());
    }

    let mut deleted_total = 0u64;

    if params.clear {
        deleted_total += cache.clear_cache(params.cache).await?;
    }

    if let Some(days) = params.older_than_days {
        if days < 0 {
            return Err(Error::InvalidInput("older_than_days must not be negative".to_string()).into());
        }
        let age = Duration::try_days(days)
            .ok_or_else(|| Error::InvalidInput(format!("older_than_days out of range: {days}")))?;
        let cutoff = Utc::now()
            .checked_sub_signed(age)
            .ok_or_else(|| Error::InvalidInput(format!("older_than_days out of range: {days}")))?;
        deleted_total += cache.purge_older_than(params.cache, cutoff).await?;
    }

    if let Some(max_entries) = params.max_entries {
        deleted_total += cache.purge_lru(params.cache, max_entries).await?;
    }

    json_result(&CachePurgeOutput { deleted: deleted_total })
}
