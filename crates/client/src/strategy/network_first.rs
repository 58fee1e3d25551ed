//! Network-first with a bounded fallback cache.

use std::time::Duration;

use chrono::{DateTime, Utc};
use swcache_core::{CacheKey, CacheName};

use super::{Resolution, StrategyContext, failed, lookup, store};
use crate::router::ResourceRequest;

/// Size and age bounds of a fallback cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiration {
    pub max_entries: usize,
    pub max_age: Duration,
}

impl Expiration {
    pub fn new(max_entries: usize, max_age: Duration) -> Self {
        Self { max_entries, max_age }
    }

    /// Entries stored before this instant are expired.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let secs = i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX);
        chrono::Duration::try_seconds(secs)
            .and_then(|max_age| now.checked_sub_signed(max_age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn is_expired(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        stored_at < self.cutoff(now)
    }
}

/// Always tries the network; falls back to the most recent cached copy.
#[derive(Debug, Clone)]
pub struct NetworkFirstStrategy {
    pub cache: CacheName,
    pub expiration: Expiration,
}

impl NetworkFirstStrategy {
    pub fn new(cache: CacheName, expiration: Expiration) -> Self {
        Self { cache, expiration }
    }

    pub async fn resolve(&self, ctx: &StrategyContext<'_>, request: &ResourceRequest) -> Resolution {
        let key = CacheKey::new(&request.url, None);

        let error = match ctx.fetcher.fetch(&request.url).await {
            Ok(response) => {
                if response.is_success() && store(ctx, self.cache, key.as_str(), request, &response).await {
                    self.enforce_bounds(ctx).await;
                }
                return Resolution::network(response);
            }
            Err(e) => e,
        };

        if let Some(entry) = lookup(ctx, self.cache, key.as_str()).await {
            if self.expiration.is_expired(entry.stored_at, Utc::now()) {
                tracing::debug!(url = %request.url, "cached fallback expired");
            } else {
                if let Err(e) = ctx.db.touch_entry(self.cache, key.as_str()).await {
                    tracing::warn!(cache = %self.cache, error = %e, "failed to refresh access time");
                }
                tracing::debug!(url = %request.url, "network failed, serving cached copy");
                return Resolution::cached(entry.response);
            }
        }

        failed(ctx, request, &error)
    }

    /// Drop expired entries, then evict down to `max_entries`.
    async fn enforce_bounds(&self, ctx: &StrategyContext<'_>) {
        let cutoff = self.expiration.cutoff(Utc::now());
        match ctx.db.purge_older_than(self.cache, cutoff).await {
            Ok(0) => {}
            Ok(n) => tracing::debug!(cache = %self.cache, expired = n, "purged expired entries"),
            Err(e) => tracing::warn!(cache = %self.cache, error = %e, "expiration purge failed"),
        }

        match ctx.db.purge_lru(self.cache, self.expiration.max_entries).await {
            Ok(0) => {}
            Ok(n) => tracing::debug!(cache = %self.cache, evicted = n, "evicted least recently used entries"),
            Err(e) => tracing::warn!(cache = %self.cache, error = %e, "eviction failed"),
        }
    }
}
