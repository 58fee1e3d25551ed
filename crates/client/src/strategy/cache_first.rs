//! Cache-first, never expiring.

use swcache_core::{CacheKey, CacheName};

use super::{Resolution, StrategyContext, cache_then_network};
use crate::router::ResourceRequest;

/// Serves from the cache when present, otherwise fetches and stores.
///
/// Entries are keyed by URL and never revalidated, which suits static
/// assets such as fonts.
#[derive(Debug, Clone)]
pub struct CacheFirstStrategy {
    pub cache: CacheName,
}

impl CacheFirstStrategy {
    pub fn new(cache: CacheName) -> Self {
        Self { cache }
    }

    pub async fn resolve(&self, ctx: &StrategyContext<'_>, request: &ResourceRequest) -> Resolution {
        let key = CacheKey::new(&request.url, None);
        cache_then_network(ctx, self.cache, key.as_str(), request).await
    }
}
