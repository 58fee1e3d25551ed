//! Resolution strategies.
//!
//! Each strategy turns an intercepted request into a [`Resolution`]. None of
//! them return errors: a request that cannot be satisfied from cache or
//! network degrades to an empty placeholder and a page notification.

mod cache_first;
mod network_first;
mod precache;
mod revisioned;

use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, CacheName, CachedEntry, Error, StoredResponse};

use crate::fetch::Fetcher;
use crate::notify::Notifier;
use crate::router::{Manifests, ResourceRequest};

pub use cache_first::CacheFirstStrategy;
pub use network_first::{Expiration, NetworkFirstStrategy};
pub use precache::PrecacheStrategy;
pub use revisioned::RevisionedCacheStrategy;

/// Everything a strategy may touch while resolving a request.
pub struct StrategyContext<'a> {
    pub db: &'a CacheDb,
    pub fetcher: &'a dyn Fetcher,
    pub notifier: &'a Notifier,
    pub manifests: &'a Manifests,
}

/// Where the returned response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    /// Served from a named cache without touching the network.
    Cache,
    /// Fetched over the network by a caching strategy.
    Network,
    /// Nothing was available; an empty placeholder was returned.
    Placeholder,
    /// No route matched; fetched over the network with no caching.
    Passthrough,
}

/// The response handed back to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub response: StoredResponse,
    pub source: ResolutionSource,
}

impl Resolution {
    pub fn cached(response: StoredResponse) -> Self {
        Self { response, source: ResolutionSource::Cache }
    }

    pub fn network(response: StoredResponse) -> Self {
        Self { response, source: ResolutionSource::Network }
    }

    pub fn passthrough(response: StoredResponse) -> Self {
        Self { response, source: ResolutionSource::Passthrough }
    }

    pub fn placeholder() -> Self {
        Self { response: StoredResponse::placeholder(), source: ResolutionSource::Placeholder }
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == ResolutionSource::Placeholder
    }
}

/// The strategy attached to a route.
#[derive(Debug, Clone)]
pub enum Strategy {
    Precache(PrecacheStrategy),
    RevisionedCache(RevisionedCacheStrategy),
    CacheFirst(CacheFirstStrategy),
    NetworkFirst(NetworkFirstStrategy),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Precache(_) => "precache",
            Strategy::RevisionedCache(_) => "revisioned-cache",
            Strategy::CacheFirst(_) => "cache-first",
            Strategy::NetworkFirst(_) => "network-first",
        }
    }

    /// The named cache this strategy reads and writes.
    pub fn cache_name(&self) -> CacheName {
        match self {
            Strategy::Precache(s) => s.cache,
            Strategy::RevisionedCache(s) => s.cache,
            Strategy::CacheFirst(s) => s.cache,
            Strategy::NetworkFirst(s) => s.cache,
        }
    }

    pub async fn resolve(&self, ctx: &StrategyContext<'_>, request: &ResourceRequest) -> Resolution {
        match self {
            Strategy::Precache(s) => s.resolve(ctx, request).await,
            Strategy::RevisionedCache(s) => s.resolve(ctx, request).await,
            Strategy::CacheFirst(s) => s.resolve(ctx, request).await,
            Strategy::NetworkFirst(s) => s.resolve(ctx, request).await,
        }
    }
}

/// Exact-key lookup. Storage errors count as a miss.
pub(crate) async fn lookup(ctx: &StrategyContext<'_>, cache: CacheName, key: &str) -> Option<CachedEntry> {
    match ctx.db.match_entry(cache, key).await {
        Ok(entry) => entry,
        Err(e) => {
            tracing::warn!(%cache, key, error = %e, "cache lookup failed, treating as miss");
            None
        }
    }
}

/// Write a response under `key`. Failures are logged and swallowed.
pub(crate) async fn store(
    ctx: &StrategyContext<'_>, cache: CacheName, key: &str, request: &ResourceRequest, response: &StoredResponse,
) -> bool {
    match ctx.db.put_entry(cache, key, request.url.as_str(), response).await {
        Ok(()) => {
            tracing::debug!(%cache, key, "stored response");
            true
        }
        Err(e) => {
            tracing::warn!(%cache, key, error = %e, "cache write failed, serving response uncached");
            false
        }
    }
}

/// Terminal failure: notify the page and degrade to a placeholder.
pub(crate) fn failed(ctx: &StrategyContext<'_>, request: &ResourceRequest, error: &Error) -> Resolution {
    tracing::debug!(url = %request.url, error = %error, "fetch failed");
    ctx.notifier.fetch_failed(&request.url);
    Resolution::placeholder()
}

/// Serve `key` from `cache`, otherwise fetch and store it.
///
/// Checking → (Served | Fetching → (Caching → Served | Failed)). There is
/// no retry: the next request starts over at Checking.
pub(crate) async fn cache_then_network(
    ctx: &StrategyContext<'_>, cache: CacheName, key: &str, request: &ResourceRequest,
) -> Resolution {
    if let Some(entry) = lookup(ctx, cache, key).await {
        tracing::debug!(%cache, key, "cache hit");
        return Resolution::cached(entry.response);
    }

    tracing::debug!(%cache, key, url = %request.url, "cache miss, fetching");
    match ctx.fetcher.fetch(&request.url).await {
        Ok(response) => {
            if response.is_success() {
                store(ctx, cache, key, request, &response).await;
            } else {
                tracing::debug!(status = response.status, url = %request.url, "not caching error status");
            }
            Resolution::network(response)
        }
        Err(e) => failed(ctx, request, &e),
    }
}
