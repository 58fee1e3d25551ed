//! Serving build-essential files from the precache.

use swcache_core::{CacheKey, CacheName};

use super::{Resolution, StrategyContext, cache_then_network};
use crate::router::ResourceRequest;

/// Serves precache-manifest files under their content-hash key.
///
/// Install normally fills the precache; a file missing at request time
/// (install was offline, or the entry was evicted) is fetched and stored
/// on the spot.
#[derive(Debug, Clone)]
pub struct PrecacheStrategy {
    pub cache: CacheName,
}

impl Default for PrecacheStrategy {
    fn default() -> Self {
        Self { cache: CacheName::Precache }
    }
}

impl PrecacheStrategy {
    pub async fn resolve(&self, ctx: &StrategyContext<'_>, request: &ResourceRequest) -> Resolution {
        let key = CacheKey::new(&request.url, ctx.manifests.precache.revision(&request.url));
        cache_then_network(ctx, self.cache, key.as_str(), request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{Destination, Manifests};
    use crate::strategy::ResolutionSource;
    use crate::testing::{Harness, manifest, url};
    use swcache_core::StoredResponse;

    #[tokio::test]
    async fn test_precached_file_served_without_network() {
        let h = Harness::new(Manifests { precache: manifest(&[("index.html", "h1")]), ..Default::default() }).await;
        let key = CacheKey::new(&url("index.html"), Some("h1"));
        h.db.put_entry(
            CacheName::Precache,
            key.as_str(),
            url("index.html").as_str(),
            &StoredResponse::new(200, Vec::new(), "<html>"),
        )
        .await
        .unwrap();

        let request = ResourceRequest::new(url("index.html"), Destination::Document);
        let resolution = PrecacheStrategy::default().resolve(&h.ctx(), &request).await;

        assert_eq!(resolution.source, ResolutionSource::Cache);
        assert_eq!(h.fetcher.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_precache_entry_is_fetched() {
        let h = Harness::new(Manifests { precache: manifest(&[("js/app.js", "h2")]), ..Default::default() }).await;
        h.fetcher.respond(&url("js/app.js"), "console.log(1)");

        let request = ResourceRequest::new(url("js/app.js"), Destination::Script);
        let resolution = PrecacheStrategy::default().resolve(&h.ctx(), &request).await;

        assert_eq!(resolution.source, ResolutionSource::Network);
        let key = CacheKey::new(&url("js/app.js"), Some("h2"));
        assert!(h.db.match_entry(CacheName::Precache, key.as_str()).await.unwrap().is_some());
    }
}
