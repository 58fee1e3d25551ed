//! Cache-first over revisioned keys for runtime-manifest resources.

use swcache_core::{CacheKey, CacheName};

use super::{Resolution, StrategyContext, cache_then_network};
use crate::router::ResourceRequest;

/// Serves runtime-manifest resources from the cache entry matching their
/// current revision, fetching and storing them on first use.
///
/// The lookup is by revisioned key, not URL: once the manifest pins a new
/// revision, entries stored under the old one are unreachable and get
/// fetched again under the new key.
#[derive(Debug, Clone)]
pub struct RevisionedCacheStrategy {
    pub cache: CacheName,
}

impl Default for RevisionedCacheStrategy {
    fn default() -> Self {
        Self { cache: CacheName::RuntimeRevision }
    }
}

impl RevisionedCacheStrategy {
    pub async fn resolve(&self, ctx: &StrategyContext<'_>, request: &ResourceRequest) -> Resolution {
        let revision = ctx.manifests.runtime.revision(&request.url);
        let key = CacheKey::new(&request.url, revision);
        tracing::debug!(url = %request.url, %key, "resolving revisioned resource");
        cache_then_network(ctx, self.cache, key.as_str(), request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{Destination, Manifests};
    use crate::strategy::ResolutionSource;
    use crate::testing::{Harness, manifest, url};
    use swcache_core::{FailureCategory, PageMessage, StoredResponse};

    fn runtime(rev: &str) -> Manifests {
        Manifests { runtime: manifest(&[("data/a.json", rev)]), ..Default::default() }
    }

    fn request() -> ResourceRequest {
        ResourceRequest::new(url("data/a.json"), Destination::Fetch)
    }

    #[tokio::test]
    async fn test_miss_fetches_and_stores_under_revision_key() {
        let h = Harness::new(runtime("rev1")).await;
        h.fetcher.respond(&url("data/a.json"), r#"{"rules":[]}"#);

        let resolution = RevisionedCacheStrategy::default().resolve(&h.ctx(), &request()).await;

        assert_eq!(resolution.source, ResolutionSource::Network);
        assert_eq!(h.fetcher.fetch_count(), 1);

        let key = CacheKey::new(&url("data/a.json"), Some("rev1"));
        let entry = h.db.match_entry(CacheName::RuntimeRevision, key.as_str()).await.unwrap().unwrap();
        assert_eq!(entry.response.status, resolution.response.status);
        assert_eq!(entry.response.body, resolution.response.body);
    }

    #[tokio::test]
    async fn test_hit_does_not_touch_network() {
        let h = Harness::new(runtime("rev1")).await;
        h.fetcher.respond(&url("data/a.json"), r#"{"rules":[]}"#);
        let strategy = RevisionedCacheStrategy::default();

        let first = strategy.resolve(&h.ctx(), &request()).await;
        let second = strategy.resolve(&h.ctx(), &request()).await;

        assert_eq!(h.fetcher.fetch_count(), 1);
        assert_eq!(second.source, ResolutionSource::Cache);
        assert_eq!(second.response, first.response);
    }

    #[tokio::test]
    async fn test_stale_revision_is_unreachable() {
        let h = Harness::new(runtime("rev2")).await;
        let stale = CacheKey::new(&url("data/a.json"), Some("rev1"));
        h.db.put_entry(
            CacheName::RuntimeRevision,
            stale.as_str(),
            url("data/a.json").as_str(),
            &StoredResponse::new(200, Vec::new(), "old"),
        )
        .await
        .unwrap();
        h.fetcher.respond(&url("data/a.json"), "new");

        let resolution = RevisionedCacheStrategy::default().resolve(&h.ctx(), &request()).await;

        assert_eq!(resolution.source, ResolutionSource::Network);
        assert_eq!(&resolution.response.body[..], b"new");
        assert_eq!(h.fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_offline_miss_notifies_and_returns_placeholder() {
        let mut h = Harness::new(runtime("rev1")).await;
        h.fetcher.set_offline(true);

        let resolution = RevisionedCacheStrategy::default().resolve(&h.ctx(), &request()).await;

        assert!(resolution.is_placeholder());
        assert!(resolution.response.body.is_empty());
        assert_eq!(h.drain_messages(), vec![PageMessage::FetchError(FailureCategory::Json)]);
        assert_eq!(h.db.count_entries(CacheName::RuntimeRevision).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offline_hit_still_served() {
        let mut h = Harness::new(runtime("rev1")).await;
        h.fetcher.respond(&url("data/a.json"), "cached");
        let strategy = RevisionedCacheStrategy::default();
        strategy.resolve(&h.ctx(), &request()).await;

        h.fetcher.set_offline(true);
        let resolution = strategy.resolve(&h.ctx(), &request()).await;

        assert_eq!(resolution.source, ResolutionSource::Cache);
        assert!(h.drain_messages().is_empty());
    }

    #[tokio::test]
    async fn test_error_status_not_cached() {
        let h = Harness::new(runtime("rev1")).await;
        h.fetcher.respond_with(&url("data/a.json"), StoredResponse::new(500, Vec::new(), "boom"));

        let resolution = RevisionedCacheStrategy::default().resolve(&h.ctx(), &request()).await;

        assert_eq!(resolution.response.status, 500);
        assert_eq!(h.db.count_entries(CacheName::RuntimeRevision).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_serves_network_response() {
        let mut h = Harness::new(runtime("rev1")).await;
        h.fetcher.respond(&url("data/a.json"), r#"{"rules":[1]}"#);
        h.db.fail_inserts().await.unwrap();

        let resolution = RevisionedCacheStrategy::default().resolve(&h.ctx(), &request()).await;

        assert_eq!(resolution.source, ResolutionSource::Network);
        assert_eq!(resolution.response.status, 200);
        assert_eq!(&resolution.response.body[..], br#"{"rules":[1]}"#);
        assert_eq!(h.db.count_entries(CacheName::RuntimeRevision).await.unwrap(), 0);
        assert!(h.drain_messages().is_empty());
    }
}
