//! Page-requested cache warming.

use futures_util::{StreamExt, stream};
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use swcache_core::Error;

use super::Reconciler;
use crate::router::ResourceRequest;
use crate::strategy::ResolutionSource;

/// Inbound request to cache every runtime-manifest resource matching any
/// of the patterns.
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct WarmRequest {
    /// Regular expressions matched against absolute resource URLs.
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct WarmReport {
    /// Runtime-manifest resources matching at least one pattern.
    pub matched: usize,
    /// Matched resources now available from cache.
    pub cached: usize,
    /// Matched resources that could not be fetched.
    pub failed: usize,
}

impl Reconciler {
    /// Resolve every matching runtime-manifest resource through the router.
    ///
    /// Resolution goes through [`Reconciler::handle`], so an offline warm
    /// notifies the page like any other failed request, under the same
    /// per-category cool-down. Fails only when a pattern does not compile.
    pub async fn warm(&self, request: &WarmRequest) -> Result<WarmReport, Error> {
        let patterns = RegexSet::new(&request.patterns)
            .map_err(|e| Error::InvalidInput(format!("invalid warm pattern: {e}")))?;

        let targets: Vec<ResourceRequest> = self
            .manifests
            .runtime
            .iter()
            .filter(|entry| patterns.is_match(entry.url.as_str()))
            .map(|entry| ResourceRequest::inferred(entry.url.clone()))
            .collect();

        let resolutions: Vec<_> = stream::iter(0..targets.len())
            .map(|i| self.handle(&targets[i]))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = WarmReport { matched: targets.len(), ..WarmReport::default() };
        for resolution in &resolutions {
            match resolution.source {
                ResolutionSource::Cache => report.cached += 1,
                ResolutionSource::Network if resolution.response.is_success() => report.cached += 1,
                _ => report.failed += 1,
            }
        }

        tracing::info!(matched = report.matched, cached = report.cached, failed = report.failed, "warm complete");
        Ok(report)
    }
}
