//! Install phase: warm the precache.

use std::sync::atomic::Ordering;

use futures_util::{StreamExt, stream};
use serde::Serialize;
use swcache_core::{CacheName, Manifest};

use super::{Phase, Reconciler};
use crate::router::ResourceRequest;

/// Outcome of warming the precache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct InstallReport {
    /// Entries fetched and stored during this install.
    pub precached: usize,
    /// Entries already stored under their current key.
    pub already_cached: usize,
    /// Entries that could not be fetched or stored.
    pub failed: usize,
}

enum Outcome {
    Stored,
    Present,
    Failed,
}

impl Reconciler {
    /// Request immediate takeover, then fetch every precache entry that is
    /// not yet stored under its current key.
    ///
    /// Best-effort: failures are counted and logged, never propagated.
    pub async fn install(&self) -> InstallReport {
        self.skip_waiting.store(true, Ordering::SeqCst);
        self.set_phase(Phase::Installing);

        let precache: &Manifest = &self.manifests.precache;
        let outcomes: Vec<Outcome> = stream::iter(precache.iter())
            .map(|entry| async move {
                let key = entry.cache_key();
                match self.db.match_entry(CacheName::Precache, key.as_str()).await {
                    Ok(Some(_)) => return Outcome::Present,
                    Ok(None) => {}
                    Err(e) => tracing::warn!(key = %key, error = %e, "precache lookup failed, refetching"),
                }

                let request = ResourceRequest::inferred(entry.url.clone());
                let response = match self.fetch_cacheable(&request).await {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::warn!(url = %entry.url, error = %e, "precache fetch failed");
                        return Outcome::Failed;
                    }
                };

                match self.db.put_entry(CacheName::Precache, key.as_str(), entry.url.as_str(), &response).await {
                    Ok(()) => Outcome::Stored,
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "precache write failed");
                        Outcome::Failed
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = InstallReport::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Stored => report.precached += 1,
                Outcome::Present => report.already_cached += 1,
                Outcome::Failed => report.failed += 1,
            }
        }

        self.set_phase(Phase::Installed);
        tracing::info!(
            precached = report.precached,
            already_cached = report.already_cached,
            failed = report.failed,
            "install complete"
        );
        report
    }
}
