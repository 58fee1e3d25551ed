//! Activate phase: garbage-collect entries the manifests no longer reference.
//!
//! Keys embed the manifest revision, so a revision bump leaves the old entry
//! unreachable rather than overwritten. The sweep below is what reclaims it.

use std::collections::HashSet;

use chrono::Utc;
use futures_util::future::join_all;
use serde::Serialize;
use swcache_core::{CacheDb, CacheName, Error};

use super::{Phase, Reconciler};
use crate::strategy::Strategy;

/// Outcome of sweeping one named cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct SweepReport {
    pub cache: CacheName,
    pub retained: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl SweepReport {
    fn empty(cache: CacheName) -> Self {
        Self { cache, retained: 0, deleted: 0, failed: 0 }
    }
}

/// Outcome of activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct ActivationReport {
    pub runtime: SweepReport,
    pub precache: SweepReport,
    /// Image entries dropped for exceeding their max age.
    pub images_expired: u64,
}

/// Delete every key in `cache` that is not in `valid`.
///
/// Deletions run concurrently and are independent: one failure is counted
/// and does not stop the rest. Only listing the keys can fail the sweep.
pub async fn sweep(db: &CacheDb, cache: CacheName, valid: &HashSet<String>) -> Result<SweepReport, Error> {
    let keys = db.cache_keys(cache).await?;
    let (retained, stale): (Vec<String>, Vec<String>) = keys.into_iter().partition(|key| valid.contains(key));

    let results = join_all(stale.iter().map(|key| async move {
        let result = db.delete_entry(cache, key).await;
        if let Err(e) = &result {
            tracing::warn!(%cache, key, error = %e, "failed to delete stale entry");
        }
        result
    }))
    .await;

    let failed = results.iter().filter(|r| r.is_err()).count();
    let report = SweepReport { cache, retained: retained.len(), deleted: results.len() - failed, failed };
    tracing::info!(
        %cache,
        retained = report.retained,
        deleted = report.deleted,
        failed = report.failed,
        "sweep complete"
    );
    Ok(report)
}

impl Reconciler {
    /// Sweep the revisioned caches, expire old images, then take control.
    pub async fn activate(&self) -> ActivationReport {
        let runtime = self
            .sweep_or_log(CacheName::RuntimeRevision, &self.manifests.runtime.cache_keys())
            .await;
        let precache = self
            .sweep_or_log(CacheName::Precache, &self.manifests.precache.cache_keys())
            .await;
        let images_expired = self.expire_fallback_caches().await;

        self.set_phase(Phase::Activated);
        tracing::info!(
            runtime_deleted = runtime.deleted,
            precache_deleted = precache.deleted,
            images_expired,
            "activated, now controlling pages"
        );
        ActivationReport { runtime, precache, images_expired }
    }

    async fn sweep_or_log(&self, cache: CacheName, valid: &HashSet<String>) -> SweepReport {
        match sweep(&self.db, cache, valid).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(%cache, error = %e, "sweep failed, stale entries kept");
                SweepReport::empty(cache)
            }
        }
    }

    /// Age purge for every network-first route.
    async fn expire_fallback_caches(&self) -> u64 {
        let now = Utc::now();
        let mut expired = 0;
        for route in self.router.routes() {
            let Strategy::NetworkFirst(strategy) = &route.strategy else {
                continue;
            };
            match self.db.purge_older_than(strategy.cache, strategy.expiration.cutoff(now)).await {
                Ok(n) => expired += n,
                Err(e) => tracing::warn!(cache = %strategy.cache, error = %e, "expiration purge failed"),
            }
        }
        expired
    }
}
