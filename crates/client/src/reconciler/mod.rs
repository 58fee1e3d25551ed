//! The cache reconciler.
//!
//! A [`Reconciler`] owns everything a worker version needs: the cache
//! database, the network, the manifests it shipped with and the route table.
//! It moves through three phases. `install` warms the precache, `activate`
//! sweeps entries the current manifests no longer reference, and from then
//! on `handle` answers intercepted requests.

mod activate;
mod install;
mod warm;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use swcache_core::{AppConfig, CacheDb, Error, StoredResponse};

use crate::fetch::Fetcher;
use crate::notify::{Cooldown, MessageSink, Notifier};
use crate::router::{Manifests, ResourceRequest, Router};
use crate::strategy::{Expiration, Resolution, StrategyContext};

pub use activate::{ActivationReport, SweepReport, sweep};
pub use install::InstallReport;
pub use warm::{WarmReport, WarmRequest};

/// Lifecycle phase of a worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Installing,
    Installed,
    Activated,
}

pub struct Reconciler {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    notifier: Notifier,
    manifests: Manifests,
    router: Router,
    phase: Mutex<Phase>,
    skip_waiting: AtomicBool,
    concurrency: usize,
}

/// Fetches in flight at once during install and warm unless configured.
pub const DEFAULT_CONCURRENCY: usize = 4;

impl Reconciler {
    pub fn new(db: CacheDb, fetcher: Arc<dyn Fetcher>, notifier: Notifier, manifests: Manifests, router: Router) -> Self {
        Self {
            db,
            fetcher,
            notifier,
            manifests,
            router,
            phase: Mutex::new(Phase::Installing),
            skip_waiting: AtomicBool::new(false),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Bound the fetches install and warm keep in flight. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Build a reconciler with the default route table and the configured
    /// cool-downs, image cache bounds and fetch concurrency.
    pub fn from_config(
        config: &AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>, sink: Arc<dyn MessageSink>, manifests: Manifests,
    ) -> Self {
        let notifier = Notifier::new(Cooldown::from_config(config), sink);
        let expiration = Expiration::new(config.image_max_entries, config.image_max_age());
        Self::new(db, fetcher, notifier, manifests, Router::with_default_routes(expiration))
            .with_concurrency(config.fetch_concurrency)
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn manifests(&self) -> &Manifests {
        &self.manifests
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    /// Whether this version controls pages.
    pub fn is_controlling(&self) -> bool {
        self.phase() == Phase::Activated
    }

    /// Whether install asked to replace the previous version immediately.
    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    fn context(&self) -> StrategyContext<'_> {
        StrategyContext {
            db: &self.db,
            fetcher: self.fetcher.as_ref(),
            notifier: &self.notifier,
            manifests: &self.manifests,
        }
    }

    /// Answer an intercepted request.
    ///
    /// Never fails: the first matching route resolves the request, and an
    /// unmatched request goes to the network untouched.
    pub async fn handle(&self, request: &ResourceRequest) -> Resolution {
        match self.router.matches(request, &self.manifests) {
            Some(route) => {
                tracing::debug!(
                    route = %route.name,
                    strategy = route.strategy.name(),
                    url = %request.url,
                    "route matched"
                );
                route.strategy.resolve(&self.context(), request).await
            }
            None => self.passthrough(request).await,
        }
    }

    async fn passthrough(&self, request: &ResourceRequest) -> Resolution {
        tracing::debug!(url = %request.url, destination = %request.destination, "no route, passing through");
        match self.fetcher.fetch(&request.url).await {
            Ok(response) => Resolution::passthrough(response),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "pass-through fetch failed");
                Resolution::placeholder()
            }
        }
    }

    /// Fetch a response for storage, treating error statuses as failures.
    pub(crate) async fn fetch_cacheable(&self, request: &ResourceRequest) -> Result<StoredResponse, Error> {
        let response = self.fetcher.fetch(&request.url).await?;
        if !response.is_success() {
            return Err(Error::HttpError(format!("status {} for {}", response.status, request.url)));
        }
        Ok(response)
    }
}
