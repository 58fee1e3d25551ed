//! Test doubles shared by the reconciler and strategy tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use swcache_core::{AppConfig, CacheDb, Error, Manifest, ManifestEntry, PageMessage, StoredResponse};
use tokio::sync::mpsc;
use url::Url;

use crate::fetch::Fetcher;
use crate::notify::{ChannelSink, Cooldown, Notifier};
use crate::reconciler::Reconciler;
use crate::router::{Manifests, Router};
use crate::strategy::{Expiration, StrategyContext};

pub(crate) const ORIGIN: &str = "https://rules.example.com";

pub(crate) fn origin() -> Url {
    Url::parse(ORIGIN).unwrap()
}

pub(crate) fn url(path: &str) -> Url {
    origin().join(path).unwrap()
}

pub(crate) fn manifest(entries: &[(&str, &str)]) -> Manifest {
    Manifest::from_entries(&origin(), entries.iter().map(|(path, rev)| ManifestEntry::new(*path, *rev)))
}

/// Fetcher answering from a fixed table and counting every request.
///
/// Each fetch yields once while in flight so concurrent callers overlap.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    responses: Mutex<HashMap<String, StoredResponse>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, url: &Url, body: &str) {
        self.respond_with(url, StoredResponse::new(200, Vec::new(), body.to_string()));
    }

    pub(crate) fn respond_with(&self, url: &Url, response: StoredResponse) {
        self.responses.lock().unwrap().insert(url.to_string(), response);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn fetch_count_for(&self, url: &Url) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url.as_str()).count()
    }

    /// Most fetches observed in flight at the same time.
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &Url) -> Result<StoredResponse, Error> {
        self.calls.lock().unwrap().push(url.to_string());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {url}")));
        }
        let response = self.responses.lock().unwrap().get(url.as_str()).cloned();
        Ok(response.unwrap_or_else(|| StoredResponse::new(404, Vec::new(), "not found")))
    }
}

pub(crate) fn notifier() -> (Notifier, mpsc::UnboundedReceiver<PageMessage>) {
    let (sink, rx) = ChannelSink::new();
    (Notifier::new(Cooldown::from_config(&AppConfig::default()), Arc::new(sink)), rx)
}

/// Owned pieces of a [`StrategyContext`].
pub(crate) struct Harness {
    pub db: CacheDb,
    pub fetcher: Arc<ScriptedFetcher>,
    pub notifier: Notifier,
    pub manifests: Manifests,
    pub messages: mpsc::UnboundedReceiver<PageMessage>,
}

impl Harness {
    pub(crate) async fn new(manifests: Manifests) -> Self {
        let (notifier, messages) = notifier();
        Self {
            db: CacheDb::open_in_memory().await.unwrap(),
            fetcher: ScriptedFetcher::new(),
            notifier,
            manifests,
            messages,
        }
    }

    pub(crate) fn ctx(&self) -> StrategyContext<'_> {
        StrategyContext {
            db: &self.db,
            fetcher: self.fetcher.as_ref(),
            notifier: &self.notifier,
            manifests: &self.manifests,
        }
    }

    pub(crate) fn drain_messages(&mut self) -> Vec<PageMessage> {
        let mut out = Vec::new();
        while let Ok(message) = self.messages.try_recv() {
            out.push(message);
        }
        out
    }
}

pub(crate) fn image_expiration() -> Expiration {
    Expiration::new(3, Duration::from_secs(7 * 24 * 60 * 60))
}

/// A reconciler over an in-memory database and a scripted network.
pub(crate) async fn reconciler_on(
    db: CacheDb, manifests: Manifests,
) -> (Reconciler, Arc<ScriptedFetcher>, mpsc::UnboundedReceiver<PageMessage>) {
    let fetcher = ScriptedFetcher::new();
    let (notifier, messages) = notifier();
    let reconciler = Reconciler::new(
        db,
        fetcher.clone(),
        notifier,
        manifests,
        Router::with_default_routes(image_expiration()),
    );
    (reconciler, fetcher, messages)
}

pub(crate) async fn reconciler(
    manifests: Manifests,
) -> (Reconciler, Arc<ScriptedFetcher>, mpsc::UnboundedReceiver<PageMessage>) {
    reconciler_on(CacheDb::open_in_memory().await.unwrap(), manifests).await
}
