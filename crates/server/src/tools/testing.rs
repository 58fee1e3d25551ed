//! Test doubles for the tool handlers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use swcache_client::{ChannelSink, Fetcher, Manifests, Reconciler};
use swcache_core::{AppConfig, CacheDb, Error, Manifest, ManifestEntry, PageMessage, StoredResponse};
use tokio::sync::mpsc;
use url::Url;

pub(crate) const ORIGIN: &str = "https://rules.example.com";

pub(crate) fn origin() -> Url {
    Url::parse(ORIGIN).unwrap()
}

/// Fetcher serving a fixed table; anything else is a network failure.
#[derive(Default)]
pub(crate) struct TableFetcher {
    pub(crate) responses: Mutex<HashMap<String, StoredResponse>>,
    pub(crate) calls: AtomicUsize,
}

impl TableFetcher {
    pub(crate) fn serve(&self, path: &str, body: &str) {
        let url = origin().join(path).unwrap();
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), StoredResponse::new(200, Vec::new(), body.to_string()));
    }
}

#[async_trait]
impl Fetcher for TableFetcher {
    async fn fetch(&self, url: &Url) -> Result<StoredResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| Error::Network(format!("unreachable: {url}")))
    }
}

pub(crate) struct Fixture {
    pub reconciler: Arc<Reconciler>,
    pub fetcher: Arc<TableFetcher>,
    pub messages: mpsc::UnboundedReceiver<PageMessage>,
}

/// Reconciler over an in-memory database with the given runtime manifest.
pub(crate) async fn fixture(runtime: &[(&str, &str)]) -> Fixture {
    let fetcher = Arc::new(TableFetcher::default());
    let (sink, messages) = ChannelSink::new();
    let manifests = Manifests {
        precache: Manifest::empty(),
        runtime: Manifest::from_entries(&origin(), runtime.iter().map(|(p, r)| ManifestEntry::new(*p, *r))),
    };
    let reconciler = Reconciler::from_config(
        &AppConfig::default(),
        CacheDb::open_in_memory().await.unwrap(),
        fetcher.clone(),
        Arc::new(sink),
        manifests,
    );
    Fixture { reconciler: Arc::new(reconciler), fetcher, messages }
}
