//! Fetch-failure notifications for the page.
//!
//! During an outage every failed request would otherwise produce a message,
//! so each category carries a cool-down: after one notification fires,
//! further failures in the same category are suppressed until the window
//! has elapsed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use swcache_core::{AppConfig, FailureCategory, PageMessage};
use tokio::sync::mpsc;
use url::Url;

/// Where outbound page messages are delivered.
pub trait MessageSink: Send + Sync {
    fn post(&self, message: PageMessage);
}

/// Sink backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<PageMessage>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PageMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MessageSink for ChannelSink {
    fn post(&self, message: PageMessage) {
        if let Err(mpsc::error::SendError(message)) = self.tx.send(message) {
            tracing::debug!(?message, "no page listening, dropping message");
        }
    }
}

/// Per-category cool-down tracker.
#[derive(Debug)]
pub struct Cooldown {
    windows: HashMap<FailureCategory, Duration>,
    last_fired: Mutex<HashMap<FailureCategory, Instant>>,
}

impl Cooldown {
    pub fn new(windows: HashMap<FailureCategory, Duration>) -> Self {
        Self { windows, last_fired: Mutex::new(HashMap::new()) }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(FailureCategory::ALL.into_iter().map(|c| (c, config.cooldown(c))).collect())
    }

    pub fn window(&self, category: FailureCategory) -> Duration {
        self.windows.get(&category).copied().unwrap_or_default()
    }

    /// Record a firing at `now` unless the category is still cooling down.
    ///
    /// Returns true when the caller should emit a notification.
    pub fn try_fire(&self, category: FailureCategory, now: Instant) -> bool {
        let window = self.window(category);
        let mut last_fired = self.last_fired.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = last_fired.get(&category)
            && now.saturating_duration_since(*previous) < window
        {
            return false;
        }

        last_fired.insert(category, now);
        true
    }
}

/// Classifies failed URLs and forwards throttled messages to the page.
pub struct Notifier {
    cooldown: Cooldown,
    sink: Arc<dyn MessageSink>,
}

impl Notifier {
    pub fn new(cooldown: Cooldown, sink: Arc<dyn MessageSink>) -> Self {
        Self { cooldown, sink }
    }

    /// Report that `url` could not be served.
    ///
    /// Returns true if a message was posted.
    pub fn fetch_failed(&self, url: &Url) -> bool {
        self.fetch_failed_at(url, Instant::now())
    }

    pub fn fetch_failed_at(&self, url: &Url, now: Instant) -> bool {
        let category = FailureCategory::classify(url.as_str());
        tracing::info!(%url, %category, "fetch failure, resource unavailable offline");

        if !self.cooldown.try_fire(category, now) {
            tracing::debug!(%category, "notification suppressed by cool-down");
            return false;
        }

        self.sink.post(PageMessage::FetchError(category));
        true
    }
}
