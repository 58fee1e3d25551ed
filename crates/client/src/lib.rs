//! Client code for swcache.
//!
//! This crate provides the fetch pipeline and the cache reconciler: the
//! router, the resolution strategies, failure notifications and the
//! install/activate lifecycle shared by the worker binary.

pub mod fetch;
pub mod notify;
pub mod reconciler;
pub mod router;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use fetch::{FetchClient, FetchConfig, Fetcher};
pub use notify::{ChannelSink, Cooldown, MessageSink, Notifier};
pub use reconciler::{ActivationReport, InstallReport, Phase, Reconciler, SweepReport, WarmReport, WarmRequest};
pub use router::{Destination, Manifests, ResourceRequest, Route, RoutePredicate, Router};
pub use strategy::{Expiration, Resolution, ResolutionSource, Strategy};
