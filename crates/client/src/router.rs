//! Request routing.
//!
//! Routes are evaluated in registration order and the first matching
//! predicate wins. The default table is:
//!
//! 1. precache: build-essential files listed in the precache manifest
//! 2. runtime-revision: optional files listed in the runtime manifest
//! 3. fonts
//! 4. images
//!
//! Anything else goes straight to the network with no offline guarantee.
//! Reordering this table changes which cache answers a request.

use std::fmt;

use serde::{Deserialize, Serialize};
use swcache_core::{CacheName, Manifest};
use url::Url;

use crate::strategy::{
    CacheFirstStrategy, Expiration, NetworkFirstStrategy, PrecacheStrategy, RevisionedCacheStrategy, Strategy,
};

/// What the page intends to do with the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Script,
    Style,
    Font,
    Image,
    Fetch,
    #[default]
    Other,
}

impl Destination {
    /// Guess a destination from the path extension.
    pub fn infer(url: &Url) -> Self {
        let extension = url
            .path()
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "html" | "htm" => Destination::Document,
            "js" | "mjs" => Destination::Script,
            "css" => Destination::Style,
            "woff" | "woff2" | "ttf" | "otf" | "eot" => Destination::Font,
            "png" | "gif" | "jpg" | "jpeg" | "webp" | "svg" | "webm" | "ico" => Destination::Image,
            "json" => Destination::Fetch,
            _ => Destination::Other,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Destination::Document => "document",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Font => "font",
            Destination::Image => "image",
            Destination::Fetch => "fetch",
            Destination::Other => "other",
        };
        f.write_str(name)
    }
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub url: Url,
    pub destination: Destination,
}

impl ResourceRequest {
    pub fn new(url: Url, destination: Destination) -> Self {
        Self { url, destination }
    }

    /// Request whose destination is guessed from the URL.
    pub fn inferred(url: Url) -> Self {
        let destination = Destination::infer(&url);
        Self { url, destination }
    }
}

/// The two manifests shipped with a worker version.
#[derive(Debug, Clone, Default)]
pub struct Manifests {
    /// Build-essential files, path → content hash.
    pub precache: Manifest,
    /// Optional files, path → revision.
    pub runtime: Manifest,
}

/// Pure, synchronous test deciding whether a route handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePredicate {
    InPrecache,
    InRuntimeManifest,
    Destination(Destination),
}

impl RoutePredicate {
    pub fn matches(&self, request: &ResourceRequest, manifests: &Manifests) -> bool {
        match self {
            RoutePredicate::InPrecache => manifests.precache.contains(&request.url),
            RoutePredicate::InRuntimeManifest => manifests.runtime.contains(&request.url),
            RoutePredicate::Destination(destination) => request.destination == *destination,
        }
    }
}

/// A (predicate, strategy) registration.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub predicate: RoutePredicate,
    pub strategy: Strategy,
}

/// Ordered route table.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard table: precache, runtime-revision, fonts, images.
    pub fn with_default_routes(image_expiration: Expiration) -> Self {
        let mut router = Self::new();
        router
            .register("precache", RoutePredicate::InPrecache, Strategy::Precache(PrecacheStrategy::default()))
            .register(
                "runtime-revision",
                RoutePredicate::InRuntimeManifest,
                Strategy::RevisionedCache(RevisionedCacheStrategy::default()),
            )
            .register(
                "fonts",
                RoutePredicate::Destination(Destination::Font),
                Strategy::CacheFirst(CacheFirstStrategy::new(CacheName::FontCache)),
            )
            .register(
                "images",
                RoutePredicate::Destination(Destination::Image),
                Strategy::NetworkFirst(NetworkFirstStrategy::new(CacheName::ExternalImageCache, image_expiration)),
            );
        router
    }

    /// Append a route. Routes registered earlier take precedence.
    pub fn register(&mut self, name: impl Into<String>, predicate: RoutePredicate, strategy: Strategy) -> &mut Self {
        self.routes.push(Route { name: name.into(), predicate, strategy });
        self
    }

    /// First route whose predicate accepts the request.
    pub fn matches(&self, request: &ResourceRequest, manifests: &Manifests) -> Option<&Route> {
        self.routes.iter().find(|route| route.predicate.matches(request, manifests))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
