//! Revision manifests injected at build time.
//!
//! A manifest maps resource paths to revision tokens. At startup it is
//! resolved against the site origin into a lookup keyed by absolute URL.
//! Entries that cannot be parsed are skipped: a resource missing from the
//! lookup is simply not managed by the manifest's route.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::cache::CacheKey;

/// A (path, revision) pair as produced by the build step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub revision: Option<String>,
}

impl ManifestEntry {
    pub fn new(path: impl Into<String>, revision: impl Into<String>) -> Self {
        Self { path: path.into(), revision: Some(revision.into()) }
    }
}

/// Accepted item shapes: `["path", "rev"]`, `{"url": "path", "revision": "rev"}`
/// or a bare `"path"` whose URL already carries its own versioning.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Pair(String, String),
    Object { url: String, revision: Option<String> },
    Path(String),
}

impl From<RawEntry> for ManifestEntry {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Pair(path, revision) => ManifestEntry { path, revision: Some(revision) },
            RawEntry::Object { url, revision } => ManifestEntry { path: url, revision },
            RawEntry::Path(path) => ManifestEntry { path, revision: None },
        }
    }
}

/// A resolved manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub url: Url,
    pub revision: Option<String>,
}

impl ResolvedEntry {
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(&self.url, self.revision.as_deref())
    }
}

/// Lookup from absolute URL to revision.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<ResolvedEntry>,
    index: HashMap<String, usize>,
}

impl Manifest {
    /// An empty manifest (an empty deploy).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve entries against `origin`.
    ///
    /// `data/a.json` and `/data/a.json` both resolve to `<origin>/data/a.json`.
    /// A later entry for the same URL replaces an earlier one.
    pub fn from_entries(origin: &Url, entries: impl IntoIterator<Item = ManifestEntry>) -> Self {
        let base = origin.origin().ascii_serialization();
        let mut manifest = Self::default();

        for entry in entries {
            let joined = format!("{}/{}", base, entry.path.trim_start_matches('/'));
            let url = match Url::parse(&joined) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(path = %entry.path, error = %e, "skipping manifest entry with invalid path");
                    continue;
                }
            };

            let resolved = ResolvedEntry { url, revision: entry.revision };
            match manifest.index.get(resolved.url.as_str()) {
                Some(&slot) => manifest.entries[slot] = resolved,
                None => {
                    manifest.index.insert(resolved.url.to_string(), manifest.entries.len());
                    manifest.entries.push(resolved);
                }
            }
        }

        manifest
    }

    /// Parse an injected manifest artifact (a JSON array).
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidManifest` if the document is not a JSON array.
    /// Individual malformed items are skipped.
    pub fn from_json(origin: &Url, json: &str) -> Result<Self, Error> {
        let items: Vec<serde_json::Value> =
            serde_json::from_str(json).map_err(|e| Error::InvalidManifest(format!("expected a JSON array: {e}")))?;

        let entries = items.into_iter().filter_map(|item| {
            match serde_json::from_value::<RawEntry>(item.clone()) {
                Ok(raw) => Some(ManifestEntry::from(raw)),
                Err(_) => {
                    tracing::warn!(item = %item, "skipping malformed manifest item");
                    None
                }
            }
        });

        Ok(Self::from_entries(origin, entries))
    }

    /// Load a manifest artifact from disk.
    ///
    /// A missing file yields an empty manifest.
    pub fn load(origin: &Url, path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => {
                let manifest = Self::from_json(origin, &json)?;
                tracing::info!(path = %path.display(), entries = manifest.len(), "loaded manifest");
                Ok(manifest)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "manifest not found, starting with an empty manifest");
                Ok(Self::empty())
            }
            Err(e) => Err(Error::InvalidManifest(format!("{}: {e}", path.display()))),
        }
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.index.contains_key(url.as_str())
    }

    pub fn get(&self, url: &Url) -> Option<&ResolvedEntry> {
        self.index.get(url.as_str()).map(|&slot| &self.entries[slot])
    }

    /// Revision for `url`, if the manifest manages it and pins one.
    pub fn revision(&self, url: &Url) -> Option<&str> {
        self.get(url).and_then(|entry| entry.revision.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedEntry> {
        self.entries.iter()
    }

    /// Every cache key this manifest can produce.
    pub fn cache_keys(&self) -> HashSet<String> {
        self.entries.iter().map(|entry| entry.cache_key().into_string()).collect()
    }
}

/// Render entries in the artifact format read by [`Manifest::from_json`].
pub fn render_json(entries: &[ManifestEntry]) -> Result<String, Error> {
    let items: Vec<serde_json::Value> = entries
        .iter()
        .map(|entry| match &entry.revision {
            Some(revision) => serde_json::json!([entry.path, revision]),
            None => serde_json::json!(entry.path),
        })
        .collect();
    serde_json::to_string_pretty(&items).map_err(|e| Error::InvalidManifest(e.to_string()))
}
