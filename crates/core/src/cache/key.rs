//! Revisioned cache key derivation.

use std::fmt;

use sha2::{Digest, Sha256};
use url::Url;

/// Query parameter carrying the revision inside a cache key.
pub const REVISION_PARAM: &str = "__WB_REVISION__";

/// Key under which a response is stored in a named cache.
///
/// With a revision the key is the URL plus a `__WB_REVISION__` query
/// parameter, so every revision of a resource lands under its own key.
/// Without one the key is the URL itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(url: &Url, revision: Option<&str>) -> Self {
        match revision {
            Some(revision) => {
                let mut keyed = url.clone();
                keyed.set_fragment(None);
                keyed.query_pairs_mut().append_pair(REVISION_PARAM, revision);
                Self(keyed.to_string())
            }
            None => {
                let mut keyed = url.clone();
                keyed.set_fragment(None);
                Self(keyed.to_string())
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

/// Primary key of a stored entry: SHA-256 over the cache name and key.
pub fn storage_hash(cache_name: &str, key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(cache_name.as_bytes());
    hasher.update(b"\n");
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}
