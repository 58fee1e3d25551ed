//! Named cache entry operations.
//!
//! Every named cache is a partition of the `cache_entries` table. Lookups
//! are exact-key: a stored response is only reachable through the key it
//! was written under.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::key::storage_hash;
use crate::Error;

/// The named caches managed by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CacheName {
    /// Build-essential assets keyed by content hash.
    Precache,
    /// Optional assets keyed by manifest revision.
    RuntimeRevision,
    /// Fonts, cached forever.
    FontCache,
    /// Images that fell through every other route.
    ExternalImageCache,
}

impl CacheName {
    pub const ALL: [CacheName; 4] =
        [CacheName::Precache, CacheName::RuntimeRevision, CacheName::FontCache, CacheName::ExternalImageCache];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheName::Precache => "precache",
            CacheName::RuntimeRevision => "runtime-revision",
            CacheName::FontCache => "font-cache",
            CacheName::ExternalImageCache => "external-image-cache",
        }
    }
}

impl fmt::Display for CacheName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CacheName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown cache: {s}")))
    }
}

/// A response as the cache sees it.
///
/// The body is a `Bytes` handle, so cloning the response shares the buffer
/// instead of consuming it: one copy can be written to the cache while the
/// other is handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl StoredResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// Empty 200 response served when nothing better is available.
    pub fn placeholder() -> Self {
        Self { status: 200, headers: Vec::new(), body: Bytes::new() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// A stored response with its bookkeeping columns.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub cache_name: CacheName,
    pub cache_key: String,
    pub url: String,
    pub response: StoredResponse,
    pub stored_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
}

/// Fixed-width timestamps keep lexical and chronological order identical.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::CorruptEntry(format!("timestamp {raw}: {e}")))
}

struct EntryRow {
    cache_key: String,
    url: String,
    status: i64,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
    accessed_at: String,
}

impl EntryRow {
    fn into_entry(self, cache_name: CacheName) -> Result<CachedEntry, Error> {
        let status = u16::try_from(self.status)
            .map_err(|_| Error::CorruptEntry(format!("status {} for {}", self.status, self.cache_key)))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)
            .map_err(|e| Error::CorruptEntry(format!("headers for {}: {e}", self.cache_key)))?;

        Ok(CachedEntry {
            cache_name,
            response: StoredResponse { status, headers, body: Bytes::from(self.body) },
            stored_at: parse_timestamp(&self.stored_at)?,
            accessed_at: parse_timestamp(&self.accessed_at)?,
            cache_key: self.cache_key,
            url: self.url,
        })
    }
}

impl CacheDb {
    /// Store a response under `key` in the named cache.
    ///
    /// Uses UPSERT semantics: an existing entry under the same key is
    /// replaced.
    pub async fn put_entry(
        &self, cache: CacheName, key: &str, url: &str, response: &StoredResponse,
    ) -> Result<(), Error> {
        self.put_entry_at(cache, key, url, response, Utc::now()).await
    }

    /// Store a response with an explicit `stored_at` timestamp.
    pub async fn put_entry_at(
        &self, cache: CacheName, key: &str, url: &str, response: &StoredResponse, stored_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let key_hash = storage_hash(cache.as_str(), key);
        let key = key.to_string();
        let url = url.to_string();
        let status = i64::from(response.status);
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::InvalidInput(format!("failed to serialize headers: {e}")))?;
        let body = response.body.clone();
        let stored_at = timestamp(stored_at);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (
                        key_hash, cache_name, cache_key, url, status, headers_json, body, stored_at, accessed_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                    ON CONFLICT(key_hash) DO UPDATE SET
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at,
                        accessed_at = excluded.accessed_at",
                    params![key_hash, cache.as_str(), key, url, status, headers_json, &body[..], stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry stored under exactly `key`.
    ///
    /// Returns None if the key doesn't exist in the named cache.
    pub async fn match_entry(&self, cache: CacheName, key: &str) -> Result<Option<CachedEntry>, Error> {
        let key_hash = storage_hash(cache.as_str(), key);
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT cache_key, url, status, headers_json, body, stored_at, accessed_at
                    FROM cache_entries WHERE key_hash = ?1",
                )?;

                let result = stmt.query_row(params![key_hash], |row| {
                    Ok(EntryRow {
                        cache_key: row.get(0)?,
                        url: row.get(1)?,
                        status: row.get(2)?,
                        headers_json: row.get(3)?,
                        body: row.get(4)?,
                        stored_at: row.get(5)?,
                        accessed_at: row.get(6)?,
                    })
                });

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(|row| row.into_entry(cache)).transpose()
    }

    /// Mark an entry as used now.
    ///
    /// Returns false if the entry doesn't exist.
    pub async fn touch_entry(&self, cache: CacheName, key: &str) -> Result<bool, Error> {
        let key_hash = storage_hash(cache.as_str(), key);
        let now = timestamp(Utc::now());
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let updated = conn.execute(
                    "UPDATE cache_entries SET accessed_at = ?2 WHERE key_hash = ?1",
                    params![key_hash, now],
                )?;
                Ok(updated > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// List every key stored in the named cache.
    pub async fn cache_keys(&self, cache: CacheName) -> Result<Vec<String>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT cache_key FROM cache_entries WHERE cache_name = ?1 ORDER BY cache_key")?;
                let keys = stmt
                    .query_map(params![cache.as_str()], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the entry stored under `key`.
    ///
    /// Returns false if nothing was stored under the key.
    pub async fn delete_entry(&self, cache: CacheName, key: &str) -> Result<bool, Error> {
        let key_hash = storage_hash(cache.as_str(), key);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM cache_entries WHERE key_hash = ?1", params![key_hash])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in the named cache.
    pub async fn count_entries(&self, cache: CacheName) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?1",
                    params![cache.as_str()],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries stored before `cutoff`.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_older_than(&self, cache: CacheName, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let cutoff = timestamp(cutoff);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE cache_name = ?1 AND stored_at < ?2",
                    params![cache.as_str(), cutoff],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Evict least recently used entries until count <= max_entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_lru(&self, cache: CacheName, max_entries: usize) -> Result<u64, Error> {
        let max = i64::try_from(max_entries).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?1",
                    params![cache.as_str()],
                    |row| row.get(0),
                )?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM cache_entries WHERE key_hash IN (
                        SELECT key_hash FROM cache_entries WHERE cache_name = ?1
                        ORDER BY accessed_at ASC, stored_at ASC, rowid ASC LIMIT ?2
                    )",
                    params![cache.as_str(), to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry in the named cache.
    pub async fn clear_cache(&self, cache: CacheName) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE cache_name = ?1", params![cache.as_str()])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::CacheKey;
    use chrono::Duration;
    use url::Url;

    fn json_response(body: &str) -> StoredResponse {
        StoredResponse::new(200, vec![("content-type".into(), "application/json".into())], body.to_string())
    }

    fn key(url: &str, revision: Option<&str>) -> String {
        CacheKey::new(&Url::parse(url).unwrap(), revision).into_string()
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let k = key("https://example.com/data/a.json", Some("rev1"));
        let response = json_response(r#"{"a":1}"#);

        db.put_entry(CacheName::RuntimeRevision, &k, "https://example.com/data/a.json", &response)
            .await
            .unwrap();

        let entry = db.match_entry(CacheName::RuntimeRevision, &k).await.unwrap().unwrap();
        assert_eq!(entry.response, response);
        assert_eq!(entry.cache_key, k);
        assert_eq!(entry.response.content_type(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_match_requires_exact_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://example.com/data/a.json";
        db.put_entry(CacheName::RuntimeRevision, &key(url, Some("rev1")), url, &json_response("{}"))
            .await
            .unwrap();

        let other_revision = db
            .match_entry(CacheName::RuntimeRevision, &key(url, Some("rev2")))
            .await
            .unwrap();
        assert!(other_revision.is_none());

        let bare_url = db.match_entry(CacheName::RuntimeRevision, url).await.unwrap();
        assert!(bare_url.is_none());
    }

    #[tokio::test]
    async fn test_caches_are_partitioned() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://example.com/font.woff2";
        db.put_entry(CacheName::FontCache, url, url, &json_response("f")).await.unwrap();

        assert!(db.match_entry(CacheName::ExternalImageCache, url).await.unwrap().is_none());
        assert_eq!(db.count_entries(CacheName::FontCache).await.unwrap(), 1);
        assert_eq!(db.count_entries(CacheName::Precache).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_keys_and_delete() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for path in ["a", "b"] {
            let url = format!("https://example.com/{path}.json");
            db.put_entry(CacheName::RuntimeRevision, &url, &url, &json_response("{}"))
                .await
                .unwrap();
        }

        let keys = db.cache_keys(CacheName::RuntimeRevision).await.unwrap();
        assert_eq!(keys, vec!["https://example.com/a.json", "https://example.com/b.json"]);

        assert!(db.delete_entry(CacheName::RuntimeRevision, "https://example.com/a.json").await.unwrap());
        assert!(!db.delete_entry(CacheName::RuntimeRevision, "https://example.com/a.json").await.unwrap());
        assert_eq!(db.count_entries(CacheName::RuntimeRevision).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = Utc::now();
        let old = "https://cdn.example.org/old.png";
        let new = "https://cdn.example.org/new.png";
        db.put_entry_at(CacheName::ExternalImageCache, old, old, &json_response("o"), now - Duration::days(8))
            .await
            .unwrap();
        db.put_entry_at(CacheName::ExternalImageCache, new, new, &json_response("n"), now)
            .await
            .unwrap();

        let deleted = db
            .purge_older_than(CacheName::ExternalImageCache, now - Duration::days(7))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(db.match_entry(CacheName::ExternalImageCache, new).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_lru_evicts_least_recently_used() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = Utc::now();
        let urls = ["https://x.org/1.png", "https://x.org/2.png", "https://x.org/3.png"];
        for (i, url) in urls.iter().enumerate() {
            let at = now - Duration::minutes(10 - i as i64);
            db.put_entry_at(CacheName::ExternalImageCache, url, url, &json_response("i"), at)
                .await
                .unwrap();
        }
        assert!(db.touch_entry(CacheName::ExternalImageCache, urls[0]).await.unwrap());

        let deleted = db.purge_lru(CacheName::ExternalImageCache, 2).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.match_entry(CacheName::ExternalImageCache, urls[0]).await.unwrap().is_some());
        assert!(db.match_entry(CacheName::ExternalImageCache, urls[1]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_lru_under_limit() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://x.org/1.png";
        db.put_entry(CacheName::ExternalImageCache, url, url, &json_response("i")).await.unwrap();
        assert_eq!(db.purge_lru(CacheName::ExternalImageCache, 100).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_lru_huge_limit_keeps_everything() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for n in 0..3 {
            let url = format!("https://x.org/{n}.png");
            db.put_entry(CacheName::ExternalImageCache, &url, &url, &json_response("i")).await.unwrap();
        }

        assert_eq!(db.purge_lru(CacheName::ExternalImageCache, usize::MAX).await.unwrap(), 0);
        assert_eq!(db.count_entries(CacheName::ExternalImageCache).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://x.org/f.woff";
        db.put_entry(CacheName::FontCache, url, url, &json_response("f")).await.unwrap();
        db.put_entry(CacheName::Precache, url, url, &json_response("p")).await.unwrap();

        assert_eq!(db.clear_cache(CacheName::FontCache).await.unwrap(), 1);
        assert_eq!(db.count_entries(CacheName::Precache).await.unwrap(), 1);
    }

    #[test]
    fn test_cache_name_round_trip() {
        for name in CacheName::ALL {
            assert_eq!(name.as_str().parse::<CacheName>().unwrap(), name);
        }
        assert!("nope".parse::<CacheName>().is_err());
    }

    #[test]
    fn test_cache_name_serde_matches_as_str() {
        let json = serde_json::to_string(&CacheName::ExternalImageCache).unwrap();
        assert_eq!(json, "\"external-image-cache\"");
    }

    #[test]
    fn test_placeholder_is_empty() {
        let placeholder = StoredResponse::placeholder();
        assert_eq!(placeholder.status, 200);
        assert!(placeholder.body.is_empty());
        assert!(placeholder.is_success());
    }
}
