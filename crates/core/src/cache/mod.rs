//! SQLite-backed named caches.
//!
//! A single database holds every named cache as a partition of the
//! `cache_entries` table. It supports:
//!
//! - Exact-key lookups keyed by (cache name, revisioned cache key)
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Age and LRU purges for bounded caches

pub mod connection;
pub mod entries;
#[cfg(any(test, feature = "test-util"))]
mod faults;
pub mod key;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheName, CachedEntry, StoredResponse};
pub use key::{CacheKey, storage_hash};
