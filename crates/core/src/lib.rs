//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Named caches with a SQLite backend
//! - Revision manifests and cache key derivation
//! - Messages sent to the page
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;
pub mod message;

pub use cache::{CacheDb, CacheKey, CacheName, CachedEntry, StoredResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use manifest::{Manifest, ManifestEntry};
pub use message::{FailureCategory, PageMessage};
