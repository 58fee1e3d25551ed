//! Revision manifest generation.
//!
//! Each selected file is listed with a revision derived from its content,
//! so an unchanged file keeps its cache key across builds.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use swcache_core::ManifestEntry;

pub const DEFAULT_MAX_BYTES: u64 = 5_000_000;

/// Hex characters of the content digest kept as the revision.
const REVISION_LEN: usize = 32;

pub fn revision(content: &[u8]) -> String {
    let mut digest = hex::encode(Sha256::digest(content));
    digest.truncate(REVISION_LEN);
    digest
}

fn build_globs(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid glob: {pattern}"))?);
    }
    Ok(builder.build()?)
}

/// Every regular file under `dir`, depth first.
fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk(&entry.path(), out)?;
        } else if file_type.is_file() {
            out.push(entry.path());
        }
    }
    Ok(())
}

/// Manifest path of `file`: relative to `root`, forward slashes.
fn manifest_path(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// List files under `root` matching any glob, sorted by path.
pub fn generate(root: &Path, patterns: &[String], max_bytes: u64) -> Result<Vec<ManifestEntry>> {
    let globs = build_globs(patterns)?;
    let mut files = Vec::new();
    walk(root, &mut files)?;

    let mut entries = Vec::new();
    for file in files {
        let Some(path) = manifest_path(root, &file) else {
            continue;
        };
        if !globs.is_match(&path) {
            continue;
        }

        let size = fs::metadata(&file)?.len();
        if size > max_bytes {
            tracing::warn!(path, size, max_bytes, "skipping file over size limit");
            continue;
        }

        let content = fs::read(&file).with_context(|| format!("failed to read {}", file.display()))?;
        entries.push(ManifestEntry::new(path, revision(&content)));
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::info!(entries = entries.len(), root = %root.display(), "manifest generated");
    Ok(entries)
}
