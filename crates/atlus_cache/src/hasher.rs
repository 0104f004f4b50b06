//! Source identity hashing and modification-time capture.
//!
//! A cached blob is named after the asset's stable identity (owner id,
//! directory relative to the owner's asset root, and file name) rather than
//! its content, so a rescan reproduces the blob name without reading the
//! source. Change detection uses modification times instead.

use std::path::{Component, Path, PathBuf};

use atlus_common::ContentHash;
use chrono::{DateTime, Utc};

use crate::error::CacheError;

/// The stable path identity of one owner-attributed source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceIdentity {
    /// Owning mod id.
    pub owner_id: String,
    /// Directory of the source relative to the owner's asset root, `/`-separated.
    pub relative_dir: String,
    /// File name of the source, extension included.
    pub file_name: String,
}

impl SourceIdentity {
    /// Builds the identity of `source_path`, which must live under `source_root`.
    pub fn new(owner_id: &str, source_root: &Path, source_path: &Path) -> Result<Self, CacheError> {
        let outside = || CacheError::SourceOutsideRoot {
            path: source_path.to_path_buf(),
            root: source_root.to_path_buf(),
        };
        let relative = source_path.strip_prefix(source_root).map_err(|_| outside())?;
        let file_name = relative
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(outside)?
            .to_string();
        let relative_dir = relative
            .parent()
            .map(normalize_dir)
            .unwrap_or_default();

        Ok(Self {
            owner_id: owner_id.to_string(),
            relative_dir,
            file_name,
        })
    }

    /// Returns the deterministic blob name: 32 hex chars of the XXH3-128 hash
    /// of the lowercased `owner/dir/file` identity.
    pub fn hashed_blob_name(&self) -> String {
        let mut key = self.owner_id.to_lowercase();
        if !self.relative_dir.is_empty() {
            key.push('/');
            key.push_str(&self.relative_dir.to_lowercase());
        }
        key.push('/');
        key.push_str(&self.file_name.to_lowercase());
        ContentHash::from_str_bytes(&key).to_string()
    }

    /// Reassembles the source file path under `source_root`.
    pub fn source_path(&self, source_root: &Path) -> PathBuf {
        let mut path = source_root.to_path_buf();
        for segment in self.relative_dir.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(&self.file_name);
        path
    }
}

/// Joins the normal components of a relative directory with `/`.
fn normalize_dir(dir: &Path) -> String {
    dir.components()
        .filter_map(|c| match c {
            Component::Normal(segment) => segment.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Reads the modification time of a source file as UTC.
pub fn source_modified(path: &Path) -> Result<DateTime<Utc>, CacheError> {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(DateTime::<Utc>::from(modified))
}
