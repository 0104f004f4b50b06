//! The persisted cache index.
//!
//! The index is stored as `index.json` in the cache root and maps each owner
//! id to the list of assets compiled for it. It is rewritten wholesale on
//! every mutation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use atlus_common::{AssetIdentifier, AssetKind, ContentMode, Locale};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::hasher::{source_modified, SourceIdentity};

/// Name of the index file within the cache root.
pub const INDEX_FILE: &str = "index.json";

/// Current index format version. An index with any other version is discarded.
pub const INDEX_VERSION: &str = "1";

/// Top-level cache index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheIndex {
    /// Format version that produced this index.
    pub version: String,

    /// Cached assets per owner id, in insertion order.
    pub entries_by_owner: BTreeMap<String, Vec<CacheIndexEntry>>,
}

/// One previously compiled asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheIndexEntry {
    /// Logical asset name (file stem, original spelling).
    pub name: String,

    /// Locale bucket the asset was registered under.
    pub locale: Locale,

    /// Content mode the asset was registered under.
    pub mode: ContentMode,

    /// Script kind of the source.
    pub kind: AssetKind,

    /// Source file name, extension included.
    pub source_file: String,

    /// Directory of the source relative to the owner's asset root.
    pub source_relative_dir: String,

    /// Blob file name inside the owner's `[<locale>/]<mode>` directory.
    pub hashed_blob_name: String,

    /// Source modification time captured before the source was compiled.
    pub source_last_modified: DateTime<Utc>,

    /// Last time the blob was written or read. Drives expiration.
    pub last_accessed: DateTime<Utc>,
}

impl CacheIndexEntry {
    /// The lookup key this entry caches.
    pub fn identifier(&self) -> AssetIdentifier {
        AssetIdentifier::new(&self.name, self.locale, self.mode)
    }

    /// The path identity the blob name was derived from.
    pub fn source_identity(&self, owner_id: &str) -> SourceIdentity {
        SourceIdentity {
            owner_id: owner_id.to_string(),
            relative_dir: self.source_relative_dir.clone(),
            file_name: self.source_file.clone(),
        }
    }

    /// Path of the recorded source file under the owner's asset root.
    pub fn source_path(&self, source_root: &Path) -> PathBuf {
        self.source_identity("").source_path(source_root)
    }

    /// Returns `true` if the entry has not been accessed within `expiration`.
    pub fn is_expired(&self, now: DateTime<Utc>, expiration: Duration) -> bool {
        let since_access = now.signed_duration_since(self.last_accessed);
        match since_access.to_std() {
            Ok(elapsed) => elapsed >= expiration,
            // Accessed in the future (clock skew): not expired.
            Err(_) => false,
        }
    }

    /// Returns `true` if the source still exists and has not been modified
    /// since the entry was written.
    pub fn is_fresh(&self, source_root: &Path) -> bool {
        match source_modified(&self.source_path(source_root)) {
            Ok(modified) => modified <= self.source_last_modified,
            Err(_) => false,
        }
    }
}

impl CacheIndex {
    /// Creates a new, empty index at the current format version.
    pub fn new() -> Self {
        Self {
            version: INDEX_VERSION.to_string(),
            entries_by_owner: BTreeMap::new(),
        }
    }

    /// Loads the index from the cache root.
    ///
    /// Returns `Ok(None)` if no index exists yet.
    pub fn load(cache_root: &Path) -> Result<Option<Self>, CacheError> {
        let path = cache_root.join(INDEX_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::Io { path, source: e }),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| CacheError::IndexParse {
                reason: e.to_string(),
            })
    }

    /// Saves the index to the cache root.
    ///
    /// Creates the cache root if it doesn't exist.
    pub fn save(&self, cache_root: &Path) -> Result<(), CacheError> {
        std::fs::create_dir_all(cache_root).map_err(|e| CacheError::Io {
            path: cache_root.to_path_buf(),
            source: e,
        })?;
        let path = cache_root.join(INDEX_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| CacheError::Io { path, source: e })
    }

    /// Returns `true` if this index was written by the current format version.
    pub fn is_compatible(&self) -> bool {
        self.version == INDEX_VERSION
    }

    /// Entries recorded for `owner_id`, empty if there are none.
    pub fn entries(&self, owner_id: &str) -> &[CacheIndexEntry] {
        self.entries_by_owner
            .get(owner_id)
            .map_or(&[], Vec::as_slice)
    }
}

impl Default for CacheIndex {
    fn default() -> Self {
        Self::new()
    }
}
