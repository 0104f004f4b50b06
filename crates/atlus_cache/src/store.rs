//! High-level cache orchestrator.
//!
//! [`CacheStore`] ties the index and the blob store together. It answers
//! "what does this owner already have compiled" at registration time,
//! evicting stale and expired entries on the way, and writes freshly
//! compiled assets through to disk. All index mutations happen inside one
//! mutex covering the whole read-modify-persist sequence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use atlus_common::{AssetIdentifier, AssetKind};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::blob::{validate_owner_id, BlobStore};
use crate::error::CacheError;
use crate::hasher::SourceIdentity;
use crate::index::{CacheIndex, CacheIndexEntry};

/// A cache hit returned by [`CacheStore::load_owner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAsset {
    /// Script kind of the cached source.
    pub kind: AssetKind,
    /// Path of the source file the blob was compiled from.
    pub source_path: PathBuf,
    /// The compiled payload.
    pub bytes: Vec<u8>,
}

/// Everything the store needs to record one freshly compiled asset.
#[derive(Debug, Clone)]
pub struct CacheRecord<'a> {
    /// Owning mod id.
    pub owner_id: &'a str,
    /// The owner's asset root; the source must live beneath it.
    pub source_root: &'a Path,
    /// The compiled source file.
    pub source_path: &'a Path,
    /// The asset's lookup key. Its original-case name is taken from `display_name`.
    pub identifier: &'a AssetIdentifier,
    /// Original spelling of the asset name.
    pub display_name: &'a str,
    /// Script kind.
    pub kind: AssetKind,
    /// Source modification time captured before compiling.
    pub source_last_modified: DateTime<Utc>,
}

/// Persistent compiled-asset cache.
pub struct CacheStore {
    /// Root directory for the index and all blobs.
    root: PathBuf,

    /// Entries unused for this long are evicted.
    expiration: Duration,

    /// The in-memory index; the lock spans every read-modify-persist.
    index: Mutex<CacheIndex>,

    /// Blob file storage.
    blobs: BlobStore,
}

impl CacheStore {
    /// Default expiration window: 28 days.
    pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(28 * 24 * 60 * 60);

    /// Opens the cache at `root`, loading its index or starting fresh.
    ///
    /// This is fail-safe: a missing, unreadable, corrupt or incompatible index
    /// results in an empty one.
    pub fn open(root: &Path, expiration: Duration) -> Self {
        let index = match CacheIndex::load(root) {
            Ok(Some(index)) if index.is_compatible() => index,
            Ok(Some(index)) => {
                info!(
                    found = %index.version,
                    "cache index has an incompatible version, starting fresh"
                );
                CacheIndex::new()
            }
            Ok(None) => CacheIndex::new(),
            Err(e) => {
                warn!(error = %e, "cache index unreadable, starting fresh");
                CacheIndex::new()
            }
        };

        Self {
            root: root.to_path_buf(),
            expiration,
            index: Mutex::new(index),
            blobs: BlobStore::new(root),
        }
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The expiration window.
    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// Returns a snapshot of the current index.
    pub fn index(&self) -> CacheIndex {
        self.index.lock().clone()
    }

    /// Returns every valid cached asset of `owner_id`.
    ///
    /// Expired entries, entries whose source is missing or newer than the
    /// recorded modification time, and entries whose blob cannot be read are
    /// evicted (blob deleted, row removed). Each returned entry has its
    /// access time refreshed. If two surviving rows map to the same
    /// identifier, the owner's entire cache is dropped and nothing is
    /// returned. An invalid owner id has no cache.
    pub fn load_owner(
        &self,
        owner_id: &str,
        source_root: &Path,
    ) -> HashMap<AssetIdentifier, CachedAsset> {
        if let Err(e) = validate_owner_id(owner_id) {
            warn!(error = %e, "skipping cache lookup");
            return HashMap::new();
        }
        self.load_owner_at(owner_id, source_root, Utc::now())
    }

    fn load_owner_at(
        &self,
        owner_id: &str,
        source_root: &Path,
        now: DateTime<Utc>,
    ) -> HashMap<AssetIdentifier, CachedAsset> {
        let mut index = self.index.lock();
        let mut hits = HashMap::new();
        let mut dirty = false;
        let mut duplicate = None;

        if let Some(entries) = index.entries_by_owner.get_mut(owner_id) {
            entries.retain_mut(|entry| {
                if entry.is_expired(now, self.expiration) {
                    debug!(owner = owner_id, name = %entry.name, "cache entry expired");
                    self.evict_blob(owner_id, entry);
                    dirty = true;
                    return false;
                }
                if !entry.is_fresh(source_root) {
                    debug!(owner = owner_id, name = %entry.name, "cache entry stale");
                    self.evict_blob(owner_id, entry);
                    dirty = true;
                    return false;
                }

                let bytes = match self.blobs.read_blob(
                    owner_id,
                    entry.locale,
                    entry.mode,
                    &entry.hashed_blob_name,
                ) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        debug!(owner = owner_id, name = %entry.name, error = %e, "cached blob unreadable");
                        self.evict_blob(owner_id, entry);
                        dirty = true;
                        return false;
                    }
                };

                entry.last_accessed = now;
                dirty = true;

                let identifier = entry.identifier();
                if hits.contains_key(&identifier) {
                    duplicate = Some(identifier);
                } else {
                    hits.insert(
                        identifier,
                        CachedAsset {
                            kind: entry.kind,
                            source_path: entry.source_path(source_root),
                            bytes,
                        },
                    );
                }
                true
            });
        }

        if let Some(identifier) = duplicate {
            warn!(
                owner = owner_id,
                asset = %identifier,
                "duplicate identifier in cache index, dropping the owner's cache"
            );
            index.entries_by_owner.remove(owner_id);
            if let Err(e) = self.blobs.remove_owner(owner_id) {
                warn!(owner = owner_id, error = %e, "failed to delete owner cache directory");
            }
            self.persist(&index);
            return HashMap::new();
        }

        if dirty {
            self.persist(&index);
        }
        hits
    }

    /// Writes a compiled asset through to the cache.
    ///
    /// Any existing row of the same owner with the same identifier or blob
    /// name is replaced; a replaced row's blob is deleted if its name differs.
    pub fn store(&self, record: &CacheRecord<'_>, bytes: &[u8]) -> Result<CacheIndexEntry, CacheError> {
        validate_owner_id(record.owner_id)?;
        let identity = SourceIdentity::new(record.owner_id, record.source_root, record.source_path)?;
        let hashed_blob_name = identity.hashed_blob_name();
        let identifier = record.identifier;

        self.blobs.write_blob(
            record.owner_id,
            identifier.locale(),
            identifier.mode(),
            &hashed_blob_name,
            bytes,
        )?;

        let entry = CacheIndexEntry {
            name: record.display_name.to_string(),
            locale: identifier.locale(),
            mode: identifier.mode(),
            kind: record.kind,
            source_file: identity.file_name,
            source_relative_dir: identity.relative_dir,
            hashed_blob_name,
            source_last_modified: record.source_last_modified,
            last_accessed: Utc::now(),
        };

        let mut index = self.index.lock();
        let entries = index
            .entries_by_owner
            .entry(record.owner_id.to_string())
            .or_default();
        let mut replaced = Vec::new();
        entries.retain(|existing| {
            let same = existing.identifier() == *identifier
                || existing.hashed_blob_name == entry.hashed_blob_name;
            if same {
                replaced.push(existing.clone());
            }
            !same
        });
        for old in replaced
            .iter()
            .filter(|old| old.hashed_blob_name != entry.hashed_blob_name)
        {
            self.evict_blob(record.owner_id, old);
        }
        entries.push(entry.clone());

        index.save(&self.root)?;
        debug!(owner = record.owner_id, asset = %identifier, "cached compiled asset");
        Ok(entry)
    }

    /// Evicts every expired entry of every owner. Returns the number removed.
    pub fn prune_expired(&self) -> Result<usize, CacheError> {
        let now = Utc::now();
        let mut index = self.index.lock();
        let mut removed = 0;
        for (owner_id, entries) in index.entries_by_owner.iter_mut() {
            entries.retain(|entry| {
                if entry.is_expired(now, self.expiration) {
                    self.evict_blob(owner_id, entry);
                    removed += 1;
                    false
                } else {
                    true
                }
            });
        }
        index.entries_by_owner.retain(|_, entries| !entries.is_empty());
        if removed > 0 {
            index.save(&self.root)?;
        }
        Ok(removed)
    }

    /// Removes all rows and blobs of one owner.
    pub fn drop_owner(&self, owner_id: &str) -> Result<(), CacheError> {
        validate_owner_id(owner_id)?;
        let mut index = self.index.lock();
        index.entries_by_owner.remove(owner_id);
        self.blobs.remove_owner(owner_id)?;
        index.save(&self.root)
    }

    /// Deletes the blob of an entry that is being evicted.
    fn evict_blob(&self, owner_id: &str, entry: &CacheIndexEntry) {
        if let Err(e) =
            self.blobs
                .remove_blob(owner_id, entry.locale, entry.mode, &entry.hashed_blob_name)
        {
            warn!(owner = owner_id, name = %entry.name, error = %e, "failed to delete cached blob");
        }
    }

    /// Saves the index, logging rather than propagating failures.
    fn persist(&self, index: &CacheIndex) {
        if let Err(e) = index.save(&self.root) {
            warn!(error = %e, "failed to save cache index");
        }
    }
}
