//! Persistent cache of compiled script assets.
//!
//! Compiled blobs are stored under `<root>/<owner>/[<locale>/]<mode>/<hash>`
//! where the hash is derived from the asset's source path identity, so a
//! rescan finds the same blob without reading any source text. A single
//! JSON index records, per owner, where each blob came from and when it was
//! last used; entries whose source has changed or that have not been used
//! within the expiration window are evicted on load.

#![warn(missing_docs)]

pub mod blob;
pub mod error;
pub mod hasher;
pub mod index;
pub mod store;

pub use blob::{validate_owner_id, BlobStore};
pub use error::CacheError;
pub use hasher::{source_modified, SourceIdentity};
pub use index::{CacheIndex, CacheIndexEntry, INDEX_FILE, INDEX_VERSION};
pub use store::{CacheRecord, CacheStore, CachedAsset};
