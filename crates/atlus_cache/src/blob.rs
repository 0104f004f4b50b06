//! On-disk storage of compiled blobs.
//!
//! Blobs live at `<root>/<owner>/[<locale>/]<mode>/<hashed_name>`; the locale
//! segment is omitted for universal assets. Each file starts with a header
//! holding magic bytes, the blob format version and a checksum of the
//! compiled payload, so a truncated or tampered blob is detected on read.

use std::path::{Component, Path, PathBuf};

use atlus_common::{ContentHash, ContentMode, Locale};
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Magic bytes identifying a cached blob.
const BLOB_MAGIC: [u8; 4] = *b"ATLS";

/// Current blob format version. Increment on breaking changes to the header.
const BLOB_FORMAT_VERSION: u32 = 1;

/// Header prepended to every cached blob for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobHeader {
    /// Magic bytes: must be `b"ATLS"`.
    pub magic: [u8; 4],

    /// Blob format version.
    pub format_version: u32,

    /// Content hash of the payload (for integrity checks).
    pub checksum: ContentHash,
}

/// Reads and writes compiled blobs under the cache root.
#[derive(Debug, Clone)]
pub struct BlobStore {
    /// Root cache directory.
    cache_root: PathBuf,
}

impl BlobStore {
    /// Creates a blob store rooted at the given cache directory.
    pub fn new(cache_root: &Path) -> Self {
        Self {
            cache_root: cache_root.to_path_buf(),
        }
    }

    /// Directory holding all blobs of one owner.
    ///
    /// Fails for an owner id that is not a single plain path segment, so no
    /// owner can name the cache root or anything outside it.
    pub fn owner_dir(&self, owner_id: &str) -> Result<PathBuf, CacheError> {
        validate_owner_id(owner_id)?;
        Ok(self.cache_root.join(owner_id))
    }

    /// Returns the file path for a blob.
    pub fn blob_path(
        &self,
        owner_id: &str,
        locale: Locale,
        mode: ContentMode,
        hashed_name: &str,
    ) -> Result<PathBuf, CacheError> {
        if !is_single_segment(hashed_name) {
            return Err(CacheError::InvalidBlobName {
                name: hashed_name.to_string(),
            });
        }
        let mut path = self.owner_dir(owner_id)?;
        if !locale.is_universal() {
            path.push(locale.code());
        }
        path.push(mode.code());
        path.push(hashed_name.to_lowercase());
        Ok(path)
    }

    /// Writes a blob, creating parent directories, and returns its path.
    pub fn write_blob(
        &self,
        owner_id: &str,
        locale: Locale,
        mode: ContentMode,
        hashed_name: &str,
        data: &[u8],
    ) -> Result<PathBuf, CacheError> {
        let path = self.blob_path(owner_id, locale, mode, hashed_name)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let header = BlobHeader {
            magic: BLOB_MAGIC,
            format_version: BLOB_FORMAT_VERSION,
            checksum: ContentHash::from_bytes(data),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        // 4-byte header length (little-endian) + header + payload
        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + data.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(data);

        std::fs::write(&path, &output).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    /// Reads a blob, validating its header and checksum.
    pub fn read_blob(
        &self,
        owner_id: &str,
        locale: Locale,
        mode: ContentMode,
        hashed_name: &str,
    ) -> Result<Vec<u8>, CacheError> {
        let path = self.blob_path(owner_id, locale, mode, hashed_name)?;
        let raw = std::fs::read(&path).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e,
        })?;
        decode_blob(&path, &raw)
    }

    /// Deletes one blob. A blob that is already gone is not an error.
    pub fn remove_blob(
        &self,
        owner_id: &str,
        locale: Locale,
        mode: ContentMode,
        hashed_name: &str,
    ) -> Result<(), CacheError> {
        let path = self.blob_path(owner_id, locale, mode, hashed_name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io { path, source: e }),
        }
    }

    /// Deletes every blob of one owner.
    pub fn remove_owner(&self, owner_id: &str) -> Result<(), CacheError> {
        let dir = self.owner_dir(owner_id)?;
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io {
                path: dir,
                source: e,
            }),
        }
    }
}

/// Checks that `owner_id` can name a directory directly under the cache root.
pub fn validate_owner_id(owner_id: &str) -> Result<(), CacheError> {
    if is_single_segment(owner_id) {
        Ok(())
    } else {
        Err(CacheError::InvalidOwner {
            owner: owner_id.to_string(),
        })
    }
}

/// True for exactly one `Component::Normal` with no separators.
fn is_single_segment(value: &str) -> bool {
    if value.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(value).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Splits a raw blob file into header and payload and validates both.
fn decode_blob(path: &Path, raw: &[u8]) -> Result<Vec<u8>, CacheError> {
    let invalid = |reason: &str| CacheError::InvalidHeader {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if raw.len() < 4 {
        return Err(invalid("missing header length"));
    }
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&raw[..4]);
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    if raw.len() < 4 + header_len {
        return Err(invalid("truncated header"));
    }

    let (header, _): (BlobHeader, usize) =
        bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
            .map_err(|e| invalid(&e.to_string()))?;

    if header.magic != BLOB_MAGIC {
        return Err(invalid("bad magic bytes"));
    }
    if header.format_version != BLOB_FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            path: path.to_path_buf(),
            expected: BLOB_FORMAT_VERSION,
            actual: header.format_version,
        });
    }

    let payload = &raw[4 + header_len..];
    let actual = ContentHash::from_bytes(payload);
    if actual != header.checksum {
        return Err(CacheError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: header.checksum.to_string(),
            actual: actual.to_string(),
        });
    }

    Ok(payload.to_vec())
}
