//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Most cache operations are fail-safe: errors result in cache misses
/// rather than hard failures. This enum is used for internal error
/// propagation and for logging why an entry was dropped.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The cache index could not be parsed as valid JSON.
    #[error("failed to parse cache index: {reason}")]
    IndexParse {
        /// Description of the parse failure.
        reason: String,
    },

    /// A blob file has an invalid or missing header.
    #[error("invalid blob header in {path}: {reason}")]
    InvalidHeader {
        /// The blob file path.
        path: PathBuf,
        /// Description of the header problem.
        reason: String,
    },

    /// The stored checksum does not match the computed checksum of the payload.
    #[error("checksum mismatch in {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The blob file path.
        path: PathBuf,
        /// The expected checksum from the header.
        expected: String,
        /// The actual checksum computed from the payload.
        actual: String,
    },

    /// The blob format version does not match the current version.
    #[error("version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The blob file path.
        path: PathBuf,
        /// The expected format version.
        expected: u32,
        /// The actual format version found in the file.
        actual: u32,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// A source file handed to the cache does not live under its owner's root.
    #[error("source {path} is outside the asset root {root}")]
    SourceOutsideRoot {
        /// The source file path.
        path: PathBuf,
        /// The owner's asset root.
        root: PathBuf,
    },

    /// An owner id that is not a single plain directory name.
    #[error("invalid cache owner id {owner:?}")]
    InvalidOwner {
        /// The rejected owner id.
        owner: String,
    },

    /// A blob name that is not a single plain file name.
    #[error("invalid blob name {name:?}")]
    InvalidBlobName {
        /// The rejected blob name.
        name: String,
    },
}
