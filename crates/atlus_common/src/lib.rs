//! Shared foundational types for script asset resolution.
//!
//! This crate provides the identifier model (locales, content modes, asset
//! kinds and the composite lookup key) and the content hash used for cache
//! blob naming and payload integrity checks.

#![warn(missing_docs)]

pub mod hash;
pub mod identifier;
pub mod kind;
pub mod locale;
pub mod mode;

pub use hash::ContentHash;
pub use identifier::AssetIdentifier;
pub use kind::AssetKind;
pub use locale::Locale;
pub use mode::ContentMode;
