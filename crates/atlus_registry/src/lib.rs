//! Script asset registry: ingestion, compilation, lookup and hot reload.
//!
//! An [`AssetRegistry`] walks mod asset folders, turns every `.msg` and
//! `.flow` file into an [`AssetContainer`], compiles it through the
//! [`AssetCompiler`] (or loads it from the [`CacheStore`](atlus_cache::CacheStore)),
//! and answers lookups by `(mode, name, locale)` with a two-tier fallback
//! from the requested locale to universal assets. Watched sources are
//! recompiled after a debounce period when they change on disk.

#![warn(missing_docs)]

pub mod compiler;
pub mod container;
pub mod error;
pub mod registry;
pub mod source;
pub mod walk;
pub mod watch;

pub use compiler::{AssetCompiler, CompileError, CompilerOptions, ScriptCompiler};
pub use container::{AssetContainer, AssetState, CacheBinding, SyncOutcome};
pub use error::RegistryError;
pub use registry::{AssetRegistry, RegistrationReport, RegistryOptions};
pub use source::Source;
pub use walk::{DiscoveredAsset, Layout};
pub use watch::{Debouncer, HotReload};
