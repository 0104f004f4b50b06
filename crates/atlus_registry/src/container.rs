//! One logical asset and its compiled payload.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use atlus_cache::{CacheRecord, CacheStore};
use atlus_common::{AssetIdentifier, AssetKind, ContentMode, Locale};
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::compiler::AssetCompiler;
use crate::source::Source;

/// Compilation state of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    /// Never compiled.
    Empty,
    /// A sync is in progress.
    Compiling,
    /// The payload reflects the latest successful compile or cache load.
    Ready,
    /// The last sync failed; any earlier payload is still served.
    Failed,
}

/// Result of one [`AssetContainer::sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The source compiled and the payload was replaced.
    Compiled,
    /// Reading or compiling the source failed; the payload is unchanged.
    Failed,
}

/// Where a file-backed asset's compiled bytes are cached.
#[derive(Clone)]
pub struct CacheBinding {
    /// The shared cache.
    pub store: Arc<CacheStore>,
    /// Owning mod id.
    pub owner_id: String,
    /// The owner's asset root the source lives under.
    pub source_root: PathBuf,
}

/// Owns one asset's source and its current compiled bytes.
///
/// The payload is swapped atomically, so readers see either the previous or
/// the new bytes and never a partial write. Syncs of one container are
/// serialized; different containers sync independently.
///
/// A container replaced in its registry is retired: it keeps compiling if a
/// change notification is already in flight, but no longer writes to the
/// cache, so it cannot overwrite the row of the asset that replaced it.
pub struct AssetContainer {
    name: String,
    kind: AssetKind,
    locale: Locale,
    mode: ContentMode,
    source: Source,
    cache: Option<CacheBinding>,
    compiled: ArcSwapOption<Bytes>,
    state: Mutex<AssetState>,
    sync_lock: Mutex<()>,
    retired: AtomicBool,
}

impl AssetContainer {
    /// Creates an empty container.
    pub fn new(name: &str, kind: AssetKind, locale: Locale, mode: ContentMode, source: Source) -> Self {
        Self {
            name: name.to_string(),
            kind,
            locale,
            mode,
            source,
            cache: None,
            compiled: ArcSwapOption::empty(),
            state: Mutex::new(AssetState::Empty),
            sync_lock: Mutex::new(()),
            retired: AtomicBool::new(false),
        }
    }

    /// Attaches a cache binding; successful syncs are then written through.
    pub fn with_cache(mut self, binding: CacheBinding) -> Self {
        self.cache = Some(binding);
        self
    }

    /// Asset name in its original spelling.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Script kind.
    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    /// Locale bucket.
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Content mode.
    pub fn mode(&self) -> ContentMode {
        self.mode
    }

    /// Where the source text comes from.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// The lookup key.
    pub fn identifier(&self) -> AssetIdentifier {
        AssetIdentifier::new(&self.name, self.locale, self.mode)
    }

    /// Current state.
    pub fn state(&self) -> AssetState {
        *self.state.lock()
    }

    /// The current compiled payload, if any compile or cache load succeeded.
    pub fn compiled(&self) -> Option<Bytes> {
        self.compiled.load_full().map(|bytes| Bytes::clone(&bytes))
    }

    /// Stops cache write-through. Waits for a sync in progress to finish.
    pub fn retire(&self) {
        let _guard = self.sync_lock.lock();
        self.retired.store(true, Ordering::Release);
    }

    /// Whether the container was replaced by another asset.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Installs bytes loaded from the cache without compiling.
    pub fn load_cached(&self, bytes: Bytes) {
        let _guard = self.sync_lock.lock();
        self.compiled.store(Some(Arc::new(bytes)));
        *self.state.lock() = AssetState::Ready;
        debug!(asset = %self.name, "updated data from cache");
    }

    /// Recompiles the source.
    ///
    /// On success the payload is replaced and, for cache-bound containers
    /// that are not retired, written through to the cache. On failure the previous payload stays in
    /// place and the failure is logged.
    pub fn sync(&self, compiler: &AssetCompiler) -> SyncOutcome {
        let _guard = self.sync_lock.lock();
        *self.state.lock() = AssetState::Compiling;

        // Captured before reading so a write during compilation leaves the
        // cache entry stale.
        let modified = self.source.modified();

        let text = match self.source.read_text() {
            Ok(text) => text,
            Err(e) => {
                error!(asset = %self.name, source = %self.source, error = %e, "failed to read source");
                return self.fail();
            }
        };

        let bytes = match compiler.compile(self.kind, &self.name, &text) {
            Ok(bytes) => bytes,
            Err(_) => return self.fail(),
        };

        self.compiled.store(Some(Arc::new(bytes.clone())));
        *self.state.lock() = AssetState::Ready;
        debug!(asset = %self.name, "updated data from source");

        if self.is_retired() {
            debug!(asset = %self.name, "retired, not caching");
            return SyncOutcome::Compiled;
        }
        if let (Some(binding), Some(path), Some(modified)) =
            (&self.cache, self.source.path(), modified)
        {
            let identifier = self.identifier();
            let record = CacheRecord {
                owner_id: &binding.owner_id,
                source_root: &binding.source_root,
                source_path: path,
                identifier: &identifier,
                display_name: &self.name,
                kind: self.kind,
                source_last_modified: modified,
            };
            if let Err(e) = binding.store.store(&record, &bytes) {
                warn!(asset = %self.name, error = %e, "failed to cache compiled asset");
            }
        }

        SyncOutcome::Compiled
    }

    fn fail(&self) -> SyncOutcome {
        *self.state.lock() = AssetState::Failed;
        SyncOutcome::Failed
    }
}

impl std::fmt::Debug for AssetContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetContainer")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("locale", &self.locale)
            .field("mode", &self.mode)
            .field("source", &self.source)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompileError, CompilerOptions, ScriptCompiler};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Prefixes the text; rejects any text containing `!`.
    #[derive(Default)]
    struct Strict {
        calls: AtomicUsize,
    }

    impl ScriptCompiler for Strict {
        fn compile(
            &self,
            _kind: AssetKind,
            _name: &str,
            text: &str,
            _options: &CompilerOptions,
        ) -> Result<Bytes, CompileError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains('!') {
                Err(CompileError::new("bang"))
            } else {
                Ok(Bytes::from(format!("bin:{text}")))
            }
        }
    }

    fn in_memory(text: &str) -> AssetContainer {
        AssetContainer::new(
            "Greeting",
            AssetKind::Message,
            Locale::Universal,
            ContentMode::Default,
            Source::InMemory(Arc::from(text)),
        )
    }

    #[test]
    fn starts_empty() {
        let container = in_memory("hi");
        assert_eq!(container.state(), AssetState::Empty);
        assert!(container.compiled().is_none());
        assert_eq!(
            container.identifier(),
            AssetIdentifier::new("greeting", Locale::Universal, ContentMode::Default)
        );
    }

    #[test]
    fn sync_compiles_source() {
        let compiler = AssetCompiler::new(Strict::default());
        let container = in_memory("hi");
        assert_eq!(container.sync(&compiler), SyncOutcome::Compiled);
        assert_eq!(container.state(), AssetState::Ready);
        assert_eq!(container.compiled().unwrap(), Bytes::from_static(b"bin:hi"));
    }

    #[test]
    fn sync_is_idempotent() {
        let compiler = AssetCompiler::new(Strict::default());
        let container = in_memory("hi");
        container.sync(&compiler);
        let first = container.compiled();
        container.sync(&compiler);
        assert_eq!(container.compiled(), first);
    }

    #[test]
    fn failure_keeps_previous_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greeting.msg");
        std::fs::write(&path, "good").unwrap();
        let compiler = AssetCompiler::new(Strict::default());
        let container = AssetContainer::new(
            "greeting",
            AssetKind::Message,
            Locale::En,
            ContentMode::Default,
            Source::FileBacked(path.clone()),
        );
        assert_eq!(container.sync(&compiler), SyncOutcome::Compiled);

        std::fs::write(&path, "bad!").unwrap();
        assert_eq!(container.sync(&compiler), SyncOutcome::Failed);
        assert_eq!(container.state(), AssetState::Failed);
        assert_eq!(container.compiled().unwrap(), Bytes::from_static(b"bin:good"));
    }

    #[test]
    fn failure_without_payload_stays_absent() {
        let compiler = AssetCompiler::new(Strict::default());
        let container = in_memory("bad!");
        assert_eq!(container.sync(&compiler), SyncOutcome::Failed);
        assert!(container.compiled().is_none());
    }

    #[test]
    fn unreadable_source_fails() {
        let compiler = AssetCompiler::new(Strict::default());
        let container = AssetContainer::new(
            "gone",
            AssetKind::Flow,
            Locale::Universal,
            ContentMode::Default,
            Source::FileBacked(PathBuf::from("/nonexistent/gone.flow")),
        );
        assert_eq!(container.sync(&compiler), SyncOutcome::Failed);
        assert_eq!(container.state(), AssetState::Failed);
    }

    #[test]
    fn load_cached_installs_bytes() {
        let container = in_memory("hi");
        container.load_cached(Bytes::from_static(b"cached"));
        assert_eq!(container.state(), AssetState::Ready);
        assert_eq!(container.compiled().unwrap(), Bytes::from_static(b"cached"));
    }

    #[test]
    fn sync_writes_through_cache() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("mod");
        std::fs::create_dir_all(root.join("en")).unwrap();
        let path = root.join("en").join("greeting.msg");
        std::fs::write(&path, "hello").unwrap();

        let store = Arc::new(CacheStore::open(
            &dir.path().join("cache"),
            CacheStore::DEFAULT_EXPIRATION,
        ));
        let container = AssetContainer::new(
            "greeting",
            AssetKind::Message,
            Locale::En,
            ContentMode::Default,
            Source::FileBacked(path),
        )
        .with_cache(CacheBinding {
            store: store.clone(),
            owner_id: "mod.a".to_string(),
            source_root: root.clone(),
        });

        let compiler = AssetCompiler::new(Strict::default());
        container.sync(&compiler);

        let hits = store.load_owner("mod.a", &root);
        let hit = &hits[&container.identifier()];
        assert_eq!(hit.bytes, b"bin:hello");
    }

    #[test]
    fn retired_container_stops_writing_through() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("mod");
        std::fs::create_dir_all(&root).unwrap();
        let path = root.join("greeting.msg");
        std::fs::write(&path, "old").unwrap();

        let store = Arc::new(CacheStore::open(
            &dir.path().join("cache"),
            CacheStore::DEFAULT_EXPIRATION,
        ));
        let container = AssetContainer::new(
            "greeting",
            AssetKind::Message,
            Locale::Universal,
            ContentMode::Default,
            Source::FileBacked(path.clone()),
        )
        .with_cache(CacheBinding {
            store: store.clone(),
            owner_id: "mod.a".to_string(),
            source_root: root.clone(),
        });
        let compiler = AssetCompiler::new(Strict::default());
        container.sync(&compiler);

        container.retire();
        assert!(container.is_retired());
        std::fs::write(&path, "new").unwrap();
        assert_eq!(container.sync(&compiler), SyncOutcome::Compiled);
        assert_eq!(container.compiled().unwrap(), Bytes::from_static(b"bin:new"));

        let entries = store.index().entries("mod.a").to_vec();
        assert_eq!(entries.len(), 1);
        let cached = store
            .load_owner("mod.a", &root)
            .remove(&container.identifier());
        // The row written before retiring is either still there or stale;
        // it never carries the retired container's new bytes.
        assert!(cached.map_or(true, |hit| hit.bytes == b"bin:old"));
    }

    #[test]
    fn concurrent_readers_see_whole_payloads() {
        let compiler = AssetCompiler::new(Strict::default());
        let container = Arc::new(in_memory("0123456789"));
        container.sync(&compiler);

        let reader = {
            let container = container.clone();
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    let bytes = container.compiled().unwrap();
                    assert_eq!(&bytes[..], b"bin:0123456789");
                }
            })
        };
        for _ in 0..100 {
            container.sync(&compiler);
        }
        reader.join().unwrap();
    }
}
