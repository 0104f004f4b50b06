//! End-to-end behavior of the registry with a real cache directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use atlus_cache::{CacheIndex, CacheStore};
use atlus_common::{AssetIdentifier, AssetKind, ContentMode, Locale};
use atlus_registry::{
    AssetCompiler, AssetRegistry, AssetState, CompileError, CompilerOptions, RegistryOptions,
    ScriptCompiler,
};
use bytes::Bytes;
use chrono::Utc;

const DEBOUNCE: Duration = Duration::from_millis(100);

/// Tags the text with its kind and counts every call.
#[derive(Clone, Default)]
struct Counting {
    calls: Arc<AtomicUsize>,
}

impl ScriptCompiler for Counting {
    fn compile(
        &self,
        kind: AssetKind,
        name: &str,
        text: &str,
        _options: &CompilerOptions,
    ) -> Result<Bytes, CompileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("syntax error") {
            return Err(CompileError::new(format!("{name}: syntax error")));
        }
        Ok(Bytes::from(format!("{kind}:{text}")))
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    mod_root: PathBuf,
    cache_root: PathBuf,
    compiler: Counting,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mod_root = dir.path().join("mods").join("a");
        let cache_root = dir.path().join("cache");
        fs::create_dir_all(&mod_root).unwrap();
        Self {
            _dir: dir,
            mod_root,
            cache_root,
            compiler: Counting::default(),
        }
    }

    fn write(&self, rel: &str, text: &str) -> PathBuf {
        let path = self.mod_root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    fn registry(&self, hot_reload: bool) -> AssetRegistry {
        let store = CacheStore::open(&self.cache_root, CacheStore::DEFAULT_EXPIRATION);
        AssetRegistry::new(
            AssetCompiler::new(self.compiler.clone()),
            Some(Arc::new(store)),
            RegistryOptions {
                hot_reload,
                debounce: DEBOUNCE,
                ..RegistryOptions::default()
            },
        )
        .unwrap()
    }

    fn calls(&self) -> usize {
        self.compiler.calls.load(Ordering::SeqCst)
    }

    fn edit_index(&self, edit: impl FnOnce(&mut CacheIndex)) {
        let mut index = CacheIndex::load(&self.cache_root).unwrap().unwrap();
        edit(&mut index);
        index.save(&self.cache_root).unwrap();
    }
}

fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    done()
}

fn bump_mtime(path: &Path) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(3600))
        .unwrap();
}

#[test]
fn locale_bucket_then_universal_fallback() {
    let fx = Fixture::new();
    fx.write("en/greeting.msg", "B1");
    fx.write("greeting.flow", "B2");
    let registry = fx.registry(false);
    registry.register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);

    assert_eq!(
        registry.resolve(Locale::En, ContentMode::Default, "greeting").unwrap(),
        Bytes::from_static(b"message:B1")
    );
    assert_eq!(
        registry.resolve(Locale::Fr, ContentMode::Default, "greeting").unwrap(),
        Bytes::from_static(b"flow:B2")
    );
    assert_eq!(
        registry.try_get_asset(ContentMode::Default, "GREETING", Locale::Ja).unwrap(),
        Bytes::from_static(b"flow:B2")
    );
    assert!(registry.resolve(Locale::En, ContentMode::Variant, "greeting").is_none());
}

#[test]
fn universal_both_serves_every_mode() {
    let fx = Fixture::new();
    fx.write("shared.flow", "shared");
    let registry = fx.registry(false);
    registry.register_folder(&fx.mod_root, ContentMode::Both, Locale::Universal);

    for mode in [ContentMode::Default, ContentMode::Variant] {
        assert_eq!(
            registry.resolve(Locale::Ko, mode, "shared").unwrap(),
            Bytes::from_static(b"flow:shared")
        );
    }
}

#[test]
fn variant_folder_registers_variant_assets() {
    let fx = Fixture::new();
    fx.write("astrea/en/title.msg", "variant");
    fx.write("en/title.msg", "default");
    let registry = fx.registry(false);
    registry.register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);

    assert_eq!(
        registry.resolve(Locale::En, ContentMode::Variant, "title").unwrap(),
        Bytes::from_static(b"message:variant")
    );
    assert_eq!(
        registry.resolve(Locale::En, ContentMode::Default, "title").unwrap(),
        Bytes::from_static(b"message:default")
    );
}

#[test]
fn cold_start_loads_without_compiling() {
    let fx = Fixture::new();
    fx.write("en/greeting.msg", "B1");
    fx.write("field.flow", "B2");

    let first = fx.registry(false);
    let report = first.register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);
    assert_eq!((report.compiled, report.cached), (2, 0));
    assert_eq!(fx.calls(), 2);
    let before: Vec<_> = first
        .identifiers()
        .iter()
        .map(|id| first.container(id).unwrap().compiled())
        .collect();
    drop(first);

    let second = fx.registry(false);
    let report = second.register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);
    assert_eq!((report.registered, report.compiled, report.cached), (2, 0, 2));
    assert_eq!(fx.calls(), 2);
    let after: Vec<_> = second
        .identifiers()
        .iter()
        .map(|id| second.container(id).unwrap().compiled())
        .collect();
    assert_eq!(before, after);
}

#[test]
fn reregistering_only_touches_access_time() {
    let fx = Fixture::new();
    fx.write("en/greeting.msg", "B1");

    fx.registry(false)
        .register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);
    let mut first = CacheIndex::load(&fx.cache_root).unwrap().unwrap();

    fx.registry(false)
        .register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);
    let mut second = CacheIndex::load(&fx.cache_root).unwrap().unwrap();

    for index in [&mut first, &mut second] {
        for entry in index.entries_by_owner.values_mut().flatten() {
            entry.last_accessed = chrono::DateTime::<Utc>::UNIX_EPOCH;
        }
    }
    assert_eq!(first.entries("mod.a"), second.entries("mod.a"));
}

#[test]
fn newer_source_is_recompiled() {
    let fx = Fixture::new();
    let stale = fx.write("en/greeting.msg", "B1");
    fx.write("field.flow", "B2");
    fx.registry(false)
        .register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);
    assert_eq!(fx.calls(), 2);

    bump_mtime(&stale);
    let registry = fx.registry(false);
    let report = registry.register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);
    assert_eq!((report.compiled, report.cached), (1, 1));
    assert_eq!(fx.calls(), 3);
}

#[test]
fn expired_entry_is_recompiled() {
    let fx = Fixture::new();
    fx.write("field.flow", "B2");
    fx.write("event.flow", "B3");
    fx.registry(false)
        .register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);

    fx.edit_index(|index| {
        let entries = index.entries_by_owner.get_mut("mod.a").unwrap();
        let field = entries.iter_mut().find(|e| e.name == "field").unwrap();
        field.last_accessed = Utc::now() - chrono::Duration::days(29);
    });

    let registry = fx.registry(false);
    let report = registry.register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);
    assert_eq!((report.compiled, report.cached), (1, 1));

    let index = registry.cache().unwrap().index();
    let field = index
        .entries("mod.a")
        .iter()
        .find(|e| e.name == "field")
        .unwrap();
    assert!(Utc::now() - field.last_accessed < chrono::Duration::minutes(5));
}

#[test]
fn duplicate_index_rows_drop_owner_cache() {
    let fx = Fixture::new();
    fx.write("en/greeting.msg", "B1");
    fx.write("field.flow", "B2");
    fx.registry(false)
        .register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);

    fx.edit_index(|index| {
        let entries = index.entries_by_owner.get_mut("mod.a").unwrap();
        let copy = entries[0].clone();
        entries.push(copy);
    });

    let registry = fx.registry(false);
    let report = registry.register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);
    assert_eq!((report.compiled, report.cached), (2, 0));
    assert_eq!(registry.cache().unwrap().index().entries("mod.a").len(), 2);
}

#[test]
fn later_registration_wins() {
    let fx = Fixture::new();
    let early = tempfile::tempdir().unwrap();
    let late = tempfile::tempdir().unwrap();
    fs::write(early.path().join("line.msg"), "first").unwrap();
    fs::write(late.path().join("line.msg"), "second").unwrap();

    let registry = fx.registry(false);
    registry.register_folder(early.path(), ContentMode::Default, Locale::En);
    registry.register_folder(late.path(), ContentMode::Default, Locale::En);

    assert_eq!(registry.len(), 1);
    assert_eq!(
        registry.resolve(Locale::En, ContentMode::Default, "line").unwrap(),
        Bytes::from_static(b"message:second")
    );
}

#[test]
fn replaced_asset_stops_writing_its_cache_row() {
    let fx = Fixture::new();
    let path = fx.write("en/line.msg", "first");
    let registry = fx.registry(false);
    registry.register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);
    let id = AssetIdentifier::new("line", Locale::En, ContentMode::Default);
    let replaced = registry.container(&id).unwrap();

    registry.register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);
    let current = registry.container(&id).unwrap();
    assert!(replaced.is_retired());
    assert!(!current.is_retired());
    let rows = registry.cache().unwrap().index().entries("mod.a").to_vec();

    // A recompile of the replaced container still in flight must not
    // overwrite the row of the one that replaced it.
    fs::write(&path, "second").unwrap();
    bump_mtime(&path);
    replaced.sync(&AssetCompiler::new(fx.compiler.clone()));
    assert_eq!(registry.cache().unwrap().index().entries("mod.a"), rows.as_slice());
    assert_eq!(
        registry.resolve(Locale::En, ContentMode::Default, "line").unwrap(),
        Bytes::from_static(b"message:first")
    );
}

#[test]
fn unsafe_owner_ids_register_without_cache() {
    let fx = Fixture::new();
    fx.write("greeting.msg", "hello");
    let sibling = fx.cache_root.parent().unwrap().join("precious.txt");
    fs::write(&sibling, "keep").unwrap();
    let registry = fx.registry(false);

    for owner in ["", ".", "..", "a/b"] {
        let report = registry.register_folder_for_owner(&fx.mod_root, owner, ContentMode::Default);
        assert_eq!(report.registered, 1, "owner {owner:?}");
        assert_eq!(report.compiled, 1, "owner {owner:?}");
        assert!(registry.resolve(Locale::En, ContentMode::Default, "greeting").is_some());
    }

    assert!(sibling.exists());
    assert!(fx.mod_root.join("greeting.msg").exists());
    assert!(registry.cache().unwrap().index().entries_by_owner.is_empty());
}

#[test]
fn in_memory_assets_are_universal_and_uncached() {
    let fx = Fixture::new();
    let registry = fx.registry(false);
    registry.add_asset("Banner", "hello", AssetKind::Message, ContentMode::Default);

    let id = AssetIdentifier::new("banner", Locale::Universal, ContentMode::Default);
    assert_eq!(registry.identifiers(), vec![id]);
    assert!(registry.cache().unwrap().index().entries_by_owner.is_empty());
}

#[test]
fn burst_of_changes_recompiles_once() {
    let fx = Fixture::new();
    let path = fx.write("en/greeting.msg", "B1");
    let registry = fx.registry(true);
    registry.register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);
    assert_eq!(fx.calls(), 1);

    for _ in 0..5 {
        assert!(registry.notify_changed(&path));
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(wait_until(|| fx.calls() == 2));
    std::thread::sleep(DEBOUNCE * 4);
    assert_eq!(fx.calls(), 2);
}

#[test]
fn edited_source_is_hot_reloaded() {
    let fx = Fixture::new();
    let path = fx.write("en/greeting.msg", "B1");
    let registry = fx.registry(true);
    registry.register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);

    fs::write(&path, "B1 edited").unwrap();
    registry.notify_changed(&path);
    let expected = Bytes::from_static(b"message:B1 edited");
    assert!(wait_until(|| {
        registry.resolve(Locale::En, ContentMode::Default, "greeting") == Some(expected.clone())
    }));
    // The cache write follows the payload swap.
    assert!(wait_until(|| {
        CacheIndex::load(&fx.cache_root)
            .ok()
            .flatten()
            .is_some_and(|index| index.entries("mod.a").iter().all(|e| e.is_fresh(&fx.mod_root)))
    }));
    drop(registry);

    let cold = fx.registry(false);
    let report = cold.register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);
    assert_eq!(report.cached, 1);
    assert_eq!(
        cold.resolve(Locale::En, ContentMode::Default, "greeting"),
        Some(expected)
    );
}

#[test]
fn failed_recompile_keeps_previous_bytes() {
    let fx = Fixture::new();
    let path = fx.write("en/greeting.msg", "B1");
    let registry = fx.registry(true);
    registry.register_folder_for_owner(&fx.mod_root, "mod.a", ContentMode::Default);
    let id = AssetIdentifier::new("greeting", Locale::En, ContentMode::Default);
    let container = registry.container(&id).unwrap();

    fs::write(&path, "syntax error").unwrap();
    registry.notify_changed(&path);
    assert!(wait_until(|| container.state() == AssetState::Failed));
    assert_eq!(
        registry.resolve(Locale::En, ContentMode::Default, "greeting").unwrap(),
        Bytes::from_static(b"message:B1")
    );
}
