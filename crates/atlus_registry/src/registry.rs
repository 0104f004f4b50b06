//! The asset registry: ingestion and lookup.

use std::collections::HashMap;
use std::fmt;
use std::ops::AddAssign;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use atlus_cache::{CacheStore, CachedAsset};
use atlus_common::{AssetIdentifier, AssetKind, ContentMode, Locale};
use atlus_config::AtlusConfig;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::compiler::AssetCompiler;
use crate::container::{AssetContainer, CacheBinding, SyncOutcome};
use crate::error::RegistryError;
use crate::source::Source;
use crate::walk::{discover, DiscoveredAsset, Layout};
use crate::watch::HotReload;

/// Behavior switches for an [`AssetRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Folder inside a mod directory holding its script assets.
    pub assets_dir: String,
    /// Folder name marking variant content.
    pub variant_dir: String,
    /// Locale forced onto every lookup; [`Locale::Disabled`] keeps the
    /// requested one.
    pub locale_override: Locale,
    /// Whether file-backed assets are recompiled when their source changes.
    pub hot_reload: bool,
    /// Quiet period before a changed source is recompiled.
    pub debounce: Duration,
}

impl From<&AtlusConfig> for RegistryOptions {
    fn from(config: &AtlusConfig) -> Self {
        Self {
            assets_dir: config.assets.dir_name.clone(),
            variant_dir: config.assets.variant_dir.clone(),
            locale_override: config.assets.locale_override,
            hot_reload: config.hot_reload.enabled,
            debounce: config.hot_reload.debounce(),
        }
    }
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self::from(&AtlusConfig::default())
    }
}

/// Counts from one registration call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationReport {
    /// Source files registered as assets.
    pub registered: usize,
    /// Assets compiled from source.
    pub compiled: usize,
    /// Assets loaded from the cache without compiling.
    pub cached: usize,
    /// Assets whose source could not be read or compiled.
    pub failed: usize,
}

impl AddAssign for RegistrationReport {
    fn add_assign(&mut self, other: Self) {
        self.registered += other.registered;
        self.compiled += other.compiled;
        self.cached += other.cached;
        self.failed += other.failed;
    }
}

impl fmt::Display for RegistrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} registered ({} compiled, {} cached, {} failed)",
            self.registered, self.compiled, self.cached, self.failed
        )
    }
}

/// Holds every registered asset and answers lookups.
///
/// Assets are keyed by [`AssetIdentifier`]. A lookup first tries the
/// requested locale with the exact mode, then falls back to universal assets
/// published for that mode or for [`ContentMode::Both`]. Registering an
/// identifier twice keeps the later asset.
pub struct AssetRegistry {
    compiler: AssetCompiler,
    cache: Option<Arc<CacheStore>>,
    options: RegistryOptions,
    assets: RwLock<HashMap<AssetIdentifier, Arc<AssetContainer>>>,
    hot_reload: Option<HotReload>,
}

impl AssetRegistry {
    /// Creates an empty registry.
    ///
    /// Fails only if hot reload is enabled and the file watcher cannot be
    /// created.
    pub fn new(
        compiler: AssetCompiler,
        cache: Option<Arc<CacheStore>>,
        options: RegistryOptions,
    ) -> Result<Self, RegistryError> {
        let hot_reload = if options.hot_reload {
            Some(HotReload::new(options.debounce)?)
        } else {
            None
        };
        Ok(Self {
            compiler,
            cache,
            options,
            assets: RwLock::new(HashMap::new()),
            hot_reload,
        })
    }

    /// The options this registry was created with.
    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// The compiled-asset cache, if any.
    pub fn cache(&self) -> Option<&Arc<CacheStore>> {
        self.cache.as_ref()
    }

    /// Registers a mod's assets folder, if it has one, with caching under
    /// `mod_id`.
    pub fn register_mod(&self, mod_id: &str, mod_dir: &Path) -> RegistrationReport {
        let assets = mod_dir.join(&self.options.assets_dir);
        if !assets.is_dir() {
            debug!(owner = mod_id, dir = %mod_dir.display(), "mod has no script assets");
            return RegistrationReport::default();
        }
        self.register_folder_for_owner(&assets, mod_id, ContentMode::Default)
    }

    /// Registers every script under `path` with one locale and mode, without
    /// caching.
    pub fn register_folder(&self, path: &Path, mode: ContentMode, locale: Locale) -> RegistrationReport {
        if locale == Locale::Disabled {
            warn!(dir = %path.display(), "cannot register assets under the disabled locale");
            return RegistrationReport::default();
        }
        self.ingest(path, &Layout::Explicit { locale, mode }, None)
    }

    /// Registers every script under `path` for `owner_id`, inferring locale
    /// and mode from the folder layout and reusing cached compilations.
    pub fn register_folder_for_owner(
        &self,
        path: &Path,
        owner_id: &str,
        mode: ContentMode,
    ) -> RegistrationReport {
        let layout = Layout::Inferred {
            variant_dir: &self.options.variant_dir,
            base_mode: mode,
        };
        self.ingest(path, &layout, Some(owner_id))
    }

    /// Registers and compiles an in-memory script as a universal asset.
    pub fn add_asset(&self, name: &str, text: &str, kind: AssetKind, mode: ContentMode) -> SyncOutcome {
        let container = Arc::new(AssetContainer::new(
            name,
            kind,
            Locale::Universal,
            mode,
            Source::InMemory(Arc::from(text)),
        ));
        let outcome = container.sync(&self.compiler);
        self.insert(container);
        outcome
    }

    /// Looks up compiled bytes, applying the configured locale override.
    pub fn try_get_asset(&self, mode: ContentMode, name: &str, locale: Locale) -> Option<Bytes> {
        let locale = match self.options.locale_override {
            Locale::Disabled => locale,
            forced => forced,
        };
        self.resolve(locale, mode, name)
    }

    /// Looks up compiled bytes for `name` in `locale` and `mode`.
    ///
    /// Containers that never compiled successfully count as absent.
    pub fn resolve(&self, locale: Locale, mode: ContentMode, name: &str) -> Option<Bytes> {
        if !mode.is_queryable() || locale == Locale::Disabled {
            debug!(%locale, %mode, asset = name, "unsupported lookup");
            return None;
        }

        let assets = self.assets.read();
        let compiled = |locale, mode| {
            assets
                .get(&AssetIdentifier::new(name, locale, mode))
                .and_then(|container| container.compiled())
        };

        compiled(locale, mode)
            .or_else(|| compiled(Locale::Universal, mode))
            .or_else(|| compiled(Locale::Universal, ContentMode::Both))
    }

    /// Schedules a recompile of the asset backed by `path`.
    ///
    /// Returns `false` if hot reload is off or no asset is backed by `path`.
    pub fn notify_changed(&self, path: &Path) -> bool {
        let Some(hot_reload) = &self.hot_reload else {
            return false;
        };
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        hot_reload.notify(&path)
    }

    /// The container registered under `identifier`.
    pub fn container(&self, identifier: &AssetIdentifier) -> Option<Arc<AssetContainer>> {
        self.assets.read().get(identifier).cloned()
    }

    /// Every registered identifier, sorted.
    pub fn identifiers(&self) -> Vec<AssetIdentifier> {
        let mut identifiers: Vec<_> = self.assets.read().keys().cloned().collect();
        identifiers.sort();
        identifiers
    }

    /// Number of registered assets.
    pub fn len(&self) -> usize {
        self.assets.read().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.assets.read().is_empty()
    }

    fn ingest(&self, path: &Path, layout: &Layout<'_>, owner_id: Option<&str>) -> RegistrationReport {
        let mut report = RegistrationReport::default();
        let root = match path.canonicalize() {
            Ok(root) => root,
            Err(e) => {
                warn!(dir = %path.display(), error = %e, "cannot register asset folder");
                return report;
            }
        };

        let binding = match (owner_id, &self.cache) {
            (Some(owner_id), Some(store)) => match atlus_cache::validate_owner_id(owner_id) {
                Ok(()) => Some(CacheBinding {
                    store: store.clone(),
                    owner_id: owner_id.to_string(),
                    source_root: root.clone(),
                }),
                Err(e) => {
                    warn!(dir = %root.display(), error = %e, "registering without the cache");
                    None
                }
            },
            _ => None,
        };
        let mut hits = match &binding {
            Some(binding) => binding.store.load_owner(&binding.owner_id, &root),
            None => HashMap::new(),
        };

        if let Some(hot_reload) = &self.hot_reload {
            if let Err(e) = hot_reload.watch_root(&root) {
                warn!(dir = %root.display(), error = %e, "cannot watch asset folder");
            }
        }

        for asset in discover(&root, layout) {
            report.registered += 1;
            let mut container = AssetContainer::new(
                &asset.name,
                asset.kind,
                asset.locale,
                asset.mode,
                Source::FileBacked(asset.path.clone()),
            );
            if let Some(binding) = &binding {
                container = container.with_cache(binding.clone());
            }
            let container = Arc::new(container);
            // Inserted before the first sync so a replaced asset is retired
            // before this one writes its cache row.
            self.insert(container.clone());

            match take_hit(&mut hits, &container.identifier(), &asset) {
                Some(hit) => {
                    container.load_cached(Bytes::from(hit.bytes));
                    report.cached += 1;
                }
                None => match container.sync(&self.compiler) {
                    SyncOutcome::Compiled => report.compiled += 1,
                    SyncOutcome::Failed => report.failed += 1,
                },
            }
        }

        info!(
            dir = %root.display(),
            owner = owner_id.unwrap_or("-"),
            registered = report.registered,
            compiled = report.compiled,
            cached = report.cached,
            failed = report.failed,
            "registered asset folder"
        );
        report
    }

    /// Adds `container`, replacing any asset with the same identifier.
    fn insert(&self, container: Arc<AssetContainer>) {
        let identifier = container.identifier();
        let previous = self
            .assets
            .write()
            .insert(identifier.clone(), container.clone());

        if let Some(previous) = previous {
            previous.retire();
            warn!(
                asset = %identifier,
                replaced = %previous.source(),
                by = %container.source(),
                "asset registered twice, keeping the later one"
            );
            if let (Some(hot_reload), Some(old)) = (&self.hot_reload, previous.source().path()) {
                if container.source().path() != Some(old) {
                    hot_reload.unwatch_file(old);
                }
            }
        }

        if let (Some(hot_reload), Some(path)) = (&self.hot_reload, container.source().path()) {
            let compiler = self.compiler.clone();
            let target = container.clone();
            let action = move || {
                debug!(asset = %target.name(), "source changed, recompiling");
                target.sync(&compiler);
            };
            hot_reload.watch_file(path, action);
        }
    }
}

impl fmt::Debug for AssetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetRegistry")
            .field("assets", &self.len())
            .field("options", &self.options)
            .field("cache", &self.cache.as_ref().map(|c| c.root().to_path_buf()))
            .field("hot_reload", &self.hot_reload)
            .finish_non_exhaustive()
    }
}

/// Takes the cached compilation for `identifier` if it came from the same
/// source file and kind as the discovered asset.
fn take_hit(
    hits: &mut HashMap<AssetIdentifier, CachedAsset>,
    identifier: &AssetIdentifier,
    asset: &DiscoveredAsset,
) -> Option<CachedAsset> {
    let matches = hits
        .get(identifier)
        .is_some_and(|hit| hit.kind == asset.kind && same_file(&hit.source_path, &asset.path));
    if matches {
        hits.remove(identifier)
    } else {
        None
    }
}

fn same_file(cached: &Path, discovered: &Path) -> bool {
    cached == discovered || cached.canonicalize().is_ok_and(|cached| cached == discovered)
}
