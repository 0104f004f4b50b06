//! Hot reload of registered script sources.
//!
//! One recursive [`notify`] watcher covers every registered asset root.
//! Create and modify events for known source files restart that file's timer
//! in a shared [`Debouncer`], which runs the recompile action once the file
//! has been quiet for the configured period.

mod debounce;

pub use debounce::Debouncer;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::error::RegistryError;

/// Routes file-system change events to per-file debounced actions.
pub struct HotReload {
    watcher: Mutex<RecommendedWatcher>,
    roots: Mutex<Vec<PathBuf>>,
    debouncer: Arc<Debouncer>,
}

impl HotReload {
    /// Creates the watcher. `quiet` is the debounce period for every file.
    pub fn new(quiet: Duration) -> Result<Self, RegistryError> {
        let debouncer = Arc::new(Debouncer::new(quiet).map_err(RegistryError::Timer)?);
        let handler = debouncer.clone();
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => route_event(&handler, &event),
                Err(e) => warn!(error = %e, "file watcher error"),
            },
            Config::default(),
        )?;

        Ok(Self {
            watcher: Mutex::new(watcher),
            roots: Mutex::new(Vec::new()),
            debouncer,
        })
    }

    /// Watches `root` recursively. Watching the same root twice is a no-op.
    pub fn watch_root(&self, root: &Path) -> Result<(), RegistryError> {
        let mut roots = self.roots.lock();
        if roots.iter().any(|r| r == root) {
            return Ok(());
        }
        self.watcher.lock().watch(root, RecursiveMode::Recursive)?;
        roots.push(root.to_path_buf());
        debug!(root = %root.display(), "watching asset root");
        Ok(())
    }

    /// Runs `action` after changes to `path` settle, replacing any earlier
    /// action for the same path.
    pub fn watch_file<F>(&self, path: &Path, action: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.debouncer.register(path.to_path_buf(), action);
    }

    /// Stops reacting to changes of `path`.
    pub fn unwatch_file(&self, path: &Path) {
        self.debouncer.remove(path);
    }

    /// Reports a change of `path` as if the watcher had seen it.
    ///
    /// Returns `false` if no action is registered for the path.
    pub fn notify(&self, path: &Path) -> bool {
        self.debouncer.trigger(path)
    }

    /// Number of files with a registered action.
    pub fn watched_files(&self) -> usize {
        self.debouncer.len()
    }
}

impl std::fmt::Debug for HotReload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotReload")
            .field("roots", &*self.roots.lock())
            .field("watched_files", &self.watched_files())
            .field("quiet", &self.debouncer.quiet())
            .finish_non_exhaustive()
    }
}

fn route_event(debouncer: &Debouncer, event: &Event) {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return;
    }
    for path in &event.paths {
        if debouncer.trigger(path) {
            trace!(path = %path.display(), "source changed");
        }
    }
}
