//! Error types for registry construction.

/// Errors raised while setting up a registry.
///
/// Per-asset problems (unreadable sources, compile failures, cache misses)
/// never surface here; they are logged and recovered locally.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The file watcher could not be created or attached.
    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// The debounce timer thread could not be started.
    #[error("cannot start the debounce timer: {0}")]
    Timer(#[source] std::io::Error),
}
