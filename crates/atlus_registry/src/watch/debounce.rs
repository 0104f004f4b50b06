//! Coalesces bursts of change notifications into one action per path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::trace;

type Action = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct State {
    actions: HashMap<PathBuf, Action>,
    deadlines: HashMap<PathBuf, Instant>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    wake: Condvar,
}

/// Per-path single-slot timers sharing one background thread.
///
/// Each registered path has an action. A [`trigger`](Debouncer::trigger)
/// moves that path's deadline to `now + quiet`; once a deadline passes, the
/// action runs once on the timer thread. Actions run one at a time and
/// outside the internal lock, so an action may trigger or register paths.
/// Dropping the debouncer stops the thread; pending actions do not fire.
pub struct Debouncer {
    shared: Arc<Shared>,
    quiet: Duration,
    worker: Option<JoinHandle<()>>,
}

impl Debouncer {
    /// Starts the timer thread. `quiet` applies to every path.
    pub fn new(quiet: Duration) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            wake: Condvar::new(),
        });
        let worker = {
            let shared = shared.clone();
            thread::Builder::new()
                .name("atlus-debounce".to_string())
                .spawn(move || run(&shared))?
        };
        Ok(Self {
            shared,
            quiet,
            worker: Some(worker),
        })
    }

    /// Sets the action for `path`, replacing an earlier one and dropping its
    /// pending deadline.
    pub fn register<F>(&self, path: PathBuf, action: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut state = self.shared.state.lock();
        state.deadlines.remove(&path);
        state.actions.insert(path, Arc::new(action));
    }

    /// Forgets `path`. An action already running is not interrupted.
    pub fn remove(&self, path: &Path) -> bool {
        let mut state = self.shared.state.lock();
        state.deadlines.remove(path);
        state.actions.remove(path).is_some()
    }

    /// Restarts the quiet period of `path`.
    ///
    /// Returns `false` if no action is registered for it.
    pub fn trigger(&self, path: &Path) -> bool {
        let mut state = self.shared.state.lock();
        if !state.actions.contains_key(path) {
            return false;
        }
        state
            .deadlines
            .insert(path.to_path_buf(), Instant::now() + self.quiet);
        self.shared.wake.notify_one();
        true
    }

    /// Number of registered paths.
    pub fn len(&self) -> usize {
        self.shared.state.lock().actions.len()
    }

    /// Returns `true` if no path is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured quiet period.
    pub fn quiet(&self) -> Duration {
        self.quiet
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.wake.notify_one();
        if let Some(worker) = self.worker.take() {
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("quiet", &self.quiet)
            .field("paths", &self.len())
            .finish_non_exhaustive()
    }
}

fn run(shared: &Shared) {
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            return;
        }

        let now = Instant::now();
        let due: Vec<Action> = take_due(&mut state, now);
        if !due.is_empty() {
            MutexGuard::unlocked(&mut state, || {
                for action in due {
                    action();
                }
            });
            continue;
        }

        match state.deadlines.values().min().copied() {
            Some(next) => {
                shared.wake.wait_until(&mut state, next);
            }
            None => shared.wake.wait(&mut state),
        }
    }
}

/// Removes every elapsed deadline and returns the actions to run.
fn take_due(state: &mut State, now: Instant) -> Vec<Action> {
    let elapsed: Vec<PathBuf> = state
        .deadlines
        .iter()
        .filter(|(_, deadline)| **deadline <= now)
        .map(|(path, _)| path.clone())
        .collect();
    elapsed
        .into_iter()
        .filter_map(|path| {
            state.deadlines.remove(&path);
            trace!(path = %path.display(), "debounce period elapsed");
            state.actions.get(&path).cloned()
        })
        .collect()
}
