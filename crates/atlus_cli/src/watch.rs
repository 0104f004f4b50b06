//! `atlus watch`: keep a mod's assets compiled while editing.

use atlus_config::AtlusConfig;

use crate::pipeline::{open_registry, register};
use crate::{GlobalArgs, WatchArgs};

/// Runs the `atlus watch` command.
///
/// Registers the mod with hot reload enabled and blocks; edited sources are
/// recompiled and written through to the cache until the process is killed.
pub fn run(
    args: &WatchArgs,
    global: &GlobalArgs,
    config: &AtlusConfig,
) -> Result<i32, Box<dyn std::error::Error>> {
    if !config.hot_reload.enabled {
        return Err("hot reload is disabled in the configuration".into());
    }

    let registry = open_registry(config, true)?;
    let report = register(&registry, &args.mod_dir, args.owner.as_deref(), global)?;
    if report.registered == 0 {
        eprintln!("error: nothing to watch in {}", args.mod_dir);
        return Ok(1);
    }

    if !global.quiet {
        eprintln!(
            "  Watching {} asset(s), press Ctrl-C to stop",
            registry.len()
        );
    }
    loop {
        std::thread::park();
    }
}
