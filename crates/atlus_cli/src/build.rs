//! `atlus build`: compile a mod's script assets into the cache.
//!
//! Registers the mod's assets folder under its owner id. Assets whose cached
//! compilation is still valid are loaded; everything else goes through the
//! external compiler and is written back to the cache.

use atlus_config::AtlusConfig;

use crate::pipeline::{open_registry, register};
use crate::{BuildArgs, GlobalArgs};

/// Runs the `atlus build` command.
///
/// Returns exit code 0 if every asset compiled or loaded, 1 if any failed.
pub fn run(
    args: &BuildArgs,
    global: &GlobalArgs,
    config: &AtlusConfig,
) -> Result<i32, Box<dyn std::error::Error>> {
    let registry = open_registry(config, false)?;
    let report = register(&registry, &args.mod_dir, args.owner.as_deref(), global)?;

    if !global.quiet {
        eprintln!(
            "    Cache {} ({} loaded, {} compiled)",
            config.cache.root.display(),
            report.cached,
            report.compiled
        );
    }

    if report.failed > 0 {
        eprintln!("error: {} asset(s) failed to compile", report.failed);
        Ok(1)
    } else {
        Ok(0)
    }
}
