//! Shared helpers for CLI commands.
//!
//! Contains the steps every command goes through: locating and loading
//! `atlus.toml`, installing the log subscriber, building a registry backed by
//! the external compiler, and registering one mod directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use atlus_cache::CacheStore;
use atlus_config::{AtlusConfig, CONFIG_FILE};
use atlus_registry::{
    AssetCompiler, AssetRegistry, CompilerOptions, RegistrationReport, RegistryOptions,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::command::CommandCompiler;
use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing `atlus.toml`.
pub fn find_config_dir(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Loads the configuration selected by the global CLI args.
///
/// `--config` may name a file or a directory holding `atlus.toml`. Without
/// it, the nearest `atlus.toml` above the current directory is used; if
/// there is none, defaults apply relative to the current directory.
pub fn load_settings(global: &GlobalArgs) -> Result<AtlusConfig, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        let config = if p.is_dir() {
            atlus_config::load_config(&p)?
        } else {
            atlus_config::load_config_file(&p)?
        };
        return Ok(config);
    }

    let cwd = std::env::current_dir()?;
    let dir = find_config_dir(&cwd).unwrap_or(cwd);
    Ok(atlus_config::load_config(&dir)?)
}

/// Returns the log filter directive for the given flags and configuration.
///
/// `-v` and `-q` take precedence over the configured level.
pub fn log_directive(global: &GlobalArgs, config: &AtlusConfig) -> &'static str {
    if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        config.logging.level.as_directive()
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the level.
pub fn init_logging(global: &GlobalArgs, config: &AtlusConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directive(global, config)));
    // Fails only if a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Builds a registry that compiles through the configured external compiler
/// and caches under the configured cache root.
pub fn open_registry(
    config: &AtlusConfig,
    hot_reload: bool,
) -> Result<AssetRegistry, Box<dyn std::error::Error>> {
    let options = CompilerOptions::from(&config.compiler);
    let compiler = AssetCompiler::new(CommandCompiler::new(&config.compiler)).with_options(options);
    let cache = CacheStore::open(&config.cache.root, config.cache.expiration());
    debug!(
        cache = %config.cache.root.display(),
        compiler = %config.compiler.command,
        hot_reload,
        "opening registry"
    );
    let registry_options = RegistryOptions {
        hot_reload,
        ..RegistryOptions::from(config)
    };
    Ok(AssetRegistry::new(compiler, Some(Arc::new(cache)), registry_options)?)
}

/// The owner id for a mod: the explicit `--owner`, else the directory name.
///
/// The id names the mod's directory in the cache, so it must be a single
/// plain path segment.
pub fn owner_id(mod_dir: &Path, owner: Option<&str>) -> Result<String, Box<dyn std::error::Error>> {
    let owner = match owner {
        Some(owner) => owner.to_string(),
        None => {
            let dir = mod_dir.canonicalize()?;
            dir.file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| format!("cannot derive an owner id from {}", mod_dir.display()))?
        }
    };
    atlus_cache::validate_owner_id(&owner)?;
    Ok(owner)
}

/// Registers one mod directory and prints a summary line.
pub fn register(
    registry: &AssetRegistry,
    mod_dir: &str,
    owner: Option<&str>,
    global: &GlobalArgs,
) -> Result<RegistrationReport, Box<dyn std::error::Error>> {
    let mod_dir = PathBuf::from(mod_dir);
    if !mod_dir.is_dir() {
        return Err(format!("mod directory not found: {}", mod_dir.display()).into());
    }
    let owner = owner_id(&mod_dir, owner)?;

    let assets_dir = mod_dir.join(&registry.options().assets_dir);
    if !assets_dir.is_dir() && !global.quiet {
        eprintln!(
            "warning: no {} folder in {}",
            registry.options().assets_dir,
            mod_dir.display()
        );
    }

    let report = registry.register_mod(&owner, &mod_dir);
    if !global.quiet {
        eprintln!("   Registered {owner}: {report}");
    }
    Ok(report)
}
