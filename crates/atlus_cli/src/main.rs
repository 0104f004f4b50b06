//! Atlus CLI: builds, inspects and hot-reloads script assets of game mods.
//!
//! Provides `atlus build` for compiling a mod's assets into the cache,
//! `atlus get` for resolving one asset to its compiled bytes, `atlus watch`
//! for recompiling assets as their sources change, and `atlus prune` for
//! evicting expired cache entries.

#![warn(missing_docs)]

mod build;
mod command;
mod get;
mod pipeline;
mod prune;
mod watch;

use std::process;

use atlus_common::{ContentMode, Locale};
use clap::{Parser, Subcommand};

/// Atlus: script asset compiler and cache.
#[derive(Parser, Debug)]
#[command(name = "atlus", version, about = "Atlus script asset tools")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `atlus.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a mod's script assets into the cache.
    Build(BuildArgs),
    /// Resolve one asset and write its compiled bytes.
    Get(GetArgs),
    /// Register a mod and recompile its assets as they change.
    Watch(WatchArgs),
    /// Evict expired cache entries.
    Prune,
}

/// Arguments for the `atlus build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Mod directory containing the assets folder.
    pub mod_dir: String,

    /// Owner id for cache attribution (default: the mod directory name).
    #[arg(long)]
    pub owner: Option<String>,
}

/// Arguments for the `atlus get` subcommand.
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Mod directory containing the assets folder.
    pub mod_dir: String,

    /// Asset name (file stem, case-insensitive).
    pub name: String,

    /// Locale to resolve for.
    #[arg(long, value_parser = parse_locale, default_value = "universal")]
    pub locale: Locale,

    /// Content mode to resolve for.
    #[arg(long, value_parser = parse_mode, default_value = "default")]
    pub mode: ContentMode,

    /// Output file (default: stdout).
    #[arg(short, long)]
    pub output: Option<String>,

    /// Owner id for cache attribution (default: the mod directory name).
    #[arg(long)]
    pub owner: Option<String>,
}

/// Arguments for the `atlus watch` subcommand.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Mod directory containing the assets folder.
    pub mod_dir: String,

    /// Owner id for cache attribution (default: the mod directory name).
    #[arg(long)]
    pub owner: Option<String>,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn parse_locale(value: &str) -> Result<Locale, String> {
    Locale::parse(value).ok_or_else(|| format!("unknown locale `{value}`"))
}

fn parse_mode(value: &str) -> Result<ContentMode, String> {
    ContentMode::parse(value).ok_or_else(|| format!("unknown content mode `{value}`"))
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = pipeline::load_settings(&global).and_then(|config| {
        pipeline::init_logging(&global, &config);
        match cli.command {
            Command::Build(ref args) => build::run(args, &global, &config),
            Command::Get(ref args) => get::run(args, &global, &config),
            Command::Watch(ref args) => watch::run(args, &global, &config),
            Command::Prune => prune::run(&global, &config),
        }
    });

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
