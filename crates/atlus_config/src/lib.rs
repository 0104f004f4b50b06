//! Parsing and validation of `atlus.toml` configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`AtlusConfig`] covering the cache, asset layout, hot reload, compiler
//! and logging settings. Every section is optional and falls back to its
//! defaults.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE};
pub use types::*;
