//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::AtlusConfig;
use std::path::Path;

/// Name of the configuration file looked up in a directory.
pub const CONFIG_FILE: &str = "atlus.toml";

/// Loads and validates `atlus.toml` from a directory.
///
/// A missing file yields the default configuration; relative paths are
/// resolved against `dir`.
pub fn load_config(dir: &Path) -> Result<AtlusConfig, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        let mut config = AtlusConfig::default();
        config.resolve_paths(dir);
        return Ok(config);
    }
    load_config_file(&config_path)
}

/// Loads and validates a configuration from an explicit file path.
///
/// Relative paths inside the file are resolved against the file's directory.
pub fn load_config_file(path: &Path) -> Result<AtlusConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config = load_config_from_str(&content)?;
    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }
    Ok(config)
}

/// Parses and validates an `atlus.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<AtlusConfig, ConfigError> {
    let config: AtlusConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that configuration values are usable.
fn validate_config(config: &AtlusConfig) -> Result<(), ConfigError> {
    if config.cache.expiration_days == 0 {
        return Err(ConfigError::ValidationError(
            "cache.expiration_days must be positive".to_string(),
        ));
    }
    if config.hot_reload.debounce_ms == 0 {
        return Err(ConfigError::ValidationError(
            "hot_reload.debounce_ms must be positive".to_string(),
        ));
    }
    if config.assets.dir_name.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "assets.dir_name must not be empty".to_string(),
        ));
    }
    if config.assets.variant_dir.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "assets.variant_dir must not be empty".to_string(),
        ));
    }
    if config.compiler.command.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "compiler.command must not be empty".to_string(),
        ));
    }
    Ok(())
}
