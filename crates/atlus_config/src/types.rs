//! Configuration types deserialized from `atlus.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use atlus_common::Locale;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};

/// The top-level configuration parsed from `atlus.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct AtlusConfig {
    /// Compiled-asset cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Asset folder layout.
    #[serde(default)]
    pub assets: AssetsConfig,
    /// Source watching and recompilation.
    #[serde(default)]
    pub hot_reload: HotReloadConfig,
    /// External script compiler settings.
    #[serde(default)]
    pub compiler: CompilerConfig,
    /// Log verbosity.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AtlusConfig {
    /// Resolves relative paths in the configuration against `base`.
    ///
    /// Paths in a config file are relative to the directory containing it.
    pub fn resolve_paths(&mut self, base: &Path) {
        if self.cache.root.is_relative() {
            self.cache.root = base.join(&self.cache.root);
        }
    }
}

/// Settings for the on-disk compiled-asset cache.
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    /// Directory holding the cache index and blobs.
    #[serde(default = "default_cache_root")]
    pub root: PathBuf,
    /// Days since last access after which a cache entry is evicted.
    #[serde(default = "default_expiration_days")]
    pub expiration_days: u32,
}

impl CacheConfig {
    /// The expiration window as a [`Duration`].
    pub fn expiration(&self) -> Duration {
        Duration::from_secs(u64::from(self.expiration_days) * 24 * 60 * 60)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_cache_root(),
            expiration_days: default_expiration_days(),
        }
    }
}

fn default_cache_root() -> PathBuf {
    PathBuf::from("cache")
}

fn default_expiration_days() -> u32 {
    28
}

/// Layout of asset folders inside a mod.
#[derive(Debug, Deserialize)]
pub struct AssetsConfig {
    /// Folder inside a mod directory that holds its script assets.
    #[serde(default = "default_assets_dir")]
    pub dir_name: String,
    /// Folder name that switches everything beneath it to the variant mode.
    #[serde(default = "default_variant_dir")]
    pub variant_dir: String,
    /// Forces lookups into one locale; `disabled` keeps the requested locale.
    #[serde(default = "default_locale_override")]
    pub locale_override: Locale,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dir_name: default_assets_dir(),
            variant_dir: default_variant_dir(),
            locale_override: default_locale_override(),
        }
    }
}

fn default_assets_dir() -> String {
    "ue-atlus-script".to_string()
}

fn default_variant_dir() -> String {
    "astrea".to_string()
}

fn default_locale_override() -> Locale {
    Locale::Disabled
}

/// Hot-reload settings.
#[derive(Debug, Deserialize)]
pub struct HotReloadConfig {
    /// Whether registered source files are watched for changes.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Quiet period before a burst of changes triggers one recompile.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl HotReloadConfig {
    /// The debounce quiet period as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for HotReloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    500
}

/// Settings handed to the external script compiler.
#[derive(Debug, Deserialize)]
pub struct CompilerConfig {
    /// Executable invoked to compile one script.
    #[serde(default = "default_compiler_command")]
    pub command: String,
    /// Extra arguments passed before the generated ones.
    ///
    /// Accepts either a single string or a list of strings.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub args: Vec<String>,
    /// Binary format version for message scripts.
    #[serde(default = "default_message_format")]
    pub message_format: String,
    /// Binary format version for flow scripts.
    #[serde(default = "default_flow_format")]
    pub flow_format: String,
    /// Text encoding of compiled strings.
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// Symbol library name.
    #[serde(default = "default_library")]
    pub library: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            command: default_compiler_command(),
            args: Vec::new(),
            message_format: default_message_format(),
            flow_format: default_flow_format(),
            encoding: default_encoding(),
            library: default_library(),
        }
    }
}

fn default_compiler_command() -> String {
    "AtlusScriptCompiler".to_string()
}

fn default_message_format() -> String {
    "V1BE".to_string()
}

fn default_flow_format() -> String {
    "V4BE".to_string()
}

fn default_encoding() -> String {
    "UTF-8".to_string()
}

fn default_library() -> String {
    "p3re".to_string()
}

/// Deserializes a field that can be either a single string or a list of strings.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// Logging settings.
#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level of emitted log events.
    #[serde(default)]
    pub level: LogLevel,
}

/// Log verbosity levels.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything, including per-event tracing.
    Trace,
    /// Debug output such as cache hits.
    Debug,
    /// Registration progress (default).
    #[default]
    #[serde(alias = "info")]
    Information,
    /// Recoverable problems only.
    #[serde(alias = "warn")]
    Warning,
    /// Failures only.
    Error,
}

impl LogLevel {
    /// Returns the level as a filter directive understood by log subscribers.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Information => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}
