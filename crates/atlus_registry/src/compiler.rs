//! The boundary to the external script compiler.
//!
//! The compiler itself (grammar, binary formats, symbol libraries) lives
//! outside this crate. [`ScriptCompiler`] is the seam it plugs into;
//! [`AssetCompiler`] is the adapter the registry talks to, which adds
//! failure logging on top.

use std::sync::Arc;

use atlus_common::AssetKind;
use atlus_config::CompilerConfig;
use bytes::Bytes;
use tracing::{error, trace};

/// An opaque compilation failure.
///
/// The registry only distinguishes success from failure; the message is
/// carried for logging.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CompileError {
    /// Description of the failure as reported by the compiler.
    pub message: String,
}

impl CompileError {
    /// Creates a compile error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Compiles script text into a binary blob.
///
/// The target format, text encoding and symbol library arrive with every
/// call as [`CompilerOptions`], owned by the [`AssetCompiler`] wrapping the
/// implementation. Implementations must be safe to call from several threads
/// at once.
pub trait ScriptCompiler: Send + Sync {
    /// Compiles `text` of the given kind. `name` identifies the asset in
    /// diagnostics.
    fn compile(
        &self,
        kind: AssetKind,
        name: &str,
        text: &str,
        options: &CompilerOptions,
    ) -> Result<Bytes, CompileError>;
}

/// Plain functions and closures compile without looking at the options.
impl<F> ScriptCompiler for F
where
    F: Fn(AssetKind, &str, &str) -> Result<Bytes, CompileError> + Send + Sync,
{
    fn compile(
        &self,
        kind: AssetKind,
        name: &str,
        text: &str,
        _options: &CompilerOptions,
    ) -> Result<Bytes, CompileError> {
        self(kind, name, text)
    }
}

/// Compiler settings shared by every compiler implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Binary format version for message scripts.
    pub message_format: String,
    /// Binary format version for flow scripts.
    pub flow_format: String,
    /// Text encoding of compiled strings.
    pub encoding: String,
    /// Symbol library name.
    pub library: String,
}

impl CompilerOptions {
    /// The output format for one asset kind.
    pub fn format_for(&self, kind: AssetKind) -> &str {
        match kind {
            AssetKind::Message => &self.message_format,
            AssetKind::Flow => &self.flow_format,
        }
    }
}

impl From<&CompilerConfig> for CompilerOptions {
    fn from(config: &CompilerConfig) -> Self {
        Self {
            message_format: config.message_format.clone(),
            flow_format: config.flow_format.clone(),
            encoding: config.encoding.clone(),
            library: config.library.clone(),
        }
    }
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self::from(&CompilerConfig::default())
    }
}

/// The registry's handle on a [`ScriptCompiler`].
#[derive(Clone)]
pub struct AssetCompiler {
    inner: Arc<dyn ScriptCompiler>,
    options: CompilerOptions,
}

impl AssetCompiler {
    /// Wraps a compiler implementation with default options.
    pub fn new(compiler: impl ScriptCompiler + 'static) -> Self {
        Self::from_shared(Arc::new(compiler))
    }

    /// Wraps an already shared compiler implementation.
    pub fn from_shared(compiler: Arc<dyn ScriptCompiler>) -> Self {
        Self {
            inner: compiler,
            options: CompilerOptions::default(),
        }
    }

    /// Replaces the options passed to every compile.
    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    /// The options this compiler was configured with.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compiles one asset, logging failures with the asset's name.
    pub fn compile(&self, kind: AssetKind, name: &str, text: &str) -> Result<Bytes, CompileError> {
        match self.inner.compile(kind, name, text, &self.options) {
            Ok(bytes) => {
                trace!(asset = name, %kind, len = bytes.len(), "compiled");
                Ok(bytes)
            }
            Err(e) => {
                error!(asset = name, %kind, error = %e, "failed to compile {kind}: {name}");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for AssetCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCompiler")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
