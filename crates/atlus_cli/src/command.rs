//! A [`ScriptCompiler`] that runs an external compiler executable.
//!
//! Each compile writes the script text to `input.<ext>` in a fresh scratch
//! directory, invokes the configured command as
//!
//! ```text
//! <command> [args..] <input> -Compile -OutFormat <format> -Library <library> -Encoding <encoding> -Out <output>
//! ```
//!
//! and reads back `output.<bmd|bf>`. The asset name only appears in error
//! messages, so it never shapes a path.

use std::process::Command;

use atlus_common::AssetKind;
use atlus_config::CompilerConfig;
use atlus_registry::{CompileError, CompilerOptions, ScriptCompiler};
use bytes::Bytes;

/// Compiles scripts by shelling out to an external compiler.
///
/// Format, library and encoding come from the [`CompilerOptions`] of each
/// call.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    command: String,
    args: Vec<String>,
}

impl CommandCompiler {
    /// Creates a compiler from the `command` and `args` of the `[compiler]`
    /// configuration section.
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }
}

/// Extension of the compiled output for one kind.
fn output_extension(kind: AssetKind) -> &'static str {
    match kind {
        AssetKind::Message => "bmd",
        AssetKind::Flow => "bf",
    }
}

impl ScriptCompiler for CommandCompiler {
    fn compile(
        &self,
        kind: AssetKind,
        name: &str,
        text: &str,
        options: &CompilerOptions,
    ) -> Result<Bytes, CompileError> {
        let scratch = tempfile::tempdir()
            .map_err(|e| CompileError::new(format!("{name}: cannot create scratch directory: {e}")))?;
        let input = scratch.path().join(format!("input.{}", kind.extension()));
        let output = scratch.path().join(format!("output.{}", output_extension(kind)));
        std::fs::write(&input, text)
            .map_err(|e| CompileError::new(format!("{name}: cannot write {}: {e}", input.display())))?;

        let result = Command::new(&self.command)
            .args(&self.args)
            .arg(&input)
            .arg("-Compile")
            .arg("-OutFormat")
            .arg(options.format_for(kind))
            .arg("-Library")
            .arg(&options.library)
            .arg("-Encoding")
            .arg(&options.encoding)
            .arg("-Out")
            .arg(&output)
            .output()
            .map_err(|e| CompileError::new(format!("{name}: cannot run {}: {e}", self.command)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(CompileError::new(format!(
                "{name}: {} exited with {}: {}",
                self.command,
                result.status,
                stderr.trim()
            )));
        }

        std::fs::read(&output)
            .map(Bytes::from)
            .map_err(|e| CompileError::new(format!("{name}: no output at {}: {e}", output.display())))
    }
}
