//! `atlus get`: resolve one asset and write its compiled bytes.

use std::io::Write;

use atlus_config::AtlusConfig;

use crate::pipeline::{open_registry, register};
use crate::{GetArgs, GlobalArgs};

/// Runs the `atlus get` command.
///
/// Writes the resolved bytes to `--output` or stdout. Returns exit code 1 if
/// no asset matches.
pub fn run(
    args: &GetArgs,
    global: &GlobalArgs,
    config: &AtlusConfig,
) -> Result<i32, Box<dyn std::error::Error>> {
    let registry = open_registry(config, false)?;
    register(&registry, &args.mod_dir, args.owner.as_deref(), global)?;

    let Some(bytes) = registry.try_get_asset(args.mode, &args.name, args.locale) else {
        eprintln!(
            "error: no asset `{}` for locale {} and mode {}",
            args.name, args.locale, args.mode
        );
        return Ok(1);
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, &bytes)?;
            if !global.quiet {
                eprintln!("     Wrote {} bytes to {path}", bytes.len());
            }
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }
    Ok(0)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::build::tests::{quiet, shell_config, write_mod};
    use atlus_common::{ContentMode, Locale};
    use tempfile::TempDir;

    fn args(mod_dir: String, name: &str, locale: Locale, output: &std::path::Path) -> GetArgs {
        GetArgs {
            mod_dir,
            name: name.to_string(),
            locale,
            mode: ContentMode::Default,
            output: Some(output.to_str().unwrap().to_string()),
            owner: None,
        }
    }

    #[test]
    fn writes_resolved_bytes() {
        let tmp = TempDir::new().unwrap();
        let config = shell_config(tmp.path());
        let out = tmp.path().join("greeting.bmd");
        let args = args(write_mod(tmp.path()), "Greeting", Locale::En, &out);

        assert_eq!(run(&args, &quiet(), &config).unwrap(), 0);
        assert_eq!(std::fs::read(&out).unwrap(), b"[msg hello]");
    }

    #[test]
    fn falls_back_to_universal() {
        let tmp = TempDir::new().unwrap();
        let config = shell_config(tmp.path());
        let out = tmp.path().join("field.bf");
        let args = args(write_mod(tmp.path()), "field", Locale::Fr, &out);

        assert_eq!(run(&args, &quiet(), &config).unwrap(), 0);
        assert_eq!(std::fs::read(&out).unwrap(), b"void main() {}");
    }

    #[test]
    fn missing_asset_exits_with_one() {
        let tmp = TempDir::new().unwrap();
        let config = shell_config(tmp.path());
        let out = tmp.path().join("none.bmd");
        let args = args(write_mod(tmp.path()), "greeting", Locale::Fr, &out);

        assert_eq!(run(&args, &quiet(), &config).unwrap(), 1);
        assert!(!out.exists());
    }
}
