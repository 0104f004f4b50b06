//! Discovery of script sources under an asset root.

use std::path::{Component, Path, PathBuf};

use atlus_common::{AssetKind, ContentMode, Locale};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// How locale and mode are assigned to discovered files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout<'a> {
    /// Every file gets the same locale and mode.
    Explicit {
        /// Locale bucket for every file.
        locale: Locale,
        /// Mode for every file.
        mode: ContentMode,
    },
    /// Locale and mode are read from the directory structure.
    ///
    /// A language folder directly under the root (or directly under a
    /// top-level variant folder) selects that locale; anything else is
    /// universal. A folder named `variant_dir` anywhere on the path switches
    /// the file to [`ContentMode::Variant`].
    Inferred {
        /// Folder name marking variant content.
        variant_dir: &'a str,
        /// Mode for files outside any variant folder.
        base_mode: ContentMode,
    },
}

/// A script source found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredAsset {
    /// Absolute path to the source.
    pub path: PathBuf,
    /// File stem in its original spelling.
    pub name: String,
    /// Script kind from the extension.
    pub kind: AssetKind,
    /// Locale bucket.
    pub locale: Locale,
    /// Content mode.
    pub mode: ContentMode,
}

/// Walks `root` recursively and classifies every `.msg` and `.flow` file.
///
/// Entries are visited sorted by file name, so the order is stable across
/// runs. Unreadable entries are logged and skipped.
pub fn discover(root: &Path, layout: &Layout<'_>) -> Vec<DiscoveredAsset> {
    let mut found = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(kind) = AssetKind::from_path(path) else {
            continue;
        };
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            debug!(path = %path.display(), "skipping non UTF-8 file name");
            continue;
        };

        let (locale, mode) = match *layout {
            Layout::Explicit { locale, mode } => (locale, mode),
            Layout::Inferred {
                variant_dir,
                base_mode,
            } => classify(root, path, variant_dir, base_mode),
        };

        found.push(DiscoveredAsset {
            path: path.to_path_buf(),
            name: name.to_string(),
            kind,
            locale,
            mode,
        });
    }

    found
}

/// Infers locale and mode from the directories between `root` and `path`.
fn classify(root: &Path, path: &Path, variant_dir: &str, base_mode: ContentMode) -> (Locale, ContentMode) {
    let dirs: Vec<&str> = path
        .strip_prefix(root)
        .ok()
        .and_then(Path::parent)
        .map(|rel| {
            rel.components()
                .filter_map(|c| match c {
                    Component::Normal(s) => s.to_str(),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let is_variant = |dir: &&str| dir.eq_ignore_ascii_case(variant_dir);

    let locale = match dirs.as_slice() {
        [first, ..] if Locale::from_folder_name(first).is_some() => Locale::from_folder_name(first),
        [first, second, ..] if is_variant(first) => Locale::from_folder_name(second),
        _ => None,
    }
    .unwrap_or(Locale::Universal);

    let mode = if dirs.iter().any(is_variant) {
        ContentMode::Variant
    } else {
        base_mode
    };

    (locale, mode)
}
