//! Script asset kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// The script language an asset is written in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// A message script (`.msg`), compiled to a message binary.
    Message,
    /// A flow script (`.flow`), compiled to a flow binary.
    Flow,
}

impl AssetKind {
    /// Maps a file extension (without the dot) to a kind, ignoring case.
    pub fn from_extension(ext: &str) -> Option<AssetKind> {
        if ext.eq_ignore_ascii_case("msg") {
            Some(AssetKind::Message)
        } else if ext.eq_ignore_ascii_case("flow") {
            Some(AssetKind::Flow)
        } else {
            None
        }
    }

    /// Determines the kind of a source file from its extension.
    pub fn from_path(path: &Path) -> Option<AssetKind> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(AssetKind::from_extension)
    }

    /// Returns the source file extension for this kind.
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Message => "msg",
            AssetKind::Flow => "flow",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Message => f.write_str("message"),
            AssetKind::Flow => f.write_str("flow"),
        }
    }
}
