//! Content-mode tags for parallel content sets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Publishing variant of an asset.
///
/// `Default` and `Variant` name two parallel content sets that share asset
/// names. `Both` is a publishing-time tag meaning the asset serves either
/// mode; it is never a query mode.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// The regular content set.
    #[default]
    Default,
    /// The alternate content set (e.g. a special edition).
    Variant,
    /// Serves both content sets.
    Both,
}

impl ContentMode {
    /// Returns the lowercase code used in cache paths.
    pub fn code(self) -> &'static str {
        match self {
            ContentMode::Default => "default",
            ContentMode::Variant => "variant",
            ContentMode::Both => "both",
        }
    }

    /// Returns `true` if an asset published under `self` answers a query
    /// for `query`.
    pub fn serves(self, query: ContentMode) -> bool {
        self == query || self == ContentMode::Both
    }

    /// Returns `true` if this mode may be used in a lookup.
    pub fn is_queryable(self) -> bool {
        self != ContentMode::Both
    }

    /// Parses a mode code, ignoring case.
    pub fn parse(code: &str) -> Option<ContentMode> {
        [ContentMode::Default, ContentMode::Variant, ContentMode::Both]
            .into_iter()
            .find(|m| m.code().eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for ContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
