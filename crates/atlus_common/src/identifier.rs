//! The composite lookup key for registered assets.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::locale::Locale;
use crate::mode::ContentMode;

/// Identifies one asset by `(name, locale, mode)`.
///
/// Asset names are case-insensitive: the name is folded to lowercase on
/// construction so that equality and hashing ignore case. Containers keep
/// the original spelling for display.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct AssetIdentifier {
    name: String,
    locale: Locale,
    mode: ContentMode,
}

impl AssetIdentifier {
    /// Creates an identifier, normalizing the name's case.
    pub fn new(name: &str, locale: Locale, mode: ContentMode) -> Self {
        Self {
            name: name.to_lowercase(),
            locale,
            mode,
        }
    }

    /// The normalized (lowercase) asset name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The locale bucket.
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// The content mode the asset is published under.
    pub fn mode(&self) -> ContentMode {
        self.mode
    }

    /// Returns the same name and mode in a different locale bucket.
    pub fn with_locale(&self, locale: Locale) -> Self {
        Self {
            name: self.name.clone(),
            locale,
            mode: self.mode,
        }
    }

    /// Returns the same name and locale under a different mode.
    pub fn with_mode(&self, mode: ContentMode) -> Self {
        Self {
            name: self.name.clone(),
            locale: self.locale,
            mode,
        }
    }
}

impl fmt::Display for AssetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}/{}]", self.name, self.locale, self.mode)
    }
}
