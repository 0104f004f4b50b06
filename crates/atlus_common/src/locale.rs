//! Target language buckets for assets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The language an asset targets.
///
/// The thirteen real languages mirror the game's system-language table and
/// keep its numeric codes. Two sentinels complete the set: [`Locale::Universal`]
/// marks an asset that serves every language, and [`Locale::Disabled`] is a
/// configuration-only "do not override" marker that is never attached to a
/// registered asset.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    /// Japanese.
    Ja,
    /// English.
    En,
    /// French.
    Fr,
    /// Italian.
    It,
    /// German.
    De,
    /// Spanish.
    Es,
    /// Simplified Chinese.
    ZhHans,
    /// Traditional Chinese.
    ZhHant,
    /// Korean.
    Ko,
    /// Russian.
    Ru,
    /// Portuguese.
    Pt,
    /// Turkish.
    Tr,
    /// Polish.
    Pl,
    /// Applies to every language.
    Universal,
    /// Never override; only meaningful in configuration.
    Disabled,
}

impl Locale {
    /// Every real language, in system-language code order.
    pub const LANGUAGES: [Locale; 13] = [
        Locale::Ja,
        Locale::En,
        Locale::Fr,
        Locale::It,
        Locale::De,
        Locale::Es,
        Locale::ZhHans,
        Locale::ZhHant,
        Locale::Ko,
        Locale::Ru,
        Locale::Pt,
        Locale::Tr,
        Locale::Pl,
    ];

    /// Returns the lowercase code used for folder names and cache paths.
    pub fn code(self) -> &'static str {
        match self {
            Locale::Ja => "ja",
            Locale::En => "en",
            Locale::Fr => "fr",
            Locale::It => "it",
            Locale::De => "de",
            Locale::Es => "es",
            Locale::ZhHans => "zh_hans",
            Locale::ZhHant => "zh_hant",
            Locale::Ko => "ko",
            Locale::Ru => "ru",
            Locale::Pt => "pt",
            Locale::Tr => "tr",
            Locale::Pl => "pl",
            Locale::Universal => "universal",
            Locale::Disabled => "disabled",
        }
    }

    /// Returns the game's numeric system-language code, or `None` for the
    /// sentinels.
    pub fn system_code(self) -> Option<u8> {
        Self::LANGUAGES
            .iter()
            .position(|l| *l == self)
            .map(|index| index as u8)
    }

    /// Maps a numeric system-language code back to its locale.
    pub fn from_system_code(code: u8) -> Option<Locale> {
        Self::LANGUAGES.get(code as usize).copied()
    }

    /// Matches a directory name against the language codes, ignoring case.
    ///
    /// Only real languages match; a folder named `universal` or `disabled`
    /// is an ordinary folder.
    pub fn from_folder_name(name: &str) -> Option<Locale> {
        Self::LANGUAGES
            .iter()
            .copied()
            .find(|l| l.code().eq_ignore_ascii_case(name))
    }

    /// Parses any locale code, sentinels included, ignoring case.
    pub fn parse(code: &str) -> Option<Locale> {
        Self::from_folder_name(code).or_else(|| {
            [Locale::Universal, Locale::Disabled]
                .into_iter()
                .find(|l| l.code().eq_ignore_ascii_case(code))
        })
    }

    /// Returns `true` for [`Locale::Universal`].
    pub fn is_universal(self) -> bool {
        self == Locale::Universal
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
