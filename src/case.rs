//! Case conversion for file name stems.

use std::fmt;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};

static RE_CASE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\p{Ll})(\p{Lu})").expect("Failed to compile case boundary regex"));

static RE_SPECIAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("Failed to compile special characters regex"));

static RE_WORD_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_]").expect("Failed to compile word separator regex"));

static RE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"));

/// Supported case transformations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CaseType {
    #[default]
    Camel,
    Pascal,
    Snake,
    Kebab,
    Upper,
    Lower,
}

impl CaseType {
    /// Word separator implied by the case style, if any.
    #[must_use]
    pub const fn separator(self) -> Option<&'static str> {
        match self {
            Self::Snake => Some("_"),
            Self::Kebab => Some("-"),
            _ => None,
        }
    }
}

impl fmt::Display for CaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Camel => "camelCase",
            Self::Pascal => "PascalCase",
            Self::Snake => "snake_case",
            Self::Kebab => "kebab-case",
            Self::Upper => "UPPER CASE",
            Self::Lower => "lower case",
        };
        write!(f, "{name}")
    }
}

/// Split a name into space separated words.
///
/// Inserts a space at every lowercase to uppercase transition,
/// turns any character that is not alphanumeric, whitespace, hyphen or underscore into a space,
/// replaces hyphens and underscores with spaces and collapses repeated whitespace.
///
/// ```rust
/// use batch_rename::case::normalize;
///
/// assert_eq!(normalize("myFile_name-v2 (final)"), "my File name v2 final");
/// ```
#[must_use]
pub fn normalize(name: &str) -> String {
    let spaced = RE_CASE_BOUNDARY.replace_all(name, "$1 $2");
    let cleaned = RE_SPECIAL_CHARS.replace_all(&spaced, " ");
    let cleaned = RE_WORD_SEPARATORS.replace_all(&cleaned, " ");
    RE_WHITESPACE.replace_all(&cleaned, " ").trim().to_string()
}

/// Convert the name to the given case.
///
/// Empty input, or input without any words, is returned unchanged.
/// Upper and lower case only change letter case:
/// existing `_` and `-` separators are kept and whitespace is collapsed.
#[must_use]
pub fn transform_case(name: &str, case_type: CaseType) -> String {
    if name.is_empty() {
        return name.to_string();
    }
    let converted = match case_type {
        CaseType::Upper => collapse_whitespace(name).map(|text| text.to_uppercase()),
        CaseType::Lower => collapse_whitespace(name).map(|text| text.to_lowercase()),
        CaseType::Camel => split_words(name).map(|words| {
            words
                .iter()
                .enumerate()
                .map(|(index, word)| {
                    if index == 0 {
                        word.to_lowercase()
                    } else {
                        capitalize(word)
                    }
                })
                .collect()
        }),
        CaseType::Pascal => split_words(name).map(|words| words.iter().map(|word| capitalize(word)).collect()),
        CaseType::Snake => split_words(name).map(|words| words.iter().map(|word| word.to_lowercase()).join("_")),
        CaseType::Kebab => split_words(name).map(|words| words.iter().map(|word| word.to_lowercase()).join("-")),
    };
    converted.unwrap_or_else(|| name.to_string())
}

fn collapse_whitespace(name: &str) -> Option<String> {
    let collapsed = RE_WHITESPACE.replace_all(name.trim(), " ");
    (!collapsed.is_empty()).then(|| collapsed.into_owned())
}

/// Normalized words of the name, or `None` if there are none.
fn split_words(name: &str) -> Option<Vec<String>> {
    let words: Vec<String> = normalize(name)
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(ToString::to_string)
        .collect();
    (!words.is_empty()).then_some(words)
}

/// Uppercase the first character and lowercase the rest.
#[must_use]
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}
