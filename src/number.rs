//! Number formatting and insertion of numbers and other text into a stem.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::case::CaseType;

static RE_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").expect("Failed to compile digits regex"));

/// Characters that count as word separators around an inserted number.
const SEPARATOR_CHARS: [char; 4] = ['_', '-', ' ', '.'];

/// Zero padding used for sequence numbers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
    /// No padding: 1, 2, 3
    Single,
    /// Two digits: 01, 02, 03
    #[default]
    Double,
    /// Three digits: 001, 002, 003
    Triple,
    /// Padding given by the custom padding width
    Custom,
}

impl NumberFormat {
    /// Format to use for the given zero padding width.
    #[must_use]
    pub const fn from_padding(padding: usize) -> Self {
        match padding {
            0 | 1 => Self::Single,
            2 => Self::Double,
            3 => Self::Triple,
            _ => Self::Custom,
        }
    }
}

impl fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Single => "single",
            Self::Double => "double",
            Self::Triple => "triple",
            Self::Custom => "custom",
        };
        write!(f, "{name}")
    }
}

/// Where inserted text goes in the stem.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Prefix,
    #[default]
    Suffix,
    Custom,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Prefix => "prefix",
            Self::Suffix => "suffix",
            Self::Custom => "custom",
        };
        write!(f, "{name}")
    }
}

/// Format a number with the zero padding of the given format.
///
/// ```rust
/// use batch_rename::number::{NumberFormat, format_number};
///
/// assert_eq!(format_number(7, NumberFormat::Double, None), "07");
/// assert_eq!(format_number(7, NumberFormat::Custom, Some(4)), "0007");
/// assert_eq!(format_number(7, NumberFormat::Custom, None), "7");
/// ```
#[must_use]
pub fn format_number(number: i64, format: NumberFormat, custom_padding: Option<usize>) -> String {
    let width = match format {
        NumberFormat::Single => 0,
        NumberFormat::Double => 2,
        NumberFormat::Triple => 3,
        NumberFormat::Custom => custom_padding.unwrap_or_default(),
    };
    if number < 0 {
        // Sign goes in front of the padding
        format!("-{:0width$}", number.unsigned_abs())
    } else {
        format!("{number:0width$}")
    }
}

/// Sequence number for the given batch index, or `None` on overflow.
#[must_use]
pub fn next_number(index: usize, start: i64, increment: i64) -> Option<i64> {
    let index = i64::try_from(index).ok()?;
    index.checked_mul(increment)?.checked_add(start)
}

/// Separator to use when inserting into the given name.
///
/// Snake and kebab case imply their own separator.
/// Otherwise the name is scanned for an unambiguous `_`-only or `-`-only pattern.
#[must_use]
pub fn infer_separator(name: &str, case_type: Option<CaseType>) -> &'static str {
    if let Some(separator) = case_type.and_then(CaseType::separator) {
        return separator;
    }
    match (name.contains('_'), name.contains('-')) {
        (true, false) => "_",
        (false, true) => "-",
        _ => "",
    }
}

/// Insert text into the name at the given position using the given separator.
///
/// A custom position is a grapheme index clamped to the name length;
/// without one the text is appended.
/// For custom positions the separator is only added on sides
/// that are not already next to a separator.
#[must_use]
pub fn insert_at_position(
    name: &str,
    text: &str,
    position: Position,
    custom_position: Option<usize>,
    separator: &str,
) -> String {
    match position {
        Position::Prefix => format!("{text}{separator}{name}"),
        Position::Suffix => format!("{name}{separator}{text}"),
        Position::Custom => {
            let graphemes: Vec<&str> = name.graphemes(true).collect();
            let index = custom_position.unwrap_or(graphemes.len()).min(graphemes.len());
            let before = graphemes[..index].concat();
            let after = graphemes[index..].concat();
            if separator.is_empty() {
                return format!("{before}{text}{after}");
            }
            let separator_before = if before.is_empty() || before.ends_with(separator) {
                ""
            } else {
                separator
            };
            let separator_after = if after.is_empty() || after.starts_with(separator) {
                ""
            } else {
                separator
            };
            format!("{before}{separator_before}{text}{separator_after}{after}")
        }
    }
}

/// Remove the first run of digits from the name.
///
/// A separator left doubled or dangling at either end by the removal is collapsed.
///
/// ```rust
/// use batch_rename::number::strip_number;
///
/// assert_eq!(strip_number("photo_01"), "photo");
/// assert_eq!(strip_number("01-photo"), "photo");
/// assert_eq!(strip_number("photo_01_edit"), "photo_edit");
/// assert_eq!(strip_number("photo"), "photo");
/// ```
#[must_use]
pub fn strip_number(name: &str) -> String {
    let Some(digits) = RE_DIGITS.find(name) else {
        return name.to_string();
    };

    let before = &name[..digits.start()];
    let after = &name[digits.end()..];

    let before_separator = before.chars().next_back().filter(|c| SEPARATOR_CHARS.contains(c));
    let after_separator = after.chars().next().filter(|c| SEPARATOR_CHARS.contains(c));

    match (before_separator, after_separator) {
        // Separator on both sides: keep only one
        (Some(_), Some(separator)) => format!("{before}{}", &after[separator.len_utf8()..]),
        // Number was at the end: drop the dangling separator
        (Some(separator), None) if after.is_empty() => before[..before.len() - separator.len_utf8()].to_string(),
        // Number was at the start: drop the dangling separator
        (None, Some(separator)) if before.is_empty() => after[separator.len_utf8()..].to_string(),
        _ => format!("{before}{after}"),
    }
}

#[cfg(test)]
mod number_tests {
    use super::*;

    #[test]
    fn formats_numbers() {
        let formatted: Vec<String> = (0..3)
            .filter_map(|index| next_number(index, 1, 1))
            .map(|n| format_number(n, NumberFormat::Double, None))
            .collect();
        assert_eq!(formatted, vec!["01", "02", "03"]);

        assert_eq!(format_number(5, NumberFormat::Single, None), "5");
        assert_eq!(format_number(5, NumberFormat::Triple, None), "005");
        assert_eq!(format_number(1234, NumberFormat::Triple, None), "1234");
        assert_eq!(format_number(5, NumberFormat::Custom, Some(0)), "5");
        assert_eq!(format_number(-5, NumberFormat::Triple, None), "-005");
    }

    #[test]
    fn next_number_uses_start_and_increment() {
        assert_eq!(next_number(0, 10, 5), Some(10));
        assert_eq!(next_number(3, 10, 5), Some(25));
        assert_eq!(next_number(2, 0, -1), Some(-2));
    }

    #[test]
    fn next_number_overflow() {
        assert_eq!(next_number(2, i64::MAX, 1), None);
        assert_eq!(next_number(usize::MAX, 1, 2), None);
    }

    #[test]
    fn format_from_padding() {
        assert_eq!(NumberFormat::from_padding(2), NumberFormat::Double);
        assert_eq!(NumberFormat::from_padding(3), NumberFormat::Triple);
        assert_eq!(NumberFormat::from_padding(4), NumberFormat::Custom);
    }

    #[test]
    fn infers_separator() {
        assert_eq!(infer_separator("test_file", None), "_");
        assert_eq!(infer_separator("test-file", None), "-");
        assert_eq!(infer_separator("test_file-name", None), "");
        assert_eq!(infer_separator("testFile", None), "");
        assert_eq!(infer_separator("testFile", Some(CaseType::Snake)), "_");
        assert_eq!(infer_separator("test_file", Some(CaseType::Kebab)), "-");
        assert_eq!(infer_separator("test_file", Some(CaseType::Upper)), "_");
    }

    #[test]
    fn inserts_prefix_and_suffix() {
        assert_eq!(insert_at_position("file", "01", Position::Prefix, None, "_"), "01_file");
        assert_eq!(insert_at_position("file", "01", Position::Suffix, None, "-"), "file-01");
        assert_eq!(insert_at_position("file", "01", Position::Suffix, None, ""), "file01");
    }

    #[test]
    fn inserts_at_custom_position() {
        assert_eq!(insert_at_position("abcdef", "01", Position::Custom, Some(3), ""), "abc01def");
        assert_eq!(insert_at_position("abc_def", "01", Position::Custom, Some(4), "_"), "abc_01_def");
        assert_eq!(insert_at_position("abc_def", "01", Position::Custom, Some(3), "_"), "abc_01_def");
        assert_eq!(insert_at_position("abcdef", "01", Position::Custom, Some(3), "-"), "abc-01-def");
    }

    #[test]
    fn custom_position_is_clamped() {
        assert_eq!(insert_at_position("abc", "01", Position::Custom, Some(99), "_"), "abc_01");
        assert_eq!(insert_at_position("abc", "01", Position::Custom, Some(0), "_"), "01_abc");
        assert_eq!(insert_at_position("abc", "01", Position::Custom, None, ""), "abc01");
    }

    #[test]
    fn custom_position_counts_graphemes() {
        assert_eq!(insert_at_position("äöå", "1", Position::Custom, Some(2), ""), "äö1å");
    }

    #[test]
    fn strips_existing_number() {
        assert_eq!(strip_number("file_02"), "file");
        assert_eq!(strip_number("02 file"), "file");
        assert_eq!(strip_number("file12name"), "filename");
        assert_eq!(strip_number("a_1_b_2"), "a_b_2");
        assert_eq!(strip_number("123"), "");
    }
}
