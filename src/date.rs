//! Date stamp formatting.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Local, Timelike};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD";

// Longest token first so that `YYYY` wins over shorter matches.
static RE_DATE_TOKENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"YYYY|MM|DD|HH|mm|ss").expect("Failed to create regex pattern for date tokens"));

/// Which time a date stamp is taken from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    /// Time of the preview run
    #[default]
    Current,
    /// Last modification time of the file
    Modified,
}

impl DateSource {
    /// Pick the date to stamp.
    /// Falls back to `now` when the file has no modification time.
    #[must_use]
    pub fn resolve(self, now: DateTime<Local>, modified: Option<DateTime<Local>>) -> DateTime<Local> {
        match self {
            Self::Current => now,
            Self::Modified => modified.unwrap_or(now),
        }
    }
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Modified => write!(f, "modified"),
        }
    }
}

/// Substitute date tokens in the format string.
///
/// Supported tokens are `YYYY`, `MM`, `DD`, `HH`, `mm` and `ss`.
/// Tokens are replaced in a single pass so substituted digits are never re-read as tokens.
///
/// ```rust
/// use chrono::{Local, TimeZone};
/// use batch_rename::date::format_date_stamp;
///
/// let date = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
/// assert_eq!(format_date_stamp("YYYY-MM-DD_HHmmss", &date), "2024-03-07_090501");
/// ```
#[must_use]
pub fn format_date_stamp(format: &str, date: &DateTime<Local>) -> String {
    RE_DATE_TOKENS
        .replace_all(format, |caps: &Captures| match &caps[0] {
            "YYYY" => date.year().to_string(),
            "MM" => format!("{:02}", date.month()),
            "DD" => format!("{:02}", date.day()),
            "HH" => format!("{:02}", date.hour()),
            "mm" => format!("{:02}", date.minute()),
            "ss" => format!("{:02}", date.second()),
            other => other.to_string(),
        })
        .into_owned()
}
