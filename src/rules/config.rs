//! Rule configuration consumed by the rule pipeline.

use std::path::Path;
use std::{fmt, fs};

use anyhow::Context;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::case::CaseType;
use crate::date::{DEFAULT_DATE_FORMAT, DateSource};
use crate::number::{NumberFormat, Position};

/// Snapshot of all rename rules.
///
/// Every rule category has its own `enabled` flag and disabled categories are no-ops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfiguration {
    pub find_replace: FindReplaceRule,
    pub prefix: TextRule,
    pub suffix: TextRule,
    pub trim: TrimRule,
    pub case: CaseRule,
    pub numbering: NumberingRule,
    pub date_stamp: DateStampRule,
    pub metadata: MetadataRule,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindReplaceRule {
    pub enabled: bool,
    pub find: String,
    pub replace: String,
    pub use_regex: bool,
    pub case_sensitive: bool,
    /// Replace the whole stem with the replacement text.
    pub replace_entire: bool,
}

/// Prefix or suffix text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextRule {
    pub enabled: bool,
    pub text: String,
}

/// Remove characters from the start and end of the stem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimRule {
    pub enabled: bool,
    pub from_start: usize,
    pub from_end: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseRule {
    pub enabled: bool,
    pub case_type: CaseType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberingRule {
    pub enabled: bool,
    pub format: NumberFormat,
    /// Zero padding width for the custom format.
    pub custom_padding: usize,
    pub position: Position,
    /// Grapheme index for the custom position. Appends when not set.
    pub custom_position: Option<usize>,
    pub start: i64,
    pub increment: i64,
    /// Separator between the number and the name.
    /// Inferred from the name and case type when not set.
    pub separator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateStampRule {
    pub enabled: bool,
    pub format: String,
    pub position: Position,
    pub custom_position: Option<usize>,
    pub source: DateSource,
}

/// Build the stem from file metadata with a `{tag}` pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataRule {
    pub enabled: bool,
    pub use_exif: bool,
    pub use_id3: bool,
    pub pattern: String,
}

impl Default for NumberingRule {
    fn default() -> Self {
        Self {
            enabled: false,
            format: NumberFormat::Double,
            custom_padding: 2,
            position: Position::Suffix,
            custom_position: None,
            start: 1,
            increment: 1,
            separator: None,
        }
    }
}

impl Default for DateStampRule {
    fn default() -> Self {
        Self {
            enabled: false,
            format: DEFAULT_DATE_FORMAT.to_string(),
            position: Position::Prefix,
            custom_position: None,
            source: DateSource::Current,
        }
    }
}

impl RuleConfiguration {
    /// Parse rules from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str::<Self>(toml_str).with_context(|| "Failed to parse rules TOML")
    }

    /// Read rules from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read rules file {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid rules file {}", path.display()))
    }

    /// Serialize rules to a TOML string.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize rules")
    }

    /// Check if any rule category is enabled.
    #[must_use]
    pub const fn has_enabled_rules(&self) -> bool {
        self.find_replace.enabled
            || self.prefix.enabled
            || self.suffix.enabled
            || self.trim.enabled
            || self.case.enabled
            || self.numbering.enabled
            || self.date_stamp.enabled
            || self.metadata.enabled
    }

    /// Case type used for separator inference, if case conversion is on.
    #[must_use]
    pub const fn active_case_type(&self) -> Option<CaseType> {
        if self.case.enabled {
            Some(self.case.case_type)
        } else {
            None
        }
    }

    /// Copy of these rules with numbering forced on as a suffix starting from 1
    /// with the given zero padding.
    #[must_use]
    pub fn with_forced_numbering(&self, padding: usize) -> Self {
        let mut rules = self.clone();
        rules.numbering.enabled = true;
        rules.numbering.format = NumberFormat::from_padding(padding);
        rules.numbering.custom_padding = padding;
        rules.numbering.position = Position::Suffix;
        rules.numbering.start = 1;
        rules.numbering.increment = 1;
        rules
    }
}

impl fmt::Display for RuleConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let enabled = [
            (self.find_replace.enabled, "find_replace"),
            (self.prefix.enabled, "prefix"),
            (self.suffix.enabled, "suffix"),
            (self.trim.enabled, "trim"),
            (self.case.enabled, "case"),
            (self.numbering.enabled, "numbering"),
            (self.date_stamp.enabled, "date_stamp"),
            (self.metadata.enabled, "metadata"),
        ]
        .into_iter()
        .filter_map(|(enabled, name)| enabled.then_some(name))
        .join(", ");

        writeln!(f, "Rules: [{enabled}]")?;
        if self.find_replace.enabled {
            writeln!(
                f,
                "  find:       \"{}\" -> \"{}\" (regex: {}, case sensitive: {}, entire: {})",
                self.find_replace.find,
                self.find_replace.replace,
                crate::colorize_bool(self.find_replace.use_regex),
                crate::colorize_bool(self.find_replace.case_sensitive),
                crate::colorize_bool(self.find_replace.replace_entire),
            )?;
        }
        if self.prefix.enabled {
            writeln!(f, "  prefix:     \"{}\"", self.prefix.text)?;
        }
        if self.suffix.enabled {
            writeln!(f, "  suffix:     \"{}\"", self.suffix.text)?;
        }
        if self.trim.enabled {
            writeln!(
                f,
                "  trim:       start {} end {}",
                self.trim.from_start, self.trim.from_end
            )?;
        }
        if self.case.enabled {
            writeln!(f, "  case:       {}", self.case.case_type)?;
        }
        if self.numbering.enabled {
            writeln!(
                f,
                "  numbering:  {} {} from {} by {}",
                self.numbering.format, self.numbering.position, self.numbering.start, self.numbering.increment
            )?;
        }
        if self.date_stamp.enabled {
            writeln!(
                f,
                "  date:       \"{}\" {} ({})",
                self.date_stamp.format, self.date_stamp.position, self.date_stamp.source
            )?;
        }
        if self.metadata.enabled {
            writeln!(f, "  metadata:   \"{}\"", self.metadata.pattern)?;
        }
        Ok(())
    }
}
