//! Apply the rule configuration to a single file name.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use regex::{Captures, NoExpand, Regex, RegexBuilder};
use unicode_segmentation::UnicodeSegmentation;

use crate::case::transform_case;
use crate::date::format_date_stamp;
use crate::error::RenameError;
use crate::metadata::format_with_pattern;
use crate::number::{format_number, infer_separator, insert_at_position, next_number, strip_number};
use crate::rules::{FindReplaceRule, RuleConfiguration};
use crate::validate::sanitize_file_name;

/// Per-file inputs for one rule evaluation.
#[derive(Debug, Clone)]
pub struct RuleContext<'a> {
    /// Position of the file in the whole batch.
    pub index: usize,
    /// Time captured once for the preview run.
    pub now: DateTime<Local>,
    pub modified: Option<DateTime<Local>>,
    pub metadata: Option<&'a BTreeMap<String, String>>,
}

/// Rules prepared for a preview run.
///
/// The find pattern is compiled once when the pipeline is created.
#[derive(Debug)]
pub struct RulePipeline<'a> {
    rules: &'a RuleConfiguration,
    find: Option<Regex>,
}

impl<'a> RuleContext<'a> {
    #[must_use]
    pub const fn new(index: usize, now: DateTime<Local>) -> Self {
        Self {
            index,
            now,
            modified: None,
            metadata: None,
        }
    }
}

impl<'a> RulePipeline<'a> {
    /// Prepare the pipeline for the given rules.
    ///
    /// # Errors
    /// Returns `InvalidPattern` if the find text is not a valid regular expression.
    pub fn new(rules: &'a RuleConfiguration) -> Result<Self, RenameError> {
        let find = compile_find_pattern(&rules.find_replace)?;
        Ok(Self { rules, find })
    }

    /// Compute the new name for one file.
    ///
    /// Stages run in a fixed order on the stem:
    /// metadata pattern, find and replace, trim, prefix and suffix with case conversion,
    /// numbering and date stamp. The extension is re-appended and the result sanitized.
    ///
    /// # Errors
    /// Returns `NumberOverflow` if the sequence number does not fit.
    pub fn apply(&self, original_name: &str, context: &RuleContext) -> Result<String, RenameError> {
        let (stem, extension) = split_extension(original_name);

        let stem = self.render_metadata(stem, context);
        let stem = self.find_replace(&stem);
        let stem = self.trim(&stem);
        let stem = self.add_prefix_suffix(&stem);
        let stem = self.number(stem, context.index)?;
        let stem = self.date_stamp(stem, context);

        Ok(sanitize_file_name(&format!("{stem}{extension}")))
    }

    fn render_metadata(&self, stem: &str, context: &RuleContext) -> String {
        let rule = &self.rules.metadata;
        if !rule.enabled || rule.pattern.trim().is_empty() {
            return stem.to_string();
        }
        let mut values = context.metadata.cloned().unwrap_or_default();
        values.entry("name".to_string()).or_insert_with(|| stem.to_string());

        let rendered = format_with_pattern(&rule.pattern, &values);
        if rendered.trim().is_empty() {
            stem.to_string()
        } else {
            rendered
        }
    }

    fn find_replace(&self, stem: &str) -> String {
        let rule = &self.rules.find_replace;
        if !rule.enabled {
            return stem.to_string();
        }
        if rule.replace_entire {
            return rule.replace.clone();
        }
        let Some(regex) = &self.find else {
            return stem.to_string();
        };

        if rule.use_regex {
            regex.replace_all(stem, rule.replace.as_str()).into_owned()
        } else if rule.case_sensitive {
            regex.replace_all(stem, NoExpand(&rule.replace)).into_owned()
        } else {
            regex
                .replace_all(stem, |caps: &Captures| match_case(&caps[0], &rule.replace))
                .into_owned()
        }
    }

    fn trim(&self, stem: &str) -> String {
        let rule = &self.rules.trim;
        if !rule.enabled {
            return stem.to_string();
        }
        let graphemes: Vec<&str> = stem.graphemes(true).skip(rule.from_start).collect();
        let keep = graphemes.len().saturating_sub(rule.from_end);
        graphemes[..keep].concat()
    }

    fn add_prefix_suffix(&self, stem: &str) -> String {
        let mut prefix = if self.rules.prefix.enabled {
            self.rules.prefix.text.clone()
        } else {
            String::new()
        };
        let mut suffix = if self.rules.suffix.enabled {
            self.rules.suffix.text.clone()
        } else {
            String::new()
        };

        let Some(case_type) = self.rules.active_case_type() else {
            return format!("{prefix}{stem}{suffix}");
        };

        // Keep a word boundary so the case conversion sees separate words
        if !prefix.is_empty() && !prefix.ends_with(is_word_separator) {
            prefix.push(' ');
        }
        if !suffix.is_empty() && !suffix.starts_with(is_word_separator) {
            suffix.insert(0, ' ');
        }
        transform_case(&format!("{prefix}{stem}{suffix}"), case_type)
    }

    fn number(&self, stem: String, index: usize) -> Result<String, RenameError> {
        let rule = &self.rules.numbering;
        if !rule.enabled {
            return Ok(stem);
        }
        let number = next_number(index, rule.start, rule.increment).ok_or(RenameError::NumberOverflow { index })?;
        let formatted = format_number(number, rule.format, Some(rule.custom_padding));
        let stem = strip_number(&stem);
        let separator = rule
            .separator
            .as_deref()
            .unwrap_or_else(|| infer_separator(&stem, self.rules.active_case_type()));

        Ok(insert_at_position(
            &stem,
            &formatted,
            rule.position,
            rule.custom_position,
            separator,
        ))
    }

    fn date_stamp(&self, stem: String, context: &RuleContext) -> String {
        let rule = &self.rules.date_stamp;
        if !rule.enabled {
            return stem;
        }
        let date = rule.source.resolve(context.now, context.modified);
        let stamp = format_date_stamp(&rule.format, &date);
        let separator = infer_separator(&stem, self.rules.active_case_type());
        insert_at_position(&stem, &stamp, rule.position, rule.custom_position, separator)
    }
}

/// Apply the rules to a name using the current time.
///
/// # Errors
/// Returns an error if the find pattern is invalid or the sequence number overflows.
pub fn apply_rules(original_name: &str, rules: &RuleConfiguration, index: usize) -> Result<String, RenameError> {
    RulePipeline::new(rules)?.apply(original_name, &RuleContext::new(index, Local::now()))
}

/// Split a file name into stem and extension at the last period.
/// The extension includes the period.
#[must_use]
pub fn split_extension(name: &str) -> (&str, &str) {
    name.rfind('.').map_or((name, ""), |index| name.split_at(index))
}

fn compile_find_pattern(rule: &FindReplaceRule) -> Result<Option<Regex>, RenameError> {
    if !rule.enabled || rule.replace_entire || rule.find.is_empty() {
        return Ok(None);
    }
    let pattern = if rule.use_regex {
        rule.find.clone()
    } else {
        regex::escape(&rule.find)
    };
    RegexBuilder::new(&pattern)
        .case_insensitive(!rule.case_sensitive)
        .build()
        .map(Some)
        .map_err(|source| RenameError::InvalidPattern {
            pattern: rule.find.clone(),
            source,
        })
}

/// Adapt the replacement to the letter case of the matched text.
fn match_case(matched: &str, replacement: &str) -> String {
    let has_letters = matched.chars().any(char::is_alphabetic);
    let all_upper = matched.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase);
    if has_letters && all_upper && matched.chars().count() > 1 {
        replacement.to_uppercase()
    } else if matched.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = replacement.chars();
        chars
            .next()
            .map_or_else(String::new, |first| first.to_uppercase().chain(chars).collect())
    } else {
        replacement.to_string()
    }
}

fn is_word_separator(c: char) -> bool {
    c.is_whitespace() || c == '_' || c == '-'
}
