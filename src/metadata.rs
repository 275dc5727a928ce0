//! Metadata lookup for metadata-derived names.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Local};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::rules::MetadataRule;
use crate::workspace::{FileEntry, FileId};

static RE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("Failed to compile metadata placeholder regex"));

/// Result of a best-effort metadata extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataResult {
    pub success: bool,
    pub metadata: BTreeMap<String, String>,
    pub error: Option<String>,
}

/// Source of key-value tags for a file.
pub trait MetadataExtractor {
    fn extract(&self, path: &Path, use_exif: bool, use_id3: bool) -> MetadataResult;
}

/// Extractor that reports filesystem attributes only:
/// `name`, `ext`, `size`, `modified`, `year`, `month` and `day`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileAttributes;

impl MetadataResult {
    #[must_use]
    pub const fn found(metadata: BTreeMap<String, String>) -> Self {
        Self {
            success: true,
            metadata,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            metadata: BTreeMap::new(),
            error: Some(error.into()),
        }
    }
}

impl MetadataExtractor for FileAttributes {
    fn extract(&self, path: &Path, _use_exif: bool, _use_id3: bool) -> MetadataResult {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(error) => return MetadataResult::failed(format!("{}: {error}", path.display())),
        };

        let mut tags = BTreeMap::new();
        tags.insert("name".to_string(), crate::path_to_file_stem_string(path));
        tags.insert("ext".to_string(), crate::path_to_file_extension_string(path));
        tags.insert("size".to_string(), metadata.len().to_string());
        if let Ok(modified) = metadata.modified() {
            let modified = DateTime::<Local>::from(modified);
            tags.insert("modified".to_string(), modified.format("%Y-%m-%d").to_string());
            tags.insert("year".to_string(), modified.year().to_string());
            tags.insert("month".to_string(), format!("{:02}", modified.month()));
            tags.insert("day".to_string(), format!("{:02}", modified.day()));
        }
        MetadataResult::found(tags)
    }
}

/// Replace `{key}` placeholders with metadata values.
/// Unknown keys are replaced with an empty string.
///
/// ```rust
/// use std::collections::BTreeMap;
/// use batch_rename::metadata::format_with_pattern;
///
/// let metadata = BTreeMap::from([("artist".to_string(), "Darude".to_string())]);
/// assert_eq!(format_with_pattern("{artist} - {title}", &metadata), "Darude - ");
/// ```
#[must_use]
pub fn format_with_pattern(pattern: &str, metadata: &BTreeMap<String, String>) -> String {
    RE_PLACEHOLDER
        .replace_all(pattern, |caps: &Captures| {
            metadata.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// Extract metadata for each file when the metadata rule is enabled.
///
/// Failed extractions are left out so those files fall back to having no metadata.
pub fn collect_metadata<M: MetadataExtractor + ?Sized>(
    extractor: &M,
    files: &[&FileEntry],
    rule: &MetadataRule,
) -> HashMap<FileId, BTreeMap<String, String>> {
    if !rule.enabled {
        return HashMap::new();
    }
    files
        .iter()
        .filter_map(|file| {
            let result = extractor.extract(&file.path, rule.use_exif, rule.use_id3);
            result.success.then_some((file.id, result.metadata))
        })
        .collect()
}
