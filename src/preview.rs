//! Preview generation for a batch of files.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::conflict::PlannedRename;
use crate::rules::{RuleConfiguration, RuleContext, RulePipeline};
use crate::validate::check_file_name;
use crate::workspace::{FileEntry, FileId};

/// Computed name for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewResult {
    pub file_id: FileId,
    pub original_name: String,
    pub new_name: String,
    pub is_valid: bool,
    pub error: Option<String>,
}

/// Values shared by every file of one preview run.
#[derive(Debug, Clone)]
pub struct PreviewContext {
    pub now: DateTime<Local>,
    pub metadata: HashMap<FileId, BTreeMap<String, String>>,
}

impl PreviewResult {
    fn failed(file: &FileEntry, error: String) -> Self {
        Self {
            file_id: file.id,
            original_name: file.name.clone(),
            new_name: file.name.clone(),
            is_valid: false,
            error: Some(error),
        }
    }

    /// Check if this is a valid name that differs from the original.
    #[must_use]
    pub fn is_change(&self) -> bool {
        self.is_valid && self.new_name != self.original_name
    }
}

impl Default for PreviewContext {
    fn default() -> Self {
        Self::new(Local::now())
    }
}

impl PreviewContext {
    #[must_use]
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now,
            metadata: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: HashMap<FileId, BTreeMap<String, String>>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Compute new names for the files using the current time.
#[must_use]
pub fn generate_preview(files: &[&FileEntry], rules: &RuleConfiguration) -> Vec<PreviewResult> {
    if files.is_empty() {
        return Vec::new();
    }
    generate_preview_with(files, rules, &PreviewContext::default())
}

/// Compute new names for the files.
///
/// Each file is numbered by its position in `files`.
/// A failure for one file marks only that file invalid and keeps its original name.
/// An invalid find pattern marks every file invalid.
#[must_use]
pub fn generate_preview_with(
    files: &[&FileEntry],
    rules: &RuleConfiguration,
    context: &PreviewContext,
) -> Vec<PreviewResult> {
    if files.is_empty() {
        return Vec::new();
    }

    let pipeline = match RulePipeline::new(rules) {
        Ok(pipeline) => pipeline,
        Err(error) => {
            let message = error.to_string();
            return files
                .iter()
                .map(|file| PreviewResult::failed(file, message.clone()))
                .collect();
        }
    };

    files
        .iter()
        .enumerate()
        .map(|(index, file)| {
            let rule_context = RuleContext {
                index,
                now: context.now,
                modified: file.last_modified,
                metadata: context.metadata.get(&file.id),
            };
            match pipeline.apply(&file.name, &rule_context) {
                Ok(new_name) => {
                    let error = check_file_name(&new_name).err().map(|reason| reason.to_string());
                    PreviewResult {
                        file_id: file.id,
                        original_name: file.name.clone(),
                        is_valid: error.is_none(),
                        new_name,
                        error,
                    }
                }
                Err(error) => PreviewResult::failed(file, error.to_string()),
            }
        })
        .collect()
}

/// Join valid, changed previews with their files, in file order.
#[must_use]
pub fn plan_renames(files: &[&FileEntry], previews: &[PreviewResult]) -> Vec<PlannedRename> {
    let previews: HashMap<FileId, &PreviewResult> = previews.iter().map(|preview| (preview.file_id, preview)).collect();
    files
        .iter()
        .filter_map(|file| {
            let preview = previews.get(&file.id)?;
            preview.is_change().then(|| PlannedRename {
                id: file.id,
                path: file.path.clone(),
                name: file.name.clone(),
                new_name: preview.new_name.clone(),
            })
        })
        .collect()
}
