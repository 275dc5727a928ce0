//! Owned state of one renaming session.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;

use crate::conflict::{CollisionReport, detect_duplicates};
use crate::error::RenameError;
use crate::escalation::{AutoNumbering, EscalationPolicy};
use crate::executor::{FileSystem, RenameExecutor, RenameOutcome, RenameRequest};
use crate::history::{HistoryLog, RenameRecord};
use crate::metadata::{MetadataExtractor, collect_metadata};
use crate::preview::{PreviewContext, PreviewResult, generate_preview_with, plan_renames};
use crate::rules::RuleConfiguration;
use crate::workspace::{FileId, FileInfo, WorkingSet};

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub escalation: EscalationPolicy,
    /// Resolve collisions with automatic numbering instead of failing.
    pub auto_number: bool,
    pub verbose: bool,
}

/// Numbering that was forced on to resolve collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationSummary {
    pub padding: usize,
    pub attempts: usize,
}

/// Result of applying the rules to the selected files.
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub outcome: RenameOutcome,
    /// Previews the renames were executed from.
    pub previews: Vec<PreviewResult>,
    /// Rules the previews were generated with.
    pub rules: RuleConfiguration,
    pub escalation: Option<EscalationSummary>,
}

/// Working set, rules and history with the services that act on them.
#[derive(Debug)]
pub struct RenameSession<F, M> {
    files: WorkingSet,
    rules: RuleConfiguration,
    history: HistoryLog,
    executor: RenameExecutor<F>,
    metadata: M,
    settings: SessionSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            escalation: EscalationPolicy::default(),
            auto_number: true,
            verbose: false,
        }
    }
}

impl<F: FileSystem, M: MetadataExtractor> RenameSession<F, M> {
    #[must_use]
    pub fn new(executor: RenameExecutor<F>, metadata: M, settings: SessionSettings) -> Self {
        Self {
            files: WorkingSet::new(),
            rules: RuleConfiguration::default(),
            history: HistoryLog::default(),
            executor,
            metadata,
            settings,
        }
    }

    /// Use a loaded history. New file ids are allocated above the ids it references.
    #[must_use]
    pub fn with_history(mut self, history: HistoryLog) -> Self {
        if let Some(id) = history.max_file_id() {
            self.files.reserve_ids_through(id);
        }
        self.history = history;
        self
    }

    #[must_use]
    pub const fn files(&self) -> &WorkingSet {
        &self.files
    }

    pub const fn files_mut(&mut self) -> &mut WorkingSet {
        &mut self.files
    }

    #[must_use]
    pub const fn rules(&self) -> &RuleConfiguration {
        &self.rules
    }

    pub fn set_rules(&mut self, rules: RuleConfiguration) {
        self.rules = rules;
    }

    #[must_use]
    pub const fn history(&self) -> &HistoryLog {
        &self.history
    }

    #[must_use]
    pub const fn executor(&self) -> &RenameExecutor<F> {
        &self.executor
    }

    #[must_use]
    pub const fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Add the entries of a directory to the working set.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be listed.
    pub fn add_directory(&mut self, path: &Path, include_dirs: bool) -> Result<Vec<FileId>> {
        let entries = self.executor.filesystem().list_directory(path, !include_dirs)?;
        Ok(self.files.add_files(entries))
    }

    /// Add individual paths to the working set.
    ///
    /// # Errors
    /// Returns an error if any path cannot be read.
    pub fn add_paths(&mut self, paths: &[PathBuf]) -> Result<Vec<FileId>> {
        let entries = paths
            .iter()
            .map(|path| FileInfo::from_path(path))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.files.add_files(entries))
    }

    /// Compute the new names of the selected files with the current rules.
    /// Valid names are staged in the working set while preview mode is on.
    pub fn preview(&mut self) -> Vec<PreviewResult> {
        let context = self.preview_context(&self.rules);
        let previews = self.preview_with(&self.rules, &context);
        self.files.apply_preview(&previews);
        previews
    }

    /// Find collisions between the planned renames of the previews,
    /// including existing files in the target directories.
    #[must_use]
    pub fn check_collisions(&self, previews: &[PreviewResult]) -> CollisionReport {
        let planned = plan_renames(&self.files.selected_files(), previews);
        let directories: BTreeSet<PathBuf> = planned
            .iter()
            .filter_map(|rename| rename.path.parent().map(Path::to_path_buf))
            .collect();
        detect_duplicates(&planned, &self.existing_paths(&directories))
    }

    /// Rename the selected files.
    ///
    /// Collisions are resolved with automatic numbering when enabled.
    /// Confirmed renames update the working set and are recorded as one history batch.
    ///
    /// # Errors
    /// Returns `Collision` when automatic numbering is off,
    /// `EscalationExhausted` when numbering could not resolve the collisions
    /// and `Busy` if the executor is already running a batch.
    pub fn apply(&mut self) -> Result<ApplyReport, RenameError> {
        let context = self.preview_context(&self.rules);
        let mut rules = self.rules.clone();
        let mut previews = self.preview_with(&rules, &context);
        let mut escalation = None;

        let report = self.check_collisions(&previews);
        if !report.is_empty() {
            if !self.settings.auto_number {
                return Err(RenameError::Collision(report));
            }
            let resolution = AutoNumbering::new(self.settings.escalation.clone()).resolve(
                &self.rules,
                previews.len(),
                report,
                |forced| self.preview_with(forced, &context),
                |previews| self.check_collisions(previews),
            )?;
            if self.settings.verbose {
                println!(
                    "{}",
                    format!(
                        "Resolved conflicting names with {} digit numbering",
                        resolution.padding
                    )
                    .yellow()
                );
            }
            escalation = Some(EscalationSummary {
                padding: resolution.padding,
                attempts: resolution.attempts,
            });
            rules = resolution.rules;
            previews = resolution.previews;
        }

        let requests: Vec<RenameRequest> = previews
            .iter()
            .map(|preview| RenameRequest {
                id: preview.file_id,
                old_name: preview.original_name.clone(),
                new_name: preview.is_valid.then(|| preview.new_name.clone()),
            })
            .collect();

        let outcome = self.executor.rename_files(&self.files, &requests)?;
        for rename in &outcome.completed {
            self.files.mark_renamed(rename.id, &rename.new_path);
        }
        self.history.record_batch(&outcome.completed);

        Ok(ApplyReport {
            outcome,
            previews,
            rules,
            escalation,
        })
    }

    /// Revert the newest history batch.
    ///
    /// Records whose undo failed go back into the history.
    ///
    /// # Errors
    /// Returns `Busy` if the executor is already running a batch.
    pub fn undo(&mut self) -> Result<RenameOutcome, RenameError> {
        let batch = self.history.undo_last_rename();
        if batch.is_empty() {
            return Ok(RenameOutcome::default());
        }
        let pairs: Vec<_> = batch.iter().map(RenameRecord::undo_pair).collect();
        let outcome = match self.executor.rename_paths(&pairs) {
            Ok(outcome) => outcome,
            Err(error) => {
                let ids: Vec<FileId> = batch.iter().map(|record| record.id).collect();
                self.history.track_failed_undos(&ids);
                return Err(error);
            }
        };
        for rename in &outcome.completed {
            self.files.mark_renamed(rename.id, &rename.new_path);
        }
        self.history.track_failed_undos(&outcome.failed);
        Ok(outcome)
    }

    /// Apply the latest undone batch again.
    ///
    /// Records whose redo failed stay on the redo stack.
    ///
    /// # Errors
    /// Returns `Busy` if the executor is already running a batch.
    pub fn redo(&mut self) -> Result<RenameOutcome, RenameError> {
        let batch = self.history.redo_last_undo();
        if batch.is_empty() {
            return Ok(RenameOutcome::default());
        }
        let pairs: Vec<_> = batch.iter().map(RenameRecord::redo_pair).collect();
        let outcome = match self.executor.rename_paths(&pairs) {
            Ok(outcome) => outcome,
            Err(error) => {
                self.history.complete_redo(batch, &[]);
                return Err(error);
            }
        };
        for rename in &outcome.completed {
            self.files.mark_renamed(rename.id, &rename.new_path);
        }
        self.history.complete_redo(batch, &outcome.success);
        Ok(outcome)
    }

    fn preview_context(&self, rules: &RuleConfiguration) -> PreviewContext {
        let files = self.files.selected_files();
        PreviewContext::default().with_metadata(collect_metadata(&self.metadata, &files, &rules.metadata))
    }

    fn preview_with(&self, rules: &RuleConfiguration, context: &PreviewContext) -> Vec<PreviewResult> {
        generate_preview_with(&self.files.selected_files(), rules, context)
    }

    /// Paths in the working set plus the current entries of the given directories.
    fn existing_paths(&self, directories: &BTreeSet<PathBuf>) -> Vec<PathBuf> {
        let mut paths = self.files.paths();
        for directory in directories {
            match self.executor.filesystem().list_directory(directory, false) {
                Ok(entries) => paths.extend(entries.into_iter().map(|entry| entry.path)),
                Err(error) => {
                    if self.settings.verbose {
                        crate::print_warning!("Could not list {}: {error:#}", directory.display());
                    }
                }
            }
        }
        paths
    }
}
