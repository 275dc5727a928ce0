use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use colored::Colorize;
use itertools::Itertools;

use batch_rename::RenameError;
use batch_rename::config::{CONFIG_PATH, HISTORY_PATH};
use batch_rename::executor::{CompletedRename, LocalFileSystem, RenameExecutor, RenameOutcome};
use batch_rename::history::{HistoryLog, RenameRecord};
use batch_rename::metadata::FileAttributes;
use batch_rename::preview::PreviewResult;
use batch_rename::session::RenameSession;

use crate::config::Config;
use crate::{Args, Command, PresetAction};

/// Maximum number of conflicts or ids listed in a message.
const MAX_LISTED_ITEMS: usize = 10;

type Session = RenameSession<LocalFileSystem, FileAttributes>;

/// Batch renamer for the files under one root path.
#[derive(Debug)]
pub struct BatchRename {
    root: PathBuf,
    config: Config,
}

impl BatchRename {
    /// Create a new instance with CLI args.
    pub fn new(args: Args) -> Result<Self> {
        let config = Config::from_args(args)?;
        let root = batch_rename::resolve_input_path(config.path.as_deref())?;
        Ok(Self { root, config })
    }

    pub fn run_with_args(args: Args) -> Result<()> {
        Self::new(args)?.run()
    }

    /// Run the selected command.
    pub fn run(&self) -> Result<()> {
        if self.config.debug {
            println!("{self}");
        }
        match &self.config.command {
            Some(Command::Undo) => self.undo(),
            Some(Command::Redo) => self.redo(),
            Some(Command::History { count }) => self.print_history(*count),
            Some(Command::Preset { action }) => self.preset(action),
            None => self.rename(),
        }
    }

    /// Preview and apply the rules to the files under the root path.
    fn rename(&self) -> Result<()> {
        if let Some(path) = &self.config.export {
            fs::write(path, self.config.rules.to_toml_string()?)
                .with_context(|| format!("Failed to write rules to {}", path.display()))?;
            println!("Rules written to: {}", path.display());
        }
        if !self.config.rules.has_enabled_rules() {
            batch_rename::print_warning!("No rename rules given");
            return Ok(());
        }

        let mut session = self.session()?;
        if self.root.is_file() {
            session.add_paths(std::slice::from_ref(&self.root))?;
        } else {
            session.add_directory(&self.root, self.config.include_dirs)?;
        }
        let selected = session.files_mut().apply_filter(&self.config.filter);
        if self.config.verbose && !self.config.filter.is_all() {
            println!(
                "Filter {} matched {} of {}",
                self.config.filter,
                selected,
                Self::file_count(session.files().len())
            );
        }
        if selected == 0 {
            if self.config.verbose {
                println!("No files to rename");
            }
            return Ok(());
        }
        session.set_rules(self.config.rules.clone());

        let previews = session.preview();
        if self.config.dryrun {
            self.print_previews(&previews, "Dryrun");
            let collisions = session.check_collisions(&previews);
            if !collisions.is_empty() {
                batch_rename::print_warning!(
                    "{} conflicting name(s):\n{}",
                    collisions.len(),
                    collisions.summary(MAX_LISTED_ITEMS)
                );
            }
            let count = previews.iter().filter(|preview| preview.is_change()).count();
            println!("Dryrun: would have renamed {}", Self::file_count(count));
            return Ok(());
        }

        let report = match session.apply() {
            Ok(report) => report,
            Err(RenameError::Collision(collisions)) => {
                anyhow::bail!(
                    "{} conflicting name(s), nothing was renamed:\n{}",
                    collisions.len(),
                    collisions.summary(MAX_LISTED_ITEMS)
                );
            }
            Err(RenameError::EscalationExhausted { report, attempts }) => {
                anyhow::bail!(
                    "Automatic numbering could not resolve {} conflict(s) after {attempts} attempt(s), nothing was renamed:\n{}",
                    report.len(),
                    report.summary(MAX_LISTED_ITEMS)
                );
            }
            Err(error) => return Err(error.into()),
        };

        if let Some(escalation) = report.escalation {
            batch_rename::print_warning!(
                "Conflicting names were numbered with {} digits",
                escalation.padding
            );
        }
        self.print_completed(&report.outcome.completed, "Rename");
        self.print_failures(&report.outcome, &report.previews);
        self.save_history(session.history())?;
        println!(
            "{}",
            format!("Renamed {}", Self::file_count(report.outcome.success.len())).green()
        );
        Ok(())
    }

    /// Revert the latest batch from the history.
    fn undo(&self) -> Result<()> {
        let mut session = self.session()?;
        if !session.history().can_undo() {
            println!("Nothing to undo");
            return Ok(());
        }
        if self.config.dryrun {
            let batch = &session.history().records()[..session.history().batch_size()];
            for record in batch {
                self.print_pair(&record.new_path, &record.old_path);
            }
            println!("Dryrun: would have restored {}", Self::file_count(batch.len()));
            return Ok(());
        }

        let outcome = session.undo()?;
        self.print_completed(&outcome.completed, "Undo");
        if !outcome.failed.is_empty() {
            batch_rename::print_warning!(
                "Failed to restore {} and kept them in the history: {}",
                Self::file_count(outcome.failed.len()),
                batch_rename::summarize_ids(&outcome.failed, MAX_LISTED_ITEMS)
            );
        }
        self.save_history(session.history())?;
        println!(
            "{}",
            format!("Restored {}", Self::file_count(outcome.success.len())).green()
        );
        Ok(())
    }

    /// Apply the latest undone batch again.
    fn redo(&self) -> Result<()> {
        let mut session = self.session()?;
        if !session.history().can_redo() {
            println!("Nothing to redo");
            return Ok(());
        }
        if self.config.dryrun {
            println!("Dryrun: would have redone the latest undo");
            return Ok(());
        }

        let outcome = session.redo()?;
        self.print_completed(&outcome.completed, "Redo");
        if !outcome.failed.is_empty() {
            batch_rename::print_warning!(
                "Failed to redo {}: {}",
                Self::file_count(outcome.failed.len()),
                batch_rename::summarize_ids(&outcome.failed, MAX_LISTED_ITEMS)
            );
        }
        self.save_history(session.history())?;
        println!(
            "{}",
            format!("Renamed {}", Self::file_count(outcome.success.len())).green()
        );
        Ok(())
    }

    /// Print the newest batches of the history.
    fn print_history(&self, count: usize) -> Result<()> {
        let history = HistoryLog::load(&HISTORY_PATH, self.config.history_limit)?;
        if history.is_empty() {
            println!("History is empty");
            return Ok(());
        }
        let batches = history.records().iter().chunk_by(|record| record.timestamp);
        for (timestamp, records) in batches.into_iter().take(count) {
            let records: Vec<&RenameRecord> = records.collect();
            let time = DateTime::from_timestamp_millis(timestamp).map_or_else(
                || timestamp.to_string(),
                |time| time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
            );
            println!("{}", format!("{time}: {}", Self::file_count(records.len())).bold());
            for record in records {
                println!("  {} -> {}", record.old_name, record.new_name);
            }
        }
        if self.config.verbose {
            println!("History file: {}", HISTORY_PATH.display());
        }
        Ok(())
    }

    /// List or edit the presets in the user config.
    fn preset(&self, action: &PresetAction) -> Result<()> {
        let mut presets = self.config.presets.clone();
        let message = match action {
            PresetAction::List => {
                self.print_presets();
                return Ok(());
            }
            PresetAction::Save { name } => {
                if name.trim().is_empty() {
                    anyhow::bail!("Preset name cannot be empty");
                }
                if !self.config.rules.has_enabled_rules() {
                    anyhow::bail!("No rename rules given for preset '{name}'");
                }
                presets.save(name, &self.config.rules);
                format!("Saved preset: {}", name.trim())
            }
            PresetAction::Remove { name } => {
                if !presets.remove(name) {
                    anyhow::bail!("Unknown preset: '{name}'");
                }
                format!("Removed preset: {}", name.trim())
            }
            PresetAction::Rename { old_name, new_name } => {
                if !presets.rename(old_name, new_name) {
                    anyhow::bail!("Cannot rename preset '{old_name}' to '{new_name}'");
                }
                format!("Renamed preset: {} -> {}", old_name.trim(), new_name.trim())
            }
        };

        let Some(path) = CONFIG_PATH.as_deref() else {
            anyhow::bail!("Could not determine the user config path");
        };
        if self.config.dryrun {
            println!("Dryrun: {message}");
            return Ok(());
        }
        batch_rename::config::save_presets(path, &presets)?;
        println!("{}", message.green());
        if self.config.verbose {
            println!("Presets saved to: {}", path.display());
        }
        Ok(())
    }

    fn print_presets(&self) {
        if self.config.presets.is_empty() {
            println!("No saved presets");
            return;
        }
        for name in self.config.presets.names() {
            println!("{}", name.bold());
            if self.config.verbose
                && let Some(rules) = self.config.presets.get(name)
            {
                print!("{rules}");
            }
        }
    }

    fn session(&self) -> Result<Session> {
        let executor = RenameExecutor::new(LocalFileSystem::new(self.config.recurse, self.config.verbose))
            .with_chunk_size(self.config.chunk_size)
            .with_verbose(self.config.verbose);
        let history = HistoryLog::load(&HISTORY_PATH, self.config.history_limit)?;
        Ok(RenameSession::new(executor, FileAttributes, self.config.session_settings()).with_history(history))
    }

    fn save_history(&self, history: &HistoryLog) -> Result<()> {
        history.save(&HISTORY_PATH)?;
        if self.config.verbose {
            println!("History saved to: {}", HISTORY_PATH.display());
        }
        Ok(())
    }

    fn print_previews(&self, previews: &[PreviewResult], label: &str) {
        let changes: Vec<&PreviewResult> = previews.iter().filter(|preview| preview.is_change()).collect();
        let max_items = changes.len();
        let max_chars = max_items.checked_ilog10().map_or(1, |d| d as usize + 1);
        for (index, preview) in changes.iter().enumerate() {
            let number = format!("{:>max_chars$} / {max_items}", index + 1);
            println!("{}", format!("{label} {number}:").bold().cyan());
            batch_rename::show_diff(&preview.original_name, &preview.new_name);
        }
        for preview in previews.iter().filter(|preview| !preview.is_valid) {
            self.print_invalid(preview);
        }
    }

    fn print_completed(&self, completed: &[CompletedRename], label: &str) {
        let max_items = completed.len();
        let max_chars = max_items.checked_ilog10().map_or(1, |d| d as usize + 1);
        for (index, rename) in completed.iter().enumerate() {
            let number = format!("{:>max_chars$} / {max_items}", index + 1);
            println!("{}", format!("{label} {number}:").bold().magenta());
            self.print_pair(&rename.old_path, &rename.new_path);
        }
    }

    fn print_pair(&self, old_path: &Path, new_path: &Path) {
        let old_str = batch_rename::get_relative_path_or_filename(old_path, &self.root);
        let new_str = batch_rename::get_relative_path_or_filename(new_path, &self.root);
        batch_rename::show_diff(&old_str, &new_str);
    }

    fn print_invalid(&self, preview: &PreviewResult) {
        let reason = preview.error.as_deref().unwrap_or("Invalid name");
        batch_rename::print_warning!(
            "Skipping {}: {}",
            preview.original_name,
            batch_rename::truncate_message(reason, self.config.message_limit)
        );
    }

    fn print_failures(&self, outcome: &RenameOutcome, previews: &[PreviewResult]) {
        for preview in previews.iter().filter(|preview| !preview.is_valid) {
            self.print_invalid(preview);
        }
        if !outcome.failed.is_empty() {
            let names = previews
                .iter()
                .filter(|preview| outcome.failed.contains(&preview.file_id))
                .map(|preview| preview.original_name.as_str())
                .collect::<Vec<_>>();
            batch_rename::print_error!(
                "Failed to rename {}: {}",
                Self::file_count(outcome.failed.len()),
                batch_rename::summarize_ids(&names, MAX_LISTED_ITEMS)
            );
        }
    }

    fn file_count(count: usize) -> String {
        format!("{count} {}", if count == 1 { "file" } else { "files" })
    }
}

impl fmt::Display for BatchRename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Root: {}", self.root.display())?;
        write!(f, "{}", self.config)
    }
}
