//! Undo and redo history of executed rename batches.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::executor::{CompletedRename, PathRename};
use crate::workspace::FileId;

/// Maximum number of records kept in the history.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// One executed rename. Records of the same batch share the timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRecord {
    pub id: FileId,
    pub old_path: PathBuf,
    pub old_name: String,
    pub new_path: PathBuf,
    pub new_name: String,
    /// Batch key in milliseconds.
    pub timestamp: i64,
}

/// Batches of renames, newest first, with a stack of undone batches.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    records: Vec<RenameRecord>,
    redo_stack: Vec<Vec<RenameRecord>>,
    max_len: usize,
    last_timestamp: i64,
}

/// On-disk format of the history.
#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    records: Vec<RenameRecord>,
    #[serde(default)]
    redo: Vec<Vec<RenameRecord>>,
}

impl RenameRecord {
    #[must_use]
    pub fn from_completed(rename: &CompletedRename, timestamp: i64) -> Self {
        Self {
            id: rename.id,
            old_name: crate::path_to_filename_string(&rename.old_path),
            old_path: rename.old_path.clone(),
            new_name: crate::path_to_filename_string(&rename.new_path),
            new_path: rename.new_path.clone(),
            timestamp,
        }
    }

    /// Rename that reverts this record.
    #[must_use]
    pub fn undo_pair(&self) -> (FileId, PathRename) {
        (self.id, PathRename::new(&self.new_path, &self.old_path))
    }

    /// Rename that applies this record again.
    #[must_use]
    pub fn redo_pair(&self) -> (FileId, PathRename) {
        (self.id, PathRename::new(&self.old_path, &self.new_path))
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryLog {
    #[must_use]
    pub const fn new(max_len: usize) -> Self {
        Self {
            records: Vec::new(),
            redo_stack: Vec::new(),
            max_len,
            last_timestamp: 0,
        }
    }

    /// New batch timestamp, strictly greater than any previous one.
    pub fn next_timestamp(&mut self) -> i64 {
        let now = Local::now().timestamp_millis();
        self.last_timestamp = now.max(self.last_timestamp + 1);
        self.last_timestamp
    }

    /// Add a batch to the head of the history and clear the redo stack.
    pub fn add_rename(&mut self, records: Vec<RenameRecord>) {
        if records.is_empty() {
            return;
        }
        self.prepend(records);
        self.redo_stack.clear();
    }

    /// Record the confirmed renames of one batch.
    /// Returns the batch timestamp, or `None` if there was nothing to record.
    pub fn record_batch(&mut self, completed: &[CompletedRename]) -> Option<i64> {
        if completed.is_empty() {
            return None;
        }
        let timestamp = self.next_timestamp();
        let records = completed
            .iter()
            .map(|rename| RenameRecord::from_completed(rename, timestamp))
            .collect();
        self.add_rename(records);
        Some(timestamp)
    }

    /// Take the newest batch off the history and push it onto the redo stack.
    ///
    /// Returns an empty list if there is nothing to undo.
    pub fn undo_last_rename(&mut self) -> Vec<RenameRecord> {
        let count = self.batch_size();
        if count == 0 {
            return Vec::new();
        }
        let batch: Vec<RenameRecord> = self.records.drain(..count).collect();
        self.redo_stack.push(batch.clone());
        batch
    }

    /// Put records of the latest undone batch back into the history when their undo failed.
    ///
    /// The failed records form a new batch so they can be undone again.
    /// Returns the number of records put back.
    pub fn track_failed_undos(&mut self, failed: &[FileId]) -> usize {
        if failed.is_empty() {
            return 0;
        }
        let Some(batch) = self.redo_stack.pop() else {
            return 0;
        };
        let failed: HashSet<FileId> = failed.iter().copied().collect();
        let (requeued, undone): (Vec<RenameRecord>, Vec<RenameRecord>) =
            batch.into_iter().partition(|record| failed.contains(&record.id));
        if !undone.is_empty() {
            self.redo_stack.push(undone);
        }

        let count = requeued.len();
        if count > 0 {
            let timestamp = self.next_timestamp();
            self.prepend(with_timestamp(requeued, timestamp));
        }
        count
    }

    /// Pop the latest undone batch for re-applying.
    ///
    /// Pass the result to [`HistoryLog::complete_redo`] after executing it.
    pub fn redo_last_undo(&mut self) -> Vec<RenameRecord> {
        self.redo_stack.pop().unwrap_or_default()
    }

    /// Record the outcome of a redo.
    ///
    /// Succeeded records become a new batch in the history.
    /// Failed records go back onto the redo stack.
    pub fn complete_redo(&mut self, records: Vec<RenameRecord>, succeeded: &[FileId]) {
        let succeeded: HashSet<FileId> = succeeded.iter().copied().collect();
        let (redone, failed): (Vec<RenameRecord>, Vec<RenameRecord>) =
            records.into_iter().partition(|record| succeeded.contains(&record.id));
        if !redone.is_empty() {
            let timestamp = self.next_timestamp();
            self.prepend(with_timestamp(redone, timestamp));
        }
        if !failed.is_empty() {
            self.redo_stack.push(failed);
        }
    }

    #[must_use]
    pub const fn can_undo(&self) -> bool {
        !self.records.is_empty()
    }

    #[must_use]
    pub const fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of records in the newest batch.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.records.first().map_or(0, |head| {
            self.records
                .iter()
                .take_while(|record| record.timestamp == head.timestamp)
                .count()
        })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.redo_stack.clear();
    }

    /// Records newest first.
    #[must_use]
    pub fn records(&self) -> &[RenameRecord] {
        &self.records
    }

    /// Largest file id referenced by the history or the redo stack.
    #[must_use]
    pub fn max_file_id(&self) -> Option<FileId> {
        self.records
            .iter()
            .chain(self.redo_stack.iter().flatten())
            .map(|record| record.id)
            .max()
    }

    /// Read the history from a JSON file. A missing file gives an empty history.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path, max_len: usize) -> Result<Self> {
        let mut history = Self::new(max_len);
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(history),
            Err(error) => {
                return Err(error).with_context(|| format!("Failed to read history file {}", path.display()));
            }
        };
        let file: HistoryFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse history JSON {}", path.display()))?;

        history.last_timestamp = file
            .records
            .iter()
            .chain(file.redo.iter().flatten())
            .map(|record| record.timestamp)
            .max()
            .unwrap_or_default();
        history.records = file.records;
        history.records.truncate(max_len);
        history.redo_stack = file.redo;
        Ok(history)
    }

    /// Write the history to a JSON file, creating the parent directory if needed.
    ///
    /// # Errors
    /// Returns an error if serialization or writing fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let file = HistoryFile {
            records: self.records.clone(),
            redo: self.redo_stack.clone(),
        };
        let json = serde_json::to_string_pretty(&file).context("Failed to serialize history")?;
        fs::write(path, json).with_context(|| format!("Failed to write history file {}", path.display()))
    }

    fn prepend(&mut self, mut records: Vec<RenameRecord>) {
        records.append(&mut self.records);
        records.truncate(self.max_len);
        self.records = records;
    }
}

fn with_timestamp(records: Vec<RenameRecord>, timestamp: i64) -> Vec<RenameRecord> {
    records
        .into_iter()
        .map(|record| RenameRecord { timestamp, ..record })
        .collect()
}

#[cfg(test)]
mod history_tests {
    use super::*;

    fn completed(id: u64, old: &str, new: &str) -> CompletedRename {
        CompletedRename {
            id: FileId(id),
            old_path: PathBuf::from("/data").join(old),
            new_path: PathBuf::from("/data").join(new),
        }
    }

    fn history_with_two_batches() -> HistoryLog {
        let mut history = HistoryLog::default();
        history.record_batch(&[completed(0, "a.txt", "a1.txt"), completed(1, "b.txt", "b1.txt")]);
        history.record_batch(&[completed(2, "c.txt", "c1.txt")]);
        history
    }

    #[test]
    fn batches_share_timestamp_and_are_newest_first() {
        let history = history_with_two_batches();
        let records = history.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, FileId(2));
        assert_eq!(records[1].timestamp, records[2].timestamp);
        assert!(records[0].timestamp > records[1].timestamp);
        assert_eq!(history.batch_size(), 1);
        assert_eq!(records[1].old_name, "a.txt");
        assert_eq!(records[1].new_name, "a1.txt");
    }

    #[test]
    fn empty_batch_is_not_recorded() {
        let mut history = HistoryLog::default();
        assert!(history.record_batch(&[]).is_none());
        history.add_rename(Vec::new());
        assert!(!history.can_undo());
    }

    #[test]
    fn history_is_capped() {
        let mut history = HistoryLog::new(2);
        history.record_batch(&[completed(0, "a", "b")]);
        history.record_batch(&[completed(1, "c", "d"), completed(2, "e", "f")]);
        assert_eq!(history.len(), 2);
        let ids: Vec<FileId> = history.records().iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![FileId(1), FileId(2)]);
    }

    #[test]
    fn undo_takes_whole_batch() {
        let mut history = history_with_two_batches();
        let batch = history.undo_last_rename();
        assert_eq!(batch.len(), 1);
        let batch = history.undo_last_rename();
        assert_eq!(batch.len(), 2);
        let (id, pair) = batch[0].undo_pair();
        assert_eq!(id, FileId(0));
        assert_eq!(pair, PathRename::new("/data/a1.txt", "/data/a.txt"));
        assert!(!history.can_undo());
        assert!(history.undo_last_rename().is_empty());
        assert!(history.can_redo());
    }

    #[test]
    fn undo_then_redo_restores_records() {
        let mut history = history_with_two_batches();
        let undone = history.undo_last_rename();
        let redo = history.redo_last_undo();
        assert_eq!(redo, undone);
        assert_eq!(redo[0].redo_pair().1, PathRename::new("/data/c.txt", "/data/c1.txt"));

        history.complete_redo(redo, &[FileId(2)]);
        assert_eq!(history.len(), 3);
        assert_eq!(history.records()[0].new_path, PathBuf::from("/data/c1.txt"));
        assert!(!history.can_redo());
    }

    #[test]
    fn new_batch_clears_redo() {
        let mut history = history_with_two_batches();
        history.undo_last_rename();
        assert!(history.can_redo());
        history.record_batch(&[completed(5, "x", "y")]);
        assert!(!history.can_redo());
    }

    #[test]
    fn failed_undo_is_requeued() {
        let mut history = history_with_two_batches();
        history.undo_last_rename();
        let batch = history.undo_last_rename();
        assert_eq!(batch.len(), 2);

        assert_eq!(history.track_failed_undos(&[FileId(1)]), 1);
        assert!(history.can_undo());
        assert_eq!(history.records()[0].id, FileId(1));
        assert_eq!(history.batch_size(), 1);

        // The successful part stays redoable
        let redo = history.redo_last_undo();
        assert_eq!(redo.len(), 1);
        assert_eq!(redo[0].id, FileId(0));
    }

    #[test]
    fn failed_redo_stays_redoable() {
        let mut history = history_with_two_batches();
        history.undo_last_rename();
        history.undo_last_rename();
        let redo = history.redo_last_undo();
        history.complete_redo(redo, &[FileId(0)]);

        assert_eq!(history.records()[0].id, FileId(0));
        assert!(history.can_redo());
        let retry = history.redo_last_undo();
        assert_eq!(retry.len(), 1);
        assert_eq!(retry[0].id, FileId(1));
    }

    #[test]
    fn max_file_id_includes_redo_stack() {
        let mut history = history_with_two_batches();
        history.undo_last_rename();
        assert_eq!(history.max_file_id(), Some(FileId(2)));
        history.clear();
        assert_eq!(history.max_file_id(), None);
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.json");
        let mut history = history_with_two_batches();
        history.undo_last_rename();
        history.save(&path).unwrap();

        let mut loaded = HistoryLog::load(&path, DEFAULT_HISTORY_LIMIT).unwrap();
        assert_eq!(loaded.records(), history.records());
        assert!(loaded.can_redo());
        let newest = loaded.records()[0].timestamp;
        assert!(loaded.next_timestamp() > newest);
    }

    #[test]
    fn load_missing_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryLog::load(&dir.path().join("missing.json"), 10).unwrap();
        assert!(history.is_empty());

        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(HistoryLog::load(&path, 10).is_err());
    }
}
