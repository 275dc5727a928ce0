//! Integration tests for the full rename workflow on a temporary directory.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::{TempDir, tempdir};

use batch_rename::RenameError;
use batch_rename::escalation::EscalationPolicy;
use batch_rename::executor::{FileSystem, LocalFileSystem, PathRename, RenameExecutor};
use batch_rename::history::HistoryLog;
use batch_rename::metadata::FileAttributes;
use batch_rename::rules::RuleConfiguration;
use batch_rename::session::{RenameSession, SessionSettings};
use batch_rename::workspace::FileInfo;

/// Local filesystem that refuses to rename selected source names and counts batch calls.
#[derive(Default)]
struct FlakyFileSystem {
    local: LocalFileSystem,
    failing_names: RefCell<HashSet<String>>,
    calls: RefCell<usize>,
}

impl FlakyFileSystem {
    fn fail(&self, names: &[&str]) {
        *self.failing_names.borrow_mut() = names.iter().map(ToString::to_string).collect();
    }
}

impl FileSystem for FlakyFileSystem {
    fn list_directory(&self, path: &Path, files_only: bool) -> Result<Vec<FileInfo>> {
        self.local.list_directory(path, files_only)
    }

    fn rename_batch(&self, renames: &[PathRename]) -> Result<Vec<PathBuf>> {
        *self.calls.borrow_mut() += 1;
        let failing = self.failing_names.borrow();
        let allowed: Vec<PathRename> = renames
            .iter()
            .filter(|rename| !failing.contains(&batch_rename::path_to_filename_string(&rename.old_path)))
            .cloned()
            .collect();
        self.local.rename_batch(&allowed)
    }
}

type FlakySession = RenameSession<FlakyFileSystem, FileAttributes>;

fn create_files(dir: &TempDir, names: &[&str]) {
    for name in names {
        fs::write(dir.path().join(name), name).expect("Failed to create test file");
    }
}

fn file_names(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir.path())
        .expect("Failed to read test directory")
        .map(|entry| entry.expect("Failed to read entry").file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

fn session(dir: &TempDir, chunk_size: usize, settings: SessionSettings) -> FlakySession {
    let executor = RenameExecutor::new(FlakyFileSystem::default()).with_chunk_size(chunk_size);
    let mut session = RenameSession::new(executor, FileAttributes, settings);
    session.add_directory(dir.path(), false).expect("Failed to list test directory");
    session
}

fn prefix_rules(text: &str) -> RuleConfiguration {
    let mut rules = RuleConfiguration::default();
    rules.prefix.enabled = true;
    rules.prefix.text = text.to_string();
    rules
}

fn replace_entire(text: &str) -> RuleConfiguration {
    let mut rules = RuleConfiguration::default();
    rules.find_replace.enabled = true;
    rules.find_replace.replace_entire = true;
    rules.find_replace.replace = text.to_string();
    rules
}

#[test]
fn preview_does_not_touch_files() {
    let dir = tempdir().unwrap();
    create_files(&dir, &["a.txt", "b.txt"]);
    let mut session = session(&dir, 50, SessionSettings::default());
    session.files_mut().set_preview_mode(true);
    session.set_rules(prefix_rules("x_"));

    let previews = session.preview();
    let names: Vec<&str> = previews.iter().map(|preview| preview.new_name.as_str()).collect();
    assert_eq!(names, vec!["x_a.txt", "x_b.txt"]);
    assert_eq!(file_names(&dir), vec!["a.txt", "b.txt"]);
    assert_eq!(session.files().files()[0].new_name.as_deref(), Some("x_a.txt"));
    assert_eq!(*session.executor().filesystem().calls.borrow(), 0);
}

#[test]
fn renames_are_sent_in_chunks() {
    let dir = tempdir().unwrap();
    create_files(&dir, &["1.txt", "2.txt", "3.txt", "4.txt", "5.txt"]);
    let mut session = session(&dir, 2, SessionSettings::default());
    session.set_rules(prefix_rules("n"));

    let report = session.apply().unwrap();
    assert!(report.outcome.is_complete_success());
    assert_eq!(report.outcome.success.len(), 5);
    assert_eq!(*session.executor().filesystem().calls.borrow(), 3);
    assert_eq!(file_names(&dir), vec!["n1.txt", "n2.txt", "n3.txt", "n4.txt", "n5.txt"]);
}

#[test]
fn invalid_names_are_skipped() {
    let dir = tempdir().unwrap();
    create_files(&dir, &["a.txt"]);
    let mut session = session(&dir, 50, SessionSettings::default());
    session.set_rules(replace_entire("bad/name"));

    let report = session.apply().unwrap();
    assert!(!report.previews[0].is_valid);
    assert!(report.previews[0].error.is_some());
    assert_eq!(report.outcome.skipped.len(), 1);
    assert!(report.outcome.success.is_empty());
    assert!(!session.history().can_undo());
    assert_eq!(file_names(&dir), vec!["a.txt"]);
}

#[test]
fn partial_failure_records_only_confirmed_renames() {
    let dir = tempdir().unwrap();
    create_files(&dir, &["a.txt", "b.txt", "c.txt"]);
    let mut session = session(&dir, 50, SessionSettings::default());
    session.executor().filesystem().fail(&["b.txt"]);
    session.set_rules(prefix_rules("new_"));

    let report = session.apply().unwrap();
    assert_eq!(report.outcome.success.len(), 2);
    assert_eq!(report.outcome.failed.len(), 1);
    assert_eq!(file_names(&dir), vec!["b.txt", "new_a.txt", "new_c.txt"]);
    assert_eq!(session.history().batch_size(), 2);

    let undo = session.undo().unwrap();
    assert_eq!(undo.success.len(), 2);
    assert_eq!(file_names(&dir), vec!["a.txt", "b.txt", "c.txt"]);
}

#[test]
fn failed_undo_stays_in_history() {
    let dir = tempdir().unwrap();
    create_files(&dir, &["a.txt", "b.txt"]);
    let mut session = session(&dir, 50, SessionSettings::default());
    session.set_rules(prefix_rules("new_"));
    session.apply().unwrap();

    session.executor().filesystem().fail(&["new_b.txt"]);
    let undo = session.undo().unwrap();
    assert_eq!(undo.success.len(), 1);
    assert_eq!(undo.failed.len(), 1);
    assert_eq!(file_names(&dir), vec!["a.txt", "new_b.txt"]);
    assert!(session.history().can_undo());
    assert_eq!(session.history().batch_size(), 1);

    session.executor().filesystem().fail(&[]);
    let undo = session.undo().unwrap();
    assert_eq!(undo.success.len(), 1);
    assert_eq!(file_names(&dir), vec!["a.txt", "b.txt"]);
    assert!(!session.history().can_undo());
}

#[test]
fn escalation_skips_padding_taken_by_existing_file() {
    let dir = tempdir().unwrap();
    create_files(&dir, &["a.txt", "b.txt", "same01.txt"]);
    let mut session = session(&dir, 50, SessionSettings::default());
    let bystander = session
        .files()
        .files()
        .iter()
        .find(|file| file.name == "same01.txt")
        .map(|file| file.id)
        .unwrap();
    session.files_mut().deselect(bystander);
    session.set_rules(replace_entire("same"));

    let report = session.apply().unwrap();
    let escalation = report.escalation.unwrap();
    assert_eq!(escalation.padding, 3);
    assert_eq!(escalation.attempts, 2);
    assert_eq!(file_names(&dir), vec!["same001.txt", "same002.txt", "same01.txt"]);
}

#[test]
fn exhausted_escalation_renames_nothing() {
    let dir = tempdir().unwrap();
    create_files(&dir, &["a.txt", "b.txt", "same01.txt"]);
    let settings = SessionSettings {
        escalation: EscalationPolicy::new(vec![2]),
        ..SessionSettings::default()
    };
    let mut session = session(&dir, 50, settings);
    let bystander = session
        .files()
        .files()
        .iter()
        .find(|file| file.name == "same01.txt")
        .map(|file| file.id)
        .unwrap();
    session.files_mut().deselect(bystander);
    session.set_rules(replace_entire("same"));

    match session.apply() {
        Err(RenameError::EscalationExhausted { report, attempts }) => {
            assert_eq!(attempts, 1);
            assert!(!report.is_empty());
        }
        other => panic!("expected exhausted escalation, got {other:?}"),
    }
    assert_eq!(file_names(&dir), vec!["a.txt", "b.txt", "same01.txt"]);
    assert!(!session.history().can_undo());
}

#[test]
fn saved_history_can_be_undone_and_redone_later() {
    let dir = tempdir().unwrap();
    let data = tempdir().unwrap();
    let history_path = data.path().join("nested").join("history.json");
    create_files(&dir, &["a.txt", "b.txt"]);

    let mut first = session(&dir, 50, SessionSettings::default());
    first.set_rules(prefix_rules("new_"));
    first.apply().unwrap();
    first.history().save(&history_path).unwrap();

    let history = HistoryLog::load(&history_path, 100).unwrap();
    assert_eq!(history.len(), 2);
    let executor = RenameExecutor::new(LocalFileSystem::default());
    let mut second = RenameSession::new(executor, FileAttributes, SessionSettings::default()).with_history(history);

    let undo = second.undo().unwrap();
    assert_eq!(undo.success.len(), 2);
    assert_eq!(file_names(&dir), vec!["a.txt", "b.txt"]);
    second.history().save(&history_path).unwrap();

    let history = HistoryLog::load(&history_path, 100).unwrap();
    assert!(history.can_redo());
    assert!(!history.can_undo());
    let executor = RenameExecutor::new(LocalFileSystem::default());
    let mut third = RenameSession::new(executor, FileAttributes, SessionSettings::default()).with_history(history);

    let redo = third.redo().unwrap();
    assert_eq!(redo.success.len(), 2);
    assert_eq!(file_names(&dir), vec!["new_a.txt", "new_b.txt"]);
    assert!(third.history().can_undo());
}

#[test]
fn new_batch_clears_redo() {
    let dir = tempdir().unwrap();
    create_files(&dir, &["a.txt"]);
    let mut session = session(&dir, 50, SessionSettings::default());
    session.set_rules(prefix_rules("x_"));
    session.apply().unwrap();
    session.undo().unwrap();
    assert!(session.history().can_redo());

    session.set_rules(prefix_rules("y_"));
    session.apply().unwrap();
    assert!(!session.history().can_redo());
    assert_eq!(file_names(&dir), vec!["y_a.txt"]);
}
