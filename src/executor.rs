//! Chunked execution of confirmed renames.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use indicatif::ProgressBar;
#[cfg(not(test))]
use indicatif::ProgressStyle;
use itertools::Itertools;
use walkdir::WalkDir;

use crate::error::RenameError;
use crate::validate::is_valid_file_name;
use crate::workspace::{FileId, FileInfo, WorkingSet};

/// Number of rename pairs sent to the filesystem in one call.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

#[cfg(not(test))]
const PROGRESS_BAR_CHARS: &str = "=> ";
#[cfg(not(test))]
const PROGRESS_BAR_TEMPLATE: &str = "[{elapsed_precise}] {bar:80.cyan/blue} {pos}/{len} {percent}%";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRename {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
}

/// Filesystem operations used by the engine.
pub trait FileSystem {
    /// List the entries of a directory.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be read.
    fn list_directory(&self, path: &Path, files_only: bool) -> Result<Vec<FileInfo>>;

    /// Rename the given pairs and return the old paths that were renamed.
    ///
    /// # Errors
    /// An error means the whole batch failed.
    fn rename_batch(&self, renames: &[PathRename]) -> Result<Vec<PathBuf>>;
}

/// Filesystem access through `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem {
    recurse: bool,
    verbose: bool,
}

/// One requested rename by file id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRequest {
    pub id: FileId,
    pub old_name: String,
    pub new_name: Option<String>,
}

/// A rename the filesystem confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRename {
    pub id: FileId,
    pub old_path: PathBuf,
    pub new_path: PathBuf,
}

/// Result of one rename batch.
///
/// No id is in both `success` and `failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameOutcome {
    pub success: Vec<FileId>,
    pub failed: Vec<FileId>,
    /// Requests that had nothing to do.
    pub skipped: Vec<FileId>,
    /// Confirmed renames in request order.
    pub completed: Vec<CompletedRename>,
}

/// Sends rename pairs to a filesystem in sequential chunks.
#[derive(Debug)]
pub struct RenameExecutor<F> {
    filesystem: F,
    chunk_size: usize,
    in_flight: AtomicBool,
    verbose: bool,
}

/// Clears the in-flight flag when the batch ends.
struct BatchGuard<'a>(&'a AtomicBool);

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PathRename {
    #[must_use]
    pub fn new(old_path: impl Into<PathBuf>, new_path: impl Into<PathBuf>) -> Self {
        Self {
            old_path: old_path.into(),
            new_path: new_path.into(),
        }
    }

    /// Check if the paths only differ in letter case.
    #[must_use]
    pub fn is_case_only(&self) -> bool {
        self.old_path != self.new_path
            && crate::path_to_string(&self.old_path).to_lowercase()
                == crate::path_to_string(&self.new_path).to_lowercase()
    }
}

impl LocalFileSystem {
    #[must_use]
    pub const fn new(recurse: bool, verbose: bool) -> Self {
        Self { recurse, verbose }
    }

    fn rename_path(rename: &PathRename) -> Result<()> {
        let PathRename { old_path, new_path } = rename;
        if old_path == new_path {
            return Ok(());
        }
        if !old_path.exists() {
            anyhow::bail!("Source does not exist: {}", old_path.display());
        }
        let parent = new_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        if !parent.is_dir() {
            anyhow::bail!("Target directory does not exist: {}", parent.display());
        }

        let case_only = rename.is_case_only();
        if !case_only && new_path.exists() {
            anyhow::bail!("Target already exists: {}", new_path.display());
        }

        let result = if case_only {
            // Case-insensitive file systems need an intermediate name
            Self::rename_with_temp_file(old_path, new_path)
        } else {
            fs::rename(old_path, new_path)
        };
        result.with_context(|| format!("Failed to rename {} to {}", old_path.display(), new_path.display()))
    }

    /// Rename a file with an intermediate temp file to work around case-insensitive file systems.
    fn rename_with_temp_file(path: &Path, new_path: &Path) -> std::io::Result<()> {
        let temp_file = crate::append_extension_to_path(new_path.to_path_buf(), ".tmp");
        fs::rename(path, &temp_file)?;
        fs::rename(&temp_file, new_path)
    }
}

impl FileSystem for LocalFileSystem {
    fn list_directory(&self, path: &Path, files_only: bool) -> Result<Vec<FileInfo>> {
        if !path.is_dir() {
            anyhow::bail!("Not a directory: {}", path.display());
        }
        let max_depth = if self.recurse { usize::MAX } else { 1 };
        let mut entries = Vec::new();
        for entry in WalkDir::new(path)
            .min_depth(1)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !crate::is_hidden(entry))
        {
            let entry = entry.with_context(|| format!("Failed to read directory {}", path.display()))?;
            if files_only && entry.file_type().is_dir() {
                continue;
            }
            entries.push(FileInfo::from_path(entry.path())?);
        }
        entries.sort_by(|a, b| {
            b.is_directory
                .cmp(&a.is_directory)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        Ok(entries)
    }

    fn rename_batch(&self, renames: &[PathRename]) -> Result<Vec<PathBuf>> {
        let mut renamed = Vec::with_capacity(renames.len());
        for rename in renames {
            match Self::rename_path(rename) {
                Ok(()) => renamed.push(rename.old_path.clone()),
                Err(error) => {
                    if self.verbose {
                        crate::print_error!("{error:#}");
                    }
                }
            }
        }
        Ok(renamed)
    }
}

impl RenameOutcome {
    /// Check if every requested rename succeeded.
    #[must_use]
    pub const fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn finish(mut self) -> Self {
        self.success = self.success.into_iter().unique().collect();
        let succeeded: HashSet<FileId> = self.success.iter().copied().collect();
        self.failed = self
            .failed
            .into_iter()
            .filter(|id| !succeeded.contains(id))
            .unique()
            .collect();
        self.skipped = self
            .skipped
            .into_iter()
            .filter(|id| !succeeded.contains(id))
            .unique()
            .collect();
        self.completed = self.completed.into_iter().unique_by(|rename| rename.id).collect();
        self
    }
}

impl<F: FileSystem> RenameExecutor<F> {
    #[must_use]
    pub const fn new(filesystem: F) -> Self {
        Self {
            filesystem,
            chunk_size: DEFAULT_CHUNK_SIZE,
            in_flight: AtomicBool::new(false),
            verbose: false,
        }
    }

    /// Set the chunk size. Zero is treated as one.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub const fn filesystem(&self) -> &F {
        &self.filesystem
    }

    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Check if a batch is currently running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Rename files of the working set by id.
    ///
    /// Requests without a usable new name, or with an unchanged name, are skipped.
    /// Ids no longer in the working set fail.
    ///
    /// # Errors
    /// Returns `Busy` if another batch is running.
    pub fn rename_files(
        &self,
        working_set: &WorkingSet,
        requests: &[RenameRequest],
    ) -> Result<RenameOutcome, RenameError> {
        let _guard = self.begin()?;

        let mut outcome = RenameOutcome::default();
        let mut pairs = Vec::with_capacity(requests.len());
        for request in requests {
            let Some(new_name) = request
                .new_name
                .as_deref()
                .filter(|name| !name.is_empty() && is_valid_file_name(name))
            else {
                outcome.skipped.push(request.id);
                continue;
            };
            let Some(file) = working_set.get(request.id) else {
                if self.verbose {
                    crate::print_warning!("File no longer available: {}", request.old_name);
                }
                outcome.failed.push(request.id);
                continue;
            };
            if new_name == file.name {
                outcome.skipped.push(request.id);
                continue;
            }
            pairs.push((request.id, PathRename::new(&file.path, file.path.with_file_name(new_name))));
        }

        self.run_chunks(&pairs, &mut outcome);
        Ok(outcome.finish())
    }

    /// Rename path pairs directly.
    ///
    /// # Errors
    /// Returns `Busy` if another batch is running.
    pub fn rename_paths(&self, pairs: &[(FileId, PathRename)]) -> Result<RenameOutcome, RenameError> {
        let _guard = self.begin()?;
        let mut outcome = RenameOutcome::default();
        self.run_chunks(pairs, &mut outcome);
        Ok(outcome.finish())
    }

    fn begin(&self) -> Result<BatchGuard<'_>, RenameError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RenameError::Busy)?;
        Ok(BatchGuard(&self.in_flight))
    }

    /// Submit chunks one after another.
    /// A failing chunk fails all of its pairs and the next chunk still runs.
    fn run_chunks(&self, pairs: &[(FileId, PathRename)], outcome: &mut RenameOutcome) {
        if pairs.is_empty() {
            return;
        }
        let progress_bar = Self::create_progress_bar(pairs.len() as u64);
        for chunk in pairs.chunks(self.chunk_size) {
            let renames: Vec<PathRename> = chunk.iter().map(|(_, rename)| rename.clone()).collect();
            match self.filesystem.rename_batch(&renames) {
                Ok(renamed) => {
                    let renamed: HashSet<PathBuf> = renamed.into_iter().collect();
                    for (id, rename) in chunk {
                        if renamed.contains(&rename.old_path) {
                            outcome.success.push(*id);
                            outcome.completed.push(CompletedRename {
                                id: *id,
                                old_path: rename.old_path.clone(),
                                new_path: rename.new_path.clone(),
                            });
                        } else {
                            outcome.failed.push(*id);
                        }
                    }
                }
                Err(error) => {
                    if self.verbose {
                        crate::print_error!("Rename batch failed: {error:#}");
                    }
                    outcome.failed.extend(chunk.iter().map(|(id, _)| *id));
                }
            }
            progress_bar.inc(chunk.len() as u64);
        }
        progress_bar.finish_and_clear();
    }

    /// Create a progress bar that is hidden during tests.
    fn create_progress_bar(len: u64) -> ProgressBar {
        #[cfg(test)]
        {
            let _ = len;
            ProgressBar::hidden()
        }
        #[cfg(not(test))]
        {
            let progress_bar = ProgressBar::new(len);
            progress_bar.set_style(
                ProgressStyle::default_bar()
                    .template(PROGRESS_BAR_TEMPLATE)
                    .expect("Failed to set progress bar template")
                    .progress_chars(PROGRESS_BAR_CHARS),
            );
            progress_bar
        }
    }
}

#[cfg(test)]
mod executor_tests {
    use super::*;

    use std::cell::RefCell;

    use tempfile::tempdir;

    /// Records chunk sizes and fails selected paths or whole calls.
    #[derive(Default)]
    struct MockFileSystem {
        calls: RefCell<Vec<usize>>,
        failing_paths: HashSet<PathBuf>,
        failing_calls: HashSet<usize>,
    }

    impl FileSystem for MockFileSystem {
        fn list_directory(&self, _path: &Path, _files_only: bool) -> Result<Vec<FileInfo>> {
            Ok(Vec::new())
        }

        fn rename_batch(&self, renames: &[PathRename]) -> Result<Vec<PathBuf>> {
            let call = self.calls.borrow().len();
            self.calls.borrow_mut().push(renames.len());
            if self.failing_calls.contains(&call) {
                anyhow::bail!("transport error");
            }
            Ok(renames
                .iter()
                .filter(|rename| !self.failing_paths.contains(&rename.old_path))
                .map(|rename| rename.old_path.clone())
                .collect())
        }
    }

    fn pairs(count: u64) -> Vec<(FileId, PathRename)> {
        (0..count)
            .map(|index| {
                (
                    FileId(index),
                    PathRename::new(format!("/data/{index}.txt"), format!("/data/new_{index}.txt")),
                )
            })
            .collect()
    }

    fn working_set(names: &[&str]) -> WorkingSet {
        let mut set = WorkingSet::new();
        set.add_files(names.iter().map(|name| FileInfo::new(format!("/data/{name}"))));
        set
    }

    fn request(id: u64, old_name: &str, new_name: Option<&str>) -> RenameRequest {
        RenameRequest {
            id: FileId(id),
            old_name: old_name.to_string(),
            new_name: new_name.map(ToString::to_string),
        }
    }

    #[test]
    fn chunks_are_sent_sequentially() {
        let executor = RenameExecutor::new(MockFileSystem::default());
        let outcome = executor.rename_paths(&pairs(120)).unwrap();
        assert_eq!(*executor.filesystem().calls.borrow(), vec![50, 50, 20]);
        assert_eq!(outcome.success.len(), 120);
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.completed[119].new_path, PathBuf::from("/data/new_119.txt"));
    }

    #[test]
    fn partial_success_within_chunk() {
        let filesystem = MockFileSystem {
            failing_paths: HashSet::from([PathBuf::from("/data/1.txt")]),
            ..MockFileSystem::default()
        };
        let outcome = RenameExecutor::new(filesystem).rename_paths(&pairs(3)).unwrap();
        assert_eq!(outcome.success, vec![FileId(0), FileId(2)]);
        assert_eq!(outcome.failed, vec![FileId(1)]);
        assert_eq!(outcome.completed.len(), 2);
    }

    #[test]
    fn chunk_error_does_not_stop_later_chunks() {
        let filesystem = MockFileSystem {
            failing_calls: HashSet::from([0]),
            ..MockFileSystem::default()
        };
        let executor = RenameExecutor::new(filesystem).with_chunk_size(2);
        let outcome = executor.rename_paths(&pairs(5)).unwrap();
        assert_eq!(*executor.filesystem().calls.borrow(), vec![2, 2, 1]);
        assert_eq!(outcome.failed, vec![FileId(0), FileId(1)]);
        assert_eq!(outcome.success, vec![FileId(2), FileId(3), FileId(4)]);
    }

    #[test]
    fn success_wins_over_failure_for_duplicate_ids() {
        let filesystem = MockFileSystem {
            failing_paths: HashSet::from([PathBuf::from("/data/a.txt")]),
            ..MockFileSystem::default()
        };
        let batch = vec![
            (FileId(7), PathRename::new("/data/a.txt", "/data/x.txt")),
            (FileId(7), PathRename::new("/data/b.txt", "/data/y.txt")),
            (FileId(7), PathRename::new("/data/b.txt", "/data/y.txt")),
        ];
        let outcome = RenameExecutor::new(filesystem).rename_paths(&batch).unwrap();
        assert_eq!(outcome.success, vec![FileId(7)]);
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.completed.len(), 1);
    }

    #[test]
    fn requests_are_filtered_before_renaming() {
        let set = working_set(&["a.txt", "b.txt", "c.txt", "d.txt"]);
        let executor = RenameExecutor::new(MockFileSystem::default());
        let requests = vec![
            request(0, "a.txt", Some("x.txt")),
            request(1, "b.txt", None),
            request(2, "c.txt", Some("c.txt")),
            request(3, "d.txt", Some("bad/name.txt")),
            request(9, "gone.txt", Some("y.txt")),
        ];

        let outcome = executor.rename_files(&set, &requests).unwrap();
        assert_eq!(outcome.success, vec![FileId(0)]);
        assert_eq!(outcome.failed, vec![FileId(9)]);
        assert_eq!(outcome.skipped, vec![FileId(1), FileId(2), FileId(3)]);
        assert_eq!(*executor.filesystem().calls.borrow(), vec![1]);
        assert_eq!(
            outcome.completed[0],
            CompletedRename {
                id: FileId(0),
                old_path: PathBuf::from("/data/a.txt"),
                new_path: PathBuf::from("/data/x.txt"),
            }
        );
    }

    #[test]
    fn unchanged_name_compares_against_current_name() {
        let set = working_set(&["current.txt", "other.txt"]);
        let executor = RenameExecutor::new(MockFileSystem::default());
        let requests = vec![
            request(0, "stale.txt", Some("current.txt")),
            request(1, "other_old.txt", Some("other_old.txt")),
        ];

        let outcome = executor.rename_files(&set, &requests).unwrap();
        assert_eq!(outcome.skipped, vec![FileId(0)]);
        assert_eq!(outcome.success, vec![FileId(1)]);
        assert_eq!(outcome.completed[0].old_path, PathBuf::from("/data/other.txt"));
        assert_eq!(outcome.completed[0].new_path, PathBuf::from("/data/other_old.txt"));
    }

    #[test]
    fn second_batch_while_running_is_rejected() {
        let executor = RenameExecutor::new(MockFileSystem::default());
        let guard = executor.begin().unwrap();
        assert!(executor.is_busy());
        assert!(matches!(executor.rename_paths(&pairs(1)), Err(RenameError::Busy)));
        drop(guard);
        assert!(!executor.is_busy());
        assert!(executor.rename_paths(&pairs(1)).is_ok());
    }

    #[test]
    fn local_rename_and_failures() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        let taken = dir.path().join("taken.txt");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();
        fs::write(&taken, "t").unwrap();

        let renames = vec![
            PathRename::new(&a, dir.path().join("renamed.txt")),
            PathRename::new(&b, &taken),
            PathRename::new(dir.path().join("missing.txt"), dir.path().join("m.txt")),
            PathRename::new(&b, dir.path().join("nope").join("b.txt")),
        ];
        let renamed = LocalFileSystem::default().rename_batch(&renames).unwrap();
        assert_eq!(renamed, vec![a.clone()]);
        assert!(dir.path().join("renamed.txt").exists());
        assert!(b.exists());
        assert_eq!(fs::read_to_string(&taken).unwrap(), "t");
    }

    #[test]
    fn local_case_only_rename() {
        let dir = tempdir().unwrap();
        let lower = dir.path().join("photo.jpg");
        let upper = dir.path().join("Photo.jpg");
        fs::write(&lower, "p").unwrap();

        let renamed = LocalFileSystem::default()
            .rename_batch(&[PathRename::new(&lower, &upper)])
            .unwrap();
        assert_eq!(renamed, vec![lower]);
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["Photo.jpg"]);
    }

    #[test]
    fn local_listing_sorts_and_skips_hidden() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        fs::write(dir.path().join("A.txt"), "").unwrap();
        fs::write(dir.path().join(".hidden"), "").unwrap();
        fs::create_dir(dir.path().join("zdir")).unwrap();
        fs::write(dir.path().join("zdir").join("inner.txt"), "").unwrap();

        let names = |entries: Vec<FileInfo>| entries.into_iter().map(|info| info.name).collect::<Vec<_>>();

        let flat = LocalFileSystem::default().list_directory(dir.path(), false).unwrap();
        assert_eq!(names(flat), vec!["zdir", "A.txt", "b.txt"]);

        let files = LocalFileSystem::new(true, false).list_directory(dir.path(), true).unwrap();
        assert_eq!(names(files), vec!["A.txt", "b.txt", "inner.txt"]);

        assert!(LocalFileSystem::default().list_directory(&dir.path().join("b.txt"), false).is_err());
    }
}
