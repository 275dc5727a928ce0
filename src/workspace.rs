//! The working set of files selected for renaming.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::filter::FileFilter;
use crate::preview::PreviewResult;

/// Stable identifier of a file within a working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One filesystem item as reported by the filesystem service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: PathBuf,
    /// NFC normalized base name.
    pub name: String,
    pub is_directory: bool,
    pub size: u64,
    pub last_modified: Option<DateTime<Local>>,
    /// Lowercase extension without the dot.
    pub file_type: String,
}

/// A file in the working set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub id: FileId,
    pub path: PathBuf,
    pub name: String,
    /// Staged name from the latest preview.
    pub new_name: Option<String>,
    pub is_directory: bool,
    pub size: u64,
    pub last_modified: Option<DateTime<Local>>,
    pub file_type: String,
}

/// Ordered set of files with selection state.
#[derive(Debug, Default)]
pub struct WorkingSet {
    files: Vec<FileEntry>,
    selected: BTreeSet<FileId>,
    preview_mode: bool,
    next_id: u64,
}

impl FileInfo {
    /// Read file info for the given path.
    ///
    /// # Errors
    /// Returns an error if the path has no file name or its metadata cannot be read.
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata =
            fs::metadata(path).with_context(|| format!("Failed to read metadata for {}", path.display()))?;
        let name = crate::get_normalized_file_name(path)?;
        let is_directory = metadata.is_dir();
        Ok(Self {
            path: path.to_path_buf(),
            file_type: if is_directory {
                String::new()
            } else {
                crate::path_to_file_extension_string(path)
            },
            name,
            is_directory,
            size: metadata.len(),
            last_modified: metadata.modified().ok().map(DateTime::<Local>::from),
        })
    }

    /// Create info for a path without touching the filesystem.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: crate::path_to_filename_string(&path),
            file_type: crate::path_to_file_extension_string(&path),
            path,
            is_directory: false,
            size: 0,
            last_modified: None,
        }
    }
}

impl FileEntry {
    fn from_info(id: FileId, info: FileInfo) -> Self {
        Self {
            id,
            path: info.path,
            name: info.name,
            new_name: None,
            is_directory: info.is_directory,
            size: info.size,
            last_modified: info.last_modified,
            file_type: info.file_type,
        }
    }

    /// Directory containing this file.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

impl WorkingSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure new ids are allocated above the given id.
    ///
    /// Used to keep ids unique against ids stored in a loaded history.
    pub fn reserve_ids_through(&mut self, id: FileId) {
        self.next_id = self.next_id.max(id.0.saturating_add(1));
    }

    /// Add files that are not in the set yet. New files are selected.
    ///
    /// Returns the ids of the added files.
    pub fn add_files(&mut self, infos: impl IntoIterator<Item = FileInfo>) -> Vec<FileId> {
        let mut added = Vec::new();
        for info in infos {
            if self.find_by_path(&info.path).is_some() {
                continue;
            }
            let id = FileId(self.next_id);
            self.next_id += 1;
            self.files.push(FileEntry::from_info(id, info));
            self.selected.insert(id);
            added.push(id);
        }
        added
    }

    pub fn remove_file(&mut self, id: FileId) -> Option<FileEntry> {
        let index = self.files.iter().position(|file| file.id == id)?;
        self.selected.remove(&id);
        Some(self.files.remove(index))
    }

    /// Remove all files. Ids are not reused afterwards.
    pub fn clear(&mut self) {
        self.files.clear();
        self.selected.clear();
    }

    /// Select a file. Returns false if the id is unknown.
    pub fn select(&mut self, id: FileId) -> bool {
        if self.get(id).is_some() {
            self.selected.insert(id);
            true
        } else {
            false
        }
    }

    pub fn deselect(&mut self, id: FileId) -> bool {
        self.selected.remove(&id)
    }

    pub fn select_all(&mut self) {
        self.selected = self.files.iter().map(|file| file.id).collect();
    }

    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }

    /// Select exactly the files that pass the filter.
    /// Directories only pass the filter that matches everything.
    ///
    /// Returns the number of selected files.
    pub fn apply_filter(&mut self, filter: &FileFilter) -> usize {
        self.selected = self
            .files
            .iter()
            .filter(|file| Self::passes(file, filter))
            .map(|file| file.id)
            .collect();
        self.selected.len()
    }

    /// Files that pass the filter in working set order. Selection is not changed.
    #[must_use]
    pub fn filtered_files(&self, filter: &FileFilter) -> Vec<&FileEntry> {
        self.files.iter().filter(|file| Self::passes(file, filter)).collect()
    }

    fn passes(file: &FileEntry, filter: &FileFilter) -> bool {
        filter.is_all() || (!file.is_directory && filter.matches(&file.file_type))
    }

    #[must_use]
    pub fn is_selected(&self, id: FileId) -> bool {
        self.selected.contains(&id)
    }

    /// Selected files in working set order.
    #[must_use]
    pub fn selected_files(&self) -> Vec<&FileEntry> {
        self.files
            .iter()
            .filter(|file| self.selected.contains(&file.id))
            .collect()
    }

    #[must_use]
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    #[must_use]
    pub fn get(&self, id: FileId) -> Option<&FileEntry> {
        self.files.iter().find(|file| file.id == id)
    }

    #[must_use]
    pub fn find_by_path(&self, path: &Path) -> Option<&FileEntry> {
        self.files.iter().find(|file| file.path == path)
    }

    /// Current paths of all files in the set.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|file| file.path.clone()).collect()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub const fn preview_mode(&self) -> bool {
        self.preview_mode
    }

    /// Turn preview mode on or off. Turning it off clears staged names.
    pub fn set_preview_mode(&mut self, enabled: bool) {
        self.preview_mode = enabled;
        if !enabled {
            for file in &mut self.files {
                file.new_name = None;
            }
        }
    }

    /// Stage new names from valid previews while preview mode is on.
    pub fn apply_preview(&mut self, previews: &[PreviewResult]) {
        if !self.preview_mode {
            return;
        }
        for preview in previews {
            if let Some(file) = self.files.iter_mut().find(|file| file.id == preview.file_id) {
                file.new_name = preview.is_valid.then(|| preview.new_name.clone());
            }
        }
    }

    /// Update a file after a confirmed rename.
    /// Returns false if the id is not in the set.
    pub fn mark_renamed(&mut self, id: FileId, new_path: &Path) -> bool {
        let Some(file) = self.files.iter_mut().find(|file| file.id == id) else {
            return false;
        };
        file.path = new_path.to_path_buf();
        file.name = crate::path_to_filename_string(new_path);
        if !file.is_directory {
            file.file_type = crate::path_to_file_extension_string(new_path);
        }
        file.new_name = None;
        true
    }
}

#[cfg(test)]
mod working_set_tests {
    use super::*;

    use crate::filter::FileTypeGroup;

    fn working_set(names: &[&str]) -> WorkingSet {
        let mut set = WorkingSet::new();
        set.add_files(names.iter().map(|name| FileInfo::new(Path::new("/data").join(name))));
        set
    }

    #[test]
    fn add_files_assigns_unique_ids_and_selects() {
        let set = working_set(&["a.txt", "b.txt", "c.txt"]);
        let ids: Vec<FileId> = set.files().iter().map(|file| file.id).collect();
        assert_eq!(ids, vec![FileId(0), FileId(1), FileId(2)]);
        assert_eq!(set.selected_files().len(), 3);
    }

    #[test]
    fn apply_filter_selects_matching_extensions() {
        let mut set = working_set(&["a.JPG", "b.png", "c.mp4", "README", "d.txt"]);
        set.deselect(FileId(1));

        let selected = set.apply_filter(&FileFilter::from(FileTypeGroup::Images));
        assert_eq!(selected, 2);
        let names: Vec<&str> = set.selected_files().iter().map(|file| file.name.as_str()).collect();
        assert_eq!(names, vec!["a.JPG", "b.png"]);

        set.apply_filter(&FileFilter::from_extensions(&["txt", "mp4"]));
        let names: Vec<&str> = set.selected_files().iter().map(|file| file.name.as_str()).collect();
        assert_eq!(names, vec!["c.mp4", "d.txt"]);

        assert_eq!(set.apply_filter(&FileFilter::All), 5);
    }

    #[test]
    fn filter_skips_directories() {
        let mut set = working_set(&["a.zip"]);
        set.add_files([FileInfo {
            is_directory: true,
            file_type: String::new(),
            ..FileInfo::new("/data/backup.zip")
        }]);

        let archives = FileFilter::from(FileTypeGroup::Archives);
        assert_eq!(set.filtered_files(&archives).len(), 1);
        assert_eq!(set.selected_files().len(), 2);
        assert_eq!(set.apply_filter(&archives), 1);
        assert_eq!(set.apply_filter(&FileFilter::All), 2);
    }

    #[test]
    fn add_files_skips_duplicate_paths() {
        let mut set = working_set(&["a.txt"]);
        let added = set.add_files([FileInfo::new("/data/a.txt"), FileInfo::new("/data/b.txt")]);
        assert_eq!(added, vec![FileId(1)]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn ids_are_not_reused() {
        let mut set = working_set(&["a.txt", "b.txt"]);
        set.remove_file(FileId(1));
        set.clear();
        let added = set.add_files([FileInfo::new("/data/c.txt")]);
        assert_eq!(added, vec![FileId(2)]);
    }

    #[test]
    fn reserved_ids_are_skipped() {
        let mut set = WorkingSet::new();
        set.reserve_ids_through(FileId(41));
        let added = set.add_files([FileInfo::new("/data/a.txt")]);
        assert_eq!(added, vec![FileId(42)]);
    }

    #[test]
    fn selection() {
        let mut set = working_set(&["a.txt", "b.txt", "c.txt"]);
        set.deselect_all();
        assert!(set.selected_files().is_empty());
        assert!(set.select(FileId(2)));
        assert!(set.select(FileId(0)));
        assert!(!set.select(FileId(9)));
        let names: Vec<&str> = set.selected_files().iter().map(|file| file.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "c.txt"]);
        assert!(set.deselect(FileId(0)));
        set.select_all();
        assert_eq!(set.selected_files().len(), 3);
    }

    #[test]
    fn preview_mode_stages_and_clears_names() {
        let mut set = working_set(&["a.txt", "b.txt"]);
        let previews = vec![
            PreviewResult {
                file_id: FileId(0),
                original_name: "a.txt".to_string(),
                new_name: "x.txt".to_string(),
                is_valid: true,
                error: None,
            },
            PreviewResult {
                file_id: FileId(1),
                original_name: "b.txt".to_string(),
                new_name: "con".to_string(),
                is_valid: false,
                error: Some("reserved".to_string()),
            },
        ];

        set.apply_preview(&previews);
        assert!(set.get(FileId(0)).unwrap().new_name.is_none());

        set.set_preview_mode(true);
        set.apply_preview(&previews);
        assert_eq!(set.get(FileId(0)).unwrap().new_name.as_deref(), Some("x.txt"));
        assert!(set.get(FileId(1)).unwrap().new_name.is_none());

        set.set_preview_mode(false);
        assert!(set.get(FileId(0)).unwrap().new_name.is_none());
    }

    #[test]
    fn mark_renamed_updates_path_and_name() {
        let mut set = working_set(&["a.txt"]);
        assert!(set.mark_renamed(FileId(0), Path::new("/data/b.JPG")));
        let file = set.get(FileId(0)).unwrap();
        assert_eq!(file.path, PathBuf::from("/data/b.JPG"));
        assert_eq!(file.name, "b.JPG");
        assert_eq!(file.file_type, "jpg");
        assert_eq!(file.directory(), Path::new("/data"));
        assert!(!set.mark_renamed(FileId(7), Path::new("/data/c.txt")));
    }

    #[test]
    fn file_info_from_path_reads_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Report.PDF");
        fs::write(&path, b"hello").unwrap();

        let info = FileInfo::from_path(&path).unwrap();
        assert_eq!(info.name, "Report.PDF");
        assert_eq!(info.file_type, "pdf");
        assert_eq!(info.size, 5);
        assert!(!info.is_directory);
        assert!(info.last_modified.is_some());

        assert!(FileInfo::from_path(&dir.path().join("missing")).is_err());
    }
}
