//! File type filters for narrowing the selection by extension.

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "svg", "tiff", "ico", "heic", "avif",
];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "wmv", "flv", "m4v", "3gp"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac", "m4a", "aac", "wma"];
const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "rtf", "odt", "csv",
];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz", "bz2", "iso"];

/// Predefined groups of file extensions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FileTypeGroup {
    #[default]
    All,
    Images,
    Videos,
    Audio,
    Documents,
    Archives,
}

/// Which files of the working set take part in a rename.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum FileFilter {
    #[default]
    All,
    Group(FileTypeGroup),
    /// Lowercase extensions without the leading period.
    Extensions(Vec<String>),
}

impl FileTypeGroup {
    /// Extensions in this group. Empty for `All`.
    #[must_use]
    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::All => &[],
            Self::Images => IMAGE_EXTENSIONS,
            Self::Videos => VIDEO_EXTENSIONS,
            Self::Audio => AUDIO_EXTENSIONS,
            Self::Documents => DOCUMENT_EXTENSIONS,
            Self::Archives => ARCHIVE_EXTENSIONS,
        }
    }
}

impl FileFilter {
    /// Filter from custom extensions.
    /// Extensions are lowercased and a leading period is removed.
    /// No usable extensions gives the filter that matches everything.
    #[must_use]
    pub fn from_extensions<S: AsRef<str>>(extensions: &[S]) -> Self {
        let extensions: Vec<String> = extensions
            .iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .unique()
            .collect();
        if extensions.is_empty() {
            Self::All
        } else {
            Self::Extensions(extensions)
        }
    }

    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All | Self::Group(FileTypeGroup::All))
    }

    /// Check if a file with the given lowercase extension passes the filter.
    ///
    /// Everything passes `All`.
    /// Otherwise files without an extension, and directories, never match.
    #[must_use]
    pub fn matches(&self, file_type: &str) -> bool {
        if self.is_all() {
            return true;
        }
        if file_type.is_empty() {
            return false;
        }
        let file_type = file_type.to_lowercase();
        match self {
            Self::All => true,
            Self::Group(group) => group.extensions().contains(&file_type.as_str()),
            Self::Extensions(extensions) => extensions.contains(&file_type),
        }
    }
}

impl From<FileTypeGroup> for FileFilter {
    fn from(group: FileTypeGroup) -> Self {
        if group == FileTypeGroup::All {
            Self::All
        } else {
            Self::Group(group)
        }
    }
}

impl fmt::Display for FileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all files"),
            Self::Group(group) => write!(f, "{group:?} ({})", group.extensions().join(", ")),
            Self::Extensions(extensions) => write!(f, "{}", extensions.join(", ")),
        }
    }
}
