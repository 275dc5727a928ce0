pub mod case;
pub mod config;
pub mod conflict;
pub mod date;
pub mod error;
pub mod escalation;
pub mod executor;
pub mod filter;
pub mod history;
pub mod metadata;
pub mod number;
pub mod preview;
pub mod rules;
pub mod session;
pub mod validate;
pub mod workspace;

use std::cmp::Ordering;
use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt::Display;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Command;
use clap_complete::Shell;
use colored::{ColoredString, Colorize};
use difference::{Changeset, Difference};
use itertools::Itertools;
use unicode_normalization::UnicodeNormalization;

pub use error::RenameError;

/// Append an extension to `PathBuf`, which is missing from the standard lib :(
pub fn append_extension_to_path(path: PathBuf, extension: impl AsRef<OsStr>) -> PathBuf {
    let mut os_string: OsString = path.into();
    os_string.push(".");
    os_string.push(extension);
    os_string.into()
}

/// Format bool value as a coloured string.
#[must_use]
pub fn colorize_bool(value: bool) -> ColoredString {
    if value { "true".green() } else { "false".red() }
}

/// Get file name from Path with special characters retained instead of decomposed.
pub fn get_normalized_file_name(path: &Path) -> Result<String> {
    let file_name = os_str_to_string(path.file_name().context("Failed to get file name")?);

    // Some file systems return names in Unicode NFD (Normalization Form Decomposed),
    // which converts special chars like "å" to "a\u{30a}",
    // which then get printed as a regular "a".
    // Use NFC (Normalization Form Composed) to retain the correct format
    // so that rules and collision checks see the same characters the user typed.
    Ok(file_name.nfc().collect::<String>())
}

/// Check if entry is a hidden file or directory (starts with '.')
#[must_use]
pub fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    let name_bytes = entry.file_name().as_encoded_bytes();
    !name_bytes.is_empty() && name_bytes[0] == b'.'
}

/// Resolves the provided input path to a directory or file to an absolute path.
///
/// If `path` is `None`, the current working directory is used.
/// The function verifies that the provided path exists and is accessible,
/// returning an error if it does not.
/// ```rust
/// use std::path::{Path, PathBuf};
/// use batch_rename::resolve_input_path;
///
/// let path = Path::new("src");
/// let absolute_path = resolve_input_path(Some(path)).unwrap();
/// ```
#[inline]
pub fn resolve_input_path(path: Option<&Path>) -> Result<PathBuf> {
    let input_path = path
        .map(|p| p.to_str().unwrap_or(""))
        .unwrap_or_default()
        .trim()
        .to_string();

    let filepath = if input_path.is_empty() {
        env::current_dir().context("Failed to get current working directory")?
    } else {
        PathBuf::from(input_path)
    };
    if !filepath.exists() {
        anyhow::bail!(
            "Input path does not exist or is not accessible: '{}'",
            filepath.display()
        );
    }

    let absolute_input_path = dunce::canonicalize(&filepath)?;

    // Canonicalize fails for network drives on Windows :(
    if path_to_string(&absolute_input_path).starts_with(r"\\?") && !path_to_string(&filepath).starts_with(r"\\?") {
        Ok(filepath)
    } else {
        Ok(absolute_input_path)
    }
}

/// Gets the relative path or filename from a full path based on a root directory.
///
/// If the full path is within the root directory, the function returns the relative path.
/// Otherwise, it returns just the filename.
///
/// ```rust
/// use std::path::Path;
/// use batch_rename::get_relative_path_or_filename;
///
/// let root = Path::new("/root/dir");
/// let full_path = root.join("subdir/file.txt");
/// assert_eq!(get_relative_path_or_filename(&full_path, root), "subdir/file.txt");
///
/// let outside_path = Path::new("/other/another.txt");
/// assert_eq!(get_relative_path_or_filename(outside_path, root), "another.txt");
/// ```
#[must_use]
pub fn get_relative_path_or_filename(full_path: &Path, root: &Path) -> String {
    if full_path == root {
        return path_to_filename_string(full_path);
    }
    full_path.strip_prefix(root).map_or_else(
        |_| {
            full_path
                .file_name()
                .map_or_else(|| full_path.display().to_string(), os_str_to_string)
        },
        |relative_path| relative_path.display().to_string(),
    )
}

/// Convert `OsStr` to String with invalid Unicode handling.
fn os_str_to_string(name: &OsStr) -> String {
    name.to_str().map_or_else(
        || name.to_string_lossy().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to string with invalid Unicode handling.
pub fn path_to_string(path: &Path) -> String {
    path.to_str().map_or_else(
        || path.to_string_lossy().to_string().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to filename string with invalid Unicode handling.
#[must_use]
pub fn path_to_filename_string(path: &Path) -> String {
    os_str_to_string(path.file_name().unwrap_or_default())
}

/// Convert given path to file stem string with invalid Unicode handling.
#[must_use]
pub fn path_to_file_stem_string(path: &Path) -> String {
    os_str_to_string(path.file_stem().unwrap_or_default())
}

/// Convert given path to file extension lowercase string with invalid Unicode handling.
#[must_use]
pub fn path_to_file_extension_string(path: &Path) -> String {
    os_str_to_string(path.extension().unwrap_or_default()).to_lowercase()
}

/// Shorten a message to the given number of characters.
///
/// ```rust
/// use batch_rename::truncate_message;
///
/// assert_eq!(truncate_message("short", 10), "short");
/// assert_eq!(truncate_message("a much longer message", 6), "a much... (and more)");
/// ```
#[must_use]
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    if message.chars().count() <= max_chars {
        return message.to_string();
    }
    let truncated: String = message.chars().take(max_chars).collect();
    format!("{}... (and more)", truncated.trim_end())
}

/// Join items with commas, listing at most `max_items` of them.
///
/// ```rust
/// use batch_rename::summarize_ids;
///
/// assert_eq!(summarize_ids(&[1, 2, 3, 4, 5], 3), "1, 2, 3 and 2 more");
/// assert_eq!(summarize_ids(&[1, 2], 3), "1, 2");
/// ```
#[must_use]
pub fn summarize_ids<T: Display>(items: &[T], max_items: usize) -> String {
    let listed = items.iter().take(max_items).join(", ");
    match items.len().saturating_sub(max_items) {
        0 => listed,
        remaining => format!("{listed} and {remaining} more"),
    }
}

/// Indent and join lines, listing at most `max_items` of them.
#[must_use]
pub fn summarize_lines(lines: &[String], max_items: usize) -> String {
    let mut summary = lines.iter().take(max_items).map(|line| format!("  {line}")).join("\n");
    let remaining = lines.len().saturating_sub(max_items);
    if remaining > 0 {
        summary.push_str(&format!("\n  ... and {remaining} more"));
    }
    summary
}

#[inline]
pub fn print_error(message: &str) {
    eprintln!("{}", format!("Error: {message}").red());
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::print_error(&format!($($arg)*))
    };
}

#[inline]
pub fn print_warning(message: &str) {
    eprintln!("{}", message.yellow());
}

#[macro_export]
macro_rules! print_warning {
    ($($arg:tt)*) => {
        $crate::print_warning(&format!($($arg)*))
    };
}

/// Create a coloured diff for the given strings.
pub fn color_diff(old: &str, new: &str, stacked: bool) -> (String, String) {
    let changeset = Changeset::new(old, new, "");
    let mut old_diff = String::new();
    let mut new_diff = String::new();

    if stacked {
        // Find the starting index of the first matching sequence for a nicer visual alignment.
        // For example:
        //           IMG_0001.jpg
        //   Holiday IMG_0001.jpg
        // Instead of:
        //   IMG_0001.jpg
        //   Holiday IMG_0001.jpg
        for diff in &changeset.diffs {
            if let Difference::Same(x) = diff {
                if x.chars().all(char::is_whitespace) || x.chars().count() < 3 {
                    continue;
                }

                // Add leading whitespace so that the first matching sequence lines up.
                if let (Some(old_index), Some(new_index)) = (old.find(x), new.find(x)) {
                    match old_index.cmp(&new_index) {
                        Ordering::Greater => {
                            new_diff = " ".repeat(old_index.saturating_sub(new_index));
                        }
                        Ordering::Less => {
                            old_diff = " ".repeat(new_index.saturating_sub(old_index));
                        }
                        Ordering::Equal => {}
                    }
                    break;
                }
            }
        }
    }

    for diff in changeset.diffs {
        match diff {
            Difference::Same(ref x) => {
                old_diff.push_str(x);
                new_diff.push_str(x);
            }
            Difference::Add(ref x) => {
                if x.chars().all(char::is_whitespace) {
                    new_diff.push_str(&x.on_green().to_string());
                } else {
                    new_diff.push_str(&x.green().to_string());
                }
            }
            Difference::Rem(ref x) => {
                if x.chars().all(char::is_whitespace) {
                    old_diff.push_str(&x.on_red().to_string());
                } else {
                    old_diff.push_str(&x.red().to_string());
                }
            }
        }
    }

    (old_diff, new_diff)
}

/// Print a stacked diff of the changes.
pub fn show_diff(old: &str, new: &str) {
    let (old_diff, new_diff) = color_diff(old, new, true);
    println!("{old_diff}");
    if old_diff != new_diff {
        println!("{new_diff}");
    }
}

/// Generate a shell completion script for the given shell.
pub fn generate_shell_completion(shell: Shell, mut command: Command, install: bool, command_name: &str) -> Result<()> {
    if install {
        let out_dir = get_shell_completion_dir(shell, command_name)?;
        let path = clap_complete::generate_to(shell, &mut command, command_name, out_dir)?;
        println!("Completion file generated to: {}", path.display());
    } else {
        clap_complete::generate(shell, &mut command, command_name, &mut std::io::stdout());
    }
    Ok(())
}

/// Determine the appropriate directory for storing shell completions.
///
/// First checks if the user-specific directory exists,
/// then checks for the global directory.
/// If neither exist, creates and uses the user-specific dir.
fn get_shell_completion_dir(shell: Shell, name: &str) -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to get home directory")?;

    // Special handling for oh-my-zsh.
    // Create custom "plugin", which will then have to be loaded in .zshrc
    if shell == Shell::Zsh {
        let omz_plugins = home.join(".oh-my-zsh/custom/plugins");
        if omz_plugins.exists() {
            let plugin_dir = omz_plugins.join(name);
            std::fs::create_dir_all(&plugin_dir)?;
            return Ok(plugin_dir);
        }
    }

    let user_dir = match shell {
        Shell::PowerShell => {
            if cfg!(windows) {
                home.join(r"Documents\PowerShell\completions")
            } else {
                home.join(".config/powershell/completions")
            }
        }
        Shell::Bash => home.join(".bash_completion.d"),
        Shell::Elvish => home.join(".elvish"),
        Shell::Fish => home.join(".config/fish/completions"),
        Shell::Zsh => home.join(".zsh/completions"),
        _ => anyhow::bail!("Unsupported shell"),
    };

    if user_dir.exists() {
        return Ok(user_dir);
    }

    let global_dir = match shell {
        Shell::PowerShell => {
            if cfg!(windows) {
                home.join(r"Documents\PowerShell\completions")
            } else {
                home.join(".config/powershell/completions")
            }
        }
        Shell::Bash => PathBuf::from("/etc/bash_completion.d"),
        Shell::Fish => PathBuf::from("/usr/share/fish/completions"),
        Shell::Zsh => PathBuf::from("/usr/share/zsh/site-functions"),
        _ => anyhow::bail!("Unsupported shell"),
    };

    if global_dir.exists() {
        return Ok(global_dir);
    }

    std::fs::create_dir_all(&user_dir)?;
    Ok(user_dir)
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    use std::fs::File;

    use tempfile::tempdir;
    use walkdir::WalkDir;

    #[test]
    fn test_is_hidden_file() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join(".hidden")).unwrap();
        File::create(dir.path().join("visible")).unwrap();

        let find = |name: &str| {
            WalkDir::new(dir.path())
                .into_iter()
                .filter_map(std::result::Result::ok)
                .find(|e| e.file_name().to_string_lossy().eq(name))
                .unwrap()
        };

        assert!(is_hidden(&find(".hidden")));
        assert!(!is_hidden(&find("visible")));
    }

    #[test]
    fn test_normalized_file_name_is_nfc() {
        let decomposed = "a\u{30a}bc.txt";
        let name = get_normalized_file_name(Path::new(decomposed)).unwrap();
        assert_eq!(name, "\u{e5}bc.txt");
        assert!(get_normalized_file_name(Path::new("/")).is_err());
    }

    #[test]
    fn test_resolve_input_path_valid() {
        let dir = tempdir().unwrap();
        assert!(resolve_input_path(Some(dir.path())).is_ok());
    }

    #[test]
    fn test_resolve_input_path_nonexistent() {
        assert!(resolve_input_path(Some(Path::new("nonexistent"))).is_err());
    }

    #[test]
    fn test_resolve_input_path_default() {
        let resolved = resolve_input_path(None);
        assert_eq!(resolved.unwrap(), env::current_dir().unwrap());
    }

    #[test]
    fn test_append_extension() {
        let path = append_extension_to_path(PathBuf::from("/data/Photo.jpg"), "tmp");
        assert_eq!(path, PathBuf::from("/data/Photo.jpg.tmp"));
    }

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("abc", 3), "abc");
        assert_eq!(truncate_message("abcd", 3), "abc... (and more)");
        assert_eq!(truncate_message("äöüå", 2), "äö... (and more)");
    }

    #[test]
    fn test_summarize_lines() {
        let lines: Vec<String> = ["a", "b", "c"].iter().map(ToString::to_string).collect();
        assert_eq!(summarize_lines(&lines, 5), "  a\n  b\n  c");
        assert_eq!(summarize_lines(&lines, 1), "  a\n  ... and 2 more");
        assert_eq!(summarize_lines(&[], 1), "");
    }

    #[test]
    #[cfg(unix)]
    fn test_path_helpers_drop_invalid_unicode() {
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new("/data").join(OsStr::from_bytes(b"bad\xFFname.TXT"));
        assert_eq!(path_to_filename_string(&path), "badname.TXT");
        assert_eq!(os_str_to_string(OsStr::new("plain")), "plain");
    }

    #[test]
    fn test_color_diff_without_changes() {
        let (old, new) = color_diff("same.txt", "same.txt", true);
        assert_eq!(old, new);
    }
}
