//! File name validation and sanitizing against common OS file name constraints.

use thiserror::Error;

/// Maximum file name length in characters.
pub const MAX_FILE_NAME_LENGTH: usize = 255;

/// Device names reserved on Windows, regardless of extension.
const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9", "LPT1",
    "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reason a file name is not usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidName {
    #[error("File name cannot be empty")]
    Empty,
    #[error("File name contains invalid characters")]
    InvalidCharacters,
    #[error("\"{0}\" is a reserved file name")]
    Reserved(String),
    #[error("File name is too long (maximum {MAX_FILE_NAME_LENGTH} characters)")]
    TooLong,
    #[error("File name cannot start or end with spaces")]
    SurroundingWhitespace,
    #[error("File name cannot start or end with periods")]
    SurroundingPeriods,
}

/// Check if the character is not allowed in file names.
#[must_use]
pub const fn is_forbidden_char(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | '\u{0}'..='\u{1F}')
}

/// Check the name and return the first rule it breaks.
///
/// # Errors
/// Returns the reason the name is invalid.
pub fn check_file_name(name: &str) -> Result<(), InvalidName> {
    if name.trim().is_empty() {
        return Err(InvalidName::Empty);
    }
    if name.chars().any(is_forbidden_char) {
        return Err(InvalidName::InvalidCharacters);
    }
    if let Some(base) = reserved_base_name(name) {
        return Err(InvalidName::Reserved(base));
    }
    if name.chars().count() > MAX_FILE_NAME_LENGTH {
        return Err(InvalidName::TooLong);
    }
    if name.starts_with(char::is_whitespace) || name.ends_with(char::is_whitespace) {
        return Err(InvalidName::SurroundingWhitespace);
    }
    if name.starts_with('.') || name.ends_with('.') {
        return Err(InvalidName::SurroundingPeriods);
    }
    Ok(())
}

/// Check if the name is a valid file name.
#[must_use]
pub fn is_valid_file_name(name: &str) -> bool {
    check_file_name(name).is_ok()
}

/// Turn an arbitrary string into a usable file name.
///
/// Forbidden characters become `_`, surrounding whitespace and trailing periods are trimmed,
/// overlong names are truncated keeping the extension,
/// and reserved device names get a `_` appended to the base name.
/// Valid names are returned unchanged and the result is stable when sanitized again.
///
/// ```rust
/// use batch_rename::validate::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name(" report: final?.txt. "), "report_ final_.txt");
/// assert_eq!(sanitize_file_name("con.txt"), "con_.txt");
/// assert_eq!(sanitize_file_name("..."), "_");
/// ```
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if is_forbidden_char(c) { '_' } else { c })
        .collect();

    let mut sanitized = trim_name(&replaced).to_string();

    if sanitized.chars().count() > MAX_FILE_NAME_LENGTH {
        sanitized = trim_name(&truncate_keeping_extension(&sanitized)).to_string();
    }

    if reserved_base_name(&sanitized).is_some() {
        sanitized = escape_reserved_name(&sanitized);
    }

    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

/// Trim leading whitespace and trailing whitespace and periods.
fn trim_name(name: &str) -> &str {
    name.trim_start().trim_end_matches(|c: char| c.is_whitespace() || c == '.')
}

/// Uppercased base name if it is a reserved device name.
fn reserved_base_name(name: &str) -> Option<String> {
    let base = name.split('.').next().unwrap_or_default().to_uppercase();
    RESERVED_NAMES.contains(&base.as_str()).then_some(base)
}

fn truncate_keeping_extension(name: &str) -> String {
    let extension = name
        .rfind('.')
        .filter(|&index| index > 0)
        .map_or("", |index| &name[index..]);
    let extension_length = extension.chars().count();
    if extension_length >= MAX_FILE_NAME_LENGTH {
        return name.chars().take(MAX_FILE_NAME_LENGTH).collect();
    }
    let stem = &name[..name.len() - extension.len()];
    let truncated: String = stem.chars().take(MAX_FILE_NAME_LENGTH - extension_length).collect();
    format!("{truncated}{extension}")
}

fn escape_reserved_name(name: &str) -> String {
    let (base, rest) = name.find('.').map_or((name, ""), |index| name.split_at(index));
    if name.chars().count() < MAX_FILE_NAME_LENGTH {
        return format!("{base}_{rest}");
    }
    // No room to append: replace the last character of the base instead
    let mut chars: Vec<char> = base.chars().collect();
    chars.pop();
    let shortened: String = chars.into_iter().collect();
    format!("{shortened}_{rest}")
}


#[cfg(test)]
mod validate_property_tests {
    use super::*;

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn sanitize_is_idempotent(name in "\\PC{0,300}") {
            let once = sanitize_file_name(&name);
            prop_assert_eq!(sanitize_file_name(&once), once);
        }

        #[test]
        fn sanitize_is_idempotent_for_tricky_names(name in "[ .a-zA-Z0-9<>:|?*_-]{0,320}") {
            let once = sanitize_file_name(&name);
            prop_assert_eq!(sanitize_file_name(&once), once);
        }

        #[test]
        fn sanitize_output_has_no_forbidden_characters(name in "\\PC{0,400}") {
            let sanitized = sanitize_file_name(&name);
            prop_assert!(!sanitized.chars().any(is_forbidden_char));
            prop_assert!(sanitized.chars().count() <= MAX_FILE_NAME_LENGTH);
            prop_assert!(!sanitized.is_empty());
        }

        #[test]
        fn valid_names_are_stable(name in "[a-zA-Z0-9 ._()-]{1,260}") {
            if is_valid_file_name(&name) {
                prop_assert_eq!(sanitize_file_name(&name), name);
            }
        }

        #[test]
        fn reserved_prefixes_are_escaped(base in "(?i)(con|prn|aux|nul|com[1-9]|lpt[1-9])", ext in "[a-z]{0,4}") {
            let name = if ext.is_empty() { base } else { format!("{base}.{ext}") };
            let sanitized = sanitize_file_name(&name);
            prop_assert!(reserved_base_name(&sanitized).is_none());
            prop_assert_eq!(sanitize_file_name(&sanitized), sanitized);
        }
    }
}
