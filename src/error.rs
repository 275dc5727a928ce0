//! Error type for rename operations.

use thiserror::Error;

use crate::conflict::CollisionReport;

/// Errors that abort a preview, an apply or an undo/redo step.
///
/// Per-file problems are not errors:
/// invalid names stay in the preview and filesystem failures end up in the failed id list.
#[derive(Debug, Error)]
pub enum RenameError {
    /// Another rename batch is still running on the same executor.
    #[error("A rename batch is already in progress")]
    Busy,

    /// Computed target names collide with each other or with existing files.
    #[error("{count} conflicting target name(s):\n{0}", count = .0.len())]
    Collision(CollisionReport),

    /// Automatic numbering ran out of padding levels before the names became unique.
    #[error("Could not resolve conflicting names after {attempts} numbering attempt(s):\n{report}")]
    EscalationExhausted { report: CollisionReport, attempts: usize },

    /// The find pattern is not a valid regular expression.
    #[error("Invalid find pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Sequence number does not fit into the number range.
    #[error("Sequence number overflows for file index {index}")]
    NumberOverflow { index: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
