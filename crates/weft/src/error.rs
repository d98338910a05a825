//! Error types for Weft operations.
//!
//! [`WeftError`] is the crate-level error. Structural edits report through
//! the narrower [`EditError`], which distinguishes a refused edit from an
//! unsupported one and from an inconsistency found half way through.

use thiserror::Error;

/// The main error type for Weft operations.
#[derive(Debug, Error)]
pub enum WeftError {
    #[error("Model error: {0}")]
    Model(String),

    #[error("Edit error: {0}")]
    Edit(#[from] EditError),
}

/// Failure of a graph service edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The edit is structurally invalid; the matching `can_*` check fails.
    /// Nothing was changed.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The edit is recognised but deliberately not supported.
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    /// The graph reached a state the edit cannot reconcile. Changes made
    /// before detection may remain.
    #[error("Inconsistent graph state: {0}")]
    Inconsistent(String),

    /// A node or link handle that this graph did not issue or has removed.
    #[error("Stale or foreign graph handle")]
    StaleHandle,
}

impl EditError {
    /// Create a new `Precondition` error.
    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::Precondition(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refuse() -> Result<(), WeftError> {
        Err(EditError::precondition("move_message"))?;
        Ok(())
    }

    #[test]
    fn test_edit_errors_convert_with_question_mark() {
        let err = refuse().unwrap_err();
        assert!(matches!(err, WeftError::Edit(EditError::Precondition(_))));
        assert_eq!(err.to_string(), "Edit error: Precondition failed: move_message");
    }
}
