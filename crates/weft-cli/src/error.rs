//! Errors raised while running an interaction document.

use std::{io, ops::Range};

use thiserror::Error;

use weft::{EditError, WeftError};

use crate::config::ConfigError;

/// Everything that can stop a CLI run.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The document is not valid TOML or does not match the document schema.
    #[error("Invalid document: {message}")]
    Document {
        message: String,
        span: Option<Range<usize>>,
        src: String,
    },

    /// An edit names a label that no lifeline or earlier edit defined.
    #[error("Edit #{index} ({op}) refers to unknown label `{label}`")]
    UnknownLabel {
        index: usize,
        op: &'static str,
        label: String,
    },

    /// An edit names something of the wrong kind, such as a message where a
    /// lifeline is expected.
    #[error("Edit #{index} ({op}): `{label}` is not a {expected}")]
    WrongKind {
        index: usize,
        op: &'static str,
        label: String,
        expected: &'static str,
    },

    #[error("Edit #{index} ({op}) failed: {source}")]
    Edit {
        index: usize,
        op: &'static str,
        source: EditError,
    },

    #[error("Cannot write report: {0}")]
    Report(String),

    #[error(transparent)]
    Weft(#[from] WeftError),
}
