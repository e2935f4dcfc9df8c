// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoneError>;

#[derive(Debug, Error)]
pub enum StoneError {
    #[error("({row}:{column}): {message}")]
    Lex {
        row: u32,
        column: u32,
        message: String,
    },

    /// No recognizer matched, or a matched construct cannot be compiled.
    #[error("({row}:{column}): {message}")]
    Semantic {
        row: u32,
        column: u32,
        message: String,
    },

    #[error("({row}:{column}): call to undefined function `{name}`")]
    UndefinedFunction { row: u32, column: u32, name: String },

    #[error("no function named `{0}` is loaded")]
    UnknownEntry(String),

    #[error("`{name}` expects {expected} argument(s), {found} supplied")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoneError {
    /// Row and column of the offending token, for load-time errors.
    pub fn position(&self) -> Option<(u32, u32)> {
        match self {
            StoneError::Lex { row, column, .. }
            | StoneError::Semantic { row, column, .. }
            | StoneError::UndefinedFunction { row, column, .. } => Some((*row, *column)),
            StoneError::UnknownEntry(_)
            | StoneError::ArgumentCount { .. }
            | StoneError::Io { .. } => None,
        }
    }
}
