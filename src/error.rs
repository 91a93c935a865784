//! Error type shared by the storage layer and the command handlers.
//!
//! The estimation engine itself never fails; it degrades to neutral values.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Reading or writing the data file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The data file (or an imported file) is not valid JSON for its shape.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A user-supplied date is not `YYYY-MM-DD`.
    #[error("Invalid date '{0}'. Use YYYY-MM-DD.")]
    InvalidDate(String),

    /// A referenced record does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// Any other rejected input.
    #[error("{0}")]
    Invalid(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
