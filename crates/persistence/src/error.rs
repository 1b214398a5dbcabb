//! Persistence errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt record {path}: {message}")]
    Corrupt { path: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PersistenceError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl From<PersistenceError> for coach_core::Error {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(id) => coach_core::Error::NotFound(format!("session {}", id)),
            PersistenceError::InvalidFileName(_) => coach_core::Error::Validation(err.to_string()),
            other => coach_core::Error::Storage(other.to_string()),
        }
    }
}
