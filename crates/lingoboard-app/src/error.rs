//! Application errors.

use lingoboard_core::{ConfigError, StorageError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Invalid session script: {0}")]
    Script(#[source] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;

/// Read a whole file, keeping the path in the error.
pub(crate) fn read_file(path: &std::path::Path) -> AppResult<String> {
    std::fs::read_to_string(path).map_err(|source| AppError::Read {
        path: path.to_path_buf(),
        source,
    })
}
