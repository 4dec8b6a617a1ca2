//! Error types for the lifecycle module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while moving recordings between lifecycle
/// directories.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Failed to move/rename a file.
    #[error("Failed to move file from {source_path} to {destination}")]
    MoveFailed {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to create a lifecycle directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to remove a file.
    #[error("Failed to remove file: {path}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LifecycleError {
    /// Creates a move failed error.
    pub fn move_failed(source_path: PathBuf, destination: PathBuf, error: std::io::Error) -> Self {
        Self::MoveFailed {
            source_path,
            destination,
            error,
        }
    }
}
