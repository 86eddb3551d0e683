//! Watcher error types.

use std::path::PathBuf;

/// Errors that can occur while watching the conversation root.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// Watch root does not exist.
    #[error("Watch root not found: {0}")]
    RootNotFound(PathBuf),

    /// Notify watcher error.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
