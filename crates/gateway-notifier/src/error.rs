//! Notifier errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while starting the notifier or the watcher
#[derive(Debug, Error)]
pub enum NotifierError {
    /// The HTTP client could not be created
    #[error("Failed to create notifier client: {0}")]
    Client(String),

    /// The queue capacity is zero
    #[error("Notifier queue capacity must be at least 1")]
    ZeroCapacity,

    /// The watch root is missing or unreadable
    #[error("Cannot watch {path}: {source}")]
    WatchRoot {
        /// Configured root
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file-system watcher failed
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),
}
