use std::path::PathBuf;

use thiserror::Error;

/// Broad category of a [`CreatorError`], for callers that only care about the class of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested configuration is not valid for the format or method.
    Configuration,
    /// The operation is not allowed in the current state (e.g. update without update mode).
    State,
    /// A filesystem operation failed.
    Io,
    /// The compression engine refused or failed the operation.
    Engine,
}

/// The primary error type for all operations in the `arcforge` crate.
#[derive(Debug, Error)]
pub enum CreatorError {
    /// Invalid method for the format, invalid dictionary size, or a missing format capability.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The archive cannot be written given the current settings and on-disk state.
    #[error("State error: {0}")]
    State(String),

    /// An I/O error occurred while creating, writing or renaming an output file.
    /// Includes the path where the error happened.
    #[error("I/O error on path '{}': {source}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// The engine reported a failure, possibly with a message collected by the update callback.
    #[error("Engine error: {0}")]
    Engine(String),
}

impl CreatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CreatorError::Configuration(_) => ErrorKind::Configuration,
            CreatorError::State(_) => ErrorKind::State,
            CreatorError::Io { .. } => ErrorKind::Io,
            CreatorError::Engine(_) => ErrorKind::Engine,
        }
    }

    pub(crate) fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        CreatorError::Io { source, path: path.into() }
    }
}

// Generic IO error conversion that doesn't require a path
impl From<std::io::Error> for CreatorError {
    fn from(err: std::io::Error) -> Self {
        CreatorError::Io { source: err, path: PathBuf::new() }
    }
}
