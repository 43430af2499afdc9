//! Error types for dbgsplit.
//!
//! Library crates use [`SplitError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all dbgsplit operations.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    /// The capture subdirectory does not exist under the corpus root.
    #[error("capture root not found: {path:?}")]
    RootNotFound { path: PathBuf },

    /// The capture file of a process folder could not be read.
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The capture file was read but is not valid text.
    #[error("failed to decode {path:?}: {message}")]
    Decode { path: PathBuf, message: String },

    /// An output directory or artifact could not be written.
    #[error("failed to write artifact `{artifact}` at {path:?}: {source}")]
    Write {
        artifact: String,
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The section catalog is invalid (duplicate ids, bad titles, ...).
    #[error("catalog error: {message}")]
    Catalog { message: String },

    /// Filesystem I/O error outside the per-folder read/write paths.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SplitError>;

impl SplitError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a catalog error from any displayable message.
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a read failure of a capture file.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Wrap a write failure of an artifact (or its directory).
    pub fn write(
        artifact: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Write {
            artifact: artifact.into(),
            path: path.into(),
            source,
        }
    }
}
