//! Error types for blob storage.
//!
//! Configuration problems are always fatal to construction. I/O problems are
//! surfaced as-is with a short description of the step that failed, so a
//! caller can tell a failed copy apart from a descriptor that did not close.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid hash function name {0:?}")]
    UnsupportedHashAlgorithm(String),

    #[error("unhandled blobstore URL {0:?}")]
    UnsupportedBackendScheme(String),

    #[error("invalid file url {0:?} is missing path")]
    MissingPath(String),

    #[error("invalid blobstore URL {0:?}: malformed percent-escape")]
    InvalidLocator(String),

    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Errors returned by store operations.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
}

impl BlobError {
    /// The underlying I/O error kind, if this is an I/O failure.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            BlobError::Io { source, .. } => Some(source.kind()),
            BlobError::Config(_) => None,
        }
    }

    /// Whether construction failed because of the configuration.
    pub fn is_config(&self) -> bool {
        matches!(self, BlobError::Config(_))
    }
}

pub type Result<T, E = BlobError> = std::result::Result<T, E>;

/// Attach a step description to an `io::Result`.
pub(crate) trait IoResultExt<T> {
    fn context(self, context: &'static str) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn context(self, context: &'static str) -> Result<T> {
        self.map_err(|source| BlobError::Io { context, source })
    }
}
