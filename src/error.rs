//! Error types for chart-mirror
//!
//! Every failure in the pipeline is fatal to the run. Variants carry enough
//! context (repository URL, artifact URL, local path) to diagnose a failed
//! mirror without re-running it with verbose logging.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for chart-mirror operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for chart-mirror
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "repository.url")
        key: Option<String>,
    },

    /// Network error (connection refused, TLS failure, timeout, broken body stream)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The repository index could not be retrieved
    #[error("failed to fetch index from {url}: {source}")]
    IndexFetch {
        /// Repository URL the index was requested from
        url: String,
        /// Underlying transport failure
        #[source]
        source: Box<Error>,
    },

    /// The repository index is not a well-formed YAML document
    #[error("failed to parse index from {url}: {source}")]
    IndexParse {
        /// Repository URL the index was requested from
        url: String,
        /// Underlying YAML error
        #[source]
        source: serde_yaml::Error,
    },

    /// The repository index parsed but violates a structural invariant
    #[error("invalid index from {url}: {reason}")]
    InvalidIndex {
        /// Repository URL the index was requested from
        url: String,
        /// What is wrong with the index
        reason: String,
    },

    /// The remote answered with a non-2xx status
    #[error("{status}: {message}")]
    RemoteStatus {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body, or the raw body
        message: String,
    },

    /// An artifact URL from the index cannot be mapped to a local path
    #[error("invalid artifact URL {url}: {reason}")]
    InvalidArtifactUrl {
        /// The artifact URL as listed in the index
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// An artifact could not be downloaded within the retry budget
    #[error("failed to download {url} to {}: {source}", path.display())]
    Download {
        /// Artifact URL relative to the repository (or absolute when off-repository)
        url: String,
        /// Final destination path of the artifact
        path: PathBuf,
        /// The last error observed before giving up
        #[source]
        source: Box<Error>,
    },

    /// A chart archive is not a valid gzip-compressed tar stream
    #[error("failed to decode archive {}: {reason}", archive.display())]
    ArchiveDecode {
        /// The archive being rewritten
        archive: PathBuf,
        /// The reason decoding failed
        reason: String,
    },

    /// Local filesystem operation failed
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        /// Path the operation was acting on
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Build a [`Error::Filesystem`] for `path`
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Build a [`Error::Config`] for `key`
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// HTTP status code carried by this error, if any
    ///
    /// Looks through the `IndexFetch` and `Download` wrappers.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RemoteStatus { status, .. } => Some(*status),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            Error::IndexFetch { source, .. } | Error::Download { source, .. } => source.status(),
            _ => None,
        }
    }
}
