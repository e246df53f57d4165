use std::path::PathBuf;
use thiserror::Error;

/// Who is at fault for an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied input that cannot be processed.
    Client,
    /// Local storage, the index or a remote source is broken.
    Server,
}

#[derive(Debug, Error)]
pub enum Error {
    /// The domain part of the submitted string is not a registrable hostname.
    #[error("cannot parse domain: {0:?}")]
    DomainParsing(String),

    /// A persisted index is missing, unreadable or corrupt.
    #[error("saved index could not be loaded from {}: {reason}", path.display())]
    IndexLoad { path: PathBuf, reason: String },

    /// A remote source list could not be retrieved.
    #[error("failed to fetch source {id} ({url}): {reason}")]
    SourceFetch { id: String, url: String, reason: String },

    /// The configured source registry file could not be read.
    #[error("cannot read source list {}: {source}", path.display())]
    SourceList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index encoding error: {0}")]
    Encode(#[from] bincode::Error),

    /// The classifier was built from in-memory indices and has nothing to refresh from.
    #[error("classifier has no source manager")]
    NoSources,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DomainParsing(_) => ErrorKind::Client,
            _ => ErrorKind::Server,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::Client
    }
}

pub type Result<T> = std::result::Result<T, Error>;
