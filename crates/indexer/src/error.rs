use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use textindex_core::{IndexError, SourceId};
use textindex_parsers::ParserError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read configuration '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    ParseConfig(#[from] toml::de::Error),

    #[error("a line parser and a text parser cannot both be configured")]
    ConflictingParsers,

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error("source {0} is already registered")]
    DuplicateSource(SourceId),

    #[error("indexing agents need a tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Failures raised by a document source.
///
/// `AccessDenied` and `Io` concern a single document; `Walk`, `Watch` and the construction
/// errors concern the whole source.
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    #[error("access denied to '{path}'")]
    AccessDenied { path: String },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("document '{id}' belongs to source {owner}, not to source {requested}")]
    ForeignDocument {
        id: String,
        owner: SourceId,
        requested: SourceId,
    },

    #[error("'{0}' is not an existing directory")]
    InvalidRoot(PathBuf),

    #[error("invalid search pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("failed to enumerate documents: {0}")]
    Walk(String),

    #[error("change feed failed: {0}")]
    Watch(String),
}

impl SourceError {
    /// Classifies an I/O error raised while opening or reading `path`.
    pub fn from_io(path: impl Into<String>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::AccessDenied { path },
            _ => Self::Io {
                path,
                source: Arc::new(err),
            },
        }
    }

    /// Transient failures worth another attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Failure of one document, reported without stopping the agent.
#[derive(Error, Debug, Clone)]
pub enum DocumentError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("parse task failed: {0}")]
    Task(String),
}
