//! Error types for datastore imports
//!
//! `ImportError` is the single error surfaced by the import engine. Data
//! faults raised while a job runs are captured into the job's terminal
//! `ERROR` state and reported through `JobResult`; only contract violations,
//! snapshot problems and job store failures escape as `Err` from constructors.

use thiserror::Error;

use crate::job_store::JobStoreError;
use crate::parser::ParseError;
use crate::storage::StorageError;

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

#[derive(Error, Debug)]
pub enum ImportError {
    /// A required collaborator (storage, parser, resource) is missing
    #[error("{0}")]
    ContractViolation(String),

    /// The resource could not be opened or read
    #[error("Unable to read resource at {location}: {reason}")]
    SourceUnavailable { location: String, reason: String },

    /// The resource is not text where text was declared
    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    /// Two or more headers sanitize to the same identifier
    #[error("Duplicate headers error: {}", .0.join(", "))]
    DuplicateHeaders(Vec<String>),

    /// Any other parse or storage failure
    #[error("{0}")]
    UnderlyingFault(String),

    /// A snapshot could not be encoded or decoded
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Invalid process settings
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Job store error: {0}")]
    JobStore(#[from] JobStoreError),
}

impl ImportError {
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::ContractViolation(msg.into())
    }

    pub fn fault(msg: impl Into<String>) -> Self {
        Self::UnderlyingFault(msg.into())
    }

    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::Snapshot(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<ParseError> for ImportError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::NotFound { location } => ImportError::SourceUnavailable {
                location,
                reason: "file does not exist".to_string(),
            },
            ParseError::Unreadable { location, source } => ImportError::SourceUnavailable {
                location,
                reason: source.to_string(),
            },
            ParseError::InvalidLocation { location, source } => ImportError::SourceUnavailable {
                location,
                reason: source.to_string(),
            },
            ParseError::NotText { location, reason } => {
                ImportError::UnsupportedContent(format!("{} is not a text file ({})", location, reason))
            },
            ParseError::Malformed { line, reason } => {
                ImportError::UnderlyingFault(format!("Malformed record near line {}: {}", line, reason))
            },
        }
    }
}

impl From<StorageError> for ImportError {
    fn from(err: StorageError) -> Self {
        ImportError::UnderlyingFault(format!("Storage failure: {}", err))
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::Snapshot(err.to_string())
    }
}
