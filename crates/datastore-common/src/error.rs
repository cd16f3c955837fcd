//! Error types shared across the datastore workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, DatastoreError>;

/// Main error type for shared datastore helpers
#[derive(Error, Debug)]
pub enum DatastoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid resource URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Unsupported URI scheme '{0}': only local files can be imported")]
    UnsupportedScheme(String),

    #[error("Invalid MIME type: {0}")]
    InvalidMime(String),
}
