//! Row parser capability
//!
//! A parser turns a resource into an ordered, finite sequence of string
//! rows. Parsing can only be restarted from a [`ReaderPosition`] previously
//! reported by a reader over the same resource.

pub mod delimited;

use datastore_common::{DatastoreError, Resource};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::Row;

pub use delimited::CsvParser;

/// Where the next unread record starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderPosition {
    /// Byte offset of the next record from the start of the file
    pub byte_offset: u64,

    /// 1-based line number of the next record
    pub line: u64,
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("File not found: {location}")]
    NotFound { location: String },

    #[error("Unable to read {location}: {source}")]
    Unreadable {
        location: String,
        source: std::io::Error,
    },

    #[error("Invalid location {location}: {source}")]
    InvalidLocation {
        location: String,
        source: DatastoreError,
    },

    #[error("{location} is not text: {reason}")]
    NotText { location: String, reason: String },

    #[error("Malformed record near line {line}: {reason}")]
    Malformed { line: u64, reason: String },
}

/// Opens resources for row-by-row reading
pub trait RowParser: Send + Sync {
    /// Short name used in logs (e.g., "csv")
    fn name(&self) -> &str;

    /// Open `resource`, positioned at `start` or at the first record.
    ///
    /// When reading from the beginning the first row produced is the header.
    fn open(
        &self,
        resource: &Resource,
        start: Option<ReaderPosition>,
    ) -> Result<Box<dyn RowReader>, ParseError>;
}

/// A lazy sequence of rows from one opened resource
pub trait RowReader: Send {
    /// Next row, `None` once the input is exhausted
    fn next_row(&mut self) -> Option<Result<Row, ParseError>>;

    /// Position of the next unread record
    fn position(&self) -> ReaderPosition;
}
