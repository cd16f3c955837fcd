//! Row storage capability
//!
//! Implement [`DatabaseTable`] for any backend that can hold one import
//! table. Methods take `&self` so one table can be shared (through an
//! `Arc`) between a job, its rehydrated successor and the caller.

pub mod memory;
pub mod sqlite;

use thiserror::Error;

use crate::schema::{Row, Schema};

pub use memory::MemoryTable;
pub use sqlite::SqliteTable;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Schema serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Table '{0}' has no schema")]
    NoSchema(String),

    #[error("Table '{table}' already has a different schema")]
    SchemaMismatch { table: String },

    #[error("Row has {actual} values but table '{table}' has {expected} columns")]
    ColumnMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("Storage lock poisoned: {0}")]
    Poisoned(String),
}

/// Persistent home for the rows of one imported resource
pub trait DatabaseTable: Send + Sync {
    /// Backend-specific table identifier
    fn table_name(&self) -> &str;

    /// Create the table. Re-creating with an identical schema is a no-op.
    fn create_schema(&self, schema: &Schema) -> Result<(), StorageError>;

    /// Current schema, `None` until created or after a drop
    fn schema(&self) -> Result<Option<Schema>, StorageError>;

    /// Append one row; it must have exactly one value per field
    fn insert(&self, row: &Row) -> Result<(), StorageError>;

    /// Number of rows stored
    fn count(&self) -> Result<u64, StorageError>;

    /// Every stored row in insertion order
    fn retrieve_all(&self) -> Result<Vec<Row>, StorageError>;

    /// Remove the table and all of its rows
    fn drop_table(&self) -> Result<(), StorageError>;
}
