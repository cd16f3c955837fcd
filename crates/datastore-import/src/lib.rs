//! Datastore Import Library
//!
//! Resumable, time-bounded import of delimited text files into row storage.
//!
//! # Components
//!
//! - **header / schema**: turn raw column names into safe, unique identifiers
//! - **parser**: the [`RowParser`] capability and a CSV/TSV implementation
//! - **storage**: the [`DatabaseTable`] capability with in-memory and SQLite tables
//! - **job**: the [`ImportJob`] controller and its status machine
//! - **snapshot / job_store**: save a job and pick it up again later
//! - **registry**: one live job per identifier within a process
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use datastore_common::Resource;
//! use datastore_import::{CsvParser, ImportConfig, ImportJob, JobStatus, MemoryTable};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ImportConfig::builder()
//!         .resource(Resource::from_path("1", "./data/countries.csv"))
//!         .storage(Arc::new(MemoryTable::new("countries")))
//!         .parser(Arc::new(CsvParser::new()))
//!         .time_limit(30)
//!         .build();
//!
//!     let mut job = ImportJob::new("1", &config)?;
//!     while job.run().status == JobStatus::InProgress {}
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod error;
pub mod header;
pub mod job;
pub mod job_store;
pub mod parser;
pub mod registry;
pub mod reserved;
pub mod schema;
pub mod settings;
pub mod snapshot;
pub mod storage;
pub mod types;

pub use config::{ImportConfig, DEFAULT_CHECK_INTERVAL};
pub use error::{ImportError, Result};
pub use header::{sanitize_description, sanitize_header, truncate_header};
pub use job::ImportJob;
pub use job_store::{FileJobStore, JobStore, JobStoreError, MemoryJobStore};
pub use parser::{CsvParser, ReaderPosition, RowParser, RowReader};
pub use registry::ImportRegistry;
pub use schema::{build_schema, Field, FieldType, Row, Schema};
pub use settings::DatastoreSettings;
pub use snapshot::{JobSnapshot, SNAPSHOT_VERSION};
pub use storage::{DatabaseTable, MemoryTable, SqliteTable, StorageError};
pub use types::{JobResult, JobStatus, ResumeCursor};
