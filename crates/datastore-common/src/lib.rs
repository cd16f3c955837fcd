//! Datastore Common Library
//!
//! Shared types, utilities, and error handling for the datastore workspace.
//!
//! # Overview
//!
//! - **Resources**: the immutable descriptor of a file to import
//! - **Digests**: short, deterministic hashes used for identifiers
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Error Handling**: common error and result types
//!
//! # Example
//!
//! ```no_run
//! use datastore_common::{Resource, Result};
//!
//! fn describe(path: &str) -> Result<()> {
//!     let resource = Resource::from_path("countries", path);
//!     let local = resource.local_path()?;
//!     tracing::info!(path = %local.display(), mime = %resource.mime_type(), "resource ready");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod digest;
pub mod error;
pub mod logging;
pub mod resource;

// Re-export commonly used types
pub use error::{DatastoreError, Result};
pub use resource::Resource;
