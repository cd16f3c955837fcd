//! Process-wide import settings
//!
//! Read from `DATASTORE_*` environment variables. The CLI loads a `.env`
//! file first, so the same keys work there.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::DEFAULT_CHECK_INTERVAL;
use crate::error::{ImportError, Result};
use crate::job::ImportJob;

// ============================================================================
// Defaults
// ============================================================================

/// Directory for job snapshots when `DATASTORE_STATE_DIR` is unset
pub const DEFAULT_STATE_DIR: &str = ".datastore/jobs";

/// SQLite database when `DATASTORE_DATABASE` is unset
pub const DEFAULT_DATABASE: &str = ".datastore/datastore.sqlite";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastoreSettings {
    /// Seconds per import run (None = unbounded)
    pub time_limit: Option<u64>,

    /// Rows between time checks
    pub check_interval: u64,

    /// Where job snapshots are kept
    pub state_dir: PathBuf,

    /// SQLite database holding import tables
    pub database: PathBuf,

    /// Delete the local source file once its import is `DONE`
    #[serde(default)]
    pub delete_local_resource: bool,
}

impl Default for DatastoreSettings {
    fn default() -> Self {
        Self {
            time_limit: None,
            check_interval: DEFAULT_CHECK_INTERVAL,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            database: PathBuf::from(DEFAULT_DATABASE),
            delete_local_resource: false,
        }
    }
}

impl DatastoreSettings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();

        if let Ok(value) = std::env::var("DATASTORE_TIME_LIMIT") {
            settings.time_limit = Some(parse_number("DATASTORE_TIME_LIMIT", &value)?);
        }

        if let Ok(value) = std::env::var("DATASTORE_CHECK_INTERVAL") {
            let rows = parse_number("DATASTORE_CHECK_INTERVAL", &value)?;
            if rows == 0 {
                return Err(ImportError::config(
                    "DATASTORE_CHECK_INTERVAL must be greater than 0",
                ));
            }
            settings.check_interval = rows;
        }

        if let Ok(dir) = std::env::var("DATASTORE_STATE_DIR") {
            settings.state_dir = PathBuf::from(dir);
        }

        if let Ok(path) = std::env::var("DATASTORE_DATABASE") {
            settings.database = PathBuf::from(path);
        }

        if let Ok(value) = std::env::var("DATASTORE_DELETE_LOCAL_RESOURCE") {
            settings.delete_local_resource = parse_flag("DATASTORE_DELETE_LOCAL_RESOURCE", &value)?;
        }

        Ok(settings)
    }

    /// Apply the per-pass settings to `job`, replacing what its snapshot held
    pub fn apply_to(&self, job: &mut ImportJob) {
        if let Some(seconds) = self.time_limit {
            job.set_time_limit(seconds);
        }
        job.set_check_interval(self.check_interval);
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| ImportError::config(format!("{} must be a whole number, got '{}'", key, value)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ImportError::config(format!(
            "{} must be a boolean, got '{}'",
            key, value
        ))),
    }
}
