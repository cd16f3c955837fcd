//! Versioned job snapshots
//!
//! A snapshot captures everything needed to rebuild an [`ImportJob`] except
//! its parser and storage handles, which the caller supplies again on
//! hydration.
//!
//! [`ImportJob`]: crate::job::ImportJob

use chrono::{DateTime, Utc};
use datastore_common::Resource;
use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};
use crate::types::{JobStatus, ResumeCursor};

/// Newest snapshot layout this build reads and writes
pub const SNAPSHOT_VERSION: u32 = 1;

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Job identifier; older snapshots fall back to the resource id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub status: JobStatus,

    /// Seconds per run, `None` for unbounded
    #[serde(default)]
    pub time_limit: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_interval: Option<u64>,

    pub resource: Resource,

    #[serde(default)]
    pub cursor: Option<ResumeCursor>,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl JobSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a snapshot, rejecting layouts newer than [`SNAPSHOT_VERSION`]
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: JobSnapshot = serde_json::from_str(json)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(ImportError::snapshot(format!(
                "unsupported snapshot version {} (newest supported is {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        Ok(snapshot)
    }

    /// Identifier the snapshot belongs to
    pub fn job_id(&self) -> &str {
        self.id.as_deref().unwrap_or_else(|| self.resource.id())
    }
}
