//! Shared job types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::parser::ReaderPosition;

/// Import job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    Stopped,
    InProgress,
    Done,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Stopped => "STOPPED",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Done => "DONE",
            JobStatus::Error => "ERROR",
        }
    }

    /// `DONE` and `ERROR` only change through a drop
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome reported after each run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub status: JobStatus,

    /// Failure message when `status` is `ERROR`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Resume point of a partially imported resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeCursor {
    /// Byte offset of the next unread record
    pub byte_offset: u64,

    /// Source line of the next unread record
    pub line: u64,

    /// Data rows committed so far (header excluded)
    pub rows: u64,
}

impl ResumeCursor {
    pub fn at(position: ReaderPosition, rows: u64) -> Self {
        Self {
            byte_offset: position.byte_offset,
            line: position.line,
            rows,
        }
    }

    pub fn position(&self) -> ReaderPosition {
        ReaderPosition {
            byte_offset: self.byte_offset,
            line: self.line,
        }
    }
}
