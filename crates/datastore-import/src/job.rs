//! Import job controller
//!
//! An [`ImportJob`] moves one resource into one table. Each call to
//! [`ImportJob::run`] continues from where the previous call stopped and
//! returns when the input is exhausted, a fault occurs, or the time limit is
//! reached. Progress lives in a [`ResumeCursor`] that survives
//! serialization, so a job can be rebuilt in a later process and carry on.
//!
//! # Status transitions
//!
//! ```text
//! STOPPED|IN_PROGRESS --run--> DONE | ERROR | IN_PROGRESS (time limit)
//! DONE|ERROR          --run--> unchanged
//! any                 --drop-> STOPPED
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use datastore_common::Resource;
use tracing::{debug, error, info, info_span, warn};

use crate::config::{ImportConfig, DEFAULT_CHECK_INTERVAL};
use crate::error::{ImportError, Result};
use crate::job_store::JobStore;
use crate::parser::RowParser;
use crate::schema::{build_schema, Schema};
use crate::snapshot::{JobSnapshot, SNAPSHOT_VERSION};
use crate::storage::DatabaseTable;
use crate::types::{JobResult, JobStatus, ResumeCursor};

/// How a single run ended without a fault
enum Slice {
    Finished,
    Yielded,
}

pub struct ImportJob {
    id: String,
    resource: Resource,
    storage: Arc<dyn DatabaseTable>,
    parser: Arc<dyn RowParser>,
    status: JobStatus,
    error: Option<String>,
    cursor: Option<ResumeCursor>,
    time_limit: Option<u64>,
    check_interval: u64,
    job_store: Option<Arc<dyn JobStore>>,
}

impl fmt::Debug for ImportJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportJob")
            .field("id", &self.id)
            .field("resource", &self.resource)
            .field("table", &self.storage.table_name())
            .field("parser", &self.parser.name())
            .field("status", &self.status)
            .field("cursor", &self.cursor)
            .field("time_limit", &self.time_limit)
            .finish_non_exhaustive()
    }
}

impl ImportJob {
    /// Create a fresh, `STOPPED` job
    pub fn new(id: impl Into<String>, config: &ImportConfig) -> Result<Self> {
        let wiring = config.wiring()?;
        Ok(Self {
            id: id.into(),
            resource: wiring.resource,
            storage: wiring.storage,
            parser: wiring.parser,
            status: JobStatus::Stopped,
            error: None,
            cursor: None,
            time_limit: config.time_limit,
            check_interval: config.check_interval.max(1),
            job_store: None,
        })
    }

    /// Load the job saved under `id`, or create it from `config`.
    ///
    /// The returned job writes its snapshot back to `job_store` after every
    /// run and drop. A saved snapshot wins over the resource and time limit
    /// in `config`; storage and parser always come from `config`.
    pub fn get(id: &str, job_store: Arc<dyn JobStore>, config: &ImportConfig) -> Result<Self> {
        let wiring = config.wiring()?;

        let mut job = match job_store.retrieve(id)? {
            Some(json) => {
                debug!(id = %id, "Hydrating import job from job store");
                let mut job = Self::hydrate(&json, wiring.storage, wiring.parser)?;
                job.id = id.to_string();
                job
            },
            None => {
                debug!(id = %id, "Creating import job");
                Self::new(id, config)?
            },
        };

        job.job_store = Some(job_store);
        Ok(job)
    }

    /// Rebuild a job from [`ImportJob::serialize`] output
    pub fn hydrate(
        json: &str,
        storage: Arc<dyn DatabaseTable>,
        parser: Arc<dyn RowParser>,
    ) -> Result<Self> {
        let snapshot = JobSnapshot::from_json(json)?;
        Ok(Self {
            id: snapshot.job_id().to_string(),
            resource: snapshot.resource,
            storage,
            parser,
            status: snapshot.status,
            error: snapshot.error,
            cursor: snapshot.cursor,
            time_limit: snapshot.time_limit,
            check_interval: snapshot
                .check_interval
                .unwrap_or(DEFAULT_CHECK_INTERVAL)
                .max(1),
            job_store: None,
        })
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            version: SNAPSHOT_VERSION,
            id: Some(self.id.clone()),
            status: self.status,
            time_limit: self.time_limit,
            check_interval: Some(self.check_interval),
            resource: self.resource.clone(),
            cursor: self.cursor,
            error: self.error.clone(),
            saved_at: Some(Utc::now()),
        }
    }

    pub fn serialize(&self) -> Result<String> {
        self.snapshot().to_json()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn storage(&self) -> &Arc<dyn DatabaseTable> {
        &self.storage
    }

    pub fn parser(&self) -> &Arc<dyn RowParser> {
        &self.parser
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn result(&self) -> JobResult {
        JobResult {
            status: self.status,
            error: self.error.clone(),
        }
    }

    /// Data rows stored so far
    pub fn rows_committed(&self) -> u64 {
        self.cursor.map(|c| c.rows).unwrap_or(0)
    }

    pub fn cursor(&self) -> Option<ResumeCursor> {
        self.cursor
    }

    /// Limit each run to `seconds` of wall-clock time
    pub fn set_time_limit(&mut self, seconds: u64) {
        self.time_limit = Some(seconds);
    }

    pub fn clear_time_limit(&mut self) {
        self.time_limit = None;
    }

    pub fn time_limit(&self) -> Option<u64> {
        self.time_limit
    }

    /// Rows imported between time checks (at least 1)
    pub fn set_check_interval(&mut self, rows: u64) {
        self.check_interval = rows.max(1);
    }

    pub fn check_interval(&self) -> u64 {
        self.check_interval
    }

    /// Import until done, failed, or out of time.
    ///
    /// Faults never escape: they move the job to `ERROR` with the message
    /// kept in the returned [`JobResult`].
    pub fn run(&mut self) -> JobResult {
        let span = info_span!("import_job", id = %self.id, resource = %self.resource.uri());
        let _enter = span.enter();

        if self.status.is_terminal() {
            debug!(status = %self.status, "Job already finished, nothing to do");
            return self.result();
        }

        let started = Instant::now();
        self.status = JobStatus::InProgress;

        match self.import_slice(started) {
            Ok(Slice::Finished) => {
                self.status = JobStatus::Done;
                info!(
                    rows = self.rows_committed(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Import complete"
                );
            },
            Ok(Slice::Yielded) => {
                info!(
                    rows = self.rows_committed(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Time limit reached, pausing import"
                );
            },
            Err(e) => {
                self.status = JobStatus::Error;
                self.error = Some(e.to_string());
                error!(rows = self.rows_committed(), error = %e, "Import failed");
            },
        }

        self.persist();
        self.result()
    }

    /// Drop the table and forget all progress
    pub fn drop_job(&mut self) -> Result<()> {
        self.storage.drop_table()?;
        self.status = JobStatus::Stopped;
        self.error = None;
        self.cursor = None;

        info!(id = %self.id, table = %self.storage.table_name(), "Dropped import job");
        self.persist();
        Ok(())
    }

    fn import_slice(&mut self, started: Instant) -> Result<Slice> {
        let resume = self.resume_cursor()?;
        let mut reader = self.parser.open(&self.resource, resume.map(|c| c.position()))?;

        let (schema, mut cursor) = match resume {
            Some(cursor) => {
                let schema = self
                    .storage
                    .schema()?
                    .ok_or_else(|| ImportError::fault("Table schema disappeared while resuming"))?;
                debug!(line = cursor.line, rows = cursor.rows, "Resuming import");
                (schema, cursor)
            },
            None => {
                let header = reader
                    .next_row()
                    .ok_or_else(|| ImportError::fault("Resource has no header row"))??;
                let schema = build_schema(&header)?;
                self.storage.create_schema(&schema)?;
                debug!(fields = schema.len(), table = %self.storage.table_name(), "Created schema");

                let cursor = ResumeCursor::at(reader.position(), 0);
                self.cursor = Some(cursor);
                (schema, cursor)
            },
        };

        let mut surplus = self.storage.count()?.saturating_sub(cursor.rows);
        if surplus > 0 {
            warn!(surplus, "Table holds rows past the saved cursor, skipping them");
        }

        let mut since_check: u64 = 0;
        loop {
            let line = reader.position().line;
            let Some(row) = reader.next_row() else {
                return Ok(Slice::Finished);
            };

            if since_check >= self.check_interval {
                since_check = 0;
                if self.out_of_time(started) {
                    return Ok(Slice::Yielded);
                }
            }

            let row = fit_row(row?, &schema, line)?;
            if surplus > 0 {
                surplus -= 1;
            } else {
                self.storage.insert(&row)?;
            }

            cursor = ResumeCursor::at(reader.position(), cursor.rows + 1);
            self.cursor = Some(cursor);
            since_check += 1;
        }
    }

    /// Cursor to continue from, or `None` to start over
    fn resume_cursor(&mut self) -> Result<Option<ResumeCursor>> {
        let Some(cursor) = self.cursor else {
            return Ok(None);
        };

        if self.storage.schema()?.is_none() {
            warn!(rows = cursor.rows, "Table is gone, restarting import from the beginning");
            self.cursor = None;
            return Ok(None);
        }

        let stored = self.storage.count()?;
        if stored < cursor.rows {
            warn!(
                stored,
                expected = cursor.rows,
                "Table lost committed rows, restarting import from the beginning"
            );
            self.storage.drop_table()?;
            self.cursor = None;
            return Ok(None);
        }

        Ok(Some(cursor))
    }

    fn out_of_time(&self, started: Instant) -> bool {
        match self.time_limit {
            Some(seconds) => started.elapsed() >= Duration::from_secs(seconds),
            None => false,
        }
    }

    fn persist(&self) {
        let Some(store) = &self.job_store else {
            return;
        };

        match self.serialize() {
            Ok(json) => {
                if let Err(e) = store.store(&self.id, &json) {
                    warn!(id = %self.id, error = %e, "Failed to save job snapshot");
                }
            },
            Err(e) => warn!(id = %self.id, error = %e, "Failed to serialize job snapshot"),
        }
    }
}

/// Pad a short row with empty values; reject one longer than the header
fn fit_row(mut row: Vec<String>, schema: &Schema, line: u64) -> Result<Vec<String>> {
    if row.len() > schema.len() {
        return Err(ImportError::fault(format!(
            "Record on line {} has {} values but the header has {}",
            line,
            row.len(),
            schema.len()
        )));
    }
    row.resize(schema.len(), String::new());
    Ok(row)
}
