//! Persistence for job snapshots
//!
//! A job store maps a job identifier to the JSON produced by
//! [`ImportJob::serialize`](crate::job::ImportJob::serialize). It knows
//! nothing about the snapshot format.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use datastore_common::digest::short_digest;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum JobStoreError {
    #[error("IO error for job '{id}': {source}")]
    Io {
        id: String,
        source: std::io::Error,
    },

    #[error("Job store lock poisoned: {0}")]
    Poisoned(String),
}

/// Keyed storage for serialized jobs
pub trait JobStore: Send + Sync {
    /// Saved snapshot for `id`, if any
    fn retrieve(&self, id: &str) -> Result<Option<String>, JobStoreError>;

    /// Save (or replace) the snapshot for `id`
    fn store(&self, id: &str, snapshot: &str) -> Result<(), JobStoreError>;

    /// Forget `id`. Removing an unknown id is not an error.
    fn remove(&self, id: &str) -> Result<(), JobStoreError>;
}

/// Process-local job store
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryJobStore {
    fn retrieve(&self, id: &str) -> Result<Option<String>, JobStoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| JobStoreError::Poisoned(e.to_string()))?;
        Ok(entries.get(id).cloned())
    }

    fn store(&self, id: &str, snapshot: &str) -> Result<(), JobStoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| JobStoreError::Poisoned(e.to_string()))?;
        entries.insert(id.to_string(), snapshot.to_string());
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<(), JobStoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| JobStoreError::Poisoned(e.to_string()))?;
        entries.remove(id);
        Ok(())
    }
}

/// One JSON file per job inside a directory.
///
/// Identifiers are mapped to safe file names; any identifier that had to be
/// rewritten gets a digest suffix so two ids never share a file.
#[derive(Debug, Clone)]
pub struct FileJobStore {
    dir: PathBuf,
}

impl FileJobStore {
    /// Use `dir` for snapshots, creating it if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, JobStoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| JobStoreError::Io {
            id: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the snapshot file for `id`
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(id)))
    }
}

fn file_stem(id: &str) -> String {
    let safe: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if safe == id && !safe.is_empty() {
        safe
    } else {
        format!("{}-{}", safe, short_digest(id, 8))
    }
}

fn write_synced(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

impl JobStore for FileJobStore {
    fn retrieve(&self, id: &str) -> Result<Option<String>, JobStoreError> {
        match fs::read_to_string(self.path_for(id)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(JobStoreError::Io {
                id: id.to_string(),
                source,
            }),
        }
    }

    fn store(&self, id: &str, snapshot: &str) -> Result<(), JobStoreError> {
        let path = self.path_for(id);
        let io_err = |source| JobStoreError::Io {
            id: id.to_string(),
            source,
        };

        // Replaced atomically through a temp file
        let tmp = path.with_extension("json.tmp");
        let written = write_synced(&tmp, snapshot).and_then(|()| fs::rename(&tmp, &path));
        if let Err(source) = written {
            if let Err(e) = fs::remove_file(&tmp) {
                if e.kind() != ErrorKind::NotFound {
                    debug!(path = %tmp.display(), error = %e, "Failed to remove temp snapshot");
                }
            }
            return Err(io_err(source));
        }

        debug!(id = %id, path = %path.display(), "Stored job snapshot");
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<(), JobStoreError> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(JobStoreError::Io {
                id: id.to_string(),
                source,
            }),
        }
    }
}
