//! Process-local cache of live import jobs
//!
//! Within one process there is at most one [`ImportJob`] per identifier:
//! the first lookup builds (or rehydrates) the job and later lookups get the
//! same instance back.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::ImportConfig;
use crate::error::{ImportError, Result};
use crate::job::ImportJob;
use crate::job_store::JobStore;

pub struct ImportRegistry {
    job_store: Arc<dyn JobStore>,
    jobs: HashMap<String, ImportJob>,
}

impl ImportRegistry {
    pub fn new(job_store: Arc<dyn JobStore>) -> Self {
        Self {
            job_store,
            jobs: HashMap::new(),
        }
    }

    /// Cached job for `identifier`, building it from `config` on first use.
    ///
    /// `config` is ignored once the job is cached.
    pub fn get_instance(&mut self, identifier: &str, config: &ImportConfig) -> Result<&mut ImportJob> {
        if config.resource.is_none() {
            return Err(ImportError::contract("config resource is required"));
        }

        if !self.jobs.contains_key(identifier) {
            let job = ImportJob::get(identifier, Arc::clone(&self.job_store), config)?;
            debug!(id = %identifier, status = %job.status(), "Registered import job");
            self.jobs.insert(identifier.to_string(), job);
        }

        self.jobs
            .get_mut(identifier)
            .ok_or_else(|| ImportError::contract(format!("job '{}' is not registered", identifier)))
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.jobs.contains_key(identifier)
    }

    /// Evict a job from the cache; its saved snapshot stays in the job store
    pub fn remove(&mut self, identifier: &str) -> Option<ImportJob> {
        self.jobs.remove(identifier)
    }

    pub fn job_store(&self) -> &Arc<dyn JobStore> {
        &self.job_store
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
