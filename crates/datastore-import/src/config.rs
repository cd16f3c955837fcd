// Import job wiring

use std::fmt;
use std::sync::Arc;

use datastore_common::Resource;

use crate::error::{ImportError, Result};
use crate::parser::RowParser;
use crate::storage::DatabaseTable;

/// Rows imported between two time-budget checks
pub const DEFAULT_CHECK_INTERVAL: u64 = 100;

/// Everything a new import job is built from
#[derive(Clone)]
pub struct ImportConfig {
    /// Source file to import
    pub resource: Option<Resource>,

    /// Destination table
    pub storage: Option<Arc<dyn DatabaseTable>>,

    /// Reader for the resource format
    pub parser: Option<Arc<dyn RowParser>>,

    /// Seconds each run may take (None = unbounded)
    pub time_limit: Option<u64>,

    /// Rows between time checks
    pub check_interval: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            resource: None,
            storage: None,
            parser: None,
            time_limit: None,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

impl fmt::Debug for ImportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportConfig")
            .field("resource", &self.resource)
            .field("storage", &self.storage.as_ref().map(|s| s.table_name().to_string()))
            .field("parser", &self.parser.as_ref().map(|p| p.name().to_string()))
            .field("time_limit", &self.time_limit)
            .field("check_interval", &self.check_interval)
            .finish()
    }
}

/// Validated collaborators taken out of an [`ImportConfig`]
pub(crate) struct Wiring {
    pub resource: Resource,
    pub storage: Arc<dyn DatabaseTable>,
    pub parser: Arc<dyn RowParser>,
}

impl ImportConfig {
    /// Create new config with builder pattern
    pub fn builder() -> ImportConfigBuilder {
        ImportConfigBuilder::default()
    }

    /// Check that every collaborator is present
    pub fn validate(&self) -> Result<()> {
        self.wiring().map(|_| ())
    }

    pub(crate) fn wiring(&self) -> Result<Wiring> {
        let resource = self
            .resource
            .clone()
            .ok_or_else(|| ImportError::contract("config resource is required"))?;
        let storage = self
            .storage
            .clone()
            .ok_or_else(|| ImportError::contract("Storage must be an instance of DatabaseTable"))?;
        let parser = self
            .parser
            .clone()
            .ok_or_else(|| ImportError::contract("Parser must be an instance of RowParser"))?;

        Ok(Wiring {
            resource,
            storage,
            parser,
        })
    }
}

/// Builder for ImportConfig
#[derive(Default)]
pub struct ImportConfigBuilder {
    resource: Option<Resource>,
    storage: Option<Arc<dyn DatabaseTable>>,
    parser: Option<Arc<dyn RowParser>>,
    time_limit: Option<u64>,
    check_interval: Option<u64>,
}

impl ImportConfigBuilder {
    pub fn resource(mut self, resource: Resource) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn DatabaseTable>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn parser(mut self, parser: Arc<dyn RowParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn time_limit(mut self, seconds: u64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    pub fn check_interval(mut self, rows: u64) -> Self {
        self.check_interval = Some(rows);
        self
    }

    pub fn build(self) -> ImportConfig {
        ImportConfig {
            resource: self.resource,
            storage: self.storage,
            parser: self.parser,
            time_limit: self.time_limit,
            check_interval: self.check_interval.unwrap_or(DEFAULT_CHECK_INTERVAL),
        }
    }
}
