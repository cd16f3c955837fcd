//! Shared helpers for datastore import integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;
use std::sync::Arc;

use datastore_common::Resource;
use datastore_import::{CsvParser, DatabaseTable, ImportConfig, MemoryTable};

pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Resource "1" pointing at a file under `tests/fixtures`
pub fn fixture_resource(name: &str) -> Resource {
    Resource::new("1", fixture_path().join(name).to_string_lossy(), "text/csv")
}

/// Config wiring `resource` to a fresh memory table and the CSV parser
pub fn memory_config(resource: Resource) -> (ImportConfig, Arc<MemoryTable>) {
    let table = Arc::new(MemoryTable::new("datastore_1"));
    let config = ImportConfig::builder()
        .resource(resource)
        .storage(table.clone())
        .parser(Arc::new(CsvParser::new()))
        .build();
    (config, table)
}

/// Field names of the table's schema, in order
pub fn field_names(table: &dyn DatabaseTable) -> Vec<String> {
    table
        .schema()
        .unwrap()
        .expect("table has no schema")
        .fields()
        .iter()
        .map(|f| f.name.clone())
        .collect()
}
