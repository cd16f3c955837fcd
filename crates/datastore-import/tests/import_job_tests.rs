//! End-to-end tests for single-pass imports

mod common;

use std::io::Write;
use std::sync::Arc;

use common::{field_names, fixture_resource, memory_config};
use datastore_common::Resource;
use datastore_import::{
    CsvParser, DatabaseTable, ImportConfig, ImportError, ImportJob, JobStatus, MemoryJobStore,
    MemoryTable,
};

// ============================================================================
// BASIC IMPORTS
// ============================================================================

#[test]
fn test_basic_import() {
    let (config, table) = memory_config(fixture_resource("countries.csv"));
    let mut job = ImportJob::get("1", Arc::new(MemoryJobStore::new()), &config).unwrap();

    let result = job.run();

    assert_eq!(result.status, JobStatus::Done);
    assert!(result.error.is_none());
    assert_eq!(table.count().unwrap(), 4);
    assert_eq!(
        field_names(table.as_ref()),
        vec!["country", "population", "area", "capital"]
    );

    let rows = table.retrieve_all().unwrap();
    assert_eq!(rows[0], vec!["US", "321418820", "3796742", "Washington DC"]);
    assert_eq!(rows[3][0], "BR");
}

#[test]
fn test_rerun_of_done_job_is_a_no_op() {
    let (config, table) = memory_config(fixture_resource("countries.csv"));
    let mut job = ImportJob::new("1", &config).unwrap();

    assert_eq!(job.run().status, JobStatus::Done);
    assert_eq!(job.run().status, JobStatus::Done);
    assert_eq!(table.count().unwrap(), 4);
    assert_eq!(job.rows_committed(), 4);
}

#[test]
fn test_drop_resets_job() {
    let (config, table) = memory_config(fixture_resource("countries.csv"));
    let mut job = ImportJob::new("1", &config).unwrap();
    job.run();

    job.drop_job().unwrap();

    assert_eq!(job.result().status, JobStatus::Stopped);
    assert!(job.result().error.is_none());
    assert_eq!(job.rows_committed(), 0);
    assert_eq!(table.count().unwrap(), 0);
    assert!(table.schema().unwrap().is_none());

    // A dropped job imports again from scratch
    assert_eq!(job.run().status, JobStatus::Done);
    assert_eq!(table.count().unwrap(), 4);
}

// ============================================================================
// UNREADABLE RESOURCES
// ============================================================================

#[test]
fn test_file_does_not_exist() {
    let (config, table) = memory_config(fixture_resource("countries.csZv"));
    let mut job = ImportJob::new("1", &config).unwrap();

    let result = job.run();

    assert_eq!(result.status, JobStatus::Error);
    assert!(result.error.unwrap().contains("countries.csZv"));
    assert_eq!(table.count().unwrap(), 0);
    assert!(table.schema().unwrap().is_none());
}

#[test]
fn test_non_text_file() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(&[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00])
        .unwrap();
    file.flush().unwrap();

    let (config, table) = memory_config(Resource::new(
        "1",
        file.path().to_string_lossy(),
        "text/csv",
    ));
    let mut job = ImportJob::new("1", &config).unwrap();

    assert_eq!(job.run().status, JobStatus::Error);
    assert!(table.schema().unwrap().is_none());
}

#[test]
fn test_latin1_file_fails_before_schema_is_created() {
    let (config, table) = memory_config(fixture_resource("latin1.csv"));
    let mut job = ImportJob::new("1", &config).unwrap();

    let result = job.run();

    assert_eq!(result.status, JobStatus::Error);
    assert!(result.error.unwrap().starts_with("Unsupported content"));
    assert!(table.schema().unwrap().is_none());
    assert_eq!(table.count().unwrap(), 0);
}

#[test]
fn test_remote_resource_error_names_location() {
    let (config, table) = memory_config(Resource::new(
        "1",
        "http://example.com/data.csv",
        "text/csv",
    ));
    let mut job = ImportJob::new("1", &config).unwrap();

    let result = job.run();

    assert_eq!(result.status, JobStatus::Error);
    assert!(result.error.unwrap().contains("http://example.com/data.csv"));
    assert!(table.schema().unwrap().is_none());
}

#[test]
fn test_error_is_terminal_until_drop() {
    let (config, _table) = memory_config(fixture_resource("countries.csZv"));
    let mut job = ImportJob::new("1", &config).unwrap();

    let first = job.run();
    let second = job.run();
    assert_eq!(first, second);

    job.drop_job().unwrap();
    assert_eq!(job.result().status, JobStatus::Stopped);
}

// ============================================================================
// HEADER HANDLING
// ============================================================================

#[test]
fn test_duplicate_headers() {
    let (config, table) = memory_config(fixture_resource("duplicate-headers.csv"));
    let mut job = ImportJob::new("1", &config).unwrap();

    let result = job.run();

    assert_eq!(result.status, JobStatus::Error);
    assert_eq!(
        result.error.as_deref(),
        Some("Duplicate headers error: bar, baz")
    );
    assert!(table.schema().unwrap().is_none());
    assert_eq!(table.count().unwrap(), 0);
}

#[test]
fn test_long_column_name() {
    let (config, table) = memory_config(fixture_resource("longcolumn.csv"));
    let mut job = ImportJob::new("1", &config).unwrap();
    let truncated = "extra_long_column_name_with_tons_of_characters_that_will_ne_80ef";

    assert_eq!(job.run().status, JobStatus::Done);
    let fields = field_names(table.as_ref());

    assert_eq!(fields[2], truncated);
    assert_eq!(fields[2].len(), 64);
    assert_ne!(fields[3], truncated);
    assert_eq!(fields[3].len(), 64);
}

#[test]
fn test_column_name_spaces() {
    let (config, table) = memory_config(fixture_resource("columnspaces.csv"));
    let mut job = ImportJob::new("1", &config).unwrap();

    assert_eq!(job.run().status, JobStatus::Done);

    let schema = table.schema().unwrap().unwrap();
    assert_eq!(schema.fields()[2].name, "column_name_with_spaces_in_it");
    assert_eq!(schema.fields()[2].description, "Column Name With Spaces In It");
    assert_eq!(table.retrieve_all().unwrap()[0][2], "spaced, and quoted");
}

// ============================================================================
// CONTRACT VIOLATIONS
// ============================================================================

#[test]
fn test_missing_storage_fails_before_parsing() {
    let config = ImportConfig::builder()
        .resource(fixture_resource("countries.csZv"))
        .parser(Arc::new(CsvParser::new()))
        .build();

    let err = ImportJob::get("1", Arc::new(MemoryJobStore::new()), &config).unwrap_err();

    assert!(matches!(err, ImportError::ContractViolation(_)));
    assert_eq!(err.to_string(), "Storage must be an instance of DatabaseTable");
}

#[test]
fn test_missing_parser() {
    let config = ImportConfig::builder()
        .resource(fixture_resource("countries.csv"))
        .storage(Arc::new(MemoryTable::new("t")))
        .build();

    let err = ImportJob::new("1", &config).unwrap_err();
    assert_eq!(err.to_string(), "Parser must be an instance of RowParser");
}

#[test]
fn test_missing_resource() {
    let config = ImportConfig::builder()
        .storage(Arc::new(MemoryTable::new("t")))
        .parser(Arc::new(CsvParser::new()))
        .build();

    let err = ImportJob::new("1", &config).unwrap_err();
    assert_eq!(err.to_string(), "config resource is required");
}
