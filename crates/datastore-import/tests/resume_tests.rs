//! Multi-pass imports, snapshots and rehydration

mod common;

use std::sync::Arc;

use common::{field_names, fixture_resource, memory_config};
use datastore_import::storage::sqlite::table_name_for;
use datastore_import::{
    CsvParser, DatabaseTable, FileJobStore, ImportConfig, ImportError, ImportJob, ImportRegistry,
    JobSnapshot, JobStatus, JobStore, MemoryJobStore, Row, RowParser, SqliteTable,
};

fn single_pass_rows(name: &str) -> Vec<Row> {
    let (config, table) = memory_config(fixture_resource(name));
    let mut job = ImportJob::new("1", &config).unwrap();
    assert_eq!(job.run().status, JobStatus::Done);
    table.retrieve_all().unwrap()
}

// ============================================================================
// SERIALIZATION
// ============================================================================

#[test]
fn test_serialization_keeps_status_and_time_limit() {
    let time_limit = 40;
    let (config, table) = memory_config(fixture_resource("countries.csv"));
    let mut job = ImportJob::new("1", &config).unwrap();
    job.set_time_limit(time_limit);
    job.run();

    let json = job.serialize().unwrap();
    let parser: Arc<dyn RowParser> = Arc::new(CsvParser::new());
    let mut restored = ImportJob::hydrate(&json, table.clone(), parser).unwrap();

    assert_eq!(restored.result().status, JobStatus::Done);
    assert_eq!(restored.time_limit(), Some(time_limit));
    assert_eq!(restored.rows_committed(), 4);
    assert_eq!(restored.resource(), job.resource());

    assert_eq!(restored.run().status, JobStatus::Done);
    assert_eq!(table.count().unwrap(), 4);
}

#[test]
fn test_snapshot_of_failed_job_keeps_error() {
    let (config, table) = memory_config(fixture_resource("duplicate-headers.csv"));
    let mut job = ImportJob::new("1", &config).unwrap();
    job.run();

    let snapshot = JobSnapshot::from_json(&job.serialize().unwrap()).unwrap();
    assert_eq!(snapshot.status, JobStatus::Error);
    assert_eq!(
        snapshot.error.as_deref(),
        Some("Duplicate headers error: bar, baz")
    );

    let restored = ImportJob::hydrate(
        &snapshot.to_json().unwrap(),
        table,
        Arc::new(CsvParser::new()),
    )
    .unwrap();
    assert_eq!(restored.result(), job.result());
}

#[test]
fn test_hydrate_rejects_newer_snapshot() {
    let (config, table) = memory_config(fixture_resource("countries.csv"));
    let job = ImportJob::new("1", &config).unwrap();

    let mut snapshot = job.snapshot();
    snapshot.version = 99;
    let json = serde_json::to_string(&snapshot).unwrap();

    let err = ImportJob::hydrate(&json, table, Arc::new(CsvParser::new())).unwrap_err();
    assert!(matches!(err, ImportError::Snapshot(_)));
}

// ============================================================================
// MULTIPLE PASSES
// ============================================================================

#[test]
fn test_multiple_passes_match_single_pass() {
    let expected = single_pass_rows("bike_lanes.csv");
    assert_eq!(expected.len(), 500);

    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let (config, table) = memory_config(fixture_resource("bike_lanes.csv"));

    let mut passes = 0;
    loop {
        // Every pass rebuilds the job from the store, as a queue worker would
        let mut job = ImportJob::get("1", store.clone(), &config).unwrap();
        job.set_time_limit(0);
        job.set_check_interval(37);

        let result = job.run();
        passes += 1;
        assert_ne!(result.status, JobStatus::Error, "{:?}", result.error);
        if result.status == JobStatus::Done {
            break;
        }
        assert!(passes < 100, "import did not finish");
    }

    assert!(passes > 1);
    assert_eq!(table.retrieve_all().unwrap(), expected);
    assert_eq!(field_names(table.as_ref())[7], "shape_length");

    let rows = table.retrieve_all().unwrap();
    assert_eq!(rows[0][0], "1");
    assert_eq!(rows[499][0], "500");
}

#[test]
fn test_unbounded_run_finishes_in_one_pass() {
    let (config, table) = memory_config(fixture_resource("bike_lanes.csv"));
    let mut job = ImportJob::new("1", &config).unwrap();

    assert_eq!(job.time_limit(), None);
    assert_eq!(job.run().status, JobStatus::Done);
    assert_eq!(table.count().unwrap(), 500);
}

// ============================================================================
// REGISTRY
// ============================================================================

#[test]
fn test_registry_returns_one_job_per_identifier() {
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let mut registry = ImportRegistry::new(store);
    let (config, table) = memory_config(fixture_resource("countries.csv"));

    registry.get_instance("1", &config).unwrap().run();
    let (other_config, other_table) = memory_config(fixture_resource("longcolumn.csv"));
    let job = registry.get_instance("1", &other_config).unwrap();

    assert_eq!(job.result().status, JobStatus::Done);
    assert_eq!(job.run().status, JobStatus::Done);
    assert_eq!(table.count().unwrap(), 4);
    assert_eq!(other_table.count().unwrap(), 0);
}

#[test]
fn test_registry_requires_resource() {
    let mut registry = ImportRegistry::new(Arc::new(MemoryJobStore::new()));
    let err = registry
        .get_instance("1", &ImportConfig::default())
        .unwrap_err();

    assert!(matches!(err, ImportError::ContractViolation(_)));
    assert_eq!(err.to_string(), "config resource is required");
}

// ============================================================================
// DURABLE STORAGE
// ============================================================================

#[test]
fn test_sqlite_import_resumes_across_handles() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("datastore.sqlite");
    let store: Arc<dyn JobStore> = Arc::new(FileJobStore::new(dir.path().join("jobs")).unwrap());

    let mut passes = 0;
    loop {
        // Fresh connection and job on every pass
        let table = SqliteTable::open(&database, table_name_for("1")).unwrap();
        let config = ImportConfig::builder()
            .resource(fixture_resource("bike_lanes.csv"))
            .storage(Arc::new(table))
            .parser(Arc::new(CsvParser::new()))
            .time_limit(0)
            .check_interval(120)
            .build();

        let mut job = ImportJob::get("1", store.clone(), &config).unwrap();
        passes += 1;
        if job.run().status == JobStatus::Done {
            break;
        }
        assert!(passes < 20, "import did not finish");
    }

    assert_eq!(passes, 5);

    let table = SqliteTable::open(&database, table_name_for("1")).unwrap();
    assert_eq!(table.count().unwrap(), 500);
    assert_eq!(table.retrieve_all().unwrap(), single_pass_rows("bike_lanes.csv"));

    let saved = JobSnapshot::from_json(&store.retrieve("1").unwrap().unwrap()).unwrap();
    assert_eq!(saved.status, JobStatus::Done);
    assert_eq!(saved.cursor.unwrap().rows, 500);
}
