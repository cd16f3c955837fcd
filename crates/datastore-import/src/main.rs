//! Datastore Import - load delimited files into SQLite in resumable slices

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use datastore_common::logging::{init_logging, LogConfig, LogLevel};
use datastore_common::Resource;
use datastore_import::storage::sqlite::table_name_for;
use datastore_import::{
    sanitize_header, CsvParser, DatabaseTable, DatastoreSettings, FileJobStore, ImportConfig,
    ImportJob, ImportRegistry, JobSnapshot, JobStatus, JobStore, SqliteTable,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "datastore-import")]
#[command(author, version, about = "Resumable CSV import into a local datastore")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a file, one time-limited pass at a time
    Import {
        /// Job / resource identifier
        #[arg(long)]
        id: String,

        /// File to import
        #[arg(long)]
        file: PathBuf,

        /// MIME type (inferred from the extension when omitted)
        #[arg(long)]
        mime: Option<String>,

        /// Seconds per pass
        #[arg(long)]
        time_limit: Option<u64>,

        /// Keep running passes until the job is DONE or ERROR
        #[arg(long)]
        until_done: bool,

        /// SQLite database path
        #[arg(long)]
        database: Option<PathBuf>,

        /// Directory holding job snapshots
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },

    /// Show the saved state of a job
    Status {
        #[arg(long)]
        id: String,

        #[arg(long)]
        state_dir: Option<PathBuf>,
    },

    /// Drop the imported table and reset the job
    Drop {
        #[arg(long)]
        id: String,

        #[arg(long)]
        database: Option<PathBuf>,

        #[arg(long)]
        state_dir: Option<PathBuf>,
    },

    /// Print the column identifier each header would get
    Sanitize {
        #[arg(required = true)]
        headers: Vec<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("datastore-import")
        .build()
        .merge_env()?;
    let _guard = init_logging(&log_config)?;

    let settings = DatastoreSettings::from_env()?;

    match cli.command {
        Command::Import {
            id,
            file,
            mime,
            time_limit,
            until_done,
            database,
            state_dir,
        } => {
            let resource = match mime {
                Some(mime) => Resource::new(id.clone(), file.to_string_lossy(), mime),
                None => Resource::from_path(id.clone(), &file),
            };
            let database = database.unwrap_or_else(|| settings.database.clone());
            let state_dir = state_dir.unwrap_or_else(|| settings.state_dir.clone());
            import(
                &id,
                resource,
                time_limit.or(settings.time_limit),
                until_done,
                &database,
                &state_dir,
                &settings,
            )
        },
        Command::Status { id, state_dir } => {
            let store = FileJobStore::new(state_dir.unwrap_or(settings.state_dir))?;
            status(&id, &store)
        },
        Command::Drop {
            id,
            database,
            state_dir,
        } => {
            let store = FileJobStore::new(state_dir.unwrap_or(settings.state_dir))?;
            drop_job(&id, &database.unwrap_or(settings.database), &store)
        },
        Command::Sanitize { headers } => {
            for header in headers {
                println!("{}", sanitize_header(&header));
            }
            Ok(())
        },
    }
}

fn import(
    id: &str,
    resource: Resource,
    time_limit: Option<u64>,
    until_done: bool,
    database: &Path,
    state_dir: &Path,
    settings: &DatastoreSettings,
) -> Result<()> {
    let table = SqliteTable::open(database, table_name_for(id))
        .with_context(|| format!("Failed to open database {}", database.display()))?;
    let store: Arc<dyn JobStore> = Arc::new(FileJobStore::new(state_dir)?);

    let mut builder = ImportConfig::builder()
        .resource(resource)
        .storage(Arc::new(table))
        .parser(Arc::new(CsvParser::new()))
        .check_interval(settings.check_interval);
    if let Some(seconds) = time_limit {
        builder = builder.time_limit(seconds);
    }
    let config = builder.build();

    let mut registry = ImportRegistry::new(store);
    let job = registry.get_instance(id, &config)?;
    settings.apply_to(job);
    if let Some(seconds) = time_limit {
        job.set_time_limit(seconds);
    }

    let mut passes = 0;
    let result = loop {
        passes += 1;
        let result = job.run();
        if !until_done || result.status != JobStatus::InProgress {
            break result;
        }
    };

    info!(
        id = %id,
        passes,
        rows = job.rows_committed(),
        status = %result.status,
        "Import pass finished"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);

    match result.status {
        JobStatus::Error => bail!(
            "Import failed: {}",
            result.error.unwrap_or_else(|| "unknown error".to_string())
        ),
        JobStatus::Done if settings.delete_local_resource => {
            let path = job.resource().local_path()?;
            match std::fs::remove_file(&path) {
                Ok(()) => info!(path = %path.display(), "Deleted local resource"),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete local resource"),
            }
            Ok(())
        },
        _ => Ok(()),
    }
}

fn status(id: &str, store: &FileJobStore) -> Result<()> {
    match store.retrieve(id)? {
        Some(json) => {
            let snapshot = JobSnapshot::from_json(&json)?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        },
        None => println!("No saved job for '{}'", id),
    }
    Ok(())
}

fn drop_job(id: &str, database: &Path, store: &FileJobStore) -> Result<()> {
    let table = Arc::new(SqliteTable::open(database, table_name_for(id))?);

    match store.retrieve(id)? {
        Some(json) => {
            let mut job = ImportJob::hydrate(&json, table, Arc::new(CsvParser::new()))?;
            job.drop_job()?;
            store.store(id, &job.serialize()?)?;
        },
        None => table.drop_table()?,
    }

    info!(id = %id, "Dropped import");
    println!("Dropped '{}'", id);
    Ok(())
}
