//! SQLite-backed import table
//!
//! Each resource gets its own table of text columns plus a hidden
//! `__record_number` key that preserves insertion order. Sanitized headers
//! never start with two underscores, so the key cannot collide with a field.
//! Field metadata (descriptions, types) is kept as JSON in the shared
//! `datastore_schemas` table.

use datastore_common::digest::short_digest;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

use super::{DatabaseTable, StorageError};
use crate::header::sanitize_header;
use crate::schema::{Row, Schema};

const RECORD_KEY: &str = "__record_number";

/// Table name used for a resource identifier (e.g., "1" -> "datastore_1").
///
/// Identifiers that do not survive sanitization unchanged get a digest
/// suffix, so "a b" and "a-b" land in different tables.
pub fn table_name_for(resource_id: &str) -> String {
    let sanitized = sanitize_header(resource_id);
    let name = sanitized.trim_start_matches('_');

    if name == resource_id {
        format!("datastore_{}", name)
    } else {
        format!("datastore_{}_{}", name, short_digest(resource_id, 8))
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// One import table inside a SQLite database
pub struct SqliteTable {
    name: String,
    db: Arc<Mutex<Connection>>,
    schema: RwLock<Option<Schema>>,
}

impl SqliteTable {
    /// Open (or create) the database at `db_path` and bind to `table`
    pub fn open(db_path: impl AsRef<Path>, table: impl Into<String>) -> Result<Self, StorageError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        Self::with_connection(Arc::new(Mutex::new(conn)), table)
    }

    /// Private in-memory database holding a single table
    pub fn open_in_memory(table: impl Into<String>) -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(Arc::new(Mutex::new(conn)), table)
    }

    /// Bind to `table` on an already shared connection
    pub fn with_connection(
        db: Arc<Mutex<Connection>>,
        table: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let name = table.into();
        let schema = {
            let conn = db.lock().map_err(|e| StorageError::Poisoned(e.to_string()))?;
            init_metadata(&conn)?;
            load_schema(&conn, &name)?
        };

        debug!(table = %name, has_schema = schema.is_some(), "Opened SQLite table");

        Ok(Self {
            name,
            db,
            schema: RwLock::new(schema),
        })
    }

    fn cached_schema(&self) -> Result<Option<Schema>, StorageError> {
        self.schema
            .read()
            .map(|s| s.clone())
            .map_err(|e| StorageError::Poisoned(e.to_string()))
    }

    fn set_cached_schema(&self, schema: Option<Schema>) -> Result<(), StorageError> {
        let mut cached = self
            .schema
            .write()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        *cached = schema;
        Ok(())
    }

    fn column_list(schema: &Schema) -> String {
        schema
            .fields()
            .iter()
            .map(|f| quote(&f.name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn init_metadata(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS datastore_schemas (
            table_name TEXT PRIMARY KEY,
            schema_json TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        [],
    )?;
    Ok(())
}

fn load_schema(conn: &Connection, table: &str) -> Result<Option<Schema>, StorageError> {
    let json: Option<String> = conn
        .query_row(
            "SELECT schema_json FROM datastore_schemas WHERE table_name = ?1",
            params![table],
            |row| row.get(0),
        )
        .optional()?;

    match json {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

impl DatabaseTable for SqliteTable {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn create_schema(&self, schema: &Schema) -> Result<(), StorageError> {
        match self.cached_schema()? {
            Some(existing) if &existing == schema => return Ok(()),
            Some(_) => {
                return Err(StorageError::SchemaMismatch {
                    table: self.name.clone(),
                })
            },
            None => {},
        }

        let columns = schema
            .fields()
            .iter()
            .map(|f| format!("{} {}", quote(&f.name), f.field_type.as_str().to_uppercase()))
            .collect::<Vec<_>>()
            .join(", ");
        let create = format!(
            "CREATE TABLE IF NOT EXISTS {} ({} INTEGER PRIMARY KEY AUTOINCREMENT, {})",
            quote(&self.name),
            RECORD_KEY,
            columns
        );
        let schema_json = serde_json::to_string(schema)?;

        {
            let mut conn = self
                .db
                .lock()
                .map_err(|e| StorageError::Poisoned(e.to_string()))?;
            let tx = conn.transaction()?;
            tx.execute(&create, [])?;
            tx.execute(
                "INSERT OR REPLACE INTO datastore_schemas (table_name, schema_json) VALUES (?1, ?2)",
                params![self.name, schema_json],
            )?;
            tx.commit()?;
        }

        self.set_cached_schema(Some(schema.clone()))?;
        info!(table = %self.name, fields = schema.len(), "Created SQLite table");
        Ok(())
    }

    fn schema(&self) -> Result<Option<Schema>, StorageError> {
        self.cached_schema()
    }

    fn insert(&self, row: &Row) -> Result<(), StorageError> {
        let schema = self
            .cached_schema()?
            .ok_or_else(|| StorageError::NoSchema(self.name.clone()))?;

        if row.len() != schema.len() {
            return Err(StorageError::ColumnMismatch {
                table: self.name.clone(),
                expected: schema.len(),
                actual: row.len(),
            });
        }

        let placeholders = (1..=row.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(&self.name),
            Self::column_list(&schema),
            placeholders
        );

        let conn = self
            .db
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        conn.prepare_cached(&sql)?
            .execute(params_from_iter(row.iter()))?;
        Ok(())
    }

    fn count(&self) -> Result<u64, StorageError> {
        if self.cached_schema()?.is_none() {
            return Ok(0);
        }

        let conn = self
            .db
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote(&self.name)),
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn retrieve_all(&self) -> Result<Vec<Row>, StorageError> {
        let Some(schema) = self.cached_schema()? else {
            return Ok(Vec::new());
        };

        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            Self::column_list(&schema),
            quote(&self.name),
            RECORD_KEY
        );

        let conn = self
            .db
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        let mut stmt = conn.prepare(&sql)?;
        let width = schema.len();
        let rows = stmt
            .query_map([], |record| {
                (0..width)
                    .map(|i| record.get::<_, Option<String>>(i).map(Option::unwrap_or_default))
                    .collect::<rusqlite::Result<Row>>()
            })?
            .collect::<rusqlite::Result<Vec<Row>>>()?;
        Ok(rows)
    }

    fn drop_table(&self) -> Result<(), StorageError> {
        {
            let mut conn = self
                .db
                .lock()
                .map_err(|e| StorageError::Poisoned(e.to_string()))?;
            let tx = conn.transaction()?;
            tx.execute(&format!("DROP TABLE IF EXISTS {}", quote(&self.name)), [])?;
            tx.execute(
                "DELETE FROM datastore_schemas WHERE table_name = ?1",
                params![self.name],
            )?;
            tx.commit()?;
        }

        self.set_cached_schema(None)?;
        info!(table = %self.name, "Dropped SQLite table");
        Ok(())
    }
}
