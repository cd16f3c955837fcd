//! In-memory table, used in tests and for embedding

use std::sync::RwLock;

use super::{DatabaseTable, StorageError};
use crate::schema::{Row, Schema};

#[derive(Debug, Default)]
struct TableState {
    schema: Option<Schema>,
    rows: Vec<Row>,
}

/// A table that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryTable {
    name: String,
    state: RwLock<TableState>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(TableState::default()),
        }
    }

    fn poisoned<T>(err: std::sync::PoisonError<T>) -> StorageError {
        StorageError::Poisoned(err.to_string())
    }
}

impl DatabaseTable for MemoryTable {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn create_schema(&self, schema: &Schema) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(Self::poisoned)?;
        match &state.schema {
            Some(existing) if existing == schema => Ok(()),
            Some(_) => Err(StorageError::SchemaMismatch {
                table: self.name.clone(),
            }),
            None => {
                state.schema = Some(schema.clone());
                Ok(())
            },
        }
    }

    fn schema(&self) -> Result<Option<Schema>, StorageError> {
        let state = self.state.read().map_err(Self::poisoned)?;
        Ok(state.schema.clone())
    }

    fn insert(&self, row: &Row) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(Self::poisoned)?;
        let expected = match &state.schema {
            Some(schema) => schema.len(),
            None => return Err(StorageError::NoSchema(self.name.clone())),
        };
        if row.len() != expected {
            return Err(StorageError::ColumnMismatch {
                table: self.name.clone(),
                expected,
                actual: row.len(),
            });
        }
        state.rows.push(row.clone());
        Ok(())
    }

    fn count(&self) -> Result<u64, StorageError> {
        let state = self.state.read().map_err(Self::poisoned)?;
        Ok(state.rows.len() as u64)
    }

    fn retrieve_all(&self) -> Result<Vec<Row>, StorageError> {
        let state = self.state.read().map_err(Self::poisoned)?;
        Ok(state.rows.clone())
    }

    fn drop_table(&self) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(Self::poisoned)?;
        state.schema = None;
        state.rows.clear();
        Ok(())
    }
}
