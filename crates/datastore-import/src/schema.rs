//! Table schema built from a resource's header row

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ImportError, Result};
use crate::header::{sanitize_description, sanitize_header};

/// One record: string values aligned positionally with a [`Schema`]
pub type Row = Vec<String>;

/// Storage type of a field. Every column is created as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
        }
    }
}

/// A single column of an import table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Sanitized storage identifier
    pub name: String,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// The raw header, with line breaks flattened
    #[serde(default)]
    pub description: String,
}

impl Field {
    pub fn text(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Text,
            description: description.into(),
        }
    }
}

/// Ordered list of fields; row values align with it positionally
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Build a schema from raw header cells.
///
/// Every header is sanitized; if two or more end up with the same
/// identifier the whole header row is rejected with
/// [`ImportError::DuplicateHeaders`], listing each colliding identifier once
/// in the order it first appears.
pub fn build_schema<S: AsRef<str>>(raw_headers: &[S]) -> Result<Schema> {
    let fields: Vec<Field> = raw_headers
        .iter()
        .map(|raw| {
            let raw = raw.as_ref();
            Field::text(sanitize_header(raw), sanitize_description(raw))
        })
        .collect();

    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for field in &fields {
        *occurrences.entry(field.name.as_str()).or_default() += 1;
    }

    let mut duplicates: Vec<String> = Vec::new();
    for field in &fields {
        let seen_twice = occurrences.get(field.name.as_str()).copied().unwrap_or(0) > 1;
        if seen_twice && !duplicates.contains(&field.name) {
            duplicates.push(field.name.clone());
        }
    }

    if !duplicates.is_empty() {
        return Err(ImportError::DuplicateHeaders(duplicates));
    }

    Ok(Schema::new(fields))
}
