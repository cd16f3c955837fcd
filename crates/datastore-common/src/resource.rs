//! Resource descriptor for files handed to the importer

use crate::error::{DatastoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Describes a source file to import.
///
/// A resource is created by the caller and never mutated afterwards. The
/// `uri` is either a plain filesystem path or a `file://` URL.
///
/// # Examples
///
/// ```
/// use datastore_common::Resource;
///
/// let resource = Resource::from_path("1", "/data/countries.csv");
/// assert_eq!(resource.mime_type(), "text/csv");
/// assert_eq!(resource.id(), "1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Caller-assigned identifier
    id: String,

    /// Location of the file (path or `file://` URL)
    uri: String,

    /// Declared MIME type (e.g., "text/csv")
    mime_type: String,
}

impl Resource {
    pub fn new(id: impl Into<String>, uri: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Build a resource for a local path, inferring the MIME type from the extension
    pub fn from_path(id: impl Into<String>, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mime_type = mime_for_path(path);
        Self::new(id, path.to_string_lossy().into_owned(), mime_type.essence_str())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Parsed media type of the declared MIME string
    pub fn media_type(&self) -> Result<mime::Mime> {
        self.mime_type
            .parse::<mime::Mime>()
            .map_err(|e| DatastoreError::InvalidMime(format!("{}: {}", self.mime_type, e)))
    }

    /// Whether the declared type is tab-separated values
    pub fn is_tab_separated(&self) -> bool {
        self.media_type()
            .map(|m| m.essence_str() == mime::TEXT_TAB_SEPARATED_VALUES.essence_str())
            .unwrap_or(false)
    }

    /// Resolve the URI to a local filesystem path
    pub fn local_path(&self) -> Result<PathBuf> {
        match url::Url::parse(&self.uri) {
            Ok(url) if url.scheme() == "file" => {
                url.to_file_path().map_err(|_| DatastoreError::InvalidUri {
                    uri: self.uri.clone(),
                    reason: "file URL does not map to a local path".to_string(),
                })
            },
            // Single-letter schemes are Windows drive letters, not URLs
            Ok(url) if url.scheme().len() > 1 => {
                Err(DatastoreError::UnsupportedScheme(url.scheme().to_string()))
            },
            _ => {
                if self.uri.trim().is_empty() {
                    return Err(DatastoreError::InvalidUri {
                        uri: self.uri.clone(),
                        reason: "empty location".to_string(),
                    });
                }
                Ok(PathBuf::from(&self.uri))
            },
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.id, self.uri, self.mime_type)
    }
}

fn mime_for_path(path: &Path) -> mime::Mime {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => mime::TEXT_CSV,
        "tsv" | "tab" => mime::TEXT_TAB_SEPARATED_VALUES,
        _ => mime::TEXT_PLAIN,
    }
}
