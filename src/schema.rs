//! Declarative entry schemas.
//!
//! A schema is a JSON file describing one entry type: which `entry_data`
//! fields exist, their types, which are required, and optional validation
//! hints (a regex pattern or an enumerated domain). Schemas drive two things:
//! row validation during import, and the field documentation generated for
//! agents. Field mappers never consult them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::models::MappedEntry;

/// Scalar type of a schema field, as documented to agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
        }
    }
}

/// One field declaration inside a schema.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Optional regex the field's string form should match. Checked for
    /// syntax at load time so a broken pattern fails the import up front.
    #[serde(default)]
    pub validation: Option<String>,
    /// Optional closed domain, surfaced in tool docs as filter values.
    #[serde(default, rename = "enum")]
    pub enum_values: Option<Vec<String>>,
}

/// A parsed and load-checked entry schema.
#[derive(Debug, Clone, Deserialize)]
pub struct EntrySchema {
    pub entry_type: String,
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSpec>,
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema file not found: {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to read schema {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid schema {path:?}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// Loads schemas from a directory, by entry type or explicit path.
///
/// A missing file is reported as [`SchemaError::NotFound`] and a malformed
/// one as `Parse`/`Invalid`; callers decide whether that aborts an import or
/// just disables validation. No schema is ever invented on the fly.
pub struct SchemaRegistry {
    dir: PathBuf,
}

impl SchemaRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load the schema for `entry_type` from `<dir>/<entry_type>.json`.
    pub fn load(&self, entry_type: &str) -> Result<EntrySchema, SchemaError> {
        self.load_path(&self.dir.join(format!("{entry_type}.json")))
    }

    /// Load a schema from an explicit path.
    pub fn load_path(&self, path: &Path) -> Result<EntrySchema, SchemaError> {
        if !path.exists() {
            return Err(SchemaError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let schema: EntrySchema =
            serde_json::from_str(&content).map_err(|source| SchemaError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        check_schema(&schema, path)?;
        Ok(schema)
    }
}

fn check_schema(schema: &EntrySchema, path: &Path) -> Result<(), SchemaError> {
    let invalid = |reason: String| SchemaError::Invalid {
        path: path.to_path_buf(),
        reason,
    };

    if schema.entry_type.trim().is_empty() {
        return Err(invalid("entry_type must not be empty".to_string()));
    }
    for required in &schema.required_fields {
        if !schema.fields.contains_key(required) {
            return Err(invalid(format!(
                "required field '{}' is not declared in fields",
                required
            )));
        }
    }
    for (name, spec) in &schema.fields {
        if let Some(pattern) = &spec.validation {
            if let Err(e) = Regex::new(pattern) {
                return Err(invalid(format!(
                    "field '{}' has an unparseable validation pattern: {}",
                    name, e
                )));
            }
        }
    }
    Ok(())
}

/// Check one mapped entry against a schema. Returns whether the row should
/// be kept; a failing row is logged and dropped, never an error.
///
/// Two checks gate a row: the record name must be non-blank, and every
/// required field must be present and non-blank in `entry_data`.
pub fn validate_record(entry: &MappedEntry, schema: &EntrySchema, row: u64) -> bool {
    if entry.name.trim().is_empty() {
        tracing::warn!(row, "skipping row: blank record name");
        return false;
    }
    for field in &schema.required_fields {
        let present = entry
            .entry_data
            .get(field)
            .map(|v| !is_blank(v))
            .unwrap_or(false);
        if !present {
            tracing::warn!(
                row,
                field = field.as_str(),
                entry_type = schema.entry_type.as_str(),
                "skipping row: required field missing or blank"
            );
            return false;
        }
    }
    true
}

fn is_blank(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
