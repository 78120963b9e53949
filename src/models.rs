//! Core data models used throughout Rolodex.
//!
//! These types represent the entries, records, and search results that flow
//! through the import pipeline and the query engine.

use serde::Serialize;
use serde_json::Value;

/// Normalized output of a field mapper: one raw CSV row reshaped into the
/// record layout, before validation and before it is bound to a list.
///
/// `contact_info` and `entry_data` are open JSON objects. Mappers only set
/// keys they actually found a value for; absent optional columns stay absent
/// rather than showing up as empty strings.
#[derive(Debug, Clone, Default)]
pub struct MappedEntry {
    pub name: String,
    pub tags: Vec<String>,
    pub contact_info: serde_json::Map<String, Value>,
    pub entry_data: serde_json::Map<String, Value>,
}

/// A record ready to persist: validated, assigned an id, and bound to the
/// list it will be written into.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub id: String,
    pub list_id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub contact_info: Value,
    pub entry_data: Value,
}

/// A list as seen through access control: resolved to its id, carrying the
/// metadata search and doc generation need.
#[derive(Debug, Clone, Serialize)]
pub struct ListRef {
    pub id: String,
    pub name: String,
    pub entry_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<String>,
}

/// A search result returned from the query engine. `score` is only present
/// for ranked full-text results; higher means more relevant.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub list_id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub contact_info: Value,
    pub entry_data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}
