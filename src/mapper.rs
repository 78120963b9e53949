//! Field mappers: per-entry-type transforms from raw CSV rows to the
//! normalized record shape.
//!
//! A mapper is a pure function over one [`RawRow`]. It decides which columns
//! feed the record name, tags, `contact_info`, and `entry_data`, and it
//! recognizes common header aliases so real-world exports map without manual
//! renaming. Mappers never validate against a schema and never touch storage.
//!
//! Dispatch is by entry type through [`MapperRegistry`]; the set of builtin
//! mappers is closed, and an unknown entry type is rejected with the list of
//! supported ones.

use anyhow::Result;
use serde_json::Value;

use crate::mapper_product::ProductMapper;
use crate::mapper_provider::ProviderMapper;
use crate::mapper_service::ServiceMapper;
use crate::models::MappedEntry;

// ============================================================================
// Raw rows
// ============================================================================

/// One CSV data row paired with its (normalized) headers.
///
/// Headers are matched case-insensitively with underscores and hyphens
/// treated as spaces, so `Phone_Number`, `phone-number`, and `Phone Number`
/// all answer to `"phone number"`. Values are trimmed; a value that is empty
/// after trimming reads as absent.
#[derive(Debug, Clone)]
pub struct RawRow {
    values: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(headers: &csv::StringRecord, record: &csv::StringRecord) -> Self {
        let values = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (normalize_header(header), value.trim().to_string()))
            .collect();
        Self { values }
    }

    /// Build a row from literal header/value pairs. Handy for exercising
    /// custom mappers without a CSV file.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let values = pairs
            .iter()
            .map(|(header, value)| (normalize_header(header), value.trim().to_string()))
            .collect();
        Self { values }
    }

    /// Fetch a column by (alias-normalized) header name. Returns `None` for
    /// missing columns and for values that are blank after trimming.
    pub fn get(&self, name: &str) -> Option<&str> {
        let wanted = normalize_header(name);
        self.values
            .iter()
            .find(|(header, _)| *header == wanted)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// First present value among several header aliases.
    pub fn first_of(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.get(name))
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// The FieldMapper trait
// ============================================================================

/// A pure row transform for one entry type.
pub trait FieldMapper: Send + Sync {
    /// The entry type this mapper produces, e.g. `"provider"`.
    fn entry_type(&self) -> &str;

    /// Map one raw row into the normalized record shape.
    ///
    /// Absent optional columns must be omitted from the output, not written
    /// as empty values. A row the mapper cannot make sense of at all is an
    /// error; the import pipeline logs and skips it.
    fn map(&self, row: &RawRow) -> Result<MappedEntry>;
}

// ============================================================================
// Registry
// ============================================================================

/// Holds the known field mappers and dispatches by entry type.
pub struct MapperRegistry {
    mappers: Vec<Box<dyn FieldMapper>>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self {
            mappers: Vec::new(),
        }
    }

    /// Create a registry with the builtin mappers registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ProviderMapper));
        registry.register(Box::new(ProductMapper));
        registry.register(Box::new(ServiceMapper));
        registry
    }

    /// Register a mapper. A later registration with the same entry type
    /// replaces the earlier one.
    pub fn register(&mut self, mapper: Box<dyn FieldMapper>) {
        self.mappers
            .retain(|existing| existing.entry_type() != mapper.entry_type());
        self.mappers.push(mapper);
    }

    /// Find a mapper by entry type.
    pub fn find(&self, entry_type: &str) -> Option<&dyn FieldMapper> {
        self.mappers
            .iter()
            .find(|m| m.entry_type() == entry_type)
            .map(|m| m.as_ref())
    }

    /// Entry types with a registered mapper, in registration order.
    pub fn entry_types(&self) -> Vec<&str> {
        self.mappers.iter().map(|m| m.entry_type()).collect()
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }
}

impl Default for MapperRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Shared column helpers
// ============================================================================

/// Split a raw tag cell on `;`, `,`, or `|`, trimming and dropping
/// duplicates while keeping first-seen order. Tags stay case-sensitive.
pub fn split_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for part in raw.split([';', ',', '|']) {
        let tag = part.trim();
        if tag.is_empty() {
            continue;
        }
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Interpret a cell as a typed JSON scalar: booleans, then integers, then
/// floats, falling back to the trimmed string.
pub fn coerce_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn headers_normalize_aliases() {
        assert_eq!(normalize_header("Phone_Number"), "phone number");
        assert_eq!(normalize_header("phone-number"), "phone number");
        assert_eq!(normalize_header("  Phone   Number  "), "phone number");
        assert_eq!(normalize_header("E-Mail"), "e mail");
    }

    #[test]
    fn raw_row_get_and_aliases() {
        let row = RawRow::from_pairs(&[("Full_Name", "Dr. Chen"), ("Phone-Number", "555-0100")]);
        assert_eq!(row.get("full name"), Some("Dr. Chen"));
        assert_eq!(row.get("phone number"), Some("555-0100"));
        assert_eq!(row.get("email"), None);
        assert_eq!(
            row.first_of(&["telephone", "phone number"]),
            Some("555-0100")
        );
    }

    #[test]
    fn blank_values_read_as_absent() {
        let row = RawRow::from_pairs(&[("Name", "   "), ("City", "Lagos")]);
        assert_eq!(row.get("name"), None);
        assert_eq!(row.get("city"), Some("Lagos"));
    }

    #[test]
    fn short_rows_lose_trailing_columns_only() {
        let headers = csv::StringRecord::from(vec!["name", "phone", "email"]);
        let record = csv::StringRecord::from(vec!["Dr. Chen", "555-0100"]);
        let row = RawRow::new(&headers, &record);
        assert_eq!(row.get("name"), Some("Dr. Chen"));
        assert_eq!(row.get("phone"), Some("555-0100"));
        assert_eq!(row.get("email"), None);
    }

    #[test]
    fn builtins_cover_the_three_entry_types() {
        let registry = MapperRegistry::with_builtins();
        assert_eq!(registry.len(), 3);
        assert!(registry.find("provider").is_some());
        assert!(registry.find("product").is_some());
        assert!(registry.find("service").is_some());
        assert!(registry.find("starship").is_none());
    }

    #[test]
    fn register_replaces_same_entry_type() {
        struct Stub;
        impl FieldMapper for Stub {
            fn entry_type(&self) -> &str {
                "provider"
            }
            fn map(&self, _row: &RawRow) -> Result<MappedEntry> {
                Ok(MappedEntry::default())
            }
        }
        let mut registry = MapperRegistry::with_builtins();
        registry.register(Box::new(Stub));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn split_tags_handles_mixed_delimiters() {
        assert_eq!(
            split_tags("board-certified; pediatric,VIP | pediatric"),
            vec!["board-certified", "pediatric", "VIP"]
        );
        assert!(split_tags("  ;; , ").is_empty());
    }

    #[test]
    fn split_tags_is_case_sensitive() {
        assert_eq!(split_tags("VIP;vip"), vec!["VIP", "vip"]);
    }

    #[test]
    fn coerce_scalar_types() {
        assert_eq!(coerce_scalar("true"), json!(true));
        assert_eq!(coerce_scalar("FALSE"), json!(false));
        assert_eq!(coerce_scalar("12"), json!(12));
        assert_eq!(coerce_scalar("19.99"), json!(19.99));
        assert_eq!(coerce_scalar(" Cardiology "), json!("Cardiology"));
        assert_eq!(coerce_scalar("12 years"), json!("12 years"));
    }
}
