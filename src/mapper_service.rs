//! Builtin mapper for bookable offerings (entry type `service`).

use anyhow::Result;
use serde_json::Value;

use crate::mapper::{coerce_scalar, split_tags, FieldMapper, RawRow};
use crate::models::MappedEntry;

pub struct ServiceMapper;

impl FieldMapper for ServiceMapper {
    fn entry_type(&self) -> &str {
        "service"
    }

    fn map(&self, row: &RawRow) -> Result<MappedEntry> {
        let mut entry = MappedEntry::default();

        entry.name = row
            .first_of(&["name", "service name", "service"])
            .unwrap_or_default()
            .to_string();
        if let Some(raw) = row.first_of(&["tags", "labels"]) {
            entry.tags = split_tags(raw);
        }

        if let Some(value) = row.first_of(&["booking phone", "phone", "phone number"]) {
            entry
                .contact_info
                .insert("phone".to_string(), Value::String(value.to_string()));
        }
        if let Some(value) = row.first_of(&["booking email", "email", "e mail"]) {
            entry
                .contact_info
                .insert("email".to_string(), Value::String(value.to_string()));
        }
        if let Some(value) = row.first_of(&["booking url", "booking link"]) {
            entry
                .contact_info
                .insert("booking_url".to_string(), Value::String(value.to_string()));
        }

        if let Some(value) = row.first_of(&["category", "service category"]) {
            entry
                .entry_data
                .insert("category".to_string(), Value::String(value.to_string()));
        }
        if let Some(value) = row.first_of(&["duration minutes", "duration"]) {
            entry
                .entry_data
                .insert("duration_minutes".to_string(), coerce_scalar(value));
        }
        if let Some(value) = row.first_of(&["price", "cost", "rate"]) {
            entry
                .entry_data
                .insert("price".to_string(), coerce_scalar(value));
        }
        if let Some(value) = row.first_of(&["available", "bookable"]) {
            entry
                .entry_data
                .insert("available".to_string(), coerce_scalar(value));
        }
        if let Some(value) = row.first_of(&["description", "summary", "details"]) {
            entry
                .entry_data
                .insert("description".to_string(), Value::String(value.to_string()));
        }

        Ok(entry)
    }
}
