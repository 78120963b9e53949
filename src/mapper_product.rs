//! Builtin mapper for catalog exports (entry type `product`).

use anyhow::Result;
use serde_json::Value;

use crate::mapper::{coerce_scalar, split_tags, FieldMapper, RawRow};
use crate::models::MappedEntry;

pub struct ProductMapper;

impl FieldMapper for ProductMapper {
    fn entry_type(&self) -> &str {
        "product"
    }

    fn map(&self, row: &RawRow) -> Result<MappedEntry> {
        let mut entry = MappedEntry::default();

        entry.name = row
            .first_of(&["name", "product name", "title"])
            .unwrap_or_default()
            .to_string();
        if let Some(raw) = row.first_of(&["tags", "labels"]) {
            entry.tags = split_tags(raw);
        }

        if let Some(value) = row.first_of(&["support email", "vendor email"]) {
            entry
                .contact_info
                .insert("support_email".to_string(), Value::String(value.to_string()));
        }
        if let Some(value) = row.first_of(&["support phone", "vendor phone"]) {
            entry
                .contact_info
                .insert("support_phone".to_string(), Value::String(value.to_string()));
        }

        if let Some(value) = row.first_of(&["category", "product category"]) {
            entry
                .entry_data
                .insert("category".to_string(), Value::String(value.to_string()));
        }
        if let Some(value) = row.first_of(&["brand", "manufacturer", "vendor"]) {
            entry
                .entry_data
                .insert("brand".to_string(), Value::String(value.to_string()));
        }
        if let Some(value) = row.first_of(&["sku", "item number", "part number"]) {
            entry
                .entry_data
                .insert("sku".to_string(), Value::String(value.to_string()));
        }
        if let Some(value) = row.first_of(&["price", "unit price"]) {
            entry
                .entry_data
                .insert("price".to_string(), coerce_scalar(value));
        }
        if let Some(value) = row.first_of(&["in stock", "available", "availability"]) {
            entry
                .entry_data
                .insert("in_stock".to_string(), coerce_scalar(value));
        }
        if let Some(value) = row.first_of(&["description", "summary"]) {
            entry
                .entry_data
                .insert("description".to_string(), Value::String(value.to_string()));
        }

        Ok(entry)
    }
}
