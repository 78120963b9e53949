//! Builtin mapper for professional rosters (entry type `provider`).
//!
//! Tuned for exports of people directories: clinicians, consultants,
//! practitioners. Credentials, languages, and experience land in
//! `entry_data`; phone, email, address, and website go to `contact_info`.

use anyhow::Result;
use serde_json::Value;

use crate::mapper::{coerce_scalar, split_tags, FieldMapper, RawRow};
use crate::models::MappedEntry;

pub struct ProviderMapper;

impl FieldMapper for ProviderMapper {
    fn entry_type(&self) -> &str {
        "provider"
    }

    fn map(&self, row: &RawRow) -> Result<MappedEntry> {
        let mut entry = MappedEntry::default();

        entry.name = row
            .first_of(&["name", "full name", "provider name", "provider"])
            .unwrap_or_default()
            .to_string();
        if let Some(raw) = row.first_of(&["tags", "labels"]) {
            entry.tags = split_tags(raw);
        }

        let contact: [(&str, &[&str]); 4] = [
            ("phone", &["phone", "phone number", "telephone"]),
            ("email", &["email", "e mail", "email address"]),
            ("address", &["address", "office address", "location address"]),
            ("website", &["website", "url"]),
        ];
        for (field, aliases) in contact {
            if let Some(value) = row.first_of(aliases) {
                entry
                    .contact_info
                    .insert(field.to_string(), Value::String(value.to_string()));
            }
        }

        if let Some(value) = row.first_of(&["specialty", "speciality", "specialization"]) {
            entry
                .entry_data
                .insert("specialty".to_string(), Value::String(value.to_string()));
        }
        if let Some(value) = row.first_of(&["credentials", "qualifications", "titles"]) {
            entry
                .entry_data
                .insert("credentials".to_string(), Value::String(value.to_string()));
        }
        if let Some(value) = row.first_of(&["languages", "languages spoken"]) {
            let spoken: Vec<Value> = split_tags(value).into_iter().map(Value::String).collect();
            entry
                .entry_data
                .insert("languages".to_string(), Value::Array(spoken));
        }
        if let Some(value) = row.first_of(&["years experience", "years of experience", "experience"])
        {
            entry
                .entry_data
                .insert("years_experience".to_string(), coerce_scalar(value));
        }
        if let Some(value) = row.first_of(&["accepting new patients", "accepting patients"]) {
            entry
                .entry_data
                .insert("accepting_new_patients".to_string(), coerce_scalar(value));
        }
        if let Some(value) = row.first_of(&["clinic", "practice", "organization"]) {
            entry
                .entry_data
                .insert("clinic".to_string(), Value::String(value.to_string()));
        }
        if let Some(value) = row.first_of(&["bio", "about"]) {
            entry
                .entry_data
                .insert("bio".to_string(), Value::String(value.to_string()));
        }

        Ok(entry)
    }
}
