//! Generated tool documentation for agents.
//!
//! Every agent gets a description of the search surface scoped to what its
//! account can actually see: the lists it may query, the tag vocabulary in
//! use, and the filterable fields from each list's schema. Nothing here is
//! hand-authored; the docs are derived from storage and schema files on
//! demand, so they go stale only if nobody asks again after an import.

use anyhow::{bail, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::config::Config;
use crate::db;
use crate::models::ListRef;
use crate::schema::{EntrySchema, FieldType, SchemaError, SchemaRegistry};
use crate::search::accessible_lists;

/// One documented filterable field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

/// Documentation for one accessible list.
#[derive(Debug, Clone, Serialize)]
pub struct ListToolDoc {
    pub list: String,
    pub entry_type: String,
    pub records: i64,
    pub tags: Vec<String>,
    pub fields: Vec<FieldDoc>,
    pub examples: Vec<String>,
}

/// The full document handed to one agent.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDocs {
    pub header: String,
    pub sections: Vec<ListToolDoc>,
}

impl ToolDocs {
    /// Render as plain text for prompt embedding.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.header);
        out.push('\n');
        for section in &self.sections {
            out.push('\n');
            out.push_str(&format!(
                "## {} ({}) - {} records\n",
                section.list, section.entry_type, section.records
            ));
            if !section.tags.is_empty() {
                out.push_str(&format!("  tags in use: {}\n", section.tags.join(", ")));
            }
            if !section.fields.is_empty() {
                out.push_str("  filterable fields:\n");
                for field in &section.fields {
                    let mut line = format!("    - {} ({}", field.name, field.field_type.as_str());
                    if field.required {
                        line.push_str(", required");
                    }
                    line.push(')');
                    if !field.enum_values.is_empty() {
                        line.push_str(&format!("; one of: {}", field.enum_values.join(", ")));
                    }
                    out.push_str(&line);
                    out.push('\n');
                }
            }
            if !section.examples.is_empty() {
                out.push_str("  examples:\n");
                for example in &section.examples {
                    out.push_str(&format!("    {example}\n"));
                }
            }
        }
        out
    }
}

/// Build the tool docs for one configured agent.
pub async fn generate_tool_docs(
    pool: &SqlitePool,
    schemas: &SchemaRegistry,
    config: &Config,
    agent_name: &str,
) -> Result<ToolDocs> {
    let agent = match config.agents.get(agent_name) {
        Some(agent) => agent,
        None => bail!("unknown agent: '{}'", agent_name),
    };

    let lists = accessible_lists(pool, &agent.account, &agent.lists).await?;

    let mut sections = Vec::new();
    for list in &lists {
        let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE list_id = ?")
            .bind(&list.id)
            .fetch_one(pool)
            .await?;
        let tags = list_tags(pool, &list.id).await?;
        let schema = resolve_schema(schemas, list)?;

        let fields: Vec<FieldDoc> = schema
            .as_ref()
            .map(|schema| {
                schema
                    .fields
                    .iter()
                    .map(|(name, spec)| FieldDoc {
                        name: name.clone(),
                        field_type: spec.field_type,
                        required: schema.required_fields.contains(name),
                        enum_values: spec.enum_values.clone().unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let examples = example_invocations(list, &tags, &fields);
        sections.push(ListToolDoc {
            list: list.name.clone(),
            entry_type: list.entry_type.clone(),
            records,
            tags,
            fields,
            examples,
        });
    }

    let description = agent
        .description
        .as_deref()
        .map(|d| format!("\n{d}\n"))
        .unwrap_or_default();
    let header = format!(
        "Directory search tools for agent '{agent_name}' (account: {account})\n{description}\
         Call search(query?, lists?, tags?, filters?, mode?, limit?). All given\n\
         predicates must hold at once. Modes: exact, substring (default), fts.\n\
         Lists outside this agent's scope are ignored, not errors.",
        account = agent.account,
    );

    Ok(ToolDocs { header, sections })
}

/// Distinct tags across a list's records, sorted.
async fn list_tags(pool: &SqlitePool, list_id: &str) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        SELECT DISTINCT json_each.value AS tag
        FROM records r, json_each(r.tags)
        WHERE r.list_id = ?
        ORDER BY tag ASC
        "#,
    )
    .bind(list_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(|row| row.get("tag")).collect())
}

/// Load the schema behind a list: the recorded path when one was stored at
/// import time, otherwise the conventional file for its entry type. A list
/// imported without validation documents no fields; a schema that exists but
/// does not parse is a deployment problem and fails loudly.
fn resolve_schema(schemas: &SchemaRegistry, list: &ListRef) -> Result<Option<EntrySchema>> {
    match &list.schema_path {
        Some(path) => Ok(Some(schemas.load_path(Path::new(path))?)),
        None => match schemas.load(&list.entry_type) {
            Ok(schema) => Ok(Some(schema)),
            Err(SchemaError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        },
    }
}

fn example_invocations(list: &ListRef, tags: &[String], fields: &[FieldDoc]) -> Vec<String> {
    let mut examples = Vec::new();
    if let Some(field) = fields.iter().find(|f| !f.enum_values.is_empty()) {
        examples.push(format!(
            "search(lists=[\"{}\"], filters={{\"{}\": \"{}\"}})",
            list.name, field.name, field.enum_values[0]
        ));
    } else if let Some(field) = fields.first() {
        examples.push(format!(
            "search(lists=[\"{}\"], filters={{\"{}\": \"<value>\"}})",
            list.name, field.name
        ));
    }
    if let Some(tag) = tags.first() {
        examples.push(format!(
            "search(lists=[\"{}\"], tags=[\"{}\"])",
            list.name, tag
        ));
    }
    examples.push(format!(
        "search(query=\"<name>\", lists=[\"{}\"], mode=\"fts\")",
        list.name
    ));
    examples
}

pub async fn run_tool_docs(config: &Config, agent: &str, json: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let schemas = SchemaRegistry::new(&config.schemas.dir);
    let docs = generate_tool_docs(&pool, &schemas, config, agent).await?;
    pool.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&docs)?);
    } else {
        println!("{}", docs.render());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, required: bool, enums: &[&str]) -> FieldDoc {
        FieldDoc {
            name: name.to_string(),
            field_type: FieldType::String,
            required,
            enum_values: enums.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn render_includes_fields_and_examples() {
        let docs = ToolDocs {
            header: "Directory search tools for agent 'front-desk' (account: acme)".to_string(),
            sections: vec![ListToolDoc {
                list: "physicians".to_string(),
                entry_type: "provider".to_string(),
                records: 2,
                tags: vec!["board-certified".to_string()],
                fields: vec![field("specialty", true, &["Cardiology", "Dermatology"])],
                examples: vec![
                    "search(lists=[\"physicians\"], filters={\"specialty\": \"Cardiology\"})"
                        .to_string(),
                ],
            }],
        };
        let text = docs.render();
        assert!(text.contains("## physicians (provider) - 2 records"));
        assert!(text.contains("tags in use: board-certified"));
        assert!(text.contains("- specialty (string, required); one of: Cardiology, Dermatology"));
        assert!(text.contains("filters={\"specialty\": \"Cardiology\"}"));
    }

    #[test]
    fn examples_prefer_enum_fields() {
        let list = ListRef {
            id: "l1".to_string(),
            name: "physicians".to_string(),
            entry_type: "provider".to_string(),
            schema_path: None,
        };
        let fields = vec![
            field("bio", false, &[]),
            field("specialty", true, &["Cardiology"]),
        ];
        let examples = example_invocations(&list, &["pediatric".to_string()], &fields);
        assert!(examples[0].contains("\"specialty\": \"Cardiology\""));
        assert!(examples.iter().any(|e| e.contains("tags=[\"pediatric\"]")));
        assert!(examples.iter().any(|e| e.contains("mode=\"fts\"")));
    }

    #[test]
    fn render_skips_empty_sections_gracefully() {
        let docs = ToolDocs {
            header: "Directory search tools for agent 'bare' (account: acme)".to_string(),
            sections: vec![ListToolDoc {
                list: "vendors".to_string(),
                entry_type: "provider".to_string(),
                records: 0,
                tags: Vec::new(),
                fields: Vec::new(),
                examples: Vec::new(),
            }],
        };
        let text = docs.render();
        assert!(text.contains("## vendors (provider) - 0 records"));
        assert!(!text.contains("tags in use"));
        assert!(!text.contains("filterable fields"));
    }
}
