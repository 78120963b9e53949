//! Tenant-scoped record search.
//!
//! Visibility comes first, matching second: callers resolve which lists an
//! account may see via [`accessible_lists`], then run [`search_records`]
//! against exactly those list ids. Every given predicate (name match, tags,
//! field filters) must hold at once; an empty scope returns nothing rather
//! than falling back to an unscoped scan.

use anyhow::{bail, Result};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::config::Config;
use crate::db;
use crate::mapper::coerce_scalar;
use crate::models::{ListRef, SearchHit};

// bm25 column weights for the FTS table: a term in the record name counts
// five times a term in the body text.
const FTS_RANK: &str = "bm25(records_fts, 0.0, 5.0, 1.0)";

// ============ Query model ============

/// How the name query matches record names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Full, case-sensitive equality.
    Exact,
    /// Case-insensitive containment.
    #[default]
    Substring,
    /// Ranked full-text match over name and entry data.
    Fts,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Exact => "exact",
            SearchMode::Substring => "substring",
            SearchMode::Fts => "fts",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "exact" => Ok(SearchMode::Exact),
            "substring" => Ok(SearchMode::Substring),
            "fts" => Ok(SearchMode::Fts),
            other => bail!(
                "Unknown search mode: '{}'. Use exact, substring, or fts.",
                other
            ),
        }
    }
}

/// Comparison applied by a field filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
}

/// One predicate over a top-level `entry_data` field.
///
/// Matching is typed: each candidate value is compared against the stored
/// JSON value as-is, so the string `"12"` does not match the number `12`.
/// The filter holds when the field equals any one of its candidates;
/// separate filters still all have to hold.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub values: Vec<serde_json::Value>,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            values: vec![value],
        }
    }

    /// Equality against any one of `values`, for callers that cannot know
    /// the stored type up front.
    pub fn eq_any(field: impl Into<String>, values: Vec<serde_json::Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            values,
        }
    }
}

/// A composed search request. All present predicates are ANDed.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub name_query: Option<String>,
    pub tags: Vec<String>,
    pub field_filters: Vec<FieldFilter>,
    pub mode: SearchMode,
    pub limit: i64,
}

impl SearchQuery {
    pub fn new(limit: i64) -> Self {
        Self {
            name_query: None,
            tags: Vec::new(),
            field_filters: Vec::new(),
            mode: SearchMode::default(),
            limit,
        }
    }
}

// ============ Access control ============

/// Resolve which of `names` are lists owned by `account_id`.
///
/// Unknown names and lists owned by other accounts are silently absent from
/// the result; ambiguity resolves to "not visible", never to an error. An
/// empty `names` short-circuits without touching storage.
pub async fn accessible_lists(
    pool: &SqlitePool,
    account_id: &str,
    names: &[String],
) -> Result<Vec<ListRef>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, name, entry_type, schema_path FROM lists WHERE account_id = ",
    );
    qb.push_bind(account_id);
    qb.push(" AND name IN (");
    let mut sep = qb.separated(", ");
    for name in names {
        sep.push_bind(name);
    }
    sep.push_unseparated(")");
    qb.push(" ORDER BY name ASC");

    let rows = qb.build().fetch_all(pool).await?;
    Ok(rows
        .iter()
        .map(|row| ListRef {
            id: row.get("id"),
            name: row.get("name"),
            entry_type: row.get("entry_type"),
            schema_path: row.get("schema_path"),
        })
        .collect())
}

// ============ Record search ============

/// Run a search over the given (already access-checked) list ids.
pub async fn search_records(
    pool: &SqlitePool,
    list_ids: &[String],
    query: &SearchQuery,
) -> Result<Vec<SearchHit>> {
    // The scope clause is mandatory: no visible lists means no results.
    if list_ids.is_empty() {
        return Ok(Vec::new());
    }

    let name_query = query
        .name_query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty());

    // FTS with nothing to match degrades to a plain scoped scan.
    let use_fts = query.mode == SearchMode::Fts && name_query.is_some();

    let mut qb: QueryBuilder<Sqlite> = if use_fts {
        let mut qb = QueryBuilder::new(format!(
            "SELECT r.id, r.list_id, r.name, r.tags, r.contact_info, r.entry_data, \
             -{FTS_RANK} AS score \
             FROM records_fts JOIN records r ON r.id = records_fts.record_id \
             WHERE records_fts MATCH "
        ));
        qb.push_bind(fts_match_expr(name_query.unwrap_or_default()));
        qb.push(" AND r.list_id IN (");
        let mut sep = qb.separated(", ");
        for id in list_ids {
            sep.push_bind(id);
        }
        sep.push_unseparated(")");
        qb
    } else {
        let mut qb = QueryBuilder::new(
            "SELECT r.id, r.list_id, r.name, r.tags, r.contact_info, r.entry_data \
             FROM records r WHERE r.list_id IN (",
        );
        let mut sep = qb.separated(", ");
        for id in list_ids {
            sep.push_bind(id);
        }
        sep.push_unseparated(")");
        qb
    };

    match query.mode {
        SearchMode::Exact => {
            if let Some(q) = name_query {
                qb.push(" AND r.name = ");
                qb.push_bind(q);
            }
        }
        SearchMode::Substring => {
            if let Some(q) = name_query {
                qb.push(" AND instr(lower(r.name), lower(");
                qb.push_bind(q);
                qb.push(")) > 0");
            }
        }
        SearchMode::Fts => {}
    }

    for tag in &query.tags {
        qb.push(" AND EXISTS (SELECT 1 FROM json_each(r.tags) WHERE json_each.value = ");
        qb.push_bind(tag);
        qb.push(")");
    }

    for filter in &query.field_filters {
        match filter.op {
            FilterOp::Eq => {
                qb.push(" AND EXISTS (SELECT 1 FROM json_each(r.entry_data) WHERE json_each.key = ");
                qb.push_bind(&filter.field);
                // SQLite accepts an empty IN list; a filter with no
                // candidates matches nothing.
                qb.push(" AND json_each.value IN (");
                for (i, value) in filter.values.iter().enumerate() {
                    if i > 0 {
                        qb.push(", ");
                    }
                    push_json_scalar(&mut qb, value);
                }
                qb.push("))");
            }
        }
    }

    if use_fts {
        qb.push(format!(" ORDER BY {FTS_RANK} ASC, r.name ASC, r.id ASC"));
    } else {
        // No relevance to rank by; name then id keeps runs deterministic.
        qb.push(" ORDER BY r.name ASC, r.id ASC");
    }
    // SQLite reads a negative LIMIT as unbounded; clamp so it stays a cap.
    qb.push(" LIMIT ");
    qb.push_bind(query.limit.max(0));

    let rows = qb.build().fetch_all(pool).await?;
    let hits = rows
        .iter()
        .map(|row| {
            let tags_json: String = row.get("tags");
            let contact_json: String = row.get("contact_info");
            let data_json: String = row.get("entry_data");
            SearchHit {
                id: row.get("id"),
                list_id: row.get("list_id"),
                name: row.get("name"),
                tags: serde_json::from_str(&tags_json).unwrap_or_default(),
                contact_info: serde_json::from_str(&contact_json)
                    .unwrap_or_else(|_| serde_json::json!({})),
                entry_data: serde_json::from_str(&data_json)
                    .unwrap_or_else(|_| serde_json::json!({})),
                score: if use_fts {
                    Some(row.get::<f64, _>("score"))
                } else {
                    None
                },
            }
        })
        .collect();
    Ok(hits)
}

/// Quote each whitespace-separated term so FTS5 treats the input as plain
/// tokens; bare `-`, `OR`, or an unbalanced `"` would otherwise be parsed
/// as query syntax.
fn fts_match_expr(input: &str) -> String {
    input
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Bind a JSON scalar with its native SQLite type so comparison against
/// `json_each.value` stays typed.
fn push_json_scalar<'args>(qb: &mut QueryBuilder<'args, Sqlite>, value: &'args serde_json::Value) {
    match value {
        serde_json::Value::Bool(b) => {
            qb.push_bind(*b);
        }
        serde_json::Value::Number(n) if n.is_i64() => {
            qb.push_bind(n.as_i64().unwrap_or_default());
        }
        serde_json::Value::Number(n) => {
            qb.push_bind(n.as_f64().unwrap_or_default());
        }
        serde_json::Value::String(s) => {
            qb.push_bind(s);
        }
        other => {
            qb.push_bind(other.to_string());
        }
    }
}

// ============ CLI entry point ============

pub struct SearchArgs {
    pub query: Option<String>,
    pub account: String,
    pub lists: Vec<String>,
    pub mode: String,
    pub tags: Vec<String>,
    pub filters: Vec<(String, String)>,
    pub limit: Option<i64>,
    pub json: bool,
}

/// Build a filter from an untyped CLI `key=value` pair. The text is bound
/// under every typed reading it admits, so `sku=00451` matches a stored
/// string "00451" as well as the number 451, and `available=true` matches
/// the boolean and the string form.
fn cli_field_filter(field: &str, raw: &str) -> FieldFilter {
    let coerced = coerce_scalar(raw);
    match coerced {
        serde_json::Value::String(_) => FieldFilter::eq(field, coerced),
        other => FieldFilter::eq_any(
            field,
            vec![other, serde_json::Value::String(raw.trim().to_string())],
        ),
    }
}

pub async fn run_search(config: &Config, args: &SearchArgs) -> Result<()> {
    let mode: SearchMode = args.mode.parse()?;

    let pool = db::connect(config).await?;
    let lists = accessible_lists(&pool, &args.account, &args.lists).await?;
    let list_ids: Vec<String> = lists.iter().map(|l| l.id.clone()).collect();

    let query = SearchQuery {
        name_query: args.query.clone(),
        tags: args.tags.clone(),
        field_filters: args
            .filters
            .iter()
            .map(|(field, value)| cli_field_filter(field, value))
            .collect(),
        mode,
        limit: args.limit.unwrap_or(config.search.default_limit),
    };

    let hits = search_records(&pool, &list_ids, &query).await?;
    pool.close().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let names_by_id: HashMap<&str, &str> = lists
        .iter()
        .map(|l| (l.id.as_str(), l.name.as_str()))
        .collect();

    for (i, hit) in hits.iter().enumerate() {
        match hit.score {
            Some(score) => println!("{}. [{:.2}] {}", i + 1, score, hit.name),
            None => println!("{}. {}", i + 1, hit.name),
        }
        if let Some(list_name) = names_by_id.get(hit.list_id.as_str()) {
            println!("    list: {}", list_name);
        }
        if !hit.tags.is_empty() {
            println!("    tags: {}", hit.tags.join(", "));
        }
        if let Some(data) = hit.entry_data.as_object() {
            if !data.is_empty() {
                let fields: Vec<String> = data
                    .iter()
                    .map(|(key, value)| match value {
                        serde_json::Value::String(s) => format!("{}={}", key, s),
                        other => format!("{}={}", key, other),
                    })
                    .collect();
                println!("    data: {}", fields.join("  "));
            }
        }
        println!("    id: {}", hit.id);
        println!();
    }

    Ok(())
}

// ============ Tests ============
