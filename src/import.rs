//! Import pipeline orchestration.
//!
//! Coordinates the full import flow: CSV → field mapper → schema validation →
//! reseed. Parsing tolerates bad rows (logged and skipped); persistence is
//! all-or-nothing per list, as one delete-and-replace write transaction.

use anyhow::{bail, Result};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::mapper::{FieldMapper, MapperRegistry, RawRow};
use crate::models::NewRecord;
use crate::schema::{validate_record, EntrySchema, SchemaRegistry};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("csv file not found: {path:?}")]
    CsvNotFound { path: PathBuf },

    #[error("failed to read csv {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Outcome of parsing one CSV file: the surviving records plus counters for
/// the import summary.
#[derive(Debug)]
pub struct ImportBatch {
    pub records: Vec<NewRecord>,
    pub rows_read: u64,
    pub skipped: u64,
}

/// Parse a CSV file into records bound to `list_id`.
///
/// Rows are streamed through `mapper`; when a schema is given, rows failing
/// validation are dropped and counted, when it is `None` every mapped row is
/// kept as-is. Only file-level problems (missing file, unreadable header)
/// are errors.
pub fn parse_csv(
    path: &Path,
    list_id: &str,
    mapper: &dyn FieldMapper,
    schema: Option<&EntrySchema>,
) -> Result<ImportBatch, ImportError> {
    parse_csv_with(path, list_id, mapper, schema, b',')
}

/// Same as [`parse_csv`] with an explicit field delimiter.
pub fn parse_csv_with(
    path: &Path,
    list_id: &str,
    mapper: &dyn FieldMapper,
    schema: Option<&EntrySchema>,
    delimiter: u8,
) -> Result<ImportBatch, ImportError> {
    if !path.exists() {
        return Err(ImportError::CsvNotFound {
            path: path.to_path_buf(),
        });
    }

    let csv_err = |source: csv::Error| ImportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();

    let mut records = Vec::new();
    let mut rows_read = 0u64;
    let mut skipped = 0u64;

    for (idx, result) in reader.records().enumerate() {
        // Header occupies line 1; data row 0 starts at line 2.
        let row_number = idx as u64 + 2;
        rows_read += 1;

        let raw = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(row = row_number, error = %e, "skipping unreadable csv row");
                skipped += 1;
                continue;
            }
        };

        let row = RawRow::new(&headers, &raw);
        let entry = match mapper.map(&row) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(row = row_number, error = %e, "skipping row: mapping failed");
                skipped += 1;
                continue;
            }
        };

        if let Some(schema) = schema {
            if !validate_record(&entry, schema, row_number) {
                skipped += 1;
                continue;
            }
        }

        records.push(NewRecord {
            id: Uuid::new_v4().to_string(),
            list_id: list_id.to_string(),
            name: entry.name,
            tags: entry.tags,
            contact_info: serde_json::Value::Object(entry.contact_info),
            entry_data: serde_json::Value::Object(entry.entry_data),
        });
    }

    Ok(ImportBatch {
        records,
        rows_read,
        skipped,
    })
}

/// Replace all records of a list with `records`, as one write transaction.
///
/// Takes the database write lock up front (`BEGIN IMMEDIATE`) and bumps the
/// list's generation counter, so two reseeds of the same list serialize
/// instead of interleaving deletes and inserts. The FTS index follows through
/// triggers; no index maintenance happens here.
pub async fn reseed_list(pool: &SqlitePool, list_id: &str, records: &[NewRecord]) -> Result<u64> {
    let mut conn = pool.acquire().await?;
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
    match reseed_in_tx(&mut conn, list_id, records).await {
        Ok(count) => {
            sqlx::query("COMMIT").execute(&mut *conn).await?;
            Ok(count)
        }
        Err(e) => {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            Err(e)
        }
    }
}

async fn reseed_in_tx(
    conn: &mut SqliteConnection,
    list_id: &str,
    records: &[NewRecord],
) -> Result<u64> {
    let now = chrono::Utc::now().timestamp();

    let updated = sqlx::query("UPDATE lists SET generation = generation + 1, imported_at = ? WHERE id = ?")
        .bind(now)
        .bind(list_id)
        .execute(&mut *conn)
        .await?;
    if updated.rows_affected() == 0 {
        bail!("list not found: {}", list_id);
    }

    sqlx::query("DELETE FROM records WHERE list_id = ?")
        .bind(list_id)
        .execute(&mut *conn)
        .await?;

    for record in records {
        sqlx::query(
            r#"
            INSERT INTO records (id, list_id, name, tags, contact_info, entry_data, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.list_id)
        .bind(&record.name)
        .bind(serde_json::to_string(&record.tags)?)
        .bind(record.contact_info.to_string())
        .bind(record.entry_data.to_string())
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }

    Ok(records.len() as u64)
}

/// Create the account row if it does not exist yet.
pub async fn ensure_account(pool: &SqlitePool, account_id: &str) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        r#"
        INSERT INTO accounts (id, display_name, created_at) VALUES (?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(account_id)
    .bind(account_id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Create or refresh the list row under its pre-assigned id.
///
/// `(account_id, name)` is the natural key; on conflict only the schema path
/// is refreshed, and only when a new one is given. The entry type of an
/// existing list never changes here; callers reject mismatches up front.
pub async fn upsert_list(
    pool: &SqlitePool,
    list_id: &str,
    account_id: &str,
    name: &str,
    entry_type: &str,
    schema_path: Option<&str>,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        r#"
        INSERT INTO lists (id, account_id, name, entry_type, schema_path, generation, imported_at, created_at)
        VALUES (?, ?, ?, ?, ?, 0, NULL, ?)
        ON CONFLICT(account_id, name) DO UPDATE SET
            schema_path = COALESCE(excluded.schema_path, schema_path)
        "#,
    )
    .bind(list_id)
    .bind(account_id)
    .bind(name)
    .bind(entry_type)
    .bind(schema_path)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub struct ImportArgs {
    pub csv_path: PathBuf,
    pub account: String,
    pub list: String,
    pub entry_type: String,
    pub schema: Option<PathBuf>,
    pub no_validate: bool,
    pub dry_run: bool,
    pub delimiter: Option<String>,
}

pub async fn run_import(config: &Config, args: &ImportArgs) -> Result<()> {
    let registry = MapperRegistry::with_builtins();
    let mapper = match registry.find(&args.entry_type) {
        Some(mapper) => mapper,
        None => bail!(
            "Unknown entry type: '{}'. Available: {}",
            args.entry_type,
            registry.entry_types().join(", ")
        ),
    };

    // Schema resolution is fail-fast: a missing or malformed schema aborts
    // the import unless validation was explicitly switched off.
    let schemas = SchemaRegistry::new(&config.schemas.dir);
    let (schema, schema_path) = if args.no_validate {
        (None, None)
    } else {
        let path = args
            .schema
            .clone()
            .unwrap_or_else(|| config.schemas.dir.join(format!("{}.json", args.entry_type)));
        let schema = schemas.load_path(&path)?;
        if schema.entry_type != args.entry_type {
            bail!(
                "schema {} declares entry type '{}', expected '{}'",
                path.display(),
                schema.entry_type,
                args.entry_type
            );
        }
        (Some(schema), Some(path.to_string_lossy().to_string()))
    };

    let delimiter = parse_delimiter(args.delimiter.as_deref())?;

    if args.dry_run {
        let batch = parse_csv_with(&args.csv_path, "dry-run", mapper, schema.as_ref(), delimiter)?;
        println!(
            "import {} into {}/{} (dry-run)",
            args.entry_type, args.account, args.list
        );
        println!("  rows read: {}", batch.rows_read);
        println!("  skipped: {}", batch.skipped);
        println!("  records parsed: {}", batch.records.len());
        return Ok(());
    }

    let pool = db::connect(config).await?;

    // Resolve or pre-assign the list id before parsing, so records come out
    // already bound but nothing is written until the whole file parsed.
    let existing = sqlx::query("SELECT id, entry_type FROM lists WHERE account_id = ? AND name = ?")
        .bind(&args.account)
        .bind(&args.list)
        .fetch_optional(&pool)
        .await?;
    let list_id = match &existing {
        Some(row) => {
            let existing_type: String = row.get("entry_type");
            if existing_type != args.entry_type {
                bail!(
                    "list '{}' already holds entry type '{}', refusing to reseed it as '{}'",
                    args.list,
                    existing_type,
                    args.entry_type
                );
            }
            row.get::<String, _>("id")
        }
        None => Uuid::new_v4().to_string(),
    };

    let batch = parse_csv_with(&args.csv_path, &list_id, mapper, schema.as_ref(), delimiter)?;

    ensure_account(&pool, &args.account).await?;
    upsert_list(
        &pool,
        &list_id,
        &args.account,
        &args.list,
        &args.entry_type,
        schema_path.as_deref(),
    )
    .await?;
    let imported = reseed_list(&pool, &list_id, &batch.records).await?;

    let generation: i64 = sqlx::query_scalar("SELECT generation FROM lists WHERE id = ?")
        .bind(&list_id)
        .fetch_one(&pool)
        .await?;

    println!("import {} into {}/{}", args.entry_type, args.account, args.list);
    println!("  rows read: {}", batch.rows_read);
    println!("  skipped: {}", batch.skipped);
    println!("  records imported: {}", imported);
    println!("  generation: {}", generation);
    println!("ok");

    pool.close().await;
    Ok(())
}

fn parse_delimiter(raw: Option<&str>) -> Result<u8> {
    match raw {
        None => Ok(b','),
        Some("tab") | Some("\\t") => Ok(b'\t'),
        Some(s) if s.len() == 1 => Ok(s.as_bytes()[0]),
        Some(other) => bail!("delimiter must be a single character or 'tab', got '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::MapperRegistry;
    use crate::schema::SchemaRegistry;
    use tempfile::TempDir;

    const PROVIDERS_CSV: &str = "\
Name,Speciality,Phone,Tags,Years of Experience
Dr. Alice Chen,Cardiology,555-0100,board-certified;cardiology,12
Dr. Omar Haddad,Dermatology,555-0101,board-certified,8
,Pediatrics,555-0102,,3
Dr. Dana Flores,,555-0103,pediatric,
";

    const PROVIDER_SCHEMA: &str = r#"{
        "entry_type": "provider",
        "required_fields": ["specialty"],
        "fields": {
            "specialty": {"type": "string"},
            "years_experience": {"type": "number"}
        }
    }"#;

    fn write_fixtures(dir: &TempDir) -> (PathBuf, PathBuf) {
        let csv_path = dir.path().join("providers.csv");
        std::fs::write(&csv_path, PROVIDERS_CSV).unwrap();
        let schema_path = dir.path().join("provider.json");
        std::fs::write(&schema_path, PROVIDER_SCHEMA).unwrap();
        (csv_path, schema_path)
    }

    #[test]
    fn validation_drops_bad_rows() {
        let dir = TempDir::new().unwrap();
        let (csv_path, schema_path) = write_fixtures(&dir);
        let registry = MapperRegistry::with_builtins();
        let mapper = registry.find("provider").unwrap();
        let schema = SchemaRegistry::new(dir.path()).load_path(&schema_path).unwrap();

        let batch = parse_csv(&csv_path, "list-1", mapper, Some(&schema)).unwrap();
        assert_eq!(batch.rows_read, 4);
        assert_eq!(batch.skipped, 2);
        assert_eq!(batch.records.len(), 2);
        let names: Vec<&str> = batch.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Dr. Alice Chen", "Dr. Omar Haddad"]);
    }

    #[test]
    fn no_schema_keeps_every_mapped_row() {
        let dir = TempDir::new().unwrap();
        let (csv_path, _) = write_fixtures(&dir);
        let registry = MapperRegistry::with_builtins();
        let mapper = registry.find("provider").unwrap();

        let batch = parse_csv(&csv_path, "list-1", mapper, None).unwrap();
        assert_eq!(batch.rows_read, 4);
        assert_eq!(batch.skipped, 0);
        assert_eq!(batch.records.len(), 4);
    }

    #[test]
    fn records_are_bound_to_the_list() {
        let dir = TempDir::new().unwrap();
        let (csv_path, _) = write_fixtures(&dir);
        let registry = MapperRegistry::with_builtins();
        let mapper = registry.find("provider").unwrap();

        let batch = parse_csv(&csv_path, "list-42", mapper, None).unwrap();
        assert!(batch.records.iter().all(|r| r.list_id == "list-42"));
        // Ids are assigned and unique.
        let mut ids: Vec<&str> = batch.records.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), batch.records.len());
    }

    #[test]
    fn missing_file_is_its_own_error() {
        let dir = TempDir::new().unwrap();
        let registry = MapperRegistry::with_builtins();
        let mapper = registry.find("provider").unwrap();
        let err = parse_csv(&dir.path().join("ghost.csv"), "list-1", mapper, None).unwrap_err();
        assert!(matches!(err, ImportError::CsvNotFound { .. }));
    }

    #[test]
    fn semicolon_delimiter() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("providers.csv");
        std::fs::write(&csv_path, "Name;Specialty\nDr. Chen;Cardiology\n").unwrap();
        let registry = MapperRegistry::with_builtins();
        let mapper = registry.find("provider").unwrap();

        let batch = parse_csv_with(&csv_path, "list-1", mapper, None, b';').unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].name, "Dr. Chen");
    }

    #[test]
    fn delimiter_flag_parsing() {
        assert_eq!(parse_delimiter(None).unwrap(), b',');
        assert_eq!(parse_delimiter(Some(";")).unwrap(), b';');
        assert_eq!(parse_delimiter(Some("tab")).unwrap(), b'\t');
        assert!(parse_delimiter(Some("ab")).is_err());
    }
}
