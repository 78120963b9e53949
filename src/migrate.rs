use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // Create accounts table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            display_name TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create lists table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lists (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL,
            name TEXT NOT NULL,
            entry_type TEXT NOT NULL,
            schema_path TEXT,
            generation INTEGER NOT NULL DEFAULT 0,
            imported_at INTEGER,
            created_at INTEGER NOT NULL,
            UNIQUE(account_id, name),
            FOREIGN KEY (account_id) REFERENCES accounts(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create records table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id TEXT PRIMARY KEY,
            list_id TEXT NOT NULL,
            name TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            contact_info TEXT NOT NULL DEFAULT '{}',
            entry_data TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL,
            FOREIGN KEY (list_id) REFERENCES lists(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create FTS5 virtual table over records
    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='records_fts'",
    )
    .fetch_one(&pool)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE records_fts USING fts5(
                record_id UNINDEXED,
                name,
                body,
                tokenize = 'porter unicode61'
            )
            "#,
        )
        .execute(&pool)
        .await?;
    }

    // The store owns index sync: triggers rebuild a record's FTS row on every
    // write, so readers can assume the index is always current. The body
    // column collects every string leaf of entry_data.
    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS records_fts_insert AFTER INSERT ON records BEGIN
            INSERT INTO records_fts (record_id, name, body)
            VALUES (
                new.id,
                new.name,
                (SELECT COALESCE(group_concat(value, ' '), '')
                 FROM json_tree(new.entry_data) WHERE type = 'text')
            );
        END
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS records_fts_delete AFTER DELETE ON records BEGIN
            DELETE FROM records_fts WHERE record_id = old.id;
        END
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS records_fts_update AFTER UPDATE OF name, entry_data ON records BEGIN
            DELETE FROM records_fts WHERE record_id = old.id;
            INSERT INTO records_fts (record_id, name, body)
            VALUES (
                new.id,
                new.name,
                (SELECT COALESCE(group_concat(value, ' '), '')
                 FROM json_tree(new.entry_data) WHERE type = 'text')
            );
        END
        "#,
    )
    .execute(&pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_list_id ON records(list_id)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_lists_account_id ON lists(account_id)")
        .execute(&pool)
        .await?;

    pool.close().await;
    Ok(())
}
