//! Account and list overview.
//!
//! Provides a quick summary of what's in the directory: which accounts own
//! which lists, record counts, and import recency. Used by `rdx lists` to
//! give confidence that imports landed where they should.

use anyhow::Result;
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::config::Config;
use crate::db;

/// Run the lists command: query the database and print an overview table.
pub async fn run_lists(config: &Config, account: Option<&str>) -> Result<()> {
    let pool = db::connect(config).await?;

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT
            l.account_id,
            l.name,
            l.entry_type,
            l.generation,
            l.imported_at,
            COUNT(r.id) AS record_count
        FROM lists l
        LEFT JOIN records r ON r.list_id = l.id
        "#,
    );
    if let Some(account) = account {
        qb.push(" WHERE l.account_id = ");
        qb.push_bind(account);
    }
    qb.push(" GROUP BY l.id ORDER BY l.account_id ASC, l.name ASC");

    let rows = qb.build().fetch_all(&pool).await?;

    if rows.is_empty() {
        println!("No lists.");
        pool.close().await;
        return Ok(());
    }

    println!(
        "{:<16} {:<20} {:<12} {:>8} {:>6}   {}",
        "ACCOUNT", "LIST", "ENTRY TYPE", "RECORDS", "GEN", "LAST IMPORT"
    );
    println!("{}", "-".repeat(82));

    for row in &rows {
        let imported_at: Option<i64> = row.get("imported_at");
        let import_display = match imported_at {
            Some(ts) => format_ts_relative(ts),
            None => "never".to_string(),
        };
        println!(
            "{:<16} {:<20} {:<12} {:>8} {:>6}   {}",
            row.get::<String, _>("account_id"),
            row.get::<String, _>("name"),
            row.get::<String, _>("entry_type"),
            row.get::<i64, _>("record_count"),
            row.get::<i64, _>("generation"),
            import_display
        );
    }

    pool.close().await;
    Ok(())
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
