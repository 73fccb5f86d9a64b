//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for series and quotes.

mod store;

pub use store::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS series (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            slug TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quotes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            series_id INTEGER NOT NULL,
            speaker TEXT NOT NULL CHECK (length(trim(speaker)) > 0),
            quote_text TEXT NOT NULL CHECK (length(trim(quote_text)) > 0),
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (series_id) REFERENCES series(id) ON DELETE CASCADE
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_quotes_series_id ON quotes(series_id);")
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_schema() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("nested/dir/q.db"))
            .await
            .unwrap();

        let rows = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('series', 'quotes') ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<String> = rows.iter().map(|r| r.get("name")).collect();
        assert_eq!(names, vec!["quotes", "series"]);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("q.db");

        let pool = init_database(&path).await.unwrap();
        sqlx::query("INSERT INTO series (slug, name) VALUES ('ab', 'Ab')")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let pool = init_database(&path).await.unwrap();
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM series")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_quotes_require_existing_series() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("q.db")).await.unwrap();

        let result =
            sqlx::query("INSERT INTO quotes (series_id, speaker, quote_text) VALUES (99, 'a', 'b')")
                .execute(&pool)
                .await;
        assert!(result.is_err());
    }
}
