//! Database initialization and schema migrations for the event store.

use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use tracing::{debug, info};

/// Pragmas applied to every pooled connection.
const CONNECTION_PRAGMAS: &[&str] = &[
    "PRAGMA foreign_keys = ON",
    "PRAGMA busy_timeout = 5000",
    "PRAGMA synchronous = NORMAL",
];

/// Open (creating if needed) the SQLite event store, configure pragmas and migrate.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { configure_connection(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    run_migrations(&pool).await?;

    info!("Event store ready at {}", db_path);
    Ok(pool)
}

/// Apply `schema.sql`. Every statement is idempotent.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements: Vec<&str> = include_str!("schema.sql")
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    for statement in &statements {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Applied {} schema statement(s)", statements.len());
    Ok(())
}

async fn configure_connection(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    // journal_mode reports the mode actually in effect, so it is fetched rather than executed
    let row = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?;
    let journal_mode: String = row.get(0);

    for pragma in CONNECTION_PRAGMAS {
        sqlx::query(pragma).execute(&mut *conn).await?;
    }

    debug!("SQLite connection configured (journal_mode={})", journal_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn db_path(dir: &TempDir) -> String {
        dir.path().join("events.db").to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn test_init_db_creates_event_table() {
        let temp_dir = TempDir::new().unwrap();
        let path = db_path(&temp_dir);

        let pool = init_db(&path).await.expect("init_db failed");
        assert!(Path::new(&path).exists());

        let result: (String,) = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='engine_events'",
        )
        .fetch_one(&pool)
        .await
        .expect("query failed");
        assert_eq!(result.0, "engine_events");
    }

    #[tokio::test]
    async fn test_init_db_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir
            .path()
            .join("nested/dir/events.db")
            .to_string_lossy()
            .to_string();

        init_db(&path).await.expect("init_db failed");
        assert!(Path::new(&path).exists());
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&db_path(&temp_dir)).await.expect("init_db failed");

        run_migrations(&pool)
            .await
            .expect("second migration run failed");

        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name LIKE 'idx_engine_events_%'",
        )
        .fetch_one(&pool)
        .await
        .expect("query failed");
        assert_eq!(result.0, 2);
    }

    #[tokio::test]
    async fn test_pragmas_configured() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&db_path(&temp_dir)).await.expect("init_db failed");

        let result: (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .expect("query failed");
        assert_eq!(result.0, 1);

        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .expect("query failed");
        // WAL is best-effort; SQLite can fall back depending on the filesystem.
        assert!(
            matches!(result.0.as_str(), "wal" | "delete"),
            "unexpected journal_mode: {}",
            result.0
        );
    }
}
