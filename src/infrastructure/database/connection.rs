//! Database connection pool manager.
//!
//! Manages a SQLite connection pool with WAL mode enabled for better
//! concurrency. Handles connection lifecycle, migrations, and
//! configuration.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Create a new connection pool with WAL journaling, NORMAL syncs,
    /// foreign keys on, and a 5 s busy timeout.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(max_connections)
            .idle_timeout(Duration::from_secs(30))
            .max_lifetime(Duration::from_secs(1800))
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .context("failed to create connection pool")?;

        Ok(Self { pool })
    }

    /// Apply all pending migrations. Safe to call repeatedly.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to run migrations")?;
        Ok(())
    }

    /// The pool reference repository implementations hold.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all connections. Call during shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connection_pool_creation() {
        let db = DatabaseConnection::new("sqlite::memory:", 5)
            .await
            .expect("failed to create database connection");

        assert!(!db.pool().is_closed());
        db.close().await;
    }

    #[tokio::test]
    async fn test_file_backed_database_uses_wal() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("hearth.db");
        let db = DatabaseConnection::new(&format!("sqlite:{}", path.display()), 5)
            .await
            .expect("failed to create database connection");
        db.migrate().await.expect("failed to run migrations");

        let mode: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(db.pool())
            .await
            .expect("failed to read journal mode");
        assert_eq!(mode.0.to_lowercase(), "wal");

        db.close().await;
    }

    #[tokio::test]
    async fn test_migration_runs_successfully() {
        let db = DatabaseConnection::new("sqlite::memory:", 5)
            .await
            .expect("failed to create database connection");

        db.migrate().await.expect("failed to run migrations");

        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='automations'",
        )
        .fetch_one(db.pool())
        .await
        .expect("failed to query table");

        assert_eq!(result.0, 1, "automations table should exist");
        db.close().await;
    }
}
