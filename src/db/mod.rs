//! Database module - SQLite pool and the guild_welcome schema

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

#[cfg(test)]
pub mod test_utils;

/// Default pool size when none is configured
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Database handle wrapping SQLite connection pool
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    /// If path is None, uses in-memory database (for testing)
    pub async fn new(path: Option<&str>) -> Result<Self> {
        Self::with_max_connections(path, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Create a new database connection with an explicit pool bound
    pub async fn with_max_connections(path: Option<&str>, max_connections: u32) -> Result<Self> {
        let conn_str = match path {
            Some(p) => format!("sqlite:{}?mode=rwc", p),
            None => "sqlite::memory:".to_string(),
        };

        let options = SqliteConnectOptions::from_str(&conn_str)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        // Every connection to :memory: is its own database, so an
        // in-memory pool holds exactly one connection that never expires
        let pool_options = match path {
            Some(_) => SqlitePoolOptions::new().max_connections(max_connections.max(1)),
            None => SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None),
        };
        let pool = pool_options.connect_with(options).await?;

        info!(
            "Opened database {} (max {} connections)",
            path.unwrap_or(":memory:"),
            max_connections
        );

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        // One row per guild; every column is always populated
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guild_welcome (
                guild_id TEXT PRIMARY KEY,
                channel_id TEXT NOT NULL,
                type TEXT NOT NULL,
                message_text TEXT NOT NULL,
                image TEXT NOT NULL,
                image_text TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations complete");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check if database is healthy
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_db_creation() {
        let db = Database::new(None).await.unwrap();
        db.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_migrations_run() {
        let db = Database::new(None).await.unwrap();

        let result: (i32,) = sqlx::query_as("SELECT COUNT(*) FROM guild_welcome")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(result.0, 0);
    }

    #[tokio::test]
    async fn test_migrations_are_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("welcome.db");
        let path = path.to_str().unwrap();

        let first = Database::new(Some(path)).await.unwrap();
        sqlx::query(
            "INSERT INTO guild_welcome VALUES ('g1', '', 'text', 'hi', 'original', '')",
        )
        .execute(first.pool())
        .await
        .unwrap();
        first.pool().close().await;

        // Reopening must keep existing rows
        let second = Database::new(Some(path)).await.unwrap();
        let result: (i32,) = sqlx::query_as("SELECT COUNT(*) FROM guild_welcome")
            .fetch_one(second.pool())
            .await
            .unwrap();
        assert_eq!(result.0, 1);
    }
}
