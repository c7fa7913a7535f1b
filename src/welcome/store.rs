//! Transactional persistence for guild welcome configs
//!
//! Every mutation runs as acquire -> begin -> statements -> commit on a
//! pooled connection. An early return drops the open transaction, which
//! rolls it back.

use std::collections::BTreeSet;
use std::sync::Arc;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteConnection;
use sqlx::{Acquire, Sqlite, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};

use super::config::{GuildId, GuildWelcomeConfig, MessageType, WelcomeField, WelcomeUpdate};

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection unavailable: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("transaction failed: {0}")]
    Transaction(#[source] sqlx::Error),

    #[error("no welcome config for guild {0}")]
    NotFound(GuildId),

    #[error("invalid value: {0}")]
    Validation(String),
}

/// Welcome config storage with database backing
#[derive(Clone)]
pub struct WelcomeStore {
    pool: SqlitePool,
    /// Accepted background names; `None` accepts any name
    image_keys: Option<Arc<BTreeSet<String>>>,
}

impl WelcomeStore {
    /// Create a new store with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            image_keys: None,
        }
    }

    /// Restrict `image` writes to the given background names
    pub fn with_image_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.image_keys = Some(Arc::new(keys.into_iter().map(Into::into).collect()));
        self
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn acquire(&self) -> Result<PoolConnection<Sqlite>, StoreError> {
        self.pool.acquire().await.map_err(StoreError::Connection)
    }

    /// Insert the default record if the guild has none.
    ///
    /// Returns true when a record was created. Concurrent calls for the
    /// same guild create exactly one record.
    pub async fn ensure_default(&self, guild_id: &str) -> Result<bool, StoreError> {
        let defaults = GuildWelcomeConfig::default_for(guild_id);

        let mut conn = self.acquire().await?;
        let mut tx = conn.begin().await.map_err(StoreError::Transaction)?;
        let inserted = insert_record(&mut tx, &defaults, true)
            .await
            .map_err(StoreError::Transaction)?;
        tx.commit().await.map_err(StoreError::Transaction)?;

        if inserted {
            info!("Initialized welcome config for guild {}", guild_id);
        }
        Ok(inserted)
    }

    /// Get the guild's record, or `NotFound` if it has none
    pub async fn get(&self, guild_id: &str) -> Result<GuildWelcomeConfig, StoreError> {
        let mut conn = self.acquire().await?;
        let row: Option<WelcomeRow> = sqlx::query_as(
            r#"
            SELECT guild_id, channel_id, type AS message_type, message_text, image, image_text
            FROM guild_welcome WHERE guild_id = ?
            "#,
        )
        .bind(guild_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(StoreError::Transaction)?;

        match row {
            Some(r) => r.into_config(),
            None => Err(StoreError::NotFound(guild_id.to_string())),
        }
    }

    /// Change a single field
    pub async fn set_field(&self, guild_id: &str, field: WelcomeField) -> Result<(), StoreError> {
        self.update(guild_id, &WelcomeUpdate::from(field)).await
    }

    /// Apply every present field of `update` in one transaction.
    ///
    /// Fails with `NotFound` (and writes nothing) if the guild has no record.
    pub async fn update(&self, guild_id: &str, update: &WelcomeUpdate) -> Result<(), StoreError> {
        self.validate(update)?;

        let mut conn = self.acquire().await?;
        let mut tx = conn.begin().await.map_err(StoreError::Transaction)?;

        let result = sqlx::query(
            r#"
            UPDATE guild_welcome
            SET channel_id = COALESCE(?, channel_id),
                type = COALESCE(?, type),
                message_text = COALESCE(?, message_text),
                image = COALESCE(?, image),
                image_text = COALESCE(?, image_text)
            WHERE guild_id = ?
            "#,
        )
        .bind(update.channel_id.as_deref())
        .bind(update.message_type.map(|t| t.as_str()))
        .bind(update.message_template.as_deref())
        .bind(update.image_key.as_deref())
        .bind(update.image_text.as_deref())
        .bind(guild_id)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::Transaction)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(guild_id.to_string()));
        }

        tx.commit().await.map_err(StoreError::Transaction)?;

        debug!(
            "Updated welcome config for guild {}: {}",
            guild_id,
            update.field_names().join(", ")
        );
        Ok(())
    }

    /// Replace the guild's record with the defaults.
    ///
    /// Delete and re-insert share one transaction, so readers see either
    /// the old record or the default one.
    pub async fn reset(&self, guild_id: &str) -> Result<(), StoreError> {
        let defaults = GuildWelcomeConfig::default_for(guild_id);

        let mut conn = self.acquire().await?;
        let mut tx = conn.begin().await.map_err(StoreError::Transaction)?;

        sqlx::query("DELETE FROM guild_welcome WHERE guild_id = ?")
            .bind(guild_id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::Transaction)?;
        insert_record(&mut tx, &defaults, false)
            .await
            .map_err(StoreError::Transaction)?;

        tx.commit().await.map_err(StoreError::Transaction)?;

        info!("Reset welcome config for guild {}", guild_id);
        Ok(())
    }

    /// Delete the guild's record. Returns true if one existed.
    pub async fn remove(&self, guild_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.acquire().await?;
        let mut tx = conn.begin().await.map_err(StoreError::Transaction)?;

        let result = sqlx::query("DELETE FROM guild_welcome WHERE guild_id = ?")
            .bind(guild_id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::Transaction)?;

        tx.commit().await.map_err(StoreError::Transaction)?;

        let removed = result.rows_affected() > 0;
        if removed {
            info!("Removed welcome config for guild {}", guild_id);
        }
        Ok(removed)
    }

    fn validate(&self, update: &WelcomeUpdate) -> Result<(), StoreError> {
        if let (Some(keys), Some(image)) = (&self.image_keys, &update.image_key) {
            if !keys.contains(image) {
                return Err(StoreError::Validation(format!("unknown image '{}'", image)));
            }
        }
        Ok(())
    }
}

/// Insert a full record. With `if_absent`, an existing row wins.
async fn insert_record(
    conn: &mut SqliteConnection,
    config: &GuildWelcomeConfig,
    if_absent: bool,
) -> Result<bool, sqlx::Error> {
    let statement = if if_absent {
        r#"
        INSERT INTO guild_welcome (guild_id, channel_id, type, message_text, image, image_text)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (guild_id) DO NOTHING
        "#
    } else {
        r#"
        INSERT INTO guild_welcome (guild_id, channel_id, type, message_text, image, image_text)
        VALUES (?, ?, ?, ?, ?, ?)
        "#
    };

    let result = sqlx::query(statement)
        .bind(&config.guild_id)
        .bind(&config.channel_id)
        .bind(config.message_type.as_str())
        .bind(&config.message_template)
        .bind(&config.image_key)
        .bind(&config.image_text)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Row type for SQLite queries
#[derive(sqlx::FromRow)]
struct WelcomeRow {
    guild_id: String,
    channel_id: String,
    message_type: String,
    message_text: String,
    image: String,
    image_text: String,
}

impl WelcomeRow {
    fn into_config(self) -> Result<GuildWelcomeConfig, StoreError> {
        let message_type = self.message_type.parse::<MessageType>().map_err(|e: String| {
            StoreError::Validation(format!("guild {}: {}", self.guild_id, e))
        })?;
        Ok(GuildWelcomeConfig {
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            message_type,
            message_template: self.message_text,
            image_key: self.image,
            image_text: self.image_text,
        })
    }
}
