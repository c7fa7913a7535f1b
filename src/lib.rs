//! welcomed - per-guild welcome messages
//!
//! Stores one welcome config per guild and renders join events into
//! text or image messages.

pub mod assets;
pub mod commands;
pub mod config;
pub mod db;
pub mod render;
pub mod timers;
pub mod welcome;

use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info};

use assets::AssetCache;
use commands::{CommandReply, WelcomeCommand};
use config::Settings;
use db::Database;
use render::{render_welcome, Delivery, JoinContext, RenderError};
use welcome::{StoreError, WelcomeStore};

/// Errors from event and command handling
#[derive(Debug, Error)]
pub enum WelcomeError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// The welcome service: config store plus the shared asset cache
pub struct Welcomer {
    store: WelcomeStore,
    assets: Arc<AssetCache>,
    settings: Settings,
}

impl Welcomer {
    /// Load assets and open the database described by `settings`
    pub async fn new(settings: Settings) -> Result<Self> {
        let assets_dir = settings.assets_dir.clone();
        let assets = tokio::task::spawn_blocking(move || AssetCache::load(assets_dir))
            .await?
            .with_context(|| format!("loading assets from {}", settings.assets_dir.display()))?;
        info!(
            "Asset cache ready: {} images, {} font faces",
            assets.image_count(),
            assets.font_count()
        );

        let db = Database::with_max_connections(settings.database.as_deref(), settings.max_connections)
            .await?;
        let store = WelcomeStore::new(db.pool().clone());

        Ok(Self::from_parts(store, Arc::new(assets), settings))
    }

    /// Assemble from an existing store and cache. `image` writes are
    /// limited to the backgrounds in the cache.
    pub fn from_parts(store: WelcomeStore, assets: Arc<AssetCache>, settings: Settings) -> Self {
        let store = store.with_image_keys(assets.image_names());
        Self {
            store,
            assets,
            settings,
        }
    }

    pub fn store(&self) -> &WelcomeStore {
        &self.store
    }

    pub fn assets(&self) -> &Arc<AssetCache> {
        &self.assets
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The bot can see the guild: make sure it has a config
    pub async fn on_guild_available(&self, guild_id: &str) -> Result<bool, StoreError> {
        self.store.ensure_default(guild_id).await
    }

    /// The bot left the guild: drop its config
    pub async fn on_guild_removed(&self, guild_id: &str) -> Result<bool, StoreError> {
        self.store.remove(guild_id).await
    }

    /// A member joined. Returns the message to post, or None when the
    /// guild has no welcome channel.
    pub async fn on_member_join(
        &self,
        guild_id: &str,
        ctx: &JoinContext,
    ) -> Result<Option<Delivery>, WelcomeError> {
        let config = self.store.get(guild_id).await?;
        if !config.is_configured() {
            debug!("Guild {} has no welcome channel", guild_id);
            return Ok(None);
        }

        let message = render_welcome(&config, ctx, &self.assets)?;
        Ok(Some(Delivery {
            channel_id: config.channel_id,
            message,
        }))
    }

    /// Run a `/welcome` command
    pub async fn handle_command(
        &self,
        guild_id: &str,
        command: WelcomeCommand,
    ) -> Result<CommandReply, WelcomeError> {
        commands::handle_command(self, guild_id, command).await
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;
    use crate::assets::test_utils::test_cache;
    use crate::db::test_utils::test_pool;

    /// Welcomer over an in-memory database and a small asset cache
    pub async fn test_welcomer() -> Welcomer {
        let store = WelcomeStore::new(test_pool().await);
        let assets = Arc::new(test_cache(&["original", "beach", "sky"]));
        Welcomer::from_parts(store, assets, Settings::default())
    }
}
