//! Guild welcome configuration - record types and transactional store

mod config;
mod store;

pub use config::{
    GuildId, GuildWelcomeConfig, MessageType, WelcomeField, WelcomeUpdate, DEFAULT_IMAGE,
    DEFAULT_IMAGE_TEXT, DEFAULT_MESSAGE_TEMPLATE,
};
pub use store::{StoreError, WelcomeStore};
