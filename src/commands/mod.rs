//! `/welcome` command handling
//!
//! Transport-agnostic: the caller parses the interaction into a
//! [`WelcomeCommand`], checks permissions, and sends the returned
//! [`CommandReply`].

use std::time::Duration;

use tracing::debug;

use crate::render::{render_welcome, Delivery, JoinContext};
use crate::welcome::WelcomeUpdate;
use crate::{WelcomeError, Welcomer};

/// Component id of the reset confirmation button
pub const RESET_CONFIRM_ID: &str = "reset_welcome";

/// A `/welcome` subcommand, or the reset confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WelcomeCommand {
    /// Change any subset of the config fields at once
    Set(WelcomeUpdate),
    /// Render the welcome message as if the invoking member just joined
    Simulate(JoinContext),
    /// Ask for confirmation before resetting
    Reset,
    /// The confirmation button was pressed
    ConfirmReset,
}

/// What to send back to the invoker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub content: String,
    /// Component id of a confirmation button to attach
    pub confirm: Option<&'static str>,
    /// Delete the reply after this long
    pub expires_after: Option<Duration>,
    /// A welcome message to post in the guild's channel
    pub delivery: Option<Delivery>,
}

impl CommandReply {
    fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            confirm: None,
            expires_after: None,
            delivery: None,
        }
    }
}

/// Run a command for `guild_id`
pub async fn handle_command(
    welcomer: &Welcomer,
    guild_id: &str,
    command: WelcomeCommand,
) -> Result<CommandReply, WelcomeError> {
    debug!("Handling {:?} for guild {}", command, guild_id);

    match command {
        WelcomeCommand::Set(update) => {
            if update.is_empty() {
                return Ok(CommandReply::text("nothing to set"));
            }
            welcomer.store().update(guild_id, &update).await?;
            Ok(CommandReply::text(format!(
                "attempted to set: {}",
                update.field_names().join(", ")
            )))
        }
        WelcomeCommand::Simulate(ctx) => {
            let config = welcomer.store().get(guild_id).await?;
            if !config.is_configured() {
                return Ok(CommandReply::text(
                    "use `/welcome set channel` to set the welcome channel!",
                ));
            }
            let message = render_welcome(&config, &ctx, welcomer.assets())?;
            let mut reply = CommandReply::text("attempted to simulate welcome!");
            reply.delivery = Some(Delivery {
                channel_id: config.channel_id,
                message,
            });
            Ok(reply)
        }
        WelcomeCommand::Reset => {
            let mut reply = CommandReply::text(
                "are you sure you want to reset your server's welcome config?",
            );
            reply.confirm = Some(RESET_CONFIRM_ID);
            reply.expires_after = Some(welcomer.settings().reset_prompt());
            Ok(reply)
        }
        WelcomeCommand::ConfirmReset => {
            welcomer.store().reset(guild_id).await?;
            Ok(CommandReply::text("guild welcome config reset!"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_welcomer;
    use crate::welcome::{GuildWelcomeConfig, MessageType, StoreError, WelcomeField};

    fn ctx() -> JoinContext {
        JoinContext {
            mention: "<@1>".into(),
            username: "alice".into(),
            discriminated_name: "alice#0007".into(),
            nickname: "al".into(),
            guild_name: "Rustaceans".into(),
            member_count: 3,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_set_reports_fields() {
        let welcomer = test_welcomer().await;
        welcomer.on_guild_available("g1").await.unwrap();

        let update = WelcomeUpdate::new()
            .with(WelcomeField::Channel("10".into()))
            .with(WelcomeField::Type(MessageType::Image));
        let reply = handle_command(&welcomer, "g1", WelcomeCommand::Set(update))
            .await
            .unwrap();
        assert_eq!(reply.content, "attempted to set: channel, type");

        let config = welcomer.store().get("g1").await.unwrap();
        assert_eq!(config.channel_id, "10");
        assert_eq!(config.message_type, MessageType::Image);
    }

    #[tokio::test]
    async fn test_set_nothing() {
        let welcomer = test_welcomer().await;
        let reply = handle_command(&welcomer, "g1", WelcomeCommand::Set(WelcomeUpdate::new()))
            .await
            .unwrap();
        assert_eq!(reply.content, "nothing to set");
    }

    #[tokio::test]
    async fn test_set_unknown_guild_is_error() {
        let welcomer = test_welcomer().await;
        let update = WelcomeUpdate::from(WelcomeField::Text("hi".into()));
        let err = handle_command(&welcomer, "nope", WelcomeCommand::Set(update))
            .await
            .unwrap_err();
        assert!(matches!(err, WelcomeError::Store(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_simulate_without_channel() {
        let welcomer = test_welcomer().await;
        welcomer.on_guild_available("g1").await.unwrap();

        let reply = handle_command(&welcomer, "g1", WelcomeCommand::Simulate(ctx()))
            .await
            .unwrap();
        assert!(reply.content.contains("/welcome set channel"));
        assert!(reply.delivery.is_none());
    }

    #[tokio::test]
    async fn test_simulate_delivers_to_channel() {
        let welcomer = test_welcomer().await;
        welcomer.on_guild_available("g1").await.unwrap();
        welcomer
            .store()
            .set_field("g1", WelcomeField::Channel("99".into()))
            .await
            .unwrap();

        let reply = handle_command(&welcomer, "g1", WelcomeCommand::Simulate(ctx()))
            .await
            .unwrap();
        let delivery = reply.delivery.expect("delivery");
        assert_eq!(delivery.channel_id, "99");
        assert_eq!(delivery.message.content, "hey <@1>! welcome to Rustaceans!");
    }

    #[tokio::test]
    async fn test_reset_asks_then_resets() {
        let welcomer = test_welcomer().await;
        welcomer.on_guild_available("g1").await.unwrap();
        welcomer
            .store()
            .set_field("g1", WelcomeField::Channel("99".into()))
            .await
            .unwrap();

        let prompt = handle_command(&welcomer, "g1", WelcomeCommand::Reset)
            .await
            .unwrap();
        assert_eq!(prompt.confirm, Some(RESET_CONFIRM_ID));
        assert_eq!(prompt.expires_after, Some(welcomer.settings().reset_prompt()));
        // Nothing changes until confirmed
        assert_eq!(welcomer.store().get("g1").await.unwrap().channel_id, "99");

        let done = handle_command(&welcomer, "g1", WelcomeCommand::ConfirmReset)
            .await
            .unwrap();
        assert_eq!(done.content, "guild welcome config reset!");
        assert_eq!(
            welcomer.store().get("g1").await.unwrap(),
            GuildWelcomeConfig::default_for("g1")
        );
    }
}
