//! welcomed - welcome config administration

use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::oneshot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use welcomed::commands::WelcomeCommand;
use welcomed::config::Settings;
use welcomed::render::JoinContext;
use welcomed::timers::Expiry;
use welcomed::welcome::{MessageType, WelcomeField, WelcomeUpdate};
use welcomed::Welcomer;

/// Guild welcome message tool
#[derive(Parser, Debug)]
#[command(name = "welcomed", version, about = "Manage guild welcome messages")]
struct Args {
    /// Settings file (defaults to welcomed.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the default config for a guild if it has none
    Init { guild: String },

    /// Print a guild's config
    Show {
        guild: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change one or more fields in a single transaction
    Set {
        guild: String,
        #[arg(long)]
        channel: Option<String>,
        #[arg(long = "type", value_parser = MessageType::from_str)]
        message_type: Option<MessageType>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long = "image-text")]
        image_text: Option<String>,
    },

    /// Restore a guild's config to the defaults
    Reset {
        guild: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Delete a guild's config
    Remove { guild: String },

    /// Render a guild's welcome message for a sample member
    Simulate {
        guild: String,
        #[arg(long, default_value = "newcomer")]
        username: String,
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long, default_value = "0000")]
        discriminator: String,
        #[arg(long, default_value = "my guild")]
        guild_name: String,
        #[arg(long, default_value_t = 1)]
        member_count: u64,
        /// Where to write the image, if one is rendered
        #[arg(long, default_value = "welcome.png")]
        out: PathBuf,
    },

    /// List loaded backgrounds and font faces
    Assets,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "welcomed=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref()).context("loading settings")?;
    let welcomer = Welcomer::new(settings).await?;

    match args.command {
        Command::Init { guild } => {
            if welcomer.on_guild_available(&guild).await? {
                println!("created default config for {}", guild);
            } else {
                println!("{} already has a config", guild);
            }
        }
        Command::Show { guild, json } => {
            let config = welcomer.store().get(&guild).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("guild:      {}", config.guild_id);
                println!("channel:    {}", config.channel_id);
                println!("type:       {}", config.message_type);
                println!("text:       {}", config.message_template);
                println!("image:      {}", config.image_key);
                println!("image text: {}", config.image_text);
            }
        }
        Command::Set {
            guild,
            channel,
            message_type,
            text,
            image,
            image_text,
        } => {
            let fields = [
                channel.map(WelcomeField::Channel),
                message_type.map(WelcomeField::Type),
                text.map(WelcomeField::Text),
                image.map(WelcomeField::Image),
                image_text.map(WelcomeField::ImageText),
            ];
            let update = fields
                .into_iter()
                .flatten()
                .fold(WelcomeUpdate::new(), WelcomeUpdate::with);
            let reply = welcomer
                .handle_command(&guild, WelcomeCommand::Set(update))
                .await?;
            println!("{}", reply.content);
        }
        Command::Reset { guild, yes } => {
            let command = if yes {
                WelcomeCommand::ConfirmReset
            } else {
                WelcomeCommand::Reset
            };
            let reply = welcomer.handle_command(&guild, command).await?;
            println!("{}", reply.content);
            if reply.confirm.is_some() && confirm(reply.expires_after).await? {
                let reply = welcomer
                    .handle_command(&guild, WelcomeCommand::ConfirmReset)
                    .await?;
                println!("{}", reply.content);
            }
        }
        Command::Remove { guild } => {
            if welcomer.on_guild_removed(&guild).await? {
                println!("removed config for {}", guild);
            } else {
                println!("{} had no config", guild);
            }
        }
        Command::Simulate {
            guild,
            username,
            nickname,
            discriminator,
            guild_name,
            member_count,
            out,
        } => {
            let ctx = JoinContext {
                mention: format!("@{}", username),
                discriminated_name: format!("{}#{}", username, discriminator),
                nickname: nickname.unwrap_or_else(|| username.clone()),
                username,
                avatar_url: String::new(),
                guild_name,
                member_count,
            };
            let reply = welcomer
                .handle_command(&guild, WelcomeCommand::Simulate(ctx))
                .await?;
            println!("{}", reply.content);

            if let Some(delivery) = reply.delivery {
                println!("-> channel {}: {}", delivery.channel_id, delivery.message.content);
                if let Some(attachment) = delivery.message.attachment {
                    std::fs::write(&out, &attachment.data)
                        .with_context(|| format!("writing {}", out.display()))?;
                    println!("image written to {}", out.display());
                }
            }
        }
        Command::Assets => {
            let assets = welcomer.assets();
            println!("images: {}", assets.image_names().join(", "));
            println!("fonts:  {}", assets.font_names().join(", "));
        }
    }

    Ok(())
}

/// Wait for a `y` on stdin. The prompt lapses after `expires_after`.
async fn confirm(expires_after: Option<Duration>) -> Result<bool> {
    print!("[y/N] ");
    std::io::stdout().flush()?;

    let (expired_tx, expired_rx) = oneshot::channel();
    let expiry = expires_after.map(|after| {
        Expiry::schedule(after, move || async move {
            let _ = expired_tx.send(());
        })
    });

    // Plain thread: a pending read must not hold up runtime shutdown
    let (line_tx, line_rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = line_tx.send(std::io::stdin().read_line(&mut line).map(|_| line));
    });

    tokio::select! {
        Ok(read) = line_rx => {
            let line = read?;
            if let Some(expiry) = expiry {
                expiry.cancel();
            }
            Ok(line.trim().eq_ignore_ascii_case("y"))
        }
        Ok(()) = expired_rx => {
            println!();
            println!("confirmation expired");
            Ok(false)
        }
        else => Ok(false),
    }
}
