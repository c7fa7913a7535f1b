//! Welcome record types and field updates

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque guild identifier (Discord snowflake as text)
pub type GuildId = String;

/// Background used when a record is created or reset
pub const DEFAULT_IMAGE: &str = "original";

/// Message text used when a record is created or reset
pub const DEFAULT_MESSAGE_TEMPLATE: &str = "hey %mention%! welcome to %guild%!";

/// Image overlay text used when a record is created or reset
pub const DEFAULT_IMAGE_TEXT: &str = "";

/// How the welcome message is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Plain text message
    #[default]
    Text,
    /// Composed image with a text caption
    Image,
}

impl MessageType {
    /// Column value stored in `guild_welcome.type`
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageType::Text),
            "image" => Ok(MessageType::Image),
            other => Err(format!("unknown message type '{}'", other)),
        }
    }
}

/// Welcome configuration for one guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildWelcomeConfig {
    pub guild_id: GuildId,
    /// Destination channel; empty means welcome messages are disabled
    pub channel_id: String,
    pub message_type: MessageType,
    /// Message text with `%guild%`, `%mention%`, `%username%`, `%nickname%` placeholders
    pub message_template: String,
    /// Logical name of the background image
    pub image_key: String,
    /// Text drawn on the image, same placeholders as the template
    pub image_text: String,
}

impl GuildWelcomeConfig {
    /// The record a guild starts with, and returns to on reset
    pub fn default_for(guild_id: &str) -> Self {
        Self {
            guild_id: guild_id.to_string(),
            channel_id: String::new(),
            message_type: MessageType::Text,
            message_template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
            image_key: DEFAULT_IMAGE.to_string(),
            image_text: DEFAULT_IMAGE_TEXT.to_string(),
        }
    }

    /// Whether a destination channel has been set
    pub fn is_configured(&self) -> bool {
        !self.channel_id.is_empty()
    }
}

/// A single settable field of the welcome record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WelcomeField {
    Channel(String),
    Type(MessageType),
    Text(String),
    Image(String),
    ImageText(String),
}

impl WelcomeField {
    /// User-facing option name
    pub fn name(&self) -> &'static str {
        match self {
            WelcomeField::Channel(_) => "channel",
            WelcomeField::Type(_) => "type",
            WelcomeField::Text(_) => "text",
            WelcomeField::Image(_) => "image",
            WelcomeField::ImageText(_) => "imagetext",
        }
    }
}

/// A set of field changes applied together in one transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WelcomeUpdate {
    pub channel_id: Option<String>,
    pub message_type: Option<MessageType>,
    pub message_template: Option<String>,
    pub image_key: Option<String>,
    pub image_text: Option<String>,
}

impl WelcomeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field change; a later change to the same field replaces the earlier one
    pub fn with(mut self, field: WelcomeField) -> Self {
        match field {
            WelcomeField::Channel(v) => self.channel_id = Some(v),
            WelcomeField::Type(v) => self.message_type = Some(v),
            WelcomeField::Text(v) => self.message_template = Some(v),
            WelcomeField::Image(v) => self.image_key = Some(v),
            WelcomeField::ImageText(v) => self.image_text = Some(v),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.field_names().is_empty()
    }

    /// Names of the fields this update touches, in option order
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.channel_id.is_some() {
            names.push("channel");
        }
        if self.message_type.is_some() {
            names.push("type");
        }
        if self.message_template.is_some() {
            names.push("text");
        }
        if self.image_key.is_some() {
            names.push("image");
        }
        if self.image_text.is_some() {
            names.push("imagetext");
        }
        names
    }

    /// Apply the changes to an in-memory record
    pub fn apply_to(&self, config: &mut GuildWelcomeConfig) {
        if let Some(v) = &self.channel_id {
            config.channel_id = v.clone();
        }
        if let Some(v) = self.message_type {
            config.message_type = v;
        }
        if let Some(v) = &self.message_template {
            config.message_template = v.clone();
        }
        if let Some(v) = &self.image_key {
            config.image_key = v.clone();
        }
        if let Some(v) = &self.image_text {
            config.image_text = v.clone();
        }
    }
}

impl From<WelcomeField> for WelcomeUpdate {
    fn from(field: WelcomeField) -> Self {
        WelcomeUpdate::new().with(field)
    }
}
