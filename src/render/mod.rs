//! Welcome message renderer
//!
//! Turns a guild's config and a join event into an outgoing message.
//! Rendering only reads the shared [`AssetCache`] and is safe to run
//! from many tasks at once.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assets::{AssetCache, FontFace};
use crate::welcome::{GuildWelcomeConfig, MessageType, DEFAULT_IMAGE};

/// File name of the composed image attachment
pub const ATTACHMENT_NAME: &str = "welcome.png";

/// Horizontal space kept clear on each side of the image text
const MARGIN: u32 = 40;

/// Gap between the primary and secondary lines
const LINE_GAP: i32 = 12;

const SHADOW_OFFSET: i32 = 2;
const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const SHADOW_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Render errors
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to encode welcome image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Live data about the joining member and the guild
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinContext {
    /// Ping string, e.g. `<@1234>`
    pub mention: String,
    pub username: String,
    /// Username with discriminator, e.g. `bob#0420`
    pub discriminated_name: String,
    pub nickname: String,
    pub avatar_url: String,
    pub guild_name: String,
    pub member_count: u64,
}

/// Image attached to an outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Outgoing welcome message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeMessage {
    pub content: String,
    pub attachment: Option<Attachment>,
}

/// A rendered message and the channel it goes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub channel_id: String,
    pub message: WelcomeMessage,
}

/// Replace `%guild%`, `%mention%`, `%username%` and `%nickname%` in one
/// left-to-right pass. Substituted values are not scanned again, and
/// anything else between percent signs is kept as written.
pub fn substitute(template: &str, ctx: &JoinContext) -> String {
    let tokens = [
        ("%guild%", ctx.guild_name.as_str()),
        ("%mention%", ctx.mention.as_str()),
        ("%username%", ctx.username.as_str()),
        ("%nickname%", ctx.nickname.as_str()),
    ];

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match tokens.iter().find(|(token, _)| tail.starts_with(token)) {
            Some((token, value)) => {
                out.push_str(value);
                rest = &tail[token.len()..];
            }
            None => {
                out.push('%');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Build the welcome message for `config`.
///
/// The caller should only render configs with a channel set. An
/// `image_key` missing from the cache falls back to [`DEFAULT_IMAGE`].
pub fn render_welcome(
    config: &GuildWelcomeConfig,
    ctx: &JoinContext,
    assets: &AssetCache,
) -> Result<WelcomeMessage, RenderError> {
    let content = substitute(&config.message_template, ctx);

    let attachment = match config.message_type {
        MessageType::Text => None,
        MessageType::Image => {
            let (_, background) = assets.resolve_image(&config.image_key, DEFAULT_IMAGE);
            let text = substitute(&config.image_text, ctx);
            let card = compose(background, &text, ctx, assets);
            Some(Attachment {
                filename: ATTACHMENT_NAME.to_string(),
                data: encode_png(&card)?,
            })
        }
    };

    Ok(WelcomeMessage {
        content,
        attachment,
    })
}

/// Draw the image text and the member line over a copy of the background
fn compose(background: &RgbaImage, text: &str, ctx: &JoinContext, assets: &AssetCache) -> RgbaImage {
    let mut canvas = background.clone();
    let (width, height) = canvas.dimensions();
    let (large, small) = assets.primary_faces();

    let primary = pick_face(large, small, text, width);
    let (_, primary_h) = text_size(primary.scale, &primary.font, text);

    let secondary = format!("{} - member #{}", ctx.discriminated_name, ctx.member_count);
    let (_, secondary_h) = text_size(small.scale, &small.font, &secondary);

    let block_h = primary_h as i32 + LINE_GAP + secondary_h as i32;
    let top = (height as i32 - block_h) / 2;

    draw_centered(&mut canvas, primary, top, text);
    draw_centered(&mut canvas, small, top + primary_h as i32 + LINE_GAP, &secondary);

    canvas
}

/// Large face when the text fits between the margins, small otherwise
fn pick_face<'a>(large: &'a FontFace, small: &'a FontFace, text: &str, width: u32) -> &'a FontFace {
    let (text_w, _) = text_size(large.scale, &large.font, text);
    if text_w <= width.saturating_sub(2 * MARGIN) {
        large
    } else {
        small
    }
}

fn draw_centered(canvas: &mut RgbaImage, face: &FontFace, y: i32, text: &str) {
    if text.is_empty() {
        return;
    }
    let (text_w, _) = text_size(face.scale, &face.font, text);
    let x = (canvas.width() as i32 - text_w as i32) / 2;

    draw_text_mut(
        canvas,
        SHADOW_COLOR,
        x + SHADOW_OFFSET,
        y + SHADOW_OFFSET,
        face.scale,
        &face.font,
        text,
    );
    draw_text_mut(canvas, TEXT_COLOR, x, y, face.scale, &face.font, text);
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
