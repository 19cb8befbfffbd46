//! Channel posting
//!
//! The [`Poster`] trait is the seam between the batch assembler and
//! Telegram: cycles send photos and notifications through it, and tests
//! substitute an in-memory implementation. [`TelegramPoster`] is the real
//! one, posting photos straight from memory.

use crate::error::{Error, SendError};
use async_trait::async_trait;
use bytes::Bytes;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode, Recipient};
use teloxide::RequestError;
use tracing::debug;

/// Destination for batch photos and admin notifications
#[async_trait]
pub trait Poster: Send + Sync {
    /// Post a photo with an HTML caption to the channel
    async fn send_photo(&self, image: Bytes, caption: &str) -> Result<(), SendError>;

    /// Send a plain notification to the admin chat
    async fn notify_admin(&self, text: &str) -> Result<(), SendError>;
}

/// Telegram-backed poster
pub struct TelegramPoster {
    bot: Bot,
    channel: Recipient,
    admin_chat: ChatId,
}

impl TelegramPoster {
    /// Build a poster; `channel_id` accepts `@username` or a numeric chat id
    pub fn new(bot: Bot, channel_id: &str, admin_user_id: u64) -> Result<Self, Error> {
        Ok(Self {
            bot,
            channel: parse_recipient(channel_id)?,
            admin_chat: ChatId(admin_user_id as i64),
        })
    }
}

#[async_trait]
impl Poster for TelegramPoster {
    async fn send_photo(&self, image: Bytes, caption: &str) -> Result<(), SendError> {
        debug!(size = image.len(), "posting photo to channel");
        let photo = InputFile::memory(image).file_name("wallpaper.jpg");
        self.bot
            .send_photo(self.channel.clone(), photo)
            .caption(caption.to_string())
            .parse_mode(ParseMode::Html)
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn notify_admin(&self, text: &str) -> Result<(), SendError> {
        self.bot
            .send_message(self.admin_chat, text.to_string())
            .await
            .map_err(map_request_error)?;
        Ok(())
    }
}

/// Parse the configured channel id into a teloxide recipient
pub fn parse_recipient(channel_id: &str) -> Result<Recipient, Error> {
    let trimmed = channel_id.trim();
    if let Some(username) = trimmed.strip_prefix('@') {
        if username.is_empty() {
            return Err(Error::config("channel username must not be empty"));
        }
        return Ok(Recipient::ChannelUsername(trimmed.to_string()));
    }
    let id: i64 = trimmed
        .parse()
        .map_err(|_| Error::config(format!("invalid channel id: {channel_id}")))?;
    Ok(Recipient::Id(ChatId(id)))
}

/// Classify a teloxide failure into the send-error taxonomy
///
/// Flood waits are treated as transient network failures so the retry
/// layer backs off and tries again.
fn map_request_error(err: RequestError) -> SendError {
    match err {
        RequestError::Network(e) => SendError::Network(e.to_string()),
        RequestError::Io(e) => SendError::Network(e.to_string()),
        RequestError::RetryAfter(secs) => {
            SendError::Network(format!("flood wait, retry after {secs:?}"))
        }
        RequestError::Api(api) => {
            let text = api.to_string();
            if text.to_lowercase().contains("unauthorized") {
                SendError::Auth(text)
            } else {
                SendError::Rejected(text)
            }
        }
        other => SendError::Rejected(other.to_string()),
    }
}
