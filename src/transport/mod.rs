//! The chat boundary: inbound events, outbound messages and keyboards.

mod models;
mod telegram;

pub use telegram::TelegramTransport;

use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

pub type ChatId = i64;
pub type UserId = i64;
pub type MessageId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    /// Opaque payload delivered back with the click.
    pub payload: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            payload: payload.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    Inline(InlineKeyboard),
    /// Buttons replacing the user's keyboard, each one sends its label.
    Reply(Vec<Vec<String>>),
    RemoveKeyboard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Message {
        chat_id: ChatId,
        user_id: UserId,
        user_name: String,
        text: String,
    },
    Callback {
        callback_id: String,
        chat_id: ChatId,
        user_id: UserId,
        payload: String,
    },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Bot API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn is_network(&self) -> bool {
        matches!(self, TransportError::Network(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::InvalidResponse(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

pub trait Transport {
    /// Waits for the next batch of events.
    fn poll_events(&self) -> Result<Vec<InboundEvent>, TransportError>;

    fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Option<&Markup>,
    ) -> Result<MessageId, TransportError>;

    /// Replaces the inline buttons of a sent message, `None` removes them.
    fn edit_inline_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), TransportError>;

    fn delete_message(&self, chat_id: ChatId, message_id: MessageId)
        -> Result<(), TransportError>;

    /// Uploads the file; the chat shows its file name.
    fn send_audio(
        &self,
        chat_id: ChatId,
        path: &Path,
        markup: Option<&Markup>,
    ) -> Result<(), TransportError>;

    fn answer_callback(&self, callback_id: &str) -> Result<(), TransportError>;
}

/// Sends an audio file, retrying network failures up to `max_tries` attempts
/// in total. Other errors are returned immediately.
pub fn send_audio_with_retries(
    transport: &dyn Transport,
    chat_id: ChatId,
    path: &Path,
    markup: Option<&Markup>,
    max_tries: u32,
) -> Result<(), TransportError> {
    let start = Instant::now();
    let max_tries = max_tries.max(1);
    let mut attempt = 1;
    loop {
        match transport.send_audio(chat_id, path, markup) {
            Ok(()) => {
                debug!("Audio sending: {:?}", start.elapsed());
                return Ok(());
            }
            Err(err) if err.is_network() && attempt < max_tries => {
                warn!(
                    "Sending {:?} failed (attempt {}/{}): {}, retrying...",
                    path, attempt, max_tries, err
                );
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
