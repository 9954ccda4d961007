//! Telegram Bot API payloads, only the fields the bot reads.

use super::{InboundEvent, Markup};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

impl User {
    fn display_name(&self) -> String {
        self.username
            .clone()
            .unwrap_or_else(|| self.first_name.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

impl Update {
    /// Text messages and button clicks; every other update is dropped.
    pub fn into_event(self) -> Option<InboundEvent> {
        if let Some(message) = self.message {
            let from = message.from?;
            return Some(InboundEvent::Message {
                chat_id: message.chat.id,
                user_id: from.id,
                user_name: from.display_name(),
                text: message.text?,
            });
        }
        let query = self.callback_query?;
        Some(InboundEvent::Callback {
            chat_id: query.message?.chat.id,
            user_id: query.from.id,
            payload: query.data.unwrap_or_default(),
            callback_id: query.id,
        })
    }
}

pub fn markup_json(markup: &Markup) -> Value {
    match markup {
        Markup::Inline(keyboard) => json!({
            "inline_keyboard": keyboard
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|button| json!({"text": button.text, "callback_data": button.payload}))
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>()
        }),
        Markup::Reply(rows) => json!({
            "keyboard": rows
                .iter()
                .map(|row| row.iter().map(|text| json!({"text": text})).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
            "resize_keyboard": true,
        }),
        Markup::RemoveKeyboard => json!({"remove_keyboard": true}),
    }
}
