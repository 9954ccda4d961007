//! Blocking Telegram Bot API client with long polling.

use super::models::{markup_json, ApiResponse, Message, Update};
use super::{
    ChatId, InboundEvent, InlineKeyboard, Markup, MessageId, Transport, TransportError,
};
use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::cell::Cell;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://api.telegram.org";

pub struct TelegramTransport {
    client: Client,
    base_url: String,
    poll_timeout_sec: u64,
    http_timeout: Duration,
    next_update_id: Cell<i64>,
}

impl TelegramTransport {
    pub fn new(token: &str, http_timeout_sec: u64, poll_timeout_sec: u64) -> Result<Self> {
        let http_timeout = Duration::from_secs(http_timeout_sec);
        let client = Client::builder()
            .timeout(http_timeout)
            .build()
            .context("Failed to create Telegram HTTP client")?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{}", API_BASE, token),
            poll_timeout_sec,
            http_timeout,
            next_update_id: Cell::new(0),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, TransportError> {
        debug!("Bot API call {}", method);
        self.send(self.client.post(self.method_url(method)).json(body))
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, TransportError> {
        let response: ApiResponse<T> = request.send()?.json()?;
        if !response.ok {
            return Err(TransportError::Api {
                code: response.error_code.unwrap_or_default(),
                description: response.description.unwrap_or_default(),
            });
        }
        response
            .result
            .ok_or_else(|| TransportError::InvalidResponse("missing result".to_string()))
    }
}

fn with_markup(mut body: Value, markup: Option<&Markup>) -> Value {
    if let Some(markup) = markup {
        body["reply_markup"] = markup_json(markup);
    }
    body
}

impl Transport for TelegramTransport {
    fn poll_events(&self) -> Result<Vec<InboundEvent>, TransportError> {
        let body = json!({
            "offset": self.next_update_id.get(),
            "timeout": self.poll_timeout_sec,
            "allowed_updates": ["message", "callback_query"],
        });
        let request = self
            .client
            .post(self.method_url("getUpdates"))
            .timeout(self.http_timeout + Duration::from_secs(self.poll_timeout_sec))
            .json(&body);
        let updates: Vec<Update> = self.send(request)?;

        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            self.next_update_id.set(last + 1);
        }
        Ok(updates.into_iter().filter_map(Update::into_event).collect())
    }

    fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Option<&Markup>,
    ) -> Result<MessageId, TransportError> {
        let body = with_markup(json!({"chat_id": chat_id, "text": text}), markup);
        let message: Message = self.call("sendMessage", &body)?;
        Ok(message.message_id)
    }

    fn edit_inline_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), TransportError> {
        let markup = keyboard.map(|k| Markup::Inline(k.clone()));
        let body = with_markup(
            json!({"chat_id": chat_id, "message_id": message_id}),
            markup.as_ref(),
        );
        // The result is the edited message, or `true` for inline messages.
        let _: Value = self.call("editMessageReplyMarkup", &body)?;
        Ok(())
    }

    fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), TransportError> {
        let _: bool = self.call(
            "deleteMessage",
            &json!({"chat_id": chat_id, "message_id": message_id}),
        )?;
        Ok(())
    }

    fn send_audio(
        &self,
        chat_id: ChatId,
        path: &Path,
        markup: Option<&Markup>,
    ) -> Result<(), TransportError> {
        let mut form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .file("audio", path)?;
        if let Some(markup) = markup {
            form = form.text("reply_markup", markup_json(markup).to_string());
        }
        let _: Message = self.send(
            self.client
                .post(self.method_url("sendAudio"))
                .multipart(form),
        )?;
        Ok(())
    }

    fn answer_callback(&self, callback_id: &str) -> Result<(), TransportError> {
        let _: bool = self.call(
            "answerCallbackQuery",
            &json!({"callback_query_id": callback_id}),
        )?;
        Ok(())
    }
}
