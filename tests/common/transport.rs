#![allow(dead_code)]

use musbot::transport::{
    ChatId, InboundEvent, InlineKeyboard, Markup, MessageId, Transport, TransportError,
};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SendMessage {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        markup: Option<Markup>,
    },
    EditKeyboard {
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: Option<InlineKeyboard>,
    },
    DeleteMessage {
        chat_id: ChatId,
        message_id: MessageId,
    },
    SendAudio {
        chat_id: ChatId,
        path: PathBuf,
    },
    AnswerCallback {
        callback_id: String,
    },
}

/// Records every call. Message ids count up from 100.
#[derive(Clone)]
pub struct RecordingTransport {
    pub calls: Rc<RefCell<Vec<Call>>>,
    next_message_id: Rc<Cell<MessageId>>,
    /// While set, sending audio fails with a network error.
    pub audio_offline: Rc<Cell<bool>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
            next_message_id: Rc::new(Cell::new(100)),
            audio_offline: Rc::new(Cell::new(false)),
        }
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl Transport for RecordingTransport {
    fn poll_events(&self) -> Result<Vec<InboundEvent>, TransportError> {
        Ok(Vec::new())
    }

    fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Option<&Markup>,
    ) -> Result<MessageId, TransportError> {
        let message_id = self.next_message_id.get();
        self.next_message_id.set(message_id + 1);
        self.record(Call::SendMessage {
            chat_id,
            message_id,
            text: text.to_string(),
            markup: markup.cloned(),
        });
        Ok(message_id)
    }

    fn edit_inline_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), TransportError> {
        self.record(Call::EditKeyboard {
            chat_id,
            message_id,
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), TransportError> {
        self.record(Call::DeleteMessage {
            chat_id,
            message_id,
        });
        Ok(())
    }

    fn send_audio(
        &self,
        chat_id: ChatId,
        path: &Path,
        _markup: Option<&Markup>,
    ) -> Result<(), TransportError> {
        self.record(Call::SendAudio {
            chat_id,
            path: path.to_path_buf(),
        });
        if self.audio_offline.get() {
            return Err(TransportError::Network("connection reset".to_string()));
        }
        Ok(())
    }

    fn answer_callback(&self, callback_id: &str) -> Result<(), TransportError> {
        self.record(Call::AnswerCallback {
            callback_id: callback_id.to_string(),
        });
        Ok(())
    }
}
