#![allow(dead_code)]

use super::constants::{ADMIN_ID, AUDIO_BODY, MAX_SEND_TRIES};
use super::fixtures::{StubFetcher, StubSource};
use super::transport::{Call, RecordingTransport};
use musbot::actions::TrackHandlers;
use musbot::bot::{Collaborators, EngineSettings, SessionEngine};
use musbot::media::{MediaLibrary, MediaSettings};
use musbot::session;
use musbot::sources::{AliasSettings, AuthorNormalizer, SourceEntry, TrackLoader};
use musbot::store::{LibraryStore, SqliteStore};
use musbot::transport::{InboundEvent, InlineKeyboard, Markup, UserId};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use tempfile::TempDir;

/// The engine wired to a temp database, a stub catalog and a recording
/// transport. Chats are private, so the chat id is the user id.
pub struct TestBot {
    pub dir: TempDir,
    pub store: Arc<SqliteStore>,
    pub transport: RecordingTransport,
    pub requested: Rc<RefCell<Vec<String>>>,
    pub engine: SessionEngine,
    entries: Vec<SourceEntry>,
    next_callback: u32,
}

impl TestBot {
    pub fn spawn(entries: Vec<SourceEntry>) -> Self {
        let dir = TempDir::new().unwrap();
        Self::start(dir, entries)
    }

    fn start(dir: TempDir, entries: Vec<SourceEntry>) -> Self {
        let store = Arc::new(SqliteStore::new(dir.path().join("bot.db")).unwrap());
        let handlers = TrackHandlers::with_defaults();
        let registry = session::restore(store.as_ref(), &handlers).unwrap();

        let transport = RecordingTransport::new();
        let requested = Rc::new(RefCell::new(Vec::new()));
        let loader = TrackLoader::new(
            vec![Box::new(StubSource {
                entries: entries.clone(),
            })],
            AuthorNormalizer::new(&AliasSettings::default()).unwrap(),
        );
        let collaborators = Collaborators {
            transport: Box::new(transport.clone()),
            store: store.clone() as Arc<dyn LibraryStore>,
            loader,
            media: MediaLibrary::new(dir.path().join("tracks"), "mp3").unwrap(),
            fetcher: Box::new(StubFetcher {
                body: Some(AUDIO_BODY.to_vec()),
                requested: requested.clone(),
            }),
        };
        let settings = EngineSettings {
            admin_id: ADMIN_ID,
            max_send_tries: MAX_SEND_TRIES,
            media: MediaSettings {
                convert: false,
                ..MediaSettings::default()
            },
        };

        Self {
            dir,
            store,
            transport,
            requested,
            engine: SessionEngine::new(collaborators, handlers, registry, settings),
            entries,
            next_callback: 0,
        }
    }

    /// Snapshots the sessions and starts a fresh engine on the same files.
    pub fn restart(self) -> Self {
        session::snapshot(self.engine.registry(), self.store.as_ref()).unwrap();
        let TestBot {
            dir,
            store,
            engine,
            entries,
            ..
        } = self;
        drop(engine);
        drop(store);
        Self::start(dir, entries)
    }

    pub fn send_text(&mut self, user_id: UserId, text: &str) {
        self.engine.handle_event(InboundEvent::Message {
            chat_id: user_id,
            user_id,
            user_name: format!("user{}", user_id),
            text: text.to_string(),
        });
    }

    pub fn click(&mut self, user_id: UserId, payload: &str) {
        self.next_callback += 1;
        self.engine.handle_event(InboundEvent::Callback {
            callback_id: format!("cb{}", self.next_callback),
            chat_id: user_id,
            user_id,
            payload: payload.to_string(),
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.transport.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.transport.calls.borrow_mut().clear();
    }

    /// Text of the last message sent.
    pub fn last_text(&self) -> String {
        self.calls()
            .into_iter()
            .rev()
            .find_map(|call| match call {
                Call::SendMessage { text, .. } => Some(text),
                _ => None,
            })
            .expect("no message was sent")
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SendMessage { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// The most recent inline keyboard, sent or edited.
    pub fn last_keyboard(&self) -> InlineKeyboard {
        self.calls()
            .into_iter()
            .rev()
            .find_map(|call| match call {
                Call::SendMessage {
                    markup: Some(Markup::Inline(keyboard)),
                    ..
                } => Some(keyboard),
                Call::EditKeyboard {
                    keyboard: Some(keyboard),
                    ..
                } => Some(keyboard),
                _ => None,
            })
            .expect("no inline keyboard was shown")
    }

    /// Payloads of the track buttons of the last keyboard, top to bottom.
    pub fn track_payloads(&self) -> Vec<String> {
        self.last_keyboard()
            .rows
            .iter()
            .filter(|row| row.len() == 1 && !row[0].payload.ends_with("_delete"))
            .map(|row| row[0].payload.clone())
            .collect()
    }

    pub fn track_labels(&self) -> Vec<String> {
        self.last_keyboard()
            .rows
            .iter()
            .filter(|row| row.len() == 1 && !row[0].payload.ends_with("_delete"))
            .map(|row| row[0].text.trim_end().to_string())
            .collect()
    }

    pub fn audio_sent(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SendAudio { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }
}
