use super::{GENERIC_ERROR_TEXT, HELP_TEXT, NETWORK_ERROR_TEXT, UNKNOWN_COMMAND_TEXT};
use crate::actions::{Action, ActionContext, TrackHandler, TrackHandlers};
use crate::media::{AudioFetcher, MediaLibrary, MediaSettings};
use crate::query::parse;
use crate::session::{ButtonBinding, PoolControl, SessionRegistry};
use crate::sources::TrackLoader;
use crate::store::LibraryStore;
use crate::track::Track;
use crate::transport::{ChatId, InboundEvent, Markup, Transport, TransportError, UserId};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const SEARCH_HANDLER: &str = "download";
const LIBRARY_HANDLER: &str = "choose_action";

pub struct Collaborators {
    pub transport: Box<dyn Transport>,
    pub store: Arc<dyn LibraryStore>,
    pub loader: TrackLoader,
    pub media: MediaLibrary,
    pub fetcher: Box<dyn AudioFetcher>,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub admin_id: UserId,
    pub max_send_tries: u32,
    pub media: MediaSettings,
}

/// Handles inbound events one at a time. Owns the live pools and every
/// user's current action.
pub struct SessionEngine {
    registry: SessionRegistry,
    actions: HashMap<UserId, Action>,
    handlers: TrackHandlers,
    transport: Box<dyn Transport>,
    store: Arc<dyn LibraryStore>,
    loader: TrackLoader,
    media: MediaLibrary,
    fetcher: Box<dyn AudioFetcher>,
    settings: EngineSettings,
    last_error: Option<String>,
    stop_requested: bool,
}

impl SessionEngine {
    pub fn new(
        collaborators: Collaborators,
        handlers: TrackHandlers,
        registry: SessionRegistry,
        settings: EngineSettings,
    ) -> Self {
        Self {
            registry,
            actions: HashMap::new(),
            handlers,
            transport: collaborators.transport,
            store: collaborators.store,
            loader: collaborators.loader,
            media: collaborators.media,
            fetcher: collaborators.fetcher,
            settings,
            last_error: None,
            stop_requested: false,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn action(&self, user_id: UserId) -> Option<&Action> {
        self.actions.get(&user_id)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Set once the admin sent `/stop`.
    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub fn poll_events(&self) -> Result<Vec<InboundEvent>, TransportError> {
        self.transport.poll_events()
    }

    /// Handles one event. Failures are logged, kept for `/last_error` and
    /// reported to the user with a short message.
    pub fn handle_event(&mut self, event: InboundEvent) {
        let (chat_id, user_id) = match &event {
            InboundEvent::Message {
                chat_id, user_id, ..
            }
            | InboundEvent::Callback {
                chat_id, user_id, ..
            } => (*chat_id, *user_id),
        };

        let result = match event {
            InboundEvent::Message {
                chat_id,
                user_id,
                user_name,
                text,
            } => self.handle_message(chat_id, user_id, &user_name, &text),
            InboundEvent::Callback {
                callback_id,
                chat_id,
                user_id,
                payload,
            } => self.handle_callback(&callback_id, chat_id, user_id, &payload),
        };

        if let Err(err) = result {
            self.on_error(chat_id, user_id, err);
        }
    }

    fn on_error(&mut self, chat_id: ChatId, user_id: UserId, err: anyhow::Error) {
        error!("Failed to handle event of user {}: {:?}", user_id, err);
        self.last_error = Some(format!("{:?}", err));
        self.actions.remove(&user_id);

        let text = if is_network_error(&err) {
            NETWORK_ERROR_TEXT
        } else {
            GENERIC_ERROR_TEXT
        };
        if let Err(send_err) =
            self.transport
                .send_message(chat_id, text, Some(&Markup::RemoveKeyboard))
        {
            warn!("Failed to report error to user {}: {}", user_id, send_err);
        }
    }

    fn context(&self, chat_id: ChatId, user_id: UserId) -> ActionContext<'_> {
        ActionContext {
            transport: self.transport.as_ref(),
            store: self.store.as_ref(),
            media: &self.media,
            media_settings: &self.settings.media,
            fetcher: self.fetcher.as_ref(),
            chat_id,
            user_id,
            max_send_tries: self.settings.max_send_tries,
        }
    }

    fn set_action(&mut self, user_id: UserId, action: Action) {
        if action.is_idle() {
            self.actions.remove(&user_id);
        } else {
            self.actions.insert(user_id, action);
        }
    }

    fn handler(&self, name: &str) -> Result<Rc<dyn TrackHandler>> {
        self.handlers
            .get(name)
            .ok_or_else(|| anyhow!("Track handler '{}' is not registered", name))
    }

    fn handle_message(
        &mut self,
        chat_id: ChatId,
        user_id: UserId,
        user_name: &str,
        text: &str,
    ) -> Result<()> {
        self.store.add_or_update_user(user_id, user_name)?;
        let text = text.trim();

        if let Some(command) = text.strip_prefix('/') {
            let (name, argument) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
            // Group chats address commands as `/list@bot_name`.
            let name = name.split('@').next().unwrap_or(name);
            return self.handle_command(chat_id, user_id, name, argument.trim());
        }

        let action = self.actions.remove(&user_id).unwrap_or_default();
        if action.accepts(text) {
            let next = action.handle(text, &self.context(chat_id, user_id))?;
            self.set_action(user_id, next);
            return Ok(());
        }
        self.set_action(user_id, action);

        self.search(chat_id, user_id, text)
    }

    fn handle_command(
        &mut self,
        chat_id: ChatId,
        user_id: UserId,
        name: &str,
        argument: &str,
    ) -> Result<()> {
        let is_admin = user_id == self.settings.admin_id;
        match name {
            "start" | "help" => {
                self.actions.remove(&user_id);
                self.transport
                    .send_message(chat_id, HELP_TEXT, Some(&Markup::RemoveKeyboard))?;
            }
            "list" => {
                self.actions.remove(&user_id);
                self.list(chat_id, user_id, argument)?;
            }
            "stop" | "last_error" if !is_admin => {
                warn!("User {} tried the admin command /{}", user_id, name);
                self.transport
                    .send_message(chat_id, UNKNOWN_COMMAND_TEXT, None)?;
            }
            "stop" => {
                info!("Stop requested by the admin");
                self.stop_requested = true;
                self.transport.send_message(chat_id, "Stopping", None)?;
            }
            "last_error" => {
                let text = self.last_error.clone().unwrap_or_else(|| "No errors".to_string());
                self.transport.send_message(chat_id, &text, None)?;
            }
            _ => {
                debug!("Unknown command /{} from user {}", name, user_id);
                self.transport
                    .send_message(chat_id, UNKNOWN_COMMAND_TEXT, None)?;
            }
        }
        Ok(())
    }

    fn search(&mut self, chat_id: ChatId, user_id: UserId, text: &str) -> Result<()> {
        let query = parse(text);
        if query.request.is_empty() {
            debug!("Ignoring empty search from user {}", user_id);
            return Ok(());
        }

        let mut tracks = self.loader.load(&query, self.registry.track_keys());
        self.mark_stored(user_id, &mut tracks)?;
        let handler = self.handler(SEARCH_HANDLER)?;
        self.show_pool(chat_id, user_id, tracks, handler)
    }

    fn mark_stored(&self, user_id: UserId, tracks: &mut [Track]) -> Result<()> {
        let urls: Vec<String> = tracks.iter().map(|t| t.url.clone()).collect();
        let stored: HashMap<String, i64> = self
            .store
            .find_stored_ids(user_id, &urls)?
            .into_iter()
            .collect();
        for track in tracks {
            track.stored_id = stored.get(&track.url).copied();
        }
        Ok(())
    }

    fn list(&mut self, chat_id: ChatId, user_id: UserId, argument: &str) -> Result<()> {
        let (title, author) = if argument.is_empty() {
            (None, None)
        } else {
            let query = parse(argument);
            (query.title, query.author)
        };

        let entries = self
            .store
            .list_tracks(user_id, title.as_deref(), author.as_deref())?;
        let keys = self.registry.track_keys();
        let mut tracks: Vec<Track> = entries
            .into_iter()
            .map(|entry| {
                Track::new(
                    entry.url,
                    entry.title,
                    entry.author,
                    entry.duration,
                    Some(entry.id),
                    keys.next(),
                )
            })
            .collect();
        tracks.sort();

        let handler = self.handler(LIBRARY_HANDLER)?;
        self.show_pool(chat_id, user_id, tracks, handler)
    }

    fn show_pool(
        &mut self,
        chat_id: ChatId,
        user_id: UserId,
        tracks: Vec<Track>,
        handler: Rc<dyn TrackHandler>,
    ) -> Result<()> {
        let mut pool = self.registry.new_pool(user_id, tracks, handler);
        pool.print(self.transport.as_ref(), chat_id)?;
        self.registry.insert(pool);
        Ok(())
    }

    fn handle_callback(
        &mut self,
        callback_id: &str,
        chat_id: ChatId,
        user_id: UserId,
        payload: &str,
    ) -> Result<()> {
        self.transport.answer_callback(callback_id)?;

        let Some(binding) = self.registry.resolve(payload) else {
            debug!("Ignoring button `{}`", payload);
            return Ok(());
        };
        let pool_id = match binding {
            ButtonBinding::Track { pool_id, .. } | ButtonBinding::Control { pool_id, .. } => {
                pool_id
            }
        };
        match self.registry.pool(pool_id) {
            Some(pool) if pool.owner_id() == user_id => {}
            _ => {
                warn!("User {} clicked a button of pool {}", user_id, pool_id);
                return Ok(());
            }
        }

        match binding {
            ButtonBinding::Control { control, .. } => {
                let transport = self.transport.as_ref();
                match control {
                    PoolControl::Delete => {
                        self.registry.delete_pool(pool_id, transport, chat_id)?;
                    }
                    PoolControl::PrintNext | PoolControl::PrintPrev => {
                        if let Some(pool) = self.registry.pool_mut(pool_id) {
                            if control == PoolControl::PrintNext {
                                pool.print_next(transport, chat_id)?;
                            } else {
                                pool.print_prev(transport, chat_id)?;
                            }
                        }
                    }
                }
            }
            ButtonBinding::Track { index, .. } => {
                let Some(pool) = self.registry.pool(pool_id) else {
                    return Ok(());
                };
                let (Some(track), handler) = (pool.track(index), pool.handler()) else {
                    return Ok(());
                };
                let next = handler.on_select(track, &self.context(chat_id, user_id))?;
                self.set_action(user_id, next);
            }
        }
        Ok(())
    }
}

fn is_network_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<TransportError>()
            .is_some_and(TransportError::is_network)
            || cause.downcast_ref::<reqwest::Error>().is_some()
    })
}
