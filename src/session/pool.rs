use crate::actions::TrackHandler;
use crate::track::{button_label, Track, TrackRef};
use crate::transport::{
    ChatId, InlineButton, InlineKeyboard, Markup, MessageId, Transport, TransportError, UserId,
};
use std::rc::Rc;
use tracing::debug;

pub const PAGE_SIZE: usize = 10;

/// Payload of buttons that do nothing when clicked.
pub const INERT_PAYLOAD: &str = "none";

const HIDE_LABEL: &str = "Hide";
const PREV_LABEL: &str = "← Prev";
const NEXT_LABEL: &str = "Next →";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolControl {
    PrintNext,
    PrintPrev,
    Delete,
}

impl PoolControl {
    pub const ALL: [PoolControl; 3] = [
        PoolControl::PrintNext,
        PoolControl::PrintPrev,
        PoolControl::Delete,
    ];

    fn suffix(self) -> &'static str {
        match self {
            PoolControl::PrintNext => "_print_next",
            PoolControl::PrintPrev => "_print_prev",
            PoolControl::Delete => "_delete",
        }
    }

    pub fn payload(self, pool_id: u64) -> String {
        format!("{}{}", pool_id, self.suffix())
    }
}

/// One paged list of tracks, shown as the buttons of a single message.
pub struct TrackPool {
    id: u64,
    owner_id: UserId,
    message_id: Option<MessageId>,
    tracks: Vec<TrackRef>,
    page: usize,
    handler: Rc<dyn TrackHandler>,
}

impl TrackPool {
    pub fn new(
        id: u64,
        owner_id: UserId,
        tracks: Vec<Track>,
        handler: Rc<dyn TrackHandler>,
    ) -> Self {
        Self {
            id,
            owner_id,
            message_id: None,
            tracks: tracks.into_iter().map(Track::into_ref).collect(),
            page: 0,
            handler,
        }
    }

    /// Rebuilds a saved pool. An out of range page is clamped.
    pub fn restored(
        id: u64,
        owner_id: UserId,
        message_id: Option<MessageId>,
        tracks: Vec<Track>,
        page: usize,
        handler: Rc<dyn TrackHandler>,
    ) -> Self {
        let mut pool = Self::new(id, owner_id, tracks, handler);
        pool.message_id = message_id;
        pool.page = page.min(pool.last_page());
        pool
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn message_id(&self) -> Option<MessageId> {
        self.message_id
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn tracks(&self) -> &[TrackRef] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> Option<TrackRef> {
        self.tracks.get(index).cloned()
    }

    pub fn handler(&self) -> Rc<dyn TrackHandler> {
        Rc::clone(&self.handler)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.tracks.len().div_ceil(PAGE_SIZE)
    }

    fn last_page(&self) -> usize {
        self.page_count().max(1) - 1
    }

    /// Sends the pool message, or updates its buttons once it was sent.
    pub fn print(&mut self, transport: &dyn Transport, chat_id: ChatId) -> Result<(), TransportError> {
        let text = format!("Found {} track(s)", self.tracks.len());
        if self.tracks.is_empty() {
            transport.send_message(chat_id, &text, None)?;
            return Ok(());
        }

        let keyboard = self.keyboard();
        match self.message_id {
            Some(message_id) => transport.edit_inline_keyboard(chat_id, message_id, Some(&keyboard)),
            None => {
                let message_id =
                    transport.send_message(chat_id, &text, Some(&Markup::Inline(keyboard)))?;
                self.message_id = Some(message_id);
                Ok(())
            }
        }
    }

    pub fn print_next(&mut self, transport: &dyn Transport, chat_id: ChatId) -> Result<(), TransportError> {
        self.show_page((self.page + 1).min(self.last_page()), transport, chat_id)
    }

    pub fn print_prev(&mut self, transport: &dyn Transport, chat_id: ChatId) -> Result<(), TransportError> {
        self.show_page(self.page.saturating_sub(1), transport, chat_id)
    }

    fn show_page(
        &mut self,
        page: usize,
        transport: &dyn Transport,
        chat_id: ChatId,
    ) -> Result<(), TransportError> {
        if page == self.page && self.message_id.is_some() {
            // Telegram rejects edits that change nothing.
            debug!("Pool {} already shows page {}", self.id, page);
            return Ok(());
        }
        self.page = page;
        self.print(transport, chat_id)
    }

    pub fn keyboard(&self) -> InlineKeyboard {
        let mut rows = vec![vec![InlineButton::new(
            HIDE_LABEL,
            PoolControl::Delete.payload(self.id),
        )]];

        let start = self.page * PAGE_SIZE;
        let end = (start + PAGE_SIZE).min(self.tracks.len());
        for track in &self.tracks[start.min(end)..end] {
            let track = track.borrow();
            rows.push(vec![InlineButton::new(
                button_label(&track),
                track.sequence_key().to_string(),
            )]);
        }

        let page_count = self.page_count();
        if page_count > 1 {
            let prev = if self.page > 0 {
                InlineButton::new(PREV_LABEL, PoolControl::PrintPrev.payload(self.id))
            } else {
                InlineButton::new(" ", INERT_PAYLOAD)
            };
            let next = if self.page + 1 < page_count {
                InlineButton::new(NEXT_LABEL, PoolControl::PrintNext.payload(self.id))
            } else {
                InlineButton::new(" ", INERT_PAYLOAD)
            };
            let position =
                InlineButton::new(format!("{}/{}", self.page + 1, page_count), INERT_PAYLOAD);
            rows.push(vec![prev, position, next]);
        }

        InlineKeyboard { rows }
    }
}
