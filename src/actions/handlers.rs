use super::{menu_markup, Action, ActionContext};
use crate::track::TrackRef;
use anyhow::Result;
use std::collections::HashMap;
use std::rc::Rc;

/// What happens when a track button of a pool is clicked. Pools keep the
/// handler's name so they can be bound to it again after a restart.
pub trait TrackHandler {
    fn name(&self) -> &'static str;

    fn on_select(&self, track: TrackRef, ctx: &ActionContext<'_>) -> Result<Action>;
}

/// Search results: download straight away.
pub struct DownloadHandler;

impl TrackHandler for DownloadHandler {
    fn name(&self) -> &'static str {
        "download"
    }

    fn on_select(&self, track: TrackRef, ctx: &ActionContext<'_>) -> Result<Action> {
        Action::Download(track).handle("", ctx)
    }
}

/// Library listings: ask what to do with the track.
pub struct ChooseActionHandler;

impl TrackHandler for ChooseActionHandler {
    fn name(&self) -> &'static str {
        "choose_action"
    }

    fn on_select(&self, track: TrackRef, ctx: &ActionContext<'_>) -> Result<Action> {
        let text = {
            let t = track.borrow();
            format!("{} - {}\nChoose an action", t.author, t.title)
        };
        ctx.reply(&text, Some(&menu_markup()))?;
        Ok(Action::ChooseAction(track))
    }
}

/// Handlers by name.
#[derive(Clone, Default)]
pub struct TrackHandlers {
    handlers: HashMap<&'static str, Rc<dyn TrackHandler>>,
}

impl TrackHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut handlers = Self::new();
        handlers.register(Rc::new(DownloadHandler));
        handlers.register(Rc::new(ChooseActionHandler));
        handlers
    }

    pub fn register(&mut self, handler: Rc<dyn TrackHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn TrackHandler>> {
        self.handlers.get(name).cloned()
    }
}
