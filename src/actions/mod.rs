//! Per-user multi-step actions on a selected track.

mod handlers;
mod library;

pub use handlers::{ChooseActionHandler, DownloadHandler, TrackHandler, TrackHandlers};
pub use library::{delete_track, download_track, rename_track};

use crate::media::{AudioFetcher, MediaLibrary, MediaSettings};
use crate::store::LibraryStore;
use crate::track::TrackRef;
use crate::transport::{ChatId, Markup, Transport, UserId};
use anyhow::Result;

pub const EDIT_AUTHOR_LABEL: &str = "Edit author";
pub const EDIT_TITLE_LABEL: &str = "Edit title";
pub const DOWNLOAD_LABEL: &str = "Download";
pub const DELETE_LABEL: &str = "Delete";

const YES_LABEL: &str = "Yes";
const NO_LABEL: &str = "No";

/// Reply keyboard shown after a library track was selected.
pub fn menu_markup() -> Markup {
    Markup::Reply(vec![
        vec![EDIT_AUTHOR_LABEL.to_string(), EDIT_TITLE_LABEL.to_string()],
        vec![DOWNLOAD_LABEL.to_string(), DELETE_LABEL.to_string()],
    ])
}

/// Everything an action may touch while handling one input.
pub struct ActionContext<'a> {
    pub transport: &'a dyn Transport,
    pub store: &'a dyn LibraryStore,
    pub media: &'a MediaLibrary,
    pub media_settings: &'a MediaSettings,
    pub fetcher: &'a dyn AudioFetcher,
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub max_send_tries: u32,
}

impl ActionContext<'_> {
    pub fn reply(&self, text: &str, markup: Option<&Markup>) -> Result<()> {
        self.transport.send_message(self.chat_id, text, markup)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The action was just entered and has not prompted yet.
    Start,
    AwaitingInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackField {
    Author,
    Title,
}

impl TrackField {
    fn name(self) -> &'static str {
        match self {
            TrackField::Author => "author",
            TrackField::Title => "title",
        }
    }
}

/// The action a user is in the middle of.
#[derive(Debug, Default)]
pub enum Action {
    #[default]
    NoAction,
    ChooseAction(TrackRef),
    EditAuthor { track: TrackRef, stage: Stage },
    EditTitle { track: TrackRef, stage: Stage },
    Download(TrackRef),
    DeleteConfirm { track: TrackRef, stage: Stage },
}

impl Action {
    pub fn is_idle(&self) -> bool {
        matches!(self, Action::NoAction)
    }

    /// Whether the next text message belongs to this action rather than
    /// being a search.
    pub fn accepts(&self, input: &str) -> bool {
        match self {
            Action::NoAction => false,
            Action::ChooseAction(_) => [
                EDIT_AUTHOR_LABEL,
                EDIT_TITLE_LABEL,
                DOWNLOAD_LABEL,
                DELETE_LABEL,
            ]
            .contains(&input),
            Action::EditAuthor { .. }
            | Action::EditTitle { .. }
            | Action::Download(_)
            | Action::DeleteConfirm { .. } => true,
        }
    }

    /// Consumes one input and returns the action that follows.
    pub fn handle(self, input: &str, ctx: &ActionContext<'_>) -> Result<Action> {
        match self {
            Action::NoAction => Ok(Action::NoAction),
            Action::ChooseAction(track) => {
                let next = match input {
                    EDIT_AUTHOR_LABEL => Action::EditAuthor {
                        track,
                        stage: Stage::Start,
                    },
                    EDIT_TITLE_LABEL => Action::EditTitle {
                        track,
                        stage: Stage::Start,
                    },
                    DOWNLOAD_LABEL => Action::Download(track),
                    DELETE_LABEL => Action::DeleteConfirm {
                        track,
                        stage: Stage::Start,
                    },
                    _ => return Ok(Action::ChooseAction(track)),
                };
                next.handle(input, ctx)
            }
            Action::EditAuthor { track, stage } => {
                edit(track, TrackField::Author, stage, input, ctx)
            }
            Action::EditTitle { track, stage } => edit(track, TrackField::Title, stage, input, ctx),
            Action::Download(track) => {
                download_track(&track, ctx)?;
                Ok(Action::NoAction)
            }
            Action::DeleteConfirm { track, stage } => match stage {
                Stage::Start => {
                    let prompt = {
                        let t = track.borrow();
                        format!("Delete \"{} - {}\"?", t.author, t.title)
                    };
                    let markup = Markup::Reply(vec![vec![
                        YES_LABEL.to_string(),
                        NO_LABEL.to_string(),
                    ]]);
                    ctx.reply(&prompt, Some(&markup))?;
                    Ok(Action::DeleteConfirm {
                        track,
                        stage: Stage::AwaitingInput,
                    })
                }
                Stage::AwaitingInput => {
                    if input.trim().to_lowercase() == "yes" {
                        delete_track(&track, ctx)?;
                        ctx.reply("Deleted", Some(&Markup::RemoveKeyboard))?;
                    } else {
                        ctx.reply("Cancelled", Some(&Markup::RemoveKeyboard))?;
                    }
                    Ok(Action::NoAction)
                }
            },
        }
    }
}

fn edit(
    track: TrackRef,
    field: TrackField,
    stage: Stage,
    input: &str,
    ctx: &ActionContext<'_>,
) -> Result<Action> {
    match stage {
        Stage::Start => {
            let current = {
                let t = track.borrow();
                match field {
                    TrackField::Author => t.author.clone(),
                    TrackField::Title => t.title.clone(),
                }
            };
            ctx.reply(
                &format!("Current {}: {}\nSend the new {}", field.name(), current, field.name()),
                Some(&Markup::RemoveKeyboard),
            )?;
            let stage = Stage::AwaitingInput;
            Ok(match field {
                TrackField::Author => Action::EditAuthor { track, stage },
                TrackField::Title => Action::EditTitle { track, stage },
            })
        }
        Stage::AwaitingInput => {
            let value = input.trim();
            if value.is_empty() {
                ctx.reply("The value can't be empty, nothing changed", None)?;
                return Ok(Action::NoAction);
            }
            rename_track(&track, field, value, ctx)?;
            ctx.reply(&format!("The {} was changed", field.name()), None)?;
            Ok(Action::NoAction)
        }
    }
}
