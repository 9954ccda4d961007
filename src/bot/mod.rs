//! Event dispatch: commands, actions, searches and pool buttons.

mod engine;
mod runner;

pub use engine::{Collaborators, EngineSettings, SessionEngine};
pub use runner::run;

pub const HELP_TEXT: &str = "Send a song name to search for it, for example:\n\
    Kanaria - Brain\n\
    author: Kanaria, title: \"Brain\"\n\
    Kanaria\n\
    Click a result to download it.\n\n\
    /list [query] shows the tracks you downloaded.\n\
    /help shows this message.";
pub const NETWORK_ERROR_TEXT: &str = "Network error, please try again later";
pub const GENERIC_ERROR_TEXT: &str = "Something went wrong";
pub const UNKNOWN_COMMAND_TEXT: &str = "Unknown command, see /help";
