//! musbot
//!
//! A chat bot that searches music catalogs, keeps paged result lists bound to
//! chat messages, and downloads tracks into a per-user library.

pub mod actions;
pub mod bot;
pub mod config;
pub mod media;
pub mod query;
pub mod session;
pub mod sources;
pub mod sqlite_persistence;
pub mod store;
pub mod track;
pub mod transport;

// Re-export commonly used types for convenience
pub use bot::{Collaborators, EngineSettings, SessionEngine};
pub use session::SessionRegistry;
pub use store::{LibraryStore, SessionStore, SqliteStore};
pub use transport::{TelegramTransport, Transport};
