//! Common test infrastructure
//!
//! A [`TestBot`] runs the real engine against a SQLite database and media
//! directory in a temp dir, a stub catalog and a transport that records every
//! call instead of talking to Telegram.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestBot, USER_ID};
//!
//! #[test]
//! fn test_search() {
//!     let mut bot = TestBot::spawn(common::default_entries());
//!     bot.send_text(USER_ID, "Band");
//!     assert_eq!(bot.last_text(), "Found 2 track(s)");
//! }
//! ```

mod bot;
mod constants;
mod fixtures;
mod transport;

// Public API - this is what tests import
pub use bot::TestBot;
pub use constants::*;
pub use fixtures::{default_entries, entry, numbered_entries};
#[allow(unused_imports)]
pub use transport::{Call, RecordingTransport};
