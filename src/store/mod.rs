mod models;
mod schema;
mod sqlite_store;

pub use models::*;
pub use schema::BOT_VERSIONED_SCHEMAS;
pub use sqlite_store::SqliteStore;

use anyhow::Result;

pub trait LibraryStore: Send + Sync {
    fn add_or_update_user(&self, user_id: i64, name: &str) -> Result<()>;

    /// Inserts the track, or updates the one the user has with the same url.
    /// Returns the library id.
    fn add_or_update_track(&self, user_id: i64, track: &TrackRecord) -> Result<i64>;
    fn get_track(&self, id: i64) -> Result<Option<LibraryTrack>>;
    /// Tracks of the user whose title and author contain the given text,
    /// ignoring case.
    fn list_tracks(
        &self,
        user_id: i64,
        title: Option<&str>,
        author: Option<&str>,
    ) -> Result<Vec<LibraryTrack>>;
    fn update_track(&self, id: i64, track: &TrackRecord) -> Result<bool>;
    fn delete_track(&self, id: i64) -> Result<bool>;
    /// Library ids of the given urls the user already has.
    fn find_stored_ids(&self, user_id: i64, urls: &[String]) -> Result<Vec<(String, i64)>>;
}

pub trait SessionStore: Send + Sync {
    /// Replaces every saved session with `pools` in a single transaction.
    fn save_sessions(&self, pools: &[SavedPool]) -> Result<()>;
    /// Saved sessions ordered by pool id.
    fn load_sessions(&self) -> Result<Vec<SavedPool>>;
}
