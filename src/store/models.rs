/// A track in a user's library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryTrack {
    pub id: i64,
    pub user_id: i64,
    pub url: String,
    pub title: String,
    pub author: String,
    pub duration: Option<u32>,
}

/// Fields written when a track is added to, or updated in, the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub url: String,
    pub title: String,
    pub author: String,
    pub duration: Option<u32>,
}

/// A pool as saved at shutdown, with its tracks in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPool {
    pub id: u64,
    pub user_id: i64,
    pub message_id: Option<i64>,
    pub page: usize,
    pub callback_name: String,
    pub tracks: Vec<SavedTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedTrack {
    pub url: String,
    pub title: String,
    pub author: String,
    pub duration: Option<u32>,
    /// Library row the track pointed at, if that row still existed when saved.
    pub saved_track_id: Option<i64>,
    pub sequence_key: u64,
}
