use super::models::{LibraryTrack, SavedPool, SavedTrack, TrackRecord};
use super::schema::BOT_VERSIONED_SCHEMAS;
use super::{LibraryStore, SessionStore};
use crate::sqlite_persistence::open_versioned;
use anyhow::{Context, Result};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, BOT_VERSIONED_SCHEMAS, "bot")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn row_to_library_track(row: &rusqlite::Row) -> rusqlite::Result<LibraryTrack> {
        Ok(LibraryTrack {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            url: row.get("url")?,
            title: row.get("title")?,
            author: row.get("author")?,
            duration: row.get("duration")?,
        })
    }

    fn row_to_saved_track(row: &rusqlite::Row) -> rusqlite::Result<SavedTrack> {
        Ok(SavedTrack {
            url: row.get("url")?,
            title: row.get("title")?,
            author: row.get("author")?,
            duration: row.get("duration")?,
            saved_track_id: row.get("saved_track_id")?,
            sequence_key: row.get::<_, i64>("sequence_key")? as u64,
        })
    }
}

fn contains_ignore_case(value: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(needle) => value.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

impl LibraryStore for SqliteStore {
    fn add_or_update_user(&self, user_id: i64, name: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO users (id, name) VALUES (?1, ?2)
             ON CONFLICT (id) DO UPDATE SET name = excluded.name",
            params![user_id, name],
        )?;
        Ok(())
    }

    fn add_or_update_track(&self, user_id: i64, track: &TrackRecord) -> Result<i64> {
        let conn = self.lock();
        let id = conn
            .query_row(
                "INSERT INTO tracks (user_id, url, title, author, duration)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (user_id, url) DO UPDATE SET
                    title = excluded.title,
                    author = excluded.author,
                    duration = excluded.duration
                 RETURNING id",
                params![user_id, track.url, track.title, track.author, track.duration],
                |row| row.get(0),
            )
            .with_context(|| format!("Failed to store track {} for user {}", track.url, user_id))?;
        Ok(id)
    }

    fn get_track(&self, id: i64) -> Result<Option<LibraryTrack>> {
        let conn = self.lock();
        let track = conn
            .query_row(
                "SELECT id, user_id, url, title, author, duration FROM tracks WHERE id = ?1",
                params![id],
                Self::row_to_library_track,
            )
            .optional()?;
        Ok(track)
    }

    fn list_tracks(
        &self,
        user_id: i64,
        title: Option<&str>,
        author: Option<&str>,
    ) -> Result<Vec<LibraryTrack>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, url, title, author, duration FROM tracks
             WHERE user_id = ?1 ORDER BY author, title",
        )?;
        // Filtered here rather than with LIKE, which only folds ASCII case.
        let tracks = stmt
            .query_map(params![user_id], Self::row_to_library_track)?
            .filter(|track| match track {
                Ok(track) => {
                    contains_ignore_case(&track.title, title)
                        && contains_ignore_case(&track.author, author)
                }
                Err(_) => true,
            })
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    fn update_track(&self, id: i64, track: &TrackRecord) -> Result<bool> {
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE tracks SET url = ?1, title = ?2, author = ?3, duration = ?4 WHERE id = ?5",
            params![track.url, track.title, track.author, track.duration, id],
        )?;
        Ok(updated > 0)
    }

    fn delete_track(&self, id: i64) -> Result<bool> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM tracks WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn find_stored_ids(&self, user_id: i64, urls: &[String]) -> Result<Vec<(String, i64)>> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.lock();
        let placeholders = vec!["?"; urls.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT url, id FROM tracks WHERE user_id = ? AND url IN ({})",
            placeholders
        ))?;
        let args = std::iter::once(rusqlite::types::Value::Integer(user_id)).chain(
            urls.iter()
                .map(|url| rusqlite::types::Value::Text(url.clone())),
        );
        let found = stmt
            .query_map(params_from_iter(args), |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(found)
    }
}

impl SessionStore for SqliteStore {
    fn save_sessions(&self, pools: &[SavedPool]) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM saved_tracks", [])?;
        tx.execute("DELETE FROM saved_pools", [])?;
        {
            let mut insert_pool = tx.prepare(
                "INSERT INTO saved_pools (id, user_id, message_id, page, callback_name)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            // A library row deleted since the track was listed becomes NULL.
            let mut insert_track = tx.prepare(
                "INSERT INTO saved_tracks
                    (url, title, author, duration, saved_track_id, sequence_key, pool_id)
                 VALUES (?1, ?2, ?3, ?4, (SELECT id FROM tracks WHERE id = ?5), ?6, ?7)",
            )?;
            for pool in pools {
                insert_pool.execute(params![
                    pool.id as i64,
                    pool.user_id,
                    pool.message_id,
                    pool.page as i64,
                    pool.callback_name
                ])?;
                for track in &pool.tracks {
                    insert_track.execute(params![
                        track.url,
                        track.title,
                        track.author,
                        track.duration,
                        track.saved_track_id,
                        track.sequence_key as i64,
                        pool.id as i64
                    ])?;
                }
            }
        }
        tx.commit().context("Failed to commit saved sessions")?;
        debug!("Saved {} session pool(s)", pools.len());
        Ok(())
    }

    fn load_sessions(&self) -> Result<Vec<SavedPool>> {
        let conn = self.lock();
        let mut pools_stmt = conn.prepare(
            "SELECT id, user_id, message_id, page, callback_name FROM saved_pools ORDER BY id",
        )?;
        let mut pools = pools_stmt
            .query_map([], |row| {
                Ok(SavedPool {
                    id: row.get::<_, i64>("id")? as u64,
                    user_id: row.get("user_id")?,
                    message_id: row.get("message_id")?,
                    page: row.get::<_, i64>("page")? as usize,
                    callback_name: row.get("callback_name")?,
                    tracks: Vec::new(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut tracks_stmt = conn.prepare(
            "SELECT url, title, author, duration, saved_track_id, sequence_key
             FROM saved_tracks WHERE pool_id = ?1 ORDER BY rowid",
        )?;
        for pool in &mut pools {
            pool.tracks = tracks_stmt
                .query_map(params![pool.id as i64], Self::row_to_saved_track)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
        }
        Ok(pools)
    }
}
