use super::{SessionRegistry, TrackPool};
use crate::actions::TrackHandlers;
use crate::store::{SavedPool, SavedTrack, SessionStore};
use crate::track::Track;
use anyhow::{bail, Context, Result};
use tracing::{info, warn};

/// Saves every live pool, replacing the previous snapshot.
pub fn snapshot(registry: &SessionRegistry, store: &dyn SessionStore) -> Result<()> {
    let pools: Vec<SavedPool> = registry.pools().map(saved_pool).collect();
    store
        .save_sessions(&pools)
        .context("Failed to save sessions")?;
    info!("Saved {} session(s)", pools.len());
    Ok(())
}

fn saved_pool(pool: &TrackPool) -> SavedPool {
    SavedPool {
        id: pool.id(),
        user_id: pool.owner_id(),
        message_id: pool.message_id(),
        page: pool.page(),
        callback_name: pool.handler().name().to_string(),
        tracks: pool
            .tracks()
            .iter()
            .map(|track| {
                let track = track.borrow();
                SavedTrack {
                    url: track.url.clone(),
                    title: track.title.clone(),
                    author: track.author.clone(),
                    duration: track.duration,
                    saved_track_id: track.stored_id,
                    sequence_key: track.sequence_key(),
                }
            })
            .collect(),
    }
}

/// Rebuilds the registry from the last snapshot. A pool bound to a handler
/// that doesn't exist is an error.
pub fn restore(store: &dyn SessionStore, handlers: &TrackHandlers) -> Result<SessionRegistry> {
    let saved = store.load_sessions().context("Failed to load sessions")?;
    let mut registry = SessionRegistry::new();

    for pool in saved {
        let Some(handler) = handlers.get(&pool.callback_name) else {
            bail!(
                "Unknown track handler '{}' for saved pool {}",
                pool.callback_name,
                pool.id
            );
        };
        let tracks = pool
            .tracks
            .into_iter()
            .map(|t| {
                Track::new(
                    t.url,
                    t.title,
                    t.author,
                    t.duration,
                    t.saved_track_id,
                    t.sequence_key,
                )
            })
            .collect();
        let restored = TrackPool::restored(
            pool.id,
            pool.user_id,
            pool.message_id,
            tracks,
            pool.page,
            handler,
        );
        if !registry.insert(restored) {
            warn!("Skipping saved pool {} without tracks", pool.id);
        }
    }

    info!("Restored {} session(s)", registry.len());
    Ok(registry)
}
