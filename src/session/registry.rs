use super::pool::{PoolControl, TrackPool};
use crate::actions::TrackHandler;
use crate::track::{IdSequence, Track};
use crate::transport::{ChatId, Transport, TransportError, UserId};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use tracing::debug;

/// What a button payload refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonBinding {
    Track { pool_id: u64, index: usize },
    Control { pool_id: u64, control: PoolControl },
}

/// Live pools by id, the button payload table, and the id sequences for
/// pools and tracks.
#[derive(Default)]
pub struct SessionRegistry {
    pools: BTreeMap<u64, TrackPool>,
    bindings: HashMap<String, ButtonBinding>,
    pool_ids: IdSequence,
    track_keys: IdSequence,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source of `sequence_key`s for new tracks.
    pub fn track_keys(&mut self) -> &mut IdSequence {
        &mut self.track_keys
    }

    pub fn last_pool_id(&self) -> u64 {
        self.pool_ids.last()
    }

    pub fn last_track_key(&self) -> u64 {
        self.track_keys.last()
    }

    /// Builds a pool with a fresh id. The pool is not registered until
    /// passed to [`SessionRegistry::insert`].
    pub fn new_pool(
        &mut self,
        owner_id: UserId,
        tracks: Vec<Track>,
        handler: Rc<dyn TrackHandler>,
    ) -> TrackPool {
        TrackPool::new(self.pool_ids.next(), owner_id, tracks, handler)
    }

    /// Registers the pool and binds its buttons. Empty pools are dropped and
    /// `false` is returned.
    pub fn insert(&mut self, pool: TrackPool) -> bool {
        if pool.is_empty() {
            debug!("Not registering empty pool {}", pool.id());
            return false;
        }

        let pool_id = pool.id();
        self.remove(pool_id);
        self.pool_ids.observe(pool_id);
        for control in PoolControl::ALL {
            self.bindings
                .insert(control.payload(pool_id), ButtonBinding::Control { pool_id, control });
        }
        for (index, track) in pool.tracks().iter().enumerate() {
            let key = track.borrow().sequence_key();
            self.track_keys.observe(key);
            self.bindings
                .insert(key.to_string(), ButtonBinding::Track { pool_id, index });
        }

        self.pools.insert(pool_id, pool);
        true
    }

    pub fn resolve(&self, payload: &str) -> Option<ButtonBinding> {
        self.bindings.get(payload).copied()
    }

    pub fn pool(&self, pool_id: u64) -> Option<&TrackPool> {
        self.pools.get(&pool_id)
    }

    pub fn pool_mut(&mut self, pool_id: u64) -> Option<&mut TrackPool> {
        self.pools.get_mut(&pool_id)
    }

    /// Live pools in id order.
    pub fn pools(&self) -> impl Iterator<Item = &TrackPool> {
        self.pools.values()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Evicts the pool and frees its button payloads.
    pub fn remove(&mut self, pool_id: u64) -> Option<TrackPool> {
        let pool = self.pools.remove(&pool_id)?;
        self.unbind(&pool);
        Some(pool)
    }

    /// Deletes the pool message, then evicts the pool. If the message can't be
    /// deleted the pool stays registered.
    pub fn delete_pool(
        &mut self,
        pool_id: u64,
        transport: &dyn Transport,
        chat_id: ChatId,
    ) -> Result<bool, TransportError> {
        let Some(pool) = self.pools.get(&pool_id) else {
            return Ok(false);
        };
        if let Some(message_id) = pool.message_id() {
            transport.delete_message(chat_id, message_id)?;
        }
        self.remove(pool_id);
        Ok(true)
    }

    fn unbind(&mut self, pool: &TrackPool) {
        let pool_id = pool.id();
        self.bindings.retain(|_, binding| match binding {
            ButtonBinding::Track { pool_id: id, .. } | ButtonBinding::Control { pool_id: id, .. } => {
                *id != pool_id
            }
        });
    }
}
