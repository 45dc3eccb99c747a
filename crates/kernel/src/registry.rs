//! Registries for the two collections the pipeline iterates.
//!
//! Both are cheap clonable handles. Structural mutation takes the write lock;
//! the pipeline takes a snapshot under the read lock at the top of each tick,
//! so an iteration never observes a half-applied insert or removal.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use shardloop_common::{MapIndex, SessionId};

use crate::contract::{GameMap, Session, SharedMap, SharedSession};

/// Slot arena of maps with stable indices.
///
/// Removing a map leaves its slot empty; indices of other maps never shift.
#[derive(Clone, Default)]
pub struct MapRegistry {
    slots: Arc<RwLock<Vec<Option<SharedMap>>>>,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-sized with `capacity` empty slots.
    pub fn with_slots(capacity: usize) -> Self {
        Self {
            slots: Arc::new(RwLock::new(vec![None; capacity])),
        }
    }

    /// Place a map in the first empty slot (appending if none). Returns its index.
    pub fn insert<M: GameMap + 'static>(&self, map: M) -> MapIndex {
        self.insert_shared(Arc::new(Mutex::new(map)))
    }

    pub fn insert_shared(&self, map: SharedMap) -> MapIndex {
        let mut slots = self.slots.write();
        let index = match slots.iter().position(Option::is_none) {
            Some(free) => {
                slots[free] = Some(map);
                free
            }
            None => {
                slots.push(Some(map));
                slots.len() - 1
            }
        };
        tracing::debug!(index, "map registered");
        MapIndex(index)
    }

    /// Put a map at a specific index, growing the arena if needed.
    /// Returns the map previously in that slot.
    pub fn insert_at<M: GameMap + 'static>(&self, index: MapIndex, map: M) -> Option<SharedMap> {
        let mut slots = self.slots.write();
        if index.0 >= slots.len() {
            slots.resize(index.0 + 1, None);
        }
        slots[index.0].replace(Arc::new(Mutex::new(map)))
    }

    pub fn remove(&self, index: MapIndex) -> Option<SharedMap> {
        let removed = self.slots.write().get_mut(index.0).and_then(Option::take);
        if removed.is_some() {
            tracing::debug!(%index, "map removed");
        }
        removed
    }

    pub fn get(&self, index: MapIndex) -> Option<SharedMap> {
        self.slots.read().get(index.0).and_then(Clone::clone)
    }

    /// Number of slots, empty ones included.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots holding a map.
    pub fn occupied(&self) -> usize {
        self.slots.read().iter().flatten().count()
    }

    /// Number of maps currently flagged active. Locks each map briefly.
    pub fn active_count(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|(_, map)| map.lock().is_active())
            .count()
    }

    /// Occupied slots in index order, detached from the registry lock.
    pub fn snapshot(&self) -> Vec<(MapIndex, SharedMap)> {
        self.slots
            .read()
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|map| (MapIndex(i), Arc::clone(map))))
            .collect()
    }
}

#[derive(Default)]
struct SessionTable {
    next_id: u64,
    sessions: Vec<(SessionId, SharedSession)>,
}

/// Connected sessions in connection order.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    table: Arc<RwLock<SessionTable>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session after a successful handshake.
    pub fn connect<S: Session + 'static>(&self, session: S) -> SessionId {
        self.connect_shared(Arc::new(Mutex::new(session)))
    }

    pub fn connect_shared(&self, session: SharedSession) -> SessionId {
        let mut table = self.table.write();
        table.next_id += 1;
        let id = SessionId(table.next_id);
        table.sessions.push((id, session));
        tracing::debug!(%id, connected = table.sessions.len(), "session connected");
        id
    }

    /// Drop a session on disconnect or timeout. Order of the rest is kept.
    pub fn disconnect(&self, id: SessionId) -> Option<SharedSession> {
        let mut table = self.table.write();
        let pos = table.sessions.iter().position(|(sid, _)| *sid == id)?;
        let (_, session) = table.sessions.remove(pos);
        tracing::debug!(%id, connected = table.sessions.len(), "session disconnected");
        Some(session)
    }

    pub fn get(&self, id: SessionId) -> Option<SharedSession> {
        self.table
            .read()
            .sessions
            .iter()
            .find(|(sid, _)| *sid == id)
            .map(|(_, session)| Arc::clone(session))
    }

    pub fn len(&self) -> usize {
        self.table.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.table.read().sessions.iter().map(|(id, _)| *id).collect()
    }

    /// Sessions in connection order, detached from the registry lock.
    pub fn snapshot(&self) -> Vec<(SessionId, SharedSession)> {
        self.table
            .read()
            .sessions
            .iter()
            .map(|(id, session)| (*id, Arc::clone(session)))
            .collect()
    }
}
