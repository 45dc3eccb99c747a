//! Contracts the pipeline dispatches to. Implementations live with the
//! simulation collaborator; the kernel never looks inside them.

use std::sync::Arc;

use parking_lot::Mutex;
use shardloop_common::EntityId;

use crate::error::UpdateError;

/// A map instance the world registry may flag as active.
pub trait GameMap: Send {
    /// Whether the map currently needs simulating.
    fn is_active(&self) -> bool;

    /// Advance the map by one tick. Must not block.
    fn update(&mut self) -> Result<(), UpdateError>;

    /// Name used in diagnostics.
    fn name(&self) -> String {
        String::from("<unnamed>")
    }
}

/// A live simulated entity owned by a session.
pub trait Entity: Send {
    fn id(&self) -> EntityId;

    /// Advance the entity by one tick. Must not block.
    fn update(&mut self) -> Result<(), UpdateError>;
}

/// A connected client's server-side state.
pub trait Session: Send {
    /// The entity this session controls, if one is attached right now.
    fn attached_entity(&mut self) -> Option<&mut (dyn Entity + 'static)>;
}

/// Map handle shared between the registry owner and the scheduler.
pub type SharedMap = Arc<Mutex<dyn GameMap>>;

/// Session handle shared between the network collaborator and the scheduler.
pub type SharedSession = Arc<Mutex<dyn Session>>;
