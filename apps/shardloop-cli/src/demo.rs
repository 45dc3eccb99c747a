//! Stand-in simulation collaborators so the loop has something to tick.

use shardloop_common::EntityId;
use shardloop_kernel::{Entity, GameMap, Session, UpdateError};

const NPC_CAP: u32 = 16;
const SPAWN_PERIOD: u64 = 50;

pub struct DemoMap {
    name: String,
    active: bool,
    ticks: u64,
    npcs: u32,
    fault_every: Option<u64>,
}

impl DemoMap {
    pub fn new(name: impl Into<String>, active: bool, fault_every: Option<u64>) -> Self {
        Self {
            name: name.into(),
            active,
            ticks: 0,
            npcs: 0,
            fault_every,
        }
    }
}

impl GameMap for DemoMap {
    fn is_active(&self) -> bool {
        self.active
    }

    fn update(&mut self) -> Result<(), UpdateError> {
        self.ticks += 1;
        if self.ticks % SPAWN_PERIOD == 0 && self.npcs < NPC_CAP {
            self.npcs += 1;
            tracing::trace!(map = %self.name, npcs = self.npcs, "npc spawned");
        }
        match self.fault_every {
            Some(n) if n > 0 && self.ticks % n == 0 => Err(UpdateError::simulation(format!(
                "{} spawn group {} has no valid tile",
                self.name, self.npcs
            ))),
            _ => Ok(()),
        }
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Player avatar that regenerates stamina every tick.
pub struct DemoEntity {
    id: EntityId,
    stamina: u32,
    max_stamina: u32,
}

impl DemoEntity {
    pub fn new(max_stamina: u32) -> Self {
        Self {
            id: EntityId::new(),
            stamina: 0,
            max_stamina,
        }
    }
}

impl Entity for DemoEntity {
    fn id(&self) -> EntityId {
        self.id
    }

    fn update(&mut self) -> Result<(), UpdateError> {
        self.stamina = (self.stamina + 1).min(self.max_stamina);
        Ok(())
    }
}

pub struct DemoSession {
    entity: Option<Box<dyn Entity>>,
}

impl DemoSession {
    pub fn in_game() -> Self {
        Self {
            entity: Some(Box::new(DemoEntity::new(100))),
        }
    }

    /// Connected but still on character select.
    pub fn lobby() -> Self {
        Self { entity: None }
    }
}

impl Session for DemoSession {
    fn attached_entity(&mut self) -> Option<&mut (dyn Entity + 'static)> {
        self.entity.as_deref_mut()
    }
}
