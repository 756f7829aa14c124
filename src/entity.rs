use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Id carried by the stand-in entity returned for lookups that miss.
pub const PLACEHOLDER_ID: u64 = u64::MAX;
/// Size of the stand-in entity. Chosen so offsets divide cleanly to zero.
pub const PLACEHOLDER_SIZE: f64 = 2.0;

pub type EntityId = u64;

/// One simulated piece of tracked debris.
///
/// `Clone` is the deep copy used for every outbound frame: all fields are
/// plain values, so a clone never aliases the live entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    pub position: DVec2,
    pub velocity: DVec2,
    size: f64,
}

impl Entity {
    pub fn new(id: EntityId, position: DVec2, velocity: DVec2, size: f64) -> Self {
        debug_assert!(size > 0.0, "Entity {} created with non-positive size {}", id, size);
        Self {
            id,
            position,
            velocity,
            size,
        }
    }

    /// The documented stand-in for an id that is not live: origin, at rest.
    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_ID, DVec2::ZERO, DVec2::ZERO, PLACEHOLDER_SIZE)
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn is_placeholder(&self) -> bool {
        self.id == PLACEHOLDER_ID
    }

    /// Advance one tick. Bounds are the field's concern, not ours.
    pub fn step(&mut self) {
        self.position += self.velocity;
    }

    pub fn speed(&self) -> f64 {
        self.velocity.length()
    }
}
