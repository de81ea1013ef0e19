//! Swarm entities and projectiles.
//!
//! Entities live in a `Vec` owned by the formation and are addressed by
//! [`EntityIndex`]. A kill only clears `alive`; storage never shrinks
//! mid-wave, so column/row lookups and projectile back-references stay valid.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::physics::PlayVolume;

/// Stable index of an entity within its formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityIndex(pub usize);

/// Swarm member kind, by distance from the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Front,
    Mid,
    Back,
}

impl EntityKind {
    pub fn points(self) -> u32 {
        match self {
            EntityKind::Front => 10,
            EntityKind::Mid => 20,
            EntityKind::Back => 30,
        }
    }

    /// Only the back kind leaves formation to dive.
    pub fn can_dive(self) -> bool {
        matches!(self, EntityKind::Back)
    }

    /// Kind for a grid row: row 0 is front, the next `mid_rows` are mid.
    pub fn for_row(row: usize, mid_rows: usize) -> Self {
        if row == 0 {
            EntityKind::Front
        } else if row <= mid_rows {
            EntityKind::Mid
        } else {
            EntityKind::Back
        }
    }
}

/// Leg of a dive attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DivePhase {
    Diving,
    Returning,
}

/// Motion sub-state of one entity. Exactly one applies at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MotionState {
    /// Position follows the formation transform.
    Formation,
    /// Wave intro flight from an off-field spawn point.
    FlyingIn {
        start: Vec3,
        target: Vec3,
        delay: f32,
        duration: f32,
        elapsed: f32,
        progress: f32,
    },
    /// Dive attack or the return leg of one.
    Diving {
        phase: DivePhase,
        start: Vec3,
        target_x: f32,
        /// Travel distance of the current leg.
        distance: f32,
        progress: f32,
        last_shot_time: Option<f32>,
    },
    /// Invasion landing toward a ground slot.
    Landing {
        start: Vec3,
        target: Vec3,
        delay: f32,
        duration: f32,
        elapsed: f32,
        progress: f32,
    },
}

impl MotionState {
    pub fn is_formation(&self) -> bool {
        matches!(self, MotionState::Formation)
    }

    /// Diving or returning.
    pub fn is_diving(&self) -> bool {
        matches!(self, MotionState::Diving { .. })
    }

    pub fn is_flying_in(&self) -> bool {
        matches!(self, MotionState::FlyingIn { .. })
    }

    pub fn is_landing(&self) -> bool {
        matches!(self, MotionState::Landing { .. })
    }

    pub fn dive_phase(&self) -> Option<DivePhase> {
        match self {
            MotionState::Diving { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Progress of the active choreographed motion, `None` in formation.
    pub fn progress(&self) -> Option<f32> {
        match self {
            MotionState::Formation => None,
            MotionState::FlyingIn { progress, .. }
            | MotionState::Diving { progress, .. }
            | MotionState::Landing { progress, .. } => Some(*progress),
        }
    }
}

/// One swarm member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub column: usize,
    pub row: usize,
    pub alive: bool,
    pub brightness: f32,
    pub position: Vec3,
    /// Cosmetic bank angle in radians.
    pub tilt: f32,
    pub motion: MotionState,
}

impl Entity {
    pub fn new(kind: EntityKind, column: usize, row: usize, position: Vec3) -> Self {
        Self {
            kind,
            column,
            row,
            alive: true,
            brightness: 1.0,
            position,
            tilt: 0.0,
            motion: MotionState::Formation,
        }
    }

    pub fn points(&self) -> u32 {
        self.kind.points()
    }

    /// Alive, back kind, and sitting in formation.
    pub fn can_start_dive(&self) -> bool {
        self.alive && self.kind.can_dive() && self.motion.is_formation()
    }

    /// Alive and actively diving or returning.
    pub fn is_diving(&self) -> bool {
        self.alive && self.motion.is_diving()
    }
}

/// Who fired a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    Player,
    Swarm,
}

/// Unique projectile identifier within a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectileId(pub u32);

/// A shot moving at constant velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: ProjectileId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub owner: Owner,
    pub radius: f32,
    /// Firing entity, if a swarm member fired it. Not an ownership link.
    pub source: Option<EntityIndex>,
    pub spent: bool,
}

impl Projectile {
    pub fn new(id: ProjectileId, request: &ShotRequest, radius: f32) -> Self {
        Self {
            id,
            position: request.origin,
            velocity: request.velocity,
            owner: request.owner,
            radius,
            source: request.source,
            spent: false,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.position += self.velocity * dt;
    }

    pub fn is_out_of_bounds(&self, volume: &PlayVolume) -> bool {
        !volume.contains(self.position)
    }
}

/// A shot the caller should spawn as a [`Projectile`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotRequest {
    pub origin: Vec3,
    pub velocity: Vec3,
    pub owner: Owner,
    pub source: Option<EntityIndex>,
}

/// Hands out projectile ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectileIdGenerator {
    next_id: u32,
}

impl ProjectileIdGenerator {
    pub fn next(&mut self) -> ProjectileId {
        let id = ProjectileId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }
}
