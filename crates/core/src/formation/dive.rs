//! Dive attacks.
//!
//! A back-kind entity leaves its slot, swoops toward the player's lane down
//! to the retreat depth, then flies back to wherever its slot has moved to.

use glam::Vec3;
use tracing::debug;

use super::{bank, slot_position, Formation};
use crate::config::DiveConfig;
use crate::entities::{DivePhase, EntityIndex, MotionState, Owner, ShotRequest};
use crate::physics::{decaying_wave, half_sine, lerp};
use crate::random::RandomSource;

/// Travel below this counts as "already there".
const MIN_TRAVEL: f32 = 1e-4;

/// Position along the dive leg at progress `t`.
///
/// Depth runs linearly to the retreat line, height descends toward the
/// floor under a half-sine arc, and x weaves toward the target lane.
pub fn dive_position(config: &DiveConfig, start: Vec3, target_x: f32, t: f32) -> Vec3 {
    let t = t.clamp(0.0, 1.0);
    Vec3::new(
        lerp(start.x, target_x, t) + decaying_wave(t, config.wave_cycles, config.wave_amplitude),
        lerp(start.y, config.floor_height, t) + half_sine(t) * config.arc_height,
        lerp(start.z, config.retreat_z, t),
    )
}

impl Formation {
    /// Back-kind entities that may be sent on a dive right now.
    pub fn dive_candidates(&self) -> Vec<EntityIndex> {
        self.entities
            .iter()
            .enumerate()
            .filter(|(_, e)| e.can_start_dive())
            .map(|(i, _)| EntityIndex(i))
            .collect()
    }

    /// At least one alive non-back entity is still in formation or flight.
    pub fn has_escort(&self) -> bool {
        self.entities
            .iter()
            .any(|e| e.alive && !e.kind.can_dive() && !e.motion.is_diving())
    }

    /// Sends an entity on a dive toward `player_x`.
    ///
    /// A no-op returning `false` when the entity is unknown, dead, not back
    /// kind, already out of formation, or when no escort would remain.
    pub fn start_dive(&mut self, index: EntityIndex, player_x: f32) -> bool {
        let can = self.entity(index).is_some_and(|e| e.can_start_dive());
        if !can || !self.has_escort() {
            return false;
        }

        let dive = &self.config.dive;
        let entity = &mut self.entities[index.0];
        let start = entity.position;
        let end = Vec3::new(player_x, dive.floor_height, dive.retreat_z);
        let distance = start.distance(end);

        entity.motion = MotionState::Diving {
            phase: DivePhase::Diving,
            start,
            target_x: player_x,
            distance,
            progress: 0.0,
            last_shot_time: None,
        };
        debug!(entity = index.0, target_x = player_x, "dive started");

        // Nothing to travel, or already on the retreat line.
        if distance <= MIN_TRAVEL || start.z <= dive.retreat_z {
            self.begin_return(index.0);
        }
        true
    }

    /// Switches an entity to the return leg from its current position.
    fn begin_return(&mut self, index: usize) {
        let grid = &self.config.grid;
        let entity = &mut self.entities[index];
        let last_shot_time = match entity.motion {
            MotionState::Diving { last_shot_time, .. } => last_shot_time,
            _ => None,
        };
        let slot = slot_position(grid, &self.transform, entity.column, entity.row);
        let distance = entity.position.distance(slot);

        if distance <= MIN_TRAVEL {
            entity.position = slot;
            entity.motion = MotionState::Formation;
            entity.tilt = 0.0;
            return;
        }

        entity.motion = MotionState::Diving {
            phase: DivePhase::Returning,
            start: entity.position,
            target_x: slot.x,
            distance,
            progress: 0.0,
            last_shot_time,
        };
    }

    /// Moves every diver one frame along its leg and queues strafe shots
    /// aimed at the player's current lane.
    pub(super) fn advance_divers(&mut self, dt: f32, player_x: f32, game_time: f32) {
        for i in 0..self.entities.len() {
            if !self.entities[i].alive {
                continue;
            }
            match self.entities[i].motion.dive_phase() {
                Some(DivePhase::Diving) => self.advance_dive_leg(i, dt, player_x, game_time),
                Some(DivePhase::Returning) => self.advance_return_leg(i, dt),
                None => {}
            }
        }
    }

    fn advance_dive_leg(&mut self, index: usize, dt: f32, player_x: f32, game_time: f32) {
        let dive = &self.config.dive;
        let combat = &self.config.combat;
        let strafe_interval = self.difficulty.strafe_interval;
        let entity = &mut self.entities[index];

        let MotionState::Diving {
            start,
            target_x,
            distance,
            progress,
            last_shot_time,
            ..
        } = &mut entity.motion
        else {
            return;
        };

        *progress = (*progress + dt * dive.dive_speed / *distance).min(1.0);
        let t = *progress;
        let previous_x = entity.position.x;
        entity.position = dive_position(dive, *start, *target_x, t);
        entity.tilt = bank(previous_x, entity.position.x, dt, dive);

        let (window_start, window_end) = dive.strafe_window;
        let cooled = last_shot_time.map_or(true, |last| game_time - last >= strafe_interval);
        if (window_start..=window_end).contains(&t) && cooled {
            let aim = Vec3::new(player_x, combat.aim_height, combat.player_depth);
            let direction = (aim - entity.position).normalize_or_zero();
            if direction != Vec3::ZERO {
                *last_shot_time = Some(game_time);
                self.pending_shots.push(ShotRequest {
                    origin: entity.position,
                    velocity: direction * combat.strafe_shot_speed,
                    owner: Owner::Swarm,
                    source: Some(EntityIndex(index)),
                });
            }
        }

        let past_retreat = entity.position.z <= dive.retreat_z;
        if t >= 1.0 || past_retreat {
            if t < 1.0 {
                debug!(entity = index, progress = t, "diver hit retreat line early");
            }
            self.begin_return(index);
        }
    }

    fn advance_return_leg(&mut self, index: usize, dt: f32) {
        let grid = &self.config.grid;
        let dive = &self.config.dive;
        let entity = &mut self.entities[index];
        let slot = slot_position(grid, &self.transform, entity.column, entity.row);

        let MotionState::Diving {
            start,
            distance,
            progress,
            ..
        } = &mut entity.motion
        else {
            return;
        };

        *progress = (*progress + dt * dive.return_speed / *distance).min(1.0);
        let t = *progress;
        if t >= 1.0 {
            entity.position = slot;
            entity.motion = MotionState::Formation;
            entity.tilt = 0.0;
            debug!(entity = index, "diver back in formation");
            return;
        }

        let previous_x = entity.position.x;
        entity.position = start.lerp(slot, t) + Vec3::Y * half_sine(t) * dive.return_arc_height;
        entity.tilt = bank(previous_x, entity.position.x, dt, dive);
    }

    /// Dive timer: on expiry, re-arm with a random interval and, if the cap
    /// and escort rules allow, launch one random candidate.
    pub(super) fn schedule_dives(
        &mut self,
        dt: f32,
        player_x: f32,
        rng: &mut impl RandomSource,
    ) {
        self.dive_timer += dt;
        if self.dive_timer < self.next_dive_in {
            return;
        }
        self.dive_timer = 0.0;
        let (min, max) = self.difficulty.dive_interval;
        self.next_dive_in = rng.range(min, max);

        if self.diving_count() >= self.difficulty.max_divers || !self.has_escort() {
            return;
        }

        let candidates = self.dive_candidates();
        if let Some(pick) = rng.index(candidates.len()) {
            self.start_dive(candidates[pick], player_x);
        }
    }
}
