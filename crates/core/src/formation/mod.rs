//! The swarm formation.
//!
//! Owns every entity of a wave and the shared [`FormationTransform`]. The
//! formation moves in discrete sweep steps: a fixed lateral shift on a timer,
//! bouncing off the field edges with a drop toward the player. Entities in
//! formation are pinned to `grid slot + transform` after every step; divers,
//! fly-ins and landers own their position until they hand back.
//!
//! Sub-modules:
//! - `dive`: dive scheduling, dive/return motion, strafe fire
//! - `choreography`: wave intro fly-in and invasion landing

mod choreography;
mod dive;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{DiveConfig, GridConfig, SwarmConfig};
use crate::difficulty::Difficulty;
use crate::entities::{Entity, EntityIndex, EntityKind, MotionState, Owner, ShotRequest};
use crate::random::RandomSource;

pub use choreography::SpawnSide;

/// Shared movement state of every entity sitting in formation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationTransform {
    pub offset_x: f32,
    /// Depth of row 0. Only ever decreases.
    pub depth_z: f32,
    /// +1 sweeping toward +x, -1 toward -x.
    pub sweep_direction: f32,
    pub move_timer: f32,
    pub move_interval: f32,
}

/// Where the formation is in its wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormationPhase {
    /// Built, not yet animated.
    Idle,
    Intro,
    Battle,
    Landing,
    Landed,
}

/// Facts about a destroyed entity, for scoring and effects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KillRecord {
    pub entity: EntityIndex,
    pub points: u32,
    pub position: Vec3,
    pub was_diving: bool,
}

/// Grid slot of `(column, row)` relative to the formation origin.
pub fn grid_offset(grid: &GridConfig, column: usize, row: usize) -> Vec3 {
    let centre = (grid.columns as f32 - 1.0) * 0.5;
    Vec3::new(
        (column as f32 - centre) * grid.spacing_x,
        grid.base_height + row as f32 * grid.row_rise,
        row as f32 * grid.row_depth,
    )
}

/// World position of a slot under the given transform.
pub fn slot_position(
    grid: &GridConfig,
    transform: &FormationTransform,
    column: usize,
    row: usize,
) -> Vec3 {
    grid_offset(grid, column, row) + Vec3::new(transform.offset_x, 0.0, transform.depth_z)
}

/// The swarm of one wave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formation {
    config: SwarmConfig,
    difficulty: Difficulty,
    entities: Vec<Entity>,
    transform: FormationTransform,
    phase: FormationPhase,
    dive_timer: f32,
    next_dive_in: f32,
    /// Strafe shots queued by divers, drained by [`Formation::fire`].
    pending_shots: Vec<ShotRequest>,
    choreography_elapsed: f32,
    choreography_finish: f32,
}

impl Formation {
    /// Builds a full grid sitting in formation at the start depth.
    pub fn new(config: SwarmConfig, difficulty: Difficulty) -> Self {
        let grid = &config.grid;
        let transform = FormationTransform {
            offset_x: 0.0,
            depth_z: grid.start_depth,
            sweep_direction: 1.0,
            move_timer: 0.0,
            move_interval: difficulty.move_interval_base,
        };

        // Row-major: index = row * columns + column.
        let mut entities = Vec::with_capacity(grid.columns * grid.rows);
        for row in 0..grid.rows {
            for column in 0..grid.columns {
                let kind = EntityKind::for_row(row, grid.mid_rows);
                let position = slot_position(grid, &transform, column, row);
                entities.push(Entity::new(kind, column, row, position));
            }
        }

        let mut formation = Self {
            next_dive_in: difficulty.dive_interval.1,
            config,
            difficulty,
            entities,
            transform,
            phase: FormationPhase::Idle,
            dive_timer: 0.0,
            pending_shots: Vec::new(),
            choreography_elapsed: 0.0,
            choreography_finish: 0.0,
        };
        formation.refresh_brightness();
        formation
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    pub fn difficulty(&self) -> &Difficulty {
        &self.difficulty
    }

    pub fn transform(&self) -> &FormationTransform {
        &self.transform
    }

    pub fn phase(&self) -> FormationPhase {
        self.phase
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, index: EntityIndex) -> Option<&Entity> {
        self.entities.get(index.0)
    }

    pub fn index_of(&self, column: usize, row: usize) -> Option<EntityIndex> {
        let grid = &self.config.grid;
        (column < grid.columns && row < grid.rows).then(|| EntityIndex(row * grid.columns + column))
    }

    pub fn total_count(&self) -> usize {
        self.entities.len()
    }

    pub fn alive_count(&self) -> usize {
        self.entities.iter().filter(|e| e.alive).count()
    }

    pub fn is_cleared(&self) -> bool {
        self.alive_count() == 0
    }

    /// Entities currently diving or returning.
    pub fn diving_count(&self) -> usize {
        self.entities.iter().filter(|e| e.is_diving()).count()
    }

    /// Current formation slot of an entity, whatever its motion state.
    pub fn slot_of(&self, index: EntityIndex) -> Option<Vec3> {
        self.entity(index)
            .map(|e| slot_position(&self.config.grid, &self.transform, e.column, e.row))
    }

    /// Skips the intro and starts the battle with every entity on its slot.
    pub fn begin_battle(&mut self) {
        for i in 0..self.entities.len() {
            if self.entities[i].alive && !self.entities[i].motion.is_diving() {
                self.settle_on_slot(i);
            }
        }
        self.phase = FormationPhase::Battle;
        self.refresh_brightness();
    }

    /// Move interval for the given alive count: the base interval scaled by
    /// the alive fraction, never below `speed_multiplier_min` of the base.
    pub fn move_interval_for(&self, alive: usize) -> f32 {
        let total = self.entities.len().max(1);
        let ratio = alive as f32 / total as f32;
        self.difficulty.move_interval_base * ratio.max(self.config.sweep.speed_multiplier_min)
    }

    /// Advances one battle frame and returns the alive count.
    ///
    /// Runs the sweep timer, dive and return motion, and dive scheduling.
    /// Outside the battle phase this only reports the alive count.
    pub fn advance(
        &mut self,
        dt: f32,
        player_x: f32,
        game_time: f32,
        rng: &mut impl RandomSource,
    ) -> usize {
        let alive = self.alive_count();
        if self.phase != FormationPhase::Battle {
            return alive;
        }

        self.transform.move_interval = self.move_interval_for(alive);
        self.transform.move_timer += dt;
        let interval = self.transform.move_interval;
        if alive > 0 && self.transform.move_timer >= interval {
            // Keep the overshoot; whole missed steps are dropped.
            self.transform.move_timer %= interval;
            self.sweep_step();
        }

        self.advance_divers(dt, player_x, game_time);
        self.schedule_dives(dt, player_x, rng);
        self.refresh_brightness();
        alive
    }

    /// One discrete lateral step with edge bounce.
    fn sweep_step(&mut self) {
        let sweep = &self.config.sweep;
        let t = &mut self.transform;
        t.offset_x += sweep.step_distance * t.sweep_direction;

        if let Some((min_x, max_x)) = self.alive_extent() {
            let boundary = sweep.field_boundary;
            if max_x > boundary || min_x < -boundary {
                let t = &mut self.transform;
                t.sweep_direction = -t.sweep_direction;
                t.depth_z -= sweep.drop_amount;
                t.offset_x += sweep.step_distance * t.sweep_direction;
                debug!(
                    depth_z = t.depth_z,
                    direction = t.sweep_direction,
                    "formation bounced off field edge"
                );
            }
        }

        self.pin_to_slots();
    }

    /// Lateral extent of every alive entity's slot, padded by the entity radius.
    pub fn alive_extent(&self) -> Option<(f32, f32)> {
        let grid = &self.config.grid;
        let r = grid.entity_radius;
        self.entities
            .iter()
            .filter(|e| e.alive)
            .map(|e| slot_position(grid, &self.transform, e.column, e.row).x)
            .fold(None, |acc, x| match acc {
                None => Some((x - r, x + r)),
                Some((lo, hi)) => Some((lo.min(x - r), hi.max(x + r))),
            })
    }

    /// Re-pins every alive entity in formation state to its slot.
    fn pin_to_slots(&mut self) {
        let grid = &self.config.grid;
        for entity in self.entities.iter_mut() {
            if entity.alive && entity.motion.is_formation() {
                entity.position = slot_position(grid, &self.transform, entity.column, entity.row);
                entity.tilt = 0.0;
            }
        }
    }

    fn settle_on_slot(&mut self, index: usize) {
        let grid = &self.config.grid;
        let entity = &mut self.entities[index];
        entity.position = slot_position(grid, &self.transform, entity.column, entity.row);
        entity.motion = MotionState::Formation;
        entity.tilt = 0.0;
    }

    /// Recomputes per-column brightness: 1.0 for the front-most alive
    /// non-diving entity, one step dimmer per such entity ahead, floored.
    /// Divers are always at full brightness and never count as ahead.
    pub fn refresh_brightness(&mut self) {
        let grid = &self.config.grid;
        for column in 0..grid.columns {
            let mut ahead = 0;
            for row in 0..grid.rows {
                let entity = &mut self.entities[row * grid.columns + column];
                if !entity.alive {
                    continue;
                }
                if entity.motion.is_diving() {
                    entity.brightness = 1.0;
                } else {
                    entity.brightness =
                        (1.0 - ahead as f32 * grid.brightness_step).max(grid.brightness_min);
                    ahead += 1;
                }
            }
        }
    }

    /// True if no other alive entity shares the column with a smaller row.
    pub fn is_unobstructed(&self, index: EntityIndex) -> bool {
        let Some(entity) = self.entity(index) else {
            return false;
        };
        let columns = self.config.grid.columns;
        (0..entity.row).all(|row| !self.entities[row * columns + entity.column].alive)
    }

    /// Alive, in formation, and unobstructed toward the player.
    pub fn can_fire(&self, index: EntityIndex) -> bool {
        self.entity(index)
            .is_some_and(|e| e.alive && e.motion.is_formation())
            && self.is_unobstructed(index)
    }

    /// Rolls the formation volley and drains queued dive strafe shots.
    ///
    /// Volley shots keep the shooter's x and drop toward `aim_height` at the
    /// player's depth, so they never track the player laterally.
    pub fn fire(&mut self, player: Vec3, rng: &mut impl RandomSource) -> Vec<ShotRequest> {
        let mut shots = std::mem::take(&mut self.pending_shots);
        if self.phase != FormationPhase::Battle {
            return shots;
        }

        let combat = &self.config.combat;
        let radius = self.config.grid.entity_radius;
        for i in 0..self.entities.len() {
            let index = EntityIndex(i);
            if !self.can_fire(index) {
                continue;
            }
            if !rng.chance(self.difficulty.shoot_chance) {
                continue;
            }

            let origin = self.entities[i].position - Vec3::Z * radius;
            let target = Vec3::new(origin.x, combat.aim_height, player.z);
            let direction = (target - origin).normalize_or_zero();
            if direction == Vec3::ZERO {
                continue;
            }
            shots.push(ShotRequest {
                origin,
                velocity: direction * combat.swarm_shot_speed,
                owner: Owner::Swarm,
                source: Some(index),
            });
        }
        shots
    }

    /// Marks an entity dead. Returns `None` if it was already dead or unknown.
    pub fn kill(&mut self, index: EntityIndex) -> Option<KillRecord> {
        let entity = self.entities.get_mut(index.0)?;
        if !entity.alive {
            return None;
        }
        let record = KillRecord {
            entity: index,
            points: entity.points(),
            position: entity.position,
            was_diving: entity.motion.is_diving(),
        };
        entity.alive = false;
        entity.motion = MotionState::Formation;
        self.refresh_brightness();
        Some(record)
    }

    /// True once any alive entity has crossed the danger line toward the player.
    pub fn has_reached_danger_line(&self) -> bool {
        let danger_z = self.config.sweep.danger_z;
        self.entities
            .iter()
            .any(|e| e.alive && e.position.z <= danger_z)
    }
}

/// Cosmetic bank from lateral velocity.
fn bank(previous_x: f32, x: f32, dt: f32, dive: &DiveConfig) -> f32 {
    if dt <= 0.0 {
        return 0.0;
    }
    (-(x - previous_x) / dt * dive.bank_gain).clamp(-dive.max_tilt, dive.max_tilt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{ScriptedRandom, SeededRandom};
    use approx::assert_relative_eq;

    fn battle() -> Formation {
        let mut f = Formation::new(SwarmConfig::default(), Difficulty::for_wave(1));
        f.begin_battle();
        f
    }

    /// Never rolls a dive or a volley.
    fn quiet() -> ScriptedRandom {
        ScriptedRandom::constant(0.999)
    }

    #[test]
    fn builds_full_grid() {
        let f = battle();
        assert_eq!(f.total_count(), 55);
        assert_eq!(f.alive_count(), 55);
        let front = f.entity(f.index_of(3, 0).unwrap()).unwrap();
        assert_eq!(front.kind, EntityKind::Front);
        assert_eq!((front.column, front.row), (3, 0));
        let back = f.entity(f.index_of(3, 4).unwrap()).unwrap();
        assert_eq!(back.kind, EntityKind::Back);
        assert!(back.position.z > front.position.z);
        assert_eq!(f.index_of(11, 0), None);
    }

    #[test]
    fn sweep_steps_on_interval() {
        let mut f = battle();
        let mut rng = quiet();
        let interval = f.move_interval_for(55);
        f.advance(interval * 0.5, 0.0, 0.0, &mut rng);
        assert_eq!(f.transform().offset_x, 0.0);
        f.advance(interval * 0.6, 0.0, 0.0, &mut rng);
        assert_relative_eq!(f.transform().offset_x, 0.6);

        let slot = f.slot_of(EntityIndex(0)).unwrap();
        assert_eq!(f.entities()[0].position, slot);
    }

    #[test]
    fn sweep_cadence_holds_at_60hz() {
        let mut f = battle();
        let mut rng = quiet();
        let interval = f.move_interval_for(55);
        let mut last = (f.transform().offset_x, f.transform().depth_z);
        let mut steps = 0;
        for _ in 0..3600 {
            f.advance(1.0 / 60.0, 0.0, 0.0, &mut rng);
            let now = (f.transform().offset_x, f.transform().depth_z);
            if now != last {
                steps += 1;
                last = now;
            }
        }
        let expected = (60.0 / interval).round() as usize;
        assert!((expected - 1..=expected).contains(&steps), "{steps} steps");
    }

    #[test]
    fn bounces_and_drops_at_edge() {
        let mut f = battle();
        let mut rng = quiet();
        let start_depth = f.transform().depth_z;
        let boundary = f.config().sweep.field_boundary;

        for _ in 0..200 {
            f.advance(1.0, 0.0, 0.0, &mut rng);
            let (lo, hi) = f.alive_extent().unwrap();
            assert!(hi <= boundary + 1e-4 && lo >= -boundary - 1e-4);
        }
        assert!(f.transform().depth_z < start_depth);
    }

    #[test]
    fn interval_shrinks_with_losses() {
        let mut f = battle();
        let full = f.move_interval_for(f.alive_count());
        for i in 0..30 {
            f.kill(EntityIndex(i));
        }
        assert!(f.move_interval_for(f.alive_count()) < full);
    }

    #[test]
    fn front_row_is_brightest() {
        let f = battle();
        let grid = &f.config().grid;
        let b: Vec<f32> = (0..grid.rows)
            .map(|row| f.entities()[row * grid.columns].brightness)
            .collect();
        assert_eq!(b[0], 1.0);
        assert!(b.windows(2).all(|w| w[0] >= w[1]));
        assert!(b.iter().all(|v| *v >= grid.brightness_min));
    }

    #[test]
    fn killing_front_promotes_next_row() {
        let mut f = battle();
        let front = f.index_of(5, 0).unwrap();
        let second = f.index_of(5, 1).unwrap();
        assert!(!f.is_unobstructed(second));

        let record = f.kill(front).unwrap();
        assert_eq!(record.points, 10);
        assert!(f.is_unobstructed(second));
        assert_eq!(f.entity(second).unwrap().brightness, 1.0);
        assert_eq!(f.kill(front), None);
    }

    #[test]
    fn only_divers_skip_the_dimming() {
        let mut f = Formation::new(SwarmConfig::default(), Difficulty::for_wave(1));
        f.begin_intro(&mut SeededRandom::new(8));
        let step = f.config().grid.brightness_step;
        let brightness = |f: &Formation, row| f.entity(f.index_of(2, row).unwrap()).unwrap().brightness;
        assert_eq!(brightness(&f, 0), 1.0);
        assert_relative_eq!(brightness(&f, 1), 1.0 - step);

        let mut f = battle();
        let diver = f.index_of(2, 4).unwrap();
        assert!(f.start_dive(diver, 0.0));
        f.refresh_brightness();
        assert_eq!(f.entity(diver).unwrap().brightness, 1.0);
        assert_relative_eq!(brightness(&f, 3), 1.0 - 3.0 * step);
    }

    #[test]
    fn bank_scales_with_gain() {
        let mut dive = DiveConfig::default();
        assert_relative_eq!(bank(0.0, 1.0, 1.0, &dive), -dive.bank_gain);
        assert_eq!(bank(0.0, 100.0, 1.0, &dive), -dive.max_tilt);
        dive.bank_gain = 0.0;
        assert_eq!(bank(0.0, 1.0, 1.0, &dive), 0.0);
    }

    #[test]
    fn volley_has_no_lateral_component() {
        let mut f = battle();
        let mut always = ScriptedRandom::constant(0.0);
        let shots = f.fire(Vec3::new(7.0, 1.6, 0.0), &mut always);
        assert_eq!(shots.len(), f.config().grid.columns);
        for shot in &shots {
            assert_eq!(shot.velocity.x, 0.0);
            assert!(shot.velocity.z < 0.0);
            assert_eq!(shot.owner, Owner::Swarm);
            let source = shot.source.unwrap();
            assert_eq!(f.entity(source).unwrap().row, 0);
        }
    }

    #[test]
    fn no_volley_outside_battle() {
        let mut f = Formation::new(SwarmConfig::default(), Difficulty::for_wave(1));
        let mut always = ScriptedRandom::constant(0.0);
        assert!(f.fire(Vec3::ZERO, &mut always).is_empty());
    }

    #[test]
    fn danger_line_after_enough_drops() {
        let mut f = battle();
        let mut rng = quiet();
        assert!(!f.has_reached_danger_line());
        let mut reached = false;
        for _ in 0..5000 {
            f.advance(1.0, 0.0, 0.0, &mut rng);
            if f.has_reached_danger_line() {
                reached = true;
                break;
            }
        }
        assert!(reached);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let mut a = battle();
        let mut b = battle();
        let mut ra = SeededRandom::new(99);
        let mut rb = SeededRandom::new(99);
        for frame in 0..600 {
            let t = frame as f32 / 60.0;
            a.advance(1.0 / 60.0, 2.0, t, &mut ra);
            b.advance(1.0 / 60.0, 2.0, t, &mut rb);
            assert_eq!(a.fire(Vec3::ZERO, &mut ra), b.fire(Vec3::ZERO, &mut rb));
        }
        assert_eq!(a.entities(), b.entities());
    }
}
