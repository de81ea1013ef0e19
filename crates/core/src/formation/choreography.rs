//! Wave intro and invasion landing.
//!
//! Both sequences are driven by per-entity accumulated time compared against
//! a start delay and a flight duration, so completion depends only on the
//! summed `dt`, never on frame boundaries.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{bank, slot_position, Formation, FormationPhase};
use crate::entities::MotionState;
use crate::physics::{decaying_wave, ease_out_cubic, ease_out_quad, half_sine};
use crate::random::RandomSource;

/// Off-field side an entity flies in from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnSide {
    Left,
    Right,
    Above,
}

impl SpawnSide {
    const ALL: [SpawnSide; 3] = [SpawnSide::Left, SpawnSide::Right, SpawnSide::Above];

    fn pick(weights: &[f32; 3], rng: &mut impl RandomSource) -> Self {
        rng.weighted(weights)
            .map_or(SpawnSide::Above, |i| Self::ALL[i])
    }
}

impl Formation {
    /// Sends every alive entity off-field and starts the fly-in.
    ///
    /// Back rows launch first; each entity gets a small random extra delay.
    pub fn begin_intro(&mut self, rng: &mut impl RandomSource) {
        let grid = &self.config.grid;
        let intro = &self.config.intro;
        let boundary = self.config.sweep.field_boundary;

        for entity in self.entities.iter_mut().filter(|e| e.alive) {
            let target = slot_position(grid, &self.transform, entity.column, entity.row);
            let start = match SpawnSide::pick(&intro.spawn_weights, rng) {
                SpawnSide::Left => Vec3::new(
                    -boundary - intro.spawn_distance,
                    target.y + rng.range(0.0, intro.spawn_rise),
                    target.z + rng.range(-intro.spawn_depth_scatter, intro.spawn_depth_scatter),
                ),
                SpawnSide::Right => Vec3::new(
                    boundary + intro.spawn_distance,
                    target.y + rng.range(0.0, intro.spawn_rise),
                    target.z + rng.range(-intro.spawn_depth_scatter, intro.spawn_depth_scatter),
                ),
                SpawnSide::Above => Vec3::new(
                    target.x + rng.range(-intro.spawn_lateral_scatter, intro.spawn_lateral_scatter),
                    intro.spawn_height,
                    target.z + intro.spawn_distance,
                ),
            };

            let rows_behind = grid.rows.saturating_sub(1 + entity.row);
            let delay = rows_behind as f32 * intro.row_stagger + rng.range(0.0, intro.jitter);
            let duration = start.distance(target) / intro.fly_in_speed;

            entity.position = start;
            entity.tilt = 0.0;
            entity.motion = MotionState::FlyingIn {
                start,
                target,
                delay,
                duration,
                elapsed: 0.0,
                progress: 0.0,
            };
        }

        self.phase = FormationPhase::Intro;
        self.refresh_brightness();
        info!(entities = self.alive_count(), "intro started");
    }

    /// Advances the fly-in. Returns true once every entity has arrived; the
    /// formation then enters the battle phase.
    pub fn advance_intro(&mut self, dt: f32) -> bool {
        if self.phase != FormationPhase::Intro {
            return self.phase != FormationPhase::Idle;
        }

        let mut all_arrived = true;
        for entity in self.entities.iter_mut().filter(|e| e.alive) {
            let MotionState::FlyingIn {
                start,
                target,
                delay,
                duration,
                elapsed,
                progress,
            } = &mut entity.motion
            else {
                continue;
            };

            *elapsed += dt;
            if *elapsed >= *delay + *duration {
                entity.position = *target;
                entity.motion = MotionState::Formation;
                continue;
            }

            all_arrived = false;
            let local = *elapsed - *delay;
            if local <= 0.0 {
                continue;
            }
            *progress = (local / *duration).min(1.0);
            entity.position = start.lerp(*target, ease_out_quad(*progress));
        }

        if all_arrived {
            self.phase = FormationPhase::Battle;
            self.refresh_brightness();
            info!("intro complete");
        }
        all_arrived
    }

    /// Starts the invasion landing for every alive entity.
    ///
    /// Landing slots are spread across the field in current lateral order.
    /// Each entity waits in proportion to its current depth, so the closest
    /// start first.
    pub fn begin_landing(&mut self, rng: &mut impl RandomSource) {
        let landing = &self.config.landing;
        let boundary = self.config.sweep.field_boundary;
        let ground = self.config.grid.entity_radius;

        let mut order: Vec<usize> = (0..self.entities.len())
            .filter(|&i| self.entities[i].alive)
            .collect();
        order.sort_by(|&a, &b| {
            self.entities[a]
                .position
                .x
                .total_cmp(&self.entities[b].position.x)
        });

        let count = order.len();
        let mut finish: f32 = 0.0;
        for (slot, &i) in order.iter().enumerate() {
            let x = if count > 1 {
                -boundary + 2.0 * boundary * slot as f32 / (count - 1) as f32
            } else {
                0.0
            };
            let z = landing.landing_z + rng.range(-landing.depth_jitter, landing.depth_jitter);
            let entity = &mut self.entities[i];
            let start = entity.position;
            let delay = start.z.max(0.0) * landing.delay_per_depth;

            entity.motion = MotionState::Landing {
                start,
                target: Vec3::new(x, ground, z),
                delay,
                duration: landing.duration,
                elapsed: 0.0,
                progress: 0.0,
            };
            finish = finish.max(delay + landing.duration);
        }

        self.choreography_elapsed = 0.0;
        self.choreography_finish = finish + landing.settle_delay;
        self.phase = FormationPhase::Landing;
        self.refresh_brightness();
        info!(entities = count, "landing started");
    }

    /// Advances the landing. Returns true once every entity has touched down
    /// and the settle delay has passed.
    pub fn advance_landing(&mut self, dt: f32) -> bool {
        match self.phase {
            FormationPhase::Landed => return true,
            FormationPhase::Landing => {}
            _ => return false,
        }

        let landing = &self.config.landing;
        let dive = &self.config.dive;
        self.choreography_elapsed += dt;

        for entity in self.entities.iter_mut().filter(|e| e.alive) {
            let MotionState::Landing {
                start,
                target,
                delay,
                duration,
                elapsed,
                progress,
            } = &mut entity.motion
            else {
                continue;
            };

            *elapsed += dt;
            if *elapsed >= *delay + *duration {
                if *progress < 1.0 {
                    debug!(column = entity.column, row = entity.row, "entity landed");
                }
                *progress = 1.0;
                entity.position = *target;
                entity.tilt = 0.0;
                continue;
            }

            let local = *elapsed - *delay;
            if local <= 0.0 {
                continue;
            }
            let t = (local / *duration).min(1.0);
            *progress = t;

            let mut position = start.lerp(*target, ease_out_cubic(t));
            position.y += half_sine(t) * landing.bump_height * (1.0 - t);
            position.x += decaying_wave(t, landing.wobble_cycles, landing.wobble_amplitude);

            let previous_x = entity.position.x;
            entity.position = position;
            entity.tilt = bank(previous_x, position.x, dt, dive);
        }

        if self.choreography_elapsed >= self.choreography_finish {
            self.phase = FormationPhase::Landed;
            info!("landing complete");
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SwarmConfig;
    use crate::difficulty::Difficulty;
    use crate::entities::EntityIndex;
    use crate::random::{ScriptedRandom, SeededRandom};
    use approx::assert_relative_eq;

    fn formation() -> Formation {
        Formation::new(SwarmConfig::default(), Difficulty::for_wave(1))
    }

    #[test]
    fn intro_starts_off_field() {
        let mut f = formation();
        f.begin_intro(&mut SeededRandom::new(5));
        assert_eq!(f.phase(), FormationPhase::Intro);
        let boundary = f.config().sweep.field_boundary;
        for e in f.entities() {
            assert!(e.motion.is_flying_in());
            let p = e.position;
            let off_side = p.x.abs() > boundary;
            let above = p.y >= f.config().intro.spawn_height;
            assert!(off_side || above);
        }
    }

    #[test]
    fn back_rows_launch_first() {
        let mut f = formation();
        f.begin_intro(&mut ScriptedRandom::constant(0.5));
        let delay = |row: usize| match f.entity(f.index_of(0, row).unwrap()).unwrap().motion {
            MotionState::FlyingIn { delay, .. } => delay,
            _ => panic!("not flying in"),
        };
        assert!(delay(4) < delay(0));
    }

    #[test]
    fn spawn_side_follows_weights() {
        let weights = [0.35, 0.35, 0.30];
        assert_eq!(SpawnSide::pick(&weights, &mut ScriptedRandom::constant(0.1)), SpawnSide::Left);
        assert_eq!(SpawnSide::pick(&weights, &mut ScriptedRandom::constant(0.5)), SpawnSide::Right);
        assert_eq!(SpawnSide::pick(&weights, &mut ScriptedRandom::constant(0.9)), SpawnSide::Above);
    }

    #[test]
    fn spawn_scatter_comes_from_config() {
        let mut config = SwarmConfig::default();
        config.intro.spawn_rise = 0.0;
        config.intro.spawn_depth_scatter = 0.0;
        config.intro.spawn_lateral_scatter = 0.0;
        let boundary = config.sweep.field_boundary;
        let mut f = Formation::new(config, Difficulty::for_wave(1));
        f.begin_intro(&mut SeededRandom::new(17));

        for e in f.entities() {
            let MotionState::FlyingIn { start, target, .. } = e.motion else {
                panic!("not flying in");
            };
            if start.x.abs() > boundary {
                assert_eq!((start.y, start.z), (target.y, target.z));
            } else {
                assert_eq!(start.x, target.x);
            }
        }
    }

    #[test]
    fn intro_ends_on_slots() {
        let mut f = formation();
        f.begin_intro(&mut SeededRandom::new(11));
        let mut done = false;
        for _ in 0..1000 {
            if f.advance_intro(1.0 / 60.0) {
                done = true;
                break;
            }
        }
        assert!(done);
        assert_eq!(f.phase(), FormationPhase::Battle);
        for i in 0..f.total_count() {
            let e = f.entity(EntityIndex(i)).unwrap();
            assert!(e.motion.is_formation());
            assert_eq!(e.position, f.slot_of(EntityIndex(i)).unwrap());
        }
    }

    #[test]
    fn landing_reaches_ground_then_settles() {
        let mut f = formation();
        f.begin_battle();
        f.kill(EntityIndex(0));
        f.begin_landing(&mut SeededRandom::new(3));
        assert_eq!(f.phase(), FormationPhase::Landing);
        assert!(!f.entities()[0].motion.is_landing());

        let settle = f.config().landing.settle_delay;
        let mut landed_at = None;
        let mut complete_at = None;
        let mut time = 0.0;
        for _ in 0..2000 {
            time += 1.0 / 60.0;
            let done = f.advance_landing(1.0 / 60.0);
            let all_down = f
                .entities()
                .iter()
                .filter(|e| e.alive)
                .all(|e| e.motion.progress() == Some(1.0));
            if all_down && landed_at.is_none() {
                landed_at = Some(time);
            }
            if done {
                complete_at = Some(time);
                break;
            }
        }

        let (landed_at, complete_at) = (landed_at.unwrap(), complete_at.unwrap());
        assert!(complete_at - landed_at >= settle - 1.0 / 30.0);
        assert_eq!(f.phase(), FormationPhase::Landed);
        let ground = f.config().grid.entity_radius;
        for e in f.entities().iter().filter(|e| e.alive) {
            assert_eq!(e.position.y, ground);
        }
        assert!(f.advance_landing(1.0 / 60.0));
    }

    #[test]
    fn landing_delay_follows_depth() {
        let mut f = formation();
        f.begin_battle();
        f.begin_landing(&mut ScriptedRandom::constant(0.5));
        let per_depth = f.config().landing.delay_per_depth;
        for e in f.entities() {
            let MotionState::Landing { start, delay, .. } = e.motion else {
                panic!("not landing");
            };
            assert_relative_eq!(delay, start.z * per_depth);
        }
    }

    #[test]
    fn landing_slots_are_spread() {
        let mut f = formation();
        f.begin_battle();
        f.begin_landing(&mut ScriptedRandom::constant(0.5));
        let mut xs: Vec<f32> = f
            .entities()
            .iter()
            .filter_map(|e| match e.motion {
                MotionState::Landing { target, .. } => Some(target.x),
                _ => None,
            })
            .collect();
        xs.sort_by(f32::total_cmp);
        xs.dedup();
        assert_eq!(xs.len(), f.total_count());
    }
}
