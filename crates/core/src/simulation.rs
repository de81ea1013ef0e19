//! Frame driver.
//!
//! Owns one game: the wave's formation, barriers and projectiles, the
//! player's state and the random source. Every frame runs the same fixed
//! order, so a seed plus a sequence of inputs replays exactly.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::barrier::Barrier;
use crate::collision::{self, CollisionOutcome};
use crate::config::{ConfigError, SwarmConfig};
use crate::difficulty::{Difficulty, FIRST_WAVE};
use crate::entities::{
    DivePhase, EntityIndex, Owner, Projectile, ProjectileIdGenerator, ShotRequest,
};
use crate::formation::Formation;
use crate::input::PlayerInput;
use crate::random::SeededRandom;
use crate::view::{ViewBinding, ViewSync};

/// Longest frame the driver will simulate in one step (seconds).
pub const MAX_FRAME_DT: f32 = 0.1;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Where the game is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationPhase {
    Intro,
    Battle,
    /// The swarm crossed the danger line and is touching down.
    Landing,
    /// Waiting for [`Simulation::next_wave`].
    WaveCleared,
    GameOver,
}

/// Something the presentation layer may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationEvent {
    IntroComplete,
    ShotFired {
        owner: Owner,
        position: Vec3,
    },
    DiveStarted {
        entity: EntityIndex,
    },
    EntityKilled {
        entity: EntityIndex,
        position: Vec3,
        points: u32,
        was_diving: bool,
    },
    BarrierHit {
        barrier: usize,
        cell: usize,
        position: Vec3,
        by_player: bool,
        destroyed: usize,
    },
    PlayerHit {
        position: Vec3,
        health: i32,
    },
    DangerLineReached,
    WaveCleared {
        wave: u32,
    },
    LandingComplete,
    GameOver {
        wave: u32,
        score: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub position: Vec3,
    pub health: i32,
    pub score: u32,
    pub fire_cooldown: f32,
}

/// The complete game state: everything needed to simulate the next frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationState {
    pub frame: u32,
    pub wave: u32,
    pub phase: SimulationPhase,
    pub game_time: f32,
    pub formation: Formation,
    pub barriers: Vec<Barrier>,
    pub projectiles: Vec<Projectile>,
    pub player: PlayerState,
    pub rng: SeededRandom,
    pub projectile_ids: ProjectileIdGenerator,
}

impl SimulationState {
    fn spawn(&mut self, shot: &ShotRequest, radius: f32, events: &mut Vec<SimulationEvent>) {
        let id = self.projectile_ids.next();
        self.projectiles.push(Projectile::new(id, shot, radius));
        events.push(SimulationEvent::ShotFired {
            owner: shot.owner,
            position: shot.origin,
        });
    }
}

/// The main simulation engine.
pub struct Simulation {
    pub config: SwarmConfig,
    pub state: SimulationState,
    view: ViewSync,
}

impl Simulation {
    /// Validates the config and starts the first wave.
    pub fn new(config: SwarmConfig, seed: u32) -> Result<Self, SimulationError> {
        config.validate()?;

        let difficulty = Difficulty::for_wave(FIRST_WAVE);
        let combat = &config.combat;
        let state = SimulationState {
            frame: 0,
            wave: FIRST_WAVE,
            phase: SimulationPhase::Intro,
            game_time: 0.0,
            formation: Formation::new(config.clone(), difficulty),
            barriers: Vec::new(),
            projectiles: Vec::with_capacity(64),
            player: PlayerState {
                position: Vec3::new(0.0, combat.aim_height, combat.player_depth),
                health: combat.player_health,
                score: 0,
                fire_cooldown: 0.0,
            },
            rng: SeededRandom::new(seed),
            projectile_ids: ProjectileIdGenerator::default(),
        };

        let mut sim = Self {
            config,
            state,
            view: ViewSync::new(),
        };
        sim.start_wave(FIRST_WAVE);
        Ok(sim)
    }

    /// Rebuilds the formation, barriers and projectiles for `wave` and
    /// starts its intro. Score and health carry over.
    pub fn start_wave(&mut self, wave: u32) {
        let wave = wave.max(FIRST_WAVE);
        let difficulty = Difficulty::for_wave(wave);
        let s = &mut self.state;

        s.wave = wave;
        s.formation = Formation::new(self.config.clone(), difficulty);
        s.formation.begin_intro(&mut s.rng);
        s.barriers = Barrier::row(&self.config.barrier, difficulty.barrier_health);
        s.projectiles.clear();
        s.player.fire_cooldown = 0.0;
        s.phase = SimulationPhase::Intro;

        info!(
            wave,
            shoot_chance = difficulty.shoot_chance,
            max_divers = difficulty.max_divers,
            "wave started"
        );
    }

    /// Starts the following wave once the current one is cleared.
    /// Returns false in any other phase.
    pub fn next_wave(&mut self) -> bool {
        if self.state.phase != SimulationPhase::WaveCleared {
            return false;
        }
        self.start_wave(self.state.wave + 1);
        true
    }

    pub fn phase(&self) -> SimulationPhase {
        self.state.phase
    }

    pub fn frame(&self) -> u32 {
        self.state.frame
    }

    /// Advances one frame. `dt` is clamped to `[0, MAX_FRAME_DT]`.
    pub fn tick(&mut self, dt: f32, input: PlayerInput) -> Vec<SimulationEvent> {
        let mut events = Vec::new();
        if matches!(
            self.state.phase,
            SimulationPhase::WaveCleared | SimulationPhase::GameOver
        ) {
            return events;
        }

        let dt = dt.clamp(0.0, MAX_FRAME_DT);
        self.state.frame += 1;
        self.state.game_time += dt;
        self.update_player(dt, input.x, input.z);

        match self.state.phase {
            SimulationPhase::Intro => {
                if self.state.formation.advance_intro(dt) {
                    self.state.phase = SimulationPhase::Battle;
                    events.push(SimulationEvent::IntroComplete);
                }
                self.update_combat(dt, &input, &mut events);
                self.check_wave_end(&mut events);
            }
            SimulationPhase::Battle => {
                self.update_formation(dt, &mut events);
                self.update_combat(dt, &input, &mut events);
                self.check_wave_end(&mut events);
            }
            SimulationPhase::Landing => {
                if self.state.formation.advance_landing(dt) {
                    events.push(SimulationEvent::LandingComplete);
                    self.end_game(&mut events);
                }
            }
            SimulationPhase::WaveCleared | SimulationPhase::GameOver => {}
        }

        events
    }

    fn update_player(&mut self, dt: f32, x: f32, z: f32) {
        let volume = &self.config.volume;
        let player = &mut self.state.player;
        player.position.x = x.clamp(volume.min.x, volume.max.x);
        player.position.z = z.clamp(volume.min.z, volume.max.z);
        player.fire_cooldown = (player.fire_cooldown - dt).max(0.0);
    }

    fn update_formation(&mut self, dt: f32, events: &mut Vec<SimulationEvent>) {
        let s = &mut self.state;
        let was_diving: Vec<bool> = s.formation.entities().iter().map(|e| e.is_diving()).collect();

        s.formation
            .advance(dt, s.player.position.x, s.game_time, &mut s.rng);

        for (i, entity) in s.formation.entities().iter().enumerate() {
            if entity.motion.dive_phase() == Some(DivePhase::Diving) && !was_diving[i] {
                events.push(SimulationEvent::DiveStarted {
                    entity: EntityIndex(i),
                });
            }
        }

        let shots = s.formation.fire(s.player.position, &mut s.rng);
        for shot in &shots {
            s.spawn(shot, self.config.combat.projectile_radius, events);
        }
    }

    fn update_combat(&mut self, dt: f32, input: &PlayerInput, events: &mut Vec<SimulationEvent>) {
        let combat = &self.config.combat;
        let s = &mut self.state;

        for projectile in &mut s.projectiles {
            projectile.advance(dt);
        }

        if input.fire && s.player.fire_cooldown <= 0.0 {
            s.player.fire_cooldown = combat.player_fire_cooldown;
            let direction = input.aim_direction(combat.max_aim_pitch);
            let shot = ShotRequest {
                origin: s.player.position + direction * combat.player_radius,
                velocity: direction * combat.player_shot_speed,
                owner: Owner::Player,
                source: None,
            };
            s.spawn(&shot, combat.projectile_radius, events);
        }

        let outcome = collision::resolve(
            &mut s.projectiles,
            &mut s.formation,
            &mut s.barriers,
            s.player.position,
            combat,
        );
        self.apply_outcome(outcome, events);
        self.erode_barriers();
        self.cleanup();
    }

    fn apply_outcome(&mut self, outcome: CollisionOutcome, events: &mut Vec<SimulationEvent>) {
        let s = &mut self.state;

        for kill in &outcome.kills {
            s.player.score += kill.points;
            if kill.was_diving {
                // A destroyed diver's strafe shots die with it.
                for shot in s
                    .projectiles
                    .iter_mut()
                    .filter(|p| p.source == Some(kill.entity))
                {
                    shot.spent = true;
                }
            }
            events.push(SimulationEvent::EntityKilled {
                entity: kill.entity,
                position: kill.position,
                points: kill.points,
                was_diving: kill.was_diving,
            });
        }

        for hit in &outcome.barrier_hits {
            events.push(SimulationEvent::BarrierHit {
                barrier: hit.barrier,
                cell: hit.cell,
                position: hit.position,
                by_player: hit.by_player,
                destroyed: hit.destroyed,
            });
        }

        if outcome.player_hit {
            s.player.health -= self.config.combat.swarm_damage;
            debug!(health = s.player.health, "player hit");
            events.push(SimulationEvent::PlayerHit {
                position: s.player.position,
                health: s.player.health,
            });
            if s.player.health <= 0 {
                self.end_game(events);
            }
        }
    }

    /// Swarm members plough through any barrier cells they overlap.
    fn erode_barriers(&mut self) {
        let radius = self.config.grid.entity_radius;
        let s = &mut self.state;
        for entity in s.formation.entities().iter().filter(|e| e.alive) {
            for barrier in s.barriers.iter_mut() {
                let destroyed = barrier.erode_sphere(entity.position, radius);
                if destroyed > 0 {
                    debug!(destroyed, "barrier eroded by swarm");
                }
            }
        }
    }

    /// Drops spent projectiles and ones that left the play volume.
    fn cleanup(&mut self) {
        let volume = &self.config.volume;
        self.state
            .projectiles
            .retain(|p| !p.spent && !p.is_out_of_bounds(volume));
    }

    fn check_wave_end(&mut self, events: &mut Vec<SimulationEvent>) {
        let s = &mut self.state;
        if s.phase == SimulationPhase::GameOver {
            return;
        }

        if s.formation.is_cleared() {
            s.phase = SimulationPhase::WaveCleared;
            info!(wave = s.wave, score = s.player.score, "wave cleared");
            events.push(SimulationEvent::WaveCleared { wave: s.wave });
            return;
        }

        if s.phase == SimulationPhase::Battle && s.formation.has_reached_danger_line() {
            info!(wave = s.wave, "swarm reached the danger line");
            events.push(SimulationEvent::DangerLineReached);
            s.projectiles.clear();
            s.formation.begin_landing(&mut s.rng);
            s.phase = SimulationPhase::Landing;
        }
    }

    fn end_game(&mut self, events: &mut Vec<SimulationEvent>) {
        let s = &mut self.state;
        s.phase = SimulationPhase::GameOver;
        info!(wave = s.wave, score = s.player.score, "game over");
        events.push(SimulationEvent::GameOver {
            wave: s.wave,
            score: s.player.score,
        });
    }

    /// Pushes the current state to a view. Dead entities and cells are
    /// hidden and released once; vanished projectiles are released.
    pub fn sync_view(&mut self, view: &mut impl ViewBinding) {
        let s = &self.state;
        self.view
            .sync(view, s.formation.entities(), &s.barriers, &s.projectiles);
    }

    /// Serializes the complete state for replay.
    pub fn snapshot(&self) -> Result<Vec<u8>, SimulationError> {
        Ok(bincode::serde::encode_to_vec(
            &self.state,
            bincode::config::standard(),
        )?)
    }

    /// Replaces the state with a snapshot taken by [`Simulation::snapshot`].
    pub fn restore(&mut self, data: &[u8]) -> Result<(), SimulationError> {
        let (state, _): (SimulationState, _) =
            bincode::serde::decode_from_slice(data, bincode::config::standard())?;
        self.state = state;
        debug!(frame = self.state.frame, "state restored");
        Ok(())
    }
}
