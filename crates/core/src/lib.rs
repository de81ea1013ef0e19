//! Swarmfront Core - Swarm Combat Simulation
//!
//! Frame-driven simulation of a descending alien swarm: a formation that
//! sweeps side to side and drops toward the player, back-row divers that
//! strafe, destructible barriers, and projectile collision. Rendering,
//! audio and input devices live outside this crate and talk to it through
//! [`input::PlayerInput`], [`view::ViewBinding`] and
//! [`simulation::SimulationEvent`].
//!
//! # Determinism Rules
//!
//! 1. No thread RNG - every random draw goes through [`random::RandomSource`]
//! 2. No system time - the caller passes `dt`, the driver sums game time
//! 3. Ordered iteration - `Vec` storage for entities, cells and projectiles
//! 4. No async - pure synchronous logic

pub mod barrier;
pub mod collision;
pub mod config;
pub mod difficulty;
pub mod entities;
pub mod formation;
pub mod input;
pub mod physics;
pub mod random;
pub mod simulation;
pub mod view;

pub use barrier::Barrier;
pub use config::{ConfigError, SwarmConfig};
pub use difficulty::Difficulty;
pub use entities::{Entity, EntityIndex, EntityKind, MotionState};
pub use formation::{Formation, FormationPhase};
pub use input::PlayerInput;
pub use random::{RandomSource, SeededRandom};
pub use simulation::{Simulation, SimulationError, SimulationEvent, SimulationPhase};
pub use view::{ViewBinding, ViewHandle};
