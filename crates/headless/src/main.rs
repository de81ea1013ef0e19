//! Swarmfront Headless - frame driver without a renderer
//!
//! Runs the simulation at a fixed 60 Hz with a simple autopilot and logs
//! every event. Useful for soak runs and for checking replays.
//!
//! Usage: `swarmfront-headless [SEED] [WAVES]`

use anyhow::Result;
use clap::Parser;
use glam::Vec3;
use swarmfront_core::{
    EntityIndex, PlayerInput, Simulation, SimulationEvent, SimulationPhase, SwarmConfig,
    ViewBinding, ViewHandle,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DT: f32 = 1.0 / 60.0;
/// Ten simulated minutes per wave is plenty.
const MAX_FRAMES_PER_WAVE: u32 = 60 * 60 * 10;

/// Runs the swarm simulation without a renderer
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Seed for the simulation's random source
    #[arg(default_value_t = 12345)]
    seed: u32,

    /// Waves to play before stopping
    #[arg(default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    waves: u32,
}

/// Counts view traffic instead of drawing it.
#[derive(Debug, Default)]
struct CountingView {
    placed: u64,
    hidden: u64,
    released_entities: u64,
    released_cells: u64,
    released_projectiles: u64,
}

impl ViewBinding for CountingView {
    fn place(&mut self, _handle: ViewHandle, _position: Vec3, _tilt: f32, _brightness: f32) {
        self.placed += 1;
    }

    fn set_visible(&mut self, _handle: ViewHandle, visible: bool) {
        if !visible {
            self.hidden += 1;
        }
    }

    fn release(&mut self, handle: ViewHandle) {
        match handle {
            ViewHandle::Entity(_) => self.released_entities += 1,
            ViewHandle::BarrierCell { .. } => self.released_cells += 1,
            ViewHandle::Projectile(_) => self.released_projectiles += 1,
        }
    }
}

/// Tracks the closest threat, aims at it and keeps firing.
struct Autopilot {
    x: f32,
    speed: f32,
}

impl Autopilot {
    fn new() -> Self {
        Self { x: 0.0, speed: 14.0 }
    }

    fn steer(&mut self, sim: &Simulation) -> PlayerInput {
        let target = sim
            .state
            .formation
            .entities()
            .iter()
            .filter(|e| e.alive)
            .min_by(|a, b| a.position.z.total_cmp(&b.position.z))
            .map(|e| e.position);

        let Some(target) = target else {
            return PlayerInput::new(self.x, 0.0);
        };

        let step = self.speed * DT;
        self.x += (target.x - self.x).clamp(-step, step);
        let pitch = PlayerInput::pitch_toward(sim.state.player.position, target);
        PlayerInput::new(self.x, 0.0).with_pitch(pitch).firing(true)
    }
}

fn log_event(event: &SimulationEvent) {
    match event {
        SimulationEvent::ShotFired { .. } => {}
        SimulationEvent::DiveStarted { entity: EntityIndex(i) } => debug!(entity = i, "dive"),
        SimulationEvent::EntityKilled {
            entity: EntityIndex(i),
            points,
            was_diving,
            ..
        } => debug!(entity = i, points, was_diving, "kill"),
        SimulationEvent::BarrierHit {
            barrier,
            destroyed,
            by_player,
            ..
        } => debug!(barrier, destroyed, by_player, "barrier hit"),
        SimulationEvent::PlayerHit { health, .. } => warn!(health, "player hit"),
        other => info!(?other, "event"),
    }
}

fn main() -> Result<()> {
    let Args { seed, waves } = Args::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("swarmfront=debug".parse()?))
        .init();

    info!(seed, waves, "Starting Swarmfront (headless)");

    let mut sim = Simulation::new(SwarmConfig::default(), seed)?;
    let mut view = CountingView::default();
    let mut pilot = Autopilot::new();
    let mut wave_frames = 0;

    loop {
        let input = pilot.steer(&sim);
        for event in sim.tick(DT, input) {
            log_event(&event);
        }
        sim.sync_view(&mut view);
        wave_frames += 1;

        match sim.phase() {
            SimulationPhase::GameOver => break,
            SimulationPhase::WaveCleared if sim.state.wave >= waves => break,
            SimulationPhase::WaveCleared => {
                sim.next_wave();
                wave_frames = 0;
            }
            _ if wave_frames >= MAX_FRAMES_PER_WAVE => {
                warn!(wave = sim.state.wave, "wave did not finish, stopping");
                break;
            }
            _ => {}
        }
    }

    let snapshot = sim.snapshot()?;
    info!(
        frames = sim.frame(),
        wave = sim.state.wave,
        score = sim.state.player.score,
        health = sim.state.player.health,
        snapshot_bytes = snapshot.len(),
        "run finished"
    );
    info!(?view, "view traffic");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_default_when_omitted() {
        let args = Args::try_parse_from(["swarmfront-headless"]).unwrap();
        assert_eq!((args.seed, args.waves), (12345, 3));
    }

    #[test]
    fn args_parse_positionals() {
        let args = Args::try_parse_from(["swarmfront-headless", "7", "5"]).unwrap();
        assert_eq!((args.seed, args.waves), (7, 5));
    }

    #[test]
    fn zero_waves_is_rejected() {
        assert!(Args::try_parse_from(["swarmfront-headless", "7", "0"]).is_err());
        assert!(Args::try_parse_from(["swarmfront-headless", "seed"]).is_err());
    }
}
