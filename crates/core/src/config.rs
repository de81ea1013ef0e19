//! Simulation configuration.
//!
//! All tuning lives here. Distances are world units (roughly meters), times
//! are seconds. Depth `z` shrinks toward the player.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::physics::PlayVolume;

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("grid must have at least one column and one row (got {columns}x{rows})")]
    EmptyGrid { columns: usize, rows: usize },

    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: f32 },

    #[error("retreat depth {retreat_z} must lie behind the danger line {danger_z}")]
    RetreatPastDangerLine { retreat_z: f32, danger_z: f32 },

    #[error("intro spawn weights must contain a positive entry")]
    NoSpawnWeight,
}

/// Complete configuration for one simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwarmConfig {
    pub grid: GridConfig,
    pub sweep: SweepConfig,
    pub dive: DiveConfig,
    pub intro: IntroConfig,
    pub landing: LandingConfig,
    pub barrier: BarrierConfig,
    pub combat: CombatConfig,
    pub volume: PlayVolume,
}

impl SwarmConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.grid;
        if g.columns == 0 || g.rows == 0 {
            return Err(ConfigError::EmptyGrid {
                columns: g.columns,
                rows: g.rows,
            });
        }

        positive("grid.spacing_x", g.spacing_x)?;
        positive("grid.entity_radius", g.entity_radius)?;
        positive("sweep.step_distance", self.sweep.step_distance)?;
        positive("sweep.field_boundary", self.sweep.field_boundary)?;
        positive("sweep.speed_multiplier_min", self.sweep.speed_multiplier_min)?;
        positive("dive.dive_speed", self.dive.dive_speed)?;
        positive("dive.return_speed", self.dive.return_speed)?;
        positive("intro.fly_in_speed", self.intro.fly_in_speed)?;
        positive("landing.duration", self.landing.duration)?;
        positive("barrier.cell_radius", self.barrier.cell_radius)?;
        positive("combat.swarm_shot_speed", self.combat.swarm_shot_speed)?;
        positive("combat.player_shot_speed", self.combat.player_shot_speed)?;

        if self.dive.retreat_z <= self.sweep.danger_z {
            return Err(ConfigError::RetreatPastDangerLine {
                retreat_z: self.dive.retreat_z,
                danger_z: self.sweep.danger_z,
            });
        }

        if !self.intro.spawn_weights.iter().any(|w| *w > 0.0) {
            return Err(ConfigError::NoSpawnWeight);
        }

        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

/// Grid layout of the swarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub columns: usize,
    pub rows: usize,
    /// Rows after row 0 that hold the mid kind; the rest are back kind.
    pub mid_rows: usize,
    /// Lateral distance between columns.
    pub spacing_x: f32,
    /// Depth added per row (rows recede from the player).
    pub row_depth: f32,
    /// Height added per row.
    pub row_rise: f32,
    /// Height of row 0.
    pub base_height: f32,
    /// Formation depth at wave start.
    pub start_depth: f32,
    /// Hit sphere radius of one entity.
    pub entity_radius: f32,
    /// Brightness lost per entity in front of this one in its column.
    pub brightness_step: f32,
    pub brightness_min: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 11,
            rows: 5,
            mid_rows: 2,
            spacing_x: 3.0,
            row_depth: 3.0,
            row_rise: 1.2,
            base_height: 4.0,
            start_depth: 60.0,
            entity_radius: 1.0,
            brightness_step: 0.18,
            brightness_min: 0.35,
        }
    }
}

/// Discrete sweep movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Lateral distance per sweep step.
    pub step_distance: f32,
    /// Depth lost on each edge bounce.
    pub drop_amount: f32,
    /// Half width of the field; the alive extent must stay within `±field_boundary`.
    pub field_boundary: f32,
    /// Floor for `alive / total` when scaling the move interval.
    pub speed_multiplier_min: f32,
    /// Depth at which the invasion counts as landed (loss).
    pub danger_z: f32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            step_distance: 0.6,
            drop_amount: 1.5,
            field_boundary: 18.0,
            speed_multiplier_min: 0.08,
            danger_z: 10.0,
        }
    }
}

/// Dive-bomb attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiveConfig {
    /// Travel speed along the dive (units/second).
    pub dive_speed: f32,
    /// Travel speed back to the slot.
    pub return_speed: f32,
    /// Divers never pass this depth.
    pub retreat_z: f32,
    /// Height reached at the bottom of the dive.
    pub floor_height: f32,
    pub arc_height: f32,
    pub return_arc_height: f32,
    /// Lateral weave amplitude, decaying over the dive.
    pub wave_amplitude: f32,
    pub wave_cycles: f32,
    /// Progress window in which strafe shots are allowed.
    pub strafe_window: (f32, f32),
    /// Max bank angle (radians), cosmetic.
    pub max_tilt: f32,
    /// Bank angle per unit of lateral speed.
    pub bank_gain: f32,
}

impl Default for DiveConfig {
    fn default() -> Self {
        Self {
            dive_speed: 20.0,
            return_speed: 16.0,
            retreat_z: 14.0,
            floor_height: 1.5,
            arc_height: 4.0,
            return_arc_height: 2.0,
            wave_amplitude: 3.0,
            wave_cycles: 2.0,
            strafe_window: (0.2, 0.8),
            max_tilt: 0.6,
            bank_gain: 0.05,
        }
    }
}

/// Wave intro fly-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntroConfig {
    pub fly_in_speed: f32,
    /// Delay added per row, back rows launching first.
    pub row_stagger: f32,
    /// Upper bound of the per-entity random delay.
    pub jitter: f32,
    /// Weights for spawning left, right and above the field.
    pub spawn_weights: [f32; 3],
    /// How far outside the field spawn points sit.
    pub spawn_distance: f32,
    /// Height of the "above" spawn side.
    pub spawn_height: f32,
    /// Side spawns sit up to this far above their slot.
    pub spawn_rise: f32,
    /// Side spawns scatter this far in depth around their slot.
    pub spawn_depth_scatter: f32,
    /// Above spawns scatter this far laterally around their slot.
    pub spawn_lateral_scatter: f32,
}

impl Default for IntroConfig {
    fn default() -> Self {
        Self {
            fly_in_speed: 30.0,
            row_stagger: 0.35,
            jitter: 0.15,
            spawn_weights: [0.35, 0.35, 0.30],
            spawn_distance: 25.0,
            spawn_height: 30.0,
            spawn_rise: 6.0,
            spawn_depth_scatter: 10.0,
            spawn_lateral_scatter: 5.0,
        }
    }
}

/// Invasion landing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingConfig {
    /// Depth of the landing line.
    pub landing_z: f32,
    /// Random depth scatter around the landing line.
    pub depth_jitter: f32,
    /// Start delay per unit of current depth.
    pub delay_per_depth: f32,
    pub duration: f32,
    pub bump_height: f32,
    pub wobble_amplitude: f32,
    pub wobble_cycles: f32,
    /// Pause after the last touchdown before the landing is reported complete.
    pub settle_delay: f32,
}

impl Default for LandingConfig {
    fn default() -> Self {
        Self {
            landing_z: 6.0,
            depth_jitter: 1.5,
            delay_per_depth: 0.02,
            duration: 1.6,
            bump_height: 3.0,
            wobble_amplitude: 1.0,
            wobble_cycles: 3.0,
            settle_delay: 1.0,
        }
    }
}

/// Destructible barriers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarrierConfig {
    pub count: usize,
    /// Lateral distance between barrier centres.
    pub spacing: f32,
    /// Depth of the barrier plane.
    pub depth: f32,
    pub width: f32,
    pub height: f32,
    pub cell_radius: f32,
    /// Arch cut from the bottom centre; zero disables it.
    pub notch_width: f32,
    pub notch_height: f32,
    /// Damage above this is a blast.
    pub single_hit_threshold: i32,
    /// Blast radius in cell radii.
    pub blast_multiple: f32,
}

impl BarrierConfig {
    /// Centre-to-centre distance between neighbouring cells.
    pub fn cell_pitch(&self) -> f32 {
        self.cell_radius * 2.0
    }

    pub fn blast_radius(&self) -> f32 {
        self.cell_radius * self.blast_multiple
    }
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            count: 4,
            spacing: 8.0,
            depth: 20.0,
            width: 5.0,
            height: 3.5,
            cell_radius: 0.25,
            notch_width: 1.6,
            notch_height: 1.2,
            single_hit_threshold: 10,
            blast_multiple: 3.0,
        }
    }
}

/// Projectile and damage rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatConfig {
    pub projectile_radius: f32,
    pub player_radius: f32,
    /// Depth of the player's firing line; dive strafes aim here.
    pub player_depth: f32,
    /// Height swarm volleys aim at, at the player's depth.
    pub aim_height: f32,
    pub swarm_shot_speed: f32,
    pub strafe_shot_speed: f32,
    pub player_shot_speed: f32,
    /// Steepest upward or downward aim of a player shot (radians).
    pub max_aim_pitch: f32,
    pub player_fire_cooldown: f32,
    pub player_damage: i32,
    pub swarm_damage: i32,
    pub player_health: i32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            projectile_radius: 0.25,
            player_radius: 1.2,
            player_depth: 0.0,
            aim_height: 1.6,
            swarm_shot_speed: 22.0,
            strafe_shot_speed: 26.0,
            player_shot_speed: 60.0,
            max_aim_pitch: 1.2,
            player_fire_cooldown: 0.3,
            player_damage: 50,
            swarm_damage: 1,
            player_health: 3,
        }
    }
}
