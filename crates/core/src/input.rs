//! Per-frame player input.
//!
//! The camera and input devices live outside the core; they reduce to a
//! firing position on the ground plane, an aim pitch and a trigger.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// What the player does this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Lateral position.
    pub x: f32,
    /// Depth position.
    pub z: f32,
    /// Aim elevation in radians, positive upward. Clamped to the
    /// configured maximum when a shot is fired.
    pub pitch: f32,
    pub fire: bool,
}

impl PlayerInput {
    pub const fn new(x: f32, z: f32) -> Self {
        Self {
            x,
            z,
            pitch: 0.0,
            fire: false,
        }
    }

    pub fn firing(mut self, fire: bool) -> Self {
        self.fire = fire;
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    /// Pitch that points a shot leaving `from` at `target`'s height when it
    /// reaches `target`'s depth.
    pub fn pitch_toward(from: Vec3, target: Vec3) -> f32 {
        (target.y - from.y).atan2(target.z - from.z)
    }

    /// Unit direction of a shot fired with `pitch`, clamped to `max_pitch`.
    pub fn aim_direction(&self, max_pitch: f32) -> Vec3 {
        let pitch = self.pitch.clamp(-max_pitch, max_pitch);
        Vec3::new(0.0, pitch.sin(), pitch.cos())
    }
}
