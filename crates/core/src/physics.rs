//! Geometry helpers for the simulation.
//!
//! Discrete overlap tests only - no continuous collision, no rigid bodies.

use std::f32::consts::PI;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned play volume. Projectiles leaving it are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayVolume {
    pub min: Vec3,
    pub max: Vec3,
}

impl PlayVolume {
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }
}

impl Default for PlayVolume {
    fn default() -> Self {
        Self::new(Vec3::new(-40.0, -2.0, -10.0), Vec3::new(40.0, 40.0, 110.0))
    }
}

/// Axis-aligned box used for coarse rejection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// An inverted box that any `include` call will replace.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn include(&mut self, point: Vec3, radius: f32) {
        self.min = self.min.min(point - Vec3::splat(radius));
        self.max = self.max.max(point + Vec3::splat(radius));
    }

    /// Point test with the box grown by `margin` on every side.
    pub fn contains_with_margin(&self, point: Vec3, margin: f32) -> bool {
        let m = Vec3::splat(margin);
        point.cmpge(self.min - m).all() && point.cmple(self.max + m).all()
    }
}

/// Sphere-sphere overlap on squared distances. Touching spheres do not overlap.
#[inline]
pub fn spheres_overlap(a: Vec3, radius_a: f32, b: Vec3, radius_b: f32) -> bool {
    let combined = radius_a + radius_b;
    a.distance_squared(b) < combined * combined
}

/// Overlap in the ground plane (x/z), treating height as unbounded.
#[inline]
pub fn horizontal_overlap(a: Vec3, b: Vec3, combined_radius: f32) -> bool {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz < combined_radius * combined_radius
}

/// Linear interpolation.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Quadratic ease-out: fast start, gentle arrival.
#[inline]
pub fn ease_out_quad(t: f32) -> f32 {
    let inv = 1.0 - t.clamp(0.0, 1.0);
    1.0 - inv * inv
}

/// Cubic ease-out.
#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    let inv = 1.0 - t.clamp(0.0, 1.0);
    1.0 - inv * inv * inv
}

/// `sin(pi * t)`: 0 at both ends, 1 at the midpoint.
#[inline]
pub fn half_sine(t: f32) -> f32 {
    (PI * t.clamp(0.0, 1.0)).sin()
}

/// Decaying oscillation: `cycles` full periods over `t` in `[0, 1]`, fading to 0 at `t = 1`.
#[inline]
pub fn decaying_wave(t: f32, cycles: f32, amplitude: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    (2.0 * PI * cycles * t).sin() * amplitude * (1.0 - t)
}
