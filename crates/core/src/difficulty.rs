//! Wave difficulty table.
//!
//! Every tunable that scales with the wave number is a linear interpolation
//! over waves 1..=100. Waves outside that range clamp to the ends.

use serde::{Deserialize, Serialize};

use crate::physics::lerp;

pub const FIRST_WAVE: u32 = 1;
pub const LAST_WAVE: u32 = 100;

/// Parameters derived from the wave number at wave reset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    pub wave: u32,
    /// Sweep interval with a full formation (seconds).
    pub move_interval_base: f32,
    /// Per-roll probability that an eligible entity fires.
    pub shoot_chance: f32,
    /// Bounds of the randomized wait between dive attempts (seconds).
    pub dive_interval: (f32, f32),
    pub max_divers: usize,
    /// Minimum time between strafe shots of one diver (seconds).
    pub strafe_interval: f32,
    /// Starting health of every barrier cell.
    pub barrier_health: i32,
}

impl Difficulty {
    pub fn for_wave(wave: u32) -> Self {
        let t = wave_progress(wave);
        Self {
            wave: wave.clamp(FIRST_WAVE, LAST_WAVE),
            move_interval_base: lerp(0.6, 0.2, t),
            shoot_chance: shoot_chance(wave),
            dive_interval: (lerp(4.0, 1.0, t), lerp(8.0, 2.5, t)),
            max_divers: 1 + (4.0 * t).floor() as usize,
            strafe_interval: lerp(1.2, 0.4, t),
            barrier_health: ((3.0 - 2.0 * t).round() as i32).max(1),
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::for_wave(FIRST_WAVE)
    }
}

/// 0 at the first wave, 1 at the last.
pub fn wave_progress(wave: u32) -> f32 {
    let w = wave.clamp(FIRST_WAVE, LAST_WAVE);
    (w - FIRST_WAVE) as f32 / (LAST_WAVE - FIRST_WAVE) as f32
}

/// Swarm volley probability: 0.5% at wave 1 up to 5% at wave 100.
pub fn shoot_chance(wave: u32) -> f32 {
    lerp(0.005, 0.05, wave_progress(wave)).clamp(0.005, 0.05)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_wave_values() {
        let d = Difficulty::for_wave(1);
        assert_eq!(d.shoot_chance, 0.005);
        assert_eq!(d.max_divers, 1);
        assert_eq!(d.barrier_health, 3);
        assert_eq!(d.dive_interval, (4.0, 8.0));
    }

    #[test]
    fn last_wave_values() {
        let d = Difficulty::for_wave(100);
        assert!((d.shoot_chance - 0.05).abs() < 1e-6);
        assert_eq!(d.max_divers, 5);
        assert_eq!(d.barrier_health, 1);
        assert!(d.move_interval_base < Difficulty::for_wave(1).move_interval_base);
    }

    #[test]
    fn waves_clamp() {
        assert_eq!(Difficulty::for_wave(0), Difficulty::for_wave(1));
        assert_eq!(Difficulty::for_wave(500).max_divers, 5);
    }

    #[test]
    fn diver_cap_grows() {
        let caps: Vec<usize> = (1..=100).map(|w| Difficulty::for_wave(w).max_divers).collect();
        assert!(caps.windows(2).all(|w| w[0] <= w[1]));
    }
}
