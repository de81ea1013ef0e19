//! Destructible barriers.
//!
//! A barrier is a wall of small damageable cells on a hex-packed lattice in
//! one vertical plane. Swarm fire chips single cells; player fire blasts a
//! crater around the nearest cell.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::BarrierConfig;
use crate::physics::Aabb;

/// One damageable unit of a barrier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarrierCell {
    pub position: Vec3,
    pub health: i32,
    pub max_health: i32,
    pub alive: bool,
}

impl BarrierCell {
    fn destroy(&mut self) {
        self.health = 0;
        self.alive = false;
    }
}

/// Outcome of [`Barrier::apply_damage`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitResult {
    pub hit: bool,
    /// World position of the primary impact (the nearest cell).
    pub position: Vec3,
    pub cell: Option<usize>,
    /// Cells that died from this hit.
    pub destroyed: usize,
}

impl HitResult {
    pub const MISS: Self = Self {
        hit: false,
        position: Vec3::ZERO,
        cell: None,
        destroyed: 0,
    };
}

/// A destructible wall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barrier {
    cells: Vec<BarrierCell>,
    bounds: Aabb,
    cell_radius: f32,
    cell_pitch: f32,
    blast_radius: f32,
    single_hit_threshold: i32,
}

impl Barrier {
    /// Builds a barrier whose footprint is centred on `base` (bottom centre).
    pub fn new(base: Vec3, config: &BarrierConfig, health: i32) -> Self {
        let r = config.cell_radius;
        let pitch = config.cell_pitch();
        let row_height = pitch * 3.0_f32.sqrt() * 0.5;
        let half_width = config.width * 0.5;

        let mut cells = Vec::new();
        let mut bounds = Aabb::EMPTY;

        let mut row = 0;
        let mut y = r;
        while y <= config.height - r + f32::EPSILON {
            let offset = if row % 2 == 1 { pitch * 0.5 } else { 0.0 };
            let mut x = -half_width + r + offset;
            while x <= half_width - r + f32::EPSILON {
                let in_notch = x.abs() < config.notch_width * 0.5 && y < config.notch_height;
                if !in_notch {
                    let position = base + Vec3::new(x, y, 0.0);
                    bounds.include(position, r);
                    cells.push(BarrierCell {
                        position,
                        health,
                        max_health: health,
                        alive: true,
                    });
                }
                x += pitch;
            }
            y += row_height;
            row += 1;
        }

        Self {
            cells,
            bounds,
            cell_radius: r,
            cell_pitch: pitch,
            blast_radius: config.blast_radius(),
            single_hit_threshold: config.single_hit_threshold,
        }
    }

    /// The standard row of barriers across the field, centred on `x = 0`.
    pub fn row(config: &BarrierConfig, health: i32) -> Vec<Self> {
        let centre = (config.count as f32 - 1.0) * 0.5;
        (0..config.count)
            .map(|i| {
                let x = (i as f32 - centre) * config.spacing;
                Self::new(Vec3::new(x, 0.0, config.depth), config, health)
            })
            .collect()
    }

    pub fn cells(&self) -> &[BarrierCell] {
        &self.cells
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn cell_radius(&self) -> f32 {
        self.cell_radius
    }

    pub fn has_alive_cells(&self) -> bool {
        self.cells.iter().any(|c| c.alive)
    }

    pub fn alive_cell_count(&self) -> usize {
        self.cells.iter().filter(|c| c.alive).count()
    }

    /// Coarse test: could anything within `hit_radius` of `point` touch a cell?
    pub fn may_contain(&self, point: Vec3, hit_radius: f32) -> bool {
        self.bounds
            .contains_with_margin(point, hit_radius + self.cell_pitch)
    }

    /// Nearest alive cell within `reach` of `point`. Ties keep the first found.
    fn nearest_alive(&self, point: Vec3, reach: f32) -> Option<usize> {
        let mut best = None;
        let mut best_dist_sq = reach * reach;
        for (i, cell) in self.cells.iter().enumerate() {
            if !cell.alive {
                continue;
            }
            let d = cell.position.distance_squared(point);
            if d < best_dist_sq || (best.is_none() && d == best_dist_sq) {
                best = Some(i);
                best_dist_sq = d;
            }
        }
        best
    }

    /// Damages the nearest alive cell within `hit_radius + cell pitch` of `point`.
    ///
    /// Damage above the single-hit threshold destroys every alive cell within
    /// the blast radius of that cell; lower damage only chips the one cell.
    pub fn apply_damage(&mut self, point: Vec3, hit_radius: f32, damage: i32) -> HitResult {
        let Some(index) = self.nearest_alive(point, hit_radius + self.cell_pitch) else {
            return HitResult::MISS;
        };

        let epicentre = self.cells[index].position;
        let mut destroyed = 0;

        if damage > self.single_hit_threshold {
            let blast_sq = self.blast_radius * self.blast_radius;
            for cell in self.cells.iter_mut().filter(|c| c.alive) {
                if cell.position.distance_squared(epicentre) <= blast_sq {
                    cell.destroy();
                    destroyed += 1;
                }
            }
        } else {
            let cell = &mut self.cells[index];
            cell.health -= damage.max(0);
            if cell.health <= 0 {
                cell.destroy();
                destroyed = 1;
            }
        }

        HitResult {
            hit: true,
            position: epicentre,
            cell: Some(index),
            destroyed,
        }
    }

    /// Destroys every alive cell overlapping a sphere, e.g. a swarm member
    /// ploughing through the wall. Returns the number of cells destroyed.
    pub fn erode_sphere(&mut self, centre: Vec3, radius: f32) -> usize {
        if !self.bounds.contains_with_margin(centre, radius) {
            return 0;
        }
        let reach = radius + self.cell_radius;
        let reach_sq = reach * reach;
        let mut destroyed = 0;
        for cell in self.cells.iter_mut().filter(|c| c.alive) {
            if cell.position.distance_squared(centre) < reach_sq {
                cell.destroy();
                destroyed += 1;
            }
        }
        destroyed
    }
}
