//! Per-frame collision resolution.
//!
//! Player shots test entities first, then barriers (blast damage). Swarm
//! shots test barriers (single-cell damage), then the player in the ground
//! plane only. A projectile resolves against at most one target.
//!
//! The resolver marks projectiles spent, kills entities and damages cells,
//! and reports everything that happened. Score, health, removal and effects
//! are left to the caller.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::barrier::Barrier;
use crate::config::CombatConfig;
use crate::entities::{EntityIndex, Owner, Projectile, ProjectileId};
use crate::formation::{Formation, KillRecord};
use crate::physics::{horizontal_overlap, spheres_overlap};

/// A barrier cell struck this frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarrierHit {
    pub barrier: usize,
    pub cell: usize,
    pub position: Vec3,
    pub by_player: bool,
    /// Cells that died from this hit.
    pub destroyed: usize,
}

/// Everything one resolution pass produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollisionOutcome {
    pub spent: Vec<ProjectileId>,
    pub kills: Vec<KillRecord>,
    pub barrier_hits: Vec<BarrierHit>,
    pub player_hit: bool,
}

impl CollisionOutcome {
    pub fn is_empty(&self) -> bool {
        self.spent.is_empty()
    }

    pub fn points(&self) -> u32 {
        self.kills.iter().map(|k| k.points).sum()
    }
}

/// Resolves every live projectile against its target set.
pub fn resolve(
    projectiles: &mut [Projectile],
    formation: &mut Formation,
    barriers: &mut [Barrier],
    player: Vec3,
    combat: &CombatConfig,
) -> CollisionOutcome {
    let mut outcome = CollisionOutcome::default();

    for projectile in projectiles.iter_mut().filter(|p| !p.spent) {
        let resolved = match projectile.owner {
            Owner::Player => {
                hit_entity(projectile, formation, &mut outcome)
                    || hit_barrier(projectile, barriers, combat.player_damage, &mut outcome)
            }
            Owner::Swarm => {
                hit_barrier(projectile, barriers, combat.swarm_damage, &mut outcome)
                    || hit_player(projectile, player, combat.player_radius, &mut outcome)
            }
        };

        if resolved {
            projectile.spent = true;
            outcome.spent.push(projectile.id);
        }
    }

    outcome
}

/// First alive entity whose sphere overlaps the projectile dies.
fn hit_entity(
    projectile: &Projectile,
    formation: &mut Formation,
    outcome: &mut CollisionOutcome,
) -> bool {
    let radius = formation.config().grid.entity_radius;
    let target = formation
        .entities()
        .iter()
        .position(|e| e.alive && spheres_overlap(projectile.position, projectile.radius, e.position, radius));

    let Some(index) = target else {
        return false;
    };
    if let Some(record) = formation.kill(EntityIndex(index)) {
        outcome.kills.push(record);
    }
    true
}

/// Coarse bounds first, then the nearest-cell search of the first barrier hit.
fn hit_barrier(
    projectile: &Projectile,
    barriers: &mut [Barrier],
    damage: i32,
    outcome: &mut CollisionOutcome,
) -> bool {
    for (index, barrier) in barriers.iter_mut().enumerate() {
        if !barrier.has_alive_cells() || !barrier.may_contain(projectile.position, projectile.radius) {
            continue;
        }

        let result = barrier.apply_damage(projectile.position, projectile.radius, damage);
        if let (true, Some(cell)) = (result.hit, result.cell) {
            outcome.barrier_hits.push(BarrierHit {
                barrier: index,
                cell,
                position: result.position,
                by_player: projectile.owner == Owner::Player,
                destroyed: result.destroyed,
            });
            return true;
        }
    }
    false
}

/// Ground-plane distance only: height never saves the player.
fn hit_player(
    projectile: &Projectile,
    player: Vec3,
    player_radius: f32,
    outcome: &mut CollisionOutcome,
) -> bool {
    if horizontal_overlap(projectile.position, player, player_radius + projectile.radius) {
        outcome.player_hit = true;
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SwarmConfig;
    use crate::difficulty::Difficulty;
    use crate::entities::{ProjectileIdGenerator, ShotRequest};

    struct Arena {
        formation: Formation,
        barriers: Vec<Barrier>,
        combat: CombatConfig,
        ids: ProjectileIdGenerator,
    }

    impl Arena {
        fn new() -> Self {
            let config = SwarmConfig::default();
            let mut formation = Formation::new(config.clone(), Difficulty::for_wave(1));
            formation.begin_battle();
            Self {
                barriers: Barrier::row(&config.barrier, 3),
                combat: config.combat.clone(),
                formation,
                ids: ProjectileIdGenerator::default(),
            }
        }

        fn shot(&mut self, position: Vec3, owner: Owner) -> Projectile {
            let request = ShotRequest {
                origin: position,
                velocity: Vec3::ZERO,
                owner,
                source: None,
            };
            Projectile::new(self.ids.next(), &request, self.combat.projectile_radius)
        }

        fn resolve(&mut self, shots: &mut [Projectile], player: Vec3) -> CollisionOutcome {
            resolve(shots, &mut self.formation, &mut self.barriers, player, &self.combat)
        }
    }

    #[test]
    fn player_shot_kills_one_entity() {
        let mut arena = Arena::new();
        let target = arena.formation.index_of(2, 0).unwrap();
        let at = arena.formation.entity(target).unwrap().position;
        let mut shots = vec![arena.shot(at, Owner::Player)];

        let outcome = arena.resolve(&mut shots, Vec3::ZERO);
        assert_eq!(outcome.kills.len(), 1);
        assert_eq!(outcome.kills[0].entity, target);
        assert_eq!(outcome.points(), 10);
        assert!(shots[0].spent);
        assert_eq!(arena.formation.alive_count(), 54);

        // Spent shots never resolve twice.
        let again = arena.resolve(&mut shots, Vec3::ZERO);
        assert!(again.is_empty());
    }

    #[test]
    fn player_shot_misses_dead_entity() {
        let mut arena = Arena::new();
        let target = arena.formation.index_of(2, 0).unwrap();
        let at = arena.formation.entity(target).unwrap().position;
        arena.formation.kill(target);
        let mut shots = vec![arena.shot(at, Owner::Player)];
        let outcome = arena.resolve(&mut shots, Vec3::ZERO);
        assert!(outcome.kills.is_empty());
        assert!(!shots[0].spent);
    }

    #[test]
    fn player_shot_blasts_barrier() {
        let mut arena = Arena::new();
        let cell = arena.barriers[1].cells()[20].position;
        let before = arena.barriers[1].alive_cell_count();
        let mut shots = vec![arena.shot(cell, Owner::Player)];

        let outcome = arena.resolve(&mut shots, Vec3::ZERO);
        assert_eq!(outcome.barrier_hits.len(), 1);
        let hit = outcome.barrier_hits[0];
        assert_eq!(hit.barrier, 1);
        assert!(hit.by_player);
        assert!(hit.destroyed > 1);
        assert_eq!(arena.barriers[1].alive_cell_count(), before - hit.destroyed);
    }

    #[test]
    fn swarm_shot_chips_single_cell() {
        let mut arena = Arena::new();
        let cell = arena.barriers[0].cells()[20].position;
        let mut shots = vec![arena.shot(cell, Owner::Swarm)];

        let outcome = arena.resolve(&mut shots, Vec3::ZERO);
        assert_eq!(outcome.barrier_hits.len(), 1);
        assert!(!outcome.barrier_hits[0].by_player);
        assert_eq!(arena.barriers[0].cells()[20].health, 2);
        assert!(!outcome.player_hit);
    }

    #[test]
    fn swarm_shot_ignores_entities() {
        let mut arena = Arena::new();
        let at = arena.formation.entities()[0].position;
        let mut shots = vec![arena.shot(at, Owner::Swarm)];
        let outcome = arena.resolve(&mut shots, Vec3::new(0.0, 1.6, 0.0));
        assert!(outcome.kills.is_empty());
        assert_eq!(arena.formation.alive_count(), 55);
    }

    #[test]
    fn swarm_shot_hits_player_at_any_height() {
        let mut arena = Arena::new();
        let player = Vec3::new(3.0, 1.6, 0.0);
        let mut shots = vec![arena.shot(Vec3::new(3.2, 25.0, 0.3), Owner::Swarm)];
        let outcome = arena.resolve(&mut shots, player);
        assert!(outcome.player_hit);
        assert_eq!(outcome.spent, vec![shots[0].id]);
    }

    #[test]
    fn player_shot_never_hits_player() {
        let mut arena = Arena::new();
        let player = Vec3::new(3.0, 1.6, 0.0);
        let mut shots = vec![arena.shot(player, Owner::Player)];
        let outcome = arena.resolve(&mut shots, player);
        assert!(!outcome.player_hit);
        assert!(outcome.is_empty());
    }

    #[test]
    fn diving_entities_can_be_shot() {
        let mut arena = Arena::new();
        let back = arena.formation.index_of(4, 4).unwrap();
        assert!(arena.formation.start_dive(back, 0.0));
        let at = arena.formation.entity(back).unwrap().position;
        let mut shots = vec![arena.shot(at, Owner::Player)];
        let outcome = arena.resolve(&mut shots, Vec3::ZERO);
        assert_eq!(outcome.kills.len(), 1);
        assert!(outcome.kills[0].was_diving);
        assert_eq!(outcome.kills[0].entity, back);
    }
}
