//! Presentation boundary.
//!
//! The simulation never talks to a renderer directly. Callers implement
//! [`ViewBinding`] and receive placement, visibility and release calls for
//! every entity, barrier cell and projectile. [`ViewSync`] remembers what has
//! already been released so a dead object is hidden and released once.

use std::collections::HashSet;

use glam::Vec3;

use crate::barrier::Barrier;
use crate::entities::{Entity, EntityIndex, Projectile, ProjectileId};

/// Identifies one visual object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewHandle {
    Entity(EntityIndex),
    BarrierCell { barrier: usize, cell: usize },
    Projectile(ProjectileId),
}

/// Receives state from the simulation, e.g. a scene graph or a logger.
pub trait ViewBinding {
    fn place(&mut self, handle: ViewHandle, position: Vec3, tilt: f32, brightness: f32);

    fn set_visible(&mut self, handle: ViewHandle, visible: bool);

    /// The object will never be placed again unless it comes back to life
    /// through a snapshot restore.
    fn release(&mut self, handle: ViewHandle);
}

/// Release bookkeeping between frames.
#[derive(Debug, Default)]
pub struct ViewSync {
    released_entities: HashSet<EntityIndex>,
    released_cells: HashSet<(usize, usize)>,
    shown_projectiles: Vec<ProjectileId>,
}

impl ViewSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync(
        &mut self,
        view: &mut impl ViewBinding,
        entities: &[Entity],
        barriers: &[Barrier],
        projectiles: &[Projectile],
    ) {
        for (i, entity) in entities.iter().enumerate() {
            let index = EntityIndex(i);
            let handle = ViewHandle::Entity(index);
            if entity.alive {
                self.released_entities.remove(&index);
                view.place(handle, entity.position, entity.tilt, entity.brightness);
                view.set_visible(handle, true);
            } else if self.released_entities.insert(index) {
                view.set_visible(handle, false);
                view.release(handle);
            }
        }

        for (b, barrier) in barriers.iter().enumerate() {
            for (c, cell) in barrier.cells().iter().enumerate() {
                let handle = ViewHandle::BarrierCell { barrier: b, cell: c };
                if cell.alive {
                    if self.released_cells.remove(&(b, c)) {
                        view.set_visible(handle, true);
                    }
                    let shade = cell.health as f32 / cell.max_health.max(1) as f32;
                    view.place(handle, cell.position, 0.0, shade);
                } else if self.released_cells.insert((b, c)) {
                    view.set_visible(handle, false);
                    view.release(handle);
                }
            }
        }

        for id in &self.shown_projectiles {
            if !projectiles.iter().any(|p| p.id == *id) {
                view.release(ViewHandle::Projectile(*id));
            }
        }
        self.shown_projectiles.clear();
        for projectile in projectiles {
            view.place(ViewHandle::Projectile(projectile.id), projectile.position, 0.0, 1.0);
            self.shown_projectiles.push(projectile.id);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::BarrierConfig;
    use crate::entities::{EntityKind, Owner, ShotRequest};

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Call {
        Place(ViewHandle),
        Visible(ViewHandle, bool),
        Release(ViewHandle),
    }

    /// Records every call in order.
    #[derive(Debug, Default)]
    pub(crate) struct Recorder {
        pub calls: Vec<Call>,
    }

    impl Recorder {
        pub fn releases(&self, handle: ViewHandle) -> usize {
            self.calls
                .iter()
                .filter(|c| **c == Call::Release(handle))
                .count()
        }
    }

    impl ViewBinding for Recorder {
        fn place(&mut self, handle: ViewHandle, _: Vec3, _: f32, _: f32) {
            self.calls.push(Call::Place(handle));
        }

        fn set_visible(&mut self, handle: ViewHandle, visible: bool) {
            self.calls.push(Call::Visible(handle, visible));
        }

        fn release(&mut self, handle: ViewHandle) {
            self.calls.push(Call::Release(handle));
        }
    }

    #[test]
    fn dead_entity_released_once() {
        let mut entities = vec![
            Entity::new(EntityKind::Front, 0, 0, Vec3::ZERO),
            Entity::new(EntityKind::Front, 1, 0, Vec3::X),
        ];
        let mut sync = ViewSync::new();
        let mut view = Recorder::default();

        sync.sync(&mut view, &entities, &[], &[]);
        entities[1].alive = false;
        sync.sync(&mut view, &entities, &[], &[]);
        sync.sync(&mut view, &entities, &[], &[]);

        let handle = ViewHandle::Entity(EntityIndex(1));
        assert_eq!(view.releases(handle), 1);
        let hide = view.calls.iter().position(|c| *c == Call::Visible(handle, false));
        let release = view.calls.iter().position(|c| *c == Call::Release(handle));
        assert!(hide.unwrap() < release.unwrap());
    }

    #[test]
    fn revived_entity_is_placed_again() {
        let mut entities = vec![Entity::new(EntityKind::Back, 0, 4, Vec3::ZERO)];
        let mut sync = ViewSync::new();
        let mut view = Recorder::default();

        entities[0].alive = false;
        sync.sync(&mut view, &entities, &[], &[]);
        entities[0].alive = true;
        view.calls.clear();
        sync.sync(&mut view, &entities, &[], &[]);
        assert!(view.calls.contains(&Call::Place(ViewHandle::Entity(EntityIndex(0)))));
    }

    #[test]
    fn destroyed_cell_released_once() {
        let mut barriers = vec![Barrier::new(Vec3::ZERO, &BarrierConfig::default(), 1)];
        let mut sync = ViewSync::new();
        let mut view = Recorder::default();

        let at = barriers[0].cells()[0].position;
        barriers[0].apply_damage(at, 0.25, 1);
        sync.sync(&mut view, &[], &barriers, &[]);
        sync.sync(&mut view, &[], &barriers, &[]);
        assert_eq!(view.releases(ViewHandle::BarrierCell { barrier: 0, cell: 0 }), 1);
    }

    #[test]
    fn vanished_projectile_released() {
        let request = ShotRequest {
            origin: Vec3::ZERO,
            velocity: Vec3::Z,
            owner: Owner::Player,
            source: None,
        };
        let shot = Projectile::new(ProjectileId(7), &request, 0.25);
        let mut sync = ViewSync::new();
        let mut view = Recorder::default();

        sync.sync(&mut view, &[], &[], std::slice::from_ref(&shot));
        sync.sync(&mut view, &[], &[], &[]);
        sync.sync(&mut view, &[], &[], &[]);
        assert_eq!(view.releases(ViewHandle::Projectile(ProjectileId(7))), 1);
    }
}
