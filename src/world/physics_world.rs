use std::collections::HashMap;

use log::{debug, warn};

use crate::collision::{
    Collider, ColliderDesc, ColliderId, ColliderSet, CollisionEvent, CollisionEventKind, CollisionProcessor, Contact,
    DynamicTreeProcessor, PairId, RayCastHit, RayCastOptions, SparseHashGridProcessor,
};
use crate::config::{BroadphaseStrategy, PhysicsConfig, SolverStrategy};
use crate::error::{PhysicsError, Result};
use crate::integration::integrator;
use crate::math::Ray;
use crate::objects::{BodyHandle, BodySet, RigidBody};
use crate::solver::{BoxSolver, CollisionSolver, RigidBodySolver};
use crate::tile::{CellMap, CellMapCollision};

/// Owns every body and collider and runs the collision pipeline once per `step`.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    bodies: BodySet,
    colliders: ColliderSet,
    processor: Box<dyn CollisionProcessor>,
    solver: Box<dyn CollisionSolver>,
    tile: CellMapCollision,
    cell_maps: Vec<Box<dyn CellMap>>,
    /// Contacts of the last substep, one per start/end key.
    touching: HashMap<PairId, Contact>,
    contacts: Vec<Contact>,
}

impl PhysicsWorld {
    /// Creates an empty world whose processor and solver follow the configured strategies.
    pub fn new(config: PhysicsConfig) -> Self {
        let processor: Box<dyn CollisionProcessor> = match config.broadphase {
            BroadphaseStrategy::DynamicTree => Box::new(DynamicTreeProcessor::new(config.dynamic_tree.clone())),
            BroadphaseStrategy::SparseHashGrid => {
                Box::new(SparseHashGridProcessor::new(config.sparse_hash_grid.clone()))
            }
        };
        let solver: Box<dyn CollisionSolver> = match config.solver {
            SolverStrategy::Box => Box::new(BoxSolver::new(config.arcade.clone())),
            SolverStrategy::RigidBody => Box::new(RigidBodySolver::new(config.rigid_body.clone(), config.sleep.clone())),
        };
        Self {
            tile: CellMapCollision::new(config.tile.clone()),
            config,
            bodies: BodySet::new(),
            colliders: ColliderSet::new(),
            processor,
            solver,
            cell_maps: Vec::new(),
            touching: HashMap::new(),
            contacts: Vec::new(),
        }
    }

    /// Replaces the solver. Cached solver state (warm-start impulses) is lost.
    pub fn with_solver(mut self, solver: Box<dyn CollisionSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// Replaces the broadphase processor and tracks every existing leaf collider in it.
    pub fn with_processor(mut self, mut processor: Box<dyn CollisionProcessor>) -> Self {
        for id in self.colliders.leaves().collect::<Vec<_>>() {
            processor.track(id, &self.colliders, &self.bodies);
        }
        self.processor = processor;
        self
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        self.bodies.insert(body)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    pub fn bodies(&self) -> &BodySet {
        &self.bodies
    }

    /// Attaches a collider to `owner` (or to the world when `None`) and starts tracking its leaves.
    pub fn add_collider(&mut self, desc: ColliderDesc, owner: Option<BodyHandle>) -> Result<ColliderId> {
        let id = self.colliders.insert(desc, owner, &self.bodies)?;
        for leaf in self.colliders.flatten_ids(id) {
            self.processor.track(leaf, &self.colliders, &self.bodies);
        }
        Ok(id)
    }

    /// Removes a collider (a composite takes its children with it). Ongoing contacts end silently.
    pub fn remove_collider(&mut self, id: ColliderId) -> Result<()> {
        let removed = self.colliders.remove(id);
        if removed.is_empty() {
            return Err(PhysicsError::UnknownCollider(id.0));
        }
        for leaf in &removed {
            self.processor.untrack(*leaf);
        }
        self.touching
            .retain(|_, c| !removed.contains(&c.collider_a) && !removed.contains(&c.collider_b));
        Ok(())
    }

    pub fn collider(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.get(id)
    }

    /// Mutable access to a collider, mostly to register event handlers.
    pub fn collider_mut(&mut self, id: ColliderId) -> Option<&mut Collider> {
        self.colliders.get_mut(id)
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    pub fn add_cell_map(&mut self, map: impl CellMap + 'static) {
        self.cell_maps.push(Box::new(map));
    }

    /// Contacts produced by the last substep, cancelled ones included.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn solver(&self) -> &dyn CollisionSolver {
        self.solver.as_ref()
    }

    pub fn processor(&self) -> &dyn CollisionProcessor {
        self.processor.as_ref()
    }

    /// Colliders hit by `ray`, nearest first.
    pub fn ray_cast(&self, ray: &Ray, options: &RayCastOptions) -> Vec<RayCastHit> {
        self.processor.ray_cast(ray, options, &self.colliders, &self.bodies)
    }

    /// Advances the simulation by `elapsed_ms` milliseconds, split into `substeps` equal parts.
    pub fn step(&mut self, elapsed_ms: f64) {
        if !(elapsed_ms > 0.0) {
            return;
        }
        let substeps = self.config.substeps.max(1);
        let dt_ms = elapsed_ms / substeps as f64;
        for _ in 0..substeps {
            self.substep(dt_ms);
        }
    }

    fn substep(&mut self, dt_ms: f64) {
        let dt = dt_ms / 1000.0;
        let gravity = self.config.gravity;
        for (_, body) in self.bodies.iter_mut() {
            integrator::integrate(body, gravity, dt);
        }

        let moved = self.processor.update(&self.colliders, &self.bodies);
        let pairs = self
            .processor
            .broadphase(&self.colliders, &mut self.bodies, dt_ms, &self.config.continuous);
        let contacts = self
            .processor
            .narrowphase(&pairs, &self.colliders, &self.bodies, self.config.composite_strategy);
        debug!("step: {} proxies moved, {} pairs, {} contacts", moved, pairs.len(), contacts.len());

        self.contacts = self.solver.solve(contacts, &mut self.colliders, &mut self.bodies);

        if !self.cell_maps.is_empty() {
            let handles: Vec<BodyHandle> = self.bodies.iter().map(|(h, _)| h).collect();
            for handle in handles {
                self.tile.update(handle, &self.cell_maps, &mut self.colliders, &mut self.bodies);
            }
        }

        self.emit_start_end();
    }

    /// Diffs this substep's contacts against the previous ones by start/end key.
    fn emit_start_end(&mut self) {
        let mut current: HashMap<PairId, Contact> = HashMap::with_capacity(self.contacts.len());
        for contact in &self.contacts {
            let key = contact.id.key();
            match current.get(&key) {
                Some(existing) if !(existing.is_cancelled() && !contact.is_cancelled()) => {}
                _ => {
                    current.insert(key, contact.clone());
                }
            }
        }

        let mut started: Vec<&Contact> = current
            .iter()
            .filter(|(key, contact)| !self.touching.contains_key(key) && !contact.is_cancelled())
            .map(|(_, contact)| contact)
            .collect();
        started.sort_by_key(|c| c.id.key());
        let mut ended: Vec<&Contact> = self
            .touching
            .iter()
            .filter(|(key, _)| !current.contains_key(key))
            .map(|(_, contact)| contact)
            .collect();
        ended.sort_by_key(|c| c.id.key());

        let started: Vec<Contact> = started.into_iter().cloned().collect();
        let ended: Vec<Contact> = ended
            .into_iter()
            .filter(|c| self.participants_alive(c))
            .cloned()
            .collect();

        for contact in &started {
            self.emit_pair(CollisionEventKind::CollisionStart, contact);
        }
        for contact in &ended {
            self.emit_pair(CollisionEventKind::CollisionEnd, contact);
        }
        // A cancelled contact that never started must not suppress a later start;
        // one that already started stays touching until the overlap ends
        let touching = &self.touching;
        current.retain(|key, contact| !contact.is_cancelled() || touching.contains_key(key));
        self.touching = current;
    }

    fn participants_alive(&self, contact: &Contact) -> bool {
        [contact.collider_a, contact.collider_b]
            .into_iter()
            .all(|id| self.colliders.get(id).is_some())
            && [contact.body_a, contact.body_b]
                .into_iter()
                .flatten()
                .all(|h| self.bodies.is_live(h))
    }

    /// Start/end events cannot be cancelled; a kill request is honoured.
    fn emit_pair(&mut self, kind: CollisionEventKind, contact: &Contact) {
        let side = contact.side();
        let sides = [
            (contact.collider_a, contact.collider_b, contact.body_a, side, contact.mtv),
            (contact.collider_b, contact.collider_a, contact.body_b, side.opposite(), -contact.mtv),
        ];
        for (this, other, body, side, mtv) in sides {
            let response = self.colliders.emit(&CollisionEvent {
                kind,
                this,
                other: Some(other),
                side,
                mtv,
                contact: Some(contact),
            });
            if response.is_cancelled() {
                warn!("{kind:?} on collider {this} cannot be cancelled, ignoring");
            }
            if response.is_killed() {
                if let Some(b) = body.and_then(|h| self.bodies.get_mut(h)) {
                    b.kill();
                }
            }
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::CollisionType;
    use crate::math::Vec2;
    use crate::shapes::{Circle, Polygon};
    use std::cell::RefCell;
    use std::rc::Rc;
    const EPSILON: f64 = 1e-9;

    fn square(size: f64) -> ColliderDesc {
        ColliderDesc::shape(Polygon::rectangle(size, size).unwrap())
    }

    #[test]
    fn test_world_new() {
        let world = PhysicsWorld::default();
        assert!(world.bodies().is_empty());
        assert!(world.contacts().is_empty());
        assert_eq!(world.config().substeps, 1);
    }

    #[test]
    fn test_add_collider_tracks_leaves() {
        let mut world = PhysicsWorld::default();
        let body = world.add_body(RigidBody::new_with_inertia(1.0, 1.0));
        let composite = world
            .add_collider(
                ColliderDesc::composite(vec![square(10.0), square(10.0).with_offset(Vec2::new(10.0, 0.0))]),
                Some(body),
            )
            .unwrap();
        let tracked = world.processor().tracked();
        assert_eq!(tracked.len(), 2);
        assert!(!tracked.contains(&composite));

        world.remove_collider(composite).unwrap();
        assert!(world.processor().tracked().is_empty());
        assert_eq!(world.remove_collider(composite), Err(PhysicsError::UnknownCollider(composite.0)));
    }

    #[test]
    fn test_add_collider_to_unknown_body_fails() {
        let mut world = PhysicsWorld::default();
        assert_eq!(
            world.add_collider(square(10.0), Some(BodyHandle(7))),
            Err(PhysicsError::UnknownBody(7))
        );
    }

    #[test]
    fn test_step_gravity() {
        let mut world = PhysicsWorld::new(PhysicsConfig {
            gravity: Vec2::new(0.0, 100.0),
            ..Default::default()
        });
        let body = world.add_body(RigidBody::new_with_inertia(1.0, 1.0));
        let fixed = world.add_body(RigidBody::new_fixed(Vec2::new(100.0, 0.0)));
        world.step(100.0);

        let body = world.body(body).unwrap();
        assert!((body.linear_velocity.y - 10.0).abs() < EPSILON);
        assert!((body.position.y - 1.0).abs() < EPSILON);
        assert_eq!(world.body(fixed).unwrap().position, Vec2::new(100.0, 0.0));
    }

    #[test]
    fn test_substeps_split_elapsed_time() {
        let mut world = PhysicsWorld::new(PhysicsConfig {
            gravity: Vec2::new(0.0, 100.0),
            substeps: 4,
            ..Default::default()
        });
        let body = world.add_body(RigidBody::new_with_inertia(1.0, 1.0));
        world.step(100.0);
        // Velocity is the same; position integrates over four 25 ms steps
        let body = world.body(body).unwrap();
        assert!((body.linear_velocity.y - 10.0).abs() < EPSILON);
        assert!((body.position.y - 0.625).abs() < EPSILON);
    }

    #[test]
    fn test_non_positive_elapsed_is_ignored() {
        let mut world = PhysicsWorld::new(PhysicsConfig {
            gravity: Vec2::new(0.0, 100.0),
            ..Default::default()
        });
        let body = world.add_body(RigidBody::new_with_inertia(1.0, 1.0));
        world.step(0.0);
        world.step(-16.0);
        world.step(f64::NAN);
        assert_eq!(world.body(body).unwrap().position, Vec2::ZERO);
    }

    #[test]
    fn test_collision_start_and_end_fire_once() {
        let mut world = PhysicsWorld::default();
        let a = world.add_body(RigidBody::new_with_inertia(1.0, 1.0));
        let b = world.add_body(
            RigidBody::new_with_inertia(1.0, 1.0)
                .with_position(Vec2::new(5.0, 0.0))
                .with_collision_type(CollisionType::Passive),
        );
        let ca = world.add_collider(square(10.0), Some(a)).unwrap();
        world.add_collider(square(10.0), Some(b)).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in [CollisionEventKind::CollisionStart, CollisionEventKind::CollisionEnd] {
            let log = log.clone();
            world
                .collider_mut(ca)
                .unwrap()
                .events
                .on(kind, move |e, _| log.borrow_mut().push(e.kind));
        }

        world.step(16.0);
        world.step(16.0);
        assert_eq!(*log.borrow(), vec![CollisionEventKind::CollisionStart]);

        world.body_mut(b).unwrap().position = Vec2::new(50.0, 0.0);
        world.step(16.0);
        world.step(16.0);
        assert_eq!(
            *log.borrow(),
            vec![CollisionEventKind::CollisionStart, CollisionEventKind::CollisionEnd]
        );
    }

    #[test]
    fn test_killed_body_ends_silently() {
        let mut world = PhysicsWorld::default();
        let a = world.add_body(RigidBody::new_with_inertia(1.0, 1.0));
        let b = world.add_body(
            RigidBody::new_with_inertia(1.0, 1.0)
                .with_position(Vec2::new(5.0, 0.0))
                .with_collision_type(CollisionType::Passive),
        );
        let ca = world.add_collider(square(10.0), Some(a)).unwrap();
        world.add_collider(square(10.0), Some(b)).unwrap();
        let ends = Rc::new(RefCell::new(0));
        {
            let ends = ends.clone();
            world
                .collider_mut(ca)
                .unwrap()
                .events
                .on(CollisionEventKind::CollisionEnd, move |_, _| *ends.borrow_mut() += 1);
        }

        world.step(16.0);
        world.body_mut(b).unwrap().kill();
        world.step(16.0);
        assert_eq!(*ends.borrow(), 0);
        assert!(world.contacts().is_empty());
    }

    #[test]
    fn test_ray_cast_through_world() {
        let mut world = PhysicsWorld::default();
        let near = world.add_body(RigidBody::new_fixed(Vec2::new(20.0, 0.0)));
        let far = world.add_body(RigidBody::new_fixed(Vec2::new(60.0, 0.0)));
        world.add_collider(ColliderDesc::shape(Circle::new(5.0).unwrap()), Some(near)).unwrap();
        world.add_collider(square(10.0), Some(far)).unwrap();
        world.step(16.0);

        let hits = world.ray_cast(&Ray::new(Vec2::ZERO, Vec2::RIGHT), &RayCastOptions::new());
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].body, Some(near));
        assert!((hits[0].distance - 15.0).abs() < 1e-6);
        assert!((hits[1].distance - 55.0).abs() < 1e-6);

        let hits = world.ray_cast(
            &Ray::new(Vec2::ZERO, Vec2::RIGHT),
            &RayCastOptions::new().with_max_distance(30.0),
        );
        assert_eq!(hits.len(), 1);
    }
}
