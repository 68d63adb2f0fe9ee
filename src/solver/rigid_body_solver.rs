//! Iterative impulse solver with warm starting.
//!
//! Each contact point keeps its accumulated normal and tangent impulse across steps while the
//! contact persists. Re-applying those impulses before iterating is what keeps stacks at rest.

use std::collections::HashMap;

use log::trace;

use crate::collision::{ColliderSet, CollisionEventKind, Contact, ContactId};
use crate::common::{CollisionType, Material};
use crate::config::{RigidBodyConfig, SleepConfig};
use crate::math::Vec2;
use crate::objects::{BodyHandle, BodySet};

use super::{collision_type, emit_contact_events, involves_passive, match_awake, snapshot, with_body, CollisionSolver};

/// Solver state for one point of a contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    pub point: Vec2,
    /// Lever arm from body A's position to the point.
    pub a_to_contact: Vec2,
    pub b_to_contact: Vec2,
    /// Accumulated normal impulse; never negative.
    pub normal_impulse: f64,
    /// Accumulated friction impulse; bounded by `friction * normal_impulse`.
    pub tangent_impulse: f64,
    /// Effective mass along the normal, as `invMassA + invMassB + angular terms`.
    pub normal_mass: f64,
    pub tangent_mass: f64,
}

impl ContactPoint {
    fn new(point: Vec2) -> Self {
        Self {
            point,
            a_to_contact: Vec2::ZERO,
            b_to_contact: Vec2::ZERO,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
            normal_mass: 0.0,
            tangent_mass: 0.0,
        }
    }
}

/// Mass properties of one side of a contact. Missing bodies behave as `Fixed`.
#[derive(Clone, Copy)]
struct Participant {
    position: Vec2,
    inv_mass: f64,
    inv_inertia: f64,
    material: Material,
}

impl Participant {
    fn of(bodies: &BodySet, handle: Option<BodyHandle>) -> Self {
        match handle.and_then(|h| bodies.get(h)) {
            Some(body) => Self {
                position: body.position,
                inv_mass: body.inverse_mass(),
                inv_inertia: body.inverse_inertia(),
                material: body.material,
            },
            None => Self {
                position: Vec2::ZERO,
                inv_mass: 0.0,
                inv_inertia: 0.0,
                material: Material::default(),
            },
        }
    }
}

fn velocity_at(bodies: &BodySet, handle: Option<BodyHandle>, point: Vec2) -> Vec2 {
    handle
        .and_then(|h| bodies.get(h))
        .map_or(Vec2::ZERO, |body| body.velocity_at(point))
}

fn relative_velocity(bodies: &BodySet, contact: &Contact, point: Vec2) -> Vec2 {
    velocity_at(bodies, contact.body_b, point) - velocity_at(bodies, contact.body_a, point)
}

fn effective_mass(a: &Participant, b: &Participant, ra: Vec2, rb: Vec2, direction: Vec2) -> f64 {
    let ra_n = ra.cross(direction);
    let rb_n = rb.cross(direction);
    a.inv_mass + b.inv_mass + a.inv_inertia * ra_n * ra_n + b.inv_inertia * rb_n * rb_n
}

/// Applies `impulse` to B and its negation to A.
fn apply_pair_impulse(bodies: &mut BodySet, contact: &Contact, point: Vec2, impulse: Vec2) {
    with_body(bodies, contact.body_a, |body| body.apply_impulse(point, -impulse));
    with_body(bodies, contact.body_b, |body| body.apply_impulse(point, impulse));
}

#[derive(Debug, Default)]
pub struct RigidBodySolver {
    pub config: RigidBodyConfig,
    pub sleep: SleepConfig,
    points: HashMap<ContactId, Vec<ContactPoint>>,
    last_frame: HashMap<ContactId, Contact>,
}

impl RigidBodySolver {
    pub fn new(config: RigidBodyConfig, sleep: SleepConfig) -> Self {
        Self {
            config,
            sleep,
            ..Default::default()
        }
    }

    /// Cached solver points for a contact; empty when the contact is unknown.
    pub fn contact_points(&self, id: &ContactId) -> &[ContactPoint] {
        self.points.get(id).map_or(&[], Vec::as_slice)
    }

    /// Brings the cached points in line with this step's contacts, keeping the accumulated
    /// impulses of points that barely moved and dropping contacts that disappeared.
    fn reconcile_points(&mut self, contacts: &[Contact], bodies: &BodySet) {
        let mut current = HashMap::with_capacity(contacts.len());
        for contact in contacts {
            let mut cached = self.points.remove(&contact.id).unwrap_or_default();
            let a = Participant::of(bodies, contact.body_a);
            let b = Participant::of(bodies, contact.body_b);

            let mut points = Vec::with_capacity(contact.points.len());
            for (index, &point) in contact.points.iter().enumerate() {
                let mut solver_point = match cached.get_mut(index) {
                    Some(previous) if previous.point.distance_squared(point) < self.config.warm_start_distance_squared => {
                        previous.point = point;
                        *previous
                    }
                    _ => ContactPoint::new(point),
                };
                let ra = point - a.position;
                let rb = point - b.position;
                solver_point.a_to_contact = ra;
                solver_point.b_to_contact = rb;
                solver_point.normal_mass = effective_mass(&a, &b, ra, rb, contact.normal);
                solver_point.tangent_mass = effective_mass(&a, &b, ra, rb, contact.tangent);
                points.push(solver_point);
            }
            current.insert(contact.id, points);
        }
        let dropped = self.points.len();
        if dropped > 0 {
            trace!("dropping solver points for {dropped} finished contacts");
        }
        self.points = current;
    }

    fn skip(contact: &Contact, bodies: &BodySet) -> bool {
        !contact.is_live(bodies) || involves_passive(bodies, contact)
    }
}

impl CollisionSolver for RigidBodySolver {
    fn pre_solve(&mut self, contacts: &mut [Contact], colliders: &mut ColliderSet, bodies: &mut BodySet) {
        for contact in contacts.iter_mut() {
            emit_contact_events(CollisionEventKind::PreCollision, contact, colliders, bodies);
            emit_contact_events(CollisionEventKind::BeforeCollisionResolve, contact, colliders, bodies);
            match_awake(contact, bodies, &self.sleep);
        }
        self.reconcile_points(contacts, bodies);
    }

    fn warm_start(&mut self, contacts: &[Contact], bodies: &mut BodySet) {
        for contact in contacts {
            let Some(points) = self.points.get_mut(&contact.id) else {
                continue;
            };
            if !self.config.warm_start {
                for point in points.iter_mut() {
                    point.normal_impulse = 0.0;
                    point.tangent_impulse = 0.0;
                }
                continue;
            }
            if Self::skip(contact, bodies) {
                continue;
            }
            let damping = self.config.warm_start_tangent_damping;
            for point in points.iter() {
                let normal = contact.normal * point.normal_impulse;
                let tangent = contact.tangent * (point.tangent_impulse * damping);
                with_body(bodies, contact.body_a, |body| {
                    body.apply_linear_impulse(-normal);
                    body.apply_angular_impulse(point.point, -tangent);
                });
                with_body(bodies, contact.body_b, |body| {
                    body.apply_linear_impulse(normal);
                    body.apply_angular_impulse(point.point, tangent);
                });
            }
        }
    }

    fn solve_position(&mut self, contacts: &mut [Contact], _colliders: &ColliderSet, bodies: &mut BodySet) {
        let config = &self.config;
        for contact in contacts.iter() {
            if Self::skip(contact, bodies) {
                continue;
            }
            let active_a = collision_type(bodies, contact.body_a) == CollisionType::Active;
            let active_b = collision_type(bodies, contact.body_b) == CollisionType::Active;
            let Some(points) = self.points.get(&contact.id) else {
                continue;
            };
            for point in points.iter().filter(|p| p.normal_mass > 0.0) {
                let separation = contact.current_separation(bodies);
                let steering = (config.steering_factor * (separation + config.slop)).clamp(-config.max_correction, 0.0);
                let impulse = contact.normal * (-steering / point.normal_mass);

                if active_a {
                    with_body(bodies, contact.body_a, |body| {
                        body.position -= impulse * body.inverse_mass();
                        body.rotation -= point.a_to_contact.cross(impulse) * body.inverse_inertia();
                    });
                }
                if active_b {
                    with_body(bodies, contact.body_b, |body| {
                        body.position += impulse * body.inverse_mass();
                        body.rotation += point.b_to_contact.cross(impulse) * body.inverse_inertia();
                    });
                }
            }
        }
    }

    fn solve_velocity(&mut self, contacts: &mut [Contact], _colliders: &ColliderSet, bodies: &mut BodySet) {
        for contact in contacts.iter() {
            if Self::skip(contact, bodies) {
                continue;
            }
            let a = Participant::of(bodies, contact.body_a);
            let b = Participant::of(bodies, contact.body_b);
            let friction = Material::mix_friction(&a.material, &b.material);
            let restitution = Material::mix_bounciness(&a.material, &b.material);
            let Some(points) = self.points.get_mut(&contact.id) else {
                continue;
            };

            // Friction first: its bound uses the normal impulse accumulated so far
            for point in points.iter_mut().filter(|p| p.tangent_mass > 0.0) {
                let relative = relative_velocity(bodies, contact, point.point);
                let tangent_velocity = -relative.dot(contact.tangent);
                let max_friction = friction * point.normal_impulse;
                let accumulated =
                    (point.tangent_impulse + tangent_velocity / point.tangent_mass).clamp(-max_friction, max_friction);
                let delta = accumulated - point.tangent_impulse;
                point.tangent_impulse = accumulated;
                apply_pair_impulse(bodies, contact, point.point, contact.tangent * delta);
            }

            for point in points.iter_mut().filter(|p| p.normal_mass > 0.0) {
                let relative = relative_velocity(bodies, contact, point.point);
                let normal_velocity = relative.dot(contact.normal);
                let delta = -(1.0 + restitution) * normal_velocity / point.normal_mass;
                // Contacts only push
                let accumulated = (point.normal_impulse + delta).max(0.0);
                let delta = accumulated - point.normal_impulse;
                point.normal_impulse = accumulated;
                apply_pair_impulse(bodies, contact, point.point, contact.normal * delta);
            }
        }
    }

    fn post_solve(&mut self, contacts: &[Contact], colliders: &mut ColliderSet, bodies: &mut BodySet) {
        for contact in contacts {
            if Self::skip(contact, bodies) {
                continue;
            }
            with_body(bodies, contact.body_a, |body| body.update_motion(&self.sleep));
            with_body(bodies, contact.body_b, |body| body.update_motion(&self.sleep));

            let mut contact = contact.clone();
            emit_contact_events(CollisionEventKind::PostCollision, &mut contact, colliders, bodies);
            emit_contact_events(CollisionEventKind::AfterCollisionResolve, &mut contact, colliders, bodies);
        }
        snapshot(&mut self.last_frame, contacts);
    }

    fn last_frame_contacts(&self) -> &HashMap<ContactId, Contact> {
        &self.last_frame
    }

    fn position_iterations(&self) -> usize {
        self.config.position_iterations
    }

    fn velocity_iterations(&self) -> usize {
        self.config.velocity_iterations
    }
}
