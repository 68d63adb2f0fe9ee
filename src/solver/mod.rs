//! Contact resolution strategies.
//!
//! A solver receives the narrowphase contacts for one step and runs the phases
//! `pre_solve → warm_start → solve_position → solve_velocity → post_solve` in that order.
//! Cancelled contacts and contacts touching a killed body are skipped by every phase after
//! `pre_solve`, but are still returned so overlap bookkeeping stays in sync.

pub mod box_solver;
pub mod rigid_body_solver;

pub use box_solver::BoxSolver;
pub use rigid_body_solver::{ContactPoint, RigidBodySolver};

use std::collections::HashMap;

use crate::collision::{ColliderSet, CollisionEvent, CollisionEventKind, Contact, ContactId};
use crate::common::CollisionType;
use crate::config::SleepConfig;
use crate::objects::{BodyHandle, BodySet, RigidBody};

pub trait CollisionSolver {
    /// Raises pre-resolution events and prepares per-contact state.
    fn pre_solve(&mut self, contacts: &mut [Contact], colliders: &mut ColliderSet, bodies: &mut BodySet);

    /// Re-applies impulses cached from the previous step.
    fn warm_start(&mut self, _contacts: &[Contact], _bodies: &mut BodySet) {}

    fn solve_position(&mut self, contacts: &mut [Contact], colliders: &ColliderSet, bodies: &mut BodySet);

    fn solve_velocity(&mut self, contacts: &mut [Contact], colliders: &ColliderSet, bodies: &mut BodySet);

    /// Raises post-resolution events and snapshots this step's contacts.
    fn post_solve(&mut self, contacts: &[Contact], colliders: &mut ColliderSet, bodies: &mut BodySet);

    /// Contacts seen by the last `post_solve`, cancelled ones included.
    fn last_frame_contacts(&self) -> &HashMap<ContactId, Contact>;

    fn position_iterations(&self) -> usize {
        1
    }

    fn velocity_iterations(&self) -> usize {
        1
    }

    /// Runs every phase in order and hands the contacts back.
    fn solve(&mut self, mut contacts: Vec<Contact>, colliders: &mut ColliderSet, bodies: &mut BodySet) -> Vec<Contact> {
        self.pre_solve(&mut contacts, colliders, bodies);
        self.warm_start(&contacts, bodies);
        for _ in 0..self.position_iterations() {
            self.solve_position(&mut contacts, colliders, bodies);
        }
        for _ in 0..self.velocity_iterations() {
            self.solve_velocity(&mut contacts, colliders, bodies);
        }
        self.post_solve(&contacts, colliders, bodies);
        contacts
    }
}

/// Collision type of an optional body; body-less geometry is `Fixed`.
pub(crate) fn collision_type(bodies: &BodySet, handle: Option<BodyHandle>) -> CollisionType {
    handle
        .and_then(|h| bodies.get(h))
        .map_or(CollisionType::Fixed, |b| b.collision_type)
}

pub(crate) fn involves_passive(bodies: &BodySet, contact: &Contact) -> bool {
    collision_type(bodies, contact.body_a) == CollisionType::Passive
        || collision_type(bodies, contact.body_b) == CollisionType::Passive
}

/// Runs `f` on the body if it exists.
pub(crate) fn with_body(bodies: &mut BodySet, handle: Option<BodyHandle>, f: impl FnOnce(&mut RigidBody)) {
    if let Some(body) = handle.and_then(|h| bodies.get_mut(h)) {
        f(body);
    }
}

/// Emits `kind` on A then B (B sees the opposite side and negated MTV) and applies the
/// handlers' responses: cancelling the contact and killing the responding side's body.
pub(crate) fn emit_contact_events(
    kind: CollisionEventKind,
    contact: &mut Contact,
    colliders: &mut ColliderSet,
    bodies: &mut BodySet,
) {
    let side = contact.side();
    let sides = [
        (contact.collider_a, contact.collider_b, contact.body_a, side, contact.mtv),
        (contact.collider_b, contact.collider_a, contact.body_b, side.opposite(), -contact.mtv),
    ];
    for (this, other, body, side, mtv) in sides {
        let response = colliders.emit(&CollisionEvent {
            kind,
            this,
            other: Some(other),
            side,
            mtv,
            contact: Some(contact),
        });
        if response.is_cancelled() {
            contact.cancel();
        }
        if response.is_killed() {
            with_body(bodies, body, RigidBody::kill);
        }
    }
}

/// Wakes a sleeping participant when the other one is moving enough.
pub(crate) fn match_awake(contact: &Contact, bodies: &mut BodySet, sleep: &SleepConfig) {
    let (Some(a), Some(b)) = (contact.body_a, contact.body_b) else {
        return;
    };
    let Some((body_a, body_b)) = bodies.get_pair_mut(a, b) else {
        return;
    };
    if body_a.is_sleeping() == body_b.is_sleeping() {
        return;
    }
    let threshold = sleep.sleep_epsilon * sleep.wake_threshold_factor;
    if body_a.is_sleeping() && body_a.collision_type != CollisionType::Fixed && body_b.sleep_motion() >= threshold {
        body_a.set_sleeping(false, sleep);
    }
    if body_b.is_sleeping() && body_b.collision_type != CollisionType::Fixed && body_a.sleep_motion() >= threshold {
        body_b.set_sleeping(false, sleep);
    }
}

/// Replaces `store` with this step's contacts.
pub(crate) fn snapshot(store: &mut HashMap<ContactId, Contact>, contacts: &[Contact]) {
    store.clear();
    store.extend(contacts.iter().map(|c| (c.id, c.clone())));
}
