use std::collections::{HashMap, HashSet};

use log::trace;

use crate::collision::{ColliderSet, CollisionEventKind, Contact, ContactId, PairId};
use crate::common::{CollisionType, Side};
use crate::config::ArcadeConfig;
use crate::objects::BodySet;

use super::{collision_type, emit_contact_events, involves_passive, snapshot, with_body, CollisionSolver};

/// Arcade-style resolution: removes overlap by pushing bodies apart along the MTV and
/// cancels the velocity component heading into the contact. No rotation, no bounce.
#[derive(Debug, Default)]
pub struct BoxSolver {
    pub config: ArcadeConfig,
    horizontal: HashMap<ContactId, bool>,
    distance: HashMap<ContactId, f64>,
    last_frame: HashMap<ContactId, Contact>,
}

impl BoxSolver {
    pub fn new(config: ArcadeConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    fn near_zero_mtv(&self, contact: &Contact) -> bool {
        contact.mtv.x.abs() < self.config.mtv_epsilon && contact.mtv.y.abs() < self.config.mtv_epsilon
    }

    /// Order in which contacts are solved: bias rank, then shallowest first.
    fn sort(&self, contacts: &mut [Contact]) {
        let bias = self.config.contact_solve_bias;
        contacts.sort_by(|a, b| {
            let rank_a = bias.rank(self.horizontal.get(&a.id).copied().unwrap_or(false));
            let rank_b = bias.rank(self.horizontal.get(&b.id).copied().unwrap_or(false));
            let dist_a = self.distance.get(&a.id).copied().unwrap_or(0.0);
            let dist_b = self.distance.get(&b.id).copied().unwrap_or(0.0);
            rank_a.cmp(&rank_b).then(dist_a.total_cmp(&dist_b))
        });
    }

    fn solve_contact_position(&self, contact: &mut Contact, colliders: &ColliderSet, bodies: &mut BodySet) {
        if !contact.is_live(bodies) {
            return;
        }
        let still_overlapping = match (
            colliders.bounds(contact.collider_a, bodies),
            colliders.bounds(contact.collider_b, bodies),
        ) {
            (Some(a), Some(b)) => a.overlaps_with_epsilon(&b, self.config.mtv_epsilon),
            _ => false,
        };
        if !still_overlapping || self.near_zero_mtv(contact) {
            trace!("contact {} no longer overlapping, cancelled", contact.id);
            contact.cancel();
            return;
        }
        if involves_passive(bodies, contact) {
            return;
        }

        let type_a = collision_type(bodies, contact.body_a);
        let type_b = collision_type(bodies, contact.body_b);
        let mut mtv = contact.mtv;
        if type_a == CollisionType::Active && type_b == CollisionType::Active {
            mtv = mtv * 0.5;
        }
        if type_a == CollisionType::Active {
            with_body(bodies, contact.body_a, |body| body.position -= mtv);
        }
        if type_b == CollisionType::Active {
            with_body(bodies, contact.body_b, |body| body.position += mtv);
        }
    }

    fn solve_contact_velocity(&self, contact: &Contact, bodies: &mut BodySet) {
        if !contact.is_live(bodies) || involves_passive(bodies, contact) {
            return;
        }
        let normal = contact.normal;
        let opposite = -normal;

        if collision_type(bodies, contact.body_a) == CollisionType::Active {
            with_body(bodies, contact.body_a, |body| {
                // Only cancel velocity heading into the contact so bodies can slide off ledges
                if body.linear_velocity.normalize().dot(opposite) < 0.0 {
                    body.linear_velocity += normal * normal.dot(-body.linear_velocity);
                }
            });
        }
        if collision_type(bodies, contact.body_b) == CollisionType::Active {
            with_body(bodies, contact.body_b, |body| {
                if body.linear_velocity.normalize().dot(normal) < 0.0 {
                    body.linear_velocity += opposite * opposite.dot(-body.linear_velocity);
                }
            });
        }
    }
}

impl CollisionSolver for BoxSolver {
    fn pre_solve(&mut self, contacts: &mut [Contact], colliders: &mut ColliderSet, bodies: &mut BodySet) {
        self.horizontal.clear();
        self.distance.clear();
        let mut seen_scopes: HashSet<PairId> = HashSet::new();

        for contact in contacts.iter_mut() {
            // Composite pairs solved together only need one of their child contacts
            if let Some(scope) = contact.id.scope {
                if !seen_scopes.insert(scope) {
                    contact.cancel();
                    continue;
                }
            }
            if self.near_zero_mtv(contact) {
                contact.cancel();
                continue;
            }

            let side = contact.side();
            self.horizontal.insert(contact.id, matches!(side, Side::Left | Side::Right));
            self.distance.insert(contact.id, contact.separation.abs());

            emit_contact_events(CollisionEventKind::PreCollision, contact, colliders, bodies);
        }
    }

    fn solve_position(&mut self, contacts: &mut [Contact], colliders: &ColliderSet, bodies: &mut BodySet) {
        for contact in contacts.iter_mut() {
            self.solve_contact_position(contact, colliders, bodies);
        }
    }

    fn solve_velocity(&mut self, contacts: &mut [Contact], _colliders: &ColliderSet, bodies: &mut BodySet) {
        for contact in contacts.iter() {
            self.solve_contact_velocity(contact, bodies);
        }
    }

    fn post_solve(&mut self, contacts: &[Contact], colliders: &mut ColliderSet, bodies: &mut BodySet) {
        for contact in contacts {
            if !contact.is_live(bodies) || involves_passive(bodies, contact) {
                continue;
            }
            let mut contact = contact.clone();
            emit_contact_events(CollisionEventKind::PostCollision, &mut contact, colliders, bodies);
        }
        snapshot(&mut self.last_frame, contacts);
    }

    fn last_frame_contacts(&self) -> &HashMap<ContactId, Contact> {
        &self.last_frame
    }

    /// Contacts are solved one at a time, position then velocity, so the correction of one
    /// contact is visible to the overlap check of the next.
    fn solve(&mut self, mut contacts: Vec<Contact>, colliders: &mut ColliderSet, bodies: &mut BodySet) -> Vec<Contact> {
        self.pre_solve(&mut contacts, colliders, bodies);
        self.sort(&mut contacts);
        for contact in contacts.iter_mut() {
            if contact.is_cancelled() {
                continue;
            }
            self.solve_contact_position(contact, colliders, bodies);
            self.solve_contact_velocity(contact, bodies);
        }
        self.post_solve(&contacts, colliders, bodies);
        contacts
    }
}
