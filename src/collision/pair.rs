use crate::common::{CollisionGroup, CollisionType};
use crate::config::CompositeStrategy;
use crate::objects::BodySet;

use super::collider::{ColliderId, ColliderSet};
use super::contact::{Contact, PairId};
use super::narrowphase;

/// Candidate pair produced by the broadphase. `a` always has the lower id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pair {
    pub a: ColliderId,
    pub b: ColliderId,
    pub id: PairId,
}

/// Collision-relevant state of a collider's owner. Body-less geometry acts as a live `Fixed` body.
struct Participant {
    collision_type: CollisionType,
    group: CollisionGroup,
    alive: bool,
}

impl Pair {
    pub fn new(a: ColliderId, b: ColliderId) -> Self {
        let id = PairId::new(a, b);
        Self { a: id.low, b: id.high, id }
    }

    /// Whether two colliders may produce contacts at all.
    pub fn can_collide(colliders: &ColliderSet, bodies: &BodySet, a: ColliderId, b: ColliderId) -> bool {
        if a == b {
            return false;
        }
        let (Some(collider_a), Some(collider_b)) = (colliders.get(a), colliders.get(b)) else {
            return false;
        };
        if collider_a.owner.is_some() && collider_a.owner == collider_b.owner {
            return false;
        }
        if collider_a.composite.is_some() && collider_a.composite == collider_b.composite {
            return false;
        }

        // Degenerate geometry has nothing to resolve
        let point_sized = |id| colliders.bounds(id, bodies).map_or(true, |bounds| bounds.is_point());
        if point_sized(a) && point_sized(b) {
            return false;
        }

        let participant = |owner: Option<crate::objects::BodyHandle>| match owner.and_then(|h| bodies.get(h)) {
            Some(body) => Participant {
                collision_type: body.collision_type,
                group: body.group,
                alive: body.is_active(),
            },
            None => Participant {
                collision_type: CollisionType::Fixed,
                group: CollisionGroup::ALL,
                alive: true,
            },
        };
        let pa = participant(collider_a.owner);
        let pb = participant(collider_b.owner);

        if !pa.group.can_collide(&pb.group) {
            return false;
        }
        if pa.collision_type == CollisionType::Fixed && pb.collision_type == CollisionType::Fixed {
            return false;
        }
        if pa.collision_type == CollisionType::PreventCollision || pb.collision_type == CollisionType::PreventCollision {
            return false;
        }
        pa.alive && pb.alive
    }

    /// Runs the narrowphase on this pair.
    pub fn collide(&self, colliders: &ColliderSet, bodies: &BodySet, strategy: CompositeStrategy) -> Vec<Contact> {
        narrowphase::collide(colliders, bodies, self.a, self.b, strategy)
    }
}
