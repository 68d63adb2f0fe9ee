use crate::config::CompositeStrategy;
use crate::objects::BodySet;

use super::collider::{ColliderId, ColliderSet};
use super::contact::{Contact, ContactId, PairId};
use super::detection::collide_shapes;

/// Contacts between two colliders of any kind. Composites are flattened to their leaves and every
/// leaf pair is tested; children of the same composite never collide with each other.
pub fn collide(
    colliders: &ColliderSet,
    bodies: &BodySet,
    a: ColliderId,
    b: ColliderId,
    strategy: CompositeStrategy,
) -> Vec<Contact> {
    let leaves_a = colliders.flatten_ids(a);
    let leaves_b = colliders.flatten_ids(b);
    let mut contacts = Vec::new();

    for &leaf_a in &leaves_a {
        for &leaf_b in &leaves_b {
            if let Some(contact) = collide_leaves(colliders, bodies, leaf_a, leaf_b, strategy) {
                contacts.push(contact);
            }
        }
    }
    contacts
}

fn collide_leaves(
    colliders: &ColliderSet,
    bodies: &BodySet,
    a: ColliderId,
    b: ColliderId,
    strategy: CompositeStrategy,
) -> Option<Contact> {
    if a == b {
        return None;
    }
    let collider_a = colliders.get(a)?;
    let collider_b = colliders.get(b)?;
    if collider_a.composite.is_some() && collider_a.composite == collider_b.composite {
        return None;
    }

    let shape_a = colliders.world_shape(a, bodies).ok()?;
    let shape_b = colliders.world_shape(b, bodies).ok()?;
    let manifold = collide_shapes(&shape_a, &shape_b)?;

    let id = contact_id(a, collider_a.composite, b, collider_b.composite, strategy);
    Some(
        Contact::new(id, a, b, manifold.mtv(), manifold.normal, manifold.points.clone(), manifold.separation())
            .with_bodies(bodies, collider_a.owner, collider_b.owner),
    )
}

/// Plain leaves get `#a+b`. With a composite on either side, `Together` scopes the contact to
/// the composites (`#a+b|#A+B`) while `Separate` keeps the bare leaf pair (`#a+b`).
pub fn contact_id(
    a: ColliderId,
    composite_a: Option<ColliderId>,
    b: ColliderId,
    composite_b: Option<ColliderId>,
    strategy: CompositeStrategy,
) -> ContactId {
    let pair = PairId::new(a, b);
    if composite_a.is_none() && composite_b.is_none() {
        return ContactId::new(pair);
    }
    match strategy {
        CompositeStrategy::Together => {
            ContactId::scoped(pair, PairId::new(composite_a.unwrap_or(a), composite_b.unwrap_or(b)))
        }
        CompositeStrategy::Separate => ContactId::new(pair),
    }
}
