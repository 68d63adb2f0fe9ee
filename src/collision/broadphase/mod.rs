//! Broadphase: cheap spatial culling of collider pairs, plus ray queries.
//!
//! Both processors only answer spatial questions (`query`, `ray_query`); pair filtering,
//! the fast-body pass and hit ordering are shared by the provided trait methods.

pub mod dynamic_tree;
pub mod ray_cast;
pub mod sparse_hash_grid;

pub use dynamic_tree::{DynamicTree, DynamicTreeProcessor};
pub use ray_cast::{RayCastFilter, RayCastHit, RayCastOptions};
pub use sparse_hash_grid::{SparseHashGrid, SparseHashGridProcessor};

use std::collections::HashSet;

use log::{debug, trace};

use crate::common::{CollisionGroup, CollisionType};
use crate::config::{CompositeStrategy, ContinuousConfig};
use crate::math::{Ray, Vec2};
use crate::objects::BodySet;

use super::aabb::AABB;
use super::collider::{ColliderId, ColliderSet};
use super::contact::{Contact, PairId};
use super::pair::Pair;

/// Spatial index over tracked leaf colliders.
pub trait CollisionProcessor {
    /// Starts tracking a leaf collider at its current bounds.
    fn track(&mut self, id: ColliderId, colliders: &ColliderSet, bodies: &BodySet);

    fn untrack(&mut self, id: ColliderId);

    /// Tracked collider ids in ascending order.
    fn tracked(&self) -> Vec<ColliderId>;

    /// Refreshes the index from current collider bounds. Returns how many entries moved.
    fn update(&mut self, colliders: &ColliderSet, bodies: &BodySet) -> usize;

    /// Colliders whose indexed bounds overlap `bounds`.
    fn query(&self, bounds: &AABB) -> Vec<ColliderId>;

    /// Colliders whose indexed bounds the ray enters within `max_distance`.
    fn ray_query(&self, ray: &Ray, max_distance: f64) -> Vec<ColliderId>;

    /// Candidate pairs for this step. Runs the fast-body pass when enabled, which may move bodies.
    fn broadphase(
        &mut self,
        colliders: &ColliderSet,
        bodies: &mut BodySet,
        elapsed_ms: f64,
        continuous: &ContinuousConfig,
    ) -> Vec<Pair> {
        let mut seen: HashSet<PairId> = HashSet::new();
        let mut pairs = Vec::new();

        let candidates: Vec<ColliderId> = self
            .tracked()
            .into_iter()
            .filter(|id| participates(colliders, bodies, *id))
            .collect();

        for &id in &candidates {
            let Some(bounds) = colliders.bounds(id, bodies) else {
                continue;
            };
            for other in self.query(&bounds) {
                let pair = Pair::new(id, other);
                if !seen.contains(&pair.id) && Pair::can_collide(colliders, bodies, id, other) {
                    seen.insert(pair.id);
                    pairs.push(pair);
                }
            }
        }
        debug!("broadphase: {} candidate pairs from {} colliders", pairs.len(), candidates.len());

        if continuous.check_for_fast_bodies {
            for &id in &candidates {
                if let Some(pair) = fast_body_pair(self, colliders, bodies, id, elapsed_ms, continuous, &seen) {
                    seen.insert(pair.id);
                    pairs.push(pair);
                }
            }
        }
        pairs
    }

    /// Contacts for every candidate pair.
    fn narrowphase(
        &self,
        pairs: &[Pair],
        colliders: &ColliderSet,
        bodies: &BodySet,
        strategy: CompositeStrategy,
    ) -> Vec<Contact> {
        let contacts: Vec<Contact> = pairs
            .iter()
            .flat_map(|pair| pair.collide(colliders, bodies, strategy))
            .collect();
        debug!("narrowphase: {} contacts from {} pairs", contacts.len(), pairs.len());
        contacts
    }

    /// Colliders hit by `ray`, nearest first.
    fn ray_cast(
        &self,
        ray: &Ray,
        options: &RayCastOptions,
        colliders: &ColliderSet,
        bodies: &BodySet,
    ) -> Vec<RayCastHit> {
        let mut hits = Vec::new();
        for id in self.ray_query(ray, options.max_distance) {
            let Some(collider) = colliders.get(id) else {
                continue;
            };
            let group = collider
                .owner
                .and_then(|h| bodies.get(h))
                .map_or(CollisionGroup::ALL, |b| b.group);
            if !options.accepts(group) {
                continue;
            }
            let Ok(shape) = colliders.world_shape(id, bodies) else {
                continue;
            };
            let Some(shape_hit) = shape.ray_cast(ray, options.max_distance) else {
                continue;
            };
            let hit = RayCastHit {
                distance: shape_hit.distance,
                point: shape_hit.point,
                normal: shape_hit.normal,
                collider: id,
                body: collider.owner,
            };
            if options.filter.as_ref().map_or(true, |filter| filter(&hit)) {
                hits.push(hit);
            }
        }
        ray_cast::finalize_hits(hits, options.search_all_colliders)
    }
}

/// Live, collidable colliders that may start a pair.
fn participates(colliders: &ColliderSet, bodies: &BodySet, id: ColliderId) -> bool {
    let Some(collider) = colliders.get(id) else {
        return false;
    };
    match collider.owner.and_then(|h| bodies.get(h)) {
        Some(body) => body.is_active() && body.collision_type != CollisionType::PreventCollision,
        None => collider.owner.is_none(),
    }
}

/// Traces an `Active` body that would cross more than half its size this step.
/// On a hit the body is moved onto the surface and the pair is returned.
/// Composite children are skipped.
fn fast_body_pair<P: CollisionProcessor + ?Sized>(
    processor: &P,
    colliders: &ColliderSet,
    bodies: &mut BodySet,
    id: ColliderId,
    elapsed_ms: f64,
    continuous: &ContinuousConfig,
    seen: &HashSet<PairId>,
) -> Option<Pair> {
    let collider = colliders.get(id)?;
    if collider.composite.is_some() {
        return None;
    }
    let handle = collider.owner?;
    let body = bodies.get(handle)?;
    if body.collision_type != CollisionType::Active || body.linear_velocity == Vec2::ZERO {
        return None;
    }

    let seconds = elapsed_ms / 1000.0;
    let update_distance = body.linear_velocity.magnitude() * seconds;
    let shape = colliders.world_shape(id, bodies).ok()?;
    let bounds = shape.bounds();
    let min_dimension = bounds.width().min(bounds.height());
    if !continuous.disable_minimum_speed_for_fast_body && update_distance <= min_dimension / 2.0 {
        return None;
    }

    // Start from where the body was before integration; a resting body may already penetrate
    let update_vec = body.position - body.old_position;
    let center = shape.center();
    let furthest = shape.furthest_point(body.linear_velocity);
    let origin = furthest - update_vec;
    let mut ray = Ray::new(origin, body.linear_velocity);
    ray.origin = ray.origin + ray.dir * (-2.0 * continuous.surface_epsilon);

    let mut nearest: Option<(ColliderId, Vec2)> = None;
    for other in processor.ray_query(&ray, update_distance + continuous.surface_epsilon * 2.0) {
        if seen.contains(&PairId::new(id, other)) || !Pair::can_collide(colliders, bodies, id, other) {
            continue;
        }
        let Ok(other_shape) = colliders.world_shape(other, bodies) else {
            continue;
        };
        if let Some(hit) = other_shape.ray_cast(&ray, update_distance + continuous.surface_epsilon * 10.0) {
            let translate = hit.point - origin;
            if nearest.map_or(true, |(_, best)| translate.magnitude() < best.magnitude()) {
                nearest = Some((other, translate));
            }
        }
    }

    let (other, translate) = nearest?;
    if !translate.is_finite() {
        return None;
    }
    // Land the shape on the surface, nudged slightly into contact
    let shift = center - furthest;
    let target_center = origin + shift + translate + ray.dir * (10.0 * continuous.surface_epsilon);
    let body = bodies.get_mut(handle)?;
    body.position += target_center - center;
    trace!("fast body {} traced onto collider {}", id, other);
    Some(Pair::new(id, other))
}
