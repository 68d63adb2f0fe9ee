use std::fmt;

use crate::collision::collider::ColliderId;
use crate::common::CollisionGroup;
use crate::math::vec2::Vec2;
use crate::objects::BodyHandle;

/// One collider hit by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastHit {
    /// Distance from the ray origin to `point`.
    pub distance: f64,
    pub point: Vec2,
    /// Surface normal at `point`.
    pub normal: Vec2,
    pub collider: ColliderId,
    /// `None` for body-less geometry.
    pub body: Option<BodyHandle>,
}

pub type RayCastFilter = Box<dyn Fn(&RayCastHit) -> bool>;

/// Controls which colliders a ray cast reports.
pub struct RayCastOptions {
    pub max_distance: f64,
    /// When set, only bodies whose category matches this group's category are hit; overrides `collision_mask`.
    pub collision_group: Option<CollisionGroup>,
    /// Category bits a body must share with the ray to be hit.
    pub collision_mask: u32,
    /// Report every collider hit instead of only the nearest per body.
    pub search_all_colliders: bool,
    /// Skip bodies whose group is `CollisionGroup::ALL`.
    pub ignore_collision_group_all: bool,
    /// Arbitrary predicate; hits it rejects are dropped.
    pub filter: Option<RayCastFilter>,
}

impl RayCastOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_distance(mut self, max_distance: f64) -> Self {
        self.max_distance = max_distance;
        self
    }

    pub fn with_collision_group(mut self, group: CollisionGroup) -> Self {
        self.collision_group = Some(group);
        self
    }

    pub fn with_collision_mask(mut self, mask: u32) -> Self {
        self.collision_mask = mask;
        self
    }

    pub fn search_all_colliders(mut self) -> Self {
        self.search_all_colliders = true;
        self
    }

    pub fn ignore_collision_group_all(mut self) -> Self {
        self.ignore_collision_group_all = true;
        self
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&RayCastHit) -> bool + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Category bits the ray accepts.
    pub fn effective_mask(&self) -> u32 {
        self.collision_group.map_or(self.collision_mask, |g| g.category)
    }

    pub(crate) fn accepts(&self, group: CollisionGroup) -> bool {
        if self.ignore_collision_group_all && group == CollisionGroup::ALL {
            return false;
        }
        self.effective_mask() & group.category != 0
    }
}

impl Default for RayCastOptions {
    fn default() -> Self {
        Self {
            max_distance: f64::INFINITY,
            collision_group: None,
            collision_mask: CollisionGroup::ALL.category,
            search_all_colliders: false,
            ignore_collision_group_all: false,
            filter: None,
        }
    }
}

impl fmt::Debug for RayCastOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RayCastOptions")
            .field("max_distance", &self.max_distance)
            .field("collision_group", &self.collision_group)
            .field("collision_mask", &self.collision_mask)
            .field("search_all_colliders", &self.search_all_colliders)
            .field("ignore_collision_group_all", &self.ignore_collision_group_all)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

/// Sorts hits by distance and, unless `search_all` is set, keeps only the nearest hit per body.
/// Body-less colliders count as their own body.
pub fn finalize_hits(mut hits: Vec<RayCastHit>, search_all: bool) -> Vec<RayCastHit> {
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    if search_all {
        return hits;
    }
    let mut seen_bodies = std::collections::HashSet::new();
    let mut seen_colliders = std::collections::HashSet::new();
    hits.retain(|hit| match hit.body {
        Some(body) => seen_bodies.insert(body),
        None => seen_colliders.insert(hit.collider),
    });
    hits
}
