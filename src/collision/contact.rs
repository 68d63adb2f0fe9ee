use std::fmt;

use crate::common::Side;
use crate::math::vec2::Vec2;
use crate::objects::{BodyHandle, BodySet};

use super::collider::ColliderId;

/// Order-independent identity of two colliders. Displays as `#{min}+{max}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairId {
    pub low: ColliderId,
    pub high: ColliderId,
}

impl PairId {
    pub fn new(a: ColliderId, b: ColliderId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn contains(&self, id: ColliderId) -> bool {
        self.low == id || self.high == id
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}+{}", self.low.0, self.high.0)
    }
}

/// Identity of a contact across frames: the leaf pair plus an optional composite scope.
/// Displays as `#a+b` or `#a+b|#c+d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId {
    pub pair: PairId,
    pub scope: Option<PairId>,
}

impl ContactId {
    pub fn new(pair: PairId) -> Self {
        Self { pair, scope: None }
    }

    pub fn scoped(pair: PairId, scope: PairId) -> Self {
        Self {
            pair,
            scope: Some(scope),
        }
    }

    /// Key used for start/end bookkeeping: the scope when present, else the leaf pair.
    pub fn key(&self) -> PairId {
        self.scope.unwrap_or(self.pair)
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Some(scope) => write!(f, "{}|{}", self.pair, scope),
            None => write!(f, "{}", self.pair),
        }
    }
}

/// One overlap between two leaf colliders for the current step.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub id: ContactId,
    pub collider_a: ColliderId,
    pub collider_b: ColliderId,
    /// `None` for static geometry without a body, which behaves as `Fixed`.
    pub body_a: Option<BodyHandle>,
    pub body_b: Option<BodyHandle>,
    /// Minimum translation vector, pointing away from A.
    pub mtv: Vec2,
    /// Unit normal pointing from A toward B.
    pub normal: Vec2,
    /// `normal` rotated 90 degrees.
    pub tangent: Vec2,
    /// World-space contact points.
    pub points: Vec<Vec2>,
    /// Signed distance at generation time; negative while penetrating.
    pub separation: f64,
    anchor_a: Vec2,
    anchor_b: Vec2,
    cancelled: bool,
}

impl Contact {
    pub fn new(
        id: ContactId,
        collider_a: ColliderId,
        collider_b: ColliderId,
        mtv: Vec2,
        normal: Vec2,
        points: Vec<Vec2>,
        separation: f64,
    ) -> Self {
        Self {
            id,
            collider_a,
            collider_b,
            body_a: None,
            body_b: None,
            mtv,
            normal,
            tangent: normal.perpendicular(),
            points,
            separation,
            anchor_a: Vec2::ZERO,
            anchor_b: Vec2::ZERO,
            cancelled: false,
        }
    }

    /// Attaches the owning bodies and records where they were, so `current_separation`
    /// can account for later position corrections.
    pub fn with_bodies(mut self, bodies: &BodySet, body_a: Option<BodyHandle>, body_b: Option<BodyHandle>) -> Self {
        self.body_a = body_a;
        self.body_b = body_b;
        self.anchor_a = body_position(bodies, body_a);
        self.anchor_b = body_position(bodies, body_b);
        self
    }

    /// Side of A that was hit, from the MTV direction.
    pub fn side(&self) -> Side {
        Side::from_direction(self.mtv)
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// True when the contact should still be solved: not cancelled and both bodies alive.
    pub fn is_live(&self, bodies: &BodySet) -> bool {
        !self.cancelled && [self.body_a, self.body_b].into_iter().flatten().all(|h| bodies.is_live(h))
    }

    /// Separation now, after the bodies may have been moved by position correction.
    pub fn current_separation(&self, bodies: &BodySet) -> f64 {
        let moved_a = body_position(bodies, self.body_a) - self.anchor_a;
        let moved_b = body_position(bodies, self.body_b) - self.anchor_b;
        self.separation + (moved_b - moved_a).dot(self.normal)
    }
}

fn body_position(bodies: &BodySet, handle: Option<BodyHandle>) -> Vec2 {
    handle
        .and_then(|h| bodies.get(h))
        .map(|b| b.position)
        .unwrap_or(Vec2::ZERO)
}
