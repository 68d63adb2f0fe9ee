// Axis-aligned bounding boxes. With y pointing down, `min.y` is the top edge.

use serde::{Deserialize, Serialize};

use crate::math::ray::Ray;
use crate::math::vec2::Vec2;

/// An Axis-Aligned Bounding Box defined by its minimum and maximum corner points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AABB {
    pub min: Vec2,
    pub max: Vec2,
}

impl AABB {
    /// Creates a box from any two opposite corners.
    pub fn new(a: Vec2, b: Vec2) -> Self {
        AABB {
            min: Vec2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Vec2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Box of the given size centered on `center`.
    pub fn from_center(center: Vec2, width: f64, height: f64) -> Self {
        let half = Vec2::new(width / 2.0, height / 2.0);
        AABB::new(center - half, center + half)
    }

    /// Smallest box containing every point.
    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = AABB::new(*first, *first);
        for p in rest {
            bounds.min.x = bounds.min.x.min(p.x);
            bounds.min.y = bounds.min.y.min(p.y);
            bounds.max.x = bounds.max.x.max(p.x);
            bounds.max.y = bounds.max.y.max(p.y);
        }
        Some(bounds)
    }

    pub fn left(&self) -> f64 {
        self.min.x
    }

    pub fn right(&self) -> f64 {
        self.max.x
    }

    pub fn top(&self) -> f64 {
        self.min.y
    }

    pub fn bottom(&self) -> f64 {
        self.max.y
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    pub fn perimeter(&self) -> f64 {
        2.0 * (self.width() + self.height())
    }

    /// A box with no extent on either axis.
    pub fn is_point(&self) -> bool {
        self.width() == 0.0 && self.height() == 0.0
    }

    /// Checks if this AABB overlaps with another AABB.
    pub fn overlaps(&self, other: &AABB) -> bool {
        self.overlaps_with_epsilon(other, 0.0)
    }

    /// Overlap test where each side must cross the other box by more than `epsilon`.
    /// A zero-thickness box strictly inside the other still counts as overlapping.
    pub fn overlaps_with_epsilon(&self, other: &AABB, epsilon: f64) -> bool {
        let x_overlap = self.max.x - epsilon > other.min.x && self.min.x + epsilon < other.max.x;
        let y_overlap = self.max.y - epsilon > other.min.y && self.min.y + epsilon < other.max.y;
        x_overlap && y_overlap
    }

    pub fn contains(&self, other: &AABB) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Merges another AABB into this one, expanding this AABB to contain both.
    pub fn merge(&mut self, other: &AABB) {
        self.min.x = self.min.x.min(other.min.x);
        self.min.y = self.min.y.min(other.min.y);
        self.max.x = self.max.x.max(other.max.x);
        self.max.y = self.max.y.max(other.max.y);
    }

    /// New box containing both boxes.
    pub fn combine(&self, other: &AABB) -> AABB {
        let mut out = *self;
        out.merge(other);
        out
    }

    /// Grows every side by `amount`.
    pub fn pad(&self, amount: f64) -> AABB {
        let p = Vec2::new(amount, amount);
        AABB {
            min: self.min - p,
            max: self.max + p,
        }
    }

    /// Stretches the box along `delta` only, on the side the delta points to.
    pub fn extend(&self, delta: Vec2) -> AABB {
        let mut out = *self;
        if delta.x < 0.0 {
            out.min.x += delta.x;
        } else {
            out.max.x += delta.x;
        }
        if delta.y < 0.0 {
            out.min.y += delta.y;
        } else {
            out.max.y += delta.y;
        }
        out
    }

    /// Translation that moves `self` out of `other` along the single axis of least overlap,
    /// or `None` if the boxes do not overlap.
    pub fn intersect(&self, other: &AABB) -> Option<Vec2> {
        let total = self.combine(other);
        if !(total.width() < self.width() + other.width() && total.height() < self.height() + other.height()) {
            return None;
        }

        let overlap_x = if self.right() >= other.left() && self.right() <= other.right() {
            other.left() - self.right()
        } else {
            other.right() - self.left()
        };
        let overlap_y = if self.top() <= other.bottom() && self.top() >= other.top() {
            other.bottom() - self.top()
        } else {
            other.top() - self.bottom()
        };

        if overlap_x.abs() < overlap_y.abs() {
            Some(Vec2::new(overlap_x, 0.0))
        } else {
            Some(Vec2::new(0.0, overlap_y))
        }
    }

    /// Slab test: does `ray` enter the box before `far_clip`?
    pub fn ray_cast(&self, ray: &Ray, far_clip: f64) -> bool {
        let x_inv = if ray.dir.x == 0.0 { f64::MAX } else { 1.0 / ray.dir.x };
        let y_inv = if ray.dir.y == 0.0 { f64::MAX } else { 1.0 / ray.dir.y };

        let tx1 = (self.min.x - ray.origin.x) * x_inv;
        let tx2 = (self.max.x - ray.origin.x) * x_inv;
        let mut t_min = tx1.min(tx2);
        let mut t_max = tx1.max(tx2);

        let ty1 = (self.min.y - ray.origin.y) * y_inv;
        let ty2 = (self.max.y - ray.origin.y) * y_inv;
        t_min = t_min.max(ty1.min(ty2));
        t_max = t_max.min(ty1.max(ty2));

        t_max >= t_min.max(0.0) && t_min < far_clip
    }
}
