use crate::error::{PhysicsError, Result};
use crate::math::vec2::Vec2;

/// A line segment from `begin` to `end`. Used both as a collider shape and as a polygon side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub begin: Vec2,
    pub end: Vec2,
}

impl Edge {
    /// Creates an edge collider shape. The end points must differ.
    pub fn new(begin: Vec2, end: Vec2) -> Result<Self> {
        if begin == end {
            return Err(PhysicsError::DegenerateEdge);
        }
        Ok(Self { begin, end })
    }

    pub(crate) fn segment(begin: Vec2, end: Vec2) -> Self {
        Self { begin, end }
    }

    pub fn length(&self) -> f64 {
        self.begin.distance(self.end)
    }

    /// Unnormalized direction from `begin` to `end`.
    pub fn direction(&self) -> Vec2 {
        self.end - self.begin
    }

    pub fn midpoint(&self) -> Vec2 {
        (self.begin + self.end) / 2.0
    }

    /// Unit normal on the right-hand side of the direction. For a counter-clockwise
    /// polygon side this faces outwards.
    pub fn normal(&self) -> Vec2 {
        let d = self.direction();
        Vec2::new(d.y, -d.x).normalize()
    }

    /// Closest point on the segment to `point`.
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        let d = self.direction();
        let len_sq = d.magnitude_squared();
        if len_sq == 0.0 {
            return self.begin;
        }
        let t = ((point - self.begin).dot(d) / len_sq).clamp(0.0, 1.0);
        self.begin + d * t
    }

    pub fn distance_to_point(&self, point: Vec2) -> f64 {
        self.closest_point(point).distance(point)
    }

    /// True when `point` lies on the inner side of the segment (left of the direction),
    /// or on the line itself.
    pub fn below(&self, point: Vec2) -> bool {
        self.direction().cross(point - self.begin) >= 0.0
    }

    /// Clips the segment against the half plane `dir . p <= length`, with `dir` normalized first.
    /// Returns `None` when fewer than two points survive.
    pub fn clip(&self, dir: Vec2, length: f64) -> Option<Edge> {
        let dir = dir.normalize();
        let near = dir.dot(self.begin) - length;
        let far = dir.dot(self.end) - length;

        let mut points = Vec::with_capacity(2);
        if near <= 0.0 {
            points.push(self.begin);
        }
        if far <= 0.0 {
            points.push(self.end);
        }
        if near * far < 0.0 {
            let clip_time = near / (near - far);
            points.push(self.begin + self.direction() * clip_time);
        }

        match points.as_slice() {
            [a, b] => Some(Edge::segment(*a, *b)),
            _ => None,
        }
    }
}
