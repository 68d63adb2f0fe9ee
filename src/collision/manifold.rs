use crate::math::vec2::Vec2;

/// Raw result of an overlap test between two world-space shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionManifold {
    /// The collision normal, pointing from shape A towards shape B.
    pub normal: Vec2,
    /// The amount of penetration between the shapes (>= 0).
    pub depth: f64,
    /// World-space contact points.
    pub points: Vec<Vec2>,
}

impl CollisionManifold {
    pub fn new(normal: Vec2, depth: f64, points: Vec<Vec2>) -> Self {
        Self { normal, depth, points }
    }

    /// Translation that separates B from A, along the normal.
    pub fn mtv(&self) -> Vec2 {
        self.normal * self.depth
    }

    /// Signed distance between the shapes; negative while overlapping.
    pub fn separation(&self) -> f64 {
        -self.depth
    }

    /// Same manifold seen from the other shape.
    pub fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        self
    }
}
