use super::vec2::Vec2;

/// A half-line starting at `origin` travelling along the unit vector `dir`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec2,
    pub dir: Vec2,
}

impl Ray {
    /// Creates a ray; `dir` is normalized.
    pub fn new(origin: Vec2, dir: Vec2) -> Self {
        Self {
            origin,
            dir: dir.normalize(),
        }
    }

    pub fn point_at(&self, t: f64) -> Vec2 {
        self.origin + self.dir * t
    }

    /// Distance along the ray to the segment `begin..end`, if the ray hits it.
    /// Parallel rays never hit, even when collinear.
    pub fn intersect_segment(&self, begin: Vec2, end: Vec2) -> Option<f64> {
        let edge = end - begin;
        let length = edge.magnitude();
        if length == 0.0 {
            return None;
        }
        let slope = edge / length;
        let divisor = self.dir.cross(slope);
        if divisor == 0.0 {
            return None;
        }

        let numerator = begin - self.origin;
        let t = numerator.cross(slope) / divisor;
        if t < 0.0 {
            return None;
        }
        let u = numerator.cross(self.dir) / divisor / length;
        if (0.0..=1.0).contains(&u) {
            Some(t)
        } else {
            None
        }
    }
}
