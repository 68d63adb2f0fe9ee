use crate::error::{PhysicsError, Result};
use crate::math::transform::Transform;
use crate::math::vec2::Vec2;

use super::edge::Edge;

/// A convex polygon. Vertices are stored with positive winding (`sum of v[i] x v[i+1] > 0`),
/// so every side's `Edge::normal` points out of the polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub vertices: Vec<Vec2>,
}

impl Polygon {
    /// Creates a convex polygon from vertices in either winding order.
    pub fn new(mut vertices: Vec<Vec2>) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(PhysicsError::DegeneratePolygon(format!(
                "expected at least 3 vertices, got {}",
                vertices.len()
            )));
        }

        let signed = signed_area(&vertices);
        if signed.abs() < 1e-10 {
            return Err(PhysicsError::DegeneratePolygon("polygon has no area".into()));
        }
        if signed < 0.0 {
            vertices.reverse();
        }

        let n = vertices.len();
        for i in 0..n {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            let c = vertices[(i + 2) % n];
            if (b - a).cross(c - b) < -1e-10 {
                return Err(PhysicsError::DegeneratePolygon("polygon is not convex".into()));
            }
        }

        Ok(Polygon { vertices })
    }

    /// Axis-aligned rectangle centered on the local origin.
    pub fn rectangle(width: f64, height: f64) -> Result<Self> {
        let hw = width / 2.0;
        let hh = height / 2.0;
        Self::new(vec![
            Vec2::new(-hw, -hh),
            Vec2::new(hw, -hh),
            Vec2::new(hw, hh),
            Vec2::new(-hw, hh),
        ])
    }

    /// Copy of this polygon placed by `transform`. Rotation preserves the winding.
    pub fn transformed(&self, transform: Transform) -> Polygon {
        Polygon {
            vertices: self.vertices.iter().map(|&v| transform.apply(v)).collect(),
        }
    }

    /// Area via the shoelace formula.
    pub fn area(&self) -> f64 {
        signed_area(&self.vertices).abs()
    }

    /// Center of mass for uniform density, by triangle fan.
    pub fn centroid(&self) -> Vec2 {
        let n = self.vertices.len();
        let origin = self.vertices[0];
        let mut centroid = Vec2::ZERO;
        let mut area_sum = 0.0;

        for i in 1..(n - 1) {
            let v2 = self.vertices[i];
            let v3 = self.vertices[i + 1];
            let triangle_area = (v2 - origin).cross(v3 - origin) / 2.0;
            area_sum += triangle_area;
            centroid += (origin + v2 + v3) / 3.0 * triangle_area;
        }

        if area_sum.abs() < 1e-10 {
            self.vertices.iter().fold(Vec2::ZERO, |acc, &v| acc + v) / n as f64
        } else {
            centroid / area_sum
        }
    }

    /// Moment of inertia about the centroid for a polygon of the given total mass.
    pub fn inertia(&self, mass: f64) -> f64 {
        let area = self.area();
        if area < 1e-10 || mass <= 0.0 {
            return 0.0;
        }
        let density = mass / area;

        // Second moment about the local origin, then shifted to the centroid (parallel axis)
        let n = self.vertices.len();
        let mut sum = 0.0;
        for i in 0..n {
            let v1 = self.vertices[i];
            let v2 = self.vertices[(i + 1) % n];
            sum += v1.cross(v2) * (v1.magnitude_squared() + v1.dot(v2) + v2.magnitude_squared());
        }
        let inertia_origin = density * sum / 12.0;
        (inertia_origin - mass * self.centroid().magnitude_squared()).max(0.0)
    }

    /// Side `i`, running from vertex `i` to vertex `i + 1`.
    pub fn side(&self, i: usize) -> Edge {
        let n = self.vertices.len();
        Edge::segment(self.vertices[i % n], self.vertices[(i + 1) % n])
    }

    pub fn sides(&self) -> impl Iterator<Item = Edge> + '_ {
        (0..self.vertices.len()).map(move |i| self.side(i))
    }

    /// Outward unit normal of every side.
    pub fn normals(&self) -> Vec<Vec2> {
        self.sides().map(|s| s.normal()).collect()
    }

    /// Vertex with the largest projection on `direction`.
    pub fn furthest_point(&self, direction: Vec2) -> Vec2 {
        let mut best = self.vertices[0];
        let mut best_dot = best.dot(direction);
        for &v in &self.vertices[1..] {
            let d = v.dot(direction);
            if d > best_dot {
                best = v;
                best_dot = d;
            }
        }
        best
    }

    /// Side whose outward normal best matches `direction`.
    pub fn find_side(&self, direction: Vec2) -> Edge {
        let mut best = 0;
        let mut best_dot = f64::NEG_INFINITY;
        for (i, side) in self.sides().enumerate() {
            let d = side.normal().dot(direction);
            if d > best_dot {
                best = i;
                best_dot = d;
            }
        }
        self.side(best)
    }

    /// Min/max of the vertices projected on `axis`.
    pub fn project(&self, axis: Vec2) -> (f64, f64) {
        self.vertices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
            let p = v.dot(axis);
            (min.min(p), max.max(p))
        })
    }

    /// True if `point` is inside or on the boundary.
    pub fn contains(&self, point: Vec2) -> bool {
        self.sides().all(|s| s.below(point))
    }
}

fn signed_area(vertices: &[Vec2]) -> f64 {
    let n = vertices.len();
    (0..n).map(|i| vertices[i].cross(vertices[(i + 1) % n])).sum::<f64>() / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f64 = 1e-9;

    fn unit_square() -> Polygon {
        Polygon::new(vec![
            Vec2::new(-0.5, -0.5),
            Vec2::new(0.5, -0.5),
            Vec2::new(0.5, 0.5),
            Vec2::new(-0.5, 0.5),
        ])
        .unwrap()
    }

    #[test]
    fn test_polygon_too_few_vertices() {
        let result = Polygon::new(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)]);
        assert!(matches!(result, Err(PhysicsError::DegeneratePolygon(_))));
    }

    #[test]
    fn test_polygon_rejects_collinear_and_concave() {
        let line = Polygon::new(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)]);
        assert!(line.is_err());

        let dart = Polygon::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 4.0),
        ]);
        assert!(dart.is_err());
    }

    #[test]
    fn test_polygon_normalizes_winding() {
        let reversed = Polygon::new(vec![
            Vec2::new(-0.5, 0.5),
            Vec2::new(0.5, 0.5),
            Vec2::new(0.5, -0.5),
            Vec2::new(-0.5, -0.5),
        ])
        .unwrap();
        assert!(signed_area(&reversed.vertices) > 0.0);
        // Bottom side normal (y = -0.5) points away from the center
        for side in reversed.sides() {
            assert!(side.normal().dot(side.midpoint()) > 0.0);
        }
    }

    #[test]
    fn test_polygon_area_and_centroid() {
        let square = unit_square();
        assert!((square.area() - 1.0).abs() < EPSILON);
        assert!(square.centroid().magnitude() < EPSILON);

        let triangle = Polygon::new(vec![Vec2::new(0.0, 0.0), Vec2::new(3.0, 0.0), Vec2::new(0.0, 3.0)]).unwrap();
        assert!((triangle.area() - 4.5).abs() < EPSILON);
        let c = triangle.centroid();
        assert!((c.x - 1.0).abs() < EPSILON);
        assert!((c.y - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_polygon_inertia_matches_rectangle_formula() {
        // I = m * (w^2 + h^2) / 12
        let rect = Polygon::rectangle(2.0, 4.0).unwrap();
        assert!((rect.inertia(3.0) - 3.0 * (4.0 + 16.0) / 12.0).abs() < EPSILON);

        // Offset geometry has the same inertia about its centroid
        let offset = rect.transformed(Transform::new(Vec2::new(10.0, -3.0), 0.0));
        assert!((offset.inertia(3.0) - rect.inertia(3.0)).abs() < EPSILON);
    }

    #[test]
    fn test_polygon_furthest_point_and_find_side() {
        let square = unit_square();
        assert_eq!(square.furthest_point(Vec2::new(1.0, 1.0)), Vec2::new(0.5, 0.5));

        let side = square.find_side(Vec2::new(1.0, 0.1));
        assert!((side.begin.x - 0.5).abs() < EPSILON);
        assert!((side.end.x - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_polygon_project_and_contains() {
        let square = unit_square();
        let (min, max) = square.project(Vec2::new(1.0, 0.0));
        assert!((min - -0.5).abs() < EPSILON);
        assert!((max - 0.5).abs() < EPSILON);
        assert!(square.contains(Vec2::new(0.2, -0.3)));
        assert!(!square.contains(Vec2::new(0.7, 0.0)));
    }
}
