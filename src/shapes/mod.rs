pub mod circle;
pub mod edge;
pub mod polygon;

pub use circle::Circle;
pub use edge::Edge;
pub use polygon::Polygon;

use crate::collision::aabb::AABB;
use crate::math::{Ray, Transform, Vec2};

/// Local-space collision geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle(Circle),
    Polygon(Polygon),
    Edge(Edge),
}

impl Shape {
    /// Moment of inertia about the shape's own centroid for the given mass.
    pub fn inertia(&self, mass: f64) -> f64 {
        match self {
            Shape::Circle(c) => c.inertia(mass),
            Shape::Polygon(p) => p.inertia(mass),
            Shape::Edge(e) => mass * e.length() * e.length() / 12.0,
        }
    }

    /// Places the shape in world space. `offset` is the collider's body-local offset.
    pub fn to_world(&self, transform: Transform, offset: Vec2) -> WorldShape {
        let place = |p: Vec2| transform.apply(p + offset);
        match self {
            Shape::Circle(c) => WorldShape::Circle {
                center: place(Vec2::ZERO),
                radius: c.radius,
            },
            Shape::Polygon(p) => WorldShape::Polygon(Polygon {
                vertices: p.vertices.iter().map(|&v| place(v)).collect(),
            }),
            Shape::Edge(e) => WorldShape::Edge(Edge::segment(place(e.begin), place(e.end))),
        }
    }
}

impl From<Circle> for Shape {
    fn from(c: Circle) -> Self {
        Shape::Circle(c)
    }
}

impl From<Polygon> for Shape {
    fn from(p: Polygon) -> Self {
        Shape::Polygon(p)
    }
}

impl From<Edge> for Shape {
    fn from(e: Edge) -> Self {
        Shape::Edge(e)
    }
}

/// Result of a ray hitting a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeHit {
    pub distance: f64,
    pub point: Vec2,
    pub normal: Vec2,
}

/// Geometry positioned in world space, ready for the narrowphase.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldShape {
    Circle { center: Vec2, radius: f64 },
    Polygon(Polygon),
    Edge(Edge),
}

impl WorldShape {
    pub fn bounds(&self) -> AABB {
        match self {
            WorldShape::Circle { center, radius } => {
                let r = Vec2::new(*radius, *radius);
                AABB::new(*center - r, *center + r)
            }
            WorldShape::Polygon(p) => AABB::from_points(&p.vertices).unwrap_or_default(),
            WorldShape::Edge(e) => AABB::new(e.begin, e.end),
        }
    }

    pub fn center(&self) -> Vec2 {
        match self {
            WorldShape::Circle { center, .. } => *center,
            WorldShape::Polygon(p) => p.centroid(),
            WorldShape::Edge(e) => e.midpoint(),
        }
    }

    /// Point of the shape furthest along `direction`.
    pub fn furthest_point(&self, direction: Vec2) -> Vec2 {
        match self {
            WorldShape::Circle { center, radius } => *center + direction.normalize() * *radius,
            WorldShape::Polygon(p) => p.furthest_point(direction),
            WorldShape::Edge(e) => {
                if e.begin.dot(direction) >= e.end.dot(direction) {
                    e.begin
                } else {
                    e.end
                }
            }
        }
    }

    /// Nearest intersection of `ray` with the shape boundary within `max_distance`.
    pub fn ray_cast(&self, ray: &Ray, max_distance: f64) -> Option<ShapeHit> {
        match self {
            WorldShape::Circle { center, radius } => {
                let to_origin = ray.origin - *center;
                let b = ray.dir.dot(to_origin);
                let discriminant = b * b - (to_origin.magnitude_squared() - radius * radius);
                if discriminant < 0.0 {
                    return None;
                }
                let root = discriminant.sqrt();
                let t = [-b - root, -b + root]
                    .into_iter()
                    .filter(|t| *t >= 0.0)
                    .fold(f64::INFINITY, f64::min);
                if t.is_infinite() || t > max_distance {
                    return None;
                }
                let point = ray.point_at(t);
                Some(ShapeHit {
                    distance: t,
                    point,
                    normal: (point - *center).normalize(),
                })
            }
            WorldShape::Polygon(p) => p
                .sides()
                .filter_map(|side| {
                    ray.intersect_segment(side.begin, side.end)
                        .map(|t| (t, side.normal()))
                })
                .filter(|(t, _)| *t <= max_distance)
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(t, normal)| ShapeHit {
                    distance: t,
                    point: ray.point_at(t),
                    normal,
                }),
            WorldShape::Edge(e) => {
                let t = ray.intersect_segment(e.begin, e.end)?;
                if t > max_distance {
                    return None;
                }
                // Face the normal back toward the ray origin
                let mut normal = e.normal();
                if normal.dot(ray.dir) > 0.0 {
                    normal = -normal;
                }
                Some(ShapeHit {
                    distance: t,
                    point: ray.point_at(t),
                    normal,
                })
            }
        }
    }
}
