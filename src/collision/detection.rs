// Shape-pair overlap tests. Every test returns a manifold whose normal points from A to B.

use crate::math::vec2::Vec2;
use crate::shapes::{Edge, Polygon, WorldShape};

use super::manifold::CollisionManifold;

/// Dispatches on the shape pair. Swapped pairs reuse the canonical test and flip the result.
pub fn collide_shapes(a: &WorldShape, b: &WorldShape) -> Option<CollisionManifold> {
    use WorldShape::*;
    match (a, b) {
        (Circle { center: ca, radius: ra }, Circle { center: cb, radius: rb }) => {
            check_circle_circle(*ca, *ra, *cb, *rb)
        }
        (Circle { center, radius }, Polygon(poly)) => check_circle_polygon(*center, *radius, poly),
        (Polygon(poly), Circle { center, radius }) => {
            check_circle_polygon(*center, *radius, poly).map(CollisionManifold::flipped)
        }
        (Circle { center, radius }, Edge(edge)) => check_circle_edge(*center, *radius, edge),
        (Edge(edge), Circle { center, radius }) => {
            check_circle_edge(*center, *radius, edge).map(CollisionManifold::flipped)
        }
        (Polygon(pa), Polygon(pb)) => check_polygon_polygon(pa, pb),
        (Polygon(poly), Edge(edge)) => check_polygon_edge(poly, edge),
        (Edge(edge), Polygon(poly)) => check_polygon_edge(poly, edge).map(CollisionManifold::flipped),
        // Two segments have no area to push apart
        (Edge(_), Edge(_)) => None,
    }
}

/// Circles touching exactly still report a zero-depth contact.
pub fn check_circle_circle(center_a: Vec2, radius_a: f64, center_b: Vec2, radius_b: f64) -> Option<CollisionManifold> {
    let radii_sum = radius_a + radius_b;
    let distance = center_a.distance(center_b);
    if distance > radii_sum {
        return None;
    }

    let normal = if distance > 1e-10 {
        (center_b - center_a) / distance
    } else {
        // Concentric circles, pick an arbitrary axis
        Vec2::new(0.0, 1.0)
    };
    let point = center_a + normal * radius_a;
    Some(CollisionManifold::new(normal, radii_sum - distance, vec![point]))
}

/// Overlap of two 1D intervals, 0 when disjoint.
fn interval_overlap(a: (f64, f64), b: (f64, f64)) -> f64 {
    if a.1 > b.0 && b.1 > a.0 {
        (a.1 - b.0).min(b.1 - a.0)
    } else {
        0.0
    }
}

/// SAT over the polygon normals plus the axis from the circle to the polygon's nearest vertex.
pub fn check_circle_polygon(center: Vec2, radius: f64, polygon: &Polygon) -> Option<CollisionManifold> {
    let poly_center = polygon.centroid();
    let mut axes = polygon.normals();
    let closest_vertex = polygon.furthest_point(center - poly_center);
    let vertex_axis = (closest_vertex - center).normalize();
    if vertex_axis != Vec2::ZERO {
        axes.push(vertex_axis);
    }

    let mut min_overlap = f64::MAX;
    let mut min_axis = None;
    for axis in axes {
        let poly_proj = polygon.project(axis);
        let c = center.dot(axis);
        let overlap = interval_overlap(poly_proj, (c - radius, c + radius));
        if overlap <= 0.0 {
            return None;
        }
        if overlap < min_overlap {
            min_overlap = overlap;
            min_axis = Some(axis);
        }
    }

    let mut normal = min_axis?;
    // Point away from the circle, toward the polygon
    if normal.dot(poly_center - center) < 0.0 {
        normal = -normal;
    }
    let point = center + normal * radius;
    Some(CollisionManifold::new(normal, min_overlap, vec![point]))
}

/// Voronoi regions of the edge: past either end point, or along the segment.
pub fn check_circle_edge(center: Vec2, radius: f64, edge: &Edge) -> Option<CollisionManifold> {
    let e = edge.direction();
    let u = e.dot(edge.end - center);
    let v = e.dot(center - edge.begin);
    let radius_sq = radius * radius;

    // Region A, before the beginning
    if v <= 0.0 {
        return end_point_contact(center, radius, edge.begin);
    }
    // Region B, after the end
    if u <= 0.0 {
        return end_point_contact(center, radius, edge.end);
    }

    // Region AB
    let den = e.dot(e);
    let point_on_edge = (edge.begin * u + edge.end * v) / den;
    let d = center - point_on_edge;
    let dist_sq = d.dot(d);
    if dist_sq > radius_sq {
        return None;
    }
    let mut n = e.perpendicular();
    if n.dot(center - edge.begin) < 0.0 {
        n = -n;
    }
    // n faces the circle; the contact normal faces the edge
    let depth = (radius - dist_sq.sqrt()).abs();
    Some(CollisionManifold::new(-n.normalize(), depth, vec![point_on_edge]))
}

fn end_point_contact(center: Vec2, radius: f64, end_point: Vec2) -> Option<CollisionManifold> {
    let d = end_point - center;
    let dist_sq = d.dot(d);
    if dist_sq > radius * radius {
        return None;
    }
    let normal = if dist_sq > 1e-20 { d.normalize() } else { Vec2::new(0.0, 1.0) };
    Some(CollisionManifold::new(normal, radius - dist_sq.sqrt(), vec![end_point]))
}

/// Best separating side of `a` against `b`.
struct Separation {
    separation: f64,
    axis: Vec2,
    side: Edge,
}

fn find_polygon_separation(a: &Polygon, b: &Polygon) -> Separation {
    let mut best = Separation {
        separation: f64::NEG_INFINITY,
        axis: Vec2::ZERO,
        side: a.side(0),
    };
    for side in a.sides() {
        let axis = side.normal();
        let vertex = b.furthest_point(-axis);
        let separation = (vertex - side.begin).dot(axis);
        if separation > best.separation {
            best = Separation { separation, axis, side };
        }
    }
    best
}

/// SAT from both polygons, then clips the incident side against the reference side
/// (Sutherland-Hodgman) to get up to two contact points.
pub fn check_polygon_polygon(poly_a: &Polygon, poly_b: &Polygon) -> Option<CollisionManifold> {
    let separation_a = find_polygon_separation(poly_a, poly_b);
    if separation_a.separation > 0.0 {
        return None;
    }
    let separation_b = find_polygon_separation(poly_b, poly_a);
    if separation_b.separation > 0.0 {
        return None;
    }

    // Least negative separation means the smallest push
    let (reference_poly_is_a, separation) = if separation_a.separation > separation_b.separation {
        (true, separation_a)
    } else {
        (false, separation_b)
    };
    let incident_poly = if reference_poly_is_a { poly_b } else { poly_a };
    let incident = incident_poly.find_side(-separation.axis);
    let reference = separation.side;
    let ref_dir = reference.direction().normalize();

    let clip_right = incident.clip(-ref_dir, -ref_dir.dot(reference.begin))?;
    let clip_left = clip_right.clip(ref_dir, ref_dir.dot(reference.end))?;

    // Keep only the clipped points that actually penetrate the reference side
    let points: Vec<Vec2> = [clip_left.begin, clip_left.end]
        .into_iter()
        .filter(|p| reference.below(*p))
        .collect();

    let mut normal = separation.axis;
    if (poly_b.centroid() - poly_a.centroid()).dot(normal) < 0.0 {
        normal = -normal;
    }
    Some(CollisionManifold::new(normal, -separation.separation, points))
}

/// Extrudes the edge 100 units away from the polygon into a quad and reuses the polygon test.
pub fn check_polygon_edge(polygon: &Polygon, edge: &Edge) -> Option<CollisionManifold> {
    let mut dir = edge.normal();
    if dir.dot(edge.midpoint() - polygon.centroid()) < 0.0 {
        dir = -dir;
    }
    let quad = Polygon::new(vec![
        edge.begin,
        edge.end,
        edge.end + dir * 100.0,
        edge.begin + dir * 100.0,
    ])
    .ok()?;
    check_polygon_polygon(polygon, &quad)
}
