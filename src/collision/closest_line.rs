// Shortest segment between two shapes. Results run from the point on A to the point on B.

use crate::math::vec2::Vec2;
use crate::shapes::{Edge, Polygon, WorldShape};

const EPSILON: f64 = 1e-9;

/// Dispatches on the shape pair. Swapped pairs reuse the canonical query and swap the ends.
pub fn closest_line_between(a: &WorldShape, b: &WorldShape) -> (Vec2, Vec2) {
    use WorldShape::*;
    let swap = |(p, q): (Vec2, Vec2)| (q, p);
    match (a, b) {
        (Circle { center: ca, radius: ra }, Circle { center: cb, radius: rb }) => circle_circle(*ca, *ra, *cb, *rb),
        (Circle { center, radius }, Polygon(poly)) => swap(polygon_circle(poly, *center, *radius)),
        (Polygon(poly), Circle { center, radius }) => polygon_circle(poly, *center, *radius),
        (Circle { center, radius }, Edge(edge)) => swap(edge_circle(edge, *center, *radius)),
        (Edge(edge), Circle { center, radius }) => edge_circle(edge, *center, *radius),
        (Polygon(pa), Polygon(pb)) => closest_among(pa.sides(), || pb.sides()),
        (Polygon(poly), Edge(edge)) => closest_among(poly.sides(), || std::iter::once(*edge)),
        (Edge(edge), Polygon(poly)) => closest_among(std::iter::once(*edge), || poly.sides()),
        (Edge(ea), Edge(eb)) => segment_segment(ea, eb),
    }
}

fn circle_circle(center_a: Vec2, radius_a: f64, center_b: Vec2, radius_b: f64) -> (Vec2, Vec2) {
    let dir = (center_b - center_a).normalize();
    (center_a + dir * radius_a, center_b - dir * radius_b)
}

fn polygon_circle(polygon: &Polygon, center: Vec2, radius: f64) -> (Vec2, Vec2) {
    let on_polygon = polygon
        .sides()
        .map(|side| side.closest_point(center))
        .min_by(|p, q| p.distance_squared(center).total_cmp(&q.distance_squared(center)))
        .unwrap_or(center);
    (on_polygon, toward_surface(center, radius, on_polygon))
}

fn edge_circle(edge: &Edge, center: Vec2, radius: f64) -> (Vec2, Vec2) {
    let on_edge = edge.closest_point(center);
    (on_edge, toward_surface(center, radius, on_edge))
}

/// Point on the circle surface facing `target`.
fn toward_surface(center: Vec2, radius: f64, target: Vec2) -> Vec2 {
    center + (target - center).normalize() * radius
}

fn closest_among<A, B, F>(sides_a: A, sides_b: F) -> (Vec2, Vec2)
where
    A: Iterator<Item = Edge>,
    B: Iterator<Item = Edge>,
    F: Fn() -> B,
{
    let mut best: Option<(f64, (Vec2, Vec2))> = None;
    for side_a in sides_a {
        for side_b in sides_b() {
            let line = segment_segment(&side_a, &side_b);
            let distance = line.0.distance_squared(line.1);
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, line));
            }
        }
    }
    best.map_or((Vec2::ZERO, Vec2::ZERO), |(_, line)| line)
}

/// Closest points between two segments, clamped to both.
pub fn segment_segment(a: &Edge, b: &Edge) -> (Vec2, Vec2) {
    let d1 = a.direction();
    let d2 = b.direction();
    let r = a.begin - b.begin;
    let len_a = d1.dot(d1);
    let len_b = d2.dot(d2);
    let f = d2.dot(r);

    let (s, t) = if len_a <= EPSILON && len_b <= EPSILON {
        (0.0, 0.0)
    } else if len_a <= EPSILON {
        (0.0, (f / len_b).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if len_b <= EPSILON {
            ((-c / len_a).clamp(0.0, 1.0), 0.0)
        } else {
            let cross = d1.dot(d2);
            let denom = len_a * len_b - cross * cross;
            // Parallel segments: any s works, start from a's begin
            let s = if denom.abs() > EPSILON {
                ((cross * f - c * len_b) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let t = (cross * s + f) / len_b;
            if t < 0.0 {
                ((-c / len_a).clamp(0.0, 1.0), 0.0)
            } else if t > 1.0 {
                (((cross - c) / len_a).clamp(0.0, 1.0), 1.0)
            } else {
                (s, t)
            }
        }
    };
    (a.begin + d1 * s, b.begin + d2 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f64 = 1e-9;

    fn edge(x0: f64, y0: f64, x1: f64, y1: f64) -> Edge {
        Edge::new(Vec2::new(x0, y0), Vec2::new(x1, y1)).unwrap()
    }

    fn assert_point(actual: Vec2, x: f64, y: f64) {
        assert!((actual.x - x).abs() < EPSILON && (actual.y - y).abs() < EPSILON, "{actual:?} != ({x}, {y})");
    }

    #[test]
    fn test_crossing_segments_meet() {
        let (p, q) = segment_segment(&edge(0.0, 0.0, 10.0, 0.0), &edge(5.0, -5.0, 5.0, 5.0));
        assert_point(p, 5.0, 0.0);
        assert_point(q, 5.0, 0.0);
    }

    #[test]
    fn test_segment_end_clamps() {
        let (p, q) = segment_segment(&edge(0.0, 0.0, 10.0, 0.0), &edge(5.0, 3.0, 5.0, 10.0));
        assert_point(p, 5.0, 0.0);
        assert_point(q, 5.0, 3.0);
    }

    #[test]
    fn test_parallel_segments() {
        let (p, q) = segment_segment(&edge(0.0, 0.0, 10.0, 0.0), &edge(2.0, 4.0, 8.0, 4.0));
        assert!((p.distance(q) - 4.0).abs() < EPSILON);
        assert!((q.y - 4.0).abs() < EPSILON);
    }

    #[test]
    fn test_disjoint_parallel_segments_use_nearest_ends() {
        let (p, q) = segment_segment(&edge(0.0, 0.0, 10.0, 0.0), &edge(15.0, 0.0, 20.0, 0.0));
        assert_point(p, 10.0, 0.0);
        assert_point(q, 15.0, 0.0);
    }
}
