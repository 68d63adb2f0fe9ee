use log::trace;

use crate::collision::{ColliderId, ColliderSet, CollisionEvent, CollisionEventKind, AABB};
use crate::common::{CollisionType, Side};
use crate::config::TileConfig;
use crate::math::Vec2;
use crate::objects::{BodyHandle, BodySet};

use super::CellMap;

/// Pushes bodies out of the solid cells of one or more cell maps.
#[derive(Debug, Clone, Default)]
pub struct CellMapCollision {
    pub config: TileConfig,
}

impl CellMapCollision {
    pub fn new(config: TileConfig) -> Self {
        Self { config }
    }

    /// Resolves `body` against every map. Each correction raises `PreCollision` on the body's
    /// root colliders (with no other collider) and, for `Active` bodies, moves the body and raises
    /// `PostCollision`. At most `max_iterations` corrections are made per map; whatever overlap
    /// remains is left for the next step.
    ///
    /// Bodies that are not `Active` (e.g. `Passive` sensors) never move, so their overlap would
    /// repeat unchanged: they get a single `PreCollision` per map and step. A cancelled
    /// `PreCollision` likewise stops the map for this step.
    pub fn update(&self, body: BodyHandle, maps: &[Box<dyn CellMap>], colliders: &mut ColliderSet, bodies: &mut BodySet) {
        let collision_type = match bodies.get(body) {
            Some(b) if b.is_active() => b.collision_type,
            _ => return,
        };
        if collision_type == CollisionType::PreventCollision {
            return;
        }
        let targets: Vec<ColliderId> = colliders
            .iter()
            .filter(|c| c.owner == Some(body) && c.composite.is_none())
            .map(|c| c.id)
            .collect();
        if targets.is_empty() {
            return;
        }

        for map in maps {
            for _ in 0..self.config.max_iterations {
                let Some(bounds) = actor_bounds(body, colliders, bodies) else {
                    return;
                };
                let Some(correction) = collides(&bounds, map.as_ref()) else {
                    break;
                };
                let side = Side::from_intersection(Some(correction));
                trace!("body {:?} overlaps a solid cell, correction {:?}", body, correction);

                let mut cancelled = false;
                let mut killed = false;
                for &id in &targets {
                    let response = colliders.emit(&tile_event(CollisionEventKind::PreCollision, id, side, correction));
                    cancelled |= response.is_cancelled();
                    killed |= response.is_killed();
                }
                if killed {
                    if let Some(b) = bodies.get_mut(body) {
                        b.kill();
                    }
                    return;
                }
                if cancelled || collision_type != CollisionType::Active {
                    break;
                }

                if let Some(b) = bodies.get_mut(body) {
                    b.position += correction;
                }
                for &id in &targets {
                    colliders.emit(&tile_event(CollisionEventKind::PostCollision, id, side, correction));
                }
            }
        }
    }
}

fn tile_event(kind: CollisionEventKind, this: ColliderId, side: Side, mtv: Vec2) -> CollisionEvent<'static> {
    CollisionEvent {
        kind,
        this,
        other: None,
        side,
        mtv,
        contact: None,
    }
}

/// Combined bounds of every leaf collider on the body.
fn actor_bounds(body: BodyHandle, colliders: &ColliderSet, bodies: &BodySet) -> Option<AABB> {
    colliders
        .attached_to(body)
        .into_iter()
        .filter_map(|id| colliders.bounds(id, bodies))
        .reduce(|acc, b| acc.combine(&b))
}

/// Correction that moves `bounds` out of the solid cells of `map`, or `None` when clear.
///
/// Points are traced over the box at half the smaller of the box and cell dimensions (at least
/// one unit apart). Overlaps pointing away from the actor's center are discarded.
pub fn collides(bounds: &AABB, map: &dyn CellMap) -> Option<Vec2> {
    let cell = map.cell_size();
    let step_x = (bounds.width() / 2.0).min(cell.x / 2.0).max(1.0);
    let step_y = (bounds.height() / 2.0).min(cell.y / 2.0).max(1.0);
    let center = bounds.center();

    let mut overlaps = Vec::new();
    let mut x = bounds.left();
    while x <= bounds.right() {
        let mut y = bounds.top();
        while y <= bounds.bottom() {
            if let Some(cell_bounds) = map.solid_cell_at(Vec2::new(x, y)) {
                if let Some(overlap) = bounds.intersect(&cell_bounds) {
                    if overlap.dot(center - cell_bounds.center()) > 0.0 {
                        overlaps.push(overlap);
                    }
                }
            }
            y += step_y;
        }
        x += step_x;
    }
    overlaps.into_iter().reduce(merge_corrections)
}

/// Per axis, keeps whichever component has the larger magnitude.
fn merge_corrections(acc: Vec2, next: Vec2) -> Vec2 {
    Vec2::new(
        if acc.x.abs() < next.x.abs() { next.x } else { acc.x },
        if acc.y.abs() < next.y.abs() { next.y } else { acc.y },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::ColliderDesc;
    use crate::objects::RigidBody;
    use crate::shapes::Polygon;
    use crate::tile::TileMap;
    use std::cell::RefCell;
    use std::rc::Rc;
    const EPSILON: f64 = 1e-9;

    fn floor_map() -> Vec<Box<dyn CellMap>> {
        // 16px tiles, second row solid
        vec![Box::new(TileMap::from_rows(Vec2::ZERO, 16.0, 16.0, &["....", "####"]).unwrap())]
    }

    fn actor(center: Vec2, collision_type: CollisionType) -> (BodySet, ColliderSet, BodyHandle, ColliderId) {
        let mut bodies = BodySet::new();
        let handle = bodies.insert(
            RigidBody::new_with_inertia(1.0, 1.0)
                .with_position(center)
                .with_collision_type(collision_type),
        );
        let mut colliders = ColliderSet::new();
        let id = colliders
            .insert(ColliderDesc::shape(Polygon::rectangle(10.0, 10.0).unwrap()), Some(handle), &bodies)
            .unwrap();
        (bodies, colliders, handle, id)
    }

    fn record(colliders: &mut ColliderSet, id: ColliderId) -> Rc<RefCell<Vec<(CollisionEventKind, Side, Vec2)>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in [CollisionEventKind::PreCollision, CollisionEventKind::PostCollision] {
            let log = log.clone();
            colliders.get_mut(id).unwrap().events.on(kind, move |e, _| {
                assert!(e.other.is_none());
                log.borrow_mut().push((e.kind, e.side, e.mtv));
            });
        }
        log
    }

    #[test]
    fn test_actor_is_pushed_out_of_floor() {
        let (mut bodies, mut colliders, handle, id) = actor(Vec2::new(5.0, 12.0), CollisionType::Active);
        let log = record(&mut colliders, id);

        CellMapCollision::default().update(handle, &floor_map(), &mut colliders, &mut bodies);

        let position = bodies.get(handle).unwrap().position;
        assert!((position.y - 11.0).abs() < EPSILON);
        assert!((position.x - 5.0).abs() < EPSILON);
        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].0, CollisionEventKind::PreCollision);
        assert_eq!(log[1].0, CollisionEventKind::PostCollision);
        assert_eq!(log[0].1, Side::Bottom);
        assert!((log[0].2.y - -1.0).abs() < EPSILON);
    }

    #[test]
    fn test_actor_straddling_two_cells_gets_one_correction() {
        // Centered on the boundary between columns 0 and 1
        let (mut bodies, mut colliders, handle, _) = actor(Vec2::new(16.0, 13.0), CollisionType::Active);
        CellMapCollision::default().update(handle, &floor_map(), &mut colliders, &mut bodies);
        let position = bodies.get(handle).unwrap().position;
        assert!((position.y - 11.0).abs() < EPSILON);
        assert!((position.x - 16.0).abs() < EPSILON);
    }

    #[test]
    fn test_passive_actor_only_gets_pre_collision() {
        let (mut bodies, mut colliders, handle, id) = actor(Vec2::new(5.0, 12.0), CollisionType::Passive);
        let log = record(&mut colliders, id);

        CellMapCollision::default().update(handle, &floor_map(), &mut colliders, &mut bodies);

        assert!((bodies.get(handle).unwrap().position.y - 12.0).abs() < EPSILON);
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, CollisionEventKind::PreCollision);
    }

    #[test]
    fn test_prevent_collision_actor_is_ignored() {
        let (mut bodies, mut colliders, handle, id) = actor(Vec2::new(5.0, 12.0), CollisionType::PreventCollision);
        let log = record(&mut colliders, id);
        CellMapCollision::default().update(handle, &floor_map(), &mut colliders, &mut bodies);
        assert!(log.borrow().is_empty());
        assert!((bodies.get(handle).unwrap().position.y - 12.0).abs() < EPSILON);
    }

    #[test]
    fn test_zero_iterations_leaves_overlap() {
        let (mut bodies, mut colliders, handle, _) = actor(Vec2::new(5.0, 12.0), CollisionType::Active);
        CellMapCollision::new(TileConfig { max_iterations: 0 }).update(handle, &floor_map(), &mut colliders, &mut bodies);
        assert!((bodies.get(handle).unwrap().position.y - 12.0).abs() < EPSILON);
    }

    #[test]
    fn test_cancel_skips_correction() {
        let (mut bodies, mut colliders, handle, id) = actor(Vec2::new(5.0, 12.0), CollisionType::Active);
        colliders
            .get_mut(id)
            .unwrap()
            .events
            .on(CollisionEventKind::PreCollision, |_, response| response.cancel());
        CellMapCollision::default().update(handle, &floor_map(), &mut colliders, &mut bodies);
        assert!((bodies.get(handle).unwrap().position.y - 12.0).abs() < EPSILON);
    }

    #[test]
    fn test_clear_actor_has_no_correction() {
        let map = TileMap::from_rows(Vec2::ZERO, 16.0, 16.0, &["....", "####"]).unwrap();
        let bounds = AABB::from_center(Vec2::new(20.0, 5.0), 10.0, 10.0);
        assert!(collides(&bounds, &map).is_none());
    }

    #[test]
    fn test_merge_keeps_larger_component_per_axis() {
        let merged = merge_corrections(Vec2::new(-3.0, 0.0), Vec2::new(0.0, -1.0));
        assert_eq!(merged, Vec2::new(-3.0, -1.0));
        let merged = merge_corrections(Vec2::new(0.5, -2.0), Vec2::new(-1.0, 1.0));
        assert_eq!(merged, Vec2::new(-1.0, -2.0));
    }
}
