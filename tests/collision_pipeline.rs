use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use physics2d::collision::narrowphase;
use physics2d::collision::ColliderSet;
use physics2d::objects::BodySet;
use physics2d::{
    Circle, ColliderDesc, ColliderId, CollisionEventKind, CollisionType, CompositeStrategy, PhysicsConfig,
    PhysicsWorld, Polygon, RigidBody, Shape, Side, SolverStrategy, TileMap, Vec2, AABB,
};

const EPSILON: f64 = 1e-9;

fn world(solver: SolverStrategy, gravity: Vec2) -> PhysicsWorld {
    PhysicsWorld::new(PhysicsConfig {
        solver,
        gravity,
        ..Default::default()
    })
}

fn square(size: f64) -> ColliderDesc {
    ColliderDesc::shape(Polygon::rectangle(size, size).unwrap())
}

fn add_box(world: &mut PhysicsWorld, body: RigidBody, width: f64, height: f64) -> (physics2d::BodyHandle, ColliderId) {
    let shape = Polygon::rectangle(width, height).unwrap();
    let handle = world.add_body(body);
    let id = world.add_collider(ColliderDesc::shape(shape), Some(handle)).unwrap();
    (handle, id)
}

fn active_box(position: Vec2) -> RigidBody {
    let shape = Shape::Polygon(Polygon::rectangle(10.0, 10.0).unwrap());
    RigidBody::new(1.0, &shape).with_position(position)
}

fn penetration(a: &AABB, b: &AABB) -> f64 {
    let x = a.max.x.min(b.max.x) - a.min.x.max(b.min.x);
    let y = a.max.y.min(b.max.y) - a.min.y.max(b.min.y);
    x.min(y).max(0.0)
}

#[test]
fn test_contact_normals_are_unit_and_point_from_a_to_b() {
    let mut bodies = BodySet::new();
    let mut colliders = ColliderSet::new();
    let placements = [
        (Vec2::new(0.0, 0.0), ColliderDesc::shape(Circle::new(5.0).unwrap())),
        (Vec2::new(7.0, 4.0), ColliderDesc::shape(Circle::new(4.0).unwrap())),
        (Vec2::new(3.0, -6.0), square(10.0)),
        (Vec2::new(-8.0, 2.0), square(8.0)),
    ];
    let mut ids = Vec::new();
    let mut centers = HashMap::new();
    for (position, desc) in placements {
        let handle = bodies.insert(RigidBody::new_with_inertia(1.0, 1.0).with_position(position));
        let id = colliders.insert(desc, Some(handle), &bodies).unwrap();
        centers.insert(id, position);
        ids.push(id);
    }

    let mut checked = 0;
    for (i, &a) in ids.iter().enumerate() {
        for &b in &ids[i + 1..] {
            for contact in narrowphase::collide(&colliders, &bodies, a, b, CompositeStrategy::Together) {
                let towards_b = centers[&contact.collider_b] - centers[&contact.collider_a];
                assert!((contact.normal.magnitude() - 1.0).abs() < 1e-6);
                assert!(towards_b.normalize().dot(contact.normal) > 0.0);
                checked += 1;
            }
        }
    }
    assert_eq!(checked, 3);
}

#[test]
fn test_fixed_bodies_never_move() {
    for solver in [SolverStrategy::Box, SolverStrategy::RigidBody] {
        let mut world = world(solver, Vec2::new(0.0, 981.0));
        let (a, _) = add_box(&mut world, RigidBody::new_fixed(Vec2::ZERO), 10.0, 10.0);
        let (b, _) = add_box(&mut world, RigidBody::new_fixed(Vec2::new(5.0, 5.0)), 10.0, 10.0);
        for _ in 0..10 {
            world.step(16.0);
        }
        assert_eq!(world.body(a).unwrap().position, Vec2::ZERO);
        assert_eq!(world.body(b).unwrap().position, Vec2::new(5.0, 5.0));
    }
}

#[test]
fn test_only_the_active_body_moves_against_fixed() {
    for solver in [SolverStrategy::Box, SolverStrategy::RigidBody] {
        let mut world = world(solver, Vec2::ZERO);
        let (player, _) = add_box(&mut world, active_box(Vec2::ZERO), 10.0, 10.0);
        let (wall, _) = add_box(&mut world, RigidBody::new_fixed(Vec2::new(0.0, 7.0)), 10.0, 10.0);
        world.step(16.0);
        assert!(world.body(player).unwrap().position.y < 0.0, "{solver:?}");
        assert_eq!(world.body(wall).unwrap().position, Vec2::new(0.0, 7.0));
    }
}

#[test]
fn test_box_solver_splits_overlap_between_active_bodies() {
    let mut world = world(SolverStrategy::Box, Vec2::ZERO);
    let (a, _) = add_box(&mut world, active_box(Vec2::ZERO), 10.0, 10.0);
    let (b, _) = add_box(&mut world, active_box(Vec2::new(6.0, 0.0)), 10.0, 10.0);
    world.step(16.0);

    let a = world.body(a).unwrap().position;
    let b = world.body(b).unwrap().position;
    assert!((a.x - -2.0).abs() < EPSILON);
    assert!((b.x - 8.0).abs() < EPSILON);
}

#[test]
fn test_approaching_boxes_are_separated_in_one_step() {
    let mut world = world(SolverStrategy::Box, Vec2::ZERO);
    let (_, ca) = add_box(&mut world, active_box(Vec2::ZERO).with_velocity(Vec2::new(10.0, 10.0)), 10.0, 10.0);
    let (_, cb) = add_box(
        &mut world,
        active_box(Vec2::new(5.0, 5.0)).with_velocity(Vec2::new(-10.0, -10.0)),
        10.0,
        10.0,
    );
    let before = penetration(
        &world.colliders().bounds(ca, world.bodies()).unwrap(),
        &world.colliders().bounds(cb, world.bodies()).unwrap(),
    );
    world.step(16.0);
    let after = penetration(
        &world.colliders().bounds(ca, world.bodies()).unwrap(),
        &world.colliders().bounds(cb, world.bodies()).unwrap(),
    );
    assert!(after < before);
    assert!(after <= world.config().rigid_body.slop);
}

#[test]
fn test_box_comes_to_rest_on_floor_with_impulse_solver() {
    let mut world = world(SolverStrategy::RigidBody, Vec2::new(0.0, 981.0));
    let (body, _) = add_box(&mut world, active_box(Vec2::ZERO), 10.0, 10.0);
    add_box(&mut world, RigidBody::new_fixed(Vec2::new(0.0, 20.0)), 200.0, 20.0);

    for _ in 0..120 {
        world.step(16.0);
    }
    // No jitter: the last steps all stay at rest
    for _ in 0..20 {
        world.step(16.0);
        let body = world.body(body).unwrap();
        assert!(body.linear_velocity.y.abs() < 1.0, "vy = {}", body.linear_velocity.y);
        let sink = body.position.y + 5.0 - 10.0;
        assert!(sink < 2.5, "penetration {sink}");
        assert!(sink > -0.5, "floating {sink}");
    }
}

#[test]
fn test_box_comes_to_rest_on_floor_with_box_solver() {
    let mut world = world(SolverStrategy::Box, Vec2::new(0.0, 981.0));
    let (body, _) = add_box(&mut world, active_box(Vec2::ZERO), 10.0, 10.0);
    add_box(&mut world, RigidBody::new_fixed(Vec2::new(0.0, 20.0)), 200.0, 20.0);

    for _ in 0..60 {
        world.step(16.0);
    }
    let body = world.body(body).unwrap();
    assert!((body.position.y - 5.0).abs() < 1e-6);
    assert!(body.linear_velocity.y.abs() < 1e-6);
}

#[test]
fn test_cancelled_contact_is_not_resolved_but_stays_in_bookkeeping() {
    let mut world = world(SolverStrategy::RigidBody, Vec2::ZERO);
    let (player, cp) = add_box(&mut world, active_box(Vec2::ZERO).with_velocity(Vec2::new(0.0, 50.0)), 10.0, 10.0);
    add_box(&mut world, RigidBody::new_fixed(Vec2::new(0.0, 8.0)), 10.0, 10.0);

    let starts = Rc::new(RefCell::new(0));
    {
        let starts = starts.clone();
        let events = &mut world.collider_mut(cp).unwrap().events;
        events.on(CollisionEventKind::BeforeCollisionResolve, |_, response| response.cancel());
        events.on(CollisionEventKind::CollisionStart, move |_, _| *starts.borrow_mut() += 1);
    }
    world.step(16.0);

    let body = world.body(player).unwrap();
    assert!((body.linear_velocity.y - 50.0).abs() < EPSILON);
    assert!((body.position.y - 0.8).abs() < EPSILON);
    assert_eq!(world.contacts().len(), 1);
    assert!(world.contacts()[0].is_cancelled());
    let id = world.contacts()[0].id;
    assert!(world.solver().last_frame_contacts().contains_key(&id));
    assert_eq!(*starts.borrow(), 0);
}

#[test]
fn test_cancelling_a_started_contact_keeps_start_and_end_balanced() {
    let mut world = world(SolverStrategy::RigidBody, Vec2::ZERO);
    // 0.5 overlap stays within the slop, so the boxes keep touching every frame
    let (player, cp) = add_box(&mut world, active_box(Vec2::ZERO), 10.0, 10.0);
    add_box(&mut world, RigidBody::new_fixed(Vec2::new(0.0, 9.5)), 10.0, 10.0);

    let cancel = Rc::new(Cell::new(false));
    let starts = Rc::new(Cell::new(0));
    let ends = Rc::new(Cell::new(0));
    {
        let (cancel, starts, ends) = (cancel.clone(), starts.clone(), ends.clone());
        let events = &mut world.collider_mut(cp).unwrap().events;
        events.on(CollisionEventKind::BeforeCollisionResolve, move |_, response| {
            if cancel.get() {
                response.cancel();
            }
        });
        events.on(CollisionEventKind::CollisionStart, move |_, _| starts.set(starts.get() + 1));
        events.on(CollisionEventKind::CollisionEnd, move |_, _| ends.set(ends.get() + 1));
    }

    world.step(16.0);
    assert_eq!((starts.get(), ends.get()), (1, 0));

    cancel.set(true);
    world.step(16.0);
    assert!(world.contacts()[0].is_cancelled());
    assert_eq!((starts.get(), ends.get()), (1, 0));

    cancel.set(false);
    world.step(16.0);
    assert_eq!((starts.get(), ends.get()), (1, 0));

    world.body_mut(player).unwrap().position = Vec2::new(0.0, -100.0);
    world.step(16.0);
    assert_eq!((starts.get(), ends.get()), (1, 1));
}

#[test]
fn test_contact_cancelled_from_the_first_frame_starts_once_released() {
    let mut world = world(SolverStrategy::RigidBody, Vec2::ZERO);
    let (_, cp) = add_box(&mut world, active_box(Vec2::ZERO), 10.0, 10.0);
    add_box(&mut world, RigidBody::new_fixed(Vec2::new(0.0, 9.5)), 10.0, 10.0);

    let cancel = Rc::new(Cell::new(true));
    let starts = Rc::new(Cell::new(0));
    {
        let (cancel, starts) = (cancel.clone(), starts.clone());
        let events = &mut world.collider_mut(cp).unwrap().events;
        events.on(CollisionEventKind::BeforeCollisionResolve, move |_, response| {
            if cancel.get() {
                response.cancel();
            }
        });
        events.on(CollisionEventKind::CollisionStart, move |_, _| starts.set(starts.get() + 1));
    }

    world.step(16.0);
    assert_eq!(starts.get(), 0);
    cancel.set(false);
    world.step(16.0);
    assert_eq!(starts.get(), 1);
}

#[test]
fn test_composite_contacts_share_a_key_when_together() {
    for (strategy, expected_starts) in [(CompositeStrategy::Together, 1), (CompositeStrategy::Separate, 2)] {
        let mut world = PhysicsWorld::new(PhysicsConfig {
            solver: SolverStrategy::RigidBody,
            composite_strategy: strategy,
            ..Default::default()
        });
        let body = world.add_body(active_box(Vec2::ZERO));
        let composite = world
            .add_collider(
                ColliderDesc::composite(vec![
                    square(10.0).with_offset(Vec2::new(-4.0, 0.0)),
                    square(10.0).with_offset(Vec2::new(4.0, 0.0)),
                ]),
                Some(body),
            )
            .unwrap();
        add_box(&mut world, RigidBody::new_fixed(Vec2::new(0.0, 9.0)), 100.0, 10.0);

        let starts = Rc::new(RefCell::new(0));
        {
            let starts = starts.clone();
            world
                .collider_mut(composite)
                .unwrap()
                .events
                .on(CollisionEventKind::CollisionStart, move |_, _| *starts.borrow_mut() += 1);
        }
        world.step(16.0);

        let mut ids: Vec<String> = world.contacts().iter().map(|c| c.id.to_string()).collect();
        ids.sort();
        match strategy {
            CompositeStrategy::Together => assert_eq!(ids, vec!["#1+3|#0+3", "#2+3|#0+3"]),
            CompositeStrategy::Separate => assert_eq!(ids, vec!["#1+3", "#2+3"]),
        }
        assert_eq!(*starts.borrow(), expected_starts, "{strategy:?}");
    }
}

#[test]
fn test_actor_lands_on_tile_floor() {
    let mut world = world(SolverStrategy::Box, Vec2::new(0.0, 981.0));
    world.add_cell_map(TileMap::from_rows(Vec2::ZERO, 16.0, 16.0, &["....", "....", "####"]).unwrap());
    let (body, collider) = add_box(&mut world, active_box(Vec2::new(8.0, 20.0)), 10.0, 10.0);

    let sides = Rc::new(RefCell::new(Vec::new()));
    {
        let sides = sides.clone();
        world
            .collider_mut(collider)
            .unwrap()
            .events
            .on(CollisionEventKind::PostCollision, move |e, _| sides.borrow_mut().push((e.side, e.other)));
    }
    for _ in 0..15 {
        world.step(16.0);
    }

    assert!((world.body(body).unwrap().position.y - 27.0).abs() < EPSILON);
    let sides = sides.borrow();
    assert!(!sides.is_empty());
    assert!(sides.iter().all(|&(side, other)| side == Side::Bottom && other.is_none()));
}

#[test]
fn test_fast_bodies_do_not_tunnel_through_walls() {
    for check in [true, false] {
        let mut config = PhysicsConfig::default();
        config.continuous.check_for_fast_bodies = check;
        let mut world = PhysicsWorld::new(config);
        let bullet = world.add_body(RigidBody::new_with_inertia(1.0, 1.0).with_velocity(Vec2::new(10_000.0, 0.0)));
        world
            .add_collider(ColliderDesc::shape(Circle::new(2.0).unwrap()), Some(bullet))
            .unwrap();
        add_box(&mut world, RigidBody::new_fixed(Vec2::new(50.0, 0.0)), 10.0, 100.0);

        world.step(16.0);
        let x = world.body(bullet).unwrap().position.x;
        if check {
            assert!(x < 50.0, "bullet at {x}");
        } else {
            assert!(x > 100.0, "bullet at {x}");
        }
    }
}

#[test]
fn test_kill_from_handler_removes_body_from_simulation() {
    let mut world = world(SolverStrategy::Box, Vec2::ZERO);
    let (player, cp) = add_box(&mut world, active_box(Vec2::ZERO), 10.0, 10.0);
    add_box(&mut world, RigidBody::new_fixed(Vec2::new(0.0, 8.0)), 10.0, 10.0);
    world
        .collider_mut(cp)
        .unwrap()
        .events
        .on(CollisionEventKind::PreCollision, |_, response| response.kill());

    world.step(16.0);
    assert!(!world.body(player).unwrap().is_active());
    assert_eq!(world.body(player).unwrap().position, Vec2::ZERO);

    world.step(16.0);
    assert!(world.contacts().is_empty());
}

#[test]
fn test_passive_bodies_overlap_without_resolution() {
    for solver in [SolverStrategy::Box, SolverStrategy::RigidBody] {
        let mut world = world(solver, Vec2::ZERO);
        let (a, _) = add_box(&mut world, active_box(Vec2::ZERO), 10.0, 10.0);
        let (trigger, _) = add_box(
            &mut world,
            active_box(Vec2::new(5.0, 0.0)).with_collision_type(CollisionType::Passive),
            10.0,
            10.0,
        );
        world.step(16.0);
        assert_eq!(world.contacts().len(), 1);
        assert_eq!(world.body(a).unwrap().position, Vec2::ZERO);
        assert_eq!(world.body(trigger).unwrap().position, Vec2::new(5.0, 0.0));
    }
}

#[test]
fn test_partial_configuration_loads_with_defaults() {
    let config: PhysicsConfig = serde_json::from_str(
        r#"{
            "gravity": { "x": 0.0, "y": 981.0 },
            "solver": "RigidBody",
            "rigid_body": { "slop": 0.5 },
            "tile": { "max_iterations": 4 }
        }"#,
    )
    .unwrap();
    assert_eq!(config.solver, SolverStrategy::RigidBody);
    assert!((config.rigid_body.slop - 0.5).abs() < EPSILON);
    assert!((config.rigid_body.steering_factor - 0.2).abs() < EPSILON);
    assert_eq!(config.rigid_body.velocity_iterations, 8);
    assert_eq!(config.tile.max_iterations, 4);
    assert_eq!(config.substeps, 1);
    assert!((config.arcade.mtv_epsilon - 0.0001).abs() < 1e-12);
}
