//! End-to-end physics world behaviour

use kinetic_physics::{
    BodyId, BodySpec, ConstraintSpec, Integrator, MotionError, MotionPolicy, Shape, Vec2, World,
    WorldConfig,
};
use std::sync::{Arc, Mutex};

const FRAME: f32 = 1.0 / 60.0;

fn run(world: &mut World, seconds: f32) {
    let frames = (seconds / FRAME).round() as usize;
    for _ in 0..frames {
        world.step(FRAME);
    }
}

/// Floor at (250, 400), 500 x 10, with its top surface at y = 395
fn world_with_floor(config: WorldConfig) -> (World, BodyId) {
    let mut world = World::new(config, MotionPolicy::Off).unwrap();
    let floor = world
        .add_body(BodySpec::fixed(Shape::rectangle(500.0, 10.0)).with_position((250.0, 400.0)))
        .unwrap();
    (world, floor)
}

#[test]
fn test_initial_state_is_the_input_position() {
    let mut world = World::new(WorldConfig::default(), MotionPolicy::Off).unwrap();
    let id = world
        .add_body(
            BodySpec::dynamic(Shape::rectangle(20.0, 30.0))
                .with_position((12.5, -7.25))
                .with_rotation(0.3),
        )
        .unwrap();
    let state = world.get_body_state(id).unwrap();
    assert_eq!(state.position, Vec2::new(12.5, -7.25));
    assert_eq!(state.rotation, 0.3);
    assert!(!state.sleeping);
    assert_eq!(world.bodies().len(), 1);
}

#[test]
fn test_ball_comes_to_rest_on_the_floor() {
    for integrator in [Integrator::SemiImplicitEuler, Integrator::Verlet, Integrator::Rk4] {
        let (mut world, _) = world_with_floor(WorldConfig::default().with_integrator(integrator));
        let ball = world
            .add_body(BodySpec::dynamic(Shape::circle(10.0)).with_position((100.0, 0.0)))
            .unwrap();

        run(&mut world, 2.0);

        let state = world.get_body_state(ball).unwrap();
        assert!(
            state.position.y >= 380.0 && state.position.y < 400.0,
            "{integrator:?}: y = {}",
            state.position.y
        );
        assert!((state.position.x - 100.0).abs() < 1e-3);
    }
}

#[test]
fn test_box_lands_flat() {
    let (mut world, _) = world_with_floor(WorldConfig::default());
    let crate_box = world
        .add_body(BodySpec::dynamic(Shape::rectangle(40.0, 40.0)).with_position((250.0, 300.0)))
        .unwrap();

    run(&mut world, 3.0);

    let state = world.get_body_state(crate_box).unwrap();
    assert!((370.0..380.0).contains(&state.position.y), "y = {}", state.position.y);
    assert!(state.rotation.abs() < 0.05);
}

#[test]
fn test_elastic_head_on_collision_conserves_momentum() {
    let mut world = World::new(
        WorldConfig::default().with_gravity(Vec2::ZERO).with_sleep(false),
        MotionPolicy::Off,
    )
    .unwrap();
    let spec = BodySpec::dynamic(Shape::circle(10.0))
        .with_restitution(1.0)
        .with_friction(0.0);
    let a = world
        .add_body(spec.with_position((0.0, 0.0)).with_velocity((300.0, 0.0)))
        .unwrap();
    let b = world
        .add_body(spec.with_position((100.0, 0.0)).with_velocity((-100.0, 0.0)))
        .unwrap();

    let momentum = |world: &World| {
        let (a, b) = (world.get_body_state(a).unwrap(), world.get_body_state(b).unwrap());
        a.velocity + b.velocity
    };
    let before = momentum(&world);

    let mut contacts = 0;
    for _ in 0..30 {
        contacts += world.step(FRAME).contacts;
    }
    assert!(contacts > 0);

    let after = momentum(&world);
    assert!((after.x - before.x).abs() < 1e-2);
    assert!(after.y.abs() < 1e-4);
    // Equal masses swap velocities
    assert!((world.get_body_state(a).unwrap().velocity.x + 100.0).abs() < 1e-2);
    assert!((world.get_body_state(b).unwrap().velocity.x - 300.0).abs() < 1e-2);
}

#[test]
fn test_sleeping_body_stays_put_until_pushed() {
    let (mut world, _) = world_with_floor(WorldConfig::default());
    let ball = world
        .add_body(BodySpec::dynamic(Shape::circle(10.0)).with_position((100.0, 300.0)))
        .unwrap();

    run(&mut world, 3.0);
    let asleep = world.get_body_state(ball).unwrap();
    assert!(asleep.sleeping);

    run(&mut world, 1.0);
    assert_eq!(world.get_body_state(ball).unwrap().position, asleep.position);

    world.apply_impulse(ball, (0.0, -300.0));
    assert!(!world.get_body_state(ball).unwrap().sleeping);
    world.step(FRAME);
    assert!(world.get_body_state(ball).unwrap().position.y < asleep.position.y);
}

#[test]
fn test_sleeping_body_is_woken_by_contact() {
    let (mut world, _) = world_with_floor(WorldConfig::default());
    let resting = world
        .add_body(BodySpec::dynamic(Shape::circle(10.0)).with_position((100.0, 380.0)))
        .unwrap();
    run(&mut world, 2.0);
    assert!(world.get_body_state(resting).unwrap().sleeping);

    world
        .add_body(BodySpec::dynamic(Shape::circle(10.0)).with_position((100.0, 300.0)))
        .unwrap();
    let mut woken = 0;
    for _ in 0..60 {
        woken += world.step(FRAME).woken;
    }
    assert!(woken >= 1);
}

#[test]
fn test_unknown_ids_are_ignored() {
    let mut world = World::new(WorldConfig::default(), MotionPolicy::Off).unwrap();
    let keep = world.add_body(BodySpec::dynamic(Shape::circle(1.0))).unwrap();
    let gone = world.add_body(BodySpec::dynamic(Shape::circle(1.0))).unwrap();
    assert!(world.remove_body(gone));

    assert!(!world.remove_body(gone));
    world.apply_force(gone, (1.0, 0.0));
    world.apply_impulse(gone, (1.0, 0.0));
    assert!(world.set_position(gone, (1.0, 1.0)).is_ok());
    assert!(world.get_body_state(gone).is_none());
    assert_eq!(
        world.add_constraint(ConstraintSpec::distance(keep, gone, 5.0)),
        Ok(None)
    );
    assert_eq!(world.constraint_count(), 0);
    assert_eq!(world.body_count(), 1);
}

#[test]
fn test_invalid_specs_are_rejected_without_registering() {
    let mut world = World::new(WorldConfig::default(), MotionPolicy::Off).unwrap();
    let err = world
        .add_body(BodySpec::dynamic(Shape::circle(10.0)).with_position((f32::NAN, 0.0)))
        .unwrap_err();
    assert!(matches!(err, MotionError::Validation { field: "position", .. }));
    assert!(world.add_body(BodySpec::dynamic(Shape::circle(10.0)).with_mass(f32::INFINITY)).is_err());
    assert!(world.add_body(BodySpec::dynamic(Shape::circle(-2.0))).is_err());
    assert_eq!(world.body_count(), 0);

    let mut config = WorldConfig::default();
    config.max_sub_steps = 0;
    assert!(World::new(config, MotionPolicy::Off).is_err());
}

#[test]
fn test_non_finite_state_is_restored() {
    let mut world = World::new(
        WorldConfig::default().with_gravity(Vec2::ZERO),
        MotionPolicy::Off,
    )
    .unwrap();
    let id = world
        .add_body(BodySpec::dynamic(Shape::circle(1.0)).with_position((10.0, 10.0)))
        .unwrap();

    // Two finite forces whose sum overflows
    world.apply_force(id, (f32::MAX, 0.0));
    world.apply_force(id, (f32::MAX, 0.0));
    let report = world.step(FRAME);

    assert_eq!(report.recovered, vec![id]);
    let state = world.get_body_state(id).unwrap();
    assert_eq!(state.position, Vec2::new(10.0, 10.0));
    assert_eq!(state.velocity, Vec2::ZERO);

    // The world keeps working afterwards
    world.apply_impulse(id, (60.0, 0.0));
    world.step(FRAME);
    assert!(world.get_body_state(id).unwrap().position.x > 10.0);
}

#[test]
fn test_collision_listener_mutations_land_after_the_step() {
    let (mut world, floor) = world_with_floor(WorldConfig::default());
    let ball = world
        .add_body(BodySpec::dynamic(Shape::circle(10.0)).with_position((100.0, 350.0)))
        .unwrap();

    let spawned = Arc::new(Mutex::new(None));
    let slot = spawned.clone();
    world.on_collision(move |event, commands| {
        let Some(other) = event.other(floor) else {
            return;
        };
        let mut slot = slot.lock().unwrap();
        if slot.is_none() {
            let spark = commands
                .add_body(BodySpec::dynamic(Shape::circle(2.0)).with_position((300.0, 100.0)))
                .unwrap();
            *slot = Some(spark);
            commands.remove_body(other);
        }
    });

    let mut steps = 0;
    while world.step(FRAME).contacts == 0 {
        steps += 1;
        assert!(steps < 120, "ball never reached the floor");
    }

    let spark = spawned.lock().unwrap().expect("listener ran");
    assert!(world.get_body_state(ball).is_none());
    assert_eq!(
        world.get_body_state(spark).unwrap().position,
        Vec2::new(300.0, 100.0)
    );
    assert_eq!(world.body_count(), 2);

    // Ids handed out by the buffer are not reused
    let next = world.add_body(BodySpec::dynamic(Shape::circle(1.0))).unwrap();
    assert!(next.raw() > spark.raw());
}

#[test]
fn test_hinge_keeps_anchors_together_under_gravity() {
    let mut world = World::new(WorldConfig::default().with_sleep(false), MotionPolicy::Off).unwrap();
    let mount = world
        .add_body(BodySpec::fixed(Shape::rectangle(20.0, 20.0)).with_position((0.0, 0.0)))
        .unwrap();
    let door = world
        .add_body(BodySpec::dynamic(Shape::rectangle(60.0, 10.0)).with_position((40.0, 0.0)))
        .unwrap();
    world
        .add_constraint(
            ConstraintSpec::hinge(mount, door).with_anchors((10.0, 0.0), (-30.0, 0.0)),
        )
        .unwrap()
        .unwrap();

    run(&mut world, 1.0);

    let state = world.get_body_state(door).unwrap();
    let anchor = state.position + Vec2::new(-30.0, 0.0).rotate(state.rotation);
    assert!(anchor.distance(Vec2::new(10.0, 0.0)) < 1.0);
    assert!(state.position.y > 0.0, "door should swing down");
}

#[test]
fn test_removing_the_support_drops_a_sleeping_body() {
    let scene = |world: &mut World| {
        let floor = world
            .add_body(BodySpec::fixed(Shape::rectangle(500.0, 10.0)).with_position((250.0, 400.0)))
            .unwrap();
        let ball = world
            .add_body(BodySpec::dynamic(Shape::circle(10.0)).with_position((250.0, 300.0)))
            .unwrap();
        run(world, 3.0);
        if world.config().sleep_enabled {
            assert!(world.get_body_state(ball).unwrap().sleeping);
        }

        world.remove_body(floor);
        assert!(!world.get_body_state(ball).unwrap().sleeping);
        run(world, 1.0);
        vec![ball]
    };

    let mut with_sleep = World::new(WorldConfig::default(), MotionPolicy::Off).unwrap();
    let mut without_sleep =
        World::new(WorldConfig::default().with_sleep(false), MotionPolicy::Off).unwrap();
    let a = scene(&mut with_sleep)[0];
    let b = scene(&mut without_sleep)[0];
    let (a, b) = (
        with_sleep.get_body_state(a).unwrap().position,
        without_sleep.get_body_state(b).unwrap().position,
    );
    assert!(a.y > 800.0, "ball stayed at y = {}", a.y);
    assert!(a.distance(b) < 2.0, "sleep on {a:?}, sleep off {b:?}");
}

#[test]
fn test_constraint_between_sleeping_bodies_still_acts() {
    let scene = |world: &mut World| {
        world
            .add_body(BodySpec::fixed(Shape::rectangle(500.0, 10.0)).with_position((250.0, 400.0)))
            .unwrap();
        let left = world
            .add_body(BodySpec::dynamic(Shape::circle(10.0)).with_position((100.0, 385.0)))
            .unwrap();
        let right = world
            .add_body(BodySpec::dynamic(Shape::circle(10.0)).with_position((160.0, 385.0)))
            .unwrap();
        run(world, 2.0);

        world
            .add_constraint(ConstraintSpec::distance(left, right, 30.0))
            .unwrap()
            .unwrap();
        run(world, 2.0);
        vec![left, right]
    };

    let mut with_sleep = World::new(WorldConfig::default(), MotionPolicy::Off).unwrap();
    let mut without_sleep =
        World::new(WorldConfig::default().with_sleep(false), MotionPolicy::Off).unwrap();
    let ids_on = scene(&mut with_sleep);
    let ids_off = scene(&mut without_sleep);

    let positions = |world: &World, ids: &[BodyId]| -> Vec<Vec2> {
        ids.iter().map(|&id| world.get_body_state(id).unwrap().position).collect()
    };
    let on = positions(&with_sleep, &ids_on);
    let off = positions(&without_sleep, &ids_off);

    assert!((on[0].distance(on[1]) - 30.0).abs() < 0.5, "gap {}", on[0].distance(on[1]));
    for (a, b) in on.iter().zip(&off) {
        assert!(a.distance(*b) < 1.0, "sleep on {a:?}, sleep off {b:?}");
    }
}

#[test]
fn test_removing_an_unrelated_body_leaves_sleepers_alone() {
    let (mut world, _) = world_with_floor(WorldConfig::default());
    let ball = world
        .add_body(BodySpec::dynamic(Shape::circle(10.0)).with_position((100.0, 380.0)))
        .unwrap();
    let far = world
        .add_body(BodySpec::fixed(Shape::circle(5.0)).with_position((2000.0, -500.0)))
        .unwrap();
    run(&mut world, 2.0);
    let asleep = world.get_body_state(ball).unwrap();
    assert!(asleep.sleeping);

    assert!(world.remove_body(far));
    run(&mut world, 1.0);
    let state = world.get_body_state(ball).unwrap();
    assert!(state.sleeping);
    assert_eq!(state.position, asleep.position);
}

#[test]
fn test_moving_a_static_body_wakes_what_it_leaves() {
    let (mut world, floor) = world_with_floor(WorldConfig::default());
    let ball = world
        .add_body(BodySpec::dynamic(Shape::circle(10.0)).with_position((100.0, 380.0)))
        .unwrap();
    run(&mut world, 2.0);
    assert!(world.get_body_state(ball).unwrap().sleeping);

    world.set_position(floor, (250.0, 600.0)).unwrap();
    assert!(!world.get_body_state(ball).unwrap().sleeping);
    run(&mut world, 0.5);
    assert!(world.get_body_state(ball).unwrap().position.y > 390.0);
}
