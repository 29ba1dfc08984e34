//! Integration tests for ALICE-Rigid2D
//!
//! These tests verify end-to-end behaviour of the engine using only the
//! public API re-exported from the crate root.

use alice_rigid2d::settings::{ANGULAR_SLOP, LINEAR_SLOP};
use alice_rigid2d::*;

// ============================================================================
// Helpers
// ============================================================================

const DT: f32 = 1.0 / 60.0;

/// Run a world for `steps` frames.
fn run_world(world: &mut World, steps: usize) {
    for _ in 0..steps {
        world.step(DT, 8, 3);
    }
}

fn zero_gravity() -> World {
    World::new(WorldDef::default().with_gravity(Vec2::ZERO))
}

fn add_ground(world: &mut World) -> BodyHandle {
    let ground = world.create_body(&BodyDef::default()).unwrap();
    world
        .create_fixture(ground, &FixtureDef::new(PolygonShape::new_box(20.0, 0.5)))
        .unwrap();
    ground
}

fn add_ball(world: &mut World, def: &BodyDef, radius: f32) -> BodyHandle {
    let body = world.create_body(def).unwrap();
    world
        .create_fixture(body, &FixtureDef::new(CircleShape::new(Vec2::ZERO, radius)).with_density(1.0))
        .unwrap();
    body
}

// ============================================================================
// Mass invariants
// ============================================================================

#[test]
fn test_mass_invariants() {
    let mut world = World::default();
    let ground = add_ground(&mut world);
    let kinematic = world.create_body(&BodyDef::kinematic(Vec2::new(0.0, 3.0))).unwrap();
    world
        .create_fixture(kinematic, &FixtureDef::new(PolygonShape::new_box(1.0, 1.0)).with_density(5.0))
        .unwrap();
    let dynamic = add_ball(&mut world, &BodyDef::dynamic(Vec2::new(0.0, 6.0)), 0.5);

    for handle in [ground, kinematic] {
        let body = world.body(handle).unwrap();
        assert_eq!(body.inv_mass(), 0.0);
        assert_eq!(body.inv_inertia(), 0.0);
    }
    assert!(world.body(dynamic).unwrap().mass() > 0.0);

    // switching a dynamic body to static drops its mass
    world.set_body_type(dynamic, BodyType::Static).unwrap();
    assert_eq!(world.body(dynamic).unwrap().inv_mass(), 0.0);
}

// ============================================================================
// Contact pairing
// ============================================================================

#[test]
fn test_no_self_or_static_static_contacts() {
    let mut world = World::default();
    add_ground(&mut world);
    // overlapping statics never pair
    let other = world.create_body(&BodyDef::fixed(Vec2::new(0.0, 0.2))).unwrap();
    world
        .create_fixture(other, &FixtureDef::new(PolygonShape::new_box(1.0, 1.0)))
        .unwrap();

    // a body with two overlapping fixtures never pairs with itself
    let body = world.create_body(&BodyDef::dynamic(Vec2::new(3.0, 1.0))).unwrap();
    for _ in 0..2 {
        world
            .create_fixture(body, &FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.5)).with_density(1.0))
            .unwrap();
    }

    run_world(&mut world, 30);

    for (_, contact) in world.contacts() {
        assert_ne!(contact.body_a(), contact.body_b());
        let a = world.body(contact.body_a()).unwrap().body_type();
        let b = world.body(contact.body_b()).unwrap().body_type();
        assert!(a == BodyType::Dynamic || b == BodyType::Dynamic);
    }
}

// ============================================================================
// Sleep
// ============================================================================

#[test]
fn test_lone_resting_body_sleeps() {
    let mut world = zero_gravity();
    let body = add_ball(&mut world, &BodyDef::dynamic(Vec2::ZERO), 0.5);

    // time_to_sleep is half a second
    run_world(&mut world, 20);
    assert!(world.body(body).unwrap().is_awake());
    run_world(&mut world, 20);
    assert!(!world.body(body).unwrap().is_awake());
}

#[test]
fn test_island_stays_awake_while_a_member_moves() {
    let mut world = zero_gravity();
    let slow = add_ball(&mut world, &BodyDef::dynamic(Vec2::ZERO), 0.5);
    let fast = add_ball(
        &mut world,
        &BodyDef::dynamic(Vec2::new(1.0, 0.0)).with_angular_velocity(5.0),
        0.5,
    );
    let def = RevoluteJointDef::initialize(
        slow,
        world.body(slow).unwrap(),
        fast,
        world.body(fast).unwrap(),
        Vec2::new(1.0, 0.0),
    );
    world.create_joint(def).unwrap();

    run_world(&mut world, 120);
    assert!(world.body(slow).unwrap().is_awake());
    assert!(world.body(fast).unwrap().is_awake());
}

// ============================================================================
// Warm starting
// ============================================================================

#[test]
fn test_resting_box_impulses_stay_bounded() {
    let mut world = World::new(WorldDef::default().with_allow_sleep(false));
    add_ground(&mut world);
    let body = world.create_body(&BodyDef::dynamic(Vec2::new(0.0, 1.0))).unwrap();
    world
        .create_fixture(body, &FixtureDef::new(PolygonShape::new_box(0.5, 0.5)).with_density(1.0))
        .unwrap();

    run_world(&mut world, 60);

    let total_normal = |world: &World| -> f32 {
        world
            .contacts()
            .filter(|(_, c)| c.is_touching())
            .flat_map(|(_, c)| c.manifold().points().iter().map(|p| p.normal_impulse))
            .sum()
    };
    // weight per step: m * g * dt
    let weight_impulse = world.body(body).unwrap().mass() * 10.0 * DT;
    let settled = total_normal(&world);
    assert!((settled - weight_impulse).abs() < 0.1 * weight_impulse);

    let mut peak: f32 = 0.0;
    for _ in 0..300 {
        world.step(DT, 8, 3);
        peak = peak.max(total_normal(&world));
    }
    assert!(peak < 1.5 * weight_impulse, "peak = {peak}");
    assert!(world.body(body).unwrap().linear_velocity().length() < 0.05);
}

// ============================================================================
// Continuous collision
// ============================================================================

fn bullet_scene(def: WorldDef) -> (World, ContactEventCollector, BodyHandle) {
    let mut world = World::new(def.with_gravity(Vec2::ZERO));
    let events = ContactEventCollector::new();
    world.set_contact_listener(Some(Box::new(events.clone())));

    let wall = world.create_body(&BodyDef::default()).unwrap();
    world
        .create_fixture(wall, &FixtureDef::new(PolygonShape::new_box(0.05, 5.0)))
        .unwrap();

    let bullet = add_ball(
        &mut world,
        &BodyDef::dynamic(Vec2::new(-5.2, 0.0))
            .with_linear_velocity(Vec2::new(100.0, 0.0))
            .with_bullet(true),
        0.1,
    );
    (world, events, bullet)
}

#[test]
fn test_toi_prevents_tunneling() {
    let (mut world, events, bullet) = bullet_scene(WorldDef::default());
    run_world(&mut world, 10);
    assert!(events.count(ContactEventKind::Begin) >= 1);
    assert!(world.body(bullet).unwrap().position().x < 0.0);
}

#[test]
fn test_sub_stepping_stops_bullet_once() {
    let (mut world, events, bullet) = bullet_scene(WorldDef::default().with_sub_stepping(true));
    run_world(&mut world, 10);
    assert_eq!(events.count(ContactEventKind::Begin), 1);
    assert!(world.body(bullet).unwrap().position().x < 0.0);
}

#[test]
fn test_without_toi_bullet_tunnels() {
    let (mut world, events, bullet) = bullet_scene(WorldDef::default().with_continuous_physics(false));
    run_world(&mut world, 10);
    assert_eq!(events.count(ContactEventKind::Begin), 0);
    assert!(world.body(bullet).unwrap().position().x > 0.0);
}

// ============================================================================
// Joints
// ============================================================================

#[test]
fn test_revolute_limit_clamps_motor() {
    let mut world = zero_gravity();
    let ground = world.create_body(&BodyDef::default()).unwrap();
    let arm = world.create_body(&BodyDef::dynamic(Vec2::new(1.0, 0.0))).unwrap();
    world
        .create_fixture(arm, &FixtureDef::new(PolygonShape::new_box(1.0, 0.1)).with_density(1.0))
        .unwrap();

    let def = RevoluteJointDef::initialize(
        ground,
        world.body(ground).unwrap(),
        arm,
        world.body(arm).unwrap(),
        Vec2::ZERO,
    )
    .with_limit(0.0, std::f32::consts::FRAC_PI_2)
    .with_motor(10.0, 1000.0);
    let joint = world.create_joint(def).unwrap();

    for _ in 0..300 {
        world.step(DT, 8, 3);
        let JointKind::Revolute(revolute) = world.joint(joint).unwrap().kind() else {
            panic!("expected a revolute joint");
        };
        let angle = revolute.joint_angle(world.body(ground).unwrap(), world.body(arm).unwrap());
        assert!(angle >= -ANGULAR_SLOP - 0.01, "angle = {angle}");
        assert!(angle <= std::f32::consts::FRAC_PI_2 + ANGULAR_SLOP + 0.01, "angle = {angle}");
    }

    let JointKind::Revolute(revolute) = world.joint(joint).unwrap().kind() else {
        panic!("expected a revolute joint");
    };
    let angle = revolute.joint_angle(world.body(ground).unwrap(), world.body(arm).unwrap());
    assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 2.0 * ANGULAR_SLOP);
}

#[test]
fn test_joint_on_same_body_is_rejected() {
    let mut world = World::default();
    let body = add_ball(&mut world, &BodyDef::dynamic(Vec2::ZERO), 0.5);
    let def = RevoluteJointDef::initialize(body, world.body(body).unwrap(), body, world.body(body).unwrap(), Vec2::ZERO);
    assert!(matches!(
        world.create_joint(def),
        Err(PhysicsError::Configuration(ConfigurationError::SameBody))
    ));
    assert_eq!(world.joint_count(), 0);
}

// ============================================================================
// End-to-end: head-on collision
// ============================================================================

/// Two unit-diameter circles approach at 1 m/s each. Returns the separating
/// speed after the impact and the number of begin events.
fn head_on(restitution: f32) -> (f32, usize) {
    let mut world = zero_gravity();
    let events = ContactEventCollector::new();
    world.set_contact_listener(Some(Box::new(events.clone())));

    let mut make = |x: f32, vx: f32| {
        let body = world
            .create_body(&BodyDef::dynamic(Vec2::new(x, 0.0)).with_linear_velocity(Vec2::new(vx, 0.0)))
            .unwrap();
        world
            .create_fixture(
                body,
                &FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.5))
                    .with_density(1.0)
                    .with_restitution(restitution),
            )
            .unwrap();
        body
    };
    let a = make(-1.0, 1.0);
    let b = make(1.0, -1.0);

    // close until the surfaces meet
    let mut steps = 0;
    while steps < 120 {
        world.step(DT, 8, 3);
        steps += 1;
        let d = (world.body(b).unwrap().position() - world.body(a).unwrap().position()).length();
        if d <= 1.0 + LINEAR_SLOP {
            break;
        }
    }
    run_world(&mut world, 30);

    // normal points from A to B along +x
    let va = world.body(a).unwrap().linear_velocity();
    let vb = world.body(b).unwrap().linear_velocity();
    ((vb - va).x, events.count(ContactEventKind::Begin))
}

#[test]
fn test_head_on_circles_bounce() {
    let (separating, begins) = head_on(1.0);
    assert_eq!(begins, 1);
    assert!((separating - 2.0).abs() < 0.2, "separating speed = {separating}");
}

#[test]
fn test_head_on_separation_scales_with_restitution() {
    for restitution in [0.0, 0.5] {
        let (separating, begins) = head_on(restitution);
        assert_eq!(begins, 1);
        let expected = 2.0 * restitution;
        assert!(
            (separating - expected).abs() < 0.1,
            "restitution {restitution}: separating speed = {separating}"
        );
    }
}

// ============================================================================
// Contact creation and islands
// ============================================================================

#[test]
fn test_contact_order_does_not_depend_on_creation_order() {
    for circle_first in [true, false] {
        let mut world = World::default();
        let add_box_ground = |world: &mut World| {
            let ground = world.create_body(&BodyDef::default()).unwrap();
            world
                .create_fixture(ground, &FixtureDef::new(PolygonShape::new_box(5.0, 0.5)))
                .unwrap()
        };
        let add_circle = |world: &mut World| {
            let ball = world.create_body(&BodyDef::dynamic(Vec2::new(0.0, 0.99))).unwrap();
            world
                .create_fixture(ball, &FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.5)).with_density(1.0))
                .unwrap()
        };
        let (ground, ball) = if circle_first {
            let ball = add_circle(&mut world);
            (add_box_ground(&mut world), ball)
        } else {
            let ground = add_box_ground(&mut world);
            (ground, add_circle(&mut world))
        };

        world.step(DT, 8, 3);

        assert_eq!(world.contact_count(), 1);
        let (_, contact) = world.contacts().next().unwrap();
        // polygon versus circle is evaluated with the polygon as A
        assert_eq!(contact.fixture_a(), ground);
        assert_eq!(contact.fixture_b(), ball);
        assert!(contact.is_touching());
    }
}

#[test]
fn test_islands_do_not_cross_static_bodies() {
    let mut world = World::default();
    add_ground(&mut world);
    let resting = world.create_body(&BodyDef::dynamic(Vec2::new(-5.0, 1.0))).unwrap();
    let restless = world
        .create_body(&BodyDef::dynamic(Vec2::new(5.0, 1.0)).with_allow_sleep(false))
        .unwrap();
    for body in [resting, restless] {
        world
            .create_fixture(body, &FixtureDef::new(PolygonShape::new_box(0.5, 0.5)).with_density(1.0))
            .unwrap();
    }

    run_world(&mut world, 120);

    // both boxes touch the ground, yet only the sleepy one sleeps
    assert!(!world.body(resting).unwrap().is_awake());
    assert!(world.body(restless).unwrap().is_awake());
}

#[test]
fn test_islands_do_not_cross_sensor_contacts() {
    let mut world = World::default();
    let events = ContactEventCollector::new();
    world.set_contact_listener(Some(Box::new(events.clone())));
    add_ground(&mut world);

    let resting = world.create_body(&BodyDef::dynamic(Vec2::new(0.0, 1.0))).unwrap();
    world
        .create_fixture(resting, &FixtureDef::new(PolygonShape::new_box(0.5, 0.5)).with_density(1.0))
        .unwrap();

    let sensor_body = world
        .create_body(
            &BodyDef::dynamic(Vec2::new(0.0, 1.5))
                .with_gravity_scale(0.0)
                .with_allow_sleep(false),
        )
        .unwrap();
    world
        .create_fixture(
            sensor_body,
            &FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.5))
                .with_density(1.0)
                .with_sensor(true),
        )
        .unwrap();

    run_world(&mut world, 120);

    let sensor_touches = events
        .events()
        .iter()
        .filter(|e| e.kind == ContactEventKind::Begin && e.involves(sensor_body))
        .count();
    assert_eq!(sensor_touches, 1);
    assert!(!world.body(resting).unwrap().is_awake());
    assert!(world.body(sensor_body).unwrap().is_awake());
}

// ============================================================================
// Reentrancy
// ============================================================================

#[test]
fn test_listener_cannot_mutate_world_mid_step() {
    use std::cell::{Cell, RefCell};
    use std::rc::{Rc, Weak};

    struct Meddler {
        world: Weak<RefCell<World>>,
        attempts: Rc<Cell<usize>>,
        rejected: Rc<Cell<usize>>,
    }

    impl ContactListener for Meddler {
        fn begin_contact(&mut self, _contact: &mut Contact) {
            let Some(world) = self.world.upgrade() else {
                return;
            };
            self.attempts.set(self.attempts.get() + 1);
            match world.try_borrow_mut() {
                Ok(mut world) => {
                    let _ = world.create_body(&BodyDef::dynamic(Vec2::ZERO));
                }
                Err(_) => self.rejected.set(self.rejected.get() + 1),
            };
        }
    }

    let world = Rc::new(RefCell::new(World::default()));
    let attempts = Rc::new(Cell::new(0));
    let rejected = Rc::new(Cell::new(0));
    {
        let mut w = world.borrow_mut();
        w.set_contact_listener(Some(Box::new(Meddler {
            world: Rc::downgrade(&world),
            attempts: Rc::clone(&attempts),
            rejected: Rc::clone(&rejected),
        })));
        add_ground(&mut w);
        add_ball(&mut w, &BodyDef::dynamic(Vec2::new(0.0, 1.2)), 0.5);
    }

    for _ in 0..60 {
        world.borrow_mut().step(DT, 8, 3);
    }

    let w = world.borrow();
    assert!(attempts.get() >= 1);
    assert_eq!(rejected.get(), attempts.get());
    assert_eq!(w.body_count(), 2);
    assert!(!w.is_locked());
}

// ============================================================================
// Queries and lifecycle
// ============================================================================

#[test]
fn test_destruction_listener_hears_implicit_removals() {
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Goodbyes {
        joints: Rc<RefCell<Vec<JointHandle>>>,
        fixtures: Rc<RefCell<Vec<FixtureHandle>>>,
    }

    impl DestructionListener for Goodbyes {
        fn say_goodbye_joint(&mut self, joint: JointHandle) {
            self.joints.borrow_mut().push(joint);
        }

        fn say_goodbye_fixture(&mut self, fixture: FixtureHandle) {
            self.fixtures.borrow_mut().push(fixture);
        }
    }

    let listener = Goodbyes::default();
    let joints = Rc::clone(&listener.joints);
    let fixtures = Rc::clone(&listener.fixtures);

    let mut world = World::default();
    world.set_destruction_listener(Some(Box::new(listener)));
    let ground = add_ground(&mut world);
    let ball = add_ball(&mut world, &BodyDef::dynamic(Vec2::new(0.0, 3.0)), 0.5);
    let joint = world
        .create_joint(DistanceJointDef::initialize(
            ground,
            world.body(ground).unwrap(),
            ball,
            world.body(ball).unwrap(),
            Vec2::ZERO,
            Vec2::new(0.0, 3.0),
        ))
        .unwrap();

    world.destroy_body(ball).unwrap();
    assert_eq!(*joints.borrow(), vec![joint]);
    assert_eq!(fixtures.borrow().len(), 1);
    assert_eq!(world.body_count(), 1);
}

#[test]
fn test_stats_and_profile() {
    let mut world = World::default();
    add_ground(&mut world);
    for i in 0..10 {
        add_ball(&mut world, &BodyDef::dynamic(Vec2::new(i as f32 - 5.0, 2.0)), 0.4);
    }
    run_world(&mut world, 60);

    assert_eq!(world.body_count(), 11);
    assert_eq!(world.proxy_count(), 11);
    assert!(world.contact_count() >= 10);
    assert!(world.tree_height() >= 3);
    assert!(world.tree_quality() >= 1.0);
    assert!(world.profile().step >= world.profile().collide);
}
