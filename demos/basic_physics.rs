//! Basic 2D Physics Example
//!
//! Builds a small scene (ground, box stack, pendulum, bouncing ball),
//! steps it for two seconds and prints positions and contact events.
//!
//! ```bash
//! RUST_LOG=alice_rigid2d=debug cargo run --example basic_physics
//! ```

use alice_rigid2d::prelude::*;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> Result<(), PhysicsError> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("alice_rigid2d=info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut world = World::new(WorldDef::default());
    let events = ContactEventCollector::new();
    world.set_contact_listener(Some(Box::new(events.clone())));

    // Static ground
    let ground = world.create_body(&BodyDef::default())?;
    world.create_fixture(ground, &FixtureDef::new(EdgeShape::two_sided(Vec2::new(-20.0, 0.0), Vec2::new(20.0, 0.0))))?;

    // Stack of five boxes
    let mut stack = Vec::new();
    for i in 0..5 {
        let body = world.create_body(&BodyDef::dynamic(Vec2::new(-4.0, 0.5 + i as f32)))?;
        world.create_fixture(
            body,
            &FixtureDef::new(PolygonShape::new_box(0.5, 0.5))
                .with_density(1.0)
                .with_friction(0.6),
        )?;
        stack.push(body);
    }

    // Pendulum hanging from a pivot at (4, 6)
    let bob = world.create_body(&BodyDef::dynamic(Vec2::new(7.0, 6.0)))?;
    world.create_fixture(bob, &FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.25)).with_density(2.0))?;
    let pivot = RevoluteJointDef::initialize(
        ground,
        world.body(ground).ok_or(PhysicsError::body())?,
        bob,
        world.body(bob).ok_or(PhysicsError::body())?,
        Vec2::new(4.0, 6.0),
    );
    world.create_joint(pivot)?;

    // Bouncy ball
    let ball = world.create_body(&BodyDef::dynamic(Vec2::new(0.0, 8.0)))?;
    world.create_fixture(
        ball,
        &FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.5))
            .with_density(1.0)
            .with_restitution(0.8),
    )?;

    println!("ALICE-Rigid2D Basic Example");
    println!("===========================");
    println!("Bodies: {}  Joints: {}", world.body_count(), world.joint_count());
    println!();

    let mut aggregate = ProfileAggregate::default();
    for frame in 0..120 {
        world.step(1.0 / 60.0, 8, 3);
        aggregate.record(world.profile());

        for event in events.drain() {
            if event.kind == ContactEventKind::Begin && event.involves(ball) {
                println!("Frame {frame:3}: ball touched {:?}", event.fixture_b);
            }
        }

        if frame % 20 == 0 {
            let top = stack.last().and_then(|&h| world.body(h)).map(|b| b.position());
            let bob_pos = world.body(bob).map(|b| b.position());
            let ball_pos = world.body(ball).map(|b| b.position());
            println!("Frame {frame:3}: stack top {top:?}  bob {bob_pos:?}  ball {ball_pos:?}");
        }
    }

    println!();
    println!("Simulation complete (120 frames, 2 seconds).");
    println!("Contacts: {}  Tree height: {}", world.contact_count(), world.tree_height());
    println!("Profile: {aggregate:?}");
    Ok(())
}
