//! # ALICE-Rigid2D
//!
//! **2D Rigid Body Physics**
//!
//! A sequential-impulse rigid body engine for games and simulations: dynamic
//! AABB tree broad-phase, convex narrow-phase with persistent manifolds,
//! island solver with sleeping, ten joint types and continuous collision for
//! fast bodies.
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | **Shapes** | Circle, edge (one- or two-sided), convex polygon, chain |
//! | **Broad-phase** | Dynamic AABB tree with fat AABBs and move buffer |
//! | **Narrow-phase** | SAT + clipping manifolds, GJK distance, shape cast |
//! | **Solver** | Islands, warm starting, 2-point block solver, sleeping |
//! | **Joints** | Distance, revolute, prismatic, weld, wheel, pulley, gear, motor, friction, mouse |
//! | **Continuous** | Conservative-advancement time of impact, bullets |
//! | **Rope** | Standalone PBD/XPBD particle chain |
//!
//! ## Quick Start
//!
//! ```rust
//! use alice_rigid2d::prelude::*;
//!
//! let mut world = World::new(WorldDef::default());
//!
//! let ground = world.create_body(&BodyDef::default()).unwrap();
//! world
//!     .create_fixture(ground, &FixtureDef::new(PolygonShape::new_box(20.0, 0.5)))
//!     .unwrap();
//!
//! let ball = world.create_body(&BodyDef::dynamic(Vec2::new(0.0, 5.0))).unwrap();
//! world
//!     .create_fixture(ball, &FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.5)).with_density(1.0))
//!     .unwrap();
//!
//! for _ in 0..120 {
//!     world.step(1.0 / 60.0, 8, 3);
//! }
//! assert!(world.body(ball).unwrap().position().y < 5.0);
//! ```
//!
//! ## Contact Events
//!
//! ```rust
//! use alice_rigid2d::prelude::*;
//!
//! let mut world = World::new(WorldDef::default());
//! let events = ContactEventCollector::new();
//! world.set_contact_listener(Some(Box::new(events.clone())));
//!
//! world.step(1.0 / 60.0, 8, 3);
//! for event in events.drain() {
//!     println!("{:?} between {:?} and {:?}", event.kind, event.body_a, event.body_b);
//! }
//! ```
//!
//! ## Logging
//!
//! The crate emits `tracing` events and spans (step phases, rejected
//! mutations, contact and sleep transitions) but never installs a
//! subscriber.

pub mod body;
pub mod broad_phase;
pub mod chain;
pub mod collide;
pub mod collision;
pub mod contact;
mod contact_manager;
mod contact_solver;
pub mod debug_draw;
pub mod distance;
pub mod dynamic_tree;
pub mod error;
pub mod event;
pub mod filter;
pub mod fixture;
mod island;
pub mod joint;
pub mod joint_distance;
pub mod joint_friction;
pub mod joint_gear;
pub mod joint_motor;
pub mod joint_mouse;
pub mod joint_prismatic;
pub mod joint_pulley;
pub mod joint_revolute;
pub mod joint_weld;
pub mod joint_wheel;
pub mod math;
pub mod polygon;
pub mod profiling;
pub mod rope;
pub mod settings;
pub mod shape;
pub mod stack_allocator;
pub mod time_step;
pub mod toi;
pub mod world;
pub mod world_callbacks;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::body::{Body, BodyDef, BodyHandle, BodyType};
    pub use crate::chain::ChainShape;
    pub use crate::collision::{Aabb, Manifold, RayCastInput, RayCastOutput, WorldManifold};
    pub use crate::contact::{Contact, ContactHandle};
    pub use crate::debug_draw::{Color, Draw, DrawFlags, DrawRecorder};
    pub use crate::error::{ConfigurationError, PhysicsError};
    pub use crate::event::{ContactEvent, ContactEventCollector, ContactEventKind};
    pub use crate::filter::Filter;
    pub use crate::fixture::{Fixture, FixtureDef, FixtureHandle};
    pub use crate::joint::{angular_stiffness, linear_stiffness, Joint, JointDef, JointHandle, JointKind, JointType};
    pub use crate::joint_distance::{DistanceJoint, DistanceJointDef};
    pub use crate::joint_friction::{FrictionJoint, FrictionJointDef};
    pub use crate::joint_gear::{GearJoint, GearJointDef};
    pub use crate::joint_motor::{MotorJoint, MotorJointDef};
    pub use crate::joint_mouse::{MouseJoint, MouseJointDef};
    pub use crate::joint_prismatic::{PrismaticJoint, PrismaticJointDef};
    pub use crate::joint_pulley::{PulleyJoint, PulleyJointDef};
    pub use crate::joint_revolute::{RevoluteJoint, RevoluteJointDef};
    pub use crate::joint_weld::{WeldJoint, WeldJointDef};
    pub use crate::joint_wheel::{WheelJoint, WheelJointDef};
    pub use crate::math::{Rot, Transform, Vec2};
    pub use crate::polygon::PolygonShape;
    pub use crate::profiling::{Profile, ProfileAggregate};
    pub use crate::rope::{BendingModel, Rope, RopeDef, RopeTuning, StretchingModel};
    pub use crate::shape::{CircleShape, EdgeShape, MassData, Shape, ShapeType};
    pub use crate::world::{RayCastHit, World, WorldDef};
    pub use crate::world_callbacks::{
        ContactFilter, ContactImpulse, ContactListener, DefaultContactFilter, DestructionListener,
    };
}

// Re-export main types at crate root
pub use prelude::*;

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_builds_a_pendulum() {
        let mut world = World::new(WorldDef::default());
        let ground = world.create_body(&BodyDef::default()).unwrap();
        let bob = world.create_body(&BodyDef::dynamic(Vec2::new(2.0, 0.0))).unwrap();
        world
            .create_fixture(bob, &FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.25)).with_density(1.0))
            .unwrap();

        let def = RevoluteJointDef::initialize(
            ground,
            world.body(ground).unwrap(),
            bob,
            world.body(bob).unwrap(),
            Vec2::ZERO,
        );
        world.create_joint(def).unwrap();

        for _ in 0..120 {
            world.step(1.0 / 60.0, 8, 3);
        }

        // the bob swings on a circle of radius 2 around the pivot
        let r = world.body(bob).unwrap().position().length();
        assert!((r - 2.0).abs() < 0.05, "r = {r}");
    }
}
