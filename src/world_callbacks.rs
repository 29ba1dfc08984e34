//! World Callbacks
//!
//! Traits the host implements to observe or steer the simulation. Every
//! method has a default, so implementors override only what they need.

use crate::collision::Manifold;
use crate::contact::Contact;
use crate::filter::Filter;
use crate::fixture::{Fixture, FixtureHandle};
use crate::joint::JointHandle;
use crate::settings::MAX_MANIFOLD_POINTS;

/// Notified when joints and fixtures are destroyed implicitly because their
/// body was destroyed.
pub trait DestructionListener {
    /// A joint is about to be destroyed
    fn say_goodbye_joint(&mut self, _joint: JointHandle) {}

    /// A fixture is about to be destroyed
    fn say_goodbye_fixture(&mut self, _fixture: FixtureHandle) {}
}

/// Decides whether two fixtures may form a contact.
pub trait ContactFilter {
    /// Return true when contact calculations should be performed.
    fn should_collide(&mut self, fixture_a: &Fixture, fixture_b: &Fixture) -> bool {
        Filter::should_collide(fixture_a.filter_data(), fixture_b.filter_data())
    }
}

/// The default category/mask/group rule.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultContactFilter;

impl ContactFilter for DefaultContactFilter {}

/// Impulses applied by the solver to one contact, reported in post-solve.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ContactImpulse {
    /// Normal impulses per manifold point
    pub normal_impulses: [f32; MAX_MANIFOLD_POINTS],
    /// Tangent impulses per manifold point
    pub tangent_impulses: [f32; MAX_MANIFOLD_POINTS],
    /// Number of valid entries
    pub count: usize,
}

/// Receives contact events during `World::step`.
///
/// Events fire while the world is locked; the listener cannot mutate the
/// world from inside a callback.
pub trait ContactListener {
    /// Two fixtures began touching (sensors included)
    fn begin_contact(&mut self, _contact: &mut Contact) {}

    /// Two fixtures stopped touching, or the contact was destroyed while touching
    fn end_contact(&mut self, _contact: &Contact) {}

    /// Called after collision detection and before solving, for touching
    /// non-sensor contacts. `old_manifold` is the previous step's manifold.
    /// Disable the contact here to skip it for this step.
    fn pre_solve(&mut self, _contact: &mut Contact, _old_manifold: &Manifold) {}

    /// Called after the velocity solve with the applied impulses
    fn post_solve(&mut self, _contact: &Contact, _impulse: &ContactImpulse) {}
}
