//! Contact Event Collection
//!
//! A ready-made [`ContactListener`] that records contact callbacks for
//! consumption after `World::step`. The collector is a cheap cloneable
//! handle: install one clone in the world and keep another to read events.
//!
//! ```ignore
//! let events = ContactEventCollector::new();
//! world.set_contact_listener(Some(Box::new(events.clone())));
//! world.step(1.0 / 60.0, 8, 3);
//! for event in events.drain() {
//!     // ...
//! }
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::body::BodyHandle;
use crate::collision::Manifold;
use crate::contact::{Contact, ContactHandle};
use crate::fixture::FixtureHandle;
use crate::world_callbacks::{ContactImpulse, ContactListener};

/// Which callback produced an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContactEventKind {
    /// Fixtures began touching
    Begin,
    /// Fixtures stopped touching
    End,
    /// Touching contact about to be solved
    PreSolve,
    /// Contact was solved
    PostSolve,
}

/// One recorded contact callback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactEvent {
    /// Callback kind
    pub kind: ContactEventKind,
    /// Contact that fired
    pub contact: ContactHandle,
    /// First fixture
    pub fixture_a: FixtureHandle,
    /// Second fixture
    pub fixture_b: FixtureHandle,
    /// Body of the first fixture
    pub body_a: BodyHandle,
    /// Body of the second fixture
    pub body_b: BodyHandle,
    /// Manifold points at the time of the callback
    pub point_count: usize,
    /// Solver impulses (post-solve only)
    pub impulse: Option<ContactImpulse>,
}

impl ContactEvent {
    fn new(kind: ContactEventKind, contact: &Contact) -> Self {
        Self {
            kind,
            contact: contact.handle(),
            fixture_a: contact.fixture_a(),
            fixture_b: contact.fixture_b(),
            body_a: contact.body_a(),
            body_b: contact.body_b(),
            point_count: contact.manifold().point_count,
            impulse: None,
        }
    }

    /// True when the event involves `body`
    #[must_use]
    pub fn involves(&self, body: BodyHandle) -> bool {
        self.body_a == body || self.body_b == body
    }
}

/// Shared event log implementing [`ContactListener`].
#[derive(Clone, Debug, Default)]
pub struct ContactEventCollector {
    events: Rc<RefCell<Vec<ContactEvent>>>,
    record_solve: bool,
}

impl ContactEventCollector {
    /// Collector recording begin and end events only
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector that also records pre-solve and post-solve events
    #[must_use]
    pub fn with_solve_events() -> Self {
        Self {
            record_solve: true,
            ..Self::default()
        }
    }

    fn push(&self, event: ContactEvent) {
        self.events.borrow_mut().push(event);
    }

    /// Copy of every event recorded so far
    #[must_use]
    pub fn events(&self) -> Vec<ContactEvent> {
        self.events.borrow().clone()
    }

    /// Take every event recorded so far
    pub fn drain(&self) -> Vec<ContactEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Number of recorded events of `kind`
    #[must_use]
    pub fn count(&self, kind: ContactEventKind) -> usize {
        self.events.borrow().iter().filter(|e| e.kind == kind).count()
    }

    /// True when nothing is recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Forget recorded events
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl ContactListener for ContactEventCollector {
    fn begin_contact(&mut self, contact: &mut Contact) {
        self.push(ContactEvent::new(ContactEventKind::Begin, contact));
    }

    fn end_contact(&mut self, contact: &Contact) {
        self.push(ContactEvent::new(ContactEventKind::End, contact));
    }

    fn pre_solve(&mut self, contact: &mut Contact, _old_manifold: &Manifold) {
        if self.record_solve {
            self.push(ContactEvent::new(ContactEventKind::PreSolve, contact));
        }
    }

    fn post_solve(&mut self, contact: &Contact, impulse: &ContactImpulse) {
        if self.record_solve {
            let mut event = ContactEvent::new(ContactEventKind::PostSolve, contact);
            event.impulse = Some(*impulse);
            self.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyDef;
    use crate::fixture::FixtureDef;
    use crate::math::Vec2;
    use crate::shape::CircleShape;
    use crate::world::{World, WorldDef};

    fn colliding_pair(world: &mut World) -> (BodyHandle, BodyHandle) {
        let a = world
            .create_body(&BodyDef::dynamic(Vec2::new(-1.0, 0.0)).with_linear_velocity(Vec2::new(1.0, 0.0)))
            .unwrap();
        let b = world
            .create_body(&BodyDef::dynamic(Vec2::new(1.0, 0.0)).with_linear_velocity(Vec2::new(-1.0, 0.0)))
            .unwrap();
        for body in [a, b] {
            world
                .create_fixture(body, &FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.5)).with_density(1.0))
                .unwrap();
        }
        (a, b)
    }

    #[test]
    fn test_begin_fires_once_per_touch() {
        let mut world = World::new(WorldDef::default().with_gravity(Vec2::ZERO));
        let events = ContactEventCollector::new();
        world.set_contact_listener(Some(Box::new(events.clone())));
        let (a, _) = colliding_pair(&mut world);

        for _ in 0..60 {
            world.step(1.0 / 60.0, 8, 3);
        }

        assert_eq!(events.count(ContactEventKind::Begin), 1);
        assert!(events.events().iter().all(|e| e.involves(a)));
        assert_eq!(events.count(ContactEventKind::PreSolve), 0);
    }

    #[test]
    fn test_solve_events_carry_impulses() {
        let mut world = World::new(WorldDef::default().with_gravity(Vec2::ZERO));
        let events = ContactEventCollector::with_solve_events();
        world.set_contact_listener(Some(Box::new(events.clone())));
        colliding_pair(&mut world);

        for _ in 0..60 {
            world.step(1.0 / 60.0, 8, 3);
        }

        let post: Vec<ContactEvent> = events
            .drain()
            .into_iter()
            .filter(|e| e.kind == ContactEventKind::PostSolve)
            .collect();
        assert!(!post.is_empty());
        assert!(post.iter().all(|e| e.impulse.is_some()));
        assert!(events.is_empty());
    }

    #[test]
    fn test_destroying_touching_body_reports_end() {
        let mut world = World::new(WorldDef::default().with_gravity(Vec2::ZERO));
        let events = ContactEventCollector::new();
        world.set_contact_listener(Some(Box::new(events.clone())));
        let (a, _) = colliding_pair(&mut world);

        for _ in 0..60 {
            world.step(1.0 / 60.0, 8, 3);
        }
        events.clear();
        world.destroy_body(a).unwrap();

        // the pair either still touches or already separated
        assert!(events.count(ContactEventKind::End) <= 1);
        assert_eq!(events.count(ContactEventKind::Begin), 0);
    }
}
