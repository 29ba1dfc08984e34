//! Contact
//!
//! A contact tracks one pair of fixture children whose fat AABBs overlap.
//! It caches the manifold between steps so impulses can be warm-started,
//! and reports touching transitions to the contact listener.
//!
//! # Dispatch
//!
//! Manifolds are computed by an exhaustive match over the two shape kinds.
//! Only canonical pairs exist: circle/circle, polygon/circle, polygon/polygon,
//! edge/circle, edge/polygon, chain/circle and chain/polygon. Mirrored pairs
//! are created with the fixtures swapped; edge/edge, edge/chain and
//! chain/chain never collide.

use bitflags::bitflags;

use crate::body::BodyHandle;
use crate::collide::{
    collide_circles, collide_edge_and_circle, collide_edge_and_polygon, collide_polygon_and_circle,
    collide_polygons,
};
use crate::collision::{test_overlap, Manifold, WorldManifold};
use crate::fixture::{Fixture, FixtureHandle};
use crate::math::Transform;
use crate::shape::{Shape, ShapeType};
use crate::world_callbacks::ContactListener;

slotmap::new_key_type! {
    /// Generation-checked handle to a contact
    pub struct ContactHandle;
}

bitflags! {
    /// Contact state flags
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ContactFlags: u8 {
        /// Visited by the current island search
        const ISLAND = 0x01;
        /// Shapes are touching
        const TOUCHING = 0x02;
        /// Contact takes part in the solve (reset every update)
        const ENABLED = 0x04;
        /// Pair must be re-filtered
        const FILTER = 0x08;
        /// `toi` holds a valid cached time of impact
        const TOI = 0x20;
    }
}

/// Geometric-mean friction mixing.
#[inline]
#[must_use]
pub fn mix_friction(friction_a: f32, friction_b: f32) -> f32 {
    (friction_a * friction_b).sqrt()
}

/// Restitution mixing: the bouncier fixture wins.
#[inline]
#[must_use]
pub fn mix_restitution(restitution_a: f32, restitution_b: f32) -> f32 {
    restitution_a.max(restitution_b)
}

/// Restitution threshold mixing: the lower threshold wins.
#[inline]
#[must_use]
pub fn mix_restitution_threshold(threshold_a: f32, threshold_b: f32) -> f32 {
    threshold_a.min(threshold_b)
}

/// Operand order for a shape pair: `Some(false)` keeps it, `Some(true)`
/// swaps A and B, `None` means the pair never collides.
#[must_use]
pub(crate) fn contact_order(type_a: ShapeType, type_b: ShapeType) -> Option<bool> {
    use ShapeType::{Chain, Circle, Edge, Polygon};
    match (type_a, type_b) {
        (Circle, Circle)
        | (Polygon, Circle)
        | (Polygon, Polygon)
        | (Edge, Circle)
        | (Edge, Polygon)
        | (Chain, Circle)
        | (Chain, Polygon) => Some(false),
        (Circle, Polygon) | (Circle, Edge) | (Polygon, Edge) | (Circle, Chain) | (Polygon, Chain) => {
            Some(true)
        }
        (Edge, Edge) | (Edge, Chain) | (Chain, Edge) | (Chain, Chain) => None,
    }
}

/// Manifold for a canonical shape pair.
#[must_use]
pub(crate) fn evaluate(
    shape_a: &Shape,
    child_a: usize,
    xf_a: &Transform,
    shape_b: &Shape,
    xf_b: &Transform,
) -> Manifold {
    match (shape_a, shape_b) {
        (Shape::Circle(a), Shape::Circle(b)) => collide_circles(a, xf_a, b, xf_b),
        (Shape::Polygon(a), Shape::Circle(b)) => collide_polygon_and_circle(a, xf_a, b, xf_b),
        (Shape::Polygon(a), Shape::Polygon(b)) => collide_polygons(a, xf_a, b, xf_b),
        (Shape::Edge(a), Shape::Circle(b)) => collide_edge_and_circle(a, xf_a, b, xf_b),
        (Shape::Edge(a), Shape::Polygon(b)) => collide_edge_and_polygon(a, xf_a, b, xf_b),
        (Shape::Chain(a), Shape::Circle(b)) => {
            collide_edge_and_circle(&a.child_edge(child_a), xf_a, b, xf_b)
        }
        (Shape::Chain(a), Shape::Polygon(b)) => {
            collide_edge_and_polygon(&a.child_edge(child_a), xf_a, b, xf_b)
        }
        // non-canonical order or pairs that never collide
        (Shape::Circle(_), Shape::Polygon(_) | Shape::Edge(_) | Shape::Chain(_))
        | (Shape::Polygon(_), Shape::Edge(_) | Shape::Chain(_))
        | (Shape::Edge(_) | Shape::Chain(_), Shape::Edge(_) | Shape::Chain(_)) => Manifold::default(),
    }
}

/// Candidate collision between two fixture children.
#[derive(Clone, Debug)]
pub struct Contact {
    pub(crate) handle: ContactHandle,
    pub(crate) flags: ContactFlags,

    pub(crate) fixture_a: FixtureHandle,
    pub(crate) fixture_b: FixtureHandle,
    pub(crate) child_index_a: usize,
    pub(crate) child_index_b: usize,
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,

    pub(crate) manifold: Manifold,

    pub(crate) toi_count: u32,
    pub(crate) toi: f32,

    pub(crate) friction: f32,
    pub(crate) restitution: f32,
    pub(crate) restitution_threshold: f32,
    pub(crate) tangent_speed: f32,
}

impl Contact {
    /// Build a contact for a canonically ordered pair.
    pub(crate) fn new(
        handle: ContactHandle,
        fixture_a: FixtureHandle,
        child_index_a: usize,
        fa: &Fixture,
        fixture_b: FixtureHandle,
        child_index_b: usize,
        fb: &Fixture,
    ) -> Self {
        Self {
            handle,
            flags: ContactFlags::ENABLED,
            fixture_a,
            fixture_b,
            child_index_a,
            child_index_b,
            body_a: fa.body,
            body_b: fb.body,
            manifold: Manifold::default(),
            toi_count: 0,
            toi: 0.0,
            friction: mix_friction(fa.friction, fb.friction),
            restitution: mix_restitution(fa.restitution, fb.restitution),
            restitution_threshold: mix_restitution_threshold(fa.restitution_threshold, fb.restitution_threshold),
            tangent_speed: 0.0,
        }
    }

    /// This contact's handle
    #[inline]
    #[must_use]
    pub fn handle(&self) -> ContactHandle {
        self.handle
    }

    /// First fixture
    #[inline]
    #[must_use]
    pub fn fixture_a(&self) -> FixtureHandle {
        self.fixture_a
    }

    /// Second fixture
    #[inline]
    #[must_use]
    pub fn fixture_b(&self) -> FixtureHandle {
        self.fixture_b
    }

    /// Child index on fixture A
    #[inline]
    #[must_use]
    pub fn child_index_a(&self) -> usize {
        self.child_index_a
    }

    /// Child index on fixture B
    #[inline]
    #[must_use]
    pub fn child_index_b(&self) -> usize {
        self.child_index_b
    }

    /// Body of fixture A
    #[inline]
    #[must_use]
    pub fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    /// Body of fixture B
    #[inline]
    #[must_use]
    pub fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    /// Cached manifold in local coordinates
    #[inline]
    #[must_use]
    pub fn manifold(&self) -> &Manifold {
        &self.manifold
    }

    /// Mutable manifold, for pre-solve adjustments
    #[inline]
    pub fn manifold_mut(&mut self) -> &mut Manifold {
        &mut self.manifold
    }

    /// Manifold in world coordinates, given both body transforms and the
    /// shapes' skin radii.
    #[must_use]
    pub fn world_manifold(&self, xf_a: &Transform, radius_a: f32, xf_b: &Transform, radius_b: f32) -> WorldManifold {
        WorldManifold::new(&self.manifold, xf_a, radius_a, xf_b, radius_b)
    }

    /// Whether the shapes touch
    #[inline]
    #[must_use]
    pub fn is_touching(&self) -> bool {
        self.flags.contains(ContactFlags::TOUCHING)
    }

    /// Whether the contact takes part in this step's solve
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.flags.contains(ContactFlags::ENABLED)
    }

    /// Disable for the current step only (from pre-solve); re-enabled on
    /// the next update.
    #[inline]
    pub fn set_enabled(&mut self, enabled: bool) {
        self.flags.set(ContactFlags::ENABLED, enabled);
    }

    /// Flag the pair for re-filtering on the next collide pass
    #[inline]
    pub fn flag_for_filtering(&mut self) {
        self.flags.insert(ContactFlags::FILTER);
    }

    /// Mixed friction
    #[inline]
    #[must_use]
    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Override the mixed friction until reset
    #[inline]
    pub fn set_friction(&mut self, friction: f32) {
        self.friction = friction;
    }

    /// Restore the mixed friction from the fixtures
    pub fn reset_friction(&mut self, fa: &Fixture, fb: &Fixture) {
        self.friction = mix_friction(fa.friction, fb.friction);
    }

    /// Mixed restitution
    #[inline]
    #[must_use]
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Override the mixed restitution until reset
    #[inline]
    pub fn set_restitution(&mut self, restitution: f32) {
        self.restitution = restitution;
    }

    /// Restore the mixed restitution from the fixtures
    pub fn reset_restitution(&mut self, fa: &Fixture, fb: &Fixture) {
        self.restitution = mix_restitution(fa.restitution, fb.restitution);
    }

    /// Mixed restitution threshold
    #[inline]
    #[must_use]
    pub fn restitution_threshold(&self) -> f32 {
        self.restitution_threshold
    }

    /// Override the restitution threshold until reset
    #[inline]
    pub fn set_restitution_threshold(&mut self, threshold: f32) {
        self.restitution_threshold = threshold;
    }

    /// Restore the mixed restitution threshold from the fixtures
    pub fn reset_restitution_threshold(&mut self, fa: &Fixture, fb: &Fixture) {
        self.restitution_threshold = mix_restitution_threshold(fa.restitution_threshold, fb.restitution_threshold);
    }

    /// Target tangential speed (conveyor belts)
    #[inline]
    #[must_use]
    pub fn tangent_speed(&self) -> f32 {
        self.tangent_speed
    }

    /// Set the target tangential speed
    #[inline]
    pub fn set_tangent_speed(&mut self, speed: f32) {
        self.tangent_speed = speed;
    }

    /// Re-evaluate the manifold and report touching transitions.
    ///
    /// Returns true when the touching state changed, in which case the
    /// caller wakes both bodies.
    pub(crate) fn update(
        &mut self,
        fa: &Fixture,
        xf_a: &Transform,
        fb: &Fixture,
        xf_b: &Transform,
        listener: Option<&mut (dyn ContactListener + 'static)>,
    ) -> bool {
        let old_manifold = self.manifold;

        // re-enable every update; pre-solve may disable again
        self.flags.insert(ContactFlags::ENABLED);

        let was_touching = self.is_touching();
        let sensor = fa.is_sensor || fb.is_sensor;

        let touching = if sensor {
            self.manifold.point_count = 0;
            test_overlap(&fa.shape, self.child_index_a, &fb.shape, self.child_index_b, xf_a, xf_b)
        } else {
            self.manifold = evaluate(&fa.shape, self.child_index_a, xf_a, &fb.shape, xf_b);

            // carry impulses over by feature id
            for i in 0..self.manifold.point_count {
                let mp2 = &mut self.manifold.points[i];
                mp2.normal_impulse = 0.0;
                mp2.tangent_impulse = 0.0;
                let key = mp2.id.key();
                if let Some(mp1) = old_manifold.points().iter().find(|mp1| mp1.id.key() == key) {
                    mp2.normal_impulse = mp1.normal_impulse;
                    mp2.tangent_impulse = mp1.tangent_impulse;
                }
            }

            self.manifold.point_count > 0
        };

        self.flags.set(ContactFlags::TOUCHING, touching);

        if let Some(listener) = listener {
            if !was_touching && touching {
                tracing::trace!(contact = ?self.handle, "begin contact");
                listener.begin_contact(self);
            }
            if was_touching && !touching {
                tracing::trace!(contact = ?self.handle, "end contact");
                listener.end_contact(self);
            }
            if !sensor && touching {
                listener.pre_solve(self, &old_manifold);
            }
        }

        was_touching != touching
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainShape;
    use crate::fixture::FixtureDef;
    use crate::math::Vec2;
    use crate::polygon::PolygonShape;
    use crate::shape::{CircleShape, EdgeShape};
    use slotmap::SlotMap;

    struct Setup {
        fixtures: SlotMap<FixtureHandle, Fixture>,
        contacts: SlotMap<ContactHandle, ()>,
        body: BodyHandle,
    }

    impl Setup {
        fn new() -> Self {
            let mut bodies: SlotMap<BodyHandle, ()> = SlotMap::with_key();
            Self {
                fixtures: SlotMap::with_key(),
                contacts: SlotMap::with_key(),
                body: bodies.insert(()),
            }
        }

        fn fixture(&mut self, def: FixtureDef) -> FixtureHandle {
            self.fixtures.insert(Fixture::new(self.body, &def))
        }

        fn contact(&mut self, a: FixtureHandle, b: FixtureHandle) -> Contact {
            let handle = self.contacts.insert(());
            Contact::new(handle, a, 0, &self.fixtures[a], b, 0, &self.fixtures[b])
        }
    }

    #[test]
    fn test_mixing_rules() {
        assert!((mix_friction(0.4, 0.9) - 0.6).abs() < 1e-6);
        assert_eq!(mix_restitution(0.2, 0.7), 0.7);
        assert_eq!(mix_restitution_threshold(1.0, 0.5), 0.5);
    }

    #[test]
    fn test_contact_order_is_symmetric() {
        use ShapeType::*;
        let kinds = [Circle, Edge, Polygon, Chain];
        for &a in &kinds {
            for &b in &kinds {
                match (contact_order(a, b), contact_order(b, a)) {
                    (Some(x), Some(y)) => assert!(a == b || x != y, "{a:?}/{b:?}"),
                    (None, None) => {}
                    other => panic!("asymmetric registration for {a:?}/{b:?}: {other:?}"),
                }
            }
        }
        assert_eq!(contact_order(Edge, Edge), None);
        assert_eq!(contact_order(Chain, Chain), None);
    }

    #[test]
    fn test_update_reports_touching_transitions() {
        let mut s = Setup::new();
        let a = s.fixture(FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.5)));
        let b = s.fixture(FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.5)));
        let mut c = s.contact(a, b);

        let xf_a = Transform::IDENTITY;
        let near = Transform::new(Vec2::new(0.9, 0.0), 0.0);
        let far = Transform::new(Vec2::new(3.0, 0.0), 0.0);

        assert!(c.update(&s.fixtures[a], &xf_a, &s.fixtures[b], &near, None));
        assert!(c.is_touching());
        assert_eq!(c.manifold().point_count, 1);

        assert!(!c.update(&s.fixtures[a], &xf_a, &s.fixtures[b], &near, None));
        assert!(c.update(&s.fixtures[a], &xf_a, &s.fixtures[b], &far, None));
        assert!(!c.is_touching());
    }

    #[test]
    fn test_update_preserves_impulses_by_feature_id() {
        let mut s = Setup::new();
        let a = s.fixture(FixtureDef::new(PolygonShape::new_box(1.0, 1.0)));
        let b = s.fixture(FixtureDef::new(PolygonShape::new_box(0.5, 0.5)));
        let mut c = s.contact(a, b);

        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::new(Vec2::new(0.0, 1.49), 0.0);
        c.update(&s.fixtures[a], &xf_a, &s.fixtures[b], &xf_b, None);
        assert_eq!(c.manifold().point_count, 2);
        c.manifold.points[0].normal_impulse = 3.0;
        c.manifold.points[1].normal_impulse = 5.0;

        c.update(&s.fixtures[a], &xf_a, &s.fixtures[b], &xf_b, None);
        let total: f32 = c.manifold().points().iter().map(|p| p.normal_impulse).sum();
        assert!((total - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_sensor_has_no_points() {
        let mut s = Setup::new();
        let a = s.fixture(FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.5)).with_sensor(true));
        let b = s.fixture(FixtureDef::new(PolygonShape::new_box(0.5, 0.5)));
        let mut c = s.contact(b, a);
        let xf = Transform::new(Vec2::new(0.5, 0.0), 0.0);
        c.update(&s.fixtures[b], &Transform::IDENTITY, &s.fixtures[a], &xf, None);
        assert!(c.is_touching());
        assert_eq!(c.manifold().point_count, 0);
    }

    #[test]
    fn test_chain_child_collides_like_edge() {
        let chain = ChainShape::new_chain(
            &[Vec2::new(-2.0, 0.0), Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0)],
            Vec2::new(-3.0, 0.0),
            Vec2::new(3.0, 0.0),
        )
        .expect("chain");
        let circle = CircleShape::new(Vec2::ZERO, 0.5);
        // chain normals point to the right of travel: -y for this chain
        let xf_b = Transform::new(Vec2::new(1.0, -0.45), 0.0);
        let m = evaluate(&Shape::Chain(chain), 1, &Transform::IDENTITY, &Shape::Circle(circle), &xf_b);
        assert_eq!(m.point_count, 1);

        let edge = EdgeShape::two_sided(Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0));
        let m2 = evaluate(&Shape::Edge(edge), 0, &Transform::IDENTITY, &Shape::Circle(circle), &xf_b);
        assert_eq!(m2.point_count, 1);
    }

    #[test]
    fn test_non_colliding_pair_has_empty_manifold() {
        let e = Shape::Edge(EdgeShape::two_sided(Vec2::ZERO, Vec2::UNIT_X));
        let m = evaluate(&e, 0, &Transform::IDENTITY, &e, &Transform::IDENTITY);
        assert_eq!(m.point_count, 0);
    }

    #[test]
    fn test_evaluate_only_accepts_canonical_order() {
        let circle = Shape::Circle(CircleShape::new(Vec2::ZERO, 0.5));
        let square = Shape::Polygon(PolygonShape::new_box(0.5, 0.5));
        let xf = Transform::new(Vec2::new(0.8, 0.0), 0.0);

        assert_eq!(contact_order(ShapeType::Polygon, ShapeType::Circle), Some(false));
        assert_eq!(evaluate(&square, 0, &Transform::IDENTITY, &circle, &xf).point_count, 1);
        // mirrored operands must be swapped by the caller first
        assert_eq!(contact_order(ShapeType::Circle, ShapeType::Polygon), Some(true));
        assert_eq!(evaluate(&circle, 0, &Transform::IDENTITY, &square, &xf).point_count, 0);
    }
}
