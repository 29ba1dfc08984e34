//! Fixture
//!
//! A fixture binds a [`Shape`] to a body with material and filtering data,
//! and owns one broad-phase proxy per shape child while its body is enabled.

use crate::body::BodyHandle;
use crate::broad_phase::{BroadPhase, ProxyId, NULL_PROXY};
use crate::collision::{Aabb, RayCastInput, RayCastOutput};
use crate::filter::Filter;
use crate::math::{Transform, Vec2};
use crate::settings::VELOCITY_THRESHOLD;
use crate::shape::{MassData, Shape, ShapeType};

slotmap::new_key_type! {
    /// Generation-checked handle to a fixture
    pub struct FixtureHandle;
}

/// Broad-phase user data: one shape child of one fixture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FixtureProxyKey {
    /// Owning fixture
    pub fixture: FixtureHandle,
    /// Shape child
    pub child_index: usize,
}

/// Broad-phase proxy owned by a fixture
#[derive(Clone, Copy, Debug)]
pub struct FixtureProxy {
    /// Tight AABB swept over the last step
    pub aabb: Aabb,
    /// Shape child
    pub child_index: usize,
    /// Broad-phase id
    pub proxy_id: ProxyId,
}

/// Fixture construction parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct FixtureDef {
    /// Shape, cloned into the fixture
    pub shape: Shape,
    /// Application data
    pub user_data: u64,
    /// Coulomb friction coefficient, usually in [0, 1]
    pub friction: f32,
    /// Restitution (elasticity), usually in [0, 1]
    pub restitution: f32,
    /// Relative speed above which restitution applies
    pub restitution_threshold: f32,
    /// Density in kg/m²
    pub density: f32,
    /// Sensors detect overlap but produce no response
    pub is_sensor: bool,
    /// Collision filtering data
    pub filter: Filter,
}

impl FixtureDef {
    /// Fixture with default material for `shape`
    pub fn new(shape: impl Into<Shape>) -> Self {
        Self {
            shape: shape.into(),
            user_data: 0,
            friction: 0.2,
            restitution: 0.0,
            restitution_threshold: VELOCITY_THRESHOLD,
            density: 0.0,
            is_sensor: false,
            filter: Filter::DEFAULT,
        }
    }

    /// Set the density
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    /// Set the friction coefficient
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Set the restitution
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set the restitution velocity threshold
    pub fn with_restitution_threshold(mut self, threshold: f32) -> Self {
        self.restitution_threshold = threshold;
        self
    }

    /// Make this fixture a sensor
    pub fn with_sensor(mut self, is_sensor: bool) -> Self {
        self.is_sensor = is_sensor;
        self
    }

    /// Set the collision filter
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Attach application data
    pub fn with_user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }
}

/// A shape attached to a body.
#[derive(Clone, Debug)]
pub struct Fixture {
    pub(crate) body: BodyHandle,
    pub(crate) shape: Shape,
    pub(crate) density: f32,
    pub(crate) friction: f32,
    pub(crate) restitution: f32,
    pub(crate) restitution_threshold: f32,
    pub(crate) is_sensor: bool,
    pub(crate) filter: Filter,
    pub(crate) proxies: Vec<FixtureProxy>,
    pub(crate) user_data: u64,
}

impl Fixture {
    pub(crate) fn new(body: BodyHandle, def: &FixtureDef) -> Self {
        Self {
            body,
            shape: def.shape.clone(),
            density: def.density,
            friction: def.friction,
            restitution: def.restitution,
            restitution_threshold: def.restitution_threshold,
            is_sensor: def.is_sensor,
            filter: def.filter,
            proxies: Vec::with_capacity(def.shape.child_count()),
            user_data: def.user_data,
        }
    }

    /// Owning body
    #[inline]
    #[must_use]
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// The shape, in body coordinates
    #[inline]
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Shape kind
    #[inline]
    #[must_use]
    pub fn shape_type(&self) -> ShapeType {
        self.shape.shape_type()
    }

    /// Density
    #[inline]
    #[must_use]
    pub fn density(&self) -> f32 {
        self.density
    }

    /// Set the density. Call `World::reset_mass_data` to apply it.
    #[inline]
    pub fn set_density(&mut self, density: f32) {
        self.density = density;
    }

    /// Friction coefficient
    #[inline]
    #[must_use]
    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Set the friction; existing contacts keep their mixed value.
    #[inline]
    pub fn set_friction(&mut self, friction: f32) {
        self.friction = friction;
    }

    /// Restitution
    #[inline]
    #[must_use]
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Set the restitution; existing contacts keep their mixed value.
    #[inline]
    pub fn set_restitution(&mut self, restitution: f32) {
        self.restitution = restitution;
    }

    /// Restitution velocity threshold
    #[inline]
    #[must_use]
    pub fn restitution_threshold(&self) -> f32 {
        self.restitution_threshold
    }

    /// Set the restitution velocity threshold
    #[inline]
    pub fn set_restitution_threshold(&mut self, threshold: f32) {
        self.restitution_threshold = threshold;
    }

    /// Whether this fixture is a sensor
    #[inline]
    #[must_use]
    pub fn is_sensor(&self) -> bool {
        self.is_sensor
    }

    /// Collision filter
    #[inline]
    #[must_use]
    pub fn filter_data(&self) -> &Filter {
        &self.filter
    }

    /// Application data
    #[inline]
    #[must_use]
    pub fn user_data(&self) -> u64 {
        self.user_data
    }

    /// Set application data
    #[inline]
    pub fn set_user_data(&mut self, user_data: u64) {
        self.user_data = user_data;
    }

    /// Mass properties of the shape at this fixture's density
    #[must_use]
    pub fn mass_data(&self) -> MassData {
        self.shape.compute_mass(self.density)
    }

    /// Swept AABB of a child, as stored in the broad-phase.
    /// `None` when the body is disabled or the child does not exist.
    #[must_use]
    pub fn aabb(&self, child_index: usize) -> Option<Aabb> {
        self.proxies
            .iter()
            .find(|p| p.child_index == child_index)
            .map(|p| p.aabb)
    }

    /// Point containment, given the body transform
    #[must_use]
    pub fn test_point(&self, xf: &Transform, p: Vec2) -> bool {
        self.shape.test_point(xf, p)
    }

    /// Ray cast against one child, given the body transform
    #[must_use]
    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform, child_index: usize) -> Option<RayCastOutput> {
        self.shape.ray_cast(input, xf, child_index)
    }

    /// Live broad-phase proxies
    #[inline]
    #[must_use]
    pub fn proxies(&self) -> &[FixtureProxy] {
        &self.proxies
    }

    // ========== Broad-phase plumbing ==========

    pub(crate) fn create_proxies(
        &mut self,
        handle: FixtureHandle,
        broad_phase: &mut BroadPhase<FixtureProxyKey>,
        xf: &Transform,
    ) {
        debug_assert!(self.proxies.is_empty());
        for child_index in 0..self.shape.child_count() {
            let aabb = self.shape.compute_aabb(xf, child_index);
            let proxy_id = broad_phase.create_proxy(
                &aabb,
                FixtureProxyKey {
                    fixture: handle,
                    child_index,
                },
            );
            self.proxies.push(FixtureProxy {
                aabb,
                child_index,
                proxy_id,
            });
        }
    }

    pub(crate) fn destroy_proxies(&mut self, broad_phase: &mut BroadPhase<FixtureProxyKey>) {
        for proxy in self.proxies.drain(..) {
            if proxy.proxy_id != NULL_PROXY {
                broad_phase.destroy_proxy(proxy.proxy_id);
            }
        }
    }

    /// Sweep each child's AABB from `xf1` to `xf2` and move its proxy.
    pub(crate) fn synchronize(
        &mut self,
        broad_phase: &mut BroadPhase<FixtureProxyKey>,
        xf1: &Transform,
        xf2: &Transform,
    ) {
        for proxy in &mut self.proxies {
            let aabb1 = self.shape.compute_aabb(xf1, proxy.child_index);
            let aabb2 = self.shape.compute_aabb(xf2, proxy.child_index);
            proxy.aabb = aabb1.combine(&aabb2);
            let displacement = aabb2.center() - aabb1.center();
            broad_phase.move_proxy(proxy.proxy_id, &proxy.aabb, displacement);
        }
    }

    pub(crate) fn touch_proxies(&self, broad_phase: &mut BroadPhase<FixtureProxyKey>) {
        for proxy in &self.proxies {
            broad_phase.touch_proxy(proxy.proxy_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::PolygonShape;
    use crate::shape::CircleShape;
    use slotmap::SlotMap;

    fn handles() -> (BodyHandle, FixtureHandle) {
        let mut bodies: SlotMap<BodyHandle, ()> = SlotMap::with_key();
        let mut fixtures: SlotMap<FixtureHandle, ()> = SlotMap::with_key();
        (bodies.insert(()), fixtures.insert(()))
    }

    #[test]
    fn test_def_defaults() {
        let def = FixtureDef::new(CircleShape::new(Vec2::ZERO, 1.0));
        assert_eq!(def.friction, 0.2);
        assert_eq!(def.restitution, 0.0);
        assert_eq!(def.restitution_threshold, VELOCITY_THRESHOLD);
        assert_eq!(def.density, 0.0);
        assert!(!def.is_sensor);
    }

    #[test]
    fn test_mass_data_uses_density() {
        let (body, _) = handles();
        let f = Fixture::new(body, &FixtureDef::new(PolygonShape::new_box(1.0, 1.0)).with_density(2.0));
        let md = f.mass_data();
        assert!((md.mass - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_proxies_follow_synchronize() {
        let (body, handle) = handles();
        let mut bp = BroadPhase::new();
        let mut f = Fixture::new(body, &FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.5)));
        f.create_proxies(handle, &mut bp, &Transform::IDENTITY);
        assert_eq!(bp.proxy_count(), 1);
        assert!(f.aabb(0).is_some());

        let moved = Transform::new(Vec2::new(3.0, 0.0), 0.0);
        f.synchronize(&mut bp, &Transform::IDENTITY, &moved);
        let aabb = f.aabb(0).expect("proxy");
        assert!((aabb.lower_bound.x + 0.5).abs() < 1e-6);
        assert!((aabb.upper_bound.x - 3.5).abs() < 1e-6);

        f.destroy_proxies(&mut bp);
        assert_eq!(bp.proxy_count(), 0);
        assert!(f.aabb(0).is_none());
    }
}
