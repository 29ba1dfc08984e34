//! Rigid Body
//!
//! Body state: transform, sweep, velocities, accumulated forces, mass
//! properties and flags, plus the handle lists that link a body to its
//! fixtures, joints and contacts.
//!
//! # Features
//!
//! - **Three body types**: static (infinite mass, never moves), kinematic
//!   (moved by velocity only) and dynamic (fully simulated)
//! - **Mass from fixtures**: `reset_mass_data` accumulates fixture mass and
//!   recenters the body on its center of mass
//! - **Forces and impulses**: world-point and center variants, optional wake
//!
//! Structural changes (type, enabled, transform, fixtures) go through
//! [`World`](crate::world::World) since they touch the broad-phase and contacts.

use bitflags::bitflags;
use slotmap::SlotMap;

use crate::fixture::{Fixture, FixtureHandle};
use crate::joint::{Joint, JointHandle};
use crate::contact::ContactHandle;
use crate::math::{cross_sv, Rot, Sweep, Transform, Vec2};
use crate::shape::MassData;

slotmap::new_key_type! {
    /// Generation-checked handle to a body
    pub struct BodyHandle;
}

/// Body simulation type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BodyType {
    /// Zero mass, zero velocity, moved manually
    #[default]
    Static,
    /// Zero mass, velocity set by the user, moved by the solver
    Kinematic,
    /// Positive mass, velocity determined by forces, moved by the solver
    Dynamic,
}

bitflags! {
    /// Body state flags
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct BodyFlags: u16 {
        /// Visited by the current island search
        const ISLAND = 0x0001;
        /// Simulated this step
        const AWAKE = 0x0002;
        /// May fall asleep
        const AUTO_SLEEP = 0x0004;
        /// Continuous collision against dynamic bodies
        const BULLET = 0x0008;
        /// Rotation locked
        const FIXED_ROTATION = 0x0010;
        /// Participates in collision and simulation
        const ENABLED = 0x0020;
        /// Already solved by the TOI loop this step
        const TOI = 0x0040;
    }
}

/// Link from a body to one of its joints
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JointEdge {
    /// Body on the other side
    pub other: BodyHandle,
    /// The joint
    pub joint: JointHandle,
}

/// Link from a body to one of its contacts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContactEdge {
    /// Body on the other side
    pub other: BodyHandle,
    /// The contact
    pub contact: ContactHandle,
}

/// Body construction parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyDef {
    /// Simulation type
    pub body_type: BodyType,
    /// World position of the body origin
    pub position: Vec2,
    /// World angle in radians
    pub angle: f32,
    /// Linear velocity of the body origin
    pub linear_velocity: Vec2,
    /// Angular velocity
    pub angular_velocity: f32,
    /// Linear damping coefficient
    pub linear_damping: f32,
    /// Angular damping coefficient
    pub angular_damping: f32,
    /// Body may fall asleep
    pub allow_sleep: bool,
    /// Initially awake
    pub awake: bool,
    /// Prevent rotation
    pub fixed_rotation: bool,
    /// Continuous collision against other dynamic bodies
    pub bullet: bool,
    /// Initially enabled
    pub enabled: bool,
    /// Gravity multiplier
    pub gravity_scale: f32,
    /// Application data
    pub user_data: u64,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            body_type: BodyType::Static,
            position: Vec2::ZERO,
            angle: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            allow_sleep: true,
            awake: true,
            fixed_rotation: false,
            bullet: false,
            enabled: true,
            gravity_scale: 1.0,
            user_data: 0,
        }
    }
}

impl BodyDef {
    /// Dynamic body at `position`
    pub fn dynamic(position: Vec2) -> Self {
        Self {
            body_type: BodyType::Dynamic,
            position,
            ..Self::default()
        }
    }

    /// Kinematic body at `position`
    pub fn kinematic(position: Vec2) -> Self {
        Self {
            body_type: BodyType::Kinematic,
            position,
            ..Self::default()
        }
    }

    /// Static body at `position`
    pub fn fixed(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Set the angle
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    /// Set the linear velocity
    pub fn with_linear_velocity(mut self, v: Vec2) -> Self {
        self.linear_velocity = v;
        self
    }

    /// Set the angular velocity
    pub fn with_angular_velocity(mut self, w: f32) -> Self {
        self.angular_velocity = w;
        self
    }

    /// Set both damping coefficients
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    /// Mark as bullet
    pub fn with_bullet(mut self, bullet: bool) -> Self {
        self.bullet = bullet;
        self
    }

    /// Lock rotation
    pub fn with_fixed_rotation(mut self, fixed: bool) -> Self {
        self.fixed_rotation = fixed;
        self
    }

    /// Allow or forbid sleeping
    pub fn with_allow_sleep(mut self, allow: bool) -> Self {
        self.allow_sleep = allow;
        self
    }

    /// Set the initial awake state
    pub fn with_awake(mut self, awake: bool) -> Self {
        self.awake = awake;
        self
    }

    /// Set the initial enabled state
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the gravity scale
    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    /// Attach application data
    pub fn with_user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }
}

/// A rigid body.
#[derive(Clone, Debug)]
pub struct Body {
    pub(crate) body_type: BodyType,
    pub(crate) flags: BodyFlags,
    pub(crate) island_index: usize,

    /// Body origin transform
    pub(crate) xf: Transform,
    /// Center-of-mass motion for continuous collision
    pub(crate) sweep: Sweep,

    pub(crate) linear_velocity: Vec2,
    pub(crate) angular_velocity: f32,

    pub(crate) force: Vec2,
    pub(crate) torque: f32,

    pub(crate) fixtures: Vec<FixtureHandle>,
    pub(crate) joint_edges: Vec<JointEdge>,
    pub(crate) contact_edges: Vec<ContactEdge>,

    pub(crate) mass: f32,
    pub(crate) inv_mass: f32,
    /// Rotational inertia about the center of mass
    pub(crate) inertia: f32,
    pub(crate) inv_i: f32,

    pub(crate) linear_damping: f32,
    pub(crate) angular_damping: f32,
    pub(crate) gravity_scale: f32,

    pub(crate) sleep_time: f32,
    pub(crate) user_data: u64,
}

impl Body {
    pub(crate) fn new(def: &BodyDef) -> Self {
        let mut flags = BodyFlags::empty();
        flags.set(BodyFlags::BULLET, def.bullet);
        flags.set(BodyFlags::FIXED_ROTATION, def.fixed_rotation);
        flags.set(BodyFlags::AUTO_SLEEP, def.allow_sleep);
        flags.set(BodyFlags::AWAKE, def.awake && def.body_type != BodyType::Static);
        flags.set(BodyFlags::ENABLED, def.enabled);

        let xf = Transform::new(def.position, def.angle);
        let sweep = Sweep {
            local_center: Vec2::ZERO,
            c0: xf.p,
            c: xf.p,
            a0: def.angle,
            a: def.angle,
            alpha0: 0.0,
        };

        let (mass, inv_mass) = if def.body_type == BodyType::Dynamic {
            (1.0, 1.0)
        } else {
            (0.0, 0.0)
        };

        Self {
            body_type: def.body_type,
            flags,
            island_index: 0,
            xf,
            sweep,
            linear_velocity: def.linear_velocity,
            angular_velocity: def.angular_velocity,
            force: Vec2::ZERO,
            torque: 0.0,
            fixtures: Vec::new(),
            joint_edges: Vec::new(),
            contact_edges: Vec::new(),
            mass,
            inv_mass,
            inertia: 0.0,
            inv_i: 0.0,
            linear_damping: def.linear_damping,
            angular_damping: def.angular_damping,
            gravity_scale: def.gravity_scale,
            sleep_time: 0.0,
            user_data: def.user_data,
        }
    }

    // ========== Queries ==========

    /// Simulation type
    #[inline]
    #[must_use]
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// Body origin transform
    #[inline]
    #[must_use]
    pub fn transform(&self) -> &Transform {
        &self.xf
    }

    /// World position of the body origin
    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.xf.p
    }

    /// World angle in radians
    #[inline]
    #[must_use]
    pub fn angle(&self) -> f32 {
        self.sweep.a
    }

    /// World center of mass
    #[inline]
    #[must_use]
    pub fn world_center(&self) -> Vec2 {
        self.sweep.c
    }

    /// Local center of mass
    #[inline]
    #[must_use]
    pub fn local_center(&self) -> Vec2 {
        self.sweep.local_center
    }

    /// Center-of-mass sweep of the current step
    #[inline]
    #[must_use]
    pub fn sweep(&self) -> &Sweep {
        &self.sweep
    }

    /// Linear velocity of the center of mass
    #[inline]
    #[must_use]
    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    /// Angular velocity
    #[inline]
    #[must_use]
    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    /// Mass in kg
    #[inline]
    #[must_use]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Inverse mass (0 for static and kinematic bodies)
    #[inline]
    #[must_use]
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Rotational inertia about the body origin
    #[inline]
    #[must_use]
    pub fn inertia(&self) -> f32 {
        self.inertia + self.mass * self.sweep.local_center.dot(self.sweep.local_center)
    }

    /// Inverse rotational inertia about the center of mass
    #[inline]
    #[must_use]
    pub fn inv_inertia(&self) -> f32 {
        self.inv_i
    }

    /// Mass, center and origin inertia
    #[must_use]
    pub fn mass_data(&self) -> MassData {
        MassData {
            mass: self.mass,
            center: self.sweep.local_center,
            inertia: self.inertia(),
        }
    }

    /// Accumulated force of the current step
    #[inline]
    #[must_use]
    pub fn force(&self) -> Vec2 {
        self.force
    }

    /// Accumulated torque of the current step
    #[inline]
    #[must_use]
    pub fn torque(&self) -> f32 {
        self.torque
    }

    /// Linear damping coefficient
    #[inline]
    #[must_use]
    pub fn linear_damping(&self) -> f32 {
        self.linear_damping
    }

    /// Angular damping coefficient
    #[inline]
    #[must_use]
    pub fn angular_damping(&self) -> f32 {
        self.angular_damping
    }

    /// Gravity multiplier
    #[inline]
    #[must_use]
    pub fn gravity_scale(&self) -> f32 {
        self.gravity_scale
    }

    /// Whether the body is simulated this step
    #[inline]
    #[must_use]
    pub fn is_awake(&self) -> bool {
        self.flags.contains(BodyFlags::AWAKE)
    }

    /// Whether the body participates in the simulation
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.flags.contains(BodyFlags::ENABLED)
    }

    /// Whether the body uses continuous collision against dynamic bodies
    #[inline]
    #[must_use]
    pub fn is_bullet(&self) -> bool {
        self.flags.contains(BodyFlags::BULLET)
    }

    /// Whether rotation is locked
    #[inline]
    #[must_use]
    pub fn is_fixed_rotation(&self) -> bool {
        self.flags.contains(BodyFlags::FIXED_ROTATION)
    }

    /// Whether the body may fall asleep
    #[inline]
    #[must_use]
    pub fn is_sleeping_allowed(&self) -> bool {
        self.flags.contains(BodyFlags::AUTO_SLEEP)
    }

    /// Attached fixtures
    #[inline]
    #[must_use]
    pub fn fixtures(&self) -> &[FixtureHandle] {
        &self.fixtures
    }

    /// Joints attached to this body
    #[inline]
    #[must_use]
    pub fn joint_edges(&self) -> &[JointEdge] {
        &self.joint_edges
    }

    /// Contacts involving this body
    #[inline]
    #[must_use]
    pub fn contact_edges(&self) -> &[ContactEdge] {
        &self.contact_edges
    }

    /// Application data
    #[inline]
    #[must_use]
    pub fn user_data(&self) -> u64 {
        self.user_data
    }

    // ========== Frame conversions ==========

    /// Local point to world coordinates
    #[inline]
    #[must_use]
    pub fn world_point(&self, local_point: Vec2) -> Vec2 {
        self.xf.apply(local_point)
    }

    /// Local vector to world coordinates
    #[inline]
    #[must_use]
    pub fn world_vector(&self, local_vector: Vec2) -> Vec2 {
        self.xf.q.apply(local_vector)
    }

    /// World point to local coordinates
    #[inline]
    #[must_use]
    pub fn local_point(&self, world_point: Vec2) -> Vec2 {
        self.xf.apply_inv(world_point)
    }

    /// World vector to local coordinates
    #[inline]
    #[must_use]
    pub fn local_vector(&self, world_vector: Vec2) -> Vec2 {
        self.xf.q.apply_inv(world_vector)
    }

    /// Velocity of a world point attached to this body
    #[inline]
    #[must_use]
    pub fn linear_velocity_from_world_point(&self, world_point: Vec2) -> Vec2 {
        self.linear_velocity + cross_sv(self.angular_velocity, world_point - self.sweep.c)
    }

    /// Velocity of a local point attached to this body
    #[inline]
    #[must_use]
    pub fn linear_velocity_from_local_point(&self, local_point: Vec2) -> Vec2 {
        self.linear_velocity_from_world_point(self.world_point(local_point))
    }

    // ========== Mutation ==========

    /// Set the linear velocity of the center of mass. Ignored for static bodies.
    pub fn set_linear_velocity(&mut self, v: Vec2) {
        if self.body_type == BodyType::Static {
            return;
        }
        if v.dot(v) > 0.0 {
            self.set_awake(true);
        }
        self.linear_velocity = v;
    }

    /// Set the angular velocity. Ignored for static bodies.
    pub fn set_angular_velocity(&mut self, w: f32) {
        if self.body_type == BodyType::Static {
            return;
        }
        if w * w > 0.0 {
            self.set_awake(true);
        }
        self.angular_velocity = w;
    }

    /// Apply a force at a world point. Sleeping bodies ignore it unless `wake`.
    pub fn apply_force(&mut self, force: Vec2, point: Vec2, wake: bool) {
        if !self.prepare_dynamic(wake) {
            return;
        }
        self.force += force;
        self.torque += (point - self.sweep.c).cross(force);
    }

    /// Apply a force at the center of mass.
    pub fn apply_force_to_center(&mut self, force: Vec2, wake: bool) {
        if !self.prepare_dynamic(wake) {
            return;
        }
        self.force += force;
    }

    /// Apply a torque.
    pub fn apply_torque(&mut self, torque: f32, wake: bool) {
        if !self.prepare_dynamic(wake) {
            return;
        }
        self.torque += torque;
    }

    /// Apply an impulse at a world point, changing velocity immediately.
    pub fn apply_linear_impulse(&mut self, impulse: Vec2, point: Vec2, wake: bool) {
        if !self.prepare_dynamic(wake) {
            return;
        }
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_i * (point - self.sweep.c).cross(impulse);
    }

    /// Apply an impulse at the center of mass.
    pub fn apply_linear_impulse_to_center(&mut self, impulse: Vec2, wake: bool) {
        if !self.prepare_dynamic(wake) {
            return;
        }
        self.linear_velocity += impulse * self.inv_mass;
    }

    /// Apply an angular impulse.
    pub fn apply_angular_impulse(&mut self, impulse: f32, wake: bool) {
        if !self.prepare_dynamic(wake) {
            return;
        }
        self.angular_velocity += self.inv_i * impulse;
    }

    fn prepare_dynamic(&mut self, wake: bool) -> bool {
        if self.body_type != BodyType::Dynamic {
            return false;
        }
        if wake && !self.is_awake() {
            self.set_awake(true);
        }
        self.is_awake()
    }

    /// Wake or put to sleep. Sleeping clears velocities and forces.
    pub fn set_awake(&mut self, awake: bool) {
        if self.body_type == BodyType::Static {
            return;
        }
        if awake {
            if !self.is_awake() {
                self.flags.insert(BodyFlags::AWAKE);
                self.sleep_time = 0.0;
            }
        } else {
            self.flags.remove(BodyFlags::AWAKE);
            self.sleep_time = 0.0;
            self.linear_velocity = Vec2::ZERO;
            self.angular_velocity = 0.0;
            self.force = Vec2::ZERO;
            self.torque = 0.0;
        }
    }

    /// Allow or forbid sleeping; forbidding wakes the body.
    pub fn set_sleeping_allowed(&mut self, allowed: bool) {
        if allowed {
            self.flags.insert(BodyFlags::AUTO_SLEEP);
        } else {
            self.flags.remove(BodyFlags::AUTO_SLEEP);
            self.set_awake(true);
        }
    }

    /// Enable continuous collision against dynamic bodies
    #[inline]
    pub fn set_bullet(&mut self, bullet: bool) {
        self.flags.set(BodyFlags::BULLET, bullet);
    }

    /// Set the gravity multiplier
    #[inline]
    pub fn set_gravity_scale(&mut self, scale: f32) {
        self.gravity_scale = scale;
    }

    /// Set the linear damping coefficient
    #[inline]
    pub fn set_linear_damping(&mut self, damping: f32) {
        self.linear_damping = damping;
    }

    /// Set the angular damping coefficient
    #[inline]
    pub fn set_angular_damping(&mut self, damping: f32) {
        self.angular_damping = damping;
    }

    /// Set application data
    #[inline]
    pub fn set_user_data(&mut self, user_data: u64) {
        self.user_data = user_data;
    }

    // ========== Crate internals ==========

    #[inline]
    pub(crate) fn is_island(&self) -> bool {
        self.flags.contains(BodyFlags::ISLAND)
    }

    /// Rebuild the mass properties from the attached fixtures.
    pub(crate) fn reset_mass_data(&mut self, fixtures: &SlotMap<FixtureHandle, Fixture>) {
        self.mass = 0.0;
        self.inv_mass = 0.0;
        self.inertia = 0.0;
        self.inv_i = 0.0;
        self.sweep.local_center = Vec2::ZERO;

        if self.body_type != BodyType::Dynamic {
            self.sweep.c0 = self.xf.p;
            self.sweep.c = self.xf.p;
            self.sweep.a0 = self.sweep.a;
            return;
        }

        let mut local_center = Vec2::ZERO;
        for fixture in self.fixtures.iter().filter_map(|&h| fixtures.get(h)) {
            if fixture.density == 0.0 {
                continue;
            }
            let md = fixture.mass_data();
            self.mass += md.mass;
            local_center += md.center * md.mass;
            self.inertia += md.inertia;
        }

        if self.mass > 0.0 {
            self.inv_mass = 1.0 / self.mass;
            local_center = local_center * self.inv_mass;
        } else {
            // dynamic bodies always carry positive mass
            self.mass = 1.0;
            self.inv_mass = 1.0;
        }

        if self.inertia > 0.0 && !self.is_fixed_rotation() {
            // about the center of mass
            self.inertia -= self.mass * local_center.dot(local_center);
            self.inv_i = if self.inertia > 0.0 { 1.0 / self.inertia } else { 0.0 };
        } else {
            self.inertia = 0.0;
            self.inv_i = 0.0;
        }

        self.move_center(local_center);
    }

    /// Override the mass properties. Dynamic bodies only.
    pub(crate) fn apply_mass_data(&mut self, data: &MassData) {
        if self.body_type != BodyType::Dynamic {
            return;
        }

        self.inv_mass = 0.0;
        self.inertia = 0.0;
        self.inv_i = 0.0;

        self.mass = if data.mass > 0.0 { data.mass } else { 1.0 };
        self.inv_mass = 1.0 / self.mass;

        if data.inertia > 0.0 && !self.is_fixed_rotation() {
            self.inertia = data.inertia - self.mass * data.center.dot(data.center);
            if self.inertia > 0.0 {
                self.inv_i = 1.0 / self.inertia;
            } else {
                self.inertia = 0.0;
            }
        }

        self.move_center(data.center);
    }

    fn move_center(&mut self, local_center: Vec2) {
        let old_center = self.sweep.c;
        self.sweep.local_center = local_center;
        self.sweep.c = self.xf.apply(local_center);
        self.sweep.c0 = self.sweep.c;

        // keep the velocity of the body origin
        self.linear_velocity += cross_sv(self.angular_velocity, self.sweep.c - old_center);
    }

    /// Teleport the body origin, resetting the sweep.
    pub(crate) fn set_transform_raw(&mut self, position: Vec2, angle: f32) {
        self.xf.q = Rot::new(angle);
        self.xf.p = position;
        self.sweep.c = self.xf.apply(self.sweep.local_center);
        self.sweep.a = angle;
        self.sweep.c0 = self.sweep.c;
        self.sweep.a0 = angle;
    }

    /// Transform at the start of the sweep
    #[inline]
    pub(crate) fn sweep_start_transform(&self) -> Transform {
        let q = Rot::new(self.sweep.a0);
        Transform {
            p: self.sweep.c0 - q.apply(self.sweep.local_center),
            q,
        }
    }

    /// Recompute the origin transform from the end of the sweep.
    #[inline]
    pub(crate) fn synchronize_transform(&mut self) {
        self.xf.q = Rot::new(self.sweep.a);
        self.xf.p = self.sweep.c - self.xf.q.apply(self.sweep.local_center);
    }

    /// Move the sweep start to `alpha` and teleport the body there.
    pub(crate) fn advance(&mut self, alpha: f32) {
        self.sweep.advance(alpha);
        self.sweep.c = self.sweep.c0;
        self.sweep.a = self.sweep.a0;
        self.synchronize_transform();
    }

    /// Pairing rule between bodies: one must be dynamic and no joint with
    /// `collide_connected == false` may connect them.
    pub(crate) fn should_collide(&self, other: BodyHandle, other_body: &Body, joints: &SlotMap<JointHandle, Joint>) -> bool {
        if self.body_type != BodyType::Dynamic && other_body.body_type != BodyType::Dynamic {
            return false;
        }
        !self.joint_edges.iter().any(|edge| {
            edge.other == other
                && joints
                    .get(edge.joint)
                    .is_some_and(|j| !j.collide_connected())
        })
    }

    pub(crate) fn shift_origin(&mut self, new_origin: Vec2) {
        self.xf.p -= new_origin;
        self.sweep.c0 -= new_origin;
        self.sweep.c -= new_origin;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_def_defaults() {
        let def = BodyDef::default();
        assert_eq!(def.body_type, BodyType::Static);
        assert!(def.allow_sleep && def.awake && def.enabled);
        assert_eq!(def.gravity_scale, 1.0);
    }

    #[test]
    fn test_static_body_has_zero_mass_and_is_asleep() {
        let body = Body::new(&BodyDef::fixed(Vec2::new(1.0, 2.0)));
        assert_eq!(body.mass(), 0.0);
        assert_eq!(body.inv_mass(), 0.0);
        assert_eq!(body.inv_inertia(), 0.0);
        assert!(!body.is_awake());
        assert_eq!(body.position(), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_dynamic_body_defaults_to_unit_mass() {
        let mut body = Body::new(&BodyDef::dynamic(Vec2::ZERO));
        assert_eq!(body.mass(), 1.0);
        body.reset_mass_data(&SlotMap::with_key());
        assert_eq!(body.mass(), 1.0);
        assert_eq!(body.inv_i, 0.0);
    }

    #[test]
    fn test_forces_and_impulses() {
        let mut body = Body::new(&BodyDef::dynamic(Vec2::ZERO));
        body.apply_mass_data(&MassData {
            mass: 2.0,
            center: Vec2::ZERO,
            inertia: 0.5,
        });
        body.apply_force(Vec2::new(0.0, 1.0), Vec2::new(1.0, 0.0), true);
        assert_eq!(body.force(), Vec2::new(0.0, 1.0));
        assert!(approx(body.torque(), 1.0));

        body.apply_linear_impulse_to_center(Vec2::new(4.0, 0.0), true);
        assert!(approx(body.linear_velocity().x, 2.0));
        body.apply_angular_impulse(1.0, true);
        assert!(approx(body.angular_velocity(), 2.0));
    }

    #[test]
    fn test_sleeping_body_ignores_force_without_wake() {
        let mut body = Body::new(&BodyDef::dynamic(Vec2::ZERO));
        body.set_awake(false);
        body.apply_force_to_center(Vec2::new(1.0, 0.0), false);
        assert_eq!(body.force(), Vec2::ZERO);
        assert!(!body.is_awake());

        body.apply_force_to_center(Vec2::new(1.0, 0.0), true);
        assert!(body.is_awake());
        assert_eq!(body.force(), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_sleep_clears_motion() {
        let mut body = Body::new(&BodyDef::dynamic(Vec2::ZERO).with_linear_velocity(Vec2::new(3.0, 0.0)));
        body.set_awake(false);
        assert_eq!(body.linear_velocity(), Vec2::ZERO);
        body.set_sleeping_allowed(false);
        assert!(body.is_awake());
    }

    #[test]
    fn test_frame_conversions() {
        let body = Body::new(&BodyDef::dynamic(Vec2::new(1.0, 0.0)).with_angle(core::f32::consts::FRAC_PI_2));
        let p = body.world_point(Vec2::new(1.0, 0.0));
        assert!(approx(p.x, 1.0) && approx(p.y, 1.0));
        let back = body.local_point(p);
        assert!(approx(back.x, 1.0) && approx(back.y, 0.0));
        let v = body.world_vector(Vec2::UNIT_X);
        assert!(approx(v.y, 1.0));
    }

    #[test]
    fn test_mass_data_offset_center_keeps_origin_velocity() {
        let mut body = Body::new(&BodyDef::dynamic(Vec2::ZERO).with_angular_velocity(1.0));
        body.apply_mass_data(&MassData {
            mass: 1.0,
            center: Vec2::new(1.0, 0.0),
            inertia: 2.0,
        });
        assert!(approx(body.inertia, 1.0));
        assert!(approx(body.inertia(), 2.0));
        assert!(approx(body.world_center().x, 1.0));
        // center moved by (1, 0): v += w x r = (0, 1)
        assert!(approx(body.linear_velocity().y, 1.0));
    }

    #[test]
    fn test_advance_moves_to_sweep_start() {
        let mut body = Body::new(&BodyDef::dynamic(Vec2::ZERO));
        body.sweep.c = Vec2::new(2.0, 0.0);
        body.advance(0.5);
        assert!(approx(body.position().x, 1.0));
        assert!(approx(body.sweep.alpha0, 0.5));
    }
}
