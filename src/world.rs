//! Physics World
//!
//! The world owns every body, fixture, joint and contact, and drives the
//! simulation through [`World::step`]:
//!
//! 1. Turn new broad-phase pairs into contacts
//! 2. Collide: update every contact manifold
//! 3. Solve: build islands of awake bodies and solve each one
//! 4. Solve TOI: sub-step fast bodies to their first time of impact
//! 5. Clear accumulated forces
//!
//! Structural mutations (creating or destroying bodies, fixtures and joints,
//! changing body type, teleporting) are rejected while the world is locked
//! for a step.
//!
//! # Example
//!
//! ```ignore
//! let mut world = World::new(WorldDef::default());
//! let ground = world.create_body(&BodyDef::default())?;
//! world.create_fixture(ground, &FixtureDef::new(PolygonShape::new_box(10.0, 1.0)))?;
//! let ball = world.create_body(&BodyDef::dynamic(Vec2::new(0.0, 4.0)))?;
//! world.create_fixture(ball, &FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.5)).with_density(1.0))?;
//! for _ in 0..60 {
//!     world.step(1.0 / 60.0, 8, 3);
//! }
//! ```

use slotmap::SlotMap;

use crate::body::{Body, BodyDef, BodyFlags, BodyHandle, BodyType, JointEdge};
use crate::broad_phase::BroadPhase;
use crate::collision::{Aabb, RayCastInput};
use crate::contact::{Contact, ContactFlags, ContactHandle};
use crate::contact_manager::ContactManager;
use crate::distance::DistanceProxy;
use crate::error::PhysicsError;
use crate::filter::Filter;
use crate::fixture::{Fixture, FixtureDef, FixtureHandle, FixtureProxyKey};
use crate::island::{Island, IslandWorld, SolverStacks};
use crate::joint::{Joint, JointDef, JointHandle, JointKind};
use crate::math::Vec2;
use crate::profiling::{Profile, Timer};
use crate::shape::MassData;
use crate::settings::{MAX_BODIES, MAX_SUB_STEPS, MAX_TOI_CONTACTS};
use crate::time_step::TimeStep;
use crate::toi::{time_of_impact, ToiInput, ToiState};
use crate::world_callbacks::{ContactFilter, ContactListener, DestructionListener};

// ============================================================================
// Configuration
// ============================================================================

/// World construction parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldDef {
    /// Gravity acceleration (m/s^2)
    pub gravity: Vec2,
    /// Let resting islands go to sleep
    pub allow_sleep: bool,
    /// Seed the solver with last step's impulses
    pub warm_starting: bool,
    /// Run the time-of-impact pass
    pub continuous_physics: bool,
    /// Solve one TOI event per step (debugging aid)
    pub sub_stepping: bool,
    /// Zero forces after every step
    pub clear_forces: bool,
}

impl Default for WorldDef {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -10.0),
            allow_sleep: true,
            warm_starting: true,
            continuous_physics: true,
            sub_stepping: false,
            clear_forces: true,
        }
    }
}

impl WorldDef {
    /// Set gravity
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    /// Allow or forbid sleeping
    #[must_use]
    pub fn with_allow_sleep(mut self, allow: bool) -> Self {
        self.allow_sleep = allow;
        self
    }

    /// Enable or disable warm starting
    #[must_use]
    pub fn with_warm_starting(mut self, enabled: bool) -> Self {
        self.warm_starting = enabled;
        self
    }

    /// Enable or disable continuous collision
    #[must_use]
    pub fn with_continuous_physics(mut self, enabled: bool) -> Self {
        self.continuous_physics = enabled;
        self
    }

    /// Enable or disable TOI sub-stepping
    #[must_use]
    pub fn with_sub_stepping(mut self, enabled: bool) -> Self {
        self.sub_stepping = enabled;
        self
    }

    /// Clear forces automatically after each step
    #[must_use]
    pub fn with_clear_forces(mut self, enabled: bool) -> Self {
        self.clear_forces = enabled;
        self
    }
}

/// One fixture hit by [`World::ray_cast`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayCastHit {
    /// Fixture that was hit
    pub fixture: FixtureHandle,
    /// Chain child index (0 for other shapes)
    pub child_index: usize,
    /// World hit point
    pub point: Vec2,
    /// Surface normal at the hit point
    pub normal: Vec2,
    /// Fraction along the ray
    pub fraction: f32,
}

// ============================================================================
// World
// ============================================================================

/// Rigid body simulation.
pub struct World {
    pub(crate) bodies: SlotMap<BodyHandle, Body>,
    pub(crate) fixtures: SlotMap<FixtureHandle, Fixture>,
    pub(crate) joints: SlotMap<JointHandle, Joint>,
    pub(crate) contact_manager: ContactManager,
    destruction_listener: Option<Box<dyn DestructionListener>>,

    gravity: Vec2,
    allow_sleep: bool,
    warm_starting: bool,
    continuous_physics: bool,
    sub_stepping: bool,
    clear_forces: bool,

    new_contacts: bool,
    pub(crate) locked: bool,
    step_complete: bool,
    inv_dt0: f32,
    profile: Profile,

    island: Island,
    island_stack: Vec<BodyHandle>,
    stacks: SolverStacks,
    body_scratch: Vec<BodyHandle>,
    contact_scratch: Vec<ContactHandle>,
}

impl core::fmt::Debug for World {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("World")
            .field("gravity", &self.gravity)
            .field("body_count", &self.bodies.len())
            .field("fixture_count", &self.fixtures.len())
            .field("joint_count", &self.joints.len())
            .field("contact_manager", &self.contact_manager)
            .field("locked", &self.locked)
            .finish()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldDef::default())
    }
}

/// Push the fixtures of `body` to the broad-phase, sweeping from the start
/// of its motion when awake.
fn synchronize_fixtures(
    body: &Body,
    fixtures: &mut SlotMap<FixtureHandle, Fixture>,
    broad_phase: &mut BroadPhase<FixtureProxyKey>,
) {
    let xf1 = if body.is_awake() {
        body.sweep_start_transform()
    } else {
        body.xf
    };
    for &fh in &body.fixtures {
        if let Some(fixture) = fixtures.get_mut(fh) {
            fixture.synchronize(broad_phase, &xf1, &body.xf);
        }
    }
}

impl World {
    /// Create an empty world
    #[must_use]
    pub fn new(def: WorldDef) -> Self {
        Self {
            bodies: SlotMap::with_key(),
            fixtures: SlotMap::with_key(),
            joints: SlotMap::with_key(),
            contact_manager: ContactManager::new(),
            destruction_listener: None,
            gravity: def.gravity,
            allow_sleep: def.allow_sleep,
            warm_starting: def.warm_starting,
            continuous_physics: def.continuous_physics,
            sub_stepping: def.sub_stepping,
            clear_forces: def.clear_forces,
            new_contacts: false,
            locked: false,
            step_complete: true,
            inv_dt0: 0.0,
            profile: Profile::default(),
            island: Island::default(),
            island_stack: Vec::new(),
            stacks: SolverStacks::default(),
            body_scratch: Vec::new(),
            contact_scratch: Vec::new(),
        }
    }

    fn ensure_unlocked(&self, operation: &'static str) -> Result<(), PhysicsError> {
        if self.locked {
            tracing::warn!(operation, "world is locked, mutation rejected");
            return Err(PhysicsError::WorldLocked { operation });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    /// Install or remove the destruction listener
    pub fn set_destruction_listener(&mut self, listener: Option<Box<dyn DestructionListener>>) {
        self.destruction_listener = listener;
    }

    /// Install or remove the contact filter. Without one, the
    /// category/mask/group rule of [`Filter`] applies.
    pub fn set_contact_filter(&mut self, filter: Option<Box<dyn ContactFilter>>) {
        self.contact_manager.contact_filter = filter;
    }

    /// Install or remove the contact listener
    pub fn set_contact_listener(&mut self, listener: Option<Box<dyn ContactListener>>) {
        self.contact_manager.contact_listener = listener;
    }

    // ------------------------------------------------------------------
    // Bodies
    // ------------------------------------------------------------------

    /// Create a rigid body. Fails while the world is locked or full.
    pub fn create_body(&mut self, def: &BodyDef) -> Result<BodyHandle, PhysicsError> {
        self.ensure_unlocked("create_body")?;
        if self.bodies.len() >= MAX_BODIES {
            tracing::warn!(limit = MAX_BODIES, "body capacity exceeded");
            return Err(PhysicsError::CapacityExceeded {
                resource: "bodies",
                limit: MAX_BODIES,
            });
        }
        let handle = self.bodies.insert(Body::new(def));
        tracing::trace!(body = ?handle, body_type = ?def.body_type, "body created");
        Ok(handle)
    }

    /// Destroy a body together with its joints, contacts and fixtures.
    ///
    /// Joints and fixtures are reported to the destruction listener first.
    /// Gear joints built on a destroyed joint are destroyed as well.
    pub fn destroy_body(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
        self.ensure_unlocked("destroy_body")?;
        let body = self.bodies.get(handle).ok_or(PhysicsError::body())?;

        let attached: Vec<JointHandle> = body.joint_edges.iter().map(|edge| edge.joint).collect();
        let mut doomed: Vec<JointHandle> = self
            .joints
            .iter()
            .filter(|(_, joint)| match &joint.kind {
                JointKind::Gear(gear) => attached.iter().any(|&j| gear.references(j)),
                _ => false,
            })
            .map(|(h, _)| h)
            .collect();
        doomed.extend(attached);
        doomed.sort();
        doomed.dedup();

        for joint in doomed {
            if let Some(listener) = self.destruction_listener.as_deref_mut() {
                listener.say_goodbye_joint(joint);
            }
            self.remove_joint(joint);
        }

        let (contacts, fixtures) = match self.bodies.get(handle) {
            Some(body) => (
                body.contact_edges.iter().map(|edge| edge.contact).collect::<Vec<_>>(),
                body.fixtures.clone(),
            ),
            None => return Err(PhysicsError::body()),
        };

        for contact in contacts {
            self.contact_manager
                .destroy(contact, &mut self.bodies, &self.fixtures);
        }

        for fh in fixtures {
            if let Some(listener) = self.destruction_listener.as_deref_mut() {
                listener.say_goodbye_fixture(fh);
            }
            if let Some(mut fixture) = self.fixtures.remove(fh) {
                fixture.destroy_proxies(&mut self.contact_manager.broad_phase);
            }
        }

        self.bodies.remove(handle);
        tracing::trace!(body = ?handle, "body destroyed");
        Ok(())
    }

    /// Body by handle
    #[must_use]
    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    /// Mutable body by handle. Structural changes go through the world.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle)
    }

    /// All bodies
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.bodies.iter()
    }

    /// Change a body between static, kinematic and dynamic.
    pub fn set_body_type(&mut self, handle: BodyHandle, body_type: BodyType) -> Result<(), PhysicsError> {
        self.ensure_unlocked("set_body_type")?;
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::body())?;
        if body.body_type == body_type {
            return Ok(());
        }

        body.body_type = body_type;
        body.reset_mass_data(&self.fixtures);

        if body_type == BodyType::Static {
            body.linear_velocity = Vec2::ZERO;
            body.angular_velocity = 0.0;
            body.sweep.a0 = body.sweep.a;
            body.sweep.c0 = body.sweep.c;
            body.flags.remove(BodyFlags::AWAKE);
            synchronize_fixtures(body, &mut self.fixtures, &mut self.contact_manager.broad_phase);
        }

        body.set_awake(true);
        body.force = Vec2::ZERO;
        body.torque = 0.0;

        let contacts: Vec<ContactHandle> = body.contact_edges.iter().map(|edge| edge.contact).collect();
        let fixtures = body.fixtures.clone();
        for contact in contacts {
            self.contact_manager
                .destroy(contact, &mut self.bodies, &self.fixtures);
        }
        for fh in fixtures {
            if let Some(fixture) = self.fixtures.get(fh) {
                fixture.touch_proxies(&mut self.contact_manager.broad_phase);
            }
        }
        Ok(())
    }

    /// Enable or disable a body. Disabled bodies have no proxies and no
    /// contacts, and are skipped by the solver.
    pub fn set_body_enabled(&mut self, handle: BodyHandle, enabled: bool) -> Result<(), PhysicsError> {
        self.ensure_unlocked("set_body_enabled")?;
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::body())?;
        if body.is_enabled() == enabled {
            return Ok(());
        }

        let fixtures = body.fixtures.clone();
        if enabled {
            body.flags.insert(BodyFlags::ENABLED);
            let xf = body.xf;
            for fh in fixtures {
                if let Some(fixture) = self.fixtures.get_mut(fh) {
                    fixture.create_proxies(fh, &mut self.contact_manager.broad_phase, &xf);
                }
            }
            self.new_contacts = true;
        } else {
            body.flags.remove(BodyFlags::ENABLED);
            let contacts: Vec<ContactHandle> = body.contact_edges.iter().map(|edge| edge.contact).collect();
            for fh in fixtures {
                if let Some(fixture) = self.fixtures.get_mut(fh) {
                    fixture.destroy_proxies(&mut self.contact_manager.broad_phase);
                }
            }
            for contact in contacts {
                self.contact_manager
                    .destroy(contact, &mut self.bodies, &self.fixtures);
            }
        }
        Ok(())
    }

    /// Lock or unlock the rotation of a body
    pub fn set_fixed_rotation(&mut self, handle: BodyHandle, fixed: bool) -> Result<(), PhysicsError> {
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::body())?;
        if body.is_fixed_rotation() == fixed {
            return Ok(());
        }
        body.flags.set(BodyFlags::FIXED_ROTATION, fixed);
        body.angular_velocity = 0.0;
        body.reset_mass_data(&self.fixtures);
        Ok(())
    }

    /// Teleport a body. Contacts are updated on the next step.
    pub fn set_transform(&mut self, handle: BodyHandle, position: Vec2, angle: f32) -> Result<(), PhysicsError> {
        self.ensure_unlocked("set_transform")?;
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::body())?;
        body.set_transform_raw(position, angle);

        let xf = body.xf;
        for &fh in &body.fixtures {
            if let Some(fixture) = self.fixtures.get_mut(fh) {
                fixture.synchronize(&mut self.contact_manager.broad_phase, &xf, &xf);
            }
        }
        self.new_contacts = true;
        Ok(())
    }

    /// Override the mass properties of a dynamic body
    pub fn set_mass_data(&mut self, handle: BodyHandle, data: &MassData) -> Result<(), PhysicsError> {
        self.ensure_unlocked("set_mass_data")?;
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::body())?;
        body.apply_mass_data(data);
        Ok(())
    }

    /// Recompute mass properties from the body's fixtures
    pub fn reset_mass_data(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::body())?;
        body.reset_mass_data(&self.fixtures);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------

    /// Attach a fixture to a body. Mass is recomputed when the density is
    /// positive.
    pub fn create_fixture(&mut self, body: BodyHandle, def: &FixtureDef) -> Result<FixtureHandle, PhysicsError> {
        self.ensure_unlocked("create_fixture")?;
        let owner = self.bodies.get_mut(body).ok_or(PhysicsError::body())?;

        let handle = self.fixtures.insert(Fixture::new(body, def));
        if owner.is_enabled() {
            let xf = owner.xf;
            if let Some(fixture) = self.fixtures.get_mut(handle) {
                fixture.create_proxies(handle, &mut self.contact_manager.broad_phase, &xf);
            }
        }
        owner.fixtures.push(handle);

        if def.density > 0.0 {
            owner.reset_mass_data(&self.fixtures);
        }
        self.new_contacts = true;
        Ok(handle)
    }

    /// Detach and destroy a fixture, along with its contacts.
    pub fn destroy_fixture(&mut self, handle: FixtureHandle) -> Result<(), PhysicsError> {
        self.ensure_unlocked("destroy_fixture")?;
        let body = self.fixtures.get(handle).ok_or(PhysicsError::fixture())?.body;

        let contacts: Vec<ContactHandle> = self
            .bodies
            .get(body)
            .map(|b| {
                b.contact_edges
                    .iter()
                    .filter(|edge| {
                        self.contact_manager
                            .contacts
                            .get(edge.contact)
                            .is_some_and(|c| c.fixture_a == handle || c.fixture_b == handle)
                    })
                    .map(|edge| edge.contact)
                    .collect()
            })
            .unwrap_or_default();
        for contact in contacts {
            self.contact_manager
                .destroy(contact, &mut self.bodies, &self.fixtures);
        }

        if let Some(mut fixture) = self.fixtures.remove(handle) {
            fixture.destroy_proxies(&mut self.contact_manager.broad_phase);
        }
        if let Some(owner) = self.bodies.get_mut(body) {
            owner.fixtures.retain(|&f| f != handle);
            owner.reset_mass_data(&self.fixtures);
        }
        Ok(())
    }

    /// Fixture by handle
    #[must_use]
    pub fn fixture(&self, handle: FixtureHandle) -> Option<&Fixture> {
        self.fixtures.get(handle)
    }

    /// Mutable fixture by handle
    pub fn fixture_mut(&mut self, handle: FixtureHandle) -> Option<&mut Fixture> {
        self.fixtures.get_mut(handle)
    }

    /// All fixtures
    pub fn fixtures(&self) -> impl Iterator<Item = (FixtureHandle, &Fixture)> {
        self.fixtures.iter()
    }

    /// Turn a fixture into a sensor or back. Wakes its body.
    pub fn set_sensor(&mut self, handle: FixtureHandle, sensor: bool) -> Result<(), PhysicsError> {
        let fixture = self.fixtures.get_mut(handle).ok_or(PhysicsError::fixture())?;
        if fixture.is_sensor != sensor {
            fixture.is_sensor = sensor;
            if let Some(body) = self.bodies.get_mut(fixture.body) {
                body.set_awake(true);
            }
        }
        Ok(())
    }

    /// Replace the collision filter of a fixture and re-filter its contacts.
    pub fn set_filter_data(&mut self, handle: FixtureHandle, filter: Filter) -> Result<(), PhysicsError> {
        let fixture = self.fixtures.get_mut(handle).ok_or(PhysicsError::fixture())?;
        fixture.filter = filter;

        if let Some(body) = self.bodies.get(fixture.body) {
            for edge in &body.contact_edges {
                if let Some(contact) = self.contact_manager.contacts.get_mut(edge.contact) {
                    if contact.fixture_a == handle || contact.fixture_b == handle {
                        contact.flag_for_filtering();
                    }
                }
            }
        }
        fixture.touch_proxies(&mut self.contact_manager.broad_phase);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Joints
    // ------------------------------------------------------------------

    /// Create a joint. Unless the definition asks to collide connected
    /// bodies, existing contacts between them are re-filtered away.
    pub fn create_joint(&mut self, def: impl Into<JointDef>) -> Result<JointHandle, PhysicsError> {
        self.ensure_unlocked("create_joint")?;
        let def = def.into();
        let joint = Joint::new(JointHandle::default(), &def, &self.bodies, &self.joints).map_err(|error| {
            tracing::warn!(%error, "joint rejected");
            error
        })?;

        let (a, b, collide_connected) = (joint.body_a, joint.body_b, joint.collide_connected);
        let handle = self.joints.insert(joint);
        if let Some(joint) = self.joints.get_mut(handle) {
            joint.handle = handle;
        }

        if let Some(body) = self.bodies.get_mut(a) {
            body.joint_edges.push(JointEdge { other: b, joint: handle });
        }
        if let Some(body) = self.bodies.get_mut(b) {
            body.joint_edges.push(JointEdge { other: a, joint: handle });
        }

        if !collide_connected {
            self.flag_contacts_between(a, b);
        }
        tracing::trace!(joint = ?handle, "joint created");
        Ok(handle)
    }

    /// Destroy a joint. Fails with [`PhysicsError::JointInUse`] while a
    /// gear joint is built on it.
    pub fn destroy_joint(&mut self, handle: JointHandle) -> Result<(), PhysicsError> {
        self.ensure_unlocked("destroy_joint")?;
        if !self.joints.contains_key(handle) {
            return Err(PhysicsError::joint());
        }
        let in_use = self.joints.values().any(|joint| match &joint.kind {
            JointKind::Gear(gear) => gear.references(handle),
            _ => false,
        });
        if in_use {
            tracing::warn!(joint = ?handle, "joint is driven by a gear joint");
            return Err(PhysicsError::JointInUse);
        }
        self.remove_joint(handle);
        Ok(())
    }

    fn remove_joint(&mut self, handle: JointHandle) -> Option<Joint> {
        let joint = self.joints.remove(handle)?;
        for body in [joint.body_a, joint.body_b] {
            if let Some(body) = self.bodies.get_mut(body) {
                body.set_awake(true);
                body.joint_edges.retain(|edge| edge.joint != handle);
            }
        }
        if !joint.collide_connected {
            self.flag_contacts_between(joint.body_a, joint.body_b);
        }
        tracing::trace!(joint = ?handle, "joint destroyed");
        Some(joint)
    }

    fn flag_contacts_between(&mut self, a: BodyHandle, b: BodyHandle) {
        let Some(body) = self.bodies.get(b) else {
            return;
        };
        for edge in body.contact_edges.iter().filter(|edge| edge.other == a) {
            if let Some(contact) = self.contact_manager.contacts.get_mut(edge.contact) {
                contact.flag_for_filtering();
            }
        }
    }

    /// Joint by handle
    #[must_use]
    pub fn joint(&self, handle: JointHandle) -> Option<&Joint> {
        self.joints.get(handle)
    }

    /// Mutable joint by handle. Both bodies are woken so motor, limit and
    /// target changes take effect.
    pub fn joint_mut(&mut self, handle: JointHandle) -> Option<&mut Joint> {
        let joint = self.joints.get_mut(handle)?;
        for body in [joint.body_a, joint.body_b] {
            if let Some(body) = self.bodies.get_mut(body) {
                body.set_awake(true);
            }
        }
        Some(joint)
    }

    /// All joints
    pub fn joints(&self) -> impl Iterator<Item = (JointHandle, &Joint)> {
        self.joints.iter()
    }

    // ------------------------------------------------------------------
    // Contacts
    // ------------------------------------------------------------------

    /// Contact by handle
    #[must_use]
    pub fn contact(&self, handle: ContactHandle) -> Option<&Contact> {
        self.contact_manager.contacts.get(handle)
    }

    /// Mutable contact by handle, for friction/restitution overrides
    pub fn contact_mut(&mut self, handle: ContactHandle) -> Option<&mut Contact> {
        self.contact_manager.contacts.get_mut(handle)
    }

    /// All contacts, touching or not
    pub fn contacts(&self) -> impl Iterator<Item = (ContactHandle, &Contact)> {
        self.contact_manager.contacts.iter()
    }

    // ------------------------------------------------------------------
    // Settings and statistics
    // ------------------------------------------------------------------

    /// Gravity
    #[must_use]
    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// Set gravity
    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    /// Whether islands may sleep
    #[must_use]
    pub fn is_sleeping_allowed(&self) -> bool {
        self.allow_sleep
    }

    /// Allow sleeping; disallowing wakes every body
    pub fn set_allow_sleeping(&mut self, allow: bool) {
        if allow == self.allow_sleep {
            return;
        }
        self.allow_sleep = allow;
        if !allow {
            for body in self.bodies.values_mut() {
                body.set_awake(true);
            }
        }
    }

    /// Warm starting toggle
    #[must_use]
    pub fn is_warm_starting(&self) -> bool {
        self.warm_starting
    }

    /// Set warm starting
    pub fn set_warm_starting(&mut self, enabled: bool) {
        self.warm_starting = enabled;
    }

    /// Continuous collision toggle
    #[must_use]
    pub fn is_continuous_physics(&self) -> bool {
        self.continuous_physics
    }

    /// Set continuous collision
    pub fn set_continuous_physics(&mut self, enabled: bool) {
        self.continuous_physics = enabled;
    }

    /// TOI sub-stepping toggle
    #[must_use]
    pub fn is_sub_stepping(&self) -> bool {
        self.sub_stepping
    }

    /// Set TOI sub-stepping
    pub fn set_sub_stepping(&mut self, enabled: bool) {
        self.sub_stepping = enabled;
    }

    /// Automatic force clearing toggle
    #[must_use]
    pub fn auto_clear_forces(&self) -> bool {
        self.clear_forces
    }

    /// Set automatic force clearing
    pub fn set_auto_clear_forces(&mut self, enabled: bool) {
        self.clear_forces = enabled;
    }

    /// True while a step is running
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Timings of the last step
    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Number of bodies
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of joints
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Number of contacts
    #[must_use]
    pub fn contact_count(&self) -> usize {
        self.contact_manager.contact_count()
    }

    /// Number of broad-phase proxies
    #[must_use]
    pub fn proxy_count(&self) -> usize {
        self.contact_manager.broad_phase.proxy_count()
    }

    /// Height of the dynamic tree
    #[must_use]
    pub fn tree_height(&self) -> i32 {
        self.contact_manager.broad_phase.tree_height()
    }

    /// Largest height difference between sibling subtrees
    #[must_use]
    pub fn tree_balance(&self) -> i32 {
        self.contact_manager.broad_phase.tree_balance()
    }

    /// Ratio of the summed node perimeters to the root perimeter
    #[must_use]
    pub fn tree_quality(&self) -> f32 {
        self.contact_manager.broad_phase.tree_quality()
    }

    /// Zero the accumulated force and torque of every body
    pub fn clear_forces(&mut self) {
        for body in self.bodies.values_mut() {
            body.force = Vec2::ZERO;
            body.torque = 0.0;
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Report every fixture whose fat AABB overlaps `aabb`. Return false
    /// from the callback to stop.
    pub fn query_aabb<F: FnMut(FixtureHandle) -> bool>(&self, aabb: &Aabb, mut callback: F) {
        let broad_phase = &self.contact_manager.broad_phase;
        broad_phase.query(aabb, |proxy| match broad_phase.user_data(proxy) {
            Some(key) => callback(key.fixture),
            None => true,
        });
    }

    /// Cast a ray from `p1` to `p2`. The callback's return value controls
    /// the search: -1 ignores the hit, 0 stops, the hit fraction clips the
    /// ray to the closest hit so far, 1 continues unclipped.
    pub fn ray_cast<F: FnMut(&RayCastHit) -> f32>(&self, p1: Vec2, p2: Vec2, mut callback: F) {
        let broad_phase = &self.contact_manager.broad_phase;
        let input = RayCastInput {
            p1,
            p2,
            max_fraction: 1.0,
        };
        broad_phase.ray_cast(&input, |sub_input, proxy| {
            let Some(key) = broad_phase.user_data(proxy) else {
                return sub_input.max_fraction;
            };
            let Some(fixture) = self.fixtures.get(key.fixture) else {
                return sub_input.max_fraction;
            };
            let Some(body) = self.bodies.get(fixture.body) else {
                return sub_input.max_fraction;
            };
            match fixture.ray_cast(sub_input, &body.xf, key.child_index) {
                Some(output) => {
                    let fraction = output.fraction;
                    let hit = RayCastHit {
                        fixture: key.fixture,
                        child_index: key.child_index,
                        point: (1.0 - fraction) * sub_input.p1 + fraction * sub_input.p2,
                        normal: output.normal,
                        fraction,
                    };
                    callback(&hit)
                }
                None => sub_input.max_fraction,
            }
        });
    }

    /// Closest fixture hit by the ray from `p1` to `p2`
    #[must_use]
    pub fn ray_cast_closest(&self, p1: Vec2, p2: Vec2) -> Option<RayCastHit> {
        let mut closest = None;
        self.ray_cast(p1, p2, |hit| {
            closest = Some(*hit);
            hit.fraction
        });
        closest
    }

    /// Move the world origin. Useful for large worlds.
    pub fn shift_origin(&mut self, new_origin: Vec2) -> Result<(), PhysicsError> {
        self.ensure_unlocked("shift_origin")?;
        for body in self.bodies.values_mut() {
            body.shift_origin(new_origin);
        }
        for joint in self.joints.values_mut() {
            joint.shift_origin(new_origin);
        }
        self.contact_manager.broad_phase.shift_origin(new_origin);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    fn find_new_contacts(&mut self) {
        self.contact_manager
            .find_new_contacts(&mut self.bodies, &self.fixtures, &self.joints);
    }

    /// Advance the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f32, velocity_iterations: u32, position_iterations: u32) {
        let _span = tracing::debug_span!("step", dt).entered();
        let step_timer = Timer::new();

        // fixtures added since the last step
        if self.new_contacts {
            self.find_new_contacts();
            self.new_contacts = false;
        }

        self.locked = true;

        let step = TimeStep {
            dt,
            inv_dt: if dt > 0.0 { 1.0 / dt } else { 0.0 },
            dt_ratio: self.inv_dt0 * dt,
            velocity_iterations,
            position_iterations,
            warm_starting: self.warm_starting,
        };

        {
            let _span = tracing::trace_span!("collide").entered();
            let timer = Timer::new();
            self.contact_manager
                .collide(&mut self.bodies, &self.fixtures, &self.joints);
            self.profile.collide = timer.milliseconds();
        }

        if self.step_complete && step.dt > 0.0 {
            let _span = tracing::trace_span!("solve").entered();
            let timer = Timer::new();
            self.solve(&step);
            self.profile.solve = timer.milliseconds();
        }

        if self.continuous_physics && step.dt > 0.0 {
            let _span = tracing::trace_span!("solve_toi").entered();
            let timer = Timer::new();
            self.solve_toi(&step);
            self.profile.solve_toi = timer.milliseconds();
        }

        if step.dt > 0.0 {
            self.inv_dt0 = step.inv_dt;
        }

        if self.clear_forces {
            self.clear_forces();
        }

        self.locked = false;
        self.profile.step = step_timer.milliseconds();
    }

    fn solve(&mut self, step: &TimeStep) {
        self.profile.solve_init = 0.0;
        self.profile.solve_velocity = 0.0;
        self.profile.solve_position = 0.0;

        for body in self.bodies.values_mut() {
            body.flags.remove(BodyFlags::ISLAND);
        }
        for contact in self.contact_manager.contacts.values_mut() {
            contact.flags.remove(ContactFlags::ISLAND);
        }
        for joint in self.joints.values_mut() {
            joint.island = false;
        }

        let mut seeds = std::mem::take(&mut self.body_scratch);
        seeds.clear();
        seeds.extend(self.bodies.keys());

        {
            let Self {
                bodies,
                fixtures,
                joints,
                contact_manager,
                island,
                island_stack,
                stacks,
                profile,
                gravity,
                allow_sleep,
                ..
            } = self;
            let mut world = IslandWorld {
                bodies,
                fixtures,
                contacts: &mut contact_manager.contacts,
                joints,
                listener: contact_manager.contact_listener.as_deref_mut(),
            };

            for &seed in &seeds {
                let Some(body) = world.bodies.get(seed) else {
                    continue;
                };
                if body.is_island() || !body.is_awake() || !body.is_enabled() || body.body_type == BodyType::Static {
                    continue;
                }

                island.flood(seed, &mut world, island_stack);
                let island_profile = island.solve(step, *gravity, *allow_sleep, &mut world, stacks);
                profile.add_island(&island_profile);
                island.release_static_bodies(world.bodies);
            }
        }

        let timer = Timer::new();
        for &handle in &seeds {
            let Some(body) = self.bodies.get(handle) else {
                continue;
            };
            // bodies not touched by any island did not move
            if !body.is_island() || body.body_type == BodyType::Static {
                continue;
            }
            synchronize_fixtures(body, &mut self.fixtures, &mut self.contact_manager.broad_phase);
        }
        self.find_new_contacts();
        self.profile.broadphase = timer.milliseconds();

        self.body_scratch = seeds;
    }

    /// Time of impact of a contact as a fraction of the step, computing and
    /// caching it when needed. `None` when the contact is not a TOI candidate.
    fn contact_toi(&mut self, handle: ContactHandle) -> Option<f32> {
        let contact = self.contact_manager.contacts.get(handle)?;
        if !contact.is_enabled() || contact.toi_count > MAX_SUB_STEPS {
            return None;
        }
        if contact.flags.contains(ContactFlags::TOI) {
            return Some(contact.toi);
        }

        let fa = self.fixtures.get(contact.fixture_a)?;
        let fb = self.fixtures.get(contact.fixture_b)?;
        if fa.is_sensor || fb.is_sensor {
            return None;
        }
        let (child_a, child_b) = (contact.child_index_a, contact.child_index_b);
        let [ba, bb] = self.bodies.get_disjoint_mut([contact.body_a, contact.body_b])?;

        let active_a = ba.is_awake() && ba.body_type != BodyType::Static;
        let active_b = bb.is_awake() && bb.body_type != BodyType::Static;
        if !active_a && !active_b {
            return None;
        }

        let collide_a = ba.is_bullet() || ba.body_type != BodyType::Dynamic;
        let collide_b = bb.is_bullet() || bb.body_type != BodyType::Dynamic;
        if !collide_a && !collide_b {
            return None;
        }

        // bring both sweeps to the same start time
        let mut alpha0 = ba.sweep.alpha0;
        if ba.sweep.alpha0 < bb.sweep.alpha0 {
            alpha0 = bb.sweep.alpha0;
            ba.sweep.advance(alpha0);
        } else if bb.sweep.alpha0 < ba.sweep.alpha0 {
            alpha0 = ba.sweep.alpha0;
            bb.sweep.advance(alpha0);
        }

        let input = ToiInput {
            proxy_a: DistanceProxy::from_shape(&fa.shape, child_a),
            proxy_b: DistanceProxy::from_shape(&fb.shape, child_b),
            sweep_a: ba.sweep,
            sweep_b: bb.sweep,
            t_max: 1.0,
        };
        let output = time_of_impact(&input);

        let alpha = if output.state == ToiState::Touching {
            (alpha0 + (1.0 - alpha0) * output.t).min(1.0)
        } else {
            1.0
        };

        let contact = self.contact_manager.contacts.get_mut(handle)?;
        contact.toi = alpha;
        contact.flags.insert(ContactFlags::TOI);
        Some(alpha)
    }

    /// Re-evaluate one contact's manifold at the current body transforms.
    /// Returns whether it is enabled and touching afterwards.
    fn update_contact(&mut self, handle: ContactHandle) -> bool {
        let manager = &mut self.contact_manager;
        let Some(contact) = manager.contacts.get_mut(handle) else {
            return false;
        };
        let (Some(fa), Some(fb)) = (self.fixtures.get(contact.fixture_a), self.fixtures.get(contact.fixture_b)) else {
            return false;
        };
        let (Some(ba), Some(bb)) = (self.bodies.get(contact.body_a), self.bodies.get(contact.body_b)) else {
            return false;
        };
        contact.update(fa, &ba.xf, fb, &bb.xf, manager.contact_listener.as_deref_mut());
        contact.is_enabled() && contact.is_touching()
    }

    fn solve_toi(&mut self, step: &TimeStep) {
        if self.step_complete {
            for body in self.bodies.values_mut() {
                body.flags.remove(BodyFlags::ISLAND);
                body.sweep.alpha0 = 0.0;
            }
            for contact in self.contact_manager.contacts.values_mut() {
                contact.flags.remove(ContactFlags::TOI | ContactFlags::ISLAND);
                contact.toi_count = 0;
                contact.toi = 1.0;
            }
        }

        let mut handles = std::mem::take(&mut self.contact_scratch);
        let mut island = std::mem::take(&mut self.island);

        loop {
            // earliest TOI event
            handles.clear();
            handles.extend(self.contact_manager.contacts.keys());
            let mut min_contact = None;
            let mut min_alpha = 1.0;
            for &handle in &handles {
                if let Some(alpha) = self.contact_toi(handle) {
                    if alpha < min_alpha {
                        min_contact = Some(handle);
                        min_alpha = alpha;
                    }
                }
            }

            let Some(min_contact) = min_contact else {
                self.step_complete = true;
                break;
            };
            if 1.0 - 10.0 * f32::EPSILON < min_alpha {
                self.step_complete = true;
                break;
            }

            let Some(contact) = self.contact_manager.contacts.get(min_contact) else {
                self.step_complete = true;
                break;
            };
            let (ha, hb) = (contact.body_a, contact.body_b);
            let Some([ba, bb]) = self.bodies.get_disjoint_mut([ha, hb]) else {
                self.step_complete = true;
                break;
            };

            let backup_a = ba.sweep;
            let backup_b = bb.sweep;
            ba.advance(min_alpha);
            bb.advance(min_alpha);

            // the TOI contact is likely to be touching now
            let touching = self.update_contact(min_contact);
            if let Some(contact) = self.contact_manager.contacts.get_mut(min_contact) {
                contact.flags.remove(ContactFlags::TOI);
                contact.toi_count += 1;

                if !touching {
                    // false positive, restore the sweeps
                    contact.set_enabled(false);
                    if let Some([ba, bb]) = self.bodies.get_disjoint_mut([ha, hb]) {
                        ba.sweep = backup_a;
                        bb.sweep = backup_b;
                        ba.synchronize_transform();
                        bb.synchronize_transform();
                    }
                    continue;
                }
            }

            tracing::trace!(contact = ?min_contact, alpha = min_alpha, "toi event");

            island.clear();
            for handle in [ha, hb] {
                if let Some(body) = self.bodies.get_mut(handle) {
                    body.set_awake(true);
                    body.flags.insert(BodyFlags::ISLAND);
                    island.add_body(handle, body);
                }
            }
            if let Some(contact) = self.contact_manager.contacts.get_mut(min_contact) {
                contact.flags.insert(ContactFlags::ISLAND);
            }
            island.contacts.push(min_contact);

            for handle in [ha, hb] {
                self.grow_toi_island(handle, min_alpha, &mut island);
            }

            let dt = (1.0 - min_alpha) * step.dt;
            let sub_step = TimeStep {
                dt,
                inv_dt: if dt > 0.0 { 1.0 / dt } else { 0.0 },
                dt_ratio: 1.0,
                velocity_iterations: step.velocity_iterations,
                position_iterations: 20,
                warm_starting: false,
            };

            let index_a = self.bodies.get(ha).map_or(0, |b| b.island_index);
            let index_b = self.bodies.get(hb).map_or(0, |b| b.island_index);
            {
                let Self {
                    bodies,
                    fixtures,
                    joints,
                    contact_manager,
                    stacks,
                    ..
                } = self;
                let mut world = IslandWorld {
                    bodies,
                    fixtures,
                    contacts: &mut contact_manager.contacts,
                    joints,
                    listener: contact_manager.contact_listener.as_deref_mut(),
                };
                island.solve_toi(&sub_step, index_a, index_b, &mut world, stacks);
            }

            // island bodies moved, so their contacts need new TOIs
            for &handle in &island.bodies {
                let Some(body) = self.bodies.get_mut(handle) else {
                    continue;
                };
                body.flags.remove(BodyFlags::ISLAND);
                if body.body_type != BodyType::Dynamic {
                    continue;
                }
                synchronize_fixtures(body, &mut self.fixtures, &mut self.contact_manager.broad_phase);
                for edge in &body.contact_edges {
                    if let Some(contact) = self.contact_manager.contacts.get_mut(edge.contact) {
                        contact.flags.remove(ContactFlags::TOI | ContactFlags::ISLAND);
                    }
                }
            }

            // contacts created here are handled in the next TOI iteration
            self.find_new_contacts();

            if self.sub_stepping {
                self.step_complete = false;
                break;
            }
        }

        self.island = island;
        self.contact_scratch = handles;
    }

    /// Add the contacts of a TOI body and the bodies they reach. Only
    /// static, kinematic and bullet partners of non-bullet dynamic bodies
    /// take part.
    fn grow_toi_island(&mut self, handle: BodyHandle, min_alpha: f32, island: &mut Island) {
        let Some(body) = self.bodies.get(handle) else {
            return;
        };
        if body.body_type != BodyType::Dynamic {
            return;
        }
        let is_bullet = body.is_bullet();
        let edges = body.contact_edges.clone();

        for edge in edges {
            if island.bodies.len() == 2 * MAX_TOI_CONTACTS || island.contacts.len() == MAX_TOI_CONTACTS {
                break;
            }

            let Some(contact) = self.contact_manager.contacts.get(edge.contact) else {
                continue;
            };
            if contact.flags.contains(ContactFlags::ISLAND) {
                continue;
            }
            let sensor = self.fixtures.get(contact.fixture_a).is_some_and(|f| f.is_sensor)
                || self.fixtures.get(contact.fixture_b).is_some_and(|f| f.is_sensor);
            if sensor {
                continue;
            }

            let Some(other) = self.bodies.get_mut(edge.other) else {
                continue;
            };
            if other.body_type == BodyType::Dynamic && !is_bullet && !other.is_bullet() {
                continue;
            }

            let backup = other.sweep;
            if !other.is_island() {
                other.advance(min_alpha);
            }

            if !self.update_contact(edge.contact) {
                if let Some(other) = self.bodies.get_mut(edge.other) {
                    other.sweep = backup;
                    other.synchronize_transform();
                }
                continue;
            }

            if let Some(contact) = self.contact_manager.contacts.get_mut(edge.contact) {
                contact.flags.insert(ContactFlags::ISLAND);
            }
            island.contacts.push(edge.contact);

            let Some(other) = self.bodies.get_mut(edge.other) else {
                continue;
            };
            if other.is_island() {
                continue;
            }
            other.flags.insert(BodyFlags::ISLAND);
            if other.body_type != BodyType::Static {
                other.set_awake(true);
            }
            island.add_body(edge.other, other);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joint_gear::GearJointDef;
    use crate::joint_revolute::RevoluteJointDef;
    use crate::polygon::PolygonShape;
    use crate::shape::CircleShape;

    fn ground_and_ball(world: &mut World, height: f32) -> (BodyHandle, BodyHandle) {
        let ground = world.create_body(&BodyDef::default()).unwrap();
        world
            .create_fixture(ground, &FixtureDef::new(PolygonShape::new_box(20.0, 0.5)))
            .unwrap();
        let ball = world.create_body(&BodyDef::dynamic(Vec2::new(0.0, height))).unwrap();
        world
            .create_fixture(ball, &FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.5)).with_density(1.0))
            .unwrap();
        (ground, ball)
    }

    #[test]
    fn test_world_def_defaults() {
        let def = WorldDef::default();
        assert_eq!(def.gravity, Vec2::new(0.0, -10.0));
        assert!(def.allow_sleep);
        assert!(def.warm_starting);
        assert!(def.continuous_physics);
        assert!(!def.sub_stepping);
        assert!(def.clear_forces);
    }

    #[test]
    fn test_locked_world_rejects_mutation() {
        let mut world = World::default();
        let body = world.create_body(&BodyDef::dynamic(Vec2::ZERO)).unwrap();

        world.locked = true;
        assert!(matches!(
            world.create_body(&BodyDef::default()),
            Err(PhysicsError::WorldLocked { operation: "create_body" })
        ));
        assert!(world.destroy_body(body).is_err());
        assert!(world
            .create_fixture(body, &FixtureDef::new(CircleShape::new(Vec2::ZERO, 1.0)))
            .is_err());
        assert_eq!(world.body_count(), 1);

        world.locked = false;
        assert!(world.destroy_body(body).is_ok());
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_ball_falls_and_rests_on_ground() {
        let mut world = World::default();
        let (_, ball) = ground_and_ball(&mut world, 4.0);

        for _ in 0..240 {
            world.step(1.0 / 60.0, 8, 3);
        }

        let body = world.body(ball).unwrap();
        // box top at 0.5, ball radius 0.5
        assert!((body.position().y - 1.0).abs() < 0.05, "y = {}", body.position().y);
        assert!(world.contact_count() >= 1);
        assert!(!world.is_locked());
    }

    #[test]
    fn test_resting_body_falls_asleep() {
        let mut world = World::default();
        let (_, ball) = ground_and_ball(&mut world, 1.0);

        for _ in 0..120 {
            world.step(1.0 / 60.0, 8, 3);
        }
        assert!(!world.body(ball).unwrap().is_awake());
    }

    #[test]
    fn test_destroy_body_cascades() {
        let mut world = World::default();
        let (ground, ball) = ground_and_ball(&mut world, 1.0);
        let joint = world
            .create_joint(RevoluteJointDef::initialize(
                ground,
                world.body(ground).unwrap(),
                ball,
                world.body(ball).unwrap(),
                Vec2::new(0.0, 1.0),
            ))
            .unwrap();
        world.step(1.0 / 60.0, 8, 3);

        world.destroy_body(ball).unwrap();
        assert!(world.joint(joint).is_none());
        assert_eq!(world.joint_count(), 0);
        assert_eq!(world.contact_count(), 0);
        assert_eq!(world.proxy_count(), 1);
        assert!(world.body(ground).unwrap().joint_edges().is_empty());
    }

    #[test]
    fn test_gear_joint_pins_its_joints() {
        let mut world = World::new(WorldDef::default().with_gravity(Vec2::ZERO));
        let ground = world.create_body(&BodyDef::default()).unwrap();
        let a = world.create_body(&BodyDef::dynamic(Vec2::new(-2.0, 0.0))).unwrap();
        let b = world.create_body(&BodyDef::dynamic(Vec2::new(2.0, 0.0))).unwrap();

        let rev_a = world
            .create_joint(RevoluteJointDef::initialize(
                ground,
                world.body(ground).unwrap(),
                a,
                world.body(a).unwrap(),
                Vec2::new(-2.0, 0.0),
            ))
            .unwrap();
        let rev_b = world
            .create_joint(RevoluteJointDef::initialize(
                ground,
                world.body(ground).unwrap(),
                b,
                world.body(b).unwrap(),
                Vec2::new(2.0, 0.0),
            ))
            .unwrap();
        let gear = world
            .create_joint(GearJointDef {
                joint1: rev_a,
                joint2: rev_b,
                ratio: 2.0,
                ..GearJointDef::default()
            })
            .unwrap();

        assert!(matches!(world.destroy_joint(rev_a), Err(PhysicsError::JointInUse)));

        // destroying a geared body takes the gear with it
        world.destroy_body(a).unwrap();
        assert!(world.joint(gear).is_none());
        assert!(world.joint(rev_a).is_none());
        assert!(world.joint(rev_b).is_some());
        assert!(world.destroy_joint(rev_b).is_ok());
    }

    #[test]
    fn test_ray_cast_closest_and_query() {
        let mut world = World::default();
        let (ground, ball) = ground_and_ball(&mut world, 5.0);
        let ball_fixture = world.body(ball).unwrap().fixtures()[0];
        let ground_fixture = world.body(ground).unwrap().fixtures()[0];

        let hit = world
            .ray_cast_closest(Vec2::new(0.0, 10.0), Vec2::new(0.0, -10.0))
            .unwrap();
        assert_eq!(hit.fixture, ball_fixture);
        assert!((hit.point.y - 5.5).abs() < 1e-4);
        assert!((hit.normal.y - 1.0).abs() < 1e-4);

        let mut found = Vec::new();
        world.query_aabb(&Aabb::new(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0)), |f| {
            found.push(f);
            true
        });
        assert_eq!(found, vec![ground_fixture]);
    }

    #[test]
    fn test_set_body_type_to_static_stops_motion() {
        let mut world = World::default();
        let body = world
            .create_body(&BodyDef::dynamic(Vec2::ZERO).with_linear_velocity(Vec2::new(3.0, 0.0)))
            .unwrap();
        world
            .create_fixture(body, &FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.5)).with_density(1.0))
            .unwrap();

        world.set_body_type(body, BodyType::Static).unwrap();
        let b = world.body(body).unwrap();
        assert_eq!(b.linear_velocity(), Vec2::ZERO);
        assert_eq!(b.mass(), 0.0);

        world.step(1.0 / 60.0, 8, 3);
        assert_eq!(world.body(body).unwrap().position(), Vec2::ZERO);
    }

    #[test]
    fn test_disabled_body_has_no_proxies() {
        let mut world = World::default();
        let (_, ball) = ground_and_ball(&mut world, 1.0);
        assert_eq!(world.proxy_count(), 2);

        world.set_body_enabled(ball, false).unwrap();
        assert_eq!(world.proxy_count(), 1);
        world.step(1.0 / 60.0, 8, 3);
        assert_eq!(world.contact_count(), 0);

        world.set_body_enabled(ball, true).unwrap();
        assert_eq!(world.proxy_count(), 2);
    }

    #[test]
    fn test_bullet_does_not_tunnel() {
        let mut world = World::new(WorldDef::default().with_gravity(Vec2::ZERO));
        let wall = world.create_body(&BodyDef::default()).unwrap();
        world
            .create_fixture(wall, &FixtureDef::new(PolygonShape::new_box(0.1, 5.0)))
            .unwrap();
        let bullet = world
            .create_body(
                &BodyDef::dynamic(Vec2::new(-5.0, 0.0))
                    .with_linear_velocity(Vec2::new(400.0, 0.0))
                    .with_bullet(true),
            )
            .unwrap();
        world
            .create_fixture(bullet, &FixtureDef::new(CircleShape::new(Vec2::ZERO, 0.1)).with_density(1.0))
            .unwrap();

        for _ in 0..10 {
            world.step(1.0 / 60.0, 8, 3);
        }
        assert!(world.body(bullet).unwrap().position().x < 0.0);
    }

    #[test]
    fn test_shift_origin_moves_bodies() {
        let mut world = World::default();
        let body = world.create_body(&BodyDef::dynamic(Vec2::new(10.0, 5.0))).unwrap();
        world.shift_origin(Vec2::new(10.0, 0.0)).unwrap();
        assert_eq!(world.body(body).unwrap().position(), Vec2::new(0.0, 5.0));
    }
}
