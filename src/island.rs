//! Island Solver
//!
//! An island is a connected group of awake bodies joined by touching
//! contacts and enabled joints. Islands are independent, so each one is
//! integrated and solved on its own and can go to sleep as a unit.
//!
//! # Discrete solve
//!
//! 1. Integrate velocities (gravity, forces, Pade damping)
//! 2. Initialize contact and joint constraints, warm start
//! 3. Velocity iterations, joints before contacts
//! 4. Integrate positions with the per-step translation/rotation clamp
//! 5. Position iterations with early exit
//! 6. Write back, report post-solve impulses, update sleep timers
//!
//! Static bodies join islands to anchor them but never grow an island, and
//! their island flag is cleared after each island so they can join the next.

use slotmap::SlotMap;

use crate::body::{Body, BodyFlags, BodyHandle, BodyType};
use crate::contact::{Contact, ContactFlags, ContactHandle};
use crate::contact_solver::ContactSolver;
use crate::fixture::{Fixture, FixtureHandle};
use crate::joint::{Joint, JointHandle};
use crate::math::Vec2;
use crate::profiling::{Profile, Timer};
use crate::settings::{
    ANGULAR_SLEEP_TOLERANCE, LINEAR_SLEEP_TOLERANCE, MAX_ROTATION, MAX_ROTATION_SQUARED, MAX_TRANSLATION,
    MAX_TRANSLATION_SQUARED, TIME_TO_SLEEP,
};
use crate::stack_allocator::StackAllocator;
use crate::time_step::{Position, SolverData, TimeStep, Velocity};
use crate::world_callbacks::ContactListener;

/// Borrowed world storage an island operates on.
pub(crate) struct IslandWorld<'a> {
    pub bodies: &'a mut SlotMap<BodyHandle, Body>,
    pub fixtures: &'a SlotMap<FixtureHandle, Fixture>,
    pub contacts: &'a mut SlotMap<ContactHandle, Contact>,
    pub joints: &'a mut SlotMap<JointHandle, Joint>,
    pub listener: Option<&'a mut (dyn ContactListener + 'static)>,
}

/// Per-step scratch buffers for island position and velocity state.
#[derive(Debug)]
pub(crate) struct SolverStacks {
    pub positions: StackAllocator<Position>,
    pub velocities: StackAllocator<Velocity>,
}

impl Default for SolverStacks {
    fn default() -> Self {
        Self {
            positions: StackAllocator::new(),
            velocities: StackAllocator::new(),
        }
    }
}

/// Bodies, contacts and joints of one island.
#[derive(Debug, Default)]
pub(crate) struct Island {
    pub bodies: Vec<BodyHandle>,
    pub contacts: Vec<ContactHandle>,
    pub joints: Vec<JointHandle>,
}

/// Integrate a position, first clamping the velocity so one step moves at
/// most `MAX_TRANSLATION` and turns at most `MAX_ROTATION`.
fn integrate_position(h: f32, p: &mut Position, v: &mut Velocity) {
    let translation = h * v.v;
    if translation.dot(translation) > MAX_TRANSLATION_SQUARED {
        v.v *= MAX_TRANSLATION / translation.length();
    }

    let rotation = h * v.w;
    if rotation * rotation > MAX_ROTATION_SQUARED {
        v.w *= MAX_ROTATION / rotation.abs();
    }

    p.c += h * v.v;
    p.a += h * v.w;
}

impl Island {
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.contacts.clear();
        self.joints.clear();
    }

    pub fn add_body(&mut self, handle: BodyHandle, body: &mut Body) {
        body.island_index = self.bodies.len();
        self.bodies.push(handle);
    }

    /// Grow the island from `seed` by depth-first search over touching,
    /// enabled, non-sensor contacts and enabled joints. `stack` is scratch.
    pub fn flood(&mut self, seed: BodyHandle, world: &mut IslandWorld<'_>, stack: &mut Vec<BodyHandle>) {
        self.clear();
        stack.clear();

        let Some(body) = world.bodies.get_mut(seed) else {
            return;
        };
        body.flags.insert(BodyFlags::ISLAND);
        stack.push(seed);

        while let Some(handle) = stack.pop() {
            let Some(body) = world.bodies.get_mut(handle) else {
                continue;
            };
            debug_assert!(body.is_enabled());
            self.add_body(handle, body);

            // static bodies anchor islands without connecting them
            if body.body_type == BodyType::Static {
                continue;
            }
            body.flags.insert(BodyFlags::AWAKE);

            let contact_edges = body.contact_edges.clone();
            let joint_edges = body.joint_edges.clone();

            for edge in contact_edges {
                let Some(contact) = world.contacts.get_mut(edge.contact) else {
                    continue;
                };
                if contact.flags.contains(ContactFlags::ISLAND) {
                    continue;
                }
                if !contact.is_enabled() || !contact.is_touching() {
                    continue;
                }
                let sensor = world.fixtures.get(contact.fixture_a).is_some_and(Fixture::is_sensor)
                    || world.fixtures.get(contact.fixture_b).is_some_and(Fixture::is_sensor);
                if sensor {
                    continue;
                }

                contact.flags.insert(ContactFlags::ISLAND);
                self.contacts.push(edge.contact);
                Self::visit(edge.other, world.bodies, stack);
            }

            for edge in joint_edges {
                let Some(joint) = world.joints.get_mut(edge.joint) else {
                    continue;
                };
                if joint.island {
                    continue;
                }
                if !joint.is_enabled(world.bodies) {
                    continue;
                }

                joint.island = true;
                self.joints.push(edge.joint);
                Self::visit(edge.other, world.bodies, stack);
            }
        }
    }

    fn visit(handle: BodyHandle, bodies: &mut SlotMap<BodyHandle, Body>, stack: &mut Vec<BodyHandle>) {
        if let Some(other) = bodies.get_mut(handle) {
            if !other.flags.contains(BodyFlags::ISLAND) {
                other.flags.insert(BodyFlags::ISLAND);
                stack.push(handle);
            }
        }
    }

    /// Clear the island flag of static members so other islands can use them.
    pub fn release_static_bodies(&self, bodies: &mut SlotMap<BodyHandle, Body>) {
        for &handle in &self.bodies {
            if let Some(body) = bodies.get_mut(handle) {
                if body.body_type == BodyType::Static {
                    body.flags.remove(BodyFlags::ISLAND);
                }
            }
        }
    }

    /// Discrete solve of the island. Returns the solver phase timings.
    pub fn solve(
        &self,
        step: &TimeStep,
        gravity: Vec2,
        allow_sleep: bool,
        world: &mut IslandWorld<'_>,
        stacks: &mut SolverStacks,
    ) -> Profile {
        let mut profile = Profile::default();
        let h = step.dt;
        let count = self.bodies.len();

        let position_block = stacks.positions.alloc(count);
        let velocity_block = stacks.velocities.alloc(count);
        let positions = stacks.positions.get_mut(&position_block);
        let velocities = stacks.velocities.get_mut(&velocity_block);

        for (i, &handle) in self.bodies.iter().enumerate() {
            let Some(b) = world.bodies.get_mut(handle) else {
                continue;
            };
            let c = b.sweep.c;
            let a = b.sweep.a;
            let mut v = b.linear_velocity;
            let mut w = b.angular_velocity;

            // sweep start for continuous collision
            b.sweep.c0 = b.sweep.c;
            b.sweep.a0 = b.sweep.a;

            if b.body_type == BodyType::Dynamic {
                v += h * b.inv_mass * (b.gravity_scale * b.mass * gravity + b.force);
                w += h * b.inv_i * b.torque;

                // Pade approximation of exp(-c * dt)
                v *= 1.0 / (1.0 + h * b.linear_damping);
                w *= 1.0 / (1.0 + h * b.angular_damping);
            }

            positions[i] = Position { c, a };
            velocities[i] = Velocity { v, w };
        }

        let mut timer = Timer::new();

        let mut contact_solver = ContactSolver::new(*step, &self.contacts, world.contacts, world.fixtures, world.bodies);
        contact_solver.initialize_velocity_constraints(world.contacts, positions, velocities);
        if step.warm_starting {
            contact_solver.warm_start(velocities);
        }

        let mut data = SolverData {
            step: *step,
            positions,
            velocities,
        };

        for &handle in &self.joints {
            if let Some(joint) = world.joints.get_mut(handle) {
                joint.init_velocity_constraints(world.bodies, &mut data);
            }
        }
        profile.solve_init = timer.milliseconds();

        timer.reset();
        for _ in 0..step.velocity_iterations {
            for &handle in &self.joints {
                if let Some(joint) = world.joints.get_mut(handle) {
                    joint.solve_velocity_constraints(&mut data);
                }
            }
            contact_solver.solve_velocity_constraints(data.velocities);
        }
        contact_solver.store_impulses(world.contacts);
        profile.solve_velocity = timer.milliseconds();

        for (p, v) in data.positions.iter_mut().zip(data.velocities.iter_mut()) {
            integrate_position(h, p, v);
        }

        timer.reset();
        let mut position_solved = false;
        for _ in 0..step.position_iterations {
            let contacts_okay = contact_solver.solve_position_constraints(data.positions);

            let mut joints_okay = true;
            for &handle in &self.joints {
                if let Some(joint) = world.joints.get_mut(handle) {
                    let okay = joint.solve_position_constraints(&mut data);
                    joints_okay = joints_okay && okay;
                }
            }

            if contacts_okay && joints_okay {
                position_solved = true;
                break;
            }
        }

        for (i, &handle) in self.bodies.iter().enumerate() {
            if let Some(body) = world.bodies.get_mut(handle) {
                body.sweep.c = data.positions[i].c;
                body.sweep.a = data.positions[i].a;
                body.linear_velocity = data.velocities[i].v;
                body.angular_velocity = data.velocities[i].w;
                body.synchronize_transform();
            }
        }
        profile.solve_position = timer.milliseconds();

        stacks.velocities.free(velocity_block);
        stacks.positions.free(position_block);

        self.report(&contact_solver, world);

        if allow_sleep {
            self.update_sleep(h, position_solved, world.bodies);
        }

        profile
    }

    fn update_sleep(&self, h: f32, position_solved: bool, bodies: &mut SlotMap<BodyHandle, Body>) {
        let lin_tol_sqr = LINEAR_SLEEP_TOLERANCE * LINEAR_SLEEP_TOLERANCE;
        let ang_tol_sqr = ANGULAR_SLEEP_TOLERANCE * ANGULAR_SLEEP_TOLERANCE;
        let mut min_sleep_time = f32::MAX;

        for &handle in &self.bodies {
            let Some(b) = bodies.get_mut(handle) else {
                continue;
            };
            if b.body_type == BodyType::Static {
                continue;
            }

            if !b.flags.contains(BodyFlags::AUTO_SLEEP)
                || b.angular_velocity * b.angular_velocity > ang_tol_sqr
                || b.linear_velocity.dot(b.linear_velocity) > lin_tol_sqr
            {
                b.sleep_time = 0.0;
                min_sleep_time = 0.0;
            } else {
                b.sleep_time += h;
                min_sleep_time = min_sleep_time.min(b.sleep_time);
            }
        }

        if min_sleep_time >= TIME_TO_SLEEP && position_solved {
            tracing::trace!(bodies = self.bodies.len(), "island going to sleep");
            for &handle in &self.bodies {
                if let Some(b) = bodies.get_mut(handle) {
                    b.set_awake(false);
                }
            }
        }
    }

    /// Solve a TOI sub-step. Only the bodies at `toi_index_a` and
    /// `toi_index_b` are moved by the position pass; the island holds them
    /// plus the bodies they touch.
    pub fn solve_toi(
        &self,
        sub_step: &TimeStep,
        toi_index_a: usize,
        toi_index_b: usize,
        world: &mut IslandWorld<'_>,
        stacks: &mut SolverStacks,
    ) {
        debug_assert!(toi_index_a < self.bodies.len());
        debug_assert!(toi_index_b < self.bodies.len());
        let count = self.bodies.len();

        let position_block = stacks.positions.alloc(count);
        let velocity_block = stacks.velocities.alloc(count);
        let positions = stacks.positions.get_mut(&position_block);
        let velocities = stacks.velocities.get_mut(&velocity_block);

        for (i, &handle) in self.bodies.iter().enumerate() {
            if let Some(b) = world.bodies.get(handle) {
                positions[i] = Position {
                    c: b.sweep.c,
                    a: b.sweep.a,
                };
                velocities[i] = Velocity {
                    v: b.linear_velocity,
                    w: b.angular_velocity,
                };
            }
        }

        let mut contact_solver =
            ContactSolver::new(*sub_step, &self.contacts, world.contacts, world.fixtures, world.bodies);

        for _ in 0..sub_step.position_iterations {
            if contact_solver.solve_toi_position_constraints(positions, toi_index_a, toi_index_b) {
                break;
            }
        }

        // leap of faith to the new safe state
        for index in [toi_index_a, toi_index_b] {
            if let Some(b) = world.bodies.get_mut(self.bodies[index]) {
                b.sweep.c0 = positions[index].c;
                b.sweep.a0 = positions[index].a;
            }
        }

        // TOI impulses are neither warm started nor stored
        contact_solver.initialize_velocity_constraints(world.contacts, positions, velocities);
        for _ in 0..sub_step.velocity_iterations {
            contact_solver.solve_velocity_constraints(velocities);
        }

        let h = sub_step.dt;
        for (i, &handle) in self.bodies.iter().enumerate() {
            let (p, v) = (&mut positions[i], &mut velocities[i]);
            integrate_position(h, p, v);

            if let Some(body) = world.bodies.get_mut(handle) {
                body.sweep.c = p.c;
                body.sweep.a = p.a;
                body.linear_velocity = v.v;
                body.angular_velocity = v.w;
                body.synchronize_transform();
            }
        }

        stacks.velocities.free(velocity_block);
        stacks.positions.free(position_block);

        self.report(&contact_solver, world);
    }

    fn report(&self, solver: &ContactSolver, world: &mut IslandWorld<'_>) {
        let Some(listener) = world.listener.as_deref_mut() else {
            return;
        };
        for i in 0..solver.len() {
            let (handle, impulse) = solver.impulse(i);
            if let Some(contact) = world.contacts.get(handle) {
                listener.post_solve(contact, &impulse);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyDef;

    fn world_parts() -> (
        SlotMap<BodyHandle, Body>,
        SlotMap<FixtureHandle, Fixture>,
        SlotMap<ContactHandle, Contact>,
        SlotMap<JointHandle, Joint>,
    ) {
        (SlotMap::with_key(), SlotMap::with_key(), SlotMap::with_key(), SlotMap::with_key())
    }

    fn step(dt: f32) -> TimeStep {
        TimeStep {
            dt,
            inv_dt: 1.0 / dt,
            dt_ratio: 1.0,
            velocity_iterations: 8,
            position_iterations: 3,
            warm_starting: true,
        }
    }

    #[test]
    fn test_integrate_position_clamps_translation() {
        let mut p = Position::default();
        let mut v = Velocity {
            v: Vec2::new(1000.0, 0.0),
            w: 0.0,
        };
        integrate_position(0.1, &mut p, &mut v);
        assert!((p.c.x - MAX_TRANSLATION).abs() < 1e-4);
        assert!((v.v.x - MAX_TRANSLATION / 0.1).abs() < 1e-2);
    }

    #[test]
    fn test_integrate_position_clamps_rotation() {
        let mut p = Position::default();
        let mut v = Velocity {
            v: Vec2::ZERO,
            w: -100.0,
        };
        integrate_position(0.1, &mut p, &mut v);
        assert!((p.a + MAX_ROTATION).abs() < 1e-4);
    }

    #[test]
    fn test_gravity_and_damping() {
        let (mut bodies, fixtures, mut contacts, mut joints) = world_parts();
        let handle = bodies.insert(Body::new(&BodyDef::dynamic(Vec2::ZERO).with_damping(1.0, 0.0)));

        let mut island = Island::default();
        let mut world = IslandWorld {
            bodies: &mut bodies,
            fixtures: &fixtures,
            contacts: &mut contacts,
            joints: &mut joints,
            listener: None,
        };
        let mut stack = Vec::new();
        island.flood(handle, &mut world, &mut stack);
        assert_eq!(island.bodies, vec![handle]);

        let mut stacks = SolverStacks::default();
        island.solve(&step(0.1), Vec2::new(0.0, -10.0), false, &mut world, &mut stacks);

        let body = &bodies[handle];
        // v = -1 / (1 + 0.1)
        let v = -1.0 / 1.1;
        assert!((body.linear_velocity().y - v).abs() < 1e-5);
        assert!((body.position().y - 0.1 * v).abs() < 1e-5);
        assert_eq!(stacks.positions.live_blocks(), 0);
        assert_eq!(stacks.velocities.live_blocks(), 0);
    }

    #[test]
    fn test_translation_is_clamped_per_step() {
        let (mut bodies, fixtures, mut contacts, mut joints) = world_parts();
        let handle = bodies.insert(Body::new(&BodyDef::dynamic(Vec2::ZERO).with_damping(1.0, 0.0)));

        let mut island = Island::default();
        let mut world = IslandWorld {
            bodies: &mut bodies,
            fixtures: &fixtures,
            contacts: &mut contacts,
            joints: &mut joints,
            listener: None,
        };
        let mut stack = Vec::new();
        island.flood(handle, &mut world, &mut stack);

        let mut stacks = SolverStacks::default();
        island.solve(&step(1.0), Vec2::new(0.0, -10.0), false, &mut world, &mut stacks);

        // unclamped this would move 5 m; MAX_TRANSLATION caps it at 2 m
        let body = &bodies[handle];
        assert!((body.linear_velocity().y + MAX_TRANSLATION).abs() < 1e-5);
        assert!((body.position().y + MAX_TRANSLATION).abs() < 1e-5);
    }

    #[test]
    fn test_resting_island_falls_asleep() {
        let (mut bodies, fixtures, mut contacts, mut joints) = world_parts();
        let handle = bodies.insert(Body::new(&BodyDef::dynamic(Vec2::ZERO)));
        let mut island = Island::default();
        let mut stacks = SolverStacks::default();
        let mut stack = Vec::new();

        let dt = 1.0 / 60.0;
        let mut steps = 0;
        while bodies[handle].is_awake() && steps < 100 {
            let mut world = IslandWorld {
                bodies: &mut bodies,
                fixtures: &fixtures,
                contacts: &mut contacts,
                joints: &mut joints,
                listener: None,
            };
            island.flood(handle, &mut world, &mut stack);
            island.solve(&step(dt), Vec2::ZERO, true, &mut world, &mut stacks);
            bodies[handle].flags.remove(BodyFlags::ISLAND);
            steps += 1;
        }

        assert!(!bodies[handle].is_awake());
        // TIME_TO_SLEEP at 60 Hz
        assert!((30..=32).contains(&steps));
    }

    #[test]
    fn test_static_body_does_not_grow_island() {
        let (mut bodies, fixtures, mut contacts, mut joints) = world_parts();
        let ground = bodies.insert(Body::new(&BodyDef::default()));
        let mut island = Island::default();
        let mut world = IslandWorld {
            bodies: &mut bodies,
            fixtures: &fixtures,
            contacts: &mut contacts,
            joints: &mut joints,
            listener: None,
        };
        let mut stack = Vec::new();
        island.flood(ground, &mut world, &mut stack);
        assert_eq!(island.bodies.len(), 1);
        island.release_static_bodies(world.bodies);
        assert!(!bodies[ground].flags.contains(BodyFlags::ISLAND));
    }
}
