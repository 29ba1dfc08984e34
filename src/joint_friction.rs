//! Friction Joint
//!
//! Top-down friction: linear and angular relative velocity are resisted up to
//! a maximum force and torque. The same clamped solve drives the motor joint.

use crate::body::{Body, BodyHandle};
use crate::error::PhysicsError;
use crate::joint::{ensure_non_negative, SolverBody};
use crate::math::{cross_sv, Mat22, Rot, Vec2};
use crate::time_step::SolverData;

/// Friction joint parameters
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrictionJointDef {
    /// First body
    pub body_a: BodyHandle,
    /// Second body
    pub body_b: BodyHandle,
    /// Keep contacts between the bodies
    pub collide_connected: bool,
    /// Application data
    pub user_data: u64,
    /// Anchor relative to body A's origin
    pub local_anchor_a: Vec2,
    /// Anchor relative to body B's origin
    pub local_anchor_b: Vec2,
    /// Maximum friction force (N)
    pub max_force: f32,
    /// Maximum friction torque (N*m)
    pub max_torque: f32,
}

impl FrictionJointDef {
    /// Friction joint sharing one world anchor
    #[must_use]
    pub fn initialize(handle_a: BodyHandle, body_a: &Body, handle_b: BodyHandle, body_b: &Body, anchor: Vec2) -> Self {
        Self {
            body_a: handle_a,
            body_b: handle_b,
            local_anchor_a: body_a.local_point(anchor),
            local_anchor_b: body_b.local_point(anchor),
            ..Self::default()
        }
    }

    /// Set the force and torque caps
    #[must_use]
    pub fn with_limits(mut self, max_force: f32, max_torque: f32) -> Self {
        self.max_force = max_force;
        self.max_torque = max_torque;
        self
    }
}

/// Clamped point-plus-angle velocity solve shared by the friction and motor
/// joints. Anchors are world-frame offsets from each center of mass.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ClampedSolve {
    pub linear_impulse: Vec2,
    pub angular_impulse: f32,
    a: SolverBody,
    b: SolverBody,
    pub r_a: Vec2,
    pub r_b: Vec2,
    linear_mass: Mat22,
    angular_mass: f32,
}

impl Default for ClampedSolve {
    fn default() -> Self {
        Self {
            linear_impulse: Vec2::ZERO,
            angular_impulse: 0.0,
            a: SolverBody::default(),
            b: SolverBody::default(),
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            linear_mass: Mat22::ZERO,
            angular_mass: 0.0,
        }
    }
}

impl ClampedSolve {
    /// Cache masses and lever arms, then warm start. `local_a` and `local_b`
    /// are body-frame anchors.
    pub fn prepare(&mut self, body_a: &Body, body_b: &Body, local_a: Vec2, local_b: Vec2, data: &mut SolverData<'_>) {
        self.a = SolverBody::from_body(body_a);
        self.b = SolverBody::from_body(body_b);
        let (a, b) = (self.a, self.b);

        let qa = Rot::new(data.positions[a.index].a);
        let qb = Rot::new(data.positions[b.index].a);
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];

        self.r_a = qa.apply(local_a - a.local_center);
        self.r_b = qb.apply(local_b - b.local_center);
        let (ra, rb) = (self.r_a, self.r_b);

        let (ma, mb, ia, ib) = (a.inv_mass, b.inv_mass, a.inv_i, b.inv_i);
        let mut k = Mat22::ZERO;
        k.ex.x = ma + mb + ia * ra.y * ra.y + ib * rb.y * rb.y;
        k.ex.y = -ia * ra.x * ra.y - ib * rb.x * rb.y;
        k.ey.x = k.ex.y;
        k.ey.y = ma + mb + ia * ra.x * ra.x + ib * rb.x * rb.x;
        self.linear_mass = k.inverse();

        self.angular_mass = ia + ib;
        if self.angular_mass > 0.0 {
            self.angular_mass = 1.0 / self.angular_mass;
        }

        if data.step.warm_starting {
            self.linear_impulse *= data.step.dt_ratio;
            self.angular_impulse *= data.step.dt_ratio;

            let p = self.linear_impulse;
            va.v -= ma * p;
            va.w -= ia * (ra.cross(p) + self.angular_impulse);
            vb.v += mb * p;
            vb.w += ib * (rb.cross(p) + self.angular_impulse);
        } else {
            self.linear_impulse = Vec2::ZERO;
            self.angular_impulse = 0.0;
        }

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    /// One iteration. The biases are added to the velocity errors.
    pub fn solve(
        &mut self,
        data: &mut SolverData<'_>,
        max_force: f32,
        max_torque: f32,
        linear_bias: Vec2,
        angular_bias: f32,
    ) {
        let (a, b) = (self.a, self.b);
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];
        let h = data.step.dt;

        {
            let cdot = vb.w - va.w + angular_bias;
            let impulse = -self.angular_mass * cdot;

            let old = self.angular_impulse;
            let max_impulse = h * max_torque;
            self.angular_impulse = (old + impulse).clamp(-max_impulse, max_impulse);
            let impulse = self.angular_impulse - old;

            va.w -= a.inv_i * impulse;
            vb.w += b.inv_i * impulse;
        }

        {
            let cdot = vb.v + cross_sv(vb.w, self.r_b) - va.v - cross_sv(va.w, self.r_a) + linear_bias;
            let impulse = -self.linear_mass.mul_vec(cdot);

            let old = self.linear_impulse;
            self.linear_impulse += impulse;
            let max_impulse = h * max_force;
            if self.linear_impulse.length_squared() > max_impulse * max_impulse {
                self.linear_impulse.normalize_mut();
                self.linear_impulse *= max_impulse;
            }
            let impulse = self.linear_impulse - old;

            va.v -= a.inv_mass * impulse;
            va.w -= a.inv_i * self.r_a.cross(impulse);
            vb.v += b.inv_mass * impulse;
            vb.w += b.inv_i * self.r_b.cross(impulse);
        }

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }
}

/// Friction joint state.
#[derive(Clone, Debug)]
pub struct FrictionJoint {
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    max_force: f32,
    max_torque: f32,
    solver: ClampedSolve,
}

impl FrictionJoint {
    pub(crate) fn new(def: &FrictionJointDef) -> Result<Self, PhysicsError> {
        ensure_non_negative(def.max_force, "friction joint max force")?;
        ensure_non_negative(def.max_torque, "friction joint max torque")?;
        Ok(Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            max_force: def.max_force,
            max_torque: def.max_torque,
            solver: ClampedSolve::default(),
        })
    }

    /// Anchor relative to body A
    #[must_use]
    pub fn local_anchor_a(&self) -> Vec2 {
        self.local_anchor_a
    }

    /// Anchor relative to body B
    #[must_use]
    pub fn local_anchor_b(&self) -> Vec2 {
        self.local_anchor_b
    }

    /// Maximum friction force
    #[must_use]
    pub fn max_force(&self) -> f32 {
        self.max_force
    }

    /// Set the maximum friction force; negative values are rejected.
    pub fn set_max_force(&mut self, force: f32) -> Result<(), PhysicsError> {
        ensure_non_negative(force, "friction joint max force")?;
        self.max_force = force;
        Ok(())
    }

    /// Maximum friction torque
    #[must_use]
    pub fn max_torque(&self) -> f32 {
        self.max_torque
    }

    /// Set the maximum friction torque; negative values are rejected.
    pub fn set_max_torque(&mut self, torque: f32) -> Result<(), PhysicsError> {
        ensure_non_negative(torque, "friction joint max torque")?;
        self.max_torque = torque;
        Ok(())
    }

    pub(crate) fn anchor_a(&self, body_a: &Body) -> Vec2 {
        body_a.world_point(self.local_anchor_a)
    }

    pub(crate) fn anchor_b(&self, body_b: &Body) -> Vec2 {
        body_b.world_point(self.local_anchor_b)
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * self.solver.linear_impulse
    }

    pub(crate) fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.solver.angular_impulse
    }

    pub(crate) fn init_velocity_constraints(&mut self, body_a: &Body, body_b: &Body, data: &mut SolverData<'_>) {
        self.solver
            .prepare(body_a, body_b, self.local_anchor_a, self.local_anchor_b, data);
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        self.solver
            .solve(data, self.max_force, self.max_torque, Vec2::ZERO, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyDef;
    use crate::time_step::{Position, TimeStep, Velocity};

    #[test]
    fn test_negative_torque_rejected() {
        let def = FrictionJointDef::default().with_limits(1.0, -1.0);
        assert!(FrictionJoint::new(&def).is_err());
    }

    #[test]
    fn test_friction_caps_impulse() {
        let mut ground = Body::new(&BodyDef::default());
        ground.island_index = 0;
        let mut body = Body::new(&BodyDef::dynamic(Vec2::ZERO));
        body.island_index = 1;

        let def = FrictionJointDef::default().with_limits(1.0, 0.0);
        let mut joint = FrictionJoint::new(&def).unwrap();

        let step = TimeStep {
            dt: 0.1,
            inv_dt: 10.0,
            dt_ratio: 1.0,
            velocity_iterations: 8,
            position_iterations: 3,
            warm_starting: true,
        };
        let mut positions = vec![Position::default(); 2];
        let mut velocities = vec![Velocity::default(); 2];
        velocities[1].v = Vec2::new(100.0, 0.0);
        let mut data = SolverData {
            step,
            positions: &mut positions,
            velocities: &mut velocities,
        };

        joint.init_velocity_constraints(&ground, &body, &mut data);
        joint.solve_velocity_constraints(&mut data);

        assert!((joint.solver.linear_impulse.length() - 0.1).abs() < 1e-5);
        assert!(data.velocities[1].v.x < 100.0);
        assert!(data.velocities[1].v.x > 99.0);
    }
}
