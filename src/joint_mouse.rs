//! Mouse Joint
//!
//! Soft constraint pulling a point on body B towards a world target, capped
//! by a maximum force. Body A only anchors the joint in the graph.

use crate::body::{Body, BodyHandle};
use crate::error::PhysicsError;
use crate::joint::{ensure_non_negative, soft_constraint, SolverBody};
use crate::math::{cross_sv, Mat22, Rot, Vec2};
use crate::time_step::SolverData;

/// Angular velocity retained per step while dragging.
const ANGULAR_DRAG: f32 = 0.98;

/// Mouse joint parameters
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MouseJointDef {
    /// Anchor body, usually static ground
    pub body_a: BodyHandle,
    /// Dragged body
    pub body_b: BodyHandle,
    /// Keep contacts between the bodies
    pub collide_connected: bool,
    /// Application data
    pub user_data: u64,
    /// Initial target in world coordinates; also fixes the grab point on B
    pub target: Vec2,
    /// Maximum constraint force (N)
    pub max_force: f32,
    /// Linear stiffness (N/m)
    pub stiffness: f32,
    /// Linear damping (N*s/m)
    pub damping: f32,
}

/// Mouse joint state.
#[derive(Clone, Debug)]
pub struct MouseJoint {
    local_anchor_b: Vec2,
    target: Vec2,
    stiffness: f32,
    damping: f32,
    beta: f32,
    impulse: Vec2,
    max_force: f32,
    gamma: f32,

    b: SolverBody,
    r_b: Vec2,
    mass: Mat22,
    c: Vec2,
}

impl MouseJoint {
    pub(crate) fn new(def: &MouseJointDef, body_b: &Body) -> Result<Self, PhysicsError> {
        ensure_non_negative(def.max_force, "mouse joint max force")?;
        ensure_non_negative(def.stiffness, "mouse joint stiffness")?;
        ensure_non_negative(def.damping, "mouse joint damping")?;
        Ok(Self {
            local_anchor_b: body_b.transform().apply_inv(def.target),
            target: def.target,
            stiffness: def.stiffness,
            damping: def.damping,
            beta: 0.0,
            impulse: Vec2::ZERO,
            max_force: def.max_force,
            gamma: 0.0,
            b: SolverBody::default(),
            r_b: Vec2::ZERO,
            mass: Mat22::ZERO,
            c: Vec2::ZERO,
        })
    }

    /// World target
    #[must_use]
    pub fn target(&self) -> Vec2 {
        self.target
    }

    /// Move the target. Reach the joint through `World::joint_mut` so body B wakes.
    pub fn set_target(&mut self, target: Vec2) {
        self.target = target;
    }

    /// Maximum force
    #[must_use]
    pub fn max_force(&self) -> f32 {
        self.max_force
    }

    /// Set the maximum force
    pub fn set_max_force(&mut self, force: f32) {
        self.max_force = force;
    }

    /// Stiffness
    #[must_use]
    pub fn stiffness(&self) -> f32 {
        self.stiffness
    }

    /// Set stiffness
    pub fn set_stiffness(&mut self, stiffness: f32) {
        self.stiffness = stiffness;
    }

    /// Damping
    #[must_use]
    pub fn damping(&self) -> f32 {
        self.damping
    }

    /// Set damping
    pub fn set_damping(&mut self, damping: f32) {
        self.damping = damping;
    }

    pub(crate) fn anchor_b(&self, body_b: &Body) -> Vec2 {
        body_b.world_point(self.local_anchor_b)
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * self.impulse
    }

    pub(crate) fn shift_origin(&mut self, new_origin: Vec2) {
        self.target -= new_origin;
    }

    pub(crate) fn init_velocity_constraints(&mut self, _body_a: &Body, body_b: &Body, data: &mut SolverData<'_>) {
        self.b = SolverBody::from_body(body_b);
        let b = self.b;

        let pb = data.positions[b.index];
        let mut vb = data.velocities[b.index];

        let h = data.step.dt;
        let (gamma, _) = soft_constraint(0.0, self.stiffness, self.damping, h);
        self.gamma = gamma;
        self.beta = h * self.stiffness * gamma;

        self.r_b = Rot::new(pb.a).apply(self.local_anchor_b - b.local_center);
        let rb = self.r_b;

        let mut k = Mat22::ZERO;
        k.ex.x = b.inv_mass + b.inv_i * rb.y * rb.y + gamma;
        k.ex.y = -b.inv_i * rb.x * rb.y;
        k.ey.x = k.ex.y;
        k.ey.y = b.inv_mass + b.inv_i * rb.x * rb.x + gamma;
        self.mass = k.inverse();

        self.c = self.beta * (pb.c + rb - self.target);

        vb.w *= ANGULAR_DRAG;

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;
            vb.v += b.inv_mass * self.impulse;
            vb.w += b.inv_i * rb.cross(self.impulse);
        } else {
            self.impulse = Vec2::ZERO;
        }

        data.velocities[b.index] = vb;
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        let b = self.b;
        let mut vb = data.velocities[b.index];

        let cdot = vb.v + cross_sv(vb.w, self.r_b);
        let impulse = self.mass.mul_vec(-(cdot + self.c + self.gamma * self.impulse));

        let old = self.impulse;
        self.impulse += impulse;
        let max_impulse = data.step.dt * self.max_force;
        if self.impulse.length_squared() > max_impulse * max_impulse {
            self.impulse *= max_impulse / self.impulse.length();
        }
        let impulse = self.impulse - old;

        vb.v += b.inv_mass * impulse;
        vb.w += b.inv_i * self.r_b.cross(impulse);

        data.velocities[b.index] = vb;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyDef;

    #[test]
    fn test_grab_point_in_body_frame() {
        let body = Body::new(&BodyDef::dynamic(Vec2::new(2.0, 1.0)));
        let def = MouseJointDef {
            target: Vec2::new(3.0, 1.0),
            max_force: 100.0,
            ..MouseJointDef::default()
        };
        let mut joint = MouseJoint::new(&def, &body).unwrap();
        assert!((joint.local_anchor_b - Vec2::new(1.0, 0.0)).length() < 1e-6);
        assert_eq!(joint.anchor_b(&body), Vec2::new(3.0, 1.0));

        joint.shift_origin(Vec2::new(1.0, 0.0));
        assert_eq!(joint.target(), Vec2::new(2.0, 1.0));
    }

    #[test]
    fn test_negative_force_rejected() {
        let body = Body::new(&BodyDef::dynamic(Vec2::ZERO));
        let def = MouseJointDef {
            max_force: -1.0,
            ..MouseJointDef::default()
        };
        assert!(MouseJoint::new(&def, &body).is_err());
    }
}
