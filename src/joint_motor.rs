//! Motor Joint
//!
//! Drives body B towards a position and angle expressed in body A's frame,
//! with the correction capped by a maximum force and torque.

use crate::body::{Body, BodyHandle};
use crate::error::{ConfigurationError, PhysicsError};
use crate::joint::ensure_non_negative;
use crate::joint_friction::ClampedSolve;
use crate::math::Vec2;
use crate::time_step::SolverData;

/// Motor joint parameters
#[derive(Clone, Debug, PartialEq)]
pub struct MotorJointDef {
    /// First body
    pub body_a: BodyHandle,
    /// Second body
    pub body_b: BodyHandle,
    /// Keep contacts between the bodies
    pub collide_connected: bool,
    /// Application data
    pub user_data: u64,
    /// Target position of body B in body A's frame
    pub linear_offset: Vec2,
    /// Target angle of body B minus angle of body A
    pub angular_offset: f32,
    /// Maximum motor force (N)
    pub max_force: f32,
    /// Maximum motor torque (N*m)
    pub max_torque: f32,
    /// Position correction factor in [0, 1]
    pub correction_factor: f32,
}

impl Default for MotorJointDef {
    fn default() -> Self {
        Self {
            body_a: BodyHandle::default(),
            body_b: BodyHandle::default(),
            collide_connected: false,
            user_data: 0,
            linear_offset: Vec2::ZERO,
            angular_offset: 0.0,
            max_force: 1.0,
            max_torque: 1.0,
            correction_factor: 0.3,
        }
    }
}

impl MotorJointDef {
    /// Motor holding the current relative pose of the two bodies
    #[must_use]
    pub fn initialize(handle_a: BodyHandle, body_a: &Body, handle_b: BodyHandle, body_b: &Body) -> Self {
        Self {
            body_a: handle_a,
            body_b: handle_b,
            linear_offset: body_a.local_point(body_b.position()),
            angular_offset: body_b.angle() - body_a.angle(),
            ..Self::default()
        }
    }
}

fn ensure_unit_interval(factor: f32) -> Result<(), PhysicsError> {
    if (0.0..=1.0).contains(&factor) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidParameter {
            reason: "motor correction factor must lie in [0, 1]",
        }
        .into())
    }
}

/// Motor joint state.
#[derive(Clone, Debug)]
pub struct MotorJoint {
    linear_offset: Vec2,
    angular_offset: f32,
    max_force: f32,
    max_torque: f32,
    correction_factor: f32,
    solver: ClampedSolve,
    linear_error: Vec2,
    angular_error: f32,
}

impl MotorJoint {
    pub(crate) fn new(def: &MotorJointDef) -> Result<Self, PhysicsError> {
        ensure_non_negative(def.max_force, "motor joint max force")?;
        ensure_non_negative(def.max_torque, "motor joint max torque")?;
        ensure_unit_interval(def.correction_factor)?;
        Ok(Self {
            linear_offset: def.linear_offset,
            angular_offset: def.angular_offset,
            max_force: def.max_force,
            max_torque: def.max_torque,
            correction_factor: def.correction_factor,
            solver: ClampedSolve::default(),
            linear_error: Vec2::ZERO,
            angular_error: 0.0,
        })
    }

    /// Target position of body B in body A's frame
    #[must_use]
    pub fn linear_offset(&self) -> Vec2 {
        self.linear_offset
    }

    /// Set the linear target. Returns true when it changed; `World::joint_mut`
    /// already wakes the bodies.
    pub fn set_linear_offset(&mut self, offset: Vec2) -> bool {
        let changed = offset != self.linear_offset;
        self.linear_offset = offset;
        changed
    }

    /// Target relative angle
    #[must_use]
    pub fn angular_offset(&self) -> f32 {
        self.angular_offset
    }

    /// Set the angular target. Returns true when it changed.
    pub fn set_angular_offset(&mut self, offset: f32) -> bool {
        let changed = offset != self.angular_offset;
        self.angular_offset = offset;
        changed
    }

    /// Maximum force
    #[must_use]
    pub fn max_force(&self) -> f32 {
        self.max_force
    }

    /// Set the maximum force; negative values are rejected.
    pub fn set_max_force(&mut self, force: f32) -> Result<(), PhysicsError> {
        ensure_non_negative(force, "motor joint max force")?;
        self.max_force = force;
        Ok(())
    }

    /// Maximum torque
    #[must_use]
    pub fn max_torque(&self) -> f32 {
        self.max_torque
    }

    /// Set the maximum torque; negative values are rejected.
    pub fn set_max_torque(&mut self, torque: f32) -> Result<(), PhysicsError> {
        ensure_non_negative(torque, "motor joint max torque")?;
        self.max_torque = torque;
        Ok(())
    }

    /// Correction factor
    #[must_use]
    pub fn correction_factor(&self) -> f32 {
        self.correction_factor
    }

    /// Set the correction factor; values outside [0, 1] are rejected.
    pub fn set_correction_factor(&mut self, factor: f32) -> Result<(), PhysicsError> {
        ensure_unit_interval(factor)?;
        self.correction_factor = factor;
        Ok(())
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * self.solver.linear_impulse
    }

    pub(crate) fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.solver.angular_impulse
    }

    pub(crate) fn init_velocity_constraints(&mut self, body_a: &Body, body_b: &Body, data: &mut SolverData<'_>) {
        // Anchor A is the offset target, anchor B is body B's origin.
        self.solver
            .prepare(body_a, body_b, self.linear_offset, Vec2::ZERO, data);

        let pa = data.positions[body_a.island_index];
        let pb = data.positions[body_b.island_index];
        self.linear_error = pb.c + self.solver.r_b - pa.c - self.solver.r_a;
        self.angular_error = pb.a - pa.a - self.angular_offset;
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        let bias = data.step.inv_dt * self.correction_factor;
        self.solver.solve(
            data,
            self.max_force,
            self.max_torque,
            bias * self.linear_error,
            bias * self.angular_error,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyDef;

    #[test]
    fn test_defaults() {
        let def = MotorJointDef::default();
        assert_eq!(def.max_force, 1.0);
        assert_eq!(def.max_torque, 1.0);
        assert_eq!(def.correction_factor, 0.3);
        assert!(MotorJoint::new(&def).is_ok());
    }

    #[test]
    fn test_correction_factor_range() {
        let def = MotorJointDef {
            correction_factor: 1.5,
            ..MotorJointDef::default()
        };
        assert!(MotorJoint::new(&def).is_err());

        let mut joint = MotorJoint::new(&MotorJointDef::default()).unwrap();
        assert!(joint.set_correction_factor(-0.1).is_err());
        assert!(joint.set_correction_factor(1.0).is_ok());
    }

    #[test]
    fn test_initialize_captures_relative_pose() {
        let a = Body::new(&BodyDef::default());
        let b = Body::new(&BodyDef::dynamic(Vec2::new(2.0, 3.0)).with_angle(0.5));
        let def = MotorJointDef::initialize(Default::default(), &a, Default::default(), &b);
        assert_eq!(def.linear_offset, Vec2::new(2.0, 3.0));
        assert!((def.angular_offset - 0.5).abs() < 1e-6);

        let mut joint = MotorJoint::new(&def).unwrap();
        assert!(!joint.set_linear_offset(Vec2::new(2.0, 3.0)));
        assert!(joint.set_angular_offset(0.0));
    }
}
