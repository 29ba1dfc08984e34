//! Revolute Joint
//!
//! Pins two bodies at a shared anchor. Relative rotation is free unless the
//! angular limit or the motor is enabled.

use crate::body::{Body, BodyHandle};
use crate::error::{ConfigurationError, PhysicsError};
use crate::joint::{LimitState, SolverBody};
use crate::math::{cross_sv, Mat22, Rot, Vec2};
use crate::settings::{ANGULAR_SLOP, LINEAR_SLOP, MAX_ANGULAR_CORRECTION};
use crate::time_step::SolverData;

/// Revolute joint parameters
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RevoluteJointDef {
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
    /// `angle_b - angle_a` at zero joint angle
    pub reference_angle: f32,
    /// Enable the angular limit
    pub enable_limit: bool,
    /// Lower angle (radians)
    pub lower_angle: f32,
    /// Upper angle (radians)
    pub upper_angle: f32,
    /// Enable the motor
    pub enable_motor: bool,
    /// Target relative angular speed (rad/s)
    pub motor_speed: f32,
    /// Maximum motor torque (N*m)
    pub max_motor_torque: f32,
}

impl RevoluteJointDef {
    /// Revolute joint at a world anchor, with the reference angle taken from
    /// the current configuration.
    #[must_use]
    pub fn initialize(handle_a: BodyHandle, body_a: &Body, handle_b: BodyHandle, body_b: &Body, anchor: Vec2) -> Self {
        Self {
            body_a: handle_a,
            body_b: handle_b,
            local_anchor_a: body_a.local_point(anchor),
            local_anchor_b: body_b.local_point(anchor),
            reference_angle: body_b.angle() - body_a.angle(),
            ..Self::default()
        }
    }

    /// Angular limit
    #[must_use]
    pub fn with_limit(mut self, lower: f32, upper: f32) -> Self {
        self.enable_limit = true;
        self.lower_angle = lower;
        self.upper_angle = upper;
        self
    }

    /// Motor
    #[must_use]
    pub fn with_motor(mut self, speed: f32, max_torque: f32) -> Self {
        self.enable_motor = true;
        self.motor_speed = speed;
        self.max_motor_torque = max_torque;
        self
    }
}

/// Revolute joint state.
#[derive(Clone, Debug)]
pub struct RevoluteJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    pub(crate) reference_angle: f32,
    impulse: Vec2,
    motor_impulse: f32,
    lower_impulse: f32,
    upper_impulse: f32,
    enable_motor: bool,
    max_motor_torque: f32,
    motor_speed: f32,
    enable_limit: bool,
    lower_angle: f32,
    upper_angle: f32,

    a: SolverBody,
    b: SolverBody,
    r_a: Vec2,
    r_b: Vec2,
    k: Mat22,
    angle: f32,
    axial_mass: f32,
}

impl RevoluteJoint {
    pub(crate) fn new(def: &RevoluteJointDef) -> Result<Self, PhysicsError> {
        if def.lower_angle > def.upper_angle {
            return Err(ConfigurationError::InvalidParameter {
                reason: "revolute joint lower angle exceeds upper angle",
            }
            .into());
        }
        Ok(Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            reference_angle: def.reference_angle,
            impulse: Vec2::ZERO,
            motor_impulse: 0.0,
            lower_impulse: 0.0,
            upper_impulse: 0.0,
            enable_motor: def.enable_motor,
            max_motor_torque: def.max_motor_torque,
            motor_speed: def.motor_speed,
            enable_limit: def.enable_limit,
            lower_angle: def.lower_angle,
            upper_angle: def.upper_angle,
            a: SolverBody::default(),
            b: SolverBody::default(),
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            k: Mat22::ZERO,
            angle: 0.0,
            axial_mass: 0.0,
        })
    }

    /// Anchor on body A, local frame
    #[must_use]
    pub fn local_anchor_a(&self) -> Vec2 {
        self.local_anchor_a
    }

    /// Anchor on body B, local frame
    #[must_use]
    pub fn local_anchor_b(&self) -> Vec2 {
        self.local_anchor_b
    }

    /// Reference angle
    #[must_use]
    pub fn reference_angle(&self) -> f32 {
        self.reference_angle
    }

    /// Current joint angle
    #[must_use]
    pub fn joint_angle(&self, body_a: &Body, body_b: &Body) -> f32 {
        body_b.sweep.a - body_a.sweep.a - self.reference_angle
    }

    /// Current joint angular speed
    #[must_use]
    pub fn joint_speed(&self, body_a: &Body, body_b: &Body) -> f32 {
        body_b.angular_velocity - body_a.angular_velocity
    }

    /// Whether the limit is enabled
    #[must_use]
    pub fn is_limit_enabled(&self) -> bool {
        self.enable_limit
    }

    /// Enable or disable the limit
    pub fn enable_limit(&mut self, flag: bool) {
        if flag != self.enable_limit {
            self.enable_limit = flag;
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }
    }

    /// Lower angle
    #[must_use]
    pub fn lower_limit(&self) -> f32 {
        self.lower_angle
    }

    /// Upper angle
    #[must_use]
    pub fn upper_limit(&self) -> f32 {
        self.upper_angle
    }

    /// Set the angular range; `lower` above `upper` is swapped.
    pub fn set_limits(&mut self, lower: f32, upper: f32) {
        let (lower, upper) = if lower <= upper { (lower, upper) } else { (upper, lower) };
        if lower != self.lower_angle || upper != self.upper_angle {
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
            self.lower_angle = lower;
            self.upper_angle = upper;
        }
    }

    /// Which side of the limit the joint sits on, from the last solve.
    #[must_use]
    pub fn limit_state(&self) -> LimitState {
        if !self.enable_limit {
            LimitState::Inactive
        } else if (self.upper_angle - self.lower_angle).abs() < 2.0 * ANGULAR_SLOP {
            LimitState::Equal
        } else if self.angle <= self.lower_angle {
            LimitState::AtLower
        } else if self.angle >= self.upper_angle {
            LimitState::AtUpper
        } else {
            LimitState::Inactive
        }
    }

    /// Whether the motor is enabled
    #[must_use]
    pub fn is_motor_enabled(&self) -> bool {
        self.enable_motor
    }

    /// Enable or disable the motor
    pub fn enable_motor(&mut self, flag: bool) {
        self.enable_motor = flag;
    }

    /// Motor speed
    #[must_use]
    pub fn motor_speed(&self) -> f32 {
        self.motor_speed
    }

    /// Set the motor speed
    pub fn set_motor_speed(&mut self, speed: f32) {
        self.motor_speed = speed;
    }

    /// Maximum motor torque
    #[must_use]
    pub fn max_motor_torque(&self) -> f32 {
        self.max_motor_torque
    }

    /// Set the maximum motor torque
    pub fn set_max_motor_torque(&mut self, torque: f32) {
        self.max_motor_torque = torque;
    }

    /// Motor torque applied during the last step
    #[must_use]
    pub fn motor_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.motor_impulse
    }

    pub(crate) fn anchor_a(&self, body_a: &Body) -> Vec2 {
        body_a.world_point(self.local_anchor_a)
    }

    pub(crate) fn anchor_b(&self, body_b: &Body) -> Vec2 {
        body_b.world_point(self.local_anchor_b)
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * self.impulse
    }

    pub(crate) fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * (self.motor_impulse + self.lower_impulse - self.upper_impulse)
    }

    pub(crate) fn init_velocity_constraints(&mut self, body_a: &Body, body_b: &Body, data: &mut SolverData<'_>) {
        self.a = SolverBody::from_body(body_a);
        self.b = SolverBody::from_body(body_b);
        let (a, b) = (self.a, self.b);

        let aa = data.positions[a.index].a;
        let ab = data.positions[b.index].a;
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];

        self.r_a = Rot::new(aa).apply(self.local_anchor_a - a.local_center);
        self.r_b = Rot::new(ab).apply(self.local_anchor_b - b.local_center);
        let (ra, rb) = (self.r_a, self.r_b);
        let (ma, mb, ia, ib) = (a.inv_mass, b.inv_mass, a.inv_i, b.inv_i);

        self.k.ex.x = ma + mb + ra.y * ra.y * ia + rb.y * rb.y * ib;
        self.k.ey.x = -ra.y * ra.x * ia - rb.y * rb.x * ib;
        self.k.ex.y = self.k.ey.x;
        self.k.ey.y = ma + mb + ra.x * ra.x * ia + rb.x * rb.x * ib;

        let axial = ia + ib;
        let fixed_rotation = axial <= 0.0;
        self.axial_mass = if fixed_rotation { 0.0 } else { 1.0 / axial };

        self.angle = ab - aa - self.reference_angle;
        if !self.enable_limit || fixed_rotation {
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }
        if !self.enable_motor || fixed_rotation {
            self.motor_impulse = 0.0;
        }

        if data.step.warm_starting {
            let ratio = data.step.dt_ratio;
            self.impulse *= ratio;
            self.motor_impulse *= ratio;
            self.lower_impulse *= ratio;
            self.upper_impulse *= ratio;

            let axial_impulse = self.motor_impulse + self.lower_impulse - self.upper_impulse;
            let p = self.impulse;
            va.v -= ma * p;
            va.w -= ia * (ra.cross(p) + axial_impulse);
            vb.v += mb * p;
            vb.w += ib * (rb.cross(p) + axial_impulse);
        } else {
            self.impulse = Vec2::ZERO;
            self.motor_impulse = 0.0;
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        let (a, b) = (self.a, self.b);
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];
        let (ma, mb, ia, ib) = (a.inv_mass, b.inv_mass, a.inv_i, b.inv_i);
        let fixed_rotation = ia + ib == 0.0;

        if self.enable_motor && !fixed_rotation {
            let cdot = vb.w - va.w - self.motor_speed;
            let impulse = -self.axial_mass * cdot;
            let old = self.motor_impulse;
            let max_impulse = data.step.dt * self.max_motor_torque;
            self.motor_impulse = (self.motor_impulse + impulse).clamp(-max_impulse, max_impulse);
            let impulse = self.motor_impulse - old;
            va.w -= ia * impulse;
            vb.w += ib * impulse;
        }

        if self.enable_limit && !fixed_rotation {
            // lower
            {
                let c = self.angle - self.lower_angle;
                let cdot = vb.w - va.w;
                let impulse = -self.axial_mass * (cdot + c.max(0.0) * data.step.inv_dt);
                let old = self.lower_impulse;
                self.lower_impulse = (self.lower_impulse + impulse).max(0.0);
                let impulse = self.lower_impulse - old;
                va.w -= ia * impulse;
                vb.w += ib * impulse;
            }

            // upper, signs flipped so the impulse stays positive
            {
                let c = self.upper_angle - self.angle;
                let cdot = va.w - vb.w;
                let impulse = -self.axial_mass * (cdot + c.max(0.0) * data.step.inv_dt);
                let old = self.upper_impulse;
                self.upper_impulse = (self.upper_impulse + impulse).max(0.0);
                let impulse = self.upper_impulse - old;
                va.w += ia * impulse;
                vb.w -= ib * impulse;
            }
        }

        let cdot = vb.v + cross_sv(vb.w, self.r_b) - va.v - cross_sv(va.w, self.r_a);
        let impulse = self.k.solve(-cdot);
        self.impulse += impulse;

        va.v -= ma * impulse;
        va.w -= ia * self.r_a.cross(impulse);
        vb.v += mb * impulse;
        vb.w += ib * self.r_b.cross(impulse);

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData<'_>) -> bool {
        let (a, b) = (self.a, self.b);
        let mut pa = data.positions[a.index];
        let mut pb = data.positions[b.index];
        let (ma, mb, ia, ib) = (a.inv_mass, b.inv_mass, a.inv_i, b.inv_i);

        let mut angular_error = 0.0;
        let fixed_rotation = ia + ib == 0.0;

        if self.enable_limit && !fixed_rotation {
            let angle = pb.a - pa.a - self.reference_angle;
            let c = if (self.upper_angle - self.lower_angle).abs() < 2.0 * ANGULAR_SLOP {
                (angle - self.lower_angle).clamp(-MAX_ANGULAR_CORRECTION, MAX_ANGULAR_CORRECTION)
            } else if angle <= self.lower_angle {
                (angle - self.lower_angle + ANGULAR_SLOP).clamp(-MAX_ANGULAR_CORRECTION, 0.0)
            } else if angle >= self.upper_angle {
                (angle - self.upper_angle - ANGULAR_SLOP).clamp(0.0, MAX_ANGULAR_CORRECTION)
            } else {
                0.0
            };

            let limit_impulse = -self.axial_mass * c;
            pa.a -= ia * limit_impulse;
            pb.a += ib * limit_impulse;
            angular_error = c.abs();
        }

        let ra = Rot::new(pa.a).apply(self.local_anchor_a - a.local_center);
        let rb = Rot::new(pb.a).apply(self.local_anchor_b - b.local_center);

        let c = pb.c + rb - pa.c - ra;
        let position_error = c.length();

        let mut k = Mat22::ZERO;
        k.ex.x = ma + mb + ia * ra.y * ra.y + ib * rb.y * rb.y;
        k.ex.y = -ia * ra.x * ra.y - ib * rb.x * rb.y;
        k.ey.x = k.ex.y;
        k.ey.y = ma + mb + ia * ra.x * ra.x + ib * rb.x * rb.x;

        let impulse = -k.solve(c);
        pa.c -= ma * impulse;
        pa.a -= ia * ra.cross(impulse);
        pb.c += mb * impulse;
        pb.a += ib * rb.cross(impulse);

        data.positions[a.index] = pa;
        data.positions[b.index] = pb;

        position_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_limits_rejected() {
        let def = RevoluteJointDef::default().with_limit(1.0, -1.0);
        assert!(RevoluteJoint::new(&def).is_err());
    }

    #[test]
    fn test_set_limits_swaps() {
        let mut joint = RevoluteJoint::new(&RevoluteJointDef::default()).unwrap();
        joint.set_limits(0.5, -0.5);
        assert_eq!(joint.lower_limit(), -0.5);
        assert_eq!(joint.upper_limit(), 0.5);
        assert_eq!(joint.limit_state(), LimitState::Inactive);
        joint.enable_limit(true);
        assert!(joint.is_limit_enabled());
    }

    #[test]
    fn test_motor_builder() {
        let def = RevoluteJointDef::default().with_motor(2.0, 10.0);
        let joint = RevoluteJoint::new(&def).unwrap();
        assert!(joint.is_motor_enabled());
        assert_eq!(joint.motor_speed(), 2.0);
        assert_eq!(joint.max_motor_torque(), 10.0);
    }
}
