//! Wheel Joint
//!
//! Body B's anchor is held on a line through body A's anchor along an axis
//! fixed in A. Translation along the axis is sprung, rotation is free and
//! may be driven by a motor.

use crate::body::{Body, BodyHandle};
use crate::error::{ConfigurationError, PhysicsError};
use crate::joint::{ensure_non_negative, soft_constraint, SolverBody};
use crate::math::{cross_sv, Rot, Vec2};
use crate::settings::LINEAR_SLOP;
use crate::time_step::{SolverData, Velocity};

/// Wheel joint parameters
#[derive(Clone, Debug, PartialEq)]
pub struct WheelJointDef {
    /// First body (chassis)
    pub body_a: BodyHandle,
    /// Second body (wheel)
    pub body_b: BodyHandle,
    /// Keep contacts between the bodies
    pub collide_connected: bool,
    /// Application data
    pub user_data: u64,
    /// Anchor relative to body A's origin
    pub local_anchor_a: Vec2,
    /// Anchor relative to body B's origin
    pub local_anchor_b: Vec2,
    /// Suspension axis in body A's frame
    pub local_axis_a: Vec2,
    /// Enable the translation limit
    pub enable_limit: bool,
    /// Lower translation (m)
    pub lower_translation: f32,
    /// Upper translation (m)
    pub upper_translation: f32,
    /// Enable the motor
    pub enable_motor: bool,
    /// Maximum motor torque (N*m)
    pub max_motor_torque: f32,
    /// Target angular speed (rad/s)
    pub motor_speed: f32,
    /// Suspension stiffness (N/m)
    pub stiffness: f32,
    /// Suspension damping (N*s/m)
    pub damping: f32,
}

impl Default for WheelJointDef {
    fn default() -> Self {
        Self {
            body_a: BodyHandle::default(),
            body_b: BodyHandle::default(),
            collide_connected: false,
            user_data: 0,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            local_axis_a: Vec2::UNIT_X,
            enable_limit: false,
            lower_translation: 0.0,
            upper_translation: 0.0,
            enable_motor: false,
            max_motor_torque: 0.0,
            motor_speed: 0.0,
            stiffness: 0.0,
            damping: 0.0,
        }
    }
}

impl WheelJointDef {
    /// Wheel joint through a world anchor with a world suspension axis.
    #[must_use]
    pub fn initialize(
        handle_a: BodyHandle,
        body_a: &Body,
        handle_b: BodyHandle,
        body_b: &Body,
        anchor: Vec2,
        axis: Vec2,
    ) -> Self {
        Self {
            body_a: handle_a,
            body_b: handle_b,
            local_anchor_a: body_a.local_point(anchor),
            local_anchor_b: body_b.local_point(anchor),
            local_axis_a: body_a.local_vector(axis),
            ..Self::default()
        }
    }

    /// Suspension spring
    #[must_use]
    pub fn with_spring(mut self, stiffness: f32, damping: f32) -> Self {
        self.stiffness = stiffness;
        self.damping = damping;
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

/// Wheel joint state.
#[derive(Clone, Debug)]
pub struct WheelJoint {
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    local_x_axis_a: Vec2,
    local_y_axis_a: Vec2,

    impulse: f32,
    motor_impulse: f32,
    spring_impulse: f32,
    lower_impulse: f32,
    upper_impulse: f32,
    translation: f32,
    lower_translation: f32,
    upper_translation: f32,
    max_motor_torque: f32,
    motor_speed: f32,
    enable_limit: bool,
    enable_motor: bool,
    stiffness: f32,
    damping: f32,

    a: SolverBody,
    b: SolverBody,
    ax: Vec2,
    ay: Vec2,
    s_ax: f32,
    s_bx: f32,
    s_ay: f32,
    s_by: f32,
    mass: f32,
    motor_mass: f32,
    axial_mass: f32,
    spring_mass: f32,
    bias: f32,
    gamma: f32,
}

impl WheelJoint {
    pub(crate) fn new(def: &WheelJointDef) -> Result<Self, PhysicsError> {
        if def.lower_translation > def.upper_translation {
            return Err(ConfigurationError::InvalidParameter {
                reason: "wheel joint lower translation exceeds upper translation",
            }
            .into());
        }
        if def.local_axis_a.length_squared() <= f32::EPSILON {
            return Err(ConfigurationError::DegenerateLength("wheel joint axis").into());
        }
        ensure_non_negative(def.stiffness, "wheel joint stiffness")?;
        ensure_non_negative(def.damping, "wheel joint damping")?;

        let x_axis = def.local_axis_a.normalize();
        Ok(Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            local_x_axis_a: x_axis,
            local_y_axis_a: cross_sv(1.0, x_axis),
            impulse: 0.0,
            motor_impulse: 0.0,
            spring_impulse: 0.0,
            lower_impulse: 0.0,
            upper_impulse: 0.0,
            translation: 0.0,
            lower_translation: def.lower_translation,
            upper_translation: def.upper_translation,
            max_motor_torque: def.max_motor_torque,
            motor_speed: def.motor_speed,
            enable_limit: def.enable_limit,
            enable_motor: def.enable_motor,
            stiffness: def.stiffness,
            damping: def.damping,
            a: SolverBody::default(),
            b: SolverBody::default(),
            ax: Vec2::ZERO,
            ay: Vec2::ZERO,
            s_ax: 0.0,
            s_bx: 0.0,
            s_ay: 0.0,
            s_by: 0.0,
            mass: 0.0,
            motor_mass: 0.0,
            axial_mass: 0.0,
            spring_mass: 0.0,
            bias: 0.0,
            gamma: 0.0,
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

    /// Unit suspension axis in body A's frame
    #[must_use]
    pub fn local_axis_a(&self) -> Vec2 {
        self.local_x_axis_a
    }

    /// Current translation along the suspension axis
    #[must_use]
    pub fn joint_translation(&self, body_a: &Body, body_b: &Body) -> f32 {
        let d = body_b.world_point(self.local_anchor_b) - body_a.world_point(self.local_anchor_a);
        d.dot(body_a.world_vector(self.local_x_axis_a))
    }

    /// Relative angular speed
    #[must_use]
    pub fn joint_angular_speed(&self, body_a: &Body, body_b: &Body) -> f32 {
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

    /// Set the translation range; `lower` above `upper` is swapped.
    pub fn set_limits(&mut self, lower: f32, upper: f32) {
        let (lower, upper) = if lower <= upper { (lower, upper) } else { (upper, lower) };
        if lower != self.lower_translation || upper != self.upper_translation {
            self.lower_translation = lower;
            self.upper_translation = upper;
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }
    }

    /// Lower translation
    #[must_use]
    pub fn lower_limit(&self) -> f32 {
        self.lower_translation
    }

    /// Upper translation
    #[must_use]
    pub fn upper_limit(&self) -> f32 {
        self.upper_translation
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

    /// Suspension stiffness
    #[must_use]
    pub fn stiffness(&self) -> f32 {
        self.stiffness
    }

    /// Set suspension stiffness
    pub fn set_stiffness(&mut self, stiffness: f32) {
        self.stiffness = stiffness;
    }

    /// Suspension damping
    #[must_use]
    pub fn damping(&self) -> f32 {
        self.damping
    }

    /// Set suspension damping
    pub fn set_damping(&mut self, damping: f32) {
        self.damping = damping;
    }

    pub(crate) fn anchor_a(&self, body_a: &Body) -> Vec2 {
        body_a.world_point(self.local_anchor_a)
    }

    pub(crate) fn anchor_b(&self, body_b: &Body) -> Vec2 {
        body_b.world_point(self.local_anchor_b)
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * (self.impulse * self.ay + (self.spring_impulse + self.lower_impulse - self.upper_impulse) * self.ax)
    }

    pub(crate) fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.motor_impulse
    }

    fn apply(&self, p: Vec2, la: f32, lb: f32, va: &mut Velocity, vb: &mut Velocity) {
        va.v -= self.a.inv_mass * p;
        va.w -= self.a.inv_i * la;
        vb.v += self.b.inv_mass * p;
        vb.w += self.b.inv_i * lb;
    }

    pub(crate) fn init_velocity_constraints(&mut self, body_a: &Body, body_b: &Body, data: &mut SolverData<'_>) {
        self.a = SolverBody::from_body(body_a);
        self.b = SolverBody::from_body(body_b);
        let (a, b) = (self.a, self.b);
        let (ma, mb, ia, ib) = (a.inv_mass, b.inv_mass, a.inv_i, b.inv_i);

        let pa = data.positions[a.index];
        let pb = data.positions[b.index];
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];

        let qa = Rot::new(pa.a);
        let qb = Rot::new(pb.a);
        let ra = qa.apply(self.local_anchor_a - a.local_center);
        let rb = qb.apply(self.local_anchor_b - b.local_center);
        let d = pb.c + rb - pa.c - ra;

        // point to line
        self.ay = qa.apply(self.local_y_axis_a);
        self.s_ay = (d + ra).cross(self.ay);
        self.s_by = rb.cross(self.ay);
        let mass = ma + mb + ia * self.s_ay * self.s_ay + ib * self.s_by * self.s_by;
        self.mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };

        // spring
        self.ax = qa.apply(self.local_x_axis_a);
        self.s_ax = (d + ra).cross(self.ax);
        self.s_bx = rb.cross(self.ax);
        let inv_mass = ma + mb + ia * self.s_ax * self.s_ax + ib * self.s_bx * self.s_bx;
        self.axial_mass = if inv_mass > 0.0 { 1.0 / inv_mass } else { 0.0 };

        self.spring_mass = 0.0;
        self.bias = 0.0;
        self.gamma = 0.0;
        if self.stiffness > 0.0 && inv_mass > 0.0 {
            let c = d.dot(self.ax);
            let (gamma, bias) = soft_constraint(c, self.stiffness, self.damping, data.step.dt);
            self.gamma = gamma;
            self.bias = bias;
            let spring = inv_mass + gamma;
            self.spring_mass = if spring > 0.0 { 1.0 / spring } else { 0.0 };
        } else {
            self.spring_impulse = 0.0;
        }

        if self.enable_limit {
            self.translation = self.ax.dot(d);
        } else {
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }

        if self.enable_motor {
            let motor = ia + ib;
            self.motor_mass = if motor > 0.0 { 1.0 / motor } else { 0.0 };
        } else {
            self.motor_mass = 0.0;
            self.motor_impulse = 0.0;
        }

        if data.step.warm_starting {
            let ratio = data.step.dt_ratio;
            self.impulse *= ratio;
            self.spring_impulse *= ratio;
            self.motor_impulse *= ratio;
            self.lower_impulse *= ratio;
            self.upper_impulse *= ratio;

            let axial_impulse = self.spring_impulse + self.lower_impulse - self.upper_impulse;
            let p = self.impulse * self.ay + axial_impulse * self.ax;
            let la = self.impulse * self.s_ay + axial_impulse * self.s_ax + self.motor_impulse;
            let lb = self.impulse * self.s_by + axial_impulse * self.s_bx + self.motor_impulse;
            self.apply(p, la, lb, &mut va, &mut vb);
        } else {
            self.impulse = 0.0;
            self.spring_impulse = 0.0;
            self.motor_impulse = 0.0;
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        let (ia_idx, ib_idx) = (self.a.index, self.b.index);
        let (ia, ib) = (self.a.inv_i, self.b.inv_i);
        let mut va = data.velocities[ia_idx];
        let mut vb = data.velocities[ib_idx];

        // spring
        {
            let cdot = self.ax.dot(vb.v - va.v) + self.s_bx * vb.w - self.s_ax * va.w;
            let impulse = -self.spring_mass * (cdot + self.bias + self.gamma * self.spring_impulse);
            self.spring_impulse += impulse;
            self.apply(impulse * self.ax, impulse * self.s_ax, impulse * self.s_bx, &mut va, &mut vb);
        }

        // rotational motor
        {
            let cdot = vb.w - va.w - self.motor_speed;
            let impulse = -self.motor_mass * cdot;
            let old = self.motor_impulse;
            let max_impulse = data.step.dt * self.max_motor_torque;
            self.motor_impulse = (self.motor_impulse + impulse).clamp(-max_impulse, max_impulse);
            let impulse = self.motor_impulse - old;
            va.w -= ia * impulse;
            vb.w += ib * impulse;
        }

        if self.enable_limit {
            // lower
            {
                let c = self.translation - self.lower_translation;
                let cdot = self.ax.dot(vb.v - va.v) + self.s_bx * vb.w - self.s_ax * va.w;
                let impulse = -self.axial_mass * (cdot + c.max(0.0) * data.step.inv_dt);
                let old = self.lower_impulse;
                self.lower_impulse = (self.lower_impulse + impulse).max(0.0);
                let impulse = self.lower_impulse - old;
                self.apply(impulse * self.ax, impulse * self.s_ax, impulse * self.s_bx, &mut va, &mut vb);
            }

            // upper, signs flipped so the impulse stays positive
            {
                let c = self.upper_translation - self.translation;
                let cdot = self.ax.dot(va.v - vb.v) + self.s_ax * va.w - self.s_bx * vb.w;
                let impulse = -self.axial_mass * (cdot + c.max(0.0) * data.step.inv_dt);
                let old = self.upper_impulse;
                self.upper_impulse = (self.upper_impulse + impulse).max(0.0);
                let impulse = self.upper_impulse - old;
                self.apply(-impulse * self.ax, -impulse * self.s_ax, -impulse * self.s_bx, &mut va, &mut vb);
            }
        }

        // point to line
        {
            let cdot = self.ay.dot(vb.v - va.v) + self.s_by * vb.w - self.s_ay * va.w;
            let impulse = -self.mass * cdot;
            self.impulse += impulse;
            self.apply(impulse * self.ay, impulse * self.s_ay, impulse * self.s_by, &mut va, &mut vb);
        }

        data.velocities[ia_idx] = va;
        data.velocities[ib_idx] = vb;
    }

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData<'_>) -> bool {
        let (a, b) = (self.a, self.b);
        let (ma, mb, ia, ib) = (a.inv_mass, b.inv_mass, a.inv_i, b.inv_i);
        let mut pa = data.positions[a.index];
        let mut pb = data.positions[b.index];

        let mut linear_error = 0.0_f32;

        if self.enable_limit {
            let qa = Rot::new(pa.a);
            let qb = Rot::new(pb.a);
            let ra = qa.apply(self.local_anchor_a - a.local_center);
            let rb = qb.apply(self.local_anchor_b - b.local_center);
            let d = (pb.c - pa.c) + rb - ra;

            let ax = qa.apply(self.local_x_axis_a);
            let s_ax = (d + ra).cross(ax);
            let s_bx = rb.cross(ax);

            let translation = ax.dot(d);
            let c = if (self.upper_translation - self.lower_translation).abs() < 2.0 * LINEAR_SLOP {
                translation
            } else if translation <= self.lower_translation {
                (translation - self.lower_translation).min(0.0)
            } else if translation >= self.upper_translation {
                (translation - self.upper_translation).max(0.0)
            } else {
                0.0
            };

            if c != 0.0 {
                let inv_mass = ma + mb + ia * s_ax * s_ax + ib * s_bx * s_bx;
                let impulse = if inv_mass != 0.0 { -c / inv_mass } else { 0.0 };
                let p = impulse * ax;
                pa.c -= ma * p;
                pa.a -= ia * impulse * s_ax;
                pb.c += mb * p;
                pb.a += ib * impulse * s_bx;
                linear_error = c.abs();
            }
        }

        // perpendicular
        {
            let qa = Rot::new(pa.a);
            let qb = Rot::new(pb.a);
            let ra = qa.apply(self.local_anchor_a - a.local_center);
            let rb = qb.apply(self.local_anchor_b - b.local_center);
            let d = (pb.c - pa.c) + rb - ra;

            let ay = qa.apply(self.local_y_axis_a);
            let s_ay = (d + ra).cross(ay);
            let s_by = rb.cross(ay);
            let c = d.dot(ay);

            let inv_mass = ma + mb + ia * s_ay * s_ay + ib * s_by * s_by;
            let impulse = if inv_mass != 0.0 { -c / inv_mass } else { 0.0 };
            let p = impulse * ay;
            pa.c -= ma * p;
            pa.a -= ia * impulse * s_ay;
            pb.c += mb * p;
            pb.a += ib * impulse * s_by;

            linear_error = linear_error.max(c.abs());
        }

        data.positions[a.index] = pa;
        data.positions[b.index] = pb;

        linear_error <= LINEAR_SLOP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_stiffness_rejected() {
        let def = WheelJointDef::default().with_spring(-1.0, 0.0);
        assert!(WheelJoint::new(&def).is_err());
    }

    #[test]
    fn test_axis_frames() {
        let def = WheelJointDef {
            local_axis_a: Vec2::new(0.0, 2.0),
            ..WheelJointDef::default()
        };
        let joint = WheelJoint::new(&def).unwrap();
        assert!((joint.local_axis_a() - Vec2::UNIT_Y).length() < 1e-6);
        assert!(joint.local_y_axis_a.dot(joint.local_axis_a()).abs() < 1e-6);
    }

    #[test]
    fn test_set_limits_swaps() {
        let mut joint = WheelJoint::new(&WheelJointDef::default()).unwrap();
        joint.set_limits(0.3, -0.2);
        assert_eq!(joint.lower_limit(), -0.2);
        assert_eq!(joint.upper_limit(), 0.3);
    }
}
