//! Prismatic Joint
//!
//! Body B slides along an axis fixed in body A; relative rotation is locked.
//! Optional translation limit and linear motor.

use crate::body::{Body, BodyHandle};
use crate::error::{ConfigurationError, PhysicsError};
use crate::joint::{LimitState, SolverBody};
use crate::math::{cross_sv, Mat22, Mat33, Rot, Vec2, Vec3};
use crate::settings::{ANGULAR_SLOP, LINEAR_SLOP};
use crate::time_step::{SolverData, Velocity};

/// Prismatic joint parameters
#[derive(Clone, Debug, PartialEq)]
pub struct PrismaticJointDef {
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
    /// Translation axis in body A's frame
    pub local_axis_a: Vec2,
    /// `angle_b - angle_a` held by the joint
    pub reference_angle: f32,
    /// Enable the translation limit
    pub enable_limit: bool,
    /// Lower translation (m)
    pub lower_translation: f32,
    /// Upper translation (m)
    pub upper_translation: f32,
    /// Enable the motor
    pub enable_motor: bool,
    /// Maximum motor force (N)
    pub max_motor_force: f32,
    /// Target translation speed (m/s)
    pub motor_speed: f32,
}

impl Default for PrismaticJointDef {
    fn default() -> Self {
        Self {
            body_a: BodyHandle::default(),
            body_b: BodyHandle::default(),
            collide_connected: false,
            user_data: 0,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            local_axis_a: Vec2::UNIT_X,
            reference_angle: 0.0,
            enable_limit: false,
            lower_translation: 0.0,
            upper_translation: 0.0,
            enable_motor: false,
            max_motor_force: 0.0,
            motor_speed: 0.0,
        }
    }
}

impl PrismaticJointDef {
    /// Prismatic joint through a world anchor along a world axis.
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
            reference_angle: body_b.angle() - body_a.angle(),
            ..Self::default()
        }
    }

    /// Translation limit
    #[must_use]
    pub fn with_limit(mut self, lower: f32, upper: f32) -> Self {
        self.enable_limit = true;
        self.lower_translation = lower;
        self.upper_translation = upper;
        self
    }

    /// Motor
    #[must_use]
    pub fn with_motor(mut self, speed: f32, max_force: f32) -> Self {
        self.enable_motor = true;
        self.motor_speed = speed;
        self.max_motor_force = max_force;
        self
    }
}

/// Prismatic joint state.
#[derive(Clone, Debug)]
pub struct PrismaticJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    pub(crate) local_x_axis_a: Vec2,
    local_y_axis_a: Vec2,
    pub(crate) reference_angle: f32,
    impulse: Vec2,
    motor_impulse: f32,
    lower_impulse: f32,
    upper_impulse: f32,
    lower_translation: f32,
    upper_translation: f32,
    max_motor_force: f32,
    motor_speed: f32,
    enable_limit: bool,
    enable_motor: bool,

    a: SolverBody,
    b: SolverBody,
    axis: Vec2,
    perp: Vec2,
    s1: f32,
    s2: f32,
    a1: f32,
    a2: f32,
    k: Mat22,
    translation: f32,
    axial_mass: f32,
}

impl PrismaticJoint {
    pub(crate) fn new(def: &PrismaticJointDef) -> Result<Self, PhysicsError> {
        if def.lower_translation > def.upper_translation {
            return Err(ConfigurationError::InvalidParameter {
                reason: "prismatic joint lower translation exceeds upper translation",
            }
            .into());
        }
        if def.local_axis_a.length_squared() <= f32::EPSILON {
            return Err(ConfigurationError::DegenerateLength("prismatic joint axis").into());
        }
        let x_axis = def.local_axis_a.normalize();
        Ok(Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            local_x_axis_a: x_axis,
            local_y_axis_a: cross_sv(1.0, x_axis),
            reference_angle: def.reference_angle,
            impulse: Vec2::ZERO,
            motor_impulse: 0.0,
            lower_impulse: 0.0,
            upper_impulse: 0.0,
            lower_translation: def.lower_translation,
            upper_translation: def.upper_translation,
            max_motor_force: def.max_motor_force,
            motor_speed: def.motor_speed,
            enable_limit: def.enable_limit,
            enable_motor: def.enable_motor,
            a: SolverBody::default(),
            b: SolverBody::default(),
            axis: Vec2::ZERO,
            perp: Vec2::ZERO,
            s1: 0.0,
            s2: 0.0,
            a1: 0.0,
            a2: 0.0,
            k: Mat22::ZERO,
            translation: 0.0,
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

    /// Unit translation axis in body A's frame
    #[must_use]
    pub fn local_axis_a(&self) -> Vec2 {
        self.local_x_axis_a
    }

    /// Reference angle
    #[must_use]
    pub fn reference_angle(&self) -> f32 {
        self.reference_angle
    }

    /// Current translation along the axis
    #[must_use]
    pub fn joint_translation(&self, body_a: &Body, body_b: &Body) -> f32 {
        let d = body_b.world_point(self.local_anchor_b) - body_a.world_point(self.local_anchor_a);
        d.dot(body_a.world_vector(self.local_x_axis_a))
    }

    /// Current translation speed
    #[must_use]
    pub fn joint_speed(&self, body_a: &Body, body_b: &Body) -> f32 {
        let ra = body_a.xf.q.apply(self.local_anchor_a - body_a.sweep.local_center);
        let rb = body_b.xf.q.apply(self.local_anchor_b - body_b.sweep.local_center);
        let d = (body_b.sweep.c + rb) - (body_a.sweep.c + ra);
        let axis = body_a.xf.q.apply(self.local_x_axis_a);

        let (va, vb) = (body_a.linear_velocity, body_b.linear_velocity);
        let (wa, wb) = (body_a.angular_velocity, body_b.angular_velocity);
        d.dot(cross_sv(wa, axis)) + axis.dot(vb + cross_sv(wb, rb) - va - cross_sv(wa, ra))
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

    /// Which side of the limit the joint sits on, from the last solve.
    #[must_use]
    pub fn limit_state(&self) -> LimitState {
        if !self.enable_limit {
            LimitState::Inactive
        } else if (self.upper_translation - self.lower_translation).abs() < 2.0 * LINEAR_SLOP {
            LimitState::Equal
        } else if self.translation <= self.lower_translation {
            LimitState::AtLower
        } else if self.translation >= self.upper_translation {
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

    /// Maximum motor force
    #[must_use]
    pub fn max_motor_force(&self) -> f32 {
        self.max_motor_force
    }

    /// Set the maximum motor force
    pub fn set_max_motor_force(&mut self, force: f32) {
        self.max_motor_force = force;
    }

    /// Motor force applied during the last step
    #[must_use]
    pub fn motor_force(&self, inv_dt: f32) -> f32 {
        inv_dt * self.motor_impulse
    }

    pub(crate) fn anchor_a(&self, body_a: &Body) -> Vec2 {
        body_a.world_point(self.local_anchor_a)
    }

    pub(crate) fn anchor_b(&self, body_b: &Body) -> Vec2 {
        body_b.world_point(self.local_anchor_b)
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * (self.impulse.x * self.perp + (self.motor_impulse + self.lower_impulse - self.upper_impulse) * self.axis)
    }

    pub(crate) fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.impulse.y
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

        let pa = data.positions[a.index];
        let pb = data.positions[b.index];
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];

        let qa = Rot::new(pa.a);
        let qb = Rot::new(pb.a);
        let ra = qa.apply(self.local_anchor_a - a.local_center);
        let rb = qb.apply(self.local_anchor_b - b.local_center);
        let d = (pb.c - pa.c) + rb - ra;

        let (ma, mb, ia, ib) = (a.inv_mass, b.inv_mass, a.inv_i, b.inv_i);

        self.axis = qa.apply(self.local_x_axis_a);
        self.a1 = (d + ra).cross(self.axis);
        self.a2 = rb.cross(self.axis);
        let axial = ma + mb + ia * self.a1 * self.a1 + ib * self.a2 * self.a2;
        self.axial_mass = if axial > 0.0 { 1.0 / axial } else { 0.0 };

        self.perp = qa.apply(self.local_y_axis_a);
        self.s1 = (d + ra).cross(self.perp);
        self.s2 = rb.cross(self.perp);

        let k11 = ma + mb + ia * self.s1 * self.s1 + ib * self.s2 * self.s2;
        let k12 = ia * self.s1 + ib * self.s2;
        let mut k22 = ia + ib;
        if k22 == 0.0 {
            // fixed rotation
            k22 = 1.0;
        }
        self.k = Mat22::from_cols(Vec2::new(k11, k12), Vec2::new(k12, k22));

        if self.enable_limit {
            self.translation = self.axis.dot(d);
        } else {
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }
        if !self.enable_motor {
            self.motor_impulse = 0.0;
        }

        if data.step.warm_starting {
            let ratio = data.step.dt_ratio;
            self.impulse *= ratio;
            self.motor_impulse *= ratio;
            self.lower_impulse *= ratio;
            self.upper_impulse *= ratio;

            let axial_impulse = self.motor_impulse + self.lower_impulse - self.upper_impulse;
            let p = self.impulse.x * self.perp + axial_impulse * self.axis;
            let la = self.impulse.x * self.s1 + self.impulse.y + axial_impulse * self.a1;
            let lb = self.impulse.x * self.s2 + self.impulse.y + axial_impulse * self.a2;
            self.apply(p, la, lb, &mut va, &mut vb);
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
        let (ia, ib) = (self.a.index, self.b.index);
        let mut va = data.velocities[ia];
        let mut vb = data.velocities[ib];

        if self.enable_motor {
            let cdot = self.axis.dot(vb.v - va.v) + self.a2 * vb.w - self.a1 * va.w;
            let impulse = self.axial_mass * (self.motor_speed - cdot);
            let old = self.motor_impulse;
            let max_impulse = data.step.dt * self.max_motor_force;
            self.motor_impulse = (self.motor_impulse + impulse).clamp(-max_impulse, max_impulse);
            let impulse = self.motor_impulse - old;
            self.apply(impulse * self.axis, impulse * self.a1, impulse * self.a2, &mut va, &mut vb);
        }

        if self.enable_limit {
            // lower
            {
                let c = self.translation - self.lower_translation;
                let cdot = self.axis.dot(vb.v - va.v) + self.a2 * vb.w - self.a1 * va.w;
                let impulse = -self.axial_mass * (cdot + c.max(0.0) * data.step.inv_dt);
                let old = self.lower_impulse;
                self.lower_impulse = (self.lower_impulse + impulse).max(0.0);
                let impulse = self.lower_impulse - old;
                self.apply(impulse * self.axis, impulse * self.a1, impulse * self.a2, &mut va, &mut vb);
            }

            // upper, signs flipped so the impulse stays positive
            {
                let c = self.upper_translation - self.translation;
                let cdot = self.axis.dot(va.v - vb.v) + self.a1 * va.w - self.a2 * vb.w;
                let impulse = -self.axial_mass * (cdot + c.max(0.0) * data.step.inv_dt);
                let old = self.upper_impulse;
                self.upper_impulse = (self.upper_impulse + impulse).max(0.0);
                let impulse = self.upper_impulse - old;
                self.apply(-impulse * self.axis, -impulse * self.a1, -impulse * self.a2, &mut va, &mut vb);
            }
        }

        let cdot = Vec2::new(
            self.perp.dot(vb.v - va.v) + self.s2 * vb.w - self.s1 * va.w,
            vb.w - va.w,
        );
        let df = self.k.solve(-cdot);
        self.impulse += df;
        self.apply(df.x * self.perp, df.x * self.s1 + df.y, df.x * self.s2 + df.y, &mut va, &mut vb);

        data.velocities[ia] = va;
        data.velocities[ib] = vb;
    }

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData<'_>) -> bool {
        let (a, b) = (self.a, self.b);
        let mut pa = data.positions[a.index];
        let mut pb = data.positions[b.index];
        let (ma, mb, ia, ib) = (a.inv_mass, b.inv_mass, a.inv_i, b.inv_i);

        let qa = Rot::new(pa.a);
        let qb = Rot::new(pb.a);
        let ra = qa.apply(self.local_anchor_a - a.local_center);
        let rb = qb.apply(self.local_anchor_b - b.local_center);
        let d = pb.c + rb - pa.c - ra;

        let axis = qa.apply(self.local_x_axis_a);
        let a1 = (d + ra).cross(axis);
        let a2 = rb.cross(axis);
        let perp = qa.apply(self.local_y_axis_a);
        let s1 = (d + ra).cross(perp);
        let s2 = rb.cross(perp);

        let c1 = Vec2::new(perp.dot(d), pb.a - pa.a - self.reference_angle);
        let mut linear_error = c1.x.abs();
        let angular_error = c1.y.abs();

        let mut active = false;
        let mut c2 = 0.0;
        if self.enable_limit {
            let translation = axis.dot(d);
            if (self.upper_translation - self.lower_translation).abs() < 2.0 * LINEAR_SLOP {
                c2 = translation;
                linear_error = linear_error.max(translation.abs());
                active = true;
            } else if translation <= self.lower_translation {
                c2 = (translation - self.lower_translation).min(0.0);
                linear_error = linear_error.max(self.lower_translation - translation);
                active = true;
            } else if translation >= self.upper_translation {
                c2 = (translation - self.upper_translation).max(0.0);
                linear_error = linear_error.max(translation - self.upper_translation);
                active = true;
            }
        }

        let k11 = ma + mb + ia * s1 * s1 + ib * s2 * s2;
        let k12 = ia * s1 + ib * s2;
        let k22 = if ia + ib == 0.0 { 1.0 } else { ia + ib };

        let impulse = if active {
            let k13 = ia * s1 * a1 + ib * s2 * a2;
            let k23 = ia * a1 + ib * a2;
            let k33 = ma + mb + ia * a1 * a1 + ib * a2 * a2;
            let k = Mat33 {
                ex: Vec3::new(k11, k12, k13),
                ey: Vec3::new(k12, k22, k23),
                ez: Vec3::new(k13, k23, k33),
            };
            k.solve33(-Vec3::new(c1.x, c1.y, c2))
        } else {
            let k = Mat22::from_cols(Vec2::new(k11, k12), Vec2::new(k12, k22));
            let impulse = k.solve(-c1);
            Vec3::new(impulse.x, impulse.y, 0.0)
        };

        let p = impulse.x * perp + impulse.z * axis;
        let la = impulse.x * s1 + impulse.y + impulse.z * a1;
        let lb = impulse.x * s2 + impulse.y + impulse.z * a2;

        pa.c -= ma * p;
        pa.a -= ia * la;
        pb.c += mb * p;
        pb.a += ib * lb;

        data.positions[a.index] = pa;
        data.positions[b.index] = pb;

        linear_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_is_normalized() {
        let def = PrismaticJointDef {
            local_axis_a: Vec2::new(0.0, 3.0),
            ..PrismaticJointDef::default()
        };
        let joint = PrismaticJoint::new(&def).unwrap();
        assert!((joint.local_axis_a().length() - 1.0).abs() < 1e-6);
        assert!((joint.local_y_axis_a - Vec2::new(-1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_zero_axis_rejected() {
        let def = PrismaticJointDef {
            local_axis_a: Vec2::ZERO,
            ..PrismaticJointDef::default()
        };
        assert!(PrismaticJoint::new(&def).is_err());
    }

    #[test]
    fn test_limit_state_equal() {
        let def = PrismaticJointDef::default().with_limit(1.0, 1.0);
        let joint = PrismaticJoint::new(&def).unwrap();
        assert_eq!(joint.limit_state(), LimitState::Equal);
    }
}
