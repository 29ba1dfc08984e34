//! Pulley Joint
//!
//! Two bodies hang from fixed ground anchors by an ideal rope:
//! `length_a + ratio * length_b` stays constant.

use crate::body::{Body, BodyHandle};
use crate::error::{ConfigurationError, PhysicsError};
use crate::joint::SolverBody;
use crate::math::{cross_sv, Rot, Vec2};
use crate::settings::LINEAR_SLOP;
use crate::time_step::SolverData;

/// Pulley joint parameters
#[derive(Clone, Debug, PartialEq)]
pub struct PulleyJointDef {
    /// First body
    pub body_a: BodyHandle,
    /// Second body
    pub body_b: BodyHandle,
    /// Keep contacts between the bodies
    pub collide_connected: bool,
    /// Application data
    pub user_data: u64,
    /// Fixed ground anchor for body A, world frame
    pub ground_anchor_a: Vec2,
    /// Fixed ground anchor for body B, world frame
    pub ground_anchor_b: Vec2,
    /// Anchor relative to body A's origin
    pub local_anchor_a: Vec2,
    /// Anchor relative to body B's origin
    pub local_anchor_b: Vec2,
    /// Reference rope length on side A
    pub length_a: f32,
    /// Reference rope length on side B
    pub length_b: f32,
    /// Pulley ratio
    pub ratio: f32,
}

impl Default for PulleyJointDef {
    fn default() -> Self {
        Self {
            body_a: BodyHandle::default(),
            body_b: BodyHandle::default(),
            collide_connected: true,
            user_data: 0,
            ground_anchor_a: Vec2::new(-1.0, 1.0),
            ground_anchor_b: Vec2::new(1.0, 1.0),
            local_anchor_a: Vec2::new(-1.0, 0.0),
            local_anchor_b: Vec2::new(1.0, 0.0),
            length_a: 0.0,
            length_b: 0.0,
            ratio: 1.0,
        }
    }
}

impl PulleyJointDef {
    /// Pulley from ground anchors, world body anchors and a ratio, with the
    /// rope lengths taken from the current configuration.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn initialize(
        handle_a: BodyHandle,
        body_a: &Body,
        handle_b: BodyHandle,
        body_b: &Body,
        ground_a: Vec2,
        ground_b: Vec2,
        anchor_a: Vec2,
        anchor_b: Vec2,
        ratio: f32,
    ) -> Self {
        Self {
            body_a: handle_a,
            body_b: handle_b,
            ground_anchor_a: ground_a,
            ground_anchor_b: ground_b,
            local_anchor_a: body_a.local_point(anchor_a),
            local_anchor_b: body_b.local_point(anchor_b),
            length_a: (anchor_a - ground_a).length(),
            length_b: (anchor_b - ground_b).length(),
            ratio,
            ..Self::default()
        }
    }
}

/// Pulley joint state.
#[derive(Clone, Debug)]
pub struct PulleyJoint {
    ground_anchor_a: Vec2,
    ground_anchor_b: Vec2,
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    length_a: f32,
    length_b: f32,
    ratio: f32,
    constant: f32,
    impulse: f32,

    a: SolverBody,
    b: SolverBody,
    u_a: Vec2,
    u_b: Vec2,
    r_a: Vec2,
    r_b: Vec2,
    mass: f32,
}

/// Unit rope direction, or zero when the rope is too short to define one.
fn rope_axis(u: Vec2) -> (Vec2, f32) {
    let length = u.length();
    if length > 10.0 * LINEAR_SLOP {
        (u * (1.0 / length), length)
    } else {
        (Vec2::ZERO, length)
    }
}

impl PulleyJoint {
    pub(crate) fn new(def: &PulleyJointDef) -> Result<Self, PhysicsError> {
        if !(def.ratio > f32::EPSILON) || !def.ratio.is_finite() {
            return Err(ConfigurationError::InvalidParameter {
                reason: "pulley ratio must be positive",
            }
            .into());
        }
        if def.length_a < 0.0 || def.length_b < 0.0 {
            return Err(ConfigurationError::DegenerateLength("pulley rope length").into());
        }
        Ok(Self {
            ground_anchor_a: def.ground_anchor_a,
            ground_anchor_b: def.ground_anchor_b,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            length_a: def.length_a,
            length_b: def.length_b,
            ratio: def.ratio,
            constant: def.length_a + def.ratio * def.length_b,
            impulse: 0.0,
            a: SolverBody::default(),
            b: SolverBody::default(),
            u_a: Vec2::ZERO,
            u_b: Vec2::ZERO,
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            mass: 0.0,
        })
    }

    /// Ground anchor A, world frame
    #[must_use]
    pub fn ground_anchor_a(&self) -> Vec2 {
        self.ground_anchor_a
    }

    /// Ground anchor B, world frame
    #[must_use]
    pub fn ground_anchor_b(&self) -> Vec2 {
        self.ground_anchor_b
    }

    /// Reference length of side A
    #[must_use]
    pub fn length_a(&self) -> f32 {
        self.length_a
    }

    /// Reference length of side B
    #[must_use]
    pub fn length_b(&self) -> f32 {
        self.length_b
    }

    /// Pulley ratio
    #[must_use]
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Current rope length on side A
    #[must_use]
    pub fn current_length_a(&self, body_a: &Body) -> f32 {
        (body_a.world_point(self.local_anchor_a) - self.ground_anchor_a).length()
    }

    /// Current rope length on side B
    #[must_use]
    pub fn current_length_b(&self, body_b: &Body) -> f32 {
        (body_b.world_point(self.local_anchor_b) - self.ground_anchor_b).length()
    }

    pub(crate) fn anchor_a(&self, body_a: &Body) -> Vec2 {
        body_a.world_point(self.local_anchor_a)
    }

    pub(crate) fn anchor_b(&self, body_b: &Body) -> Vec2 {
        body_b.world_point(self.local_anchor_b)
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * (self.impulse * self.u_b)
    }

    pub(crate) fn shift_origin(&mut self, new_origin: Vec2) {
        self.ground_anchor_a -= new_origin;
        self.ground_anchor_b -= new_origin;
    }

    fn effective_mass(&self, ra: Vec2, rb: Vec2, ua: Vec2, ub: Vec2) -> f32 {
        let ru_a = ra.cross(ua);
        let ru_b = rb.cross(ub);
        let ma = self.a.inv_mass + self.a.inv_i * ru_a * ru_a;
        let mb = self.b.inv_mass + self.b.inv_i * ru_b * ru_b;
        let mass = ma + self.ratio * self.ratio * mb;
        if mass > 0.0 {
            1.0 / mass
        } else {
            0.0
        }
    }

    pub(crate) fn init_velocity_constraints(&mut self, body_a: &Body, body_b: &Body, data: &mut SolverData<'_>) {
        self.a = SolverBody::from_body(body_a);
        self.b = SolverBody::from_body(body_b);
        let (a, b) = (self.a, self.b);

        let pa = data.positions[a.index];
        let pb = data.positions[b.index];
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];

        self.r_a = Rot::new(pa.a).apply(self.local_anchor_a - a.local_center);
        self.r_b = Rot::new(pb.a).apply(self.local_anchor_b - b.local_center);

        self.u_a = rope_axis(pa.c + self.r_a - self.ground_anchor_a).0;
        self.u_b = rope_axis(pb.c + self.r_b - self.ground_anchor_b).0;
        self.mass = self.effective_mass(self.r_a, self.r_b, self.u_a, self.u_b);

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;

            let p_a = -self.impulse * self.u_a;
            let p_b = (-self.ratio * self.impulse) * self.u_b;
            va.v += a.inv_mass * p_a;
            va.w += a.inv_i * self.r_a.cross(p_a);
            vb.v += b.inv_mass * p_b;
            vb.w += b.inv_i * self.r_b.cross(p_b);
        } else {
            self.impulse = 0.0;
        }

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        let (a, b) = (self.a, self.b);
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];

        let vp_a = va.v + cross_sv(va.w, self.r_a);
        let vp_b = vb.v + cross_sv(vb.w, self.r_b);

        let cdot = -self.u_a.dot(vp_a) - self.ratio * self.u_b.dot(vp_b);
        let impulse = -self.mass * cdot;
        self.impulse += impulse;

        let p_a = -impulse * self.u_a;
        let p_b = -self.ratio * impulse * self.u_b;
        va.v += a.inv_mass * p_a;
        va.w += a.inv_i * self.r_a.cross(p_a);
        vb.v += b.inv_mass * p_b;
        vb.w += b.inv_i * self.r_b.cross(p_b);

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData<'_>) -> bool {
        let (a, b) = (self.a, self.b);
        let mut pa = data.positions[a.index];
        let mut pb = data.positions[b.index];

        let ra = Rot::new(pa.a).apply(self.local_anchor_a - a.local_center);
        let rb = Rot::new(pb.a).apply(self.local_anchor_b - b.local_center);

        let (ua, length_a) = rope_axis(pa.c + ra - self.ground_anchor_a);
        let (ub, length_b) = rope_axis(pb.c + rb - self.ground_anchor_b);
        let mass = self.effective_mass(ra, rb, ua, ub);

        let c = self.constant - length_a - self.ratio * length_b;
        let impulse = -mass * c;

        let p_a = -impulse * ua;
        let p_b = -self.ratio * impulse * ub;
        pa.c += a.inv_mass * p_a;
        pa.a += a.inv_i * ra.cross(p_a);
        pb.c += b.inv_mass * p_b;
        pb.a += b.inv_i * rb.cross(p_b);

        data.positions[a.index] = pa;
        data.positions[b.index] = pb;

        c.abs() < LINEAR_SLOP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ratio_rejected() {
        let def = PulleyJointDef {
            ratio: 0.0,
            ..PulleyJointDef::default()
        };
        assert!(PulleyJoint::new(&def).is_err());
    }

    #[test]
    fn test_constant_and_shift() {
        let def = PulleyJointDef {
            length_a: 2.0,
            length_b: 3.0,
            ratio: 2.0,
            ..PulleyJointDef::default()
        };
        let mut joint = PulleyJoint::new(&def).unwrap();
        assert_eq!(joint.constant, 8.0);
        joint.shift_origin(Vec2::new(1.0, 1.0));
        assert_eq!(joint.ground_anchor_a(), Vec2::new(-2.0, 0.0));
        assert_eq!(joint.ground_anchor_b(), Vec2::new(0.0, 0.0));
    }

    #[test]
    fn test_short_rope_has_no_axis() {
        let (axis, length) = rope_axis(Vec2::new(0.01, 0.0));
        assert_eq!(axis, Vec2::ZERO);
        assert!((length - 0.01).abs() < 1e-6);
    }
}
