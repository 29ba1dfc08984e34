//! Distance Joint
//!
//! Keeps the anchor points at a rest length, optionally softened by a spring
//! and bounded by a `[min_length, max_length]` range.

use crate::body::{Body, BodyHandle};
use crate::error::{ConfigurationError, PhysicsError};
use crate::joint::{soft_constraint, SolverBody};
use crate::math::{cross_sv, Rot, Vec2};
use crate::settings::LINEAR_SLOP;
use crate::time_step::{SolverData, Velocity};

/// Distance joint parameters
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceJointDef {
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
    /// Rest length
    pub length: f32,
    /// Minimum length, clamped to at least the linear slop
    pub min_length: f32,
    /// Maximum length
    pub max_length: f32,
    /// Spring stiffness (N/m); zero is rigid
    pub stiffness: f32,
    /// Spring damping (N*s/m)
    pub damping: f32,
}

impl Default for DistanceJointDef {
    fn default() -> Self {
        Self {
            body_a: BodyHandle::default(),
            body_b: BodyHandle::default(),
            collide_connected: false,
            user_data: 0,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            length: 1.0,
            min_length: 0.0,
            max_length: f32::MAX,
            stiffness: 0.0,
            damping: 0.0,
        }
    }
}

impl DistanceJointDef {
    /// Rigid distance joint between two world anchors, with the rest length
    /// taken from the current configuration.
    #[must_use]
    pub fn initialize(
        handle_a: BodyHandle,
        body_a: &Body,
        handle_b: BodyHandle,
        body_b: &Body,
        anchor_a: Vec2,
        anchor_b: Vec2,
    ) -> Self {
        let length = (anchor_b - anchor_a).length().max(LINEAR_SLOP);
        Self {
            body_a: handle_a,
            body_b: handle_b,
            local_anchor_a: body_a.local_point(anchor_a),
            local_anchor_b: body_b.local_point(anchor_b),
            length,
            min_length: length,
            max_length: length,
            ..Self::default()
        }
    }

    /// Spring parameters
    #[must_use]
    pub fn with_spring(mut self, stiffness: f32, damping: f32) -> Self {
        self.stiffness = stiffness;
        self.damping = damping;
        self
    }

    /// Length range
    #[must_use]
    pub fn with_limits(mut self, min_length: f32, max_length: f32) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }
}

/// Distance joint state.
#[derive(Clone, Debug)]
pub struct DistanceJoint {
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    length: f32,
    min_length: f32,
    max_length: f32,
    stiffness: f32,
    damping: f32,

    gamma: f32,
    bias: f32,
    impulse: f32,
    lower_impulse: f32,
    upper_impulse: f32,
    current_length: f32,

    a: SolverBody,
    b: SolverBody,
    u: Vec2,
    r_a: Vec2,
    r_b: Vec2,
    soft_mass: f32,
    mass: f32,
}

impl DistanceJoint {
    pub(crate) fn new(def: &DistanceJointDef) -> Result<Self, PhysicsError> {
        for value in [def.length, def.min_length] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::DegenerateLength("distance joint length").into());
            }
        }
        if def.max_length.is_nan() || def.stiffness < 0.0 || def.damping < 0.0 {
            return Err(ConfigurationError::InvalidParameter {
                reason: "distance joint spring or range",
            }
            .into());
        }

        let min_length = def.min_length.max(LINEAR_SLOP);
        Ok(Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            length: def.length.max(LINEAR_SLOP),
            min_length,
            max_length: def.max_length.max(min_length),
            stiffness: def.stiffness,
            damping: def.damping,
            gamma: 0.0,
            bias: 0.0,
            impulse: 0.0,
            lower_impulse: 0.0,
            upper_impulse: 0.0,
            current_length: 0.0,
            a: SolverBody::default(),
            b: SolverBody::default(),
            u: Vec2::ZERO,
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            soft_mass: 0.0,
            mass: 0.0,
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

    /// Rest length
    #[must_use]
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Set the rest length; returns the clamped value.
    pub fn set_length(&mut self, length: f32) -> f32 {
        self.impulse = 0.0;
        self.length = length.max(LINEAR_SLOP);
        self.length
    }

    /// Minimum length
    #[must_use]
    pub fn min_length(&self) -> f32 {
        self.min_length
    }

    /// Set the minimum length, clamped to `[slop, max_length]`.
    pub fn set_min_length(&mut self, min_length: f32) -> f32 {
        self.lower_impulse = 0.0;
        self.min_length = min_length.clamp(LINEAR_SLOP, self.max_length);
        self.min_length
    }

    /// Maximum length
    #[must_use]
    pub fn max_length(&self) -> f32 {
        self.max_length
    }

    /// Set the maximum length, clamped to at least `min_length`.
    pub fn set_max_length(&mut self, max_length: f32) -> f32 {
        self.upper_impulse = 0.0;
        self.max_length = max_length.max(self.min_length);
        self.max_length
    }

    /// Spring stiffness
    #[must_use]
    pub fn stiffness(&self) -> f32 {
        self.stiffness
    }

    /// Set spring stiffness
    pub fn set_stiffness(&mut self, stiffness: f32) {
        self.stiffness = stiffness;
    }

    /// Spring damping
    #[must_use]
    pub fn damping(&self) -> f32 {
        self.damping
    }

    /// Set spring damping
    pub fn set_damping(&mut self, damping: f32) {
        self.damping = damping;
    }

    /// Current anchor separation, from the bodies' transforms.
    #[must_use]
    pub fn current_length(&self, body_a: &Body, body_b: &Body) -> f32 {
        (body_b.world_point(self.local_anchor_b) - body_a.world_point(self.local_anchor_a)).length()
    }

    pub(crate) fn anchor_a(&self, body_a: &Body) -> Vec2 {
        body_a.world_point(self.local_anchor_a)
    }

    pub(crate) fn anchor_b(&self, body_b: &Body) -> Vec2 {
        body_b.world_point(self.local_anchor_b)
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * (self.impulse + self.lower_impulse - self.upper_impulse) * self.u
    }

    pub(crate) fn init_velocity_constraints(&mut self, body_a: &Body, body_b: &Body, data: &mut SolverData<'_>) {
        self.a = SolverBody::from_body(body_a);
        self.b = SolverBody::from_body(body_b);
        let (a, b) = (self.a, self.b);

        let pa = data.positions[a.index];
        let pb = data.positions[b.index];
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];

        let (qa, qb) = (Rot::new(pa.a), Rot::new(pb.a));
        self.r_a = qa.apply(self.local_anchor_a - a.local_center);
        self.r_b = qb.apply(self.local_anchor_b - b.local_center);
        self.u = pb.c + self.r_b - pa.c - self.r_a;

        self.current_length = self.u.length();
        if self.current_length > LINEAR_SLOP {
            self.u = self.u * (1.0 / self.current_length);
        } else {
            self.u = Vec2::ZERO;
            self.mass = 0.0;
            self.impulse = 0.0;
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }

        let cr_au = self.r_a.cross(self.u);
        let cr_bu = self.r_b.cross(self.u);
        let mut inv_mass = a.inv_mass + a.inv_i * cr_au * cr_au + b.inv_mass + b.inv_i * cr_bu * cr_bu;
        self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };

        if self.stiffness > 0.0 && self.min_length < self.max_length {
            let c = self.current_length - self.length;
            let (gamma, bias) = soft_constraint(c, self.stiffness, self.damping, data.step.dt);
            self.gamma = gamma;
            self.bias = bias;
            inv_mass += gamma;
            self.soft_mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };
        } else {
            self.gamma = 0.0;
            self.bias = 0.0;
            self.soft_mass = self.mass;
        }

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;
            self.lower_impulse *= data.step.dt_ratio;
            self.upper_impulse *= data.step.dt_ratio;

            let p = (self.impulse + self.lower_impulse - self.upper_impulse) * self.u;
            va.v -= a.inv_mass * p;
            va.w -= a.inv_i * self.r_a.cross(p);
            vb.v += b.inv_mass * p;
            vb.w += b.inv_i * self.r_b.cross(p);
        } else {
            self.impulse = 0.0;
        }

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    fn apply(&self, p: Vec2, va: &mut Velocity, vb: &mut Velocity) {
        va.v -= self.a.inv_mass * p;
        va.w -= self.a.inv_i * self.r_a.cross(p);
        vb.v += self.b.inv_mass * p;
        vb.w += self.b.inv_i * self.r_b.cross(p);
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        let (ia, ib) = (self.a.index, self.b.index);
        let mut va = data.velocities[ia];
        let mut vb = data.velocities[ib];

        let cdot = |va: &Velocity, vb: &Velocity, s: &Self| {
            let vpa = va.v + cross_sv(va.w, s.r_a);
            let vpb = vb.v + cross_sv(vb.w, s.r_b);
            s.u.dot(vpb - vpa)
        };

        if self.min_length < self.max_length {
            if self.stiffness > 0.0 {
                let c = cdot(&va, &vb, self);
                let impulse = -self.soft_mass * (c + self.bias + self.gamma * self.impulse);
                self.impulse += impulse;
                self.apply(impulse * self.u, &mut va, &mut vb);
            }

            // lower
            {
                let bias = (self.current_length - self.min_length).max(0.0) * data.step.inv_dt;
                let c = cdot(&va, &vb, self);
                let impulse = -self.mass * (c + bias);
                let old = self.lower_impulse;
                self.lower_impulse = (self.lower_impulse + impulse).max(0.0);
                let impulse = self.lower_impulse - old;
                self.apply(impulse * self.u, &mut va, &mut vb);
            }

            // upper
            {
                let bias = (self.max_length - self.current_length).max(0.0) * data.step.inv_dt;
                let c = -cdot(&va, &vb, self);
                let impulse = -self.mass * (c + bias);
                let old = self.upper_impulse;
                self.upper_impulse = (self.upper_impulse + impulse).max(0.0);
                let impulse = self.upper_impulse - old;
                self.apply(-impulse * self.u, &mut va, &mut vb);
            }
        } else {
            let c = cdot(&va, &vb, self);
            let impulse = -self.mass * c;
            self.impulse += impulse;
            self.apply(impulse * self.u, &mut va, &mut vb);
        }

        data.velocities[ia] = va;
        data.velocities[ib] = vb;
    }

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData<'_>) -> bool {
        let (a, b) = (self.a, self.b);
        let mut pa = data.positions[a.index];
        let mut pb = data.positions[b.index];

        let (qa, qb) = (Rot::new(pa.a), Rot::new(pb.a));
        let r_a = qa.apply(self.local_anchor_a - a.local_center);
        let r_b = qb.apply(self.local_anchor_b - b.local_center);
        let mut u = pb.c + r_b - pa.c - r_a;
        let length = u.normalize_mut();

        let c = if self.min_length == self.max_length || length < self.min_length {
            length - self.min_length
        } else if self.max_length < length {
            length - self.max_length
        } else {
            return true;
        };

        let p = -self.mass * c * u;
        pa.c -= a.inv_mass * p;
        pa.a -= a.inv_i * r_a.cross(p);
        pb.c += b.inv_mass * p;
        pb.a += b.inv_i * r_b.cross(p);

        data.positions[a.index] = pa;
        data.positions[b.index] = pb;

        c.abs() < LINEAR_SLOP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_lengths() {
        let def = DistanceJointDef {
            length: 0.0,
            min_length: 0.0,
            max_length: 0.0,
            ..DistanceJointDef::default()
        };
        let joint = DistanceJoint::new(&def).unwrap();
        assert_eq!(joint.length(), LINEAR_SLOP);
        assert_eq!(joint.min_length(), LINEAR_SLOP);
        assert_eq!(joint.max_length(), LINEAR_SLOP);
    }

    #[test]
    fn test_negative_length_rejected() {
        let def = DistanceJointDef {
            length: -1.0,
            ..DistanceJointDef::default()
        };
        assert!(matches!(
            DistanceJoint::new(&def),
            Err(PhysicsError::Configuration(ConfigurationError::DegenerateLength(_)))
        ));
    }

    #[test]
    fn test_setters_clamp() {
        let mut joint = DistanceJoint::new(&DistanceJointDef::default().with_limits(1.0, 3.0)).unwrap();
        assert_eq!(joint.set_min_length(5.0), 3.0);
        assert_eq!(joint.set_max_length(0.5), 3.0);
        assert_eq!(joint.set_length(-2.0), LINEAR_SLOP);
    }
}
