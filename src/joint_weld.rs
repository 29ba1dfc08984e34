//! Weld Joint
//!
//! Removes all relative motion. A positive angular stiffness turns the
//! rotational part into a spring.

use crate::body::{Body, BodyHandle};
use crate::joint::{soft_constraint, SolverBody};
use crate::math::{cross_sv, Mat33, Rot, Vec2, Vec3};
use crate::settings::{ANGULAR_SLOP, LINEAR_SLOP};
use crate::time_step::SolverData;

/// Weld joint parameters
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeldJointDef {
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
    /// `angle_b - angle_a` held by the joint
    pub reference_angle: f32,
    /// Angular stiffness (N*m); zero is rigid
    pub stiffness: f32,
    /// Angular damping (N*m*s)
    pub damping: f32,
}

impl WeldJointDef {
    /// Weld at a world anchor using the current relative angle.
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
}

/// Weld joint state.
#[derive(Clone, Debug)]
pub struct WeldJoint {
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    reference_angle: f32,
    stiffness: f32,
    damping: f32,
    gamma: f32,
    bias: f32,
    impulse: Vec3,

    a: SolverBody,
    b: SolverBody,
    r_a: Vec2,
    r_b: Vec2,
    mass: Mat33,
}

fn effective_mass(ra: Vec2, rb: Vec2, ma: f32, mb: f32, ia: f32, ib: f32) -> Mat33 {
    let mut k = Mat33::ZERO;
    k.ex.x = ma + mb + ra.y * ra.y * ia + rb.y * rb.y * ib;
    k.ey.x = -ra.y * ra.x * ia - rb.y * rb.x * ib;
    k.ez.x = -ra.y * ia - rb.y * ib;
    k.ex.y = k.ey.x;
    k.ey.y = ma + mb + ra.x * ra.x * ia + rb.x * rb.x * ib;
    k.ez.y = ra.x * ia + rb.x * ib;
    k.ex.z = k.ez.x;
    k.ey.z = k.ez.y;
    k.ez.z = ia + ib;
    k
}

impl WeldJoint {
    pub(crate) fn new(def: &WeldJointDef) -> Self {
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            reference_angle: def.reference_angle,
            stiffness: def.stiffness,
            damping: def.damping,
            gamma: 0.0,
            bias: 0.0,
            impulse: Vec3::ZERO,
            a: SolverBody::default(),
            b: SolverBody::default(),
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            mass: Mat33::ZERO,
        }
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

    /// Angular stiffness
    #[must_use]
    pub fn stiffness(&self) -> f32 {
        self.stiffness
    }

    /// Set angular stiffness
    pub fn set_stiffness(&mut self, stiffness: f32) {
        self.stiffness = stiffness;
    }

    /// Angular damping
    #[must_use]
    pub fn damping(&self) -> f32 {
        self.damping
    }

    /// Set angular damping
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
        inv_dt * Vec2::new(self.impulse.x, self.impulse.y)
    }

    pub(crate) fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.impulse.z
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
        let (ma, mb, ia, ib) = (a.inv_mass, b.inv_mass, a.inv_i, b.inv_i);

        let k = effective_mass(self.r_a, self.r_b, ma, mb, ia, ib);

        if self.stiffness > 0.0 {
            self.mass = k.inverse22();
            let c = ab - aa - self.reference_angle;
            let (gamma, bias) = soft_constraint(c, self.stiffness, self.damping, data.step.dt);
            self.gamma = gamma;
            self.bias = bias;
            let inv_m = ia + ib + gamma;
            self.mass.ez.z = if inv_m != 0.0 { 1.0 / inv_m } else { 0.0 };
        } else if k.ez.z == 0.0 {
            self.mass = k.inverse22();
            self.gamma = 0.0;
            self.bias = 0.0;
        } else {
            self.mass = k.sym_inverse33();
            self.gamma = 0.0;
            self.bias = 0.0;
        }

        if data.step.warm_starting {
            self.impulse = self.impulse * data.step.dt_ratio;
            let p = Vec2::new(self.impulse.x, self.impulse.y);
            va.v -= ma * p;
            va.w -= ia * (self.r_a.cross(p) + self.impulse.z);
            vb.v += mb * p;
            vb.w += ib * (self.r_b.cross(p) + self.impulse.z);
        } else {
            self.impulse = Vec3::ZERO;
        }

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        let (a, b) = (self.a, self.b);
        let mut va = data.velocities[a.index];
        let mut vb = data.velocities[b.index];
        let (ma, mb, ia, ib) = (a.inv_mass, b.inv_mass, a.inv_i, b.inv_i);

        if self.stiffness > 0.0 {
            let cdot2 = vb.w - va.w;
            let impulse2 = -self.mass.ez.z * (cdot2 + self.bias + self.gamma * self.impulse.z);
            self.impulse.z += impulse2;
            va.w -= ia * impulse2;
            vb.w += ib * impulse2;

            let cdot1 = vb.v + cross_sv(vb.w, self.r_b) - va.v - cross_sv(va.w, self.r_a);
            let p = -self.mass.mul_vec2(cdot1);
            self.impulse.x += p.x;
            self.impulse.y += p.y;

            va.v -= ma * p;
            va.w -= ia * self.r_a.cross(p);
            vb.v += mb * p;
            vb.w += ib * self.r_b.cross(p);
        } else {
            let cdot1 = vb.v + cross_sv(vb.w, self.r_b) - va.v - cross_sv(va.w, self.r_a);
            let cdot = Vec3::new(cdot1.x, cdot1.y, vb.w - va.w);
            let impulse = -self.mass.mul_vec3(cdot);
            self.impulse += impulse;

            let p = Vec2::new(impulse.x, impulse.y);
            va.v -= ma * p;
            va.w -= ia * (self.r_a.cross(p) + impulse.z);
            vb.v += mb * p;
            vb.w += ib * (self.r_b.cross(p) + impulse.z);
        }

        data.velocities[a.index] = va;
        data.velocities[b.index] = vb;
    }

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData<'_>) -> bool {
        let (a, b) = (self.a, self.b);
        let mut pa = data.positions[a.index];
        let mut pb = data.positions[b.index];
        let (ma, mb, ia, ib) = (a.inv_mass, b.inv_mass, a.inv_i, b.inv_i);

        let ra = Rot::new(pa.a).apply(self.local_anchor_a - a.local_center);
        let rb = Rot::new(pb.a).apply(self.local_anchor_b - b.local_center);
        let k = effective_mass(ra, rb, ma, mb, ia, ib);

        let c1 = pb.c + rb - pa.c - ra;
        let position_error = c1.length();
        let angular_error;

        if self.stiffness > 0.0 {
            angular_error = 0.0;
            let p = -k.solve22(c1);
            pa.c -= ma * p;
            pa.a -= ia * ra.cross(p);
            pb.c += mb * p;
            pb.a += ib * rb.cross(p);
        } else {
            let c2 = pb.a - pa.a - self.reference_angle;
            angular_error = c2.abs();

            let impulse = if k.ez.z > 0.0 {
                -k.solve33(Vec3::new(c1.x, c1.y, c2))
            } else {
                let impulse2 = -k.solve22(c1);
                Vec3::new(impulse2.x, impulse2.y, 0.0)
            };

            let p = Vec2::new(impulse.x, impulse.y);
            pa.c -= ma * p;
            pa.a -= ia * (ra.cross(p) + impulse.z);
            pb.c += mb * p;
            pb.a += ib * (rb.cross(p) + impulse.z);
        }

        data.positions[a.index] = pa;
        data.positions[b.index] = pb;

        position_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_mass_is_symmetric() {
        let k = effective_mass(Vec2::new(0.5, -1.0), Vec2::new(-0.25, 2.0), 1.0, 0.5, 2.0, 0.25);
        assert_eq!(k.ey.x, k.ex.y);
        assert_eq!(k.ez.x, k.ex.z);
        assert_eq!(k.ez.y, k.ey.z);
        assert_eq!(k.ez.z, 2.25);
    }

    #[test]
    fn test_stiffness_accessors() {
        let mut joint = WeldJoint::new(&WeldJointDef::default());
        assert_eq!(joint.stiffness(), 0.0);
        joint.set_stiffness(5.0);
        joint.set_damping(0.5);
        assert_eq!(joint.stiffness(), 5.0);
        assert_eq!(joint.damping(), 0.5);
    }
}
