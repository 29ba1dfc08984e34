//! Gear Joint
//!
//! Couples the coordinates of two revolute or prismatic joints:
//! `coordinate_1 + ratio * coordinate_2 = constant`. Each sub-joint must be
//! attached to a dynamic body B; the gear acts on four bodies, the sub-joints'
//! A bodies (C and D) and B bodies (A and B).

use slotmap::SlotMap;

use crate::body::{Body, BodyHandle, BodyType};
use crate::error::{ConfigurationError, PhysicsError};
use crate::joint::{Joint, JointHandle, JointKind, SolverBody};
use crate::math::{Rot, Vec2};
use crate::settings::{ANGULAR_SLOP, LINEAR_SLOP};
use crate::time_step::{Position, SolverData};

/// Gear joint parameters. The gear's bodies come from the sub-joints.
#[derive(Clone, Debug, PartialEq)]
pub struct GearJointDef {
    /// Revolute or prismatic joint driving body A
    pub joint1: JointHandle,
    /// Revolute or prismatic joint driving body B
    pub joint2: JointHandle,
    /// Gear ratio
    pub ratio: f32,
    /// Keep contacts between the bodies
    pub collide_connected: bool,
    /// Application data
    pub user_data: u64,
}

impl Default for GearJointDef {
    fn default() -> Self {
        Self {
            joint1: JointHandle::default(),
            joint2: JointHandle::default(),
            ratio: 1.0,
            collide_connected: false,
            user_data: 0,
        }
    }
}

impl GearJointDef {
    /// Gear between two joints
    #[must_use]
    pub fn new(joint1: JointHandle, joint2: JointHandle, ratio: f32) -> Self {
        Self {
            joint1,
            joint2,
            ratio,
            ..Self::default()
        }
    }
}

/// Geometry of one geared sub-joint.
#[derive(Clone, Copy, Debug)]
struct GearSide {
    revolute: bool,
    /// Ground-side body (sub-joint's body A)
    ground: BodyHandle,
    /// Driven body (sub-joint's body B)
    driven: BodyHandle,
    local_anchor_ground: Vec2,
    local_anchor_driven: Vec2,
    local_axis_ground: Vec2,
    reference_angle: f32,
}

impl GearSide {
    fn from_joint(joint: &Joint, bodies: &SlotMap<BodyHandle, Body>) -> Result<Self, PhysicsError> {
        let side = match &joint.kind {
            JointKind::Revolute(r) => Self {
                revolute: true,
                ground: joint.body_a,
                driven: joint.body_b,
                local_anchor_ground: r.local_anchor_a,
                local_anchor_driven: r.local_anchor_b,
                local_axis_ground: Vec2::ZERO,
                reference_angle: r.reference_angle,
            },
            JointKind::Prismatic(p) => Self {
                revolute: false,
                ground: joint.body_a,
                driven: joint.body_b,
                local_anchor_ground: p.local_anchor_a,
                local_anchor_driven: p.local_anchor_b,
                local_axis_ground: p.local_x_axis_a,
                reference_angle: p.reference_angle,
            },
            _ => return Err(ConfigurationError::GearJointType.into()),
        };

        let driven = bodies.get(side.driven).ok_or(PhysicsError::body())?;
        if driven.body_type() != BodyType::Dynamic {
            return Err(ConfigurationError::NonDynamicBody("gear sub-joint body B").into());
        }
        Ok(side)
    }

    /// Joint coordinate from body transforms.
    fn coordinate(&self, ground: &Body, driven: &Body) -> f32 {
        if self.revolute {
            driven.sweep.a - ground.sweep.a - self.reference_angle
        } else {
            let xf_g = ground.xf;
            let xf_d = driven.xf;
            let p = xf_g.q.apply_inv(xf_d.q.apply(self.local_anchor_driven) + (xf_d.p - xf_g.p));
            (p - self.local_anchor_ground).dot(self.local_axis_ground)
        }
    }

    /// Joint coordinate from solver positions.
    fn solver_coordinate(&self, driven: &SolverBody, ground: &SolverBody, pd: Position, pg: Position) -> f32 {
        if self.revolute {
            pd.a - pg.a - self.reference_angle
        } else {
            let r_driven = Rot::new(pd.a).apply(self.local_anchor_driven - driven.local_center);
            let p_ground = self.local_anchor_ground - ground.local_center;
            let p_driven = Rot::new(pg.a).apply_inv(r_driven + (pd.c - pg.c));
            (p_driven - p_ground).dot(self.local_axis_ground)
        }
    }
}

/// Jacobian of one side: linear part and angular parts for the driven and
/// ground bodies, plus its effective mass contribution.
#[derive(Clone, Copy, Debug, Default)]
struct SideJacobian {
    jv: Vec2,
    jw_driven: f32,
    jw_ground: f32,
    mass: f32,
}

/// Gear joint state.
#[derive(Clone, Debug)]
pub struct GearJoint {
    joint1: JointHandle,
    joint2: JointHandle,
    side_a: GearSide,
    side_b: GearSide,
    ratio: f32,
    constant: f32,
    tolerance: f32,
    impulse: f32,

    a: SolverBody,
    b: SolverBody,
    c: SolverBody,
    d: SolverBody,
    jac_a: SideJacobian,
    jac_b: SideJacobian,
    mass: f32,
}

impl GearJoint {
    pub(crate) fn new(
        def: &GearJointDef,
        bodies: &SlotMap<BodyHandle, Body>,
        joints: &SlotMap<JointHandle, Joint>,
    ) -> Result<Self, PhysicsError> {
        if !def.ratio.is_finite() {
            return Err(ConfigurationError::InvalidParameter {
                reason: "gear ratio must be finite",
            }
            .into());
        }
        let joint1 = joints.get(def.joint1).ok_or(PhysicsError::joint())?;
        let joint2 = joints.get(def.joint2).ok_or(PhysicsError::joint())?;
        let side_a = GearSide::from_joint(joint1, bodies)?;
        let side_b = GearSide::from_joint(joint2, bodies)?;

        let body = |h: BodyHandle| bodies.get(h).ok_or(PhysicsError::body());
        let coordinate_a = side_a.coordinate(body(side_a.ground)?, body(side_a.driven)?);
        let coordinate_b = side_b.coordinate(body(side_b.ground)?, body(side_b.driven)?);

        Ok(Self {
            joint1: def.joint1,
            joint2: def.joint2,
            side_a,
            side_b,
            ratio: def.ratio,
            constant: coordinate_a + def.ratio * coordinate_b,
            tolerance: if side_a.revolute { ANGULAR_SLOP } else { LINEAR_SLOP },
            impulse: 0.0,
            a: SolverBody::default(),
            b: SolverBody::default(),
            c: SolverBody::default(),
            d: SolverBody::default(),
            jac_a: SideJacobian::default(),
            jac_b: SideJacobian::default(),
            mass: 0.0,
        })
    }

    /// First geared joint
    #[must_use]
    pub fn joint1(&self) -> JointHandle {
        self.joint1
    }

    /// Second geared joint
    #[must_use]
    pub fn joint2(&self) -> JointHandle {
        self.joint2
    }

    /// Gear ratio
    #[must_use]
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Set the gear ratio
    pub fn set_ratio(&mut self, ratio: f32) {
        if ratio.is_finite() {
            self.ratio = ratio;
        }
    }

    pub(crate) fn references(&self, joint: JointHandle) -> bool {
        self.joint1 == joint || self.joint2 == joint
    }

    pub(crate) fn body_a(&self) -> BodyHandle {
        self.side_a.driven
    }

    pub(crate) fn body_b(&self) -> BodyHandle {
        self.side_b.driven
    }

    pub(crate) fn body_c(&self) -> BodyHandle {
        self.side_a.ground
    }

    pub(crate) fn body_d(&self) -> BodyHandle {
        self.side_b.ground
    }

    pub(crate) fn anchor_a(&self, body_a: &Body) -> Vec2 {
        body_a.world_point(self.side_a.local_anchor_driven)
    }

    pub(crate) fn anchor_b(&self, body_b: &Body) -> Vec2 {
        body_b.world_point(self.side_b.local_anchor_driven)
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * (self.impulse * self.jac_a.jv)
    }

    pub(crate) fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.impulse * self.jac_a.jw_driven
    }

    /// Jacobian of one side, scaled by `scale`.
    #[allow(clippy::too_many_arguments)]
    fn jacobian(
        side: &GearSide,
        scale: f32,
        driven: &SolverBody,
        ground: &SolverBody,
        q_driven: Rot,
        q_ground: Rot,
    ) -> SideJacobian {
        if side.revolute {
            SideJacobian {
                jv: Vec2::ZERO,
                jw_driven: scale,
                jw_ground: scale,
                mass: scale * scale * (driven.inv_i + ground.inv_i),
            }
        } else {
            let u = q_ground.apply(side.local_axis_ground);
            let r_ground = q_ground.apply(side.local_anchor_ground - ground.local_center);
            let r_driven = q_driven.apply(side.local_anchor_driven - driven.local_center);
            let jw_ground = scale * r_ground.cross(u);
            let jw_driven = scale * r_driven.cross(u);
            SideJacobian {
                jv: scale * u,
                jw_driven,
                jw_ground,
                mass: scale * scale * (ground.inv_mass + driven.inv_mass)
                    + ground.inv_i * jw_ground * jw_ground
                    + driven.inv_i * jw_driven * jw_driven,
            }
        }
    }

    /// Apply `impulse` along the gear Jacobian to the velocity buffer.
    fn apply_velocity(&self, impulse: f32, data: &mut SolverData<'_>) {
        let sides = [
            (&self.a, self.jac_a.jv, self.jac_a.jw_driven, 1.0),
            (&self.b, self.jac_b.jv, self.jac_b.jw_driven, 1.0),
            (&self.c, self.jac_a.jv, self.jac_a.jw_ground, -1.0),
            (&self.d, self.jac_b.jv, self.jac_b.jw_ground, -1.0),
        ];
        for (body, jv, jw, sign) in sides {
            let v = &mut data.velocities[body.index];
            v.v += (sign * body.inv_mass * impulse) * jv;
            v.w += sign * body.inv_i * impulse * jw;
        }
    }

    pub(crate) fn init_velocity_constraints(
        &mut self,
        body_a: &Body,
        body_b: &Body,
        body_c: &Body,
        body_d: &Body,
        data: &mut SolverData<'_>,
    ) {
        self.a = SolverBody::from_body(body_a);
        self.b = SolverBody::from_body(body_b);
        self.c = SolverBody::from_body(body_c);
        self.d = SolverBody::from_body(body_d);

        let qa = Rot::new(data.positions[self.a.index].a);
        let qb = Rot::new(data.positions[self.b.index].a);
        let qc = Rot::new(data.positions[self.c.index].a);
        let qd = Rot::new(data.positions[self.d.index].a);

        self.jac_a = Self::jacobian(&self.side_a, 1.0, &self.a, &self.c, qa, qc);
        self.jac_b = Self::jacobian(&self.side_b, self.ratio, &self.b, &self.d, qb, qd);

        let mass = self.jac_a.mass + self.jac_b.mass;
        self.mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };

        if data.step.warm_starting {
            self.apply_velocity(self.impulse, data);
        } else {
            self.impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        let va = data.velocities[self.a.index];
        let vb = data.velocities[self.b.index];
        let vc = data.velocities[self.c.index];
        let vd = data.velocities[self.d.index];

        let cdot = self.jac_a.jv.dot(va.v - vc.v)
            + self.jac_b.jv.dot(vb.v - vd.v)
            + (self.jac_a.jw_driven * va.w - self.jac_a.jw_ground * vc.w)
            + (self.jac_b.jw_driven * vb.w - self.jac_b.jw_ground * vd.w);

        let impulse = -self.mass * cdot;
        self.impulse += impulse;
        self.apply_velocity(impulse, data);
    }

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData<'_>) -> bool {
        let pa = data.positions[self.a.index];
        let pb = data.positions[self.b.index];
        let pc = data.positions[self.c.index];
        let pd = data.positions[self.d.index];

        let (qa, qb, qc, qd) = (Rot::new(pa.a), Rot::new(pb.a), Rot::new(pc.a), Rot::new(pd.a));

        let jac_a = Self::jacobian(&self.side_a, 1.0, &self.a, &self.c, qa, qc);
        let jac_b = Self::jacobian(&self.side_b, self.ratio, &self.b, &self.d, qb, qd);

        let coordinate_a = self.side_a.solver_coordinate(&self.a, &self.c, pa, pc);
        let coordinate_b = self.side_b.solver_coordinate(&self.b, &self.d, pb, pd);

        let c = (coordinate_a + self.ratio * coordinate_b) - self.constant;
        let mass = jac_a.mass + jac_b.mass;
        let impulse = if mass > 0.0 { -c / mass } else { 0.0 };

        let sides = [
            (&self.a, jac_a.jv, jac_a.jw_driven, 1.0),
            (&self.b, jac_b.jv, jac_b.jw_driven, 1.0),
            (&self.c, jac_a.jv, jac_a.jw_ground, -1.0),
            (&self.d, jac_b.jv, jac_b.jw_ground, -1.0),
        ];
        for (body, jv, jw, sign) in sides {
            let p = &mut data.positions[body.index];
            p.c += (sign * body.inv_mass * impulse) * jv;
            p.a += sign * body.inv_i * impulse * jw;
        }

        c.abs() < self.tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revolute_jacobian_is_scaled_ratio() {
        let side = GearSide {
            revolute: true,
            ground: BodyHandle::default(),
            driven: BodyHandle::default(),
            local_anchor_ground: Vec2::ZERO,
            local_anchor_driven: Vec2::ZERO,
            local_axis_ground: Vec2::ZERO,
            reference_angle: 0.0,
        };
        let driven = SolverBody {
            inv_i: 2.0,
            ..SolverBody::default()
        };
        let ground = SolverBody::default();
        let jac = GearJoint::jacobian(&side, 3.0, &driven, &ground, Rot::IDENTITY, Rot::IDENTITY);
        assert_eq!(jac.jv, Vec2::ZERO);
        assert_eq!(jac.jw_driven, 3.0);
        assert_eq!(jac.mass, 18.0);
    }

    #[test]
    fn test_prismatic_jacobian_uses_axis() {
        let side = GearSide {
            revolute: false,
            ground: BodyHandle::default(),
            driven: BodyHandle::default(),
            local_anchor_ground: Vec2::ZERO,
            local_anchor_driven: Vec2::ZERO,
            local_axis_ground: Vec2::UNIT_X,
            reference_angle: 0.0,
        };
        let driven = SolverBody {
            inv_mass: 1.0,
            ..SolverBody::default()
        };
        let jac = GearJoint::jacobian(&side, 1.0, &driven, &SolverBody::default(), Rot::IDENTITY, Rot::IDENTITY);
        assert_eq!(jac.jv, Vec2::UNIT_X);
        assert_eq!(jac.mass, 1.0);
    }
}
