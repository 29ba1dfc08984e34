//! Contact Solver
//!
//! Sequential-impulse solver for non-penetration and friction.
//!
//! # Features
//!
//! - **Friction before normal**: tangent impulses are solved first each
//!   iteration so non-penetration gets the final word
//! - **Block solver**: two-point manifolds are solved as a 2x2 linear
//!   complementarity problem when the effective mass is well conditioned
//! - **Restitution bias** above the mixed velocity threshold
//! - **Position correction**: Baumgarte-style pseudo impulses on positions,
//!   with a stronger variant for TOI sub-steps

use slotmap::SlotMap;

use crate::body::{Body, BodyHandle};
use crate::collision::{ManifoldType, WorldManifold};
use crate::contact::{Contact, ContactHandle};
use crate::fixture::{Fixture, FixtureHandle};
use crate::math::{cross_sv, cross_vs, Mat22, Rot, Transform, Vec2};
use crate::settings::{BAUMGARTE, LINEAR_SLOP, MAX_LINEAR_CORRECTION, MAX_MANIFOLD_POINTS, TOI_BAUMGARTE};
use crate::time_step::{Position, TimeStep, Velocity};
use crate::world_callbacks::ContactImpulse;

/// Two-point manifolds use the block solver.
const BLOCK_SOLVE: bool = true;

/// Upper bound on the condition number of the block effective mass.
const MAX_CONDITION_NUMBER: f32 = 1000.0;

#[derive(Clone, Copy, Debug, Default)]
struct VelocityConstraintPoint {
    r_a: Vec2,
    r_b: Vec2,
    normal_impulse: f32,
    tangent_impulse: f32,
    normal_mass: f32,
    tangent_mass: f32,
    velocity_bias: f32,
}

#[derive(Clone, Copy, Debug)]
struct ContactVelocityConstraint {
    points: [VelocityConstraintPoint; MAX_MANIFOLD_POINTS],
    normal: Vec2,
    normal_mass: Mat22,
    k: Mat22,
    index_a: usize,
    index_b: usize,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_i_a: f32,
    inv_i_b: f32,
    friction: f32,
    restitution: f32,
    threshold: f32,
    tangent_speed: f32,
    point_count: usize,
    contact: ContactHandle,
}

#[derive(Clone, Copy, Debug)]
struct ContactPositionConstraint {
    local_points: [Vec2; MAX_MANIFOLD_POINTS],
    local_normal: Vec2,
    local_point: Vec2,
    index_a: usize,
    index_b: usize,
    inv_mass_a: f32,
    inv_mass_b: f32,
    local_center_a: Vec2,
    local_center_b: Vec2,
    inv_i_a: f32,
    inv_i_b: f32,
    kind: ManifoldType,
    radius_a: f32,
    radius_b: f32,
    point_count: usize,
}

/// Contact point evaluated from the current solver positions.
struct PositionSolverManifold {
    normal: Vec2,
    point: Vec2,
    separation: f32,
}

impl PositionSolverManifold {
    fn new(pc: &ContactPositionConstraint, xf_a: &Transform, xf_b: &Transform, index: usize) -> Self {
        match pc.kind {
            ManifoldType::Circles => {
                let point_a = xf_a.apply(pc.local_point);
                let point_b = xf_b.apply(pc.local_points[0]);
                let d = point_b - point_a;
                let normal = if d.length_squared() > f32::EPSILON * f32::EPSILON {
                    d.normalize()
                } else {
                    Vec2::ZERO
                };
                Self {
                    normal,
                    point: (point_a + point_b) * 0.5,
                    separation: d.dot(normal) - pc.radius_a - pc.radius_b,
                }
            }
            ManifoldType::FaceA => {
                let normal = xf_a.q.apply(pc.local_normal);
                let plane_point = xf_a.apply(pc.local_point);
                let clip_point = xf_b.apply(pc.local_points[index]);
                Self {
                    normal,
                    point: clip_point,
                    separation: (clip_point - plane_point).dot(normal) - pc.radius_a - pc.radius_b,
                }
            }
            ManifoldType::FaceB => {
                let normal = xf_b.q.apply(pc.local_normal);
                let plane_point = xf_b.apply(pc.local_point);
                let clip_point = xf_a.apply(pc.local_points[index]);
                Self {
                    // normal points from A to B
                    normal: -normal,
                    point: clip_point,
                    separation: (clip_point - plane_point).dot(normal) - pc.radius_a - pc.radius_b,
                }
            }
        }
    }
}

#[inline]
fn body_transform(c: Vec2, a: f32, local_center: Vec2) -> Transform {
    let q = Rot::new(a);
    Transform {
        p: c - q.apply(local_center),
        q,
    }
}

/// Solver state for the touching contacts of one island.
#[derive(Debug, Default)]
pub(crate) struct ContactSolver {
    velocity_constraints: Vec<ContactVelocityConstraint>,
    position_constraints: Vec<ContactPositionConstraint>,
}

impl ContactSolver {
    /// Build constraints for `handles`; bodies must already carry their
    /// island indices.
    pub(crate) fn new(
        step: TimeStep,
        handles: &[ContactHandle],
        contacts: &SlotMap<ContactHandle, Contact>,
        fixtures: &SlotMap<FixtureHandle, Fixture>,
        bodies: &SlotMap<BodyHandle, Body>,
    ) -> Self {
        let mut solver = Self {
            velocity_constraints: Vec::with_capacity(handles.len()),
            position_constraints: Vec::with_capacity(handles.len()),
        };

        for &handle in handles {
            let Some(contact) = contacts.get(handle) else {
                continue;
            };
            let (Some(fa), Some(fb)) = (fixtures.get(contact.fixture_a), fixtures.get(contact.fixture_b)) else {
                continue;
            };
            let (Some(body_a), Some(body_b)) = (bodies.get(contact.body_a), bodies.get(contact.body_b)) else {
                continue;
            };
            let manifold = &contact.manifold;
            debug_assert!(manifold.point_count > 0);

            let mut vc = ContactVelocityConstraint {
                points: [VelocityConstraintPoint::default(); MAX_MANIFOLD_POINTS],
                normal: Vec2::ZERO,
                normal_mass: Mat22::ZERO,
                k: Mat22::ZERO,
                index_a: body_a.island_index,
                index_b: body_b.island_index,
                inv_mass_a: body_a.inv_mass,
                inv_mass_b: body_b.inv_mass,
                inv_i_a: body_a.inv_i,
                inv_i_b: body_b.inv_i,
                friction: contact.friction,
                restitution: contact.restitution,
                threshold: contact.restitution_threshold,
                tangent_speed: contact.tangent_speed,
                point_count: manifold.point_count,
                contact: handle,
            };

            let mut pc = ContactPositionConstraint {
                local_points: [Vec2::ZERO; MAX_MANIFOLD_POINTS],
                local_normal: manifold.local_normal,
                local_point: manifold.local_point,
                index_a: body_a.island_index,
                index_b: body_b.island_index,
                inv_mass_a: body_a.inv_mass,
                inv_mass_b: body_b.inv_mass,
                local_center_a: body_a.sweep.local_center,
                local_center_b: body_b.sweep.local_center,
                inv_i_a: body_a.inv_i,
                inv_i_b: body_b.inv_i,
                kind: manifold.kind,
                radius_a: fa.shape.radius(),
                radius_b: fb.shape.radius(),
                point_count: manifold.point_count,
            };

            for (j, cp) in manifold.points().iter().enumerate() {
                let vcp = &mut vc.points[j];
                if step.warm_starting {
                    vcp.normal_impulse = step.dt_ratio * cp.normal_impulse;
                    vcp.tangent_impulse = step.dt_ratio * cp.tangent_impulse;
                }
                pc.local_points[j] = cp.local_point;
            }

            solver.velocity_constraints.push(vc);
            solver.position_constraints.push(pc);
        }

        solver
    }

    /// Number of constraints
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.velocity_constraints.len()
    }

    /// Compute anchors, effective masses and restitution bias.
    pub(crate) fn initialize_velocity_constraints(
        &mut self,
        contacts: &SlotMap<ContactHandle, Contact>,
        positions: &[Position],
        velocities: &[Velocity],
    ) {
        for (vc, pc) in self
            .velocity_constraints
            .iter_mut()
            .zip(self.position_constraints.iter())
        {
            let Some(contact) = contacts.get(vc.contact) else {
                continue;
            };
            let (m_a, m_b, i_a, i_b) = (vc.inv_mass_a, vc.inv_mass_b, vc.inv_i_a, vc.inv_i_b);

            let Position { c: c_a, a: a_a } = positions[vc.index_a];
            let Velocity { v: v_a, w: w_a } = velocities[vc.index_a];
            let Position { c: c_b, a: a_b } = positions[vc.index_b];
            let Velocity { v: v_b, w: w_b } = velocities[vc.index_b];

            let xf_a = body_transform(c_a, a_a, pc.local_center_a);
            let xf_b = body_transform(c_b, a_b, pc.local_center_b);

            let world_manifold = WorldManifold::new(&contact.manifold, &xf_a, pc.radius_a, &xf_b, pc.radius_b);
            vc.normal = world_manifold.normal;
            let tangent = cross_vs(vc.normal, 1.0);

            for j in 0..vc.point_count {
                let vcp = &mut vc.points[j];
                vcp.r_a = world_manifold.points[j] - c_a;
                vcp.r_b = world_manifold.points[j] - c_b;

                let rn_a = vcp.r_a.cross(vc.normal);
                let rn_b = vcp.r_b.cross(vc.normal);
                let k_normal = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;
                vcp.normal_mass = if k_normal > 0.0 { 1.0 / k_normal } else { 0.0 };

                let rt_a = vcp.r_a.cross(tangent);
                let rt_b = vcp.r_b.cross(tangent);
                let k_tangent = m_a + m_b + i_a * rt_a * rt_a + i_b * rt_b * rt_b;
                vcp.tangent_mass = if k_tangent > 0.0 { 1.0 / k_tangent } else { 0.0 };

                // restitution bias
                vcp.velocity_bias = 0.0;
                let v_rel = vc.normal.dot(v_b + cross_sv(w_b, vcp.r_b) - v_a - cross_sv(w_a, vcp.r_a));
                if v_rel < -vc.threshold {
                    vcp.velocity_bias = -vc.restitution * v_rel;
                }
            }

            if vc.point_count == 2 && BLOCK_SOLVE {
                let vcp1 = vc.points[0];
                let vcp2 = vc.points[1];

                let rn1_a = vcp1.r_a.cross(vc.normal);
                let rn1_b = vcp1.r_b.cross(vc.normal);
                let rn2_a = vcp2.r_a.cross(vc.normal);
                let rn2_b = vcp2.r_b.cross(vc.normal);

                let k11 = m_a + m_b + i_a * rn1_a * rn1_a + i_b * rn1_b * rn1_b;
                let k22 = m_a + m_b + i_a * rn2_a * rn2_a + i_b * rn2_b * rn2_b;
                let k12 = m_a + m_b + i_a * rn1_a * rn2_a + i_b * rn1_b * rn2_b;

                if k11 * k11 < MAX_CONDITION_NUMBER * (k11 * k22 - k12 * k12) {
                    vc.k = Mat22::from_cols(Vec2::new(k11, k12), Vec2::new(k12, k22));
                    vc.normal_mass = vc.k.inverse();
                } else {
                    // ill-conditioned: solve the first point only
                    vc.point_count = 1;
                }
            }
        }
    }

    /// Apply the cached impulses.
    pub(crate) fn warm_start(&self, velocities: &mut [Velocity]) {
        for vc in &self.velocity_constraints {
            let (m_a, m_b, i_a, i_b) = (vc.inv_mass_a, vc.inv_mass_b, vc.inv_i_a, vc.inv_i_b);
            let Velocity { v: mut v_a, w: mut w_a } = velocities[vc.index_a];
            let Velocity { v: mut v_b, w: mut w_b } = velocities[vc.index_b];

            let normal = vc.normal;
            let tangent = cross_vs(normal, 1.0);

            for vcp in &vc.points[..vc.point_count] {
                let p = normal * vcp.normal_impulse + tangent * vcp.tangent_impulse;
                w_a -= i_a * vcp.r_a.cross(p);
                v_a -= p * m_a;
                w_b += i_b * vcp.r_b.cross(p);
                v_b += p * m_b;
            }

            velocities[vc.index_a] = Velocity { v: v_a, w: w_a };
            velocities[vc.index_b] = Velocity { v: v_b, w: w_b };
        }
    }

    /// One sequential-impulse pass over all contacts.
    pub(crate) fn solve_velocity_constraints(&mut self, velocities: &mut [Velocity]) {
        for vc in &mut self.velocity_constraints {
            let (m_a, m_b, i_a, i_b) = (vc.inv_mass_a, vc.inv_mass_b, vc.inv_i_a, vc.inv_i_b);
            let Velocity { v: mut v_a, w: mut w_a } = velocities[vc.index_a];
            let Velocity { v: mut v_b, w: mut w_b } = velocities[vc.index_b];

            let normal = vc.normal;
            let tangent = cross_vs(normal, 1.0);
            let friction = vc.friction;

            // friction first: non-penetration matters more
            for vcp in &mut vc.points[..vc.point_count] {
                let dv = v_b + cross_sv(w_b, vcp.r_b) - v_a - cross_sv(w_a, vcp.r_a);
                let vt = dv.dot(tangent) - vc.tangent_speed;
                let mut lambda = vcp.tangent_mass * (-vt);

                let max_friction = friction * vcp.normal_impulse;
                let new_impulse = (vcp.tangent_impulse + lambda).clamp(-max_friction, max_friction);
                lambda = new_impulse - vcp.tangent_impulse;
                vcp.tangent_impulse = new_impulse;

                let p = tangent * lambda;
                v_a -= p * m_a;
                w_a -= i_a * vcp.r_a.cross(p);
                v_b += p * m_b;
                w_b += i_b * vcp.r_b.cross(p);
            }

            if vc.point_count == 1 || !BLOCK_SOLVE {
                for vcp in &mut vc.points[..vc.point_count] {
                    let dv = v_b + cross_sv(w_b, vcp.r_b) - v_a - cross_sv(w_a, vcp.r_a);
                    let vn = dv.dot(normal);
                    let mut lambda = -vcp.normal_mass * (vn - vcp.velocity_bias);

                    let new_impulse = (vcp.normal_impulse + lambda).max(0.0);
                    lambda = new_impulse - vcp.normal_impulse;
                    vcp.normal_impulse = new_impulse;

                    let p = normal * lambda;
                    v_a -= p * m_a;
                    w_a -= i_a * vcp.r_a.cross(p);
                    v_b += p * m_b;
                    w_b += i_b * vcp.r_b.cross(p);
                }
            } else {
                // Block solver: find x >= 0 with vn = A x + b >= 0 and
                // x_i * vn_i = 0 by enumerating the four active sets.
                let cp1 = vc.points[0];
                let cp2 = vc.points[1];

                let a = Vec2::new(cp1.normal_impulse, cp2.normal_impulse);
                debug_assert!(a.x >= 0.0 && a.y >= 0.0);

                let dv1 = v_b + cross_sv(w_b, cp1.r_b) - v_a - cross_sv(w_a, cp1.r_a);
                let dv2 = v_b + cross_sv(w_b, cp2.r_b) - v_a - cross_sv(w_a, cp2.r_a);
                let vn1 = dv1.dot(normal);
                let vn2 = dv2.dot(normal);

                let mut b = Vec2::new(vn1 - cp1.velocity_bias, vn2 - cp2.velocity_bias);
                b -= vc.k.mul_vec(a);

                let mut apply = |x: Vec2| {
                    let d = x - a;
                    let p1 = normal * d.x;
                    let p2 = normal * d.y;
                    v_a -= (p1 + p2) * m_a;
                    w_a -= i_a * (cp1.r_a.cross(p1) + cp2.r_a.cross(p2));
                    v_b += (p1 + p2) * m_b;
                    w_b += i_b * (cp1.r_b.cross(p1) + cp2.r_b.cross(p2));
                    x
                };

                // both points active
                let x = -vc.normal_mass.mul_vec(b);
                let solved = if x.x >= 0.0 && x.y >= 0.0 {
                    Some(apply(x))
                } else {
                    // only the first point active
                    let x = Vec2::new(-cp1.normal_mass * b.x, 0.0);
                    let vn2 = vc.k.ex.y * x.x + b.y;
                    if x.x >= 0.0 && vn2 >= 0.0 {
                        Some(apply(x))
                    } else {
                        // only the second point active
                        let x = Vec2::new(0.0, -cp2.normal_mass * b.y);
                        let vn1 = vc.k.ey.x * x.y + b.x;
                        if x.y >= 0.0 && vn1 >= 0.0 {
                            Some(apply(x))
                        } else if b.x >= 0.0 && b.y >= 0.0 {
                            // neither point active
                            Some(apply(Vec2::ZERO))
                        } else {
                            // no solution; keep the impulses for this iteration
                            None
                        }
                    }
                };

                if let Some(x) = solved {
                    vc.points[0].normal_impulse = x.x;
                    vc.points[1].normal_impulse = x.y;
                }
            }

            velocities[vc.index_a] = Velocity { v: v_a, w: w_a };
            velocities[vc.index_b] = Velocity { v: v_b, w: w_b };
        }
    }

    /// Copy the accumulated impulses back into the manifolds.
    pub(crate) fn store_impulses(&self, contacts: &mut SlotMap<ContactHandle, Contact>) {
        for vc in &self.velocity_constraints {
            let Some(contact) = contacts.get_mut(vc.contact) else {
                continue;
            };
            for j in 0..vc.point_count {
                contact.manifold.points[j].normal_impulse = vc.points[j].normal_impulse;
                contact.manifold.points[j].tangent_impulse = vc.points[j].tangent_impulse;
            }
        }
    }

    /// Impulses of constraint `index`, for post-solve reporting.
    pub(crate) fn impulse(&self, index: usize) -> (ContactHandle, ContactImpulse) {
        let vc = &self.velocity_constraints[index];
        let mut impulse = ContactImpulse {
            count: vc.point_count,
            ..ContactImpulse::default()
        };
        for j in 0..vc.point_count {
            impulse.normal_impulses[j] = vc.points[j].normal_impulse;
            impulse.tangent_impulses[j] = vc.points[j].tangent_impulse;
        }
        (vc.contact, impulse)
    }

    /// One position pass. Returns true when the worst separation is within
    /// `-3 * LINEAR_SLOP`.
    pub(crate) fn solve_position_constraints(&self, positions: &mut [Position]) -> bool {
        let mut min_separation = 0.0_f32;

        for pc in &self.position_constraints {
            let (m_a, i_a, m_b, i_b) = (pc.inv_mass_a, pc.inv_i_a, pc.inv_mass_b, pc.inv_i_b);
            min_separation = min_separation.min(Self::solve_position_constraint(
                pc, positions, m_a, i_a, m_b, i_b, BAUMGARTE,
            ));
        }

        // cannot expect anything better than -3 slop
        min_separation >= -3.0 * LINEAR_SLOP
    }

    /// Position pass for a TOI sub-step: only the two TOI bodies move.
    pub(crate) fn solve_toi_position_constraints(
        &self,
        positions: &mut [Position],
        toi_index_a: usize,
        toi_index_b: usize,
    ) -> bool {
        let mut min_separation = 0.0_f32;

        for pc in &self.position_constraints {
            let (mut m_a, mut i_a, mut m_b, mut i_b) = (0.0, 0.0, 0.0, 0.0);
            if pc.index_a == toi_index_a || pc.index_a == toi_index_b {
                m_a = pc.inv_mass_a;
                i_a = pc.inv_i_a;
            }
            if pc.index_b == toi_index_a || pc.index_b == toi_index_b {
                m_b = pc.inv_mass_b;
                i_b = pc.inv_i_b;
            }
            min_separation = min_separation.min(Self::solve_position_constraint(
                pc, positions, m_a, i_a, m_b, i_b, TOI_BAUMGARTE,
            ));
        }

        min_separation >= -1.5 * LINEAR_SLOP
    }

    fn solve_position_constraint(
        pc: &ContactPositionConstraint,
        positions: &mut [Position],
        m_a: f32,
        i_a: f32,
        m_b: f32,
        i_b: f32,
        baumgarte: f32,
    ) -> f32 {
        let mut min_separation = 0.0_f32;

        let Position { c: mut c_a, a: mut a_a } = positions[pc.index_a];
        let Position { c: mut c_b, a: mut a_b } = positions[pc.index_b];

        for j in 0..pc.point_count {
            let xf_a = body_transform(c_a, a_a, pc.local_center_a);
            let xf_b = body_transform(c_b, a_b, pc.local_center_b);

            let psm = PositionSolverManifold::new(pc, &xf_a, &xf_b, j);
            let normal = psm.normal;
            let r_a = psm.point - c_a;
            let r_b = psm.point - c_b;

            min_separation = min_separation.min(psm.separation);

            // prevent large corrections and allow slop
            let c = (baumgarte * (psm.separation + LINEAR_SLOP)).clamp(-MAX_LINEAR_CORRECTION, 0.0);

            let rn_a = r_a.cross(normal);
            let rn_b = r_b.cross(normal);
            let k = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;
            let impulse = if k > 0.0 { -c / k } else { 0.0 };

            let p = normal * impulse;
            c_a -= p * m_a;
            a_a -= i_a * r_a.cross(p);
            c_b += p * m_b;
            a_b += i_b * r_b.cross(p);
        }

        positions[pc.index_a] = Position { c: c_a, a: a_a };
        positions[pc.index_b] = Position { c: c_b, a: a_b };
        min_separation
    }
}
