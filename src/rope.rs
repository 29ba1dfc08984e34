//! Rope Simulation (PBD / XPBD Particle Chain)
//!
//! A chain of particles held together by stretch constraints between
//! neighbours and bend constraints over every consecutive triple. The rope
//! is independent of the rigid body world.
//!
//! # Features
//!
//! - PBD or XPBD stretching
//! - Six bending models: spring forces, PBD angle, XPBD angle, PBD
//!   distance, PBD height, PBD triangle
//! - Pinned particles (zero mass) follow the rope origin
//! - Gravity and exponential damping
//!
//! Author: Moroya Sakamoto

use crate::debug_draw::{Color, Draw};
use crate::error::{ConfigurationError, PhysicsError};
use crate::math::Vec2;
use crate::settings::PI;

// ============================================================================
// Tuning
// ============================================================================

/// How neighbouring particles keep their distance
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StretchingModel {
    /// Position-based, scaled by `stretch_stiffness`
    #[default]
    Pbd,
    /// Extended position-based with compliance from `stretch_hertz`
    Xpbd,
}

/// How particle triples resist bending
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BendingModel {
    /// Angular springs applied as velocity impulses
    SpringAngle,
    /// Position-based angle constraint
    #[default]
    PbdAngle,
    /// Extended position-based angle constraint
    XpbdAngle,
    /// Distance between the outer particles of a triple
    PbdDistance,
    /// Height of the middle particle over the outer segment
    PbdHeight,
    /// Triangle centroid constraint
    PbdTriangle,
}

/// Rope solver tuning
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RopeTuning {
    /// Stretch solver
    pub stretching_model: StretchingModel,
    /// Bend solver
    pub bending_model: BendingModel,
    /// Exponential velocity damping (1/s)
    pub damping: f32,
    /// PBD stretch stiffness in [0, 1]
    pub stretch_stiffness: f32,
    /// XPBD stretch frequency (Hz)
    pub stretch_hertz: f32,
    /// XPBD stretch damping ratio
    pub stretch_damping: f32,
    /// PBD bend stiffness in [0, 1]
    pub bend_stiffness: f32,
    /// XPBD and spring bend frequency (Hz)
    pub bend_hertz: f32,
    /// XPBD and spring bend damping ratio
    pub bend_damping: f32,
    /// Use rest lengths instead of current lengths in angle models
    pub isometric: bool,
    /// Use the effective mass of the rest configuration
    pub fixed_effective_mass: bool,
    /// Reserved for warm starting XPBD multipliers
    pub warm_start: bool,
}

impl Default for RopeTuning {
    fn default() -> Self {
        Self {
            stretching_model: StretchingModel::Pbd,
            bending_model: BendingModel::PbdAngle,
            damping: 0.0,
            stretch_stiffness: 1.0,
            stretch_hertz: 1.0,
            stretch_damping: 0.0,
            bend_stiffness: 0.5,
            bend_hertz: 1.0,
            bend_damping: 0.0,
            isometric: false,
            fixed_effective_mass: false,
            warm_start: false,
        }
    }
}

/// Rope construction parameters
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RopeDef {
    /// Origin added to every vertex
    pub position: Vec2,
    /// Particle positions relative to `position` (at least three)
    pub vertices: Vec<Vec2>,
    /// Particle masses; zero pins a particle to the origin
    pub masses: Vec<f32>,
    /// Gravity acceleration
    pub gravity: Vec2,
    /// Solver tuning
    pub tuning: RopeTuning,
}

impl RopeDef {
    /// Straight rope of `count` particles from `start` to `end` (relative to
    /// `position`), first particle pinned.
    #[must_use]
    pub fn straight(start: Vec2, end: Vec2, count: usize, mass: f32) -> Self {
        let segments = count.saturating_sub(1).max(1) as f32;
        let vertices = (0..count)
            .map(|i| start + (i as f32 / segments) * (end - start))
            .collect();
        let mut masses = vec![mass; count];
        if let Some(first) = masses.first_mut() {
            *first = 0.0;
        }
        Self {
            vertices,
            masses,
            ..Self::default()
        }
    }

    /// Set gravity
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set tuning
    #[must_use]
    pub fn with_tuning(mut self, tuning: RopeTuning) -> Self {
        self.tuning = tuning;
        self
    }
}

// ============================================================================
// Constraints
// ============================================================================

#[derive(Clone, Copy, Debug, Default)]
struct Stretch {
    i1: usize,
    i2: usize,
    inv_mass1: f32,
    inv_mass2: f32,
    rest_length: f32,
    lambda: f32,
    spring: f32,
    damper: f32,
}

#[derive(Clone, Copy, Debug, Default)]
struct Bend {
    i1: usize,
    i2: usize,
    i3: usize,
    inv_mass1: f32,
    inv_mass2: f32,
    inv_mass3: f32,
    inv_effective_mass: f32,
    lambda: f32,
    l1: f32,
    l2: f32,
    alpha1: f32,
    alpha2: f32,
    spring: f32,
    damper: f32,
}

/// Gradients of the bend angle of a triple with respect to its particles.
fn angle_jacobian(d1: Vec2, d2: Vec2, l1_sqr: f32, l2_sqr: f32) -> [Vec2; 3] {
    let jd1 = (-1.0 / l1_sqr) * d1.skew();
    let jd2 = (1.0 / l2_sqr) * d2.skew();
    [-jd1, jd1 - jd2, jd2]
}

impl Bend {
    fn inv_mass_sum(&self, j: &[Vec2; 3]) -> f32 {
        self.inv_mass1 * j[0].dot(j[0]) + self.inv_mass2 * j[1].dot(j[1]) + self.inv_mass3 * j[2].dot(j[2])
    }
}

// ============================================================================
// Rope
// ============================================================================

/// Particle chain.
#[derive(Clone, Debug)]
pub struct Rope {
    position: Vec2,
    bind_positions: Vec<Vec2>,
    ps: Vec<Vec2>,
    p0s: Vec<Vec2>,
    vs: Vec<Vec2>,
    inv_masses: Vec<f32>,
    stretch: Vec<Stretch>,
    bend: Vec<Bend>,
    gravity: Vec2,
    tuning: RopeTuning,
}

impl Rope {
    /// Build a rope. Needs at least three particles and one mass per vertex.
    pub fn new(def: &RopeDef) -> Result<Self, PhysicsError> {
        if def.vertices.len() < 3 {
            return Err(ConfigurationError::InvalidParameter {
                reason: "rope needs at least three particles",
            }
            .into());
        }
        if def.masses.len() != def.vertices.len() {
            return Err(ConfigurationError::InvalidParameter {
                reason: "rope needs one mass per particle",
            }
            .into());
        }

        let ps: Vec<Vec2> = def.vertices.iter().map(|&v| v + def.position).collect();
        let inv_masses: Vec<f32> = def
            .masses
            .iter()
            .map(|&m| if m > 0.0 { 1.0 / m } else { 0.0 })
            .collect();

        let stretch = (0..ps.len() - 1)
            .map(|i| Stretch {
                i1: i,
                i2: i + 1,
                inv_mass1: inv_masses[i],
                inv_mass2: inv_masses[i + 1],
                rest_length: (ps[i + 1] - ps[i]).length(),
                ..Stretch::default()
            })
            .collect();

        let bend = (0..ps.len() - 2)
            .map(|i| {
                let (p1, p2, p3) = (ps[i], ps[i + 1], ps[i + 2]);
                let mut c = Bend {
                    i1: i,
                    i2: i + 1,
                    i3: i + 2,
                    inv_mass1: inv_masses[i],
                    inv_mass2: inv_masses[i + 1],
                    inv_mass3: inv_masses[i + 2],
                    l1: (p2 - p1).length(),
                    l2: (p3 - p2).length(),
                    ..Bend::default()
                };

                let e1 = p2 - p1;
                let e2 = p3 - p2;
                let (l1_sqr, l2_sqr) = (e1.length_squared(), e2.length_squared());
                if l1_sqr * l2_sqr == 0.0 {
                    return c;
                }
                let j = angle_jacobian(e1, e2, l1_sqr, l2_sqr);
                c.inv_effective_mass = c.inv_mass_sum(&j);

                let r = p3 - p1;
                let rr = r.length_squared();
                if rr > 0.0 {
                    c.alpha1 = e2.dot(r) / rr;
                    c.alpha2 = e1.dot(r) / rr;
                }
                c
            })
            .collect();

        let mut rope = Self {
            position: def.position,
            bind_positions: def.vertices.clone(),
            p0s: ps.clone(),
            vs: vec![Vec2::ZERO; ps.len()],
            ps,
            inv_masses,
            stretch,
            bend,
            gravity: def.gravity,
            tuning: def.tuning,
        };
        rope.set_tuning(def.tuning);
        Ok(rope)
    }

    /// Current tuning
    #[must_use]
    pub fn tuning(&self) -> &RopeTuning {
        &self.tuning
    }

    /// Replace the tuning and recompute spring and damper coefficients.
    pub fn set_tuning(&mut self, tuning: RopeTuning) {
        self.tuning = tuning;

        let bend_omega = 2.0 * PI * tuning.bend_hertz;
        for c in &mut self.bend {
            let (l1_sqr, l2_sqr) = (c.l1 * c.l1, c.l2 * c.l2);
            if l1_sqr * l2_sqr == 0.0 {
                c.spring = 0.0;
                c.damper = 0.0;
                continue;
            }

            // effective mass of the flattened triple
            let j2 = 1.0 / c.l1 + 1.0 / c.l2;
            let sum = c.inv_mass1 / l1_sqr + c.inv_mass2 * j2 * j2 + c.inv_mass3 / l2_sqr;
            if sum == 0.0 {
                c.spring = 0.0;
                c.damper = 0.0;
                continue;
            }
            let mass = 1.0 / sum;
            c.spring = mass * bend_omega * bend_omega;
            c.damper = 2.0 * mass * tuning.bend_damping * bend_omega;
        }

        let stretch_omega = 2.0 * PI * tuning.stretch_hertz;
        for c in &mut self.stretch {
            let sum = c.inv_mass1 + c.inv_mass2;
            if sum == 0.0 {
                continue;
            }
            let mass = 1.0 / sum;
            c.spring = mass * stretch_omega * stretch_omega;
            c.damper = 2.0 * mass * tuning.stretch_damping * stretch_omega;
        }
    }

    /// Origin of the last reset
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Particle positions
    #[must_use]
    pub fn positions(&self) -> &[Vec2] {
        &self.ps
    }

    /// Particle velocities
    #[must_use]
    pub fn velocities(&self) -> &[Vec2] {
        &self.vs
    }

    /// Number of particles
    #[must_use]
    pub fn particle_count(&self) -> usize {
        self.ps.len()
    }

    /// Sum of the current segment lengths
    #[must_use]
    pub fn current_length(&self) -> f32 {
        self.ps.windows(2).map(|w| (w[1] - w[0]).length()).sum()
    }

    /// Sum of the rest segment lengths
    #[must_use]
    pub fn rest_length(&self) -> f32 {
        self.stretch.iter().map(|c| c.rest_length).sum()
    }

    /// Advance by `dt`. Pinned particles move to their bind positions
    /// relative to `position`.
    pub fn step(&mut self, dt: f32, iterations: u32, position: Vec2) {
        if dt == 0.0 {
            return;
        }

        let inv_dt = 1.0 / dt;
        let d = (-dt * self.tuning.damping).exp();

        for i in 0..self.ps.len() {
            if self.inv_masses[i] > 0.0 {
                self.vs[i] *= d;
                self.vs[i] += dt * self.gravity;
            } else {
                self.vs[i] = inv_dt * (self.bind_positions[i] + position - self.p0s[i]);
            }
        }

        if self.tuning.bending_model == BendingModel::SpringAngle {
            self.apply_bend_forces(dt);
        }

        for c in &mut self.bend {
            c.lambda = 0.0;
        }
        for c in &mut self.stretch {
            c.lambda = 0.0;
        }

        for (p, &v) in self.ps.iter_mut().zip(&self.vs) {
            *p += dt * v;
        }

        for _ in 0..iterations {
            match self.tuning.bending_model {
                BendingModel::SpringAngle => {}
                BendingModel::PbdAngle => self.solve_bend_pbd_angle(),
                BendingModel::XpbdAngle => self.solve_bend_xpbd_angle(dt),
                BendingModel::PbdDistance => self.solve_bend_pbd_distance(),
                BendingModel::PbdHeight => self.solve_bend_pbd_height(),
                BendingModel::PbdTriangle => self.solve_bend_pbd_triangle(),
            }

            match self.tuning.stretching_model {
                StretchingModel::Pbd => self.solve_stretch_pbd(),
                StretchingModel::Xpbd => self.solve_stretch_xpbd(dt),
            }
        }

        for i in 0..self.ps.len() {
            self.vs[i] = inv_dt * (self.ps[i] - self.p0s[i]);
            self.p0s[i] = self.ps[i];
        }
    }

    /// Put every particle back on its bind position relative to `position`
    /// and stop all motion.
    pub fn reset(&mut self, position: Vec2) {
        self.position = position;
        for i in 0..self.ps.len() {
            self.ps[i] = self.bind_positions[i] + position;
            self.p0s[i] = self.ps[i];
            self.vs[i] = Vec2::ZERO;
        }
        for c in &mut self.bend {
            c.lambda = 0.0;
        }
        for c in &mut self.stretch {
            c.lambda = 0.0;
        }
    }

    /// Draw segments, with pinned particles green and free ones red.
    pub fn draw(&self, draw: &mut dyn Draw) {
        let segment = Color::rgb(0.4, 0.5, 0.7);
        let pinned = Color::rgb(0.1, 0.8, 0.1);
        let free = Color::rgb(0.7, 0.2, 0.4);

        for w in self.ps.windows(2) {
            draw.draw_segment(w[0], w[1], segment);
        }
        for (&p, &inv_mass) in self.ps.iter().zip(&self.inv_masses) {
            draw.draw_point(p, 5.0, if inv_mass > 0.0 { free } else { pinned });
        }
    }

    fn solve_stretch_pbd(&mut self) {
        let stiffness = self.tuning.stretch_stiffness;
        for c in &self.stretch {
            let mut p1 = self.ps[c.i1];
            let mut p2 = self.ps[c.i2];

            let mut d = p2 - p1;
            let length = d.normalize_mut();

            let sum = c.inv_mass1 + c.inv_mass2;
            if sum == 0.0 {
                continue;
            }
            let s1 = c.inv_mass1 / sum;
            let s2 = c.inv_mass2 / sum;

            p1 -= (stiffness * s1 * (c.rest_length - length)) * d;
            p2 += (stiffness * s2 * (c.rest_length - length)) * d;

            self.ps[c.i1] = p1;
            self.ps[c.i2] = p2;
        }
    }

    fn solve_stretch_xpbd(&mut self, dt: f32) {
        for c in &mut self.stretch {
            let sum = c.inv_mass1 + c.inv_mass2;
            if sum == 0.0 || c.spring == 0.0 {
                continue;
            }

            let mut p1 = self.ps[c.i1];
            let mut p2 = self.ps[c.i2];
            let dp1 = p1 - self.p0s[c.i1];
            let dp2 = p2 - self.p0s[c.i2];

            let mut u = p2 - p1;
            let length = u.normalize_mut();
            let (j1, j2) = (-u, u);

            let alpha = 1.0 / (c.spring * dt * dt);
            let beta = dt * dt * c.damper;
            let sigma = alpha * beta / dt;
            let constraint = length - c.rest_length;

            // damping uses the displacement since the step began
            let cdot = j1.dot(dp1) + j2.dot(dp2);

            let b = constraint + alpha * c.lambda + sigma * cdot;
            let impulse = -b / ((1.0 + sigma) * sum + alpha);

            p1 += (c.inv_mass1 * impulse) * j1;
            p2 += (c.inv_mass2 * impulse) * j2;

            self.ps[c.i1] = p1;
            self.ps[c.i2] = p2;
            c.lambda += impulse;
        }
    }

    /// Squared edge lengths of a triple for the angle models.
    fn edge_lengths_sqr(&self, c: &Bend, d1: Vec2, d2: Vec2) -> (f32, f32) {
        if self.tuning.isometric {
            (c.l1 * c.l1, c.l2 * c.l2)
        } else {
            (d1.length_squared(), d2.length_squared())
        }
    }

    fn solve_bend_pbd_angle(&mut self) {
        let stiffness = self.tuning.bend_stiffness;
        for k in 0..self.bend.len() {
            let c = self.bend[k];
            let (p1, p2, p3) = (self.ps[c.i1], self.ps[c.i2], self.ps[c.i3]);
            let d1 = p2 - p1;
            let d2 = p3 - p2;
            let angle = d1.cross(d2).atan2(d1.dot(d2));

            let (l1_sqr, l2_sqr) = self.edge_lengths_sqr(&c, d1, d2);
            if l1_sqr * l2_sqr == 0.0 {
                continue;
            }

            let j = angle_jacobian(d1, d2, l1_sqr, l2_sqr);
            let mut sum = if self.tuning.fixed_effective_mass {
                c.inv_effective_mass
            } else {
                c.inv_mass_sum(&j)
            };
            if sum == 0.0 {
                sum = c.inv_effective_mass;
            }
            if sum == 0.0 {
                continue;
            }

            let impulse = -stiffness * angle / sum;
            self.ps[c.i1] = p1 + (c.inv_mass1 * impulse) * j[0];
            self.ps[c.i2] = p2 + (c.inv_mass2 * impulse) * j[1];
            self.ps[c.i3] = p3 + (c.inv_mass3 * impulse) * j[2];
        }
    }

    fn solve_bend_xpbd_angle(&mut self, dt: f32) {
        for k in 0..self.bend.len() {
            let c = self.bend[k];
            if c.spring == 0.0 {
                continue;
            }
            let (p1, p2, p3) = (self.ps[c.i1], self.ps[c.i2], self.ps[c.i3]);
            let dp1 = p1 - self.p0s[c.i1];
            let dp2 = p2 - self.p0s[c.i2];
            let dp3 = p3 - self.p0s[c.i3];

            let d1 = p2 - p1;
            let d2 = p3 - p2;
            let (l1_sqr, l2_sqr) = self.edge_lengths_sqr(&c, d1, d2);
            if l1_sqr * l2_sqr == 0.0 {
                continue;
            }

            let angle = d1.cross(d2).atan2(d1.dot(d2));
            let j = angle_jacobian(d1, d2, l1_sqr, l2_sqr);
            let sum = if self.tuning.fixed_effective_mass {
                c.inv_effective_mass
            } else {
                c.inv_mass_sum(&j)
            };
            if sum == 0.0 {
                continue;
            }

            let alpha = 1.0 / (c.spring * dt * dt);
            let beta = dt * dt * c.damper;
            let sigma = alpha * beta / dt;
            let cdot = j[0].dot(dp1) + j[1].dot(dp2) + j[2].dot(dp3);

            let b = angle + alpha * c.lambda + sigma * cdot;
            let impulse = -b / ((1.0 + sigma) * sum + alpha);

            self.ps[c.i1] = p1 + (c.inv_mass1 * impulse) * j[0];
            self.ps[c.i2] = p2 + (c.inv_mass2 * impulse) * j[1];
            self.ps[c.i3] = p3 + (c.inv_mass3 * impulse) * j[2];
            self.bend[k].lambda += impulse;
        }
    }

    fn apply_bend_forces(&mut self, dt: f32) {
        let omega = 2.0 * PI * self.tuning.bend_hertz;
        for k in 0..self.bend.len() {
            let c = self.bend[k];
            let (p1, p2, p3) = (self.ps[c.i1], self.ps[c.i2], self.ps[c.i3]);
            let (v1, v2, v3) = (self.vs[c.i1], self.vs[c.i2], self.vs[c.i3]);

            let d1 = p2 - p1;
            let d2 = p3 - p2;
            let (l1_sqr, l2_sqr) = self.edge_lengths_sqr(&c, d1, d2);
            if l1_sqr * l2_sqr == 0.0 {
                continue;
            }

            let angle = d1.cross(d2).atan2(d1.dot(d2));
            let j = angle_jacobian(d1, d2, l1_sqr, l2_sqr);
            let sum = if self.tuning.fixed_effective_mass {
                c.inv_effective_mass
            } else {
                c.inv_mass_sum(&j)
            };
            if sum == 0.0 {
                continue;
            }

            let mass = 1.0 / sum;
            let spring = mass * omega * omega;
            let damper = 2.0 * mass * self.tuning.bend_damping * omega;

            let cdot = j[0].dot(v1) + j[1].dot(v2) + j[2].dot(v3);
            let impulse = -dt * (spring * angle + damper * cdot);

            self.vs[c.i1] += (c.inv_mass1 * impulse) * j[0];
            self.vs[c.i2] += (c.inv_mass2 * impulse) * j[1];
            self.vs[c.i3] += (c.inv_mass3 * impulse) * j[2];
        }
    }

    fn solve_bend_pbd_distance(&mut self) {
        let stiffness = self.tuning.bend_stiffness;
        for c in &self.bend {
            let mut p1 = self.ps[c.i1];
            let mut p3 = self.ps[c.i3];

            let mut d = p3 - p1;
            let length = d.normalize_mut();

            let sum = c.inv_mass1 + c.inv_mass3;
            if sum == 0.0 {
                continue;
            }
            let s1 = c.inv_mass1 / sum;
            let s3 = c.inv_mass3 / sum;
            let error = c.l1 + c.l2 - length;

            p1 -= (stiffness * s1 * error) * d;
            p3 += (stiffness * s3 * error) * d;

            self.ps[c.i1] = p1;
            self.ps[c.i3] = p3;
        }
    }

    fn solve_bend_pbd_height(&mut self) {
        let stiffness = self.tuning.bend_stiffness;
        for c in &self.bend {
            let (p1, p2, p3) = (self.ps[c.i1], self.ps[c.i2], self.ps[c.i3]);

            // barycentric weights stay at their rest values
            let d = c.alpha1 * p1 + c.alpha2 * p3 - p2;
            let d_len = d.length();
            if d_len == 0.0 {
                continue;
            }
            let d_hat = (1.0 / d_len) * d;
            let (j1, j2, j3) = (c.alpha1 * d_hat, -d_hat, c.alpha2 * d_hat);

            let sum = c.inv_mass1 * c.alpha1 * c.alpha1 + c.inv_mass2 + c.inv_mass3 * c.alpha2 * c.alpha2;
            if sum == 0.0 {
                continue;
            }

            let impulse = -stiffness * d_len / sum;
            self.ps[c.i1] = p1 + (c.inv_mass1 * impulse) * j1;
            self.ps[c.i2] = p2 + (c.inv_mass2 * impulse) * j2;
            self.ps[c.i3] = p3 + (c.inv_mass3 * impulse) * j3;
        }
    }

    fn solve_bend_pbd_triangle(&mut self) {
        let stiffness = self.tuning.bend_stiffness;
        for c in &self.bend {
            let (b0, v, b1) = (self.ps[c.i1], self.ps[c.i2], self.ps[c.i3]);
            let (wb0, wv, wb1) = (c.inv_mass1, c.inv_mass2, c.inv_mass3);

            let w = wb0 + wb1 + 2.0 * wv;
            if w == 0.0 {
                continue;
            }
            let inv_w = stiffness / w;

            let d = v - (1.0 / 3.0) * (b0 + v + b1);

            self.ps[c.i1] = b0 + (2.0 * wb0 * inv_w) * d;
            self.ps[c.i2] = v + (-4.0 * wv * inv_w) * d;
            self.ps[c.i3] = b1 + (2.0 * wb1 * inv_w) * d;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_draw::{DrawCommand, DrawRecorder};

    fn hanging(tuning: RopeTuning) -> Rope {
        let def = RopeDef::straight(Vec2::ZERO, Vec2::new(4.0, 0.0), 9, 0.5)
            .with_gravity(Vec2::new(0.0, -10.0))
            .with_tuning(tuning);
        Rope::new(&def).unwrap()
    }

    #[test]
    fn test_rope_rejects_short_or_mismatched_defs() {
        let short = RopeDef::straight(Vec2::ZERO, Vec2::new(1.0, 0.0), 2, 1.0);
        assert!(Rope::new(&short).is_err());

        let mut mismatched = RopeDef::straight(Vec2::ZERO, Vec2::new(1.0, 0.0), 4, 1.0);
        mismatched.masses.pop();
        assert!(Rope::new(&mismatched).is_err());
    }

    #[test]
    fn test_rope_falls_but_pin_holds() {
        let mut rope = hanging(RopeTuning::default());
        for _ in 0..60 {
            rope.step(1.0 / 60.0, 4, Vec2::ZERO);
        }
        let ps = rope.positions();
        assert_eq!(ps[0], Vec2::ZERO);
        assert!(ps[8].y < -1.0);
        assert!(ps.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
    }

    #[test]
    fn test_pbd_stretch_preserves_length() {
        let mut rope = hanging(RopeTuning::default());
        for _ in 0..120 {
            rope.step(1.0 / 60.0, 20, Vec2::ZERO);
        }
        let stretch = rope.current_length() / rope.rest_length();
        assert!(stretch < 1.05, "stretch = {stretch}");
    }

    #[test]
    fn test_every_model_stays_finite() {
        let bending = [
            BendingModel::SpringAngle,
            BendingModel::PbdAngle,
            BendingModel::XpbdAngle,
            BendingModel::PbdDistance,
            BendingModel::PbdHeight,
            BendingModel::PbdTriangle,
        ];
        for stretching_model in [StretchingModel::Pbd, StretchingModel::Xpbd] {
            for bending_model in bending {
                let mut rope = hanging(RopeTuning {
                    stretching_model,
                    bending_model,
                    stretch_hertz: 30.0,
                    bend_hertz: 10.0,
                    bend_damping: 0.5,
                    damping: 0.1,
                    ..RopeTuning::default()
                });
                for _ in 0..60 {
                    rope.step(1.0 / 60.0, 8, Vec2::ZERO);
                }
                assert!(
                    rope.positions().iter().all(|p| p.x.is_finite() && p.y.is_finite()),
                    "{stretching_model:?}/{bending_model:?}"
                );
            }
        }
    }

    #[test]
    fn test_pinned_particle_follows_origin_and_reset() {
        let mut rope = hanging(RopeTuning::default());
        rope.step(1.0 / 60.0, 4, Vec2::new(1.0, 2.0));
        let pin = rope.positions()[0];
        assert!((pin - Vec2::new(1.0, 2.0)).length() < 1e-4);

        rope.reset(Vec2::new(-1.0, 0.0));
        assert_eq!(rope.positions()[0], Vec2::new(-1.0, 0.0));
        assert_eq!(rope.positions()[8], Vec2::new(3.0, 0.0));
        assert!(rope.velocities().iter().all(|v| *v == Vec2::ZERO));
    }

    #[test]
    fn test_zero_dt_is_noop() {
        let mut rope = hanging(RopeTuning::default());
        let before = rope.positions().to_vec();
        rope.step(0.0, 4, Vec2::ZERO);
        assert_eq!(rope.positions(), &before[..]);
    }

    #[test]
    fn test_draw_marks_pinned_particles() {
        let rope = hanging(RopeTuning::default());
        let mut recorder = DrawRecorder::new();
        rope.draw(&mut recorder);

        let segments = recorder
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Segment { .. }))
            .count();
        let pinned = recorder
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Point { color, .. } if *color == Color::rgb(0.1, 0.8, 0.1)))
            .count();
        assert_eq!(segments, 8);
        assert_eq!(pinned, 1);
    }
}
