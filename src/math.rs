//! 2D Math Primitives
//!
//! Small value types used by every other module: vectors, rotations,
//! rigid transforms, sweeps and the dense 2x2/3x3 matrices the joint solvers
//! need for their effective-mass systems.
//!
//! # Types
//!
//! - `Vec2` / `Vec3`: column vectors with full operator overloading
//! - `Rot`: rotation stored as (sin, cos)
//! - `Transform`: translation + rotation
//! - `Sweep`: center-of-mass motion over one step, used by continuous collision
//! - `Mat22` / `Mat33`: small dense matrices with direct solvers

use core::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::settings::PI;

// ============================================================================
// Vec2
// ============================================================================

/// 2D column vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
}

impl Vec2 {
    /// Zero vector (0, 0)
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Unit X vector (1, 0)
    pub const UNIT_X: Self = Self { x: 1.0, y: 0.0 };

    /// Unit Y vector (0, 1)
    pub const UNIT_Y: Self = Self { x: 0.0, y: 1.0 };

    /// Create a new vector.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared length (avoids sqrt).
    #[inline]
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Length (magnitude).
    #[inline]
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Normalize in place and return the previous length.
    ///
    /// Vectors shorter than `f32::EPSILON` are left untouched and `0.0` is
    /// returned.
    #[inline]
    pub fn normalize_mut(&mut self) -> f32 {
        let length = self.length();
        if length < f32::EPSILON {
            return 0.0;
        }
        let inv = 1.0 / length;
        self.x *= inv;
        self.y *= inv;
        length
    }

    /// Unit vector in the same direction, or `ZERO` for degenerate input.
    #[inline]
    #[must_use]
    pub fn normalize(self) -> Self {
        let length = self.length();
        if length < f32::EPSILON {
            Self::ZERO
        } else {
            self * (1.0 / length)
        }
    }

    /// Dot product.
    #[inline]
    #[must_use]
    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y
    }

    /// 2D cross product (`a.x * b.y - a.y * b.x`).
    #[inline]
    #[must_use]
    pub fn cross(self, rhs: Self) -> f32 {
        self.x * rhs.y - self.y * rhs.x
    }

    /// Perpendicular vector (counter-clockwise): `(-y, x)`.
    #[inline]
    #[must_use]
    pub fn skew(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Component-wise absolute value.
    #[inline]
    #[must_use]
    pub fn abs(self) -> Self {
        Self::new(self.x.abs(), self.y.abs())
    }

    /// Component-wise minimum.
    #[inline]
    #[must_use]
    pub fn min(self, rhs: Self) -> Self {
        Self::new(self.x.min(rhs.x), self.y.min(rhs.y))
    }

    /// Component-wise maximum.
    #[inline]
    #[must_use]
    pub fn max(self, rhs: Self) -> Self {
        Self::new(self.x.max(rhs.x), self.y.max(rhs.y))
    }

    /// Distance to another point.
    #[inline]
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Squared distance to another point.
    #[inline]
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f32 {
        (self - other).length_squared()
    }

    /// True when both components are finite.
    #[inline]
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Mul<Vec2> for f32 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self * rhs.x, self * rhs.y)
    }
}

impl Div<f32> for Vec2 {
    type Output = Self;
    #[inline]
    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl SubAssign for Vec2 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl MulAssign<f32> for Vec2 {
    #[inline]
    fn mul_assign(&mut self, rhs: f32) {
        self.x *= rhs;
        self.y *= rhs;
    }
}

impl Index<usize> for Vec2 {
    type Output = f32;
    #[inline]
    fn index(&self, i: usize) -> &f32 {
        match i {
            0 => &self.x,
            _ => &self.y,
        }
    }
}

impl IndexMut<usize> for Vec2 {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f32 {
        match i {
            0 => &mut self.x,
            _ => &mut self.y,
        }
    }
}

/// Cross product of a vector and a scalar: `(s * v.y, -s * v.x)`.
#[inline]
#[must_use]
pub fn cross_vs(v: Vec2, s: f32) -> Vec2 {
    Vec2::new(s * v.y, -s * v.x)
}

/// Cross product of a scalar and a vector: `(-s * v.y, s * v.x)`.
#[inline]
#[must_use]
pub fn cross_sv(s: f32, v: Vec2) -> Vec2 {
    Vec2::new(-s * v.y, s * v.x)
}

// ============================================================================
// Vec3
// ============================================================================

/// 3D column vector, used for 3-row joint constraints (point + angle).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    /// Create a new vector.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Dot product.
    #[inline]
    #[must_use]
    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Cross product.
    #[inline]
    #[must_use]
    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }
}

impl Add for Vec3 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

// ============================================================================
// Mat22 / Mat33
// ============================================================================

/// 2x2 matrix stored as two columns.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Mat22 {
    /// First column
    pub ex: Vec2,
    /// Second column
    pub ey: Vec2,
}

impl Mat22 {
    /// Zero matrix
    pub const ZERO: Self = Self {
        ex: Vec2::ZERO,
        ey: Vec2::ZERO,
    };

    /// Construct from columns.
    #[inline]
    #[must_use]
    pub const fn from_cols(ex: Vec2, ey: Vec2) -> Self {
        Self { ex, ey }
    }

    /// Inverse, or the zero matrix when singular.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let (a, b, c, d) = (self.ex.x, self.ey.x, self.ex.y, self.ey.y);
        let mut det = a * d - b * c;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Self {
            ex: Vec2::new(det * d, -det * c),
            ey: Vec2::new(-det * b, det * a),
        }
    }

    /// Solve `A * x = b` directly (cheaper than inverting when solving once).
    #[must_use]
    pub fn solve(&self, b: Vec2) -> Vec2 {
        let (a11, a12, a21, a22) = (self.ex.x, self.ey.x, self.ex.y, self.ey.y);
        let mut det = a11 * a22 - a12 * a21;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec2::new(det * (a22 * b.x - a12 * b.y), det * (a11 * b.y - a21 * b.x))
    }

    /// Matrix-vector product.
    #[inline]
    #[must_use]
    pub fn mul_vec(&self, v: Vec2) -> Vec2 {
        Vec2::new(
            self.ex.x * v.x + self.ey.x * v.y,
            self.ex.y * v.x + self.ey.y * v.y,
        )
    }
}

/// 3x3 matrix stored as three columns.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Mat33 {
    /// First column
    pub ex: Vec3,
    /// Second column
    pub ey: Vec3,
    /// Third column
    pub ez: Vec3,
}

impl Mat33 {
    /// Zero matrix
    pub const ZERO: Self = Self {
        ex: Vec3::ZERO,
        ey: Vec3::ZERO,
        ez: Vec3::ZERO,
    };

    /// Solve `A * x = b` using Cramer's rule. Singular systems yield zero.
    #[must_use]
    pub fn solve33(&self, b: Vec3) -> Vec3 {
        let mut det = self.ex.dot(self.ey.cross(self.ez));
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec3::new(
            det * b.dot(self.ey.cross(self.ez)),
            det * self.ex.dot(b.cross(self.ez)),
            det * self.ex.dot(self.ey.cross(b)),
        )
    }

    /// Solve the upper-left 2x2 block only.
    #[must_use]
    pub fn solve22(&self, b: Vec2) -> Vec2 {
        let (a11, a12, a21, a22) = (self.ex.x, self.ey.x, self.ex.y, self.ey.y);
        let mut det = a11 * a22 - a12 * a21;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec2::new(det * (a22 * b.x - a12 * b.y), det * (a11 * b.y - a21 * b.x))
    }

    /// Inverse of the upper-left 2x2 block, embedded in a 3x3 with zero
    /// third row and column.
    #[must_use]
    pub fn inverse22(&self) -> Self {
        let (a, b, c, d) = (self.ex.x, self.ey.x, self.ex.y, self.ey.y);
        let mut det = a * d - b * c;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Self {
            ex: Vec3::new(det * d, -det * c, 0.0),
            ey: Vec3::new(-det * b, det * a, 0.0),
            ez: Vec3::ZERO,
        }
    }

    /// Symmetric inverse. Returns zero for a singular matrix.
    #[must_use]
    pub fn sym_inverse33(&self) -> Self {
        let mut det = self.ex.dot(self.ey.cross(self.ez));
        if det != 0.0 {
            det = 1.0 / det;
        }

        let (a11, a12, a13) = (self.ex.x, self.ey.x, self.ez.x);
        let (a22, a23) = (self.ey.y, self.ez.y);
        let a33 = self.ez.z;

        let ex = Vec3::new(
            det * (a22 * a33 - a23 * a23),
            det * (a13 * a23 - a12 * a33),
            det * (a12 * a23 - a13 * a22),
        );
        let ey = Vec3::new(ex.y, det * (a11 * a33 - a13 * a13), det * (a13 * a12 - a11 * a23));
        let ez = Vec3::new(ex.z, ey.z, det * (a11 * a22 - a12 * a12));
        Self { ex, ey, ez }
    }

    /// Matrix-vector product.
    #[inline]
    #[must_use]
    pub fn mul_vec3(&self, v: Vec3) -> Vec3 {
        self.ex * v.x + self.ey * v.y + self.ez * v.z
    }

    /// Product with the upper-left 2x2 block.
    #[inline]
    #[must_use]
    pub fn mul_vec2(&self, v: Vec2) -> Vec2 {
        Vec2::new(
            self.ex.x * v.x + self.ey.x * v.y,
            self.ex.y * v.x + self.ey.y * v.y,
        )
    }
}

// ============================================================================
// Rot / Transform
// ============================================================================

/// Rotation stored as sine and cosine of the angle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rot {
    /// Sine
    pub s: f32,
    /// Cosine
    pub c: f32,
}

impl Default for Rot {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Rot {
    /// Identity rotation
    pub const IDENTITY: Self = Self { s: 0.0, c: 1.0 };

    /// Rotation from an angle in radians.
    #[inline]
    #[must_use]
    pub fn new(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self { s, c }
    }

    /// Angle in radians, in (-π, π].
    #[inline]
    #[must_use]
    pub fn angle(&self) -> f32 {
        self.s.atan2(self.c)
    }

    /// Rotated x-axis.
    #[inline]
    #[must_use]
    pub fn x_axis(&self) -> Vec2 {
        Vec2::new(self.c, self.s)
    }

    /// Rotated y-axis.
    #[inline]
    #[must_use]
    pub fn y_axis(&self) -> Vec2 {
        Vec2::new(-self.s, self.c)
    }

    /// Rotate a vector.
    #[inline]
    #[must_use]
    pub fn apply(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x - self.s * v.y, self.s * v.x + self.c * v.y)
    }

    /// Inverse-rotate a vector.
    #[inline]
    #[must_use]
    pub fn apply_inv(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x + self.s * v.y, -self.s * v.x + self.c * v.y)
    }

    /// Compose two rotations: `self * rhs`.
    #[inline]
    #[must_use]
    pub fn mul(&self, rhs: Rot) -> Rot {
        Rot {
            s: self.s * rhs.c + self.c * rhs.s,
            c: self.c * rhs.c - self.s * rhs.s,
        }
    }

    /// Relative rotation: `self^T * rhs`.
    #[inline]
    #[must_use]
    pub fn mul_t(&self, rhs: Rot) -> Rot {
        Rot {
            s: self.c * rhs.s - self.s * rhs.c,
            c: self.c * rhs.c + self.s * rhs.s,
        }
    }
}

/// Rigid transform: translation plus rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform {
    /// Translation
    pub p: Vec2,
    /// Rotation
    pub q: Rot,
}

impl Transform {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        p: Vec2::ZERO,
        q: Rot::IDENTITY,
    };

    /// Construct from a position and an angle.
    #[inline]
    #[must_use]
    pub fn new(p: Vec2, angle: f32) -> Self {
        Self { p, q: Rot::new(angle) }
    }

    /// Transform a point into world space.
    #[inline]
    #[must_use]
    pub fn apply(&self, v: Vec2) -> Vec2 {
        self.q.apply(v) + self.p
    }

    /// Transform a world point into local space.
    #[inline]
    #[must_use]
    pub fn apply_inv(&self, v: Vec2) -> Vec2 {
        self.q.apply_inv(v - self.p)
    }

    /// Compose: `self * rhs`.
    #[inline]
    #[must_use]
    pub fn mul(&self, rhs: &Transform) -> Transform {
        Transform {
            q: self.q.mul(rhs.q),
            p: self.q.apply(rhs.p) + self.p,
        }
    }

    /// Relative transform: `self^-1 * rhs`.
    #[inline]
    #[must_use]
    pub fn mul_t(&self, rhs: &Transform) -> Transform {
        Transform {
            q: self.q.mul_t(rhs.q),
            p: self.q.apply_inv(rhs.p - self.p),
        }
    }
}

// ============================================================================
// Sweep
// ============================================================================

/// Motion of a body's center of mass over one time step.
///
/// `c0`/`a0` hold the state at `alpha0`; `c`/`a` the state at the end of the
/// step. Shapes are defined relative to the body origin, which may differ
/// from the center of mass (`local_center`).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sweep {
    /// Local center of mass
    pub local_center: Vec2,
    /// World center at `alpha0`
    pub c0: Vec2,
    /// World center at the end of the step
    pub c: Vec2,
    /// Angle at `alpha0`
    pub a0: f32,
    /// Angle at the end of the step
    pub a: f32,
    /// Fraction of the current step already consumed, in [0, 1)
    pub alpha0: f32,
}

impl Sweep {
    /// Interpolated transform at `beta` in [0, 1].
    #[must_use]
    pub fn transform(&self, beta: f32) -> Transform {
        let p = self.c0 * (1.0 - beta) + self.c * beta;
        let angle = (1.0 - beta) * self.a0 + beta * self.a;
        let q = Rot::new(angle);
        Transform {
            p: p - q.apply(self.local_center),
            q,
        }
    }

    /// Advance the start of the sweep to `alpha`.
    pub fn advance(&mut self, alpha: f32) {
        debug_assert!(self.alpha0 < 1.0);
        let beta = (alpha - self.alpha0) / (1.0 - self.alpha0);
        self.c0 += (self.c - self.c0) * beta;
        self.a0 += beta * (self.a - self.a0);
        self.alpha0 = alpha;
    }

    /// Shift both angles by a multiple of 2π so `a0` lies in [0, 2π).
    pub fn normalize(&mut self) {
        let two_pi = 2.0 * PI;
        let d = two_pi * (self.a0 / two_pi).floor();
        self.a0 -= d;
        self.a -= d;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_cross_helpers() {
        let v = Vec2::new(1.0, 2.0);
        assert_eq!(cross_vs(v, 2.0), Vec2::new(4.0, -2.0));
        assert_eq!(cross_sv(2.0, v), Vec2::new(-4.0, 2.0));
        assert!(approx(Vec2::UNIT_X.cross(Vec2::UNIT_Y), 1.0));
    }

    #[test]
    fn test_rot_roundtrip() {
        let q = Rot::new(0.7);
        let v = Vec2::new(3.0, -1.0);
        let back = q.apply_inv(q.apply(v));
        assert!(approx(back.x, v.x) && approx(back.y, v.y));
        assert!(approx(q.angle(), 0.7));
    }

    #[test]
    fn test_transform_mul_t_is_relative() {
        let a = Transform::new(Vec2::new(1.0, 2.0), 0.3);
        let b = Transform::new(Vec2::new(-2.0, 5.0), -1.1);
        let rel = a.mul_t(&b);
        let p = Vec2::new(0.5, 0.25);
        let direct = b.apply(p);
        let via = a.apply(rel.apply(p));
        assert!(approx(direct.x, via.x) && approx(direct.y, via.y));
    }

    #[test]
    fn test_mat22_solve_matches_inverse() {
        let m = Mat22::from_cols(Vec2::new(4.0, 1.0), Vec2::new(2.0, 3.0));
        let b = Vec2::new(1.0, 2.0);
        let x = m.solve(b);
        let y = m.inverse().mul_vec(b);
        assert!(approx(x.x, y.x) && approx(x.y, y.y));
        let r = m.mul_vec(x);
        assert!(approx(r.x, b.x) && approx(r.y, b.y));
    }

    #[test]
    fn test_mat33_solve_and_sym_inverse() {
        let m = Mat33 {
            ex: Vec3::new(4.0, 1.0, 0.5),
            ey: Vec3::new(1.0, 3.0, 0.25),
            ez: Vec3::new(0.5, 0.25, 2.0),
        };
        let b = Vec3::new(1.0, -1.0, 2.0);
        let x = m.solve33(b);
        let r = m.mul_vec3(x);
        assert!(approx(r.x, b.x) && approx(r.y, b.y) && approx(r.z, b.z));

        let inv = m.sym_inverse33();
        let x2 = inv.mul_vec3(b);
        assert!(approx(x.x, x2.x) && approx(x.y, x2.y) && approx(x.z, x2.z));
    }

    #[test]
    fn test_singular_matrix_yields_zero() {
        let m = Mat22::ZERO;
        assert_eq!(m.solve(Vec2::new(1.0, 1.0)), Vec2::ZERO);
    }

    #[test]
    fn test_sweep_advance_and_transform() {
        let mut sweep = Sweep {
            local_center: Vec2::ZERO,
            c0: Vec2::ZERO,
            c: Vec2::new(10.0, 0.0),
            a0: 0.0,
            a: 1.0,
            alpha0: 0.0,
        };
        let mid = sweep.transform(0.5);
        assert!(approx(mid.p.x, 5.0));
        sweep.advance(0.5);
        assert!(approx(sweep.c0.x, 5.0));
        assert!(approx(sweep.a0, 0.5));
        assert!(approx(sweep.alpha0, 0.5));
    }

    #[test]
    fn test_sweep_normalize_keeps_delta() {
        let mut sweep = Sweep {
            a0: 7.0,
            a: 7.5,
            ..Default::default()
        };
        sweep.normalize();
        assert!(sweep.a0 >= 0.0 && sweep.a0 < 2.0 * PI);
        assert!(approx(sweep.a - sweep.a0, 0.5));
    }
}
