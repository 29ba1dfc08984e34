//! Convex Polygon Shape
//!
//! Solid convex polygon with counter-clockwise winding and up to
//! [`MAX_POLYGON_VERTICES`] vertices. Arbitrary point clouds are reduced to
//! their convex hull (gift wrapping) after welding near-duplicate points.
//!
//! Author: Moroya Sakamoto

use crate::collision::{Aabb, RayCastInput, RayCastOutput};
use crate::error::{ConfigurationError, PhysicsError};
use crate::math::{cross_vs, Transform, Vec2};
use crate::settings::{LINEAR_SLOP, MAX_POLYGON_VERTICES, POLYGON_RADIUS};
use crate::shape::MassData;

/// Convex polygon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolygonShape {
    /// Centroid in body space
    pub centroid: Vec2,
    /// Vertices, counter-clockwise
    pub vertices: [Vec2; MAX_POLYGON_VERTICES],
    /// Outward edge normals, `normals[i]` belongs to edge `i -> i + 1`
    pub normals: [Vec2; MAX_POLYGON_VERTICES],
    /// Number of live vertices
    pub count: usize,
    /// Skin radius
    pub radius: f32,
}

impl PolygonShape {
    /// Axis-aligned box with half extents `hx`, `hy` centered on the origin.
    #[must_use]
    pub fn new_box(hx: f32, hy: f32) -> Self {
        let mut vertices = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let mut normals = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        vertices[..4].copy_from_slice(&[
            Vec2::new(-hx, -hy),
            Vec2::new(hx, -hy),
            Vec2::new(hx, hy),
            Vec2::new(-hx, hy),
        ]);
        normals[..4].copy_from_slice(&[
            Vec2::new(0.0, -1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(-1.0, 0.0),
        ]);
        Self {
            centroid: Vec2::ZERO,
            vertices,
            normals,
            count: 4,
            radius: POLYGON_RADIUS,
        }
    }

    /// Oriented box centered on `center` and rotated by `angle`.
    #[must_use]
    pub fn new_oriented_box(hx: f32, hy: f32, center: Vec2, angle: f32) -> Self {
        let mut poly = Self::new_box(hx, hy);
        poly.centroid = center;
        let xf = Transform::new(center, angle);
        for i in 0..poly.count {
            poly.vertices[i] = xf.apply(poly.vertices[i]);
            poly.normals[i] = xf.q.apply(poly.normals[i]);
        }
        poly
    }

    /// Convex hull of `points`.
    ///
    /// Points closer than half the linear slop are welded. Fails when fewer
    /// than three distinct points remain or when they are collinear.
    pub fn from_points(points: &[Vec2]) -> Result<Self, PhysicsError> {
        if points.len() < 3 {
            return Err(ConfigurationError::TooFewVertices {
                shape: "polygon",
                min: 3,
                got: points.len(),
            }
            .into());
        }
        if points.len() > MAX_POLYGON_VERTICES {
            return Err(PhysicsError::CapacityExceeded {
                resource: "polygon vertices",
                limit: MAX_POLYGON_VERTICES,
            });
        }

        // weld
        let weld = 0.5 * LINEAR_SLOP;
        let mut ps = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let mut n = 0;
        for &v in points {
            if ps[..n].iter().all(|p| v.distance_squared(*p) >= weld * weld) {
                ps[n] = v;
                n += 1;
            }
        }
        if n < 3 {
            return Err(ConfigurationError::DegeneratePolygon.into());
        }

        // gift wrapping, starting from the right-most (then lowest) point
        let mut i0 = 0;
        let mut x0 = ps[0].x;
        for (i, p) in ps.iter().enumerate().take(n).skip(1) {
            if p.x > x0 || (p.x == x0 && p.y < ps[i0].y) {
                i0 = i;
                x0 = p.x;
            }
        }

        let mut hull = [0usize; MAX_POLYGON_VERTICES];
        let mut m = 0;
        let mut ih = i0;
        loop {
            if m >= MAX_POLYGON_VERTICES {
                return Err(ConfigurationError::DegeneratePolygon.into());
            }
            hull[m] = ih;

            let mut ie = 0;
            for j in 1..n {
                if ie == ih {
                    ie = j;
                    continue;
                }
                let r = ps[ie] - ps[hull[m]];
                let v = ps[j] - ps[hull[m]];
                let c = r.cross(v);
                if c < 0.0 {
                    ie = j;
                }
                // collinear: keep the farthest point
                if c == 0.0 && v.length_squared() > r.length_squared() {
                    ie = j;
                }
            }

            m += 1;
            ih = ie;
            if ie == i0 {
                break;
            }
        }

        if m < 3 {
            return Err(ConfigurationError::DegeneratePolygon.into());
        }

        let mut vertices = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let mut normals = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        for i in 0..m {
            vertices[i] = ps[hull[i]];
        }
        for i in 0..m {
            let i2 = if i + 1 < m { i + 1 } else { 0 };
            let edge = vertices[i2] - vertices[i];
            if edge.length_squared() <= f32::EPSILON * f32::EPSILON {
                return Err(ConfigurationError::DegeneratePolygon.into());
            }
            normals[i] = cross_vs(edge, 1.0).normalize();
        }

        let centroid = compute_centroid(&vertices[..m]).ok_or(ConfigurationError::DegeneratePolygon)?;
        Ok(Self {
            centroid,
            vertices,
            normals,
            count: m,
            radius: POLYGON_RADIUS,
        })
    }

    /// Live vertices
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices[..self.count]
    }

    /// Live normals
    #[inline]
    #[must_use]
    pub fn normals(&self) -> &[Vec2] {
        &self.normals[..self.count]
    }

    /// True if every vertex lies on the inner side of every edge.
    #[must_use]
    pub fn validate(&self) -> bool {
        let n = self.count;
        for i1 in 0..n {
            let i2 = if i1 + 1 < n { i1 + 1 } else { 0 };
            let p = self.vertices[i1];
            let e = self.vertices[i2] - p;
            for j in 0..n {
                if j == i1 || j == i2 {
                    continue;
                }
                if e.cross(self.vertices[j] - p) < 0.0 {
                    return false;
                }
            }
        }
        true
    }

    /// Point containment.
    #[must_use]
    pub fn test_point(&self, xf: &Transform, p: Vec2) -> bool {
        let p_local = xf.apply_inv(p);
        self.normals()
            .iter()
            .zip(self.vertices())
            .all(|(n, v)| n.dot(p_local - *v) <= 0.0)
    }

    /// Ray cast. Rays starting inside report no hit.
    #[must_use]
    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let p1 = xf.apply_inv(input.p1);
        let p2 = xf.apply_inv(input.p2);
        let d = p2 - p1;

        let mut lower = 0.0;
        let mut upper = input.max_fraction;
        let mut index = None;

        for i in 0..self.count {
            let numerator = self.normals[i].dot(self.vertices[i] - p1);
            let denominator = self.normals[i].dot(d);

            if denominator == 0.0 {
                if numerator < 0.0 {
                    return None;
                }
            } else if denominator < 0.0 && numerator < lower * denominator {
                // segment enters this half-space
                lower = numerator / denominator;
                index = Some(i);
            } else if denominator > 0.0 && numerator < upper * denominator {
                // segment exits this half-space
                upper = numerator / denominator;
            }

            if upper < lower {
                return None;
            }
        }

        index.map(|i| RayCastOutput {
            fraction: lower,
            normal: xf.q.apply(self.normals[i]),
        })
    }

    /// World bounding box.
    #[must_use]
    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let mut lower = xf.apply(self.vertices[0]);
        let mut upper = lower;
        for v in &self.vertices[1..self.count] {
            let w = xf.apply(*v);
            lower = lower.min(w);
            upper = upper.max(w);
        }
        let r = Vec2::new(self.radius, self.radius);
        Aabb::new(lower - r, upper + r)
    }

    /// Mass, centroid and inertia about the shape origin.
    ///
    /// Integrates over the fan of triangles rooted at the first vertex.
    #[must_use]
    pub fn compute_mass(&self, density: f32) -> MassData {
        let mut center = Vec2::ZERO;
        let mut area = 0.0;
        let mut inertia = 0.0;

        let s = self.vertices[0];
        let inv3 = 1.0 / 3.0;

        for i in 0..self.count {
            let e1 = self.vertices[i] - s;
            let e2 = if i + 1 < self.count {
                self.vertices[i + 1] - s
            } else {
                self.vertices[0] - s
            };

            let d = e1.cross(e2);
            let triangle_area = 0.5 * d;
            area += triangle_area;
            center += (e1 + e2) * (triangle_area * inv3);

            let intx2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
            let inty2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
            inertia += (0.25 * inv3 * d) * (intx2 + inty2);
        }

        let mass = density * area;
        if area > f32::EPSILON {
            center *= 1.0 / area;
        }
        let mass_center = center + s;

        // inertia about s, shifted to the center of mass and then to the origin
        let inertia = density * inertia
            + mass * (mass_center.dot(mass_center) - center.dot(center));

        MassData {
            mass,
            center: mass_center,
            inertia,
        }
    }
}

fn compute_centroid(vs: &[Vec2]) -> Option<Vec2> {
    let mut c = Vec2::ZERO;
    let mut area = 0.0;
    let s = vs[0];
    let inv3 = 1.0 / 3.0;

    for i in 0..vs.len() {
        let p1 = Vec2::ZERO;
        let p2 = vs[i] - s;
        let p3 = if i + 1 < vs.len() { vs[i + 1] - s } else { Vec2::ZERO };
        let triangle_area = 0.5 * (p2 - p1).cross(p3 - p1);
        area += triangle_area;
        c += (p1 + p2 + p3) * (triangle_area * inv3);
    }

    if area <= f32::EPSILON {
        return None;
    }
    Some(c * (1.0 / area) + s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_mass() {
        let b = PolygonShape::new_box(1.0, 0.5);
        let md = b.compute_mass(1.0);
        assert!((md.mass - 2.0).abs() < 1e-5);
        assert!(md.center.length() < 1e-6);
        // I = m (w^2 + h^2) / 12 with w = 2, h = 1
        assert!((md.inertia - 2.0 * 5.0 / 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_hull_discards_interior_points() {
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.5, 0.2),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        let poly = PolygonShape::from_points(&pts).expect("valid hull");
        assert_eq!(poly.count, 4);
        assert!(poly.validate());
        assert!((poly.centroid - Vec2::new(0.5, 0.5)).length() < 1e-5);
    }

    #[test]
    fn test_hull_rejects_degenerate_input() {
        let collinear = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)];
        assert!(PolygonShape::from_points(&collinear).is_err());

        let welded = [Vec2::ZERO, Vec2::new(0.001, 0.0), Vec2::new(0.0, 0.001)];
        assert_eq!(
            PolygonShape::from_points(&welded),
            Err(ConfigurationError::DegeneratePolygon.into())
        );

        let too_many = [Vec2::ZERO; MAX_POLYGON_VERTICES + 1];
        assert!(matches!(
            PolygonShape::from_points(&too_many),
            Err(PhysicsError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_oriented_box_points_and_rays() {
        let b = PolygonShape::new_oriented_box(1.0, 1.0, Vec2::new(2.0, 0.0), 0.25 * crate::settings::PI);
        assert!(b.test_point(&Transform::IDENTITY, Vec2::new(2.0, 0.0)));
        assert!(!b.test_point(&Transform::IDENTITY, Vec2::ZERO));

        let input = RayCastInput {
            p1: Vec2::new(-1.0, 0.0),
            p2: Vec2::new(5.0, 0.0),
            max_fraction: 1.0,
        };
        let hit = b.ray_cast(&input, &Transform::IDENTITY).expect("hit");
        // diamond tip at x = 2 - sqrt(2)
        let expected = (2.0 - 2.0f32.sqrt() + 1.0) / 6.0;
        assert!((hit.fraction - expected).abs() < 1e-4);
        assert!(hit.normal.x < 0.0);
    }

    #[test]
    fn test_offset_box_mass_uses_parallel_axis() {
        let b = PolygonShape::new_oriented_box(0.5, 0.5, Vec2::new(3.0, 0.0), 0.0);
        let md = b.compute_mass(1.0);
        assert!((md.center.x - 3.0).abs() < 1e-5);
        let expected = 1.0 * (1.0 + 1.0) / 12.0 + 1.0 * 9.0;
        assert!((md.inertia - expected).abs() < 1e-3);
    }
}
