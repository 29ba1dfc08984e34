//! Collision Primitives
//!
//! Shared vocabulary of the narrow and broad phase: axis-aligned boxes, ray
//! cast input/output, contact manifolds with persistent feature ids, the
//! world-space manifold evaluation and Sutherland-Hodgman clipping.
//!
//! # Manifold conventions
//!
//! - `Circles`: `local_point` is the center of circle A, the single point's
//!   `local_point` is the center of circle B.
//! - `FaceA`: `local_normal`/`local_point` describe a face of shape A, the
//!   points are clip points on shape B in B's frame.
//! - `FaceB`: the mirror image, with the reference face on shape B.

use crate::distance::{distance, DistanceInput, DistanceProxy, SimplexCache};
use crate::math::{Transform, Vec2};
use crate::settings::MAX_MANIFOLD_POINTS;
use crate::shape::Shape;

// ============================================================================
// AABB
// ============================================================================

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    /// Lower vertex
    pub lower_bound: Vec2,
    /// Upper vertex
    pub upper_bound: Vec2,
}

impl Aabb {
    /// Create from bounds.
    #[inline]
    #[must_use]
    pub const fn new(lower_bound: Vec2, upper_bound: Vec2) -> Self {
        Self {
            lower_bound,
            upper_bound,
        }
    }

    /// Box of half extents `half` centered on `center`.
    #[inline]
    #[must_use]
    pub fn from_center(center: Vec2, half: Vec2) -> Self {
        Self::new(center - half, center + half)
    }

    /// Bounds are sorted and finite.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let d = self.upper_bound - self.lower_bound;
        d.x >= 0.0 && d.y >= 0.0 && self.lower_bound.is_valid() && self.upper_bound.is_valid()
    }

    /// Center point
    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.lower_bound + self.upper_bound) * 0.5
    }

    /// Half extents
    #[inline]
    #[must_use]
    pub fn extents(&self) -> Vec2 {
        (self.upper_bound - self.lower_bound) * 0.5
    }

    /// Perimeter length, used as the tree's cost metric.
    #[inline]
    #[must_use]
    pub fn perimeter(&self) -> f32 {
        let wx = self.upper_bound.x - self.lower_bound.x;
        let wy = self.upper_bound.y - self.lower_bound.y;
        2.0 * (wx + wy)
    }

    /// Smallest box enclosing both.
    #[inline]
    #[must_use]
    pub fn combine(&self, other: &Aabb) -> Aabb {
        Aabb {
            lower_bound: self.lower_bound.min(other.lower_bound),
            upper_bound: self.upper_bound.max(other.upper_bound),
        }
    }

    /// True if `other` lies entirely inside this box.
    #[inline]
    #[must_use]
    pub fn contains(&self, other: &Aabb) -> bool {
        self.lower_bound.x <= other.lower_bound.x
            && self.lower_bound.y <= other.lower_bound.y
            && other.upper_bound.x <= self.upper_bound.x
            && other.upper_bound.y <= self.upper_bound.y
    }

    /// Overlap test (touching counts as overlapping).
    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        let d1 = other.lower_bound - self.upper_bound;
        let d2 = self.lower_bound - other.upper_bound;
        !(d1.x > 0.0 || d1.y > 0.0 || d2.x > 0.0 || d2.y > 0.0)
    }

    /// Slab ray cast. Rays starting inside the box report no hit.
    #[must_use]
    pub fn ray_cast(&self, input: &RayCastInput) -> Option<RayCastOutput> {
        let mut tmin = -f32::MAX;
        let mut tmax = f32::MAX;

        let p = input.p1;
        let d = input.p2 - input.p1;
        let abs_d = d.abs();
        let mut normal = Vec2::ZERO;

        for i in 0..2 {
            if abs_d[i] < f32::EPSILON {
                if p[i] < self.lower_bound[i] || self.upper_bound[i] < p[i] {
                    return None;
                }
            } else {
                let inv_d = 1.0 / d[i];
                let mut t1 = (self.lower_bound[i] - p[i]) * inv_d;
                let mut t2 = (self.upper_bound[i] - p[i]) * inv_d;
                let mut s = -1.0;
                if t1 > t2 {
                    core::mem::swap(&mut t1, &mut t2);
                    s = 1.0;
                }
                if t1 > tmin {
                    normal = Vec2::ZERO;
                    normal[i] = s;
                    tmin = t1;
                }
                tmax = tmax.min(t2);
                if tmin > tmax {
                    return None;
                }
            }
        }

        if tmin < 0.0 || input.max_fraction < tmin {
            return None;
        }
        Some(RayCastOutput {
            normal,
            fraction: tmin,
        })
    }
}

// ============================================================================
// Ray casts
// ============================================================================

/// Ray from `p1` towards `p2`, clipped at `p1 + max_fraction * (p2 - p1)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayCastInput {
    /// Ray origin
    pub p1: Vec2,
    /// Second point defining the direction
    pub p2: Vec2,
    /// Maximum fraction of `p2 - p1` to consider
    pub max_fraction: f32,
}

/// Ray hit: surface normal and fraction along the input segment.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RayCastOutput {
    /// Surface normal at the hit
    pub normal: Vec2,
    /// Hit fraction along `p2 - p1`
    pub fraction: f32,
}

// ============================================================================
// Manifolds
// ============================================================================

/// Kind of feature a contact point lies on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FeatureType {
    /// A vertex
    #[default]
    Vertex = 0,
    /// A face
    Face = 1,
}

/// Features that intersect to form a contact point.
///
/// Used to match points across steps so accumulated impulses can be carried
/// over (warm starting).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ContactFeature {
    /// Feature index on shape A
    pub index_a: u8,
    /// Feature index on shape B
    pub index_b: u8,
    /// Feature type on shape A
    pub type_a: FeatureType,
    /// Feature type on shape B
    pub type_b: FeatureType,
}

impl ContactFeature {
    /// Packed key for fast comparison.
    #[inline]
    #[must_use]
    pub fn key(&self) -> u32 {
        u32::from(self.index_a)
            | u32::from(self.index_b) << 8
            | (self.type_a as u32) << 16
            | (self.type_b as u32) << 24
    }

    /// Same feature pair seen from the other shape.
    #[inline]
    #[must_use]
    pub fn swapped(&self) -> Self {
        Self {
            index_a: self.index_b,
            index_b: self.index_a,
            type_a: self.type_b,
            type_b: self.type_a,
        }
    }
}

/// One manifold point, in the frame described by the owning manifold's type.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ManifoldPoint {
    /// Usage depends on the manifold type
    pub local_point: Vec2,
    /// Accumulated non-penetration impulse
    pub normal_impulse: f32,
    /// Accumulated friction impulse
    pub tangent_impulse: f32,
    /// Feature id used for warm-start matching
    pub id: ContactFeature,
}

/// Manifold layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ManifoldType {
    /// Circle versus circle
    #[default]
    Circles,
    /// Reference face on shape A
    FaceA,
    /// Reference face on shape B
    FaceB,
}

/// Contact manifold between two convex primitives.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Manifold {
    /// Contact points
    pub points: [ManifoldPoint; MAX_MANIFOLD_POINTS],
    /// Unused for `Circles`, face normal otherwise
    pub local_normal: Vec2,
    /// Usage depends on the manifold type
    pub local_point: Vec2,
    /// Layout
    pub kind: ManifoldType,
    /// Number of live points
    pub point_count: usize,
}

impl Manifold {
    /// Live points as a slice.
    #[inline]
    #[must_use]
    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points[..self.point_count]
    }
}

/// Manifold evaluated in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WorldManifold {
    /// World normal pointing from A to B
    pub normal: Vec2,
    /// World contact points (midpoint between the surfaces)
    pub points: [Vec2; MAX_MANIFOLD_POINTS],
    /// Negative when overlapping
    pub separations: [f32; MAX_MANIFOLD_POINTS],
}

impl WorldManifold {
    /// Evaluate `manifold` with the given shape transforms and radii.
    #[must_use]
    pub fn new(
        manifold: &Manifold,
        xf_a: &Transform,
        radius_a: f32,
        xf_b: &Transform,
        radius_b: f32,
    ) -> Self {
        let mut out = Self::default();
        if manifold.point_count == 0 {
            return out;
        }

        match manifold.kind {
            ManifoldType::Circles => {
                out.normal = Vec2::UNIT_X;
                let point_a = xf_a.apply(manifold.local_point);
                let point_b = xf_b.apply(manifold.points[0].local_point);
                if point_a.distance_squared(point_b) > f32::EPSILON * f32::EPSILON {
                    out.normal = (point_b - point_a).normalize();
                }
                let c_a = point_a + out.normal * radius_a;
                let c_b = point_b - out.normal * radius_b;
                out.points[0] = (c_a + c_b) * 0.5;
                out.separations[0] = (c_b - c_a).dot(out.normal);
            }
            ManifoldType::FaceA => {
                out.normal = xf_a.q.apply(manifold.local_normal);
                let plane_point = xf_a.apply(manifold.local_point);
                for i in 0..manifold.point_count {
                    let clip_point = xf_b.apply(manifold.points[i].local_point);
                    let c_a = clip_point
                        + out.normal * (radius_a - (clip_point - plane_point).dot(out.normal));
                    let c_b = clip_point - out.normal * radius_b;
                    out.points[i] = (c_a + c_b) * 0.5;
                    out.separations[i] = (c_b - c_a).dot(out.normal);
                }
            }
            ManifoldType::FaceB => {
                out.normal = xf_b.q.apply(manifold.local_normal);
                let plane_point = xf_b.apply(manifold.local_point);
                for i in 0..manifold.point_count {
                    let clip_point = xf_a.apply(manifold.points[i].local_point);
                    let c_b = clip_point
                        + out.normal * (radius_b - (clip_point - plane_point).dot(out.normal));
                    let c_a = clip_point - out.normal * radius_a;
                    out.points[i] = (c_a + c_b) * 0.5;
                    out.separations[i] = (c_a - c_b).dot(out.normal);
                }
                // normal points from A to B
                out.normal = -out.normal;
            }
        }
        out
    }
}

/// Lifecycle of a manifold point between two evaluations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PointState {
    /// Point does not exist
    #[default]
    Null,
    /// Point was added in the update
    Add,
    /// Point persisted across the update
    Persist,
    /// Point was removed in the update
    Remove,
}

/// Compare two manifolds by feature id.
///
/// Returns the states of `m1`'s points (persist/remove) and of `m2`'s points
/// (add/persist).
#[must_use]
pub fn get_point_states(
    m1: &Manifold,
    m2: &Manifold,
) -> ([PointState; MAX_MANIFOLD_POINTS], [PointState; MAX_MANIFOLD_POINTS]) {
    let mut state1 = [PointState::Null; MAX_MANIFOLD_POINTS];
    let mut state2 = [PointState::Null; MAX_MANIFOLD_POINTS];

    for (i, p) in m1.points().iter().enumerate() {
        let key = p.id.key();
        state1[i] = if m2.points().iter().any(|q| q.id.key() == key) {
            PointState::Persist
        } else {
            PointState::Remove
        };
    }
    for (i, p) in m2.points().iter().enumerate() {
        let key = p.id.key();
        state2[i] = if m1.points().iter().any(|q| q.id.key() == key) {
            PointState::Persist
        } else {
            PointState::Add
        };
    }
    (state1, state2)
}

// ============================================================================
// Clipping
// ============================================================================

/// Vertex used while clipping an incident edge against a reference face.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClipVertex {
    /// Position
    pub v: Vec2,
    /// Feature id
    pub id: ContactFeature,
}

/// Clip a segment against the half-plane `dot(normal, x) <= offset`.
///
/// Returns the clipped segment and the number of valid output vertices.
#[must_use]
pub fn clip_segment_to_line(
    v_in: &[ClipVertex; 2],
    normal: Vec2,
    offset: f32,
    vertex_index_a: usize,
) -> ([ClipVertex; 2], usize) {
    let mut v_out = [ClipVertex::default(); 2];
    let mut count = 0;

    let distance0 = normal.dot(v_in[0].v) - offset;
    let distance1 = normal.dot(v_in[1].v) - offset;

    if distance0 <= 0.0 {
        v_out[count] = v_in[0];
        count += 1;
    }
    if distance1 <= 0.0 {
        v_out[count] = v_in[1];
        count += 1;
    }

    if distance0 * distance1 < 0.0 && count < 2 {
        let interp = distance0 / (distance0 - distance1);
        v_out[count].v = v_in[0].v + (v_in[1].v - v_in[0].v) * interp;
        // vertex A is hitting edge B
        v_out[count].id = ContactFeature {
            index_a: vertex_index_a as u8,
            index_b: v_in[0].id.index_b,
            type_a: FeatureType::Vertex,
            type_b: FeatureType::Face,
        };
        count += 1;
    }

    (v_out, count)
}

/// Overlap test between two shape children, used for sensors.
#[must_use]
pub fn test_overlap(
    shape_a: &Shape,
    index_a: usize,
    shape_b: &Shape,
    index_b: usize,
    xf_a: &Transform,
    xf_b: &Transform,
) -> bool {
    let input = DistanceInput {
        proxy_a: DistanceProxy::from_shape(shape_a, index_a),
        proxy_b: DistanceProxy::from_shape(shape_b, index_b),
        transform_a: *xf_a,
        transform_b: *xf_b,
        use_radii: true,
    };
    let mut cache = SimplexCache::default();
    let output = distance(&mut cache, &input);
    output.distance < 10.0 * f32::EPSILON
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::CircleShape;

    #[test]
    fn test_aabb_overlap_and_contains() {
        let a = Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0));
        let b = Aabb::new(Vec2::new(1.0, 1.0), Vec2::new(3.0, 3.0));
        let c = Aabb::new(Vec2::new(5.0, 5.0), Vec2::new(6.0, 6.0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        let ab = a.combine(&b);
        assert!(ab.contains(&a) && ab.contains(&b));
        assert!((ab.perimeter() - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_aabb_ray_cast() {
        let a = Aabb::new(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0));
        let input = RayCastInput {
            p1: Vec2::new(-3.0, 0.0),
            p2: Vec2::new(3.0, 0.0),
            max_fraction: 1.0,
        };
        let hit = a.ray_cast(&input).expect("ray should hit the box");
        assert!((hit.fraction - 1.0 / 3.0).abs() < 1e-5);
        assert_eq!(hit.normal, Vec2::new(-1.0, 0.0));

        let short = RayCastInput {
            max_fraction: 0.2,
            ..input
        };
        assert!(a.ray_cast(&short).is_none());
    }

    #[test]
    fn test_clip_segment() {
        let v_in = [
            ClipVertex {
                v: Vec2::new(-1.0, 0.0),
                id: ContactFeature::default(),
            },
            ClipVertex {
                v: Vec2::new(1.0, 0.0),
                id: ContactFeature::default(),
            },
        ];
        let (out, count) = clip_segment_to_line(&v_in, Vec2::UNIT_X, 0.5, 3);
        assert_eq!(count, 2);
        assert_eq!(out[0].v, Vec2::new(-1.0, 0.0));
        assert!((out[1].v.x - 0.5).abs() < 1e-6);
        assert_eq!(out[1].id.index_a, 3);
        assert_eq!(out[1].id.type_b, FeatureType::Face);
    }

    #[test]
    fn test_point_states() {
        let mut m1 = Manifold::default();
        m1.point_count = 2;
        m1.points[0].id.index_a = 1;
        m1.points[1].id.index_a = 2;
        let mut m2 = Manifold::default();
        m2.point_count = 2;
        m2.points[0].id.index_a = 2;
        m2.points[1].id.index_a = 3;

        let (s1, s2) = get_point_states(&m1, &m2);
        assert_eq!(s1, [PointState::Remove, PointState::Persist]);
        assert_eq!(s2, [PointState::Persist, PointState::Add]);
    }

    #[test]
    fn test_world_manifold_circles() {
        let mut m = Manifold::default();
        m.kind = ManifoldType::Circles;
        m.point_count = 1;
        let xf_a = Transform::new(Vec2::new(0.0, 0.0), 0.0);
        let xf_b = Transform::new(Vec2::new(1.5, 0.0), 0.0);
        let wm = WorldManifold::new(&m, &xf_a, 1.0, &xf_b, 1.0);
        assert!((wm.normal.x - 1.0).abs() < 1e-6);
        assert!((wm.separations[0] + 0.5).abs() < 1e-5);
        assert!((wm.points[0].x - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_overlap_circles() {
        let a = Shape::Circle(CircleShape::new(Vec2::ZERO, 1.0));
        let b = Shape::Circle(CircleShape::new(Vec2::ZERO, 1.0));
        let xf_a = Transform::IDENTITY;
        let near = Transform::new(Vec2::new(1.5, 0.0), 0.0);
        let far = Transform::new(Vec2::new(2.5, 0.0), 0.0);
        assert!(test_overlap(&a, 0, &b, 0, &xf_a, &near));
        assert!(!test_overlap(&a, 0, &b, 0, &xf_a, &far));
    }
}
