//! Narrow Phase
//!
//! Contact manifold generation between pairs of convex primitives.
//!
//! # Pairs
//!
//! - circle / circle
//! - polygon / circle
//! - polygon / polygon: separating axis test plus reference-face clipping
//! - edge / circle: Voronoi regions, ghost vertices for one-sided edges
//! - edge / polygon: SAT with Gauss-map filtering of ghost collisions
//!
//! All functions return a manifold with `point_count == 0` when the shapes
//! are separated by more than their combined skin radius.

use crate::collision::{
    clip_segment_to_line, ClipVertex, ContactFeature, FeatureType, Manifold, ManifoldType,
};
use crate::math::{cross_vs, Transform, Vec2};
use crate::polygon::PolygonShape;
use crate::settings::{LINEAR_SLOP, MAX_MANIFOLD_POINTS, MAX_POLYGON_VERTICES};
use crate::shape::{CircleShape, EdgeShape};

/// Circle versus circle.
#[must_use]
pub fn collide_circles(
    circle_a: &CircleShape,
    xf_a: &Transform,
    circle_b: &CircleShape,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    let p_a = xf_a.apply(circle_a.position);
    let p_b = xf_b.apply(circle_b.position);
    let radius = circle_a.radius + circle_b.radius;
    if p_a.distance_squared(p_b) > radius * radius {
        return manifold;
    }

    manifold.kind = ManifoldType::Circles;
    manifold.local_point = circle_a.position;
    manifold.local_normal = Vec2::ZERO;
    manifold.point_count = 1;
    manifold.points[0].local_point = circle_b.position;
    manifold.points[0].id = ContactFeature::default();
    manifold
}

/// Polygon versus circle.
#[must_use]
pub fn collide_polygon_and_circle(
    polygon_a: &PolygonShape,
    xf_a: &Transform,
    circle_b: &CircleShape,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    // circle center in the polygon frame
    let c = xf_b.apply(circle_b.position);
    let c_local = xf_a.apply_inv(c);

    // minimum separating edge
    let mut normal_index = 0;
    let mut separation = -f32::MAX;
    let radius = polygon_a.radius + circle_b.radius;
    let count = polygon_a.count;
    let vertices = &polygon_a.vertices;
    let normals = &polygon_a.normals;

    for i in 0..count {
        let s = normals[i].dot(c_local - vertices[i]);
        if s > radius {
            return manifold;
        }
        if s > separation {
            separation = s;
            normal_index = i;
        }
    }

    let v1 = vertices[normal_index];
    let v2 = vertices[if normal_index + 1 < count {
        normal_index + 1
    } else {
        0
    }];

    manifold.kind = ManifoldType::FaceA;
    manifold.points[0].local_point = circle_b.position;
    manifold.points[0].id = ContactFeature::default();

    // center inside the polygon
    if separation < f32::EPSILON {
        manifold.point_count = 1;
        manifold.local_normal = normals[normal_index];
        manifold.local_point = (v1 + v2) * 0.5;
        return manifold;
    }

    let u1 = (c_local - v1).dot(v2 - v1);
    let u2 = (c_local - v2).dot(v1 - v2);
    if u1 <= 0.0 {
        if c_local.distance_squared(v1) > radius * radius {
            return manifold;
        }
        manifold.point_count = 1;
        manifold.local_normal = (c_local - v1).normalize();
        manifold.local_point = v1;
    } else if u2 <= 0.0 {
        if c_local.distance_squared(v2) > radius * radius {
            return manifold;
        }
        manifold.point_count = 1;
        manifold.local_normal = (c_local - v2).normalize();
        manifold.local_point = v2;
    } else {
        let face_center = (v1 + v2) * 0.5;
        let s = (c_local - face_center).dot(normals[normal_index]);
        if s > radius {
            return manifold;
        }
        manifold.point_count = 1;
        manifold.local_normal = normals[normal_index];
        manifold.local_point = face_center;
    }
    manifold
}

// ============================================================================
// Polygon / polygon
// ============================================================================

/// Edge of `poly1` with the largest separation from `poly2`.
fn find_max_separation(
    poly1: &PolygonShape,
    xf1: &Transform,
    poly2: &PolygonShape,
    xf2: &Transform,
) -> (usize, f32) {
    let xf = xf2.mul_t(xf1);

    let mut best_index = 0;
    let mut max_separation = -f32::MAX;
    for i in 0..poly1.count {
        // poly1 normal in frame 2
        let n = xf.q.apply(poly1.normals[i]);
        let v1 = xf.apply(poly1.vertices[i]);

        let si = poly2.vertices()
            .iter()
            .map(|v2| n.dot(*v2 - v1))
            .fold(f32::MAX, f32::min);

        if si > max_separation {
            max_separation = si;
            best_index = i;
        }
    }
    (best_index, max_separation)
}

fn find_incident_edge(
    poly1: &PolygonShape,
    xf1: &Transform,
    edge1: usize,
    poly2: &PolygonShape,
    xf2: &Transform,
) -> [ClipVertex; 2] {
    // reference normal in poly2's frame
    let normal1 = xf2.q.apply_inv(xf1.q.apply(poly1.normals[edge1]));

    let mut index = 0;
    let mut min_dot = f32::MAX;
    for (i, n) in poly2.normals().iter().enumerate() {
        let dot = normal1.dot(*n);
        if dot < min_dot {
            min_dot = dot;
            index = i;
        }
    }

    let i1 = index;
    let i2 = if i1 + 1 < poly2.count { i1 + 1 } else { 0 };

    let feature = |i: usize| ContactFeature {
        index_a: edge1 as u8,
        index_b: i as u8,
        type_a: FeatureType::Face,
        type_b: FeatureType::Vertex,
    };
    [
        ClipVertex {
            v: xf2.apply(poly2.vertices[i1]),
            id: feature(i1),
        },
        ClipVertex {
            v: xf2.apply(poly2.vertices[i2]),
            id: feature(i2),
        },
    ]
}

/// Polygon versus polygon.
///
/// The reference face is chosen on B only when B's separation beats A's by
/// more than `0.1 * LINEAR_SLOP`, which keeps the choice stable between
/// frames.
#[must_use]
pub fn collide_polygons(
    poly_a: &PolygonShape,
    xf_a: &Transform,
    poly_b: &PolygonShape,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();
    let total_radius = poly_a.radius + poly_b.radius;

    let (edge_a, separation_a) = find_max_separation(poly_a, xf_a, poly_b, xf_b);
    if separation_a > total_radius {
        return manifold;
    }

    let (edge_b, separation_b) = find_max_separation(poly_b, xf_b, poly_a, xf_a);
    if separation_b > total_radius {
        return manifold;
    }

    let tol = 0.1 * LINEAR_SLOP;
    let (poly1, poly2, xf1, xf2, edge1, flip) = if separation_b > separation_a + tol {
        manifold.kind = ManifoldType::FaceB;
        (poly_b, poly_a, xf_b, xf_a, edge_b, true)
    } else {
        manifold.kind = ManifoldType::FaceA;
        (poly_a, poly_b, xf_a, xf_b, edge_a, false)
    };

    let incident_edge = find_incident_edge(poly1, xf1, edge1, poly2, xf2);

    let iv1 = edge1;
    let iv2 = if edge1 + 1 < poly1.count { edge1 + 1 } else { 0 };

    let mut v11 = poly1.vertices[iv1];
    let mut v12 = poly1.vertices[iv2];

    let local_tangent = (v12 - v11).normalize();
    let local_normal = cross_vs(local_tangent, 1.0);
    let plane_point = (v11 + v12) * 0.5;

    let tangent = xf1.q.apply(local_tangent);
    let normal = cross_vs(tangent, 1.0);

    v11 = xf1.apply(v11);
    v12 = xf1.apply(v12);

    let front_offset = normal.dot(v11);

    // side offsets, extended by the skin
    let side_offset1 = -tangent.dot(v11) + total_radius;
    let side_offset2 = tangent.dot(v12) + total_radius;

    let (clip_points1, np) = clip_segment_to_line(&incident_edge, -tangent, side_offset1, iv1);
    if np < 2 {
        return manifold;
    }
    let (clip_points2, np) = clip_segment_to_line(&clip_points1, tangent, side_offset2, iv2);
    if np < 2 {
        return manifold;
    }

    manifold.local_normal = local_normal;
    manifold.local_point = plane_point;

    let mut point_count = 0;
    for cv in clip_points2.iter().take(MAX_MANIFOLD_POINTS) {
        let separation = normal.dot(cv.v) - front_offset;
        if separation <= total_radius {
            let cp = &mut manifold.points[point_count];
            cp.local_point = xf2.apply_inv(cv.v);
            cp.id = if flip { cv.id.swapped() } else { cv.id };
            point_count += 1;
        }
    }
    manifold.point_count = point_count;
    manifold
}

// ============================================================================
// Edge / circle
// ============================================================================

/// Edge versus circle, honouring one-sided edges and their ghost vertices.
#[must_use]
pub fn collide_edge_and_circle(
    edge_a: &EdgeShape,
    xf_a: &Transform,
    circle_b: &CircleShape,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    // circle in the edge frame
    let q = xf_a.apply_inv(xf_b.apply(circle_b.position));

    let a = edge_a.vertex1;
    let b = edge_a.vertex2;
    let e = b - a;

    // normal points to the right for a CCW winding
    let mut n = Vec2::new(e.y, -e.x);
    let offset = n.dot(q - a);

    if edge_a.one_sided && offset < 0.0 {
        return manifold;
    }

    // barycentric coordinates
    let u = e.dot(b - q);
    let v = e.dot(q - a);

    let radius = edge_a.radius + circle_b.radius;

    let mut cf = ContactFeature {
        index_b: 0,
        type_b: FeatureType::Vertex,
        ..ContactFeature::default()
    };

    // region A
    if v <= 0.0 {
        if q.distance_squared(a) > radius * radius {
            return manifold;
        }

        // circle in region AB of the previous edge
        if edge_a.one_sided {
            let a1 = edge_a.vertex0;
            let e1 = a - a1;
            if e1.dot(a - q) > 0.0 {
                return manifold;
            }
        }

        cf.index_a = 0;
        cf.type_a = FeatureType::Vertex;
        manifold.point_count = 1;
        manifold.kind = ManifoldType::Circles;
        manifold.local_point = a;
        manifold.points[0].id = cf;
        manifold.points[0].local_point = circle_b.position;
        return manifold;
    }

    // region B
    if u <= 0.0 {
        if q.distance_squared(b) > radius * radius {
            return manifold;
        }

        // circle in region AB of the next edge
        if edge_a.one_sided {
            let b2 = edge_a.vertex3;
            let e2 = b2 - b;
            if e2.dot(q - b) > 0.0 {
                return manifold;
            }
        }

        cf.index_a = 1;
        cf.type_a = FeatureType::Vertex;
        manifold.point_count = 1;
        manifold.kind = ManifoldType::Circles;
        manifold.local_point = b;
        manifold.points[0].id = cf;
        manifold.points[0].local_point = circle_b.position;
        return manifold;
    }

    // region AB
    let den = e.dot(e);
    if den <= 0.0 {
        return manifold;
    }
    let p = (a * u + b * v) * (1.0 / den);
    if q.distance_squared(p) > radius * radius {
        return manifold;
    }

    if offset < 0.0 {
        n = -n;
    }
    n = n.normalize();

    cf.index_a = 0;
    cf.type_a = FeatureType::Face;
    manifold.point_count = 1;
    manifold.kind = ManifoldType::FaceA;
    manifold.local_normal = n;
    manifold.local_point = a;
    manifold.points[0].id = cf;
    manifold.points[0].local_point = circle_b.position;
    manifold
}

// ============================================================================
// Edge / polygon
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AxisKind {
    Unknown,
    EdgeA,
    EdgeB,
}

#[derive(Clone, Copy, Debug)]
struct EpAxis {
    normal: Vec2,
    kind: AxisKind,
    index: usize,
    separation: f32,
}

/// Polygon B expressed in the edge's frame.
struct TempPolygon {
    vertices: [Vec2; MAX_POLYGON_VERTICES],
    normals: [Vec2; MAX_POLYGON_VERTICES],
    count: usize,
}

fn compute_edge_separation(polygon_b: &TempPolygon, v1: Vec2, normal1: Vec2) -> EpAxis {
    let mut axis = EpAxis {
        normal: Vec2::ZERO,
        kind: AxisKind::EdgeA,
        index: 0,
        separation: -f32::MAX,
    };

    // axis with the least overlap
    for (j, n) in [normal1, -normal1].into_iter().enumerate() {
        let sj = polygon_b.vertices[..polygon_b.count]
            .iter()
            .map(|v| n.dot(*v - v1))
            .fold(f32::MAX, f32::min);
        if sj > axis.separation {
            axis.index = j;
            axis.separation = sj;
            axis.normal = n;
        }
    }
    axis
}

fn compute_polygon_separation(polygon_b: &TempPolygon, v1: Vec2, v2: Vec2) -> EpAxis {
    let mut axis = EpAxis {
        normal: Vec2::ZERO,
        kind: AxisKind::Unknown,
        index: 0,
        separation: -f32::MAX,
    };

    for i in 0..polygon_b.count {
        let n = -polygon_b.normals[i];
        let s1 = n.dot(polygon_b.vertices[i] - v1);
        let s2 = n.dot(polygon_b.vertices[i] - v2);
        let s = s1.min(s2);
        if s > axis.separation {
            axis.kind = AxisKind::EdgeB;
            axis.index = i;
            axis.separation = s;
            axis.normal = n;
        }
    }
    axis
}

/// Edge versus polygon.
///
/// One-sided edges skip contact normals that point into a neighbouring
/// segment's region (ghost collision filtering).
#[must_use]
pub fn collide_edge_and_polygon(
    edge_a: &EdgeShape,
    xf_a: &Transform,
    polygon_b: &PolygonShape,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    let xf = xf_a.mul_t(xf_b);
    let centroid_b = xf.apply(polygon_b.centroid);

    let v1 = edge_a.vertex1;
    let v2 = edge_a.vertex2;
    let edge1 = (v2 - v1).normalize();

    // normal points to the right for a CCW winding
    let normal1 = Vec2::new(edge1.y, -edge1.x);
    let offset1 = normal1.dot(centroid_b - v1);

    if edge_a.one_sided && offset1 < 0.0 {
        return manifold;
    }

    let mut temp = TempPolygon {
        vertices: [Vec2::ZERO; MAX_POLYGON_VERTICES],
        normals: [Vec2::ZERO; MAX_POLYGON_VERTICES],
        count: polygon_b.count,
    };
    for i in 0..polygon_b.count {
        temp.vertices[i] = xf.apply(polygon_b.vertices[i]);
        temp.normals[i] = xf.q.apply(polygon_b.normals[i]);
    }

    let radius = polygon_b.radius + edge_a.radius;

    let edge_axis = compute_edge_separation(&temp, v1, normal1);
    if edge_axis.separation > radius {
        return manifold;
    }

    let polygon_axis = compute_polygon_separation(&temp, v1, v2);
    if polygon_axis.separation > radius {
        return manifold;
    }

    // hysteresis for jitter reduction
    let relative_tol = 0.98;
    let absolute_tol = 0.001;

    let mut primary_axis = if polygon_axis.separation - radius
        > relative_tol * (edge_axis.separation - radius) + absolute_tol
    {
        polygon_axis
    } else {
        edge_axis
    };

    if edge_a.one_sided {
        let edge0 = (v1 - edge_a.vertex0).normalize();
        let normal0 = Vec2::new(edge0.y, -edge0.x);
        let convex1 = edge0.cross(edge1) >= 0.0;

        let edge2 = (edge_a.vertex3 - v2).normalize();
        let normal2 = Vec2::new(edge2.y, -edge2.x);
        let convex2 = edge1.cross(edge2) >= 0.0;

        let sin_tol = 0.1;
        let side1 = primary_axis.normal.dot(edge1) <= 0.0;

        // Gauss map check
        if side1 {
            if convex1 {
                if primary_axis.normal.cross(normal0) > sin_tol {
                    // skip region
                    return manifold;
                }
            } else {
                // snap region
                primary_axis = edge_axis;
            }
        } else if convex2 {
            if normal2.cross(primary_axis.normal) > sin_tol {
                return manifold;
            }
        } else {
            primary_axis = edge_axis;
        }
    }

    let clip_points: [ClipVertex; 2];
    let (ref_i1, ref_i2, ref_v1, ref_v2, ref_normal, side_normal1, side_normal2);

    if primary_axis.kind == AxisKind::EdgeA {
        manifold.kind = ManifoldType::FaceA;

        // polygon normal most anti-parallel to the edge normal
        let mut best_index = 0;
        let mut best_value = primary_axis.normal.dot(temp.normals[0]);
        for i in 1..temp.count {
            let value = primary_axis.normal.dot(temp.normals[i]);
            if value < best_value {
                best_value = value;
                best_index = i;
            }
        }

        let i1 = best_index;
        let i2 = if i1 + 1 < temp.count { i1 + 1 } else { 0 };
        let feature = |i: usize| ContactFeature {
            index_a: 0,
            index_b: i as u8,
            type_a: FeatureType::Face,
            type_b: FeatureType::Vertex,
        };
        clip_points = [
            ClipVertex {
                v: temp.vertices[i1],
                id: feature(i1),
            },
            ClipVertex {
                v: temp.vertices[i2],
                id: feature(i2),
            },
        ];

        ref_i1 = 0;
        ref_i2 = 1;
        ref_v1 = v1;
        ref_v2 = v2;
        ref_normal = primary_axis.normal;
        side_normal1 = -edge1;
        side_normal2 = edge1;
    } else {
        manifold.kind = ManifoldType::FaceB;

        let feature = |i: u8| ContactFeature {
            index_a: i,
            index_b: primary_axis.index as u8,
            type_a: FeatureType::Vertex,
            type_b: FeatureType::Face,
        };
        clip_points = [
            ClipVertex {
                v: v2,
                id: feature(1),
            },
            ClipVertex {
                v: v1,
                id: feature(0),
            },
        ];

        ref_i1 = primary_axis.index;
        ref_i2 = if ref_i1 + 1 < temp.count { ref_i1 + 1 } else { 0 };
        ref_v1 = temp.vertices[ref_i1];
        ref_v2 = temp.vertices[ref_i2];
        ref_normal = temp.normals[ref_i1];

        // CCW winding
        side_normal1 = Vec2::new(ref_normal.y, -ref_normal.x);
        side_normal2 = -side_normal1;
    }

    let side_offset1 = side_normal1.dot(ref_v1);
    let side_offset2 = side_normal2.dot(ref_v2);

    let (clip_points1, np) = clip_segment_to_line(&clip_points, side_normal1, side_offset1, ref_i1);
    if np < MAX_MANIFOLD_POINTS {
        return manifold;
    }
    let (clip_points2, np) = clip_segment_to_line(&clip_points1, side_normal2, side_offset2, ref_i2);
    if np < MAX_MANIFOLD_POINTS {
        return manifold;
    }

    if primary_axis.kind == AxisKind::EdgeA {
        manifold.local_normal = ref_normal;
        manifold.local_point = ref_v1;
    } else {
        manifold.local_normal = polygon_b.normals[ref_i1];
        manifold.local_point = polygon_b.vertices[ref_i1];
    }

    let mut point_count = 0;
    for cv in &clip_points2 {
        let separation = ref_normal.dot(cv.v - ref_v1);
        if separation <= radius {
            let cp = &mut manifold.points[point_count];
            if primary_axis.kind == AxisKind::EdgeA {
                cp.local_point = xf.apply_inv(cv.v);
                cp.id = cv.id;
            } else {
                cp.local_point = cv.v;
                cp.id = cv.id.swapped();
            }
            point_count += 1;
        }
    }
    manifold.point_count = point_count;
    manifold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::WorldManifold;

    #[test]
    fn test_circles_touching() {
        let a = CircleShape::new(Vec2::ZERO, 0.5);
        let b = CircleShape::new(Vec2::ZERO, 0.5);
        let xf_a = Transform::IDENTITY;
        let m = collide_circles(&a, &xf_a, &b, &Transform::new(Vec2::new(0.9, 0.0), 0.0));
        assert_eq!(m.point_count, 1);
        assert_eq!(m.kind, ManifoldType::Circles);

        let m = collide_circles(&a, &xf_a, &b, &Transform::new(Vec2::new(1.1, 0.0), 0.0));
        assert_eq!(m.point_count, 0);
    }

    #[test]
    fn test_box_resting_on_box_has_two_points() {
        let ground = PolygonShape::new_box(5.0, 0.5);
        let b = PolygonShape::new_box(0.5, 0.5);
        let xf_g = Transform::IDENTITY;
        let xf_b = Transform::new(Vec2::new(0.0, 0.99), 0.0);
        let m = collide_polygons(&ground, &xf_g, &b, &xf_b);
        assert_eq!(m.point_count, 2);

        let wm = WorldManifold::new(&m, &xf_g, ground.radius, &xf_b, b.radius);
        assert!((wm.normal.y - 1.0).abs() < 1e-5, "normal points from A to B");
        for s in &wm.separations[..2] {
            assert!(*s < 0.0);
        }
    }

    #[test]
    fn test_polygon_swap_symmetry() {
        let a = PolygonShape::new_box(1.0, 0.5);
        let b = PolygonShape::new_box(0.5, 0.5);
        let xf_a = Transform::new(Vec2::new(0.2, 0.0), 0.0);
        let xf_b = Transform::new(Vec2::new(0.3, 0.95), 0.02);

        let m_ab = collide_polygons(&a, &xf_a, &b, &xf_b);
        let m_ba = collide_polygons(&b, &xf_b, &a, &xf_a);
        assert_eq!(m_ab.point_count, m_ba.point_count);

        let wm_ab = WorldManifold::new(&m_ab, &xf_a, a.radius, &xf_b, b.radius);
        let wm_ba = WorldManifold::new(&m_ba, &xf_b, b.radius, &xf_a, a.radius);
        // reference faces may differ, but the normals must be opposed
        assert!(wm_ab.normal.dot(-wm_ba.normal) > 0.99);
    }

    #[test]
    fn test_polygon_circle_regions() {
        let poly = PolygonShape::new_box(1.0, 1.0);
        let c = CircleShape::new(Vec2::ZERO, 0.5);
        let xf = Transform::IDENTITY;

        // face region
        let m = collide_polygon_and_circle(&poly, &xf, &c, &Transform::new(Vec2::new(0.0, 1.4), 0.0));
        assert_eq!(m.point_count, 1);
        assert_eq!(m.local_normal, Vec2::new(0.0, 1.0));

        // vertex region
        let m = collide_polygon_and_circle(&poly, &xf, &c, &Transform::new(Vec2::new(1.3, 1.3), 0.0));
        assert_eq!(m.point_count, 1);
        assert!((m.local_normal.x - m.local_normal.y).abs() < 1e-5);

        // separated at the corner
        let m = collide_polygon_and_circle(&poly, &xf, &c, &Transform::new(Vec2::new(1.5, 1.5), 0.0));
        assert_eq!(m.point_count, 0);
    }

    #[test]
    fn test_one_sided_edge_ignores_back_side() {
        let edge = EdgeShape::one_sided(
            Vec2::new(-2.0, 0.0),
            Vec2::new(-1.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
        );
        let c = CircleShape::new(Vec2::ZERO, 0.5);
        let xf = Transform::IDENTITY;

        // the front side of v1 -> v2 is -y
        let front = collide_edge_and_circle(&edge, &xf, &c, &Transform::new(Vec2::new(0.0, -0.4), 0.0));
        assert_eq!(front.point_count, 1);
        let back = collide_edge_and_circle(&edge, &xf, &c, &Transform::new(Vec2::new(0.0, 0.4), 0.0));
        assert_eq!(back.point_count, 0);

        let two = EdgeShape::two_sided(Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0));
        let m = collide_edge_and_circle(&two, &xf, &c, &Transform::new(Vec2::new(0.0, 0.4), 0.0));
        assert_eq!(m.point_count, 1);
        assert!((m.local_normal.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_edge_polygon_resting() {
        let edge = EdgeShape::two_sided(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0));
        let b = PolygonShape::new_box(0.5, 0.5);
        let xf_b = Transform::new(Vec2::new(0.0, 0.49), 0.0);
        let m = collide_edge_and_polygon(&edge, &Transform::IDENTITY, &b, &xf_b);
        assert_eq!(m.point_count, 2);
        let wm = WorldManifold::new(&m, &Transform::IDENTITY, edge.radius, &xf_b, b.radius);
        assert!(wm.normal.y > 0.99);
    }
}
