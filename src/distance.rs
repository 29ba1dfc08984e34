//! GJK Distance and Shape Cast
//!
//! Closest points between two convex proxies using GJK with Voronoi-region
//! simplex solving and barycentric coordinates. The simplex can be cached
//! between calls (warm start), which makes repeated queries on slowly moving
//! shapes nearly free. Also provides a GJK ray cast (shape cast) of one
//! proxy translating against another.

use crate::math::{cross_sv, cross_vs, Transform, Vec2};
use crate::settings::{LINEAR_SLOP, MAX_GJK_ITERATIONS, MAX_POLYGON_VERTICES, POLYGON_RADIUS};
use crate::shape::Shape;

// ============================================================================
// Proxy
// ============================================================================

/// Convex vertex cloud with a radius, as seen by GJK.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceProxy {
    vertices: [Vec2; MAX_POLYGON_VERTICES],
    count: usize,
    /// Skin radius
    pub radius: f32,
}

impl DistanceProxy {
    /// Proxy from raw vertices. Extra vertices beyond the polygon limit are ignored.
    #[must_use]
    pub fn new(points: &[Vec2], radius: f32) -> Self {
        let mut vertices = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let count = points.len().min(MAX_POLYGON_VERTICES);
        vertices[..count].copy_from_slice(&points[..count]);
        Self {
            vertices,
            count,
            radius,
        }
    }

    /// Proxy for one child of a shape.
    #[must_use]
    pub fn from_shape(shape: &Shape, index: usize) -> Self {
        match shape {
            Shape::Circle(c) => Self::new(&[c.position], c.radius),
            Shape::Polygon(p) => Self::new(p.vertices(), p.radius),
            Shape::Edge(e) => Self::new(&[e.vertex1, e.vertex2], e.radius),
            Shape::Chain(c) => {
                let v1 = c.vertices[index];
                let v2 = if index + 1 < c.vertices.len() {
                    c.vertices[index + 1]
                } else {
                    c.vertices[0]
                };
                Self::new(&[v1, v2], c.radius)
            }
        }
    }

    /// Index of the vertex farthest along `d`.
    #[must_use]
    pub fn support(&self, d: Vec2) -> usize {
        let mut best_index = 0;
        let mut best_value = self.vertices[0].dot(d);
        for i in 1..self.count {
            let value = self.vertices[i].dot(d);
            if value > best_value {
                best_index = i;
                best_value = value;
            }
        }
        best_index
    }

    /// Vertex farthest along `d`.
    #[inline]
    #[must_use]
    pub fn support_vertex(&self, d: Vec2) -> Vec2 {
        self.vertices[self.support(d)]
    }

    /// Vertex by index
    #[inline]
    #[must_use]
    pub fn vertex(&self, index: usize) -> Vec2 {
        self.vertices[index]
    }

    /// Vertex count
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }
}

/// Simplex state carried between distance calls.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimplexCache {
    /// Length or area of the cached simplex
    pub metric: f32,
    /// Number of cached vertices
    pub count: usize,
    /// Vertex indices on proxy A
    pub index_a: [u8; 3],
    /// Vertex indices on proxy B
    pub index_b: [u8; 3],
}

/// Input for [`distance`].
#[derive(Clone, Copy, Debug)]
pub struct DistanceInput {
    /// First proxy
    pub proxy_a: DistanceProxy,
    /// Second proxy
    pub proxy_b: DistanceProxy,
    /// Transform of the first proxy
    pub transform_a: Transform,
    /// Transform of the second proxy
    pub transform_b: Transform,
    /// Account for the proxies' radii
    pub use_radii: bool,
}

/// Output of [`distance`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DistanceOutput {
    /// Closest point on shape A
    pub point_a: Vec2,
    /// Closest point on shape B
    pub point_b: Vec2,
    /// Distance between the closest points
    pub distance: f32,
    /// Number of GJK iterations used
    pub iterations: u32,
}

// ============================================================================
// Simplex
// ============================================================================

#[derive(Clone, Copy, Debug, Default)]
struct SimplexVertex {
    /// Support point on proxy A
    w_a: Vec2,
    /// Support point on proxy B
    w_b: Vec2,
    /// w_b - w_a
    w: Vec2,
    /// Barycentric coordinate of the closest point
    a: f32,
    index_a: usize,
    index_b: usize,
}

#[derive(Clone, Copy, Debug, Default)]
struct Simplex {
    v: [SimplexVertex; 3],
    count: usize,
}

impl Simplex {
    fn read_cache(
        cache: &SimplexCache,
        proxy_a: &DistanceProxy,
        xf_a: &Transform,
        proxy_b: &DistanceProxy,
        xf_b: &Transform,
    ) -> Self {
        let mut s = Simplex {
            count: cache.count.min(3),
            ..Simplex::default()
        };
        for i in 0..s.count {
            let v = &mut s.v[i];
            v.index_a = usize::from(cache.index_a[i]).min(proxy_a.count - 1);
            v.index_b = usize::from(cache.index_b[i]).min(proxy_b.count - 1);
            v.w_a = xf_a.apply(proxy_a.vertex(v.index_a));
            v.w_b = xf_b.apply(proxy_b.vertex(v.index_b));
            v.w = v.w_b - v.w_a;
            v.a = 0.0;
        }

        // flush the cache if the metric changed substantially
        if s.count > 1 {
            let metric1 = cache.metric;
            let metric2 = s.metric();
            if metric2 < 0.5 * metric1 || 2.0 * metric1 < metric2 || metric2 < f32::EPSILON {
                s.count = 0;
            }
        }

        if s.count == 0 {
            let v = &mut s.v[0];
            v.index_a = 0;
            v.index_b = 0;
            v.w_a = xf_a.apply(proxy_a.vertex(0));
            v.w_b = xf_b.apply(proxy_b.vertex(0));
            v.w = v.w_b - v.w_a;
            v.a = 1.0;
            s.count = 1;
        }
        s
    }

    fn write_cache(&self, cache: &mut SimplexCache) {
        cache.metric = self.metric();
        cache.count = self.count;
        for i in 0..self.count {
            cache.index_a[i] = self.v[i].index_a as u8;
            cache.index_b[i] = self.v[i].index_b as u8;
        }
    }

    fn search_direction(&self) -> Vec2 {
        match self.count {
            1 => -self.v[0].w,
            2 => {
                let e12 = self.v[1].w - self.v[0].w;
                let sgn = e12.cross(-self.v[0].w);
                if sgn > 0.0 {
                    // origin is left of e12
                    cross_sv(1.0, e12)
                } else {
                    cross_vs(e12, 1.0)
                }
            }
            _ => Vec2::ZERO,
        }
    }

    fn closest_point(&self) -> Vec2 {
        match self.count {
            1 => self.v[0].w,
            2 => self.v[0].w * self.v[0].a + self.v[1].w * self.v[1].a,
            _ => Vec2::ZERO,
        }
    }

    fn witness_points(&self) -> (Vec2, Vec2) {
        let [v1, v2, v3] = &self.v;
        match self.count {
            1 => (v1.w_a, v1.w_b),
            2 => (
                v1.w_a * v1.a + v2.w_a * v2.a,
                v1.w_b * v1.a + v2.w_b * v2.a,
            ),
            3 => {
                let p = v1.w_a * v1.a + v2.w_a * v2.a + v3.w_a * v3.a;
                (p, p)
            }
            _ => (Vec2::ZERO, Vec2::ZERO),
        }
    }

    fn metric(&self) -> f32 {
        match self.count {
            2 => self.v[0].w.distance(self.v[1].w),
            3 => (self.v[1].w - self.v[0].w).cross(self.v[2].w - self.v[0].w),
            _ => 0.0,
        }
    }

    /// Closest point on segment w1-w2 to the origin.
    fn solve2(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let e12 = w2 - w1;

        // w1 region
        let d12_2 = -w1.dot(e12);
        if d12_2 <= 0.0 {
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // w2 region
        let d12_1 = w2.dot(e12);
        if d12_1 <= 0.0 {
            self.v[1].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[1];
            return;
        }

        let inv_d12 = 1.0 / (d12_1 + d12_2);
        self.v[0].a = d12_1 * inv_d12;
        self.v[1].a = d12_2 * inv_d12;
        self.count = 2;
    }

    /// Closest feature of triangle w1-w2-w3 to the origin.
    fn solve3(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let w3 = self.v[2].w;

        let e12 = w2 - w1;
        let d12_1 = w2.dot(e12);
        let d12_2 = -w1.dot(e12);

        let e13 = w3 - w1;
        let d13_1 = w3.dot(e13);
        let d13_2 = -w1.dot(e13);

        let e23 = w3 - w2;
        let d23_1 = w3.dot(e23);
        let d23_2 = -w2.dot(e23);

        let n123 = e12.cross(e13);
        let d123_1 = n123 * w2.cross(w3);
        let d123_2 = n123 * w3.cross(w1);
        let d123_3 = n123 * w1.cross(w2);

        // w1 region
        if d12_2 <= 0.0 && d13_2 <= 0.0 {
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // e12
        if d12_1 > 0.0 && d12_2 > 0.0 && d123_3 <= 0.0 {
            let inv = 1.0 / (d12_1 + d12_2);
            self.v[0].a = d12_1 * inv;
            self.v[1].a = d12_2 * inv;
            self.count = 2;
            return;
        }

        // e13
        if d13_1 > 0.0 && d13_2 > 0.0 && d123_2 <= 0.0 {
            let inv = 1.0 / (d13_1 + d13_2);
            self.v[0].a = d13_1 * inv;
            self.v[2].a = d13_2 * inv;
            self.count = 2;
            self.v[1] = self.v[2];
            return;
        }

        // w2 region
        if d12_1 <= 0.0 && d23_2 <= 0.0 {
            self.v[1].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[1];
            return;
        }

        // w3 region
        if d13_1 <= 0.0 && d23_1 <= 0.0 {
            self.v[2].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[2];
            return;
        }

        // e23
        if d23_1 > 0.0 && d23_2 > 0.0 && d123_1 <= 0.0 {
            let inv = 1.0 / (d23_1 + d23_2);
            self.v[1].a = d23_1 * inv;
            self.v[2].a = d23_2 * inv;
            self.count = 2;
            self.v[0] = self.v[2];
            return;
        }

        // inside the triangle
        let inv = 1.0 / (d123_1 + d123_2 + d123_3);
        self.v[0].a = d123_1 * inv;
        self.v[1].a = d123_2 * inv;
        self.v[2].a = d123_3 * inv;
        self.count = 3;
    }

    fn solve(&mut self) {
        match self.count {
            2 => self.solve2(),
            3 => self.solve3(),
            _ => {}
        }
    }
}

// ============================================================================
// Distance
// ============================================================================

/// Closest points between two proxies.
///
/// `cache` is read as a warm start and updated with the final simplex. On
/// overlap the distance is zero and the witness points coincide.
pub fn distance(cache: &mut SimplexCache, input: &DistanceInput) -> DistanceOutput {
    let proxy_a = &input.proxy_a;
    let proxy_b = &input.proxy_b;
    let xf_a = input.transform_a;
    let xf_b = input.transform_b;

    let mut simplex = Simplex::read_cache(cache, proxy_a, &xf_a, proxy_b, &xf_b);

    // last simplex indices, used to detect cycling
    let mut save_a = [0usize; 3];
    let mut save_b = [0usize; 3];

    let mut iter = 0;
    while iter < MAX_GJK_ITERATIONS {
        let save_count = simplex.count;
        for i in 0..save_count {
            save_a[i] = simplex.v[i].index_a;
            save_b[i] = simplex.v[i].index_b;
        }

        simplex.solve();

        // origin is inside the triangle
        if simplex.count == 3 {
            break;
        }

        let d = simplex.search_direction();
        if d.length_squared() < f32::EPSILON * f32::EPSILON {
            // origin is probably on a segment or triangle: overlap
            break;
        }

        let index_a = proxy_a.support(xf_a.q.apply_inv(-d));
        let index_b = proxy_b.support(xf_b.q.apply_inv(d));
        let w_a = xf_a.apply(proxy_a.vertex(index_a));
        let w_b = xf_b.apply(proxy_b.vertex(index_b));

        iter += 1;

        let duplicate = (0..save_count).any(|i| index_a == save_a[i] && index_b == save_b[i]);
        if duplicate {
            break;
        }

        simplex.v[simplex.count] = SimplexVertex {
            w_a,
            w_b,
            w: w_b - w_a,
            a: 0.0,
            index_a,
            index_b,
        };
        simplex.count += 1;
    }

    let (mut point_a, mut point_b) = simplex.witness_points();
    let mut dist = point_a.distance(point_b);
    simplex.write_cache(cache);

    if input.use_radii {
        if dist < f32::EPSILON {
            let p = (point_a + point_b) * 0.5;
            point_a = p;
            point_b = p;
            dist = 0.0;
        } else {
            // keep the points on the perimeter even when overlapped
            let r_a = proxy_a.radius;
            let r_b = proxy_b.radius;
            let normal = (point_b - point_a).normalize();
            dist = (dist - r_a - r_b).max(0.0);
            point_a += normal * r_a;
            point_b -= normal * r_b;
        }
    }

    DistanceOutput {
        point_a,
        point_b,
        distance: dist,
        iterations: iter,
    }
}

// ============================================================================
// Shape cast
// ============================================================================

/// Input for [`shape_cast`]: proxy B translates by `translation_b`.
#[derive(Clone, Copy, Debug)]
pub struct ShapeCastInput {
    /// Static proxy
    pub proxy_a: DistanceProxy,
    /// Moving proxy
    pub proxy_b: DistanceProxy,
    /// Transform of A
    pub transform_a: Transform,
    /// Transform of B at the start of the cast
    pub transform_b: Transform,
    /// Translation of B over the cast
    pub translation_b: Vec2,
}

/// Hit result of [`shape_cast`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShapeCastOutput {
    /// Hit point on A
    pub point: Vec2,
    /// Surface normal at the hit
    pub normal: Vec2,
    /// Fraction of the translation at first contact
    pub lambda: f32,
    /// GJK iterations used
    pub iterations: u32,
}

/// GJK ray cast of proxy B sweeping against proxy A.
///
/// Returns `None` when the proxies initially overlap or never meet.
#[must_use]
pub fn shape_cast(input: &ShapeCastInput) -> Option<ShapeCastOutput> {
    let proxy_a = &input.proxy_a;
    let proxy_b = &input.proxy_b;

    let radius_a = proxy_a.radius.max(POLYGON_RADIUS);
    let radius_b = proxy_b.radius.max(POLYGON_RADIUS);
    let radius = radius_a + radius_b;

    let xf_a = input.transform_a;
    let xf_b = input.transform_b;

    let r = input.translation_b;
    let mut n = Vec2::ZERO;
    let mut lambda = 0.0;

    let mut simplex = Simplex::default();

    let index_a = proxy_a.support(xf_a.q.apply_inv(-r));
    let w_a = xf_a.apply(proxy_a.vertex(index_a));
    let index_b = proxy_b.support(xf_b.q.apply_inv(r));
    let w_b = xf_b.apply(proxy_b.vertex(index_b));
    let mut v = w_a - w_b;

    // target distance between the cores
    let sigma = POLYGON_RADIUS.max(radius - POLYGON_RADIUS);
    let tolerance = 0.5 * LINEAR_SLOP;

    let mut iter = 0;
    while iter < MAX_GJK_ITERATIONS && v.length() - sigma > tolerance {
        let index_a = proxy_a.support(xf_a.q.apply_inv(-v));
        let w_a = xf_a.apply(proxy_a.vertex(index_a));
        let index_b = proxy_b.support(xf_b.q.apply_inv(v));
        let w_b = xf_b.apply(proxy_b.vertex(index_b));
        let p = w_a - w_b;

        // -v is a normal at p
        v = v.normalize();

        let vp = v.dot(p);
        let vr = v.dot(r);
        if vp - sigma > lambda * vr {
            if vr <= 0.0 {
                return None;
            }
            lambda = (vp - sigma) / vr;
            if lambda > 1.0 {
                return None;
            }
            n = -v;
            simplex.count = 0;
        }

        // the simplex works on B - A, shifted by the current clip point
        simplex.v[simplex.count] = SimplexVertex {
            index_a: index_b,
            w_a: w_b + r * lambda,
            index_b: index_a,
            w_b: w_a,
            w: w_a - (w_b + r * lambda),
            a: 1.0,
        };
        simplex.count += 1;

        simplex.solve();
        if simplex.count == 3 {
            // overlap
            return None;
        }

        v = simplex.closest_point();
        iter += 1;
    }

    if iter == 0 {
        // initial overlap
        return None;
    }

    let (_point_b, point_a) = simplex.witness_points();
    if v.length_squared() > 0.0 {
        n = (-v).normalize();
    }

    Some(ShapeCastOutput {
        point: point_a + n * radius_a,
        normal: n,
        lambda,
        iterations: iter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::PolygonShape;
    use crate::shape::CircleShape;

    fn boxes(offset: Vec2) -> DistanceInput {
        let b = PolygonShape::new_box(0.5, 0.5);
        DistanceInput {
            proxy_a: DistanceProxy::new(b.vertices(), 0.0),
            proxy_b: DistanceProxy::new(b.vertices(), 0.0),
            transform_a: Transform::IDENTITY,
            transform_b: Transform::new(offset, 0.0),
            use_radii: false,
        }
    }

    #[test]
    fn test_box_box_distance() {
        let mut cache = SimplexCache::default();
        let out = distance(&mut cache, &boxes(Vec2::new(3.0, 0.0)));
        assert!((out.distance - 2.0).abs() < 1e-5, "distance = {}", out.distance);
        assert!((out.point_a.x - 0.5).abs() < 1e-5);
        assert!((out.point_b.x - 2.5).abs() < 1e-5);
        assert!(cache.count >= 1);
    }

    #[test]
    fn test_overlap_gives_zero() {
        let mut cache = SimplexCache::default();
        let out = distance(&mut cache, &boxes(Vec2::new(0.5, 0.2)));
        assert!(out.distance < 1e-5);
    }

    #[test]
    fn test_cache_warm_start_is_consistent() {
        let mut cache = SimplexCache::default();
        let first = distance(&mut cache, &boxes(Vec2::new(2.0, 1.5)));
        let second = distance(&mut cache, &boxes(Vec2::new(2.0, 1.5)));
        assert!((first.distance - second.distance).abs() < 1e-5);
        assert!(second.iterations <= first.iterations);
    }

    #[test]
    fn test_circle_radii() {
        let a = Shape::Circle(CircleShape::new(Vec2::ZERO, 1.0));
        let input = DistanceInput {
            proxy_a: DistanceProxy::from_shape(&a, 0),
            proxy_b: DistanceProxy::from_shape(&a, 0),
            transform_a: Transform::IDENTITY,
            transform_b: Transform::new(Vec2::new(5.0, 0.0), 0.0),
            use_radii: true,
        };
        let out = distance(&mut SimplexCache::default(), &input);
        assert!((out.distance - 3.0).abs() < 1e-5);
        assert!((out.point_a.x - 1.0).abs() < 1e-5);
        assert!((out.point_b.x - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_shape_cast_hits_box() {
        let b = PolygonShape::new_box(0.5, 0.5);
        let input = ShapeCastInput {
            proxy_a: DistanceProxy::new(b.vertices(), b.radius),
            proxy_b: DistanceProxy::new(&[Vec2::ZERO], 0.25),
            transform_a: Transform::IDENTITY,
            transform_b: Transform::new(Vec2::new(-5.0, 0.0), 0.0),
            translation_b: Vec2::new(10.0, 0.0),
        };
        let out = shape_cast(&input).expect("cast should hit");
        // cores meet at sigma = 0.25, circle center at x = -0.75
        assert!(out.lambda > 0.40 && out.lambda < 0.43, "lambda = {}", out.lambda);
        assert!(out.normal.x < -0.9);
    }

    #[test]
    fn test_shape_cast_miss() {
        let b = PolygonShape::new_box(0.5, 0.5);
        let input = ShapeCastInput {
            proxy_a: DistanceProxy::new(b.vertices(), b.radius),
            proxy_b: DistanceProxy::new(&[Vec2::ZERO], 0.25),
            transform_a: Transform::IDENTITY,
            transform_b: Transform::new(Vec2::new(-5.0, 3.0), 0.0),
            translation_b: Vec2::new(10.0, 0.0),
        };
        assert!(shape_cast(&input).is_none());
    }
}
