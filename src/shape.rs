//! Collision Shapes
//!
//! Closed set of convex primitives attached to fixtures. Every shape exposes
//! the same queries: child count, point containment, ray cast, bounding box
//! and mass properties. Chains are the only multi-child shape.
//!
//! # Shapes
//!
//! - [`CircleShape`]: solid disc
//! - [`EdgeShape`]: line segment, optionally one-sided with ghost vertices
//! - [`PolygonShape`]: convex polygon with up to `MAX_POLYGON_VERTICES`
//! - [`ChainShape`]: polyline or loop of one-sided edges

use crate::collision::{Aabb, RayCastInput, RayCastOutput};
use crate::math::{Transform, Vec2};
use crate::settings::{PI, POLYGON_RADIUS};

pub use crate::chain::ChainShape;
pub use crate::polygon::PolygonShape;

/// Primitive kind, used for contact dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeType {
    /// Disc
    Circle,
    /// Segment
    Edge,
    /// Convex polygon
    Polygon,
    /// Polyline
    Chain,
}

/// Mass properties of a shape or body.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MassData {
    /// Mass in kilograms
    pub mass: f32,
    /// Center of mass relative to the shape (or body) origin
    pub center: Vec2,
    /// Rotational inertia about the shape (or body) origin
    pub inertia: f32,
}

// ============================================================================
// Circle
// ============================================================================

/// Solid disc.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleShape {
    /// Center in body space
    pub position: Vec2,
    /// Radius
    pub radius: f32,
}

impl CircleShape {
    /// Create a circle.
    #[inline]
    #[must_use]
    pub const fn new(position: Vec2, radius: f32) -> Self {
        Self { position, radius }
    }

    /// Point containment.
    #[must_use]
    pub fn test_point(&self, xf: &Transform, p: Vec2) -> bool {
        let center = xf.apply(self.position);
        (p - center).length_squared() <= self.radius * self.radius
    }

    /// Ray cast against the disc boundary.
    #[must_use]
    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let position = xf.apply(self.position);
        let s = input.p1 - position;
        let b = s.dot(s) - self.radius * self.radius;

        let r = input.p2 - input.p1;
        let c = s.dot(r);
        let rr = r.dot(r);
        let sigma = c * c - rr * b;

        if sigma < 0.0 || rr < f32::EPSILON {
            return None;
        }

        let mut a = -(c + sigma.sqrt());
        if 0.0 <= a && a <= input.max_fraction * rr {
            a /= rr;
            return Some(RayCastOutput {
                fraction: a,
                normal: (s + r * a).normalize(),
            });
        }
        None
    }

    /// World bounding box.
    #[must_use]
    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let p = xf.apply(self.position);
        Aabb::from_center(p, Vec2::new(self.radius, self.radius))
    }

    /// Mass about the shape origin.
    #[must_use]
    pub fn compute_mass(&self, density: f32) -> MassData {
        let mass = density * PI * self.radius * self.radius;
        MassData {
            mass,
            center: self.position,
            inertia: mass * (0.5 * self.radius * self.radius + self.position.dot(self.position)),
        }
    }
}

// ============================================================================
// Edge
// ============================================================================

/// Line segment.
///
/// A one-sided edge collides only on its right side (looking from `vertex1`
/// to `vertex2`) and uses the ghost vertices `vertex0`/`vertex3` to smooth
/// collision across chain joints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeShape {
    /// Ghost vertex before `vertex1`
    pub vertex0: Vec2,
    /// Start point
    pub vertex1: Vec2,
    /// End point
    pub vertex2: Vec2,
    /// Ghost vertex after `vertex2`
    pub vertex3: Vec2,
    /// Collide on one side only
    pub one_sided: bool,
    /// Skin radius
    pub radius: f32,
}

impl Default for EdgeShape {
    fn default() -> Self {
        Self {
            vertex0: Vec2::ZERO,
            vertex1: Vec2::ZERO,
            vertex2: Vec2::ZERO,
            vertex3: Vec2::ZERO,
            one_sided: false,
            radius: POLYGON_RADIUS,
        }
    }
}

impl EdgeShape {
    /// Two-sided segment.
    #[must_use]
    pub fn two_sided(v1: Vec2, v2: Vec2) -> Self {
        Self {
            vertex1: v1,
            vertex2: v2,
            ..Self::default()
        }
    }

    /// One-sided segment `v1 -> v2` with ghost vertices.
    #[must_use]
    pub fn one_sided(v0: Vec2, v1: Vec2, v2: Vec2, v3: Vec2) -> Self {
        Self {
            vertex0: v0,
            vertex1: v1,
            vertex2: v2,
            vertex3: v3,
            one_sided: true,
            radius: POLYGON_RADIUS,
        }
    }

    /// Ray cast. One-sided edges ignore rays starting on their back side.
    #[must_use]
    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let p1 = xf.apply_inv(input.p1);
        let p2 = xf.apply_inv(input.p2);
        let d = p2 - p1;

        let v1 = self.vertex1;
        let v2 = self.vertex2;
        let e = v2 - v1;

        // normal points to the right of v1 -> v2
        let normal = Vec2::new(e.y, -e.x).normalize();

        let numerator = normal.dot(v1 - p1);
        if self.one_sided && numerator > 0.0 {
            return None;
        }

        let denominator = normal.dot(d);
        if denominator == 0.0 {
            return None;
        }

        let t = numerator / denominator;
        if t < 0.0 || input.max_fraction < t {
            return None;
        }

        let q = p1 + d * t;
        let rr = e.dot(e);
        if rr == 0.0 {
            return None;
        }
        let s = (q - v1).dot(e) / rr;
        if !(0.0..=1.0).contains(&s) {
            return None;
        }

        let world_normal = xf.q.apply(normal);
        Some(RayCastOutput {
            fraction: t,
            normal: if numerator > 0.0 {
                -world_normal
            } else {
                world_normal
            },
        })
    }

    /// World bounding box.
    #[must_use]
    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let v1 = xf.apply(self.vertex1);
        let v2 = xf.apply(self.vertex2);
        let r = Vec2::new(self.radius, self.radius);
        Aabb::new(v1.min(v2) - r, v1.max(v2) + r)
    }

    /// Edges are massless.
    #[must_use]
    pub fn compute_mass(&self, _density: f32) -> MassData {
        MassData {
            mass: 0.0,
            center: (self.vertex1 + self.vertex2) * 0.5,
            inertia: 0.0,
        }
    }
}

// ============================================================================
// Shape
// ============================================================================

/// Any collision shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// Disc
    Circle(CircleShape),
    /// Segment
    Edge(EdgeShape),
    /// Convex polygon
    Polygon(PolygonShape),
    /// Polyline or loop
    Chain(ChainShape),
}

impl Shape {
    /// Primitive kind
    #[inline]
    #[must_use]
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Self::Circle(_) => ShapeType::Circle,
            Self::Edge(_) => ShapeType::Edge,
            Self::Polygon(_) => ShapeType::Polygon,
            Self::Chain(_) => ShapeType::Chain,
        }
    }

    /// Skin radius (circle radius for discs)
    #[inline]
    #[must_use]
    pub fn radius(&self) -> f32 {
        match self {
            Self::Circle(s) => s.radius,
            Self::Edge(s) => s.radius,
            Self::Polygon(s) => s.radius,
            Self::Chain(s) => s.radius,
        }
    }

    /// Number of children (broad-phase proxies).
    #[inline]
    #[must_use]
    pub fn child_count(&self) -> usize {
        match self {
            Self::Chain(s) => s.child_count(),
            _ => 1,
        }
    }

    /// Point containment. Edges and chains contain nothing.
    #[must_use]
    pub fn test_point(&self, xf: &Transform, p: Vec2) -> bool {
        match self {
            Self::Circle(s) => s.test_point(xf, p),
            Self::Polygon(s) => s.test_point(xf, p),
            Self::Edge(_) | Self::Chain(_) => false,
        }
    }

    /// Ray cast against one child.
    #[must_use]
    pub fn ray_cast(
        &self,
        input: &RayCastInput,
        xf: &Transform,
        child_index: usize,
    ) -> Option<RayCastOutput> {
        match self {
            Self::Circle(s) => s.ray_cast(input, xf),
            Self::Edge(s) => s.ray_cast(input, xf),
            Self::Polygon(s) => s.ray_cast(input, xf),
            Self::Chain(s) => s.ray_cast(input, xf, child_index),
        }
    }

    /// World bounding box of one child.
    #[must_use]
    pub fn compute_aabb(&self, xf: &Transform, child_index: usize) -> Aabb {
        match self {
            Self::Circle(s) => s.compute_aabb(xf),
            Self::Edge(s) => s.compute_aabb(xf),
            Self::Polygon(s) => s.compute_aabb(xf),
            Self::Chain(s) => s.compute_aabb(xf, child_index),
        }
    }

    /// Mass properties at the given density.
    #[must_use]
    pub fn compute_mass(&self, density: f32) -> MassData {
        match self {
            Self::Circle(s) => s.compute_mass(density),
            Self::Edge(s) => s.compute_mass(density),
            Self::Polygon(s) => s.compute_mass(density),
            Self::Chain(_) => MassData::default(),
        }
    }
}

impl From<CircleShape> for Shape {
    fn from(s: CircleShape) -> Self {
        Self::Circle(s)
    }
}

impl From<EdgeShape> for Shape {
    fn from(s: EdgeShape) -> Self {
        Self::Edge(s)
    }
}

impl From<PolygonShape> for Shape {
    fn from(s: PolygonShape) -> Self {
        Self::Polygon(s)
    }
}

impl From<ChainShape> for Shape {
    fn from(s: ChainShape) -> Self {
        Self::Chain(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_mass() {
        let c = CircleShape::new(Vec2::new(1.0, 0.0), 0.5);
        let md = c.compute_mass(2.0);
        let expected = 2.0 * PI * 0.25;
        assert!((md.mass - expected).abs() < 1e-5);
        assert_eq!(md.center, Vec2::new(1.0, 0.0));
        // parallel axis: I = m (r^2/2 + d^2)
        assert!((md.inertia - expected * (0.125 + 1.0)).abs() < 1e-4);
    }

    #[test]
    fn test_circle_ray_cast() {
        let c = CircleShape::new(Vec2::ZERO, 1.0);
        let input = RayCastInput {
            p1: Vec2::new(-3.0, 0.0),
            p2: Vec2::new(3.0, 0.0),
            max_fraction: 1.0,
        };
        let hit = c.ray_cast(&input, &Transform::IDENTITY).expect("hit");
        assert!((hit.fraction - 2.0 / 6.0).abs() < 1e-5);
        assert!((hit.normal.x + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_edge_one_sided_ray() {
        let e = EdgeShape::one_sided(
            Vec2::new(-2.0, 0.0),
            Vec2::new(-1.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
        );
        // the right side of v1 -> v2 is -y, so only rays from below hit
        let from_below = RayCastInput {
            p1: Vec2::new(0.0, -1.0),
            p2: Vec2::new(0.0, 1.0),
            max_fraction: 1.0,
        };
        let from_above = RayCastInput {
            p1: Vec2::new(0.0, 1.0),
            p2: Vec2::new(0.0, -1.0),
            max_fraction: 1.0,
        };
        assert!(e.ray_cast(&from_below, &Transform::IDENTITY).is_some());
        assert!(e.ray_cast(&from_above, &Transform::IDENTITY).is_none());

        let two = EdgeShape::two_sided(Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0));
        let hit = two.ray_cast(&from_below, &Transform::IDENTITY).expect("hit");
        assert!((hit.fraction - 0.5).abs() < 1e-6);
        assert!((hit.normal.y + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_shape_dispatch() {
        let s: Shape = CircleShape::new(Vec2::ZERO, 2.0).into();
        assert_eq!(s.shape_type(), ShapeType::Circle);
        assert_eq!(s.child_count(), 1);
        assert!(s.test_point(&Transform::IDENTITY, Vec2::new(1.0, 1.0)));
        let aabb = s.compute_aabb(&Transform::new(Vec2::new(1.0, 0.0), 0.0), 0);
        assert_eq!(aabb.lower_bound, Vec2::new(-1.0, -2.0));

        let e: Shape = EdgeShape::two_sided(Vec2::ZERO, Vec2::UNIT_X).into();
        assert!(!e.test_point(&Transform::IDENTITY, Vec2::ZERO));
        assert_eq!(e.compute_mass(1.0).mass, 0.0);
    }
}
