//! Chain Shape
//!
//! Free-form polyline or closed loop. Each segment is a child shape that
//! behaves as a one-sided [`EdgeShape`] whose ghost vertices come from the
//! neighbouring segments, which keeps bodies from catching on internal
//! vertices. Chains have no mass and contain no points.

use crate::collision::{Aabb, RayCastInput, RayCastOutput};
use crate::error::{ConfigurationError, PhysicsError};
use crate::math::{Transform, Vec2};
use crate::settings::{LINEAR_SLOP, POLYGON_RADIUS};
use crate::shape::EdgeShape;

/// Polyline of one-sided edges.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainShape {
    /// Vertices; a loop repeats its first vertex at the end
    pub vertices: Vec<Vec2>,
    /// Ghost vertex before the first segment
    pub prev_vertex: Vec2,
    /// Ghost vertex after the last segment
    pub next_vertex: Vec2,
    /// Skin radius
    pub radius: f32,
}

fn check_spacing(vertices: &[Vec2]) -> Result<(), PhysicsError> {
    let too_close = vertices
        .windows(2)
        .any(|w| w[0].distance_squared(w[1]) <= LINEAR_SLOP * LINEAR_SLOP);
    if too_close {
        return Err(ConfigurationError::InvalidChain.into());
    }
    Ok(())
}

impl ChainShape {
    /// Closed loop through `vertices` (at least three).
    pub fn new_loop(vertices: &[Vec2]) -> Result<Self, PhysicsError> {
        if vertices.len() < 3 {
            return Err(ConfigurationError::TooFewVertices {
                shape: "chain loop",
                min: 3,
                got: vertices.len(),
            }
            .into());
        }
        check_spacing(vertices)?;

        let mut vs = vertices.to_vec();
        vs.push(vertices[0]);
        let count = vs.len();
        Ok(Self {
            prev_vertex: vs[count - 2],
            next_vertex: vs[1],
            vertices: vs,
            radius: POLYGON_RADIUS,
        })
    }

    /// Open chain with explicit ghost vertices at both ends.
    pub fn new_chain(
        vertices: &[Vec2],
        prev_vertex: Vec2,
        next_vertex: Vec2,
    ) -> Result<Self, PhysicsError> {
        if vertices.len() < 2 {
            return Err(ConfigurationError::TooFewVertices {
                shape: "chain",
                min: 2,
                got: vertices.len(),
            }
            .into());
        }
        check_spacing(vertices)?;
        Ok(Self {
            vertices: vertices.to_vec(),
            prev_vertex,
            next_vertex,
            radius: POLYGON_RADIUS,
        })
    }

    /// One child per segment.
    #[inline]
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }

    /// Segment `index` as a one-sided edge with ghost vertices.
    #[must_use]
    pub fn child_edge(&self, index: usize) -> EdgeShape {
        let n = self.vertices.len();
        debug_assert!(index + 1 < n);
        let vertex0 = if index > 0 {
            self.vertices[index - 1]
        } else {
            self.prev_vertex
        };
        let vertex3 = if index + 2 < n {
            self.vertices[index + 2]
        } else {
            self.next_vertex
        };
        EdgeShape {
            vertex0,
            vertex1: self.vertices[index],
            vertex2: self.vertices[index + 1],
            vertex3,
            one_sided: true,
            radius: self.radius,
        }
    }

    /// Ray cast against one segment. Segments are hit from both sides.
    #[must_use]
    pub fn ray_cast(
        &self,
        input: &RayCastInput,
        xf: &Transform,
        child_index: usize,
    ) -> Option<RayCastOutput> {
        let i1 = child_index;
        let i2 = if child_index + 1 == self.vertices.len() {
            0
        } else {
            child_index + 1
        };
        let edge = EdgeShape::two_sided(self.vertices[i1], self.vertices[i2]);
        edge.ray_cast(input, xf)
    }

    /// Bounding box of one segment.
    #[must_use]
    pub fn compute_aabb(&self, xf: &Transform, child_index: usize) -> Aabb {
        let i1 = child_index;
        let i2 = if child_index + 1 == self.vertices.len() {
            0
        } else {
            child_index + 1
        };
        let v1 = xf.apply(self.vertices[i1]);
        let v2 = xf.apply(self.vertices[i2]);
        let r = Vec2::new(self.radius, self.radius);
        Aabb::new(v1.min(v2) - r, v1.max(v2) + r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_loop_children_and_ghosts() {
        let chain = ChainShape::new_loop(&square()).expect("valid loop");
        assert_eq!(chain.child_count(), 4);

        let first = chain.child_edge(0);
        assert!(first.one_sided);
        assert_eq!(first.vertex0, Vec2::new(0.0, 1.0));
        assert_eq!(first.vertex3, Vec2::new(1.0, 1.0));

        let last = chain.child_edge(3);
        assert_eq!(last.vertex2, Vec2::new(0.0, 0.0));
        assert_eq!(last.vertex3, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_open_chain_uses_explicit_ghosts() {
        let vs = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)];
        let chain = ChainShape::new_chain(&vs, Vec2::new(-1.0, 0.0), Vec2::new(2.0, 0.0)).expect("chain");
        assert_eq!(chain.child_count(), 1);
        let e = chain.child_edge(0);
        assert_eq!(e.vertex0, Vec2::new(-1.0, 0.0));
        assert_eq!(e.vertex3, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(ChainShape::new_loop(&square()[..2]).is_err());
        let close = [Vec2::ZERO, Vec2::new(0.001, 0.0)];
        assert_eq!(
            ChainShape::new_chain(&close, Vec2::ZERO, Vec2::ZERO),
            Err(ConfigurationError::InvalidChain.into())
        );
    }

    #[test]
    fn test_segment_aabb_and_ray() {
        let chain = ChainShape::new_loop(&square()).expect("valid loop");
        let aabb = chain.compute_aabb(&Transform::IDENTITY, 1);
        assert!((aabb.lower_bound.x - (1.0 - POLYGON_RADIUS)).abs() < 1e-6);
        assert!((aabb.upper_bound.y - (1.0 + POLYGON_RADIUS)).abs() < 1e-6);

        let input = RayCastInput {
            p1: Vec2::new(0.5, 0.5),
            p2: Vec2::new(0.5, -1.0),
            max_fraction: 1.0,
        };
        let hit = chain.ray_cast(&input, &Transform::IDENTITY, 0).expect("hit");
        assert!((hit.fraction - 1.0 / 3.0).abs() < 1e-5);
    }
}
