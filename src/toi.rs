//! Time of Impact
//!
//! Conservative advancement between two swept proxies using the local
//! separating axis method. Each outer iteration builds a separating axis from
//! the GJK simplex, then solves a 1D root (bisection alternating with the
//! secant rule) for the time at which the deepest points reach the target
//! separation.
//!
//! The target separation is `max(LINEAR_SLOP, total_radius - 3 * LINEAR_SLOP)`
//! so that a small overlap remains at the reported time, which the position
//! solver then resolves.

use crate::distance::{distance, DistanceInput, DistanceProxy, SimplexCache};
use crate::math::{cross_vs, Sweep, Vec2};
use crate::settings::{
    LINEAR_SLOP, MAX_POLYGON_VERTICES, MAX_TOI_ITERATIONS, MAX_TOI_ROOT_ITERATIONS,
};

/// Input for [`time_of_impact`]. Sweeps are evaluated on `[0, t_max]`.
#[derive(Clone, Copy, Debug)]
pub struct ToiInput {
    /// First proxy
    pub proxy_a: DistanceProxy,
    /// Second proxy
    pub proxy_b: DistanceProxy,
    /// Motion of A
    pub sweep_a: Sweep,
    /// Motion of B
    pub sweep_b: Sweep,
    /// Upper bound of the sweep interval
    pub t_max: f32,
}

/// Outcome classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToiState {
    /// Not computed
    Unknown,
    /// Root finder gave up; `t` is the last safe time
    Failed,
    /// Shapes overlap at the start
    Overlapped,
    /// Shapes reach the target separation at `t`
    Touching,
    /// Shapes stay apart over the whole interval
    Separated,
}

/// Result of [`time_of_impact`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToiOutput {
    /// Outcome
    pub state: ToiState,
    /// Time of impact in `[0, t_max]`
    pub t: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SeparationKind {
    Points,
    FaceA,
    FaceB,
}

struct SeparationFunction<'a> {
    proxy_a: &'a DistanceProxy,
    proxy_b: &'a DistanceProxy,
    sweep_a: Sweep,
    sweep_b: Sweep,
    kind: SeparationKind,
    local_point: Vec2,
    axis: Vec2,
}

impl<'a> SeparationFunction<'a> {
    fn new(
        cache: &SimplexCache,
        proxy_a: &'a DistanceProxy,
        sweep_a: Sweep,
        proxy_b: &'a DistanceProxy,
        sweep_b: Sweep,
        t1: f32,
    ) -> Self {
        let xf_a = sweep_a.transform(t1);
        let xf_b = sweep_b.transform(t1);
        let ia = |i: usize| usize::from(cache.index_a[i]);
        let ib = |i: usize| usize::from(cache.index_b[i]);

        if cache.count == 1 {
            let point_a = xf_a.apply(proxy_a.vertex(ia(0)));
            let point_b = xf_b.apply(proxy_b.vertex(ib(0)));
            return Self {
                proxy_a,
                proxy_b,
                sweep_a,
                sweep_b,
                kind: SeparationKind::Points,
                local_point: Vec2::ZERO,
                axis: (point_b - point_a).normalize(),
            };
        }

        if cache.index_a[0] == cache.index_a[1] {
            // two points on B, one on A
            let local_b1 = proxy_b.vertex(ib(0));
            let local_b2 = proxy_b.vertex(ib(1));
            let mut axis = cross_vs(local_b2 - local_b1, 1.0).normalize();
            let normal = xf_b.q.apply(axis);
            let local_point = (local_b1 + local_b2) * 0.5;
            let point_b = xf_b.apply(local_point);
            let point_a = xf_a.apply(proxy_a.vertex(ia(0)));
            if (point_a - point_b).dot(normal) < 0.0 {
                axis = -axis;
            }
            Self {
                proxy_a,
                proxy_b,
                sweep_a,
                sweep_b,
                kind: SeparationKind::FaceB,
                local_point,
                axis,
            }
        } else {
            // two points on A, one or two on B
            let local_a1 = proxy_a.vertex(ia(0));
            let local_a2 = proxy_a.vertex(ia(1));
            let mut axis = cross_vs(local_a2 - local_a1, 1.0).normalize();
            let normal = xf_a.q.apply(axis);
            let local_point = (local_a1 + local_a2) * 0.5;
            let point_a = xf_a.apply(local_point);
            let point_b = xf_b.apply(proxy_b.vertex(ib(0)));
            if (point_b - point_a).dot(normal) < 0.0 {
                axis = -axis;
            }
            Self {
                proxy_a,
                proxy_b,
                sweep_a,
                sweep_b,
                kind: SeparationKind::FaceA,
                local_point,
                axis,
            }
        }
    }

    /// Deepest points at `t` and their separation.
    fn find_min_separation(&self, t: f32) -> (usize, usize, f32) {
        let xf_a = self.sweep_a.transform(t);
        let xf_b = self.sweep_b.transform(t);

        match self.kind {
            SeparationKind::Points => {
                let index_a = self.proxy_a.support(xf_a.q.apply_inv(self.axis));
                let index_b = self.proxy_b.support(xf_b.q.apply_inv(-self.axis));
                let point_a = xf_a.apply(self.proxy_a.vertex(index_a));
                let point_b = xf_b.apply(self.proxy_b.vertex(index_b));
                (index_a, index_b, (point_b - point_a).dot(self.axis))
            }
            SeparationKind::FaceA => {
                let normal = xf_a.q.apply(self.axis);
                let point_a = xf_a.apply(self.local_point);
                let index_b = self.proxy_b.support(xf_b.q.apply_inv(-normal));
                let point_b = xf_b.apply(self.proxy_b.vertex(index_b));
                (0, index_b, (point_b - point_a).dot(normal))
            }
            SeparationKind::FaceB => {
                let normal = xf_b.q.apply(self.axis);
                let point_b = xf_b.apply(self.local_point);
                let index_a = self.proxy_a.support(xf_a.q.apply_inv(-normal));
                let point_a = xf_a.apply(self.proxy_a.vertex(index_a));
                (index_a, 0, (point_a - point_b).dot(normal))
            }
        }
    }

    /// Separation of the given witness points at `t`.
    fn evaluate(&self, index_a: usize, index_b: usize, t: f32) -> f32 {
        let xf_a = self.sweep_a.transform(t);
        let xf_b = self.sweep_b.transform(t);

        match self.kind {
            SeparationKind::Points => {
                let point_a = xf_a.apply(self.proxy_a.vertex(index_a));
                let point_b = xf_b.apply(self.proxy_b.vertex(index_b));
                (point_b - point_a).dot(self.axis)
            }
            SeparationKind::FaceA => {
                let normal = xf_a.q.apply(self.axis);
                let point_a = xf_a.apply(self.local_point);
                let point_b = xf_b.apply(self.proxy_b.vertex(index_b));
                (point_b - point_a).dot(normal)
            }
            SeparationKind::FaceB => {
                let normal = xf_b.q.apply(self.axis);
                let point_b = xf_b.apply(self.local_point);
                let point_a = xf_a.apply(self.proxy_a.vertex(index_a));
                (point_a - point_b).dot(normal)
            }
        }
    }
}

/// Earliest time in `[0, t_max]` at which the swept proxies come within the
/// target separation.
#[must_use]
pub fn time_of_impact(input: &ToiInput) -> ToiOutput {
    let proxy_a = &input.proxy_a;
    let proxy_b = &input.proxy_b;

    let mut sweep_a = input.sweep_a;
    let mut sweep_b = input.sweep_b;

    // large rotations make the root finder fail
    sweep_a.normalize();
    sweep_b.normalize();

    let t_max = input.t_max;

    let total_radius = proxy_a.radius + proxy_b.radius;
    let target = LINEAR_SLOP.max(total_radius - 3.0 * LINEAR_SLOP);
    let tolerance = 0.25 * LINEAR_SLOP;

    let mut t1 = 0.0;
    let mut iter = 0;

    let mut cache = SimplexCache::default();
    let mut distance_input = DistanceInput {
        proxy_a: *proxy_a,
        proxy_b: *proxy_b,
        transform_a: sweep_a.transform(t1),
        transform_b: sweep_b.transform(t1),
        use_radii: false,
    };

    // each outer iteration builds a fresh separating axis
    loop {
        distance_input.transform_a = sweep_a.transform(t1);
        distance_input.transform_b = sweep_b.transform(t1);
        let distance_output = distance(&mut cache, &distance_input);

        if distance_output.distance <= 0.0 {
            return ToiOutput {
                state: ToiState::Overlapped,
                t: 0.0,
            };
        }

        if distance_output.distance < target + tolerance {
            return ToiOutput {
                state: ToiState::Touching,
                t: t1,
            };
        }

        let fcn = SeparationFunction::new(&cache, proxy_a, sweep_a, proxy_b, sweep_b, t1);

        // resolve the deepest point; bounded by the vertex count
        let mut t2 = t_max;
        let mut push_back_iter = 0;
        loop {
            let (index_a, index_b, mut s2) = fcn.find_min_separation(t2);

            // final configuration separated
            if s2 > target + tolerance {
                return ToiOutput {
                    state: ToiState::Separated,
                    t: t_max,
                };
            }

            // separation reached tolerance: advance
            if s2 > target - tolerance {
                t1 = t2;
                break;
            }

            let mut s1 = fcn.evaluate(index_a, index_b, t1);

            // initial overlap, root finder ran out of iterations earlier
            if s1 < target - tolerance {
                return ToiOutput {
                    state: ToiState::Failed,
                    t: t1,
                };
            }

            if s1 <= target + tolerance {
                return ToiOutput {
                    state: ToiState::Touching,
                    t: t1,
                };
            }

            // 1D root of f(t) - target
            let mut root_iter = 0;
            let mut a1 = t1;
            let mut a2 = t2;
            loop {
                let t = if root_iter & 1 == 1 {
                    // secant
                    a1 + (target - s1) * (a2 - a1) / (s2 - s1)
                } else {
                    // bisection
                    0.5 * (a1 + a2)
                };
                root_iter += 1;

                let s = fcn.evaluate(index_a, index_b, t);
                if (s - target).abs() < tolerance {
                    t2 = t;
                    break;
                }

                // keep the root bracketed
                if s > target {
                    a1 = t;
                    s1 = s;
                } else {
                    a2 = t;
                    s2 = s;
                }

                if root_iter == MAX_TOI_ROOT_ITERATIONS {
                    break;
                }
            }

            push_back_iter += 1;
            if push_back_iter == MAX_POLYGON_VERTICES {
                break;
            }
        }

        iter += 1;
        if iter == MAX_TOI_ITERATIONS {
            // root finder stuck
            tracing::trace!(t = t1, "time of impact iteration limit reached");
            return ToiOutput {
                state: ToiState::Failed,
                t: t1,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::PolygonShape;

    fn sweep(c0: Vec2, c: Vec2, a0: f32, a: f32) -> Sweep {
        Sweep {
            local_center: Vec2::ZERO,
            c0,
            c,
            a0,
            a,
            alpha0: 0.0,
        }
    }

    #[test]
    fn test_fast_box_hits_static_box() {
        let b = PolygonShape::new_box(0.5, 0.5);
        let input = ToiInput {
            proxy_a: DistanceProxy::new(b.vertices(), b.radius),
            proxy_b: DistanceProxy::new(b.vertices(), b.radius),
            sweep_a: sweep(Vec2::ZERO, Vec2::ZERO, 0.0, 0.0),
            sweep_b: sweep(Vec2::new(-10.0, 0.0), Vec2::new(10.0, 0.0), 0.0, 0.0),
            t_max: 1.0,
        };
        let out = time_of_impact(&input);
        assert_eq!(out.state, ToiState::Touching);
        // faces meet when B's center reaches x = -1 (t = 0.45)
        assert!(out.t > 0.44 && out.t < 0.46, "t = {}", out.t);
    }

    #[test]
    fn test_separated_when_missing() {
        let b = PolygonShape::new_box(0.5, 0.5);
        let input = ToiInput {
            proxy_a: DistanceProxy::new(b.vertices(), b.radius),
            proxy_b: DistanceProxy::new(b.vertices(), b.radius),
            sweep_a: sweep(Vec2::ZERO, Vec2::ZERO, 0.0, 0.0),
            sweep_b: sweep(Vec2::new(-10.0, 3.0), Vec2::new(10.0, 3.0), 0.0, 0.0),
            t_max: 1.0,
        };
        let out = time_of_impact(&input);
        assert_eq!(out.state, ToiState::Separated);
        assert_eq!(out.t, 1.0);
    }

    #[test]
    fn test_rotating_bar_reaches_circle() {
        let bar = PolygonShape::new_box(2.0, 0.05);
        let input = ToiInput {
            proxy_a: DistanceProxy::new(bar.vertices(), bar.radius),
            proxy_b: DistanceProxy::new(&[Vec2::ZERO], 0.1),
            sweep_a: sweep(Vec2::ZERO, Vec2::ZERO, 0.0, 1.5),
            sweep_b: sweep(Vec2::new(0.0, 1.5), Vec2::new(0.0, 1.5), 0.0, 0.0),
            t_max: 1.0,
        };
        let out = time_of_impact(&input);
        assert_eq!(out.state, ToiState::Touching);
        assert!(out.t > 0.0 && out.t < 1.0);
    }

    #[test]
    fn test_initial_overlap() {
        let b = PolygonShape::new_box(0.5, 0.5);
        let input = ToiInput {
            proxy_a: DistanceProxy::new(b.vertices(), b.radius),
            proxy_b: DistanceProxy::new(b.vertices(), b.radius),
            sweep_a: sweep(Vec2::ZERO, Vec2::ZERO, 0.0, 0.0),
            sweep_b: sweep(Vec2::new(0.2, 0.0), Vec2::new(5.0, 0.0), 0.0, 0.0),
            t_max: 1.0,
        };
        assert_eq!(time_of_impact(&input).state, ToiState::Overlapped);
    }
}
