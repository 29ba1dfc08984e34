//! Step Profiling
//!
//! Wall-clock timings of the phases of the last `World::step`, in
//! milliseconds, plus a running aggregate for averaging over many steps.
//!
//! # Profiled Phases
//!
//! - Collide (narrow-phase update of every contact)
//! - Solve (islands: init, velocity, position)
//! - Broad-phase (proxy synchronization and pair search)
//! - Solve TOI (continuous collision sub-steps)

use std::time::Instant;

/// Timings of one step in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Profile {
    /// Whole step
    pub step: f32,
    /// Contact manifold update
    pub collide: f32,
    /// Discrete solve, including the phases below
    pub solve: f32,
    /// Velocity and joint constraint initialization
    pub solve_init: f32,
    /// Velocity iterations
    pub solve_velocity: f32,
    /// Position iterations
    pub solve_position: f32,
    /// Fixture synchronization and new pair search
    pub broadphase: f32,
    /// Continuous collision
    pub solve_toi: f32,
}

impl Profile {
    /// Add the island phases of one island solve.
    pub(crate) fn add_island(&mut self, island: &Profile) {
        self.solve_init += island.solve_init;
        self.solve_velocity += island.solve_velocity;
        self.solve_position += island.solve_position;
    }
}

/// Millisecond stopwatch.
#[derive(Clone, Copy, Debug)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start timing now
    #[must_use]
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    /// Restart from now
    pub fn reset(&mut self) {
        self.start = Instant::now();
    }

    /// Elapsed milliseconds since start or the last reset
    #[must_use]
    pub fn milliseconds(&self) -> f32 {
        self.start.elapsed().as_secs_f32() * 1000.0
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Running statistics over many step profiles.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProfileAggregate {
    /// Per-phase sums
    pub total: Profile,
    /// Per-phase maxima
    pub peak: Profile,
    /// Number of recorded steps
    pub count: u64,
}

impl ProfileAggregate {
    /// Empty aggregate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one step's profile
    pub fn record(&mut self, p: &Profile) {
        macro_rules! fold {
            ($($field:ident),*) => {
                $(
                    self.total.$field += p.$field;
                    self.peak.$field = self.peak.$field.max(p.$field);
                )*
            };
        }
        fold!(step, collide, solve, solve_init, solve_velocity, solve_position, broadphase, solve_toi);
        self.count += 1;
    }

    /// Per-phase averages
    #[must_use]
    pub fn average(&self) -> Profile {
        if self.count == 0 {
            return Profile::default();
        }
        let scale = 1.0 / self.count as f32;
        Profile {
            step: self.total.step * scale,
            collide: self.total.collide * scale,
            solve: self.total.solve * scale,
            solve_init: self.total.solve_init * scale,
            solve_velocity: self.total.solve_velocity * scale,
            solve_position: self.total.solve_position * scale,
            broadphase: self.total.broadphase * scale,
            solve_toi: self.total.solve_toi * scale,
        }
    }

    /// Forget everything recorded so far
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_is_monotonic() {
        let timer = Timer::new();
        let a = timer.milliseconds();
        let b = timer.milliseconds();
        assert!(a >= 0.0);
        assert!(b >= a);
    }

    #[test]
    fn test_aggregate_average_and_peak() {
        let mut agg = ProfileAggregate::new();
        agg.record(&Profile {
            step: 2.0,
            collide: 1.0,
            ..Profile::default()
        });
        agg.record(&Profile {
            step: 4.0,
            collide: 0.5,
            ..Profile::default()
        });

        let avg = agg.average();
        assert_eq!(agg.count, 2);
        assert_eq!(avg.step, 3.0);
        assert_eq!(avg.collide, 0.75);
        assert_eq!(agg.peak.step, 4.0);
        assert_eq!(agg.peak.collide, 1.0);

        agg.reset();
        assert_eq!(agg.count, 0);
        assert_eq!(agg.average(), Profile::default());
    }

    #[test]
    fn test_add_island_sums_solver_phases() {
        let mut step = Profile::default();
        let island = Profile {
            solve_init: 1.0,
            solve_velocity: 2.0,
            solve_position: 3.0,
            ..Profile::default()
        };
        step.add_island(&island);
        step.add_island(&island);
        assert_eq!(step.solve_velocity, 4.0);
        assert_eq!(step.solve_position, 6.0);
    }
}
