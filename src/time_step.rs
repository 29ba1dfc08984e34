//! Solver Step Data
//!
//! Plain data shared by the island, contact and joint solvers during one
//! (sub-)step: the step parameters and the island-indexed position and
//! velocity buffers.

use crate::math::Vec2;

/// Parameters of one solver pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TimeStep {
    /// Time step
    pub dt: f32,
    /// Inverse time step (0 if `dt == 0`)
    pub inv_dt: f32,
    /// `dt * inv_dt0`, scales warm-start impulses across variable steps
    pub dt_ratio: f32,
    /// Velocity iterations
    pub velocity_iterations: u32,
    /// Position iterations
    pub position_iterations: u32,
    /// Reuse last step's impulses
    pub warm_starting: bool,
}

/// Solver position of a body's center of mass
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    /// Center
    pub c: Vec2,
    /// Angle
    pub a: f32,
}

/// Solver velocity of a body
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity {
    /// Linear velocity
    pub v: Vec2,
    /// Angular velocity
    pub w: f32,
}

/// Island-indexed state handed to the constraint solvers.
#[derive(Debug)]
pub struct SolverData<'a> {
    /// Step parameters
    pub step: TimeStep,
    /// Positions, indexed by island index
    pub positions: &'a mut [Position],
    /// Velocities, indexed by island index
    pub velocities: &'a mut [Velocity],
}
