//! Global Tuning Constants
//!
//! Lengths are in meters, angles in radians, time in seconds. The engine is
//! tuned for moving objects between 0.1 and 10 meters; static geometry can be
//! up to roughly 50 meters.

/// π as `f32`.
pub const PI: f32 = core::f32::consts::PI;

/// Maximum number of contact points between two convex shapes.
pub const MAX_MANIFOLD_POINTS: usize = 2;

/// Maximum number of vertices on a convex polygon.
pub const MAX_POLYGON_VERTICES: usize = 8;

/// Fattening applied to broad-phase AABBs so proxies can move a little
/// without triggering a tree update.
pub const AABB_EXTENSION: f32 = 0.1;

/// Multiplier applied to the displacement when predicting AABB movement.
pub const AABB_MULTIPLIER: f32 = 4.0;

/// Collision and constraint tolerance. Chosen to be numerically significant
/// but visually insignificant.
pub const LINEAR_SLOP: f32 = 0.005;

/// Angular collision and constraint tolerance.
pub const ANGULAR_SLOP: f32 = 2.0 / 180.0 * PI;

/// Skin radius around polygons, keeps the TOI solver clear of the core shape.
pub const POLYGON_RADIUS: f32 = 2.0 * LINEAR_SLOP;

/// Maximum number of TOI sub-steps per contact in one step.
pub const MAX_SUB_STEPS: u32 = 8;

/// Maximum number of contacts gathered into one TOI island.
pub const MAX_TOI_CONTACTS: usize = 32;

/// Maximum linear position correction per solver iteration.
pub const MAX_LINEAR_CORRECTION: f32 = 0.2;

/// Maximum angular position correction per solver iteration.
pub const MAX_ANGULAR_CORRECTION: f32 = 8.0 / 180.0 * PI;

/// Maximum translation of a body per step.
pub const MAX_TRANSLATION: f32 = 2.0;
/// Square of [`MAX_TRANSLATION`].
pub const MAX_TRANSLATION_SQUARED: f32 = MAX_TRANSLATION * MAX_TRANSLATION;

/// Maximum rotation of a body per step.
pub const MAX_ROTATION: f32 = 0.5 * PI;
/// Square of [`MAX_ROTATION`].
pub const MAX_ROTATION_SQUARED: f32 = MAX_ROTATION * MAX_ROTATION;

/// Fraction of overlap resolved per position iteration.
pub const BAUMGARTE: f32 = 0.2;

/// Baumgarte factor used by the TOI position solver.
pub const TOI_BAUMGARTE: f32 = 0.75;

/// Time a body must be still before it can sleep.
pub const TIME_TO_SLEEP: f32 = 0.5;

/// Linear velocity below which a body counts as resting.
pub const LINEAR_SLEEP_TOLERANCE: f32 = 0.01;

/// Angular velocity below which a body counts as resting.
pub const ANGULAR_SLEEP_TOLERANCE: f32 = 2.0 / 180.0 * PI;

/// Default restitution velocity threshold. Collisions slower than this are
/// treated as inelastic.
pub const VELOCITY_THRESHOLD: f32 = 1.0;

/// Iteration cap for the conservative-advancement root finder.
pub const MAX_TOI_ITERATIONS: u32 = 20;

/// Iteration cap for GJK.
pub const MAX_GJK_ITERATIONS: u32 = 20;

/// Iteration cap for the TOI separation root finder.
pub const MAX_TOI_ROOT_ITERATIONS: u32 = 50;

/// Maximum number of bodies a world can hold before creation fails.
pub const MAX_BODIES: usize = 1 << 20;
