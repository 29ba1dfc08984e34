//! Physics Error Types
//!
//! Unified error type for the engine. Structural operations (create/destroy
//! of bodies, fixtures and joints) and definition validation return
//! `Result<T, PhysicsError>` instead of asserting. Numerical degeneracies of
//! the physical model never surface here; they fall back locally.
//!
//! Author: Moroya Sakamoto

use thiserror::Error;

/// Which kind of handle failed to resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleKind {
    /// A [`crate::BodyHandle`]
    Body,
    /// A [`crate::FixtureHandle`]
    Fixture,
    /// A [`crate::JointHandle`]
    Joint,
    /// A [`crate::ContactHandle`]
    Contact,
}

impl core::fmt::Display for HandleKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Body => "body",
            Self::Fixture => "fixture",
            Self::Joint => "joint",
            Self::Contact => "contact",
        };
        f.write_str(name)
    }
}

/// Invalid definition detected at construction time.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A joint was asked to connect a body to itself.
    #[error("joint bodies must be distinct")]
    SameBody,
    /// A length that must be positive was zero, negative or not finite.
    #[error("degenerate length for {0}")]
    DegenerateLength(&'static str),
    /// A gear joint referenced something other than a revolute or prismatic joint.
    #[error("gear joints require revolute or prismatic sub-joints")]
    GearJointType,
    /// A dynamic body was required.
    #[error("{0} requires a dynamic body")]
    NonDynamicBody(&'static str),
    /// A polygon or chain had too few vertices.
    #[error("{shape} needs at least {min} vertices, got {got}")]
    TooFewVertices {
        /// Shape being built
        shape: &'static str,
        /// Minimum accepted count
        min: usize,
        /// Count that was supplied
        got: usize,
    },
    /// Polygon vertices collapsed to a line or point after welding.
    #[error("polygon is degenerate")]
    DegeneratePolygon,
    /// Chain vertices too close together.
    #[error("chain vertices are too close together")]
    InvalidChain,
    /// Any other out-of-range parameter.
    #[error("invalid parameter: {reason}")]
    InvalidParameter {
        /// Human-readable description of the problem
        reason: &'static str,
    },
}

/// Unified error type for physics operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PhysicsError {
    /// A structural mutation was attempted while the world is stepping.
    #[error("world is locked, {operation} rejected")]
    WorldLocked {
        /// Operation that was rejected
        operation: &'static str,
    },
    /// A handle no longer refers to a live object.
    #[error("stale or unknown {kind} handle")]
    InvalidHandle {
        /// Kind of object the handle referred to
        kind: HandleKind,
    },
    /// An invalid definition.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The joint is still referenced by a gear joint.
    #[error("joint is referenced by a gear joint and cannot be destroyed")]
    JointInUse,
    /// A capacity limit was exceeded.
    #[error("{resource} capacity exceeded (limit={limit})")]
    CapacityExceeded {
        /// What resource was exhausted
        resource: &'static str,
        /// The limit that was exceeded
        limit: usize,
    },
}

impl PhysicsError {
    /// Shorthand for an invalid body handle.
    #[inline]
    pub const fn body() -> Self {
        Self::InvalidHandle {
            kind: HandleKind::Body,
        }
    }

    /// Shorthand for an invalid fixture handle.
    #[inline]
    pub const fn fixture() -> Self {
        Self::InvalidHandle {
            kind: HandleKind::Fixture,
        }
    }

    /// Shorthand for an invalid joint handle.
    #[inline]
    pub const fn joint() -> Self {
        Self::InvalidHandle {
            kind: HandleKind::Joint,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = PhysicsError::WorldLocked {
            operation: "create_body",
        };
        let s = e.to_string();
        assert!(s.contains("locked"));
        assert!(s.contains("create_body"));
    }

    #[test]
    fn test_configuration_from() {
        let e: PhysicsError = ConfigurationError::SameBody.into();
        assert_eq!(e, PhysicsError::Configuration(ConfigurationError::SameBody));
        assert!(e.to_string().contains("distinct"));
    }

    #[test]
    fn test_handle_kind_display() {
        let e = PhysicsError::body();
        assert!(e.to_string().contains("body"));
        assert_ne!(PhysicsError::fixture(), PhysicsError::joint());
    }

    #[test]
    fn test_capacity_exceeded() {
        let e = PhysicsError::CapacityExceeded {
            resource: "polygon vertices",
            limit: 8,
        };
        let s = e.to_string();
        assert!(s.contains("polygon vertices"));
        assert!(s.contains('8'));
    }

    #[test]
    fn test_too_few_vertices_message() {
        let e = ConfigurationError::TooFewVertices {
            shape: "chain",
            min: 2,
            got: 1,
        };
        assert!(e.to_string().contains("at least 2"));
    }
}
