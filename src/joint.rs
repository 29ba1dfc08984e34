//! Joints
//!
//! Constraints between two bodies. Every variant follows the same
//! three-phase protocol per step:
//!
//! 1. `init_velocity_constraints`: cache masses and anchors, build the
//!    effective mass, warm start
//! 2. `solve_velocity_constraints`: one sequential-impulse iteration
//! 3. `solve_position_constraints`: one position correction pass, returning
//!    true once the error is within slop
//!
//! Variants live in their own modules; [`JointKind`] dispatches to them.

use slotmap::SlotMap;

use crate::body::{Body, BodyHandle, BodyType};
use crate::error::{ConfigurationError, PhysicsError};
use crate::joint_distance::{DistanceJoint, DistanceJointDef};
use crate::joint_friction::{FrictionJoint, FrictionJointDef};
use crate::joint_gear::{GearJoint, GearJointDef};
use crate::joint_motor::{MotorJoint, MotorJointDef};
use crate::joint_mouse::{MouseJoint, MouseJointDef};
use crate::joint_prismatic::{PrismaticJoint, PrismaticJointDef};
use crate::joint_pulley::{PulleyJoint, PulleyJointDef};
use crate::joint_revolute::{RevoluteJoint, RevoluteJointDef};
use crate::joint_weld::{WeldJoint, WeldJointDef};
use crate::joint_wheel::{WheelJoint, WheelJointDef};
use crate::math::Vec2;
use crate::settings::PI;
use crate::time_step::SolverData;

slotmap::new_key_type! {
    /// Generation-checked handle to a joint
    pub struct JointHandle;
}

/// Joint variant tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JointType {
    /// Keeps two anchors at a distance (or within a range)
    Distance,
    /// Shared anchor point, free relative rotation
    Revolute,
    /// Relative translation along an axis, no rotation
    Prismatic,
    /// Glues two bodies together
    Weld,
    /// Suspension axis plus free rotation
    Wheel,
    /// Two ropes over fixed ground pulleys
    Pulley,
    /// Couples two revolute/prismatic joints
    Gear,
    /// Drives relative position and angle towards a target
    Motor,
    /// Top-down friction
    Friction,
    /// Soft pull of a body point towards a target
    Mouse,
}

/// Limit state of a one-dimensional constraint
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LimitState {
    /// Limit disabled or not reached
    #[default]
    Inactive,
    /// At the lower limit
    AtLower,
    /// At the upper limit
    AtUpper,
    /// Lower and upper coincide
    Equal,
}

/// Mass data of a body cached by a joint for one solve.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SolverBody {
    pub index: usize,
    pub local_center: Vec2,
    pub inv_mass: f32,
    pub inv_i: f32,
}

impl SolverBody {
    #[inline]
    pub(crate) fn from_body(body: &Body) -> Self {
        Self {
            index: body.island_index,
            local_center: body.sweep.local_center,
            inv_mass: body.inv_mass,
            inv_i: body.inv_i,
        }
    }
}

/// Spring stiffness and damping for a linear soft constraint from a
/// frequency and damping ratio, using the reduced mass of the two bodies.
#[must_use]
pub fn linear_stiffness(frequency_hz: f32, damping_ratio: f32, body_a: &Body, body_b: &Body) -> (f32, f32) {
    let mass_a = body_a.mass();
    let mass_b = body_b.mass();
    let mass = if mass_a > 0.0 && mass_b > 0.0 {
        mass_a * mass_b / (mass_a + mass_b)
    } else if mass_a > 0.0 {
        mass_a
    } else {
        mass_b
    };

    let omega = 2.0 * PI * frequency_hz;
    (mass * omega * omega, 2.0 * mass * damping_ratio * omega)
}

/// Angular counterpart of [`linear_stiffness`], using the reduced inertia.
#[must_use]
pub fn angular_stiffness(frequency_hz: f32, damping_ratio: f32, body_a: &Body, body_b: &Body) -> (f32, f32) {
    let i_a = body_a.inertia();
    let i_b = body_b.inertia();
    let inertia = if i_a > 0.0 && i_b > 0.0 {
        i_a * i_b / (i_a + i_b)
    } else if i_a > 0.0 {
        i_a
    } else {
        i_b
    };

    let omega = 2.0 * PI * frequency_hz;
    (inertia * omega * omega, 2.0 * inertia * damping_ratio * omega)
}

/// `gamma` and `bias` of a soft constraint for one step of length `h`.
#[inline]
pub(crate) fn soft_constraint(c: f32, stiffness: f32, damping: f32, h: f32) -> (f32, f32) {
    let gamma = h * (damping + h * stiffness);
    let gamma = if gamma != 0.0 { 1.0 / gamma } else { 0.0 };
    (gamma, c * h * stiffness * gamma)
}

pub(crate) fn ensure_non_negative(value: f32, reason: &'static str) -> Result<(), PhysicsError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidParameter { reason }.into())
    }
}

// ============================================================================
// Definitions
// ============================================================================

/// Joint construction parameters, one variant per joint type.
#[derive(Clone, Debug, PartialEq)]
pub enum JointDef {
    /// Distance joint
    Distance(DistanceJointDef),
    /// Revolute joint
    Revolute(RevoluteJointDef),
    /// Prismatic joint
    Prismatic(PrismaticJointDef),
    /// Weld joint
    Weld(WeldJointDef),
    /// Wheel joint
    Wheel(WheelJointDef),
    /// Pulley joint
    Pulley(PulleyJointDef),
    /// Gear joint
    Gear(GearJointDef),
    /// Motor joint
    Motor(MotorJointDef),
    /// Friction joint
    Friction(FrictionJointDef),
    /// Mouse joint
    Mouse(MouseJointDef),
}

macro_rules! joint_def_from {
    ($($variant:ident => $def:ty),* $(,)?) => {
        $(
            impl From<$def> for JointDef {
                fn from(def: $def) -> Self {
                    JointDef::$variant(def)
                }
            }
        )*
    };
}

joint_def_from!(
    Distance => DistanceJointDef,
    Revolute => RevoluteJointDef,
    Prismatic => PrismaticJointDef,
    Weld => WeldJointDef,
    Wheel => WheelJointDef,
    Pulley => PulleyJointDef,
    Gear => GearJointDef,
    Motor => MotorJointDef,
    Friction => FrictionJointDef,
    Mouse => MouseJointDef,
);

impl JointDef {
    /// Variant tag
    #[must_use]
    pub fn joint_type(&self) -> JointType {
        match self {
            Self::Distance(_) => JointType::Distance,
            Self::Revolute(_) => JointType::Revolute,
            Self::Prismatic(_) => JointType::Prismatic,
            Self::Weld(_) => JointType::Weld,
            Self::Wheel(_) => JointType::Wheel,
            Self::Pulley(_) => JointType::Pulley,
            Self::Gear(_) => JointType::Gear,
            Self::Motor(_) => JointType::Motor,
            Self::Friction(_) => JointType::Friction,
            Self::Mouse(_) => JointType::Mouse,
        }
    }

    /// Contacts between the two bodies are kept
    #[must_use]
    pub fn collide_connected(&self) -> bool {
        match self {
            Self::Distance(d) => d.collide_connected,
            Self::Revolute(d) => d.collide_connected,
            Self::Prismatic(d) => d.collide_connected,
            Self::Weld(d) => d.collide_connected,
            Self::Wheel(d) => d.collide_connected,
            Self::Pulley(d) => d.collide_connected,
            Self::Gear(d) => d.collide_connected,
            Self::Motor(d) => d.collide_connected,
            Self::Friction(d) => d.collide_connected,
            Self::Mouse(d) => d.collide_connected,
        }
    }

    /// Application data
    #[must_use]
    pub fn user_data(&self) -> u64 {
        match self {
            Self::Distance(d) => d.user_data,
            Self::Revolute(d) => d.user_data,
            Self::Prismatic(d) => d.user_data,
            Self::Weld(d) => d.user_data,
            Self::Wheel(d) => d.user_data,
            Self::Pulley(d) => d.user_data,
            Self::Gear(d) => d.user_data,
            Self::Motor(d) => d.user_data,
            Self::Friction(d) => d.user_data,
            Self::Mouse(d) => d.user_data,
        }
    }
}

// ============================================================================
// Joint
// ============================================================================

/// Joint variant state.
#[derive(Clone, Debug)]
pub enum JointKind {
    /// Distance joint
    Distance(DistanceJoint),
    /// Revolute joint
    Revolute(RevoluteJoint),
    /// Prismatic joint
    Prismatic(PrismaticJoint),
    /// Weld joint
    Weld(WeldJoint),
    /// Wheel joint
    Wheel(WheelJoint),
    /// Pulley joint
    Pulley(PulleyJoint),
    /// Gear joint
    Gear(GearJoint),
    /// Motor joint
    Motor(MotorJoint),
    /// Friction joint
    Friction(FrictionJoint),
    /// Mouse joint
    Mouse(MouseJoint),
}

/// A constraint between two bodies.
#[derive(Clone, Debug)]
pub struct Joint {
    pub(crate) handle: JointHandle,
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) collide_connected: bool,
    pub(crate) island: bool,
    pub(crate) user_data: u64,
    pub(crate) kind: JointKind,
}

fn body_ref(bodies: &SlotMap<BodyHandle, Body>, handle: BodyHandle) -> Result<&Body, PhysicsError> {
    bodies.get(handle).ok_or(PhysicsError::body())
}

fn distinct(a: BodyHandle, b: BodyHandle) -> Result<(), PhysicsError> {
    if a == b {
        return Err(ConfigurationError::SameBody.into());
    }
    Ok(())
}

impl Joint {
    /// Validate `def` and build the joint.
    pub(crate) fn new(
        handle: JointHandle,
        def: &JointDef,
        bodies: &SlotMap<BodyHandle, Body>,
        joints: &SlotMap<JointHandle, Joint>,
    ) -> Result<Self, PhysicsError> {
        let (body_a, body_b, kind) = match def {
            JointDef::Distance(d) => {
                distinct(d.body_a, d.body_b)?;
                (d.body_a, d.body_b, JointKind::Distance(DistanceJoint::new(d)?))
            }
            JointDef::Revolute(d) => {
                distinct(d.body_a, d.body_b)?;
                (d.body_a, d.body_b, JointKind::Revolute(RevoluteJoint::new(d)?))
            }
            JointDef::Prismatic(d) => {
                distinct(d.body_a, d.body_b)?;
                (d.body_a, d.body_b, JointKind::Prismatic(PrismaticJoint::new(d)?))
            }
            JointDef::Weld(d) => {
                distinct(d.body_a, d.body_b)?;
                (d.body_a, d.body_b, JointKind::Weld(WeldJoint::new(d)))
            }
            JointDef::Wheel(d) => {
                distinct(d.body_a, d.body_b)?;
                (d.body_a, d.body_b, JointKind::Wheel(WheelJoint::new(d)?))
            }
            JointDef::Pulley(d) => {
                distinct(d.body_a, d.body_b)?;
                (d.body_a, d.body_b, JointKind::Pulley(PulleyJoint::new(d)?))
            }
            JointDef::Gear(d) => {
                let gear = GearJoint::new(d, bodies, joints)?;
                let (a, b) = (gear.body_a(), gear.body_b());
                distinct(a, b)?;
                (a, b, JointKind::Gear(gear))
            }
            JointDef::Motor(d) => {
                distinct(d.body_a, d.body_b)?;
                (d.body_a, d.body_b, JointKind::Motor(MotorJoint::new(d)?))
            }
            JointDef::Friction(d) => {
                distinct(d.body_a, d.body_b)?;
                (d.body_a, d.body_b, JointKind::Friction(FrictionJoint::new(d)?))
            }
            JointDef::Mouse(d) => {
                distinct(d.body_a, d.body_b)?;
                if body_ref(bodies, d.body_b)?.body_type() != BodyType::Dynamic {
                    return Err(ConfigurationError::NonDynamicBody("mouse joint body B").into());
                }
                (d.body_a, d.body_b, JointKind::Mouse(MouseJoint::new(d, body_ref(bodies, d.body_b)?)?))
            }
        };

        body_ref(bodies, body_a)?;
        body_ref(bodies, body_b)?;

        Ok(Self {
            handle,
            body_a,
            body_b,
            collide_connected: def.collide_connected(),
            island: false,
            user_data: def.user_data(),
            kind,
        })
    }

    /// This joint's handle
    #[inline]
    #[must_use]
    pub fn handle(&self) -> JointHandle {
        self.handle
    }

    /// Variant tag
    #[must_use]
    pub fn joint_type(&self) -> JointType {
        match &self.kind {
            JointKind::Distance(_) => JointType::Distance,
            JointKind::Revolute(_) => JointType::Revolute,
            JointKind::Prismatic(_) => JointType::Prismatic,
            JointKind::Weld(_) => JointType::Weld,
            JointKind::Wheel(_) => JointType::Wheel,
            JointKind::Pulley(_) => JointType::Pulley,
            JointKind::Gear(_) => JointType::Gear,
            JointKind::Motor(_) => JointType::Motor,
            JointKind::Friction(_) => JointType::Friction,
            JointKind::Mouse(_) => JointType::Mouse,
        }
    }

    /// First body
    #[inline]
    #[must_use]
    pub fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    /// Second body
    #[inline]
    #[must_use]
    pub fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    /// Contacts between the two bodies are kept
    #[inline]
    #[must_use]
    pub fn collide_connected(&self) -> bool {
        self.collide_connected
    }

    /// Application data
    #[inline]
    #[must_use]
    pub fn user_data(&self) -> u64 {
        self.user_data
    }

    /// Set application data
    #[inline]
    pub fn set_user_data(&mut self, user_data: u64) {
        self.user_data = user_data;
    }

    /// Variant state
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &JointKind {
        &self.kind
    }

    /// Mutable variant state
    #[inline]
    pub fn kind_mut(&mut self) -> &mut JointKind {
        &mut self.kind
    }

    /// Anchor on body A in world coordinates
    #[must_use]
    pub fn anchor_a(&self, body_a: &Body) -> Vec2 {
        match &self.kind {
            JointKind::Distance(j) => j.anchor_a(body_a),
            JointKind::Revolute(j) => j.anchor_a(body_a),
            JointKind::Prismatic(j) => j.anchor_a(body_a),
            JointKind::Weld(j) => j.anchor_a(body_a),
            JointKind::Wheel(j) => j.anchor_a(body_a),
            JointKind::Pulley(j) => j.anchor_a(body_a),
            JointKind::Gear(j) => j.anchor_a(body_a),
            JointKind::Motor(_) => body_a.position(),
            JointKind::Friction(j) => j.anchor_a(body_a),
            JointKind::Mouse(j) => j.target(),
        }
    }

    /// Anchor on body B in world coordinates
    #[must_use]
    pub fn anchor_b(&self, body_b: &Body) -> Vec2 {
        match &self.kind {
            JointKind::Distance(j) => j.anchor_b(body_b),
            JointKind::Revolute(j) => j.anchor_b(body_b),
            JointKind::Prismatic(j) => j.anchor_b(body_b),
            JointKind::Weld(j) => j.anchor_b(body_b),
            JointKind::Wheel(j) => j.anchor_b(body_b),
            JointKind::Pulley(j) => j.anchor_b(body_b),
            JointKind::Gear(j) => j.anchor_b(body_b),
            JointKind::Motor(_) => body_b.position(),
            JointKind::Friction(j) => j.anchor_b(body_b),
            JointKind::Mouse(j) => j.anchor_b(body_b),
        }
    }

    /// Reaction force on body B at the joint anchor
    #[must_use]
    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        match &self.kind {
            JointKind::Distance(j) => j.reaction_force(inv_dt),
            JointKind::Revolute(j) => j.reaction_force(inv_dt),
            JointKind::Prismatic(j) => j.reaction_force(inv_dt),
            JointKind::Weld(j) => j.reaction_force(inv_dt),
            JointKind::Wheel(j) => j.reaction_force(inv_dt),
            JointKind::Pulley(j) => j.reaction_force(inv_dt),
            JointKind::Gear(j) => j.reaction_force(inv_dt),
            JointKind::Motor(j) => j.reaction_force(inv_dt),
            JointKind::Friction(j) => j.reaction_force(inv_dt),
            JointKind::Mouse(j) => j.reaction_force(inv_dt),
        }
    }

    /// Reaction torque on body B
    #[must_use]
    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        match &self.kind {
            JointKind::Distance(_) | JointKind::Pulley(_) | JointKind::Mouse(_) => 0.0,
            JointKind::Revolute(j) => j.reaction_torque(inv_dt),
            JointKind::Prismatic(j) => j.reaction_torque(inv_dt),
            JointKind::Weld(j) => j.reaction_torque(inv_dt),
            JointKind::Wheel(j) => j.reaction_torque(inv_dt),
            JointKind::Gear(j) => j.reaction_torque(inv_dt),
            JointKind::Motor(j) => j.reaction_torque(inv_dt),
            JointKind::Friction(j) => j.reaction_torque(inv_dt),
        }
    }

    /// Whether both bodies are enabled
    #[must_use]
    pub(crate) fn is_enabled(&self, bodies: &SlotMap<BodyHandle, Body>) -> bool {
        let enabled = |h: BodyHandle| bodies.get(h).is_some_and(Body::is_enabled);
        let ground_sides = match &self.kind {
            // sub-joint ground bodies must share the island
            JointKind::Gear(j) => enabled(j.body_c()) && enabled(j.body_d()),
            _ => true,
        };
        enabled(self.body_a) && enabled(self.body_b) && ground_sides
    }

    /// Shift world-space state (targets, ground anchors)
    pub(crate) fn shift_origin(&mut self, new_origin: Vec2) {
        match &mut self.kind {
            JointKind::Mouse(j) => j.shift_origin(new_origin),
            JointKind::Pulley(j) => j.shift_origin(new_origin),
            _ => {}
        }
    }

    // ========== Solver dispatch ==========

    pub(crate) fn init_velocity_constraints(&mut self, bodies: &SlotMap<BodyHandle, Body>, data: &mut SolverData<'_>) {
        let (Some(a), Some(b)) = (bodies.get(self.body_a), bodies.get(self.body_b)) else {
            return;
        };
        match &mut self.kind {
            JointKind::Distance(j) => j.init_velocity_constraints(a, b, data),
            JointKind::Revolute(j) => j.init_velocity_constraints(a, b, data),
            JointKind::Prismatic(j) => j.init_velocity_constraints(a, b, data),
            JointKind::Weld(j) => j.init_velocity_constraints(a, b, data),
            JointKind::Wheel(j) => j.init_velocity_constraints(a, b, data),
            JointKind::Pulley(j) => j.init_velocity_constraints(a, b, data),
            JointKind::Gear(j) => {
                let (Some(c), Some(d)) = (bodies.get(j.body_c()), bodies.get(j.body_d())) else {
                    return;
                };
                j.init_velocity_constraints(a, b, c, d, data);
            }
            JointKind::Motor(j) => j.init_velocity_constraints(a, b, data),
            JointKind::Friction(j) => j.init_velocity_constraints(a, b, data),
            JointKind::Mouse(j) => j.init_velocity_constraints(a, b, data),
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        match &mut self.kind {
            JointKind::Distance(j) => j.solve_velocity_constraints(data),
            JointKind::Revolute(j) => j.solve_velocity_constraints(data),
            JointKind::Prismatic(j) => j.solve_velocity_constraints(data),
            JointKind::Weld(j) => j.solve_velocity_constraints(data),
            JointKind::Wheel(j) => j.solve_velocity_constraints(data),
            JointKind::Pulley(j) => j.solve_velocity_constraints(data),
            JointKind::Gear(j) => j.solve_velocity_constraints(data),
            JointKind::Motor(j) => j.solve_velocity_constraints(data),
            JointKind::Friction(j) => j.solve_velocity_constraints(data),
            JointKind::Mouse(j) => j.solve_velocity_constraints(data),
        }
    }

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData<'_>) -> bool {
        match &mut self.kind {
            JointKind::Distance(j) => j.solve_position_constraints(data),
            JointKind::Revolute(j) => j.solve_position_constraints(data),
            JointKind::Prismatic(j) => j.solve_position_constraints(data),
            JointKind::Weld(j) => j.solve_position_constraints(data),
            JointKind::Wheel(j) => j.solve_position_constraints(data),
            JointKind::Pulley(j) => j.solve_position_constraints(data),
            JointKind::Gear(j) => j.solve_position_constraints(data),
            JointKind::Motor(_) | JointKind::Friction(_) | JointKind::Mouse(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyDef;
    use crate::shape::MassData;

    fn dynamic_body(mass: f32, inertia: f32) -> Body {
        let mut body = Body::new(&BodyDef::dynamic(Vec2::ZERO));
        body.apply_mass_data(&MassData {
            mass,
            center: Vec2::ZERO,
            inertia,
        });
        body
    }

    #[test]
    fn test_linear_stiffness_uses_reduced_mass() {
        let a = dynamic_body(2.0, 1.0);
        let b = dynamic_body(2.0, 1.0);
        let (k, d) = linear_stiffness(1.0, 0.5, &a, &b);
        let omega = 2.0 * PI;
        assert!((k - omega * omega).abs() < 1e-4);
        assert!((d - omega).abs() < 1e-4);

        let ground = Body::new(&BodyDef::default());
        let (k2, _) = linear_stiffness(1.0, 0.0, &ground, &b);
        assert!((k2 - 2.0 * omega * omega).abs() < 1e-3);
    }

    #[test]
    fn test_angular_stiffness_single_body() {
        let ground = Body::new(&BodyDef::default());
        let b = dynamic_body(1.0, 3.0);
        let (k, d) = angular_stiffness(2.0, 1.0, &ground, &b);
        let omega = 4.0 * PI;
        assert!((k - 3.0 * omega * omega).abs() < 1e-2);
        assert!((d - 6.0 * omega).abs() < 1e-3);
    }

    #[test]
    fn test_soft_constraint_zero_parameters() {
        assert_eq!(soft_constraint(1.0, 0.0, 0.0, 1.0 / 60.0), (0.0, 0.0));
        let (gamma, bias) = soft_constraint(0.5, 100.0, 1.0, 0.1);
        assert!(gamma > 0.0 && bias > 0.0);
    }

    #[test]
    fn test_joint_def_from() {
        let def: JointDef = RevoluteJointDef::default().into();
        assert_eq!(def.joint_type(), JointType::Revolute);
        assert!(!def.collide_connected());
    }
}
