//! Collision Filtering (Category/Mask/Group)
//!
//! Bitmask-based collision filtering for controlling which fixtures can
//! interact.
//!
//! # Usage
//!
//! ```
//! use alice_rigid2d::filter::{categories, Filter};
//!
//! let player = Filter::new(categories::PLAYER, categories::ENEMY | categories::STATIC);
//! let enemy = Filter::new(categories::ENEMY, categories::PLAYER | categories::STATIC);
//! assert!(Filter::should_collide(&player, &enemy));
//!
//! // ragdoll parts sharing a negative group never collide with each other
//! let limb = Filter::DEFAULT.with_group(-1);
//! assert!(!Filter::should_collide(&limb, &limb));
//! ```

/// Contact filtering data.
///
/// Two fixtures sharing a non-zero `group_index` always collide when the
/// group is positive and never collide when it is negative. Otherwise they
/// collide iff `(a.category & b.mask) != 0 && (b.category & a.mask) != 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Filter {
    /// Category bits this fixture belongs to
    pub category_bits: u16,
    /// Categories this fixture accepts collisions with
    pub mask_bits: u16,
    /// Group override (0 = none)
    pub group_index: i16,
}

impl Filter {
    /// Default filter: category 1, collides with everything
    pub const DEFAULT: Self = Self {
        category_bits: 0x0001,
        mask_bits: 0xFFFF,
        group_index: 0,
    };

    /// Filter that collides with nothing
    pub const NONE: Self = Self {
        category_bits: 0,
        mask_bits: 0,
        group_index: 0,
    };

    /// Create a new filter without a group
    #[inline]
    pub const fn new(category_bits: u16, mask_bits: u16) -> Self {
        Self {
            category_bits,
            mask_bits,
            group_index: 0,
        }
    }

    /// Set the collision group
    #[inline]
    pub const fn with_group(mut self, group_index: i16) -> Self {
        self.group_index = group_index;
        self
    }

    /// Default pair rule used when no contact filter is installed
    #[inline]
    pub fn should_collide(a: &Self, b: &Self) -> bool {
        if a.group_index == b.group_index && a.group_index != 0 {
            return a.group_index > 0;
        }
        (a.mask_bits & b.category_bits) != 0 && (a.category_bits & b.mask_bits) != 0
    }
}

impl Default for Filter {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Predefined categories for common game setups
pub mod categories {
    /// Default category
    pub const DEFAULT: u16 = 1 << 0;
    /// Static geometry
    pub const STATIC: u16 = 1 << 1;
    /// Kinematic bodies
    pub const KINEMATIC: u16 = 1 << 2;
    /// Player
    pub const PLAYER: u16 = 1 << 3;
    /// Enemy
    pub const ENEMY: u16 = 1 << 4;
    /// Projectile
    pub const PROJECTILE: u16 = 1 << 5;
    /// Sensor volumes
    pub const SENSOR: u16 = 1 << 6;
    /// Debris
    pub const DEBRIS: u16 = 1 << 7;
    /// All categories combined
    pub const ALL: u16 = u16::MAX;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert!(Filter::should_collide(&Filter::DEFAULT, &Filter::default()));
    }

    #[test]
    fn test_none_filter() {
        assert!(!Filter::should_collide(&Filter::NONE, &Filter::DEFAULT));
    }

    #[test]
    fn test_category_mask() {
        let player = Filter::new(categories::PLAYER, categories::ENEMY | categories::STATIC);
        let enemy = Filter::new(categories::ENEMY, categories::PLAYER | categories::STATIC);
        let wall = Filter::new(categories::STATIC, categories::ALL);
        let debris = Filter::new(categories::DEBRIS, categories::STATIC);

        assert!(Filter::should_collide(&player, &enemy));
        assert!(Filter::should_collide(&player, &wall));
        assert!(!Filter::should_collide(&player, &debris));
    }

    #[test]
    fn test_one_way_mask() {
        // a accepts b, but b accepts nothing
        let a = Filter::new(1 << 0, 1 << 1);
        let b = Filter::new(1 << 1, 0);
        assert!(!Filter::should_collide(&a, &b));
    }

    #[test]
    fn test_group_overrides_mask() {
        let pos_a = Filter::NONE.with_group(3);
        let pos_b = Filter::NONE.with_group(3);
        assert!(Filter::should_collide(&pos_a, &pos_b));

        let neg = Filter::DEFAULT.with_group(-2);
        assert!(!Filter::should_collide(&neg, &neg));

        // different groups fall back to the masks
        let other = Filter::DEFAULT.with_group(-5);
        assert!(Filter::should_collide(&neg, &other));
    }
}
