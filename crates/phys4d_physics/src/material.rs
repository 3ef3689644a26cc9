//! Physical material properties for colliders

use serde::{Deserialize, Serialize};

/// Physical material properties of a collider
///
/// Density drives mass computation; friction and restitution are mixed
/// per contact pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicsMaterial {
    /// Mass per unit hyper-volume
    pub density: f32,
    /// Friction coefficient (0.0 = ice, 1.0 = rubber)
    pub friction: f32,
    /// Restitution/bounciness (0.0 = no bounce, 1.0 = perfect bounce)
    pub restitution: f32,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self {
            density: 1.0,
            friction: 0.4,
            restitution: 0.2,
        }
    }
}

impl PhysicsMaterial {
    /// Ice-like material: very low friction, slight bounce
    pub const ICE: Self = Self {
        density: 0.9,
        friction: 0.05,
        restitution: 0.1,
    };

    /// Rubber-like material: high friction, very bouncy
    pub const RUBBER: Self = Self {
        density: 1.1,
        friction: 0.9,
        restitution: 0.8,
    };

    /// Metal-like material: dense, moderate friction and bounce
    pub const METAL: Self = Self {
        density: 7.8,
        friction: 0.3,
        restitution: 0.3,
    };

    /// Frictionless and perfectly elastic
    pub const ELASTIC: Self = Self {
        density: 1.0,
        friction: 0.0,
        restitution: 1.0,
    };

    /// Create a new material
    ///
    /// Values are stored as given. Attaching a collider rejects negative or
    /// non-finite values with [`PhysicsError::InvalidShape`].
    ///
    /// [`PhysicsError::InvalidShape`]: crate::PhysicsError::InvalidShape
    pub fn new(density: f32, friction: f32, restitution: f32) -> Self {
        Self {
            density,
            friction,
            restitution,
        }
    }

    /// Mixed friction for a contact pair (geometric mean)
    pub fn mix_friction(a: f32, b: f32) -> f32 {
        (a * b).sqrt()
    }

    /// Mixed restitution for a contact pair (bounciest surface wins)
    pub fn mix_restitution(a: f32, b: f32) -> f32 {
        a.max(b)
    }
}
