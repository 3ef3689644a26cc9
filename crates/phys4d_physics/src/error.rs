//! Physics error types
//!
//! Errors returned by fallible world operations. Numerically degenerate
//! geometry and simulation instability are never errors: they are handled
//! by fallback branches inside the step.

use std::fmt;

use crate::body::BodyKey;
use crate::collider::ColliderKey;

/// Error type for physics world operations
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// The body key does not refer to a live body
    BodyNotFound(BodyKey),
    /// The collider key does not refer to a live collider
    ColliderNotFound(ColliderKey),
    /// The collider exists but is attached to a different body
    ColliderNotOwned {
        collider: ColliderKey,
        body: BodyKey,
    },
    /// No collider ids are left in the configured id space
    ColliderCapacityExhausted { limit: usize },
    /// Shape dimensions or material values are non-finite or out of range
    InvalidShape(String),
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicsError::BodyNotFound(key) => write!(f, "Body not found: {:?}", key),
            PhysicsError::ColliderNotFound(key) => write!(f, "Collider not found: {:?}", key),
            PhysicsError::ColliderNotOwned { collider, body } => {
                write!(f, "Collider {:?} is not attached to body {:?}", collider, body)
            }
            PhysicsError::ColliderCapacityExhausted { limit } => {
                write!(f, "Collider capacity exhausted (limit {})", limit)
            }
            PhysicsError::InvalidShape(msg) => write!(f, "Invalid shape: {}", msg),
        }
    }
}

impl std::error::Error for PhysicsError {}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::Key;

    #[test]
    fn test_capacity_display() {
        let err = PhysicsError::ColliderCapacityExhausted { limit: 8 };
        let msg = format!("{}", err);
        assert!(msg.contains("capacity"));
        assert!(msg.contains('8'));
    }

    #[test]
    fn test_invalid_shape_display() {
        let err = PhysicsError::InvalidShape("radius must be positive".to_string());
        assert!(format!("{}", err).contains("radius must be positive"));
    }

    #[test]
    fn test_not_found_display() {
        let err = PhysicsError::BodyNotFound(BodyKey::null());
        assert!(format!("{}", err).starts_with("Body not found"));
        let err = PhysicsError::ColliderNotFound(ColliderKey::null());
        assert!(format!("{}", err).starts_with("Collider not found"));
    }

    #[test]
    fn test_is_std_error() {
        fn takes_error(_: &dyn std::error::Error) {}
        takes_error(&PhysicsError::InvalidShape(String::new()));
    }
}
