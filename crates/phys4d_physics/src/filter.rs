//! Collision layers
//!
//! Every body belongs to one or more layers. Two bodies may only collide
//! when their layer sets share at least one bit.

use bitflags::bitflags;

bitflags! {
    /// Collision layers for filtering which bodies can collide
    ///
    /// Each layer is a bit in a 32-bit mask.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CollisionLayer: u32 {
        /// Default layer for most bodies
        const DEFAULT = 1 << 0;
        /// Static world geometry (floors, walls)
        const STATIC = 1 << 1;
        /// Small debris that should only hit the world
        const DEBRIS = 1 << 2;
        /// Trigger volumes
        const TRIGGER = 1 << 3;
        /// All layers
        const ALL = 0xFFFFFFFF;
    }
}

impl Default for CollisionLayer {
    fn default() -> Self {
        CollisionLayer::ALL
    }
}

impl CollisionLayer {
    /// True when the two layer sets share a bit
    #[inline]
    pub fn shares_layer(self, other: CollisionLayer) -> bool {
        self.intersects(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_collides_with_everything() {
        let d = CollisionLayer::default();
        assert!(d.shares_layer(CollisionLayer::DEBRIS));
        assert!(d.shares_layer(CollisionLayer::STATIC));
    }

    #[test]
    fn test_disjoint_layers() {
        assert!(!CollisionLayer::DEBRIS.shares_layer(CollisionLayer::TRIGGER));
        let world_and_debris = CollisionLayer::STATIC | CollisionLayer::DEBRIS;
        assert!(world_and_debris.shares_layer(CollisionLayer::DEBRIS));
        assert!(CollisionLayer::empty().is_empty());
        assert!(!CollisionLayer::empty().shares_layer(CollisionLayer::ALL));
    }
}
