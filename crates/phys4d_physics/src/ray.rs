//! Ray queries

use phys4d_math::Vec4;
use slotmap::Key;

use crate::collider::ColliderKey;

/// A ray segment: `start + t * direction` for `t` in `[0, max_toi]`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub start: Vec4,
    /// Unit direction
    pub direction: Vec4,
    pub max_toi: f32,
}

impl Ray {
    /// Create a ray; the direction is normalized (a zero direction stays zero and never hits)
    pub fn new(start: Vec4, direction: Vec4, max_toi: f32) -> Self {
        Self {
            start,
            direction: direction.normalized(),
            max_toi,
        }
    }

    pub fn point_at(&self, toi: f32) -> Vec4 {
        self.start + self.direction * toi
    }
}

/// Result of a ray query
///
/// A miss is reported with a null collider key rather than an error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastHit {
    pub collider: ColliderKey,
    pub toi: f32,
    pub normal: Vec4,
    pub point: Vec4,
}

impl RaycastHit {
    pub fn miss() -> Self {
        Self {
            collider: ColliderKey::null(),
            toi: f32::INFINITY,
            normal: Vec4::ZERO,
            point: Vec4::ZERO,
        }
    }

    pub fn is_hit(&self) -> bool {
        !self.collider.is_null()
    }
}

impl Default for RaycastHit {
    fn default() -> Self {
        Self::miss()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_normalizes_direction() {
        let ray = Ray::new(Vec4::ZERO, Vec4::new(0.0, 0.0, 0.0, 4.0), 10.0);
        assert_eq!(ray.direction, Vec4::W);
        assert_eq!(ray.point_at(2.0), Vec4::new(0.0, 0.0, 0.0, 2.0));
    }

    #[test]
    fn test_miss_sentinel() {
        let hit = RaycastHit::default();
        assert!(!hit.is_hit());
        assert!(hit.collider.is_null());
    }
}
