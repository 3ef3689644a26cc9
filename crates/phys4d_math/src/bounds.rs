//! Axis-aligned bounding hyper-boxes

use serde::{Deserialize, Serialize};

use crate::Vec4;

/// 4D axis-aligned bounding box
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds4 {
    /// Minimum corner (all components are minimums)
    pub min: Vec4,
    /// Maximum corner (all components are maximums)
    pub max: Vec4,
}

impl Bounds4 {
    /// Create a new box from min and max corners
    pub fn new(min: Vec4, max: Vec4) -> Self {
        Self { min, max }
    }

    /// Create a box centered at a position with given half-extents
    pub fn from_center_half_extents(center: Vec4, half_extents: Vec4) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn center(&self) -> Vec4 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec4 {
        (self.max - self.min) * 0.5
    }

    /// Smallest box enclosing both
    pub fn union(&self, other: &Bounds4) -> Bounds4 {
        Bounds4 {
            min: self.min.min_components(other.min),
            max: self.max.max_components(other.max),
        }
    }

    /// Grow every face outward by `margin`
    pub fn fattened(&self, margin: f32) -> Bounds4 {
        let m = Vec4::splat(margin);
        Bounds4 {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// True when the boxes intersect; touching faces count as overlap
    pub fn overlaps(&self, other: &Bounds4) -> bool {
        (0..4).all(|i| self.min[i] <= other.max[i] && other.min[i] <= self.max[i])
    }

    /// True when `other` lies entirely inside this box
    pub fn contains(&self, other: &Bounds4) -> bool {
        (0..4).all(|i| self.min[i] <= other.min[i] && other.max[i] <= self.max[i])
    }

    /// Check if a point is inside or on the box
    pub fn contains_point(&self, point: Vec4) -> bool {
        (0..4).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }

    /// Get the closest point inside or on the box to a given point
    pub fn closest_point(&self, point: Vec4) -> Vec4 {
        point.clamp_components(self.min, self.max)
    }

    /// Manhattan distance between centers (scaled by 2).
    ///
    /// Cheap closeness metric used when descending the dynamic tree.
    pub fn proximity(&self, other: &Bounds4) -> f32 {
        let d = (self.min + self.max) - (other.min + other.max);
        d.abs().sum()
    }

    /// Sum of the edge lengths, a 4D analogue of surface area
    pub fn perimeter(&self) -> f32 {
        (self.max - self.min).sum()
    }

    /// Slab test against a segment `start + t * dir` for `t` in `[0, max_t]`.
    ///
    /// Returns the entry parameter. A start point inside the box returns 0.
    pub fn ray_intersect(&self, start: Vec4, dir: Vec4, max_t: f32) -> Option<f32> {
        let mut t_min = 0.0f32;
        let mut t_max = max_t;
        for i in 0..4 {
            if dir[i].abs() < 1e-12 {
                if start[i] < self.min[i] || start[i] > self.max[i] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir[i];
            let mut t1 = (self.min[i] - start[i]) * inv;
            let mut t2 = (self.max[i] - start[i]) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_at(c: Vec4) -> Bounds4 {
        Bounds4::from_center_half_extents(c, Vec4::splat(0.5))
    }

    #[test]
    fn test_overlaps() {
        let a = unit_at(Vec4::ZERO);
        assert!(a.overlaps(&unit_at(Vec4::new(0.9, 0.0, 0.0, 0.0))));
        // touching counts
        assert!(a.overlaps(&unit_at(Vec4::new(0.0, 0.0, 0.0, 1.0))));
        // separated only along w
        assert!(!a.overlaps(&unit_at(Vec4::new(0.0, 0.0, 0.0, 1.1))));
    }

    #[test]
    fn test_union_contains() {
        let a = unit_at(Vec4::ZERO);
        let b = unit_at(Vec4::new(3.0, -1.0, 0.0, 2.0));
        let u = a.union(&b);
        assert!(u.contains(&a));
        assert!(u.contains(&b));
        assert!(!a.contains(&u));
    }

    #[test]
    fn test_fattened() {
        let a = unit_at(Vec4::ZERO).fattened(0.2);
        assert_eq!(a.half_extents(), Vec4::splat(0.7));
    }

    #[test]
    fn test_ray_intersect() {
        let b = unit_at(Vec4::ZERO);
        let t = b.ray_intersect(Vec4::new(0.0, 5.0, 0.0, 0.0), -Vec4::Y, 10.0);
        assert_eq!(t, Some(4.5));
        // too short
        assert_eq!(b.ray_intersect(Vec4::new(0.0, 5.0, 0.0, 0.0), -Vec4::Y, 4.0), None);
        // parallel and outside
        assert_eq!(b.ray_intersect(Vec4::new(0.0, 0.0, 0.0, 2.0), Vec4::X, 10.0), None);
    }

    #[test]
    fn test_proximity() {
        let a = unit_at(Vec4::ZERO);
        let b = unit_at(Vec4::new(1.0, -1.0, 0.0, 0.5));
        assert!((a.proximity(&b) - 5.0).abs() < 1e-6);
    }
}
