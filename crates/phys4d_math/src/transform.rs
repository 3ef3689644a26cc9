//! 4D rigid transform (position and rotation)
//!
//! A Transform4 places a body or collider in 4D space. Unlike a render
//! transform it carries no scale: rigid bodies never deform.

use serde::{Deserialize, Serialize};

use crate::mat4::{self, Mat4};
use crate::Vec4;

/// A 4D transform with position and orthonormal rotation
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform4 {
    /// Position in 4D space
    pub position: Vec4,
    /// Rotation matrix (column-major, columns are the local axes)
    pub rotation: Mat4,
}

impl Default for Transform4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform4 {
    pub const IDENTITY: Self = Self {
        position: Vec4::ZERO,
        rotation: mat4::IDENTITY,
    };

    pub fn new(position: Vec4, rotation: Mat4) -> Self {
        Self { position, rotation }
    }

    /// Create a transform with just a position
    pub fn from_position(position: Vec4) -> Self {
        Self {
            position,
            rotation: mat4::IDENTITY,
        }
    }

    /// Transform a point from local space to world space
    #[inline]
    pub fn transform_point(&self, p: Vec4) -> Vec4 {
        mat4::transform(self.rotation, p) + self.position
    }

    /// Transform a direction from local space to world space
    #[inline]
    pub fn transform_direction(&self, d: Vec4) -> Vec4 {
        mat4::transform(self.rotation, d)
    }

    /// Transform a point from world space to local space
    #[inline]
    pub fn inverse_transform_point(&self, p: Vec4) -> Vec4 {
        mat4::transform_transposed(self.rotation, p - self.position)
    }

    /// Transform a direction from world space to local space
    #[inline]
    pub fn inverse_transform_direction(&self, d: Vec4) -> Vec4 {
        mat4::transform_transposed(self.rotation, d)
    }

    /// Local axis `i` expressed in world space
    #[inline]
    pub fn axis(&self, i: usize) -> Vec4 {
        mat4::get_column(self.rotation, i)
    }

    pub fn inverse(&self) -> Self {
        let rotation = mat4::transpose(self.rotation);
        Self {
            position: -mat4::transform(rotation, self.position),
            rotation,
        }
    }

    /// Compose: apply `local` first, then `self`
    pub fn compose(&self, local: &Transform4) -> Self {
        Self {
            position: self.transform_point(local.position),
            rotation: mat4::mul(self.rotation, local.rotation),
        }
    }
}
