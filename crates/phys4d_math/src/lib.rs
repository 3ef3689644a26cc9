//! 4D Mathematics Library
//!
//! Linear algebra used by the phys4d rigid-body engine.
//!
//! ## Core Types
//!
//! - [`Vec4`] - 4D vector with x, y, z, w components
//! - [`Bivec4`] - 6-component bivector (one component per rotation plane),
//!   used for angular velocity, torque and angular impulse
//! - [`Mat4`] - 4x4 column-major matrix, used for orthonormal rotations
//! - [`Mat6`] - 6x6 matrix acting on bivectors, used for inertia tensors
//! - [`Bounds4`] - axis-aligned bounding hyper-box
//! - [`Transform4`] - rigid transform (position + rotation)

mod vec4;
mod bivec4;
pub mod mat4;
mod mat6;
mod bounds;
mod transform;

pub use vec4::Vec4;
pub use bivec4::{Bivec4, RotationPlane};
pub use mat4::Mat4;
pub use mat6::{point_second_moment, Mat6};
pub use bounds::Bounds4;
pub use transform::Transform4;
