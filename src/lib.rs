//! phys4d - 4D rigid-body physics
//!
//! Host-side pieces around the physics crates: layered configuration,
//! scene construction and a fixed-timestep runner.

pub mod config;
pub mod scene;
pub mod systems;

pub use phys4d_math as math;
pub use phys4d_physics as physics;
