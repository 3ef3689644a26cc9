//! Application systems
//!
//! Host-side systems that drive the physics world.

mod simulation;

pub use simulation::{SimulationStats, SimulationSystem};
