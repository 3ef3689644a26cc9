//! Simulation tuning parameters

use phys4d_math::Vec4;
use serde::{Deserialize, Serialize};

/// Configuration for the physics simulation
///
/// Every field has a default, so partial TOML sections deserialize cleanly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity acceleration (world space)
    pub gravity: Vec4,
    /// Velocity solver passes per step
    pub iterations: u32,
    /// Upper bound on the step delta; longer frames are clamped
    pub max_time_step: f32,
    pub enable_friction: bool,
    pub allow_sleep: bool,
    /// Fraction of penetration corrected per second (scaled by 1/dt)
    pub baumgarte: f32,
    /// Penetration tolerated without positional correction
    pub penetration_slop: f32,
    /// Closing speed below which restitution is ignored
    pub restitution_threshold: f32,
    /// Squared linear speed below which a body may sleep
    pub sleep_linear: f32,
    /// Squared angular speed below which a body may sleep
    pub sleep_angular: f32,
    /// Seconds an island must stay slow before it sleeps
    pub sleep_time: f32,
    /// Fattening margin for broadphase AABBs
    pub aabb_margin: f32,
    /// Half-extent of the valid simulation region along every axis
    pub world_extent: f32,
    /// Maximum number of live colliders
    pub max_colliders: usize,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec4::new(0.0, -9.8, 0.0, 0.0),
            iterations: 20,
            max_time_step: 0.05,
            enable_friction: true,
            allow_sleep: true,
            baumgarte: 0.2,
            penetration_slop: 0.05,
            restitution_threshold: 1.0,
            sleep_linear: 0.01,
            sleep_angular: (3.0f32 / 180.0 * std::f32::consts::PI).powi(2),
            sleep_time: 0.5,
            aabb_margin: 0.2,
            world_extent: 1.0e4,
            max_colliders: 1 << 20,
        }
    }
}

impl PhysicsConfig {
    /// Create a config with the given gravity and default tuning
    pub fn new(gravity: Vec4) -> Self {
        Self {
            gravity,
            ..Self::default()
        }
    }

    /// Config with no gravity, handy for isolated collision setups
    pub fn zero_gravity() -> Self {
        Self::new(Vec4::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PhysicsConfig::default();
        assert_eq!(config.gravity, Vec4::new(0.0, -9.8, 0.0, 0.0));
        assert_eq!(config.iterations, 20);
        assert!(config.allow_sleep);
        assert!(config.sleep_angular > 0.0 && config.sleep_angular < 0.01);
    }

    #[test]
    fn test_partial_toml() {
        let config: PhysicsConfig = toml::from_str(
            r#"
            iterations = 8
            gravity = { x = 0.0, y = 0.0, z = 0.0, w = -1.0 }
            "#,
        )
        .unwrap();
        assert_eq!(config.iterations, 8);
        assert_eq!(config.gravity.w, -1.0);
        // untouched fields keep their defaults
        assert_eq!(config.baumgarte, 0.2);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = PhysicsConfig::zero_gravity();
        let text = toml::to_string(&config).unwrap();
        let back: PhysicsConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
