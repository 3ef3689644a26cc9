//! Application configuration
//!
//! Configuration is loaded from multiple sources with the following priority (lowest to highest):
//! 1. `config/default.toml` (version controlled)
//! 2. `config/user.toml` (gitignored, user overrides)
//! 3. Environment variables (`P4D_SECTION__KEY`)

use figment::{Figment, providers::{Format, Toml, Env}};
use phys4d_physics::PhysicsConfig;
use serde::{Serialize, Deserialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Solver and world tuning, passed straight to the physics world
    #[serde(default)]
    pub physics: PhysicsConfig,
    /// Fixed-timestep runner settings
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Debug configuration
    #[serde(default)]
    pub debug: DebugConfig,
}

impl AppConfig {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. `config/default.toml`
    /// 2. `config/user.toml`
    /// 3. Environment variables (`P4D_*`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific config directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let default_path = config_dir.join("default.toml");
        let user_path = config_dir.join("user.toml");

        let mut figment = Figment::new();

        if default_path.exists() {
            figment = figment.merge(Toml::file(&default_path));
        }

        // Load user config (optional)
        if user_path.exists() {
            figment = figment.merge(Toml::file(&user_path));
        }

        // Environment variables override everything
        // P4D_PHYSICS__ITERATIONS=30 -> physics.iterations = 30
        figment = figment.merge(Env::prefixed("P4D_").split("__"));

        figment.extract().map_err(ConfigError::from)
    }
}

/// Fixed-timestep runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Physics ticks per simulated second
    pub tick_rate: u32,
    /// Simulated seconds to run the headless demo for
    pub duration: f32,
    /// Demo scene to build (`stack`, `pile` or `pendulum`)
    pub scene: String,
    /// Number of bodies in the demo scene
    pub body_count: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            duration: 5.0,
            scene: "stack".to_string(),
            body_count: 5,
        }
    }
}

impl SimulationConfig {
    /// Seconds per physics tick
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}

/// Debug configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
    /// Ticks between progress reports, 0 disables them
    pub report_interval: u32,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            report_interval: 60,
        }
    }
}

/// Configuration error
#[derive(Debug)]
pub struct ConfigError {
    message: String,
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError {
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.simulation.tick_rate, 60);
        assert_eq!(config.physics.iterations, 20);
        assert_eq!(config.physics.gravity.y, -9.8);
    }

    #[test]
    fn test_fixed_dt() {
        let mut sim = SimulationConfig::default();
        assert!((sim.fixed_dt() - 1.0 / 60.0).abs() < 1e-7);
        sim.tick_rate = 0;
        assert_eq!(sim.fixed_dt(), 1.0);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("tick_rate"));
        assert!(toml.contains("baumgarte"));
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let config: AppConfig = toml::from_str("[physics]\niterations = 8\n").unwrap();
        assert_eq!(config.physics.iterations, 8);
        assert_eq!(config.physics.penetration_slop, 0.05);
        assert_eq!(config.debug.log_level, "info");
    }
}
