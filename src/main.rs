//! phys4d - headless 4D physics runner
//!
//! Builds one of the demo scenes from configuration and steps it at a
//! fixed tick rate, logging world activity as it goes.

use phys4d::config::AppConfig;
use phys4d::scene::{demo_scene, DEMO_SCENES};
use phys4d::systems::SimulationSystem;

fn main() {
    // Load configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load config: {}. Using defaults.", e);
        AppConfig::default()
    });

    // Initialize logging; RUST_LOG still takes precedence over the configured level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.debug.log_level.as_str())).init();
    log::info!("Starting phys4d");

    let sim_config = &config.simulation;
    let Some(builder) = demo_scene(&sim_config.scene, config.physics.clone(), sim_config.body_count) else {
        log::error!(
            "Unknown scene '{}', expected one of {:?}",
            sim_config.scene,
            DEMO_SCENES
        );
        std::process::exit(1);
    };
    let (mut world, bodies) = match builder.build() {
        Ok(built) => built,
        Err(e) => {
            log::error!("Failed to build scene '{}': {}", sim_config.scene, e);
            std::process::exit(1);
        }
    };
    log::info!(
        "Loaded scene '{}' with {} bodies and {} colliders",
        sim_config.scene,
        world.body_count(),
        world.collider_count()
    );

    let mut sim = SimulationSystem::new(sim_config.fixed_dt());
    let total_ticks = (sim_config.duration / sim.fixed_dt()).ceil().max(0.0) as u64;
    let report_interval = u64::from(config.debug.report_interval);

    sim.run_ticks(&mut world, total_ticks, |world, tick| {
        if report_interval == 0 || tick % report_interval != 0 {
            return;
        }
        let awake = world.bodies().filter(|(_, b)| b.is_awake()).count();
        let touching = world.contacts().filter(|(_, c)| c.is_colliding()).count();
        log::info!(
            "tick {}: {} awake bodies, {} contacts ({} touching)",
            tick,
            awake,
            world.contact_count(),
            touching
        );
    });

    let stats = sim.stats(&world);
    log::info!(
        "Finished {} ticks ({:.2} s simulated): {}/{} bodies awake",
        stats.ticks,
        sim.simulated_time(),
        stats.awake_bodies,
        stats.bodies
    );
    for key in bodies {
        if let Some(body) = world.get_body(key) {
            if body.is_dynamic() {
                let p = body.position();
                log::info!(
                    "  body {:?}: position ({:.3}, {:.3}, {:.3}, {:.3}) {}",
                    key,
                    p.x,
                    p.y,
                    p.z,
                    p.w,
                    if body.is_awake() { "awake" } else { "asleep" }
                );
            }
        }
    }
}
