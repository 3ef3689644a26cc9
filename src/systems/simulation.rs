//! Fixed-timestep simulation system
//!
//! Accumulates variable frame times and advances the physics world in
//! fixed ticks, the way a host game loop drives the engine.

use phys4d_physics::PhysicsWorld;

/// Longest frame accepted before the accumulator drops time
const MAX_FRAME_TIME: f32 = 0.25;

/// Snapshot of world activity after an update
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimulationStats {
    /// Total ticks run so far
    pub ticks: u64,
    pub bodies: usize,
    pub awake_bodies: usize,
    pub contacts: usize,
    pub touching_contacts: usize,
}

impl SimulationStats {
    pub fn collect(world: &PhysicsWorld, ticks: u64) -> Self {
        Self {
            ticks,
            bodies: world.body_count(),
            awake_bodies: world.bodies().filter(|(_, b)| b.is_awake()).count(),
            contacts: world.contact_count(),
            touching_contacts: world.contacts().filter(|(_, c)| c.is_colliding()).count(),
        }
    }
}

/// Drives a physics world at a fixed tick rate
#[derive(Debug, Clone)]
pub struct SimulationSystem {
    fixed_dt: f32,
    accumulator: f32,
    ticks: u64,
}

impl SimulationSystem {
    /// Create a new simulation system ticking every `fixed_dt` seconds
    pub fn new(fixed_dt: f32) -> Self {
        Self {
            fixed_dt: fixed_dt.max(1.0e-4),
            accumulator: 0.0,
            ticks: 0,
        }
    }

    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Elapsed simulated time
    pub fn simulated_time(&self) -> f32 {
        self.ticks as f32 * self.fixed_dt
    }

    /// Feed one frame of wall time; returns the number of ticks run
    pub fn update(&mut self, world: &mut PhysicsWorld, frame_time: f32) -> u32 {
        // Cap frame time to prevent a spiral of death after a stall
        self.accumulator += frame_time.clamp(0.0, MAX_FRAME_TIME);
        let mut steps = 0;
        while self.accumulator >= self.fixed_dt {
            world.step(self.fixed_dt);
            self.accumulator -= self.fixed_dt;
            self.ticks += 1;
            steps += 1;
        }
        steps
    }

    /// Run exactly `ticks` fixed steps, calling `on_tick` after each one
    pub fn run_ticks<F>(&mut self, world: &mut PhysicsWorld, ticks: u64, mut on_tick: F)
    where
        F: FnMut(&PhysicsWorld, u64),
    {
        for _ in 0..ticks {
            world.step(self.fixed_dt);
            self.ticks += 1;
            on_tick(world, self.ticks);
        }
    }

    pub fn stats(&self, world: &PhysicsWorld) -> SimulationStats {
        SimulationStats::collect(world, self.ticks)
    }
}

impl Default for SimulationSystem {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}
