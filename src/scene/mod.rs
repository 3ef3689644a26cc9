//! Scene construction utilities
//!
//! This module provides a declarative API for building 4D physics scenes,
//! plus the named demo scenes used by the headless runner.

mod scene_builder;

pub use scene_builder::SceneBuilder;

use phys4d_math::{mat4, Vec4};
use phys4d_physics::{PhysicsConfig, PhysicsMaterial};

/// Names accepted by [`demo_scene`]
pub const DEMO_SCENES: [&str; 3] = ["stack", "pile", "pendulum"];

/// Build one of the named demo scenes, or None for an unknown name
pub fn demo_scene(name: &str, config: PhysicsConfig, body_count: u32) -> Option<SceneBuilder> {
    let builder = SceneBuilder::new()
        .with_config(config)
        .add_floor(0.0, 20.0, PhysicsMaterial::default());

    let builder = match name {
        // boxes stacked along Y
        "stack" => builder.add_stack(0.0, body_count, 0.5, PhysicsMaterial::default()),
        // mixed shapes dropped onto the floor, spread across X and W
        "pile" => {
            let mut builder = builder;
            for i in 0..body_count {
                let x = (i % 3) as f32 * 1.5 - 1.5;
                let w = (i / 3 % 3) as f32 * 1.5 - 1.5;
                let y = 2.0 + i as f32 * 1.2;
                let position = Vec4::new(x, y, 0.0, w);
                builder = match i % 3 {
                    0 => builder.add_rotated_box(
                        position,
                        mat4::plane_rotation(0.3 * i as f32, 0, 3),
                        Vec4::splat(0.4),
                        PhysicsMaterial::default(),
                    ),
                    1 => builder.add_sphere(position, 0.5, PhysicsMaterial::RUBBER),
                    _ => builder.add_capsule(position, 0.4, 0.3, PhysicsMaterial::METAL),
                };
            }
            builder
        }
        // a sphere striking a row of touching spheres
        "pendulum" => {
            let mut builder = builder.with_gravity(Vec4::ZERO);
            for i in 0..body_count {
                builder = builder.add_sphere(Vec4::new(i as f32 * 1.0, 1.0, 0.0, 0.0), 0.5, PhysicsMaterial::ELASTIC);
            }
            builder.add_body(
                phys4d_physics::BodyDesc::dynamic()
                    .with_position(Vec4::new(-3.0, 1.0, 0.0, 0.0))
                    .with_linear_velocity(Vec4::new(4.0, 0.0, 0.0, 0.0))
                    .with_damping(0.0, 0.0),
                vec![phys4d_physics::ColliderDesc::sphere(0.5).with_material(PhysicsMaterial::ELASTIC)],
            )
        }
        _ => return None,
    };
    Some(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_demo_scene_builds() {
        for name in DEMO_SCENES {
            let builder = demo_scene(name, PhysicsConfig::default(), 4).unwrap();
            let (world, _) = builder.build().unwrap();
            assert!(world.body_count() >= 5, "scene {}", name);
        }
    }

    #[test]
    fn test_unknown_scene() {
        assert!(demo_scene("nope", PhysicsConfig::default(), 3).is_none());
    }
}
