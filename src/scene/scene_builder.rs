//! SceneBuilder - Declarative scene construction
//!
//! Provides a fluent API for populating a 4D physics world.

use phys4d_math::{mat4, Mat4, Vec4};
use phys4d_physics::{
    BodyDesc, BodyKey, ColliderDesc, PhysicsConfig, PhysicsError, PhysicsMaterial, PhysicsWorld,
};

/// Builder for constructing 4D physics scenes
///
/// # Example
/// ```
/// use phys4d::scene::SceneBuilder;
/// use phys4d_math::Vec4;
/// use phys4d_physics::PhysicsMaterial;
///
/// let (world, bodies) = SceneBuilder::new()
///     .add_floor(0.0, 10.0, PhysicsMaterial::default())
///     .add_box(Vec4::new(0.0, 1.0, 0.0, 0.0), Vec4::splat(0.5), PhysicsMaterial::METAL)
///     .build()
///     .unwrap();
/// assert_eq!(world.body_count(), 2);
/// assert_eq!(bodies.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SceneBuilder {
    config: PhysicsConfig,
    bodies: Vec<(BodyDesc, Vec<ColliderDesc>)>,
}

impl SceneBuilder {
    /// Create a new scene builder with default physics settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given physics configuration
    pub fn with_config(mut self, config: PhysicsConfig) -> Self {
        self.config = config;
        self
    }

    /// Override gravity
    pub fn with_gravity(mut self, gravity: Vec4) -> Self {
        self.config.gravity = gravity;
        self
    }

    /// Add an arbitrary body with its colliders
    pub fn add_body(mut self, body: BodyDesc, colliders: Vec<ColliderDesc>) -> Self {
        self.bodies.push((body, colliders));
        self
    }

    /// Add a static floor slab whose top face sits at height `y`
    ///
    /// The slab extends `size` in every horizontal direction (X, Z and W).
    pub fn add_floor(self, y: f32, size: f32, material: PhysicsMaterial) -> Self {
        let half = Vec4::new(size, 1.0, size, size);
        self.add_body(
            BodyDesc::fixed().with_position(Vec4::new(0.0, y - 1.0, 0.0, 0.0)),
            vec![ColliderDesc::cuboid(half).with_material(material)],
        )
    }

    /// Add a dynamic box
    pub fn add_box(self, position: Vec4, half_extents: Vec4, material: PhysicsMaterial) -> Self {
        self.add_rotated_box(position, mat4::IDENTITY, half_extents, material)
    }

    /// Add a dynamic box with an initial orientation
    pub fn add_rotated_box(self, position: Vec4, rotation: Mat4, half_extents: Vec4, material: PhysicsMaterial) -> Self {
        self.add_body(
            BodyDesc::dynamic().with_position(position).with_rotation(rotation),
            vec![ColliderDesc::cuboid(half_extents).with_material(material)],
        )
    }

    /// Add a dynamic sphere
    pub fn add_sphere(self, position: Vec4, radius: f32, material: PhysicsMaterial) -> Self {
        self.add_body(
            BodyDesc::dynamic().with_position(position),
            vec![ColliderDesc::sphere(radius).with_material(material)],
        )
    }

    /// Add a dynamic capsule standing along Y
    pub fn add_capsule(self, position: Vec4, half_length: f32, radius: f32, material: PhysicsMaterial) -> Self {
        self.add_body(
            BodyDesc::dynamic().with_position(position),
            vec![ColliderDesc::capsule(half_length, radius).with_material(material)],
        )
    }

    /// Add a vertical stack of `count` boxes resting on height `base_y`
    pub fn add_stack(mut self, base_y: f32, count: u32, half_extent: f32, material: PhysicsMaterial) -> Self {
        for i in 0..count {
            let y = base_y + half_extent + i as f32 * (2.0 * half_extent + 0.01);
            self = self.add_box(Vec4::new(0.0, y, 0.0, 0.0), Vec4::splat(half_extent), material);
        }
        self
    }

    /// Create the world and register every body
    ///
    /// Returns the world and the body keys in insertion order.
    pub fn build(self) -> Result<(PhysicsWorld, Vec<BodyKey>), PhysicsError> {
        let mut world = PhysicsWorld::with_config(self.config);
        let mut keys = Vec::with_capacity(self.bodies.len());
        for (body, colliders) in self.bodies {
            let key = world.add_body(body);
            for collider in colliders {
                world.add_collider(key, collider)?;
            }
            keys.push(key);
        }
        Ok((world, keys))
    }
}
