//! Colliders: shapes attached to rigid bodies

use phys4d_math::{mat4, Mat4, Transform4, Vec4};
use slotmap::{new_key_type, Key};

use crate::body::BodyKey;
use crate::material::PhysicsMaterial;
use crate::shapes::{Box4D, Capsule4D, Shape, Sphere4D};

new_key_type! {
    /// Key to a collider in the physics world
    ///
    /// Generational like [`BodyKey`]: a key to a removed collider never
    /// aliases a collider created later in the same slot.
    pub struct ColliderKey;
}

impl ColliderKey {
    /// Opaque integer id, unique and nonzero while the collider is attached
    pub fn id(self) -> u64 {
        self.data().as_ffi()
    }
}

/// Broadphase tree node index for a collider
pub type ProxyId = usize;

/// A shape attached to a body, with its placement and surface material
#[derive(Clone, Debug)]
pub struct Collider {
    pub(crate) shape: Shape,
    pub(crate) local: Transform4,
    pub(crate) material: PhysicsMaterial,
    pub(crate) sensor: bool,
    pub(crate) tag: u64,
    pub(crate) body: BodyKey,
    pub(crate) proxy: Option<ProxyId>,
}

impl Collider {
    pub(crate) fn from_desc(desc: &ColliderDesc, body: BodyKey) -> Self {
        let mut collider = Self {
            shape: desc.shape,
            local: Transform4::IDENTITY,
            material: desc.material,
            sensor: desc.sensor,
            tag: desc.tag,
            body,
            proxy: None,
        };
        collider.set_local_transform(desc.local);
        collider
    }

    /// Store a placement, re-orthonormalizing its rotation
    pub(crate) fn set_local_transform(&mut self, local: Transform4) {
        self.local = Transform4::new(local.position, mat4::orthonormalize(local.rotation));
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Placement relative to the owning body
    pub fn local_transform(&self) -> &Transform4 {
        &self.local
    }

    pub fn material(&self) -> &PhysicsMaterial {
        &self.material
    }

    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    /// Caller-supplied tag, never interpreted by the engine
    pub fn tag(&self) -> u64 {
        self.tag
    }

    /// The owning body
    pub fn body(&self) -> BodyKey {
        self.body
    }

    /// World transform given the owning body's transform
    pub fn world_transform(&self, body: &Transform4) -> Transform4 {
        body.compose(&self.local)
    }
}

/// Builder describing a collider before it is attached
#[derive(Clone, Debug)]
pub struct ColliderDesc {
    pub shape: Shape,
    pub local: Transform4,
    pub material: PhysicsMaterial,
    pub sensor: bool,
    pub tag: u64,
}

impl ColliderDesc {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            local: Transform4::IDENTITY,
            material: PhysicsMaterial::default(),
            sensor: false,
            tag: 0,
        }
    }

    /// Box with the given half-extents
    pub fn cuboid(half_extents: Vec4) -> Self {
        Self::new(Shape::Box(Box4D { half_extents }))
    }

    pub fn sphere(radius: f32) -> Self {
        Self::new(Shape::Sphere(Sphere4D { radius }))
    }

    /// Capsule along local Y
    pub fn capsule(half_length: f32, radius: f32) -> Self {
        Self::new(Shape::Capsule(Capsule4D { radius, half_length }))
    }

    /// Offset from the body origin
    pub fn with_position(mut self, position: Vec4) -> Self {
        self.local.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Mat4) -> Self {
        self.local.rotation = rotation;
        self
    }

    pub fn with_transform(mut self, local: Transform4) -> Self {
        self.local = local;
        self
    }

    pub fn with_material(mut self, material: PhysicsMaterial) -> Self {
        self.material = material;
        self
    }

    /// Stored as given; the world rejects negative or non-finite values on attach
    pub fn with_density(mut self, density: f32) -> Self {
        self.material.density = density;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.material.friction = friction;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.material.restitution = restitution;
        self
    }

    /// Sensors report contacts but never push
    pub fn with_sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    pub fn with_tag(mut self, tag: u64) -> Self {
        self.tag = tag;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_ids_unique_and_nonzero() {
        let mut map: SlotMap<ColliderKey, u32> = SlotMap::with_key();
        let a = map.insert(1);
        let b = map.insert(2);
        assert_ne!(a.id(), 0);
        assert_ne!(a.id(), b.id());
        // a reused slot gets a new id
        map.remove(a);
        let c = map.insert(3);
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_desc_builders() {
        let desc = ColliderDesc::capsule(1.0, 0.25)
            .with_position(Vec4::new(0.0, 1.0, 0.0, 0.0))
            .with_density(3.0)
            .with_friction(0.7)
            .with_sensor(true)
            .with_tag(42);
        assert_eq!(desc.shape, Shape::Capsule(Capsule4D { radius: 0.25, half_length: 1.0 }));
        assert_eq!(desc.local.position.y, 1.0);
        assert_eq!(desc.material.density, 3.0);
        assert_eq!(desc.material.friction, 0.7);
        assert!(desc.sensor);
        assert_eq!(desc.tag, 42);
    }

    #[test]
    fn test_builder_keeps_invalid_material_for_validation() {
        let desc = ColliderDesc::sphere(1.0).with_density(f32::NAN).with_restitution(-1.0);
        assert!(desc.material.density.is_nan());
        assert_eq!(desc.material.restitution, -1.0);
    }

    #[test]
    fn test_local_rotation_orthonormalized() {
        let mut skewed = mat4::IDENTITY;
        skewed[0][0] = 1.2;
        skewed[1][0] = 0.1;
        let collider = Collider::from_desc(&ColliderDesc::sphere(1.0).with_rotation(skewed), BodyKey::null());
        let r = collider.local_transform().rotation;
        for i in 0..4 {
            for j in 0..4 {
                let dot: f32 = (0..4).map(|k| r[i][k] * r[j][k]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-5, "columns {} {} dot {}", i, j, dot);
            }
        }
    }

    #[test]
    fn test_world_transform() {
        let collider = Collider::from_desc(
            &ColliderDesc::sphere(1.0).with_position(Vec4::new(1.0, 0.0, 0.0, 0.0)),
            BodyKey::null(),
        );
        let body = Transform4::from_position(Vec4::new(0.0, 2.0, 0.0, 0.0));
        assert_eq!(collider.world_transform(&body).position, Vec4::new(1.0, 2.0, 0.0, 0.0));
    }
}
