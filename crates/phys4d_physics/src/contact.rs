//! Persistent per-pair contacts

use bitflags::bitflags;
use slotmap::{new_key_type, SlotMap};

use crate::body::BodyKey;
use crate::collide::{self, ClipBuffers, Manifold, ShapeInstance};
use crate::collider::{Collider, ColliderKey};
use crate::material::PhysicsMaterial;
use crate::body::RigidBody4D;

new_key_type! {
    /// Key to a tracked contact
    pub struct ContactKey;
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ContactFlags: u8 {
        /// The manifold was non-empty after the latest narrow-phase run
        const COLLIDING = 1 << 0;
        /// COLLIDING as it was before the latest run
        const WAS_COLLIDING = 1 << 1;
        /// Claimed by an island during the current step
        const ISLAND = 1 << 2;
    }
}

/// A tracked pair of colliders whose fat bounds overlap
///
/// The manifold is recomputed from scratch every step; nothing about
/// the previous step's impulses is kept.
#[derive(Clone, Debug)]
pub struct Contact {
    pub(crate) collider_a: ColliderKey,
    pub(crate) collider_b: ColliderKey,
    pub(crate) body_a: BodyKey,
    pub(crate) body_b: BodyKey,
    pub(crate) friction: f32,
    pub(crate) restitution: f32,
    pub(crate) sensor: bool,
    pub(crate) manifold: Manifold,
    pub(crate) flags: ContactFlags,
}

impl Contact {
    pub(crate) fn new(a: ColliderKey, ca: &Collider, b: ColliderKey, cb: &Collider) -> Self {
        let mut contact = Self {
            collider_a: a,
            collider_b: b,
            body_a: ca.body,
            body_b: cb.body,
            friction: 0.0,
            restitution: 0.0,
            sensor: false,
            manifold: Manifold::new(),
            flags: ContactFlags::empty(),
        };
        contact.refresh_materials(ca, cb);
        contact
    }

    pub fn colliders(&self) -> (ColliderKey, ColliderKey) {
        (self.collider_a, self.collider_b)
    }

    pub fn bodies(&self) -> (BodyKey, BodyKey) {
        (self.body_a, self.body_b)
    }

    pub fn manifold(&self) -> &Manifold {
        &self.manifold
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    pub fn is_colliding(&self) -> bool {
        self.flags.contains(ContactFlags::COLLIDING)
    }

    pub fn flags(&self) -> ContactFlags {
        self.flags
    }

    /// True on the step the pair started touching
    pub(crate) fn began(&self) -> bool {
        self.flags.contains(ContactFlags::COLLIDING) && !self.flags.contains(ContactFlags::WAS_COLLIDING)
    }

    /// True on the step the pair stopped touching
    pub(crate) fn ended(&self) -> bool {
        !self.flags.contains(ContactFlags::COLLIDING) && self.flags.contains(ContactFlags::WAS_COLLIDING)
    }

    fn refresh_materials(&mut self, ca: &Collider, cb: &Collider) {
        self.friction = PhysicsMaterial::mix_friction(ca.material.friction, cb.material.friction);
        self.restitution = PhysicsMaterial::mix_restitution(ca.material.restitution, cb.material.restitution);
        self.sensor = ca.sensor || cb.sensor;
    }

    /// Recompute the manifold and advance the colliding flags
    pub(crate) fn solve_collision(
        &mut self,
        bodies: &SlotMap<BodyKey, RigidBody4D>,
        colliders: &SlotMap<ColliderKey, Collider>,
        scratch: &mut ClipBuffers,
    ) {
        self.flags.set(ContactFlags::WAS_COLLIDING, self.flags.contains(ContactFlags::COLLIDING));
        self.manifold.reset();

        let (Some(ca), Some(cb)) = (colliders.get(self.collider_a), colliders.get(self.collider_b)) else {
            self.flags.remove(ContactFlags::COLLIDING);
            return;
        };
        let (Some(ba), Some(bb)) = (bodies.get(self.body_a), bodies.get(self.body_b)) else {
            self.flags.remove(ContactFlags::COLLIDING);
            return;
        };
        self.refresh_materials(ca, cb);

        let a = ShapeInstance {
            shape: &ca.shape,
            transform: ca.world_transform(ba.transform()),
            id: self.collider_a.id(),
        };
        let b = ShapeInstance {
            shape: &cb.shape,
            transform: cb.world_transform(bb.transform()),
            id: self.collider_b.id(),
        };
        collide::collide(&a, &b, &mut self.manifold, scratch);

        self.flags.set(ContactFlags::COLLIDING, !self.manifold.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyDesc;
    use crate::collider::ColliderDesc;
    use phys4d_math::Vec4;

    struct Pair {
        bodies: SlotMap<BodyKey, RigidBody4D>,
        colliders: SlotMap<ColliderKey, Collider>,
        contact: Contact,
    }

    fn sphere_pair(distance: f32) -> Pair {
        let mut bodies: SlotMap<BodyKey, RigidBody4D> = SlotMap::with_key();
        let mut colliders: SlotMap<ColliderKey, Collider> = SlotMap::with_key();
        let ba = bodies.insert(RigidBody4D::new(&BodyDesc::dynamic()));
        let bb = bodies.insert(RigidBody4D::new(
            &BodyDesc::fixed().with_position(Vec4::new(distance, 0.0, 0.0, 0.0)),
        ));
        let ca = colliders.insert(Collider::from_desc(&ColliderDesc::sphere(1.0).with_friction(0.4), ba));
        let cb = colliders.insert(Collider::from_desc(&ColliderDesc::sphere(1.0).with_friction(0.9), bb));
        let contact = Contact::new(ca, &colliders[ca], cb, &colliders[cb]);
        Pair { bodies, colliders, contact }
    }

    #[test]
    fn test_begin_then_persist() {
        let mut pair = sphere_pair(1.5);
        let mut scratch = ClipBuffers::new();
        pair.contact.solve_collision(&pair.bodies, &pair.colliders, &mut scratch);
        assert!(pair.contact.began());
        assert_eq!(pair.contact.manifold().len(), 1);
        assert!((pair.contact.friction() - (0.4f32 * 0.9).sqrt()).abs() < 1e-6);

        pair.contact.solve_collision(&pair.bodies, &pair.colliders, &mut scratch);
        assert!(pair.contact.is_colliding());
        assert!(!pair.contact.began());
        assert!(!pair.contact.ended());
    }

    #[test]
    fn test_ended_after_separation() {
        let mut pair = sphere_pair(1.5);
        let mut scratch = ClipBuffers::new();
        pair.contact.solve_collision(&pair.bodies, &pair.colliders, &mut scratch);
        let far = pair.contact.body_b;
        pair.bodies[far].set_transform(Vec4::new(3.0, 0.0, 0.0, 0.0), phys4d_math::mat4::IDENTITY);
        pair.contact.solve_collision(&pair.bodies, &pair.colliders, &mut scratch);
        assert!(pair.contact.ended());
        assert!(pair.contact.manifold().is_empty());
    }
}
