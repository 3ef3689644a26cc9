//! Rigid body types for 4D physics simulation

use bitflags::bitflags;
use log::debug;
use phys4d_math::{mat4, point_second_moment, Bivec4, Mat4, Mat6, Transform4, Vec4};
use slotmap::{new_key_type, SlotMap};

use crate::collider::{Collider, ColliderKey};
use crate::contact::ContactKey;
use crate::filter::CollisionLayer;

// Define generational key type for rigid bodies
new_key_type! {
    /// Key to a rigid body in the physics world
    ///
    /// Uses generational indexing to prevent the ABA problem where a handle
    /// could point to a reused slot. If a body is removed and its slot reused,
    /// old keys will return None instead of pointing to the wrong body.
    pub struct BodyKey;
}

/// Body type determines how the body interacts with physics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BodyType {
    /// Fully simulated: responds to gravity, forces and contacts
    #[default]
    Dynamic,
    /// Never moves and has infinite mass
    Static,
    /// Moved by its velocity only; infinite mass, unaffected by contacts
    Kinematic,
}

bitflags! {
    /// Simulation state flags of a body
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct BodyFlags: u16 {
        const AWAKE = 1 << 0;
        const ACTIVE = 1 << 1;
        const ALLOW_SLEEP = 1 << 2;
        /// Claimed by an island during the current step
        const ISLAND = 1 << 3;
        /// Mass data must be recomputed before the next solve
        const DIRTY_MASS = 1 << 4;
    }
}

/// Adjacency entry linking a body to a contact and the other body in it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContactEdge {
    pub other: BodyKey,
    pub contact: ContactKey,
}

/// Description of a body to create
#[derive(Clone, Debug)]
pub struct BodyDesc {
    pub body_type: BodyType,
    pub position: Vec4,
    pub rotation: Mat4,
    pub linear_velocity: Vec4,
    pub angular_velocity: Bivec4,
    pub gravity_scale: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub allow_sleep: bool,
    pub awake: bool,
    pub active: bool,
    pub layers: CollisionLayer,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            body_type: BodyType::Dynamic,
            position: Vec4::ZERO,
            rotation: mat4::IDENTITY,
            linear_velocity: Vec4::ZERO,
            angular_velocity: Bivec4::ZERO,
            gravity_scale: 1.0,
            linear_damping: 0.0,
            angular_damping: 0.1,
            allow_sleep: true,
            awake: true,
            active: true,
            layers: CollisionLayer::default(),
        }
    }
}

impl BodyDesc {
    pub fn dynamic() -> Self {
        Self::default()
    }

    pub fn fixed() -> Self {
        Self {
            body_type: BodyType::Static,
            ..Self::default()
        }
    }

    pub fn kinematic() -> Self {
        Self {
            body_type: BodyType::Kinematic,
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: Vec4) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Mat4) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_linear_velocity(mut self, velocity: Vec4) -> Self {
        self.linear_velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, velocity: Bivec4) -> Self {
        self.angular_velocity = velocity;
        self
    }

    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear.max(0.0);
        self.angular_damping = angular.max(0.0);
        self
    }

    pub fn with_allow_sleep(mut self, allow: bool) -> Self {
        self.allow_sleep = allow;
        self
    }

    pub fn with_awake(mut self, awake: bool) -> Self {
        self.awake = awake;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_layers(mut self, layers: CollisionLayer) -> Self {
        self.layers = layers;
        self
    }
}

/// A 4D rigid body
///
/// Positions refer to the body origin; the center of mass may be offset
/// when colliders are not centered on the origin.
#[derive(Clone, Debug)]
pub struct RigidBody4D {
    pub(crate) body_type: BodyType,
    pub(crate) flags: BodyFlags,
    pub(crate) transform: Transform4,
    pub(crate) world_center: Vec4,
    pub(crate) local_center: Vec4,
    pub(crate) linear_velocity: Vec4,
    pub(crate) angular_velocity: Bivec4,
    pub(crate) force: Vec4,
    pub(crate) torque: Bivec4,
    pub(crate) mass: f32,
    pub(crate) inv_mass: f32,
    pub(crate) inv_inertia_local: Mat6,
    pub(crate) inv_inertia_world: Mat6,
    pub(crate) gravity_scale: f32,
    pub(crate) linear_damping: f32,
    pub(crate) angular_damping: f32,
    pub(crate) sleep_time: f32,
    pub(crate) layers: CollisionLayer,
    pub(crate) colliders: Vec<ColliderKey>,
    pub(crate) edges: Vec<ContactEdge>,
    /// Slot in the island currently being solved
    pub(crate) island_index: usize,
}

impl RigidBody4D {
    pub fn new(desc: &BodyDesc) -> Self {
        let mut flags = BodyFlags::DIRTY_MASS;
        if desc.awake && desc.body_type != BodyType::Static {
            flags |= BodyFlags::AWAKE;
        }
        if desc.active {
            flags |= BodyFlags::ACTIVE;
        }
        if desc.allow_sleep {
            flags |= BodyFlags::ALLOW_SLEEP;
        }

        let is_static = desc.body_type == BodyType::Static;
        Self {
            body_type: desc.body_type,
            flags,
            transform: Transform4::new(desc.position, mat4::orthonormalize(desc.rotation)),
            world_center: desc.position,
            local_center: Vec4::ZERO,
            linear_velocity: if is_static { Vec4::ZERO } else { desc.linear_velocity },
            angular_velocity: if is_static { Bivec4::ZERO } else { desc.angular_velocity },
            force: Vec4::ZERO,
            torque: Bivec4::ZERO,
            mass: 0.0,
            inv_mass: 0.0,
            inv_inertia_local: Mat6::ZERO,
            inv_inertia_world: Mat6::ZERO,
            gravity_scale: desc.gravity_scale,
            linear_damping: desc.linear_damping,
            angular_damping: desc.angular_damping,
            sleep_time: 0.0,
            layers: desc.layers,
            colliders: Vec::new(),
            edges: Vec::new(),
            island_index: 0,
        }
    }

    // Accessors

    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    pub fn is_static(&self) -> bool {
        self.body_type == BodyType::Static
    }

    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    pub fn is_kinematic(&self) -> bool {
        self.body_type == BodyType::Kinematic
    }

    pub fn is_awake(&self) -> bool {
        self.flags.contains(BodyFlags::AWAKE)
    }

    pub fn is_active(&self) -> bool {
        self.flags.contains(BodyFlags::ACTIVE)
    }

    pub fn allows_sleep(&self) -> bool {
        self.flags.contains(BodyFlags::ALLOW_SLEEP)
    }

    pub fn flags(&self) -> BodyFlags {
        self.flags
    }

    /// Body origin in world space
    pub fn position(&self) -> Vec4 {
        self.transform.position
    }

    pub fn rotation(&self) -> Mat4 {
        self.transform.rotation
    }

    pub fn transform(&self) -> &Transform4 {
        &self.transform
    }

    /// Center of mass in world space
    pub fn world_center(&self) -> Vec4 {
        self.world_center
    }

    /// Center of mass relative to the body origin, in body space
    pub fn local_center(&self) -> Vec4 {
        self.local_center
    }

    pub fn linear_velocity(&self) -> Vec4 {
        self.linear_velocity
    }

    pub fn angular_velocity(&self) -> Bivec4 {
        self.angular_velocity
    }

    pub fn force(&self) -> Vec4 {
        self.force
    }

    pub fn torque(&self) -> Bivec4 {
        self.torque
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Inverse inertia about the center of mass, in body space
    pub fn inv_inertia_local(&self) -> &Mat6 {
        &self.inv_inertia_local
    }

    /// Inverse inertia about the center of mass, in world space
    pub fn inv_inertia_world(&self) -> &Mat6 {
        &self.inv_inertia_world
    }

    pub fn gravity_scale(&self) -> f32 {
        self.gravity_scale
    }

    pub fn linear_damping(&self) -> f32 {
        self.linear_damping
    }

    pub fn angular_damping(&self) -> f32 {
        self.angular_damping
    }

    pub fn sleep_time(&self) -> f32 {
        self.sleep_time
    }

    pub fn layers(&self) -> CollisionLayer {
        self.layers
    }

    pub fn colliders(&self) -> &[ColliderKey] {
        &self.colliders
    }

    pub fn contact_edges(&self) -> &[ContactEdge] {
        &self.edges
    }

    /// Velocity of a world-space point rigidly attached to the body
    pub fn velocity_at_world_point(&self, point: Vec4) -> Vec4 {
        self.linear_velocity + self.angular_velocity.cross(point - self.world_center)
    }

    pub fn world_point(&self, local: Vec4) -> Vec4 {
        self.transform.transform_point(local)
    }

    pub fn local_point(&self, world: Vec4) -> Vec4 {
        self.transform.inverse_transform_point(world)
    }

    // Mutators

    /// Accumulate a force through the center of mass for the next step
    pub fn apply_force(&mut self, force: Vec4) {
        if !self.is_dynamic() {
            return;
        }
        self.force += force;
        self.wake();
    }

    /// Accumulate a force applied at a world point (adds torque)
    pub fn apply_force_at_world_point(&mut self, force: Vec4, point: Vec4) {
        if !self.is_dynamic() {
            return;
        }
        self.force += force;
        self.torque += Bivec4::wedge(point - self.world_center, force);
        self.wake();
    }

    pub fn apply_torque(&mut self, torque: Bivec4) {
        if !self.is_dynamic() {
            return;
        }
        self.torque += torque;
        self.wake();
    }

    /// Instantly change momentum through the center of mass
    pub fn apply_linear_impulse(&mut self, impulse: Vec4) {
        if !self.is_dynamic() {
            return;
        }
        self.linear_velocity += impulse * self.inv_mass;
        self.wake();
    }

    /// Instantly change momentum at a world point
    pub fn apply_linear_impulse_at_world_point(&mut self, impulse: Vec4, point: Vec4) {
        if !self.is_dynamic() {
            return;
        }
        self.linear_velocity += impulse * self.inv_mass;
        let angular = Bivec4::wedge(point - self.world_center, impulse);
        self.angular_velocity += self.inv_inertia_world.mul_bivec(angular);
        self.wake();
    }

    /// Set the linear velocity; a nonzero value wakes the body
    pub fn set_linear_velocity(&mut self, velocity: Vec4) {
        if self.is_static() {
            return;
        }
        if velocity.length_squared() > 0.0 {
            self.wake();
        }
        self.linear_velocity = velocity;
    }

    /// Set the angular velocity; a nonzero value wakes the body
    pub fn set_angular_velocity(&mut self, velocity: Bivec4) {
        if self.is_static() {
            return;
        }
        if velocity.length_squared() > 0.0 {
            self.wake();
        }
        self.angular_velocity = velocity;
    }

    pub fn set_gravity_scale(&mut self, scale: f32) {
        self.gravity_scale = scale;
    }

    pub fn set_damping(&mut self, linear: f32, angular: f32) {
        self.linear_damping = linear.max(0.0);
        self.angular_damping = angular.max(0.0);
    }

    pub fn set_layers(&mut self, layers: CollisionLayer) {
        self.layers = layers;
    }

    /// Allow or forbid sleeping; forbidding wakes the body
    pub fn set_allow_sleep(&mut self, allow: bool) {
        if allow {
            self.flags |= BodyFlags::ALLOW_SLEEP;
        } else {
            self.flags.remove(BodyFlags::ALLOW_SLEEP);
            self.wake();
        }
    }

    /// Wake the body and reset its sleep timer
    pub fn wake(&mut self) {
        if self.is_static() {
            return;
        }
        if !self.is_awake() {
            self.flags |= BodyFlags::AWAKE;
            self.sleep_time = 0.0;
        }
    }

    /// Put the body to sleep, zeroing all motion
    pub fn set_to_sleep(&mut self) {
        self.flags.remove(BodyFlags::AWAKE);
        self.sleep_time = 0.0;
        self.linear_velocity = Vec4::ZERO;
        self.angular_velocity = Bivec4::ZERO;
        self.force = Vec4::ZERO;
        self.torque = Bivec4::ZERO;
    }

    pub(crate) fn mark_mass_dirty(&mut self) {
        self.flags |= BodyFlags::DIRTY_MASS;
    }

    pub(crate) fn clear_forces(&mut self) {
        self.force = Vec4::ZERO;
        self.torque = Bivec4::ZERO;
    }

    pub(crate) fn set_transform(&mut self, position: Vec4, rotation: Mat4) {
        self.transform = Transform4::new(position, mat4::orthonormalize(rotation));
        self.world_center = self.transform.transform_point(self.local_center);
    }

    /// Refresh the world inertia from the current orientation
    pub(crate) fn update_world_inertia(&mut self) {
        self.inv_inertia_world = self.inv_inertia_local.rotated(self.transform.rotation);
    }

    /// Recompute mass, center of mass and inertia from the attached colliders
    pub(crate) fn calculate_mass_data(&mut self, colliders: &SlotMap<ColliderKey, Collider>) {
        self.flags.remove(BodyFlags::DIRTY_MASS);
        self.mass = 0.0;
        self.inv_mass = 0.0;
        self.inv_inertia_local = Mat6::ZERO;
        self.inv_inertia_world = Mat6::ZERO;
        self.local_center = Vec4::ZERO;

        if !self.is_dynamic() {
            self.world_center = self.transform.position;
            return;
        }

        // Second moment about the body origin, in body space
        let mut moment = mat4::ZERO;
        let mut mass = 0.0;
        let mut weighted_center = Vec4::ZERO;
        for key in &self.colliders {
            let Some(collider) = colliders.get(*key) else {
                continue;
            };
            if collider.material.density == 0.0 {
                continue;
            }
            let md = collider.shape.mass_properties(collider.material.density);
            let rot = collider.local.rotation;
            let rotated = mat4::mul(mat4::mul(rot, md.second_moment), mat4::transpose(rot));
            moment = mat4::add(moment, rotated);
            moment = mat4::add(moment, point_second_moment(md.mass, collider.local.position));
            mass += md.mass;
            weighted_center += collider.local.position * md.mass;
        }

        if mass > 0.0 {
            self.mass = mass;
            self.inv_mass = 1.0 / mass;
            self.local_center = weighted_center * self.inv_mass;
            let about_center = mat4::add(moment, point_second_moment(-mass, self.local_center));
            let inertia = Mat6::inertia_from_second_moment(about_center);
            self.inv_inertia_local = inertia.inverse().unwrap_or(Mat6::ZERO);
        } else {
            debug!("Body has no mass, falling back to unit mass without inertia");
            self.mass = 1.0;
            self.inv_mass = 1.0;
        }

        self.world_center = self.transform.transform_point(self.local_center);
        self.update_world_inertia();
    }
}
