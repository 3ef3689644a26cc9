//! Physics world and simulation

use log::{debug, warn};
use phys4d_math::{Bounds4, Mat4, Transform4, Vec4};
use slotmap::SlotMap;

use crate::body::{BodyDesc, BodyFlags, BodyKey, RigidBody4D};
use crate::collider::{Collider, ColliderDesc, ColliderKey};
use crate::config::PhysicsConfig;
use crate::contact::{Contact, ContactFlags, ContactKey};
use crate::contact_manager::ContactManager;
use crate::contact_solver::ContactSolver;
use crate::error::PhysicsError;
use crate::island::Island;
use crate::listener::ContactListener;
use crate::ray::{Ray, RaycastHit};

/// The physics world containing all rigid bodies, their colliders and contacts
pub struct PhysicsWorld {
    /// All rigid bodies in the world (using generational keys)
    bodies: SlotMap<BodyKey, RigidBody4D>,
    /// All colliders, each owned by exactly one body
    colliders: SlotMap<ColliderKey, Collider>,
    contact_manager: ContactManager,
    config: PhysicsConfig,

    // per-step working memory, kept to avoid reallocating every step
    island: Island,
    solver: ContactSolver,
    stack: Vec<BodyKey>,
    seeds: Vec<BodyKey>,
    out_of_bounds: Vec<BodyKey>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .field("contacts", &self.contact_manager)
            .field("config", &self.config)
            .finish()
    }
}

impl PhysicsWorld {
    /// Create a new physics world with default configuration
    pub fn new() -> Self {
        Self::with_config(PhysicsConfig::default())
    }

    /// Create a new physics world with custom configuration
    pub fn with_config(config: PhysicsConfig) -> Self {
        Self {
            bodies: SlotMap::with_key(),
            colliders: SlotMap::with_key(),
            contact_manager: ContactManager::new(config.aabb_margin),
            config,
            island: Island::new(),
            solver: ContactSolver::new(),
            stack: Vec::new(),
            seeds: Vec::new(),
            out_of_bounds: Vec::new(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    // --- Settings -------------------------------------------------------

    pub fn gravity(&self) -> Vec4 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec4) {
        self.config.gravity = gravity;
    }

    pub fn set_iterations(&mut self, iterations: u32) {
        self.config.iterations = iterations.max(1);
    }

    pub fn set_enable_friction(&mut self, enabled: bool) {
        self.config.enable_friction = enabled;
    }

    /// Enable or disable sleeping; disabling wakes every body
    pub fn set_allow_sleep(&mut self, allow: bool) {
        self.config.allow_sleep = allow;
        if !allow {
            for body in self.bodies.values_mut() {
                body.wake();
            }
        }
    }

    /// Install the listener that receives contact begin/end events
    pub fn set_contact_listener(&mut self, listener: Box<dyn ContactListener>) {
        self.contact_manager.set_listener(Some(listener));
    }

    pub fn clear_contact_listener(&mut self) {
        self.contact_manager.set_listener(None);
    }

    // --- Bodies ---------------------------------------------------------

    /// Add a body to the world and return its key
    pub fn add_body(&mut self, desc: BodyDesc) -> BodyKey {
        let key = self.bodies.insert(RigidBody4D::new(&desc));
        self.refresh_mass(key);
        debug!("Added {:?} body {:?}", desc.body_type, key);
        key
    }

    /// Add a body together with one collider
    pub fn add_body_with_collider(
        &mut self,
        body: BodyDesc,
        collider: ColliderDesc,
    ) -> Result<(BodyKey, ColliderKey), PhysicsError> {
        let key = self.add_body(body);
        match self.add_collider(key, collider) {
            Ok(collider) => Ok((key, collider)),
            Err(err) => {
                self.bodies.remove(key);
                Err(err)
            }
        }
    }

    /// Remove a body, destroying its colliders, proxies and contacts
    pub fn remove_body(&mut self, key: BodyKey) -> Result<RigidBody4D, PhysicsError> {
        if !self.bodies.contains_key(key) {
            return Err(PhysicsError::BodyNotFound(key));
        }
        self.contact_manager
            .remove_contacts_of_body(key, &mut self.bodies, &self.colliders);

        let mut body = self.bodies.remove(key).ok_or(PhysicsError::BodyNotFound(key))?;
        for collider_key in body.colliders.drain(..) {
            if let Some(collider) = self.colliders.remove(collider_key) {
                if let Some(proxy) = collider.proxy {
                    self.contact_manager.broadphase.remove_proxy(proxy);
                }
            }
        }
        debug!("Removed body {:?}", key);
        Ok(body)
    }

    /// Remove every body, collider and contact
    pub fn remove_all_bodies(&mut self) {
        let keys: Vec<BodyKey> = self.bodies.keys().collect();
        for key in keys {
            // keys were just collected, so removal cannot fail
            let _ = self.remove_body(key);
        }
    }

    /// Get an immutable reference to a body by key
    pub fn get_body(&self, key: BodyKey) -> Option<&RigidBody4D> {
        self.bodies.get(key)
    }

    /// Get a mutable reference to a body by key
    ///
    /// Use [`PhysicsWorld::set_body_transform`] and
    /// [`PhysicsWorld::set_body_active`] for changes that must reach the
    /// broadphase.
    pub fn get_body_mut(&mut self, key: BodyKey) -> Option<&mut RigidBody4D> {
        self.bodies.get_mut(key)
    }

    /// Get the number of bodies in the world
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Iterate over all body keys
    pub fn body_keys(&self) -> impl Iterator<Item = BodyKey> + '_ {
        self.bodies.keys()
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyKey, &RigidBody4D)> {
        self.bodies.iter()
    }

    fn body_mut(&mut self, key: BodyKey) -> Result<&mut RigidBody4D, PhysicsError> {
        self.bodies.get_mut(key).ok_or(PhysicsError::BodyNotFound(key))
    }

    /// Teleport a body, wake it and refit its proxies
    pub fn set_body_transform(&mut self, key: BodyKey, position: Vec4, rotation: Mat4) -> Result<(), PhysicsError> {
        let body = self.body_mut(key)?;
        body.set_transform(position, rotation);
        body.wake();
        self.sync_body_proxies(key);
        Ok(())
    }

    /// Activate or deactivate a body.
    ///
    /// An inactive body has no broadphase proxies and no contacts; it is
    /// skipped by the step entirely.
    pub fn set_body_active(&mut self, key: BodyKey, active: bool) -> Result<(), PhysicsError> {
        let was_active = self.body_mut(key)?.is_active();
        if was_active == active {
            return Ok(());
        }

        if active {
            let body = self.body_mut(key)?;
            body.flags |= BodyFlags::ACTIVE;
            body.wake();
            let keys = body.colliders.clone();
            for collider in keys {
                self.insert_proxy(collider);
            }
        } else {
            self.contact_manager
                .remove_contacts_of_body(key, &mut self.bodies, &self.colliders);
            let body = self.body_mut(key)?;
            body.flags.remove(BodyFlags::ACTIVE);
            let keys = body.colliders.clone();
            for collider in keys {
                self.remove_proxy(collider);
            }
        }
        Ok(())
    }

    // --- Colliders ------------------------------------------------------

    /// Attach a new collider to a body
    pub fn add_collider(&mut self, body_key: BodyKey, desc: ColliderDesc) -> Result<ColliderKey, PhysicsError> {
        if !self.bodies.contains_key(body_key) {
            return Err(PhysicsError::BodyNotFound(body_key));
        }
        desc.shape.validate()?;
        validate_material(desc.material.density, desc.material.friction, desc.material.restitution)?;
        if self.colliders.len() >= self.config.max_colliders {
            warn!("Collider capacity of {} exhausted", self.config.max_colliders);
            return Err(PhysicsError::ColliderCapacityExhausted {
                limit: self.config.max_colliders,
            });
        }

        let key = self.colliders.insert(Collider::from_desc(&desc, body_key));
        let body = self.body_mut(body_key)?;
        body.colliders.push(key);
        body.mark_mass_dirty();
        let active = body.is_active();
        self.refresh_mass(body_key);
        if active {
            self.insert_proxy(key);
        }
        debug!("Attached collider {} to body {:?}", key.id(), body_key);
        Ok(key)
    }

    /// Detach and destroy a collider owned by `body_key`
    pub fn remove_collider(&mut self, body_key: BodyKey, key: ColliderKey) -> Result<Collider, PhysicsError> {
        self.owned_collider(body_key, key)?;
        self.contact_manager
            .remove_contacts_of_collider(key, &mut self.bodies, &self.colliders);
        self.remove_proxy(key);

        let collider = self.colliders.remove(key).ok_or(PhysicsError::ColliderNotFound(key))?;
        let body = self.body_mut(body_key)?;
        body.colliders.retain(|&c| c != key);
        body.mark_mass_dirty();
        body.wake();
        self.refresh_mass(body_key);
        debug!("Detached collider {} from body {:?}", key.id(), body_key);
        Ok(collider)
    }

    pub fn get_collider(&self, key: ColliderKey) -> Option<&Collider> {
        self.colliders.get(key)
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    /// World transform of a collider
    pub fn collider_world_transform(&self, key: ColliderKey) -> Option<Transform4> {
        let collider = self.colliders.get(key)?;
        let body = self.bodies.get(collider.body)?;
        Some(collider.world_transform(body.transform()))
    }

    fn owned_collider(&self, body: BodyKey, key: ColliderKey) -> Result<&Collider, PhysicsError> {
        if !self.bodies.contains_key(body) {
            return Err(PhysicsError::BodyNotFound(body));
        }
        let collider = self.colliders.get(key).ok_or(PhysicsError::ColliderNotFound(key))?;
        if collider.body != body {
            return Err(PhysicsError::ColliderNotOwned { collider: key, body });
        }
        Ok(collider)
    }

    fn collider_mut(&mut self, key: ColliderKey) -> Result<&mut Collider, PhysicsError> {
        self.colliders.get_mut(key).ok_or(PhysicsError::ColliderNotFound(key))
    }

    pub fn set_collider_density(&mut self, key: ColliderKey, density: f32) -> Result<(), PhysicsError> {
        validate_material(density, 0.0, 0.0)?;
        let collider = self.collider_mut(key)?;
        collider.material.density = density;
        let body_key = collider.body;
        if let Some(body) = self.bodies.get_mut(body_key) {
            body.mark_mass_dirty();
        }
        self.refresh_mass(body_key);
        Ok(())
    }

    pub fn set_collider_friction(&mut self, key: ColliderKey, friction: f32) -> Result<(), PhysicsError> {
        validate_material(0.0, friction, 0.0)?;
        self.collider_mut(key)?.material.friction = friction;
        Ok(())
    }

    pub fn set_collider_restitution(&mut self, key: ColliderKey, restitution: f32) -> Result<(), PhysicsError> {
        validate_material(0.0, 0.0, restitution)?;
        self.collider_mut(key)?.material.restitution = restitution;
        Ok(())
    }

    /// Turn a collider into a sensor or back.
    ///
    /// Existing contacts are dropped so that the pair is re-filtered.
    pub fn set_collider_sensor(&mut self, key: ColliderKey, sensor: bool) -> Result<(), PhysicsError> {
        if self.collider_mut(key)?.sensor == sensor {
            return Ok(());
        }
        self.contact_manager
            .remove_contacts_of_collider(key, &mut self.bodies, &self.colliders);
        self.collider_mut(key)?.sensor = sensor;
        self.refresh_proxy(key);
        Ok(())
    }

    pub fn set_collider_tag(&mut self, key: ColliderKey, tag: u64) -> Result<(), PhysicsError> {
        self.collider_mut(key)?.tag = tag;
        Ok(())
    }

    /// Move a collider relative to its body
    pub fn set_collider_local_transform(&mut self, key: ColliderKey, local: Transform4) -> Result<(), PhysicsError> {
        let collider = self.collider_mut(key)?;
        collider.set_local_transform(local);
        let body_key = collider.body;
        if let Some(body) = self.bodies.get_mut(body_key) {
            body.mark_mass_dirty();
            body.wake();
        }
        self.refresh_mass(body_key);
        self.sync_body_proxies(body_key);
        Ok(())
    }

    /// Recompute mass data flagged dirty, so impulses applied before the
    /// next step already see the new mass
    fn refresh_mass(&mut self, key: BodyKey) {
        if let Some(body) = self.bodies.get_mut(key) {
            if body.flags.contains(BodyFlags::DIRTY_MASS) {
                body.calculate_mass_data(&self.colliders);
            }
        }
    }

    // --- Broadphase bookkeeping -----------------------------------------

    fn collider_aabb(&self, key: ColliderKey) -> Option<Bounds4> {
        let collider = self.colliders.get(key)?;
        let body = self.bodies.get(collider.body)?;
        Some(collider.shape.aabb(&collider.world_transform(body.transform())))
    }

    fn insert_proxy(&mut self, key: ColliderKey) {
        let Some(aabb) = self.collider_aabb(key) else {
            return;
        };
        if let Some(collider) = self.colliders.get_mut(key) {
            if collider.proxy.is_none() {
                collider.proxy = Some(self.contact_manager.broadphase.insert_proxy(aabb, key));
            }
        }
    }

    fn remove_proxy(&mut self, key: ColliderKey) {
        if let Some(proxy) = self.colliders.get_mut(key).and_then(|c| c.proxy.take()) {
            self.contact_manager.broadphase.remove_proxy(proxy);
        }
    }

    /// Re-insert a proxy so the broadphase reports its pairs again
    fn refresh_proxy(&mut self, key: ColliderKey) {
        let had_proxy = self.colliders.get(key).is_some_and(|c| c.proxy.is_some());
        if had_proxy {
            self.remove_proxy(key);
            self.insert_proxy(key);
        }
    }

    fn sync_body_proxies(&mut self, key: BodyKey) {
        let Some(body) = self.bodies.get(key) else {
            return;
        };
        for &collider_key in &body.colliders {
            let Some(collider) = self.colliders.get(collider_key) else {
                continue;
            };
            if let Some(proxy) = collider.proxy {
                let aabb = collider.shape.aabb(&collider.world_transform(body.transform()));
                self.contact_manager.broadphase.update_proxy(proxy, aabb);
            }
        }
    }

    // --- Contacts -------------------------------------------------------

    pub fn contacts(&self) -> impl Iterator<Item = (ContactKey, &Contact)> {
        self.contact_manager.contacts()
    }

    pub fn contact_count(&self) -> usize {
        self.contact_manager.contact_count()
    }

    pub fn get_contact(&self, key: ContactKey) -> Option<&Contact> {
        self.contact_manager.get(key)
    }

    /// The contact between two colliders, if one is tracked
    pub fn find_contact(&self, a: ColliderKey, b: ColliderKey) -> Option<&Contact> {
        self.contact_manager.find(a, b).and_then(|key| self.contact_manager.get(key))
    }

    /// Broadphase proxy count, equal to the number of colliders on active bodies
    pub fn proxy_count(&self) -> usize {
        self.contact_manager.broadphase().proxy_count()
    }

    /// Structural self-check of the broadphase tree
    pub fn validate_broadphase(&self) -> Result<(), String> {
        self.contact_manager.broadphase().tree().validate()
    }

    // --- Stepping -------------------------------------------------------

    /// Step the physics simulation forward by dt seconds
    ///
    /// The delta is clamped to `max_time_step`. This performs:
    /// 1. Narrow-phase refresh of every contact, firing begin/end events
    /// 2. Island construction over touching, non-sensor contacts
    /// 3. Per island: force integration, impulse solve, position integration, sleep
    /// 4. Broadphase refit and new contact discovery; forces are cleared
    pub fn step(&mut self, dt: f32) {
        // checked before clamping: `NaN.min(x)` is `x`
        if dt.is_nan() || dt <= 0.0 {
            return;
        }
        let dt = dt.min(self.config.max_time_step);

        // pairs from colliders added or teleported since the last step
        self.contact_manager.find_new_contacts(&mut self.bodies, &self.colliders);
        self.contact_manager.test_collisions(&mut self.bodies, &self.colliders);

        self.solve_islands(dt);

        let escaped = std::mem::take(&mut self.out_of_bounds);
        for &key in &escaped {
            warn!("Body {:?} left the world bounds and was deactivated", key);
            let _ = self.set_body_active(key, false);
        }
        self.out_of_bounds = escaped;
        self.out_of_bounds.clear();

        self.sync_proxies();
        self.contact_manager.find_new_contacts(&mut self.bodies, &self.colliders);

        for body in self.bodies.values_mut() {
            body.clear_forces();
        }
    }

    fn solve_islands(&mut self, dt: f32) {
        self.seeds.clear();
        self.seeds.extend(self.bodies.keys());

        for i in 0..self.seeds.len() {
            let seed = self.seeds[i];
            let Some(body) = self.bodies.get_mut(seed) else {
                continue;
            };
            if body.flags.contains(BodyFlags::ISLAND) || !body.is_awake() || !body.is_active() || body.is_static() {
                continue;
            }

            self.island.clear();
            self.stack.clear();
            body.flags |= BodyFlags::ISLAND;
            self.stack.push(seed);

            // depth-first walk over touching contacts, with an explicit stack
            while let Some(key) = self.stack.pop() {
                let Some(body) = self.bodies.get_mut(key) else {
                    continue;
                };
                self.island.add_body(key, body);
                body.wake();
                if body.is_static() {
                    continue;
                }

                for e in 0..body.edges.len() {
                    let edge = self.bodies[key].edges[e];
                    let Some(contact) = self.contact_manager.get_mut(edge.contact) else {
                        continue;
                    };
                    if contact.flags.contains(ContactFlags::ISLAND) || !contact.is_colliding() || contact.sensor {
                        continue;
                    }
                    contact.flags |= ContactFlags::ISLAND;
                    self.island.add_contact(edge.contact);

                    let Some(other) = self.bodies.get_mut(edge.other) else {
                        continue;
                    };
                    if other.flags.contains(BodyFlags::ISLAND) {
                        continue;
                    }
                    other.flags |= BodyFlags::ISLAND;
                    self.stack.push(edge.other);
                }
            }

            self.island.solve(
                &mut self.bodies,
                self.contact_manager.contacts_mut(),
                &mut self.solver,
                &self.config,
                dt,
                &mut self.out_of_bounds,
            );

            // static bodies may join several islands
            for &key in &self.island.bodies {
                if let Some(body) = self.bodies.get_mut(key) {
                    if body.is_static() {
                        body.flags.remove(BodyFlags::ISLAND);
                    }
                }
            }
        }

        // membership only lasts for this pass
        for body in self.bodies.values_mut() {
            body.flags.remove(BodyFlags::ISLAND);
        }
        for (_, contact) in self.contact_manager.contacts_mut().iter_mut() {
            contact.flags.remove(ContactFlags::ISLAND);
        }
    }

    /// Refit the proxies of every awake, active body
    fn sync_proxies(&mut self) {
        for body in self.bodies.values() {
            if !body.is_awake() || !body.is_active() {
                continue;
            }
            for &collider_key in &body.colliders {
                let Some(collider) = self.colliders.get(collider_key) else {
                    continue;
                };
                if let Some(proxy) = collider.proxy {
                    let aabb = collider.shape.aabb(&collider.world_transform(body.transform()));
                    self.contact_manager.broadphase.update_proxy(proxy, aabb);
                }
            }
        }
    }

    // --- Queries --------------------------------------------------------

    /// Closest collider hit by the ray; a miss returns [`RaycastHit::miss`]
    pub fn raycast(&self, ray: &Ray) -> RaycastHit {
        let mut hit = RaycastHit::miss();
        if ray.direction == Vec4::ZERO {
            return hit;
        }
        let bodies = &self.bodies;
        let colliders = &self.colliders;
        self.contact_manager
            .broadphase()
            .raycast(ray.start, ray.direction, ray.max_toi, |key, best| {
                let collider = colliders.get(key)?;
                let body = bodies.get(collider.body)?;
                let transform = collider.world_transform(body.transform());
                let (toi, normal) = collider.shape.raycast(&transform, ray.start, ray.direction, best)?;
                hit = RaycastHit {
                    collider: key,
                    toi,
                    normal,
                    point: ray.point_at(toi),
                };
                Some(toi)
            });
        hit
    }

    /// Visit every collider whose fat bounds overlap `aabb`; return false to stop
    pub fn query_aabb<F>(&self, aabb: &Bounds4, callback: F)
    where
        F: FnMut(ColliderKey) -> bool,
    {
        self.contact_manager.broadphase().query(aabb, callback);
    }

    /// Visit every collider containing `point`; return false to stop
    pub fn query_point<F>(&self, point: Vec4, mut callback: F)
    where
        F: FnMut(ColliderKey) -> bool,
    {
        let point_bounds = Bounds4::new(point, point);
        self.contact_manager.broadphase().query(&point_bounds, |key| {
            let Some(collider) = self.colliders.get(key) else {
                return true;
            };
            let Some(body) = self.bodies.get(collider.body) else {
                return true;
            };
            if collider.shape.contains_point(&collider.world_transform(body.transform()), point) {
                callback(key)
            } else {
                true
            }
        });
    }
}

fn validate_material(density: f32, friction: f32, restitution: f32) -> Result<(), PhysicsError> {
    let ok = |v: f32| v.is_finite() && v >= 0.0;
    if !ok(density) || !ok(friction) || !ok(restitution) {
        return Err(PhysicsError::InvalidShape(format!(
            "material values must be finite and non-negative, got density {} friction {} restitution {}",
            density, friction, restitution
        )));
    }
    Ok(())
}
