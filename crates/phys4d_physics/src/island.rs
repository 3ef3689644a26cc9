//! Islands: groups of bodies connected through touching contacts, solved
//! and put to sleep together

use log::{debug, trace};
use phys4d_math::{mat4, Bivec4, Vec4};
use slotmap::SlotMap;

use crate::body::{BodyFlags, BodyKey, RigidBody4D};
use crate::config::PhysicsConfig;
use crate::contact::{Contact, ContactKey};
use crate::contact_solver::ContactSolver;

/// Working velocity of one island body
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VelocityState {
    pub v: Vec4,
    pub w: Bivec4,
}

/// Bodies and contacts of one connected group
///
/// Static bodies may appear as leaves; they never propagate the search.
#[derive(Debug, Default)]
pub(crate) struct Island {
    pub bodies: Vec<BodyKey>,
    pub contacts: Vec<ContactKey>,
    velocities: Vec<VelocityState>,
}

impl Island {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.contacts.clear();
        self.velocities.clear();
    }

    pub fn add_body(&mut self, key: BodyKey, body: &mut RigidBody4D) {
        body.island_index = self.bodies.len();
        self.bodies.push(key);
    }

    pub fn add_contact(&mut self, key: ContactKey) {
        self.contacts.push(key);
    }

    /// Advance every body of the island by `dt`.
    ///
    /// Bodies whose center leaves the world extent are appended to
    /// `out_of_bounds` for the caller to deactivate.
    pub fn solve(
        &mut self,
        bodies: &mut SlotMap<BodyKey, RigidBody4D>,
        contacts: &SlotMap<ContactKey, Contact>,
        solver: &mut ContactSolver,
        config: &PhysicsConfig,
        dt: f32,
        out_of_bounds: &mut Vec<BodyKey>,
    ) {
        self.integrate_velocities(bodies, config, dt);

        solver.pre_solve(&self.contacts, contacts, bodies, &self.velocities, config, dt);
        for _ in 0..config.iterations {
            solver.solve(&mut self.velocities);
        }
        trace!(
            "Island of {} bodies solved {} constraints",
            self.bodies.len(),
            solver.constraint_count()
        );

        self.integrate_positions(bodies, config, dt, out_of_bounds);

        if config.allow_sleep {
            self.update_sleep(bodies, config, dt);
        }
    }

    fn integrate_velocities(&mut self, bodies: &mut SlotMap<BodyKey, RigidBody4D>, config: &PhysicsConfig, dt: f32) {
        self.velocities.clear();
        for &key in &self.bodies {
            let Some(body) = bodies.get_mut(key) else {
                self.velocities.push(VelocityState::default());
                continue;
            };
            if body.is_dynamic() {
                body.force += config.gravity * (body.mass * body.gravity_scale);
                body.update_world_inertia();

                body.linear_velocity += body.force * (body.inv_mass * dt);
                body.angular_velocity += body.inv_inertia_world.mul_bivec(body.torque) * dt;

                body.linear_velocity *= (-body.linear_damping * dt).exp();
                body.angular_velocity *= (-body.angular_damping * dt).exp();
            }
            self.velocities.push(VelocityState {
                v: body.linear_velocity,
                w: body.angular_velocity,
            });
        }
    }

    fn integrate_positions(
        &mut self,
        bodies: &mut SlotMap<BodyKey, RigidBody4D>,
        config: &PhysicsConfig,
        dt: f32,
        out_of_bounds: &mut Vec<BodyKey>,
    ) {
        for (&key, state) in self.bodies.iter().zip(&self.velocities) {
            let Some(body) = bodies.get_mut(key) else {
                continue;
            };
            if body.is_static() {
                continue;
            }
            body.linear_velocity = state.v;
            body.angular_velocity = state.w;

            body.world_center += state.v * dt;
            let rotation = mat4::orthonormalize(mat4::mul(mat4::from_bivector(state.w, dt), body.transform.rotation));
            body.transform.rotation = rotation;
            body.transform.position = body.world_center - mat4::transform(rotation, body.local_center);

            if body.world_center.abs().max_element() > config.world_extent || !body.world_center.is_finite() {
                out_of_bounds.push(key);
            }
        }
    }

    /// Put the whole island to sleep once every body has been slow for long enough
    fn update_sleep(&mut self, bodies: &mut SlotMap<BodyKey, RigidBody4D>, config: &PhysicsConfig, dt: f32) {
        let mut min_sleep_time = f32::MAX;
        for &key in &self.bodies {
            let Some(body) = bodies.get_mut(key) else {
                continue;
            };
            if body.is_static() {
                continue;
            }
            let slow = body.linear_velocity.length_squared() <= config.sleep_linear
                && body.angular_velocity.length_squared() <= config.sleep_angular;
            if !slow || !body.flags.contains(BodyFlags::ALLOW_SLEEP) {
                body.sleep_time = 0.0;
                min_sleep_time = 0.0;
            } else {
                body.sleep_time += dt;
                min_sleep_time = min_sleep_time.min(body.sleep_time);
            }
        }

        if min_sleep_time > config.sleep_time {
            debug!("Island of {} bodies going to sleep", self.bodies.len());
            for &key in &self.bodies {
                if let Some(body) = bodies.get_mut(key) {
                    body.set_to_sleep();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyDesc;
    use crate::collider::{Collider, ColliderDesc, ColliderKey};

    const EPSILON: f32 = 1e-4;

    fn dynamic_body(desc: BodyDesc) -> RigidBody4D {
        let colliders: SlotMap<ColliderKey, Collider> = SlotMap::with_key();
        let mut body = RigidBody4D::new(&desc);
        body.calculate_mass_data(&colliders);
        body
    }

    fn solve_alone(body: RigidBody4D, config: &PhysicsConfig, dt: f32) -> (SlotMap<BodyKey, RigidBody4D>, BodyKey, Vec<BodyKey>) {
        let mut bodies: SlotMap<BodyKey, RigidBody4D> = SlotMap::with_key();
        let key = bodies.insert(body);
        let contacts: SlotMap<ContactKey, Contact> = SlotMap::with_key();
        let mut island = Island::new();
        island.add_body(key, &mut bodies[key]);
        let mut solver = ContactSolver::new();
        let mut out = Vec::new();
        island.solve(&mut bodies, &contacts, &mut solver, config, dt, &mut out);
        (bodies, key, out)
    }

    #[test]
    fn test_gravity_integration() {
        let config = PhysicsConfig::default();
        let (bodies, key, _) = solve_alone(dynamic_body(BodyDesc::dynamic()), &config, 0.1);
        let body = &bodies[key];
        assert!((body.linear_velocity().y + 0.98).abs() < EPSILON);
        assert!((body.position().y + 0.098).abs() < EPSILON);
    }

    #[test]
    fn test_linear_damping_is_exponential() {
        let config = PhysicsConfig::zero_gravity();
        let body = dynamic_body(
            BodyDesc::dynamic()
                .with_linear_velocity(Vec4::X)
                .with_damping(2.0, 0.0),
        );
        let (bodies, key, _) = solve_alone(body, &config, 0.05);
        assert!((bodies[key].linear_velocity().x - (-0.1f32).exp()).abs() < EPSILON);
    }

    #[test]
    fn test_kinematic_moves_without_gravity() {
        let config = PhysicsConfig::default();
        let body = dynamic_body(BodyDesc::kinematic().with_linear_velocity(Vec4::new(1.0, 0.0, 0.0, 0.0)));
        let (bodies, key, _) = solve_alone(body, &config, 0.5);
        assert_eq!(bodies[key].linear_velocity(), Vec4::X);
        assert!((bodies[key].position().x - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_slow_island_falls_asleep() {
        let config = PhysicsConfig {
            sleep_time: 0.1,
            ..PhysicsConfig::zero_gravity()
        };
        let mut bodies: SlotMap<BodyKey, RigidBody4D> = SlotMap::with_key();
        let key = bodies.insert(dynamic_body(BodyDesc::dynamic()));
        let contacts: SlotMap<ContactKey, Contact> = SlotMap::with_key();
        let mut solver = ContactSolver::new();
        let mut island = Island::new();
        let mut out = Vec::new();
        for _ in 0..3 {
            island.clear();
            island.add_body(key, &mut bodies[key]);
            island.solve(&mut bodies, &contacts, &mut solver, &config, 0.05, &mut out);
        }
        assert!(!bodies[key].is_awake());
    }

    #[test]
    fn test_sleep_forbidden_keeps_island_awake() {
        let config = PhysicsConfig {
            sleep_time: 0.1,
            ..PhysicsConfig::zero_gravity()
        };
        let body = dynamic_body(BodyDesc::dynamic().with_allow_sleep(false));
        let mut bodies: SlotMap<BodyKey, RigidBody4D> = SlotMap::with_key();
        let key = bodies.insert(body);
        let contacts: SlotMap<ContactKey, Contact> = SlotMap::with_key();
        let mut solver = ContactSolver::new();
        let mut island = Island::new();
        let mut out = Vec::new();
        for _ in 0..10 {
            island.clear();
            island.add_body(key, &mut bodies[key]);
            island.solve(&mut bodies, &contacts, &mut solver, &config, 0.05, &mut out);
        }
        assert!(bodies[key].is_awake());
    }

    #[test]
    fn test_rotation_stays_orthonormal() {
        let config = PhysicsConfig::zero_gravity();
        let body = dynamic_body(
            BodyDesc::dynamic()
                .with_angular_velocity(Bivec4::new(1.0, 0.5, 0.0, 0.0, 2.0, 0.3))
                .with_damping(0.0, 0.0),
        );
        let (bodies, key, _) = solve_alone(body, &config, 0.05);
        let r = bodies[key].rotation();
        let rtr = mat4::mul(mat4::transpose(r), r);
        for (i, col) in rtr.iter().enumerate() {
            for (j, v) in col.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((v - expected).abs() < EPSILON);
            }
        }
    }

    #[test]
    fn test_escaping_body_is_reported() {
        let config = PhysicsConfig {
            world_extent: 10.0,
            ..PhysicsConfig::zero_gravity()
        };
        let body = dynamic_body(BodyDesc::dynamic().with_position(Vec4::new(9.99, 0.0, 0.0, 0.0)).with_linear_velocity(Vec4::X));
        let (_, key, out) = solve_alone(body, &config, 0.05);
        assert_eq!(out, vec![key]);
    }
}
