//! 4D rigid-body physics for phys4d
//!
//! This crate provides rigid-body simulation in four spatial dimensions:
//! - Boxes, spheres and capsules attached to bodies as colliders
//! - A dynamic AABB tree broadphase
//! - Separating-axis narrow-phase with hyperface clipping
//! - Persistent contacts with begin/end events and sensors
//! - Islands, a sequential-impulse solver with friction, and sleeping
//! - Ray, AABB and point queries

pub mod body;
pub mod broadphase;
pub mod collide;
pub mod collider;
pub mod config;
pub mod contact;
pub mod contact_manager;
mod contact_solver;
pub mod error;
pub mod filter;
mod island;
pub mod listener;
pub mod material;
pub mod ray;
pub mod shapes;
pub mod world;

// Re-export commonly used types
pub use body::{BodyDesc, BodyFlags, BodyKey, BodyType, ContactEdge, RigidBody4D};
pub use broadphase::{BroadPhase, DynamicTree};
pub use collide::{collide, ClipBuffers, ContactPoint, Manifold, ShapeInstance, MAX_MANIFOLD_POINTS};
pub use collider::{Collider, ColliderDesc, ColliderKey};
pub use config::PhysicsConfig;
pub use contact::{Contact, ContactFlags, ContactKey};
pub use contact_manager::ContactManager;
pub use contact_solver::tangent_basis;
pub use error::PhysicsError;
pub use filter::CollisionLayer;
pub use island::VelocityState;
pub use listener::{ContactEvent, ContactEventType, ContactListener, EventCollector};
pub use material::PhysicsMaterial;
pub use ray::{Ray, RaycastHit};
pub use shapes::{Box4D, Capsule4D, MassProperties, Shape, Sphere4D};
pub use world::PhysicsWorld;
