//! Sequential-impulse contact solver
//!
//! Impulses start from zero every step. Each pass visits every contact
//! constraint of the island and resolves, per manifold point, the normal
//! constraint and then up to three friction directions spanning the
//! contact hyperplane.

use phys4d_math::{Bivec4, Mat6, Vec4};
use slotmap::SlotMap;

use crate::body::{BodyKey, RigidBody4D};
use crate::config::PhysicsConfig;
use crate::contact::{Contact, ContactKey};
use crate::island::VelocityState;

#[derive(Clone, Copy, Debug, Default)]
struct PointState {
    ra: Vec4,
    rb: Vec4,
    bias: f32,
    normal_mass: f32,
    tangent_mass: [f32; 3],
    normal_impulse: f32,
    tangent_impulse: [f32; 3],
}

#[derive(Clone, Copy, Debug)]
struct ConstraintState {
    a: usize,
    b: usize,
    normal: Vec4,
    tangents: [Vec4; 3],
    friction: f32,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_inertia_a: Mat6,
    inv_inertia_b: Mat6,
    first: usize,
    count: usize,
}

/// Three unit vectors orthogonal to `n` and to each other.
///
/// Built by Gram-Schmidt over the coordinate axes, skipping the axis most
/// aligned with `n`.
pub fn tangent_basis(n: Vec4) -> [Vec4; 3] {
    let skip = n.max_abs_axis();
    let mut out = [Vec4::ZERO; 3];
    let mut k = 0;
    for (axis, &e) in Vec4::AXES.iter().enumerate() {
        if axis == skip {
            continue;
        }
        let mut t = e - n * n[axis];
        for prev in &out[..k] {
            t -= *prev * t.dot(*prev);
        }
        out[k] = t.normalized();
        k += 1;
    }
    out
}

/// Inverse of the effective mass along `dir` at lever arms `ra`, `rb`
fn effective_mass(c: &ConstraintState, ra: Vec4, rb: Vec4, dir: Vec4) -> f32 {
    let la = Bivec4::wedge(ra, dir);
    let lb = Bivec4::wedge(rb, dir);
    let k = c.inv_mass_a
        + c.inv_mass_b
        + la.dot(c.inv_inertia_a.mul_bivec(la))
        + lb.dot(c.inv_inertia_b.mul_bivec(lb));
    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

fn relative_velocity(a: &VelocityState, b: &VelocityState, ra: Vec4, rb: Vec4) -> Vec4 {
    b.v + b.w.cross(rb) - a.v - a.w.cross(ra)
}

/// Apply an impulse `p` acting on `b` (and `-p` on `a`)
fn apply_impulse(c: &ConstraintState, a: &mut VelocityState, b: &mut VelocityState, ra: Vec4, rb: Vec4, p: Vec4) {
    a.v -= p * c.inv_mass_a;
    a.w -= c.inv_inertia_a.mul_bivec(Bivec4::wedge(ra, p));
    b.v += p * c.inv_mass_b;
    b.w += c.inv_inertia_b.mul_bivec(Bivec4::wedge(rb, p));
}

/// Reusable constraint buffers, cleared per island
#[derive(Debug, Default)]
pub(crate) struct ContactSolver {
    constraints: Vec<ConstraintState>,
    points: Vec<PointState>,
    enable_friction: bool,
}

impl ContactSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build constraints for an island's contacts from the current body state
    pub fn pre_solve(
        &mut self,
        island_contacts: &[ContactKey],
        contacts: &SlotMap<ContactKey, Contact>,
        bodies: &SlotMap<BodyKey, RigidBody4D>,
        velocities: &[VelocityState],
        config: &PhysicsConfig,
        dt: f32,
    ) {
        self.constraints.clear();
        self.points.clear();
        self.enable_friction = config.enable_friction;
        let inv_dt = if dt > 0.0 { 1.0 / dt } else { 0.0 };

        for &key in island_contacts {
            let Some(contact) = contacts.get(key) else {
                continue;
            };
            let (Some(body_a), Some(body_b)) = (bodies.get(contact.body_a), bodies.get(contact.body_b)) else {
                continue;
            };
            let normal = contact.manifold.normal;
            let mut c = ConstraintState {
                a: body_a.island_index,
                b: body_b.island_index,
                normal,
                tangents: tangent_basis(normal),
                friction: contact.friction,
                inv_mass_a: body_a.inv_mass,
                inv_mass_b: body_b.inv_mass,
                inv_inertia_a: body_a.inv_inertia_world,
                inv_inertia_b: body_b.inv_inertia_world,
                first: self.points.len(),
                count: 0,
            };

            let (va, vb) = (&velocities[c.a], &velocities[c.b]);
            for point in contact.manifold.points() {
                let ra = point.position - body_a.world_center;
                let rb = point.position - body_b.world_center;

                let mut state = PointState {
                    ra,
                    rb,
                    normal_mass: effective_mass(&c, ra, rb, normal),
                    ..PointState::default()
                };
                for (i, t) in c.tangents.iter().enumerate() {
                    state.tangent_mass[i] = effective_mass(&c, ra, rb, *t);
                }

                state.bias = config.baumgarte * inv_dt * (point.depth - config.penetration_slop).max(0.0);
                let vn = relative_velocity(va, vb, ra, rb).dot(normal);
                if vn < -config.restitution_threshold {
                    state.bias += -contact.restitution * vn;
                }

                self.points.push(state);
                c.count += 1;
            }
            self.constraints.push(c);
        }
    }

    /// One sequential pass over every constraint
    pub fn solve(&mut self, velocities: &mut [VelocityState]) {
        for c in &self.constraints {
            let mut va = velocities[c.a];
            let mut vb = velocities[c.b];

            for p in &mut self.points[c.first..c.first + c.count] {
                // normal
                let vn = relative_velocity(&va, &vb, p.ra, p.rb).dot(c.normal);
                let lambda = p.normal_mass * (-vn + p.bias);
                let old = p.normal_impulse;
                p.normal_impulse = (old + lambda).max(0.0);
                let lambda = p.normal_impulse - old;
                apply_impulse(c, &mut va, &mut vb, p.ra, p.rb, c.normal * lambda);

                if !self.enable_friction {
                    continue;
                }
                let max_friction = c.friction * p.normal_impulse;
                for (i, t) in c.tangents.iter().enumerate() {
                    let vt = relative_velocity(&va, &vb, p.ra, p.rb).dot(*t);
                    let lambda = -p.tangent_mass[i] * vt;
                    let old = p.tangent_impulse[i];
                    p.tangent_impulse[i] = (old + lambda).clamp(-max_friction, max_friction);
                    let lambda = p.tangent_impulse[i] - old;
                    apply_impulse(c, &mut va, &mut vb, p.ra, p.rb, *t * lambda);
                }
            }

            velocities[c.a] = va;
            velocities[c.b] = vb;
        }
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl ContactSolver {
        fn total_normal_impulse(&self) -> f32 {
            self.points.iter().map(|p| p.normal_impulse).sum()
        }
    }

    const EPSILON: f32 = 1e-5;

    fn constraint(inv_mass_a: f32, inv_mass_b: f32) -> ConstraintState {
        let n = Vec4::new(0.0, 1.0, 0.0, 0.0);
        ConstraintState {
            a: 0,
            b: 1,
            normal: n,
            tangents: tangent_basis(n),
            friction: 0.5,
            inv_mass_a,
            inv_mass_b,
            inv_inertia_a: Mat6::ZERO,
            inv_inertia_b: Mat6::ZERO,
            first: 0,
            count: 1,
        }
    }

    #[test]
    fn test_tangent_basis_is_orthonormal() {
        for n in [
            Vec4::Y,
            Vec4::new(1.0, 2.0, -3.0, 0.5).normalized(),
            Vec4::new(0.0, 0.0, 0.0, -1.0),
        ] {
            let t = tangent_basis(n);
            for i in 0..3 {
                assert!((t[i].length() - 1.0).abs() < EPSILON);
                assert!(t[i].dot(n).abs() < EPSILON);
                for j in (i + 1)..3 {
                    assert!(t[i].dot(t[j]).abs() < EPSILON);
                }
            }
        }
    }

    #[test]
    fn test_effective_mass_of_point_masses() {
        let c = constraint(1.0, 0.0);
        let m = effective_mass(&c, Vec4::ZERO, Vec4::ZERO, c.normal);
        assert!((m - 1.0).abs() < EPSILON);

        let both_static = constraint(0.0, 0.0);
        assert_eq!(effective_mass(&both_static, Vec4::ZERO, Vec4::ZERO, Vec4::Y), 0.0);
    }

    #[test]
    fn test_normal_impulse_stops_approach() {
        // body b (dynamic, index 1) falls onto static a along the normal
        let mut solver = ContactSolver::new();
        let c = constraint(0.0, 1.0);
        solver.constraints.push(c);
        solver.points.push(PointState {
            normal_mass: effective_mass(&c, Vec4::ZERO, Vec4::ZERO, c.normal),
            tangent_mass: [1.0; 3],
            ..PointState::default()
        });
        solver.enable_friction = true;

        let mut velocities = [
            VelocityState::default(),
            VelocityState {
                v: Vec4::new(2.0, -3.0, 0.0, 0.0),
                w: Bivec4::ZERO,
            },
        ];
        solver.solve(&mut velocities);

        assert!(velocities[1].v.y.abs() < EPSILON);
        // friction is capped at mu * normal impulse = 0.5 * 3
        assert!((velocities[1].v.x - 0.5).abs() < EPSILON);
        assert!((solver.total_normal_impulse() - 3.0).abs() < EPSILON);
        assert_eq!(velocities[0].v, Vec4::ZERO);
    }

    #[test]
    fn test_separating_contact_applies_no_impulse() {
        let mut solver = ContactSolver::new();
        let c = constraint(0.0, 1.0);
        solver.constraints.push(c);
        solver.points.push(PointState {
            normal_mass: 1.0,
            ..PointState::default()
        });
        let mut velocities = [
            VelocityState::default(),
            VelocityState {
                v: Vec4::new(0.0, 2.0, 0.0, 0.0),
                w: Bivec4::ZERO,
            },
        ];
        solver.solve(&mut velocities);
        assert_eq!(velocities[1].v.y, 2.0);
        assert_eq!(solver.total_normal_impulse(), 0.0);
    }
}
