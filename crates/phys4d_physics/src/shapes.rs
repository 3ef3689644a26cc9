//! Collision shapes for 4D physics
//!
//! The closed set of convex primitives a collider can carry. All shapes are
//! centered on their local origin; a capsule's axis is its local Y axis.

use std::f32::consts::PI;

use phys4d_math::{mat4, Bounds4, Mat4, Mat6, Transform4, Vec4};

use crate::error::PhysicsError;

/// An oriented 4D box (tesseract when all half-extents are equal)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Box4D {
    pub half_extents: Vec4,
}

/// A 4D ball
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere4D {
    pub radius: f32,
}

/// A 4D capsule: every point within `radius` of the segment from
/// `-half_length` to `+half_length` along local Y
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Capsule4D {
    pub radius: f32,
    pub half_length: f32,
}

/// Shape geometry attached to a collider
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Box(Box4D),
    Sphere(Sphere4D),
    Capsule(Capsule4D),
}

/// Mass and second moment of a shape about its own center, in shape space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MassProperties {
    pub mass: f32,
    /// `Σ m r rᵀ` about the shape center (diagonal for every primitive)
    pub second_moment: Mat4,
}

impl MassProperties {
    /// 6x6 inertia tensor about the shape center
    pub fn inertia(&self) -> Mat6 {
        Mat6::inertia_from_second_moment(self.second_moment)
    }
}

impl Capsule4D {
    /// World-space end points of the capsule's core segment
    pub fn segment(&self, tx: &Transform4) -> (Vec4, Vec4) {
        let axis = tx.axis(1) * self.half_length;
        (tx.position - axis, tx.position + axis)
    }
}

impl Shape {
    /// Ordering used to canonicalize narrow-phase dispatch
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Shape::Box(_) => 0,
            Shape::Sphere(_) => 1,
            Shape::Capsule(_) => 2,
        }
    }

    /// Reject non-finite or non-positive dimensions
    pub fn validate(&self) -> Result<(), PhysicsError> {
        let ok = |v: f32| v.is_finite() && v > 0.0;
        match self {
            Shape::Box(b) => {
                if !(0..4).all(|i| ok(b.half_extents[i])) {
                    return Err(PhysicsError::InvalidShape(format!(
                        "box half-extents must be positive, got {:?}",
                        b.half_extents
                    )));
                }
            }
            Shape::Sphere(s) => {
                if !ok(s.radius) {
                    return Err(PhysicsError::InvalidShape(format!(
                        "sphere radius must be positive, got {}",
                        s.radius
                    )));
                }
            }
            Shape::Capsule(c) => {
                if !ok(c.radius) || !(c.half_length.is_finite() && c.half_length >= 0.0) {
                    return Err(PhysicsError::InvalidShape(format!(
                        "capsule needs radius > 0 and half_length >= 0, got {} / {}",
                        c.radius, c.half_length
                    )));
                }
            }
        }
        Ok(())
    }

    /// Mass and second moment at the given density
    pub fn mass_properties(&self, density: f32) -> MassProperties {
        match self {
            Shape::Box(b) => {
                let e = b.half_extents;
                let mass = density * 16.0 * e.x * e.y * e.z * e.w;
                MassProperties {
                    mass,
                    second_moment: mat4::diagonal(e.component_mul(e) * (mass / 3.0)),
                }
            }
            Shape::Sphere(s) => {
                let r = s.radius;
                let mass = density * 0.5 * PI * PI * r.powi(4);
                MassProperties {
                    mass,
                    second_moment: mat4::diagonal(Vec4::splat(mass * r * r / 6.0)),
                }
            }
            Shape::Capsule(c) => {
                let (r, h) = (c.radius, c.half_length);
                // spherinder core (3-ball × segment) and one full 4-ball split into two caps
                let m_core = density * (4.0 / 3.0) * PI * r.powi(3) * 2.0 * h;
                let m_caps = density * 0.5 * PI * PI * r.powi(4);
                let cap_centroid = 16.0 * r / (15.0 * PI);
                let along = m_core * h * h / 3.0
                    + m_caps * (r * r / 6.0 + 2.0 * h * cap_centroid + h * h);
                let across = m_core * r * r / 5.0 + m_caps * r * r / 6.0;
                MassProperties {
                    mass: m_core + m_caps,
                    second_moment: mat4::diagonal(Vec4::new(across, along, across, across)),
                }
            }
        }
    }

    /// Tight world-space bounds
    pub fn aabb(&self, tx: &Transform4) -> Bounds4 {
        match self {
            Shape::Box(b) => {
                let extent = mat4::transform(mat4::abs(tx.rotation), b.half_extents);
                Bounds4::from_center_half_extents(tx.position, extent)
            }
            Shape::Sphere(s) => Bounds4::from_center_half_extents(tx.position, Vec4::splat(s.radius)),
            Shape::Capsule(c) => {
                let (a, b) = c.segment(tx);
                let r = Vec4::splat(c.radius);
                Bounds4::new(a.min_components(b) - r, a.max_components(b) + r)
            }
        }
    }

    /// True when `p` (world space) lies inside or on the shape
    pub fn contains_point(&self, tx: &Transform4, p: Vec4) -> bool {
        match self {
            Shape::Box(b) => {
                let local = tx.inverse_transform_point(p);
                (0..4).all(|i| local[i].abs() <= b.half_extents[i])
            }
            Shape::Sphere(s) => (p - tx.position).length_squared() <= s.radius * s.radius,
            Shape::Capsule(c) => {
                let (a, b) = c.segment(tx);
                let q = closest_point_on_segment(p, a, b);
                (p - q).length_squared() <= c.radius * c.radius
            }
        }
    }

    /// Ray cast against the surface.
    ///
    /// `dir` must be unit length. Returns the hit distance and outward
    /// surface normal. Rays starting inside the shape report no hit.
    pub fn raycast(&self, tx: &Transform4, start: Vec4, dir: Vec4, max_toi: f32) -> Option<(f32, Vec4)> {
        match self {
            Shape::Box(b) => raycast_box(b, tx, start, dir, max_toi),
            Shape::Sphere(s) => raycast_sphere(tx.position, s.radius, start, dir, max_toi),
            Shape::Capsule(c) => raycast_capsule(c, tx, start, dir, max_toi),
        }
    }
}

/// Closest point to `p` on segment `a..b`
pub(crate) fn closest_point_on_segment(p: Vec4, a: Vec4, b: Vec4) -> Vec4 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

fn raycast_box(b: &Box4D, tx: &Transform4, start: Vec4, dir: Vec4, max_toi: f32) -> Option<(f32, Vec4)> {
    let p = tx.inverse_transform_point(start);
    let d = tx.inverse_transform_direction(dir);
    let e = b.half_extents;

    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut enter_axis = 0;
    let mut enter_sign = 0.0;
    for i in 0..4 {
        if d[i].abs() < 1e-9 {
            if p[i].abs() > e[i] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d[i];
        let mut t1 = (-e[i] - p[i]) * inv;
        let mut t2 = (e[i] - p[i]) * inv;
        // entering through the face whose normal opposes the ray
        let sign = -d[i].signum();
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        if t1 > t_enter {
            t_enter = t1;
            enter_axis = i;
            enter_sign = sign;
        }
        t_exit = t_exit.min(t2);
        if t_enter > t_exit {
            return None;
        }
    }

    // a negative entry means the ray started inside
    if t_enter < 0.0 || t_enter > max_toi || enter_sign == 0.0 {
        return None;
    }
    let local_normal = Vec4::AXES[enter_axis] * enter_sign;
    Some((t_enter, tx.transform_direction(local_normal)))
}

fn raycast_sphere(center: Vec4, radius: f32, start: Vec4, dir: Vec4, max_toi: f32) -> Option<(f32, Vec4)> {
    let m = start - center;
    let b = m.dot(dir);
    let c = m.length_squared() - radius * radius;
    if c > 0.0 && b > 0.0 {
        return None;
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    if t < 0.0 || t > max_toi {
        return None;
    }
    let normal = (m + dir * t).try_normalized(1e-12)?;
    Some((t, normal))
}

fn raycast_capsule(c: &Capsule4D, tx: &Transform4, start: Vec4, dir: Vec4, max_toi: f32) -> Option<(f32, Vec4)> {
    let (a, b) = c.segment(tx);
    if (start - closest_point_on_segment(start, a, b)).length_squared() < c.radius * c.radius {
        return None;
    }

    let mut best: Option<(f32, Vec4)> = None;
    let mut keep = |hit: Option<(f32, Vec4)>| {
        if let Some((t, n)) = hit {
            if best.map_or(true, |(bt, _)| t < bt) {
                best = Some((t, n));
            }
        }
    };

    // spherinder side: solve in local space against the axis-perpendicular part
    let p = tx.inverse_transform_point(start);
    let d = tx.inverse_transform_direction(dir);
    let p_perp = Vec4::new(p.x, 0.0, p.z, p.w);
    let d_perp = Vec4::new(d.x, 0.0, d.z, d.w);
    let qa = d_perp.length_squared();
    if qa > 1e-12 {
        let qb = p_perp.dot(d_perp);
        let qc = p_perp.length_squared() - c.radius * c.radius;
        let disc = qb * qb - qa * qc;
        if disc >= 0.0 {
            let t = (-qb - disc.sqrt()) / qa;
            let y = p.y + d.y * t;
            if t >= 0.0 && t <= max_toi && y.abs() <= c.half_length {
                let n = (p_perp + d_perp * t) * (1.0 / c.radius);
                keep(Some((t, tx.transform_direction(n))));
            }
        }
    }

    keep(raycast_sphere(a, c.radius, start, dir, max_toi));
    keep(raycast_sphere(b, c.radius, start, dir, max_toi));
    best
}
