//! Closest-point collision for spheres and capsules
//!
//! Every pair here reduces to finding the closest points between a point or
//! segment core and the other shape, then comparing the distance with the
//! radius sum. When the cores touch and the separation direction is
//! undefined, the normal falls back to a known axis of the shapes.

use phys4d_math::{Transform4, Vec4};

use super::Manifold;
use crate::shapes::{closest_point_on_segment, Box4D, Capsule4D};

/// Below this separation the direction between cores is treated as undefined
const DEGENERATE_DISTANCE: f32 = 1.0e-6;

/// Segments whose directions differ by less than this (sin²) are parallel
const PARALLEL_TOLERANCE: f32 = 1.0e-4;

/// Capsule axis within this cosine of a box face counts as lying on it
const FLAT_CAPSULE_COSINE: f32 = 0.05;

const GOLDEN_ITERATIONS: usize = 32;

/// Push the contact between a point `pa` on core A and `pb` on core B, each with a radius.
///
/// Returns false without pushing when the radii do not reach.
fn push_cores(pa: Vec4, ra: f32, pb: Vec4, rb: f32, fallback: Vec4, manifold: &mut Manifold) -> bool {
    let delta = pb - pa;
    let dist_sq = delta.length_squared();
    let reach = ra + rb;
    if dist_sq > reach * reach {
        return false;
    }
    let dist = dist_sq.sqrt();
    let normal = if dist > DEGENERATE_DISTANCE {
        delta * (1.0 / dist)
    } else {
        fallback
    };
    if manifold.is_empty() {
        manifold.normal = normal;
    }
    let surface_a = pa + normal * ra;
    let surface_b = pb - normal * rb;
    manifold.push((surface_a + surface_b) * 0.5, reach - dist);
    true
}

pub(crate) fn sphere_sphere(ra: f32, ta: &Transform4, rb: f32, tb: &Transform4, manifold: &mut Manifold) {
    push_cores(ta.position, ra, tb.position, rb, ta.axis(1), manifold);
}

pub(crate) fn sphere_capsule(ra: f32, ta: &Transform4, b: &Capsule4D, tb: &Transform4, manifold: &mut Manifold) {
    let (b0, b1) = b.segment(tb);
    let q = closest_point_on_segment(ta.position, b0, b1);
    // perpendicular to the capsule axis
    let fallback = -tb.axis(0);
    push_cores(ta.position, ra, q, b.radius, fallback, manifold);
}

/// Closest points between segments `p1..q1` and `p2..q2`, as parameters in [0, 1]
fn closest_segment_params(p1: Vec4, q1: Vec4, p2: Vec4, q2: Vec4) -> (f32, f32) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    if a <= DEGENERATE_DISTANCE && e <= DEGENERATE_DISTANCE {
        return (0.0, 0.0);
    }
    if a <= DEGENERATE_DISTANCE {
        return (0.0, (f / e).clamp(0.0, 1.0));
    }
    let c = d1.dot(r);
    if e <= DEGENERATE_DISTANCE {
        return ((-c / a).clamp(0.0, 1.0), 0.0);
    }

    let b = d1.dot(d2);
    let denom = a * e - b * b;
    let mut s = if denom > 0.0 {
        ((b * f - c * e) / denom).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut t = (b * s + f) / e;
    if t < 0.0 {
        t = 0.0;
        s = (-c / a).clamp(0.0, 1.0);
    } else if t > 1.0 {
        t = 1.0;
        s = ((b - c) / a).clamp(0.0, 1.0);
    }
    (s, t)
}

pub(crate) fn capsule_capsule(a: &Capsule4D, ta: &Transform4, b: &Capsule4D, tb: &Transform4, manifold: &mut Manifold) {
    let (a0, a1) = a.segment(ta);
    let (b0, b1) = b.segment(tb);
    let da = a1 - a0;
    let db = b1 - b0;
    let fallback = ta.axis(0);

    let la = da.length_squared();
    let lb = db.length_squared();
    if la > DEGENERATE_DISTANCE && lb > DEGENERATE_DISTANCE {
        let cos = da.dot(db);
        let sin_sq = 1.0 - cos * cos / (la * lb);
        if sin_sq < PARALLEL_TOLERANCE {
            // overlap of b's projection onto a's segment
            let mut t0 = (b0 - a0).dot(da) / la;
            let mut t1 = (b1 - a0).dot(da) / la;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            let t0 = t0.max(0.0);
            let t1 = t1.min(1.0);
            if t1 - t0 > 1.0e-4 {
                let pa0 = a0 + da * t0;
                let pa1 = a0 + da * t1;
                let pb0 = closest_point_on_segment(pa0, b0, b1);
                let pb1 = closest_point_on_segment(pa1, b0, b1);
                // both pairs share one normal taken from the first
                let delta = pb0 - pa0;
                let normal = delta.try_normalized(DEGENERATE_DISTANCE).unwrap_or(fallback);
                let reach = a.radius + b.radius;
                let mut pushed = false;
                for (pa, pb) in [(pa0, pb0), (pa1, pb1)] {
                    let dist = (pb - pa).dot(normal);
                    if dist <= reach {
                        let surface_a = pa + normal * a.radius;
                        let surface_b = pb - normal * b.radius;
                        manifold.push((surface_a + surface_b) * 0.5, reach - dist);
                        pushed = true;
                    }
                }
                if pushed {
                    manifold.normal = normal;
                }
                return;
            }
        }
    }

    let (s, t) = closest_segment_params(a0, a1, b0, b1);
    push_cores(a0 + da * s, a.radius, b0 + db * t, b.radius, fallback, manifold);
}

/// Box-local squared distance from point `p` (box space) to the box
fn box_distance_sq(e: Vec4, p: Vec4) -> f32 {
    let q = p.clamp_components(-e, e);
    (p - q).length_squared()
}

/// Contact between a box and a sphere of radius `r` centered at world point `c`.
///
/// Returns (normal, position, depth) without touching the manifold.
fn box_point_contact(b: &Box4D, tb: &Transform4, c: Vec4, r: f32) -> Option<(Vec4, Vec4, f32)> {
    let e = b.half_extents;
    let local = tb.inverse_transform_point(c);
    let clamped = local.clamp_components(-e, e);
    let delta = local - clamped;
    let dist_sq = delta.length_squared();

    if dist_sq > DEGENERATE_DISTANCE * DEGENERATE_DISTANCE {
        if dist_sq > r * r {
            return None;
        }
        let dist = dist_sq.sqrt();
        let normal = tb.transform_direction(delta * (1.0 / dist));
        let surface_box = tb.transform_point(clamped);
        let surface_sphere = c - normal * r;
        return Some((normal, (surface_box + surface_sphere) * 0.5, r - dist));
    }

    // center inside the box: push out through the nearest face
    let mut axis = 0;
    let mut min_gap = f32::INFINITY;
    for i in 0..4 {
        let gap = e[i] - local[i].abs();
        if gap < min_gap {
            min_gap = gap;
            axis = i;
        }
    }
    let sign = if local[axis] < 0.0 { -1.0 } else { 1.0 };
    let mut face_point = local;
    face_point[axis] = sign * e[axis];
    let normal = tb.axis(axis) * sign;
    let surface_box = tb.transform_point(face_point);
    let surface_sphere = c - normal * r;
    Some((normal, (surface_box + surface_sphere) * 0.5, r + min_gap))
}

pub(crate) fn box_sphere(a: &Box4D, ta: &Transform4, rb: f32, tb: &Transform4, manifold: &mut Manifold) {
    if let Some((normal, position, depth)) = box_point_contact(a, ta, tb.position, rb) {
        manifold.normal = normal;
        manifold.push(position, depth);
    }
}

pub(crate) fn box_capsule(a: &Box4D, ta: &Transform4, b: &Capsule4D, tb: &Transform4, manifold: &mut Manifold) {
    let (b0, b1) = b.segment(tb);
    let e = a.half_extents;
    let l0 = ta.inverse_transform_point(b0);
    let l1 = ta.inverse_transform_point(b1);
    let seg = l1 - l0;

    // squared distance to the box is convex along the segment
    let inv_phi = (5.0f32.sqrt() - 1.0) * 0.5;
    let (mut lo, mut hi) = (0.0f32, 1.0f32);
    let mut x1 = hi - inv_phi * (hi - lo);
    let mut x2 = lo + inv_phi * (hi - lo);
    let mut f1 = box_distance_sq(e, l0 + seg * x1);
    let mut f2 = box_distance_sq(e, l0 + seg * x2);
    for _ in 0..GOLDEN_ITERATIONS {
        if f1 <= f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - inv_phi * (hi - lo);
            f1 = box_distance_sq(e, l0 + seg * x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + inv_phi * (hi - lo);
            f2 = box_distance_sq(e, l0 + seg * x2);
        }
    }
    let mut t = (lo + hi) * 0.5;
    // the minimum may sit exactly on an end point
    for end in [0.0, 1.0] {
        if box_distance_sq(e, l0 + seg * end) <= box_distance_sq(e, l0 + seg * t) {
            t = end;
        }
    }

    let closest = b0 + (b1 - b0) * t;
    let Some((normal, position, depth)) = box_point_contact(a, ta, closest, b.radius) else {
        return;
    };

    let axis_len_sq = (b1 - b0).length_squared();
    if axis_len_sq > DEGENERATE_DISTANCE {
        let dir = (b1 - b0) * (1.0 / axis_len_sq.sqrt());
        if dir.dot(normal).abs() < FLAT_CAPSULE_COSINE {
            // lying on a face: clip the segment to the face's side slabs and use both ends
            let local_n = ta.inverse_transform_direction(normal);
            let face_axis = local_n.max_abs_axis();
            let (mut s0, mut s1) = (0.0f32, 1.0f32);
            for i in 0..4 {
                if i == face_axis {
                    continue;
                }
                if seg[i].abs() < 1.0e-9 {
                    if l0[i].abs() > e[i] {
                        s1 = -1.0;
                    }
                    continue;
                }
                let mut ta_i = (-e[i] - l0[i]) / seg[i];
                let mut tb_i = (e[i] - l0[i]) / seg[i];
                if ta_i > tb_i {
                    std::mem::swap(&mut ta_i, &mut tb_i);
                }
                s0 = s0.max(ta_i);
                s1 = s1.min(tb_i);
            }
            if s1 - s0 > 1.0e-4 {
                let mut pushed = 0;
                for s in [s0, s1] {
                    let p = b0 + (b1 - b0) * s;
                    if let Some((n, pos, d)) = box_point_contact(a, ta, p, b.radius) {
                        if n.dot(normal) > 0.95 {
                            manifold.push(pos, d);
                            pushed += 1;
                        }
                    }
                }
                if pushed > 0 {
                    manifold.normal = normal;
                    return;
                }
            }
        }
    }

    manifold.normal = normal;
    manifold.push(position, depth);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_params_crossing() {
        let (s, t) = closest_segment_params(
            Vec4::new(-1.0, 0.0, 0.0, 0.0),
            Vec4::new(1.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, -1.0, 0.0, 1.0),
            Vec4::new(0.0, 1.0, 0.0, 1.0),
        );
        assert!((s - 0.5).abs() < 1e-6);
        assert!((t - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_segment_params_degenerate() {
        let p = Vec4::new(0.0, 3.0, 0.0, 0.0);
        let (s, t) = closest_segment_params(p, p, Vec4::ZERO, Vec4::new(0.0, 2.0, 0.0, 0.0));
        assert_eq!(s, 0.0);
        assert!((t - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_coincident_spheres_finite_normal() {
        let mut m = Manifold::new();
        sphere_sphere(1.0, &Transform4::IDENTITY, 1.0, &Transform4::IDENTITY, &mut m);
        assert_eq!(m.len(), 1);
        assert!(m.normal.is_finite());
        assert!((m.normal.length() - 1.0).abs() < 1e-6);
        assert!((m.points()[0].depth - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_box_distance_sq() {
        let e = Vec4::splat(1.0);
        assert_eq!(box_distance_sq(e, Vec4::new(0.5, 0.0, 0.0, 0.0)), 0.0);
        assert!((box_distance_sq(e, Vec4::new(3.0, 0.0, 0.0, 2.0)) - 5.0).abs() < 1e-6);
    }
}
