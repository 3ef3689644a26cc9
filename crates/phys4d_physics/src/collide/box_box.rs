//! Box-box collision: separating axes plus hyperface clipping
//!
//! Two boxes in 4D are tested along their 8 face normals. The face whose
//! axis shows the least penetration becomes the reference face; the other
//! box's hyperface most anti-parallel to it (a 3-cube) is the incident
//! face. Incident edges are clipped against the reference face's six side
//! half-spaces, and the survivors below the reference face become contacts.

use phys4d_math::{Transform4, Vec4};

use super::clip::{reduce_into, ClipBuffers};
use super::{ContactPoint, Manifold};
use crate::shapes::Box4D;

/// Slack used when testing reference corners against the incident box
const CORNER_TOLERANCE: f32 = 1.0e-4;

struct Axis {
    separation: f32,
    index: usize,
}

/// Least-penetrating face axis of `a` against `b`, measured along `a`'s axes
fn best_face_axis(a: &Box4D, ta: &Transform4, b: &Box4D, tb: &Transform4, d: Vec4) -> Option<Axis> {
    let mut best = Axis {
        separation: f32::NEG_INFINITY,
        index: 0,
    };
    for i in 0..4 {
        let u = ta.axis(i);
        let mut radius_b = 0.0;
        for j in 0..4 {
            radius_b += b.half_extents[j] * u.dot(tb.axis(j)).abs();
        }
        let separation = d.dot(u).abs() - (a.half_extents[i] + radius_b);
        if separation > 0.0 {
            return None;
        }
        if separation > best.separation {
            best = Axis { separation, index: i };
        }
    }
    Some(best)
}

pub(crate) fn collide_boxes(
    a: &Box4D,
    ta: &Transform4,
    b: &Box4D,
    tb: &Transform4,
    manifold: &mut Manifold,
    scratch: &mut ClipBuffers,
) {
    let d = tb.position - ta.position;

    let Some(axis_a) = best_face_axis(a, ta, b, tb, d) else {
        return;
    };
    let Some(axis_b) = best_face_axis(b, tb, a, ta, -d) else {
        return;
    };

    // prefer the first box's face unless the second is clearly better
    let use_b = 0.95 * axis_b.separation > axis_a.separation + 0.01;

    let (ref_box, ref_tx, inc_box, inc_tx, ref_axis, separation) = if use_b {
        (b, tb, a, ta, axis_b.index, axis_b.separation)
    } else {
        (a, ta, b, tb, axis_a.index, axis_a.separation)
    };

    // reference face normal points out of the reference box toward the incident one
    let mut ref_normal = ref_tx.axis(ref_axis);
    if (inc_tx.position - ref_tx.position).dot(ref_normal) < 0.0 {
        ref_normal = -ref_normal;
    }
    manifold.normal = if use_b { -ref_normal } else { ref_normal };

    // incident hyperface: the face of the incident box most anti-parallel to the reference normal
    let local_n = inc_tx.inverse_transform_direction(ref_normal);
    let inc_axis = local_n.max_abs_axis();
    let inc_sign = if local_n[inc_axis] > 0.0 { -1.0 } else { 1.0 };
    let inc_face_normal = inc_tx.axis(inc_axis) * inc_sign;

    let mut others = [0usize; 3];
    let mut n = 0;
    for i in 0..4 {
        if i != inc_axis {
            others[n] = i;
            n += 1;
        }
    }
    let mut corners = [Vec4::ZERO; 8];
    for (bits, corner) in corners.iter_mut().enumerate() {
        let mut local = Vec4::ZERO;
        local[inc_axis] = inc_sign * inc_box.half_extents[inc_axis];
        for (slot, &axis) in others.iter().enumerate() {
            let sign = if bits & (1 << slot) != 0 { 1.0 } else { -1.0 };
            local[axis] = sign * inc_box.half_extents[axis];
        }
        *corner = inc_tx.transform_point(local);
    }
    scratch.load_cell(&corners);

    // six side half-spaces of the reference face
    for i in 0..4 {
        if i == ref_axis {
            continue;
        }
        let u = ref_tx.axis(i);
        let center = u.dot(ref_tx.position);
        let extent = ref_box.half_extents[i];
        scratch.clip(u, center + extent);
        scratch.clip(-u, -center + extent);
    }

    let face_offset = ref_normal.dot(ref_tx.position) + ref_box.half_extents[ref_axis];
    let mut candidates = std::mem::take(&mut scratch.candidates);
    candidates.clear();

    scratch.for_each_survivor(|v| {
        let s = ref_normal.dot(v) - face_offset;
        if s < 0.0 {
            let depth = -s;
            candidates.push(ContactPoint {
                position: v + ref_normal * (depth * 0.5),
                depth,
            });
        }
    });

    // reference face corners that dig into the incident face
    let approach = -ref_normal.dot(inc_face_normal);
    if approach > 1.0e-3 {
        let inc_offset = inc_face_normal.dot(inc_tx.position) + inc_box.half_extents[inc_axis];
        let face_center = ref_tx.position + ref_normal * ref_box.half_extents[ref_axis];
        let mut ref_others = [0usize; 3];
        let mut n = 0;
        for i in 0..4 {
            if i != ref_axis {
                ref_others[n] = i;
                n += 1;
            }
        }
        for bits in 0..8usize {
            let mut r = face_center;
            for (slot, &axis) in ref_others.iter().enumerate() {
                let sign = if bits & (1 << slot) != 0 { 1.0 } else { -1.0 };
                r += ref_tx.axis(axis) * (sign * ref_box.half_extents[axis]);
            }
            // distance along the contact normal from the corner to the incident face plane
            let depth = (inc_offset - inc_face_normal.dot(r)) / approach;
            if depth <= 0.0 {
                continue;
            }
            let q = r - ref_normal * depth;
            let local = inc_tx.inverse_transform_point(q);
            let inside = others
                .iter()
                .all(|&axis| local[axis].abs() <= inc_box.half_extents[axis] + CORNER_TOLERANCE);
            if inside {
                candidates.push(ContactPoint {
                    position: r - ref_normal * (depth * 0.5),
                    depth,
                });
            }
        }
    }

    if candidates.is_empty() {
        // nothing survived clipping: fall back to the incident box's deepest vertex
        let mut v = inc_tx.position;
        for i in 0..4 {
            let u = inc_tx.axis(i);
            let sign = if u.dot(ref_normal) > 0.0 { -1.0 } else { 1.0 };
            v += u * (sign * inc_box.half_extents[i]);
        }
        let depth = (-separation).max(0.0);
        candidates.push(ContactPoint {
            position: v + ref_normal * (depth * 0.5),
            depth,
        });
    }

    reduce_into(&mut candidates, manifold);
    scratch.candidates = candidates;
}
