//! Narrow-phase collision
//!
//! Each routine fills a [`Manifold`] for one pair of world-placed shapes:
//! a unit normal pointing from the first shape toward the second, and up
//! to [`MAX_MANIFOLD_POINTS`] contact positions with non-negative depths.
//! Contact positions sit halfway between the two surfaces.
//!
//! Routines only append: callers reset the manifold before each call.

mod box_box;
mod clip;
mod primitives;

pub use clip::ClipBuffers;

use phys4d_math::{Transform4, Vec4};

use crate::shapes::Shape;

/// Maximum number of contact points in one manifold
pub const MAX_MANIFOLD_POINTS: usize = 16;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ContactPoint {
    /// World-space position, midway between the two surfaces
    pub position: Vec4,
    /// Penetration depth along the manifold normal, never negative
    pub depth: f32,
}

/// Contact geometry between two shapes
#[derive(Clone, Debug, PartialEq)]
pub struct Manifold {
    /// Unit normal from the first shape toward the second
    pub normal: Vec4,
    points: [ContactPoint; MAX_MANIFOLD_POINTS],
    count: usize,
}

impl Default for Manifold {
    fn default() -> Self {
        Self::new()
    }
}

impl Manifold {
    pub fn new() -> Self {
        Self {
            normal: Vec4::ZERO,
            points: [ContactPoint::default(); MAX_MANIFOLD_POINTS],
            count: 0,
        }
    }

    /// Drop every point; must be called before running a collision routine
    pub fn reset(&mut self) {
        self.count = 0;
        self.normal = Vec4::ZERO;
    }

    /// Append a point; returns false when the manifold is full
    pub fn push(&mut self, position: Vec4, depth: f32) -> bool {
        if self.count == MAX_MANIFOLD_POINTS {
            return false;
        }
        self.points[self.count] = ContactPoint {
            position,
            depth: depth.max(0.0),
        };
        self.count += 1;
        true
    }

    pub fn points(&self) -> &[ContactPoint] {
        &self.points[..self.count]
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Deepest penetration, 0 when empty
    pub fn max_depth(&self) -> f32 {
        self.points().iter().fold(0.0, |acc, p| acc.max(p.depth))
    }
}

/// A shape placed in the world, identified for canonical ordering
#[derive(Clone, Copy, Debug)]
pub struct ShapeInstance<'a> {
    pub shape: &'a Shape,
    pub transform: Transform4,
    /// Stable id breaking ties between shapes of the same type
    pub id: u64,
}

/// Run the narrow-phase for a pair, appending into `manifold`.
///
/// The pair is ordered by shape type then id so that one routine handles
/// each unordered type pair; when the order is swapped the resulting
/// normal is negated. `collide(a, b)` and `collide(b, a)` therefore give
/// identical points and exactly opposite normals.
pub fn collide(a: &ShapeInstance, b: &ShapeInstance, manifold: &mut Manifold, scratch: &mut ClipBuffers) {
    let key_a = (a.shape.rank(), a.id);
    let key_b = (b.shape.rank(), b.id);
    if key_a > key_b {
        collide_ordered(b, a, manifold, scratch);
        manifold.normal = -manifold.normal;
    } else {
        collide_ordered(a, b, manifold, scratch);
    }
}

fn collide_ordered(a: &ShapeInstance, b: &ShapeInstance, manifold: &mut Manifold, scratch: &mut ClipBuffers) {
    let (ta, tb) = (&a.transform, &b.transform);
    match (a.shape, b.shape) {
        (Shape::Box(ba), Shape::Box(bb)) => box_box::collide_boxes(ba, ta, bb, tb, manifold, scratch),
        (Shape::Box(ba), Shape::Sphere(sb)) => primitives::box_sphere(ba, ta, sb.radius, tb, manifold),
        (Shape::Box(ba), Shape::Capsule(cb)) => primitives::box_capsule(ba, ta, cb, tb, manifold),
        (Shape::Sphere(sa), Shape::Sphere(sb)) => {
            primitives::sphere_sphere(sa.radius, ta, sb.radius, tb, manifold)
        }
        (Shape::Sphere(sa), Shape::Capsule(cb)) => {
            primitives::sphere_capsule(sa.radius, ta, cb, tb, manifold)
        }
        (Shape::Capsule(ca), Shape::Capsule(cb)) => primitives::capsule_capsule(ca, ta, cb, tb, manifold),
        // unreachable after ordering by rank
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Box4D, Capsule4D, Sphere4D};
    use phys4d_math::mat4;

    const EPSILON: f32 = 0.001;

    fn run(a: &ShapeInstance, b: &ShapeInstance) -> Manifold {
        let mut m = Manifold::new();
        let mut scratch = ClipBuffers::default();
        collide(a, b, &mut m, &mut scratch);
        m
    }

    /// Distance from a point to the surface of a shape (0 inside)
    fn surface_distance(inst: &ShapeInstance, p: Vec4) -> f32 {
        let local = inst.transform.inverse_transform_point(p);
        match inst.shape {
            Shape::Box(b) => {
                let q = local.abs() - b.half_extents;
                let outside = q.max_components(Vec4::ZERO).length();
                let inside = q.max_element().min(0.0);
                (outside + inside).abs()
            }
            Shape::Sphere(s) => (local.length() - s.radius).abs(),
            Shape::Capsule(c) => {
                let y = local.y.clamp(-c.half_length, c.half_length);
                ((local - Vec4::new(0.0, y, 0.0, 0.0)).length() - c.radius).abs()
            }
        }
    }

    fn check_manifold(a: &ShapeInstance, b: &ShapeInstance, m: &Manifold) {
        assert!((m.normal.length() - 1.0).abs() < EPSILON, "normal not unit: {:?}", m.normal);
        for p in m.points() {
            assert!(p.depth >= 0.0);
            assert!(p.position.is_finite());
            let slack = p.depth * 0.5 + EPSILON;
            assert!(surface_distance(a, p.position) <= slack, "point {:?} far from a", p);
            assert!(surface_distance(b, p.position) <= slack, "point {:?} far from b", p);
        }
    }

    fn check_symmetry(a: &ShapeInstance, b: &ShapeInstance) -> Manifold {
        let ab = run(a, b);
        let ba = run(b, a);
        assert_eq!(ab.len(), ba.len());
        assert_eq!(ab.normal, -ba.normal);
        for (p, q) in ab.points().iter().zip(ba.points()) {
            assert!((p.depth - q.depth).abs() < EPSILON);
        }
        check_manifold(a, b, &ab);
        ab
    }

    fn boxed(e: Vec4) -> Shape {
        Shape::Box(Box4D { half_extents: e })
    }

    #[test]
    fn test_sphere_sphere_depth_and_normal() {
        let s = Shape::Sphere(Sphere4D { radius: 1.0 });
        let a = ShapeInstance { shape: &s, transform: Transform4::IDENTITY, id: 1 };
        let b = ShapeInstance {
            shape: &s,
            transform: Transform4::from_position(Vec4::new(0.0, 0.0, 1.5, 0.0)),
            id: 2,
        };
        let m = check_symmetry(&a, &b);
        assert_eq!(m.len(), 1);
        assert!((m.points()[0].depth - 0.5).abs() < EPSILON);
        assert!((m.normal - Vec4::Z).length() < EPSILON);
        // reversed argument order flips the normal toward the first shape's partner
        let m = run(&b, &a);
        assert!((m.normal + Vec4::Z).length() < EPSILON);
    }

    #[test]
    fn test_disjoint_shapes_leave_manifold_empty() {
        let cube = boxed(Vec4::splat(0.5));
        let ball = Shape::Sphere(Sphere4D { radius: 0.5 });
        let a = ShapeInstance { shape: &cube, transform: Transform4::IDENTITY, id: 1 };
        let b = ShapeInstance {
            shape: &ball,
            transform: Transform4::from_position(Vec4::new(0.0, 0.0, 0.0, 1.2)),
            id: 2,
        };
        assert!(run(&a, &b).is_empty());
        let c = ShapeInstance {
            shape: &cube,
            transform: Transform4::from_position(Vec4::new(1.1, 0.0, 0.0, 0.0)),
            id: 3,
        };
        assert!(run(&a, &c).is_empty());
    }

    #[test]
    fn test_box_resting_on_box() {
        let floor = boxed(Vec4::new(5.0, 0.5, 5.0, 5.0));
        let cube = boxed(Vec4::splat(0.5));
        let a = ShapeInstance { shape: &floor, transform: Transform4::IDENTITY, id: 1 };
        let b = ShapeInstance {
            shape: &cube,
            transform: Transform4::from_position(Vec4::new(0.0, 0.95, 0.0, 0.0)),
            id: 2,
        };
        let m = check_symmetry(&a, &b);
        // a full tesseract face rests on the floor: all 8 corners of the bottom cell
        assert_eq!(m.len(), 8);
        assert!((m.normal - Vec4::Y).length() < EPSILON);
        for p in m.points() {
            assert!((p.depth - 0.05).abs() < EPSILON);
        }
    }

    #[test]
    fn test_small_box_under_large_incident_face() {
        // the large box is the incident one; reference corners keep the manifold populated
        let big = boxed(Vec4::new(4.0, 0.5, 4.0, 4.0));
        let small = boxed(Vec4::new(0.3, 1.0, 0.3, 0.3));
        let a = ShapeInstance { shape: &small, transform: Transform4::IDENTITY, id: 1 };
        let b = ShapeInstance {
            shape: &big,
            transform: Transform4::from_position(Vec4::new(0.0, 1.45, 0.0, 0.0)),
            id: 2,
        };
        let m = check_symmetry(&a, &b);
        assert!(!m.is_empty());
        assert!((m.normal - Vec4::Y).length() < EPSILON);
        assert!((m.max_depth() - 0.05).abs() < EPSILON);
    }

    #[test]
    fn test_rotated_box_on_box() {
        let floor = boxed(Vec4::new(5.0, 0.5, 5.0, 5.0));
        let cube = boxed(Vec4::splat(0.5));
        let rot = mat4::mul(mat4::plane_rotation(0.3, 0, 3), mat4::plane_rotation(0.2, 0, 2));
        let a = ShapeInstance { shape: &floor, transform: Transform4::IDENTITY, id: 1 };
        let b = ShapeInstance {
            shape: &cube,
            transform: Transform4::new(Vec4::new(0.0, 0.98, 0.0, 0.0), rot),
            id: 2,
        };
        let m = check_symmetry(&a, &b);
        assert!(!m.is_empty());
        assert!(m.len() <= MAX_MANIFOLD_POINTS);
    }

    #[test]
    fn test_box_sphere_face_and_inside() {
        let cube = boxed(Vec4::splat(1.0));
        let ball = Shape::Sphere(Sphere4D { radius: 0.5 });
        let a = ShapeInstance { shape: &cube, transform: Transform4::IDENTITY, id: 1 };
        let b = ShapeInstance {
            shape: &ball,
            transform: Transform4::from_position(Vec4::new(0.0, 0.0, 0.0, 1.3)),
            id: 2,
        };
        let m = check_symmetry(&a, &b);
        assert_eq!(m.len(), 1);
        assert!((m.normal - Vec4::W).length() < EPSILON);
        assert!((m.points()[0].depth - 0.2).abs() < EPSILON);

        // center inside the box resolves through the nearest face
        let c = ShapeInstance {
            shape: &ball,
            transform: Transform4::from_position(Vec4::new(0.8, 0.0, 0.0, 0.0)),
            id: 3,
        };
        let m = run(&a, &c);
        assert!((m.normal - Vec4::X).length() < EPSILON);
        assert!((m.points()[0].depth - 0.7).abs() < EPSILON);
    }

    #[test]
    fn test_sphere_capsule() {
        let ball = Shape::Sphere(Sphere4D { radius: 0.5 });
        let cap = Shape::Capsule(Capsule4D { radius: 0.5, half_length: 1.0 });
        let a = ShapeInstance { shape: &ball, transform: Transform4::from_position(Vec4::new(0.9, 0.5, 0.0, 0.0)), id: 1 };
        let b = ShapeInstance { shape: &cap, transform: Transform4::IDENTITY, id: 2 };
        let m = check_symmetry(&a, &b);
        assert_eq!(m.len(), 1);
        assert!((m.normal + Vec4::X).length() < EPSILON);
        assert!((m.points()[0].depth - 0.1).abs() < EPSILON);
    }

    #[test]
    fn test_sphere_on_capsule_axis_uses_fallback_normal() {
        let ball = Shape::Sphere(Sphere4D { radius: 0.5 });
        let cap = Shape::Capsule(Capsule4D { radius: 0.5, half_length: 1.0 });
        let a = ShapeInstance { shape: &ball, transform: Transform4::IDENTITY, id: 1 };
        let b = ShapeInstance { shape: &cap, transform: Transform4::IDENTITY, id: 2 };
        let m = check_symmetry(&a, &b);
        assert_eq!(m.len(), 1);
        assert!(m.normal.is_finite());
    }

    #[test]
    fn test_parallel_capsules_two_points() {
        let cap = Shape::Capsule(Capsule4D { radius: 0.5, half_length: 1.0 });
        let a = ShapeInstance { shape: &cap, transform: Transform4::IDENTITY, id: 1 };
        let b = ShapeInstance {
            shape: &cap,
            transform: Transform4::from_position(Vec4::new(0.0, 0.5, 0.0, 0.9)),
            id: 2,
        };
        let m = check_symmetry(&a, &b);
        assert_eq!(m.len(), 2);
        assert!((m.normal - Vec4::W).length() < EPSILON);
        for p in m.points() {
            assert!((p.depth - 0.1).abs() < EPSILON);
        }
    }

    #[test]
    fn test_crossed_capsules_one_point() {
        let cap = Shape::Capsule(Capsule4D { radius: 0.5, half_length: 1.0 });
        let a = ShapeInstance { shape: &cap, transform: Transform4::IDENTITY, id: 1 };
        let b = ShapeInstance {
            shape: &cap,
            transform: Transform4::new(
                Vec4::new(0.0, 0.0, 0.8, 0.0),
                mat4::plane_rotation(std::f32::consts::FRAC_PI_2, 1, 3),
            ),
            id: 2,
        };
        let m = check_symmetry(&a, &b);
        assert_eq!(m.len(), 1);
        assert!((m.normal - Vec4::Z).length() < EPSILON);
        assert!((m.points()[0].depth - 0.2).abs() < EPSILON);
    }

    #[test]
    fn test_capsule_lying_on_box() {
        let floor = boxed(Vec4::new(5.0, 0.5, 5.0, 5.0));
        let cap = Shape::Capsule(Capsule4D { radius: 0.25, half_length: 1.0 });
        let a = ShapeInstance { shape: &floor, transform: Transform4::IDENTITY, id: 1 };
        // lying along x
        let b = ShapeInstance {
            shape: &cap,
            transform: Transform4::new(
                Vec4::new(0.0, 0.7, 0.0, 0.0),
                mat4::plane_rotation(std::f32::consts::FRAC_PI_2, 0, 1),
            ),
            id: 2,
        };
        let m = check_symmetry(&a, &b);
        assert_eq!(m.len(), 2);
        assert!((m.normal - Vec4::Y).length() < EPSILON);
        for p in m.points() {
            assert!((p.depth - 0.05).abs() < EPSILON);
        }
    }

    #[test]
    fn test_standing_capsule_on_box() {
        let floor = boxed(Vec4::new(5.0, 0.5, 5.0, 5.0));
        let cap = Shape::Capsule(Capsule4D { radius: 0.25, half_length: 1.0 });
        let a = ShapeInstance { shape: &floor, transform: Transform4::IDENTITY, id: 1 };
        let b = ShapeInstance {
            shape: &cap,
            transform: Transform4::from_position(Vec4::new(0.0, 1.7, 0.0, 0.0)),
            id: 2,
        };
        let m = check_symmetry(&a, &b);
        assert_eq!(m.len(), 1);
        assert!((m.points()[0].depth - 0.05).abs() < EPSILON);
    }

    #[test]
    fn test_coincident_boxes() {
        let cube = boxed(Vec4::splat(0.5));
        let a = ShapeInstance { shape: &cube, transform: Transform4::IDENTITY, id: 1 };
        let b = ShapeInstance { shape: &cube, transform: Transform4::IDENTITY, id: 2 };
        let m = check_symmetry(&a, &b);
        assert!(!m.is_empty());
        // every face axis ties; the first one wins
        assert!((m.normal - Vec4::X).length() < EPSILON);
        for p in m.points() {
            assert!((p.depth - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn test_face_touching_boxes() {
        let cube = boxed(Vec4::splat(0.5));
        let a = ShapeInstance { shape: &cube, transform: Transform4::IDENTITY, id: 1 };
        let b = ShapeInstance {
            shape: &cube,
            transform: Transform4::from_position(Vec4::new(1.0, 0.0, 0.0, 0.0)),
            id: 2,
        };
        let m = check_symmetry(&a, &b);
        // zero separation still counts as touching, with nothing to push apart
        assert_eq!(m.len(), 1);
        assert!((m.normal - Vec4::X).length() < EPSILON);
        assert!(m.max_depth() < EPSILON);

        let c = ShapeInstance {
            shape: &cube,
            transform: Transform4::from_position(Vec4::new(1.001, 0.0, 0.0, 0.0)),
            id: 3,
        };
        assert!(run(&a, &c).is_empty());
    }

    #[test]
    fn test_zero_length_capsule_acts_as_sphere() {
        let floor = boxed(Vec4::splat(0.5));
        let point = Shape::Capsule(Capsule4D { radius: 0.5, half_length: 0.0 });
        let a = ShapeInstance { shape: &floor, transform: Transform4::IDENTITY, id: 1 };
        let b = ShapeInstance {
            shape: &point,
            transform: Transform4::from_position(Vec4::new(0.0, 0.9, 0.0, 0.0)),
            id: 2,
        };
        let m = check_symmetry(&a, &b);
        assert_eq!(m.len(), 1);
        assert!((m.normal - Vec4::Y).length() < EPSILON);
        assert!((m.points()[0].depth - 0.1).abs() < EPSILON);

        let cap = Shape::Capsule(Capsule4D { radius: 0.5, half_length: 1.0 });
        let c = ShapeInstance { shape: &cap, transform: Transform4::IDENTITY, id: 3 };
        let d = ShapeInstance {
            shape: &point,
            transform: Transform4::from_position(Vec4::new(0.0, 0.0, 0.8, 0.0)),
            id: 4,
        };
        let m = check_symmetry(&c, &d);
        assert_eq!(m.len(), 1);
        assert!((m.normal - Vec4::Z).length() < EPSILON);
        assert!((m.points()[0].depth - 0.2).abs() < EPSILON);
    }

    #[test]
    fn test_coincident_capsules_use_fallback_normal() {
        let cap = Shape::Capsule(Capsule4D { radius: 0.5, half_length: 1.0 });
        let a = ShapeInstance { shape: &cap, transform: Transform4::IDENTITY, id: 1 };
        let b = ShapeInstance { shape: &cap, transform: Transform4::IDENTITY, id: 2 };
        let m = check_symmetry(&a, &b);
        assert_eq!(m.len(), 2);
        for p in m.points() {
            assert!((p.depth - 1.0).abs() < EPSILON);
        }

        let point = Shape::Capsule(Capsule4D { radius: 0.5, half_length: 0.0 });
        let c = ShapeInstance { shape: &point, transform: Transform4::IDENTITY, id: 3 };
        let d = ShapeInstance { shape: &point, transform: Transform4::IDENTITY, id: 4 };
        let m = check_symmetry(&c, &d);
        assert_eq!(m.len(), 1);
        assert!((m.points()[0].depth - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_manifold_capacity() {
        let mut m = Manifold::new();
        for i in 0..MAX_MANIFOLD_POINTS {
            assert!(m.push(Vec4::splat(i as f32), 0.1));
        }
        assert!(!m.push(Vec4::ZERO, 0.1));
        assert_eq!(m.len(), MAX_MANIFOLD_POINTS);
        m.reset();
        assert!(m.is_empty());
        // depths are clamped non-negative
        m.push(Vec4::ZERO, -1.0);
        assert_eq!(m.points()[0].depth, 0.0);
    }
}
