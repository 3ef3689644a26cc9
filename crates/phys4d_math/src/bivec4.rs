//! 4D Bivector type
//!
//! In four dimensions rotations happen in planes rather than around axes,
//! so angular quantities (angular velocity, torque, angular impulse) have
//! one component per coordinate plane: six in total.
//!
//! Components are always stored in the order xy, xz, xw, yz, yw, zw. A
//! positive value in plane `ij` rotates the `i` axis toward the `j` axis,
//! matching [`crate::mat4::plane_rotation`].

use serde::{Deserialize, Serialize};

use crate::Vec4;

/// The 6 rotation planes in 4D space
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RotationPlane {
    XY,
    XZ,
    XW,
    YZ,
    YW,
    ZW,
}

impl RotationPlane {
    /// All planes, in storage order
    pub const ALL: [RotationPlane; 6] = [
        RotationPlane::XY,
        RotationPlane::XZ,
        RotationPlane::XW,
        RotationPlane::YZ,
        RotationPlane::YW,
        RotationPlane::ZW,
    ];

    /// Axis index pairs for every plane, in storage order
    pub const INDICES: [(usize, usize); 6] = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];

    /// The two axes spanning this plane (0=X, 1=Y, 2=Z, 3=W)
    #[inline]
    pub fn axes(self) -> (usize, usize) {
        Self::INDICES[self.index()]
    }

    /// Position of this plane in a bivector's storage order
    #[inline]
    pub fn index(self) -> usize {
        match self {
            RotationPlane::XY => 0,
            RotationPlane::XZ => 1,
            RotationPlane::XW => 2,
            RotationPlane::YZ => 3,
            RotationPlane::YW => 4,
            RotationPlane::ZW => 5,
        }
    }
}

/// A bivector with one component per rotation plane
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bivec4 {
    pub xy: f32,
    pub xz: f32,
    pub xw: f32,
    pub yz: f32,
    pub yw: f32,
    pub zw: f32,
}

impl Bivec4 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(xy: f32, xz: f32, xw: f32, yz: f32, yw: f32, zw: f32) -> Self {
        Self { xy, xz, xw, yz, yw, zw }
    }

    /// Unit bivector in a single plane, scaled by `value`
    pub fn from_plane(plane: RotationPlane, value: f32) -> Self {
        let mut b = Self::ZERO;
        b[plane.index()] = value;
        b
    }

    #[inline]
    pub const fn from_array(a: [f32; 6]) -> Self {
        Self::new(a[0], a[1], a[2], a[3], a[4], a[5])
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 6] {
        [self.xy, self.xz, self.xw, self.yz, self.yw, self.zw]
    }

    /// Component in the given plane
    #[inline]
    pub fn plane(self, plane: RotationPlane) -> f32 {
        self[plane.index()]
    }

    /// Outer (wedge) product `a ∧ b`
    ///
    /// `(a ∧ b)_ij = a_i b_j - a_j b_i`. With `a` a lever arm and `b` a force
    /// this is the torque; with `b` a velocity it is angular momentum per unit mass.
    pub fn wedge(a: Vec4, b: Vec4) -> Self {
        let mut out = Self::ZERO;
        for (k, &(i, j)) in RotationPlane::INDICES.iter().enumerate() {
            out[k] = a[i] * b[j] - a[j] * b[i];
        }
        out
    }

    /// Velocity of a point at lever arm `r` under this angular velocity
    pub fn cross(self, r: Vec4) -> Vec4 {
        let mut v = Vec4::ZERO;
        for (k, &(i, j)) in RotationPlane::INDICES.iter().enumerate() {
            let w = self[k];
            v[j] += w * r[i];
            v[i] -= w * r[j];
        }
        v
    }

    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.xy * other.xy
            + self.xz * other.xz
            + self.xw * other.xw
            + self.yz * other.yz
            + self.yw * other.yw
            + self.zw * other.zw
    }

    #[inline]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.to_array().iter().all(|c| c.is_finite())
    }
}

impl std::ops::Index<usize> for Bivec4 {
    type Output = f32;

    #[inline]
    fn index(&self, index: usize) -> &f32 {
        match index {
            0 => &self.xy,
            1 => &self.xz,
            2 => &self.xw,
            3 => &self.yz,
            4 => &self.yw,
            5 => &self.zw,
            _ => panic!("Bivec4 index out of range: {}", index),
        }
    }
}

impl std::ops::IndexMut<usize> for Bivec4 {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        match index {
            0 => &mut self.xy,
            1 => &mut self.xz,
            2 => &mut self.xw,
            3 => &mut self.yz,
            4 => &mut self.yw,
            5 => &mut self.zw,
            _ => panic!("Bivec4 index out of range: {}", index),
        }
    }
}

impl std::ops::Add for Bivec4 {
    type Output = Self;
    #[inline]
    fn add(self, o: Self) -> Self {
        Self::new(
            self.xy + o.xy,
            self.xz + o.xz,
            self.xw + o.xw,
            self.yz + o.yz,
            self.yw + o.yw,
            self.zw + o.zw,
        )
    }
}

impl std::ops::AddAssign for Bivec4 {
    #[inline]
    fn add_assign(&mut self, o: Self) {
        *self = *self + o;
    }
}

impl std::ops::Sub for Bivec4 {
    type Output = Self;
    #[inline]
    fn sub(self, o: Self) -> Self {
        self + (-o)
    }
}

impl std::ops::SubAssign for Bivec4 {
    #[inline]
    fn sub_assign(&mut self, o: Self) {
        *self = *self - o;
    }
}

impl std::ops::Mul<f32> for Bivec4 {
    type Output = Self;
    #[inline]
    fn mul(self, s: f32) -> Self {
        Self::new(
            self.xy * s,
            self.xz * s,
            self.xw * s,
            self.yz * s,
            self.yw * s,
            self.zw * s,
        )
    }
}

impl std::ops::MulAssign<f32> for Bivec4 {
    #[inline]
    fn mul_assign(&mut self, s: f32) {
        *self = *self * s;
    }
}

impl std::ops::Neg for Bivec4 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        self * -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    fn vec_approx_eq(a: Vec4, b: Vec4) -> bool {
        (a - b).length() < EPSILON
    }

    #[test]
    fn test_wedge_antisymmetric() {
        let a = Vec4::new(1.0, 2.0, -1.0, 0.5);
        let b = Vec4::new(-3.0, 0.5, 2.0, 1.0);
        let ab = Bivec4::wedge(a, b);
        let ba = Bivec4::wedge(b, a);
        assert_eq!(ab, -ba);
        assert_eq!(Bivec4::wedge(a, a), Bivec4::ZERO);
    }

    #[test]
    fn test_wedge_components() {
        // x ∧ y is the unit xy bivector
        let b = Bivec4::wedge(Vec4::X, Vec4::Y);
        assert_eq!(b, Bivec4::from_plane(RotationPlane::XY, 1.0));
        // w ∧ z is the negative zw bivector
        let b = Bivec4::wedge(Vec4::W, Vec4::Z);
        assert_eq!(b, Bivec4::from_plane(RotationPlane::ZW, -1.0));
    }

    #[test]
    fn test_cross_rotates_first_axis_toward_second() {
        let omega = Bivec4::from_plane(RotationPlane::XW, 2.0);
        // x moves toward +w, w moves toward -x
        assert!(vec_approx_eq(omega.cross(Vec4::X), Vec4::new(0.0, 0.0, 0.0, 2.0)));
        assert!(vec_approx_eq(omega.cross(Vec4::W), Vec4::new(-2.0, 0.0, 0.0, 0.0)));
        // axes outside the plane are unaffected
        assert_eq!(omega.cross(Vec4::Y), Vec4::ZERO);
    }

    #[test]
    fn test_power_identity() {
        // (ω ⌋ r) · F == ω · (r ∧ F)
        let omega = Bivec4::new(0.3, -1.2, 0.7, 0.1, 2.0, -0.4);
        let r = Vec4::new(1.0, -2.0, 0.5, 3.0);
        let f = Vec4::new(0.2, 1.5, -1.0, 0.8);
        let lhs = omega.cross(r).dot(f);
        let rhs = omega.dot(Bivec4::wedge(r, f));
        assert!((lhs - rhs).abs() < EPSILON);
    }

    #[test]
    fn test_plane_axes() {
        for (i, plane) in RotationPlane::ALL.iter().enumerate() {
            assert_eq!(plane.index(), i);
        }
        assert_eq!(RotationPlane::YW.axes(), (1, 3));
    }
}
