//! 6x6 matrices acting on bivectors
//!
//! The inertia tensor of a 4D rigid body maps angular velocity (a bivector)
//! to angular momentum (a bivector), so it is a symmetric 6x6 matrix in the
//! plane basis xy, xz, xw, yz, yw, zw.

use crate::{mat4, Bivec4, Mat4, RotationPlane};

/// 6x6 matrix, stored row-major: `m[row][col]`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat6 {
    pub m: [[f32; 6]; 6],
}

impl Default for Mat6 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Mat6 {
    pub const ZERO: Self = Self { m: [[0.0; 6]; 6] };

    pub const IDENTITY: Self = Self {
        m: [
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn from_diagonal(d: [f32; 6]) -> Self {
        let mut out = Self::ZERO;
        for (i, v) in d.iter().enumerate() {
            out.m[i][i] = *v;
        }
        out
    }

    /// Matrix-bivector product
    pub fn mul_bivec(&self, b: Bivec4) -> Bivec4 {
        let src = b.to_array();
        let mut out = [0.0f32; 6];
        for (row, o) in out.iter_mut().enumerate() {
            *o = self.m[row].iter().zip(src.iter()).map(|(a, b)| a * b).sum();
        }
        Bivec4::from_array(out)
    }

    /// Matrix product: result = self * other
    pub fn mul(&self, other: &Mat6) -> Mat6 {
        let mut out = Self::ZERO;
        for row in 0..6 {
            for col in 0..6 {
                let mut sum = 0.0;
                for k in 0..6 {
                    sum += self.m[row][k] * other.m[k][col];
                }
                out.m[row][col] = sum;
            }
        }
        out
    }

    pub fn transpose(&self) -> Mat6 {
        let mut out = Self::ZERO;
        for row in 0..6 {
            for col in 0..6 {
                out.m[col][row] = self.m[row][col];
            }
        }
        out
    }

    pub fn add(&self, other: &Mat6) -> Mat6 {
        let mut out = *self;
        for row in 0..6 {
            for col in 0..6 {
                out.m[row][col] += other.m[row][col];
            }
        }
        out
    }

    /// Inverse by Gauss-Jordan elimination with partial pivoting.
    ///
    /// Returns `None` when the matrix is singular (a pivot falls below
    /// a tolerance relative to the largest entry).
    pub fn inverse(&self) -> Option<Mat6> {
        let mut a = self.m;
        let mut inv = Self::IDENTITY.m;

        let scale = a
            .iter()
            .flatten()
            .fold(0.0f32, |acc, v| acc.max(v.abs()));
        if scale <= 0.0 || !scale.is_finite() {
            return None;
        }
        let tolerance = scale * 1e-7;

        for col in 0..6 {
            let mut pivot = col;
            for row in (col + 1)..6 {
                if a[row][col].abs() > a[pivot][col].abs() {
                    pivot = row;
                }
            }
            if a[pivot][col].abs() <= tolerance {
                return None;
            }
            a.swap(col, pivot);
            inv.swap(col, pivot);

            let p = 1.0 / a[col][col];
            for k in 0..6 {
                a[col][k] *= p;
                inv[col][k] *= p;
            }

            for row in 0..6 {
                if row == col {
                    continue;
                }
                let f = a[row][col];
                if f == 0.0 {
                    continue;
                }
                for k in 0..6 {
                    a[row][k] -= f * a[col][k];
                    inv[row][k] -= f * inv[col][k];
                }
            }
        }

        Some(Mat6 { m: inv })
    }

    /// Inertia tensor from a second-moment matrix `S = Σ m r rᵀ`.
    ///
    /// Angular momentum is `L = S Ω + Ω S` where `Ω` is the antisymmetric
    /// 4x4 form of the angular velocity; each column of the result is `L`
    /// for a unit angular velocity in one plane. For a diagonal `S` the
    /// entry for plane `ij` is `S_ii + S_jj`.
    pub fn inertia_from_second_moment(s: Mat4) -> Mat6 {
        // s is symmetric so storage order does not matter here
        let mut out = Self::ZERO;
        for (col, &(k, l)) in RotationPlane::INDICES.iter().enumerate() {
            let mut w = [[0.0f32; 4]; 4];
            w[k][l] = 1.0;
            w[l][k] = -1.0;
            for (row, &(i, j)) in RotationPlane::INDICES.iter().enumerate() {
                let mut sw_ij = 0.0;
                let mut ws_ij = 0.0;
                for n in 0..4 {
                    sw_ij += s[n][i] * w[n][j];
                    ws_ij += w[i][n] * s[j][n];
                }
                out.m[row][col] = sw_ij + ws_ij;
            }
        }
        out
    }

    /// Action of a vector rotation on bivectors (the second compound matrix).
    ///
    /// If `R` maps `a` to `R a`, the result maps `a ∧ b` to `R a ∧ R b`.
    /// For orthonormal `R` the result is orthonormal too.
    pub fn compound(r: Mat4) -> Mat6 {
        // r[col][row]; rr(i, k) is row i, column k
        let rr = |i: usize, k: usize| r[k][i];
        let mut out = Self::ZERO;
        for (row, &(i, j)) in RotationPlane::INDICES.iter().enumerate() {
            for (col, &(k, l)) in RotationPlane::INDICES.iter().enumerate() {
                out.m[row][col] = rr(i, k) * rr(j, l) - rr(i, l) * rr(j, k);
            }
        }
        out
    }

    /// Express a body-space tensor in world space: `C T Cᵀ`
    pub fn rotated(&self, rotation: Mat4) -> Mat6 {
        let c = Self::compound(rotation);
        c.mul(self).mul(&c.transpose())
    }

    pub fn is_finite(&self) -> bool {
        self.m.iter().flatten().all(|v| v.is_finite())
    }
}

/// Second moment of a point mass `m` at `c`: `m c cᵀ`
pub fn point_second_moment(mass: f32, c: crate::Vec4) -> Mat4 {
    mat4::scale(mat4::outer(c, c), mass)
}
