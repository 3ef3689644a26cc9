//! 4x4 Matrix utilities for 4D rotations
//!
//! Matrices are stored column-major: `m[col][row]`. Body orientations are
//! orthonormal matrices whose columns are the body's local axes expressed
//! in world space.

use crate::{Bivec4, RotationPlane, Vec4};

/// 4x4 matrix type (column-major)
pub type Mat4 = [[f32; 4]; 4];

/// Identity matrix
pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// All-zero matrix
pub const ZERO: Mat4 = [[0.0; 4]; 4];

/// Create a rotation matrix in a specific 2D plane within 4D space.
///
/// A positive angle rotates axis `p1` toward axis `p2`.
///
/// # Arguments
/// * `angle` - Rotation angle in radians
/// * `p1`, `p2` - Indices of the axes forming the rotation plane (0=X, 1=Y, 2=Z, 3=W)
///
/// # Example
/// ```
/// use phys4d_math::mat4::plane_rotation;
/// // Rotate X toward W by a quarter turn
/// let m = plane_rotation(std::f32::consts::FRAC_PI_2, 0, 3);
/// ```
pub fn plane_rotation(angle: f32, p1: usize, p2: usize) -> Mat4 {
    let cs = angle.cos();
    let sn = angle.sin();

    let mut m = IDENTITY;

    m[p1][p1] = cs;
    m[p2][p2] = cs;
    m[p1][p2] = sn;
    m[p2][p1] = -sn;

    m
}

/// Rotation in one of the six named planes
pub fn from_plane(plane: RotationPlane, angle: f32) -> Mat4 {
    let (p1, p2) = plane.axes();
    plane_rotation(angle, p1, p2)
}

/// Incremental rotation for an angular velocity held over `dt`.
///
/// Composes the six single-plane rotations. For the small angles of one
/// physics step the ordering error is second order and is removed by
/// [`orthonormalize`] drift correction.
pub fn from_bivector(omega: Bivec4, dt: f32) -> Mat4 {
    let mut m = IDENTITY;
    for (k, &(i, j)) in RotationPlane::INDICES.iter().enumerate() {
        let angle = omega[k] * dt;
        if angle != 0.0 {
            m = mul(plane_rotation(angle, i, j), m);
        }
    }
    m
}

/// Multiply two 4x4 matrices: result = a * b
///
/// In column-major convention, this applies b first, then a.
#[allow(clippy::needless_range_loop)]
pub fn mul(a: Mat4, b: Mat4) -> Mat4 {
    let mut result = [[0.0f32; 4]; 4];

    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                result[i][j] += a[k][j] * b[i][k];
            }
        }
    }

    result
}

/// Transform a Vec4 by a 4x4 matrix (column-major)
///
/// result = M * v
pub fn transform(m: Mat4, v: Vec4) -> Vec4 {
    Vec4::new(
        m[0][0] * v.x + m[1][0] * v.y + m[2][0] * v.z + m[3][0] * v.w,
        m[0][1] * v.x + m[1][1] * v.y + m[2][1] * v.z + m[3][1] * v.w,
        m[0][2] * v.x + m[1][2] * v.y + m[2][2] * v.z + m[3][2] * v.w,
        m[0][3] * v.x + m[1][3] * v.y + m[2][3] * v.z + m[3][3] * v.w,
    )
}

/// Transform by the transpose: result = Mᵀ * v
///
/// For a rotation this maps a world-space vector into local space.
pub fn transform_transposed(m: Mat4, v: Vec4) -> Vec4 {
    Vec4::new(
        get_column(m, 0).dot(v),
        get_column(m, 1).dot(v),
        get_column(m, 2).dot(v),
        get_column(m, 3).dot(v),
    )
}

/// Get a column vector from a matrix
pub fn get_column(m: Mat4, col: usize) -> Vec4 {
    Vec4::from_array(m[col])
}

/// Build a matrix from four column vectors
pub fn from_columns(c0: Vec4, c1: Vec4, c2: Vec4, c3: Vec4) -> Mat4 {
    [c0.to_array(), c1.to_array(), c2.to_array(), c3.to_array()]
}

/// Transpose a matrix
pub fn transpose(m: Mat4) -> Mat4 {
    [
        [m[0][0], m[1][0], m[2][0], m[3][0]],
        [m[0][1], m[1][1], m[2][1], m[3][1]],
        [m[0][2], m[1][2], m[2][2], m[3][2]],
        [m[0][3], m[1][3], m[2][3], m[3][3]],
    ]
}

/// Diagonal matrix
pub fn diagonal(d: Vec4) -> Mat4 {
    let mut m = ZERO;
    for i in 0..4 {
        m[i][i] = d[i];
    }
    m
}

/// Outer product `a bᵀ`
pub fn outer(a: Vec4, b: Vec4) -> Mat4 {
    let mut m = ZERO;
    for col in 0..4 {
        for row in 0..4 {
            m[col][row] = a[row] * b[col];
        }
    }
    m
}

/// Component-wise sum
pub fn add(a: Mat4, b: Mat4) -> Mat4 {
    let mut m = a;
    for col in 0..4 {
        for row in 0..4 {
            m[col][row] += b[col][row];
        }
    }
    m
}

/// Component-wise scale
pub fn scale(a: Mat4, s: f32) -> Mat4 {
    let mut m = a;
    for col in m.iter_mut() {
        for v in col.iter_mut() {
            *v *= s;
        }
    }
    m
}

/// Element-wise absolute value
///
/// Used to compute the world-space extent of a rotated box.
pub fn abs(a: Mat4) -> Mat4 {
    let mut m = a;
    for col in m.iter_mut() {
        for v in col.iter_mut() {
            *v = v.abs();
        }
    }
    m
}

/// Re-orthonormalize the columns with Gram-Schmidt.
///
/// Integrating rotations accumulates floating point drift; this restores
/// an orthonormal basis while keeping the first column's direction.
pub fn orthonormalize(m: Mat4) -> Mat4 {
    let mut cols = [Vec4::ZERO; 4];
    for i in 0..4 {
        let mut c = get_column(m, i);
        for prev in cols.iter().take(i) {
            c -= *prev * c.dot(*prev);
        }
        cols[i] = match c.try_normalized(1e-12) {
            Some(n) => n,
            None => Vec4::AXES[i],
        };
    }
    from_columns(cols[0], cols[1], cols[2], cols[3])
}

/// True when every entry is finite
pub fn is_finite(m: Mat4) -> bool {
    m.iter().flatten().all(|v| v.is_finite())
}
