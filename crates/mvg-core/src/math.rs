//! Mathematical utilities and type definitions.
//!
//! This module provides the fundamental types used throughout the library
//! and helpers for moving between Euclidean and homogeneous coordinates.
//!
//! Point sets cross the estimation boundary column-wise: a set of `N`
//! points in `d` dimensions travels as a `(d+1) x N` matrix of homogeneous
//! columns. The helpers below build such matrices from point slices and
//! convert the results back, renormalizing the last coordinate to 1 before
//! it is treated as Euclidean.

use nalgebra::{
    Matrix3, Matrix3x4, Matrix3xX, Matrix4, Matrix4xX, Point2, Point3, Vector2, Vector3,
};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// 2D vector with [`Real`] components.
pub type Vec2 = Vector2<Real>;
/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 2D point with [`Real`] coordinates.
pub type Pt2 = Point2<Real>;
/// 3D point with [`Real`] coordinates.
pub type Pt3 = Point3<Real>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;
/// 4×4 matrix with [`Real`] entries.
pub type Mat4 = Matrix4<Real>;
/// 3×4 camera projection matrix `P = K [R | t]`.
pub type Mat34 = Matrix3x4<Real>;
/// 3×N matrix of homogeneous 2D points, one point per column.
pub type Mat3X = Matrix3xX<Real>;
/// 4×N matrix of homogeneous 3D points, one point per column.
pub type Mat4X = Matrix4xX<Real>;

/// Convert a 2D point in Euclidean coordinates into homogeneous coordinates.
///
/// Given a point `p = (x, y)`, returns the homogeneous vector `(x, y, 1)`.
pub fn to_homogeneous(p: &Pt2) -> Vec3 {
    Vec3::new(p.x, p.y, 1.0)
}

/// Convert a 3D homogeneous vector back to a 2D point.
///
/// The input is interpreted as `(x, y, w)` and the result is `(x / w, y / w)`.
/// The caller is responsible for ensuring that `w != 0`.
pub fn from_homogeneous(v: &Vec3) -> Pt2 {
    Pt2::new(v.x / v.z, v.y / v.z)
}

/// Stack 2D points as the columns of a 3×N homogeneous matrix.
pub fn homogeneous_columns(points: &[Pt2]) -> Mat3X {
    Mat3X::from_fn(points.len(), |r, c| match r {
        0 => points[c].x,
        1 => points[c].y,
        _ => 1.0,
    })
}

/// Stack 3D points as the columns of a 4×N homogeneous matrix.
pub fn homogeneous_columns_3d(points: &[Pt3]) -> Mat4X {
    Mat4X::from_fn(points.len(), |r, c| match r {
        0 => points[c].x,
        1 => points[c].y,
        2 => points[c].z,
        _ => 1.0,
    })
}

/// Read the columns of a 3×N homogeneous matrix back as Euclidean 2D points.
///
/// Each column `(x, y, w)` becomes `(x / w, y / w)`. The caller is
/// responsible for ensuring that no column has `w == 0`.
pub fn euclidean_columns(m: &Mat3X) -> Vec<Pt2> {
    m.column_iter()
        .map(|c| Pt2::new(c[0] / c[2], c[1] / c[2]))
        .collect()
}

/// Skew-symmetric cross-product matrix `[v]ₓ` such that `[v]ₓ w = v × w`.
pub fn skew_symmetric(v: &Vec3) -> Mat3 {
    Mat3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}
