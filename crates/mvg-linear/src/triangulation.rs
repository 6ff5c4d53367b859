//! Linear triangulation of 3D points from two views.
//!
//! Solves one homogeneous system per correspondence from the camera
//! projection matrices and image points.

use mvg_core::{Mat34, Mat3X, Mat4X, Pt3, Real, Vec3};
use nalgebra::{SMatrix, Vector4};
use thiserror::Error;

/// Errors produced by triangulation.
#[derive(Debug, Clone, Error)]
pub enum TriangulationError {
    /// The two point matrices have different column counts.
    #[error("point matrices differ in column count: {left} vs {right}")]
    PointCountMismatch { left: usize, right: usize },
    /// SVD of the stacked system failed.
    #[error("svd failed during triangulation")]
    SvdFailed,
    /// The homogeneous solution has a vanishing last coordinate.
    #[error("triangulation produced an invalid point")]
    InvalidPoint,
}

/// Triangulate a single 3D point from two views.
///
/// `x1` and `x2` are the homogeneous image points and `p1`, `p2` the
/// projection matrices. Stacks both projection constraints into a 6x6
/// homogeneous system, solves it via SVD, and dehomogenizes the nullspace
/// solution.
///
/// Near-parallel rays give numerically unstable (but finite) solutions
/// rather than an error; assess reliability by reprojecting. Only an
/// exactly vanishing last coordinate fails.
pub fn triangulate_point(
    x1: &Vec3,
    x2: &Vec3,
    p1: &Mat34,
    p2: &Mat34,
) -> Result<Pt3, TriangulationError> {
    let mut m = SMatrix::<Real, 6, 6>::zeros();
    m.fixed_view_mut::<3, 4>(0, 0).copy_from(p1);
    m.fixed_view_mut::<3, 4>(3, 0).copy_from(p2);
    m.fixed_view_mut::<3, 1>(0, 4).copy_from(&(-x1));
    m.fixed_view_mut::<3, 1>(3, 5).copy_from(&(-x2));

    let svd = m.svd(true, true);
    let v_t = svd.v_t.ok_or(TriangulationError::SvdFailed)?;
    let x_h = v_t.row(5);

    let w = x_h[3];
    if w.abs() <= Real::EPSILON {
        return Err(TriangulationError::InvalidPoint);
    }

    Ok(Pt3::new(x_h[0] / w, x_h[1] / w, x_h[2] / w))
}

/// Triangulate a batch of correspondences, columnwise.
///
/// `x1` and `x2` are 3xN matrices of homogeneous image points. Each column
/// is triangulated independently; the result is a 4xN matrix of
/// homogeneous world points with the last row renormalized to 1.
pub fn triangulate(
    x1: &Mat3X,
    x2: &Mat3X,
    p1: &Mat34,
    p2: &Mat34,
) -> Result<Mat4X, TriangulationError> {
    if x1.ncols() != x2.ncols() {
        return Err(TriangulationError::PointCountMismatch {
            left: x1.ncols(),
            right: x2.ncols(),
        });
    }

    let n = x1.ncols();
    let mut out = Mat4X::zeros(n);
    for i in 0..n {
        let a = x1.column(i).into_owned();
        let b = x2.column(i).into_owned();
        let p = triangulate_point(&a, &b, p1, p2)?;
        out.set_column(i, &Vector4::new(p.x, p.y, p.z, 1.0));
    }

    Ok(out)
}
