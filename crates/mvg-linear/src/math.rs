//! Mathematical utilities shared by the linear solvers.
//!
//! This module provides the point-conditioning routines used before
//! DLT-style estimation and small SVD extraction helpers:
//!
//! - **Mean/std conditioning** for homography DLT (epsilon-guarded)
//! - **Isotropic RMS normalization** for the 8-point solver and camera
//!   resection
//! - **SVD matrix extraction** helpers for recovering matrices from
//!   null-space rows
//!
//! # Conditioning
//!
//! Centering and rescaling point sets before solving `A x = 0` improves the
//! conditioning of the design matrix dramatically; without it, pixel-scale
//! coordinates make the smallest singular vector meaningless. Each routine
//! returns the applied transform so the solution can be de-conditioned, and
//! a raw `spread` diagnostic so callers can *detect* (not just survive)
//! near-degenerate inputs: the division itself is epsilon-guarded and never
//! hard-fails.

use log::debug;
use mvg_core::{Mat3, Mat34, Mat4, Pt2, Pt3, Real};
use nalgebra::DMatrix;

/// A conditioned 2D point set.
///
/// `transform` is the 3×3 matrix `T` such that `p_cond = T * p_homogeneous`.
/// `spread` is the raw scatter statistic the scale was derived from
/// (per-axis standard deviation or RMS radius, depending on the routine);
/// values near zero mean the input was (close to) coincident and the
/// conditioned set is unreliable.
#[derive(Debug, Clone)]
pub struct Conditioned2d {
    pub points: Vec<Pt2>,
    pub transform: Mat3,
    pub spread: Real,
}

/// A conditioned 3D point set; see [`Conditioned2d`].
#[derive(Debug, Clone)]
pub struct Conditioned3d {
    pub points: Vec<Pt3>,
    pub transform: Mat4,
    pub spread: Real,
}

/// Mean/standard-deviation conditioning for 2D points.
///
/// Subtracts the centroid and divides by the larger per-axis standard
/// deviation plus a small epsilon, so coincident inputs do not divide by
/// zero.
///
/// # Arguments
///
/// * `points` - Slice of 2D points to condition
///
/// # Returns
///
/// [`Conditioned2d`] with the scaled points, the transform to replay the
/// conditioning on homogeneous vectors, and the pre-epsilon standard
/// deviation as `spread`. An empty slice yields the identity transform and
/// zero spread.
///
/// # Used By
///
/// - Homography DLT ([`HomographySolver::dlt`](crate::HomographySolver::dlt))
/// - Affine homography ([`HomographySolver::affine`](crate::HomographySolver::affine))
pub fn condition_points_2d(points: &[Pt2]) -> Conditioned2d {
    if points.is_empty() {
        return Conditioned2d {
            points: Vec::new(),
            transform: Mat3::identity(),
            spread: 0.0,
        };
    }

    let (cx, cy) = centroid_2d(points);

    let n = points.len() as Real;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for p in points {
        var_x += (p.x - cx) * (p.x - cx);
        var_y += (p.y - cy) * (p.y - cy);
    }
    let spread = (var_x / n).sqrt().max((var_y / n).sqrt());
    if spread <= Real::EPSILON {
        debug!("near-degenerate 2d point set: spread {spread:.3e}");
    }

    conditioned_2d(points, cx, cy, spread)
}

/// Condition 2D points with an externally supplied spread.
///
/// Centers on the set's own centroid but reuses the caller's scatter
/// statistic for the scale. The affine homography conditions both point
/// sets with the spread of the source set so the two transforms share a
/// scale.
pub fn condition_points_2d_with_spread(points: &[Pt2], spread: Real) -> Conditioned2d {
    if points.is_empty() {
        return Conditioned2d {
            points: Vec::new(),
            transform: Mat3::identity(),
            spread,
        };
    }
    let (cx, cy) = centroid_2d(points);
    conditioned_2d(points, cx, cy, spread)
}

fn centroid_2d(points: &[Pt2]) -> (Real, Real) {
    let n = points.len() as Real;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for p in points {
        cx += p.x;
        cy += p.y;
    }
    (cx / n, cy / n)
}

fn conditioned_2d(points: &[Pt2], cx: Real, cy: Real, spread: Real) -> Conditioned2d {
    let scale = 1.0 / (spread + 1e-9);
    let t = Mat3::new(scale, 0.0, -scale * cx, 0.0, scale, -scale * cy, 0.0, 0.0, 1.0);

    let cond = points
        .iter()
        .map(|p| Pt2::new((p.x - cx) * scale, (p.y - cy) * scale))
        .collect();

    Conditioned2d {
        points: cond,
        transform: t,
        spread,
    }
}

/// Isotropic normalization for 2D points.
///
/// Centers the set at its centroid and scales so that the RMS distance
/// from the origin is `√2`.
///
/// # Arguments
///
/// * `points` - Slice of image points to normalize
///
/// # Returns
///
/// [`Conditioned2d`] with the RMS radius as `spread`. The division is
/// guarded at machine epsilon for coincident inputs.
///
/// # Used By
///
/// - Fundamental matrix estimation
///   ([`EpipolarSolver::fundamental_8point`](crate::EpipolarSolver::fundamental_8point))
/// - Camera resection ([`dlt_camera_matrix`](crate::dlt_camera_matrix))
///
/// # References
///
/// Hartley & Zisserman, "Multiple View Geometry in Computer Vision",
/// 2nd ed., Algorithm 11.1 (the normalized 8-point algorithm)
pub fn normalize_points_2d(points: &[Pt2]) -> Conditioned2d {
    if points.is_empty() {
        return Conditioned2d {
            points: Vec::new(),
            transform: Mat3::identity(),
            spread: 0.0,
        };
    }

    let (cx, cy) = centroid_2d(points);

    let n = points.len() as Real;
    let mut sum_sq = 0.0;
    for p in points {
        let dx = p.x - cx;
        let dy = p.y - cy;
        sum_sq += dx * dx + dy * dy;
    }
    let rms = (sum_sq / n).sqrt();
    if rms <= Real::EPSILON {
        debug!("near-degenerate 2d point set: rms radius {rms:.3e}");
    }

    let scale = (2.0_f64).sqrt() / rms.max(Real::EPSILON);
    let t = Mat3::new(scale, 0.0, -scale * cx, 0.0, scale, -scale * cy, 0.0, 0.0, 1.0);

    let norm = points
        .iter()
        .map(|p| Pt2::new((p.x - cx) * scale, (p.y - cy) * scale))
        .collect();

    Conditioned2d {
        points: norm,
        transform: t,
        spread: rms,
    }
}

/// Isotropic normalization for 3D points (RMS distance `√3`).
///
/// The 3D analog of [`normalize_points_2d`], used to condition world
/// points for camera resection.
pub fn normalize_points_3d(points: &[Pt3]) -> Conditioned3d {
    if points.is_empty() {
        return Conditioned3d {
            points: Vec::new(),
            transform: Mat4::identity(),
            spread: 0.0,
        };
    }

    let n = points.len() as Real;
    let mut cx = 0.0;
    let mut cy = 0.0;
    let mut cz = 0.0;
    for p in points {
        cx += p.x;
        cy += p.y;
        cz += p.z;
    }
    cx /= n;
    cy /= n;
    cz /= n;

    let mut sum_sq = 0.0;
    for p in points {
        let dx = p.x - cx;
        let dy = p.y - cy;
        let dz = p.z - cz;
        sum_sq += dx * dx + dy * dy + dz * dz;
    }
    let rms = (sum_sq / n).sqrt();
    if rms <= Real::EPSILON {
        debug!("near-degenerate 3d point set: rms radius {rms:.3e}");
    }

    let scale = (3.0_f64).sqrt() / rms.max(Real::EPSILON);
    let t = Mat4::new(
        scale,
        0.0,
        0.0,
        -scale * cx,
        0.0,
        scale,
        0.0,
        -scale * cy,
        0.0,
        0.0,
        scale,
        -scale * cz,
        0.0,
        0.0,
        0.0,
        1.0,
    );

    let norm = points
        .iter()
        .map(|p| Pt3::new((p.x - cx) * scale, (p.y - cy) * scale, (p.z - cz) * scale))
        .collect();

    Conditioned3d {
        points: norm,
        transform: t,
        spread: rms,
    }
}

/// Extract a 3×3 matrix from a row of an SVD `V^T` factor.
///
/// Reshapes a 9-element row (typically the last row, the null-space
/// direction) into a 3×3 matrix row-by-row.
///
/// # Panics
///
/// Panics if `v_t` does not have exactly 9 columns or `row_idx` is out of
/// bounds.
///
/// # Used By
///
/// - Homography estimation (extract H from the nullspace)
/// - Fundamental matrix estimation (extract F from the nullspace)
pub fn mat3_from_svd_row(v_t: &DMatrix<Real>, row_idx: usize) -> Mat3 {
    assert_eq!(v_t.ncols(), 9, "a 3x3 reshape needs a 9-entry row");
    let mut m = Mat3::zeros();
    for r in 0..3 {
        for c in 0..3 {
            m[(r, c)] = v_t[(row_idx, 3 * r + c)];
        }
    }
    m
}

/// Extract a 3×4 matrix from a row of an SVD `V^T` factor.
///
/// Reshapes a 12-element row into a 3×4 matrix row-by-row.
///
/// # Panics
///
/// Panics if `v_t` does not have exactly 12 columns or `row_idx` is out of
/// bounds.
///
/// # Used By
///
/// - Camera resection (extract P from the nullspace)
pub fn mat34_from_svd_row(v_t: &DMatrix<Real>, row_idx: usize) -> Mat34 {
    assert_eq!(v_t.ncols(), 12, "a 3x4 reshape needs a 12-entry row");
    let mut m = Mat34::zeros();
    for r in 0..3 {
        for c in 0..4 {
            m[(r, c)] = v_t[(row_idx, 4 * r + c)];
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvg_core::to_homogeneous;

    #[test]
    fn conditioning_centers_and_scales() {
        let points = vec![
            Pt2::new(120.0, 240.0),
            Pt2::new(205.0, 310.0),
            Pt2::new(160.0, 255.0),
            Pt2::new(185.0, 215.0),
        ];

        let cond = condition_points_2d(&points);

        let cx: f64 = cond.points.iter().map(|p| p.x).sum::<f64>() / cond.points.len() as f64;
        let cy: f64 = cond.points.iter().map(|p| p.y).sum::<f64>() / cond.points.len() as f64;
        assert!(cx.abs() < 1e-10, "centroid x not at origin: {}", cx);
        assert!(cy.abs() < 1e-10, "centroid y not at origin: {}", cy);
        assert!(cond.spread > 1.0, "pixel-scale input should have a large spread");

        // The transform replays the conditioning on homogeneous vectors.
        for (orig, c) in points.iter().zip(cond.points.iter()) {
            let mapped = cond.transform * to_homogeneous(orig);
            assert!((mapped.x - c.x).abs() < 1e-10);
            assert!((mapped.y - c.y).abs() < 1e-10);
            assert!((mapped.z - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn conditioning_survives_coincident_points() {
        let points = vec![Pt2::new(3.0, 4.0); 5];
        let cond = condition_points_2d(&points);
        assert!(cond.spread.abs() < 1e-12);
        for p in &cond.points {
            assert!(p.x.is_finite() && p.y.is_finite());
        }
    }

    #[test]
    fn shared_spread_reuses_the_scale() {
        let src = vec![
            Pt2::new(0.0, 0.0),
            Pt2::new(4.0, 0.0),
            Pt2::new(4.0, 4.0),
            Pt2::new(0.0, 4.0),
        ];
        let dst = vec![
            Pt2::new(100.0, 100.0),
            Pt2::new(101.0, 100.0),
            Pt2::new(101.0, 101.0),
            Pt2::new(100.0, 101.0),
        ];

        let cond_src = condition_points_2d(&src);
        let cond_dst = condition_points_2d_with_spread(&dst, cond_src.spread);

        assert_eq!(cond_src.transform[(0, 0)], cond_dst.transform[(0, 0)]);
        // Centering still comes from each set's own centroid.
        let cy: f64 =
            cond_dst.points.iter().map(|p| p.y).sum::<f64>() / cond_dst.points.len() as f64;
        assert!(cy.abs() < 1e-10);
    }

    #[test]
    fn normalization_reaches_rms_sqrt2() {
        let points = vec![
            Pt2::new(10.0, -4.0),
            Pt2::new(-3.0, 7.0),
            Pt2::new(0.5, 2.0),
            Pt2::new(6.0, 6.0),
            Pt2::new(-8.0, -1.0),
        ];

        let norm = normalize_points_2d(&points);

        let rms: f64 = (norm
            .points
            .iter()
            .map(|p| p.x * p.x + p.y * p.y)
            .sum::<f64>()
            / norm.points.len() as f64)
            .sqrt();
        assert!(
            (rms - 2.0_f64.sqrt()).abs() < 1e-10,
            "rms radius not sqrt(2): {}",
            rms
        );
    }

    #[test]
    fn normalization_3d_reaches_rms_sqrt3() {
        let points = vec![
            Pt3::new(1.5, 2.0, 3.5),
            Pt3::new(4.0, 5.5, 6.0),
            Pt3::new(-2.0, 0.0, 9.0),
            Pt3::new(0.0, -3.0, 4.0),
        ];

        let norm = normalize_points_3d(&points);

        let cx: f64 = norm.points.iter().map(|p| p.x).sum::<f64>() / norm.points.len() as f64;
        assert!(cx.abs() < 1e-10);

        let rms: f64 = (norm
            .points
            .iter()
            .map(|p| p.x * p.x + p.y * p.y + p.z * p.z)
            .sum::<f64>()
            / norm.points.len() as f64)
            .sqrt();
        assert!((rms - 3.0_f64.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn reshapes_a_nullspace_row_into_mat3() {
        let mut v_t = DMatrix::zeros(9, 9);
        for i in 0..9 {
            v_t[(8, i)] = (2 * i + 1) as f64;
        }

        let m = mat3_from_svd_row(&v_t, 8);

        assert_eq!(m[(0, 0)], 1.0);
        assert_eq!(m[(0, 1)], 3.0);
        assert_eq!(m[(1, 0)], 7.0);
        assert_eq!(m[(2, 2)], 17.0);
    }

    #[test]
    fn reshapes_a_nullspace_row_into_mat34() {
        let mut v_t = DMatrix::zeros(12, 12);
        for i in 0..12 {
            v_t[(11, i)] = (2 * i + 1) as f64;
        }

        let m = mat34_from_svd_row(&v_t, 11);

        assert_eq!(m[(0, 0)], 1.0);
        assert_eq!(m[(0, 3)], 7.0);
        assert_eq!(m[(1, 0)], 9.0);
        assert_eq!(m[(2, 3)], 23.0);
    }
}
