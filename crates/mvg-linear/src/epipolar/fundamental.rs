//! Normalized 8-point fundamental matrix estimation, Sampson residuals,
//! and epipole extraction.

use crate::math::{mat3_from_svd_row, normalize_points_2d};
use mvg_core::{
    from_homogeneous, ransac, to_homogeneous, Estimator, Mat3, Pt2, RansacOptions, RansacResult,
    Real, Vec3,
};
use nalgebra::DMatrix;

use super::EpipolarError;

/// Fundamental matrix via the normalized 8-point algorithm.
///
/// Each point set is translated to its centroid and scaled so the RMS
/// distance from the origin is `sqrt(2)` before building the linear system
/// for `x2^T F x1 = 0`. The nullspace solution is forced to rank-2 by
/// zeroing its smallest singular value, de-normalized with
/// `T2^T F_n T1`, and scaled so `F[2,2] == 1` when possible.
pub fn fundamental_8point(pts1: &[Pt2], pts2: &[Pt2]) -> Result<Mat3, EpipolarError> {
    let n = pts1.len();
    if pts2.len() != n {
        return Err(EpipolarError::PointCountMismatch {
            left: n,
            right: pts2.len(),
        });
    }
    if n < 8 {
        return Err(EpipolarError::NotEnoughPoints { needed: 8, got: n });
    }

    let norm1 = normalize_points_2d(pts1);
    let norm2 = normalize_points_2d(pts2);

    // Build design matrix A (n x 9) for x2^T F x1 = 0, one row per
    // correspondence, F flattened row-major.
    let mut a = DMatrix::<Real>::zeros(n, 9);

    for (i, (p1, p2)) in norm1.points.iter().zip(norm2.points.iter()).enumerate() {
        let x = p1.x;
        let y = p1.y;
        let xp = p2.x;
        let yp = p2.y;

        a[(i, 0)] = xp * x;
        a[(i, 1)] = xp * y;
        a[(i, 2)] = xp;
        a[(i, 3)] = yp * x;
        a[(i, 4)] = yp * y;
        a[(i, 5)] = yp;
        a[(i, 6)] = x;
        a[(i, 7)] = y;
        a[(i, 8)] = 1.0;
    }

    // Solve A f = 0 via SVD: take the singular vector for the smallest
    // singular value, padding square first so the thin SVD keeps it.
    if a.nrows() < a.ncols() {
        let rows = a.nrows();
        let cols = a.ncols();
        let mut a_pad = DMatrix::<Real>::zeros(cols, cols);
        a_pad.view_mut((0, 0), (rows, cols)).copy_from(&a);
        a = a_pad;
    }

    let svd = a.svd(true, true);
    let v_t = svd.v_t.ok_or(EpipolarError::SvdFailed)?;
    let mut f = mat3_from_svd_row(&v_t, v_t.nrows() - 1);

    // Force rank 2 by zeroing the smallest singular value.
    let svd_f = f.svd(true, true);
    let u = svd_f.u.ok_or(EpipolarError::SvdFailed)?;
    let mut s = svd_f.singular_values;
    let v_t = svd_f.v_t.ok_or(EpipolarError::SvdFailed)?;
    s[2] = 0.0;
    f = u * Mat3::from_diagonal(&s) * v_t;

    // Undo the conditioning transforms.
    f = norm2.transform.transpose() * f * norm1.transform;

    let scale = f[(2, 2)];
    if scale.abs() > Real::EPSILON {
        f /= scale;
    }

    Ok(f)
}

/// Sampson distance of a correspondence to the epipolar constraint.
///
/// First-order approximation of the squared geometric error: the algebraic
/// residual `x2^T F x1` squared, divided by the gradient magnitude built
/// from the first two components of `F x1` and `F x2`. Comparable across
/// correspondences, unlike the raw algebraic residual.
pub fn sampson_distance(f: &Mat3, x1: &Pt2, x2: &Pt2) -> Real {
    let h1 = to_homogeneous(x1);
    let h2 = to_homogeneous(x2);

    let fx1 = f * h1;
    let fx2 = f * h2;
    let denom = fx1.x * fx1.x + fx1.y * fx1.y + fx2.x * fx2.x + fx2.y * fx2.y;
    let denom = denom.max(1e-12);

    let val = h2.dot(&fx1);
    val * val / denom
}

/// Right epipole of a fundamental matrix, `F e = 0`.
///
/// Extracted as the right-singular vector for the smallest singular value
/// and dehomogenized. For a camera pair this is the image of the second
/// camera's center in the first view. An epipole at infinity dehomogenizes
/// to non-finite coordinates; callers needing the projective epipole should
/// work with the nullspace vector directly.
pub fn right_epipole(f: &Mat3) -> Result<Pt2, EpipolarError> {
    let svd = f.svd(true, true);
    let v_t = svd.v_t.ok_or(EpipolarError::SvdFailed)?;
    let e = Vec3::new(v_t[(2, 0)], v_t[(2, 1)], v_t[(2, 2)]);
    Ok(from_homogeneous(&e))
}

/// Left epipole of a fundamental matrix, `e'^T F = 0`.
///
/// Null vector of `F^T`; the image of the first camera's center in the
/// second view.
pub fn left_epipole(f: &Mat3) -> Result<Pt2, EpipolarError> {
    right_epipole(&f.transpose())
}

/// Robust fundamental matrix estimation using the 8-point algorithm inside
/// RANSAC.
///
/// The residual is the Sampson distance, so `opts.thresh` is in its squared
/// units. Returns the refit model together with the sorted inlier indices
/// and their mean residual.
pub fn fundamental_ransac(
    pts1: &[Pt2],
    pts2: &[Pt2],
    opts: &RansacOptions,
) -> Result<RansacResult<Mat3>, EpipolarError> {
    if pts1.len() != pts2.len() {
        return Err(EpipolarError::PointCountMismatch {
            left: pts1.len(),
            right: pts2.len(),
        });
    }

    #[derive(Clone)]
    struct PixelMatch {
        a: Pt2,
        b: Pt2,
    }

    struct EightPointEstimator;

    impl Estimator for EightPointEstimator {
        type Datum = PixelMatch;
        type Model = Mat3;

        const MIN_SAMPLES: usize = 8;

        fn fit(data: &[Self::Datum], indices: &[usize]) -> Option<Self::Model> {
            let (p1, p2): (Vec<_>, Vec<_>) =
                indices.iter().map(|&i| (data[i].a, data[i].b)).unzip();
            fundamental_8point(&p1, &p2).ok()
        }

        fn residual(model: &Self::Model, datum: &Self::Datum) -> f64 {
            sampson_distance(model, &datum.a, &datum.b)
        }
    }

    let data: Vec<PixelMatch> = pts1
        .iter()
        .zip(pts2)
        .map(|(&a, &b)| PixelMatch { a, b })
        .collect();

    Ok(ransac::<EightPointEstimator>(&data, opts)?)
}
