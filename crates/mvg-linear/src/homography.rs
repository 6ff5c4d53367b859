//! Plane-induced projective transforms between two views.
//!
//! Implements the normalized Direct Linear Transform (DLT), a restricted
//! affine variant, and a robust RANSAC wrapper. The homography `H` maps
//! points in the source view to points in the destination view:
//! `x_dst ~ H x_src`.
//!
//! Input points may be in any consistent units; conditioning is applied
//! internally for numerical stability and the output is de-conditioned.

use crate::math::{condition_points_2d, condition_points_2d_with_spread, mat3_from_svd_row};
use mvg_core::{
    from_homogeneous, ransac, to_homogeneous, Estimator, Mat3, Pt2, RansacError, RansacOptions,
    RansacResult,
};
use nalgebra::{DMatrix, Matrix2};
use thiserror::Error;

/// Errors produced by homography estimation.
#[derive(Debug, Clone, Error)]
pub enum HomographyError {
    #[error("need at least {needed} point correspondences, got {got}")]
    NotEnoughPoints { needed: usize, got: usize },
    #[error("point sets differ in length: {left} vs {right}")]
    PointCountMismatch { left: usize, right: usize },
    #[error("svd failed")]
    SvdFailed,
    #[error(transparent)]
    Ransac(#[from] RansacError),
}

/// Associated-function namespace for the homography estimators.
///
/// Mirrors [`EpipolarSolver`](crate::epipolar::EpipolarSolver); the free
/// functions in this module forward to the methods on this type.
#[derive(Debug, Clone, Copy)]
pub struct HomographySolver;

/// Estimate `H` such that `x_dst ~ H x_src` using the normalized DLT.
pub fn dlt_homography(src: &[Pt2], dst: &[Pt2]) -> Result<Mat3, HomographyError> {
    HomographySolver::dlt(src, dst)
}

/// Estimate an affine `H` (bottom row `[0, 0, 1]`) from point correspondences.
pub fn affine_homography(src: &[Pt2], dst: &[Pt2]) -> Result<Mat3, HomographyError> {
    HomographySolver::affine(src, dst)
}

/// Estimate a homography robustly from correspondences that include outliers.
pub fn dlt_homography_ransac(
    src: &[Pt2],
    dst: &[Pt2],
    opts: &RansacOptions,
) -> Result<RansacResult<Mat3>, HomographyError> {
    HomographySolver::dlt_ransac(src, dst, opts)
}

impl HomographySolver {
    /// Estimate a homography `H` such that `x_dst ~ H x_src` using the DLT.
    ///
    /// Each point set is conditioned independently (zero mean, unit spread)
    /// before solving `A h = 0` via SVD on the 2N×9 design matrix, and the
    /// result is de-conditioned with `C2⁻¹ H C1`. The returned homography is
    /// scaled so that `H[2,2] == 1` when possible.
    ///
    /// Conditioning keeps coincident inputs from dividing by zero, but a
    /// near-degenerate set (collinear or duplicate points) still yields an
    /// unreliable H. Callers should validate via reprojection error.
    pub fn dlt(src: &[Pt2], dst: &[Pt2]) -> Result<Mat3, HomographyError> {
        let n = src.len();
        if dst.len() != n {
            return Err(HomographyError::PointCountMismatch {
                left: n,
                right: dst.len(),
            });
        }
        if n < 4 {
            return Err(HomographyError::NotEnoughPoints { needed: 4, got: n });
        }

        let cond_src = condition_points_2d(src);
        let cond_dst = condition_points_2d(dst);

        let mut a = DMatrix::<f64>::zeros(2 * n, 9);

        for (i, (ps, pd)) in cond_src.points.iter().zip(cond_dst.points.iter()).enumerate() {
            let x = ps.x;
            let y = ps.y;
            let u = pd.x;
            let v = pd.y;

            let r0 = 2 * i;
            let r1 = 2 * i + 1;

            a[(r0, 0)] = -x;
            a[(r0, 1)] = -y;
            a[(r0, 2)] = -1.0;
            a[(r0, 6)] = u * x;
            a[(r0, 7)] = u * y;
            a[(r0, 8)] = u;

            a[(r1, 3)] = -x;
            a[(r1, 4)] = -y;
            a[(r1, 5)] = -1.0;
            a[(r1, 6)] = v * x;
            a[(r1, 7)] = v * y;
            a[(r1, 8)] = v;
        }

        // Solve A h = 0 via SVD: take the singular vector for the smallest
        // singular value. nalgebra's thin SVD drops the null-space row when
        // nrows < ncols, so pad the minimal 8x9 system square first.
        if a.nrows() < a.ncols() {
            let rows = a.nrows();
            let cols = a.ncols();
            let mut a_pad = DMatrix::<f64>::zeros(cols, cols);
            a_pad.view_mut((0, 0), (rows, cols)).copy_from(&a);
            a = a_pad;
        }

        let svd = a.svd(true, true);
        let v_t = svd.v_t.ok_or(HomographyError::SvdFailed)?;
        let h_cond = mat3_from_svd_row(&v_t, v_t.nrows() - 1);

        let t_dst_inv = cond_dst
            .transform
            .try_inverse()
            .ok_or(HomographyError::SvdFailed)?;
        let mut h = t_dst_inv * h_cond * cond_src.transform;

        let scale = h[(2, 2)];
        if scale.abs() > f64::EPSILON {
            h /= scale;
        }

        Ok(h)
    }

    /// Estimate an affine homography (no perspective terms).
    ///
    /// The bottom row is fixed to `[0, 0, 1]`, leaving a 2×2 linear part
    /// plus translation. Solved from three or more correspondences by
    /// stacking both conditioned sets into an N×4 matrix whose dominant
    /// right-singular pair spans `{(v, A v)}`, then recovering
    /// `A = C B⁺` from the stacked blocks. Both sets are conditioned with
    /// the spread of the source set.
    ///
    /// Intended for geometry that guarantees an affine relation, such as
    /// far-field or planar-parallel setups.
    pub fn affine(src: &[Pt2], dst: &[Pt2]) -> Result<Mat3, HomographyError> {
        let n = src.len();
        if dst.len() != n {
            return Err(HomographyError::PointCountMismatch {
                left: n,
                right: dst.len(),
            });
        }
        if n < 3 {
            return Err(HomographyError::NotEnoughPoints { needed: 3, got: n });
        }

        let cond_src = condition_points_2d(src);
        let cond_dst = condition_points_2d_with_spread(dst, cond_src.spread);

        // Rows are [x, y, u, v]; for an affine relation they live in a
        // two-dimensional subspace spanned by the top singular pair.
        let mut a = DMatrix::<f64>::zeros(n, 4);
        for (i, (ps, pd)) in cond_src.points.iter().zip(cond_dst.points.iter()).enumerate() {
            a[(i, 0)] = ps.x;
            a[(i, 1)] = ps.y;
            a[(i, 2)] = pd.x;
            a[(i, 3)] = pd.y;
        }

        let svd = a.svd(true, true);
        let v_t = svd.v_t.ok_or(HomographyError::SvdFailed)?;

        // tmp = V[:, :2], split into the source block B and destination
        // block C; the linear part is A = C * pinv(B).
        let mut b = Matrix2::<f64>::zeros();
        let mut c = Matrix2::<f64>::zeros();
        for col in 0..2 {
            b[(0, col)] = v_t[(col, 0)];
            b[(1, col)] = v_t[(col, 1)];
            c[(0, col)] = v_t[(col, 2)];
            c[(1, col)] = v_t[(col, 3)];
        }

        let b_pinv = b
            .pseudo_inverse(1e-12)
            .map_err(|_| HomographyError::SvdFailed)?;
        let lin = c * b_pinv;

        let h_cond = Mat3::new(
            lin[(0, 0)],
            lin[(0, 1)],
            0.0,
            lin[(1, 0)],
            lin[(1, 1)],
            0.0,
            0.0,
            0.0,
            1.0,
        );

        let t_dst_inv = cond_dst
            .transform
            .try_inverse()
            .ok_or(HomographyError::SvdFailed)?;
        let mut h = t_dst_inv * h_cond * cond_src.transform;

        let scale = h[(2, 2)];
        if scale.abs() > f64::EPSILON {
            h /= scale;
        }

        Ok(h)
    }

    /// Robust DLT over random minimal samples of four correspondences.
    ///
    /// The residual is Euclidean reprojection error: `H x_src` is
    /// dehomogenized and compared against `x_dst`. Returns the refit model
    /// together with the sorted inlier indices and their mean residual.
    pub fn dlt_ransac(
        src: &[Pt2],
        dst: &[Pt2],
        opts: &RansacOptions,
    ) -> Result<RansacResult<Mat3>, HomographyError> {
        if src.len() != dst.len() {
            return Err(HomographyError::PointCountMismatch {
                left: src.len(),
                right: dst.len(),
            });
        }

        #[derive(Clone)]
        struct Correspondence {
            src: Pt2,
            dst: Pt2,
        }

        struct DltEstimator;

        impl Estimator for DltEstimator {
            type Datum = Correspondence;
            type Model = Mat3;

            const MIN_SAMPLES: usize = 4;

            fn fit(data: &[Self::Datum], indices: &[usize]) -> Option<Self::Model> {
                let (src, dst): (Vec<_>, Vec<_>) =
                    indices.iter().map(|&i| (data[i].src, data[i].dst)).unzip();
                HomographySolver::dlt(&src, &dst).ok()
            }

            fn residual(model: &Self::Model, datum: &Self::Datum) -> f64 {
                let mapped = from_homogeneous(&(model * to_homogeneous(&datum.src)));
                (mapped - datum.dst).norm()
            }

            fn is_degenerate(data: &[Self::Datum], indices: &[usize]) -> bool {
                if indices.len() < 3 {
                    return false;
                }
                // Three collinear source points already make the minimal
                // sample rank-deficient.
                let a = data[indices[0]].src;
                let b = data[indices[1]].src;
                let c = data[indices[2]].src;
                (b - a).perp(&(c - a)).abs() < 1e-9
            }
        }

        let data: Vec<Correspondence> = src
            .iter()
            .zip(dst)
            .map(|(&src, &dst)| Correspondence { src, dst })
            .collect();

        Ok(ransac::<DltEstimator>(&data, opts)?)
    }
}
