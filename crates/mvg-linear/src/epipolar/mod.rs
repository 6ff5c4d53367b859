//! Two-view epipolar geometry: fundamental and essential matrices.
//!
//! Includes the normalized 8-point solver with a robust RANSAC wrapper,
//! epipole extraction, and decomposition of the essential matrix into
//! candidate poses with cheirality-based disambiguation.
//!
//! Coordinate conventions: the fundamental matrix `F` works on raw pixel
//! coordinates, while the essential matrix `E` assumes the intrinsics have
//! already been removed, i.e. points premultiplied by `K^{-1}`.

use mvg_core::{Mat3, Pt2, RansacError, RansacOptions, RansacResult};
use thiserror::Error;

mod decomposition;
mod fundamental;

pub use decomposition::{
    decompose_essential, select_by_cheirality, CandidatePoses, PoseSelection, RelativePose,
};
pub use fundamental::{
    fundamental_8point, fundamental_ransac, left_epipole, right_epipole, sampson_distance,
};

/// Errors produced by the epipolar solvers.
#[derive(Debug, Clone, Error)]
pub enum EpipolarError {
    /// Fewer correspondences than the solver's minimum.
    #[error("need at least {needed} point correspondences, got {got}")]
    NotEnoughPoints { needed: usize, got: usize },
    /// The two correspondence sets have different lengths.
    #[error("point sets differ in length: {left} vs {right}")]
    PointCountMismatch { left: usize, right: usize },
    /// The SVD of a design or model matrix did not converge.
    #[error("svd failed in epipolar estimation")]
    SvdFailed,
    /// No candidate pose placed any triangulated point in front of both cameras.
    #[error("cheirality check rejected all candidate poses")]
    CheiralityFailed,
    /// Forwarded failure from the RANSAC engine.
    #[error(transparent)]
    Ransac(#[from] RansacError),
}

/// Associated-function namespace for the epipolar solvers.
///
/// Everything here is deterministic; randomness enters only through the
/// seeded RANSAC wrappers.
#[derive(Debug, Clone, Copy)]
pub struct EpipolarSolver;

impl EpipolarSolver {
    /// Fundamental matrix from eight or more pixel correspondences.
    ///
    /// The returned matrix is forced to rank-2, scaled so `F[2,2] == 1`
    /// when possible, and satisfies `x2^T F x1 = 0` up to numerical error.
    pub fn fundamental_8point(pts1: &[Pt2], pts2: &[Pt2]) -> Result<Mat3, EpipolarError> {
        fundamental::fundamental_8point(pts1, pts2)
    }

    /// Robust fundamental matrix estimation using the 8-point algorithm
    /// inside RANSAC, with the Sampson distance as the residual.
    pub fn fundamental_ransac(
        pts1: &[Pt2],
        pts2: &[Pt2],
        opts: &RansacOptions,
    ) -> Result<RansacResult<Mat3>, EpipolarError> {
        fundamental::fundamental_ransac(pts1, pts2, opts)
    }

    /// Decompose an essential matrix into the four candidate relative poses.
    pub fn decompose_essential(e: &Mat3) -> Result<CandidatePoses, EpipolarError> {
        decomposition::decompose_essential(e)
    }

    /// Select the physically valid pose among the four candidates by
    /// counting triangulated points with positive depth in both cameras.
    pub fn select_by_cheirality(
        candidates: &CandidatePoses,
        pts1: &[Pt2],
        pts2: &[Pt2],
    ) -> Result<PoseSelection, EpipolarError> {
        decomposition::select_by_cheirality(candidates, pts1, pts2)
    }
}
