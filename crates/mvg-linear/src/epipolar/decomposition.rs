//! Relative pose extraction from an essential matrix.
//!
//! Recovers the four candidate camera poses from an essential matrix and
//! provides the cheirality check that disambiguates them by counting
//! triangulated points with positive depth in both cameras.

use log::debug;
use mvg_core::{to_homogeneous, Mat3, Mat34, Pt2, Vec3};

use crate::triangulation::triangulate_point;

use super::EpipolarError;

/// Relative pose of a second camera with respect to the first.
///
/// `x_cam2 = rotation * x_cam1 + translation`. Recovered from an essential
/// matrix the translation is unit-length (direction only).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativePose {
    pub rotation: Mat3,
    pub translation: Vec3,
}

impl RelativePose {
    /// Second-camera projection matrix `[R | t]` in normalized coordinates,
    /// pairing with the canonical first camera `[I | 0]`.
    pub fn camera_matrix(&self) -> Mat34 {
        let mut p = Mat34::zeros();
        p.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.rotation);
        p.set_column(3, &self.translation);
        p
    }
}

/// The four candidate poses recovered from an essential matrix.
///
/// The rotation ambiguity (twisted pair) times the translation sign
/// ambiguity gives exactly four candidates; only one places the scene in
/// front of both cameras. The wrapper type exists so callers cannot
/// mistake a candidate for the disambiguated pose; run
/// [`select_by_cheirality`] to pick the physical one.
#[derive(Debug, Clone, Copy)]
pub struct CandidatePoses {
    pub poses: [RelativePose; 4],
}

/// Outcome of cheirality-based pose disambiguation.
#[derive(Debug, Clone, Copy)]
pub struct PoseSelection {
    /// Index of the winning candidate in [`CandidatePoses::poses`].
    pub index: usize,
    /// The winning pose.
    pub pose: RelativePose,
    /// Number of correspondences triangulated in front of both cameras.
    pub front_points: usize,
}

/// Decompose an essential matrix into the four candidate poses.
///
/// The input is implicitly projected onto the closest valid essential
/// matrix: only `U` and `V^T` of its SVD enter the candidates, which is
/// equivalent to forcing the singular values to `(1, 1, 0)`. `V^T` is
/// negated when `det(U V^T) < 0`, which makes every candidate rotation a
/// proper rotation. Candidates are ordered `[U W V^T | ±u3]`,
/// `[U W^T V^T | ±u3]`.
pub fn decompose_essential(e: &Mat3) -> Result<CandidatePoses, EpipolarError> {
    let svd = e.svd(true, true);
    let u = svd.u.ok_or(EpipolarError::SvdFailed)?;
    let mut v_t = svd.v_t.ok_or(EpipolarError::SvdFailed)?;

    if (u * v_t).determinant() < 0.0 {
        v_t = -v_t;
    }

    let w = Mat3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);

    let r1 = u * w * v_t;
    let r2 = u * w.transpose() * v_t;

    let t = u.column(2).normalize();

    Ok(CandidatePoses {
        poses: [
            RelativePose {
                rotation: r1,
                translation: t,
            },
            RelativePose {
                rotation: r1,
                translation: -t,
            },
            RelativePose {
                rotation: r2,
                translation: t,
            },
            RelativePose {
                rotation: r2,
                translation: -t,
            },
        ],
    })
}

/// Select the physically valid pose by the cheirality of triangulated points.
///
/// For each candidate the correspondences (in normalized coordinates) are
/// triangulated against the canonical camera pair `[I | 0]`, `[R | t]`, and
/// the candidate with the most points at positive depth in both cameras
/// wins. Points whose triangulation fails are not counted. Fails with
/// [`EpipolarError::CheiralityFailed`] when no candidate places any point
/// in front of both cameras.
pub fn select_by_cheirality(
    candidates: &CandidatePoses,
    pts1: &[Pt2],
    pts2: &[Pt2],
) -> Result<PoseSelection, EpipolarError> {
    if pts1.len() != pts2.len() {
        return Err(EpipolarError::PointCountMismatch {
            left: pts1.len(),
            right: pts2.len(),
        });
    }
    if pts1.is_empty() {
        return Err(EpipolarError::NotEnoughPoints { needed: 1, got: 0 });
    }

    let p1 = Mat34::identity();

    let mut best: Option<PoseSelection> = None;
    for (index, pose) in candidates.poses.iter().enumerate() {
        let p2 = pose.camera_matrix();

        let mut front = 0usize;
        for (x1, x2) in pts1.iter().zip(pts2.iter()) {
            let point = match triangulate_point(&to_homogeneous(x1), &to_homogeneous(x2), &p1, &p2)
            {
                Ok(p) => p,
                Err(_) => continue,
            };

            let depth1 = point.z;
            let depth2 = (pose.rotation * point.coords + pose.translation).z;
            if depth1 > 0.0 && depth2 > 0.0 {
                front += 1;
            }
        }
        debug!("cheirality: candidate {index} puts {front} points in front");

        if best.as_ref().map_or(true, |b| front > b.front_points) {
            best = Some(PoseSelection {
                index,
                pose: *pose,
                front_points: front,
            });
        }
    }

    match best {
        Some(sel) if sel.front_points > 0 => Ok(sel),
        _ => Err(EpipolarError::CheiralityFailed),
    }
}
