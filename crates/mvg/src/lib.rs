//! High-level entry crate for the `multiview-rs` toolbox.
//!
//! Robust multi-view geometry estimation: homographies, epipolar geometry,
//! camera matrices, and triangulation, with a generic RANSAC engine
//! underneath the robust variants.
//!
//! ## Direct solvers
//!
//! Every estimator is a plain function over point slices:
//!
//! ```
//! use mvg::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let square = [
//!     Pt2::new(0.0, 0.0),
//!     Pt2::new(1.0, 0.0),
//!     Pt2::new(1.0, 1.0),
//!     Pt2::new(0.0, 1.0),
//! ];
//! let shifted: Vec<Pt2> = square
//!     .iter()
//!     .map(|p| Pt2::new(p.x + 2.0, p.y + 3.0))
//!     .collect();
//!
//! let h = dlt_homography(&square, &shifted)?;
//! assert!((h[(0, 2)] - 2.0).abs() < 1e-9);
//! # Ok(())
//! # }
//! ```
//!
//! ## Robust estimation
//!
//! The `*_ransac` variants run the same solvers inside a seeded consensus
//! loop and report the model, its inliers, and the mean inlier residual:
//!
//! ```no_run
//! use mvg::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pixels_1: Vec<Pt2> = /* matched keypoints, first view */
//! # Vec::new();
//! let pixels_2: Vec<Pt2> = /* matched keypoints, second view */
//! # Vec::new();
//!
//! let opts = RansacOptions {
//!     max_iters: 500,
//!     thresh: 1e-2,
//!     min_consensus: 20,
//!     seed: 1,
//! };
//! let f = fundamental_ransac(&pixels_1, &pixels_2, &opts)?;
//! println!(
//!     "kept {} of {} matches, mean residual {:.3e}",
//!     f.inliers.len(),
//!     pixels_1.len(),
//!     f.mean_residual
//! );
//!
//! // With known intrinsics, transfer F to the calibrated frame and
//! // recover the relative pose from the inliers.
//! let k: Mat3 = /* camera intrinsics */
//! # Mat3::identity();
//! let k_inv = k.try_inverse().ok_or("singular K")?;
//! let e = k.transpose() * f.model * k;
//!
//! let norm = |p: &Pt2| from_homogeneous(&(k_inv * to_homogeneous(p)));
//! let n1: Vec<Pt2> = f.inliers.iter().map(|&i| norm(&pixels_1[i])).collect();
//! let n2: Vec<Pt2> = f.inliers.iter().map(|&i| norm(&pixels_2[i])).collect();
//!
//! let candidates = decompose_essential(&e)?;
//! let pose = select_by_cheirality(&candidates, &n1, &n2)?;
//! println!("{} points in front, R = {:?}", pose.front_points, pose.pose.rotation);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module organization
//!
//! - **[`core`]**: math types, homogeneous-coordinate helpers, and the
//!   generic RANSAC engine
//! - **[`linear`]**: closed-form two-view solvers (homography, fundamental
//!   matrix, essential decomposition, camera matrices, triangulation)
//! - **[`prelude`]**: one-stop imports for the common entry points
//!
//! ## Compatibility
//!
//! The `mvg` crate is the public compatibility boundary. The lower-level
//! crates are intended for advanced usage and may evolve more quickly.

/// Core math types, homogeneous helpers, and RANSAC primitives.
pub mod core {
    pub use mvg_core::*;
}

/// Closed-form multi-view estimation algorithms.
pub mod linear {
    pub use mvg_linear::*;
}

/// One-stop imports for the common entry points.
///
/// Import with `use mvg::prelude::*;` to get started quickly.
pub mod prelude {
    pub use crate::core::{
        from_homogeneous, homogeneous_columns, ransac, ransac_parallel, to_homogeneous, Estimator,
        Mat3, Mat34, Mat3X, Mat4X, Pt2, Pt3, RansacError, RansacOptions, RansacResult, Real, Vec2,
        Vec3,
    };

    pub use crate::linear::{
        affine_homography, decompose_essential, dlt_camera_matrix, dlt_homography,
        dlt_homography_ransac, fundamental_8point, fundamental_ransac, left_epipole,
        right_epipole, rq_decompose, sampson_distance, select_by_cheirality, triangulate,
        triangulate_point, CameraError, CameraFactorization, CandidatePoses, EpipolarError,
        EpipolarSolver, HomographyError, HomographySolver, PoseSelection, ProjectiveCamera,
        RelativePose, TriangulationError,
    };
}
