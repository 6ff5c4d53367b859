//! Linear multi-view geometry solvers for `multiview-rs`.
//!
//! Direct (SVD-based) estimators for the two-view building blocks:
//! homographies, fundamental and essential matrices, camera projection
//! matrices, and point triangulation. All solvers work on conditioned
//! coordinates internally and report failures through per-module error
//! enums; robust variants plug the same solvers into the `mvg-core`
//! RANSAC engine.

pub mod camera;
pub mod epipolar;
pub mod homography;
pub mod math;
pub mod triangulation;

pub use camera::*;
pub use epipolar::*;
pub use homography::*;
pub use triangulation::*;
