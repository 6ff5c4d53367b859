//! Core math and robust-fitting primitives for `multiview-rs`.
//!
//! Two building blocks live here: linear algebra type aliases (`Real`,
//! `Pt2`, `Mat3X`, ...) with homogeneous-coordinate helpers, and a generic
//! RANSAC engine ([`ransac`], [`Estimator`]) with a seeded random stream
//! and a rayon-parallel variant.
//!
//! The geometric solvers that plug into the engine (homography, epipolar
//! geometry, camera matrices, triangulation) live in `mvg-linear`.

/// Linear algebra type aliases and homogeneous helpers.
pub mod math;
/// Seeded consensus search over the [`Estimator`](ransac::Estimator) trait.
pub mod ransac;

pub use math::*;
pub use ransac::*;
