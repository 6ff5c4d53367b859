//! Projective camera model and camera matrix estimation.
//!
//! [`ProjectiveCamera`] wraps a 3x4 projection matrix `P = K [R | t]` with
//! point projection, a lazily cached RQ factorization into intrinsics,
//! rotation and translation, and camera center recovery. The module also
//! provides a normalized DLT resection solver and construction of a second
//! camera from a fundamental matrix.

use std::sync::OnceLock;

use crate::epipolar::{left_epipole, EpipolarError};
use crate::math::{mat34_from_svd_row, normalize_points_2d, normalize_points_3d};
use mvg_core::{skew_symmetric, to_homogeneous, Mat3, Mat34, Mat3X, Mat4X, Pt2, Pt3, Real, Vec3};
use nalgebra::DMatrix;
use thiserror::Error;

/// Errors produced by camera estimation and factorization.
#[derive(Debug, Clone, Error)]
pub enum CameraError {
    #[error("need at least {needed} point correspondences, got {got}")]
    NotEnoughPoints { needed: usize, got: usize },
    #[error("point sets differ in length: {left} vs {right}")]
    PointCountMismatch { left: usize, right: usize },
    #[error("svd failed in camera estimation")]
    SvdFailed,
    #[error("intrinsics matrix is not invertible")]
    SingularIntrinsics,
    #[error(transparent)]
    Epipolar(#[from] EpipolarError),
}

/// Camera matrix factorization into `K`, `R`, `t`.
#[derive(Debug, Clone)]
pub struct CameraFactorization {
    /// Upper-triangular intrinsics with positive diagonal.
    pub k: Mat3,
    /// World-to-camera rotation, `det(R) = +1`.
    pub r: Mat3,
    /// Translation expressed in the camera frame.
    pub t: Vec3,
}

/// A pinhole camera described by its 3x4 projection matrix.
#[derive(Debug, Clone)]
pub struct ProjectiveCamera {
    p: Mat34,
    factorization: OnceLock<Result<CameraFactorization, CameraError>>,
}

impl ProjectiveCamera {
    /// Wrap a projection matrix. Nothing is validated; a rank-deficient `P`
    /// surfaces as an error when [`factor`](Self::factor) is first called.
    pub fn new(p: Mat34) -> Self {
        Self {
            p,
            factorization: OnceLock::new(),
        }
    }

    /// Construct a second camera consistent with a fundamental matrix,
    /// assuming the first camera is the canonical `[I | 0]`.
    ///
    /// `P2 = [ [e']_x F | e' ]` with `e'` the left epipole, which satisfies
    /// the pair identity `[e']_x P2[:,:3] ~ F`. The result is projectively
    /// ambiguous: reprojection is exact but the frame is not metric. Fails
    /// when the epipole is at infinity.
    pub fn from_fundamental(f: &Mat3) -> Result<Self, CameraError> {
        let e = left_epipole(f)?;
        let e_h = to_homogeneous(&e);

        let mut p = Mat34::zeros();
        p.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(skew_symmetric(&e_h) * f));
        p.set_column(3, &e_h);
        Ok(Self::new(p))
    }

    /// The wrapped projection matrix.
    pub fn matrix(&self) -> &Mat34 {
        &self.p
    }

    /// Project homogeneous world points (4xN) to the image.
    ///
    /// Every column of the result is renormalized so its last row is 1,
    /// leaving pixel coordinates in the first two rows. Points on the
    /// principal plane (zero depth) divide by zero; callers are expected to
    /// feed points in front of the camera.
    pub fn project(&self, points: &Mat4X) -> Mat3X {
        let mut x = self.p * points;
        for i in 0..x.ncols() {
            let w = x[(2, i)];
            for r in 0..3 {
                x[(r, i)] /= w;
            }
        }
        x
    }

    /// Factor `P` into intrinsics, rotation, and translation.
    ///
    /// Computed once on first call and cached; repeated calls return the
    /// same result. The diagonal of `K` is forced positive, and `R`, `t`
    /// are negated together when needed so `R` is a proper rotation, which
    /// reconstructs `P` up to a global (possibly negative) scale.
    pub fn factor(&self) -> Result<&CameraFactorization, CameraError> {
        self.factorization
            .get_or_init(|| factorize(&self.p))
            .as_ref()
            .map_err(|e| e.clone())
    }

    /// Camera center in world coordinates, `-R^T t`.
    pub fn center(&self) -> Result<Pt3, CameraError> {
        let f = self.factor()?;
        Ok(Pt3::from(-(f.r.transpose() * f.t)))
    }
}

fn factorize(p: &Mat34) -> Result<CameraFactorization, CameraError> {
    let (k, mut r) = rq_decompose(&p.fixed_view::<3, 3>(0, 0).into_owned());

    let k_inv = k.try_inverse().ok_or(CameraError::SingularIntrinsics)?;
    let mut t = k_inv * p.column(3);

    // P is only defined up to scale; flip R and t together so R lands on
    // SO(3) while K keeps its positive diagonal.
    if r.determinant() < 0.0 {
        r = -r;
        t = -t;
    }

    Ok(CameraFactorization { k, r, t })
}

/// Factor a 3x3 matrix as upper-triangular times orthonormal (RQ).
///
/// Returns `(K, R)` with `K` upper-triangular and `R` orthonormal. The sign
/// ambiguity is fixed by forcing the diagonal of `K` positive.
pub fn rq_decompose(m: &Mat3) -> (Mat3, Mat3) {
    // Reversing row and column order turns QR of the transpose into RQ.
    let ex = Mat3::new(0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0);
    let qr = (ex * m.transpose() * ex).qr();
    let mut k = ex * qr.r().transpose() * ex;
    let mut r = ex * qr.q().transpose() * ex;

    // Sign convention: positive diagonal for the triangular factor.
    let mut d = Mat3::identity();
    for i in 0..3 {
        if k[(i, i)] < 0.0 {
            d[(i, i)] = -1.0;
        }
    }
    k *= d;
    r = d * r;

    (k, r)
}

/// Estimate a camera projection matrix from 3D-2D correspondences using
/// normalized DLT.
///
/// `world` are 3D points and `image` their pixel projections; at least six
/// are required. Both sets are normalized before solving the 2Nx12 system
/// and the output, defined up to a global scale, is de-normalized.
pub fn dlt_camera_matrix(world: &[Pt3], image: &[Pt2]) -> Result<Mat34, CameraError> {
    let n = world.len();
    if image.len() != n {
        return Err(CameraError::PointCountMismatch {
            left: n,
            right: image.len(),
        });
    }
    if n < 6 {
        return Err(CameraError::NotEnoughPoints { needed: 6, got: n });
    }

    let norm_w = normalize_points_3d(world);
    let norm_i = normalize_points_2d(image);

    let mut a = DMatrix::<Real>::zeros(2 * n, 12);

    for (i, (pw, pi)) in norm_w.points.iter().zip(norm_i.points.iter()).enumerate() {
        let x = pw.x;
        let y = pw.y;
        let z = pw.z;
        let u = pi.x;
        let v = pi.y;

        let r0 = 2 * i;
        let r1 = 2 * i + 1;

        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = z;
        a[(r0, 3)] = 1.0;
        a[(r0, 8)] = -u * x;
        a[(r0, 9)] = -u * y;
        a[(r0, 10)] = -u * z;
        a[(r0, 11)] = -u;

        a[(r1, 4)] = x;
        a[(r1, 5)] = y;
        a[(r1, 6)] = z;
        a[(r1, 7)] = 1.0;
        a[(r1, 8)] = -v * x;
        a[(r1, 9)] = -v * y;
        a[(r1, 10)] = -v * z;
        a[(r1, 11)] = -v;
    }

    let svd = a.svd(true, true);
    let v_t = svd.v_t.ok_or(CameraError::SvdFailed)?;
    let p_norm = mat34_from_svd_row(&v_t, v_t.nrows() - 1);

    let t_i_inv = norm_i
        .transform
        .try_inverse()
        .ok_or(CameraError::SvdFailed)?;
    Ok(t_i_inv * p_norm * norm_w.transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvg_core::homogeneous_columns_3d;
    use nalgebra::{Rotation3, Translation3, Vector4};

    fn make_p(k: &Mat3, rot: &Rotation3<f64>, t: &Vec3) -> Mat34 {
        let mut rt = Mat34::zeros();
        rt.fixed_view_mut::<3, 3>(0, 0).copy_from(rot.matrix());
        rt.set_column(3, t);
        k * rt
    }

    fn pinhole(p: &Mat34, pw: &Pt3) -> Pt2 {
        let x = p * pw.to_homogeneous();
        Pt2::new(x.x, x.y) / x.z
    }

    /// Rescale `est` onto `gt` by least squares, for up-to-scale comparison.
    fn scale_aligned(est: &Mat34, gt: &Mat34) -> Mat34 {
        est * (gt.dot(est) / est.dot(est))
    }

    #[test]
    fn projection_renormalizes_the_last_row() {
        let k = Mat3::new(870.0, 0.0, 505.0, 0.0, 845.0, 395.0, 0.0, 0.0, 1.0);
        let rot = Rotation3::from_euler_angles(0.1, -0.05, 0.2);
        let t = Vec3::new(0.15, -0.08, 1.1);
        let cam = ProjectiveCamera::new(make_p(&k, &rot, &t));

        let world = [
            Pt3::new(0.3, -0.2, 2.0),
            Pt3::new(-0.1, 0.4, 3.5),
            Pt3::new(0.0, 0.0, 2.8),
        ];
        let projected = cam.project(&homogeneous_columns_3d(&world));

        assert_eq!(projected.ncols(), world.len());
        for (i, pw) in world.iter().enumerate() {
            assert!((projected[(2, i)] - 1.0).abs() < 1e-12);
            let expected = pinhole(cam.matrix(), pw);
            assert!((projected[(0, i)] - expected.x).abs() < 1e-9);
            assert!((projected[(1, i)] - expected.y).abs() < 1e-9);
        }
    }

    #[test]
    fn rq_splits_triangular_from_rotation() {
        let k = Mat3::new(760.0, 2.0, 498.0, 0.0, 742.0, 377.0, 0.0, 0.0, 1.0);
        let rot = Rotation3::from_euler_angles(0.12, 0.23, -0.04);
        let r = rot.matrix();

        let (k_est, r_est) = rq_decompose(&(k * r));

        let k_scaled = k_est * (k[(2, 2)] / k_est[(2, 2)]);
        assert!((k_scaled - k).norm() < 1e-6, "triangular factor drifted");

        let align = r_est.transpose() * r;
        let cos_theta = ((align.trace() - 1.0) * 0.5).clamp(-1.0, 1.0);
        assert!(cos_theta.acos() < 1e-6, "rotation factor drifted");
    }

    #[test]
    fn factorization_roundtrip() {
        let k = Mat3::new(884.0, -1.5, 516.0, 0.0, 861.0, 402.0, 0.0, 0.0, 1.0);
        let rot = Rotation3::from_euler_angles(-0.08, 0.06, 0.19);
        let t = Vec3::new(-0.2, 0.1, 1.5);
        let p_gt = make_p(&k, &rot, &t);

        let cam = ProjectiveCamera::new(p_gt);
        let f = cam.factor().unwrap();

        for i in 0..3 {
            assert!(f.k[(i, i)] > 0.0, "K diagonal must be positive");
        }
        assert!((f.r.determinant() - 1.0).abs() < 1e-9);

        let mut rt = Mat34::zeros();
        rt.fixed_view_mut::<3, 3>(0, 0).copy_from(&f.r);
        rt.set_column(3, &f.t);
        let p_recon = f.k * rt;

        let diff = (scale_aligned(&p_recon, &p_gt) - p_gt).norm();
        assert!(diff < 1e-6, "reassembled P drifts: {}", diff);
    }

    #[test]
    fn factorization_is_cached() {
        let k = Mat3::new(912.0, 0.0, 498.0, 0.0, 906.0, 377.0, 0.0, 0.0, 1.0);
        let rot = Rotation3::from_euler_angles(0.0, 0.1, 0.0);
        let cam = ProjectiveCamera::new(make_p(&k, &rot, &Vec3::new(0.3, 0.0, 1.0)));

        let first = cam.factor().unwrap();
        let second = cam.factor().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn center_is_minus_rt_t() {
        let k = Mat3::new(850.0, 0.0, 320.0, 0.0, 830.0, 240.0, 0.0, 0.0, 1.0);
        let rot = Rotation3::from_euler_angles(0.2, -0.1, 0.05);
        let t = Vec3::new(0.4, -0.3, 2.0);
        let cam = ProjectiveCamera::new(make_p(&k, &rot, &t));

        let center = cam.center().unwrap();
        let expected = -(rot.matrix().transpose() * t);
        assert!((center.coords - expected).norm() < 1e-9);

        // The center projects to a vanishing image point: P c = 0.
        let c_h = Vector4::new(center.x, center.y, center.z, 1.0);
        assert!((cam.matrix() * c_h).norm() < 1e-6);
    }

    #[test]
    fn dlt_resection_recovers_the_camera() {
        let k = Mat3::new(842.0, 0.0, 509.0, 0.0, 855.0, 371.0, 0.0, 0.0, 1.0);
        let rot = Rotation3::from_euler_angles(0.14, -0.06, 0.11);
        let t = Translation3::new(0.12, -0.04, 1.3);
        let p_gt = make_p(&k, &rot, &t.vector);

        let mut world = Vec::new();
        let mut image = Vec::new();
        for z in 0..2 {
            for y in 0..3 {
                for x in 0..5 {
                    let pw = Pt3::new(x as Real * 0.25, y as Real * 0.18, 2.2 + z as Real * 0.15);
                    image.push(pinhole(&p_gt, &pw));
                    world.push(pw);
                }
            }
        }

        let p_est = dlt_camera_matrix(&world, &image).unwrap();

        let diff = (scale_aligned(&p_est, &p_gt) - p_gt).norm();
        assert!(diff < 1e-6, "resected P drifts: {}", diff);

        assert!(matches!(
            dlt_camera_matrix(&world[..5], &image[..5]),
            Err(CameraError::NotEnoughPoints { needed: 6, got: 5 })
        ));
    }

    #[test]
    fn camera_from_fundamental_reproduces_f() {
        let k = Mat3::new(820.0, 0.0, 512.0, 0.0, 795.0, 384.0, 0.0, 0.0, 1.0);
        let rot = Rotation3::from_euler_angles(0.02, -0.03, 0.01);
        let t = Vec3::new(0.2, 0.05, 0.1);

        let k_inv = k.try_inverse().unwrap();
        let mut f = k_inv.transpose() * skew_symmetric(&t) * rot.matrix() * k_inv;
        f /= f[(2, 2)];

        let cam2 = ProjectiveCamera::from_fundamental(&f).unwrap();
        let m = cam2.matrix().fixed_view::<3, 3>(0, 0).into_owned();
        let e = cam2.matrix().column(3).into_owned();

        // The pair ([I|0], P2) must induce the fundamental matrix again.
        let mut g = skew_symmetric(&e) * m;
        g /= g[(2, 2)];
        assert!((g - f).norm() < 1e-6 * f.norm(), "pair does not induce F");
    }
}
