//! End-to-end two-view tests on a synthetic stereo pair: robust
//! fundamental estimation, metric pose recovery, triangulation,
//! uncalibrated reconstruction, and camera resection.

use mvg_core::{
    homogeneous_columns, skew_symmetric, to_homogeneous, Mat3, Mat34, Pt2, Pt3, RansacOptions,
    Real, Vec3,
};
use mvg_linear::{
    decompose_essential, dlt_camera_matrix, dlt_homography_ransac, fundamental_8point,
    fundamental_ransac, select_by_cheirality, triangulate, ProjectiveCamera,
};
use nalgebra::Rotation3;

fn camera_pair() -> (Mat3, Mat3) {
    let k1 = Mat3::new(820.0, 0.0, 640.0, 0.0, 810.0, 360.0, 0.0, 0.0, 1.0);
    let k2 = Mat3::new(790.0, 0.0, 620.0, 0.0, 800.0, 380.0, 0.0, 0.0, 1.0);
    (k1, k2)
}

fn relative_motion() -> (Rotation3<Real>, Vec3) {
    (
        Rotation3::from_euler_angles(0.03, -0.04, 0.02),
        Vec3::new(0.3, 0.05, 0.12),
    )
}

/// General scene: a grid spread over three depth planes.
fn scene_points() -> Vec<Pt3> {
    let mut points = Vec::new();
    for layer in 0..3 {
        for y in 0..3 {
            for x in 0..4 {
                points.push(Pt3::new(
                    x as Real * 0.35 - 0.5,
                    y as Real * 0.3 - 0.3,
                    2.2 + layer as Real * 0.45 + (x + y) as Real * 0.02,
                ));
            }
        }
    }
    points
}

fn make_p(k: &Mat3, rot: &Rotation3<Real>, t: &Vec3) -> Mat34 {
    let mut rt = Mat34::zeros();
    rt.fixed_view_mut::<3, 3>(0, 0).copy_from(rot.matrix());
    rt.set_column(3, t);
    k * rt
}

fn project(p: &Mat34, pw: &Pt3) -> Pt2 {
    let x = p * nalgebra::Vector4::new(pw.x, pw.y, pw.z, 1.0);
    Pt2::new(x.x / x.z, x.y / x.z)
}

/// Pixel coordinates mapped through `K^-1`, dehomogenized.
fn normalized(k_inv: &Mat3, p: &Pt2) -> Pt2 {
    let v = k_inv * to_homogeneous(p);
    Pt2::new(v.x / v.z, v.y / v.z)
}

/// Relative error between two matrices defined only up to scale.
fn shape_error(est: &Mat3, gt: &Mat3) -> Real {
    let den = est.dot(est);
    if den <= 1e-12 {
        return Real::INFINITY;
    }
    (est * (gt.dot(est) / den) - gt).norm() / gt.norm()
}

fn rotation_error(a: &Mat3, b: &Mat3) -> Real {
    let r_diff = a.transpose() * b;
    let cos_theta = ((r_diff.trace() - 1.0) * 0.5).clamp(-1.0, 1.0);
    cos_theta.acos()
}

/// Projections of the scene in both views, plus gross mismatches appended
/// after the clean correspondences.
fn contaminated_views() -> (Vec<Pt2>, Vec<Pt2>, usize) {
    let (k1, k2) = camera_pair();
    let (rot, t) = relative_motion();
    let p1 = make_p(&k1, &Rotation3::identity(), &Vec3::zeros());
    let p2 = make_p(&k2, &rot, &t);

    let world = scene_points();
    let mut pts1: Vec<Pt2> = world.iter().map(|w| project(&p1, w)).collect();
    let mut pts2: Vec<Pt2> = world.iter().map(|w| project(&p2, w)).collect();
    let n_clean = pts1.len();

    let outliers = [
        (Pt2::new(40.0, 500.0), Pt2::new(900.0, 80.0)),
        (Pt2::new(1200.0, 30.0), Pt2::new(100.0, 700.0)),
        (Pt2::new(300.0, 650.0), Pt2::new(1150.0, 620.0)),
        (Pt2::new(700.0, 90.0), Pt2::new(60.0, 60.0)),
    ];
    for (a, b) in outliers {
        pts1.push(a);
        pts2.push(b);
    }

    (pts1, pts2, n_clean)
}

#[test]
fn robust_two_view_pipeline_recovers_metric_pose() {
    let (k1, k2) = camera_pair();
    let (rot, t) = relative_motion();
    let (pts1, pts2, n_clean) = contaminated_views();

    let opts = RansacOptions {
        max_iters: 500,
        thresh: 1e-6,
        min_consensus: 16,
        seed: 42,
    };
    let result = fundamental_ransac(&pts1, &pts2, &opts).expect("robust fundamental");
    println!(
        "robust F: {} inliers, mean residual {:.3e}, {} iterations",
        result.inliers.len(),
        result.mean_residual,
        result.iterations
    );
    assert_eq!(
        result.inliers,
        (0..n_clean).collect::<Vec<_>>(),
        "consensus must be exactly the clean correspondences"
    );

    let k1_inv = k1.try_inverse().unwrap();
    let k2_inv = k2.try_inverse().unwrap();
    let f_gt = k2_inv.transpose() * skew_symmetric(&t) * rot.matrix() * k1_inv;
    let f_err = shape_error(&result.model, &f_gt);
    assert!(f_err < 1e-6, "fundamental error too large: {f_err}");

    // Transfer to the calibrated frame and recover the relative pose.
    let e = k2.transpose() * result.model * k1;
    let candidates = decompose_essential(&e).expect("essential decomposition");

    let n1: Vec<Pt2> = pts1[..n_clean]
        .iter()
        .map(|p| normalized(&k1_inv, p))
        .collect();
    let n2: Vec<Pt2> = pts2[..n_clean]
        .iter()
        .map(|p| normalized(&k2_inv, p))
        .collect();

    let sel = select_by_cheirality(&candidates, &n1, &n2).expect("cheirality");
    println!(
        "cheirality: candidate {} with {}/{} points in front",
        sel.index, sel.front_points, n_clean
    );
    assert_eq!(sel.front_points, n_clean);

    let rot_err = rotation_error(&sel.pose.rotation, rot.matrix());
    assert!(rot_err < 1e-6, "rotation error too large: {rot_err}");
    assert!(
        sel.pose.translation.dot(&t.normalize()) > 1.0 - 1e-6,
        "translation direction mismatch"
    );

    // Triangulate in the recovered frame; the reconstruction matches the
    // scene up to the unknown baseline length.
    let p1 = Mat34::identity();
    let p2 = sel.pose.camera_matrix();
    let x = triangulate(
        &homogeneous_columns(&n1),
        &homogeneous_columns(&n2),
        &p1,
        &p2,
    )
    .expect("triangulation");

    let world = scene_points();
    let scale = t.norm();
    let mut max_err: Real = 0.0;
    for (i, pw) in world.iter().enumerate() {
        let rec = Pt3::new(x[(0, i)] * scale, x[(1, i)] * scale, x[(2, i)] * scale);
        max_err = max_err.max((rec - pw).norm());
    }
    println!("metric reconstruction: max point error {max_err:.3e}");
    assert!(max_err < 1e-6, "reconstruction error too large: {max_err}");
}

#[test]
fn uncalibrated_pair_reprojects_exactly() {
    let (k1, k2) = camera_pair();
    let (rot, t) = relative_motion();
    let p1 = make_p(&k1, &Rotation3::identity(), &Vec3::zeros());
    let p2 = make_p(&k2, &rot, &t);

    let world = scene_points();
    let pts1: Vec<Pt2> = world.iter().map(|w| project(&p1, w)).collect();
    let pts2: Vec<Pt2> = world.iter().map(|w| project(&p2, w)).collect();

    let f = fundamental_8point(&pts1, &pts2).expect("fundamental");

    // Cameras derived from F alone define the scene only up to a projective
    // frame, but reprojection through them must reproduce the pixels.
    let cam1 = ProjectiveCamera::new(Mat34::identity());
    let cam2 = ProjectiveCamera::from_fundamental(&f).expect("camera from F");

    let x = triangulate(
        &homogeneous_columns(&pts1),
        &homogeneous_columns(&pts2),
        cam1.matrix(),
        cam2.matrix(),
    )
    .expect("projective triangulation");

    let r1 = cam1.project(&x);
    let r2 = cam2.project(&x);

    let mut max_err: Real = 0.0;
    for (i, (g1, g2)) in pts1.iter().zip(pts2.iter()).enumerate() {
        let e1 = ((r1[(0, i)] - g1.x).powi(2) + (r1[(1, i)] - g1.y).powi(2)).sqrt();
        let e2 = ((r2[(0, i)] - g2.x).powi(2) + (r2[(1, i)] - g2.y).powi(2)).sqrt();
        max_err = max_err.max(e1.max(e2));
    }
    println!("projective reprojection: max pixel error {max_err:.3e}");
    assert!(max_err < 1e-4, "reprojection error too large: {max_err}");
}

#[test]
fn planar_scene_homography_under_outliers() {
    let (k1, k2) = camera_pair();
    let (rot, t) = relative_motion();
    let p1 = make_p(&k1, &Rotation3::identity(), &Vec3::zeros());
    let p2 = make_p(&k2, &rot, &t);

    // Points on the plane z = 2.5.
    let depth = 2.5;
    let mut plane = Vec::new();
    for y in 0..4 {
        for x in 0..4 {
            plane.push(Pt3::new(
                x as Real * 0.3 - 0.45,
                y as Real * 0.25 - 0.35,
                depth,
            ));
        }
    }

    let mut src: Vec<Pt2> = plane.iter().map(|w| project(&p1, w)).collect();
    let mut dst: Vec<Pt2> = plane.iter().map(|w| project(&p2, w)).collect();
    let n_clean = src.len();
    src.push(Pt2::new(10.0, 10.0));
    dst.push(Pt2::new(1000.0, 700.0));
    src.push(Pt2::new(1270.0, 700.0));
    dst.push(Pt2::new(5.0, 320.0));

    let opts = RansacOptions {
        max_iters: 300,
        thresh: 1e-4,
        min_consensus: 8,
        seed: 7,
    };
    let result = dlt_homography_ransac(&src, &dst, &opts).expect("robust homography");
    assert_eq!(result.inliers, (0..n_clean).collect::<Vec<_>>());

    // Plane-induced homography: H = K2 (R + t n^T / d) K1^-1 for the
    // plane n^T X = d with n = (0, 0, 1).
    let n_over_d = Vec3::new(0.0, 0.0, 1.0 / depth);
    let h_gt = k2 * (rot.matrix() + t * n_over_d.transpose()) * k1.try_inverse().unwrap();
    let h_err = shape_error(&result.model, &h_gt);
    println!("planar homography error {h_err:.3e}");
    assert!(h_err < 1e-6, "homography error too large: {h_err}");
}

#[test]
fn resection_and_factorization_recover_the_camera() {
    let (_, k2) = camera_pair();
    let (rot, t) = relative_motion();
    let p_gt = make_p(&k2, &rot, &t);

    let world = scene_points();
    let image: Vec<Pt2> = world.iter().map(|w| project(&p_gt, w)).collect();

    let p_est = dlt_camera_matrix(&world, &image).expect("resection");
    let cam = ProjectiveCamera::new(p_est);
    let fact = cam.factor().expect("factorization");

    let k_est = fact.k / fact.k[(2, 2)];
    assert!(
        (k_est - k2).norm() < 1e-6 * k2.norm(),
        "intrinsics mismatch: {k_est}"
    );
    let rot_err = rotation_error(&fact.r, rot.matrix());
    assert!(rot_err < 1e-6, "rotation error too large: {rot_err}");
    assert!((fact.t - t).norm() < 1e-6, "translation mismatch");

    let center = cam.center().expect("center");
    let expected = -(rot.matrix().transpose() * t);
    assert!(
        (center.coords - expected).norm() < 1e-6,
        "camera center mismatch"
    );
}
