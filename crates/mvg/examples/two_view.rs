//! Example demonstrating the full two-view estimation pipeline.
//!
//! This example shows:
//! - Robust fundamental matrix estimation from contaminated matches
//! - Transfer to the calibrated frame and essential decomposition
//! - Cheirality-based pose disambiguation
//! - Triangulation of the inlier correspondences
//!
//! Run with: cargo run --example two_view
//! Set RUST_LOG=debug to see per-iteration consensus logging.

use anyhow::Result;
use mvg::prelude::*;
use nalgebra::Rotation3;

fn main() -> Result<()> {
    env_logger::init();

    println!("=== Two-View Pipeline Example ===\n");

    // Ground truth configuration.
    let k = Mat3::new(750.0, 0.0, 512.0, 0.0, 735.0, 288.0, 0.0, 0.0, 1.0);
    let rot = Rotation3::from_euler_angles(0.04, -0.03, 0.02);
    let t = Vec3::new(0.25, 0.04, 0.1);

    let (pts1, pts2, n_clean) = generate_matches(&k, &rot, &t);
    println!(
        "Generated {} matches ({} clean, {} gross mismatches)",
        pts1.len(),
        n_clean,
        pts1.len() - n_clean
    );

    // Step 1: robust fundamental matrix.
    println!("\nStep 1: Robust fundamental matrix estimation...");
    let opts = RansacOptions {
        max_iters: 500,
        thresh: 1e-4,
        min_consensus: 20,
        seed: 11,
    };
    let f = fundamental_ransac(&pts1, &pts2, &opts)?;
    println!(
        "  {} inliers, mean Sampson residual {:.3e}, {} iterations",
        f.inliers.len(),
        f.mean_residual,
        f.iterations
    );

    // Step 2: essential matrix and candidate poses.
    println!("\nStep 2: Essential decomposition...");
    let e = k.transpose() * f.model * k;
    let candidates = decompose_essential(&e)?;
    for (i, cand) in candidates.poses.iter().enumerate() {
        println!(
            "  candidate {}: det(R) = {:.3}, t = ({:+.3}, {:+.3}, {:+.3})",
            i,
            cand.rotation.determinant(),
            cand.translation.x,
            cand.translation.y,
            cand.translation.z
        );
    }

    // Step 3: pick the physical pose by cheirality.
    println!("\nStep 3: Cheirality check...");
    let k_inv = k
        .try_inverse()
        .ok_or_else(|| anyhow::anyhow!("singular intrinsics"))?;
    let norm = |p: &Pt2| from_homogeneous(&(k_inv * to_homogeneous(p)));
    let n1: Vec<Pt2> = f.inliers.iter().map(|&i| norm(&pts1[i])).collect();
    let n2: Vec<Pt2> = f.inliers.iter().map(|&i| norm(&pts2[i])).collect();

    let sel = select_by_cheirality(&candidates, &n1, &n2)?;
    println!(
        "  candidate {} wins with {}/{} points in front",
        sel.index,
        sel.front_points,
        n1.len()
    );

    let angle_err = (sel.pose.rotation.transpose() * rot.matrix()).trace();
    let angle_err = (((angle_err - 1.0) * 0.5).clamp(-1.0, 1.0)).acos();
    let dir_err = sel
        .pose
        .translation
        .dot(&t.normalize())
        .clamp(-1.0, 1.0)
        .acos();
    println!("  rotation error: {:.2e} rad", angle_err);
    println!("  baseline direction error: {:.2e} rad", dir_err);

    // Step 4: triangulate the inliers in the recovered frame.
    println!("\nStep 4: Triangulation...");
    let p1 = Mat34::identity();
    let p2 = sel.pose.camera_matrix();
    let points = triangulate(
        &homogeneous_columns(&n1),
        &homogeneous_columns(&n2),
        &p1,
        &p2,
    )?;

    let depths: Vec<Real> = (0..points.ncols()).map(|i| points[(2, i)]).collect();
    let min_depth = depths.iter().cloned().fold(Real::INFINITY, Real::min);
    let max_depth = depths.iter().cloned().fold(Real::NEG_INFINITY, Real::max);
    println!(
        "  {} points, depth range [{:.2}, {:.2}] (baseline-scaled)",
        points.ncols(),
        min_depth,
        max_depth
    );

    println!("\n=== Pipeline completed successfully ===");
    Ok(())
}

/// Project a synthetic scene into both views and append gross mismatches.
fn generate_matches(k: &Mat3, rot: &Rotation3<Real>, t: &Vec3) -> (Vec<Pt2>, Vec<Pt2>, usize) {
    let project = |r: &Mat3, tr: &Vec3, pw: &Pt3| -> Pt2 {
        let pc = r * pw.coords + tr;
        let px = k * pc;
        Pt2::new(px.x / px.z, px.y / px.z)
    };

    let mut pts1 = Vec::new();
    let mut pts2 = Vec::new();
    for layer in 0..3 {
        for y in 0..4 {
            for x in 0..5 {
                let pw = Pt3::new(
                    x as Real * 0.3 - 0.6,
                    y as Real * 0.25 - 0.35,
                    2.0 + layer as Real * 0.5 + (x * y) as Real * 0.01,
                );
                pts1.push(project(&Mat3::identity(), &Vec3::zeros(), &pw));
                pts2.push(project(rot.matrix(), t, &pw));
            }
        }
    }
    let n_clean = pts1.len();

    // Decoy matches far off any epipolar line.
    let decoys = [
        (Pt2::new(40.0, 480.0), Pt2::new(880.0, 70.0)),
        (Pt2::new(1000.0, 35.0), Pt2::new(65.0, 510.0)),
        (Pt2::new(320.0, 85.0), Pt2::new(340.0, 520.0)),
        (Pt2::new(720.0, 400.0), Pt2::new(120.0, 120.0)),
        (Pt2::new(600.0, 300.0), Pt2::new(800.0, 25.0)),
    ];
    for (a, b) in decoys {
        pts1.push(a);
        pts2.push(b);
    }

    (pts1, pts2, n_clean)
}
