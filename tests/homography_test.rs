use glam::Vec2;
use logo_detection::config::RansacParams;
use logo_detection::optimization::homography::{
    find_homography_ransac, find_homography_two_pass, least_squares_homography, project_point,
    update_num_iters,
};
use nalgebra as na;

fn ground_truth() -> na::Matrix3<f64> {
    na::Matrix3::new(1.2, 0.1, 15.0, -0.05, 0.9, 8.0, 0.0005, -0.0002, 1.0)
}

fn grid(n: usize, step: f32) -> Vec<Vec2> {
    (0..n)
        .flat_map(|i| (0..n).map(move |j| Vec2::new(i as f32 * step + 3.0, j as f32 * step + 1.5)))
        .collect()
}

fn assert_close(a: &na::Matrix3<f64>, b: &na::Matrix3<f64>, pts: &[Vec2], tol: f32) {
    for p in pts {
        let pa = project_point(a, *p).unwrap();
        let pb = project_point(b, *p).unwrap();
        assert!(pa.distance(pb) < tol, "{:?} vs {:?}", pa, pb);
    }
}

#[test]
fn test_least_squares_exact() {
    let h = ground_truth();
    let src = grid(4, 20.0);
    let dst: Vec<Vec2> = src.iter().map(|p| project_point(&h, *p).unwrap()).collect();
    let est = least_squares_homography(&src, &dst).unwrap();
    assert!((est[(2, 2)] - 1.0).abs() < 1e-9);
    assert_close(&est, &h, &src, 1e-2);
}

#[test]
fn test_ransac_with_outliers() {
    let h = ground_truth();
    let mut src = grid(5, 15.0);
    let mut dst: Vec<Vec2> = src.iter().map(|p| project_point(&h, *p).unwrap()).collect();
    let outliers = [
        (Vec2::new(10.0, 10.0), Vec2::new(200.0, 5.0)),
        (Vec2::new(40.0, 12.0), Vec2::new(0.0, 150.0)),
        (Vec2::new(25.0, 60.0), Vec2::new(90.0, 90.0)),
        (Vec2::new(55.0, 33.0), Vec2::new(-40.0, 20.0)),
        (Vec2::new(7.0, 47.0), Vec2::new(300.0, 300.0)),
    ];
    for (s, d) in outliers {
        src.push(s);
        dst.push(d);
    }

    let fit = find_homography_ransac(&src, &dst, &RansacParams::default()).unwrap();
    assert_eq!(fit.num_inliers, 25);
    assert_eq!(fit.inlier_mask.len(), 30);
    assert!(fit.inlier_mask[..25].iter().all(|m| *m));
    assert!(fit.inlier_mask[25..].iter().all(|m| !*m));
    assert_close(&fit.h, &h, &src[..25], 0.05);

    let two_pass = find_homography_two_pass(&src, &dst, &RansacParams::default()).unwrap();
    assert_close(&two_pass, &h, &src[..25], 0.05);
}

#[test]
fn test_ransac_is_deterministic() {
    let h = ground_truth();
    let src = grid(4, 10.0);
    let mut dst: Vec<Vec2> = src.iter().map(|p| project_point(&h, *p).unwrap()).collect();
    dst[3] = Vec2::new(500.0, 500.0);
    let params = RansacParams::default();
    let a = find_homography_ransac(&src, &dst, &params).unwrap();
    let b = find_homography_ransac(&src, &dst, &params).unwrap();
    assert_eq!(a.h, b.h);
    assert_eq!(a.inlier_mask, b.inlier_mask);
}

#[test]
fn test_degenerate_inputs() {
    let params = RansacParams::default();
    // too few
    let three = vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
    assert!(find_homography_ransac(&three, &three, &params).is_none());

    // all on one line
    let line: Vec<Vec2> = (0..10).map(|i| Vec2::new(i as f32, 2.0 * i as f32)).collect();
    assert!(find_homography_two_pass(&line, &line, &params).is_none());

    // all on one point
    let same = vec![Vec2::new(5.0, 5.0); 8];
    assert!(find_homography_two_pass(&same, &same, &params).is_none());
    assert!(least_squares_homography(&same, &same).is_none());

    // length mismatch
    let src = grid(3, 10.0);
    assert!(find_homography_ransac(&src, &src[..5], &params).is_none());
}

#[test]
fn test_update_num_iters() {
    assert_eq!(update_num_iters(0.995, 0.0, 2000), 0);
    assert_eq!(update_num_iters(0.995, 1.0, 2000), 2000);
    let n = update_num_iters(0.995, 0.5, 2000);
    // ln(0.005) / ln(1 - 0.5^4)
    assert_eq!(n, 82);
    assert!(update_num_iters(0.995, 0.5, 50) <= 50);
}
