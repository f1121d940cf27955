use glam::Vec2;
use log::{debug, trace};
use nalgebra as na;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::config::RansacParams;

/// Correspondences in a minimal sample.
pub const MODEL_POINTS: usize = 4;
const MAX_SAMPLE_ATTEMPTS: usize = 300;

/// Result of one robust fit.
#[derive(Debug, Clone)]
pub struct HomographyFit {
    pub h: na::Matrix3<f64>,
    /// One flag per input correspondence, true for inliers of the best model.
    pub inlier_mask: Vec<bool>,
    pub num_inliers: usize,
}

/// Moves the centroid to the origin and scales the mean distance to sqrt(2).
fn normalize_points(pts: &[Vec2]) -> Option<(Vec<na::Vector2<f64>>, na::Matrix3<f64>)> {
    let n = pts.len() as f64;
    let (sx, sy) = pts
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    let (cx, cy) = (sx / n, sy / n);
    let mean_dist = pts
        .iter()
        .map(|p| ((p.x as f64 - cx).powi(2) + (p.y as f64 - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist < f64::EPSILON {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = na::Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts
        .iter()
        .map(|p| na::Vector2::new(s * (p.x as f64 - cx), s * (p.y as f64 - cy)))
        .collect();
    Some((normalized, t))
}

/// The two DLT equations contributed by one correspondence.
fn dlt_rows(p: &na::Vector2<f64>, q: &na::Vector2<f64>) -> [[f64; 9]; 2] {
    let (x, y, u, v) = (p.x, p.y, q.x, q.y);
    [
        [0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v],
        [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, -u],
    ]
}

/// Undoes the normalization and scales the result so that `h[(2, 2)] == 1`
/// when possible.
fn denormalize(
    h_n: na::Matrix3<f64>,
    t_src: &na::Matrix3<f64>,
    t_dst: &na::Matrix3<f64>,
) -> Option<na::Matrix3<f64>> {
    let h = t_dst.try_inverse()? * h_n * t_src;
    let h = if h[(2, 2)].abs() > f64::EPSILON {
        h / h[(2, 2)]
    } else {
        h / h.norm()
    };
    is_valid_homography(&h).then_some(h)
}

/// Exact homography through four correspondences.
///
/// The 8x9 DLT system has a one-dimensional null space, which is the last
/// column of the complete Q factor of its transpose.
fn h4_solver(src: &[Vec2], dst: &[Vec2]) -> Option<na::Matrix3<f64>> {
    let (src_n, t_src) = normalize_points(src)?;
    let (dst_n, t_dst) = normalize_points(dst)?;

    let mut m1: faer::Mat<f64> = faer::Mat::zeros(2 * MODEL_POINTS, 9);
    for (i, (p, q)) in src_n.iter().zip(&dst_n).enumerate() {
        for (k, row) in dlt_rows(p, q).iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                unsafe {
                    *m1.get_mut_unchecked(2 * i + k, c) = *v;
                }
            }
        }
    }
    let q_mat = m1.transpose().qr().compute_Q();
    let q_mat_t = q_mat.transpose();
    let n = q_mat_t.subrows(8, 1);
    let h_n = na::Matrix3::from_fn(|r, c| *n.get(0, 3 * r + c));
    denormalize(h_n, &t_src, &t_dst)
}

/// Least-squares homography through any number (>= 4) of correspondences:
/// the eigenvector of `A^T A` with the smallest eigenvalue.
pub fn least_squares_homography(src: &[Vec2], dst: &[Vec2]) -> Option<na::Matrix3<f64>> {
    if src.len() != dst.len() || src.len() < MODEL_POINTS {
        return None;
    }
    let (src_n, t_src) = normalize_points(src)?;
    let (dst_n, t_dst) = normalize_points(dst)?;

    let mut ata = na::DMatrix::<f64>::zeros(9, 9);
    for (p, q) in src_n.iter().zip(&dst_n) {
        for row in dlt_rows(p, q) {
            let r = na::DVector::from_row_slice(&row);
            ata += &r * r.transpose();
        }
    }
    let eigen = ata.symmetric_eigen();
    let (min_idx, _) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let v = eigen.eigenvectors.column(min_idx);
    let h_n = na::Matrix3::from_fn(|r, c| v[3 * r + c]);
    denormalize(h_n, &t_src, &t_dst)
}

pub fn is_valid_homography(h: &na::Matrix3<f64>) -> bool {
    if h.iter().any(|v| !v.is_finite()) {
        return false;
    }
    let scale = h.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    scale > 0.0 && h.determinant().abs() > f64::EPSILON * scale.powi(3)
}

/// Maps one point; `None` when it lands on the line at infinity.
pub fn project_point(h: &na::Matrix3<f64>, p: Vec2) -> Option<Vec2> {
    let v = h * na::Vector3::new(p.x as f64, p.y as f64, 1.0);
    if v.z.abs() < f64::EPSILON {
        return None;
    }
    Some(Vec2::new((v.x / v.z) as f32, (v.y / v.z) as f32))
}

/// Maps every point, failing if any of them goes to infinity.
pub fn perspective_transform(h: &na::Matrix3<f64>, pts: &[Vec2]) -> Option<Vec<Vec2>> {
    pts.iter().map(|p| project_point(h, *p)).collect()
}

fn reprojection_error_sq(h: &na::Matrix3<f64>, p: Vec2, q: Vec2) -> f64 {
    match project_point(h, p) {
        Some(r) => ((r.x - q.x) as f64).powi(2) + ((r.y - q.y) as f64).powi(2),
        None => f64::MAX,
    }
}

fn inlier_mask(h: &na::Matrix3<f64>, src: &[Vec2], dst: &[Vec2], thr_sq: f64) -> Vec<bool> {
    src.iter()
        .zip(dst)
        .map(|(p, q)| reprojection_error_sq(h, *p, *q) <= thr_sq)
        .collect()
}

fn cross(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    let (d1, d2) = (b - a, c - a);
    d1.x * d2.y - d1.y * d2.x
}

fn collinear(a: Vec2, b: Vec2, c: Vec2) -> bool {
    let (d1, d2) = (b - a, c - a);
    cross(a, b, c).abs() <= f32::EPSILON * (d1.x.abs() + d1.y.abs() + d2.x.abs() + d2.y.abs())
}

/// Rejects samples with three collinear points on either side, or whose
/// triangles flip orientation for some triples but not all.
fn is_good_sample(src: &[Vec2], dst: &[Vec2]) -> bool {
    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (1, 2, 3), (0, 2, 3), (0, 1, 3)];
    let mut flipped = 0;
    for (i, j, k) in TRIPLES {
        if collinear(src[i], src[j], src[k]) || collinear(dst[i], dst[j], dst[k]) {
            return false;
        }
        if (cross(src[i], src[j], src[k]) < 0.0) != (cross(dst[i], dst[j], dst[k]) < 0.0) {
            flipped += 1;
        }
    }
    flipped == 0 || flipped == TRIPLES.len()
}

/// Iterations needed to hit `confidence` given the current outlier ratio,
/// never more than `max_iters`.
pub fn update_num_iters(confidence: f64, outlier_ratio: f64, max_iters: usize) -> usize {
    let num = (1.0 - confidence).max(f64::MIN_POSITIVE);
    let denom = 1.0 - (1.0 - outlier_ratio).powi(MODEL_POINTS as i32);
    if denom < f64::MIN_POSITIVE {
        return 0;
    }
    let (num, denom) = (num.ln(), denom.ln());
    if denom >= 0.0 || -num >= max_iters as f64 * (-denom) {
        max_iters
    } else {
        (num / denom).round() as usize
    }
}

/// RANSAC homography from `src` to `dst`.
///
/// Samples are drawn from a `ChaCha8Rng` seeded with `params.seed`, so the
/// result only depends on the inputs. The best model is polished by a
/// least-squares fit over its inliers; the mask is that of the best model.
pub fn find_homography_ransac(
    src: &[Vec2],
    dst: &[Vec2],
    params: &RansacParams,
) -> Option<HomographyFit> {
    let n = src.len();
    if n != dst.len() || n < MODEL_POINTS {
        return None;
    }
    let thr_sq = params.reprojection_threshold * params.reprojection_threshold;
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut nums: Vec<usize> = (0..n).collect();
    let mut best: Option<(na::Matrix3<f64>, usize)> = None;
    let mut niters = params.max_iters;
    let mut iter = 0;

    while iter < niters {
        iter += 1;
        let mut sample = None;
        for _ in 0..MAX_SAMPLE_ATTEMPTS {
            let (picked, _) = nums.partial_shuffle(&mut rng, MODEL_POINTS);
            let s: Vec<Vec2> = picked.iter().map(|&i| src[i]).collect();
            let d: Vec<Vec2> = picked.iter().map(|&i| dst[i]).collect();
            if is_good_sample(&s, &d) {
                sample = Some((s, d));
                break;
            }
        }
        let Some((s, d)) = sample else {
            debug!("no non-degenerate sample in {} attempts", MAX_SAMPLE_ATTEMPTS);
            break;
        };
        let Some(h) = h4_solver(&s, &d) else {
            continue;
        };
        let count = inlier_mask(&h, src, dst, thr_sq).iter().filter(|&&m| m).count();
        if best.as_ref().is_none_or(|(_, c)| count > *c) {
            best = Some((h, count));
            let outlier_ratio = (n - count) as f64 / n as f64;
            niters = update_num_iters(params.confidence, outlier_ratio, niters);
        }
    }
    trace!("ransac stopped after {} of {} iterations", iter, params.max_iters);

    let (h, num_inliers) = best?;
    if num_inliers < MODEL_POINTS {
        return None;
    }
    let mask = inlier_mask(&h, src, dst, thr_sq);
    let (in_src, in_dst): (Vec<Vec2>, Vec<Vec2>) = src
        .iter()
        .zip(dst)
        .zip(&mask)
        .filter(|(_, m)| **m)
        .map(|((p, q), _)| (*p, *q))
        .unzip();
    let h = least_squares_homography(&in_src, &in_dst).unwrap_or(h);
    Some(HomographyFit {
        h,
        inlier_mask: mask,
        num_inliers,
    })
}

/// First pass separates inliers from outliers, second pass refits on the
/// inliers alone with the same parameters.
pub fn find_homography_two_pass(
    src: &[Vec2],
    dst: &[Vec2],
    params: &RansacParams,
) -> Option<na::Matrix3<f64>> {
    let first = find_homography_ransac(src, dst, params)?;
    let (in_src, in_dst): (Vec<Vec2>, Vec<Vec2>) = src
        .iter()
        .zip(dst)
        .zip(&first.inlier_mask)
        .filter(|(_, m)| **m)
        .map(|((p, q), _)| (*p, *q))
        .unzip();
    debug!("first pass kept {} of {} correspondences", in_src.len(), src.len());
    find_homography_ransac(&in_src, &in_dst, params).map(|fit| fit.h)
}
