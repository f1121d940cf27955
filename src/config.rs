use serde::{Deserialize, Serialize};

/// Parameters of the robust homography fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacParams {
    /// Max reprojection error (px) for a correspondence to count as inlier.
    pub reprojection_threshold: f64,
    pub max_iters: usize,
    pub confidence: f64,
    /// Seed of the sampling rng; fixed so identical inputs give identical fits.
    pub seed: u64,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            reprojection_threshold: 3.0,
            max_iters: 2000,
            confidence: 0.995,
            seed: 0,
        }
    }
}

/// Limits for the projected template outline inside a patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadrilateralParams {
    /// Shortest allowed side in pixels.
    pub min_side: f64,
    /// Quad area relative to patch area.
    pub min_area_fraction: f64,
    pub max_area_fraction: f64,
    /// Longest over shortest of two opposite sides.
    pub max_side_ratio: f64,
}

impl Default for QuadrilateralParams {
    fn default() -> Self {
        Self {
            min_side: 3.0,
            min_area_fraction: 0.001,
            max_area_fraction: 4.0,
            max_side_ratio: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Best distance must be below this fraction of the second best.
    pub ratio_of_distances: f32,
    /// Confirmed correspondences needed before a homography is attempted.
    pub min_matches: usize,
    /// Fraction of matched template keypoints the harvest box must enclose.
    pub box_accuracy: f64,
    pub ransac: RansacParams,
    pub quadrilateral: QuadrilateralParams,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            ratio_of_distances: 0.65,
            min_matches: 4,
            box_accuracy: 0.9,
            ransac: RansacParams::default(),
            quadrilateral: QuadrilateralParams::default(),
        }
    }
}

/// How a frame is cut into overlapping patches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchGridConfig {
    /// Patch size as a fraction of the frame size.
    pub patch_fraction_x: f64,
    pub patch_fraction_y: f64,
    /// Stride as a fraction of the patch size.
    pub stride_fraction_x: f64,
    pub stride_fraction_y: f64,
}

impl Default for PatchGridConfig {
    fn default() -> Self {
        Self {
            patch_fraction_x: 0.25,
            patch_fraction_y: 0.25,
            stride_fraction_x: 0.5,
            stride_fraction_y: 0.5,
        }
    }
}
