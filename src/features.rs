use glam::Vec2;
use nalgebra as na;

use crate::error::{LogoError, LogoResult};
use crate::types::ImageMat;

/// Keypoints and descriptors computed for one image region.
///
/// Keypoint `i` is described by descriptor row `i`. The constructor enforces
/// this and the set is immutable afterwards, so every index taken from a
/// match can be used on both sides.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    image: ImageMat,
    keypoints: Vec<Vec2>,
    descriptors: na::DMatrix<f32>,
}

impl FeatureSet {
    pub fn new(
        image: ImageMat,
        keypoints: Vec<Vec2>,
        descriptors: na::DMatrix<f32>,
    ) -> LogoResult<FeatureSet> {
        if keypoints.len() != descriptors.nrows() {
            return Err(LogoError::FeatureMismatch {
                keypoints: keypoints.len(),
                descriptors: descriptors.nrows(),
            });
        }
        Ok(FeatureSet {
            image,
            keypoints,
            descriptors,
        })
    }

    /// Builds the descriptor matrix from one `Vec` per keypoint.
    pub fn from_rows(
        image: ImageMat,
        keypoints: Vec<Vec2>,
        rows: &[Vec<f32>],
    ) -> LogoResult<FeatureSet> {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(LogoError::DescriptorWidth {
                expected: width,
                got: bad.len(),
            });
        }
        let descriptors =
            na::DMatrix::from_row_iterator(rows.len(), width, rows.iter().flatten().copied());
        Self::new(image, keypoints, descriptors)
    }

    pub fn image(&self) -> &ImageMat {
        &self.image
    }

    pub fn keypoints(&self) -> &[Vec2] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &na::DMatrix<f32> {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}
