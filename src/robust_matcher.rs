//! Robust matching of a logo template against one frame patch.
//!
//! The pipeline: 2-NN matching in both directions, ratio test and distance
//! gate per direction, cross-check, two-pass RANSAC homography, harvest box
//! projection, plausibility check of the projected outline.

use std::fmt;
use std::sync::Arc;

use glam::{IVec2, Vec2};

use crate::config::MatchParams;
use crate::features::FeatureSet;
use crate::geometry::{
    BoundingBoxEstimator, Bounds, QuadrilateralCheck, QuadrilateralValidator, SmallestAreaBox,
};
use crate::matching::{
    BruteForceSearch, Correspondence, NearestNeighborSearch, knn_match, refine_matches,
    symmetry_test,
};
use crate::observer::{LogObserver, MatchObserver, Stage};
use crate::optimization::homography::{find_homography_two_pass, perspective_transform};
use crate::types::{ImageMat, Rect};

/// Why a template was judged absent from a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoMatchReason {
    InsufficientMatches { found: usize, required: usize },
    DegenerateHomography,
    ImplausibleGeometry,
}

impl fmt::Display for NoMatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoMatchReason::InsufficientMatches { found, required } => {
                write!(f, "{} confirmed matches, {} required", found, required)
            }
            NoMatchReason::DegenerateHomography => write!(f, "no homography found"),
            NoMatchReason::ImplausibleGeometry => write!(f, "projected outline is implausible"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Frame-absolute box around the logo.
    pub rect: Rect,
    /// Patch pixels under the detection, the newest appearance of the logo.
    pub harvested: Option<ImageMat>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    NoMatch(NoMatchReason),
    Match(Detection),
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Match(_))
    }

    pub fn detection(&self) -> Option<&Detection> {
        match self {
            MatchOutcome::Match(d) => Some(d),
            MatchOutcome::NoMatch(_) => None,
        }
    }

    pub fn into_detection(self) -> Option<Detection> {
        match self {
            MatchOutcome::Match(d) => Some(d),
            MatchOutcome::NoMatch(_) => None,
        }
    }
}

/// Stateless matcher; share one instance across threads.
pub struct RobustMatcher {
    params: MatchParams,
    search: Box<dyn NearestNeighborSearch>,
    bounding_box: Box<dyn BoundingBoxEstimator>,
    quad_check: Box<dyn QuadrilateralCheck>,
    observer: Arc<dyn MatchObserver>,
}

impl RobustMatcher {
    pub fn new(params: MatchParams) -> Self {
        let quad_check = QuadrilateralValidator::new(params.quadrilateral.clone());
        Self {
            params,
            search: Box::new(BruteForceSearch),
            bounding_box: Box::new(SmallestAreaBox),
            quad_check: Box::new(quad_check),
            observer: Arc::new(LogObserver),
        }
    }

    pub fn with_search(mut self, search: impl NearestNeighborSearch + 'static) -> Self {
        self.search = Box::new(search);
        self
    }

    pub fn with_bounding_box(mut self, estimator: impl BoundingBoxEstimator + 'static) -> Self {
        self.bounding_box = Box::new(estimator);
        self
    }

    pub fn with_quad_check(mut self, check: impl QuadrilateralCheck + 'static) -> Self {
        self.quad_check = Box::new(check);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn MatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn params(&self) -> &MatchParams {
        &self.params
    }

    /// Correspondences that survive the ratio test, the distance gate and the
    /// cross-check. `query_idx` indexes the template, `train_idx` the patch.
    pub fn confirmed_matches(&self, template: &FeatureSet, patch: &FeatureSet) -> Vec<Correspondence> {
        let ratio = self.params.ratio_of_distances;
        let forward = knn_match(self.search.as_ref(), template.descriptors(), patch.descriptors());
        let reverse = knn_match(self.search.as_ref(), patch.descriptors(), template.descriptors());
        self.observer.stage(Stage::ForwardCandidates, forward.len());
        self.observer.stage(Stage::ReverseCandidates, reverse.len());

        let forward = refine_matches(&forward, ratio);
        let reverse = refine_matches(&reverse, ratio);
        self.observer.stage(Stage::ForwardRefined, forward.len());
        self.observer.stage(Stage::ReverseRefined, reverse.len());

        let confirmed = symmetry_test(&forward, &reverse);
        self.observer.stage(Stage::Symmetric, confirmed.len());
        confirmed
    }

    /// Decides whether `template` appears in `patch`.
    ///
    /// `patch_offset` is the top-left corner of the patch in its frame; the
    /// returned rectangle is frame-absolute.
    pub fn match_images(
        &self,
        template: &FeatureSet,
        patch: &FeatureSet,
        patch_offset: IVec2,
    ) -> MatchOutcome {
        let outcome = self.run(template, patch, patch_offset);
        match &outcome {
            MatchOutcome::NoMatch(reason) => self.observer.rejected(reason),
            MatchOutcome::Match(d) => self.observer.matched(&d.rect),
        }
        outcome
    }

    fn run(&self, template: &FeatureSet, patch: &FeatureSet, patch_offset: IVec2) -> MatchOutcome {
        let matches = self.confirmed_matches(template, patch);
        if matches.len() < self.params.min_matches {
            return MatchOutcome::NoMatch(NoMatchReason::InsufficientMatches {
                found: matches.len(),
                required: self.params.min_matches,
            });
        }

        let (src, dst): (Vec<Vec2>, Vec<Vec2>) = matches
            .iter()
            .map(|m| (template.keypoints()[m.query_idx], patch.keypoints()[m.train_idx]))
            .unzip();
        let Some(h) = find_homography_two_pass(&src, &dst, &self.params.ransac) else {
            return MatchOutcome::NoMatch(NoMatchReason::DegenerateHomography);
        };

        // Harvest box in template coordinates, padded since keypoints sit on
        // the logo border.
        let Some(core) = self.bounding_box.bounding_box(&src, self.params.box_accuracy) else {
            return MatchOutcome::NoMatch(NoMatchReason::ImplausibleGeometry);
        };
        let t_img = template.image();
        let (t_cols, t_rows) = (t_img.cols.max(0) as f32, t_img.rows.max(0) as f32);
        let harvest = core.expand_clamped(
            t_cols / 10.0,
            t_rows / 10.0,
            (t_cols - 1.0).max(0.0),
            (t_rows - 1.0).max(0.0),
        );

        let Some(scene) = perspective_transform(&h, &harvest.corners()) else {
            return MatchOutcome::NoMatch(NoMatchReason::DegenerateHomography);
        };
        let scene: [Vec2; 4] = [scene[0], scene[1], scene[2], scene[3]];
        let p_img = patch.image();
        if !self.quad_check.is_plausible(&scene, p_img.cols, p_img.rows) {
            return MatchOutcome::NoMatch(NoMatchReason::ImplausibleGeometry);
        }

        let Some(outline) = Bounds::of_points(&scene) else {
            return MatchOutcome::NoMatch(NoMatchReason::ImplausibleGeometry);
        };
        let x0 = (outline.min.x.floor() as i32).max(0);
        let y0 = (outline.min.y.floor() as i32).max(0);
        let x1 = (outline.max.x.floor() as i32).min(p_img.cols);
        let y1 = (outline.max.y.floor() as i32).min(p_img.rows);
        let local = Rect::new(x0, y0, x1 - x0, y1 - y0);
        if local.is_empty() {
            return MatchOutcome::NoMatch(NoMatchReason::ImplausibleGeometry);
        }

        MatchOutcome::Match(Detection {
            rect: local.translate(patch_offset),
            harvested: p_img.crop(&local),
        })
    }
}
