use glam::Vec2;
use log::debug;
use rayon::prelude::*;

use crate::features::FeatureSet;
use crate::patches::PatchId;
use crate::robust_matcher::{MatchOutcome, RobustMatcher};
use crate::template::{LogoTemplate, TemplateIdentity, sort_by_priority};
use crate::types::{ImageMat, Rect};

/// Features of one patch of a frame.
#[derive(Debug, Clone)]
pub struct FramePatch {
    pub patch: PatchId,
    pub features: FeatureSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameDetection {
    pub patch: PatchId,
    /// Template that produced the match.
    pub template: TemplateIdentity,
    /// Frame-absolute.
    pub rect: Rect,
    pub harvested: Option<ImageMat>,
}

/// Tries `templates` on one patch in the given order; the first match wins.
pub fn detect_in_patch(
    matcher: &RobustMatcher,
    templates: &[LogoTemplate],
    patch: &FramePatch,
) -> Option<FrameDetection> {
    templates.iter().find_map(|t| {
        match matcher.match_images(t.features(), &patch.features, patch.patch.offset()) {
            MatchOutcome::Match(d) => Some(FrameDetection {
                patch: patch.patch,
                template: *t.identity(),
                rect: d.rect,
                harvested: d.harvested,
            }),
            MatchOutcome::NoMatch(_) => None,
        }
    })
}

/// Runs every patch of a frame in parallel.
///
/// `templates` should already be in priority order. Detections come back in
/// patch order.
pub fn detect_in_frame(
    matcher: &RobustMatcher,
    templates: &[LogoTemplate],
    patches: &[FramePatch],
) -> Vec<FrameDetection> {
    let detections: Vec<FrameDetection> = patches
        .par_iter()
        .filter_map(|p| detect_in_patch(matcher, templates, p))
        .collect();
    debug!(
        "{} detections in {} patches with {} templates",
        detections.len(),
        patches.len(),
        templates.len()
    );
    detections
}

/// New template from a detection: the patch keypoints inside the detected
/// rect, in crop-local coordinates, with the harvested crop as image.
pub fn harvest_template(detection: &FrameDetection, patch: &FramePatch) -> Option<LogoTemplate> {
    let image = detection.harvested.clone()?;
    let local = detection.rect.translate(-patch.patch.offset());
    let origin = Vec2::new(local.x as f32, local.y as f32);
    let size = Vec2::new(local.width as f32, local.height as f32);

    let keypoints = patch.features.keypoints();
    let inside: Vec<usize> = (0..keypoints.len())
        .filter(|&i| {
            let q = keypoints[i] - origin;
            q.x >= 0.0 && q.y >= 0.0 && q.x < size.x && q.y < size.y
        })
        .collect();
    let shifted = inside.iter().map(|&i| keypoints[i] - origin).collect();
    let descriptors = patch.features.descriptors().select_rows(inside.iter());
    let features = FeatureSet::new(image, shifted, descriptors).ok()?;
    Some(LogoTemplate::harvested(detection.patch, features))
}

/// Folds one frame's detections back into the template pool.
///
/// Every template that produced a detection gains one priority point, each
/// detection with at least `min_keypoints` keypoints in its rect becomes a new
/// template, and the pool is re-sorted. Returns the number of templates added.
pub fn absorb_detections(
    templates: &mut Vec<LogoTemplate>,
    patches: &[FramePatch],
    detections: &[FrameDetection],
    min_keypoints: usize,
) -> usize {
    for d in detections {
        if let Some(parent) = templates.iter_mut().find(|t| *t.identity() == d.template) {
            parent.increment_priority(1);
        }
    }

    let mut added = 0;
    for d in detections {
        let identity = TemplateIdentity::Harvested(d.patch);
        if templates.iter().any(|t| *t.identity() == identity) {
            continue;
        }
        let Some(patch) = patches.iter().find(|p| p.patch == d.patch) else {
            continue;
        };
        match harvest_template(d, patch) {
            Some(t) if t.features().len() >= min_keypoints => {
                templates.push(t);
                added += 1;
            }
            _ => debug!("{}: too few keypoints to harvest", d.patch),
        }
    }
    sort_by_priority(templates);
    added
}
