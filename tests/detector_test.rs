use glam::Vec2;
use logo_detection::config::MatchParams;
use logo_detection::detector::{
    FramePatch, absorb_detections, detect_in_frame, detect_in_patch, harvest_template,
};
use logo_detection::features::FeatureSet;
use logo_detection::patches::PatchId;
use logo_detection::robust_matcher::RobustMatcher;
use logo_detection::template::{LogoTemplate, TemplateIdentity};
use logo_detection::types::{ImageMat, Rect, pixel_type};

fn one_hot(i: usize, dim: usize) -> Vec<f32> {
    let mut d = vec![0.0; dim];
    d[i] = 10.0;
    d
}

fn logo_points() -> Vec<Vec2> {
    vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(12.0, 0.0),
        Vec2::new(0.0, 9.0),
        Vec2::new(12.0, 9.0),
        Vec2::new(4.0, 7.0),
        Vec2::new(9.0, 2.0),
    ]
}

/// Template whose descriptors start at `first` in a 16-dim one-hot space.
fn template(first: usize) -> FeatureSet {
    let rows: Vec<Vec<f32>> = (first..first + 6).map(|i| one_hot(i, 16)).collect();
    FeatureSet::from_rows(ImageMat::zeros(10, 13, pixel_type::CV_8UC1), logo_points(), &rows)
        .unwrap()
}

/// Patch showing the template at `first`, scaled by 2 and shifted to `at`.
fn frame_patch(frame_id: i32, roi: Rect, first: usize, at: Vec2) -> FramePatch {
    let keypoints = logo_points().into_iter().map(|p| p * 2.0 + at).collect();
    let rows: Vec<Vec<f32>> = (first..first + 6).map(|i| one_hot(i, 16)).collect();
    let image = ImageMat::zeros(roi.height, roi.width, pixel_type::CV_8UC1);
    FramePatch {
        patch: PatchId::new(frame_id, roi),
        features: FeatureSet::from_rows(image, keypoints, &rows).unwrap(),
    }
}

#[test]
fn test_first_matching_template_wins() {
    let matcher = RobustMatcher::new(MatchParams::default());
    let patch = frame_patch(2, Rect::new(0, 0, 64, 48), 0, Vec2::new(10.0, 10.0));
    let harvested_id = PatchId::new(1, Rect::new(16, 12, 32, 24));
    let templates = vec![
        LogoTemplate::seed(0, template(8)),
        LogoTemplate::harvested(harvested_id, template(0)),
        LogoTemplate::seed(1, template(0)),
    ];

    let d = detect_in_patch(&matcher, &templates, &patch).unwrap();
    assert_eq!(d.template, TemplateIdentity::Harvested(harvested_id));
    assert_eq!(d.patch, patch.patch);
    assert!(d.harvested.is_some());

    assert!(detect_in_patch(&matcher, &templates[..1], &patch).is_none());
}

#[test]
fn test_detect_in_frame() {
    let matcher = RobustMatcher::new(MatchParams::default());
    let templates = vec![LogoTemplate::seed(0, template(0)), LogoTemplate::seed(1, template(8))];
    let patches = vec![
        frame_patch(5, Rect::new(0, 0, 64, 48), 0, Vec2::new(10.0, 10.0)),
        frame_patch(5, Rect::new(32, 0, 64, 48), 4, Vec2::new(10.0, 10.0)),
        frame_patch(5, Rect::new(64, 24, 64, 48), 8, Vec2::new(20.0, 5.0)),
    ];

    let detections = detect_in_frame(&matcher, &templates, &patches);
    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].patch, patches[0].patch);
    assert_eq!(detections[1].patch, patches[2].patch);

    // template box 0..12 x 0..9 padded and clamped to 0..12 x 0..9, scaled by 2
    let r = detections[1].rect;
    assert!((r.x - (64 + 20)).abs() <= 1, "{:?}", r);
    assert!((r.y - (24 + 5)).abs() <= 1, "{:?}", r);
    assert!((r.width - 24).abs() <= 1, "{:?}", r);
    assert!((r.height - 18).abs() <= 1, "{:?}", r);
}

/// Keypoints of a second logo appearance, all inside the 0..12 x 0..9 outline.
fn drift_points() -> Vec<Vec2> {
    vec![
        Vec2::new(1.0, 1.0),
        Vec2::new(11.0, 1.0),
        Vec2::new(1.0, 8.0),
        Vec2::new(11.0, 8.0),
        Vec2::new(6.0, 4.0),
        Vec2::new(3.0, 5.0),
    ]
}

/// Patch with the seed keypoints (descriptors 0..6) and the drifted ones
/// (descriptors 6..12), scaled by 2 and shifted to `at`.
fn mixed_patch(frame_id: i32, roi: Rect, at: Vec2) -> FramePatch {
    let keypoints: Vec<Vec2> = logo_points()
        .into_iter()
        .chain(drift_points())
        .map(|p| p * 2.0 + at)
        .collect();
    let rows: Vec<Vec<f32>> = (0..12).map(|i| one_hot(i, 16)).collect();
    let image = ImageMat::zeros(roi.height, roi.width, pixel_type::CV_8UC1);
    FramePatch {
        patch: PatchId::new(frame_id, roi),
        features: FeatureSet::from_rows(image, keypoints, &rows).unwrap(),
    }
}

/// Patch showing only the drifted appearance, scaled by 1.5.
fn drifted_patch(frame_id: i32, roi: Rect, at: Vec2) -> FramePatch {
    let keypoints = drift_points().into_iter().map(|p| p * 1.5 + at).collect();
    let rows: Vec<Vec<f32>> = (6..12).map(|i| one_hot(i, 16)).collect();
    let image = ImageMat::zeros(roi.height, roi.width, pixel_type::CV_8UC1);
    FramePatch {
        patch: PatchId::new(frame_id, roi),
        features: FeatureSet::from_rows(image, keypoints, &rows).unwrap(),
    }
}

#[test]
fn test_harvest_template_keeps_keypoints_inside_rect() {
    let matcher = RobustMatcher::new(MatchParams::default());
    let templates = vec![LogoTemplate::seed(0, template(0))];
    let patch = mixed_patch(1, Rect::new(200, 100, 64, 48), Vec2::new(10.0, 10.0));
    let d = detect_in_patch(&matcher, &templates, &patch).unwrap();

    let harvested = harvest_template(&d, &patch).unwrap();
    assert_eq!(harvested.identity(), &TemplateIdentity::Harvested(patch.patch));
    assert_eq!(harvested.priority, 0);
    let f = harvested.features();
    assert_eq!(f.image().rows, d.rect.height);
    assert_eq!(f.image().cols, d.rect.width);
    assert_eq!(f.descriptors().nrows(), f.len());
    // six drifted points plus the seed points off the rect border
    assert!(f.len() >= 8);
    assert!(f.keypoints().iter().all(|p| {
        p.x >= 0.0 && p.y >= 0.0 && p.x < d.rect.width as f32 && p.y < d.rect.height as f32
    }));
}

#[test]
fn test_harvested_template_matches_next_frame() {
    let matcher = RobustMatcher::new(MatchParams::default());
    let mut templates = vec![LogoTemplate::seed(0, template(0))];
    let roi = Rect::new(0, 0, 64, 48);

    let frame_1 = vec![mixed_patch(1, roi, Vec2::new(10.0, 10.0))];
    let frame_2 = vec![drifted_patch(2, roi, Vec2::new(5.0, 5.0))];

    // the seed cannot see the drifted appearance on its own
    assert!(detect_in_frame(&matcher, &templates, &frame_2).is_empty());

    let found = detect_in_frame(&matcher, &templates, &frame_1);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].template, TemplateIdentity::Seed(0));
    let added = absorb_detections(&mut templates, &frame_1, &found, 4);
    assert_eq!(added, 1);
    assert_eq!(templates.len(), 2);
    assert_eq!(templates[0].identity(), &TemplateIdentity::Seed(0));
    assert_eq!(templates[0].priority, 1);
    assert_eq!(templates[1].identity(), &TemplateIdentity::Harvested(frame_1[0].patch));
    assert_eq!(templates[1].priority, 0);

    let found = detect_in_frame(&matcher, &templates, &frame_2);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].template, TemplateIdentity::Harvested(frame_1[0].patch));

    // absorbing the same frame twice adds nothing new
    let again = detect_in_frame(&matcher, &templates, &frame_1);
    assert_eq!(absorb_detections(&mut templates, &frame_1, &again, 4), 0);
    assert_eq!(templates.len(), 2);
    assert_eq!(templates[0].priority, 2);
}

#[test]
fn test_absorb_skips_sparse_harvests() {
    let matcher = RobustMatcher::new(MatchParams::default());
    let mut templates = vec![LogoTemplate::seed(0, template(0))];
    let patches = vec![frame_patch(3, Rect::new(0, 0, 64, 48), 0, Vec2::new(10.0, 10.0))];
    let found = detect_in_frame(&matcher, &templates, &patches);
    assert_eq!(found.len(), 1);

    assert_eq!(absorb_detections(&mut templates, &patches, &found, 100), 0);
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].priority, 1);
}
