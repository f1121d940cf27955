use std::path::Path;

use glam::Vec2;
use image::GrayImage;
use logo_detection::LogoError;
use logo_detection::config::MatchParams;
use logo_detection::data_loader::{load_feature_dumps, load_frame_patches, load_templates};
use logo_detection::detector::detect_in_frame;
use logo_detection::io::{
    FeatureDump, load_feature_dump, object_from_json, object_to_json, write_detection_report,
};
use logo_detection::robust_matcher::RobustMatcher;
use logo_detection::types::{Rect, pixel_type};
use tempfile::TempDir;

fn one_hot(i: usize) -> Vec<f32> {
    let mut d = vec![0.0; 8];
    d[i] = 10.0;
    d
}

fn logo_points() -> Vec<Vec2> {
    vec![
        Vec2::new(1.0, 1.0),
        Vec2::new(14.0, 2.0),
        Vec2::new(2.0, 11.0),
        Vec2::new(13.0, 12.0),
        Vec2::new(5.0, 8.0),
    ]
}

fn write_dump(dir: &Path, name: &str, size: (u32, u32), keypoints: &[Vec2], frame: Option<(i32, Rect)>) {
    GrayImage::new(size.0, size.1)
        .save(dir.join(format!("{}.png", name)))
        .unwrap();
    let dump = FeatureDump {
        image: format!("{}.png", name),
        keypoints: keypoints.iter().map(|p| [p.x, p.y]).collect(),
        descriptors: (0..keypoints.len()).map(one_hot).collect(),
        frame_id: frame.map(|f| f.0),
        roi: frame.map(|f| f.1),
    };
    object_to_json(&dir.join(format!("{}.json", name)), &dump).unwrap();
}

#[test]
fn test_params_json_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("params.json");
    std::fs::write(&path, r#"{"min_matches": 8, "ransac": {"seed": 42}}"#).unwrap();

    let params: MatchParams = object_from_json(&path).unwrap();
    assert_eq!(params.min_matches, 8);
    assert_eq!(params.ransac.seed, 42);
    assert_eq!(params.ransac.max_iters, 2000);
    assert_eq!(params.ratio_of_distances, 0.65);
    assert_eq!(params.box_accuracy, 0.9);
}

#[test]
fn test_load_feature_dump() {
    let temp_dir = TempDir::new().unwrap();
    write_dump(temp_dir.path(), "logo", (16, 14), &logo_points(), None);

    let (dump, features) = load_feature_dump(&temp_dir.path().join("logo.json")).unwrap();
    assert!(dump.patch_id().is_none());
    assert_eq!(features.len(), 5);
    assert_eq!(features.descriptors().ncols(), 8);
    assert_eq!(features.image().rows, 14);
    assert_eq!(features.image().cols, 16);
    assert_eq!(features.image().pixel_type, pixel_type::CV_8UC1);
}

#[test]
fn test_mismatched_dump_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    GrayImage::new(4, 4).save(temp_dir.path().join("bad.png")).unwrap();
    let dump = FeatureDump {
        image: "bad.png".to_string(),
        keypoints: vec![[0.0, 0.0], [1.0, 1.0]],
        descriptors: vec![one_hot(0)],
        frame_id: None,
        roi: None,
    };
    object_to_json(&temp_dir.path().join("bad.json"), &dump).unwrap();

    let result = load_feature_dumps(temp_dir.path().to_str().unwrap());
    assert!(matches!(
        result,
        Err(LogoError::FeatureMismatch {
            keypoints: 2,
            descriptors: 1
        })
    ));
}

#[test]
fn test_frame_patches_need_roi() {
    let temp_dir = TempDir::new().unwrap();
    write_dump(temp_dir.path(), "orphan", (8, 8), &logo_points()[..2], None);
    let result = load_frame_patches(temp_dir.path().to_str().unwrap());
    assert!(matches!(result, Err(LogoError::MissingRoi { .. })));
}

#[test]
fn test_end_to_end_from_disk() {
    let templates_dir = TempDir::new().unwrap();
    let patches_dir = TempDir::new().unwrap();
    write_dump(templates_dir.path(), "logo", (16, 14), &logo_points(), None);

    let shifted: Vec<Vec2> = logo_points().iter().map(|p| *p * 1.5 + Vec2::new(20.0, 10.0)).collect();
    let roi_a = Rect::new(160, 120, 80, 60);
    let roi_b = Rect::new(0, 0, 80, 60);
    write_dump(patches_dir.path(), "a", (80, 60), &shifted, Some((4, roi_a)));
    write_dump(patches_dir.path(), "b", (80, 60), &shifted[..3], Some((4, roi_b)));
    write_dump(patches_dir.path(), "c", (80, 60), &shifted, Some((9, roi_b)));

    let templates = load_templates(templates_dir.path().to_str().unwrap()).unwrap();
    assert_eq!(templates.len(), 1);
    let frames = load_frame_patches(patches_dir.path().to_str().unwrap()).unwrap();
    assert_eq!(frames.keys().copied().collect::<Vec<_>>(), vec![4, 9]);
    assert_eq!(frames[&4].len(), 2);

    let matcher = RobustMatcher::new(MatchParams::default());
    let detections: Vec<_> = frames
        .values()
        .flat_map(|patches| detect_in_frame(&matcher, &templates, patches))
        .collect();
    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].patch.roi, roi_a);
    assert!(roi_a.contains_rect(&detections[0].rect));

    let report_path = patches_dir.path().join("report.txt");
    write_detection_report(&report_path, templates.len(), &detections).unwrap();
    let report: serde_json::Value = object_from_json(&report_path).unwrap();
    assert_eq!(report["template_count"], 1);
    assert_eq!(report["total_detections"], 2);
    assert_eq!(report["frames"][0]["frame_id"], 4);
    assert_eq!(report["frames"][1]["frame_id"], 9);
    assert_eq!(
        report["frames"][0]["detections"][0]["patch"],
        "N0004@0160@0120@0240@0180"
    );
    assert_eq!(report["frames"][0]["detections"][0]["template"], "seed0");
}
