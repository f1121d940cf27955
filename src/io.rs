use std::collections::BTreeMap;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::detector::FrameDetection;
use crate::error::LogoResult;
use crate::features::FeatureSet;
use crate::patches::PatchId;
use crate::types::{ImageMat, Rect};

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: &Path, object: &T) -> LogoResult<()> {
    let j = serde_json::to_string_pretty(object)?;
    std::fs::write(output_path, j)?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &Path) -> LogoResult<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// On-disk form of a precomputed feature set.
///
/// `image` is relative to the dump file. Patch dumps carry their frame id and
/// frame-absolute roi; template dumps leave both out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDump {
    pub image: String,
    pub keypoints: Vec<[f32; 2]>,
    pub descriptors: Vec<Vec<f32>>,
    #[serde(default)]
    pub frame_id: Option<i32>,
    #[serde(default)]
    pub roi: Option<Rect>,
}

impl FeatureDump {
    pub fn patch_id(&self) -> Option<PatchId> {
        Some(PatchId::new(self.frame_id?, self.roi?))
    }
}

/// Reads a dump and the image it points to.
pub fn load_feature_dump(dump_path: &Path) -> LogoResult<(FeatureDump, FeatureSet)> {
    let dump: FeatureDump = object_from_json(dump_path)?;
    let image_path = dump_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(&dump.image);
    let img = image::open(&image_path)?;
    let keypoints = dump.keypoints.iter().map(|p| Vec2::new(p[0], p[1])).collect();
    let features = FeatureSet::from_rows(ImageMat::from(&img), keypoints, &dump.descriptors)?;
    Ok((dump, features))
}

#[derive(Debug, Serialize)]
struct DetectionEntry {
    patch: String,
    template: String,
    rect: Rect,
}

#[derive(Debug, Serialize)]
struct FrameReport {
    frame_id: i32,
    detections: Vec<DetectionEntry>,
}

#[derive(Debug, Serialize)]
struct DetectionReport {
    timestamp: String,
    template_count: usize,
    total_detections: usize,
    frames: Vec<FrameReport>,
}

/// Writes all detections as JSON, grouped by frame in ascending order.
pub fn write_detection_report(
    output_path: &Path,
    template_count: usize,
    detections: &[FrameDetection],
) -> LogoResult<()> {
    use std::time::SystemTime;

    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut by_frame: BTreeMap<i32, Vec<DetectionEntry>> = BTreeMap::new();
    for d in detections {
        by_frame
            .entry(d.patch.frame_id)
            .or_default()
            .push(DetectionEntry {
                patch: d.patch.to_string(),
                template: d.template.to_string(),
                rect: d.rect,
            });
    }

    let report = DetectionReport {
        timestamp: timestamp.to_string(),
        template_count,
        total_detections: detections.len(),
        frames: by_frame
            .into_iter()
            .map(|(frame_id, detections)| FrameReport {
                frame_id,
                detections,
            })
            .collect(),
    };
    object_to_json(output_path, &report)
}
