use std::collections::BTreeMap;
use std::path::PathBuf;

use glob::glob;
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;

use crate::detector::FramePatch;
use crate::error::{LogoError, LogoResult};
use crate::features::FeatureSet;
use crate::io::{FeatureDump, load_feature_dump};
use crate::template::{LogoTemplate, sort_by_priority};

pub struct LoadedDump {
    pub path: PathBuf,
    pub dump: FeatureDump,
    pub features: FeatureSet,
}

fn json_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    match rp {
        Ok(p) if p.extension().is_some_and(|e| e == "json") => Some(p),
        _ => None,
    }
}

/// Loads every `*.json` feature dump in `root_folder`, in parallel.
///
/// Results are sorted by file name. The first unreadable dump aborts the load.
pub fn load_feature_dumps(root_folder: &str) -> LogoResult<Vec<LoadedDump>> {
    let mut sorted_path: Vec<PathBuf> = glob(&format!("{}/*.json", root_folder))?
        .filter_map(json_filter)
        .collect();
    sorted_path.sort();
    log::trace!("loading {} dumps from {}", sorted_path.len(), root_folder);

    sorted_path
        .par_iter()
        .progress_count(sorted_path.len() as u64)
        .map(|path| -> LogoResult<LoadedDump> {
            let (dump, features) = load_feature_dump(path)?;
            Ok(LoadedDump {
                path: path.clone(),
                dump,
                features,
            })
        })
        .collect()
}

/// Seed templates from a folder of dumps, already in priority order.
pub fn load_templates(root_folder: &str) -> LogoResult<Vec<LogoTemplate>> {
    let mut templates: Vec<LogoTemplate> = load_feature_dumps(root_folder)?
        .into_iter()
        .enumerate()
        .map(|(i, d)| LogoTemplate::seed(i, d.features))
        .collect();
    sort_by_priority(&mut templates);
    Ok(templates)
}

/// Patch dumps grouped by frame id. Every dump needs `frame_id` and `roi`.
pub fn load_frame_patches(root_folder: &str) -> LogoResult<BTreeMap<i32, Vec<FramePatch>>> {
    let mut frames: BTreeMap<i32, Vec<FramePatch>> = BTreeMap::new();
    for loaded in load_feature_dumps(root_folder)? {
        let patch = loaded.dump.patch_id().ok_or_else(|| LogoError::MissingRoi {
            path: loaded.path.display().to_string(),
        })?;
        frames.entry(patch.frame_id).or_default().push(FramePatch {
            patch,
            features: loaded.features,
        });
    }
    Ok(frames)
}
