use clap::Parser;
use log::info;
use logo_detection::config::MatchParams;
use logo_detection::data_loader::{load_frame_patches, load_templates};
use logo_detection::detector::{absorb_detections, detect_in_frame};
use logo_detection::io::{object_from_json, write_detection_report};
use logo_detection::robust_matcher::RobustMatcher;
use std::path::Path;
use std::time::Instant;

#[derive(Parser)]
#[command(version, about, author)]
struct LogoDetectCli {
    /// folder of template feature dumps
    templates: String,

    /// folder of patch feature dumps, each with frame_id and roi
    patches: String,

    /// matching parameters json, defaults are used when missing
    #[arg(short, long)]
    params: Option<String>,

    /// detection report
    #[arg(short, long, default_value = "detections.json")]
    output: String,

    /// save harvested images as png into this folder
    #[arg(long)]
    harvest_dir: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = LogoDetectCli::parse();
    let params: MatchParams = match &cli.params {
        Some(p) => object_from_json(Path::new(p))?,
        None => MatchParams::default(),
    };
    let matcher = RobustMatcher::new(params);
    let mut templates = load_templates(&cli.templates)?;
    let frames = load_frame_patches(&cli.patches)?;
    info!("{} templates, {} frames", templates.len(), frames.len());

    let now = Instant::now();
    let mut detections = Vec::new();
    for (frame_id, patches) in &frames {
        let found = detect_in_frame(&matcher, &templates, patches);
        let added = absorb_detections(
            &mut templates,
            patches,
            &found,
            matcher.params().min_matches,
        );
        info!(
            "frame {}: {} of {} patches matched, {} templates harvested",
            frame_id,
            found.len(),
            patches.len(),
            added
        );
        detections.extend(found);
    }
    let duration_sec = now.elapsed().as_secs_f64();
    println!("matching took {:.6} sec", duration_sec);
    if !frames.is_empty() {
        println!("avg: {} sec per frame", duration_sec / frames.len() as f64);
    }

    if let Some(dir) = &cli.harvest_dir {
        std::fs::create_dir_all(dir)?;
        for d in &detections {
            if let Some(img) = &d.harvested {
                let path = Path::new(dir).join(format!("{}.png", d.patch));
                img.to_dynamic_image()?.save(path)?;
            }
        }
    }
    write_detection_report(Path::new(&cli.output), templates.len(), &detections)?;
    Ok(())
}
