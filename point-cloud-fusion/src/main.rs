/// Capture replay entry point: fuse a recorded capture and write it out as PLY.
use constants::export::{EXPORT_FILE_NAME, SETTINGS_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use point_cloud_fusion::{Admission, Capture, CaptureSession, FusionSettings, ply};
use std::env;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <capture_dir> [output.ply]", args[0]);
        std::process::exit(1);
    }

    let capture_dir = Path::new(&args[1]);
    let output_path = match args.get(2) {
        Some(path) => PathBuf::from(path),
        None => capture_dir.join(EXPORT_FILE_NAME),
    };

    let settings = load_settings(capture_dir)?;
    let capture = Capture::open(capture_dir)?;
    println!(
        "Replaying {} frames from {}",
        capture.len(),
        capture_dir.display()
    );

    let session = CaptureSession::spawn(settings)?;
    session.set_capturing(true);

    let pb = ProgressBar::new(capture.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) {msg}")?
            .progress_chars("▉▊▋▌▍▎▏ "),
    );
    pb.set_message("Fusing frames");

    let mut unreadable = 0;
    for (idx, record) in capture.records().iter().enumerate() {
        match capture.load_record(record) {
            Ok(frame) => {
                if let Admission::Dropped(reason) = session.submit(frame) {
                    warn!("Frame {} dropped: {}", idx, reason);
                }
                // Replay is offline, so let each pass finish before offering the next frame.
                session.wait_idle()?;
            }
            Err(err) => {
                unreadable += 1;
                warn!("Frame {} unreadable: {}", idx, err);
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("Frames fused");

    let vertices = session.snapshot()?;
    ply::export_to_path(&output_path, &vertices)?;

    let stats = session.stats()?;
    println!("Fusion complete:");
    println!(
        "  Frames: {} fused, {} skipped, {} unreadable",
        stats.frames_fused, stats.frames_skipped, unreadable
    );
    println!(
        "  Pixels: {} merged, {} duplicates, {} low confidence, {} out of range, {} outside image, {} non-finite",
        stats.fusion.merged,
        stats.fusion.duplicates,
        stats.fusion.low_confidence,
        stats.fusion.out_of_range,
        stats.fusion.outside_image,
        stats.fusion.non_finite
    );
    println!("Saved {} ({} points)", output_path.display(), vertices.len());

    Ok(())
}

fn load_settings(capture_dir: &Path) -> Result<FusionSettings, Box<dyn std::error::Error>> {
    let path = capture_dir.join(SETTINGS_FILE_NAME);
    if !path.exists() {
        return Ok(FusionSettings::default());
    }

    let settings = FusionSettings::from_json_file(&path)?;
    println!("Loaded settings from {}", path.display());
    Ok(settings)
}
