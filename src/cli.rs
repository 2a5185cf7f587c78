// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available camera sources
//! - Taking photos
//! - Recording videos
//!
//! Photo and video reuse the capture session manager and the same
//! finalization path as the interactive UI.

use picam::backends::camera::gst_driver::{list_sources, select_h264_encoder};
use picam::backends::camera::{CameraMode, DriverConfig, DriverKind, StillFormat, open_driver};
use picam::config::Config;
use picam::constants::{CAPTURE_RESOLUTIONS, PREVIEW_RESOLUTIONS};
use picam::pipelines::finalize::{
    ArtifactKind, FfmpegTranscoder, FinalizeOutcome, finalize_capture,
};
use picam::session::{CaptureRequest, CaptureSessionManager};
use picam::storage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Which camera to open
pub struct DriverChoice {
    pub kind: DriverKind,
    pub device: Option<String>,
}

fn open_manager(
    choice: &DriverChoice,
    config: &Config,
) -> Result<CaptureSessionManager, Box<dyn std::error::Error>> {
    let driver = open_driver(choice.kind, choice.device.as_deref())?;
    println!("Using camera: {}", driver.name());
    let mut manager = CaptureSessionManager::new(driver);
    manager.configure_and_start(CameraMode::Preview, config.preview_resolution())?;
    Ok(manager)
}

/// Resolve `output` to a file path; directories get a timestamped name
fn resolve_output(
    output: Option<PathBuf>,
    default: impl FnOnce(&Path) -> PathBuf,
    default_dir: PathBuf,
) -> std::io::Result<PathBuf> {
    match output {
        Some(path) if path.is_dir() => Ok(default(&path)),
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Ok(path)
        }
        None => {
            std::fs::create_dir_all(&default_dir)?;
            Ok(default(&default_dir))
        }
    }
}

/// List all available camera sources
pub fn list_cameras(choice: &DriverChoice) -> Result<(), Box<dyn std::error::Error>> {
    if choice.kind == DriverKind::Simulated {
        println!("Available cameras:");
        println!();
        println!("  [0] simulated test pattern");
        print_presets();
        return Ok(());
    }

    let sources = list_sources()?;
    if sources.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, source) in sources.iter().enumerate() {
        println!("  [{}] {}", index, source);
    }
    match select_h264_encoder() {
        Some(encoder) => println!("H.264 encoder: {}", encoder),
        None => println!("H.264 encoder: none installed (video recording unavailable)"),
    }
    print_presets();
    Ok(())
}

fn print_presets() {
    let join = |presets: &[picam::backends::camera::Resolution]| {
        presets
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!();
    println!("      Preview: {}", join(&PREVIEW_RESOLUTIONS));
    println!("      Still:   {}", join(&CAPTURE_RESOLUTIONS));
}

/// Take a photo using the specified camera
pub fn take_photo(
    choice: &DriverChoice,
    format: Option<StillFormat>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let format = format.unwrap_or(config.still_format);
    let resolution = config.capture_resolution();

    let output_path = resolve_output(
        output,
        |dir| storage::timestamped_still_path(dir, format),
        storage::default_photo_dir(),
    )?;

    let mut manager = open_manager(choice, &config)?;
    println!("Capture format: {}", DriverConfig::still(resolution, format));

    let request = CaptureRequest {
        resolution,
        format,
        destination: storage::temp_still_path(&config.temp_dir(), format),
    };
    let result = manager.capture_still(&request);
    manager.shutdown();
    let temp = result?;

    let transcoder = FfmpegTranscoder::new(config.transcoder.clone());
    if let FinalizeOutcome::Saved(path) =
        finalize_capture(&temp, Some(&output_path), ArtifactKind::Still, &transcoder)?
    {
        println!("Photo saved: {}", path.display());
    }
    Ok(())
}

/// Record a video for `duration` seconds or until Ctrl+C
pub fn record_video(
    choice: &DriverChoice,
    duration: u64,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let output_path = resolve_output(
        output,
        storage::timestamped_video_path,
        storage::default_video_dir(),
    )?;

    let mut manager = open_manager(choice, &config)?;
    println!("Recording format: {} @ 30fps", config.preview_resolution());
    println!("Output: {}", output_path.display());
    println!("Duration: {} seconds", duration);

    let temp = storage::temp_video_path(&config.temp_dir());
    if let Err(e) = manager.start_recording(&temp) {
        manager.shutdown();
        return Err(e.into());
    }

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    println!();
    println!("Recording... (press Ctrl+C to stop early)");

    // Wait for duration or Ctrl+C
    let start = Instant::now();
    let target_duration = Duration::from_secs(duration);
    while start.elapsed() < target_duration {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }

        let elapsed = start.elapsed().as_secs();
        print!("\rRecording: {:02}:{:02}", elapsed / 60, elapsed % 60);
        std::io::Write::flush(&mut std::io::stdout())?;

        std::thread::sleep(Duration::from_millis(100));
    }
    println!();

    let result = manager.stop_recording();
    manager.shutdown();
    let temp = result?;

    println!("Converting to MP4...");
    let transcoder = FfmpegTranscoder::new(config.transcoder.clone());
    if let FinalizeOutcome::Saved(path) =
        finalize_capture(&temp, Some(&output_path), ArtifactKind::Video, &transcoder)?
    {
        println!("Video saved: {}", path.display());
    }
    Ok(())
}
