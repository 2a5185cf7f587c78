// SPDX-License-Identifier: MPL-2.0

//! Storage utilities for capture artifacts
//!
//! Drivers write every capture to a temporary file first. Finalization then
//! moves or remuxes it to the user's chosen path, or to one of the
//! timestamped defaults below.

use crate::backends::camera::StillFormat;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Folder created under the pictures and videos directories
pub const DEFAULT_SAVE_FOLDER: &str = "picam";

/// Container the recordings are remuxed into
pub const VIDEO_EXTENSION: &str = "mp4";

/// Extension of the raw encoder stream
pub const STREAM_EXTENSION: &str = "h264";

fn home_or_cwd() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Default photo directory
pub fn default_photo_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(home_or_cwd)
        .join(DEFAULT_SAVE_FOLDER)
}

/// Default video directory
pub fn default_video_dir() -> PathBuf {
    dirs::video_dir()
        .unwrap_or_else(home_or_cwd)
        .join(DEFAULT_SAVE_FOLDER)
}

fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// `photo_<timestamp>.<ext>` inside `dir`
pub fn timestamped_still_path(dir: &Path, format: StillFormat) -> PathBuf {
    dir.join(format!("photo_{}.{}", timestamp(), format.extension()))
}

/// `video_<timestamp>.mp4` inside `dir`
pub fn timestamped_video_path(dir: &Path) -> PathBuf {
    dir.join(format!("video_{}.{}", timestamp(), VIDEO_EXTENSION))
}

/// Unique temporary path for a still capture
pub fn temp_still_path(temp_dir: &Path, format: StillFormat) -> PathBuf {
    let path = temp_dir.join(format!("picam-still-{}.{}", Uuid::new_v4(), format.extension()));
    debug!(path = %path.display(), "Allocated temp still path");
    path
}

/// Unique temporary path for a raw H.264 recording
pub fn temp_video_path(temp_dir: &Path) -> PathBuf {
    let path = temp_dir.join(format!("picam-video-{}.{}", Uuid::new_v4(), STREAM_EXTENSION));
    debug!(path = %path.display(), "Allocated temp video path");
    path
}

/// Give `path` the extension of `format` when it has none
///
/// Save dialogs may return a bare file name.
pub fn with_still_extension(path: PathBuf, format: StillFormat) -> PathBuf {
    if path.extension().is_some() {
        path
    } else {
        path.with_extension(format.extension())
    }
}
