// SPDX-License-Identifier: GPL-3.0-only

//! Destination prompts for finished captures
//!
//! Returning `None` means the user declined and the capture is discarded.

use crate::backends::camera::StillFormat;
use crate::config::SavePromptMode;
use crate::storage;
use rfd::FileDialog;
use std::path::PathBuf;
use tracing::{debug, warn};

pub trait SavePrompt {
    /// Where to save a still of `format`
    fn still_destination(&mut self, format: StillFormat) -> Option<PathBuf>;

    /// Where to save a finished recording
    fn video_destination(&mut self) -> Option<PathBuf>;
}

/// Build the prompt selected in the config
pub fn from_mode(mode: SavePromptMode) -> Box<dyn SavePrompt> {
    match mode {
        SavePromptMode::Dialog => Box::new(DialogSavePrompt),
        SavePromptMode::Auto => Box::new(AutoSavePrompt::default()),
    }
}

/// Native save dialog
#[derive(Debug, Default, Clone, Copy)]
pub struct DialogSavePrompt;

impl DialogSavePrompt {
    fn start_dir(dir: PathBuf) -> PathBuf {
        if dir.is_dir() {
            dir
        } else {
            dirs::home_dir().unwrap_or(dir)
        }
    }
}

impl SavePrompt for DialogSavePrompt {
    fn still_destination(&mut self, format: StillFormat) -> Option<PathBuf> {
        let ext = format.extension();
        let path = FileDialog::new()
            .set_title(format!("Save {}", format.display_name()))
            .set_directory(Self::start_dir(storage::default_photo_dir()))
            .set_file_name(format!("capture.{}", ext))
            .add_filter(format!("{} Files", format.display_name()), &[ext])
            .save_file()?;
        debug!(path = %path.display(), "Still destination chosen");
        Some(storage::with_still_extension(path, format))
    }

    fn video_destination(&mut self) -> Option<PathBuf> {
        let path = FileDialog::new()
            .set_title("Save MP4 Video")
            .set_directory(Self::start_dir(storage::default_video_dir()))
            .set_file_name(format!("video.{}", storage::VIDEO_EXTENSION))
            .add_filter("MP4 Files", &[storage::VIDEO_EXTENSION])
            .save_file()?;
        debug!(path = %path.display(), "Video destination chosen");
        Some(path)
    }
}

/// Timestamped files in a fixed directory, no interaction
#[derive(Debug, Default, Clone)]
pub struct AutoSavePrompt {
    /// Overrides the default pictures and videos directories
    dir: Option<PathBuf>,
}

impl AutoSavePrompt {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    fn ensure(dir: PathBuf) -> Option<PathBuf> {
        match std::fs::create_dir_all(&dir) {
            Ok(()) => Some(dir),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Cannot create save directory");
                None
            }
        }
    }
}

impl SavePrompt for AutoSavePrompt {
    fn still_destination(&mut self, format: StillFormat) -> Option<PathBuf> {
        let dir = Self::ensure(
            self.dir
                .clone()
                .unwrap_or_else(storage::default_photo_dir),
        )?;
        Some(storage::timestamped_still_path(&dir, format))
    }

    fn video_destination(&mut self) -> Option<PathBuf> {
        let dir = Self::ensure(
            self.dir
                .clone()
                .unwrap_or_else(storage::default_video_dir),
        )?;
        Some(storage::timestamped_video_path(&dir))
    }
}

/// Always declines; captures are discarded
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclineSavePrompt;

impl SavePrompt for DeclineSavePrompt {
    fn still_destination(&mut self, _format: StillFormat) -> Option<PathBuf> {
        None
    }

    fn video_destination(&mut self) -> Option<PathBuf> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_prompt_uses_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        let mut prompt = AutoSavePrompt::in_dir(&target);

        let still = prompt.still_destination(StillFormat::Png).unwrap();
        assert_eq!(still.parent().unwrap(), target);
        assert_eq!(still.extension().unwrap(), "png");
        assert!(target.is_dir());

        let video = prompt.video_destination().unwrap();
        assert_eq!(video.extension().unwrap(), "mp4");
    }

    #[test]
    fn test_decline_prompt_never_chooses() {
        let mut prompt = DeclineSavePrompt;
        assert!(prompt.still_destination(StillFormat::Jpeg).is_none());
        assert!(prompt.video_destination().is_none());
    }
}
