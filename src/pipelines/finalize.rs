// SPDX-License-Identifier: GPL-3.0-only

//! Capture finalization
//!
//! Moves a temporary capture artifact to the user's chosen path, remuxes
//! recordings into MP4, or discards the artifact when no path was chosen.

use crate::errors::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// What kind of artifact is being finalized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Still image in its final format; moved as-is
    Still,
    /// Raw H.264 stream; remuxed into the target container
    Video,
}

/// Result of a finalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    Saved(PathBuf),
    Discarded,
}

/// External stream-copy step
pub trait Transcoder {
    /// Copy the streams of `input` into the container implied by `output`
    fn remux(&self, input: &Path, output: &Path) -> Result<(), String>;
}

/// Remux through an `ffmpeg` executable
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: String,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn args(input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-c".to_string(),
            "copy".to_string(),
            output.display().to_string(),
        ]
    }
}

impl Transcoder for FfmpegTranscoder {
    fn remux(&self, input: &Path, output: &Path) -> Result<(), String> {
        debug!(program = %self.program, input = %input.display(), output = %output.display(), "Remuxing");

        let result = Command::new(&self.program)
            .args(Self::args(input, output))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| format!("failed to run {}: {}", self.program, e))?;

        if result.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&result.stderr);
        let last_line = stderr.lines().rev().find(|l| !l.trim().is_empty());
        Err(match last_line {
            Some(line) => format!("{} exited with {}: {}", self.program, result.status, line.trim()),
            None => format!("{} exited with {}", self.program, result.status),
        })
    }
}

/// Move, remux or discard a temporary capture artifact
///
/// - `target` of `None` deletes `temp` and reports [`FinalizeOutcome::Discarded`].
/// - Stills are renamed into place (copy and remove across filesystems).
/// - Videos are remuxed into a sibling partial file that replaces `target`
///   only on success. On failure the temp file is kept, the partial file
///   removed, any existing `target` left alone, and the error names the temp
///   path.
pub fn finalize_capture(
    temp: &Path,
    target: Option<&Path>,
    kind: ArtifactKind,
    transcoder: &dyn Transcoder,
) -> AppResult<FinalizeOutcome> {
    let Some(target) = target else {
        remove_temp(temp)?;
        info!(temp = %temp.display(), ?kind, "Capture discarded");
        return Ok(FinalizeOutcome::Discarded);
    };

    match kind {
        ArtifactKind::Still => {
            move_file(temp, target)?;
        }
        ArtifactKind::Video => {
            let partial = partial_path(target);
            let remuxed = transcoder.remux(temp, &partial).and_then(|()| {
                std::fs::rename(&partial, target).map_err(|e| {
                    format!("failed to move output to {}: {}", target.display(), e)
                })
            });
            if let Err(reason) = remuxed {
                warn!(temp = %temp.display(), %reason, "Remux failed; keeping temp file");
                if partial.exists()
                    && let Err(e) = std::fs::remove_file(&partial)
                {
                    warn!(partial = %partial.display(), error = %e, "Failed to remove partial output");
                }
                return Err(AppError::ConversionFailed {
                    temp_path: temp.to_path_buf(),
                    reason,
                });
            }
            if let Err(e) = std::fs::remove_file(temp) {
                warn!(temp = %temp.display(), error = %e, "Failed to remove temp stream");
            }
        }
    }

    info!(target = %target.display(), ?kind, "Capture saved");
    Ok(FinalizeOutcome::Saved(target.to_path_buf()))
}

/// `dir/name.part.ext` next to `target`; the extension still selects the container
fn partial_path(target: &Path) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match target.extension() {
        Some(ext) => format!("{}.part.{}", stem, ext.to_string_lossy()),
        None => format!("{}.part", stem),
    };
    target.with_file_name(name)
}

fn remove_temp(temp: &Path) -> AppResult<()> {
    match std::fs::remove_file(temp) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::IoFailure(format!(
            "failed to delete {}: {}",
            temp.display(),
            e
        ))),
    }
}

/// Rename, falling back to copy and remove when crossing filesystems
fn move_file(from: &Path, to: &Path) -> AppResult<()> {
    if from == to {
        return Ok(());
    }
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }

    std::fs::copy(from, to).map_err(|e| {
        AppError::IoFailure(format!(
            "failed to move {} to {}: {}",
            from.display(),
            to.display(),
            e
        ))
    })?;
    if let Err(e) = std::fs::remove_file(from) {
        warn!(temp = %from.display(), error = %e, "Copied capture but failed to remove temp");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Copies input to output, or fails after writing a partial file
    struct FakeTranscoder {
        fail: bool,
        calls: RefCell<Vec<(PathBuf, PathBuf)>>,
    }

    impl FakeTranscoder {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transcoder for FakeTranscoder {
        fn remux(&self, input: &Path, output: &Path) -> Result<(), String> {
            self.calls
                .borrow_mut()
                .push((input.to_path_buf(), output.to_path_buf()));
            if self.fail {
                std::fs::write(output, b"partial").map_err(|e| e.to_string())?;
                return Err("exit status 1".to_string());
            }
            std::fs::copy(input, output).map_err(|e| e.to_string())?;
            Ok(())
        }
    }

    fn temp_artifact(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"data").unwrap();
        path
    }

    #[test]
    fn test_no_target_discards_temp() {
        let dir = tempfile::tempdir().unwrap();
        let temp = temp_artifact(dir.path(), "capture.jpeg");
        let transcoder = FakeTranscoder::new(false);

        let outcome = finalize_capture(&temp, None, ArtifactKind::Video, &transcoder).unwrap();
        assert_eq!(outcome, FinalizeOutcome::Discarded);
        assert!(!temp.exists());
        assert!(transcoder.calls.borrow().is_empty());
    }

    #[test]
    fn test_still_is_moved_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let temp = temp_artifact(dir.path(), "capture.png");
        let target = dir.path().join("saved.png");

        let outcome = finalize_capture(
            &temp,
            Some(&target),
            ArtifactKind::Still,
            &FakeTranscoder::new(false),
        )
        .unwrap();
        assert_eq!(outcome, FinalizeOutcome::Saved(target.clone()));
        assert!(!temp.exists());
        assert_eq!(std::fs::read(&target).unwrap(), b"data");
    }

    #[test]
    fn test_video_success_removes_temp() {
        let dir = tempfile::tempdir().unwrap();
        let temp = temp_artifact(dir.path(), "rec.h264");
        let target = dir.path().join("video.mp4");
        let transcoder = FakeTranscoder::new(false);

        let outcome =
            finalize_capture(&temp, Some(&target), ArtifactKind::Video, &transcoder).unwrap();
        assert_eq!(outcome, FinalizeOutcome::Saved(target.clone()));
        assert!(!temp.exists());
        assert!(target.exists());
        assert_eq!(
            transcoder.calls.borrow()[0],
            (temp, dir.path().join("video.part.mp4"))
        );
        assert!(!dir.path().join("video.part.mp4").exists());
    }

    #[test]
    fn test_video_success_replaces_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let temp = temp_artifact(dir.path(), "rec.h264");
        let target = dir.path().join("holiday.mp4");
        std::fs::write(&target, b"older").unwrap();

        finalize_capture(
            &temp,
            Some(&target),
            ArtifactKind::Video,
            &FakeTranscoder::new(false),
        )
        .unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"data");
    }

    #[test]
    fn test_video_failure_leaves_existing_target_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let temp = temp_artifact(dir.path(), "rec.h264");
        let target = dir.path().join("holiday.mp4");
        std::fs::write(&target, b"older").unwrap();

        let err = finalize_capture(
            &temp,
            Some(&target),
            ArtifactKind::Video,
            &FakeTranscoder::new(true),
        )
        .unwrap_err();

        assert!(matches!(err, AppError::ConversionFailed { .. }));
        assert!(temp.exists());
        assert_eq!(std::fs::read(&target).unwrap(), b"older");
        assert!(!dir.path().join("holiday.part.mp4").exists());
    }

    #[test]
    fn test_partial_path_keeps_container_extension() {
        assert_eq!(
            partial_path(Path::new("/videos/clip.mp4")),
            PathBuf::from("/videos/clip.part.mp4")
        );
        assert_eq!(
            partial_path(Path::new("/videos/clip")),
            PathBuf::from("/videos/clip.part")
        );
    }

    #[test]
    fn test_video_failure_keeps_temp_and_removes_partial_target() {
        let dir = tempfile::tempdir().unwrap();
        let temp = temp_artifact(dir.path(), "rec.h264");
        let target = dir.path().join("video.mp4");

        let err = finalize_capture(
            &temp,
            Some(&target),
            ArtifactKind::Video,
            &FakeTranscoder::new(true),
        )
        .unwrap_err();

        assert_eq!(
            err,
            AppError::ConversionFailed {
                temp_path: temp.clone(),
                reason: "exit status 1".to_string(),
            }
        );
        assert!(temp.exists());
        assert!(!target.exists());
        assert!(!dir.path().join("video.part.mp4").exists());
    }

    #[test]
    fn test_missing_transcoder_program_is_a_conversion_failure() {
        let dir = tempfile::tempdir().unwrap();
        let temp = temp_artifact(dir.path(), "rec.h264");
        let target = dir.path().join("video.mp4");
        let transcoder = FfmpegTranscoder::new("picam-no-such-transcoder");

        let err = finalize_capture(&temp, Some(&target), ArtifactKind::Video, &transcoder)
            .unwrap_err();
        assert!(matches!(err, AppError::ConversionFailed { .. }));
        assert!(temp.exists());
    }

    #[test]
    fn test_ffmpeg_arguments_stream_copy() {
        let args = FfmpegTranscoder::args(Path::new("/tmp/in.h264"), Path::new("/home/u/out.mp4"));
        assert_eq!(
            args,
            vec!["-y", "-i", "/tmp/in.h264", "-c", "copy", "/home/u/out.mp4"]
        );
    }
}
