// SPDX-License-Identifier: GPL-3.0-only

//! Active recording bookkeeping

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

/// A recording between encoder start and stop
///
/// Owns the temporary stream file: dropping the session deletes it unless it
/// was handed off for finalization with [`RecordingSession::hand_off`].
#[derive(Debug)]
pub struct RecordingSession {
    id: Uuid,
    temp_path: PathBuf,
    started_at: Instant,
    handed_off: bool,
}

impl RecordingSession {
    pub fn new(temp_path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            temp_path,
            started_at: Instant::now(),
            handed_off: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Give up ownership of the temp file; the caller must finalize it
    pub fn hand_off(mut self) -> PathBuf {
        self.handed_off = true;
        std::mem::take(&mut self.temp_path)
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if self.handed_off {
            return;
        }
        match std::fs::remove_file(&self.temp_path) {
            Ok(()) => debug!(path = %self.temp_path.display(), "Removed unfinished recording"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.temp_path.display(),
                error = %e,
                "Failed to remove unfinished recording"
            ),
        }
    }
}
