// SPDX-License-Identifier: MPL-2.0

//! picam - a camera module front-end
//!
//! This library provides live preview, crop and magnifier, focus control,
//! display rotation, and still and video capture for a single local camera.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Application state, message handling and the event loop
//! - [`backends`]: Camera driver abstraction (GStreamer and simulated)
//! - [`session`]: Capture session manager, the mode state machine
//! - [`pipelines`]: Frame transform, overlays, still encoding and finalization
//! - [`config`]: User configuration handling
//! - [`storage`]: Save locations and temporary artifact naming
//! - [`terminal`]: Terminal display surface
//!
//! # Example
//!
//! ```ignore
//! // Typically run via:
//! // picam            (terminal UI)
//! // picam photo      (headless capture)
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;
pub mod session;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::{AppModel, Message};
pub use config::Config;
pub use constants::BitratePreset;
pub use errors::{AppError, AppResult};
