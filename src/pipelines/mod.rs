// SPDX-License-Identifier: MPL-2.0

//! Processing pipelines for the preview, stills and recordings
//!
//! # Pipeline Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │  Raw Frame   │ ──▶ │ Transform Pipeline│ ──▶ │Display bitmap│
//! │ (1/3/4 ch)   │     │  - rotate         │     │  + magnifier │
//! │              │     │  - crop / scale   │     │              │
//! │              │     │  - overlays       │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//!
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Temp artifact│ ──▶ │   Finalization    │ ──▶ │ Chosen path  │
//! │ (still/h264) │     │  - move / remux   │     │  or deleted  │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`transform`]: per-tick frame rendering
//! - [`overlay`]: outline, indicator and placard drawing
//! - [`geometry`]: display and sensor rectangles
//! - [`photo`]: still encoding
//! - [`finalize`]: moving, remuxing or discarding capture artifacts

pub mod finalize;
pub mod geometry;
pub mod overlay;
pub mod photo;
pub mod transform;
