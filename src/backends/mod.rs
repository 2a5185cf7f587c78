// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for camera capture
//!
//! The backend layer abstracts hardware access, providing a consistent API
//! regardless of the underlying capture method:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          Capture Session Manager             │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌──────────────────┐  ┌────────────────┐   │
//! │  │     Camera       │  │   Simulated    │   │
//! │  │ (GStreamer/V4L2) │  │ (test pattern) │   │
//! │  └──────────────────┘  └────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Driver trait, GStreamer and simulated drivers, focus controls

pub mod camera;
