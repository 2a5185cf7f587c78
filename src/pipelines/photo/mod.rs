// SPDX-License-Identifier: MPL-2.0

//! Still photo output
//!
//! Drivers hand a captured RGB frame to [`PhotoEncoder`] which writes the
//! temporary still artifact in the requested format. The artifact is later
//! moved into place (or discarded) by [`crate::pipelines::finalize`].

pub mod encoding;

pub use encoding::{CameraMetadata, EncodingQuality, PhotoEncoder};
