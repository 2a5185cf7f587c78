// SPDX-License-Identifier: GPL-3.0-only

//! Still image encoding
//!
//! Encodes RGB frames to the still formats offered by the capture selector:
//! - JPEG (with quality control)
//! - PNG and TIFF (lossless)
//! - DNG (linear RGB strips)

use crate::backends::camera::types::StillFormat;
use crate::constants::app_info;
use image::{ImageFormat, RgbImage};
use std::path::Path;
use tracing::{debug, info};

/// Encoding quality settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingQuality {
    /// Low quality (high compression)
    Low,
    /// Medium quality (balanced)
    Medium,
    /// High quality (low compression)
    #[default]
    High,
    /// Maximum quality (minimal compression)
    Maximum,
}

impl EncodingQuality {
    /// Get JPEG quality value (0-100)
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            EncodingQuality::Low => 60,
            EncodingQuality::Medium => 80,
            EncodingQuality::High => 92,
            EncodingQuality::Maximum => 98,
        }
    }
}

/// Camera metadata for DNG encoding
#[derive(Debug, Clone, Default)]
pub struct CameraMetadata {
    /// Camera name written to the Make/Model tags
    pub camera_name: Option<String>,
}

/// Photo encoder
#[derive(Debug, Clone, Default)]
pub struct PhotoEncoder {
    quality: EncodingQuality,
    camera_metadata: CameraMetadata,
}

impl PhotoEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_camera_metadata(mut self, metadata: CameraMetadata) -> Self {
        self.camera_metadata = metadata;
        self
    }

    /// Encode an image to bytes in the requested format
    pub fn encode(&self, image: &RgbImage, format: StillFormat) -> Result<Vec<u8>, String> {
        debug!(
            width = image.width(),
            height = image.height(),
            ?format,
            "Encoding still"
        );

        let data = match format {
            StillFormat::Jpeg => Self::encode_jpeg(image, self.quality)?,
            StillFormat::Png => Self::encode_with(image, ImageFormat::Png)?,
            StillFormat::Tiff => Self::encode_with(image, ImageFormat::Tiff)?,
            StillFormat::Dng => Self::encode_dng(image, &self.camera_metadata)?,
        };

        debug!(size = data.len(), "Encoding complete");
        Ok(data)
    }

    /// Encode and write to `path`
    pub fn save(&self, image: &RgbImage, format: StillFormat, path: &Path) -> Result<(), String> {
        let data = self.encode(image, format)?;
        std::fs::write(path, &data).map_err(|e| format!("Failed to save photo: {}", e))?;
        info!(path = %path.display(), bytes = data.len(), "Still written");
        Ok(())
    }

    fn encode_jpeg(image: &RgbImage, quality: EncodingQuality) -> Result<Vec<u8>, String> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);

        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality.jpeg_quality());

        encoder
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| format!("JPEG encoding failed: {}", e))?;

        Ok(buffer)
    }

    fn encode_with(image: &RgbImage, format: ImageFormat) -> Result<Vec<u8>, String> {
        let mut buffer = Vec::new();

        image
            .write_to(&mut std::io::Cursor::new(&mut buffer), format)
            .map_err(|e| format!("{:?} encoding failed: {}", format, e))?;

        Ok(buffer)
    }

    /// Encode image as DNG (Digital Negative raw format)
    ///
    /// Creates a simple linear DNG file with RGB data stored as a single strip.
    fn encode_dng(image: &RgbImage, camera_metadata: &CameraMetadata) -> Result<Vec<u8>, String> {
        use dng::ifd::{Ifd, IfdValue, Offsets};
        use dng::tags::ifd as tiff_tags;
        use dng::{DngWriter, FileType};
        use std::io::{Cursor, Write};
        use std::sync::Arc;

        let (width, height) = image.dimensions();
        let raw_data = image.as_raw().clone();
        let raw_data_len = raw_data.len() as u32;

        let mut ifd = Ifd::default();

        ifd.insert(tiff_tags::ImageWidth, IfdValue::Long(width));
        ifd.insert(tiff_tags::ImageLength, IfdValue::Long(height));
        ifd.insert(
            tiff_tags::BitsPerSample,
            IfdValue::List(vec![
                IfdValue::Short(8),
                IfdValue::Short(8),
                IfdValue::Short(8),
            ]),
        );
        ifd.insert(tiff_tags::Compression, IfdValue::Short(1)); // No compression
        ifd.insert(tiff_tags::PhotometricInterpretation, IfdValue::Short(2)); // RGB
        ifd.insert(tiff_tags::SamplesPerPixel, IfdValue::Short(3));
        ifd.insert(tiff_tags::RowsPerStrip, IfdValue::Long(height));
        ifd.insert(tiff_tags::PlanarConfiguration, IfdValue::Short(1)); // Chunky

        ifd.insert(
            tiff_tags::Software,
            IfdValue::Ascii(format!("picam v{}", app_info::version())),
        );

        if let Some(camera_name) = &camera_metadata.camera_name {
            ifd.insert(tiff_tags::Make, IfdValue::Ascii(camera_name.clone()));
            ifd.insert(tiff_tags::Model, IfdValue::Ascii(camera_name.clone()));
        }

        struct RgbOffsets {
            data: Vec<u8>,
        }

        impl Offsets for RgbOffsets {
            fn size(&self) -> u32 {
                self.data.len() as u32
            }

            fn write(&self, writer: &mut dyn Write) -> std::io::Result<()> {
                writer.write_all(&self.data)
            }
        }

        let offsets: Arc<dyn Offsets + Send + Sync> = Arc::new(RgbOffsets { data: raw_data });

        ifd.insert(tiff_tags::StripOffsets, IfdValue::Offsets(offsets));
        ifd.insert(tiff_tags::StripByteCounts, IfdValue::Long(raw_data_len));

        let mut buffer = Vec::new();
        let cursor = Cursor::new(&mut buffer);

        DngWriter::write_dng(cursor, true, FileType::Dng, vec![ifd])
            .map_err(|e| format!("DNG encoding failed: {:?}", e))?;

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn test_jpeg_quality_values() {
        assert_eq!(EncodingQuality::Low.jpeg_quality(), 60);
        assert_eq!(EncodingQuality::Medium.jpeg_quality(), 80);
        assert_eq!(EncodingQuality::High.jpeg_quality(), 92);
        assert_eq!(EncodingQuality::Maximum.jpeg_quality(), 98);
    }

    #[test]
    fn test_encoded_formats_carry_magic_bytes() {
        let encoder = PhotoEncoder::new();
        let image = checker(8, 8);

        let jpeg = encoder.encode(&image, StillFormat::Jpeg).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let png = encoder.encode(&image, StillFormat::Png).unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let tiff = encoder.encode(&image, StillFormat::Tiff).unwrap();
        assert!(&tiff[..2] == b"II" || &tiff[..2] == b"MM");
    }

    #[test]
    fn test_png_decodes_back_to_same_size() {
        let image = checker(13, 7);
        let png = PhotoEncoder::new().encode(&image, StillFormat::Png).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (13, 7));
    }
}
