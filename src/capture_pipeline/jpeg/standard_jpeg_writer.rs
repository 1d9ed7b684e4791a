use std::io::Write;

use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use tracing::debug;

use crate::capture_pipeline::common::error::{CaptureError, Result};
use crate::capture_pipeline::frame::Image;
use crate::capture_pipeline::jpeg::writer::ImageWriter;
use crate::capture_pipeline::sdk::types::PixelFormat;

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

pub struct StandardJpegWriter {
    quality: u8,
}

impl StandardJpegWriter {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for StandardJpegWriter {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl ImageWriter for StandardJpegWriter {
    fn write_jpeg(&self, image: &Image, output: &mut dyn Write) -> Result<()> {
        debug!("Encoding JPEG image: {}x{} {}", image.width, image.height, image.format);

        let swapped;
        let (pixels, color_type) = match image.format {
            PixelFormat::Mono8 => (image.data.as_slice(), ExtendedColorType::L8),
            PixelFormat::Rgb8Packed => (image.data.as_slice(), ExtendedColorType::Rgb8),
            PixelFormat::Bgr8Packed => {
                swapped = image
                    .data
                    .chunks_exact(3)
                    .flat_map(|bgr| [bgr[2], bgr[1], bgr[0]])
                    .collect::<Vec<u8>>();
                (swapped.as_slice(), ExtendedColorType::Rgb8)
            }
        };

        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, self.quality)
            .encode(pixels, image.width, image.height, color_type)
            .map_err(|e| CaptureError::EncodeError(e.to_string()))?;

        output.write_all(&buffer)?;

        debug!("JPEG encoding complete, {} bytes", buffer.len());
        Ok(())
    }
}
