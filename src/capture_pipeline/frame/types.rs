//! Raw frame and owned image types

use crate::capture_pipeline::common::error::{CaptureError, Result};
use crate::capture_pipeline::sdk::types::{FrameShape, PixelFormat};

/// Pixel data handed out by the SDK after a successful wait.
///
/// The bytes belong to the SDK and are overwritten once the buffer is queued
/// again, so a `RawFrame` cannot outlive the camera borrow that produced it.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    shape: FrameShape,
    data: &'a [u8],
}

impl<'a> RawFrame<'a> {
    pub fn new(shape: FrameShape, data: &'a [u8]) -> Self {
        Self { shape, data }
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

/// Captured image, 8 bits per channel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Width of the image in pixels
    pub width: u32,
    /// Height of the image in pixels
    pub height: u32,
    /// Pixel encoding of `data`
    pub format: PixelFormat,
    /// Interleaved channel data, `width * height * channels` bytes
    pub data: Vec<u8>,
}

impl Image {
    /// Copies the pixels out of an SDK frame.
    ///
    /// Trailing bytes past `width * height * channels` (buffer padding) are
    /// dropped; a buffer shorter than that is an error.
    pub fn from_raw(frame: &RawFrame<'_>, format: PixelFormat) -> Result<Self> {
        let shape = frame.shape();
        if shape.channels != format.channels() {
            return Err(CaptureError::UnsupportedFormat(format!(
                "{format} expects {} channels, frame has {}",
                format.channels(),
                shape.channels
            )));
        }

        let expected = shape.byte_len();
        let data = frame.data();
        if data.len() < expected {
            return Err(CaptureError::BufferTooSmall {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width: shape.width,
            height: shape.height,
            format,
            data: data[..expected].to_vec(),
        })
    }

    pub fn channels(&self) -> u8 {
        self.format.channels()
    }

    pub fn shape(&self) -> FrameShape {
        FrameShape::new(self.width, self.height, self.channels())
    }
}
