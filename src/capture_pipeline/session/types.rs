//! Session state and camera settings

use crate::capture_pipeline::frame::Image;
use crate::capture_pipeline::sdk::types::PixelFormat;

/// Lifecycle of a [`CaptureSession`](super::CaptureSession). Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconfigured,
    Configured,
    Capturing,
    Stopped,
}

/// Feature values written to a camera before acquisition starts.
///
/// Numeric values are forwarded as-is; range checks are left to the SDK.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    /// Exposure time in device units (documented range 26..=60 000 000)
    pub exposure: f64,
    /// Tone curve exponent (documented range 0.45..=1.0)
    pub gamma: f64,
    /// Brightness offset (documented range 0..=255.75)
    pub black_level: f64,
    pub pixel_format: PixelFormat,
    pub acquisition_mode: String,
    pub white_balance: String,
    pub edge_filter: String,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            exposure: 200_000.0,
            gamma: 0.7,
            black_level: 128.0,
            pixel_format: PixelFormat::Rgb8Packed,
            acquisition_mode: "Continuous".to_string(),
            white_balance: "Continuous".to_string(),
            edge_filter: "Sharpen1".to_string(),
        }
    }
}

/// An image together with its 0-based position in the camera's capture sequence.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub index: usize,
    pub image: Image,
}
