use std::time::Duration;

use thiserror::Error;

use crate::capture_pipeline::sdk::types::FrameShape;
use crate::capture_pipeline::session::SessionState;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No cameras discovered")]
    NoCameras,

    #[error("Camera not found: {0}")]
    CameraNotFound(String),

    #[error("SDK error: {0}")]
    Sdk(String),

    #[error("Failed to set feature {feature}: {reason}")]
    FeatureRejected { feature: String, reason: String },

    #[error("Timed out after {0:?} waiting for a frame")]
    FrameTimeout(Duration),

    #[error("Cannot {operation} a session in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Frame shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        expected: FrameShape,
        actual: FrameShape,
    },

    #[error("Frame buffer too small: expected {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("Unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to encode JPEG image: {0}")]
    EncodeError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
