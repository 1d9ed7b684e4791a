//! Per-camera capture session
//!
//! A session owns one open camera handle and walks it through
//! `Unconfigured -> Configured -> Capturing -> Stopped`.

mod capture_session;
pub mod types;

pub use capture_session::CaptureSession;
pub use types::{CameraSettings, CapturedImage, SessionState};
