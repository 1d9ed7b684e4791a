//! Camera capture pipeline module
//!
//! Configures cameras through an SDK seam, captures frames on a fixed
//! interval, and writes them out as JPEG files.

pub mod acquisition;
pub mod common;
pub mod frame;
pub mod jpeg;
pub mod persist;
pub mod sdk;
pub mod session;

pub use common::{CaptureError, Result};

pub use sdk::{
    CameraDriver, CameraId, CameraSystem, FeatureValue, FrameShape, PixelFormat, VirtualCamera,
    VirtualCameraSpec, VirtualSystem,
};

pub use frame::{Image, RawFrame};

pub use session::{CameraSettings, CaptureSession, CapturedImage, SessionState};

pub use jpeg::{ImageWriter, StandardJpegWriter};

pub use persist::{ImageSaver, OutputLayout, SavedFile};

pub use acquisition::{
    CameraSelection, CancellationToken, CaptureConfig, CaptureConfigBuilder, CaptureCount,
    CapturePipeline, CaptureReport, SaveMode, install_interrupt_handler,
};
