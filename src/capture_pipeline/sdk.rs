//! Camera SDK seam
//!
//! The pipeline never talks to a vendor SDK directly. Discovery, feature
//! control, frame buffer queuing and acquisition commands go through the
//! [`CameraSystem`] and [`CameraDriver`] traits. [`VirtualSystem`] is the
//! in-process backend used by the binary and by tests.

mod driver;
mod virtual_camera;
pub mod types;

pub use driver::{CameraDriver, CameraSystem};
pub use virtual_camera::{CallLog, VirtualCamera, VirtualCameraSpec, VirtualSystem};
pub use types::{
    BLACK_LEVEL_RANGE, CameraId, EXPOSURE_RANGE, FeatureValue, FrameShape, GAMMA_RANGE, PixelFormat,
    command, feature,
};
