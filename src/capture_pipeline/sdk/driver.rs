use std::time::Duration;

use crate::capture_pipeline::common::error::Result;
use crate::capture_pipeline::frame::RawFrame;
use crate::capture_pipeline::sdk::types::{CameraId, FeatureValue, FrameShape};

/// Entry point of a camera SDK: discovery and opening handles.
pub trait CameraSystem {
    type Camera: CameraDriver;

    /// Lists the cameras currently reachable, running transport discovery first
    /// when the backend needs it.
    fn camera_ids(&mut self) -> Result<Vec<CameraId>>;

    fn open_camera(&mut self, id: &CameraId) -> Result<Self::Camera>;
}

/// An open camera handle with a single announced frame buffer.
///
/// `acquisition stop`, `end_capture`, `flush_queue` and `revoke_frames` must be
/// idempotent: calling them on a camera that is already stopped is not an error.
pub trait CameraDriver {
    fn id(&self) -> &CameraId;

    fn set_feature(&mut self, name: &str, value: FeatureValue) -> Result<()>;

    /// Shape of the frames produced under the current feature values.
    fn frame_shape(&self) -> Result<FrameShape>;

    fn announce_frame(&mut self) -> Result<()>;

    fn start_capture(&mut self) -> Result<()>;

    fn queue_frame(&mut self) -> Result<()>;

    fn run_command(&mut self, name: &str) -> Result<()>;

    /// Blocks until the queued buffer is filled or `timeout` expires.
    ///
    /// The returned frame borrows SDK memory and is only valid until the
    /// buffer is queued again.
    fn wait_frame(&mut self, timeout: Duration) -> Result<RawFrame<'_>>;

    fn end_capture(&mut self) -> Result<()>;

    fn flush_queue(&mut self) -> Result<()>;

    fn revoke_frames(&mut self) -> Result<()>;
}
