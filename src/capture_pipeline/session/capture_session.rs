use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::capture_pipeline::common::error::{CaptureError, Result};
use crate::capture_pipeline::frame::Image;
use crate::capture_pipeline::sdk::types::{
    CameraId, FeatureValue, FrameShape, PixelFormat, command, feature,
};
use crate::capture_pipeline::sdk::CameraDriver;
use crate::capture_pipeline::session::types::{CameraSettings, CapturedImage, SessionState};

/// Exclusive owner of one camera handle and its single frame buffer.
///
/// Dropping a session that is still capturing runs the stop sequence, so
/// acquisition is halted and buffers are revoked on every exit path.
pub struct CaptureSession<C: CameraDriver> {
    camera: C,
    state: SessionState,
    format: PixelFormat,
    shape: Option<FrameShape>,
    captured: usize,
    retained: Vec<CapturedImage>,
}

impl<C: CameraDriver> CaptureSession<C> {
    pub fn new(camera: C) -> Self {
        Self {
            camera,
            state: SessionState::Unconfigured,
            format: PixelFormat::Mono8,
            shape: None,
            captured: 0,
            retained: Vec::new(),
        }
    }

    pub fn id(&self) -> &CameraId {
        self.camera.id()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Frame shape fixed by [`configure`](Self::configure).
    pub fn shape(&self) -> Option<FrameShape> {
        self.shape
    }

    /// Number of successful [`capture_one`](Self::capture_one) calls so far.
    pub fn captured_count(&self) -> usize {
        self.captured
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    fn expect_state(&self, expected: SessionState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CaptureError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn set(&mut self, name: &str, value: FeatureValue) -> Result<()> {
        debug!(camera = %self.camera.id(), "{} = {}", name, value);
        self.camera.set_feature(name, value)
    }

    #[instrument(skip(self, settings), fields(camera = %self.camera.id()))]
    pub fn configure(&mut self, settings: &CameraSettings) -> Result<()> {
        self.expect_state(SessionState::Unconfigured, "configure")?;

        self.set(
            feature::ACQUISITION_MODE,
            FeatureValue::Enum(settings.acquisition_mode.clone()),
        )?;
        self.set(
            feature::PIXEL_FORMAT,
            FeatureValue::Enum(settings.pixel_format.as_str().to_string()),
        )?;
        self.set(
            feature::BALANCE_WHITE_AUTO,
            FeatureValue::Enum(settings.white_balance.clone()),
        )?;
        self.set(
            feature::EDGE_FILTER,
            FeatureValue::Enum(settings.edge_filter.clone()),
        )?;
        self.set(feature::EXPOSURE_TIME_ABS, FeatureValue::Float(settings.exposure))?;
        self.set(feature::GAMMA, FeatureValue::Float(settings.gamma))?;
        self.set(feature::BLACK_LEVEL, FeatureValue::Float(settings.black_level))?;

        let shape = self.camera.frame_shape()?;
        if shape.channels != settings.pixel_format.channels() {
            return Err(CaptureError::UnsupportedFormat(format!(
                "camera reports {} channels for {}",
                shape.channels, settings.pixel_format
            )));
        }

        info!(camera = %self.camera.id(), "Configured for {} frames ({})", shape, settings.pixel_format);
        self.format = settings.pixel_format;
        self.shape = Some(shape);
        self.state = SessionState::Configured;
        Ok(())
    }

    /// Announces the frame buffer, enters capture mode, queues the buffer and
    /// issues `AcquisitionStart`.
    #[instrument(skip(self), fields(camera = %self.camera.id()))]
    pub fn start(&mut self) -> Result<()> {
        self.expect_state(SessionState::Configured, "start")?;

        self.camera.announce_frame()?;
        // from here on the stop sequence must run, even if a later step fails
        self.state = SessionState::Capturing;

        self.camera.start_capture()?;
        self.camera.queue_frame()?;
        self.camera.run_command(command::ACQUISITION_START)?;

        debug!(camera = %self.camera.id(), "Acquisition started");
        Ok(())
    }

    /// Waits for the queued buffer, copies it into an owned [`Image`] and
    /// queues the buffer again for the next exposure.
    pub fn capture_one(&mut self, timeout: Duration) -> Result<CapturedImage> {
        self.expect_state(SessionState::Capturing, "capture from")?;
        let expected = self.shape.ok_or(CaptureError::InvalidState {
            operation: "capture from",
            state: self.state,
        })?;
        let format = self.format;

        let image = {
            let frame = self.camera.wait_frame(timeout)?;
            if frame.shape() != expected {
                return Err(CaptureError::ShapeMismatch {
                    expected,
                    actual: frame.shape(),
                });
            }
            Image::from_raw(&frame, format)?
        };
        self.camera.queue_frame()?;

        let index = self.captured;
        self.captured += 1;
        debug!(camera = %self.camera.id(), index, "Frame captured");

        Ok(CapturedImage { index, image })
    }

    /// Keeps an image for the deferred save phase.
    pub fn retain(&mut self, image: CapturedImage) {
        self.retained.push(image);
    }

    pub fn retained(&self) -> &[CapturedImage] {
        &self.retained
    }

    /// Hands the retained images over in capture order.
    pub fn take_retained(&mut self) -> Vec<CapturedImage> {
        std::mem::take(&mut self.retained)
    }

    /// Runs `AcquisitionStop`, ends capture mode, flushes the queue and
    /// revokes announced buffers.
    ///
    /// Every step is attempted even if an earlier one fails; the first error
    /// is returned. Calling `stop` on a stopped session does nothing.
    #[instrument(skip(self), fields(camera = %self.camera.id()))]
    pub fn stop(&mut self) -> Result<()> {
        let was_capturing = self.state == SessionState::Capturing;
        self.state = SessionState::Stopped;
        if !was_capturing {
            return Ok(());
        }

        let steps = [
            self.camera.run_command(command::ACQUISITION_STOP),
            self.camera.end_capture(),
            self.camera.flush_queue(),
            self.camera.revoke_frames(),
        ];
        steps.into_iter().collect::<Result<Vec<()>>>()?;

        debug!(camera = %self.camera.id(), captured = self.captured, "Acquisition stopped");
        Ok(())
    }
}

impl<C: CameraDriver> Drop for CaptureSession<C> {
    fn drop(&mut self) {
        if self.state == SessionState::Capturing {
            if let Err(e) = self.stop() {
                warn!(camera = %self.camera.id(), "Failed to stop acquisition on drop: {}", e);
            }
        }
    }
}
