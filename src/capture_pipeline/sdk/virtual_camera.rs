//! In-process camera backend.
//!
//! `VirtualSystem` behaves like a camera SDK with a fixed set of attached
//! devices. Frames are rendered as a moving gradient whose brightness follows
//! the exposure, gamma and black level features, and feature writes are
//! checked against the same ranges a device enforces. Every SDK call is
//! appended to a shared [`CallLog`] so callers can inspect the exact
//! announce/queue/stop sequence afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, trace};

use crate::capture_pipeline::common::error::{CaptureError, Result};
use crate::capture_pipeline::frame::RawFrame;
use crate::capture_pipeline::sdk::driver::{CameraDriver, CameraSystem};
use crate::capture_pipeline::sdk::types::{
    BLACK_LEVEL_RANGE, CameraId, EXPOSURE_RANGE, FeatureValue, FrameShape, GAMMA_RANGE, PixelFormat,
    command, feature,
};

const ACQUISITION_MODES: &[&str] = &["Continuous", "SingleFrame", "MultiFrame"];
const WHITE_BALANCE_MODES: &[&str] = &["Off", "Once", "Continuous"];
const EDGE_FILTERS: &[&str] = &["Smooth2", "Smooth1", "Off", "Sharpen1", "Sharpen2"];

/// Exposure at which the rendered gradient uses the full 8-bit range.
const REFERENCE_EXPOSURE: f64 = 200_000.0;

/// Shared, append-only record of SDK calls, formatted as `"<camera> <operation>"`.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    fn record(&self, camera: &CameraId, operation: impl AsRef<str>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(format!("{} {}", camera, operation.as_ref()));
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Operations recorded for one camera, in call order.
    pub fn operations_for(&self, camera: &CameraId) -> Vec<String> {
        let prefix = format!("{camera} ");
        self.entries()
            .into_iter()
            .filter_map(|entry| entry.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn count(&self, camera: &CameraId, operation: &str) -> usize {
        self.operations_for(camera)
            .iter()
            .filter(|op| op.as_str() == operation)
            .count()
    }
}

/// Static description of one virtual device.
#[derive(Debug, Clone)]
pub struct VirtualCameraSpec {
    pub id: CameraId,
    pub width: u32,
    pub height: u32,
    /// Number of frames delivered before every further wait times out.
    pub timeout_after: Option<usize>,
}

impl VirtualCameraSpec {
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: CameraId::new(id),
            width,
            height,
            timeout_after: None,
        }
    }

    pub fn timeout_after(mut self, frames: usize) -> Self {
        self.timeout_after = Some(frames);
        self
    }
}

pub struct VirtualSystem {
    specs: Vec<VirtualCameraSpec>,
    log: CallLog,
}

impl VirtualSystem {
    pub fn new(specs: Vec<VirtualCameraSpec>) -> Self {
        Self {
            specs,
            log: CallLog::default(),
        }
    }

    /// `count` identical devices named `DEV_VIRTUAL_<n>`.
    pub fn with_cameras(count: usize, width: u32, height: u32) -> Self {
        let specs = (0..count)
            .map(|n| VirtualCameraSpec::new(format!("DEV_VIRTUAL_{n}"), width, height))
            .collect();
        Self::new(specs)
    }

    pub fn call_log(&self) -> CallLog {
        self.log.clone()
    }
}

impl CameraSystem for VirtualSystem {
    type Camera = VirtualCamera;

    fn camera_ids(&mut self) -> Result<Vec<CameraId>> {
        self.log
            .record(&CameraId::new("system"), command::GEV_DISCOVERY_ALL_ONCE);
        Ok(self.specs.iter().map(|spec| spec.id.clone()).collect())
    }

    fn open_camera(&mut self, id: &CameraId) -> Result<VirtualCamera> {
        let spec = self
            .specs
            .iter()
            .find(|spec| &spec.id == id)
            .cloned()
            .ok_or_else(|| CaptureError::CameraNotFound(id.to_string()))?;

        debug!(camera = %id, "Opening virtual camera {}x{}", spec.width, spec.height);
        self.log.record(id, "open");
        Ok(VirtualCamera::new(spec, self.log.clone()))
    }
}

pub struct VirtualCamera {
    spec: VirtualCameraSpec,
    log: CallLog,
    features: HashMap<String, FeatureValue>,
    pixel_format: PixelFormat,
    announced: bool,
    capturing: bool,
    acquiring: bool,
    queued: bool,
    frames_delivered: usize,
    buffer: Vec<u8>,
}

impl VirtualCamera {
    fn new(spec: VirtualCameraSpec, log: CallLog) -> Self {
        Self {
            spec,
            log,
            features: HashMap::new(),
            pixel_format: PixelFormat::Mono8,
            announced: false,
            capturing: false,
            acquiring: false,
            queued: false,
            frames_delivered: 0,
            buffer: Vec::new(),
        }
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureValue> {
        self.features.get(name)
    }

    pub fn is_acquiring(&self) -> bool {
        self.acquiring
    }

    pub fn has_announced_frames(&self) -> bool {
        self.announced
    }

    fn float_feature(&self, name: &str, default: f64) -> f64 {
        self.features
            .get(name)
            .and_then(FeatureValue::as_float)
            .unwrap_or(default)
    }

    fn shape(&self) -> FrameShape {
        FrameShape::new(self.spec.width, self.spec.height, self.pixel_format.channels())
    }

    fn render(&mut self) {
        let shape = self.shape();
        let exposure_gain = self.float_feature(feature::EXPOSURE_TIME_ABS, REFERENCE_EXPOSURE)
            / REFERENCE_EXPOSURE;
        let gamma = self.float_feature(feature::GAMMA, 1.0);
        let black = self.float_feature(feature::BLACK_LEVEL, 0.0) / 4.0;
        let shift = self.frames_delivered * 8;

        self.buffer.resize(shape.byte_len(), 0);
        let width = shape.width as usize;
        let channels = shape.channels as usize;
        for (pixel, chunk) in self.buffer.chunks_exact_mut(channels).enumerate() {
            let (x, y) = (pixel % width, pixel / width);
            for (c, value) in chunk.iter_mut().enumerate() {
                let ramp = ((x * (c + 1) + y + shift) % 256) as f64 / 255.0;
                let level = black + ramp.powf(gamma) * exposure_gain * 255.0;
                *value = level.clamp(0.0, 255.0) as u8;
            }
        }
    }
}

fn check_enum(name: &str, value: &FeatureValue, allowed: &[&str]) -> Result<()> {
    let rejected = |reason: String| CaptureError::FeatureRejected {
        feature: name.to_string(),
        reason,
    };
    let value = value
        .as_enum()
        .ok_or_else(|| rejected("expected an enumeration value".to_string()))?;
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(rejected(format!("'{value}' is not one of {allowed:?}")))
    }
}

fn check_float(
    name: &str,
    value: &FeatureValue,
    range: &std::ops::RangeInclusive<f64>,
) -> Result<()> {
    let rejected = |reason: String| CaptureError::FeatureRejected {
        feature: name.to_string(),
        reason,
    };
    let value = value
        .as_float()
        .ok_or_else(|| rejected("expected a float value".to_string()))?;
    if range.contains(&value) {
        Ok(())
    } else {
        Err(rejected(format!(
            "{value} is outside [{}, {}]",
            range.start(),
            range.end()
        )))
    }
}

impl CameraDriver for VirtualCamera {
    fn id(&self) -> &CameraId {
        &self.spec.id
    }

    fn set_feature(&mut self, name: &str, value: FeatureValue) -> Result<()> {
        self.log.record(&self.spec.id, format!("set {name}={value}"));

        match name {
            feature::ACQUISITION_MODE => check_enum(name, &value, ACQUISITION_MODES)?,
            feature::BALANCE_WHITE_AUTO => check_enum(name, &value, WHITE_BALANCE_MODES)?,
            feature::EDGE_FILTER => check_enum(name, &value, EDGE_FILTERS)?,
            feature::EXPOSURE_TIME_ABS => check_float(name, &value, &EXPOSURE_RANGE)?,
            feature::GAMMA => check_float(name, &value, &GAMMA_RANGE)?,
            feature::BLACK_LEVEL => check_float(name, &value, &BLACK_LEVEL_RANGE)?,
            feature::PIXEL_FORMAT => {
                if self.announced {
                    return Err(CaptureError::FeatureRejected {
                        feature: name.to_string(),
                        reason: "locked while frames are announced".to_string(),
                    });
                }
                let format = value
                    .as_enum()
                    .ok_or_else(|| CaptureError::FeatureRejected {
                        feature: name.to_string(),
                        reason: "expected an enumeration value".to_string(),
                    })?
                    .parse::<PixelFormat>()
                    .map_err(|e| CaptureError::FeatureRejected {
                        feature: name.to_string(),
                        reason: e.to_string(),
                    })?;
                self.pixel_format = format;
            }
            _ => {
                return Err(CaptureError::FeatureRejected {
                    feature: name.to_string(),
                    reason: "unknown feature".to_string(),
                });
            }
        }

        self.features.insert(name.to_string(), value);
        Ok(())
    }

    fn frame_shape(&self) -> Result<FrameShape> {
        Ok(self.shape())
    }

    fn announce_frame(&mut self) -> Result<()> {
        self.log.record(&self.spec.id, "announce_frame");
        if self.announced {
            return Err(CaptureError::Sdk(format!(
                "{}: frame buffer already announced",
                self.spec.id
            )));
        }
        self.buffer = vec![0; self.shape().byte_len()];
        self.announced = true;
        Ok(())
    }

    fn start_capture(&mut self) -> Result<()> {
        self.log.record(&self.spec.id, "start_capture");
        self.capturing = true;
        Ok(())
    }

    fn queue_frame(&mut self) -> Result<()> {
        self.log.record(&self.spec.id, "queue_frame");
        if !self.announced || !self.capturing {
            return Err(CaptureError::Sdk(format!(
                "{}: cannot queue a frame outside capture mode",
                self.spec.id
            )));
        }
        self.queued = true;
        Ok(())
    }

    fn run_command(&mut self, name: &str) -> Result<()> {
        self.log.record(&self.spec.id, format!("run {name}"));
        match name {
            command::ACQUISITION_START => {
                if !self.capturing {
                    return Err(CaptureError::Sdk(format!(
                        "{}: AcquisitionStart requires capture mode",
                        self.spec.id
                    )));
                }
                self.acquiring = true;
            }
            command::ACQUISITION_STOP => self.acquiring = false,
            other => {
                return Err(CaptureError::Sdk(format!(
                    "{}: unknown command {other}",
                    self.spec.id
                )));
            }
        }
        Ok(())
    }

    fn wait_frame(&mut self, timeout: Duration) -> Result<RawFrame<'_>> {
        self.log.record(&self.spec.id, "wait_frame");

        let exhausted = self
            .spec
            .timeout_after
            .is_some_and(|limit| self.frames_delivered >= limit);
        if !self.acquiring || !self.queued || exhausted {
            return Err(CaptureError::FrameTimeout(timeout));
        }

        self.render();
        self.queued = false;
        self.frames_delivered += 1;
        trace!(camera = %self.spec.id, frame = self.frames_delivered, "Frame delivered");

        Ok(RawFrame::new(self.shape(), &self.buffer))
    }

    fn end_capture(&mut self) -> Result<()> {
        self.log.record(&self.spec.id, "end_capture");
        self.capturing = false;
        Ok(())
    }

    fn flush_queue(&mut self) -> Result<()> {
        self.log.record(&self.spec.id, "flush_queue");
        self.queued = false;
        Ok(())
    }

    fn revoke_frames(&mut self) -> Result<()> {
        self.log.record(&self.spec.id, "revoke_frames");
        self.announced = false;
        self.queued = false;
        self.buffer = Vec::new();
        Ok(())
    }
}
