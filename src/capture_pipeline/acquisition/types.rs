//! Capture run configuration and results

use std::path::PathBuf;
use std::time::Duration;

use crate::capture_pipeline::acquisition::timing::PipelineTimings;
use crate::capture_pipeline::jpeg::DEFAULT_JPEG_QUALITY;
use crate::capture_pipeline::persist::{OutputLayout, SavedFile};
use crate::capture_pipeline::sdk::types::CameraId;
use crate::capture_pipeline::session::CameraSettings;

/// How many loop iterations to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureCount {
    Fixed(usize),
    /// Keep capturing until the cancellation token fires
    UntilInterrupted,
}

impl CaptureCount {
    /// Negative requests mean "run until interrupted".
    pub fn from_requested(requested: i64) -> Self {
        usize::try_from(requested)
            .map(CaptureCount::Fixed)
            .unwrap_or(CaptureCount::UntilInterrupted)
    }
}

/// When captured images are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// Keep images in memory and write them after every camera has stopped
    #[default]
    Deferred,
    /// Write each image right after it is captured
    Immediate,
}

/// Which discovered cameras take part in the run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CameraSelection {
    #[default]
    First,
    Id(CameraId),
    /// Every discovered camera, each writing into its own subdirectory
    All,
}

impl CameraSelection {
    pub fn layout(&self) -> OutputLayout {
        match self {
            CameraSelection::All => OutputLayout::PerCamera,
            CameraSelection::First | CameraSelection::Id(_) => OutputLayout::Flat,
        }
    }
}

/// Configuration for a capture run
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Feature values written to every camera
    pub camera: CameraSettings,
    pub count: CaptureCount,
    /// Sleep before each capture round
    pub interval: Duration,
    /// Upper bound on a single frame wait
    pub frame_timeout: Duration,
    pub save_mode: SaveMode,
    pub selection: CameraSelection,
    /// Output directory, created if absent
    pub directory: PathBuf,
    /// Filename prefix, files are named `{prefix}{index}.jpg`
    pub prefix: String,
    /// JPEG quality, 1..=100
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            count: CaptureCount::Fixed(1),
            interval: Duration::from_secs(5),
            frame_timeout: Duration::from_millis(1000),
            save_mode: SaveMode::Deferred,
            selection: CameraSelection::First,
            directory: PathBuf::from("."),
            prefix: "img_".to_string(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl CaptureConfig {
    pub fn builder() -> CaptureConfigBuilder {
        CaptureConfigBuilder::default()
    }
}

/// Builder for CaptureConfig
#[derive(Default)]
pub struct CaptureConfigBuilder {
    camera: Option<CameraSettings>,
    count: Option<CaptureCount>,
    interval: Option<Duration>,
    frame_timeout: Option<Duration>,
    save_mode: Option<SaveMode>,
    selection: Option<CameraSelection>,
    directory: Option<PathBuf>,
    prefix: Option<String>,
    jpeg_quality: Option<u8>,
}

impl CaptureConfigBuilder {
    pub fn camera(mut self, settings: CameraSettings) -> Self {
        self.camera = Some(settings);
        self
    }

    pub fn count(mut self, count: CaptureCount) -> Self {
        self.count = Some(count);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn frame_timeout(mut self, timeout: Duration) -> Self {
        self.frame_timeout = Some(timeout);
        self
    }

    pub fn save_mode(mut self, mode: SaveMode) -> Self {
        self.save_mode = Some(mode);
        self
    }

    pub fn selection(mut self, selection: CameraSelection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = Some(quality);
        self
    }

    pub fn build(self) -> CaptureConfig {
        let default = CaptureConfig::default();
        CaptureConfig {
            camera: self.camera.unwrap_or(default.camera),
            count: self.count.unwrap_or(default.count),
            interval: self.interval.unwrap_or(default.interval),
            frame_timeout: self.frame_timeout.unwrap_or(default.frame_timeout),
            save_mode: self.save_mode.unwrap_or(default.save_mode),
            selection: self.selection.unwrap_or(default.selection),
            directory: self.directory.unwrap_or(default.directory),
            prefix: self.prefix.unwrap_or(default.prefix),
            jpeg_quality: self.jpeg_quality.unwrap_or(default.jpeg_quality),
        }
    }
}

/// Outcome of [`CapturePipeline::run`](super::CapturePipeline::run).
#[derive(Debug)]
pub struct CaptureReport {
    /// Completed capture rounds (one frame per camera each)
    pub iterations: usize,
    /// Whether the loop ended because of an interrupt
    pub interrupted: bool,
    /// Frames captured per camera, in session order
    pub captured: Vec<(CameraId, usize)>,
    pub saved: Vec<SavedFile>,
    pub timings: PipelineTimings,
}

impl CaptureReport {
    pub fn saved_for(&self, camera: &CameraId) -> impl Iterator<Item = &SavedFile> {
        self.saved.iter().filter(move |file| &file.camera == camera)
    }
}
