use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::capture_pipeline::acquisition::{
    CameraSelection, CancellationToken, CaptureConfig, CaptureCount, CapturePipeline, SaveMode,
};
use crate::capture_pipeline::common::error::{CaptureError, Result};
use crate::capture_pipeline::frame::{Image, RawFrame};
use crate::capture_pipeline::jpeg::ImageWriter;
use crate::capture_pipeline::sdk::{
    CallLog, CameraDriver, CameraSystem, VirtualCamera, VirtualCameraSpec, VirtualSystem,
    types::{CameraId, FeatureValue, FrameShape},
};
use crate::capture_pipeline::session::CameraSettings;

const STOP_SEQUENCE: [&str; 4] = ["run AcquisitionStop", "end_capture", "flush_queue", "revoke_frames"];

struct MockWriter {
    should_fail: bool,
    written: Arc<Mutex<Vec<Image>>>,
}

impl MockWriter {
    fn new(should_fail: bool) -> Self {
        Self {
            should_fail,
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl ImageWriter for MockWriter {
    fn write_jpeg(&self, image: &Image, output: &mut dyn Write) -> Result<()> {
        if self.should_fail {
            return Err(CaptureError::EncodeError("Mock encode error".to_string()));
        }
        self.written.lock().unwrap().push(image.clone());
        output.write_all(&[0xFF, 0xD8, 0xFF, 0xD9])?;
        Ok(())
    }
}

/// Wraps the virtual backend and fires `token` once a camera has delivered
/// `after` frames, simulating an interrupt that lands during a frame wait.
struct InterruptingSystem {
    inner: VirtualSystem,
    token: CancellationToken,
    after: usize,
}

struct InterruptingCamera {
    inner: VirtualCamera,
    token: CancellationToken,
    after: usize,
    delivered: usize,
}

impl CameraSystem for InterruptingSystem {
    type Camera = InterruptingCamera;

    fn camera_ids(&mut self) -> Result<Vec<CameraId>> {
        self.inner.camera_ids()
    }

    fn open_camera(&mut self, id: &CameraId) -> Result<InterruptingCamera> {
        Ok(InterruptingCamera {
            inner: self.inner.open_camera(id)?,
            token: self.token.clone(),
            after: self.after,
            delivered: 0,
        })
    }
}

impl CameraDriver for InterruptingCamera {
    fn id(&self) -> &CameraId {
        self.inner.id()
    }

    fn set_feature(&mut self, name: &str, value: FeatureValue) -> Result<()> {
        self.inner.set_feature(name, value)
    }

    fn frame_shape(&self) -> Result<FrameShape> {
        self.inner.frame_shape()
    }

    fn announce_frame(&mut self) -> Result<()> {
        self.inner.announce_frame()
    }

    fn start_capture(&mut self) -> Result<()> {
        self.inner.start_capture()
    }

    fn queue_frame(&mut self) -> Result<()> {
        self.inner.queue_frame()
    }

    fn run_command(&mut self, name: &str) -> Result<()> {
        self.inner.run_command(name)
    }

    fn wait_frame(&mut self, timeout: Duration) -> Result<RawFrame<'_>> {
        self.delivered += 1;
        if self.delivered >= self.after {
            self.token.cancel();
        }
        self.inner.wait_frame(timeout)
    }

    fn end_capture(&mut self) -> Result<()> {
        self.inner.end_capture()
    }

    fn flush_queue(&mut self) -> Result<()> {
        self.inner.flush_queue()
    }

    fn revoke_frames(&mut self) -> Result<()> {
        self.inner.revoke_frames()
    }
}

fn config(dir: &Path, count: CaptureCount) -> CaptureConfig {
    CaptureConfig::builder()
        .count(count)
        .interval(Duration::ZERO)
        .frame_timeout(Duration::from_millis(100))
        .directory(dir)
        .build()
}

fn ends_with_stop_sequence(log: &CallLog, camera: &str) -> bool {
    let ops = log.operations_for(&CameraId::new(camera));
    ops.len() >= STOP_SEQUENCE.len() && ops[ops.len() - STOP_SEQUENCE.len()..] == STOP_SEQUENCE
}

fn jpg_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_config_builder() {
    let config = CaptureConfig::builder()
        .count(CaptureCount::from_requested(-1))
        .interval(Duration::from_secs(2))
        .save_mode(SaveMode::Immediate)
        .selection(CameraSelection::All)
        .prefix("shot_")
        .jpeg_quality(75)
        .build();

    assert_eq!(config.count, CaptureCount::UntilInterrupted);
    assert_eq!(config.interval, Duration::from_secs(2));
    assert_eq!(config.save_mode, SaveMode::Immediate);
    assert_eq!(config.selection, CameraSelection::All);
    assert_eq!(config.prefix, "shot_");
    assert_eq!(config.jpeg_quality, 75);
    assert_eq!(config.frame_timeout, Duration::from_millis(1000));
    assert_eq!(config.camera, CameraSettings::default());
}

#[test]
fn test_requested_count_mapping() {
    assert_eq!(CaptureCount::from_requested(0), CaptureCount::Fixed(0));
    assert_eq!(CaptureCount::from_requested(3), CaptureCount::Fixed(3));
    assert_eq!(CaptureCount::from_requested(-5), CaptureCount::UntilInterrupted);
}

#[test]
fn test_fixed_count_writes_exact_files() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let system = VirtualSystem::with_cameras(1, 64, 48);
    let log = system.call_log();
    let writer = MockWriter::new(false);
    let written = writer.written.clone();
    let mut config = config(&out, CaptureCount::Fixed(3));
    config.prefix = "shot_".to_string();

    let mut pipeline = CapturePipeline::with_custom(system, writer, config);
    let report = pipeline.run(&CancellationToken::new()).unwrap();

    assert_eq!(report.iterations, 3);
    assert!(!report.interrupted);
    assert_eq!(jpg_names(&out), vec!["shot_0.jpg", "shot_1.jpg", "shot_2.jpg"]);
    assert_eq!(written.lock().unwrap().len(), 3);
    assert!(written
        .lock()
        .unwrap()
        .iter()
        .all(|image| image.width == 64 && image.height == 48 && image.data.len() == 64 * 48 * 3));
    assert!(ends_with_stop_sequence(&log, "DEV_VIRTUAL_0"));
    assert_eq!(log.count(&CameraId::new("DEV_VIRTUAL_0"), "run AcquisitionStop"), 1);
}

#[test]
fn test_zero_count_still_stops_camera() {
    let tmp = tempfile::tempdir().unwrap();
    let system = VirtualSystem::with_cameras(1, 8, 8);
    let log = system.call_log();

    let mut pipeline =
        CapturePipeline::with_custom(system, MockWriter::new(false), config(tmp.path(), CaptureCount::Fixed(0)));
    let report = pipeline.run(&CancellationToken::new()).unwrap();

    assert_eq!(report.iterations, 0);
    assert!(report.saved.is_empty());
    assert_eq!(log.count(&CameraId::new("DEV_VIRTUAL_0"), "wait_frame"), 0);
    assert!(ends_with_stop_sequence(&log, "DEV_VIRTUAL_0"));
}

#[test]
fn test_interrupt_after_two_captures() {
    let tmp = tempfile::tempdir().unwrap();
    let token = CancellationToken::new();
    let inner = VirtualSystem::with_cameras(1, 16, 16);
    let log = inner.call_log();
    let system = InterruptingSystem {
        inner,
        token: token.clone(),
        after: 2,
    };

    let mut pipeline = CapturePipeline::with_custom(
        system,
        MockWriter::new(false),
        config(tmp.path(), CaptureCount::UntilInterrupted),
    );
    let report = pipeline.run(&token).unwrap();

    assert!(report.interrupted);
    assert_eq!(report.iterations, 2);
    assert_eq!(jpg_names(tmp.path()), vec!["img_0.jpg", "img_1.jpg"]);
    assert!(ends_with_stop_sequence(&log, "DEV_VIRTUAL_0"));
}

#[test]
fn test_interrupt_also_ends_fixed_count_early() {
    let tmp = tempfile::tempdir().unwrap();
    let token = CancellationToken::new();
    let system = InterruptingSystem {
        inner: VirtualSystem::with_cameras(1, 8, 8),
        token: token.clone(),
        after: 1,
    };

    let mut pipeline = CapturePipeline::with_custom(
        system,
        MockWriter::new(false),
        config(tmp.path(), CaptureCount::Fixed(10)),
    );
    let report = pipeline.run(&token).unwrap();

    assert!(report.interrupted);
    assert_eq!(report.saved.len(), 1);
}

#[test]
fn test_cancelled_before_first_capture() {
    let tmp = tempfile::tempdir().unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let system = VirtualSystem::with_cameras(1, 8, 8);
    let log = system.call_log();

    let mut pipeline = CapturePipeline::with_custom(
        system,
        MockWriter::new(false),
        config(tmp.path(), CaptureCount::UntilInterrupted),
    );
    let report = pipeline.run(&token).unwrap();

    assert!(report.interrupted);
    assert_eq!(report.iterations, 0);
    assert!(report.saved.is_empty());
    assert!(ends_with_stop_sequence(&log, "DEV_VIRTUAL_0"));
}

#[test]
fn test_multi_camera_outputs_stay_separate() {
    let tmp = tempfile::tempdir().unwrap();
    let system = VirtualSystem::new(vec![
        VirtualCameraSpec::new("DEV_A", 8, 4),
        VirtualCameraSpec::new("DEV_B", 12, 6),
    ]);
    let log = system.call_log();
    let mut config = config(tmp.path(), CaptureCount::Fixed(2));
    config.selection = CameraSelection::All;

    let mut pipeline = CapturePipeline::with_custom(system, MockWriter::new(false), config);
    let report = pipeline.run(&CancellationToken::new()).unwrap();

    assert_eq!(
        report.captured,
        vec![(CameraId::new("DEV_A"), 2), (CameraId::new("DEV_B"), 2)]
    );
    assert_eq!(jpg_names(&tmp.path().join("DEV_A")), vec!["img_0.jpg", "img_1.jpg"]);
    assert_eq!(jpg_names(&tmp.path().join("DEV_B")), vec!["img_0.jpg", "img_1.jpg"]);
    assert!(jpg_names(tmp.path()).is_empty());

    let a_files: Vec<_> = report.saved_for(&CameraId::new("DEV_A")).map(|f| f.index).collect();
    assert_eq!(a_files, vec![0, 1]);

    // one frame per camera per round, cameras in discovery order
    let waits: Vec<_> = log
        .entries()
        .into_iter()
        .filter(|entry| entry.ends_with(" wait_frame"))
        .collect();
    assert_eq!(
        waits,
        vec!["DEV_A wait_frame", "DEV_B wait_frame", "DEV_A wait_frame", "DEV_B wait_frame"]
    );
    assert!(ends_with_stop_sequence(&log, "DEV_A"));
    assert!(ends_with_stop_sequence(&log, "DEV_B"));
}

/// Records, for every write, whether the camera had already revoked its buffers.
struct StopCheckingWriter {
    log: CallLog,
    camera: CameraId,
    stopped_at_write: Arc<Mutex<Vec<bool>>>,
}

impl ImageWriter for StopCheckingWriter {
    fn write_jpeg(&self, _image: &Image, _output: &mut dyn Write) -> Result<()> {
        let stopped = self.log.count(&self.camera, "revoke_frames") > 0;
        self.stopped_at_write.lock().unwrap().push(stopped);
        Ok(())
    }
}

#[test]
fn test_deferred_saves_after_stop() {
    let tmp = tempfile::tempdir().unwrap();
    let system = VirtualSystem::with_cameras(1, 8, 8);
    let stopped_at_write = Arc::new(Mutex::new(Vec::new()));
    let writer = StopCheckingWriter {
        log: system.call_log(),
        camera: CameraId::new("DEV_VIRTUAL_0"),
        stopped_at_write: stopped_at_write.clone(),
    };

    let mut pipeline =
        CapturePipeline::with_custom(system, writer, config(tmp.path(), CaptureCount::Fixed(2)));
    pipeline.run(&CancellationToken::new()).unwrap();

    assert_eq!(*stopped_at_write.lock().unwrap(), vec![true, true]);
}

#[test]
fn test_immediate_saves_during_acquisition() {
    let tmp = tempfile::tempdir().unwrap();
    let system = VirtualSystem::with_cameras(1, 8, 8);
    let stopped_at_write = Arc::new(Mutex::new(Vec::new()));
    let writer = StopCheckingWriter {
        log: system.call_log(),
        camera: CameraId::new("DEV_VIRTUAL_0"),
        stopped_at_write: stopped_at_write.clone(),
    };
    let mut config = config(tmp.path(), CaptureCount::Fixed(2));
    config.save_mode = SaveMode::Immediate;

    let mut pipeline = CapturePipeline::with_custom(system, writer, config);
    let report = pipeline.run(&CancellationToken::new()).unwrap();

    assert_eq!(*stopped_at_write.lock().unwrap(), vec![false, false]);
    assert_eq!(report.saved.len(), 2);
    assert!(report.timings.get_step("save").is_some());
}

#[test]
fn test_timeout_aborts_run_and_stops_camera() {
    let tmp = tempfile::tempdir().unwrap();
    let system = VirtualSystem::new(vec![VirtualCameraSpec::new("DEV_FLAKY", 8, 8).timeout_after(1)]);
    let log = system.call_log();

    let mut pipeline = CapturePipeline::with_custom(
        system,
        MockWriter::new(false),
        config(tmp.path(), CaptureCount::Fixed(3)),
    );
    let result = pipeline.run(&CancellationToken::new());

    assert!(matches!(result, Err(CaptureError::FrameTimeout(_))));
    assert!(ends_with_stop_sequence(&log, "DEV_FLAKY"));
    // deferred images are never written after a fatal error
    assert!(jpg_names(tmp.path()).is_empty());
}

#[test]
fn test_immediate_mode_keeps_files_written_before_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let system = VirtualSystem::new(vec![VirtualCameraSpec::new("DEV_FLAKY", 8, 8).timeout_after(2)]);
    let mut config = config(tmp.path(), CaptureCount::Fixed(5));
    config.save_mode = SaveMode::Immediate;

    let mut pipeline = CapturePipeline::with_custom(system, MockWriter::new(false), config);
    let result = pipeline.run(&CancellationToken::new());

    assert!(matches!(result, Err(CaptureError::FrameTimeout(_))));
    assert_eq!(jpg_names(tmp.path()), vec!["img_0.jpg", "img_1.jpg"]);
}

#[test]
fn test_rejected_feature_aborts_before_acquisition() {
    let tmp = tempfile::tempdir().unwrap();
    let system = VirtualSystem::with_cameras(1, 8, 8);
    let log = system.call_log();
    let mut config = config(tmp.path(), CaptureCount::Fixed(1));
    config.camera.gamma = 2.0;

    let mut pipeline = CapturePipeline::with_custom(system, MockWriter::new(false), config);
    let result = pipeline.run(&CancellationToken::new());

    assert!(matches!(result, Err(CaptureError::FeatureRejected { feature, .. }) if feature == "Gamma"));
    assert_eq!(log.count(&CameraId::new("DEV_VIRTUAL_0"), "announce_frame"), 0);
}

#[test]
fn test_writer_failure_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let system = VirtualSystem::with_cameras(1, 8, 8);
    let log = system.call_log();

    let mut pipeline = CapturePipeline::with_custom(
        system,
        MockWriter::new(true),
        config(tmp.path(), CaptureCount::Fixed(1)),
    );
    let result = pipeline.run(&CancellationToken::new());

    assert!(matches!(result, Err(CaptureError::EncodeError(_))));
    assert!(ends_with_stop_sequence(&log, "DEV_VIRTUAL_0"));
}

#[test]
fn test_camera_selection_errors() {
    let tmp = tempfile::tempdir().unwrap();

    let mut empty = CapturePipeline::with_custom(
        VirtualSystem::new(Vec::new()),
        MockWriter::new(false),
        config(tmp.path(), CaptureCount::Fixed(1)),
    );
    assert!(matches!(
        empty.run(&CancellationToken::new()),
        Err(CaptureError::NoCameras)
    ));

    let mut config = config(tmp.path(), CaptureCount::Fixed(1));
    config.selection = CameraSelection::Id(CameraId::new("DEV_MISSING"));
    let mut missing =
        CapturePipeline::with_custom(VirtualSystem::with_cameras(2, 8, 8), MockWriter::new(false), config);
    assert!(matches!(
        missing.run(&CancellationToken::new()),
        Err(CaptureError::CameraNotFound(id)) if id == "DEV_MISSING"
    ));
}

#[test]
fn test_select_camera_by_id() {
    let tmp = tempfile::tempdir().unwrap();
    let system = VirtualSystem::with_cameras(3, 8, 8);
    let log = system.call_log();
    let mut config = config(tmp.path(), CaptureCount::Fixed(1));
    config.selection = CameraSelection::Id(CameraId::new("DEV_VIRTUAL_2"));

    let mut pipeline = CapturePipeline::with_custom(system, MockWriter::new(false), config);
    let report = pipeline.run(&CancellationToken::new()).unwrap();

    assert_eq!(report.captured, vec![(CameraId::new("DEV_VIRTUAL_2"), 1)]);
    assert_eq!(log.count(&CameraId::new("DEV_VIRTUAL_0"), "open"), 0);
    assert_eq!(jpg_names(tmp.path()), vec!["img_0.jpg"]);
}

#[test]
fn test_colliding_camera_directories_are_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let system = VirtualSystem::new(vec![
        VirtualCameraSpec::new("DEV/1", 8, 8),
        VirtualCameraSpec::new("DEV_1", 16, 16),
    ]);
    let log = system.call_log();
    let mut config = config(tmp.path(), CaptureCount::Fixed(2));
    config.selection = CameraSelection::All;

    let mut pipeline = CapturePipeline::with_custom(system, MockWriter::new(false), config);
    let result = pipeline.run(&CancellationToken::new());

    assert!(matches!(result, Err(CaptureError::InvalidConfig(_))));
    assert_eq!(log.count(&CameraId::new("DEV/1"), "open"), 0);
    assert_eq!(log.count(&CameraId::new("DEV_1"), "open"), 0);
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn test_parent_directory_camera_id_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = config(tmp.path(), CaptureCount::Fixed(1));
    config.selection = CameraSelection::All;

    let mut pipeline = CapturePipeline::with_custom(
        VirtualSystem::new(vec![VirtualCameraSpec::new("..", 8, 8)]),
        MockWriter::new(false),
        config,
    );

    assert!(matches!(
        pipeline.run(&CancellationToken::new()),
        Err(CaptureError::InvalidConfig(_))
    ));
}

#[test]
fn test_pipeline_reuses_system_with_new_config() {
    let tmp = tempfile::tempdir().unwrap();
    let mut pipeline = CapturePipeline::with_custom(
        VirtualSystem::with_cameras(1, 8, 8),
        MockWriter::new(false),
        config(&tmp.path().join("first"), CaptureCount::Fixed(1)),
    );
    pipeline.run(&CancellationToken::new()).unwrap();

    let mut second = pipeline.config().clone();
    second.directory = tmp.path().join("second");
    second.count = CaptureCount::Fixed(2);
    pipeline.set_config(second);
    let report = pipeline.run(&CancellationToken::new()).unwrap();

    assert_eq!(pipeline.config().count, CaptureCount::Fixed(2));
    assert_eq!(report.saved.len(), 2);
    assert_eq!(jpg_names(&tmp.path().join("first")), vec!["img_0.jpg"]);
    assert_eq!(jpg_names(&tmp.path().join("second")), vec!["img_0.jpg", "img_1.jpg"]);
    let log = pipeline.system().call_log();
    assert_eq!(log.count(&CameraId::new("DEV_VIRTUAL_0"), "open"), 2);
    assert_eq!(log.count(&CameraId::new("DEV_VIRTUAL_0"), "revoke_frames"), 2);
}
