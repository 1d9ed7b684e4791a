use tracing::{info, instrument, warn};

use crate::capture_pipeline::{
    acquisition::{
        CancellationToken, CaptureConfig, CaptureCount, CaptureReport, PipelineTimings, SaveMode,
        Timer, types::CameraSelection,
    },
    common::error::{CaptureError, Result},
    jpeg::{ImageWriter, StandardJpegWriter},
    persist::{ImageSaver, SavedFile},
    sdk::{CameraDriver, CameraSystem, types::CameraId},
    session::CaptureSession,
};

/// Where the capture loop ended.
struct LoopOutcome {
    iterations: usize,
    interrupted: bool,
}

pub struct CapturePipeline<S: CameraSystem, W: ImageWriter> {
    system: S,
    writer: W,
    config: CaptureConfig,
}

impl<S: CameraSystem> CapturePipeline<S, StandardJpegWriter> {
    pub fn new(system: S, config: CaptureConfig) -> Self {
        Self {
            system,
            writer: StandardJpegWriter::new(config.jpeg_quality),
            config,
        }
    }
}

impl<S: CameraSystem, W: ImageWriter> CapturePipeline<S, W> {
    pub fn with_custom(system: S, writer: W, config: CaptureConfig) -> Self {
        Self {
            system,
            writer,
            config,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: CaptureConfig) {
        self.config = config;
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    fn open_sessions(&mut self) -> Result<Vec<CaptureSession<S::Camera>>> {
        let ids = self.system.camera_ids()?;
        for id in &ids {
            info!("Camera ID: {}", id);
        }

        let selected: Vec<CameraId> = match &self.config.selection {
            CameraSelection::First => vec![ids.first().cloned().ok_or(CaptureError::NoCameras)?],
            CameraSelection::Id(wanted) => {
                if !ids.contains(wanted) {
                    return Err(CaptureError::CameraNotFound(wanted.to_string()));
                }
                vec![wanted.clone()]
            }
            CameraSelection::All => {
                if ids.is_empty() {
                    return Err(CaptureError::NoCameras);
                }
                ids
            }
        };
        self.config.selection.layout().check_cameras(&selected)?;

        selected
            .iter()
            .map(|id| self.system.open_camera(id).map(CaptureSession::new))
            .collect()
    }

    /// Configures and starts the selected cameras, runs the capture loop,
    /// stops every camera and writes the images.
    ///
    /// Cameras are stopped whether the loop finishes, is interrupted, or
    /// fails. In [`SaveMode::Immediate`] files written before a failure stay
    /// on disk; in [`SaveMode::Deferred`] nothing is written unless the loop
    /// and the stop sequence both succeed.
    #[instrument(skip(self, cancel), fields(count = ?self.config.count, save_mode = ?self.config.save_mode))]
    pub fn run(&mut self, cancel: &CancellationToken) -> Result<CaptureReport> {
        info!("Starting capture run");
        let mut timings = PipelineTimings::new();

        let mut sessions = {
            let _span = tracing::info_span!("open_cameras").entered();
            self.open_sessions()?
        };

        {
            let _span = tracing::info_span!("configure").entered();
            for session in sessions.iter_mut() {
                session.configure(&self.config.camera)?;
            }
        }

        {
            let _span = tracing::info_span!("start_acquisition").entered();
            for session in sessions.iter_mut() {
                session.start()?;
            }
        }

        let saver = ImageSaver::new(
            &self.writer,
            &self.config.directory,
            self.config.prefix.clone(),
            self.config.selection.layout(),
        );
        let mut saved = Vec::new();

        let loop_result = {
            let _span = tracing::info_span!("capture_loop").entered();
            self.capture_loop(&mut sessions, &saver, cancel, &mut timings, &mut saved)
        };
        let stop_result = stop_all(&mut sessions);
        let outcome = loop_result?;
        stop_result?;

        let captured = sessions
            .iter()
            .map(|session| (session.id().clone(), session.captured_count()))
            .collect();

        if self.config.save_mode == SaveMode::Deferred {
            let _span = tracing::info_span!("persist").entered();
            for session in sessions.iter_mut() {
                let images = session.take_retained();
                let timer = Timer::start("save_batch");
                saved.extend(saver.save_batch(session.id(), &images)?);
                timings.record(timer);
            }
        }

        timings.log_summary();
        info!(
            iterations = outcome.iterations,
            interrupted = outcome.interrupted,
            files = saved.len(),
            "Capture run complete"
        );

        Ok(CaptureReport {
            iterations: outcome.iterations,
            interrupted: outcome.interrupted,
            captured,
            saved,
            timings,
        })
    }

    /// Runs capture rounds until the count is reached or `cancel` fires.
    ///
    /// Cancellation is checked during the inter-round sleep. A round that has
    /// begun always completes for every camera; each frame wait is bounded by
    /// the configured timeout.
    fn capture_loop<'w>(
        &self,
        sessions: &mut [CaptureSession<S::Camera>],
        saver: &ImageSaver<&'w W>,
        cancel: &CancellationToken,
        timings: &mut PipelineTimings,
        saved: &mut Vec<SavedFile>,
    ) -> Result<LoopOutcome> {
        if self.config.count == CaptureCount::UntilInterrupted {
            info!("Press CTRL + C to stop image acquisition");
        }

        let mut iterations = 0;
        loop {
            if let CaptureCount::Fixed(limit) = self.config.count {
                if iterations >= limit {
                    return Ok(LoopOutcome {
                        iterations,
                        interrupted: false,
                    });
                }
            }

            if cancel.sleep(self.config.interval) {
                info!(iterations, "Interrupted, stopping acquisition");
                return Ok(LoopOutcome {
                    iterations,
                    interrupted: true,
                });
            }

            for session in sessions.iter_mut() {
                let timer = Timer::start("wait_frame");
                let captured = session.capture_one(self.config.frame_timeout)?;
                timings.record(timer);

                match self.config.save_mode {
                    SaveMode::Immediate => {
                        let timer = Timer::start("save");
                        saved.push(saver.save(session.id(), &captured)?);
                        timings.record(timer);
                    }
                    SaveMode::Deferred => session.retain(captured),
                }
            }
            iterations += 1;
        }
    }
}

/// Stops every session, returning the first failure after all have been tried.
fn stop_all<C: CameraDriver>(sessions: &mut [CaptureSession<C>]) -> Result<()> {
    let _span = tracing::info_span!("stop_acquisition").entered();
    let mut first_error = None;
    for session in sessions.iter_mut() {
        if let Err(e) = session.stop() {
            warn!(camera = %session.id(), "Failed to stop acquisition: {}", e);
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}
