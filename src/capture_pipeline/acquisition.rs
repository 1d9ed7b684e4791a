//! Capture orchestration module
//!
//! Ties sessions, the loop policy and persistence together into a single run.

mod cancel;
mod pipeline;
mod timing;
pub mod types;

#[cfg(test)]
mod tests;

pub use cancel::{CancellationToken, install_interrupt_handler};
pub use pipeline::CapturePipeline;
pub use timing::{PipelineTimings, StepTiming, Timer};
pub use types::{
    CameraSelection, CaptureConfig, CaptureConfigBuilder, CaptureCount, CaptureReport, SaveMode,
};
