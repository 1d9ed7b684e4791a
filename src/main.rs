use anyhow::Result;
use clap::Parser;
use imgacq_rs::capture_pipeline::{
    CancellationToken, CaptureConfig, CapturePipeline, VirtualSystem, install_interrupt_handler,
};
use imgacq_rs::cli::CliArgs;
use imgacq_rs::logger;

use tracing::{debug, error, info};

fn main() -> Result<()> {
    logger::init();

    let args = CliArgs::parse();
    let system = VirtualSystem::with_cameras(args.virtual_cameras, args.sensor.width, args.sensor.height);
    let config = CaptureConfig::try_from(args)?;

    info!("Starting imgacq...");
    info!("Output directory: {}", config.directory.display());
    info!(
        "Exposure: {}, gamma: {}, black level: {}, pixel format: {}",
        config.camera.exposure, config.camera.gamma, config.camera.black_level, config.camera.pixel_format
    );

    let cancel = CancellationToken::new();
    install_interrupt_handler(&cancel);

    let mut pipeline = CapturePipeline::new(system, config);
    match pipeline.run(&cancel) {
        Ok(report) => {
            for file in &report.saved {
                debug!(camera = %file.camera, "{}", file.path.display());
            }
            info!("{} images saved", report.saved.len());
            Ok(())
        }
        Err(e) => {
            error!("Capture failed: {}", e);
            Err(e.into())
        }
    }
}
