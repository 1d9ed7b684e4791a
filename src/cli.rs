//! Command-line surface.
//!
//! Flags are parsed with clap and translated into a [`CaptureConfig`] once,
//! so the pipeline never looks at raw arguments.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};

use crate::capture_pipeline::{
    CameraId, CameraSelection, CameraSettings, CaptureConfig, CaptureCount, PixelFormat, SaveMode,
};

/// Frame size of the built-in virtual cameras.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSize {
    pub width: u32,
    pub height: u32,
}

impl FromStr for SensorSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (width, height) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected <WIDTH>x<HEIGHT>, got '{s}'"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| format!("'{v}' is not a positive integer"))
        };
        Ok(Self {
            width: parse(width)?,
            height: parse(height)?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SaveModeArg {
    /// Write every image after acquisition has stopped
    Deferred,
    /// Write each image as soon as it is captured
    Immediate,
}

impl From<SaveModeArg> for SaveMode {
    fn from(mode: SaveModeArg) -> Self {
        match mode {
            SaveModeArg::Deferred => SaveMode::Deferred,
            SaveModeArg::Immediate => SaveMode::Immediate,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "imgacq",
    version,
    about = "Capture camera frames at a fixed interval and save them as JPEG files"
)]
pub struct CliArgs {
    /// Seconds to wait before each capture.
    #[arg(
        short = 'f',
        long = "frequency",
        value_name = "SECONDS",
        default_value_t = 5.0,
        allow_negative_numbers = true
    )]
    pub frequency: f64,

    /// Directory the images are written to.
    #[arg(short = 'd', long = "directory", value_name = "DIR")]
    pub directory: PathBuf,

    /// Number of images to capture. A negative value captures until Ctrl+C.
    #[arg(
        short = 'n',
        long = "img_num",
        visible_alias = "img-num",
        value_name = "N",
        default_value_t = 1,
        allow_negative_numbers = true
    )]
    pub img_num: i64,

    /// Image filename prefix. May include subdirectories, e.g. `sub/img_`.
    #[arg(short = 'p', long = "prefix", default_value = "img_")]
    pub prefix: String,

    /// Exposure time. Minimum: 26, Maximum: 60000000.
    #[arg(short = 'e', long = "exposure", default_value_t = 200_000.0, allow_negative_numbers = true)]
    pub exposure: f64,

    /// Gamma value. Minimum: 0.45, Maximum: 1.
    #[arg(short = 'g', long = "gamma", default_value_t = 0.7, allow_negative_numbers = true)]
    pub gamma: f64,

    /// Black level value. Minimum: 0, Maximum: 255.75.
    #[arg(short = 'b', long = "black", default_value_t = 128.0, allow_negative_numbers = true)]
    pub black: f64,

    /// Raw pixel format (Mono8, RGB8Packed, BGR8Packed).
    #[arg(long = "pixel-format", default_value = "RGB8Packed")]
    pub pixel_format: String,

    #[arg(long = "acquisition-mode", default_value = "Continuous")]
    pub acquisition_mode: String,

    /// BalanceWhiteAuto mode.
    #[arg(long = "white-balance", default_value = "Continuous")]
    pub white_balance: String,

    #[arg(long = "edge-filter", default_value = "Sharpen1")]
    pub edge_filter: String,

    /// Maximum time to wait for one frame, in milliseconds.
    #[arg(long = "timeout-ms", value_name = "MS", default_value_t = 1000)]
    pub timeout_ms: u64,

    /// When images are encoded and written.
    #[arg(long = "save-mode", value_enum, default_value_t = SaveModeArg::Deferred)]
    pub save_mode: SaveModeArg,

    /// Capture from every discovered camera, one subdirectory per camera id.
    #[arg(long = "all-cameras", action = clap::ArgAction::SetTrue, conflicts_with = "camera")]
    pub all_cameras: bool,

    /// Capture from this camera id instead of the first one discovered.
    #[arg(long = "camera", value_name = "ID")]
    pub camera: Option<String>,

    /// JPEG quality (1-100).
    #[arg(long = "quality", value_name = "QUALITY", default_value_t = 90)]
    pub quality: u8,

    /// Number of virtual cameras attached to the built-in SDK backend.
    #[arg(long = "virtual-cameras", value_name = "N", default_value_t = 1)]
    pub virtual_cameras: usize,

    /// Frame size of the virtual cameras.
    #[arg(long = "sensor", value_name = "WxH", default_value = "640x480")]
    pub sensor: SensorSize,
}

impl TryFrom<CliArgs> for CaptureConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self> {
        let interval = Duration::try_from_secs_f64(args.frequency)
            .with_context(|| format!("invalid --frequency {}", args.frequency))?;
        if args.timeout_ms == 0 {
            bail!("--timeout-ms must be at least 1");
        }
        if !(1..=100).contains(&args.quality) {
            bail!("--quality must be an integer between 1 and 100");
        }

        let pixel_format = args
            .pixel_format
            .parse::<PixelFormat>()
            .with_context(|| format!("invalid --pixel-format '{}'", args.pixel_format))?;

        let selection = match (args.all_cameras, args.camera) {
            (true, _) => CameraSelection::All,
            (false, Some(id)) => CameraSelection::Id(CameraId::new(id)),
            (false, None) => CameraSelection::First,
        };

        let camera = CameraSettings {
            exposure: args.exposure,
            gamma: args.gamma,
            black_level: args.black,
            pixel_format,
            acquisition_mode: args.acquisition_mode,
            white_balance: args.white_balance,
            edge_filter: args.edge_filter,
        };

        Ok(CaptureConfig::builder()
            .camera(camera)
            .count(CaptureCount::from_requested(args.img_num))
            .interval(interval)
            .frame_timeout(Duration::from_millis(args.timeout_ms))
            .save_mode(args.save_mode.into())
            .selection(selection)
            .directory(args.directory)
            .prefix(args.prefix)
            .jpeg_quality(args.quality)
            .build())
    }
}
