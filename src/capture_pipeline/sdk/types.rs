//! Types shared between the pipeline and SDK backends

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::capture_pipeline::common::error::CaptureError;

/// Exposure time accepted by the device, in device time units (microseconds).
pub const EXPOSURE_RANGE: RangeInclusive<f64> = 26.0..=60_000_000.0;
/// Gamma values accepted by the device.
pub const GAMMA_RANGE: RangeInclusive<f64> = 0.45..=1.0;
/// Black level values accepted by the device.
pub const BLACK_LEVEL_RANGE: RangeInclusive<f64> = 0.0..=255.75;

/// Feature names written during configuration.
pub mod feature {
    pub const ACQUISITION_MODE: &str = "AcquisitionMode";
    pub const PIXEL_FORMAT: &str = "PixelFormat";
    pub const BALANCE_WHITE_AUTO: &str = "BalanceWhiteAuto";
    pub const EDGE_FILTER: &str = "EdgeFilter";
    pub const EXPOSURE_TIME_ABS: &str = "ExposureTimeAbs";
    pub const GAMMA: &str = "Gamma";
    pub const BLACK_LEVEL: &str = "BlackLevel";
}

/// Feature commands understood by [`CameraDriver::run_command`](super::CameraDriver::run_command).
pub mod command {
    pub const ACQUISITION_START: &str = "AcquisitionStart";
    pub const ACQUISITION_STOP: &str = "AcquisitionStop";
    pub const GEV_DISCOVERY_ALL_ONCE: &str = "GeVDiscoveryAllOnce";
}

/// Identifier reported by camera discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CameraId(String);

impl CameraId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory name for this camera's output, with path separators replaced.
    pub fn dir_name(&self) -> String {
        self.0
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect()
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CameraId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Dimensions of every frame a configured camera delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameShape {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

impl FrameShape {
    pub fn new(width: u32, height: u32, channels: u8) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    /// Number of bytes in one 8-bit-per-channel frame of this shape.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }
}

impl fmt::Display for FrameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}

/// Raw pixel encodings the pipeline knows how to turn into JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One 8-bit luminance channel
    Mono8,
    /// Packed R, G, B, 8 bits each
    Rgb8Packed,
    /// Packed B, G, R, 8 bits each
    Bgr8Packed,
}

impl PixelFormat {
    pub fn channels(self) -> u8 {
        match self {
            PixelFormat::Mono8 => 1,
            PixelFormat::Rgb8Packed | PixelFormat::Bgr8Packed => 3,
        }
    }

    /// Name used for the `PixelFormat` feature.
    pub fn as_str(self) -> &'static str {
        match self {
            PixelFormat::Mono8 => "Mono8",
            PixelFormat::Rgb8Packed => "RGB8Packed",
            PixelFormat::Bgr8Packed => "BGR8Packed",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PixelFormat {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Mono8" => Ok(PixelFormat::Mono8),
            "RGB8Packed" | "RGB8" => Ok(PixelFormat::Rgb8Packed),
            "BGR8Packed" | "BGR8" => Ok(PixelFormat::Bgr8Packed),
            other => Err(CaptureError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Value written to a camera feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Enum(String),
    Float(f64),
}

impl FeatureValue {
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            FeatureValue::Enum(value) => Some(value),
            FeatureValue::Float(_) => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FeatureValue::Float(value) => Some(*value),
            FeatureValue::Enum(_) => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Enum(value) => f.write_str(value),
            FeatureValue::Float(value) => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_format_parses_sdk_names() {
        assert_eq!("RGB8Packed".parse::<PixelFormat>().unwrap(), PixelFormat::Rgb8Packed);
        assert_eq!("Mono8".parse::<PixelFormat>().unwrap(), PixelFormat::Mono8);
        assert_eq!(PixelFormat::Bgr8Packed.channels(), 3);

        let err = "YUV422Packed".parse::<PixelFormat>().unwrap_err();
        assert!(matches!(err, CaptureError::UnsupportedFormat(name) if name == "YUV422Packed"));
    }

    #[test]
    fn frame_shape_byte_len() {
        let shape = FrameShape::new(640, 480, 3);
        assert_eq!(shape.byte_len(), 640 * 480 * 3);
        assert_eq!(shape.to_string(), "640x480x3");
    }

    #[test]
    fn camera_dir_name_strips_separators() {
        assert_eq!(CameraId::new("DEV_000F314C/1").dir_name(), "DEV_000F314C_1");
        assert_eq!(CameraId::new("DEV_1").dir_name(), "DEV_1");
    }
}
