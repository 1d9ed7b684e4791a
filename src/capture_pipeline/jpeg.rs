//! JPEG writing module
//!
//! This module turns captured images into JPEG files using the image crate.

mod writer;
mod standard_jpeg_writer;

pub use writer::ImageWriter;
pub use standard_jpeg_writer::{DEFAULT_JPEG_QUALITY, StandardJpegWriter};
