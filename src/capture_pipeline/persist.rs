//! Output persistence module
//!
//! Encodes captured images and places them under the output directory.

mod image_saver;
pub mod types;

pub use image_saver::ImageSaver;
pub use types::{OutputLayout, SavedFile};
