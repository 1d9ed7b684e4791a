//! Output naming types

use std::collections::HashMap;
use std::path::PathBuf;

use crate::capture_pipeline::common::error::{CaptureError, Result};
use crate::capture_pipeline::sdk::types::CameraId;

/// Where each camera's files go below the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputLayout {
    /// `{directory}/{prefix}{index}.jpg`
    #[default]
    Flat,
    /// `{directory}/{camera_id}/{prefix}{index}.jpg`
    PerCamera,
}

impl OutputLayout {
    /// Checks that every camera gets its own directory below the output root.
    ///
    /// In the per-camera layout, ids whose directory names collide, or that
    /// would resolve to the output root or its parent, are rejected.
    pub fn check_cameras(self, cameras: &[CameraId]) -> Result<()> {
        if self == OutputLayout::Flat {
            return Ok(());
        }

        let mut seen: HashMap<String, &CameraId> = HashMap::new();
        for camera in cameras {
            let dir = camera.dir_name();
            if matches!(dir.as_str(), "" | "." | "..") {
                return Err(CaptureError::InvalidConfig(format!(
                    "camera id '{camera}' cannot be used as a directory name"
                )));
            }
            if let Some(other) = seen.insert(dir.clone(), camera) {
                return Err(CaptureError::InvalidConfig(format!(
                    "cameras '{other}' and '{camera}' would both write to '{dir}'"
                )));
            }
        }
        Ok(())
    }
}

/// A JPEG written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub camera: CameraId,
    pub index: usize,
    pub path: PathBuf,
}
