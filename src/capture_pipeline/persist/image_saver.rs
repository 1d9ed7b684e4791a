use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::capture_pipeline::common::error::{CaptureError, Result};
use crate::capture_pipeline::jpeg::ImageWriter;
use crate::capture_pipeline::persist::types::{OutputLayout, SavedFile};
use crate::capture_pipeline::sdk::types::CameraId;
use crate::capture_pipeline::session::CapturedImage;

pub struct ImageSaver<W: ImageWriter> {
    writer: W,
    directory: PathBuf,
    prefix: String,
    layout: OutputLayout,
}

impl<W: ImageWriter> ImageSaver<W> {
    pub fn new(writer: W, directory: impl Into<PathBuf>, prefix: impl Into<String>, layout: OutputLayout) -> Self {
        Self {
            writer,
            directory: directory.into(),
            prefix: prefix.into(),
            layout,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn layout(&self) -> OutputLayout {
        self.layout
    }

    pub fn camera_dir(&self, camera: &CameraId) -> PathBuf {
        match self.layout {
            OutputLayout::Flat => self.directory.clone(),
            OutputLayout::PerCamera => self.directory.join(camera.dir_name()),
        }
    }

    pub fn path_for(&self, camera: &CameraId, index: usize) -> PathBuf {
        self.camera_dir(camera)
            .join(format!("{}{}.jpg", self.prefix, index))
    }

    /// Encodes one image, creating the file's parent directory if needed.
    pub fn save(&self, camera: &CameraId, captured: &CapturedImage) -> Result<SavedFile> {
        let path = self.path_for(camera, captured.index);
        let dir = path.parent().map_or_else(|| self.camera_dir(camera), Path::to_path_buf);
        fs::create_dir_all(&dir).map_err(|e| {
            CaptureError::OutputWriteError(format!("{}: {}", dir.display(), e))
        })?;

        let file = File::create(&path).map_err(|e| {
            CaptureError::OutputWriteError(format!("{}: {}", path.display(), e))
        })?;
        let mut output = BufWriter::new(file);
        self.writer.write_jpeg(&captured.image, &mut output)?;
        output.flush()?;

        debug!(camera = %camera, path = %path.display(), "Saved image");
        Ok(SavedFile {
            camera: camera.clone(),
            index: captured.index,
            path,
        })
    }

    /// Saves a camera's retained images in capture order.
    #[instrument(skip(self, camera, images), fields(camera = %camera, count = images.len()))]
    pub fn save_batch(&self, camera: &CameraId, images: &[CapturedImage]) -> Result<Vec<SavedFile>> {
        info!("Saving images. This could take a while...");

        let saved = images
            .iter()
            .map(|captured| self.save(camera, captured))
            .collect::<Result<Vec<_>>>()?;

        info!("Saving finished");
        Ok(saved)
    }
}
