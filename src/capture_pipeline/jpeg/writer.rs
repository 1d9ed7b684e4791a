use std::io::Write;

use crate::capture_pipeline::common::error::Result;
use crate::capture_pipeline::frame::Image;

pub trait ImageWriter {
    fn write_jpeg(&self, image: &Image, output: &mut dyn Write) -> Result<()>;
}

impl<T: ImageWriter + ?Sized> ImageWriter for &T {
    fn write_jpeg(&self, image: &Image, output: &mut dyn Write) -> Result<()> {
        (**self).write_jpeg(image, output)
    }
}
