//! Output container interface
//!
//! A container is opened once per box and receives one frame per
//! resolution level. Closing happens in `finish` or, on early exit, when
//! the container is dropped.

use std::path::Path;

use image::RgbImage;

use crate::errors::CropResult;

/// A multi-page image that frames are appended to
pub trait OutputContainer: Send {
    /// Append one RGB frame as the next page
    fn append_frame(&mut self, frame: &RgbImage) -> CropResult<()>;

    /// Number of frames appended so far
    fn frame_count(&self) -> usize;

    /// Flush and close the container
    fn finish(self: Box<Self>) -> CropResult<()>;
}

/// Creates containers at a given path
pub trait ContainerFactory: Send + Sync {
    fn create(&self, path: &Path) -> CropResult<Box<dyn OutputContainer>>;

    /// File extension of the containers this factory creates
    fn extension(&self) -> &'static str;
}
