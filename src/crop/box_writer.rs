//! Cropping of one box across every resolution level
//!
//! For each level the box is mapped afresh from the reference space,
//! the matching window is read, and the single z/t plane is appended as a
//! frame to the box's container. A frame that cannot be converted or
//! appended is logged and skipped; a failed read ends the box.

use std::path::PathBuf;

use log::{debug, error, info};

use crate::errors::{CropError, CropResult};
use crate::output::{ChannelPolicy, ContainerFactory, OutputContainer};
use crate::segmentation::{ImageSegmentation, ResolutionMapper};
use crate::source::{ImageSource, Volume};
use super::layout::OutputLayout;

/// Result of writing one box
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxWriteSummary {
    pub box_index: usize,
    /// Levels appended to the container
    pub frames_written: usize,
    /// Levels skipped after a conversion or append failure
    pub frames_failed: usize,
    pub container_path: PathBuf,
}

/// Writes every resolution level of one box into one container
pub struct BoxCropWriter<'a> {
    source: &'a mut dyn ImageSource,
    segmentation: &'a ImageSegmentation,
    layout: &'a OutputLayout,
    containers: &'a dyn ContainerFactory,
    channel_policy: ChannelPolicy,
}

impl<'a> BoxCropWriter<'a> {
    /// Create a writer
    ///
    /// # Arguments
    /// * `source` - Image to crop, opened for this unit only
    /// * `segmentation` - Boxes in the reference space
    /// * `layout` - Output directory layout of the run
    /// * `containers` - Opens the per-box container
    pub fn new(
        source: &'a mut dyn ImageSource,
        segmentation: &'a ImageSegmentation,
        layout: &'a OutputLayout,
        containers: &'a dyn ContainerFactory,
    ) -> Self {
        BoxCropWriter {
            source,
            segmentation,
            layout,
            containers,
            channel_policy: ChannelPolicy::default(),
        }
    }

    pub fn with_channel_policy(mut self, channel_policy: ChannelPolicy) -> Self {
        self.channel_policy = channel_policy;
        self
    }

    /// Crop box `box_index` at every level of the source
    pub fn write_box(&mut self, box_index: usize) -> CropResult<BoxWriteSummary> {
        let segment = self.segmentation.get(box_index)?;
        info!("Cropping box {} {} from {}", box_index, segment, self.layout.image_name());

        self.layout.create_box_dir(box_index)?;
        let container_path = self.layout.container_path(box_index, self.containers.extension());
        let mut container = self.containers.create(&container_path)?;

        let mapper = ResolutionMapper::new(self.segmentation);
        let mut frames_failed = 0;

        for level in 0..self.source.resolution_level_count() {
            let dims = self.source.pixel_dimensions(level)?;
            let window = mapper.pixel_window(box_index, dims)?;
            let extents = self.source.axis_extents(level)?;
            let request = extents.full_request(window.x.clone(), window.y.clone());

            debug!("Box {} level {} ({}x{}): window {}", box_index, level, dims.0, dims.1, window);
            let volume = self.source.read_window(level, &request)?;

            if let Err(e) = self.append_level(container.as_mut(), level, &volume) {
                error!("Box {}: {}", box_index, e);
                frames_failed += 1;
            }
        }

        let frames_written = container.frame_count();
        container.finish()?;

        info!("Box {} done: {} frames written, {} failed", box_index, frames_written, frames_failed);

        Ok(BoxWriteSummary {
            box_index,
            frames_written,
            frames_failed,
            container_path,
        })
    }

    /// Convert the z=0, t=0 plane to RGB and append it
    fn append_level(
        &self,
        container: &mut dyn OutputContainer,
        level: usize,
        volume: &Volume,
    ) -> CropResult<()> {
        let frame_failure = |e: CropError| CropError::FrameEncodingFailure {
            level,
            reason: e.to_string(),
        };

        let plane = volume.plane(0, 0).map_err(frame_failure)?;
        let frame = self.channel_policy.to_rgb(&plane).map_err(frame_failure)?;
        container.append_frame(&frame).map_err(frame_failure)
    }
}
