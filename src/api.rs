//! Library facade
//!
//! Wires the TIFF source, the multi-page TIFF container and a scheduler
//! together so callers do not have to assemble an orchestrator by hand.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use crate::crop::{CropOptions, CropOrchestrator, CropReport, DispatchMode};
use crate::errors::CropResult;
use crate::output::{ChannelPolicy, TiffContainerFactory, TiffWriterOptions};
use crate::segmentation::ImageSegmentation;
use crate::source::{ImageSource, TiffImageSource, TiffSourceFactory};

/// Main interface to the slidecrop library
#[derive(Debug, Clone, Copy, Default)]
pub struct SlideCrop {
    dispatch: DispatchMode,
    channel_policy: ChannelPolicy,
    writer_options: TiffWriterOptions,
}

impl SlideCrop {
    /// Create an instance with serialized dispatch, strict channels and
    /// uncompressed classic TIFF output
    pub fn new() -> Self {
        SlideCrop::default()
    }

    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_channel_policy(mut self, channel_policy: ChannelPolicy) -> Self {
        self.channel_policy = channel_policy;
        self
    }

    pub fn with_writer_options(mut self, writer_options: TiffWriterOptions) -> Self {
        self.writer_options = writer_options;
        self
    }

    /// Crop every box of `segmentation` out of the TIFF at `input`
    ///
    /// # Arguments
    /// * `input` - Pyramid TIFF or BigTIFF
    /// * `segmentation` - Boxes in the reference space
    /// * `output_root` - Existing directory receiving `<image>/ind<i>/`
    pub fn crop(&self, input: &Path, segmentation: &ImageSegmentation, output_root: &Path) -> CropResult<CropReport> {
        CropOrchestrator::new(
            Arc::new(TiffSourceFactory),
            Arc::new(TiffContainerFactory::new(self.writer_options)),
            self.dispatch.scheduler(),
        )
        .with_options(CropOptions {
            channel_policy: self.channel_policy,
            show_progress: false,
        })
        .crop(input, segmentation, output_root)
    }

    /// Describe the resolution levels of the image at `input`
    pub fn describe_levels(&self, input: &Path) -> CropResult<String> {
        let source = TiffImageSource::open(input)?;

        let mut result = format!("{}: {} resolution levels\n", source.base_name(), source.resolution_level_count());
        for level in 0..source.resolution_level_count() {
            let _ = writeln!(result, "  Level {}: {}", level, source.axis_extents(level)?);
        }

        Ok(result)
    }
}
