//! Rectangular segments and their mapping onto resolution levels
//!
//! This module holds the segment model: individual boxes, the validated
//! store they live in, and the mapper that rescales them for each level
//! of a multi-resolution image.

mod segment;
mod image_segmentation;
mod mapper;

pub use segment::Segment;
pub use image_segmentation::ImageSegmentation;
pub use mapper::{PixelWindow, ResolutionMapper};
