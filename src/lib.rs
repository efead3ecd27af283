pub mod errors;
pub mod io;
pub mod tiff;
pub mod compression;
pub mod segmentation;
pub mod source;
pub mod output;
pub mod crop;
pub mod config;
pub mod utils;
pub mod commands;
pub mod api;

pub use crate::api::SlideCrop;

pub use errors::{CropError, CropResult};
pub use tiff::TiffReader;
pub use segmentation::{ImageSegmentation, ResolutionMapper, Segment};
pub use source::{ImageSource, TiffImageSource};
pub use output::{ChannelPolicy, MultiPageTiffWriter, TiffWriterOptions};
pub use crop::{CropOrchestrator, CropReport, DispatchMode};
