//! Multi-resolution image sources
//!
//! `ImageSource` is the interface the crop pipeline reads through;
//! `TiffImageSource` implements it for pyramidal TIFF files.

pub mod image_source;
pub mod volume;
pub mod level_reader;
pub mod strip_reader;
pub mod tile_reader;
pub mod tiff_source;
pub mod factory;

pub use image_source::{AxisExtents, ImageSource, WindowRequest};
pub use volume::{Plane, Volume};
pub use tiff_source::TiffImageSource;
pub use factory::{ImageSourceFactory, TiffSourceFactory};
