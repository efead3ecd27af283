//! Openers handed to execution units
//!
//! Every unit opens the image on its own, so the orchestrator receives a
//! factory rather than an open source.

use std::path::Path;

use crate::errors::{CropError, CropResult};
use super::image_source::ImageSource;
use super::tiff_source::TiffImageSource;

/// Opens a fresh image source for a path
pub trait ImageSourceFactory: Send + Sync {
    fn open(&self, path: &Path) -> CropResult<Box<dyn ImageSource>>;
}

/// Factory for `.tif` / `.tiff` pyramids
#[derive(Debug, Default, Clone, Copy)]
pub struct TiffSourceFactory;

impl TiffSourceFactory {
    /// Whether `path` has a TIFF extension
    pub fn supports(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "tif" | "tiff" | "btf" | "tf8"))
            .unwrap_or(false)
    }
}

impl ImageSourceFactory for TiffSourceFactory {
    fn open(&self, path: &Path) -> CropResult<Box<dyn ImageSource>> {
        if !Self::supports(path) {
            return Err(CropError::UnsupportedSource(format!(
                "{} is not a TIFF file", path.display()
            )));
        }

        Ok(Box::new(TiffImageSource::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_tiff_extensions() {
        assert!(TiffSourceFactory::supports(Path::new("a/slide.TIFF")));
        assert!(TiffSourceFactory::supports(Path::new("slide.tif")));
        assert!(!TiffSourceFactory::supports(Path::new("slide.svs")));
        assert!(!TiffSourceFactory::supports(Path::new("slide")));
    }

    #[test]
    fn rejects_other_formats_before_opening() {
        let result = TiffSourceFactory.open(Path::new("slide.png"));
        assert!(matches!(result, Err(CropError::UnsupportedSource(_))));
    }
}
