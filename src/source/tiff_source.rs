//! Pyramidal TIFF image source
//!
//! Level 0 is the first IFD of the file; every later IFD flagged as a
//! reduced-resolution subfile is one more level, in file order. Each
//! level is read through a strip or tile reader depending on its layout.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::errors::{CropError, CropResult};
use crate::tiff::reader::TiffReader;
use super::image_source::{AxisExtents, ImageSource, WindowRequest};
use super::level_reader::LevelReader;
use super::strip_reader::StripReader;
use super::tile_reader::TileReader;
use super::volume::Volume;

/// A multi-resolution TIFF or BigTIFF opened for windowed reads
pub struct TiffImageSource {
    path: PathBuf,
    reader: BufReader<File>,
    levels: Vec<Box<dyn LevelReader>>,
}

impl TiffImageSource {
    /// Opens `path` and prepares a reader for every pyramid level
    pub fn open(path: impl AsRef<Path>) -> CropResult<Self> {
        let path = path.as_ref();
        let mut tiff_reader = TiffReader::new();
        let tiff = tiff_reader.load(path)?;

        let mut reader = BufReader::with_capacity(1024 * 1024, File::open(path)?);
        let mut levels: Vec<Box<dyn LevelReader>> = Vec::new();

        for ifd in tiff.pyramid_levels() {
            let level: Box<dyn LevelReader> = if ifd.is_tiled() {
                Box::new(TileReader::new(&tiff_reader, &mut reader, ifd)?)
            } else {
                Box::new(StripReader::new(&tiff_reader, &mut reader, ifd)?)
            };
            debug!("Level {}: {}", levels.len(), level.extents());
            levels.push(level);
        }

        if levels.is_empty() {
            return Err(CropError::UnsupportedSource(format!(
                "{} contains no images", path.display()
            )));
        }

        info!("Opened {} with {} resolution levels", path.display(), levels.len());

        Ok(TiffImageSource {
            path: path.to_path_buf(),
            reader,
            levels,
        })
    }

    /// Path the source was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn level(&self, level: usize) -> CropResult<&dyn LevelReader> {
        self.levels.get(level)
            .map(|l| l.as_ref())
            .ok_or_else(|| CropError::WindowOutOfBounds(format!(
                "resolution level {} of {}", level, self.levels.len()
            )))
    }
}

impl ImageSource for TiffImageSource {
    fn resolution_level_count(&self) -> usize {
        self.levels.len()
    }

    fn axis_extents(&self, level: usize) -> CropResult<AxisExtents> {
        Ok(self.level(level)?.extents())
    }

    fn read_window(&mut self, level: usize, request: &WindowRequest) -> CropResult<Volume> {
        let level_reader = self.levels.get(level)
            .ok_or_else(|| CropError::WindowOutOfBounds(format!(
                "resolution level {} of {}", level, self.levels.len()
            )))?;
        request.validate(&level_reader.extents())?;

        debug!("Reading level {} window {}", level, request);
        level_reader.read_window(&mut self.reader, request)
    }

    fn base_name(&self) -> String {
        base_name_of(&self.path)
    }
}

/// File name without directory and final extension
pub fn base_name_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_strips_directory_and_extension() {
        assert_eq!(base_name_of(Path::new("/data/slides/sample.tiff")), "sample");
        assert_eq!(base_name_of(Path::new("scan.ome.tif")), "scan.ome");
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(TiffImageSource::open("/definitely/not/here.tiff").is_err());
    }
}
