//! Output path construction
//!
//! Every path the pipeline writes to is built here:
//! `<output_root>/<image_name>/ind<box_index>/<image_name>_full.<ext>`.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::errors::{CropError, CropResult};

/// Directory layout of one crop run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    output_root: PathBuf,
    image_name: String,
}

impl OutputLayout {
    /// Layout for the image `image_name` under `output_root`
    pub fn new(output_root: impl Into<PathBuf>, image_name: impl Into<String>) -> Self {
        OutputLayout {
            output_root: output_root.into(),
            image_name: image_name.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    /// `<output_root>/<image_name>`
    pub fn image_dir(&self) -> PathBuf {
        self.output_root.join(&self.image_name)
    }

    /// `<output_root>/<image_name>/ind<box_index>`
    pub fn box_dir(&self, box_index: usize) -> PathBuf {
        self.image_dir().join(format!("ind{}", box_index))
    }

    /// Container holding every level of one box
    pub fn container_path(&self, box_index: usize, extension: &str) -> PathBuf {
        self.box_dir(box_index).join(format!("{}_full.{}", self.image_name, extension))
    }

    /// Fails with `OutputRootMissing` unless the root is an existing directory
    pub fn check_output_root(&self) -> CropResult<()> {
        if self.output_root.is_dir() {
            Ok(())
        } else {
            Err(CropError::OutputRootMissing(self.output_root.clone()))
        }
    }

    /// Create the image directory; existing directories are fine
    pub fn create_image_dir(&self) -> CropResult<PathBuf> {
        let dir = self.image_dir();
        fs::create_dir_all(&dir)?;
        debug!("Image directory {}", dir.display());
        Ok(dir)
    }

    /// Create the directory of one box; existing directories are fine
    pub fn create_box_dir(&self, box_index: usize) -> CropResult<PathBuf> {
        let dir = self.box_dir(box_index);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn builds_box_paths() {
        let layout = OutputLayout::new("/out", "slide");
        assert_eq!(layout.image_dir(), PathBuf::from("/out/slide"));
        assert_eq!(layout.box_dir(2), PathBuf::from("/out/slide/ind2"));
        assert_eq!(layout.container_path(2, "tiff"), PathBuf::from("/out/slide/ind2/slide_full.tiff"));
    }

    #[test]
    fn output_root_must_exist() {
        let dir = tempdir().unwrap();
        assert!(OutputLayout::new(dir.path(), "a").check_output_root().is_ok());

        let missing = OutputLayout::new(dir.path().join("missing"), "a");
        assert!(matches!(missing.check_output_root(), Err(CropError::OutputRootMissing(_))));
    }

    #[test]
    fn directories_are_created_idempotently() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), "slide");
        layout.create_box_dir(0).unwrap();
        layout.create_box_dir(0).unwrap();
        layout.create_image_dir().unwrap();
        assert!(dir.path().join("slide/ind0").is_dir());
    }
}
