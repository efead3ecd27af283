//! Parsed TIFF file structure

use std::fmt;

use crate::io::byte_order::ByteOrder;
use crate::tiff::ifd::IFD;

/// A TIFF file as a chain of Image File Directories
#[derive(Debug)]
pub struct TIFF {
    /// Image File Directories in file order
    pub ifds: Vec<IFD>,
    /// Whether this is a BigTIFF file
    pub is_big_tiff: bool,
    /// Byte order declared in the header
    pub byte_order: ByteOrder,
}

impl TIFF {
    /// Creates an empty TIFF structure
    pub fn new(is_big_tiff: bool, byte_order: ByteOrder) -> Self {
        TIFF {
            ifds: Vec::new(),
            is_big_tiff,
            byte_order,
        }
    }

    /// The main (first) IFD
    pub fn main_ifd(&self) -> Option<&IFD> {
        self.ifds.first()
    }

    /// Number of IFDs in the chain
    pub fn ifd_count(&self) -> usize {
        self.ifds.len()
    }

    /// IFDs flagged as reduced-resolution subfiles
    pub fn overviews(&self) -> Vec<&IFD> {
        self.ifds.iter()
            .skip(1)
            .filter(|ifd| ifd.is_reduced_resolution())
            .collect()
    }

    /// Resolution levels of the pyramid, highest resolution first
    ///
    /// Level 0 is the main IFD; every later reduced-resolution IFD is one
    /// more level. Other pages (labels, masks, extra planes) are skipped.
    pub fn pyramid_levels(&self) -> Vec<&IFD> {
        let mut levels: Vec<&IFD> = self.main_ifd().into_iter().collect();
        levels.extend(self.overviews());
        levels
    }
}

impl fmt::Display for TIFF {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TIFF File:")?;
        writeln!(f, "  Format: {}", if self.is_big_tiff { "BigTIFF" } else { "TIFF" })?;
        writeln!(f, "  Byte order: {}", self.byte_order.name())?;
        writeln!(f, "  Number of IFDs: {}", self.ifds.len())?;
        writeln!(f, "  Resolution levels: {}", self.pyramid_levels().len())
    }
}
