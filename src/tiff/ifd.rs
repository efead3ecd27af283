//! Image File Directory (IFD) structures
//!
//! Every page of a TIFF, and every level of a TIFF pyramid, is described by
//! one IFD: a list of tag entries holding dimensions, sample layout,
//! compression and the locations of the pixel data.

use std::collections::HashMap;
use std::fmt;

use log::trace;

use crate::tiff::constants::{compression, new_subfile_type, planar_config, predictor, tags};
use crate::tiff::tag_names;

/// Represents an Image File Directory (IFD) in a TIFF file
#[derive(Debug, Clone)]
pub struct IFD {
    /// Entries in this IFD, in file order
    pub entries: Vec<IFDEntry>,
    /// IFD number in the chain (0-based)
    pub number: usize,
    /// Offset to this IFD in the file
    pub offset: u64,
    /// Tag lookup
    tag_map: HashMap<u16, usize>,
}

/// One tag of an IFD
///
/// When the values fit into the entry itself they are decoded while the
/// IFD is read and kept in `inline_values`; `value_offset` then holds the
/// first value. Otherwise `value_offset` points at the external values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IFDEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type
    pub field_type: u16,
    /// Number of values
    pub count: u64,
    /// First value for inline entries, offset to the values otherwise
    pub value_offset: u64,
    /// Decoded values when stored inline
    pub inline_values: Option<Vec<u64>>,
}

impl IFDEntry {
    /// Creates an entry whose value (or offset) is `value_offset`
    pub fn new(tag: u16, field_type: u16, count: u64, value_offset: u64) -> Self {
        IFDEntry {
            tag,
            field_type,
            count,
            value_offset,
            inline_values: None,
        }
    }

    /// Creates an entry whose values were stored inline
    pub fn with_inline_values(tag: u16, field_type: u16, count: u64, values: Vec<u64>) -> Self {
        IFDEntry {
            tag,
            field_type,
            count,
            value_offset: values.first().copied().unwrap_or(0),
            inline_values: Some(values),
        }
    }

    /// Size in bytes of a single value of this entry's field type
    pub fn field_type_size(&self) -> u64 {
        tag_names::field_type_size(self.field_type)
    }

    /// Whether the values fit inside the entry itself
    pub fn is_value_inline(&self, is_big_tiff: bool) -> bool {
        let inline_size = if is_big_tiff { 8 } else { 4 };
        // Counts come from the file; an overflowing size is never inline
        self.field_type_size()
            .checked_mul(self.count)
            .map_or(false, |size| size <= inline_size)
    }

    /// Human-readable description of this entry
    pub fn description(&self) -> String {
        format!("{} ({}): {} x {} = {}",
                self.tag,
                tag_names::tag_name(self.tag),
                self.count,
                tag_names::field_type_name(self.field_type),
                self.value_offset)
    }
}

impl IFD {
    /// Creates an empty IFD
    pub fn new(number: usize, offset: u64) -> Self {
        IFD {
            entries: Vec::new(),
            number,
            offset,
            tag_map: HashMap::new(),
        }
    }

    /// Adds an entry, replacing the lookup for a repeated tag
    pub fn add_entry(&mut self, entry: IFDEntry) {
        trace!("IFD #{}: {}", self.number, entry.description());
        self.tag_map.insert(entry.tag, self.entries.len());
        self.entries.push(entry);
    }

    /// Gets an IFD entry by tag
    pub fn get_entry(&self, tag: u16) -> Option<&IFDEntry> {
        self.tag_map.get(&tag).map(|&i| &self.entries[i])
    }

    /// Gets a tag's first value (or offset for external values)
    pub fn get_tag_value(&self, tag: u16) -> Option<u64> {
        self.get_entry(tag).map(|entry| entry.value_offset)
    }

    /// Checks if this IFD has a specific tag
    pub fn has_tag(&self, tag: u16) -> bool {
        self.tag_map.contains_key(&tag)
    }

    /// Width and height of the image, if both tags are present
    pub fn get_dimensions(&self) -> Option<(u64, u64)> {
        let width = self.get_tag_value(tags::IMAGE_WIDTH)?;
        let height = self.get_tag_value(tags::IMAGE_LENGTH)?;
        Some((width, height))
    }

    /// Samples per pixel (default 1)
    pub fn get_samples_per_pixel(&self) -> u64 {
        self.get_tag_value(tags::SAMPLES_PER_PIXEL).unwrap_or(1)
    }

    /// Compression code (default none)
    pub fn compression(&self) -> u64 {
        self.get_tag_value(tags::COMPRESSION).unwrap_or(compression::NONE)
    }

    /// Predictor code (default none)
    pub fn predictor(&self) -> u64 {
        self.get_tag_value(tags::PREDICTOR).unwrap_or(predictor::NONE)
    }

    /// Planar configuration (default chunky)
    pub fn planar_configuration(&self) -> u64 {
        self.get_tag_value(tags::PLANAR_CONFIGURATION).unwrap_or(planar_config::CHUNKY)
    }

    /// Whether pixel data is organised in tiles rather than strips
    pub fn is_tiled(&self) -> bool {
        self.has_tag(tags::TILE_WIDTH) && self.has_tag(tags::TILE_LENGTH)
    }

    /// Whether this IFD is flagged as a reduced-resolution copy of another
    pub fn is_reduced_resolution(&self) -> bool {
        self.get_tag_value(tags::NEW_SUBFILE_TYPE)
            .map(|flags| flags & new_subfile_type::REDUCED_RESOLUTION != 0)
            .unwrap_or(false)
    }
}

impl fmt::Display for IFD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;

        if let Some((width, height)) = self.get_dimensions() {
            writeln!(f, "  Dimensions: {}x{}", width, height)?;
        }

        writeln!(f, "  Samples per pixel: {}", self.get_samples_per_pixel())?;
        writeln!(f, "  Compression: {} ({})",
                 self.compression(), tag_names::compression_name(self.compression()))?;
        writeln!(f, "  Layout: {}", if self.is_tiled() { "tiled" } else { "stripped" })?;

        for entry in &self.entries {
            writeln!(f, "    {}", entry.description())?;
        }

        Ok(())
    }
}
