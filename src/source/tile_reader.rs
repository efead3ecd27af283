//! Tile-based level reading
//!
//! Tiled TIFFs organize image data in rectangular tiles of equal size,
//! which lets a window read only the tiles it overlaps. Edge tiles are
//! stored at full size and padded.

use log::{debug, warn};

use crate::errors::{CropError, CropResult};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::tags;
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use super::image_source::{AxisExtents, WindowRequest};
use super::level_reader::{Chunk, LevelReader, SampleLayout};
use super::volume::Volume;

/// Reads windows from one tiled level
pub struct TileReader {
    layout: SampleLayout,
    tile_width: u64,
    tile_height: u64,
    tile_offsets: Vec<u64>,
    tile_byte_counts: Vec<u64>,
}

impl TileReader {
    /// Create a tile reader for `ifd`
    ///
    /// # Arguments
    /// * `tiff_reader` - Reader that parsed the IFD chain
    /// * `reader` - Seekable reader over the same file
    /// * `ifd` - IFD of the level
    pub fn new(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> CropResult<Self> {
        let layout = SampleLayout::from_ifd(tiff_reader, reader, ifd)?;

        let tile_width = ifd.get_tag_value(tags::TILE_WIDTH).unwrap_or(0);
        let tile_height = ifd.get_tag_value(tags::TILE_LENGTH).unwrap_or(0);
        if tile_width == 0 || tile_height == 0 {
            return Err(CropError::UnsupportedSource(format!(
                "IFD #{} has invalid tile size {}x{}", ifd.number, tile_width, tile_height
            )));
        }

        let tile_offsets = tiff_reader.read_tag_values(reader, ifd, tags::TILE_OFFSETS)?;
        let tile_byte_counts = tiff_reader.read_tag_values(reader, ifd, tags::TILE_BYTE_COUNTS)?;
        if tile_offsets.len() != tile_byte_counts.len() {
            return Err(CropError::UnsupportedSource(format!(
                "IFD #{} has {} tile offsets but {} byte counts",
                ifd.number, tile_offsets.len(), tile_byte_counts.len()
            )));
        }

        debug!("IFD #{}: {}x{} in {} tiles of {}x{}",
               ifd.number, layout.width, layout.height, tile_offsets.len(), tile_width, tile_height);

        Ok(TileReader {
            layout,
            tile_width,
            tile_height,
            tile_offsets,
            tile_byte_counts,
        })
    }

    fn tiles_across(&self) -> u64 {
        self.layout.width.div_ceil(self.tile_width)
    }

    fn tiles_per_plane(&self) -> u64 {
        self.tiles_across() * self.layout.height.div_ceil(self.tile_height)
    }
}

impl LevelReader for TileReader {
    fn extents(&self) -> AxisExtents {
        self.layout.extents()
    }

    fn read_window(&self, reader: &mut dyn SeekableReader, request: &WindowRequest) -> CropResult<Volume> {
        let mut volume = Volume::zeros(request.shape());
        if volume.is_empty() {
            return Ok(volume);
        }

        let tile_cols = request.x.start / self.tile_width..request.x.end.div_ceil(self.tile_width);
        let tile_rows = request.y.start / self.tile_height..request.y.end.div_ceil(self.tile_height);
        let samples = self.layout.samples_per_chunk_pixel();

        for plane in self.layout.planes_for(request) {
            for tile_row in tile_rows.clone() {
                for tile_col in tile_cols.clone() {
                    let index = (plane * self.tiles_per_plane() + tile_row * self.tiles_across() + tile_col) as usize;
                    let (offset, byte_count) = match (self.tile_offsets.get(index), self.tile_byte_counts.get(index)) {
                        (Some(&offset), Some(&count)) => (offset, count),
                        _ => {
                            warn!("Tile index {} out of bounds (have {})", index, self.tile_offsets.len());
                            continue;
                        }
                    };

                    debug!("Reading tile {} ({}, {}) at offset {}", index, tile_col, tile_row, offset);
                    let Some(data) = self.layout.read_chunk(reader, offset, byte_count, self.tile_width, self.tile_height)? else {
                        continue;
                    };

                    Chunk {
                        data: &data,
                        x0: tile_col * self.tile_width,
                        y0: tile_row * self.tile_height,
                        row_pixels: self.tile_width,
                        rows: self.tile_height,
                        samples,
                        first_channel: if self.layout.planar { plane } else { 0 },
                    }
                    .copy_into(request, &mut volume);
                }
            }
        }

        Ok(volume)
    }
}
