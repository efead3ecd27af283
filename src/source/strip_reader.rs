//! Strip-based level reading
//!
//! Stripped TIFFs organize image data in horizontal strips across the
//! entire width of the image. A window only needs the strips whose rows
//! it overlaps.

use log::{debug, warn};

use crate::errors::{CropError, CropResult};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::tags;
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use super::image_source::{AxisExtents, WindowRequest};
use super::level_reader::{Chunk, LevelReader, SampleLayout};
use super::volume::Volume;

/// Reads windows from one stripped level
pub struct StripReader {
    layout: SampleLayout,
    rows_per_strip: u64,
    strip_offsets: Vec<u64>,
    strip_byte_counts: Vec<u64>,
}

impl StripReader {
    /// Create a strip reader for `ifd`
    ///
    /// # Arguments
    /// * `tiff_reader` - Reader that parsed the IFD chain
    /// * `reader` - Seekable reader over the same file
    /// * `ifd` - IFD of the level
    pub fn new(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> CropResult<Self> {
        let layout = SampleLayout::from_ifd(tiff_reader, reader, ifd)?;

        // Missing RowsPerStrip means one strip for the whole image
        let rows_per_strip = ifd.get_tag_value(tags::ROWS_PER_STRIP)
            .unwrap_or(layout.height)
            .clamp(1, layout.height.max(1));

        let strip_offsets = tiff_reader.read_tag_values(reader, ifd, tags::STRIP_OFFSETS)?;
        let strip_byte_counts = tiff_reader.read_tag_values(reader, ifd, tags::STRIP_BYTE_COUNTS)?;
        if strip_offsets.len() != strip_byte_counts.len() {
            return Err(CropError::UnsupportedSource(format!(
                "IFD #{} has {} strip offsets but {} byte counts",
                ifd.number, strip_offsets.len(), strip_byte_counts.len()
            )));
        }

        debug!("IFD #{}: {}x{} in {} strips of {} rows",
               ifd.number, layout.width, layout.height, strip_offsets.len(), rows_per_strip);

        Ok(StripReader {
            layout,
            rows_per_strip,
            strip_offsets,
            strip_byte_counts,
        })
    }

    fn strips_per_plane(&self) -> u64 {
        self.layout.height.div_ceil(self.rows_per_strip)
    }
}

impl LevelReader for StripReader {
    fn extents(&self) -> AxisExtents {
        self.layout.extents()
    }

    fn read_window(&self, reader: &mut dyn SeekableReader, request: &WindowRequest) -> CropResult<Volume> {
        let mut volume = Volume::zeros(request.shape());
        if volume.is_empty() {
            return Ok(volume);
        }

        let first_strip = request.y.start / self.rows_per_strip;
        let end_strip = request.y.end.div_ceil(self.rows_per_strip);
        let samples = self.layout.samples_per_chunk_pixel();

        for plane in self.layout.planes_for(request) {
            for strip in first_strip..end_strip {
                let index = (plane * self.strips_per_plane() + strip) as usize;
                let (offset, byte_count) = match (self.strip_offsets.get(index), self.strip_byte_counts.get(index)) {
                    (Some(&offset), Some(&count)) => (offset, count),
                    _ => {
                        warn!("Strip index {} out of bounds (have {})", index, self.strip_offsets.len());
                        continue;
                    }
                };

                let y0 = strip * self.rows_per_strip;
                let rows = self.rows_per_strip.min(self.layout.height - y0);
                debug!("Reading strip {} at offset {} with {} bytes", index, offset, byte_count);

                let Some(data) = self.layout.read_chunk(reader, offset, byte_count, self.layout.width, rows)? else {
                    continue;
                };

                Chunk {
                    data: &data,
                    x0: 0,
                    y0,
                    row_pixels: self.layout.width,
                    rows,
                    samples,
                    first_channel: if self.layout.planar { plane } else { 0 },
                }
                .copy_into(request, &mut volume);
            }
        }

        Ok(volume)
    }
}
