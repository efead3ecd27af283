//! Shared machinery for reading one pyramid level of a TIFF
//!
//! A level stores its pixels in chunks, either full-width strips or
//! rectangular tiles. `StripReader` and `TileReader` know how the chunks
//! are laid out; the sample layout, decoding and copying into a window
//! volume are common to both and live here.

use std::io::{Read, Seek, SeekFrom};

use log::{debug, trace};

use crate::compression::{predictor as horizontal, CompressionFactory, CompressionHandler};
use crate::errors::{CropError, CropResult};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{planar_config, predictor, tags};
use crate::tiff::errors::TiffError;
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::tiff::validation;
use super::image_source::{AxisExtents, WindowRequest};
use super::volume::Volume;

/// Reads windows out of one resolution level
pub trait LevelReader: Send {
    /// Extents of the level along every axis
    fn extents(&self) -> AxisExtents;

    /// Read a validated window into a fresh volume
    fn read_window(&self, reader: &mut dyn SeekableReader, request: &WindowRequest) -> CropResult<Volume>;
}

/// How samples of a level are stored and encoded
pub struct SampleLayout {
    pub width: u64,
    pub height: u64,
    pub samples_per_pixel: u64,
    /// Components stored as separate planes
    pub planar: bool,
    pub predictor: u64,
    pub compression: Box<dyn CompressionHandler>,
    /// Size of the file, used to bounds-check chunks
    pub file_size: u64,
}

impl SampleLayout {
    /// Reads the layout of `ifd`, rejecting anything but 8-bit samples
    pub fn from_ifd(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> CropResult<Self> {
        let (width, height) = ifd.get_dimensions()
            .ok_or_else(|| CropError::UnsupportedSource(format!("IFD #{} has no image dimensions", ifd.number)))?;
        let samples_per_pixel = ifd.get_samples_per_pixel();

        if ifd.has_tag(tags::BITS_PER_SAMPLE) {
            let bits = tiff_reader.read_tag_values(reader, ifd, tags::BITS_PER_SAMPLE)?;
            if let Some(&unsupported) = bits.iter().find(|&&b| b != 8) {
                debug!("IFD #{} uses {} bits per sample", ifd.number, unsupported);
                return Err(TiffError::UnsupportedBitsPerSample(unsupported).into());
            }
        }

        let compression = CompressionFactory::create_handler(ifd.compression())?;
        let file_size = validation::get_file_size(reader)?;

        Ok(SampleLayout {
            width,
            height,
            samples_per_pixel,
            planar: ifd.planar_configuration() == planar_config::PLANAR && samples_per_pixel > 1,
            predictor: ifd.predictor(),
            compression,
            file_size,
        })
    }

    /// Single z-plane, single time point extents
    pub fn extents(&self) -> AxisExtents {
        AxisExtents {
            width: self.width,
            height: self.height,
            z_count: 1,
            channel_count: self.samples_per_pixel,
            t_count: 1,
        }
    }

    /// Samples stored per pixel inside one chunk
    pub fn samples_per_chunk_pixel(&self) -> u64 {
        if self.planar { 1 } else { self.samples_per_pixel }
    }

    /// Planes a window touches, with the channel each plane starts at
    ///
    /// Chunky data has a single plane holding every channel.
    pub fn planes_for(&self, request: &WindowRequest) -> Vec<u64> {
        if self.planar {
            request.c.clone().collect()
        } else {
            vec![0]
        }
    }

    /// Reads, decompresses and un-predicts one chunk
    ///
    /// `row_pixels` and `rows` give the decoded chunk geometry. Returns
    /// `None` for chunks that were never written.
    pub fn read_chunk(
        &self,
        reader: &mut dyn SeekableReader,
        offset: u64,
        byte_count: u64,
        row_pixels: u64,
        rows: u64,
    ) -> CropResult<Option<Vec<u8>>> {
        if offset == 0 || byte_count == 0 {
            debug!("Chunk at offset {} with {} bytes is empty, leaving zeros", offset, byte_count);
            return Ok(None);
        }
        validation::validate_data_block(offset, byte_count, self.file_size)?;

        reader.seek(SeekFrom::Start(offset))?;
        let mut compressed = vec![0u8; byte_count as usize];
        reader.read_exact(&mut compressed)?;

        let mut data = self.compression.decompress(&compressed)?;
        trace!("Chunk at {} decoded to {} bytes", offset, data.len());

        if self.predictor == predictor::HORIZONTAL_DIFFERENCING {
            horizontal::undo_horizontal_differencing(&mut data, row_pixels as usize, rows as usize,
                                                    self.samples_per_chunk_pixel() as usize);
        }

        Ok(Some(data))
    }
}

/// A decoded chunk placed in level coordinates
pub struct Chunk<'a> {
    pub data: &'a [u8],
    /// Level column of the chunk's first pixel
    pub x0: u64,
    /// Level row of the chunk's first row
    pub y0: u64,
    /// Pixels per decoded row
    pub row_pixels: u64,
    /// Rows in the decoded chunk
    pub rows: u64,
    /// Samples stored per pixel
    pub samples: u64,
    /// Channel of the chunk's first sample
    pub first_channel: u64,
}

impl Chunk<'_> {
    /// Copies the part of this chunk inside `request` into `volume`
    ///
    /// Samples missing from a short chunk are left at zero.
    pub fn copy_into(&self, request: &WindowRequest, volume: &mut Volume) {
        let y_start = self.y0.max(request.y.start);
        let y_end = (self.y0 + self.rows).min(request.y.end);
        let x_start = self.x0.max(request.x.start);
        let x_end = (self.x0 + self.row_pixels).min(request.x.end);
        let c_start = self.first_channel.max(request.c.start);
        let c_end = (self.first_channel + self.samples).min(request.c.end);

        for y in y_start..y_end {
            let row_base = (y - self.y0) * self.row_pixels;
            for x in x_start..x_end {
                let pixel_base = (row_base + (x - self.x0)) * self.samples;
                for c in c_start..c_end {
                    let index = (pixel_base + (c - self.first_channel)) as usize;
                    if let Some(&value) = self.data.get(index) {
                        for z in 0..request.z.end.saturating_sub(request.z.start) as usize {
                            for t in 0..request.t.end.saturating_sub(request.t.start) as usize {
                                volume.set(
                                    (x - request.x.start) as usize,
                                    (y - request.y.start) as usize,
                                    z,
                                    (c - request.c.start) as usize,
                                    t,
                                    value,
                                );
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_copy_clips_to_window() {
        // 4x2 chunk of 2-sample pixels starting at level (10, 20)
        let data: Vec<u8> = (0..16).collect();
        let chunk = Chunk { data: &data, x0: 10, y0: 20, row_pixels: 4, rows: 2, samples: 2, first_channel: 0 };
        let request = WindowRequest { x: 12..14, y: 21..30, z: 0..1, c: 1..2, t: 0..1 };

        let mut volume = Volume::zeros(request.shape());
        chunk.copy_into(&request, &mut volume);

        // Row 1 of the chunk, pixels 2 and 3, sample 1
        assert_eq!(volume.get(0, 0, 0, 0, 0), Some(13));
        assert_eq!(volume.get(1, 0, 0, 0, 0), Some(15));
        assert_eq!(volume.get(0, 1, 0, 0, 0), Some(0));
    }

    #[test]
    fn short_chunk_leaves_zeros() {
        let data = vec![9u8; 3];
        let chunk = Chunk { data: &data, x0: 0, y0: 0, row_pixels: 2, rows: 2, samples: 1, first_channel: 0 };
        let request = WindowRequest { x: 0..2, y: 0..2, z: 0..1, c: 0..1, t: 0..1 };

        let mut volume = Volume::zeros(request.shape());
        chunk.copy_into(&request, &mut volume);

        assert_eq!(volume.get(0, 1, 0, 0, 0), Some(9));
        assert_eq!(volume.get(1, 1, 0, 0, 0), Some(0));
    }
}
