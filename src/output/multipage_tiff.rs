//! Appending multi-page TIFF writer
//!
//! Pages are written as they arrive: the pixel chunks first, then any tag
//! values too large for their entry, then the IFD itself. The next-IFD
//! pointer of the previous page (or the header) is patched to point at the
//! new IFD, so the file is a valid TIFF after every page.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use image::RgbImage;
use log::{debug, info, warn};

use crate::compression::{predictor as horizontal, CompressionFactory, CompressionHandler};
use crate::errors::{CropError, CropResult};
use crate::tiff::constants::{compression, field_types, header, photometric, planar_config, predictor, tags};
use crate::tiff::errors::TiffError;
use crate::tiff::tag_names;
use super::container::{ContainerFactory, OutputContainer};

/// How the pixels of each page are split into chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLayout {
    /// Full-width strips of at most this many rows
    Strips { rows_per_strip: u32 },
    /// Tiles of this size, edge tiles padded with zeros
    Tiles { width: u32, height: u32 },
}

/// Options shared by every page of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffWriterOptions {
    /// Write a BigTIFF (64-bit offsets)
    pub big_tiff: bool,
    /// TIFF compression code
    pub compression: u64,
    pub layout: PageLayout,
    /// Apply horizontal differencing before compression
    pub predictor: bool,
}

impl Default for TiffWriterOptions {
    fn default() -> Self {
        TiffWriterOptions {
            big_tiff: false,
            compression: compression::NONE,
            layout: PageLayout::Strips { rows_per_strip: 64 },
            predictor: false,
        }
    }
}

/// Interleaved 8-bit samples of one page
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u16,
    pub data: &'a [u8],
}

impl<'a> Page<'a> {
    /// View an RGB frame as a page
    pub fn from_rgb(frame: &'a RgbImage) -> Self {
        Page {
            width: frame.width(),
            height: frame.height(),
            samples_per_pixel: 3,
            data: frame.as_raw(),
        }
    }

    fn row_len(&self) -> usize {
        self.width as usize * self.samples_per_pixel as usize
    }
}

/// One tag waiting to be written
struct PendingEntry {
    tag: u16,
    field_type: u16,
    values: Vec<u64>,
}

impl PendingEntry {
    fn new(tag: u16, field_type: u16, values: Vec<u64>) -> Self {
        PendingEntry { tag, field_type, values }
    }

    fn byte_len(&self) -> u64 {
        tag_names::field_type_size(self.field_type) * self.values.len() as u64
    }

    fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.byte_len() as usize);
        for &value in &self.values {
            match tag_names::field_type_size(self.field_type) {
                1 => bytes.push(value as u8),
                2 => bytes.extend_from_slice(&(value as u16).to_le_bytes()),
                4 => bytes.extend_from_slice(&(value as u32).to_le_bytes()),
                _ => bytes.extend_from_slice(&value.to_le_bytes()),
            }
        }
        bytes
    }
}

/// Multi-page TIFF file that pages are appended to
pub struct MultiPageTiffWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    options: TiffWriterOptions,
    compression: Box<dyn CompressionHandler>,
    /// Position of the next-IFD pointer to patch for the next page
    next_ifd_slot: u64,
    /// Current end of file
    end: u64,
    frame_count: usize,
    finished: bool,
}

impl MultiPageTiffWriter {
    /// Create the file at `path` and write its header
    pub fn create(path: impl AsRef<Path>, options: TiffWriterOptions) -> CropResult<Self> {
        let path = path.as_ref();
        let compression = CompressionFactory::create_handler(options.compression)?;
        if let PageLayout::Tiles { width, height } = options.layout {
            // Tile dimensions must be multiples of 16
            if width == 0 || height == 0 || width % 16 != 0 || height % 16 != 0 {
                return Err(CropError::InvalidDimensions(format!(
                    "tile size {}x{} is not a positive multiple of 16", width, height
                )));
            }
        }

        info!("Creating {} container {} ({})",
              if options.big_tiff { "BigTIFF" } else { "TIFF" }, path.display(), compression.name());

        let file = File::create(path)?;
        let mut writer = MultiPageTiffWriter {
            path: path.to_path_buf(),
            writer: BufWriter::with_capacity(1024 * 1024, file),
            options,
            compression,
            next_ifd_slot: 0,
            end: 0,
            frame_count: 0,
            finished: false,
        };
        writer.write_header()?;

        Ok(writer)
    }

    /// Path of the file being written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the header with a zero first-IFD offset
    fn write_header(&mut self) -> CropResult<()> {
        self.writer.write_all(&header::LITTLE_ENDIAN_MARKER)?;

        if self.options.big_tiff {
            self.writer.write_all(&header::BIG_TIFF_VERSION.to_le_bytes())?;
            self.writer.write_all(&header::BIGTIFF_OFFSET_SIZE.to_le_bytes())?;
            self.writer.write_all(&[0u8, 0])?;  // Reserved
            self.next_ifd_slot = 8;
            self.writer.write_all(&[0u8; 8])?;
            self.end = header::BIG_TIFF_HEADER_SIZE;
        } else {
            self.writer.write_all(&header::TIFF_VERSION.to_le_bytes())?;
            self.next_ifd_slot = 4;
            self.writer.write_all(&[0u8; 4])?;
            self.end = header::TIFF_HEADER_SIZE;
        }

        Ok(())
    }

    /// Append one page with the given NewSubfileType flags
    ///
    /// # Arguments
    /// * `page` - Interleaved samples of the page
    /// * `subfile_type` - 0 for a plain page, `REDUCED_RESOLUTION` for a
    ///   pyramid level
    pub fn append_page(&mut self, page: &Page, subfile_type: u64) -> CropResult<()> {
        let expected = page.width as usize * page.height as usize * page.samples_per_pixel as usize;
        if page.width == 0 || page.height == 0 || page.samples_per_pixel == 0 {
            return Err(CropError::InvalidDimensions(format!(
                "page of {}x{} with {} samples", page.width, page.height, page.samples_per_pixel
            )));
        }
        if page.data.len() != expected {
            return Err(CropError::InvalidDimensions(format!(
                "page of {}x{}x{} needs {} samples, got {}",
                page.width, page.height, page.samples_per_pixel, expected, page.data.len()
            )));
        }

        let chunks = self.encode_chunks(page)?;
        let mut offsets = Vec::with_capacity(chunks.len());
        let mut byte_counts = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            offsets.push(self.write_block(chunk)?);
            byte_counts.push(chunk.len() as u64);
        }

        let entries = self.build_entries(page, subfile_type, offsets, byte_counts);
        let (ifd_offset, next_slot) = self.write_ifd(&entries)?;
        self.patch_next_ifd_slot(ifd_offset)?;
        self.next_ifd_slot = next_slot;

        debug!("Page {} of {}: {}x{} at IFD offset {}",
               self.frame_count, self.path.display(), page.width, page.height, ifd_offset);
        self.frame_count += 1;

        Ok(())
    }

    /// Split, predict and compress the page into strips or tiles
    fn encode_chunks(&self, page: &Page) -> CropResult<Vec<Vec<u8>>> {
        let samples = page.samples_per_pixel as usize;
        let row_len = page.row_len();
        let mut chunks = Vec::new();

        match self.options.layout {
            PageLayout::Strips { rows_per_strip } => {
                let rows_per_strip = rows_per_strip.clamp(1, page.height) as usize;
                for rows in page.data.chunks(rows_per_strip * row_len) {
                    let mut strip = rows.to_vec();
                    if self.options.predictor {
                        horizontal::apply_horizontal_differencing(&mut strip, page.width as usize, samples);
                    }
                    chunks.push(self.compression.compress(&strip)?);
                }
            }
            PageLayout::Tiles { width, height } => {
                let (tile_width, tile_height) = (width as usize, height as usize);
                let tile_row_len = tile_width * samples;
                let tiles_across = (page.width as usize).div_ceil(tile_width);
                let tiles_down = (page.height as usize).div_ceil(tile_height);

                for tile_row in 0..tiles_down {
                    for tile_col in 0..tiles_across {
                        let mut tile = vec![0u8; tile_row_len * tile_height];
                        let x0 = tile_col * tile_width;
                        let copy_len = (tile_width.min(page.width as usize - x0)) * samples;

                        for r in 0..tile_height {
                            let y = tile_row * tile_height + r;
                            if y >= page.height as usize {
                                break;
                            }
                            let src = y * row_len + x0 * samples;
                            tile[r * tile_row_len..r * tile_row_len + copy_len]
                                .copy_from_slice(&page.data[src..src + copy_len]);
                        }

                        if self.options.predictor {
                            horizontal::apply_horizontal_differencing(&mut tile, tile_width, samples);
                        }
                        chunks.push(self.compression.compress(&tile)?);
                    }
                }
            }
        }

        Ok(chunks)
    }

    fn build_entries(&self, page: &Page, subfile_type: u64, offsets: Vec<u64>, byte_counts: Vec<u64>) -> Vec<PendingEntry> {
        let offset_type = if self.options.big_tiff { field_types::LONG8 } else { field_types::LONG };
        let spp = page.samples_per_pixel as u64;
        let (photometric, colour_samples) = if spp >= 3 {
            (photometric::RGB, 3)
        } else {
            (photometric::BLACK_IS_ZERO, 1)
        };
        let software = format!("slidecrop {}\0", env!("CARGO_PKG_VERSION"));

        let mut entries = vec![
            PendingEntry::new(tags::NEW_SUBFILE_TYPE, field_types::LONG, vec![subfile_type]),
            PendingEntry::new(tags::IMAGE_WIDTH, field_types::LONG, vec![page.width as u64]),
            PendingEntry::new(tags::IMAGE_LENGTH, field_types::LONG, vec![page.height as u64]),
            PendingEntry::new(tags::BITS_PER_SAMPLE, field_types::SHORT, vec![8; spp as usize]),
            PendingEntry::new(tags::COMPRESSION, field_types::SHORT, vec![self.compression.code()]),
            PendingEntry::new(tags::PHOTOMETRIC_INTERPRETATION, field_types::SHORT, vec![photometric as u64]),
            PendingEntry::new(tags::SAMPLES_PER_PIXEL, field_types::SHORT, vec![spp]),
            PendingEntry::new(tags::PLANAR_CONFIGURATION, field_types::SHORT, vec![planar_config::CHUNKY]),
            PendingEntry::new(tags::SOFTWARE, field_types::ASCII, software.bytes().map(u64::from).collect()),
        ];

        match self.options.layout {
            PageLayout::Strips { rows_per_strip } => {
                let rows_per_strip = rows_per_strip.clamp(1, page.height) as u64;
                entries.push(PendingEntry::new(tags::STRIP_OFFSETS, offset_type, offsets));
                entries.push(PendingEntry::new(tags::ROWS_PER_STRIP, field_types::LONG, vec![rows_per_strip]));
                entries.push(PendingEntry::new(tags::STRIP_BYTE_COUNTS, offset_type, byte_counts));
            }
            PageLayout::Tiles { width, height } => {
                entries.push(PendingEntry::new(tags::TILE_WIDTH, field_types::LONG, vec![width as u64]));
                entries.push(PendingEntry::new(tags::TILE_LENGTH, field_types::LONG, vec![height as u64]));
                entries.push(PendingEntry::new(tags::TILE_OFFSETS, offset_type, offsets));
                entries.push(PendingEntry::new(tags::TILE_BYTE_COUNTS, offset_type, byte_counts));
            }
        }

        if self.options.predictor {
            entries.push(PendingEntry::new(tags::PREDICTOR, field_types::SHORT,
                                           vec![predictor::HORIZONTAL_DIFFERENCING]));
        }
        if spp > colour_samples {
            // Unspecified extra samples
            entries.push(PendingEntry::new(tags::EXTRA_SAMPLES, field_types::SHORT,
                                           vec![0; (spp - colour_samples) as usize]));
        }

        entries.sort_by_key(|entry| entry.tag);
        entries
    }

    /// Write external values, then the IFD
    ///
    /// Returns the IFD offset and the position of its next-IFD pointer.
    fn write_ifd(&mut self, entries: &[PendingEntry]) -> CropResult<(u64, u64)> {
        let big = self.options.big_tiff;
        let inline_size = if big { 8 } else { 4 };

        let mut value_fields = Vec::with_capacity(entries.len());
        for entry in entries {
            let encoded = entry.encode();
            if encoded.len() <= inline_size {
                let mut field = encoded;
                field.resize(inline_size, 0);
                value_fields.push(field);
            } else {
                let offset = self.write_block(&encoded)?;
                value_fields.push(self.encode_offset(offset));
            }
        }

        let mut ifd = Vec::new();
        if big {
            ifd.extend_from_slice(&(entries.len() as u64).to_le_bytes());
        } else {
            ifd.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        }

        for (entry, field) in entries.iter().zip(value_fields) {
            ifd.extend_from_slice(&entry.tag.to_le_bytes());
            ifd.extend_from_slice(&entry.field_type.to_le_bytes());
            if big {
                ifd.extend_from_slice(&(entry.values.len() as u64).to_le_bytes());
            } else {
                ifd.extend_from_slice(&(entry.values.len() as u32).to_le_bytes());
            }
            ifd.extend_from_slice(&field);
        }

        // Next IFD offset, patched when another page follows
        let slot_in_ifd = ifd.len() as u64;
        ifd.resize(ifd.len() + inline_size, 0);

        let ifd_offset = self.write_block(&ifd)?;

        Ok((ifd_offset, ifd_offset + slot_in_ifd))
    }

    /// Point the previous next-IFD pointer at `ifd_offset`
    fn patch_next_ifd_slot(&mut self, ifd_offset: u64) -> CropResult<()> {
        let pointer = self.encode_offset(ifd_offset);
        self.writer.seek(SeekFrom::Start(self.next_ifd_slot))?;
        self.writer.write_all(&pointer)?;
        self.writer.seek(SeekFrom::Start(self.end))?;
        Ok(())
    }

    /// Write `bytes` at the end of the file on a word boundary
    fn write_block(&mut self, bytes: &[u8]) -> CropResult<u64> {
        if self.end % 2 == 1 {
            self.writer.write_all(&[0])?;
            self.end += 1;
        }

        let offset = self.end;
        self.check_offset(offset + bytes.len() as u64)?;
        self.writer.write_all(bytes)?;
        self.end += bytes.len() as u64;

        Ok(offset)
    }

    fn encode_offset(&self, offset: u64) -> Vec<u8> {
        if self.options.big_tiff {
            offset.to_le_bytes().to_vec()
        } else {
            (offset as u32).to_le_bytes().to_vec()
        }
    }

    /// Classic TIFF offsets must fit into 32 bits
    fn check_offset(&self, offset: u64) -> CropResult<()> {
        if !self.options.big_tiff && offset > u32::MAX as u64 {
            return Err(TiffError::OffsetOverflow(offset).into());
        }
        Ok(())
    }

    fn flush(&mut self) -> CropResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl OutputContainer for MultiPageTiffWriter {
    fn append_frame(&mut self, frame: &RgbImage) -> CropResult<()> {
        self.append_page(&Page::from_rgb(frame), 0)
    }

    fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn finish(mut self: Box<Self>) -> CropResult<()> {
        self.flush()?;
        self.finished = true;
        info!("Closed {} with {} frames", self.path.display(), self.frame_count);
        Ok(())
    }
}

impl Drop for MultiPageTiffWriter {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.flush() {
                warn!("Error closing {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Creates one `MultiPageTiffWriter` per container path
#[derive(Debug, Clone, Copy, Default)]
pub struct TiffContainerFactory {
    pub options: TiffWriterOptions,
}

impl TiffContainerFactory {
    pub fn new(options: TiffWriterOptions) -> Self {
        TiffContainerFactory { options }
    }
}

impl ContainerFactory for TiffContainerFactory {
    fn create(&self, path: &Path) -> CropResult<Box<dyn OutputContainer>> {
        Ok(Box::new(MultiPageTiffWriter::create(path, self.options)?))
    }

    fn extension(&self) -> &'static str {
        "tiff"
    }
}
