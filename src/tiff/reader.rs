//! TIFF and BigTIFF structure reader
//!
//! The reader walks the header and the IFD chain of a file and decodes every
//! tag entry. Pixel data is left on disk; level readers fetch only the
//! strips or tiles a window needs.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use byteorder::ReadBytesExt;
use log::{debug, info, warn};

use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{field_types, header};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::types::TIFF;
use crate::tiff::validation;

/// Upper bound on the IFD chain length, guards against corrupt chains
const MAX_IFDS: usize = 4096;

/// Reader for TIFF and BigTIFF files
pub struct TiffReader {
    /// Byte order handler, set once the header has been read
    byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    /// Current file path
    current_file: Option<PathBuf>,
    /// Whether currently reading BigTIFF format
    is_big_tiff: bool,
}

impl Default for TiffReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TiffReader {
    /// Creates a new TIFF reader
    pub fn new() -> Self {
        TiffReader {
            byte_order_handler: None,
            current_file: None,
            is_big_tiff: false,
        }
    }

    fn handler(&self) -> TiffResult<&dyn ByteOrderHandler> {
        self.byte_order_handler
            .as_deref()
            .ok_or_else(|| TiffError::GenericError("Byte order not yet determined".to_string()))
    }

    /// Loads the TIFF structure of the file at `path`
    pub fn load(&mut self, path: impl AsRef<Path>) -> TiffResult<TIFF> {
        let path = path.as_ref();
        info!("Loading TIFF file: {}", path.display());
        self.current_file = Some(path.to_path_buf());

        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(1024 * 1024, file);

        self.read(&mut reader)
    }

    /// Reads the header and the full IFD chain from `reader`
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> TiffResult<TIFF> {
        reader.seek(SeekFrom::Start(0))?;

        let byte_order = ByteOrder::detect(reader)?;
        debug!("Detected byte order: {}", byte_order.name());
        self.byte_order_handler = Some(byte_order.create_handler());

        let version = self.handler()?.read_u16(reader)?;
        self.is_big_tiff = match version {
            header::BIG_TIFF_VERSION => {
                validation::validate_bigtiff_header(reader, self.handler()?)?;
                true
            }
            header::TIFF_VERSION => false,
            _ => return Err(TiffError::UnsupportedVersion(version)),
        };
        debug!("TIFF version {} ({})", version, if self.is_big_tiff { "BigTIFF" } else { "classic" });

        let first_ifd_offset = self.read_offset(reader)?;
        let file_size = validation::get_file_size(reader)?;
        validation::validate_ifd_offset(first_ifd_offset, file_size)?;

        let mut tiff = TIFF::new(self.is_big_tiff, byte_order);
        tiff.ifds = self.read_ifd_chain(reader, first_ifd_offset, file_size)?;

        info!("Read {} IFDs", tiff.ifds.len());
        Ok(tiff)
    }

    /// Reads IFDs until the chain ends, loops, or points outside the file
    fn read_ifd_chain(&self, reader: &mut dyn SeekableReader, first_ifd_offset: u64, file_size: u64) -> TiffResult<Vec<IFD>> {
        let mut ifds = Vec::new();
        let mut visited = HashSet::new();
        let mut ifd_offset = first_ifd_offset;

        while ifd_offset != 0 && ifds.len() < MAX_IFDS {
            if ifd_offset >= file_size {
                warn!("IFD offset {} exceeds file size {}, stopping IFD chain", ifd_offset, file_size);
                break;
            }
            if !visited.insert(ifd_offset) {
                warn!("IFD chain loops back to offset {}, stopping", ifd_offset);
                break;
            }

            let (ifd, next_offset) = match self.read_ifd(reader, ifd_offset, ifds.len()) {
                Ok(result) => result,
                Err(e) => {
                    // Keep what was read so far; trailing garbage is common
                    if ifds.is_empty() {
                        return Err(e);
                    }
                    warn!("Error reading IFD {}: {}", ifds.len(), e);
                    break;
                }
            };

            debug!("IFD #{} has {} entries, next at {}", ifd.number, ifd.entries.len(), next_offset);
            ifds.push(ifd);
            ifd_offset = next_offset;
        }

        Ok(ifds)
    }

    /// Reads one IFD at `offset`, returning it with the next IFD offset
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize) -> TiffResult<(IFD, u64)> {
        reader.seek(SeekFrom::Start(offset))?;

        let handler = self.handler()?;
        let entry_count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u16(reader)? as u64
        };

        let mut ifd = IFD::new(number, offset);
        for _ in 0..entry_count {
            let entry = self.read_ifd_entry(reader)?;
            ifd.add_entry(entry);
        }

        let next_offset = self.read_offset(reader)?;
        Ok((ifd, next_offset))
    }

    /// Reads a single IFD entry, decoding inline values
    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader) -> TiffResult<IFDEntry> {
        let handler = self.handler()?;

        let tag = handler.read_u16(reader)?;
        let field_type = handler.read_u16(reader)?;
        let count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };

        let field_size = if self.is_big_tiff { 8 } else { 4 };
        let mut raw = vec![0u8; field_size];
        reader.read_exact(&mut raw)?;

        let mut entry = IFDEntry::new(tag, field_type, count, 0);
        let mut field = Cursor::new(raw);

        if entry.is_value_inline(self.is_big_tiff) && count > 0 {
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                values.push(self.read_value(&mut field, field_type)?);
            }
            entry = IFDEntry::with_inline_values(tag, field_type, count, values);
        } else {
            entry.value_offset = self.read_offset(&mut field)?;
        }

        Ok(entry)
    }

    /// Reads a 4-byte or 8-byte offset depending on the format
    fn read_offset(&self, reader: &mut dyn SeekableReader) -> TiffResult<u64> {
        let handler = self.handler()?;
        if self.is_big_tiff {
            Ok(handler.read_u64(reader)?)
        } else {
            Ok(handler.read_u32(reader)? as u64)
        }
    }

    /// Reads one value of `field_type`, widened to u64
    ///
    /// Rationals pack numerator and denominator into the high and low
    /// words; floating point values keep their bit pattern.
    fn read_value(&self, reader: &mut dyn SeekableReader, field_type: u16) -> TiffResult<u64> {
        let handler = self.handler()?;
        let value = match field_type {
            field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED | field_types::ASCII => {
                reader.read_u8()? as u64
            }
            field_types::SHORT | field_types::SSHORT => handler.read_u16(reader)? as u64,
            field_types::LONG | field_types::SLONG | field_types::FLOAT => handler.read_u32(reader)? as u64,
            field_types::RATIONAL | field_types::SRATIONAL => {
                let numerator = handler.read_u32(reader)? as u64;
                let denominator = handler.read_u32(reader)? as u64;
                (numerator << 32) | denominator
            }
            field_types::DOUBLE | field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => {
                handler.read_u64(reader)?
            }
            _ => return Err(TiffError::UnsupportedFieldType(field_type)),
        };

        Ok(value)
    }

    /// All values of `tag` in `ifd`, reading external values from `reader`
    pub fn read_tag_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<u64>> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;

        if let Some(values) = &entry.inline_values {
            return Ok(values.clone());
        }

        let byte_len = entry.field_type_size().checked_mul(entry.count).ok_or_else(|| {
            TiffError::GenericError(format!(
                "Tag {} declares {} values, more than any file can hold", tag, entry.count
            ))
        })?;
        let file_size = validation::get_file_size(reader)?;
        validation::validate_data_block(entry.value_offset, byte_len, file_size)?;

        reader.seek(SeekFrom::Start(entry.value_offset))?;
        let mut values = Vec::with_capacity(entry.count as usize);
        for _ in 0..entry.count {
            values.push(self.read_value(reader, entry.field_type)?);
        }

        Ok(values)
    }

    /// Path of the most recently loaded file
    pub fn get_file_path(&self) -> Option<&Path> {
        self.current_file.as_deref()
    }

    /// Whether the current file is a BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }
}
