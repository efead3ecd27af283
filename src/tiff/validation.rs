//! Sanity checks applied while walking a TIFF file

use std::io::{Seek, SeekFrom};

use log::{error, warn};

use crate::io::byte_order::ByteOrderHandler;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::header;
use crate::tiff::errors::{TiffError, TiffResult};

/// Rejects IFD offsets that point into the header or past the end of file
pub fn validate_ifd_offset(offset: u64, file_size: u64) -> TiffResult<()> {
    if offset >= file_size || offset < header::TIFF_HEADER_SIZE {
        return Err(TiffError::GenericError(format!(
            "Invalid IFD offset: {} (file size: {})",
            offset, file_size
        )));
    }

    Ok(())
}

/// Size of the underlying stream, restoring the current position
///
/// Falls back to `u64::MAX` when the stream cannot report its end.
pub fn get_file_size(reader: &mut dyn SeekableReader) -> TiffResult<u64> {
    let current_position = reader.stream_position()?;
    let file_size = match reader.seek(SeekFrom::End(0)) {
        Ok(size) => size,
        Err(e) => {
            warn!("Could not determine file size: {}", e);
            u64::MAX
        }
    };
    reader.seek(SeekFrom::Start(current_position))?;

    Ok(file_size)
}

/// Checks the offset size and reserved word that follow a BigTIFF version
pub fn validate_bigtiff_header(
    reader: &mut dyn SeekableReader,
    handler: &dyn ByteOrderHandler,
) -> TiffResult<()> {
    let offset_size = handler.read_u16(reader)?;
    let reserved = handler.read_u16(reader)?;

    if offset_size != header::BIGTIFF_OFFSET_SIZE || reserved != 0 {
        error!("Invalid BigTIFF header: offset_size={}, reserved={}", offset_size, reserved);
        return Err(TiffError::InvalidBigTIFFHeader);
    }

    Ok(())
}

/// Checks that a `[offset, offset + length)` block lies inside the file
pub fn validate_data_block(offset: u64, length: u64, file_size: u64) -> TiffResult<()> {
    match offset.checked_add(length) {
        Some(end) if end <= file_size => Ok(()),
        _ => Err(TiffError::GenericError(format!(
            "Data block at {} with {} bytes exceeds file size {}",
            offset, length, file_size
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn offsets_must_fall_inside_the_file() {
        assert!(validate_ifd_offset(8, 100).is_ok());
        assert!(validate_ifd_offset(4, 100).is_err());
        assert!(validate_ifd_offset(100, 100).is_err());
    }

    #[test]
    fn file_size_keeps_position() {
        let mut cursor = Cursor::new(vec![0u8; 32]);
        cursor.set_position(5);
        assert_eq!(get_file_size(&mut cursor).unwrap(), 32);
        assert_eq!(cursor.position(), 5);
    }

    #[test]
    fn data_blocks_are_bounded() {
        assert!(validate_data_block(10, 10, 20).is_ok());
        assert!(validate_data_block(10, 11, 20).is_err());
        assert!(validate_data_block(u64::MAX, 2, 20).is_err());
    }
}
