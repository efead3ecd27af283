//! Byte order handling for TIFF files
//!
//! A TIFF file declares its byte order in the first two header bytes.
//! Readers pick a handler once and route every multi-byte read through it.

use std::io::Result;
use std::marker::PhantomData;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::io::seekable::SeekableReader;
use crate::tiff::errors::{TiffError, TiffResult};

/// Represents the byte order of a TIFF file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian byte order (II)
    LittleEndian,
    /// Big-endian byte order (MM)
    BigEndian,
}

impl ByteOrder {
    /// Detects the byte order from the TIFF header
    pub fn detect(reader: &mut dyn SeekableReader) -> TiffResult<Self> {
        let marker = reader.read_u16::<LittleEndian>()?;
        match marker {
            0x4949 => Ok(ByteOrder::LittleEndian),
            0x4D4D => Ok(ByteOrder::BigEndian),
            _ => Err(TiffError::InvalidByteOrder(marker)),
        }
    }

    /// Returns a string representation of this byte order
    pub fn name(&self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "Little Endian (II)",
            ByteOrder::BigEndian => "Big Endian (MM)",
        }
    }

    /// Creates the handler for this byte order
    pub fn create_handler(&self) -> Box<dyn ByteOrderHandler> {
        match self {
            ByteOrder::LittleEndian => Box::new(EndianHandler::<LittleEndian>::new()),
            ByteOrder::BigEndian => Box::new(EndianHandler::<BigEndian>::new()),
        }
    }
}

/// Reads multi-byte integers in one fixed byte order
pub trait ByteOrderHandler: Send + Sync {
    /// Read a u16 value
    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16>;

    /// Read a u32 value
    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32>;

    /// Read a u64 value
    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64>;
}

/// Handler backed by one of the `byteorder` marker types
pub struct EndianHandler<E> {
    _order: PhantomData<fn() -> E>,
}

impl<E> EndianHandler<E> {
    pub fn new() -> Self {
        EndianHandler { _order: PhantomData }
    }
}

impl<E> Default for EndianHandler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: byteorder::ByteOrder> ByteOrderHandler for EndianHandler<E> {
    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16> {
        reader.read_u16::<E>()
    }

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32> {
        reader.read_u32::<E>()
    }

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64> {
        reader.read_u64::<E>()
    }
}
