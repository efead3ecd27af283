//! Handler for Deflate (zlib) compressed data

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::tiff::constants::compression;
use crate::tiff::errors::TiffResult;
use super::handler::CompressionHandler;

/// Deflate compression handler
///
/// Decodes both the Adobe (8) and the old (32946) code; always writes 8.
pub struct DeflateHandler {
    level: Compression,
}

impl DeflateHandler {
    /// Handler with the default zlib level
    pub fn new() -> Self {
        DeflateHandler { level: Compression::default() }
    }

    /// Handler with an explicit zlib level (0-9)
    pub fn with_level(level: u32) -> Self {
        DeflateHandler { level: Compression::new(level.min(9)) }
    }
}

impl Default for DeflateHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionHandler for DeflateHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data);
        let mut decompressed_data = Vec::new();
        decoder.read_to_end(&mut decompressed_data)?;
        Ok(decompressed_data)
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), self.level);
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn name(&self) -> &'static str {
        "Deflate"
    }

    fn code(&self) -> u64 {
        compression::DEFLATE
    }
}
