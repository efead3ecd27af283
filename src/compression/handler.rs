//! Compression handler trait definition

use crate::tiff::errors::TiffResult;

/// Strategy trait for the codecs used by strips, tiles and output frames
pub trait CompressionHandler: Send + Sync {
    /// Decompress one strip or tile
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Compress one strip
    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Get the name of this compression method
    fn name(&self) -> &'static str;

    /// TIFF compression code written into output frames
    fn code(&self) -> u64;
}
