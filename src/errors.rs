//! Error types for segmentation, image sources and the crop pipeline

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::tiff::errors::TiffError;

/// Errors raised by the crop pipeline
#[derive(Debug)]
pub enum CropError {
    /// A box violates the bounds or ordering invariants of its store
    InvalidSegment {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        width: u32,
        height: u32,
    },
    /// An aggregate query was made on a store without boxes
    EmptyStore,
    /// Reference or target dimensions must be positive
    InvalidDimensions(String),
    /// A box index past the end of the store
    SegmentIndexOutOfRange { index: usize, len: usize },
    /// One resolution level could not be converted or appended as a frame
    FrameEncodingFailure { level: usize, reason: String },
    /// The output root is not an existing directory
    OutputRootMissing(PathBuf),
    /// The channel policy rejected the channel count of a window
    UnsupportedChannels(usize),
    /// The input cannot be opened as an image source
    UnsupportedSource(String),
    /// A windowed read asked for samples outside the level extents
    WindowOutOfBounds(String),
    /// Invalid command line or job file value
    ConfigError(String),
    /// Error from the TIFF format layer
    Tiff(TiffError),
    /// I/O error
    IoError(io::Error),
    /// Generic error with message
    GenericError(String),
}

impl fmt::Display for CropError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CropError::InvalidSegment { x1, y1, x2, y2, width, height } => write!(
                f,
                "Invalid segment ({}, {}, {}, {}) for reference space {}x{}",
                x1, y1, x2, y2, width, height
            ),
            CropError::EmptyStore => write!(f, "Segmentation contains no segments"),
            CropError::InvalidDimensions(msg) => write!(f, "Invalid dimensions: {}", msg),
            CropError::SegmentIndexOutOfRange { index, len } => {
                write!(f, "Segment index {} out of range for {} segments", index, len)
            }
            CropError::FrameEncodingFailure { level, reason } => {
                write!(f, "Could not append frame for resolution level {}: {}", level, reason)
            }
            CropError::OutputRootMissing(path) => {
                write!(f, "Output root is not an existing directory: {}", path.display())
            }
            CropError::UnsupportedChannels(count) => {
                write!(f, "Expected 3 channels for an RGB frame, found {}", count)
            }
            CropError::UnsupportedSource(msg) => write!(f, "Unsupported image source: {}", msg),
            CropError::WindowOutOfBounds(msg) => write!(f, "Window out of bounds: {}", msg),
            CropError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            CropError::Tiff(e) => write!(f, "{}", e),
            CropError::IoError(e) => write!(f, "I/O error: {}", e),
            CropError::GenericError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CropError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CropError::Tiff(e) => Some(e),
            CropError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TiffError> for CropError {
    fn from(error: TiffError) -> Self {
        CropError::Tiff(error)
    }
}

impl From<io::Error> for CropError {
    fn from(error: io::Error) -> Self {
        CropError::IoError(error)
    }
}

impl From<String> for CropError {
    fn from(msg: String) -> Self {
        CropError::GenericError(msg)
    }
}

/// Result type for crop pipeline operations
pub type CropResult<T> = Result<T, CropError>;
