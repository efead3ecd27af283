//! TIFF file format parsing module
//!
//! This module provides structures and functions for reading the header
//! and IFD chain of TIFF and BigTIFF files, which is all the pyramid
//! reader and the output writer need to agree on.

pub mod errors;
pub mod ifd;
pub mod types;
pub mod reader;
pub mod constants;
pub mod tag_names;
pub(crate) mod validation;
#[cfg(test)]
mod tests;

pub use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
pub use errors::{TiffError, TiffResult};
pub use ifd::{IFD, IFDEntry};
pub use reader::TiffReader;
pub use types::TIFF;
