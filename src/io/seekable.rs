//! Seekable reader trait
//!
//! Level readers jump between strips and tiles, so every reader they take
//! must support both reading and seeking.

use std::io::{Read, Seek};

/// Reader that can both read and seek
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}
