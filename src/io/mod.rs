//! Low-level I/O helpers for reading TIFF files

pub mod seekable;
pub mod byte_order;
