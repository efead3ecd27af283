//! Compression handling for strips, tiles and output frames
//!
//! Each supported TIFF compression scheme is a `CompressionHandler`
//! strategy; `CompressionFactory` picks one by code or by name.

mod handler;
mod uncompressed;
mod deflate;
mod factory;
mod zstd;
pub mod predictor;

pub use handler::CompressionHandler;
pub use uncompressed::UncompressedHandler;
pub use deflate::DeflateHandler;
pub use factory::CompressionFactory;
pub use zstd::ZstdHandler;
