//! Job files and command line values

pub mod job;

pub use job::{CropJob, ResolvedJob};

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::{CropError, CropResult};

lazy_static! {
    static ref DIMENSIONS_PATTERN: Regex = Regex::new(r"^\s*(\d+)\s*[xX]\s*(\d+)\s*$")
        .expect("dimensions pattern is valid");
}

/// Parse a `WIDTHxHEIGHT` pair such as `"1000x800"`
pub fn parse_dimensions(text: &str) -> CropResult<(u32, u32)> {
    let captures = DIMENSIONS_PATTERN.captures(text).ok_or_else(|| {
        CropError::ConfigError(format!("Expected dimensions as WIDTHxHEIGHT, got '{}'", text))
    })?;

    let parse = |s: &str| s.parse::<u32>()
        .map_err(|_| CropError::ConfigError(format!("Dimension '{}' is out of range", s)));

    Ok((parse(&captures[1])?, parse(&captures[2])?))
}
