//! A single rectangular segment (box)
//!
//! Segments are axis-aligned rectangles described by their upper-left
//! `(x1, y1)` and bottom-right `(x2, y2)` corners. A segment on its own
//! carries no coordinate space; the `ImageSegmentation` that owns it
//! defines the reference width and height it is valid in.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::{CropError, CropResult};

lazy_static! {
    // Four comma separated numbers, optionally wrapped in brackets
    static ref SEGMENT_PATTERN: Regex = Regex::new(
        r"^\s*[\[(]?\s*([-+]?[0-9]*\.?[0-9]+)\s*,\s*([-+]?[0-9]*\.?[0-9]+)\s*,\s*([-+]?[0-9]*\.?[0-9]+)\s*,\s*([-+]?[0-9]*\.?[0-9]+)\s*[\])]?\s*$"
    ).expect("segment pattern is a valid regex");
}

/// Axis-aligned box `(x1, y1)-(x2, y2)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// X coordinate of the upper-left corner
    pub x1: f64,
    /// Y coordinate of the upper-left corner
    pub y1: f64,
    /// X coordinate of the bottom-right corner
    pub x2: f64,
    /// Y coordinate of the bottom-right corner
    pub y2: f64,
}

impl Segment {
    /// Create a segment without validation
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Segment { x1, y1, x2, y2 }
    }

    /// Parse a segment from a string (format: "x1,y1,x2,y2")
    pub fn from_string(segment_str: &str) -> CropResult<Self> {
        let captures = SEGMENT_PATTERN.captures(segment_str).ok_or_else(|| {
            CropError::ConfigError(format!(
                "Segment must have 4 comma-separated values, got '{}'",
                segment_str
            ))
        })?;

        let mut values = [0.0f64; 4];
        for (i, value) in values.iter_mut().enumerate() {
            let text = &captures[i + 1];
            *value = text.parse::<f64>().map_err(|_| {
                CropError::ConfigError(format!("Invalid segment coordinate '{}'", text))
            })?;
        }

        Ok(Segment::new(values[0], values[1], values[2], values[3]))
    }

    /// Width of the segment (may be negative for inverted boxes)
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    /// Height of the segment (may be negative for inverted boxes)
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Area as the product of absolute extents
    ///
    /// Derived segments can in principle have inverted corners, so the
    /// magnitude is used rather than the signed product.
    pub fn area(&self) -> f64 {
        self.width().abs() * self.height().abs()
    }

    /// Centre point `((x1 + x2) / 2, (y1 + y2) / 2)`
    pub fn centre(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Half extents `((x2 - x1) / 2, (y2 - y1) / 2)`
    pub fn half_extents(&self) -> (f64, f64) {
        (self.width() / 2.0, self.height() / 2.0)
    }

    /// Scale x coordinates by `scale_x` and y coordinates by `scale_y`
    pub fn scale(&self, scale_x: f64, scale_y: f64) -> Segment {
        Segment::new(
            self.x1 * scale_x,
            self.y1 * scale_y,
            self.x2 * scale_x,
            self.y2 * scale_y,
        )
    }

    /// Recompute the segment around its own centre with extents times `factor`
    pub fn resize_about_centre(&self, factor: f64) -> Segment {
        let (cx, cy) = self.centre();
        let (hx, hy) = self.half_extents();
        Segment::new(
            cx - factor * hx,
            cy - factor * hy,
            cx + factor * hx,
            cy + factor * hy,
        )
    }

    /// Coordinates as an array `[x1, y1, x2, y2]`
    pub fn to_array(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Whether every coordinate is within `tolerance` of `other`
    pub fn approx_eq(&self, other: &Segment, tolerance: f64) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_bracketed_strings() {
        let plain = Segment::from_string("10,20,30,40").unwrap();
        assert_eq!(plain, Segment::new(10.0, 20.0, 30.0, 40.0));

        let bracketed = Segment::from_string("[ 1.5, 2 , 3.25,4 ]").unwrap();
        assert_eq!(bracketed, Segment::new(1.5, 2.0, 3.25, 4.0));
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!(Segment::from_string("1,2,3").is_err());
        assert!(Segment::from_string("a,b,c,d").is_err());
        assert!(Segment::from_string("1,2,3,4,5").is_err());
    }

    #[test]
    fn negative_values_parse_so_the_store_can_reject_them() {
        let segment = Segment::from_string("-1,0,5,5").unwrap();
        assert_eq!(segment.x1, -1.0);
    }

    #[test]
    fn area_uses_magnitudes() {
        let inverted = Segment::new(20.0, 20.0, 10.0, 10.0);
        assert_eq!(inverted.area(), 100.0);
    }

    #[test]
    fn resize_keeps_centre() {
        let segment = Segment::new(10.0, 10.0, 20.0, 30.0);
        let grown = segment.resize_about_centre(2.0);
        assert_eq!(grown.centre(), segment.centre());
        assert_eq!(grown.width(), 20.0);
        assert_eq!(grown.height(), 40.0);
    }
}
