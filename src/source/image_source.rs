//! Multi-resolution image source interface
//!
//! The crop pipeline only needs a handful of things from an image: how many
//! resolution levels it has, how big each level is along the named axes,
//! and a way to read a bounded window of samples. Any storage format can
//! take part by implementing `ImageSource`.

use std::fmt;
use std::ops::Range;

use crate::errors::{CropError, CropResult};
use super::volume::Volume;

/// Extents of one resolution level along every named axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisExtents {
    /// Width in pixels (x)
    pub width: u64,
    /// Height in pixels (y)
    pub height: u64,
    /// Number of z-planes
    pub z_count: u64,
    /// Number of channels
    pub channel_count: u64,
    /// Number of time points
    pub t_count: u64,
}

impl AxisExtents {
    /// Request covering the full range of every axis except x and y
    pub fn full_request(&self, x: Range<u64>, y: Range<u64>) -> WindowRequest {
        WindowRequest {
            x,
            y,
            z: 0..self.z_count,
            c: 0..self.channel_count,
            t: 0..self.t_count,
        }
    }
}

impl fmt::Display for AxisExtents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={} y={} z={} c={} t={}",
               self.width, self.height, self.z_count, self.channel_count, self.t_count)
    }
}

/// Half-open ranges to read along each axis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRequest {
    pub x: Range<u64>,
    pub y: Range<u64>,
    pub z: Range<u64>,
    pub c: Range<u64>,
    pub t: Range<u64>,
}

impl WindowRequest {
    /// Shape of the volume this request produces, in `(x, y, z, c, t)` order
    pub fn shape(&self) -> [usize; 5] {
        [
            range_len(&self.x),
            range_len(&self.y),
            range_len(&self.z),
            range_len(&self.c),
            range_len(&self.t),
        ]
    }

    /// Check every range against the level extents
    pub fn validate(&self, extents: &AxisExtents) -> CropResult<()> {
        let checks = [
            ("x", &self.x, extents.width),
            ("y", &self.y, extents.height),
            ("z", &self.z, extents.z_count),
            ("c", &self.c, extents.channel_count),
            ("t", &self.t, extents.t_count),
        ];

        for (name, range, extent) in checks {
            if range.start > range.end || range.end > extent {
                return Err(CropError::WindowOutOfBounds(format!(
                    "{} range [{}, {}) outside extent {}",
                    name, range.start, range.end, extent
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Display for WindowRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{:?} y{:?} z{:?} c{:?} t{:?}", self.x, self.y, self.z, self.c, self.t)
    }
}

fn range_len(range: &Range<u64>) -> usize {
    range.end.saturating_sub(range.start) as usize
}

/// A multi-resolution, multi-dimensional image
///
/// Level 0 is the highest resolution. Each execution unit opens its own
/// source, so implementations only need to be `Send`.
pub trait ImageSource: Send {
    /// Number of stored resolution levels
    fn resolution_level_count(&self) -> usize;

    /// Pixel `(width, height)` of a level
    fn pixel_dimensions(&self, level: usize) -> CropResult<(u64, u64)> {
        let extents = self.axis_extents(level)?;
        Ok((extents.width, extents.height))
    }

    /// Extents of a level along x, y, z, c and t
    fn axis_extents(&self, level: usize) -> CropResult<AxisExtents>;

    /// Read a window of a level as a dense `(x, y, z, c, t)` volume
    fn read_window(&mut self, level: usize, request: &WindowRequest) -> CropResult<Volume>;

    /// Name of the image without directory or extension
    ///
    /// Names the image directory and every container of a crop run.
    fn base_name(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extents() -> AxisExtents {
        AxisExtents { width: 100, height: 50, z_count: 1, channel_count: 3, t_count: 1 }
    }

    #[test]
    fn full_request_spans_non_spatial_axes() {
        let request = extents().full_request(10..20, 5..6);
        assert_eq!(request.z, 0..1);
        assert_eq!(request.c, 0..3);
        assert_eq!(request.t, 0..1);
        assert_eq!(request.shape(), [10, 1, 1, 3, 1]);
    }

    #[test]
    fn validate_rejects_out_of_range_axes() {
        let extents = extents();
        assert!(extents.full_request(0..100, 0..50).validate(&extents).is_ok());
        assert!(extents.full_request(0..101, 0..50).validate(&extents).is_err());
        assert!(extents.full_request(0..10, 40..51).validate(&extents).is_err());

        let mut request = extents.full_request(0..10, 0..10);
        request.c = 0..4;
        assert!(request.validate(&extents).is_err());
    }
}
