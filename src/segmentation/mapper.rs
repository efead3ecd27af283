//! Mapping of reference boxes onto resolution levels
//!
//! The crop pipeline asks for the same box at every level of an image
//! pyramid. Each request is answered from the store's reference dimensions
//! and the level's reported pixel size. Nothing is cached between levels,
//! and no ratio between adjacent levels is assumed.

use std::fmt;
use std::ops::Range;

use log::debug;

use crate::errors::{CropError, CropResult};
use super::image_segmentation::ImageSegmentation;
use super::segment::Segment;

// Scaled coordinates this close to an integer are treated as that integer
const SNAP_EPSILON: f64 = 1e-6;

/// Half-open pixel ranges of a box at one resolution level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelWindow {
    /// Columns `[start, end)`
    pub x: Range<u64>,
    /// Rows `[start, end)`
    pub y: Range<u64>,
}

impl PixelWindow {
    /// Width in pixels
    pub fn width(&self) -> u64 {
        self.x.end - self.x.start
    }

    /// Height in pixels
    pub fn height(&self) -> u64 {
        self.y.end - self.y.start
    }

    /// Whether the window covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

impl fmt::Display for PixelWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x[{}, {}) y[{}, {})", self.x.start, self.x.end, self.y.start, self.y.end)
    }
}

/// Converts boxes of a segmentation into coordinates of a resolution level
#[derive(Debug, Clone, Copy)]
pub struct ResolutionMapper<'a> {
    segmentation: &'a ImageSegmentation,
}

impl<'a> ResolutionMapper<'a> {
    /// Create a mapper over a segmentation defined at the base resolution
    pub fn new(segmentation: &'a ImageSegmentation) -> Self {
        ResolutionMapper { segmentation }
    }

    /// Box `index` scaled to a level of `level_dims = (width, height)` pixels
    ///
    /// Equivalent to `segmentation.scaled(width, height)[index]`.
    pub fn scaled_segment(&self, index: usize, level_dims: (u64, u64)) -> CropResult<Segment> {
        let (width, height) = level_dims;
        self.segmentation.scaled_segment(index, width as f64, height as f64)
    }

    /// Box `index` as integer pixel ranges valid for the level
    ///
    /// Starts are floored and ends are ceiled so the window covers every
    /// pixel the box touches, then both are clamped to the level extent.
    /// A box that collapses to nothing at a coarse level is widened to a
    /// single pixel so every level still yields a frame.
    pub fn pixel_window(&self, index: usize, level_dims: (u64, u64)) -> CropResult<PixelWindow> {
        let (width, height) = level_dims;
        let segment = self.scaled_segment(index, level_dims)?;

        let x = Self::to_pixel_range(segment.x1, segment.x2, width)?;
        let y = Self::to_pixel_range(segment.y1, segment.y2, height)?;
        let window = PixelWindow { x, y };

        debug!("Segment {} at {}x{} maps to {} (scaled {})",
               index, width, height, window, segment);

        Ok(window)
    }

    fn to_pixel_range(start: f64, end: f64, extent: u64) -> CropResult<Range<u64>> {
        if extent == 0 {
            return Err(CropError::InvalidDimensions("resolution level has a zero extent".to_string()));
        }

        let start = Self::snap(start).floor().max(0.0) as u64;
        let end = Self::snap(end).ceil().max(0.0) as u64;

        let mut start = start.min(extent);
        let mut end = end.min(extent);

        if end <= start {
            if start >= extent {
                start = extent - 1;
            }
            end = start + 1;
        }

        Ok(start..end)
    }

    fn snap(value: f64) -> f64 {
        let rounded = value.round();
        if (value - rounded).abs() < SNAP_EPSILON {
            rounded
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thousand_store() -> ImageSegmentation {
        let mut store = ImageSegmentation::new(1000, 1000).unwrap();
        store.add(100.0, 100.0, 200.0, 200.0).unwrap();
        store
    }

    #[test]
    fn maps_each_level_from_the_reference() {
        let store = thousand_store();
        let mapper = ResolutionMapper::new(&store);

        let level0 = mapper.pixel_window(0, (1000, 1000)).unwrap();
        assert_eq!(level0, PixelWindow { x: 100..200, y: 100..200 });

        let level1 = mapper.pixel_window(0, (500, 500)).unwrap();
        assert_eq!(level1, PixelWindow { x: 50..100, y: 50..100 });
    }

    #[test]
    fn scaled_segment_is_scaled_index() {
        let store = thousand_store();
        let mapper = ResolutionMapper::new(&store);
        let expected = store.scaled(333.0, 777.0).unwrap()[0];
        assert_eq!(mapper.scaled_segment(0, (333, 777)).unwrap(), expected);
    }

    #[test]
    fn tolerates_non_integer_level_ratios() {
        let store = thousand_store();
        let mapper = ResolutionMapper::new(&store);

        // 100 * 0.333 = 33.3 and 200 * 0.333 = 66.6
        let window = mapper.pixel_window(0, (333, 333)).unwrap();
        assert_eq!(window, PixelWindow { x: 33..67, y: 33..67 });
    }

    #[test]
    fn tiny_levels_still_yield_one_pixel() {
        let mut store = ImageSegmentation::new(1000, 1000).unwrap();
        store.add(998.0, 998.0, 1000.0, 1000.0).unwrap();
        store.add(10.0, 10.0, 10.0, 10.0).unwrap();
        let mapper = ResolutionMapper::new(&store);

        let corner = mapper.pixel_window(0, (1, 1)).unwrap();
        assert_eq!(corner, PixelWindow { x: 0..1, y: 0..1 });

        let degenerate = mapper.pixel_window(1, (1000, 1000)).unwrap();
        assert_eq!(degenerate, PixelWindow { x: 10..11, y: 10..11 });
    }

    #[test]
    fn rejects_unknown_index_and_zero_levels() {
        let store = thousand_store();
        let mapper = ResolutionMapper::new(&store);
        assert!(matches!(
            mapper.pixel_window(1, (10, 10)),
            Err(CropError::SegmentIndexOutOfRange { .. })
        ));
        assert!(mapper.pixel_window(0, (0, 10)).is_err());
    }
}
