//! Segment store for one reference coordinate space
//!
//! An `ImageSegmentation` holds boxes defined against a fixed reference
//! width and height (usually the base resolution of an image). Boxes are
//! validated on insertion and never mutated afterwards. Every rescaling
//! starts from the reference dimensions, so asking for many pyramid levels
//! in a row never compounds rounding error from a previous result.

use log::debug;

use crate::errors::{CropError, CropResult};
use super::segment::Segment;

/// Append-only collection of boxes in a reference coordinate space
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSegmentation {
    /// Reference width all boxes are defined in
    width: u32,
    /// Reference height all boxes are defined in
    height: u32,
    /// Accepted boxes in insertion order
    segments: Vec<Segment>,
}

impl ImageSegmentation {
    /// Create an empty store for a `width` x `height` reference space
    pub fn new(width: u32, height: u32) -> CropResult<Self> {
        if width == 0 || height == 0 {
            return Err(CropError::InvalidDimensions(format!(
                "reference space must be positive, got {}x{}",
                width, height
            )));
        }

        Ok(ImageSegmentation {
            width,
            height,
            segments: Vec::new(),
        })
    }

    /// Reference width
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Reference height
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of boxes
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the store holds no boxes
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Boxes in insertion order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Box at `index` in reference coordinates
    pub fn get(&self, index: usize) -> CropResult<Segment> {
        self.segments
            .get(index)
            .copied()
            .ok_or(CropError::SegmentIndexOutOfRange { index, len: self.segments.len() })
    }

    /// Add a box `(x1, y1)-(x2, y2)` in reference coordinates
    ///
    /// Fails with `InvalidSegment` when a coordinate is negative or not
    /// finite, when x lies beyond the reference width or y beyond the
    /// reference height, or when the corners are inverted.
    pub fn add(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> CropResult<()> {
        self.push(Segment::new(x1, y1, x2, y2))
    }

    /// Add an already constructed segment, with the same validation as `add`
    pub fn push(&mut self, segment: Segment) -> CropResult<()> {
        if !self.is_valid(&segment) {
            return Err(CropError::InvalidSegment {
                x1: segment.x1,
                y1: segment.y1,
                x2: segment.x2,
                y2: segment.y2,
                width: self.width,
                height: self.height,
            });
        }

        debug!("Adding segment {} to {}x{} segmentation", segment, self.width, self.height);
        self.segments.push(segment);
        Ok(())
    }

    fn is_valid(&self, segment: &Segment) -> bool {
        let width = self.width as f64;
        let height = self.height as f64;
        let coords = segment.to_array();

        // NaN fails every comparison, so spell the checks as positive ranges
        coords.iter().all(|c| c.is_finite() && *c >= 0.0)
            && segment.x1 <= width
            && segment.x2 <= width
            && segment.y1 <= height
            && segment.y2 <= height
            && segment.x1 <= segment.x2
            && segment.y1 <= segment.y2
    }

    fn scale_factors(&self, target_width: f64, target_height: f64) -> CropResult<(f64, f64)> {
        if !(target_width > 0.0 && target_height > 0.0) || !target_width.is_finite() || !target_height.is_finite() {
            return Err(CropError::InvalidDimensions(format!(
                "scaling target must be positive, got {}x{}",
                target_width, target_height
            )));
        }

        Ok((target_width / self.width as f64, target_height / self.height as f64))
    }

    /// Boxes rescaled into a `target_width` x `target_height` space
    ///
    /// X coordinates are multiplied by `target_width / W` and y coordinates
    /// by `target_height / H`. The result is a fresh vector; the store is
    /// unchanged.
    pub fn scaled(&self, target_width: f64, target_height: f64) -> CropResult<Vec<Segment>> {
        let (scale_x, scale_y) = self.scale_factors(target_width, target_height)?;

        Ok(self.segments
            .iter()
            .map(|segment| segment.scale(scale_x, scale_y))
            .collect())
    }

    /// A single box rescaled into a `target_width` x `target_height` space
    ///
    /// Same result as `scaled(target_width, target_height)[index]` without
    /// materialising the other boxes.
    pub fn scaled_segment(&self, index: usize, target_width: f64, target_height: f64) -> CropResult<Segment> {
        let (scale_x, scale_y) = self.scale_factors(target_width, target_height)?;
        Ok(self.get(index)?.scale(scale_x, scale_y))
    }

    /// Boxes as fractions of the reference dimensions, all within `[0, 1]`
    pub fn normalized(&self) -> Vec<Segment> {
        // Reference dimensions are positive, so a unit target cannot fail
        let (scale_x, scale_y) = (1.0 / self.width as f64, 1.0 / self.height as f64);
        self.segments
            .iter()
            .map(|segment| segment.scale(scale_x, scale_y))
            .collect()
    }

    /// The box with the largest area; the earliest box wins ties
    pub fn largest(&self) -> CropResult<Segment> {
        let mut iter = self.segments.iter();
        let mut best = *iter.next().ok_or(CropError::EmptyStore)?;
        let mut best_area = best.area();

        for segment in iter {
            let area = segment.area();
            if area > best_area {
                best = *segment;
                best_area = area;
            }
        }

        Ok(best)
    }

    /// New store with every box grown or shrunk about its centre by `factor`
    ///
    /// The original store is left untouched. Each recomputed box goes
    /// through the same validation as `add`, so growing a box past the
    /// reference bounds fails with `InvalidSegment`.
    pub fn resized(&self, factor: f64) -> CropResult<ImageSegmentation> {
        let mut resized = ImageSegmentation::new(self.width, self.height)?;
        for segment in &self.segments {
            resized.push(segment.resize_about_centre(factor))?;
        }

        Ok(resized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn example_store() -> ImageSegmentation {
        let mut store = ImageSegmentation::new(100, 100).unwrap();
        store.add(10.0, 10.0, 20.0, 20.0).unwrap();
        store.add(0.0, 0.0, 100.0, 100.0).unwrap();
        store
    }

    #[test]
    fn rejects_zero_reference_dimensions() {
        assert!(matches!(ImageSegmentation::new(0, 10), Err(CropError::InvalidDimensions(_))));
        assert!(matches!(ImageSegmentation::new(10, 0), Err(CropError::InvalidDimensions(_))));
    }

    #[test]
    fn accepts_valid_boxes_unchanged() {
        let mut store = ImageSegmentation::new(50, 40).unwrap();
        let boxes = [
            (0.0, 0.0, 0.0, 0.0),
            (0.0, 0.0, 50.0, 40.0),
            (5.0, 5.0, 5.0, 30.0),
            (12.5, 7.25, 49.0, 39.5),
        ];

        for (x1, y1, x2, y2) in boxes {
            store.add(x1, y1, x2, y2).unwrap();
        }

        assert_eq!(store.len(), boxes.len());
        for (i, (x1, y1, x2, y2)) in boxes.iter().enumerate() {
            assert_eq!(store.get(i).unwrap(), Segment::new(*x1, *y1, *x2, *y2));
        }
    }

    #[test]
    fn rejects_invalid_boxes() {
        let mut store = ImageSegmentation::new(50, 40).unwrap();
        let invalid = [
            (-1.0, 0.0, 10.0, 10.0),
            (0.0, -0.5, 10.0, 10.0),
            (0.0, 0.0, 51.0, 10.0),
            (0.0, 0.0, 10.0, 41.0),
            (60.0, 0.0, 70.0, 10.0),
            (0.0, 45.0, 10.0, 46.0),
            (20.0, 0.0, 10.0, 10.0),
            (0.0, 20.0, 10.0, 10.0),
            (f64::NAN, 0.0, 10.0, 10.0),
            (0.0, 0.0, f64::INFINITY, 10.0),
        ];

        for (x1, y1, x2, y2) in invalid {
            let result = store.add(x1, y1, x2, y2);
            assert!(
                matches!(result, Err(CropError::InvalidSegment { .. })),
                "expected rejection of ({}, {}, {}, {})", x1, y1, x2, y2
            );
        }

        assert!(store.is_empty());
    }

    #[test]
    fn overlapping_and_duplicate_boxes_are_allowed() {
        let mut store = ImageSegmentation::new(10, 10).unwrap();
        store.add(1.0, 1.0, 5.0, 5.0).unwrap();
        store.add(1.0, 1.0, 5.0, 5.0).unwrap();
        store.add(3.0, 3.0, 8.0, 8.0).unwrap();
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn scaled_matches_documented_example() {
        let scaled = example_store().scaled(50.0, 50.0).unwrap();
        assert_eq!(scaled, vec![
            Segment::new(5.0, 5.0, 10.0, 10.0),
            Segment::new(0.0, 0.0, 50.0, 50.0),
        ]);
    }

    #[test]
    fn scaling_to_reference_is_identity() {
        let store = example_store();
        let scaled = store.scaled(100.0, 100.0).unwrap();
        assert_eq!(scaled.as_slice(), store.segments());
    }

    #[test]
    fn scaling_uses_independent_axis_ratios() {
        let mut store = ImageSegmentation::new(200, 100).unwrap();
        store.add(20.0, 10.0, 100.0, 50.0).unwrap();
        let scaled = store.scaled(100.0, 400.0).unwrap();
        assert_eq!(scaled[0], Segment::new(10.0, 40.0, 50.0, 200.0));
    }

    #[test]
    fn scaling_rejects_non_positive_targets() {
        let store = example_store();
        assert!(store.scaled(0.0, 10.0).is_err());
        assert!(store.scaled(10.0, -1.0).is_err());
        assert!(store.scaled(f64::NAN, 10.0).is_err());
    }

    #[test]
    fn empty_store_scales_to_empty() {
        let store = ImageSegmentation::new(10, 10).unwrap();
        assert!(store.scaled(5.0, 5.0).unwrap().is_empty());
        assert!(store.normalized().is_empty());
    }

    #[test]
    fn normalized_round_trips_to_reference() {
        let mut store = ImageSegmentation::new(1337, 911).unwrap();
        store.add(13.0, 17.0, 1000.0, 900.0).unwrap();
        store.add(0.0, 0.0, 1337.0, 911.0).unwrap();
        store.add(512.5, 3.0, 700.25, 4.0).unwrap();

        for segment in store.normalized() {
            for c in segment.to_array() {
                assert!((0.0..=1.0).contains(&c));
            }
        }

        let (w, h) = (store.width() as f64, store.height() as f64);
        for (restored, original) in store.normalized().iter().zip(store.segments()) {
            let restored = restored.scale(w, h);
            assert!(restored.approx_eq(original, 1e-6), "{} != {}", restored, original);
        }
    }

    #[test]
    fn repeated_scaling_does_not_drift() {
        let mut store = ImageSegmentation::new(100_000, 80_000).unwrap();
        store.add(12_345.0, 6_789.0, 54_321.0, 45_678.0).unwrap();

        let levels = [(100_000.0, 80_000.0), (97.0, 78.0), (3.0, 2.0), (50_000.0, 40_000.0)];
        for _ in 0..100 {
            for (w, h) in levels {
                store.scaled(w, h).unwrap();
            }
        }

        let last = store.scaled(50_000.0, 40_000.0).unwrap();
        assert_eq!(last[0], Segment::new(6_172.5, 3_394.5, 27_160.5, 22_839.0));
    }

    #[test]
    fn scaled_segment_matches_scaled_index() {
        let store = example_store();
        for index in 0..store.len() {
            let all = store.scaled(37.0, 91.0).unwrap();
            assert_eq!(store.scaled_segment(index, 37.0, 91.0).unwrap(), all[index]);
        }
        assert!(matches!(
            store.scaled_segment(2, 37.0, 91.0),
            Err(CropError::SegmentIndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn largest_finds_maximum_area() {
        assert_eq!(example_store().largest().unwrap(), Segment::new(0.0, 0.0, 100.0, 100.0));

        let mut single = ImageSegmentation::new(10, 10).unwrap();
        single.add(1.0, 2.0, 3.0, 4.0).unwrap();
        assert_eq!(single.largest().unwrap(), Segment::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn largest_prefers_first_on_ties() {
        let mut store = ImageSegmentation::new(100, 100).unwrap();
        store.add(0.0, 0.0, 10.0, 20.0).unwrap();
        store.add(50.0, 50.0, 70.0, 60.0).unwrap();
        assert_eq!(store.largest().unwrap(), Segment::new(0.0, 0.0, 10.0, 20.0));
    }

    #[test]
    fn largest_on_empty_store_fails() {
        let store = ImageSegmentation::new(10, 10).unwrap();
        assert!(matches!(store.largest(), Err(CropError::EmptyStore)));
    }

    #[test]
    fn resized_by_one_is_a_no_op() {
        let store = example_store();
        let resized = store.resized(1.0).unwrap();
        for (a, b) in resized.segments().iter().zip(store.segments()) {
            assert!(a.approx_eq(b, TOLERANCE));
        }
    }

    #[test]
    fn resized_by_two_doubles_extents_about_centre() {
        let mut store = ImageSegmentation::new(100, 100).unwrap();
        store.add(40.0, 30.0, 50.0, 60.0).unwrap();

        let resized = store.resized(2.0).unwrap();
        let original = store.get(0).unwrap();
        let grown = resized.get(0).unwrap();

        assert!((grown.width() - 2.0 * original.width()).abs() < TOLERANCE);
        assert!((grown.height() - 2.0 * original.height()).abs() < TOLERANCE);
        assert_eq!(grown.centre(), original.centre());
        assert_eq!(resized.width(), store.width());
        assert_eq!(resized.height(), store.height());
    }

    #[test]
    fn resized_shrinks_and_keeps_original() {
        let store = example_store();
        let shrunk = store.resized(0.5).unwrap();
        assert_eq!(shrunk.get(1).unwrap(), Segment::new(25.0, 25.0, 75.0, 75.0));
        assert_eq!(store.get(1).unwrap(), Segment::new(0.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn resized_past_bounds_fails() {
        let store = example_store();
        assert!(matches!(store.resized(1.5), Err(CropError::InvalidSegment { .. })));
    }
}
