//! Horizontal differencing predictor for 8-bit samples
//!
//! Each sample is stored as the difference to the same sample of the
//! previous pixel in its row, so the stride is the number of samples per
//! pixel rather than one byte.

/// Reverses horizontal differencing on the first `rows` rows of `data`
pub fn undo_horizontal_differencing(data: &mut [u8], row_pixels: usize, rows: usize, samples: usize) {
    let row_len = row_pixels * samples;
    if row_len == 0 {
        return;
    }

    for row in data.chunks_mut(row_len).take(rows) {
        for i in samples..row.len() {
            row[i] = row[i].wrapping_add(row[i - samples]);
        }
    }
}

/// Applies horizontal differencing to every row of `data`
pub fn apply_horizontal_differencing(data: &mut [u8], row_pixels: usize, samples: usize) {
    let row_len = row_pixels * samples;
    if row_len == 0 {
        return;
    }

    for row in data.chunks_mut(row_len) {
        for i in (samples..row.len()).rev() {
            row[i] = row[i].wrapping_sub(row[i - samples]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn differences_use_the_pixel_stride() {
        let original: Vec<u8> = vec![10, 20, 30, 12, 25, 29, 200, 5, 31,
                                     1, 2, 3, 4, 5, 6, 7, 8, 9];
        let mut data = original.clone();
        apply_horizontal_differencing(&mut data, 3, 3);
        assert_eq!(&data[..6], &[10, 20, 30, 2, 5, 255]);
        assert_eq!(&data[9..12], &[1, 2, 3]);

        undo_horizontal_differencing(&mut data, 3, 2, 3);
        assert_eq!(data, original);
    }

    #[test]
    fn undo_stops_after_requested_rows() {
        let mut data = vec![1u8, 1, 1, 1];
        undo_horizontal_differencing(&mut data, 2, 1, 1);
        assert_eq!(data, vec![1, 2, 1, 1]);
    }
}
