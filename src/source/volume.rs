//! Dense five-dimensional sample volumes
//!
//! A `Volume` is what a windowed read returns: every requested sample of a
//! resolution level, laid out with axis order `(x, y, z, c, t)`. Only the
//! requested window is ever materialised.

use crate::errors::{CropError, CropResult};

/// Axis positions inside `Volume::shape`
pub mod axis {
    pub const X: usize = 0;
    pub const Y: usize = 1;
    pub const Z: usize = 2;
    pub const C: usize = 3;
    pub const T: usize = 4;
}

/// Dense array of 8-bit samples with axis order `(x, y, z, c, t)`
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    /// Extent along x, y, z, c, t
    shape: [usize; 5],
    /// Samples, t varying fastest and x slowest
    data: Vec<u8>,
}

impl Volume {
    /// Create a zero-filled volume
    pub fn zeros(shape: [usize; 5]) -> Self {
        let len = shape.iter().product();
        Volume {
            shape,
            data: vec![0u8; len],
        }
    }

    /// Wrap existing samples, checking that their count matches the shape
    pub fn from_vec(shape: [usize; 5], data: Vec<u8>) -> CropResult<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(CropError::GenericError(format!(
                "Volume of shape {:?} needs {} samples, got {}",
                shape, expected, data.len()
            )));
        }

        Ok(Volume { shape, data })
    }

    /// Extents along `(x, y, z, c, t)`
    pub fn shape(&self) -> [usize; 5] {
        self.shape
    }

    /// Raw samples
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Total number of samples
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether any axis has zero extent
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn index(&self, x: usize, y: usize, z: usize, c: usize, t: usize) -> usize {
        let [_, ny, nz, nc, nt] = self.shape;
        (((x * ny + y) * nz + z) * nc + c) * nt + t
    }

    fn in_bounds(&self, coords: [usize; 5]) -> bool {
        coords.iter().zip(self.shape.iter()).all(|(v, n)| v < n)
    }

    /// Sample at `(x, y, z, c, t)`, if inside the volume
    pub fn get(&self, x: usize, y: usize, z: usize, c: usize, t: usize) -> Option<u8> {
        if !self.in_bounds([x, y, z, c, t]) {
            return None;
        }
        Some(self.data[self.index(x, y, z, c, t)])
    }

    /// Set the sample at `(x, y, z, c, t)`; out-of-range writes are ignored
    pub fn set(&mut self, x: usize, y: usize, z: usize, c: usize, t: usize, value: u8) -> bool {
        if !self.in_bounds([x, y, z, c, t]) {
            return false;
        }
        let idx = self.index(x, y, z, c, t);
        self.data[idx] = value;
        true
    }

    /// Select one z-plane and one time-plane as an `(x, y, c)` slab
    pub fn plane(&self, z: usize, t: usize) -> CropResult<Plane> {
        let [nx, ny, nz, nc, nt] = self.shape;
        if z >= nz || t >= nt {
            return Err(CropError::WindowOutOfBounds(format!(
                "plane z={} t={} outside volume with z={} t={}",
                z, t, nz, nt
            )));
        }

        let mut data = Vec::with_capacity(nx * ny * nc);
        for y in 0..ny {
            for x in 0..nx {
                for c in 0..nc {
                    data.push(self.data[self.index(x, y, z, c, t)]);
                }
            }
        }

        Ok(Plane {
            width: nx,
            height: ny,
            channels: nc,
            data,
        })
    }
}

/// A single 2-D slab with interleaved channels, stored row by row
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
    /// Samples per pixel
    pub channels: usize,
    /// Row-major interleaved samples
    pub data: Vec<u8>,
}

impl Plane {
    /// Samples of pixel `(x, y)`
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let start = (y * self.width + x) * self.channels;
        &self.data[start..start + self.channels]
    }
}
