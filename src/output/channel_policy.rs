//! Conversion of window slabs to RGB frames
//!
//! Output frames are always 8-bit RGB. How a slab with a different number
//! of channels is handled is chosen explicitly rather than guessed.

use std::fmt;
use std::str::FromStr;

use image::RgbImage;
use log::debug;

use crate::errors::{CropError, CropResult};
use crate::source::volume::Plane;

/// How slabs that are not 3-channel are turned into RGB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelPolicy {
    /// Only exactly three channels are accepted
    #[default]
    Strict,
    /// One channel is replicated to grey, two are padded with a zero
    /// blue channel, more than three keep the first three
    Fit,
}

impl ChannelPolicy {
    /// Convert an `(x, y, c)` slab into an RGB frame
    pub fn to_rgb(&self, plane: &Plane) -> CropResult<RgbImage> {
        let channels = plane.channels;

        if *self == ChannelPolicy::Strict && channels != 3 {
            return Err(CropError::UnsupportedChannels(channels));
        }
        if channels == 0 {
            return Err(CropError::UnsupportedChannels(0));
        }

        let data = if channels == 3 {
            plane.data.clone()
        } else {
            debug!("Fitting {}-channel slab to RGB", channels);
            let mut data = Vec::with_capacity(plane.width * plane.height * 3);
            for pixel in plane.data.chunks_exact(channels) {
                match pixel {
                    [grey] => data.extend_from_slice(&[*grey, *grey, *grey]),
                    [r, g] => data.extend_from_slice(&[*r, *g, 0]),
                    [r, g, b, ..] => data.extend_from_slice(&[*r, *g, *b]),
                    [] => {}
                }
            }
            data
        };

        RgbImage::from_raw(plane.width as u32, plane.height as u32, data)
            .ok_or_else(|| CropError::GenericError(format!(
                "Slab of {}x{} pixels does not match its sample count", plane.width, plane.height
            )))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChannelPolicy::Strict => "strict",
            ChannelPolicy::Fit => "fit",
        }
    }
}

impl FromStr for ChannelPolicy {
    type Err = CropError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(ChannelPolicy::Strict),
            "fit" => Ok(ChannelPolicy::Fit),
            other => Err(CropError::ConfigError(format!(
                "Unknown channel policy '{}', expected strict or fit", other
            ))),
        }
    }
}

impl fmt::Display for ChannelPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
