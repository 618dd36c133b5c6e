//! Decoded frames and raw pixel buffers — decoder output, display input.

use std::fmt;

use serde::{Deserialize, Serialize};

use po_intervals::Interval;

use crate::types::{Resolution, Seconds};

/// Pixel layouts a decoder may produce.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgba8,
    Nv12,
    Yuv420p,
}

impl PixelFormat {
    /// Byte size of one frame at the given resolution.
    pub fn byte_size(self, resolution: Resolution) -> usize {
        match self {
            Self::Rgba8 => resolution.rgba_byte_size(),
            Self::Nv12 | Self::Yuv420p => resolution.nv12_byte_size(),
        }
    }
}

/// Raw decoded pixel data, CPU-side, ready for GPU upload.
#[derive(Clone)]
pub struct ImageBuffer {
    pub resolution: Resolution,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl ImageBuffer {
    /// Create a new buffer.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not match the resolution and format.
    pub fn new(resolution: Resolution, format: PixelFormat, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            format.byte_size(resolution),
            "pixel data length must match resolution and format"
        );
        Self {
            resolution,
            format,
            data,
        }
    }

    pub fn byte_size(&self) -> usize {
        self.data.len()
    }
}

impl fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("resolution", &self.resolution)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// One decoded frame as produced by a media decoder.
#[derive(Clone, Debug)]
pub struct MediaFrame {
    /// Presentation span: `begin` is this frame's timestamp, `end` the
    /// next frame's (or an estimate at EOF).
    pub time: Interval<Seconds>,
    /// Decoded pixels.
    pub image: ImageBuffer,
    /// Whether the frame was coded as a key frame.
    pub is_key_frame: bool,
}
