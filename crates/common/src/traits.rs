//! External collaborator abstraction traits.
//!
//! These traits define the seams between the frame loader and the two
//! components it drives: a media decoder and a display driver. The
//! loader programs against these traits only; concrete hardware
//! implementations (V4L2, NVDEC, DRM/KMS, ...) live in their own crates
//! and plug in here. Tests substitute scripted doubles.

use std::sync::Arc;

use crate::error::{DecodeError, DisplayError};
use crate::frame::{ImageBuffer, MediaFrame};
use crate::types::{Resolution, Seconds};

/// A decoder positioned somewhere in one media file's video stream.
///
/// Positions advance only forward through [`next_frame`]; the only way
/// back is [`seek_before`].
///
/// [`next_frame`]: MediaDecoder::next_frame
/// [`seek_before`]: MediaDecoder::seek_before
pub trait MediaDecoder: Send {
    /// Position the decoder so that the next produced frame begins
    /// at-or-before `t` if possible, else at the earliest available
    /// point. The subsequent [`MediaDecoder::next_frame`] must not
    /// produce a frame whose `time.end <= t`, or a caller seeking to
    /// `t` would make no progress.
    fn seek_before(&mut self, t: Seconds) -> Result<(), DecodeError>;

    /// Produce the next frame in decoding order, monotonically
    /// advancing in presentation time. `Ok(None)` signals end of
    /// stream.
    fn next_frame(&mut self) -> Result<Option<MediaFrame>, DecodeError>;
}

/// A GPU-resident image uploaded through a [`DisplayDriver`].
///
/// Handles have shared ownership: the loader holds one reference and
/// consumers may hold more. The concrete driver releases the GPU
/// resource when the last [`ImageHandle`] clone drops.
pub trait LoadedImage: Send + Sync {
    /// Pixel dimensions of the uploaded image.
    fn resolution(&self) -> Resolution;
}

/// Shared-ownership handle to a GPU-resident decoded frame.
pub type ImageHandle = Arc<dyn LoadedImage>;

/// Interface to a GPU display device.
///
/// Internally synchronized: [`DisplayDriver::load_image`] may be called
/// from a loader worker thread concurrently with any other driver use.
pub trait DisplayDriver: Send + Sync {
    /// Upload pixel data into GPU memory and return a shared handle.
    fn load_image(&self, image: ImageBuffer) -> Result<ImageHandle, DisplayError>;
}
