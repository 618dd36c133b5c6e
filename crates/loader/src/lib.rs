//! `po-loader` — Frame caching and preload.
//!
//! Keeps decoded frames resident in GPU memory just ahead of playback.
//! A caller describes the time regions it cares about as an interval
//! set; one worker thread per media file compares that against what is
//! already cached, drives a decoder to fill the gaps, uploads each
//! frame through the display driver, and fires a caller-supplied signal
//! whenever new frames might change a scheduling decision.
//!
//! ## Module Overview
//!
//! - [`loader`] — the [`FrameLoader`] worker and its [`Loaded`] snapshot
//! - [`pool`] — position-keyed decoder retention with bounded capacity
//! - [`signal`] — the wake-one [`Signal`] primitive
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use po_intervals::{Interval, IntervalSet};
//! use po_common::Seconds;
//! use po_loader::{FrameLoader, Signal};
//!
//! let loader = FrameLoader::new(display, "movie.mp4", open_media_decoder)?;
//!
//! let mut wanted = IntervalSet::new();
//! wanted.insert(Interval::new(Seconds::ZERO, Seconds::from_secs(0.5)));
//! let notify = Arc::new(Signal::new());
//! loader.set_request(&wanted, Some(notify.clone()));
//!
//! notify.wait();
//! for (time, image) in &loader.loaded().frames {
//!     // schedule `image` for display at `time`...
//! }
//! ```

pub mod loader;
pub mod pool;
pub mod signal;

// Re-export primary types.
pub use loader::{DecoderOpener, FrameLoader, Loaded, LoaderStats};
pub use pool::DecoderPool;
pub use signal::Signal;
