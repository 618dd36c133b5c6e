//! Frame loader — asynchronous interval-driven frame cache.
//!
//! Architecture:
//!
//! ```text
//! Caller threads                  Loader worker thread
//! ┌──────────────────┐           ┌───────────────────────────┐
//! │ set_request()    │── wake ──►│ loop:                     │
//! │  - replace wanted│           │   needed = wanted - done  │
//! │  - drop shrunk   │           │            - [eof, ∞)     │
//! │ loaded()         │◄─ notify ─│   pick decoder, seek,     │
//! │  - snapshot      │           │   decode 1 frame, upload  │
//! └──────────────────┘           │   reclassify vs wanted    │
//!                                └───────────────────────────┘
//! ```
//!
//! One mutex guards the small shared state record (`wanted`, the cache,
//! the notify signal, the shutdown flag). The worker drops the lock
//! around every blocking decoder or GPU call and re-checks the frame
//! against `wanted` after re-locking, so a request that shrinks during
//! a decode can never leak frames into the cache. Decoders are retained
//! between passes keyed by position; a decoder parked exactly at the
//! end of a wanted interval survives idle periods because a forward
//! extension of the request can resume it without a seek.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::thread;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, trace, warn};

use po_common::{
    DecodeError, DisplayDriver, EngineError, EngineResult, ImageHandle, LoaderConfig, MediaDecoder,
    MediaFrame, Seconds,
};
use po_intervals::{Interval, IntervalSet};

use crate::pool::DecoderPool;
use crate::signal::Signal;

/// Opens a decoder for a media file. Invoked lazily on the worker
/// thread, possibly several times (one decoder per concurrently filled
/// region).
pub type DecoderOpener = Box<dyn Fn(&str) -> Result<Box<dyn MediaDecoder>, DecodeError> + Send>;

// ---------------------------------------------------------------------------
// Cache snapshot
// ---------------------------------------------------------------------------

/// The frames loaded so far, observed via [`FrameLoader::loaded`].
///
/// `done` records every region that has been fully examined: a frame
/// was stored there, the region lies past EOF, or a recoverable failure
/// was swallowed there. Every key of `frames` lies inside `done`, and
/// `done` never extends past `eof` once EOF is known.
#[derive(Clone, Default)]
pub struct Loaded {
    /// Loaded frames keyed by presentation time, ascending.
    pub frames: BTreeMap<Seconds, ImageHandle>,
    /// Regions that are fully examined.
    pub done: IntervalSet<Seconds>,
    /// Where EOF is, if known.
    pub eof: Option<Seconds>,
}

impl fmt::Debug for Loaded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loaded")
            .field("frames", &self.frames.len())
            .field("done", &format_args!("{}", self.done))
            .field("eof", &self.eof)
            .finish()
    }
}

/// Running counters for loader activity, observed via
/// [`FrameLoader::stats`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Worker passes started (including ones that found nothing to do).
    pub passes: u64,
    /// Frames decoded, uploaded, and stored in the cache.
    pub frames_loaded: u64,
    /// Frames decoded but not stored (request shrank, or the frame
    /// started before the region of interest).
    pub frames_discarded: u64,
    /// Decoder open attempts.
    pub decoders_opened: u64,
    /// Seeks issued to decoders.
    pub seeks: u64,
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

struct LoaderState {
    wanted: IntervalSet<Seconds>,
    notify: Option<Arc<Signal>>,
    load: Loaded,
    stats: LoaderStats,
    shutdown: bool,
}

struct Shared {
    state: Mutex<LoaderState>,
    wakeup: Signal,
}

// ---------------------------------------------------------------------------
// Frame loader
// ---------------------------------------------------------------------------

/// Asynchronous frame cache for one media file.
///
/// Owns one worker thread that keeps decoded frames resident in GPU
/// memory for whichever time intervals the caller currently wants.
/// Dropping the loader signals the worker to shut down and joins it;
/// frames whose handles consumers still hold outlive the loader.
pub struct FrameLoader {
    shared: Arc<Shared>,
    thread: Option<thread::JoinHandle<()>>,
    filename: String,
}

impl FrameLoader {
    /// Create a loader for `filename` and spawn its worker. The worker
    /// opens decoders lazily through `opener`, uploads decoded frames
    /// through `display`, and parks until the first request arrives.
    pub fn new(
        display: Arc<dyn DisplayDriver>,
        filename: impl Into<String>,
        opener: impl Fn(&str) -> Result<Box<dyn MediaDecoder>, DecodeError> + Send + 'static,
    ) -> EngineResult<Self> {
        Self::with_config(display, filename, opener, LoaderConfig::default())
    }

    /// Like [`FrameLoader::new`] with explicit configuration.
    ///
    /// # Panics
    ///
    /// Panics if `config.max_decoders` is zero.
    pub fn with_config(
        display: Arc<dyn DisplayDriver>,
        filename: impl Into<String>,
        opener: impl Fn(&str) -> Result<Box<dyn MediaDecoder>, DecodeError> + Send + 'static,
        config: LoaderConfig,
    ) -> EngineResult<Self> {
        assert!(config.max_decoders > 0, "max_decoders must be > 0");
        let filename = filename.into();

        let shared = Arc::new(Shared {
            state: Mutex::new(LoaderState {
                wanted: IntervalSet::new(),
                notify: None,
                load: Loaded::default(),
                stats: LoaderStats::default(),
                shutdown: false,
            }),
            wakeup: Signal::new(),
        });

        let worker = Worker {
            shared: shared.clone(),
            display,
            filename: filename.clone(),
            opener: Box::new(opener),
        };
        let thread = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || worker.run(config.max_decoders))
            .map_err(EngineError::Io)?;

        Ok(Self {
            shared,
            thread: Some(thread),
            filename,
        })
    }

    /// Replace the set of intervals to keep loaded, discarding cached
    /// frames outside them before returning. `notify`, if given, is set
    /// by the worker after any pass that made observable progress.
    /// Setting a request equal to the current one does no work and
    /// wakes nobody.
    pub fn set_request(&self, wanted: &IntervalSet<Seconds>, notify: Option<Arc<Signal>>) {
        let mut state = self.shared.state.lock();
        state.notify = notify;

        if *wanted == state.wanted {
            trace!(file = %self.filename, request = %wanted, "request unchanged");
            return;
        }
        trace!(file = %self.filename, request = %wanted, "request");

        // Drop everything outside the new request up front, so a
        // loaded() call right after this one observes the narrowed
        // cache.
        let mut to_erase = state.load.done.clone();
        to_erase.erase_set(wanted);
        if !to_erase.is_empty() {
            trace!(erase = %to_erase, "dropping cache outside request");
        }
        for erase in to_erase.iter() {
            state.load.done.erase(erase);
            let stale: Vec<Seconds> = state
                .load
                .frames
                .range(erase.begin..erase.end)
                .map(|(&key, _)| key)
                .collect();
            for key in stale {
                state.load.frames.remove(&key);
            }
        }

        state.wanted = wanted.clone();
        drop(state);
        self.shared.wakeup.set();
    }

    /// A consistent snapshot of the cache.
    pub fn loaded(&self) -> Loaded {
        self.shared.state.lock().load.clone()
    }

    /// A consistent snapshot of the activity counters.
    pub fn stats(&self) -> LoaderStats {
        self.shared.state.lock().stats
    }

    /// The media file this loader serves.
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl Drop for FrameLoader {
    fn drop(&mut self) {
        debug!(file = %self.filename, "stopping loader thread");
        self.shared.state.lock().shutdown = true;
        self.shared.wakeup.set();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl fmt::Debug for FrameLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameLoader")
            .field("filename", &self.filename)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

struct Worker {
    shared: Arc<Shared>,
    display: Arc<dyn DisplayDriver>,
    filename: String,
    opener: DecoderOpener,
}

impl Worker {
    fn run(self, max_decoders: usize) {
        debug!(file = %self.filename, "loader thread running");

        let mut pool = DecoderPool::new(max_decoders);
        let mut state = self.shared.state.lock();

        while !state.shutdown {
            state.stats.passes += 1;
            trace!(file = %self.filename, wanted = %state.wanted, "load pass");

            // Hold on to decoders parked exactly at the end of a wanted
            // interval; they resume without a seek if the request is
            // extended forward past that point.
            let mut keep = DecoderPool::new(max_decoders);
            for want in state.wanted.iter() {
                if let Some(decoder) = pool.extract(want.end) {
                    trace!(at = %want.end, "keeping boundary decoder");
                    keep.insert(want.end, decoder);
                }
            }

            // needed = wanted - done - [eof, forever)
            let mut needed = state.wanted.clone();
            if let Some(eof) = state.load.eof {
                needed.erase(Interval::new(eof, Seconds::FOREVER));
            }
            needed.erase_set(&state.load.done);
            trace!(done = %state.load.done, needed = %needed, "regions");

            if needed.is_empty() {
                if !pool.is_empty() {
                    trace!(dropped = pool.len(), "recycling idle decoders");
                }
                pool = keep;
                MutexGuard::unlocked(&mut state, || self.shared.wakeup.wait());
                continue;
            }

            let mut changes = 0u32;
            for need in needed.iter() {
                if state.shutdown {
                    break;
                }

                // Reuse the decoder closest behind this region, else
                // open a fresh one (positioned at the stream start).
                let (mut position, mut decoder) = match pool.take_at_or_before(need.begin) {
                    Some((position, decoder)) => {
                        trace!(need = %need, reuse = %position, "reusing decoder");
                        (position, decoder)
                    }
                    None => {
                        trace!(need = %need, "opening decoder");
                        state.stats.decoders_opened += 1;
                        match (self.opener)(&self.filename) {
                            Ok(decoder) => (Seconds::ZERO, decoder),
                            Err(e) => {
                                error!(file = %self.filename, error = %e, "decoder open failed");
                                // Mark the region examined so a broken
                                // file cannot spin the worker.
                                state.load.done.insert(need);
                                changes += 1;
                                continue;
                            }
                        }
                    }
                };

                // Seek, decode one frame, and upload it with the lock
                // released; callers must never block on a decode.
                let mut seeked = false;
                let step = MutexGuard::unlocked(&mut state, || {
                    decode_step(
                        self.display.as_ref(),
                        &mut *decoder,
                        &mut position,
                        need,
                        &mut seeked,
                    )
                });
                if seeked {
                    state.stats.seeks += 1;
                }

                // The request may have changed while the lock was
                // released; classify the outcome against the current
                // wanted set.
                match step {
                    None => match state.load.eof {
                        Some(eof) if need.begin > eof => {
                            // A region past a known EOF is already
                            // excluded from every future needed
                            // computation; nothing to record.
                            debug!(at = %need.begin, eof = %eof, "EOF reported past known EOF");
                        }
                        Some(eof) if need.begin == eof => {
                            trace!(at = %eof, "EOF (already known)");
                        }
                        _ => {
                            debug!(at = %need.begin, "EOF discovered");
                            let past = Interval::new(need.begin, Seconds::FOREVER);
                            state.load.eof = Some(need.begin);
                            state.wanted.erase(past);
                            state.load.done.erase(past);
                            let stale: Vec<Seconds> = state
                                .load
                                .frames
                                .range(need.begin..)
                                .map(|(&key, _)| key)
                                .collect();
                            for key in stale {
                                state.load.frames.remove(&key);
                            }
                            changes += 1;
                        }
                    },
                    Some((time, image)) => {
                        // Probe the request around the frame: the
                        // interval holding need.begin must intersect
                        // the frame's span, and some interval must
                        // begin at-or-before the frame's end. A
                        // request that shrank mid-decode fails the
                        // probes; a frame the decoder skipped wholly
                        // past its region fails the intersection (the
                        // probes alone never see time.begin).
                        let overlap = match (
                            state.wanted.overlap_begin(need.begin),
                            state.wanted.overlap_end(time.end),
                        ) {
                            (Some(overlap), Some(_)) if overlap.overlaps(time) => Some(overlap),
                            _ => None,
                        };
                        match overlap {
                            None => {
                                // Drop the upload and leave the region
                                // unmarked so a later widen retries it.
                                trace!(frame = %time, "frame obsolete");
                                state.stats.frames_discarded += 1;
                                drop(image);
                            }
                            Some(overlap) if overlap.begin > time.begin => {
                                // The frame starts before the region of
                                // interest. Record the coverage so the
                                // region is not re-attempted, but skip
                                // storing an image nobody asked for.
                                trace!(frame = %time, overlap = %overlap, "frame partial");
                                state
                                    .load
                                    .done
                                    .insert(Interval::new(overlap.begin, time.end));
                                state.stats.frames_discarded += 1;
                                changes += 1;
                            }
                            Some(overlap) => {
                                trace!(frame = %time, overlap = %overlap, "frame stored");
                                state.load.done.insert(time);
                                state.load.frames.insert(time.begin, image);
                                state.stats.frames_loaded += 1;
                                changes += 1;
                            }
                        }
                    }
                }

                // Keep the decoder just used, at its updated position.
                keep.insert(position, decoder);
            }

            if !pool.is_empty() {
                trace!(dropped = pool.len(), "recycling decoders after pass");
            }
            pool = keep;

            trace!(changes, "load pass complete");
            if changes > 0 {
                if let Some(notify) = &state.notify {
                    notify.set();
                }
            }
        }

        debug!(file = %self.filename, "loader thread ending");
    }
}

/// One unlocked decode step: seek if the decoder is not already at the
/// region start, pull one frame, upload it to the GPU, and advance the
/// recorded position. Any failure is swallowed with a warning and
/// reported as `None`, which the caller treats as EOF for this region
/// so a single bad frame cannot stall the loader.
fn decode_step(
    display: &dyn DisplayDriver,
    decoder: &mut dyn MediaDecoder,
    position: &mut Seconds,
    need: Interval<Seconds>,
    seeked: &mut bool,
) -> Option<(Interval<Seconds>, ImageHandle)> {
    let result = (|| -> Result<Option<(Interval<Seconds>, ImageHandle)>, EngineError> {
        if *position != need.begin {
            trace!(from = %*position, to = %need.begin, "seek");
            decoder.seek_before(need.begin)?;
            *position = need.begin;
            *seeked = true;
        }

        let Some(frame) = decoder.next_frame()? else {
            return Ok(None);
        };
        let MediaFrame { time, image, .. } = frame;
        let handle = display.load_image(image)?;
        if time.end > *position {
            *position = time.end;
        }
        Ok(Some((time, handle)))
    })();

    match result {
        Ok(step) => step,
        Err(e) => {
            warn!(error = %e, "decode step failed, treating as EOF for this region");
            None
        }
    }
}
