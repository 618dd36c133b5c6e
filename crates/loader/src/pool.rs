//! Decoder pool — held decoder handles keyed by stream position.
//!
//! Seeking is the dominant latency in hardware decoders, so the loader
//! hangs on to decoders between passes and picks whichever one sits
//! closest behind the next region it has to fill. The pool is a plain
//! ordered map from each decoder's current position (the timestamp the
//! next produced frame will begin at) to the handle itself.
//!
//! The pool is bounded: past its capacity the entry farthest *behind*
//! is evicted first, since playback advances forward and a decoder far
//! behind the playhead is the least likely to be reused.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use po_common::{MediaDecoder, Seconds};

/// Bounded collection of `(position, decoder)` entries.
///
/// Worker-private: the loader's worker thread owns its pool outright,
/// so no synchronization is needed here.
pub struct DecoderPool {
    decoders: BTreeMap<Seconds, Box<dyn MediaDecoder>>,
    max_decoders: usize,
}

impl DecoderPool {
    /// Create a pool holding at most `max_decoders` entries.
    ///
    /// # Panics
    ///
    /// Panics if `max_decoders` is zero.
    pub fn new(max_decoders: usize) -> Self {
        assert!(max_decoders > 0, "max_decoders must be > 0");
        Self {
            decoders: BTreeMap::new(),
            max_decoders,
        }
    }

    /// Remove and return the entry best placed to reach `t`: the one
    /// with the largest position at-or-before `t` (exact match
    /// preferred), or failing that the smallest entry, so the caller
    /// seeks forward as little as possible. `None` only when empty.
    pub fn take_at_or_before(&mut self, t: Seconds) -> Option<(Seconds, Box<dyn MediaDecoder>)> {
        let key = self
            .decoders
            .range(..=t)
            .next_back()
            .map(|(&k, _)| k)
            .or_else(|| self.decoders.keys().next().copied())?;
        let decoder = self.decoders.remove(&key).expect("key just looked up");
        Some((key, decoder))
    }

    /// Remove and return the entry at exactly `position`, if any.
    pub fn extract(&mut self, position: Seconds) -> Option<Box<dyn MediaDecoder>> {
        self.decoders.remove(&position)
    }

    /// Add a decoder at its current position. If an entry already holds
    /// that position the incoming decoder is dropped (the first one
    /// wins). If the pool then exceeds capacity, entries are evicted
    /// from the lowest position up.
    pub fn insert(&mut self, position: Seconds, decoder: Box<dyn MediaDecoder>) {
        match self.decoders.entry(position) {
            Entry::Occupied(_) => {}
            Entry::Vacant(vacant) => {
                vacant.insert(decoder);
            }
        }
        while self.decoders.len() > self.max_decoders {
            let behind = *self.decoders.keys().next().expect("pool is non-empty");
            self.decoders.remove(&behind);
        }
    }

    /// Number of held decoders.
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Whether the pool holds no decoders.
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Configured capacity.
    pub fn max_decoders(&self) -> usize {
        self.max_decoders
    }

    /// Positions of all held decoders, ascending.
    pub fn positions(&self) -> Vec<Seconds> {
        self.decoders.keys().copied().collect()
    }

    /// Drop all held decoders.
    pub fn clear(&mut self) {
        self.decoders.clear();
    }
}

impl fmt::Debug for DecoderPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderPool")
            .field("positions", &self.positions())
            .field("max_decoders", &self.max_decoders)
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────────
