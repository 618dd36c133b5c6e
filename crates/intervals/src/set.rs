//! Canonical ordered sets of half-open intervals.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

use crate::interval::Interval;

/// An ordered set of non-empty, non-overlapping, non-adjacent intervals.
///
/// Backed by a `BTreeMap` from each interval's `begin` to its `end`, so
/// every operation costs O(log n + k) where k is the number of stored
/// intervals it touches. Inserting an interval that overlaps or touches
/// existing ones coalesces them into a single entry; erasing a range out
/// of the middle of an entry splits it in two. The canonical form makes
/// equality, iteration order, and overlap lookups deterministic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntervalSet<T: Copy + Ord> {
    map: BTreeMap<T, T>,
}

impl<T: Copy + Ord> IntervalSet<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Returns `true` if the set holds no intervals.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of stored (canonical) intervals.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Remove all intervals.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Add an interval, coalescing with any overlapping or adjacent
    /// entries. Inserting an empty interval is a no-op.
    pub fn insert(&mut self, interval: Interval<T>) {
        if interval.is_empty() {
            return;
        }
        let mut begin = interval.begin;
        let mut end = interval.end;

        // An entry starting at-or-before `begin` may reach it.
        if let Some((&b, &e)) = self.map.range(..=begin).next_back() {
            if e >= begin {
                begin = b;
                if e > end {
                    end = e;
                }
            }
        }

        // Absorb every entry starting within the (possibly widened) span.
        // The inclusive upper bound folds in an entry starting exactly at
        // `end`, which keeps adjacent intervals coalesced.
        let absorbed: Vec<T> = self.map.range(begin..=end).map(|(&b, _)| b).collect();
        for b in absorbed {
            let e = self.map.remove(&b).expect("absorbed key present");
            if e > end {
                end = e;
            }
        }

        self.map.insert(begin, end);
    }

    /// Remove an interval. An entry strictly containing the erased range
    /// is split in two; entries partially covered are truncated. Erasing
    /// an empty interval is a no-op.
    pub fn erase(&mut self, interval: Interval<T>) {
        if interval.is_empty() || self.map.is_empty() {
            return;
        }

        // An entry starting strictly before the erased range may cross
        // into it: truncate, and keep any piece past the range's end.
        if let Some((&b, &e)) = self.map.range(..interval.begin).next_back() {
            if e > interval.begin {
                self.map.insert(b, interval.begin);
                if e > interval.end {
                    self.map.insert(interval.end, e);
                }
            }
        }

        // Entries starting inside the erased range disappear, except any
        // tail that extends past it.
        let covered: Vec<(T, T)> = self
            .map
            .range(interval.begin..interval.end)
            .map(|(&b, &e)| (b, e))
            .collect();
        for (b, e) in covered {
            self.map.remove(&b);
            if e > interval.end {
                self.map.insert(interval.end, e);
            }
        }
    }

    /// Remove every interval of `other` from this set (set difference).
    pub fn erase_set(&mut self, other: &IntervalSet<T>) {
        for interval in other.iter() {
            self.erase(interval);
        }
    }

    /// Add every interval of `other` to this set (set union).
    pub fn insert_set(&mut self, other: &IntervalSet<T>) {
        for interval in other.iter() {
            self.insert(interval);
        }
    }

    /// Returns `true` if `t` lies inside some stored interval.
    pub fn contains(&self, t: T) -> bool {
        match self.map.range(..=t).next_back() {
            Some((_, &e)) => e > t,
            None => false,
        }
    }

    /// First stored interval intersecting `[t, forever)`, i.e. the first
    /// interval whose `end` is after `t`.
    pub fn overlap_begin(&self, t: T) -> Option<Interval<T>> {
        if let Some((&b, &e)) = self.map.range(..=t).next_back() {
            if e > t {
                return Some(Interval { begin: b, end: e });
            }
        }
        self.map
            .range((Bound::Excluded(t), Bound::Unbounded))
            .next()
            .map(|(&b, &e)| Interval { begin: b, end: e })
    }

    /// Last stored interval intersecting `(-forever, t]`, i.e. the last
    /// interval whose `begin` is at-or-before `t`.
    pub fn overlap_end(&self, t: T) -> Option<Interval<T>> {
        self.map
            .range(..=t)
            .next_back()
            .map(|(&b, &e)| Interval { begin: b, end: e })
    }

    /// The envelope `[first.begin, last.end)` of the whole set, if any.
    pub fn bounds(&self) -> Option<Interval<T>> {
        let (&begin, _) = self.map.iter().next()?;
        let (_, &end) = self.map.iter().next_back()?;
        Some(Interval { begin, end })
    }

    /// Iterate stored intervals in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Interval<T>> + '_ {
        self.map.iter().map(|(&begin, &end)| Interval { begin, end })
    }
}

impl<T: Copy + Ord> Default for IntervalSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Ord> FromIterator<Interval<T>> for IntervalSet<T> {
    fn from_iter<I: IntoIterator<Item = Interval<T>>>(iter: I) -> Self {
        let mut set = Self::new();
        for interval in iter {
            set.insert(interval);
        }
        set
    }
}

impl<T: Copy + Ord + fmt::Display> fmt::Display for IntervalSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, interval) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{interval}")?;
        }
        write!(f, "}}")
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(begin: u32, end: u32) -> Interval<u32> {
        Interval::new(begin, end)
    }

    fn set(intervals: &[(u32, u32)]) -> IntervalSet<u32> {
        intervals.iter().map(|&(b, e)| iv(b, e)).collect()
    }

    fn as_vec(s: &IntervalSet<u32>) -> Vec<(u32, u32)> {
        s.iter().map(|i| (i.begin, i.end)).collect()
    }

    /// Canonical form: ordered, non-empty, with strict gaps between entries.
    fn assert_canonical(s: &IntervalSet<u32>) {
        let entries: Vec<_> = s.iter().collect();
        for entry in &entries {
            assert!(entry.begin < entry.end, "empty interval stored");
        }
        for pair in entries.windows(2) {
            assert!(
                pair[0].end < pair[1].begin,
                "adjacent or overlapping intervals left uncoalesced: {} then {}",
                pair[0],
                pair[1]
            );
        }
    }

    // ── Construction ─────────────────────────────────────────────

    #[test]
    fn new_set_is_empty() {
        let s: IntervalSet<u32> = IntervalSet::new();
        assert!(s.is_empty());
        assert_eq!(s.len(), 0);
        assert_eq!(s.bounds(), None);
    }

    #[test]
    fn insert_empty_interval_is_noop() {
        let mut s = IntervalSet::new();
        s.insert(iv(5, 5));
        assert!(s.is_empty());
    }

    // ── Insert / coalescing ──────────────────────────────────────

    #[test]
    fn disjoint_inserts_stay_separate() {
        let s = set(&[(0, 2), (4, 6), (8, 10)]);
        assert_eq!(as_vec(&s), vec![(0, 2), (4, 6), (8, 10)]);
        assert_canonical(&s);
    }

    #[test]
    fn overlapping_inserts_merge() {
        let mut s = set(&[(0, 5)]);
        s.insert(iv(3, 8));
        assert_eq!(as_vec(&s), vec![(0, 8)]);
        assert_canonical(&s);
    }

    #[test]
    fn adjacent_insert_coalesces_right() {
        let mut s = set(&[(0, 5)]);
        s.insert(iv(5, 9));
        assert_eq!(as_vec(&s), vec![(0, 9)]);
        assert_canonical(&s);
    }

    #[test]
    fn adjacent_insert_coalesces_left() {
        let mut s = set(&[(5, 9)]);
        s.insert(iv(0, 5));
        assert_eq!(as_vec(&s), vec![(0, 9)]);
        assert_canonical(&s);
    }

    #[test]
    fn insert_bridges_multiple_entries() {
        let mut s = set(&[(0, 2), (4, 6), (8, 10), (20, 22)]);
        s.insert(iv(1, 9));
        assert_eq!(as_vec(&s), vec![(0, 10), (20, 22)]);
        assert_canonical(&s);
    }

    #[test]
    fn insert_contained_is_noop() {
        let mut s = set(&[(0, 10)]);
        s.insert(iv(3, 7));
        assert_eq!(as_vec(&s), vec![(0, 10)]);
    }

    #[test]
    fn insert_equal_endpoints_extends() {
        let mut s = set(&[(2, 5)]);
        s.insert(iv(2, 8));
        assert_eq!(as_vec(&s), vec![(2, 8)]);
        s.insert(iv(0, 8));
        assert_eq!(as_vec(&s), vec![(0, 8)]);
    }

    // ── Erase / splitting ────────────────────────────────────────

    #[test]
    fn erase_from_middle_splits() {
        let mut s = set(&[(0, 10)]);
        s.erase(iv(3, 5));
        assert_eq!(as_vec(&s), vec![(0, 3), (5, 10)]);
        assert_canonical(&s);
    }

    #[test]
    fn erase_prefix_truncates() {
        let mut s = set(&[(0, 10)]);
        s.erase(iv(0, 4));
        assert_eq!(as_vec(&s), vec![(4, 10)]);
    }

    #[test]
    fn erase_suffix_truncates() {
        let mut s = set(&[(0, 10)]);
        s.erase(iv(6, 10));
        assert_eq!(as_vec(&s), vec![(0, 6)]);
    }

    #[test]
    fn erase_exact_removes() {
        let mut s = set(&[(0, 10)]);
        s.erase(iv(0, 10));
        assert!(s.is_empty());
    }

    #[test]
    fn erase_spanning_multiple_entries() {
        let mut s = set(&[(0, 3), (5, 8), (10, 13)]);
        s.erase(iv(2, 11));
        assert_eq!(as_vec(&s), vec![(0, 2), (11, 13)]);
        assert_canonical(&s);
    }

    #[test]
    fn erase_outside_is_noop() {
        let mut s = set(&[(5, 8)]);
        s.erase(iv(0, 5));
        s.erase(iv(8, 12));
        assert_eq!(as_vec(&s), vec![(5, 8)]);
    }

    #[test]
    fn erase_empty_interval_is_noop() {
        let mut s = set(&[(0, 10)]);
        s.erase(iv(4, 4));
        assert_eq!(as_vec(&s), vec![(0, 10)]);
    }

    #[test]
    fn erase_set_is_difference() {
        let mut s = set(&[(0, 10), (20, 30)]);
        s.erase_set(&set(&[(2, 4), (8, 22), (28, 40)]));
        assert_eq!(as_vec(&s), vec![(0, 2), (4, 8), (22, 28)]);
        assert_canonical(&s);
    }

    #[test]
    fn insert_set_is_union() {
        let mut s = set(&[(0, 3), (10, 13)]);
        s.insert_set(&set(&[(2, 11), (20, 21)]));
        assert_eq!(as_vec(&s), vec![(0, 13), (20, 21)]);
    }

    // ── Lookup ───────────────────────────────────────────────────

    #[test]
    fn contains_respects_half_open_bounds() {
        let s = set(&[(2, 5), (8, 9)]);
        assert!(!s.contains(1));
        assert!(s.contains(2));
        assert!(s.contains(4));
        assert!(!s.contains(5));
        assert!(s.contains(8));
        assert!(!s.contains(9));
    }

    #[test]
    fn overlap_begin_finds_containing_interval() {
        let s = set(&[(2, 5), (8, 12)]);
        assert_eq!(s.overlap_begin(3), Some(iv(2, 5)));
    }

    #[test]
    fn overlap_begin_skips_past_intervals() {
        let s = set(&[(2, 5), (8, 12)]);
        assert_eq!(s.overlap_begin(5), Some(iv(8, 12)));
        assert_eq!(s.overlap_begin(6), Some(iv(8, 12)));
        assert_eq!(s.overlap_begin(12), None);
        assert_eq!(s.overlap_begin(0), Some(iv(2, 5)));
    }

    #[test]
    fn overlap_end_finds_last_started_interval() {
        let s = set(&[(2, 5), (8, 12)]);
        assert_eq!(s.overlap_end(1), None);
        assert_eq!(s.overlap_end(2), Some(iv(2, 5)));
        assert_eq!(s.overlap_end(7), Some(iv(2, 5)));
        assert_eq!(s.overlap_end(20), Some(iv(8, 12)));
    }

    #[test]
    fn bounds_spans_whole_set() {
        let s = set(&[(2, 5), (8, 12), (30, 31)]);
        assert_eq!(s.bounds(), Some(iv(2, 31)));
    }

    // ── Equality / iteration ─────────────────────────────────────

    #[test]
    fn equality_is_structural() {
        let a = set(&[(0, 5), (8, 9)]);
        let mut b = IntervalSet::new();
        b.insert(iv(8, 9));
        b.insert(iv(0, 3));
        b.insert(iv(3, 5));
        assert_eq!(a, b);
        b.insert(iv(100, 101));
        assert_ne!(a, b);
    }

    #[test]
    fn from_iterator_canonicalizes() {
        let s: IntervalSet<u32> =
            [iv(4, 6), iv(0, 2), iv(2, 4), iv(10, 10)].into_iter().collect();
        assert_eq!(as_vec(&s), vec![(0, 6)]);
    }

    #[test]
    fn clear_empties() {
        let mut s = set(&[(0, 5), (8, 9)]);
        s.clear();
        assert!(s.is_empty());
    }

    #[test]
    fn display_format() {
        let s = set(&[(0, 3), (5, 8)]);
        assert_eq!(s.to_string(), "{0~3, 5~8}");
        let empty: IntervalSet<u32> = IntervalSet::new();
        assert_eq!(empty.to_string(), "{}");
    }

    // ── Randomized model comparison ──────────────────────────────

    /// Drive the set with random inserts and erases and compare point
    /// coverage against a plain boolean array, checking canonical form
    /// after every step.
    #[test]
    fn randomized_against_boolean_model() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        const DOMAIN: u32 = 64;
        let mut rng = StdRng::seed_from_u64(0x1715_c0de);

        for _ in 0..100 {
            let mut s: IntervalSet<u32> = IntervalSet::new();
            let mut model = [false; DOMAIN as usize];

            for _ in 0..200 {
                let begin = rng.gen_range(0..DOMAIN);
                let end = (begin + rng.gen_range(0..16)).min(DOMAIN);
                let interval = iv(begin, end);

                if rng.gen_bool(0.5) {
                    s.insert(interval);
                    for t in begin..end {
                        model[t as usize] = true;
                    }
                } else {
                    s.erase(interval);
                    for t in begin..end {
                        model[t as usize] = false;
                    }
                }

                assert_canonical(&s);
                for t in 0..DOMAIN {
                    assert_eq!(
                        s.contains(t),
                        model[t as usize],
                        "coverage mismatch at {t} in {s}"
                    );
                }
            }
        }
    }
}
