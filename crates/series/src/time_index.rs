//! Strictly increasing timestamp index with row semantics.
//!
//! Row `i` always denotes the `i`-th earliest occurred time. The index grows
//! by ordered or out-of-order [`TimeIndex::insert`] and shrinks only through
//! [`TimeIndex::truncate_from`].

use crate::error::SeriesError;
use tessera_types::Frequency;

/// Append-mostly ordered sequence of epoch-ms timestamps.
///
/// Invariants: strictly increasing, duplicate-free.
#[derive(Debug, Clone, Default)]
pub struct TimeIndex {
    times: Vec<i64>,
}

impl TimeIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self { times: Vec::new() }
    }

    /// Number of occurred rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// True when no time has occurred yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Timestamp at `row`, if in range.
    #[must_use]
    pub fn get(&self, row: usize) -> Option<i64> {
        self.times.get(row).copied()
    }

    /// Earliest occurred time.
    #[must_use]
    pub fn first_time(&self) -> Option<i64> {
        self.times.first().copied()
    }

    /// Latest occurred time.
    #[must_use]
    pub fn last_time(&self) -> Option<i64> {
        self.times.last().copied()
    }

    /// Last occurred row.
    #[must_use]
    pub fn last_row(&self) -> Option<usize> {
        self.len().checked_sub(1)
    }

    /// All occurred times in order.
    #[must_use]
    pub fn as_slice(&self) -> &[i64] {
        &self.times
    }

    /// Exact binary search for an occurred time.
    ///
    /// The 0- and 1-element sequences are resolved before the halving loop;
    /// the loop invariant below assumes at least two live candidates.
    #[must_use]
    pub fn index_of_occurred_time(&self, time: i64) -> Option<usize> {
        match self.times.len() {
            0 => return None,
            1 => return (self.times[0] == time).then_some(0),
            _ => {}
        }

        let mut lo = 0usize;
        let mut hi = self.times.len() - 1;
        while lo <= hi {
            let mid = lo + (hi - lo) / 2;
            match self.times[mid].cmp(&time) {
                std::cmp::Ordering::Equal => return Some(mid),
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => {
                    if mid == 0 {
                        return None;
                    }
                    hi = mid - 1;
                }
            }
        }
        None
    }

    /// Last row whose time is `<= time` (floor), if any exists on that side.
    #[must_use]
    pub fn floor_index_of(&self, time: i64) -> Option<usize> {
        match self.times.len() {
            0 => return None,
            1 => return (self.times[0] <= time).then_some(0),
            _ => {}
        }

        if time < self.times[0] {
            return None;
        }
        if time >= self.times[self.times.len() - 1] {
            return Some(self.times.len() - 1);
        }

        // Invariant: times[lo] <= time < times[hi]
        let mut lo = 0usize;
        let mut hi = self.times.len() - 1;
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if self.times[mid] <= time {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Some(lo)
    }

    /// First row whose time is `>= time` (ceiling), if any exists on that side.
    #[must_use]
    pub fn ceiling_index_of(&self, time: i64) -> Option<usize> {
        match self.times.len() {
            0 => return None,
            1 => return (self.times[0] >= time).then_some(0),
            _ => {}
        }

        if time <= self.times[0] {
            return Some(0);
        }
        if time > self.times[self.times.len() - 1] {
            return None;
        }

        // Invariant: times[lo] < time <= times[hi]
        let mut lo = 0usize;
        let mut hi = self.times.len() - 1;
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if self.times[mid] < time {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Some(hi)
    }

    /// Inserts a time at its sorted position, ordered or out of order.
    ///
    /// Returns the row the time landed on. Appending (`time` past the current
    /// last) is O(1); interior insertion shifts the tail.
    ///
    /// # Errors
    /// [`SeriesError::DuplicateTime`] when the time is already indexed.
    /// Callers that mean "give me this row again" should route through the
    /// series item-clear path instead of re-inserting.
    pub fn insert(&mut self, time: i64) -> Result<usize, SeriesError> {
        match self.floor_index_of(time) {
            None => {
                self.times.insert(0, time);
                Ok(0)
            }
            Some(row) if self.times[row] == time => {
                Err(SeriesError::DuplicateTime { time, row })
            }
            Some(row) => {
                self.times.insert(row + 1, time);
                Ok(row + 1)
            }
        }
    }

    /// Row for `time`, inserting it at its sorted position when absent.
    /// Returns `(row, inserted)`. One floor search either way; this is the
    /// path [`ensure_row`](crate::series::Series::ensure_row) takes so a
    /// re-occurring time never trips the duplicate check.
    pub(crate) fn ensure(&mut self, time: i64) -> (usize, bool) {
        match self.floor_index_of(time) {
            None => {
                self.times.insert(0, time);
                (0, true)
            }
            Some(row) if self.times[row] == time => (row, false),
            Some(row) => {
                self.times.insert(row + 1, time);
                (row + 1, true)
            }
        }
    }

    /// Drops every row at/after `time`'s floor row. Returns the first dropped
    /// row, or `None` when nothing was dropped.
    pub fn truncate_from(&mut self, time: i64) -> Option<usize> {
        let cut = self.ceiling_index_of(time)?;
        self.times.truncate(cut);
        Some(cut)
    }

    /// Row for a time on the occurred view, extrapolating outside the range.
    ///
    /// Inside the occurred range this is the physical floor row. Before the
    /// first occurrence the result is negative, after the last it exceeds
    /// `last_row`, both derived from `freq` bucket counts — callers may ask
    /// for rows the data does not (yet) cover.
    #[must_use]
    pub fn row_of_time(&self, time: i64, freq: Frequency) -> i64 {
        let (Some(first), Some(last)) = (self.first_time(), self.last_time()) else {
            return 0;
        };
        if time < first {
            return freq.n_freqs_between(first, time);
        }
        if time > last {
            let last_row = (self.len() - 1) as i64;
            return last_row + freq.n_freqs_between(last, time);
        }
        // floor_index_of cannot miss: first <= time <= last
        self.floor_index_of(time).map_or(0, |r| r as i64)
    }

    /// Time for a row on the occurred view, extrapolating outside the range.
    #[must_use]
    pub fn time_of_row(&self, row: i64, freq: Frequency) -> i64 {
        let (Some(first), Some(last)) = (self.first_time(), self.last_time()) else {
            return 0;
        };
        let last_row = (self.len() - 1) as i64;
        if row < 0 {
            return freq.time_after_n_freqs(first, row);
        }
        if row > last_row {
            return freq.time_after_n_freqs(last, row - last_row);
        }
        self.times[row as usize]
    }
}
