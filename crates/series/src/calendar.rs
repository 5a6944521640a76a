//! Calendar ruler over an occurred index.
//!
//! A [`CalendarView`] re-reads one [`TimeIndex`] as an evenly spaced ruler of
//! frequency buckets starting at the first occurred time. Buckets with no
//! occurrence are valid "gap" rows. Only the row arithmetic differs from the
//! occurred view; data access stays on the shared index, nothing is copied.

use crate::time_index::TimeIndex;
use tessera_types::Frequency;

/// Read-only as-calendar view of a [`TimeIndex`].
#[derive(Debug, Clone, Copy)]
pub struct CalendarView<'a> {
    index: &'a TimeIndex,
    freq: Frequency,
}

impl<'a> CalendarView<'a> {
    /// Creates a calendar view at the given frequency.
    #[must_use]
    pub fn new(index: &'a TimeIndex, freq: Frequency) -> Self {
        Self { index, freq }
    }

    /// The underlying occurred index; all data accessors delegate here.
    #[must_use]
    pub fn index(&self) -> &'a TimeIndex {
        self.index
    }

    /// Whole buckets between the first occurred time and `time`.
    /// Negative before the first occurrence; 0 on an empty index.
    #[must_use]
    pub fn row_of_time(&self, time: i64) -> i64 {
        match self.index.first_time() {
            Some(first) => self.freq.n_freqs_between(first, time),
            None => 0,
        }
    }

    /// Bucket start for a calendar row. 0 on an empty index.
    #[must_use]
    pub fn time_of_row(&self, row: i64) -> i64 {
        match self.index.first_time() {
            Some(first) => self.freq.time_after_n_freqs(first, row),
            None => 0,
        }
    }

    /// Number of calendar rows: every bucket between the first and last
    /// occurrence counts, occupied or not.
    #[must_use]
    pub fn size(&self) -> usize {
        match (self.index.first_time(), self.index.last_time()) {
            (Some(first), Some(last)) => {
                (self.freq.n_freqs_between(first, last) + 1) as usize
            }
            _ => 0,
        }
    }

    /// Last calendar row, or `None` on an empty index.
    #[must_use]
    pub fn last_row(&self) -> Option<i64> {
        match self.size() {
            0 => None,
            n => Some(n as i64 - 1),
        }
    }

    /// True when the calendar row has a matching occurred time (not a gap).
    #[must_use]
    pub fn is_occupied(&self, row: i64) -> bool {
        self.index
            .index_of_occurred_time(self.time_of_row(row))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400_000;

    fn index_of(times: &[i64]) -> TimeIndex {
        let mut idx = TimeIndex::new();
        for &t in times {
            idx.insert(t).unwrap();
        }
        idx
    }

    #[test]
    fn test_calendar_counts_gap_rows() {
        // Occurred: days 0, 1, 4 — calendar spans 5 buckets
        let idx = index_of(&[0, DAY, 4 * DAY]);
        let cal = CalendarView::new(&idx, Frequency::DAILY);

        assert_eq!(cal.size(), 5);
        assert_eq!(cal.last_row(), Some(4));
        assert_eq!(cal.row_of_time(4 * DAY), 4);
        assert_eq!(cal.row_of_time(2 * DAY + 5), 2); // gap bucket is a valid row
        assert_eq!(cal.time_of_row(2), 2 * DAY);
        assert!(cal.is_occupied(1));
        assert!(!cal.is_occupied(2));
        assert!(!cal.is_occupied(3));
    }

    #[test]
    fn test_calendar_outside_range() {
        let idx = index_of(&[3 * DAY, 4 * DAY]);
        let cal = CalendarView::new(&idx, Frequency::DAILY);

        assert_eq!(cal.row_of_time(DAY), -2);
        assert_eq!(cal.time_of_row(-2), DAY);
        assert_eq!(cal.time_of_row(10), 13 * DAY);
    }

    #[test]
    fn test_calendar_empty_index() {
        let idx = TimeIndex::new();
        let cal = CalendarView::new(&idx, Frequency::DAILY);
        assert_eq!(cal.size(), 0);
        assert_eq!(cal.last_row(), None);
        assert_eq!(cal.row_of_time(DAY), 0);
    }

    #[test]
    fn test_calendar_does_not_touch_occurred_data() {
        let idx = index_of(&[0, DAY, 4 * DAY]);
        let cal = CalendarView::new(&idx, Frequency::DAILY);
        // Occurred accessors still see 3 physical rows through the view
        assert_eq!(cal.index().len(), 3);
        assert_eq!(cal.index().get(2), Some(4 * DAY));
    }
}
