//! Row façade.
//!
//! An item is the time-addressed view of one row across all columns of a
//! series. Its identity is the time; field values live in the columns and are
//! read/written through the owning series, never stored on the item itself.

use crate::column::ColumnId;
use crate::error::SeriesError;
use crate::series::Series;

/// Per-row state kept 1:1 with the index.
///
/// `clear` marks a row the index knows about but that carries no real field
/// data yet — distinct from a row that is simply absent.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ItemState {
    pub(crate) time: i64,
    pub(crate) clear: bool,
}

/// Handle to one row of a series.
///
/// Lives as long as the borrow of the series; reads and writes go through the
/// series lock. The row itself is destroyed only by truncation, after which
/// writes through a stale handle fail with
/// [`SeriesError::TimeNotIndexed`].
#[derive(Debug, Clone, Copy)]
pub struct ItemHandle<'s> {
    series: &'s Series,
    time: i64,
}

impl<'s> ItemHandle<'s> {
    pub(crate) fn new(series: &'s Series, time: i64) -> Self {
        Self { series, time }
    }

    /// The time this item is addressed by.
    #[must_use]
    pub fn time(&self) -> i64 {
        self.time
    }

    /// Physical row, if the time is still indexed.
    #[must_use]
    pub fn row(&self) -> Option<usize> {
        self.series.occurred_row_of(self.time)
    }

    /// True while the row carries no real field data.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.series.is_clear(self.time)
    }

    /// Reads one field; the null sentinel when unset or truncated away.
    #[must_use]
    pub fn value(&self, col: ColumnId) -> f64 {
        self.series.value_at(col, self.time)
    }

    /// Writes one field and marks the row as carrying data.
    ///
    /// # Errors
    /// [`SeriesError::TimeNotIndexed`] when the row has been truncated away,
    /// [`SeriesError::UnknownColumn`] for a foreign column id.
    pub fn set_value(&self, col: ColumnId, value: f64) -> Result<(), SeriesError> {
        self.series.set_value(col, self.time, value)
    }
}
