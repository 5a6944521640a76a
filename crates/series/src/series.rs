//! The series: one time index, its columns, and its items.
//!
//! Single-writer/multiple-reader: structural mutation takes the series-wide
//! write lock, point reads take the read lock. Change events are delivered
//! synchronously on the mutator's thread after the data lock is released.

use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::calendar::CalendarView;
use crate::column::{Column, ColumnId};
use crate::error::SeriesError;
use crate::event::{Listeners, SeriesEvent, SeriesEventKind, SubscriptionId};
use crate::item::{ItemHandle, ItemState};
use crate::time_index::TimeIndex;
use tessera_types::{Frequency, NULL_VALUE};

/// Which row arithmetic a series answers read queries with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Rows are physical positions in the occurred sequence.
    #[default]
    Occurred,
    /// Rows are calendar buckets from the first occurrence, gaps included.
    Calendar,
}

#[derive(Debug, Default)]
pub(crate) struct SeriesInner {
    pub(crate) index: TimeIndex,
    pub(crate) columns: Vec<Column>,
    pub(crate) items: Vec<ItemState>,
    pub(crate) view_mode: ViewMode,
}

impl SeriesInner {
    fn column(&self, col: ColumnId) -> Result<&Column, SeriesError> {
        self.columns.get(col.0).ok_or(SeriesError::UnknownColumn(col.0))
    }

    fn column_mut(&mut self, col: ColumnId) -> Result<&mut Column, SeriesError> {
        self.columns
            .get_mut(col.0)
            .ok_or(SeriesError::UnknownColumn(col.0))
    }
}

/// A named, frequency-tagged time series owning its index, columns and items.
///
/// Invariant: `items.len() == index.len() == every dense column's len()`.
/// [`Series::ensure_row`] is the only path that introduces a new time, which
/// is what keeps the three in lockstep.
pub struct Series {
    name: String,
    freq: Frequency,
    inner: RwLock<SeriesInner>,
    listeners: Mutex<Listeners>,
}

impl std::fmt::Debug for Series {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Series")
            .field("name", &self.name)
            .field("freq", &self.freq)
            .field("size", &self.occurred_size())
            .finish()
    }
}

impl Series {
    /// Creates an empty series at the given frequency.
    #[must_use]
    pub fn new(name: impl Into<String>, freq: Frequency) -> Self {
        Self {
            name: name.into(),
            freq,
            inner: RwLock::new(SeriesInner::default()),
            listeners: Mutex::new(Listeners::default()),
        }
    }

    /// Series name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sampling frequency.
    #[must_use]
    pub fn freq(&self) -> Frequency {
        self.freq
    }

    // ---- column registry -------------------------------------------------

    /// Registers a dense column, pre-filled with null slots for every
    /// existing row.
    pub fn add_dense_column(&self, name: impl Into<String>) -> ColumnId {
        let mut inner = self.inner.write();
        let len = inner.index.len();
        inner.columns.push(Column::dense(name, len));
        ColumnId(inner.columns.len() - 1)
    }

    /// Registers a sparse column.
    pub fn add_sparse_column(&self, name: impl Into<String>) -> ColumnId {
        let mut inner = self.inner.write();
        inner.columns.push(Column::sparse(name));
        ColumnId(inner.columns.len() - 1)
    }

    /// Looks a column up by name.
    #[must_use]
    pub fn column_named(&self, name: &str) -> Option<ColumnId> {
        let inner = self.inner.read();
        inner
            .columns
            .iter()
            .position(|c| c.name == name)
            .map(ColumnId)
    }

    // ---- row lifecycle ---------------------------------------------------

    /// Returns the item for `time`, creating its row if needed.
    ///
    /// Existing time: the item is re-marked clear and returned. New time: the
    /// index, every dense column, and the item list grow one slot at the same
    /// sorted position inside one write-lock scope — the only sanctioned way
    /// a time enters a series.
    pub fn ensure_row(&self, time: i64) -> ItemHandle<'_> {
        let mut inner = self.inner.write();
        let (row, inserted) = inner.index.ensure(time);
        if inserted {
            for col in &mut inner.columns {
                col.splice_null(row);
            }
            inner.items.insert(row, ItemState { time, clear: true });
        } else {
            inner.items[row].clear = true;
        }
        drop(inner);
        ItemHandle::new(self, time)
    }

    /// Exact-time lookup; `None` when the time never occurred.
    #[must_use]
    pub fn get_item(&self, time: i64) -> Option<ItemHandle<'_>> {
        let inner = self.inner.read();
        inner
            .index
            .index_of_occurred_time(time)
            .map(|_| ItemHandle::new(self, time))
    }

    /// Row lookup under the current view mode. A calendar gap row resolves
    /// to `None`: the bucket is addressable but nothing occurred in it.
    #[must_use]
    pub fn get_item_by_row(&self, row: usize) -> Option<ItemHandle<'_>> {
        let inner = self.inner.read();
        match inner.view_mode {
            ViewMode::Occurred => inner
                .items
                .get(row)
                .map(|item| ItemHandle::new(self, item.time)),
            ViewMode::Calendar => {
                let time = CalendarView::new(&inner.index, self.freq).time_of_row(row as i64);
                inner
                    .index
                    .index_of_occurred_time(time)
                    .map(|_| ItemHandle::new(self, time))
            }
        }
    }

    /// Drops every row at/after the floor of `time` from the index, all
    /// columns, and the item list, then fires a `Clear` event for the
    /// dropped range.
    pub fn clear_from(&self, time: i64) {
        let cut_time = self.freq.round_floor(time);
        let dropped_range = {
            let mut inner = self.inner.write();
            let old_last = inner.index.last_time();
            let Some(cut_row) = inner.index.truncate_from(cut_time) else {
                return;
            };
            for col in &mut inner.columns {
                col.truncate_from(cut_row, cut_time);
            }
            inner.items.truncate(cut_row);
            old_last.map(|last| (cut_time, last))
        };
        if let Some((from, to)) = dropped_range {
            tracing::debug!(series = %self.name, from, to, "cleared rows");
            self.fire(SeriesEvent::new(SeriesEventKind::Clear, from, to));
        }
    }

    // ---- point access ----------------------------------------------------

    /// Value at an occurred row; null sentinel out of range.
    #[must_use]
    pub fn value(&self, col: ColumnId, row: usize) -> f64 {
        let inner = self.inner.read();
        match inner.column(col) {
            Ok(c) => c.get(row, &inner.index),
            Err(_) => NULL_VALUE,
        }
    }

    /// Value at an occurred time; null sentinel when absent.
    #[must_use]
    pub fn value_at(&self, col: ColumnId, time: i64) -> f64 {
        let inner = self.inner.read();
        match inner.column(col) {
            Ok(c) => c.get_by_time(time, &inner.index),
            Err(_) => NULL_VALUE,
        }
    }

    /// Writes a value for an already-indexed time and marks the row as
    /// carrying data.
    ///
    /// # Errors
    /// [`SeriesError::TimeNotIndexed`] when the time never entered the index
    /// (route new times through [`Series::ensure_row`] first),
    /// [`SeriesError::UnknownColumn`] for a foreign column id.
    pub fn set_value(&self, col: ColumnId, time: i64, value: f64) -> Result<(), SeriesError> {
        let mut inner = self.inner.write();
        let row = inner
            .index
            .index_of_occurred_time(time)
            .ok_or(SeriesError::TimeNotIndexed { time })?;
        inner.column_mut(col)?.set(row, time, value);
        inner.items[row].clear = false;
        Ok(())
    }

    /// True while the row for `time` exists and carries no real data.
    #[must_use]
    pub fn is_clear(&self, time: i64) -> bool {
        let inner = self.inner.read();
        inner
            .index
            .index_of_occurred_time(time)
            .is_some_and(|row| inner.items[row].clear)
    }

    // ---- row arithmetic (view-mode aware) --------------------------------

    /// Switches between occurred and calendar row arithmetic for reads.
    pub fn set_view_mode(&self, mode: ViewMode) {
        self.inner.write().view_mode = mode;
    }

    /// Current view mode.
    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        self.inner.read().view_mode
    }

    /// Row count under the current view mode (calendar counts gap buckets).
    #[must_use]
    pub fn size(&self) -> usize {
        let inner = self.inner.read();
        match inner.view_mode {
            ViewMode::Occurred => inner.index.len(),
            ViewMode::Calendar => CalendarView::new(&inner.index, self.freq).size(),
        }
    }

    /// Physical row count regardless of view mode.
    #[must_use]
    pub fn occurred_size(&self) -> usize {
        self.inner.read().index.len()
    }

    /// Row for a time under the current view mode; extrapolates outside the
    /// occurred range (negative before the first occurrence).
    #[must_use]
    pub fn row_of_time(&self, time: i64) -> i64 {
        let inner = self.inner.read();
        match inner.view_mode {
            ViewMode::Occurred => inner.index.row_of_time(time, self.freq),
            ViewMode::Calendar => CalendarView::new(&inner.index, self.freq).row_of_time(time),
        }
    }

    /// Time for a row under the current view mode; extrapolates outside the
    /// occurred range.
    #[must_use]
    pub fn time_of_row(&self, row: i64) -> i64 {
        let inner = self.inner.read();
        match inner.view_mode {
            ViewMode::Occurred => inner.index.time_of_row(row, self.freq),
            ViewMode::Calendar => CalendarView::new(&inner.index, self.freq).time_of_row(row),
        }
    }

    /// Physical row of an occurred time, view mode aside.
    #[must_use]
    pub fn occurred_row_of(&self, time: i64) -> Option<usize> {
        self.inner.read().index.index_of_occurred_time(time)
    }

    /// Earliest occurred time.
    #[must_use]
    pub fn first_time(&self) -> Option<i64> {
        self.inner.read().index.first_time()
    }

    /// Latest occurred time.
    #[must_use]
    pub fn last_time(&self) -> Option<i64> {
        self.inner.read().index.last_time()
    }

    // ---- bulk read -------------------------------------------------------

    /// Takes the read lock for slice-level access (kernels, plotting).
    #[must_use]
    pub fn read(&self) -> SeriesRead<'_> {
        SeriesRead {
            inner: self.inner.read(),
        }
    }

    // ---- change notification ---------------------------------------------

    /// Registers a change listener.
    pub fn subscribe(&self, listener: impl Fn(&SeriesEvent) + Send + Sync + 'static) -> SubscriptionId {
        self.listeners.lock().subscribe(std::sync::Arc::new(listener))
    }

    /// Removes a listener; `true` when it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.lock().unsubscribe(id)
    }

    /// Delivers an event to every subscriber, synchronously, on this thread.
    pub fn fire(&self, event: SeriesEvent) {
        let listeners = self.listeners.lock().snapshot();
        for listener in &listeners {
            listener(&event);
        }
    }

    /// Convenience for [`Series::fire`].
    pub fn fire_change(&self, kind: SeriesEventKind, from_time: i64, to_time: i64) {
        self.fire(SeriesEvent::new(kind, from_time, to_time));
    }
}

/// Read-lock guard exposing the backing slices.
pub struct SeriesRead<'a> {
    inner: RwLockReadGuard<'a, SeriesInner>,
}

impl SeriesRead<'_> {
    /// Physical row count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.index.len()
    }

    /// True when no row exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.index.is_empty()
    }

    /// Occurred times in order.
    #[must_use]
    pub fn times(&self) -> &[i64] {
        self.inner.index.as_slice()
    }

    /// Dense backing slice; empty for sparse or unknown columns.
    #[must_use]
    pub fn dense(&self, col: ColumnId) -> &[f64] {
        self.inner
            .columns
            .get(col.0)
            .and_then(Column::dense_slice)
            .unwrap_or(&[])
    }

    /// Value at a row through either representation.
    #[must_use]
    pub fn value(&self, col: ColumnId, row: usize) -> f64 {
        match self.inner.columns.get(col.0) {
            Some(c) => c.get(row, &self.inner.index),
            None => NULL_VALUE,
        }
    }

    /// Times a sparse column actually carries.
    #[must_use]
    pub fn sparse_times(&self, col: ColumnId) -> Vec<i64> {
        self.inner
            .columns
            .get(col.0)
            .and_then(Column::sparse_times)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tessera_types::is_null;

    const DAY: i64 = 86_400_000;

    fn daily_series() -> (Series, ColumnId) {
        let ser = Series::new("test", Frequency::DAILY);
        let close = ser.add_dense_column("close");
        (ser, close)
    }

    #[test]
    fn test_ensure_row_keeps_lengths_in_lockstep() {
        let (ser, close) = daily_series();
        let signal = ser.add_sparse_column("signal");

        for day in [3, 1, 2, 0] {
            ser.ensure_row(day * DAY);
        }

        let read = ser.read();
        assert_eq!(read.len(), 4);
        assert_eq!(read.times(), &[0, DAY, 2 * DAY, 3 * DAY]);
        assert_eq!(read.dense(close).len(), 4);
        assert!(read.sparse_times(signal).is_empty());
    }

    #[test]
    fn test_ensure_row_existing_time_clears_item() {
        let (ser, close) = daily_series();
        let item = ser.ensure_row(DAY);
        item.set_value(close, 1.5).unwrap();
        assert!(!ser.is_clear(DAY));

        let again = ser.ensure_row(DAY);
        assert!(again.is_clear());
        assert_eq!(ser.occurred_size(), 1);
        // Clearing flags the item; the stored value itself is untouched
        assert_eq!(again.value(close), 1.5);
    }

    #[test]
    fn test_out_of_order_insert_shifts_column_slots() {
        let (ser, close) = daily_series();
        ser.ensure_row(0).set_value(close, 1.0).unwrap();
        ser.ensure_row(2 * DAY).set_value(close, 3.0).unwrap();
        ser.ensure_row(DAY).set_value(close, 2.0).unwrap();

        let read = ser.read();
        assert_eq!(read.dense(close), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_set_value_requires_indexed_time() {
        let (ser, close) = daily_series();
        let err = ser.set_value(close, DAY, 1.0).unwrap_err();
        assert_eq!(err, SeriesError::TimeNotIndexed { time: DAY });
    }

    #[test]
    fn test_dense_reads_always_yield_sentinel_not_absence() {
        let (ser, close) = daily_series();
        ser.ensure_row(0);
        assert!(is_null(ser.value(close, 0))); // clear row
        assert!(is_null(ser.value(close, 42))); // out of range
        assert!(is_null(ser.value_at(close, 5 * DAY))); // unknown time
    }

    #[test]
    fn test_clear_from_truncates_and_fires() {
        let (ser, close) = daily_series();
        for day in 0..5 {
            ser.ensure_row(day * DAY)
                .set_value(close, day as f64)
                .unwrap();
        }

        let cleared = Arc::new(AtomicUsize::new(0));
        let cleared_l = Arc::clone(&cleared);
        ser.subscribe(move |e| {
            if e.kind == SeriesEventKind::Clear {
                assert_eq!(e.from_time, 2 * DAY);
                assert_eq!(e.to_time, 4 * DAY);
                cleared_l.fetch_add(1, Ordering::SeqCst);
            }
        });

        // mid-bucket time floors to day 2
        ser.clear_from(2 * DAY + 500);

        assert_eq!(ser.occurred_size(), 2);
        assert_eq!(ser.read().dense(close), &[0.0, 1.0]);
        assert_eq!(cleared.load(Ordering::SeqCst), 1);
        assert!(ser.get_item(2 * DAY).is_none());
    }

    #[test]
    fn test_view_mode_row_arithmetic() {
        let (ser, _) = daily_series();
        for day in [0, 1, 4] {
            ser.ensure_row(day * DAY);
        }

        assert_eq!(ser.size(), 3);
        assert_eq!(ser.row_of_time(4 * DAY), 2);

        ser.set_view_mode(ViewMode::Calendar);
        assert_eq!(ser.size(), 5);
        assert_eq!(ser.row_of_time(4 * DAY), 4);
        assert_eq!(ser.time_of_row(3), 3 * DAY); // gap bucket is addressable
    }

    #[test]
    fn test_get_item_by_row_follows_view_mode() {
        let (ser, _) = daily_series();
        for day in [0, 1, 4] {
            ser.ensure_row(day * DAY);
        }

        // Occurred mode: row 2 is the third physical row
        assert_eq!(ser.get_item_by_row(2).map(|it| it.time()), Some(4 * DAY));

        ser.set_view_mode(ViewMode::Calendar);
        // Calendar mode: row 4 is the day-4 bucket, rows 2/3 are gaps
        assert_eq!(ser.get_item_by_row(4).map(|it| it.time()), Some(4 * DAY));
        assert!(ser.get_item_by_row(2).is_none());
        assert!(ser.get_item_by_row(3).is_none());
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let (ser, _) = daily_series();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_l = Arc::clone(&hits);
        let id = ser.subscribe(move |_| {
            hits_l.fetch_add(1, Ordering::SeqCst);
        });

        ser.fire_change(SeriesEventKind::Updated, 0, DAY);
        assert!(ser.unsubscribe(id));
        ser.fire_change(SeriesEventKind::Updated, 0, DAY);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_column_named() {
        let (ser, close) = daily_series();
        assert_eq!(ser.column_named("close"), Some(close));
        assert_eq!(ser.column_named("volume"), None);
    }
}
