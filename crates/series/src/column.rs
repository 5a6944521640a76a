//! Dense and sparse value columns keyed by the shared time index.
//!
//! Columns are owned and mutated exclusively by their series; growing a
//! column independently of the index would break the row correspondence, so
//! the splice/truncate entry points are crate-private.

use std::collections::BTreeMap;

use crate::time_index::TimeIndex;
use tessera_types::NULL_VALUE;

/// Handle to a column registered on a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnId(pub(crate) usize);

impl ColumnId {
    /// Raw registry slot.
    #[must_use]
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// Storage representation of one field.
#[derive(Debug, Clone)]
pub(crate) enum ColumnData {
    /// One slot per index row; absent slots hold the null sentinel.
    Dense(Vec<f64>),
    /// `time -> value` for sporadically emitted fields (signals, markers).
    Sparse(BTreeMap<i64, f64>),
}

/// A named value column.
#[derive(Debug, Clone)]
pub(crate) struct Column {
    pub(crate) name: String,
    pub(crate) data: ColumnData,
}

impl Column {
    pub(crate) fn dense(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Dense(vec![NULL_VALUE; len]),
        }
    }

    pub(crate) fn sparse(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Sparse(BTreeMap::new()),
        }
    }

    /// Ordinal read. Out-of-range and physically null slots both read as the
    /// null sentinel; callers never see an absence signal.
    pub(crate) fn get(&self, row: usize, index: &TimeIndex) -> f64 {
        match &self.data {
            ColumnData::Dense(values) => values.get(row).copied().unwrap_or(NULL_VALUE),
            ColumnData::Sparse(map) => match index.get(row) {
                Some(time) => map.get(&time).copied().unwrap_or(NULL_VALUE),
                None => NULL_VALUE,
            },
        }
    }

    /// Read by time. The time must resolve through the shared index for a
    /// dense column; a sparse column reads its map directly.
    pub(crate) fn get_by_time(&self, time: i64, index: &TimeIndex) -> f64 {
        match &self.data {
            ColumnData::Dense(values) => match index.index_of_occurred_time(time) {
                Some(row) => values.get(row).copied().unwrap_or(NULL_VALUE),
                None => NULL_VALUE,
            },
            ColumnData::Sparse(map) => map.get(&time).copied().unwrap_or(NULL_VALUE),
        }
    }

    /// Write at an already-indexed row (dense) or time (sparse).
    pub(crate) fn set(&mut self, row: usize, time: i64, value: f64) {
        match &mut self.data {
            ColumnData::Dense(values) => {
                if let Some(slot) = values.get_mut(row) {
                    *slot = value;
                }
            }
            ColumnData::Sparse(map) => {
                map.insert(time, value);
            }
        }
    }

    /// Mirror of an index insertion: a dense column grows a null slot at the
    /// same position in the same mutation. Sparse columns are unaffected.
    pub(crate) fn splice_null(&mut self, row: usize) {
        if let ColumnData::Dense(values) = &mut self.data {
            values.insert(row, NULL_VALUE);
        }
    }

    /// Mirror of an index truncation from `cut_row` / `cut_time` onward.
    pub(crate) fn truncate_from(&mut self, cut_row: usize, cut_time: i64) {
        match &mut self.data {
            ColumnData::Dense(values) => values.truncate(cut_row),
            ColumnData::Sparse(map) => {
                map.split_off(&cut_time);
            }
        }
    }

    /// Dense backing slice; `None` for sparse columns.
    pub(crate) fn dense_slice(&self) -> Option<&[f64]> {
        match &self.data {
            ColumnData::Dense(values) => Some(values),
            ColumnData::Sparse(_) => None,
        }
    }

    /// Occurred times a sparse column actually carries, in order.
    pub(crate) fn sparse_times(&self) -> Option<Vec<i64>> {
        match &self.data {
            ColumnData::Sparse(map) => Some(map.keys().copied().collect()),
            ColumnData::Dense(_) => None,
        }
    }
}
