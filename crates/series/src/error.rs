//! Series-layer error types.

use thiserror::Error;

/// Errors raised by the time index and columnar store.
///
/// These mark caller bugs at the API seam (inserting a duplicate time through
/// the raw index, writing a sparse value for an unindexed time). Out-of-range
/// reads are not errors; they yield the null sentinel.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeriesError {
    /// The time is already present in the index.
    #[error("Duplicate time: {time} already indexed at row {row}")]
    DuplicateTime {
        /// Offending timestamp (epoch ms).
        time: i64,
        /// Row the timestamp already occupies.
        row: usize,
    },

    /// A column write referenced a time the index does not contain.
    #[error("Time not indexed: {time}")]
    TimeNotIndexed {
        /// Offending timestamp (epoch ms).
        time: i64,
    },

    /// A column id referenced a column this series does not own.
    #[error("Unknown column id: {0}")]
    UnknownColumn(usize),
}
