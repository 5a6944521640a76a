//! Data-layer error types.

use thiserror::Error;
use tessera_series::SeriesError;

/// Errors that can occur while bulk-loading or validating quote records.
#[derive(Debug, Error)]
pub enum DataError {
    /// No records were supplied.
    #[error("Empty data")]
    EmptyData,

    /// Records violated a validation invariant.
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// A record's time does not sit on a bucket boundary of the target
    /// series' frequency. Producers must pre-round.
    #[error("Unaligned time: {time} is not a bucket start")]
    UnalignedTime {
        /// Offending timestamp (epoch ms).
        time: i64,
    },

    /// A store write failed.
    #[error("Series error: {0}")]
    Series(#[from] SeriesError),
}
