//! Flat quote record crossing the bulk load/save boundary.

/// One OHLCV record as exchanged with persistence/acquisition collaborators.
/// `time` is the bucket start (epoch milliseconds UTC), pre-rounded to the
/// target series frequency by the producer.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    /// Bucket start, epoch milliseconds UTC.
    pub time: i64,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume
    pub volume: f64,
    /// Split/dividend-adjusted close price
    pub adj_close: f64,
    /// Identifier of the feed/file the record came from.
    pub source_id: u32,
}

impl Bar {
    /// A bar with every price set to `close` and no adjustment.
    /// Handy for tests and synthetic fills.
    #[must_use]
    pub fn flat(time: i64, close: f64) -> Self {
        Self {
            time,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
            adj_close: close,
            source_id: 0,
        }
    }
}
