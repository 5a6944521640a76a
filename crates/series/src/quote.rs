//! Quote series: the standard OHLCV column set over a [`Series`].
//!
//! This is the ingestion target for data-acquisition collaborators
//! (`ensure_row` → field setters → `fire_change`) and the read surface for
//! rendering collaborators.

use crate::column::ColumnId;
use crate::error::SeriesError;
use crate::event::{SeriesEvent, SeriesEventKind, SubscriptionId};
use crate::series::{Series, SeriesRead, ViewMode};
use tessera_types::{Bar, Frequency};

/// Column ids for the standard quote fields.
#[derive(Debug, Clone, Copy)]
pub struct QuoteColumns {
    /// Open price column.
    pub open: ColumnId,
    /// High price column.
    pub high: ColumnId,
    /// Low price column.
    pub low: ColumnId,
    /// Close price column.
    pub close: ColumnId,
    /// Volume column.
    pub volume: ColumnId,
    /// Adjusted close column.
    pub adj_close: ColumnId,
}

/// A [`Series`] carrying the six standard dense quote columns.
#[derive(Debug)]
pub struct QuoteSeries {
    series: Series,
    cols: QuoteColumns,
}

impl QuoteSeries {
    /// Creates an empty quote series at the given frequency.
    #[must_use]
    pub fn new(name: impl Into<String>, freq: Frequency) -> Self {
        let series = Series::new(name, freq);
        let cols = QuoteColumns {
            open: series.add_dense_column("open"),
            high: series.add_dense_column("high"),
            low: series.add_dense_column("low"),
            close: series.add_dense_column("close"),
            volume: series.add_dense_column("volume"),
            adj_close: series.add_dense_column("adj_close"),
        };
        Self { series, cols }
    }

    /// The underlying generic series.
    #[must_use]
    pub fn series(&self) -> &Series {
        &self.series
    }

    /// The standard column ids.
    #[must_use]
    pub fn columns(&self) -> QuoteColumns {
        self.cols
    }

    /// Sampling frequency.
    #[must_use]
    pub fn freq(&self) -> Frequency {
        self.series.freq()
    }

    /// Returns the quote row for `time`, creating it if needed.
    pub fn ensure_row(&self, time: i64) -> QuoteHandle<'_> {
        self.series.ensure_row(time);
        QuoteHandle { quotes: self, time }
    }

    /// Exact-time lookup.
    #[must_use]
    pub fn get_item(&self, time: i64) -> Option<QuoteHandle<'_>> {
        self.series
            .get_item(time)
            .map(|it| QuoteHandle {
                quotes: self,
                time: it.time(),
            })
    }

    /// Occurred-row lookup.
    #[must_use]
    pub fn get_item_by_row(&self, row: usize) -> Option<QuoteHandle<'_>> {
        self.series.get_item_by_row(row).map(|it| QuoteHandle {
            quotes: self,
            time: it.time(),
        })
    }

    /// See [`Series::clear_from`].
    pub fn clear_from(&self, time: i64) {
        self.series.clear_from(time);
    }

    /// See [`Series::size`].
    #[must_use]
    pub fn size(&self) -> usize {
        self.series.size()
    }

    /// See [`Series::set_view_mode`].
    pub fn set_view_mode(&self, mode: ViewMode) {
        self.series.set_view_mode(mode);
    }

    /// See [`Series::row_of_time`].
    #[must_use]
    pub fn row_of_time(&self, time: i64) -> i64 {
        self.series.row_of_time(time)
    }

    /// See [`Series::time_of_row`].
    #[must_use]
    pub fn time_of_row(&self, row: i64) -> i64 {
        self.series.time_of_row(row)
    }

    /// See [`Series::read`].
    #[must_use]
    pub fn read(&self) -> SeriesRead<'_> {
        self.series.read()
    }

    /// See [`Series::subscribe`].
    pub fn subscribe(
        &self,
        listener: impl Fn(&SeriesEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.series.subscribe(listener)
    }

    /// See [`Series::unsubscribe`].
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.series.unsubscribe(id)
    }

    /// See [`Series::fire_change`].
    pub fn fire_change(&self, kind: SeriesEventKind, from_time: i64, to_time: i64) {
        self.series.fire_change(kind, from_time, to_time);
    }

    /// Flat tuple read-out for the persistence boundary, in time order.
    /// One read-lock scope, so the snapshot is consistent.
    #[must_use]
    pub fn to_bars(&self) -> Vec<Bar> {
        let read = self.series.read();
        let opens = read.dense(self.cols.open);
        let highs = read.dense(self.cols.high);
        let lows = read.dense(self.cols.low);
        let closes = read.dense(self.cols.close);
        let volumes = read.dense(self.cols.volume);
        let adjs = read.dense(self.cols.adj_close);
        read.times()
            .iter()
            .enumerate()
            .map(|(r, &time)| Bar {
                time,
                open: opens[r],
                high: highs[r],
                low: lows[r],
                close: closes[r],
                volume: volumes[r],
                adj_close: adjs[r],
                source_id: 0,
            })
            .collect()
    }

    /// One row as a flat tuple, if the time occurred.
    #[must_use]
    pub fn bar_at(&self, time: i64) -> Option<Bar> {
        let item = self.get_item(time)?;
        Some(Bar {
            time,
            open: item.open(),
            high: item.high(),
            low: item.low(),
            close: item.close(),
            volume: item.volume(),
            adj_close: item.adj_close(),
            source_id: 0,
        })
    }
}

/// Typed row handle over the standard quote columns.
#[derive(Debug, Clone, Copy)]
pub struct QuoteHandle<'s> {
    quotes: &'s QuoteSeries,
    time: i64,
}

macro_rules! quote_field {
    ($get:ident, $set:ident, $col:ident, $doc:literal) => {
        #[doc = concat!("Reads the ", $doc, ".")]
        #[must_use]
        pub fn $get(&self) -> f64 {
            self.quotes.series.value_at(self.quotes.cols.$col, self.time)
        }

        #[doc = concat!("Writes the ", $doc, ".")]
        ///
        /// # Errors
        /// [`SeriesError::TimeNotIndexed`] when the row was truncated away.
        pub fn $set(&self, value: f64) -> Result<(), SeriesError> {
            self.quotes
                .series
                .set_value(self.quotes.cols.$col, self.time, value)
        }
    };
}

impl QuoteHandle<'_> {
    /// The time this row is addressed by.
    #[must_use]
    pub fn time(&self) -> i64 {
        self.time
    }

    /// True while the row carries no real field data.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.quotes.series.is_clear(self.time)
    }

    quote_field!(open, set_open, open, "open price");
    quote_field!(high, set_high, high, "high price");
    quote_field!(low, set_low, low, "low price");
    quote_field!(close, set_close, close, "close price");
    quote_field!(volume, set_volume, volume, "volume");
    quote_field!(adj_close, set_adj_close, adj_close, "adjusted close");

    /// Writes all six fields from a flat tuple.
    ///
    /// # Errors
    /// Propagates the first failing field write.
    pub fn set_bar(&self, bar: &Bar) -> Result<(), SeriesError> {
        self.set_open(bar.open)?;
        self.set_high(bar.high)?;
        self.set_low(bar.low)?;
        self.set_close(bar.close)?;
        self.set_volume(bar.volume)?;
        self.set_adj_close(bar.adj_close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::is_null;

    const DAY: i64 = 86_400_000;

    #[test]
    fn test_ingestion_contract_roundtrip() {
        let quotes = QuoteSeries::new("EURUSD", Frequency::DAILY);

        let bar = Bar {
            time: DAY,
            open: 1.0,
            high: 1.2,
            low: 0.9,
            close: 1.1,
            volume: 500.0,
            adj_close: 1.1,
            source_id: 0,
        };
        let item = quotes.ensure_row(DAY);
        assert!(item.is_clear());
        item.set_bar(&bar).unwrap();
        quotes.fire_change(SeriesEventKind::Updated, DAY, DAY);

        assert!(!item.is_clear());
        assert_eq!(quotes.bar_at(DAY), Some(bar));
    }

    #[test]
    fn test_to_bars_in_time_order() {
        let quotes = QuoteSeries::new("EURUSD", Frequency::DAILY);
        for day in [2, 0, 1] {
            quotes
                .ensure_row(day * DAY)
                .set_bar(&Bar::flat(day * DAY, day as f64))
                .unwrap();
        }

        let bars = quotes.to_bars();
        let times: Vec<i64> = bars.iter().map(|b| b.time).collect();
        assert_eq!(times, vec![0, DAY, 2 * DAY]);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_clear_row_reads_sentinel() {
        let quotes = QuoteSeries::new("EURUSD", Frequency::DAILY);
        let item = quotes.ensure_row(0);
        assert!(is_null(item.close()));
        assert!(is_null(item.volume()));
    }
}
