//! Bulk load/save boundary.
//!
//! Acquisition collaborators hand the store a flat, ordered list of quote
//! records; rendering/persistence collaborators read the same shape back.
//! Nothing beyond that tuple is part of the contract.

use crate::error::DataError;
use crate::validation::validate_bars;
use tessera_series::{QuoteSeries, SeriesEventKind};
use tessera_types::Bar;

/// Loads a validated batch into a quote series and fires one
/// `FinishedLoad` event for the whole range.
///
/// Record times must already sit on bucket starts of the series frequency;
/// producers round, the loader only checks.
///
/// # Errors
/// - validation failures from [`validate_bars`]
/// - [`DataError::UnalignedTime`] for a record off the frequency grid
/// - store write failures
pub fn load_bars(quotes: &QuoteSeries, bars: &[Bar]) -> Result<(), DataError> {
    validate_bars(bars)?;

    let freq = quotes.freq();
    for bar in bars {
        if !freq.is_self_defined() && !freq.is_bucket_start(bar.time) {
            return Err(DataError::UnalignedTime { time: bar.time });
        }
    }

    for bar in bars {
        let item = quotes.ensure_row(bar.time);
        item.set_bar(bar)?;
    }

    let from = bars[0].time;
    let to = bars[bars.len() - 1].time;
    tracing::debug!(series = quotes.series().name(), n = bars.len(), from, to, "bulk load");
    quotes.fire_change(SeriesEventKind::FinishedLoad, from, to);
    Ok(())
}

/// Reads the series back out as the flat tuple list, in time order.
#[must_use]
pub fn export_bars(quotes: &QuoteSeries) -> Vec<Bar> {
    quotes.to_bars()
}
