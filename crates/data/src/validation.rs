//! Quote record validation.

use crate::error::DataError;
use tessera_types::Bar;

/// Validates a batch of quote records before they touch a store.
///
/// # Errors
/// - [`DataError::EmptyData`] when `bars` is empty.
/// - [`DataError::CorruptData`] for non-finite fields, negative volume,
///   OHLC ordering violations, or non-monotonic times.
pub fn validate_bars(bars: &[Bar]) -> Result<(), DataError> {
    if bars.is_empty() {
        return Err(DataError::EmptyData);
    }

    for (i, bar) in bars.iter().enumerate() {
        if !bar.open.is_finite()
            || !bar.high.is_finite()
            || !bar.low.is_finite()
            || !bar.close.is_finite()
            || !bar.volume.is_finite()
            || !bar.adj_close.is_finite()
        {
            return Err(DataError::CorruptData(format!(
                "NaN/Inf at index {i}: {bar:?}"
            )));
        }

        if bar.volume < 0.0 {
            return Err(DataError::CorruptData(format!(
                "Negative volume at index {i}: {}",
                bar.volume
            )));
        }

        if bar.low > bar.open
            || bar.low > bar.close
            || bar.high < bar.open
            || bar.high < bar.close
            || bar.low > bar.high
        {
            return Err(DataError::CorruptData(format!(
                "Invalid OHLC at index {i}: low={}, high={}, open={}, close={}",
                bar.low, bar.high, bar.open, bar.close
            )));
        }

        if i > 0 && bar.time <= bars[i - 1].time {
            return Err(DataError::CorruptData(format!(
                "Non-monotonic time at index {i}: {} <= {}",
                bar.time,
                bars[i - 1].time
            )));
        }
    }

    Ok(())
}
