//! Frequency-resampling combiner.
//!
//! Aggregates a source quote series into a coarser-frequency target series
//! (daily → weekly and the like). Folding happens in the split-adjusted
//! basis so a split occurring mid-bucket does not distort the aggregate,
//! and the committed bucket is mapped back to the de-adjusted basis of its
//! last source bar — consumers that apply adjustment themselves must not
//! receive pre-adjusted values.
//!
//! The combiner subscribes to the source's change events and re-aggregates
//! only from the earliest affected bucket forward.

use std::sync::{Arc, Weak};

use crate::error::DataError;
use tessera_series::{QuoteSeries, SeriesEventKind, SubscriptionId};
use tessera_types::{is_null, Bar, Frequency, NULL_VALUE};

/// Linear rescale of `v` from the raw basis `(close, adj_close)` into the
/// adjusted basis. Identity when the bar carries no usable basis.
fn to_adjusted(v: f64, close: f64, adj_close: f64) -> f64 {
    if !close.is_finite() || close == 0.0 || !adj_close.is_finite() {
        return v;
    }
    (v - close) / close * adj_close + adj_close
}

/// Inverse of [`to_adjusted`] for the committing basis.
fn to_deadjusted(v: f64, close: f64, adj_close: f64) -> f64 {
    if !adj_close.is_finite() || adj_close == 0.0 || !close.is_finite() {
        return v;
    }
    (v - adj_close) / adj_close * close + close
}

/// One open target bucket being folded, kept in the adjusted basis.
struct BucketAgg {
    bucket: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    last_close: f64,
    last_adj: f64,
}

impl BucketAgg {
    fn open_at(bucket: i64) -> Self {
        Self {
            bucket,
            open: NULL_VALUE,
            high: NULL_VALUE,
            low: NULL_VALUE,
            close: NULL_VALUE,
            volume: 0.0,
            last_close: NULL_VALUE,
            last_adj: NULL_VALUE,
        }
    }

    fn fold(&mut self, bar_open: f64, bar_high: f64, bar_low: f64, bar_close: f64, bar_volume: f64, bar_adj: f64) {
        let o = to_adjusted(bar_open, bar_close, bar_adj);
        let h = to_adjusted(bar_high, bar_close, bar_adj);
        let l = to_adjusted(bar_low, bar_close, bar_adj);

        if is_null(self.open) && !is_null(o) {
            self.open = o;
        }
        if !is_null(h) && (is_null(self.high) || h > self.high) {
            self.high = h;
        }
        if !is_null(l) && (is_null(self.low) || l < self.low) {
            self.low = l;
        }
        if !is_null(bar_close) {
            // Adjusted close of the bar is its adj_close by construction
            self.close = to_adjusted(bar_close, bar_close, bar_adj);
            self.last_close = bar_close;
            self.last_adj = if bar_adj.is_finite() { bar_adj } else { bar_close };
        }
        if !is_null(bar_volume) {
            self.volume += bar_volume;
        }
    }

    /// Maps the aggregate back to the de-adjusted basis of the bucket's last
    /// source bar and emits it as a flat record.
    fn commit(self) -> Bar {
        let (c, a) = (self.last_close, self.last_adj);
        Bar {
            time: self.bucket,
            open: to_deadjusted(self.open, c, a),
            high: to_deadjusted(self.high, c, a),
            low: to_deadjusted(self.low, c, a),
            close: to_deadjusted(self.close, c, a),
            volume: self.volume,
            adj_close: self.last_adj,
            source_id: 0,
        }
    }
}

/// Re-aggregates every source row at/after the target bucket containing
/// `from_time` into `target`.
fn recombine(source: &QuoteSeries, target: &QuoteSeries, from_time: i64) -> Result<(), DataError> {
    let f2 = target.freq();
    let start_bucket = f2.round_floor(from_time);

    // Fold under the source read lock, write after releasing it.
    let committed: Vec<Bar> = {
        let read = source.read();
        let times = read.times();
        let cols = source.columns();
        let opens = read.dense(cols.open);
        let highs = read.dense(cols.high);
        let lows = read.dense(cols.low);
        let closes = read.dense(cols.close);
        let volumes = read.dense(cols.volume);
        let adjs = read.dense(cols.adj_close);

        let start_row = times.partition_point(|&t| t < start_bucket);
        let mut out = Vec::new();
        let mut agg: Option<BucketAgg> = None;
        for r in start_row..times.len() {
            let bucket = f2.round_floor(times[r]);
            if agg.as_ref().map(|a| a.bucket) != Some(bucket) {
                if let Some(done) = agg.take() {
                    out.push(done.commit());
                }
                agg = Some(BucketAgg::open_at(bucket));
            }
            if let Some(a) = agg.as_mut() {
                a.fold(opens[r], highs[r], lows[r], closes[r], volumes[r], adjs[r]);
            }
        }
        if let Some(done) = agg.take() {
            out.push(done.commit());
        }
        out
    };

    target.clear_from(start_bucket);
    if committed.is_empty() {
        return Ok(());
    }
    for bar in &committed {
        target.ensure_row(bar.time).set_bar(bar)?;
    }
    let from = committed[0].time;
    let to = committed[committed.len() - 1].time;
    tracing::debug!(
        source = source.series().name(),
        target = target.series().name(),
        buckets = committed.len(),
        "recombined"
    );
    target.fire_change(SeriesEventKind::Updated, from, to);
    Ok(())
}

/// Aggregates one quote series into a coarser-frequency one, live.
///
/// Holds the target; shares the source. The source subscription is removed
/// on drop so a discarded combiner does not keep reacting (or keep its
/// series pair alive through the listener).
pub struct SeriesCombiner {
    source: Arc<QuoteSeries>,
    target: Arc<QuoteSeries>,
    sub: Option<SubscriptionId>,
}

impl SeriesCombiner {
    /// Creates a combiner from `source` into a fresh target series named
    /// `name` at `target_freq`, aggregates what the source already holds,
    /// and subscribes for future changes.
    ///
    /// # Errors
    /// Propagates target write failures from the initial aggregation.
    pub fn new(
        source: Arc<QuoteSeries>,
        name: impl Into<String>,
        target_freq: Frequency,
    ) -> Result<Self, DataError> {
        let target = Arc::new(QuoteSeries::new(name, target_freq));

        if let Some(first) = source.series().first_time() {
            recombine(&source, &target, first)?;
        }

        // Weak on both sides: the listener must not keep the pair alive
        // once the combiner is gone.
        let weak_source: Weak<QuoteSeries> = Arc::downgrade(&source);
        let weak_target: Weak<QuoteSeries> = Arc::downgrade(&target);
        let sub = source.subscribe(move |event| {
            let (Some(source), Some(target)) = (weak_source.upgrade(), weak_target.upgrade())
            else {
                return;
            };
            match event.kind {
                SeriesEventKind::Clear => {
                    target.clear_from(target.freq().round_floor(event.from_time));
                }
                SeriesEventKind::Refresh
                | SeriesEventKind::FinishedLoad
                | SeriesEventKind::Updated
                | SeriesEventKind::FinishedCompute => {
                    if let Err(err) = recombine(&source, &target, event.from_time) {
                        tracing::warn!(%err, "recombine after source change failed");
                    }
                }
            }
        });

        Ok(Self {
            source,
            target,
            sub: Some(sub),
        })
    }

    /// The aggregated series.
    #[must_use]
    pub fn target(&self) -> &Arc<QuoteSeries> {
        &self.target
    }

    /// The source series.
    #[must_use]
    pub fn source(&self) -> &Arc<QuoteSeries> {
        &self.source
    }

    /// Forces re-aggregation from the bucket containing `from_time`.
    ///
    /// # Errors
    /// Propagates target write failures.
    pub fn compute_from(&self, from_time: i64) -> Result<(), DataError> {
        recombine(&self.source, &self.target, from_time)
    }
}

impl Drop for SeriesCombiner {
    fn drop(&mut self) {
        if let Some(sub) = self.sub.take() {
            self.source.unsubscribe(sub);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_adjust_roundtrip() {
        // 2:1 split basis: raw 110 on a (close=100, adj=50) bar maps to 55
        assert_relative_eq!(to_adjusted(110.0, 100.0, 50.0), 55.0);
        assert_relative_eq!(to_deadjusted(55.0, 100.0, 50.0), 110.0);
        // Identity basis
        assert_relative_eq!(to_adjusted(7.0, 10.0, 10.0), 7.0);
        // Unusable basis is identity
        assert_relative_eq!(to_adjusted(7.0, f64::NAN, 10.0), 7.0);
        assert_relative_eq!(to_adjusted(7.0, 0.0, 10.0), 7.0);
    }
}
