//! End-to-end `compute_from` behavior over a seeded daily base series.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_relative_eq;
use tessera_indicators::{
    ComputeEngine, DmiIndicator, EmaIndicator, Indicator, IndicatorStage, MaIndicator,
};
use tessera_series::{QuoteSeries, SeriesEventKind};
use tessera_types::{is_null, Bar, Frequency};

const DAY: i64 = 86_400_000;

fn ascending_base(n: usize) -> Arc<QuoteSeries> {
    let base = QuoteSeries::new("base", Frequency::DAILY);
    for i in 0..n {
        let t = i as i64 * DAY;
        base.ensure_row(t)
            .set_bar(&Bar::flat(t, (i + 1) as f64))
            .unwrap();
    }
    base.fire_change(SeriesEventKind::FinishedLoad, 0, (n as i64 - 1) * DAY);
    Arc::new(base)
}

#[test]
fn ma3_over_ten_ascending_closes() {
    // Closes 1..=10; a 3-period MA must be null for rows 0-1 and the window
    // mean for rows 2..9.
    let base = ascending_base(10);
    let engine = ComputeEngine::new(Arc::clone(&base));
    let mut ma = MaIndicator::new(engine, 3).unwrap();

    ma.compute_from(0).unwrap();

    assert!(is_null(ma.value_at(0)));
    assert!(is_null(ma.value_at(DAY)));
    for row in 2..10i64 {
        let expected = (row as f64 + (row - 1) as f64 + (row - 2) as f64) / 3.0 + 1.0;
        assert_relative_eq!(ma.value_at(row * DAY), expected, epsilon = 1e-12);
    }
    assert_eq!(ma.core().output().occurred_size(), 10);
}

#[test]
fn compute_from_fires_finished_compute_once() {
    let base = ascending_base(5);
    let engine = ComputeEngine::new(Arc::clone(&base));
    let mut ma = MaIndicator::new(engine, 3).unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_l = Arc::clone(&fired);
    ma.core().output().subscribe(move |e| {
        if e.kind == SeriesEventKind::FinishedCompute {
            assert_eq!(e.from_time, 0);
            assert_eq!(e.to_time, 4 * DAY);
            fired_l.fetch_add(1, Ordering::SeqCst);
        }
    });

    ma.compute_from(0).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn recompute_from_earlier_time_is_idempotent() {
    let base = ascending_base(10);
    let engine = ComputeEngine::new(Arc::clone(&base));
    let mut ma = MaIndicator::new(engine, 3).unwrap();

    ma.compute_from(7 * DAY).unwrap();
    let late_only = ma.value_at(8 * DAY);

    ma.compute_from(0).unwrap();
    let after_full: Vec<f64> = (0..10).map(|r| ma.value_at(r * DAY)).collect();

    ma.compute_from(0).unwrap();
    let after_repeat: Vec<f64> = (0..10).map(|r| ma.value_at(r * DAY)).collect();

    assert_relative_eq!(late_only, after_full[8], epsilon = 1e-12);
    for (a, b) in after_full.iter().zip(after_repeat.iter()) {
        if is_null(*a) {
            assert!(is_null(*b));
        } else {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }
}

#[test]
fn session_isolation_across_base_mutation() {
    let base = ascending_base(10);
    let engine = ComputeEngine::new(Arc::clone(&base));
    let mut ma = MaIndicator::new(engine, 3).unwrap();

    ma.compute_from(0).unwrap();
    let IndicatorStage::Computed { session: s1, .. } = ma.core().stage() else {
        panic!("first pass did not reach Computed");
    };
    let before = ma.value_at(5 * DAY);

    // Rewrite one interior close between passes
    base.ensure_row(4 * DAY)
        .set_bar(&Bar::flat(4 * DAY, 100.0))
        .unwrap();
    base.fire_change(SeriesEventKind::Updated, 4 * DAY, 4 * DAY);

    ma.compute_from(0).unwrap();
    let IndicatorStage::Computed { session: s2, .. } = ma.core().stage() else {
        panic!("second pass did not reach Computed");
    };

    // Strictly newer session, and the overlapping row reflects the mutation
    // instead of the first pass's cached value.
    assert!(s2 > s1);
    let after = ma.value_at(5 * DAY);
    assert_relative_eq!(before, (4.0 + 5.0 + 6.0) / 3.0, epsilon = 1e-12);
    assert_relative_eq!(after, (100.0 + 5.0 + 6.0) / 3.0, epsilon = 1e-12);
}

#[test]
fn two_indicators_share_one_arena_entry() {
    let base = ascending_base(10);
    let engine = ComputeEngine::new(Arc::clone(&base));
    let mut ma_a = MaIndicator::new(Arc::clone(&engine), 3).unwrap();
    let mut ma_b = MaIndicator::new(Arc::clone(&engine), 3).unwrap();

    ma_a.compute_from(0).unwrap();
    ma_b.compute_from(0).unwrap();

    // Identical (kind, args, source) collapse to a single registered entry
    engine.with_arena(|arena| assert_eq!(arena.len(), 1));
    assert_relative_eq!(ma_a.value_at(9 * DAY), ma_b.value_at(9 * DAY));
}

#[test]
fn ema_matches_manual_recurrence() {
    let base = ascending_base(5);
    let engine = ComputeEngine::new(Arc::clone(&base));
    let mut ema = EmaIndicator::new(engine, 3).unwrap();
    ema.compute_from(0).unwrap();

    let alpha = 0.5;
    let mut expected = 1.0;
    assert_relative_eq!(ema.value_at(0), expected);
    for i in 1..5i64 {
        expected = (1.0 - alpha) * expected + alpha * (i + 1) as f64;
        assert_relative_eq!(ema.value_at(i * DAY), expected, epsilon = 1e-12);
    }
}

#[test]
fn dmi_warms_up_and_stays_bounded() {
    let base = QuoteSeries::new("trend", Frequency::DAILY);
    for i in 0..40i64 {
        let item = base.ensure_row(i * DAY);
        let drift = i as f64 + (i % 3) as f64; // up-trend with wiggle
        item.set_open(100.0 + drift).unwrap();
        item.set_high(102.0 + drift).unwrap();
        item.set_low(99.0 + drift).unwrap();
        item.set_close(101.0 + drift).unwrap();
        item.set_volume(1000.0).unwrap();
        item.set_adj_close(101.0 + drift).unwrap();
    }
    let base = Arc::new(base);
    let engine = ComputeEngine::new(Arc::clone(&base));
    let mut dmi = DmiIndicator::new(engine, 14, 14).unwrap();
    dmi.compute_from(0).unwrap();

    let cols = dmi.columns();
    let out = dmi.core().output();

    // Row 0 everywhere null (no prior bar), ADXR null until its lookback
    assert!(is_null(out.value(cols.di_plus, 0)));
    assert!(is_null(out.value(cols.adx, 0)));
    assert!(is_null(out.value(cols.adxr, 5)));

    for row in 15..40 {
        for col in [cols.di_plus, cols.di_minus, cols.dx, cols.adx, cols.adxr] {
            let v = out.value(col, row);
            assert!(
                v.is_finite() && (0.0..=100.0).contains(&v),
                "row {row}: {v} out of range"
            );
        }
    }
}

#[test]
fn transient_value_does_not_grow_output() {
    let base = ascending_base(10);
    let engine = ComputeEngine::new(Arc::clone(&base));
    let mut ma = MaIndicator::new(engine, 3).unwrap();

    let v = ma.transient_value_at(5 * DAY);
    assert_relative_eq!(v, (4.0 + 5.0 + 6.0) / 3.0, epsilon = 1e-12);
    assert_eq!(ma.core().output().occurred_size(), 0);

    // Unknown time stays quiet
    assert!(is_null(ma.transient_value_at(99 * DAY)));
}
