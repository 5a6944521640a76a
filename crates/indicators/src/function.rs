//! Memoized function layer.
//!
//! A [`FunctionArena`] turns the pure kernels into incrementally recomputed,
//! shared operators. Entries are keyed by structural equality on
//! `(kind, source)` — every indicator on the same base series that asks for
//! "3-period MA of close" gets the same entry, and within one session each
//! `(entry, row)` pair is computed at most once. A source may be another
//! entry, which is what lets composites (ADX → DX → DI → smoothed DM/TR)
//! share work without exponential re-evaluation.

use std::collections::HashMap;

use crate::math::{direction, stat};
use crate::session::SessionId;
use tessera_series::{ColumnId, QuoteColumns, QuoteSeries, SeriesRead};
use tessera_types::{is_null, NULL_VALUE};

/// Where a function reads its per-row input from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// One dense column of the base series.
    Column(ColumnId),
    /// The high/low/close triple of the base series (direction kernels).
    Bars,
    /// Another function's output series.
    Func(FunctionId),
}

/// Which kernel a function applies, with its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// Trailing-window sum.
    Sum {
        /// Lookback window length.
        period: usize,
    },
    /// Trailing-window moving average.
    Ma {
        /// Lookback window length.
        period: usize,
    },
    /// Exponential moving average, alpha = 2/(period+1).
    Ema {
        /// Smoothing span.
        period: usize,
    },
    /// Wilder smoothing, alpha = 1/period.
    Wilder {
        /// Smoothing period.
        period: usize,
    },
    /// Trailing-window maximum.
    Max {
        /// Lookback window length.
        period: usize,
    },
    /// Trailing-window minimum.
    Min {
        /// Lookback window length.
        period: usize,
    },
    /// Trailing-window population standard deviation.
    StdDev {
        /// Lookback window length.
        period: usize,
    },
    /// Positive directional movement (per-row, from bars).
    DmPlus,
    /// Negative directional movement (per-row, from bars).
    DmMinus,
    /// True range (per-row, from bars).
    TrueRange,
    /// +DI: 100 * wilder(+DM) / wilder(TR).
    DiPlus {
        /// Smoothing period.
        period: usize,
    },
    /// -DI: 100 * wilder(-DM) / wilder(TR).
    DiMinus {
        /// Smoothing period.
        period: usize,
    },
    /// Directional index from +DI/-DI.
    Dx {
        /// DI smoothing period.
        period: usize,
    },
    /// Average directional index: wilder-smoothed DX.
    Adx {
        /// DI/DX smoothing period.
        period: usize,
        /// ADX smoothing period.
        period_adx: usize,
    },
    /// ADX rating: mean of ADX now and `period_adx` rows back.
    Adxr {
        /// DI/DX smoothing period.
        period: usize,
        /// ADX smoothing and rating lookback period.
        period_adx: usize,
    },
}

/// Structural identity of a memoized function instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionSpec {
    /// Kernel and arguments.
    pub kind: FunctionKind,
    /// Input binding.
    pub source: Source,
}

/// Handle into the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(usize);

struct FunctionEntry {
    spec: FunctionSpec,
    deps: Vec<FunctionId>,
    session: SessionId,
    /// Last row computed in `session`; rows above are stale.
    through: Option<usize>,
    values: Vec<f64>,
}

/// Read view of the base series a compute pass evaluates against.
///
/// Holds the series read lock for the duration of the pass so every kernel
/// sees one consistent snapshot.
pub struct BaseView<'a> {
    read: SeriesRead<'a>,
    cols: QuoteColumns,
}

impl<'a> BaseView<'a> {
    /// Locks the base series for reading.
    #[must_use]
    pub fn new(base: &'a QuoteSeries) -> Self {
        Self {
            read: base.read(),
            cols: base.columns(),
        }
    }

    /// Row count of the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read.len()
    }

    /// True when the snapshot has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read.is_empty()
    }

    /// Occurred times of the snapshot.
    #[must_use]
    pub fn times(&self) -> &[i64] {
        self.read.times()
    }

    /// Dense slice of an arbitrary base column.
    #[must_use]
    pub fn dense(&self, col: ColumnId) -> &[f64] {
        self.read.dense(col)
    }

    /// The standard close column.
    #[must_use]
    pub fn closes(&self) -> &[f64] {
        self.read.dense(self.cols.close)
    }

    fn highs(&self) -> &[f64] {
        self.read.dense(self.cols.high)
    }

    fn lows(&self) -> &[f64] {
        self.read.dense(self.cols.low)
    }
}

/// Registry of memoized function instances for one base series.
#[derive(Default)]
pub struct FunctionArena {
    entries: Vec<FunctionEntry>,
    by_spec: HashMap<FunctionSpec, FunctionId>,
}

impl FunctionArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered function instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the instance for `(kind, source)`, registering it and its
    /// dependency closure on first request. Identical requests — from the
    /// same indicator or a different one — share one entry.
    pub fn require(&mut self, kind: FunctionKind, source: Source) -> FunctionId {
        let spec = FunctionSpec { kind, source };
        if let Some(&id) = self.by_spec.get(&spec) {
            return id;
        }

        let deps = match kind {
            FunctionKind::DiPlus { period } => {
                let dm = self.require(FunctionKind::DmPlus, Source::Bars);
                let tr = self.require(FunctionKind::TrueRange, Source::Bars);
                vec![
                    self.require(FunctionKind::Wilder { period }, Source::Func(dm)),
                    self.require(FunctionKind::Wilder { period }, Source::Func(tr)),
                ]
            }
            FunctionKind::DiMinus { period } => {
                let dm = self.require(FunctionKind::DmMinus, Source::Bars);
                let tr = self.require(FunctionKind::TrueRange, Source::Bars);
                vec![
                    self.require(FunctionKind::Wilder { period }, Source::Func(dm)),
                    self.require(FunctionKind::Wilder { period }, Source::Func(tr)),
                ]
            }
            FunctionKind::Dx { period } => vec![
                self.require(FunctionKind::DiPlus { period }, Source::Bars),
                self.require(FunctionKind::DiMinus { period }, Source::Bars),
            ],
            FunctionKind::Adx { period, period_adx } => {
                let dx = self.require(FunctionKind::Dx { period }, Source::Bars);
                vec![self.require(
                    FunctionKind::Wilder { period: period_adx },
                    Source::Func(dx),
                )]
            }
            FunctionKind::Adxr { period, period_adx } => {
                vec![self.require(FunctionKind::Adx { period, period_adx }, Source::Bars)]
            }
            _ => Vec::new(),
        };

        let id = FunctionId(self.entries.len());
        self.entries.push(FunctionEntry {
            spec,
            deps,
            session: SessionId::NONE,
            through: None,
            values: Vec::new(),
        });
        self.by_spec.insert(spec, id);
        id
    }

    /// Value of function `id` at `row` within `session`.
    ///
    /// A stale session invalidates the entry's per-row cache before anything
    /// is read — a new pass never sees the previous pass's values. Rows are
    /// then filled upward from the last computed row so each is computed at
    /// most once per session. Rows before warm-up and rows outside the view
    /// yield the null sentinel.
    pub fn eval(&mut self, id: FunctionId, session: SessionId, row: usize, view: &BaseView<'_>) -> f64 {
        if row >= view.len() {
            return NULL_VALUE;
        }

        let entry = &mut self.entries[id.0];
        if entry.session != session {
            entry.session = session;
            entry.through = None;
            entry.values.clear();
        }
        // The view may cover more rows than the session started with (a
        // read-only probe after the base grew); new slots start null.
        if entry.values.len() < view.len() {
            entry.values.resize(view.len(), NULL_VALUE);
        }

        let start = match self.entries[id.0].through {
            Some(t) if t >= row => return self.entries[id.0].values[row],
            Some(t) => t + 1,
            None => 0,
        };

        for r in start..=row {
            let v = self.compute_row(id, session, r, view);
            let entry = &mut self.entries[id.0];
            entry.values[r] = v;
            entry.through = Some(r);
        }
        self.entries[id.0].values[row]
    }

    /// One row of one entry. Dependencies (and a `Func` source) are brought
    /// up to `row` first, then the kernel runs on their cached slices.
    fn compute_row(&mut self, id: FunctionId, session: SessionId, row: usize, view: &BaseView<'_>) -> f64 {
        let spec = self.entries[id.0].spec;
        let deps = self.entries[id.0].deps.clone();

        for &dep in &deps {
            self.eval(dep, session, row, view);
        }
        if let Source::Func(src) = spec.source {
            self.eval(src, session, row, view);
        }

        let prev = if row == 0 {
            NULL_VALUE
        } else {
            self.entries[id.0].values[row - 1]
        };
        // All mutation (dependency evaluation) is done; the kernel match
        // below only reads, so one shared borrow of the source slice holds.
        let src: &[f64] = match spec.source {
            Source::Column(col) => view.dense(col),
            Source::Func(sid) => &self.entries[sid.0].values,
            Source::Bars => view.closes(),
        };

        match spec.kind {
            FunctionKind::Sum { period } => stat::isum(row, src, period, prev),
            FunctionKind::Ma { period } => stat::ima(row, src, period, prev),
            FunctionKind::Ema { period } => stat::iema(row, src, period, prev),
            FunctionKind::Wilder { period } => stat::iwilder(row, src, period, prev),
            FunctionKind::Max { period } => stat::imax(row, src, period, prev),
            FunctionKind::Min { period } => stat::imin(row, src, period, prev),
            FunctionKind::StdDev { period } => {
                if period == 0 || row + 1 < period {
                    NULL_VALUE
                } else {
                    stat::std_dev(src, row + 1 - period, row)
                }
            }
            FunctionKind::DmPlus => direction::dm_plus(row, view.highs(), view.lows()),
            FunctionKind::DmMinus => direction::dm_minus(row, view.highs(), view.lows()),
            FunctionKind::TrueRange => {
                direction::true_range(row, view.highs(), view.lows(), view.closes())
            }
            FunctionKind::DiPlus { .. } | FunctionKind::DiMinus { .. } => {
                let sm_dm = self.entries[deps[0].0].values[row];
                let sm_tr = self.entries[deps[1].0].values[row];
                direction::di(sm_dm, sm_tr)
            }
            FunctionKind::Dx { .. } => {
                let di_plus = self.entries[deps[0].0].values[row];
                let di_minus = self.entries[deps[1].0].values[row];
                direction::dx(di_plus, di_minus)
            }
            FunctionKind::Adx { .. } => self.entries[deps[0].0].values[row],
            FunctionKind::Adxr { period_adx, .. } => {
                let adx = &self.entries[deps[0].0].values;
                if row < period_adx {
                    NULL_VALUE
                } else {
                    let a = adx[row];
                    let b = adx[row - period_adx];
                    if is_null(a) || is_null(b) {
                        NULL_VALUE
                    } else {
                        (a + b) / 2.0
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionCounter;
    use approx::assert_relative_eq;
    use tessera_series::QuoteSeries;
    use tessera_types::{Bar, Frequency};

    const DAY: i64 = 86_400_000;

    fn seeded_base(closes: &[f64]) -> QuoteSeries {
        let base = QuoteSeries::new("base", Frequency::DAILY);
        for (i, &c) in closes.iter().enumerate() {
            base.ensure_row(i as i64 * DAY)
                .set_bar(&Bar::flat(i as i64 * DAY, c))
                .unwrap();
        }
        base
    }

    #[test]
    fn test_require_shares_identical_specs() {
        let base = seeded_base(&[1.0, 2.0, 3.0]);
        let close = base.columns().close;
        let mut arena = FunctionArena::new();

        let a = arena.require(FunctionKind::Ma { period: 3 }, Source::Column(close));
        let b = arena.require(FunctionKind::Ma { period: 3 }, Source::Column(close));
        let c = arena.require(FunctionKind::Ma { period: 5 }, Source::Column(close));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_eval_ma_and_warmup() {
        let base = seeded_base(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let close = base.columns().close;
        let mut arena = FunctionArena::new();
        let sessions = SessionCounter::new();
        let session = sessions.begin();

        let ma3 = arena.require(FunctionKind::Ma { period: 3 }, Source::Column(close));
        let view = BaseView::new(&base);

        assert!(is_null(arena.eval(ma3, session, 0, &view)));
        assert!(is_null(arena.eval(ma3, session, 1, &view)));
        assert_relative_eq!(arena.eval(ma3, session, 2, &view), 2.0);
        assert_relative_eq!(arena.eval(ma3, session, 4, &view), 4.0);
        // Out of range is quiet
        assert!(is_null(arena.eval(ma3, session, 99, &view)));
    }

    #[test]
    fn test_composite_graph_shares_lower_levels() {
        let mut arena = FunctionArena::new();

        arena.require(
            FunctionKind::Adx {
                period: 14,
                period_adx: 14,
            },
            Source::Bars,
        );
        let before = arena.len();
        // ADXR reuses the whole ADX closure, adding only itself
        arena.require(
            FunctionKind::Adxr {
                period: 14,
                period_adx: 14,
            },
            Source::Bars,
        );
        assert_eq!(arena.len(), before + 1);
    }

    #[test]
    fn test_stale_session_recomputes() {
        let base = seeded_base(&[1.0, 2.0, 3.0]);
        let close = base.columns().close;
        let mut arena = FunctionArena::new();
        let sessions = SessionCounter::new();

        let ma3 = arena.require(FunctionKind::Ma { period: 3 }, Source::Column(close));

        let s1 = sessions.begin();
        {
            let view = BaseView::new(&base);
            assert_relative_eq!(arena.eval(ma3, s1, 2, &view), 2.0);
        }

        // Base grows between passes; the old session's cache must not leak
        base.ensure_row(3 * DAY)
            .set_bar(&Bar::flat(3 * DAY, 9.0))
            .unwrap();

        let s2 = sessions.begin();
        let view = BaseView::new(&base);
        assert_relative_eq!(arena.eval(ma3, s2, 2, &view), 2.0);
        assert_relative_eq!(arena.eval(ma3, s2, 3, &view), (2.0 + 3.0 + 9.0) / 3.0);
    }

    #[test]
    fn test_di_matches_hand_rolled_smoothing() {
        // Trending bars: every bar ranges 2 wide, closes 1 higher
        let base = QuoteSeries::new("trend", Frequency::DAILY);
        for i in 0..6i64 {
            let it = base.ensure_row(i * DAY);
            it.set_open(100.0 + i as f64).unwrap();
            it.set_high(102.0 + i as f64).unwrap();
            it.set_low(100.0 + i as f64).unwrap();
            it.set_close(101.0 + i as f64).unwrap();
            it.set_volume(1.0).unwrap();
            it.set_adj_close(101.0 + i as f64).unwrap();
        }

        let mut arena = FunctionArena::new();
        let sessions = SessionCounter::new();
        let session = sessions.begin();
        let di_plus = arena.require(FunctionKind::DiPlus { period: 3 }, Source::Bars);
        let view = BaseView::new(&base);

        // Row 0 has no prior bar anywhere in the chain
        assert!(is_null(arena.eval(di_plus, session, 0, &view)));

        // From row 1 on: +DM = 1, TR = 2 each row, both seeded at row 1, so
        // the smoothed ratio is exactly 100 * 1/2 at every row
        for row in 1..6 {
            assert_relative_eq!(arena.eval(di_plus, session, row, &view), 50.0, epsilon = 1e-9);
        }
    }
}
