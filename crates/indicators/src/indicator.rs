//! Indicator base: the `compute_from` re-entrant recompute contract.
//!
//! An indicator binds one base [`QuoteSeries`] (through a shared
//! [`ComputeEngine`]) to an owned output [`Series`] holding its derived
//! columns. `compute_from(t)` mints a fresh session id, grows a clear output
//! row for every base row at/after the floor of `t`, runs the per-row
//! recurrence through the memoized arena, and announces `FinishedCompute`.
//! Re-running from an earlier time is idempotent.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::IndicatorError;
use crate::function::{BaseView, FunctionArena};
use crate::session::{SessionCounter, SessionId};
use tessera_series::{QuoteSeries, Series, SeriesEventKind};
use tessera_types::NULL_VALUE;

/// Shared computation context for all indicators over one base series.
///
/// Owns the function arena (so identical kernels are shared across
/// indicators) and the session counter. The arena is driven from one
/// computation thread at a time; concurrent `compute_from` calls serialize
/// on the arena lock.
pub struct ComputeEngine {
    base: Arc<QuoteSeries>,
    arena: Mutex<FunctionArena>,
    sessions: SessionCounter,
}

impl ComputeEngine {
    /// Creates the engine for a base series.
    #[must_use]
    pub fn new(base: Arc<QuoteSeries>) -> Arc<Self> {
        Arc::new(Self {
            base,
            arena: Mutex::new(FunctionArena::new()),
            sessions: SessionCounter::new(),
        })
    }

    /// The base series indicators compute over.
    #[must_use]
    pub fn base(&self) -> &QuoteSeries {
        &self.base
    }

    /// Mints the session id for a new top-level compute pass.
    pub fn begin_session(&self) -> SessionId {
        self.sessions.begin()
    }

    /// Runs `f` with the locked function arena.
    pub fn with_arena<R>(&self, f: impl FnOnce(&mut FunctionArena) -> R) -> R {
        f(&mut self.arena.lock())
    }
}

impl std::fmt::Debug for ComputeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeEngine")
            .field("base", &self.base.series().name())
            .finish()
    }
}

/// Where an indicator instance is in its lifecycle.
///
/// Binding happens at construction (an unbound indicator is not
/// representable), so the machine only moves `Bound → Computed` and back to
/// `Computed` with a newer session on each pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorStage {
    /// Bound to a base series, nothing computed yet.
    Bound,
    /// Computed through `through_time` by the pass `session`.
    Computed {
        /// Last base time covered by the pass.
        through_time: i64,
        /// Session id of the pass.
        session: SessionId,
    },
}

/// Common state every indicator carries.
#[derive(Debug)]
pub struct IndicatorCore {
    engine: Arc<ComputeEngine>,
    output: Series,
    stage: IndicatorStage,
}

impl IndicatorCore {
    /// Binds a new indicator to `engine`'s base series. The output series
    /// inherits the base frequency.
    #[must_use]
    pub fn new(name: impl Into<String>, engine: Arc<ComputeEngine>) -> Self {
        let output = Series::new(name, engine.base().freq());
        Self {
            engine,
            output,
            stage: IndicatorStage::Bound,
        }
    }

    /// The shared compute engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<ComputeEngine> {
        &self.engine
    }

    /// The indicator's own output series.
    #[must_use]
    pub fn output(&self) -> &Series {
        &self.output
    }

    /// Current lifecycle stage.
    #[must_use]
    pub fn stage(&self) -> IndicatorStage {
        self.stage
    }
}

/// The re-entrant recompute contract.
///
/// Implementors supply the per-row recurrence in
/// [`Indicator::compute_span`]; the provided [`Indicator::compute_from`]
/// drives sessions, output-row lifecycle and change notification.
pub trait Indicator {
    /// Shared state accessor.
    fn core(&self) -> &IndicatorCore;

    /// Shared state accessor, mutable.
    fn core_mut(&mut self) -> &mut IndicatorCore;

    /// Fills output columns for every base row in `begin_row..base_len`,
    /// evaluating kernels through the engine arena under `session`.
    ///
    /// # Errors
    /// Propagates output-series write failures.
    fn compute_span(&mut self, session: SessionId, begin_row: usize)
        -> Result<(), IndicatorError>;

    /// Recomputes everything at/after the floor of `from_time`.
    ///
    /// Bumps the session id (invalidating every memoized row of the previous
    /// pass), ensures a clear output row per covered base row, runs the
    /// recurrence, and fires `FinishedCompute` for the covered range.
    ///
    /// # Errors
    /// Propagates [`Indicator::compute_span`] failures.
    fn compute_from(&mut self, from_time: i64) -> Result<(), IndicatorError> {
        let engine = Arc::clone(self.core().engine());
        let session = engine.begin_session();

        let span = {
            let view = BaseView::new(engine.base());
            let times = view.times();
            let floor = engine.base().freq().round_floor(from_time);
            let begin_row = times.partition_point(|&t| t < floor);
            if begin_row >= times.len() {
                None
            } else {
                for &t in &times[begin_row..] {
                    self.core().output().ensure_row(t);
                }
                Some((begin_row, times[begin_row], times[times.len() - 1]))
            }
        };
        let Some((begin_row, from, to)) = span else {
            return Ok(());
        };

        self.compute_span(session, begin_row)?;

        let core = self.core_mut();
        core.stage = IndicatorStage::Computed {
            through_time: to,
            session,
        };
        tracing::debug!(
            indicator = core.output.name(),
            begin_row,
            from,
            to,
            "compute pass finished"
        );
        core.output
            .fire_change(SeriesEventKind::FinishedCompute, from, to);
        Ok(())
    }

    /// On-demand read fast path: the value this indicator would compute for
    /// `time`, without growing its output series. Indicators that support
    /// transient synthesis override this; the default reports the null
    /// sentinel.
    fn transient_value_at(&mut self, _time: i64) -> f64 {
        NULL_VALUE
    }
}

// ---- crossing/turning helpers -------------------------------------------
//
// Two/three-point comparisons over parallel value slices. Rows 0 and 1 are
// guarded so no lookback goes negative; null values make every comparison
// false, which is the conservative answer for a signal predicate.

/// True when `a` closes above `b` at `row` having been at/below it before.
#[must_use]
pub fn cross_over(row: usize, a: &[f64], b: &[f64]) -> bool {
    if row == 0 || row >= a.len() || row >= b.len() {
        return false;
    }
    a[row] > b[row] && a[row - 1] <= b[row - 1]
}

/// True when `a` closes below `b` at `row` having been at/above it before.
#[must_use]
pub fn cross_under(row: usize, a: &[f64], b: &[f64]) -> bool {
    if row == 0 || row >= a.len() || row >= b.len() {
        return false;
    }
    a[row] < b[row] && a[row - 1] >= b[row - 1]
}

/// True when `a` rises at `row` after not rising at `row - 1`.
#[must_use]
pub fn turn_up(row: usize, a: &[f64]) -> bool {
    if row < 2 || row >= a.len() {
        return false;
    }
    a[row] > a[row - 1] && a[row - 1] <= a[row - 2]
}

/// True when `a` falls at `row` after not falling at `row - 1`.
#[must_use]
pub fn turn_down(row: usize, a: &[f64]) -> bool {
    if row < 2 || row >= a.len() {
        return false;
    }
    a[row] < a[row - 1] && a[row - 1] >= a[row - 2]
}
