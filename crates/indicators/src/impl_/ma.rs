//! Simple moving average over the base close.

use std::sync::Arc;

use crate::error::IndicatorError;
use crate::function::{BaseView, FunctionKind, Source};
use crate::indicator::{ComputeEngine, Indicator, IndicatorCore, IndicatorStage};
use crate::session::SessionId;
use tessera_series::ColumnId;
use tessera_types::NULL_VALUE;

/// Trailing `period`-row arithmetic mean of the close column.
#[derive(Debug)]
pub struct MaIndicator {
    core: IndicatorCore,
    period: usize,
    col: ColumnId,
}

impl MaIndicator {
    /// Binds an MA of the given period to `engine`'s base series.
    ///
    /// # Errors
    /// [`IndicatorError::InvalidParams`] when `period` is 0.
    pub fn new(engine: Arc<ComputeEngine>, period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::invalid_params("MA period must be > 0"));
        }
        let core = IndicatorCore::new(format!("MA({period})"), engine);
        let col = core.output().add_dense_column("ma");
        Ok(Self { core, period, col })
    }

    /// The output column.
    #[must_use]
    pub fn column(&self) -> ColumnId {
        self.col
    }

    /// Computed value at a time; null sentinel before warm-up or when the
    /// row is not computed.
    #[must_use]
    pub fn value_at(&self, time: i64) -> f64 {
        self.core.output().value_at(self.col, time)
    }

    fn spec(&self) -> (FunctionKind, Source) {
        let close = self.core.engine().base().columns().close;
        (
            FunctionKind::Ma {
                period: self.period,
            },
            Source::Column(close),
        )
    }
}

impl Indicator for MaIndicator {
    fn core(&self) -> &IndicatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut IndicatorCore {
        &mut self.core
    }

    fn compute_span(
        &mut self,
        session: SessionId,
        begin_row: usize,
    ) -> Result<(), IndicatorError> {
        let engine = Arc::clone(self.core.engine());
        let (kind, source) = self.spec();
        let view = BaseView::new(engine.base());
        engine.with_arena(|arena| {
            let id = arena.require(kind, source);
            for row in begin_row..view.len() {
                let value = arena.eval(id, session, row, &view);
                self.core
                    .output()
                    .set_value(self.col, view.times()[row], value)?;
            }
            Ok(())
        })
    }

    /// Read-only synthesis for an occurred base time the output series does
    /// not (yet) carry. Reuses the last pass's session so memoized rows are
    /// shared; nothing is inserted anywhere.
    fn transient_value_at(&mut self, time: i64) -> f64 {
        let engine = Arc::clone(self.core.engine());
        let Some(row) = engine.base().series().occurred_row_of(time) else {
            return NULL_VALUE;
        };
        let session = match self.core.stage() {
            IndicatorStage::Computed { session, .. } => session,
            IndicatorStage::Bound => engine.begin_session(),
        };
        let (kind, source) = self.spec();
        let view = BaseView::new(engine.base());
        engine.with_arena(|arena| {
            let id = arena.require(kind, source);
            arena.eval(id, session, row, &view)
        })
    }
}
