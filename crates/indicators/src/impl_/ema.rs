//! Exponential moving average over the base close.

use std::sync::Arc;

use crate::error::IndicatorError;
use crate::function::{BaseView, FunctionKind, Source};
use crate::indicator::{ComputeEngine, Indicator, IndicatorCore};
use crate::session::SessionId;
use tessera_series::ColumnId;

/// EMA of the close column, alpha = 2/(period+1), seeded on the first
/// finite close.
#[derive(Debug)]
pub struct EmaIndicator {
    core: IndicatorCore,
    period: usize,
    col: ColumnId,
}

impl EmaIndicator {
    /// Binds an EMA of the given period to `engine`'s base series.
    ///
    /// # Errors
    /// [`IndicatorError::InvalidParams`] when `period` is 0.
    pub fn new(engine: Arc<ComputeEngine>, period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::invalid_params("EMA period must be > 0"));
        }
        let core = IndicatorCore::new(format!("EMA({period})"), engine);
        let col = core.output().add_dense_column("ema");
        Ok(Self { core, period, col })
    }

    /// The output column.
    #[must_use]
    pub fn column(&self) -> ColumnId {
        self.col
    }

    /// Computed value at a time.
    #[must_use]
    pub fn value_at(&self, time: i64) -> f64 {
        self.core.output().value_at(self.col, time)
    }
}

impl Indicator for EmaIndicator {
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
        let close = engine.base().columns().close;
        let view = BaseView::new(engine.base());
        engine.with_arena(|arena| {
            let id = arena.require(
                FunctionKind::Ema {
                    period: self.period,
                },
                Source::Column(close),
            );
            for row in begin_row..view.len() {
                let value = arena.eval(id, session, row, &view);
                self.core
                    .output()
                    .set_value(self.col, view.times()[row], value)?;
            }
            Ok(())
        })
    }
}
