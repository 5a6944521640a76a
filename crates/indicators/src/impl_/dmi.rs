//! Directional movement index (Wilder): +DI, -DI, DX, ADX, ADXR.
//!
//! Exercises the recursive arena graph: ADXR reads ADX, ADX reads smoothed
//! DX, DX reads the two DIs, each DI reads Wilder-smoothed DM and TR. All
//! shared levels are memoized once per session regardless of how many of the
//! five outputs ask for them.

use std::sync::Arc;

use crate::error::IndicatorError;
use crate::function::{BaseView, FunctionId, FunctionKind, Source};
use crate::indicator::{ComputeEngine, Indicator, IndicatorCore};
use crate::session::SessionId;
use tessera_series::ColumnId;

/// Output columns of the DMI family.
#[derive(Debug, Clone, Copy)]
pub struct DmiColumns {
    /// +DI column.
    pub di_plus: ColumnId,
    /// -DI column.
    pub di_minus: ColumnId,
    /// DX column.
    pub dx: ColumnId,
    /// ADX column.
    pub adx: ColumnId,
    /// ADXR column.
    pub adxr: ColumnId,
}

/// DMI indicator computing all five derived columns in one recurrence.
#[derive(Debug)]
pub struct DmiIndicator {
    core: IndicatorCore,
    period: usize,
    period_adx: usize,
    cols: DmiColumns,
}

impl DmiIndicator {
    /// Binds a DMI with DI smoothing `period` and ADX smoothing/rating
    /// lookback `period_adx`.
    ///
    /// # Errors
    /// [`IndicatorError::InvalidParams`] when either period is 0.
    pub fn new(
        engine: Arc<ComputeEngine>,
        period: usize,
        period_adx: usize,
    ) -> Result<Self, IndicatorError> {
        if period == 0 || period_adx == 0 {
            return Err(IndicatorError::invalid_params("DMI periods must be > 0"));
        }
        let core = IndicatorCore::new(format!("DMI({period},{period_adx})"), engine);
        let cols = DmiColumns {
            di_plus: core.output().add_dense_column("di_plus"),
            di_minus: core.output().add_dense_column("di_minus"),
            dx: core.output().add_dense_column("dx"),
            adx: core.output().add_dense_column("adx"),
            adxr: core.output().add_dense_column("adxr"),
        };
        Ok(Self {
            core,
            period,
            period_adx,
            cols,
        })
    }

    /// The output columns.
    #[must_use]
    pub fn columns(&self) -> DmiColumns {
        self.cols
    }

    /// ADX value at a time.
    #[must_use]
    pub fn adx_at(&self, time: i64) -> f64 {
        self.core.output().value_at(self.cols.adx, time)
    }
}

struct DmiIds {
    di_plus: FunctionId,
    di_minus: FunctionId,
    dx: FunctionId,
    adx: FunctionId,
    adxr: FunctionId,
}

impl Indicator for DmiIndicator {
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
        let period = self.period;
        let period_adx = self.period_adx;
        let view = BaseView::new(engine.base());
        engine.with_arena(|arena| {
            let ids = DmiIds {
                di_plus: arena.require(FunctionKind::DiPlus { period }, Source::Bars),
                di_minus: arena.require(FunctionKind::DiMinus { period }, Source::Bars),
                dx: arena.require(FunctionKind::Dx { period }, Source::Bars),
                adx: arena.require(FunctionKind::Adx { period, period_adx }, Source::Bars),
                adxr: arena.require(FunctionKind::Adxr { period, period_adx }, Source::Bars),
            };

            let out = self.core.output();
            for row in begin_row..view.len() {
                let time = view.times()[row];
                out.set_value(self.cols.di_plus, time, arena.eval(ids.di_plus, session, row, &view))?;
                out.set_value(self.cols.di_minus, time, arena.eval(ids.di_minus, session, row, &view))?;
                out.set_value(self.cols.dx, time, arena.eval(ids.dx, session, row, &view))?;
                out.set_value(self.cols.adx, time, arena.eval(ids.adx, session, row, &view))?;
                out.set_value(self.cols.adxr, time, arena.eval(ids.adxr, session, row, &view))?;
            }
            Ok(())
        })
    }
}
