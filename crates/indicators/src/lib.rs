//! Tessera Indicators
//!
//! Incremental indicator engine for tessera series:
//! - [`math`]: pure windowed/directional kernels with incremental forms
//! - [`function`]: the session-scoped memoized function arena shared by all
//!   indicators over one base series
//! - [`indicator`]: the `compute_from` contract, lifecycle stages, and
//!   crossing/turning helpers
//! - [`impl_`]: MA, EMA and the DMI family (+DI/-DI/DX/ADX/ADXR)

#![deny(clippy::all)]

pub mod error;
pub mod function;
pub mod indicator;
pub mod math;
pub mod session;

pub mod impl_;

// Re-export main types
pub use error::IndicatorError;
pub use function::{BaseView, FunctionArena, FunctionId, FunctionKind, FunctionSpec, Source};
pub use indicator::{
    cross_over, cross_under, turn_down, turn_up, ComputeEngine, Indicator, IndicatorCore,
    IndicatorStage,
};
pub use session::{SessionCounter, SessionId};

pub use impl_::{
    dmi::{DmiColumns, DmiIndicator},
    ema::EmaIndicator,
    ma::MaIndicator,
};
