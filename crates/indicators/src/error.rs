use thiserror::Error;
use tessera_series::SeriesError;

/// Errors raised by the indicator layer.
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// A write into the output series failed.
    #[error("Series error: {0}")]
    Series(#[from] SeriesError),

    /// Indicator parameters do not make sense (zero period etc.).
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
}

impl IndicatorError {
    /// Convenience constructor for parameter failures.
    #[must_use]
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        IndicatorError::InvalidParams(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IndicatorError::invalid_params("period must be > 0");
        assert_eq!(err.to_string(), "Invalid parameters: period must be > 0");
    }
}
