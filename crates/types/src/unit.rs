//! Sampling time units.

/// Base unit of a sampling frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Unit {
    /// 1 second
    Second,
    /// 1 minute
    Minute,
    /// 1 hour
    Hour,
    /// 1 day
    Day,
    /// 1 week
    Week,
}

/// Error parsing a unit string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseUnitError;

impl std::fmt::Display for ParseUnitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid unit string")
    }
}

impl std::error::Error for ParseUnitError {}

impl std::str::FromStr for Unit {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "S" | "SECOND" => Ok(Unit::Second),
            "M" | "MINUTE" => Ok(Unit::Minute),
            "H" | "HOUR" => Ok(Unit::Hour),
            "D" | "DAY" => Ok(Unit::Day),
            "W" | "WEEK" => Ok(Unit::Week),
            _ => Err(ParseUnitError),
        }
    }
}

/// Milliseconds per day; week arithmetic builds on this.
pub(crate) const MS_PER_DAY: i64 = 86_400_000;

/// 1970-01-01 was a Thursday; Monday-of-week arithmetic needs this offset.
pub(crate) const EPOCH_WEEKDAY_OFFSET: i64 = 3;

impl Unit {
    /// Returns the unit duration in epoch milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        match self {
            Unit::Second => 1_000,
            Unit::Minute => 60_000,
            Unit::Hour => 3_600_000,
            Unit::Day => MS_PER_DAY,
            Unit::Week => 7 * MS_PER_DAY,
        }
    }

    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Second => "Second",
            Unit::Minute => "Minute",
            Unit::Hour => "Hour",
            Unit::Day => "Day",
            Unit::Week => "Week",
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
