//! Sampling frequency and calendar-bucket arithmetic.
//!
//! A [`Frequency`] is a value type `{unit, multiplier}` whose identity is its
//! interval: two frequencies with the same interval compare equal and hash
//! alike regardless of how they were spelled (4 x 15-minute == 1-hour).
//!
//! All bucket arithmetic works on epoch-millisecond timestamps in UTC and is
//! pure integer math. Week buckets start on Monday 00:00 UTC.

use crate::unit::{Unit, EPOCH_WEEKDAY_OFFSET, MS_PER_DAY};

/// Sampling granularity: a base [`Unit`] times a multiplier.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Frequency {
    /// Base time unit.
    pub unit: Unit,
    /// Number of units per bucket.
    pub multiplier: u32,
}

impl Frequency {
    /// One second.
    pub const ONE_SECOND: Frequency = Frequency::new(Unit::Second, 1);
    /// One minute.
    pub const ONE_MINUTE: Frequency = Frequency::new(Unit::Minute, 1);
    /// One hour.
    pub const HOURLY: Frequency = Frequency::new(Unit::Hour, 1);
    /// One day.
    pub const DAILY: Frequency = Frequency::new(Unit::Day, 1);
    /// One ISO week (Monday-anchored).
    pub const WEEKLY: Frequency = Frequency::new(Unit::Week, 1);
    /// Placeholder for series whose spacing is defined by the data itself.
    /// Zero interval; all bucket arithmetic degenerates to the identity.
    pub const SELF_DEFINED: Frequency = Frequency::new(Unit::Second, 0);

    /// Creates a frequency from unit and multiplier.
    #[must_use]
    pub const fn new(unit: Unit, multiplier: u32) -> Self {
        Self { unit, multiplier }
    }

    /// Bucket width in epoch milliseconds. Zero only for [`Self::SELF_DEFINED`].
    #[must_use]
    pub fn interval_ms(&self) -> i64 {
        self.unit.duration_ms() * i64::from(self.multiplier)
    }

    /// True for the zero-interval placeholder frequency.
    #[must_use]
    pub fn is_self_defined(&self) -> bool {
        self.multiplier == 0
    }

    /// Offset that aligns bucket 0 to the natural calendar boundary.
    /// Weeks anchor to Monday; everything else anchors to the epoch.
    fn anchor_offset_ms(&self) -> i64 {
        match self.unit {
            Unit::Week => EPOCH_WEEKDAY_OFFSET * MS_PER_DAY,
            _ => 0,
        }
    }

    /// Start of the bucket containing `time`.
    #[must_use]
    pub fn round_floor(&self, time: i64) -> i64 {
        let interval = self.interval_ms();
        if interval == 0 {
            return time;
        }
        let off = self.anchor_offset_ms();
        (time + off).div_euclid(interval) * interval - off
    }

    /// Start of the bucket one interval after the one containing `time`.
    #[must_use]
    pub fn next_time(&self, time: i64) -> i64 {
        self.time_after_n_freqs(time, 1)
    }

    /// Start of the bucket one interval before the one containing `time`.
    #[must_use]
    pub fn previous_time(&self, time: i64) -> i64 {
        self.time_after_n_freqs(time, -1)
    }

    /// Signed count of whole buckets from `from`'s bucket to `to`'s bucket.
    #[must_use]
    pub fn n_freqs_between(&self, from: i64, to: i64) -> i64 {
        let interval = self.interval_ms();
        if interval == 0 {
            return 0;
        }
        (self.round_floor(to) - self.round_floor(from)) / interval
    }

    /// Bucket start `n` buckets after (or before, negative) `time`'s bucket.
    #[must_use]
    pub fn time_after_n_freqs(&self, time: i64, n: i64) -> i64 {
        self.round_floor(time) + n * self.interval_ms()
    }

    /// True when `time` sits exactly on a bucket boundary.
    #[must_use]
    pub fn is_bucket_start(&self, time: i64) -> bool {
        self.round_floor(time) == time
    }
}

// Identity is the interval, not the spelling.
impl PartialEq for Frequency {
    fn eq(&self, other: &Self) -> bool {
        self.interval_ms() == other.interval_ms()
    }
}

impl Eq for Frequency {}

impl std::hash::Hash for Frequency {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.interval_ms().hash(state);
    }
}

impl PartialOrd for Frequency {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frequency {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.interval_ms().cmp(&other.interval_ms())
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.multiplier, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-01-03 12:34:56 UTC (a Wednesday)
    const WED: i64 = 1_704_285_296_000;
    // 2024-01-01 00:00:00 UTC (the Monday of that week)
    const MON: i64 = 1_704_067_200_000;

    #[test]
    fn test_interval_ms() {
        assert_eq!(Frequency::DAILY.interval_ms(), 86_400_000);
        assert_eq!(Frequency::new(Unit::Minute, 5).interval_ms(), 300_000);
        assert_eq!(Frequency::SELF_DEFINED.interval_ms(), 0);
    }

    #[test]
    fn test_equality_by_interval() {
        let four_quarters = Frequency::new(Unit::Minute, 60);
        assert_eq!(four_quarters, Frequency::HOURLY);

        let mut map = std::collections::HashMap::new();
        map.insert(Frequency::HOURLY, "hourly");
        assert!(map.contains_key(&four_quarters));
    }

    #[test]
    fn test_round_floor_daily() {
        let day_start = (WED / 86_400_000) * 86_400_000;
        assert_eq!(Frequency::DAILY.round_floor(WED), day_start);
        assert_eq!(Frequency::DAILY.round_floor(day_start), day_start);
    }

    #[test]
    fn test_round_floor_weekly_anchors_monday() {
        assert_eq!(Frequency::WEEKLY.round_floor(WED), MON);
        assert_eq!(Frequency::WEEKLY.round_floor(MON), MON);
        // Sunday night still belongs to the same Monday-anchored week
        let sunday = MON + 6 * 86_400_000 + 1;
        assert_eq!(Frequency::WEEKLY.round_floor(sunday), MON);
    }

    #[test]
    fn test_round_floor_negative_time() {
        // Pre-epoch times must floor downward, not toward zero
        assert_eq!(Frequency::DAILY.round_floor(-1), -86_400_000);
    }

    #[test]
    fn test_n_freqs_between() {
        let daily = Frequency::DAILY;
        assert_eq!(daily.n_freqs_between(MON, MON + 3 * 86_400_000), 3);
        assert_eq!(daily.n_freqs_between(MON + 3 * 86_400_000, MON), -3);
        // Intra-bucket offsets don't change the count
        assert_eq!(daily.n_freqs_between(MON + 5, MON + 86_400_000 + 5), 1);
    }

    #[test]
    fn test_time_after_n_freqs() {
        let daily = Frequency::DAILY;
        assert_eq!(daily.time_after_n_freqs(WED, 0), daily.round_floor(WED));
        assert_eq!(
            daily.time_after_n_freqs(WED, 2),
            daily.round_floor(WED) + 2 * 86_400_000
        );
        assert_eq!(daily.next_time(WED), daily.round_floor(WED) + 86_400_000);
        assert_eq!(
            daily.previous_time(WED),
            daily.round_floor(WED) - 86_400_000
        );
    }

    #[test]
    fn test_self_defined_is_inert() {
        let sd = Frequency::SELF_DEFINED;
        assert!(sd.is_self_defined());
        assert_eq!(sd.round_floor(WED), WED);
        assert_eq!(sd.n_freqs_between(MON, WED), 0);
        assert_eq!(sd.time_after_n_freqs(WED, 10), WED);
    }

    #[test]
    fn test_display() {
        assert_eq!(Frequency::new(Unit::Minute, 5).to_string(), "5Minute");
        assert_eq!(Frequency::DAILY.to_string(), "1Day");
    }

    #[test]
    fn test_serde_roundtrip() {
        let freq = Frequency::new(Unit::Minute, 15);
        let json = serde_json::to_string(&freq).unwrap();
        let deserialized: Frequency = serde_json::from_str(&json).unwrap();
        assert_eq!(freq, deserialized);
    }
}
