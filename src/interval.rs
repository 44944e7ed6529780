//! # interval
//!
//! Converts between the hours / minutes / seconds selectors of the schedule
//! form and the single millisecond integer the API stores, plus the
//! coarsest-unit display string used in the schedule tables.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MS_PER_SECOND: u64 = 1_000;
pub const MS_PER_MINUTE: u64 = 60_000;
pub const MS_PER_HOUR: u64 = 3_600_000;
pub const MS_PER_DAY: u64 = 86_400_000;

/// Shortest interval the API accepts between two trades.
pub const MIN_INTERVAL_MS: u64 = MS_PER_SECOND;

/// Largest value offered by the hours selector.
pub const MAX_HOURS: u64 = 12;
/// Largest value offered by the minutes and seconds selectors.
pub const MAX_MINUTES_SECONDS: u64 = 59;

// ─── Codec ────────────────────────────────────────────────────────────────────

/// `hours*3_600_000 + minutes*60_000 + seconds*1_000`.
///
/// No range limits are imposed here; see [`IntervalFields::checked`] for the
/// form's ranges.
pub fn encode(hours: u64, minutes: u64, seconds: u64) -> u64 {
    hours
        .saturating_mul(MS_PER_HOUR)
        .saturating_add(minutes.saturating_mul(MS_PER_MINUTE))
        .saturating_add(seconds.saturating_mul(MS_PER_SECOND))
}

/// Display-only projection, truncating each unit.
///
/// `3_661_000` → `"1 hr 1 min 1 sec"`, `90_000` → `"1 min 30 sec"`,
/// `5_000` → `"5 sec"`.
pub fn decode(ms: u64) -> String {
    if ms >= MS_PER_HOUR {
        let hours = ms / MS_PER_HOUR;
        let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
        let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
        format!("{hours} hr {minutes} min {seconds} sec")
    } else if ms >= MS_PER_MINUTE {
        let minutes = ms / MS_PER_MINUTE;
        let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
        format!("{minutes} min {seconds} sec")
    } else {
        format!("{} sec", ms / MS_PER_SECOND)
    }
}

// ─── IntervalFields ───────────────────────────────────────────────────────────

/// The three interval selectors as the operator filled them in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalFields {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl IntervalFields {
    pub fn new(hours: u64, minutes: u64, seconds: u64) -> Self {
        Self { hours, minutes, seconds }
    }

    /// Same as [`IntervalFields::new`] but rejects values the selectors
    /// would never offer.
    pub fn checked(hours: u64, minutes: u64, seconds: u64) -> Result<Self, ValidationError> {
        if hours > MAX_HOURS {
            return Err(ValidationError::FieldOutOfRange { field: "Interval hours", max: MAX_HOURS });
        }
        if minutes > MAX_MINUTES_SECONDS {
            return Err(ValidationError::FieldOutOfRange {
                field: "Interval minutes",
                max: MAX_MINUTES_SECONDS,
            });
        }
        if seconds > MAX_MINUTES_SECONDS {
            return Err(ValidationError::FieldOutOfRange {
                field: "Interval seconds",
                max: MAX_MINUTES_SECONDS,
            });
        }
        Ok(Self::new(hours, minutes, seconds))
    }

    #[inline]
    pub fn to_millis(&self) -> u64 {
        encode(self.hours, self.minutes, self.seconds)
    }

    /// Splits a stored interval back into selector values (used when an
    /// existing schedule is loaded into the edit form).
    pub fn from_millis(ms: u64) -> Self {
        Self {
            hours: ms / MS_PER_HOUR,
            minutes: (ms % MS_PER_HOUR) / MS_PER_MINUTE,
            seconds: (ms % MS_PER_MINUTE) / MS_PER_SECOND,
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_sums_unit_contributions() {
        assert_eq!(encode(1, 0, 0), 3_600_000);
        assert_eq!(encode(0, 1, 30), 90_000);
        assert_eq!(encode(0, 0, 0), 0);
        assert_eq!(encode(2, 0, 0) + encode(0, 3, 4), encode(2, 3, 4));
    }

    #[test]
    fn encode_does_not_enforce_form_ranges() {
        assert_eq!(encode(0, 90, 0), 5_400_000);
        assert_eq!(encode(u64::MAX, 1, 1), u64::MAX);
    }

    #[test]
    fn decode_picks_coarsest_unit() {
        assert_eq!(decode(3_661_000), "1 hr 1 min 1 sec");
        assert_eq!(decode(90_000), "1 min 30 sec");
        assert_eq!(decode(5_000), "5 sec");
        assert_eq!(decode(3_600_000), "1 hr 0 min 0 sec");
        assert_eq!(decode(60_000), "1 min 0 sec");
    }

    #[test]
    fn decode_truncates() {
        assert_eq!(decode(1_999), "1 sec");
        assert_eq!(decode(999), "0 sec");
        assert_eq!(decode(119_999), "1 min 59 sec");
    }

    #[test]
    fn checked_rejects_out_of_range_selectors() {
        assert!(IntervalFields::checked(12, 59, 59).is_ok());
        assert_eq!(
            IntervalFields::checked(13, 0, 0),
            Err(ValidationError::FieldOutOfRange { field: "Interval hours", max: 12 })
        );
        assert!(IntervalFields::checked(0, 60, 0).is_err());
        assert!(IntervalFields::checked(0, 0, 60).is_err());
    }

    #[test]
    fn from_millis_splits_back_into_selectors() {
        let fields = IntervalFields::from_millis(encode(2, 15, 9));
        assert_eq!(fields, IntervalFields::new(2, 15, 9));
    }
}
