//! Span between the earliest and latest possible moments.

use chrono::TimeDelta;
use serde::Serialize;

use crate::error::Result;
use crate::moment::{CalendarSystem, PartialMoment};

/// Signed span between two complete moments.
///
/// Gaps between disjoint candidate ranges are not subtracted: the span runs
/// from the earliest start to the latest end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntervalInfo {
    /// Total span in seconds (negative if `latest` precedes `earliest`).
    pub total_seconds: i64,
    /// Days component of the decomposed span.
    pub days: i64,
    /// Hours component (0-23).
    pub hours: i64,
    /// Minutes component (0-59).
    pub minutes: i64,
    /// Seconds component (0-59).
    pub seconds: i64,
    /// Human-readable representation (e.g., "364 days, 23 hours, 59 minutes, 59 seconds").
    pub human_readable: String,
}

impl IntervalInfo {
    pub fn as_duration(&self) -> TimeDelta {
        TimeDelta::seconds(self.total_seconds)
    }
}

/// Compute the span from `earliest` to `latest`.
///
/// The decomposition is always of the absolute span; the sign lives on
/// `total_seconds`.
///
/// # Errors
///
/// Returns [`EngineError::InvalidState`](crate::EngineError::InvalidState) if
/// either moment is not complete.
pub fn compute_interval(
    earliest: &PartialMoment,
    latest: &PartialMoment,
    calendar: CalendarSystem,
) -> Result<IntervalInfo> {
    let total_seconds = latest.ordinal_seconds(calendar)? - earliest.ordinal_seconds(calendar)?;
    let abs_seconds = total_seconds.unsigned_abs();

    let days = (abs_seconds / 86400) as i64;
    let remainder = abs_seconds % 86400;
    let hours = (remainder / 3600) as i64;
    let remainder = remainder % 3600;
    let minutes = (remainder / 60) as i64;
    let seconds = (remainder % 60) as i64;

    Ok(IntervalInfo {
        total_seconds,
        days,
        hours,
        minutes,
        seconds,
        human_readable: format_human_interval(days, hours, minutes, seconds),
    })
}

fn format_human_interval(days: i64, hours: i64, minutes: i64, seconds: i64) -> String {
    let plural = |n: i64, word: &str| format!("{n} {word}{}", if n == 1 { "" } else { "s" });
    let mut parts = Vec::new();
    if days > 0 {
        parts.push(plural(days, "day"));
    }
    if hours > 0 {
        parts.push(plural(hours, "hour"));
    }
    if minutes > 0 {
        parts.push(plural(minutes, "minute"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(plural(seconds, "second"));
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    const G: CalendarSystem = CalendarSystem::Gregorian;

    #[test]
    fn test_interval_whole_year() {
        let info = compute_interval(
            &PartialMoment::ymd_hms(1985, 1, 1, 0, 0, 0),
            &PartialMoment::ymd_hms(1985, 12, 31, 23, 59, 59),
            G,
        )
        .unwrap();
        assert_eq!(info.days, 364);
        assert_eq!((info.hours, info.minutes, info.seconds), (23, 59, 59));
        assert_eq!(info.total_seconds, 365 * 86_400 - 1);
        assert_eq!(
            info.human_readable,
            "364 days, 23 hours, 59 minutes, 59 seconds"
        );
        assert_eq!(info.as_duration().num_seconds(), info.total_seconds);
    }

    #[test]
    fn test_interval_negative_direction() {
        let info = compute_interval(
            &PartialMoment::ymd_hms(2001, 3, 1, 12, 0, 0),
            &PartialMoment::ymd_hms(2001, 3, 1, 10, 30, 0),
            G,
        )
        .unwrap();
        assert_eq!(info.total_seconds, -5400);
        assert_eq!((info.hours, info.minutes), (1, 30));
        assert_eq!(info.human_readable, "1 hour, 30 minutes");
    }

    #[test]
    fn test_interval_zero() {
        let m = PartialMoment::ymd_hms(2001, 9, 11, 8, 46, 0);
        let info = compute_interval(&m, &m, G).unwrap();
        assert_eq!(info.total_seconds, 0);
        assert_eq!(info.human_readable, "0 seconds");
    }

    #[test]
    fn test_interval_across_julian_leap_day() {
        let info = compute_interval(
            &PartialMoment::ymd_hms(1900, 2, 28, 0, 0, 0),
            &PartialMoment::ymd_hms(1900, 3, 1, 0, 0, 0),
            CalendarSystem::Julian,
        )
        .unwrap();
        assert_eq!(info.days, 2);
        assert_eq!(info.human_readable, "2 days");
    }

    #[test]
    fn test_interval_requires_complete_moments() {
        let err = compute_interval(
            &PartialMoment::ymd(1985, 1, 1),
            &PartialMoment::ymd_hms(1985, 12, 31, 23, 59, 59),
            G,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }
}
