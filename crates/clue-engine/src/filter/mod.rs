//! Per-unit option filters.
//!
//! Each filter turns the evidence a [`ClueSet`] holds about one unit into the
//! concrete values that unit may take, and narrows the resolver's accumulator
//! [`Ranges`] accordingly:
//!
//! - [`NumericFilter`] — year, month, hour, minute, second
//! - [`DayFilter`] — day of month (length depends on year, month, calendar)
//! - [`WeekdayFilter`] — derived from concrete dates, day by day
//! - [`CompoundFilter`] — registered compound units such as month-day

pub mod compound;
pub mod day;
pub mod numeric;
pub mod weekday;

use std::cmp::Ordering;

use chrono_tz::Tz;

use crate::clue::{ClueSet, ClueUnit, Evidence};
use crate::config::{BoundsTable, MaxBound, UnitBounds};
use crate::error::{EngineError, Result};
use crate::moment::{CalendarSystem, Unit};
use crate::range::Ranges;

pub use compound::CompoundFilter;
pub use day::DayFilter;
pub use numeric::NumericFilter;
pub use weekday::WeekdayFilter;

/// Everything a filter is configured with besides its unit.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub clues: &'a ClueSet,
    pub bounds: &'a BoundsTable,
    pub calendar: CalendarSystem,
    pub timezone: Tz,
}

/// A strategy narrowing the accumulator for one clue unit.
pub trait OptionFilter {
    fn unit(&self) -> ClueUnit;

    /// The unit's value domain.
    fn bounds(&self) -> UnitBounds;

    /// Values the unit may take. `override_max` replaces the configured
    /// maximum (required for units with a dynamic maximum).
    fn allowable_options(&self, override_max: Option<i32>) -> Result<Vec<i32>>;

    /// Narrow `ranges` to the moments this unit's evidence allows.
    fn apply(&self, ranges: Ranges) -> Result<Ranges>;
}

/// Look up the filter for a clue unit by its category.
pub fn filter_for<'a>(unit: ClueUnit, ctx: FilterContext<'a>) -> Box<dyn OptionFilter + 'a> {
    match unit {
        ClueUnit::Moment(Unit::Day) => Box::new(DayFilter::new(ctx)),
        ClueUnit::Moment(unit) => Box::new(NumericFilter::new(unit, ctx)),
        ClueUnit::Weekday => Box::new(WeekdayFilter::new(ctx)),
        ClueUnit::Compound(compound) => Box::new(CompoundFilter::new(compound, ctx)),
    }
}

/// Resolve the maximum a filter works with.
pub(crate) fn effective_max(unit: ClueUnit, bounds: UnitBounds, override_max: Option<i32>) -> Result<i32> {
    match (override_max, bounds.max) {
        (Some(max), _) => Ok(max),
        (None, MaxBound::Fixed(max)) => Ok(max),
        (None, MaxBound::Dynamic) => Err(EngineError::InvalidState(format!(
            "{unit} has a dynamic maximum; the caller must supply it"
        ))),
    }
}

/// Values in `min..=max` the evidence allows, ascending.
///
/// Starts from the whitelist (or the whole domain when there is none),
/// removes the blacklist, then applies the before/after bounds.
pub fn allowable_options(evidence: &Evidence<i32>, min: i32, max: i32) -> Result<Vec<i32>> {
    let domain = min..=max;
    let base: Vec<i32> = if evidence.whitelist.is_empty() {
        domain.collect()
    } else {
        evidence
            .whitelist
            .iter()
            .copied()
            .filter(|v| domain.contains(v))
            .collect()
    };
    let mut options = Vec::with_capacity(base.len());
    for value in base {
        if evidence.blacklist.binary_search(&value).is_ok() {
            continue;
        }
        let (before, after) = (evidence.before.as_ref(), evidence.after.as_ref());
        if within_bounds(&value, before, after, |a, b| Ok(a.cmp(b)))? {
            options.push(value);
        }
    }
    Ok(options)
}

/// Whether `value` satisfies the before/after bounds.
///
/// With both bounds present and `after <= before` the value must lie in the
/// window `[after, before]`. With `after > before` the bounds describe two
/// bands, `[min, before]` and `[after, max]` ("before the 3rd or after the
/// 27th"), and either one will do.
pub(crate) fn within_bounds<T, F>(value: &T, before: Option<&T>, after: Option<&T>, cmp: F) -> Result<bool>
where
    F: Fn(&T, &T) -> Result<Ordering>,
{
    let not_past = |bound: &T| -> Result<bool> { Ok(cmp(value, bound)? != Ordering::Greater) };
    let not_ahead = |bound: &T| -> Result<bool> { Ok(cmp(value, bound)? != Ordering::Less) };
    match (before, after) {
        (None, None) => Ok(true),
        (Some(before), None) => not_past(before),
        (None, Some(after)) => not_ahead(after),
        (Some(before), Some(after)) if cmp(after, before)? != Ordering::Greater => {
            Ok(not_ahead(after)? && not_past(before)?)
        }
        (Some(before), Some(after)) => Ok(not_past(before)? || not_ahead(after)?),
    }
}

/// Partition ascending values into maximal runs of consecutive integers.
pub fn contiguous_runs(values: &[i32]) -> Vec<(i32, i32)> {
    let mut runs: Vec<(i32, i32)> = Vec::new();
    for &value in values {
        match runs.last_mut() {
            Some((_, last)) if *last + 1 == value => *last = value,
            _ => runs.push((value, value)),
        }
    }
    runs
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(whitelist: &[i32], blacklist: &[i32], before: Option<i32>, after: Option<i32>) -> Evidence<i32> {
        Evidence {
            whitelist: whitelist.to_vec(),
            blacklist: blacklist.to_vec(),
            before,
            after,
        }
    }

    #[test]
    fn test_allowable_options_two_bands() {
        let e = evidence(&[2, 3, 4, 5, 9, 31], &[2], Some(3), Some(27));
        assert_eq!(allowable_options(&e, 1, 31).unwrap(), vec![3, 31]);
    }

    #[test]
    fn test_allowable_options_window() {
        let e = evidence(&[], &[12], Some(14), Some(9));
        assert_eq!(allowable_options(&e, 0, 23).unwrap(), vec![9, 10, 11, 13, 14]);
    }

    #[test]
    fn test_allowable_options_single_bounds() {
        assert_eq!(allowable_options(&evidence(&[], &[], Some(3), None), 1, 12).unwrap(), vec![1, 2, 3]);
        assert_eq!(allowable_options(&evidence(&[], &[], None, Some(11)), 1, 12).unwrap(), vec![11, 12]);
    }

    #[test]
    fn test_whitelist_is_clipped_to_domain() {
        let e = evidence(&[29, 30, 31], &[], None, None);
        assert_eq!(allowable_options(&e, 1, 30).unwrap(), vec![29, 30]);
    }

    #[test]
    fn test_unrestricted_is_whole_domain() {
        assert_eq!(allowable_options(&Evidence::default(), 1, 7).unwrap(), (1..=7).collect::<Vec<_>>());
    }

    #[test]
    fn test_within_bounds_propagates_comparison_errors() {
        let failing = |_: &i32, _: &i32| -> Result<Ordering> {
            Err(EngineError::InvalidState("incomparable".to_string()))
        };
        assert!(within_bounds(&5, Some(&9), None, failing).is_err());
        assert!(within_bounds(&5, None, None, failing).unwrap());
    }

    #[test]
    fn test_contiguous_runs() {
        assert!(contiguous_runs(&[]).is_empty());
        assert_eq!(contiguous_runs(&[3, 31]), vec![(3, 3), (31, 31)]);
        assert_eq!(
            contiguous_runs(&[1, 2, 3, 5, 7, 8]),
            vec![(1, 3), (5, 5), (7, 8)]
        );
    }

    #[test]
    fn test_effective_max() {
        let day = ClueUnit::Moment(Unit::Day);
        assert_eq!(effective_max(day, UnitBounds::dynamic(1), Some(30)).unwrap(), 30);
        assert!(effective_max(day, UnitBounds::dynamic(1), None).is_err());
        assert_eq!(effective_max(day, UnitBounds::fixed(1, 12), None).unwrap(), 12);
    }
}
