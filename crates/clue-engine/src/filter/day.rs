//! Filter for the day of month.
//!
//! The set of legal days depends on the year, the month, and the calendar
//! system, so restricted days are computed per concrete month. Runs that end
//! on a month's last day continue into a run starting on the next month's
//! first day: month length alone never breaks a window apart.

use tracing::trace;

use super::{allowable_options, contiguous_runs, effective_max, FilterContext, OptionFilter};
use crate::clue::ClueUnit;
use crate::config::{MaxBound, UnitBounds};
use crate::error::Result;
use crate::moment::{PartialMoment, Unit};
use crate::range::{fill_finer, Edge, Range, Ranges};

pub struct DayFilter<'a> {
    ctx: FilterContext<'a>,
}

impl<'a> DayFilter<'a> {
    pub fn new(ctx: FilterContext<'a>) -> Self {
        Self { ctx }
    }
}

impl OptionFilter for DayFilter<'_> {
    fn unit(&self) -> ClueUnit {
        ClueUnit::Moment(Unit::Day)
    }

    fn bounds(&self) -> UnitBounds {
        self.ctx.bounds.day
    }

    fn allowable_options(&self, override_max: Option<i32>) -> Result<Vec<i32>> {
        let bounds = self.bounds();
        let max = effective_max(self.unit(), bounds, override_max)?;
        let evidence = self.ctx.clues.evidence(Unit::Day)?;
        allowable_options(evidence, bounds.min, max)
    }

    fn apply(&self, ranges: Ranges) -> Result<Ranges> {
        let bounds = self.bounds();
        let unrestricted = !self.ctx.clues.evidence(Unit::Day)?.is_restricted();
        if unrestricted && bounds.min == 1 && bounds.max == MaxBound::Dynamic {
            return self.extend_to_whole_months(ranges);
        }
        narrow_days(ranges, &self.ctx, |_, _, max_day| {
            self.allowable_options(Some(max_day))
        })
    }
}

impl DayFilter<'_> {
    /// Every day is allowed: start each range on the 1st and end it on the
    /// last day of its end month.
    fn extend_to_whole_months(&self, ranges: Ranges) -> Result<Ranges> {
        let min = self.bounds().min;
        ranges
            .into_iter()
            .map(|range| {
                let end = *range.end();
                let last_day = self.ctx.bounds.max_for(Unit::Day, self.ctx.calendar, &end)?;
                Range::new(
                    range.start().with(Unit::Day, min),
                    end.with(Unit::Day, last_day),
                )
            })
            .collect()
    }
}

/// Narrow ranges to the days `allowed(year, month, last_day)` returns.
///
/// Each range is filleted per (year, month). A run reaching the last day of
/// its month stays open and is extended by a run starting on the first day
/// of the following month.
pub(crate) fn narrow_days<F>(ranges: Ranges, ctx: &FilterContext<'_>, allowed: F) -> Result<Ranges>
where
    F: Fn(i32, i32, i32) -> Result<Vec<i32>>,
{
    let day_min = ctx.bounds.min(Unit::Day);
    let mut narrowed = Ranges::new();
    for range in ranges {
        let mut open: Option<Range> = None;
        for piece in range.fillet(Unit::Month, ctx.calendar, ctx.bounds)? {
            let start = *piece.start();
            let end = *piece.end();
            let year = start.require(Unit::Year)?;
            let month = start.require(Unit::Month)?;
            let last_day = ctx.bounds.max_for(Unit::Day, ctx.calendar, &start)?;
            let lo = start.day.unwrap_or(day_min);
            let hi = end.day.unwrap_or(last_day);

            let days: Vec<i32> = allowed(year, month, last_day)?
                .into_iter()
                .filter(|d| (lo..=hi).contains(d))
                .collect();
            let runs = contiguous_runs(&days);
            trace!(year, month, runs = runs.len(), "day runs");

            if runs.is_empty() {
                if let Some(pending) = open.take() {
                    narrowed.push(pending);
                }
                continue;
            }
            for (first, last) in runs {
                let run_start = if start.day == Some(first) {
                    start
                } else {
                    on_day(start, first, Edge::Start, ctx)?
                };
                let run_end = if end.day == Some(last) {
                    end
                } else {
                    on_day(end, last, Edge::End, ctx)?
                };
                let run = match open.take() {
                    Some(pending) if first == day_min => Range::new(*pending.start(), run_end)?,
                    Some(pending) => {
                        narrowed.push(pending);
                        Range::new(run_start, run_end)?
                    }
                    None => Range::new(run_start, run_end)?,
                };
                if last == last_day {
                    open = Some(run);
                } else {
                    narrowed.push(run);
                }
            }
        }
        if let Some(pending) = open {
            narrowed.push(pending);
        }
    }
    Ok(narrowed)
}

fn on_day(moment: PartialMoment, day: i32, edge: Edge, ctx: &FilterContext<'_>) -> Result<PartialMoment> {
    let mut moment = moment.with(Unit::Day, day);
    fill_finer(&mut moment, Unit::Day, edge, ctx.calendar, ctx.bounds)?;
    Ok(moment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clue::{Clue, ClueSet};
    use crate::config::BoundsTable;
    use crate::error::EngineError;
    use crate::moment::CalendarSystem;
    use chrono_tz::Tz;

    fn ym(year: i32, month: i32) -> PartialMoment {
        PartialMoment::new()
            .with(Unit::Year, year)
            .with(Unit::Month, month)
    }

    fn apply(clues: &ClueSet, calendar: CalendarSystem, ranges: Vec<Range>) -> Result<Ranges> {
        let bounds = BoundsTable::default();
        let ctx = FilterContext {
            clues,
            bounds: &bounds,
            calendar,
            timezone: Tz::UTC,
        };
        DayFilter::new(ctx).apply(ranges.into_iter().collect())
    }

    fn render(ranges: &Ranges) -> Vec<String> {
        ranges
            .iter()
            .map(|r| format!("{}..{}", r.start(), r.end()))
            .collect()
    }

    #[test]
    fn test_unrestricted_days_cover_whole_months() {
        let clues = ClueSet::with_default_year(2001);
        let range = Range::new(ym(2001, 2), ym(2001, 3)).unwrap();
        let out = apply(&clues, CalendarSystem::Gregorian, vec![range]).unwrap();
        assert_eq!(render(&out), vec!["2001-02-01..2001-03-31"]);

        let range = Range::new(ym(2000, 1), ym(2000, 2)).unwrap();
        let out = apply(&clues, CalendarSystem::Gregorian, vec![range]).unwrap();
        assert_eq!(render(&out), vec!["2000-01-01..2000-02-29"]);
    }

    #[test]
    fn test_runs_continue_across_month_boundary() {
        let clues: ClueSet = [Clue::after(Unit::Day, 28), Clue::before(Unit::Day, 2)]
            .into_iter()
            .collect();
        let range = Range::new(ym(2001, 2), ym(2001, 3)).unwrap();
        let out = apply(&clues, CalendarSystem::Gregorian, vec![range]).unwrap();
        assert_eq!(
            render(&out),
            vec![
                "2001-02-01..2001-02-02",
                "2001-02-28..2001-03-02",
                "2001-03-28..2001-03-31",
            ]
        );
    }

    #[test]
    fn test_day_31_only_in_long_months() {
        let clues: ClueSet = [Clue::is(Unit::Day, 31)].into_iter().collect();
        let range = Range::new(ym(2001, 1), ym(2001, 4)).unwrap();
        let out = apply(&clues, CalendarSystem::Gregorian, vec![range]).unwrap();
        assert_eq!(
            render(&out),
            vec!["2001-01-31..2001-01-31", "2001-03-31..2001-03-31"]
        );
    }

    #[test]
    fn test_leap_day_depends_on_calendar() {
        let clues: ClueSet = [Clue::is(Unit::Day, 29)].into_iter().collect();
        let feb_1900 = Range::new(ym(1900, 2), ym(1900, 2)).unwrap();
        let gregorian = apply(&clues, CalendarSystem::Gregorian, vec![feb_1900]).unwrap();
        assert!(gregorian.is_empty());
        let julian = apply(&clues, CalendarSystem::Julian, vec![feb_1900]).unwrap();
        assert_eq!(render(&julian), vec!["1900-02-29..1900-02-29"]);
    }

    #[test]
    fn test_blacklisted_first_day_breaks_continuity() {
        let clues: ClueSet = [Clue::not(Unit::Day, 1)].into_iter().collect();
        let range = Range::new(ym(2001, 11), ym(2002, 1)).unwrap();
        let out = apply(&clues, CalendarSystem::Gregorian, vec![range]).unwrap();
        assert_eq!(
            render(&out),
            vec![
                "2001-11-02..2001-11-30",
                "2001-12-02..2001-12-31",
                "2002-01-02..2002-01-31",
            ]
        );
    }

    #[test]
    fn test_day_count_requires_year_and_month() {
        let clues: ClueSet = [Clue::is(Unit::Day, 3)].into_iter().collect();
        let year_only = PartialMoment::new().with(Unit::Year, 2001);
        let range = Range::new(year_only, year_only).unwrap();
        let err = apply(&clues, CalendarSystem::Gregorian, vec![range]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)), "got: {err}");
    }

    #[test]
    fn test_allowable_options_needs_month_length() {
        let clues = ClueSet::with_default_year(2001);
        let bounds = BoundsTable::default();
        let filter = DayFilter::new(FilterContext {
            clues: &clues,
            bounds: &bounds,
            calendar: CalendarSystem::Gregorian,
            timezone: Tz::UTC,
        });
        assert!(filter.allowable_options(None).is_err());
        assert_eq!(filter.allowable_options(Some(28)).unwrap().len(), 28);
    }
}
