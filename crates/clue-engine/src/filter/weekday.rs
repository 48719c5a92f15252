//! Filter for the day of the week.
//!
//! The weekday is not a unit of a [`PartialMoment`]; it is derived from the
//! concrete date. This filter therefore runs after the day pass and walks
//! every range day by day.

use tracing::trace;

use super::{allowable_options, effective_max, FilterContext, OptionFilter};
use crate::clue::ClueUnit;
use crate::config::UnitBounds;
use crate::error::Result;
use crate::moment::{PartialMoment, Unit};
use crate::range::{Edge, Range, Ranges};

type Date = (i32, i32, i32);

pub struct WeekdayFilter<'a> {
    ctx: FilterContext<'a>,
}

impl<'a> WeekdayFilter<'a> {
    pub fn new(ctx: FilterContext<'a>) -> Self {
        Self { ctx }
    }

    /// Split `range` into runs of consecutive days whose weekday is allowed.
    fn split(&self, range: &Range, allowed: &[bool; 8], out: &mut Ranges) -> Result<()> {
        let calendar = self.ctx.calendar;
        let date_of = |m: &PartialMoment| -> Result<Date> {
            Ok((m.require(Unit::Year)?, m.require(Unit::Month)?, m.require(Unit::Day)?))
        };
        let first = date_of(range.start())?;
        let last = date_of(range.end())?;

        let mut run: Option<(Date, Date)> = None;
        let mut date = first;
        loop {
            let weekday = calendar.iso_weekday(date.0, date.1, date.2);
            if allowed[weekday as usize] {
                run = Some(match run {
                    Some((from, _)) => (from, date),
                    None => (date, date),
                });
            } else if let Some((from, to)) = run.take() {
                out.push(self.run_range(range, from, to)?);
            }
            if date == last {
                break;
            }
            date = calendar.next_day(date)?;
        }
        if let Some((from, to)) = run {
            out.push(self.run_range(range, from, to)?);
        }
        Ok(())
    }

    fn run_range(&self, range: &Range, from: Date, to: Date) -> Result<Range> {
        let (calendar, bounds) = (self.ctx.calendar, self.ctx.bounds);
        Range::new(
            range.boundary_on(from, Edge::Start, calendar, bounds)?,
            range.boundary_on(to, Edge::End, calendar, bounds)?,
        )
    }
}

impl OptionFilter for WeekdayFilter<'_> {
    fn unit(&self) -> ClueUnit {
        ClueUnit::Weekday
    }

    fn bounds(&self) -> UnitBounds {
        self.ctx.bounds.weekday
    }

    fn allowable_options(&self, override_max: Option<i32>) -> Result<Vec<i32>> {
        let bounds = self.bounds();
        let max = effective_max(self.unit(), bounds, override_max)?;
        let evidence = self.ctx.clues.weekday_evidence()?;
        allowable_options(evidence, bounds.min, max)
    }

    fn apply(&self, ranges: Ranges) -> Result<Ranges> {
        let options = self.allowable_options(None)?;
        let mut allowed = [false; 8];
        for weekday in options.iter().filter(|w| (1..=7).contains(*w)) {
            allowed[*weekday as usize] = true;
        }
        if allowed[1..].iter().all(|a| *a) {
            return Ok(ranges);
        }
        if options.is_empty() {
            return Ok(Ranges::new());
        }

        let mut narrowed = Ranges::new();
        for range in &ranges {
            self.split(range, &allowed, &mut narrowed)?;
        }
        trace!(
            before = ranges.len(),
            after = narrowed.len(),
            "weekday runs"
        );
        Ok(narrowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clue::{Clue, ClueSet, FilterKind};
    use crate::config::BoundsTable;
    use crate::error::EngineError;
    use crate::moment::CalendarSystem;
    use chrono::Weekday;
    use chrono_tz::Tz;

    fn apply(clues: &ClueSet, ranges: Vec<Range>) -> Result<Ranges> {
        let bounds = BoundsTable::default();
        let ctx = FilterContext {
            clues,
            bounds: &bounds,
            calendar: CalendarSystem::Gregorian,
            timezone: Tz::UTC,
        };
        WeekdayFilter::new(ctx).apply(ranges.into_iter().collect())
    }

    fn days(from: (i32, i32, i32), to: (i32, i32, i32)) -> Range {
        Range::new(
            PartialMoment::ymd(from.0, from.1, from.2),
            PartialMoment::ymd(to.0, to.1, to.2),
        )
        .unwrap()
    }

    fn render(ranges: &Ranges) -> Vec<String> {
        ranges
            .iter()
            .map(|r| format!("{}..{}", r.start(), r.end()))
            .collect()
    }

    #[test]
    fn test_tuesdays_in_september_2001() {
        let clues: ClueSet = [Clue::weekday(FilterKind::Whitelist, Weekday::Tue)]
            .into_iter()
            .collect();
        let out = apply(&clues, vec![days((2001, 9, 1), (2001, 9, 30))]).unwrap();
        assert_eq!(
            render(&out),
            vec![
                "2001-09-04..2001-09-04",
                "2001-09-11..2001-09-11",
                "2001-09-18..2001-09-18",
                "2001-09-25..2001-09-25",
            ]
        );
    }

    #[test]
    fn test_weekends_form_runs() {
        let clues: ClueSet = [Clue::weekday(FilterKind::AfterOrEqual, Weekday::Sat)]
            .into_iter()
            .collect();
        let out = apply(&clues, vec![days((2001, 9, 1), (2001, 9, 30))]).unwrap();
        assert_eq!(
            render(&out),
            vec![
                "2001-09-01..2001-09-02",
                "2001-09-08..2001-09-09",
                "2001-09-15..2001-09-16",
                "2001-09-22..2001-09-23",
                "2001-09-29..2001-09-30",
            ]
        );
    }

    #[test]
    fn test_runs_cross_month_boundary() {
        let clues: ClueSet = [Clue::weekday(FilterKind::Blacklist, Weekday::Wed)]
            .into_iter()
            .collect();
        let out = apply(&clues, vec![days((2001, 10, 29), (2001, 11, 6))]).unwrap();
        assert_eq!(
            render(&out),
            vec!["2001-10-29..2001-10-30", "2001-11-01..2001-11-06"]
        );
    }

    #[test]
    fn test_unrestricted_weekday_is_identity() {
        let clues = ClueSet::with_default_year(2001);
        let input = vec![days((2001, 9, 1), (2001, 9, 30))];
        let out = apply(&clues, input.clone()).unwrap();
        assert_eq!(out.as_slice(), input.as_slice());
    }

    #[test]
    fn test_contradictory_weekdays_empty() {
        let clues: ClueSet = [
            Clue::weekday(FilterKind::Whitelist, Weekday::Mon),
            Clue::weekday(FilterKind::Blacklist, Weekday::Mon),
        ]
        .into_iter()
        .collect();
        let out = apply(&clues, vec![days((2001, 9, 1), (2001, 9, 30))]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_requires_concrete_dates() {
        let clues: ClueSet = [Clue::weekday(FilterKind::Whitelist, Weekday::Fri)]
            .into_iter()
            .collect();
        let month = PartialMoment::new()
            .with(Unit::Year, 2001)
            .with(Unit::Month, 9);
        let range = Range::new(month, month).unwrap();
        let err = apply(&clues, vec![range]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)), "got: {err}");
    }
}
