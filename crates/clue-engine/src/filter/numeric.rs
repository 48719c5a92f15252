//! Filter for units whose domain does not depend on other units.

use tracing::trace;

use super::{allowable_options, contiguous_runs, effective_max, FilterContext, OptionFilter};
use crate::clue::ClueUnit;
use crate::config::UnitBounds;
use crate::error::Result;
use crate::moment::Unit;
use crate::range::Ranges;

/// Year, month, hour, minute, and second.
pub struct NumericFilter<'a> {
    unit: Unit,
    ctx: FilterContext<'a>,
}

impl<'a> NumericFilter<'a> {
    pub fn new(unit: Unit, ctx: FilterContext<'a>) -> Self {
        Self { unit, ctx }
    }
}

impl OptionFilter for NumericFilter<'_> {
    fn unit(&self) -> ClueUnit {
        ClueUnit::Moment(self.unit)
    }

    fn bounds(&self) -> UnitBounds {
        self.ctx.bounds.get(self.unit)
    }

    fn allowable_options(&self, override_max: Option<i32>) -> Result<Vec<i32>> {
        let bounds = self.bounds();
        let max = effective_max(self.unit(), bounds, override_max)?;
        let evidence = self.ctx.clues.evidence(self.unit)?;
        allowable_options(evidence, bounds.min, max)
    }

    fn apply(&self, ranges: Ranges) -> Result<Ranges> {
        let bounds = self.bounds();
        let max = effective_max(self.unit(), bounds, None)?;
        let options = self.allowable_options(None)?;
        let runs = contiguous_runs(&options);
        let candidates = Ranges::from_runs(self.unit, &runs)?;
        trace!(unit = %self.unit, runs = runs.len(), "numeric candidates");

        // A single run over the whole domain extends every range as is; any
        // narrower choice only composes exactly with one concrete prefix at a time.
        let whole_domain = runs == [(bounds.min, max)];
        let base = if whole_domain {
            ranges
        } else {
            ranges.fillet(self.ctx.calendar, self.ctx.bounds)?
        };
        base.merge(&candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clue::{Clue, ClueSet};
    use crate::config::BoundsTable;
    use crate::moment::CalendarSystem;
    use chrono_tz::Tz;

    fn ctx<'a>(clues: &'a ClueSet, bounds: &'a BoundsTable) -> FilterContext<'a> {
        FilterContext {
            clues,
            bounds,
            calendar: CalendarSystem::Gregorian,
            timezone: Tz::UTC,
        }
    }

    fn render(ranges: &Ranges) -> Vec<String> {
        ranges
            .iter()
            .map(|r| format!("{}..{}", r.start(), r.end()))
            .collect()
    }

    fn run(clues: &ClueSet, units: &[Unit]) -> Ranges {
        let bounds = BoundsTable::default();
        let mut ranges = Ranges::new();
        for unit in units {
            ranges = NumericFilter::new(*unit, ctx(clues, &bounds))
                .apply(ranges)
                .unwrap();
        }
        ranges
    }

    #[test]
    fn test_first_pass_seeds_accumulator() {
        let clues: ClueSet = [Clue::is(Unit::Year, 1985)].into_iter().collect();
        assert_eq!(render(&run(&clues, &[Unit::Year])), vec!["1985..1985"]);
    }

    #[test]
    fn test_whole_domain_extends_without_splitting() {
        let clues: ClueSet = [Clue::after(Unit::Year, 1985), Clue::before(Unit::Year, 1986)]
            .into_iter()
            .collect();
        assert_eq!(
            render(&run(&clues, &[Unit::Year, Unit::Month])),
            vec!["1985-01..1986-12"]
        );
    }

    #[test]
    fn test_restricted_unit_splits_per_year() {
        let clues: ClueSet = [
            Clue::after(Unit::Year, 1985),
            Clue::before(Unit::Year, 1986),
            Clue::is(Unit::Month, 3),
            Clue::is(Unit::Month, 4),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            render(&run(&clues, &[Unit::Year, Unit::Month])),
            vec!["1985-03..1985-04", "1986-03..1986-04"]
        );
    }

    #[test]
    fn test_blacklist_splits_runs() {
        let clues: ClueSet = [Clue::is(Unit::Year, 2001), Clue::not(Unit::Month, 10)]
            .into_iter()
            .collect();
        assert_eq!(
            render(&run(&clues, &[Unit::Year, Unit::Month])),
            vec!["2001-01..2001-09", "2001-11..2001-12"]
        );
    }

    #[test]
    fn test_contradiction_yields_no_ranges() {
        let clues: ClueSet = [Clue::is(Unit::Year, 2001), Clue::not(Unit::Year, 2001)]
            .into_iter()
            .collect();
        assert!(run(&clues, &[Unit::Year]).is_empty());
    }

    #[test]
    fn test_allowable_options_honours_override() {
        let clues = ClueSet::with_default_year(2001);
        let bounds = BoundsTable::default();
        let filter = NumericFilter::new(Unit::Hour, ctx(&clues, &bounds));
        assert_eq!(filter.allowable_options(Some(2)).unwrap(), vec![0, 1, 2]);
        assert_eq!(filter.allowable_options(None).unwrap().len(), 24);
    }
}
