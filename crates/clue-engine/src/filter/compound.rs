//! Filter for registered compound units.

use super::day::narrow_days;
use super::{within_bounds, FilterContext, OptionFilter};
use crate::clue::{ClueUnit, CompoundUnit, Evidence};
use crate::config::UnitBounds;
use crate::error::{EngineError, Result};
use crate::moment::{PartialMoment, Unit};
use crate::range::Ranges;

/// Applies clues such as "after March 12th" that address several units at
/// once. Evidence values carry exactly the compound's constituents and are
/// compared as partial moments.
pub struct CompoundFilter<'a> {
    unit: CompoundUnit,
    ctx: FilterContext<'a>,
}

impl<'a> CompoundFilter<'a> {
    pub fn new(unit: CompoundUnit, ctx: FilterContext<'a>) -> Self {
        Self { unit, ctx }
    }
}

impl OptionFilter for CompoundFilter<'_> {
    fn unit(&self) -> ClueUnit {
        ClueUnit::Compound(self.unit)
    }

    fn bounds(&self) -> UnitBounds {
        self.ctx.bounds.get(self.unit.finest())
    }

    fn allowable_options(&self, _override_max: Option<i32>) -> Result<Vec<i32>> {
        Err(EngineError::Unsupported(format!(
            "{} options depend on the month; they have no flat list",
            self.unit
        )))
    }

    fn apply(&self, ranges: Ranges) -> Result<Ranges> {
        let evidence = self.ctx.clues.compound_evidence(self.unit)?;
        if !evidence.is_restricted() {
            return Ok(ranges);
        }
        match self.unit {
            CompoundUnit::MonthDay => narrow_days(ranges, &self.ctx, |_, month, last_day| {
                month_day_options(evidence, month, last_day)
            }),
        }
    }
}

/// Days of `month` whose (month, day) key the evidence allows.
fn month_day_options(evidence: &Evidence<PartialMoment>, month: i32, last_day: i32) -> Result<Vec<i32>> {
    let mut days = Vec::new();
    for day in 1..=last_day {
        let key = PartialMoment::new()
            .with(Unit::Month, month)
            .with(Unit::Day, day);
        if !evidence.whitelist.is_empty() && !evidence.whitelist.contains(&key) {
            continue;
        }
        if evidence.blacklist.contains(&key) {
            continue;
        }
        if within_bounds(&key, evidence.before.as_ref(), evidence.after.as_ref(), |a, b| {
            a.try_cmp(b)
        })? {
            days.push(day);
        }
    }
    Ok(days)
}
