//! Closed intervals between partial moments and the range algebra built on
//! them.
//!
//! A [`Range`] is `[start, end]` where both ends know the same units. A
//! [`Ranges`] is the accumulator the resolver narrows unit by unit: each
//! filter produces candidate ranges for its unit and crosses them into the
//! accumulator with [`Ranges::merge`].

use std::cmp::Ordering;

use serde::Serialize;

use crate::config::BoundsTable;
use crate::error::{EngineError, Result};
use crate::moment::{CalendarSystem, MomentContext, PartialMoment, Unit};

/// Which end of a range a boundary moment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Edge {
    Start,
    End,
}

/// Set every populated unit finer than `unit` to its smallest (start) or
/// largest (end) legal value.
pub(crate) fn fill_finer(
    moment: &mut PartialMoment,
    unit: Unit,
    edge: Edge,
    calendar: CalendarSystem,
    bounds: &BoundsTable,
) -> Result<()> {
    for finer in unit.finer_units() {
        if moment.get(*finer).is_none() {
            continue;
        }
        let value = match edge {
            Edge::Start => bounds.min(*finer),
            Edge::End => bounds.max_for(*finer, calendar, moment)?,
        };
        moment.set(*finer, Some(value));
    }
    Ok(())
}

/// The moment right after `moment` at the resolution of `unit`, carrying into
/// coarser units. `None` past the largest legal year.
pub(crate) fn step_forward(
    moment: &PartialMoment,
    unit: Unit,
    calendar: CalendarSystem,
    bounds: &BoundsTable,
) -> Result<Option<PartialMoment>> {
    let mut next = *moment;
    let mut current = unit;
    loop {
        let value = next.require(current)?;
        if value < bounds.max_for(current, calendar, &next)? {
            next.set(current, Some(value + 1));
            return Ok(Some(next));
        }
        next.set(current, Some(bounds.min(current)));
        match current.coarser() {
            Some(coarser) => current = coarser,
            None => return Ok(None),
        }
    }
}

// ── Range ───────────────────────────────────────────────────────────────────

/// A closed interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Range {
    start: PartialMoment,
    end: PartialMoment,
}

impl Range {
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] if the ends know different units
    /// or `start` is after `end`.
    pub fn new(start: PartialMoment, end: PartialMoment) -> Result<Self> {
        if start.try_cmp(&end)? == Ordering::Greater {
            return Err(EngineError::InvalidState(format!(
                "range start {start} is after its end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The range covering every moment a prefix-partial moment can stand for:
    /// `1985-03` covers `1985-03-01T00:00:00 ..= 1985-03-31T23:59:59` when the
    /// finer units are wanted up to `through`.
    pub fn covering(
        moment: &PartialMoment,
        through: Unit,
        calendar: CalendarSystem,
        bounds: &BoundsTable,
    ) -> Result<Self> {
        if !moment.is_prefix() || moment.is_empty() {
            return Err(EngineError::InvalidState(format!(
                "{moment} must know the year and every unit down to its finest"
            )));
        }
        let mut start = *moment;
        let mut end = *moment;
        for unit in through.through() {
            if moment.get(*unit).is_none() {
                start.set(*unit, Some(bounds.min(*unit)));
                end.set(*unit, Some(bounds.max_for(*unit, calendar, &end)?));
            }
        }
        Self::new(start.truncated(through), end.truncated(through))
    }

    pub fn start(&self) -> &PartialMoment {
        &self.start
    }

    pub fn end(&self) -> &PartialMoment {
        &self.end
    }

    /// Whether `moment` lies inside the range. `moment` must know the same units.
    pub fn contains(&self, moment: &PartialMoment) -> Result<bool> {
        Ok(self.start.try_cmp(moment)? != Ordering::Greater
            && moment.try_cmp(&self.end)? != Ordering::Greater)
    }

    /// Whether the two closed ranges share at least one moment.
    pub fn overlaps(&self, other: &Range) -> Result<bool> {
        Ok(self.start.try_cmp(&other.end)? != Ordering::Greater
            && other.start.try_cmp(&self.end)? != Ordering::Greater)
    }

    /// Overlay `other` onto this range, start onto start and end onto end.
    pub fn merge(&self, other: &Range) -> Result<Range> {
        Range::new(self.start.merge(&other.start)?, self.end.merge(&other.end)?)
    }

    /// Split into one sub-range per concrete value of the units through `unit`.
    ///
    /// `[2001-11-15, 2002-01-10]` filleted by month yields
    /// `[2001-11-15, 2001-11-30]`, `[2001-12-01, 2001-12-31]`,
    /// `[2002-01-01, 2002-01-10]`.
    pub fn fillet(
        &self,
        unit: Unit,
        calendar: CalendarSystem,
        bounds: &BoundsTable,
    ) -> Result<Vec<Range>> {
        let first = self.start.truncated(unit);
        let last = self.end.truncated(unit);
        first.require(unit)?;

        let mut pieces = Vec::new();
        let mut cursor = first;
        loop {
            let start = if cursor == first {
                self.start
            } else {
                self.rebase(&cursor, unit, Edge::Start, calendar, bounds)?
            };
            let at_end = cursor.try_cmp(&last)? != Ordering::Less;
            let end = if at_end {
                self.end
            } else {
                self.rebase(&cursor, unit, Edge::End, calendar, bounds)?
            };
            pieces.push(Range::new(start, end)?);
            if at_end {
                return Ok(pieces);
            }
            cursor = match step_forward(&cursor, unit, calendar, bounds)? {
                Some(next) => next,
                None => return Ok(pieces),
            };
        }
    }

    /// One end of the range moved to `prefix` (units through `unit`), with the
    /// finer units set to their extreme for that end.
    fn rebase(
        &self,
        prefix: &PartialMoment,
        unit: Unit,
        edge: Edge,
        calendar: CalendarSystem,
        bounds: &BoundsTable,
    ) -> Result<PartialMoment> {
        let mut moment = match edge {
            Edge::Start => self.start,
            Edge::End => self.end,
        };
        for u in unit.through() {
            moment.set(*u, prefix.get(*u));
        }
        fill_finer(&mut moment, unit, edge, calendar, bounds)?;
        Ok(moment)
    }

    /// The range boundary on calendar `date`: the range's own end when the
    /// date is where that end already sits, otherwise the start (or end) of
    /// that day at the range's resolution.
    pub(crate) fn boundary_on(
        &self,
        date: (i32, i32, i32),
        edge: Edge,
        calendar: CalendarSystem,
        bounds: &BoundsTable,
    ) -> Result<PartialMoment> {
        let (year, month, day) = date;
        let prefix = PartialMoment::ymd(year, month, day);
        let own = match edge {
            Edge::Start => &self.start,
            Edge::End => &self.end,
        };
        if own.truncated(Unit::Day) == prefix.with_context_of(own) {
            return Ok(*own);
        }
        self.rebase(&prefix, Unit::Day, edge, calendar, bounds)
    }

    /// Whether `next` (starting no earlier than this range) overlaps or
    /// directly follows this range.
    fn touches(&self, next: &Range, calendar: CalendarSystem, bounds: &BoundsTable) -> Result<bool> {
        if next.start.try_cmp(&self.end)? != Ordering::Greater {
            return Ok(true);
        }
        let Some(unit) = self.end.finest_unit() else {
            return Ok(true);
        };
        match step_forward(&self.end, unit, calendar, bounds)? {
            Some(successor) => Ok(successor.try_cmp(&next.start)? == Ordering::Equal),
            None => Ok(false),
        }
    }

    fn with_context(self, context: MomentContext) -> Range {
        Range {
            start: self.start.with_context(context),
            end: self.end.with_context(context),
        }
    }
}

impl PartialMoment {
    fn with_context_of(self, other: &PartialMoment) -> PartialMoment {
        match other.context() {
            Some(context) => self.with_context(context),
            None => self,
        }
    }
}

// ── Ranges ──────────────────────────────────────────────────────────────────

/// An ordered collection of ranges: "the moment lies in one of these windows".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Ranges {
    ranges: Vec<Range>,
}

impl Ranges {
    pub fn new() -> Self {
        Self::default()
    }

    /// One range per contiguous run `(first, last)` of `unit` values.
    pub fn from_runs(unit: Unit, runs: &[(i32, i32)]) -> Result<Self> {
        runs.iter()
            .map(|&(first, last)| {
                Range::new(
                    PartialMoment::new().with(unit, first),
                    PartialMoment::new().with(unit, last),
                )
            })
            .collect()
    }

    pub fn push(&mut self, range: Range) {
        self.ranges.push(range);
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Range> {
        self.ranges.iter()
    }

    pub fn as_slice(&self) -> &[Range] {
        &self.ranges
    }

    /// Cross `other` into the accumulator.
    ///
    /// An empty accumulator adopts `other` verbatim. Otherwise every existing
    /// range is combined with every incoming range, giving `|self| × |other|`
    /// ranges.
    pub fn merge(&self, other: &Ranges) -> Result<Ranges> {
        if self.is_empty() {
            return Ok(other.clone());
        }
        let mut merged = Vec::with_capacity(self.len() * other.len());
        for existing in &self.ranges {
            for incoming in &other.ranges {
                merged.push(existing.merge(incoming)?);
            }
        }
        Ok(Ranges { ranges: merged })
    }

    /// Split every range into one range per concrete value of all its units.
    pub fn fillet(&self, calendar: CalendarSystem, bounds: &BoundsTable) -> Result<Ranges> {
        let mut pieces = Vec::with_capacity(self.len());
        for range in &self.ranges {
            match range.start.finest_unit() {
                Some(unit) => pieces.extend(range.fillet(unit, calendar, bounds)?),
                None => pieces.push(*range),
            }
        }
        Ok(Ranges { ranges: pieces })
    }

    /// Order by start moment.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] if the ranges do not all know the
    /// same units.
    pub fn sort(&mut self) -> Result<()> {
        if let Some(first) = self.ranges.first() {
            if let Some(odd) = self
                .ranges
                .iter()
                .find(|r| !r.start.same_units(&first.start))
            {
                return Err(EngineError::InvalidState(format!(
                    "cannot sort ranges starting at {} and {}",
                    first.start, odd.start
                )));
            }
        }
        self.ranges.sort_by_key(|r| r.start.sort_key());
        Ok(())
    }

    /// Sort, then join ranges that overlap or directly follow each other.
    pub fn coalesce(mut self, calendar: CalendarSystem, bounds: &BoundsTable) -> Result<Ranges> {
        self.sort()?;
        let mut joined: Vec<Range> = Vec::with_capacity(self.len());
        for range in self.ranges {
            if let Some(last) = joined.last_mut() {
                if last.touches(&range, calendar, bounds)? {
                    if range.end.try_cmp(&last.end)? == Ordering::Greater {
                        last.end = range.end;
                    }
                    continue;
                }
            }
            joined.push(range);
        }
        Ok(Ranges { ranges: joined })
    }

    /// Stamp every moment with `context`.
    pub fn with_context(self, context: MomentContext) -> Ranges {
        self.ranges
            .into_iter()
            .map(|r| r.with_context(context))
            .collect()
    }

    /// The smallest start across all ranges.
    pub fn earliest(&self) -> Result<Option<PartialMoment>> {
        let mut best: Option<PartialMoment> = None;
        for range in &self.ranges {
            best = match best {
                Some(b) if b.try_cmp(&range.start)? != Ordering::Greater => Some(b),
                _ => Some(range.start),
            };
        }
        Ok(best)
    }

    /// The largest end across all ranges.
    pub fn latest(&self) -> Result<Option<PartialMoment>> {
        let mut best: Option<PartialMoment> = None;
        for range in &self.ranges {
            best = match best {
                Some(b) if b.try_cmp(&range.end)? != Ordering::Less => Some(b),
                _ => Some(range.end),
            };
        }
        Ok(best)
    }

    /// Whether `moment` lies inside any range.
    pub fn contains(&self, moment: &PartialMoment) -> Result<bool> {
        for range in &self.ranges {
            if range.contains(moment)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether `window` shares a moment with any range.
    pub fn overlaps(&self, window: &Range) -> Result<bool> {
        for range in &self.ranges {
            if range.overlaps(window)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl FromIterator<Range> for Ranges {
    fn from_iter<I: IntoIterator<Item = Range>>(iter: I) -> Self {
        Ranges {
            ranges: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Ranges {
    type Item = Range;
    type IntoIter = std::vec::IntoIter<Range>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.into_iter()
    }
}

impl<'a> IntoIterator for &'a Ranges {
    type Item = &'a Range;
    type IntoIter = std::slice::Iter<'a, Range>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
