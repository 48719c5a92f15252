//! The resolver: runs every unit's filter over the accumulator and answers
//! queries about the result.
//!
//! Passes run in significance order: year, month, day, the registered
//! compound units ending at the day, the weekday, then hour, minute, and
//! second. Compound passes only run when some clue restricts them; the
//! weekday pass also runs when the configured weekday bounds exclude some
//! day of the week. The first pass seeds the accumulator; a pass leaving it
//! empty ends resolution early, since no later pass can add moments back.
//!
//! # Example
//!
//! ```
//! use clue_engine::{Clue, EngineConfig, Resolver, Unit};
//!
//! let mut resolver = Resolver::new(EngineConfig::default()).unwrap();
//! resolver.add_clue(Clue::is(Unit::Year, 1985));
//! assert_eq!(resolver.earliest().unwrap().to_string(), "1985-01-01T00:00:00");
//! assert_eq!(resolver.latest().unwrap().to_string(), "1985-12-31T23:59:59");
//! ```

use std::cell::OnceCell;

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::clue::{Clue, ClueSet, ClueUnit, CompoundUnit};
use crate::config::{EngineConfig, UnitBounds};
use crate::error::{EngineError, Result};
use crate::filter::{filter_for, FilterContext};
use crate::interval::{compute_interval, IntervalInfo};
use crate::moment::{MomentContext, PartialMoment, Unit};
use crate::range::{Edge, Range, Ranges};

/// Resolves a [`ClueSet`] into the candidate ranges it leaves open.
///
/// The resolution is computed on first query and memoized until the next
/// clue or configuration change.
#[derive(Debug, Clone)]
pub struct Resolver {
    config: EngineConfig,
    timezone: Tz,
    clues: ClueSet,
    resolved: OnceCell<Ranges>,
}

impl Resolver {
    /// # Errors
    ///
    /// Returns the error of [`EngineConfig::validate`] for a bad configuration.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let timezone = config.validate()?;
        let mut clues = ClueSet::new();
        clues.set_default_year(Some(config.default_year_in(timezone)));
        Ok(Self {
            config,
            timezone,
            clues,
            resolved: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Replace the configuration. The clues are kept; the resolution is not.
    pub fn set_config(&mut self, config: EngineConfig) -> Result<()> {
        let timezone = config.validate()?;
        self.clues
            .set_default_year(Some(config.default_year_in(timezone)));
        self.config = config;
        self.timezone = timezone;
        self.resolved = OnceCell::new();
        Ok(())
    }

    pub fn add_clue(&mut self, clue: Clue) -> &mut Self {
        self.clues.add(clue);
        self.resolved = OnceCell::new();
        self
    }

    pub fn add_clues<I: IntoIterator<Item = Clue>>(&mut self, clues: I) -> &mut Self {
        self.clues.extend(clues);
        self.resolved = OnceCell::new();
        self
    }

    pub fn clues(&self) -> &ClueSet {
        &self.clues
    }

    /// The disjoint, ordered candidate ranges. Empty when the clues contradict.
    pub fn ranges(&self) -> Result<&Ranges> {
        if let Some(ranges) = self.resolved.get() {
            return Ok(ranges);
        }
        let ranges = self.resolve()?;
        Ok(self.resolved.get_or_init(|| ranges))
    }

    /// Every candidate range as a `(start, end)` pair.
    pub fn possibilities(&self) -> Result<Vec<(PartialMoment, PartialMoment)>> {
        Ok(self
            .ranges()?
            .iter()
            .map(|r| (*r.start(), *r.end()))
            .collect())
    }

    /// The first possible moment.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Contradiction`] if no moment satisfies the clues.
    pub fn earliest(&self) -> Result<PartialMoment> {
        self.ranges()?
            .earliest()?
            .ok_or_else(|| self.contradiction())
    }

    /// The last possible moment.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Contradiction`] if no moment satisfies the clues.
    pub fn latest(&self) -> Result<PartialMoment> {
        self.ranges()?
            .latest()?
            .ok_or_else(|| self.contradiction())
    }

    /// [`earliest`](Self::earliest) read as wall-clock time in the configured
    /// time zone. A wall-clock time that occurs twice maps to its first
    /// occurrence; one skipped by a DST gap maps to the first instant after
    /// the gap.
    pub fn earliest_utc(&self) -> Result<DateTime<Utc>> {
        let earliest = self.earliest()?;
        self.to_utc(&earliest, Edge::Start)
    }

    /// [`latest`](Self::latest) read as wall-clock time in the configured
    /// time zone. A wall-clock time that occurs twice maps to its last
    /// occurrence; one skipped by a DST gap maps to the last instant before
    /// the gap.
    pub fn latest_utc(&self) -> Result<DateTime<Utc>> {
        let latest = self.latest()?;
        self.to_utc(&latest, Edge::End)
    }

    /// The span from the earliest to the latest possible moment.
    pub fn interval(&self) -> Result<IntervalInfo> {
        compute_interval(&self.earliest()?, &self.latest()?, self.config.calendar)
    }

    /// Whether `moment` could be the unknown moment.
    ///
    /// A complete moment is tested for membership. A partial moment that knows
    /// the year and every unit down to its finest (e.g. `1985-03`) stands for
    /// its whole window and is possible if any moment of that window is.
    /// Values the bounds never admit, such as February 31st, are impossible.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] for an empty moment or one with a
    /// gap in its units.
    pub fn is_possible(&self, moment: &PartialMoment) -> Result<bool> {
        let (calendar, bounds) = (self.config.calendar, &self.config.bounds);
        if !bounds.admits(moment, calendar)? {
            return Ok(false);
        }
        let window = Range::covering(moment, Unit::Second, calendar, bounds)?;
        self.ranges()?.overlaps(&window)
    }

    /// Whether the instant `at`, seen on the configured time zone's wall
    /// clock, could be the unknown moment.
    pub fn is_possible_at(&self, at: DateTime<Utc>) -> Result<bool> {
        let local = at.with_timezone(&self.timezone).naive_local();
        self.is_possible(&PartialMoment::from_naive(local, self.config.calendar))
    }

    fn to_utc(&self, moment: &PartialMoment, edge: Edge) -> Result<DateTime<Utc>> {
        let naive = moment.to_naive(self.config.calendar)?;
        match (self.timezone.from_local_datetime(&naive), edge) {
            (LocalResult::Single(local), _) => Ok(local.with_timezone(&Utc)),
            (LocalResult::Ambiguous(first, _), Edge::Start) => Ok(first.with_timezone(&Utc)),
            (LocalResult::Ambiguous(_, last), Edge::End) => Ok(last.with_timezone(&Utc)),
            (LocalResult::None, edge) => {
                let after_gap = first_instant_from(self.timezone, naive)?;
                debug!(%moment, %after_gap, "wall-clock time falls in a DST gap");
                match edge {
                    Edge::Start => Ok(after_gap),
                    Edge::End => Ok(after_gap - TimeDelta::seconds(1)),
                }
            }
        }
    }

    fn contradiction(&self) -> EngineError {
        EngineError::Contradiction(format!(
            "no moment satisfies all {} clues",
            self.clues.len()
        ))
    }

    /// Clue units in the order their filters run.
    fn passes(&self) -> Result<Vec<ClueUnit>> {
        let mut passes = Vec::new();
        for unit in Unit::ALL {
            passes.push(ClueUnit::Moment(unit));
            for compound in CompoundUnit::REGISTERED {
                let unit_of = ClueUnit::Compound(compound);
                if compound.finest() == unit && self.clues.unit_has_restrictions(unit_of)? {
                    passes.push(unit_of);
                }
            }
            if unit == Unit::Day && self.weekday_narrowed()? {
                passes.push(ClueUnit::Weekday);
            }
        }
        Ok(passes)
    }

    fn weekday_narrowed(&self) -> Result<bool> {
        let full_week = UnitBounds::fixed(1, 7);
        Ok(self.config.bounds.weekday != full_week
            || self.clues.unit_has_restrictions(ClueUnit::Weekday)?)
    }

    fn resolve(&self) -> Result<Ranges> {
        let (calendar, bounds) = (self.config.calendar, &self.config.bounds);
        let ctx = FilterContext {
            clues: &self.clues,
            bounds,
            calendar,
            timezone: self.timezone,
        };

        let mut ranges = Ranges::new();
        for unit in self.passes()? {
            ranges = filter_for(unit, ctx).apply(ranges)?;
            debug!(%unit, ranges = ranges.len(), "pass complete");
            if ranges.is_empty() {
                debug!(%unit, "clues contradict; no possible moments");
                return Ok(ranges);
            }
        }

        let ranges = ranges.coalesce(calendar, bounds)?;
        debug!(ranges = ranges.len(), "resolved");
        Ok(ranges.with_context(MomentContext {
            calendar,
            timezone: self.timezone,
        }))
    }
}

/// The first instant whose wall-clock time in `tz` is at or after `naive`.
fn first_instant_from(tz: Tz, naive: NaiveDateTime) -> Result<DateTime<Utc>> {
    // UTC offsets stay within ±26 hours, so the answer lies in this window.
    const WINDOW: i64 = 26 * 3600;
    let wall = |secs: i64| -> Result<NaiveDateTime> {
        DateTime::from_timestamp(secs, 0)
            .map(|instant| instant.with_timezone(&tz).naive_local())
            .ok_or_else(|| EngineError::InvalidDatetime(format!("{naive} is out of range")))
    };
    let pivot = naive.and_utc().timestamp();
    let (mut lo, mut hi) = (pivot - WINDOW, pivot + WINDOW);
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if wall(mid)? >= naive {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    DateTime::from_timestamp(hi, 0)
        .ok_or_else(|| EngineError::InvalidDatetime(format!("{naive} is out of range")))
}
