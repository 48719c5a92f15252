//! Calendar units, calendar systems, and partially specified moments.
//!
//! A [`PartialMoment`] knows zero or more of {year, month, day, hour, minute,
//! second}. Two moments are only comparable when they know exactly the same
//! units; comparing anything else is a contract violation and is reported as
//! [`EngineError::InvalidState`] instead of being silently approximated.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{EngineError, Result};

/// Days between the Julian Day Number epoch and `0000-12-31` (proleptic Gregorian),
/// i.e. `jdn - CE_OFFSET == NaiveDate::num_days_from_ce()`.
const CE_OFFSET: i64 = 1_721_425;

// ── Unit ────────────────────────────────────────────────────────────────────

/// A calendar unit, ordered from most to least significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl Unit {
    /// Every unit in significance order.
    pub const ALL: [Unit; 6] = [
        Unit::Year,
        Unit::Month,
        Unit::Day,
        Unit::Hour,
        Unit::Minute,
        Unit::Second,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Unit::Year => "year",
            Unit::Month => "month",
            Unit::Day => "day",
            Unit::Hour => "hour",
            Unit::Minute => "minute",
            Unit::Second => "second",
        }
    }

    /// The next more significant unit (`Day` → `Month`).
    pub fn coarser(self) -> Option<Unit> {
        self.index().checked_sub(1).map(|i| Unit::ALL[i])
    }

    /// The next less significant unit (`Day` → `Hour`).
    pub fn finer(self) -> Option<Unit> {
        Unit::ALL.get(self.index() + 1).copied()
    }

    /// `self` and every more significant unit, coarsest first.
    pub fn through(self) -> &'static [Unit] {
        &Unit::ALL[..=self.index()]
    }

    /// Every unit less significant than `self`, coarsest first.
    pub fn finer_units(self) -> &'static [Unit] {
        &Unit::ALL[self.index() + 1..]
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── CalendarSystem ──────────────────────────────────────────────────────────

/// Calendar system used for month lengths and weekday computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarSystem {
    /// Proleptic Gregorian calendar.
    #[default]
    Gregorian,
    /// Julian calendar (every fourth year is a leap year).
    Julian,
}

impl CalendarSystem {
    pub fn is_leap_year(self, year: i32) -> bool {
        match self {
            CalendarSystem::Gregorian => {
                (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
            }
            CalendarSystem::Julian => year % 4 == 0,
        }
    }

    /// Number of days in `month` of `year`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] if `month` is outside `1..=12`.
    pub fn days_in_month(self, year: i32, month: i32) -> Result<i32> {
        match month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => Ok(31),
            4 | 6 | 9 | 11 => Ok(30),
            2 if self.is_leap_year(year) => Ok(29),
            2 => Ok(28),
            _ => Err(EngineError::InvalidState(format!(
                "month {month} is outside 1..=12"
            ))),
        }
    }

    /// Julian Day Number of a date in this calendar.
    pub fn day_number(self, year: i32, month: i32, day: i32) -> i64 {
        let a = i64::from((14 - month) / 12);
        let y = i64::from(year) + 4800 - a;
        let m = i64::from(month) + 12 * a - 3;
        let base = i64::from(day) + (153 * m + 2) / 5 + 365 * y + y / 4;
        match self {
            CalendarSystem::Gregorian => base - y / 100 + y / 400 - 32045,
            CalendarSystem::Julian => base - 32083,
        }
    }

    /// The date in this calendar with the given Julian Day Number.
    pub fn from_day_number(self, jdn: i64) -> (i32, i32, i32) {
        let (centuries, c) = match self {
            CalendarSystem::Gregorian => {
                let a = jdn + 32044;
                let b = (4 * a + 3) / 146_097;
                (b, a - 146_097 * b / 4)
            }
            CalendarSystem::Julian => (0, jdn + 32082),
        };
        let d = (4 * c + 3) / 1461;
        let e = c - 1461 * d / 4;
        let m = (5 * e + 2) / 153;
        let day = e - (153 * m + 2) / 5 + 1;
        let month = m + 3 - 12 * (m / 10);
        let year = 100 * centuries + d - 4800 + m / 10;
        (year as i32, month as i32, day as i32)
    }

    /// ISO weekday number of a date: 1 = Monday … 7 = Sunday.
    pub fn iso_weekday(self, year: i32, month: i32, day: i32) -> i32 {
        (self.day_number(year, month, day).rem_euclid(7) + 1) as i32
    }

    /// The calendar day after `date`.
    pub fn next_day(self, (year, month, day): (i32, i32, i32)) -> Result<(i32, i32, i32)> {
        if day < self.days_in_month(year, month)? {
            Ok((year, month, day + 1))
        } else if month < 12 {
            Ok((year, month + 1, 1))
        } else {
            Ok((year + 1, 1, 1))
        }
    }
}

// ── MomentContext ───────────────────────────────────────────────────────────

/// External context a resolved moment is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MomentContext {
    pub calendar: CalendarSystem,
    pub timezone: Tz,
}

// ── PartialMoment ───────────────────────────────────────────────────────────

/// A calendar moment with zero or more units concretely known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartialMoment {
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub day: Option<i32>,
    pub hour: Option<i32>,
    pub minute: Option<i32>,
    pub second: Option<i32>,
    context: Option<MomentContext>,
}

impl PartialMoment {
    /// A moment with no units known.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ymd(year: i32, month: i32, day: i32) -> Self {
        Self::new()
            .with(Unit::Year, year)
            .with(Unit::Month, month)
            .with(Unit::Day, day)
    }

    pub fn ymd_hms(year: i32, month: i32, day: i32, hour: i32, minute: i32, second: i32) -> Self {
        Self::ymd(year, month, day)
            .with(Unit::Hour, hour)
            .with(Unit::Minute, minute)
            .with(Unit::Second, second)
    }

    /// Returns a copy with `unit` set to `value`.
    #[must_use]
    pub fn with(mut self, unit: Unit, value: i32) -> Self {
        *self.slot(unit) = Some(value);
        self
    }

    /// Returns a copy with `unit` cleared.
    #[must_use]
    pub fn without(mut self, unit: Unit) -> Self {
        *self.slot(unit) = None;
        self
    }

    pub fn get(&self, unit: Unit) -> Option<i32> {
        match unit {
            Unit::Year => self.year,
            Unit::Month => self.month,
            Unit::Day => self.day,
            Unit::Hour => self.hour,
            Unit::Minute => self.minute,
            Unit::Second => self.second,
        }
    }

    pub fn set(&mut self, unit: Unit, value: Option<i32>) {
        *self.slot(unit) = value;
    }

    fn slot(&mut self, unit: Unit) -> &mut Option<i32> {
        match unit {
            Unit::Year => &mut self.year,
            Unit::Month => &mut self.month,
            Unit::Day => &mut self.day,
            Unit::Hour => &mut self.hour,
            Unit::Minute => &mut self.minute,
            Unit::Second => &mut self.second,
        }
    }

    /// The value of `unit`, or an [`EngineError::InvalidState`] if it is absent.
    pub fn require(&self, unit: Unit) -> Result<i32> {
        self.get(unit).ok_or_else(|| {
            EngineError::InvalidState(format!("{unit} is not known in moment {self}"))
        })
    }

    /// Populated units in significance order.
    pub fn populated(&self) -> Vec<Unit> {
        Unit::ALL
            .into_iter()
            .filter(|u| self.get(*u).is_some())
            .collect()
    }

    /// Whether both moments know exactly the same units.
    pub fn same_units(&self, other: &PartialMoment) -> bool {
        Unit::ALL
            .iter()
            .all(|u| self.get(*u).is_some() == other.get(*u).is_some())
    }

    /// The least significant populated unit.
    pub fn finest_unit(&self) -> Option<Unit> {
        Unit::ALL.into_iter().rev().find(|u| self.get(*u).is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.finest_unit().is_none()
    }

    /// Whether every unit from year to second is known.
    pub fn is_complete(&self) -> bool {
        Unit::ALL.iter().all(|u| self.get(*u).is_some())
    }

    /// Whether the populated units are exactly `year..=finest` with no gaps.
    pub fn is_prefix(&self) -> bool {
        match self.finest_unit() {
            Some(finest) => finest.through().iter().all(|u| self.get(*u).is_some()),
            None => true,
        }
    }

    /// Returns a copy keeping only `unit` and the more significant units.
    #[must_use]
    pub fn truncated(mut self, unit: Unit) -> Self {
        for finer in unit.finer_units() {
            *self.slot(*finer) = None;
        }
        self
    }

    pub fn context(&self) -> Option<MomentContext> {
        self.context
    }

    #[must_use]
    pub fn with_context(mut self, context: MomentContext) -> Self {
        self.context = Some(context);
        self
    }

    pub(crate) fn sort_key(&self) -> [Option<i32>; 6] {
        Unit::ALL.map(|u| self.get(u))
    }

    fn check_context(&self, other: &PartialMoment) -> Result<()> {
        match (self.context, other.context) {
            (Some(a), Some(b)) if a != b => Err(EngineError::InvalidState(format!(
                "moments {self} and {other} carry different calendar or timezone context"
            ))),
            _ => Ok(()),
        }
    }

    /// Compare two moments unit by unit in significance order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] if the moments do not share the
    /// same populated units or carry different contexts.
    pub fn try_cmp(&self, other: &PartialMoment) -> Result<Ordering> {
        if !self.same_units(other) {
            return Err(EngineError::InvalidState(format!(
                "cannot compare {self} with {other}: populated units differ"
            )));
        }
        self.check_context(other)?;
        Ok(self.sort_key().cmp(&other.sort_key()))
    }

    /// Overlay `other` onto `self`: every unit `other` knows wins.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] if both moments carry a context
    /// and the contexts disagree.
    pub fn merge(&self, other: &PartialMoment) -> Result<PartialMoment> {
        self.check_context(other)?;
        let mut merged = *self;
        for unit in Unit::ALL {
            if let Some(value) = other.get(unit) {
                merged.set(unit, Some(value));
            }
        }
        merged.context = other.context.or(self.context);
        Ok(merged)
    }

    /// Julian Day Number of the date part.
    pub fn day_number(&self, calendar: CalendarSystem) -> Result<i64> {
        Ok(calendar.day_number(
            self.require(Unit::Year)?,
            self.require(Unit::Month)?,
            self.require(Unit::Day)?,
        ))
    }

    /// Seconds since the Julian Day Number epoch. Requires a complete moment.
    pub fn ordinal_seconds(&self, calendar: CalendarSystem) -> Result<i64> {
        let days = self.day_number(calendar)?;
        let hour = i64::from(self.require(Unit::Hour)?);
        let minute = i64::from(self.require(Unit::Minute)?);
        let second = i64::from(self.require(Unit::Second)?);
        Ok(days * 86_400 + hour * 3600 + minute * 60 + second)
    }

    /// Convert a complete moment to a (proleptic Gregorian) naive datetime.
    pub fn to_naive(&self, calendar: CalendarSystem) -> Result<NaiveDateTime> {
        let invalid = || EngineError::InvalidDatetime(format!("'{self}' is not a valid datetime"));
        let days = i32::try_from(self.day_number(calendar)? - CE_OFFSET).map_err(|_| invalid())?;
        let to_u32 = |unit: Unit| -> Result<u32> {
            u32::try_from(self.require(unit)?).map_err(|_| invalid())
        };
        let (hour, minute, second) = (
            to_u32(Unit::Hour)?,
            to_u32(Unit::Minute)?,
            to_u32(Unit::Second)?,
        );
        NaiveDate::from_num_days_from_ce_opt(days)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .ok_or_else(invalid)
    }

    /// Build a complete moment from a naive datetime, expressed in `calendar`.
    pub fn from_naive(naive: NaiveDateTime, calendar: CalendarSystem) -> Self {
        let (year, month, day) = match calendar {
            CalendarSystem::Gregorian => (naive.year(), naive.month() as i32, naive.day() as i32),
            CalendarSystem::Julian => calendar
                .from_day_number(i64::from(naive.date().num_days_from_ce()) + CE_OFFSET),
        };
        Self::ymd_hms(
            year,
            month,
            day,
            naive.hour() as i32,
            naive.minute() as i32,
            naive.second() as i32,
        )
    }
}

impl fmt::Display for PartialMoment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(finest) = self.finest_unit() else {
            return f.write_str("*");
        };
        for unit in finest.through() {
            let separator = match unit {
                Unit::Year => "",
                Unit::Month | Unit::Day => "-",
                Unit::Hour => "T",
                Unit::Minute | Unit::Second => ":",
            };
            f.write_str(separator)?;
            match (unit, self.get(*unit)) {
                (Unit::Year, Some(v)) if v < 0 => write!(f, "-{:04}", v.unsigned_abs())?,
                (Unit::Year, Some(v)) => write!(f, "{v:04}")?,
                (Unit::Year, None) => f.write_str("????")?,
                (_, Some(v)) => write!(f, "{v:02}")?,
                (_, None) => f.write_str("??")?,
            }
        }
        Ok(())
    }
}

impl FromStr for PartialMoment {
    type Err = EngineError;

    /// Parse `[-]YYYY[-MM[-DD[Thh[:mm[:ss]]]]]`; `??` (or `????`) leaves a unit
    /// unknown. A leading `-` marks a year before 1 (astronomical numbering).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = |reason: &str| EngineError::InvalidDatetime(format!("'{s}': {reason}"));
        if s == "*" {
            return Ok(PartialMoment::new());
        }

        let (date, time) = match s.split_once('T') {
            Some((date, time)) => (date, Some(time)),
            None => (s, None),
        };
        let (negative, date) = match date.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, date),
        };
        let date_parts: Vec<&str> = date.split('-').collect();
        let time_parts: Vec<&str> = time.map(|t| t.split(':').collect()).unwrap_or_default();
        if date_parts.len() > 3 || time_parts.len() > 3 {
            return Err(invalid("too many components"));
        }
        if time.is_some() && date_parts.len() != 3 {
            return Err(invalid("a time needs a full date"));
        }

        let mut moment = PartialMoment::new();
        for (unit, part) in Unit::ALL.into_iter().zip(date_parts.into_iter().chain(time_parts)) {
            let sign = if negative && unit == Unit::Year { -1 } else { 1 };
            if part.chars().all(|c| c == '?') && !part.is_empty() {
                if sign < 0 {
                    return Err(invalid("an unknown year cannot carry a sign"));
                }
                continue;
            }
            if part.starts_with(['-', '+']) {
                return Err(invalid(&format!("{unit} '{part}' must be unsigned")));
            }
            let value = part
                .parse::<i32>()
                .map_err(|e| invalid(&format!("{unit} '{part}': {e}")))?;
            moment.set(unit, Some(sign * value));
        }
        Ok(moment)
    }
}

impl Serialize for PartialMoment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PartialMoment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
