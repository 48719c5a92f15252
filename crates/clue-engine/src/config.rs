//! Engine configuration: calendar system, time zone, default year, and the
//! per-unit bounds table.
//!
//! Configuration is consumed, never computed, by the engine. It is plain data
//! (serde-deserializable, every field defaulted) and is checked once by
//! [`EngineConfig::validate`] before a [`Resolver`](crate::Resolver) uses it.

use chrono::{Datelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::moment::{CalendarSystem, PartialMoment, Unit};

/// Upper bound of a unit's value domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxBound {
    Fixed(i32),
    /// Depends on the coarser units (the day count of a month).
    Dynamic,
}

/// Inclusive value domain of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitBounds {
    pub min: i32,
    pub max: MaxBound,
}

impl UnitBounds {
    pub const fn fixed(min: i32, max: i32) -> Self {
        Self {
            min,
            max: MaxBound::Fixed(max),
        }
    }

    pub const fn dynamic(min: i32) -> Self {
        Self {
            min,
            max: MaxBound::Dynamic,
        }
    }
}

/// Value domains for every unit a clue can address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundsTable {
    pub year: UnitBounds,
    pub month: UnitBounds,
    pub day: UnitBounds,
    pub hour: UnitBounds,
    pub minute: UnitBounds,
    pub second: UnitBounds,
    /// ISO weekday numbers, 1 = Monday … 7 = Sunday.
    pub weekday: UnitBounds,
}

impl Default for BoundsTable {
    fn default() -> Self {
        Self {
            year: UnitBounds::fixed(1, 9999),
            month: UnitBounds::fixed(1, 12),
            day: UnitBounds::dynamic(1),
            hour: UnitBounds::fixed(0, 23),
            minute: UnitBounds::fixed(0, 59),
            second: UnitBounds::fixed(0, 59),
            weekday: UnitBounds::fixed(1, 7),
        }
    }
}

impl BoundsTable {
    pub fn get(&self, unit: Unit) -> UnitBounds {
        match unit {
            Unit::Year => self.year,
            Unit::Month => self.month,
            Unit::Day => self.day,
            Unit::Hour => self.hour,
            Unit::Minute => self.minute,
            Unit::Second => self.second,
        }
    }

    pub fn min(&self, unit: Unit) -> i32 {
        self.get(unit).min
    }

    /// Largest legal value of `unit`, given the coarser units known on `moment`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] if `unit` is the day and `moment`
    /// lacks a concrete year and month.
    pub fn max_for(&self, unit: Unit, calendar: CalendarSystem, moment: &PartialMoment) -> Result<i32> {
        let bounds = self.get(unit);
        if unit == Unit::Day {
            let (Some(year), Some(month)) = (moment.year, moment.month) else {
                return Err(EngineError::InvalidState(format!(
                    "day count requires a concrete year and month, got {moment}"
                )));
            };
            let days = calendar.days_in_month(year, month)?;
            return Ok(match bounds.max {
                MaxBound::Fixed(max) => max.min(days),
                MaxBound::Dynamic => days,
            });
        }
        match bounds.max {
            MaxBound::Fixed(max) => Ok(max),
            MaxBound::Dynamic => Err(EngineError::InvalidConfig(format!(
                "{unit} has no dynamic maximum"
            ))),
        }
    }

    /// Whether every unit known on `moment` lies inside its bounds.
    ///
    /// The day is only checked against the month length when year and month
    /// are known as well.
    pub fn admits(&self, moment: &PartialMoment, calendar: CalendarSystem) -> Result<bool> {
        for unit in moment.populated() {
            let value = moment.require(unit)?;
            if value < self.min(unit) {
                return Ok(false);
            }
            let max = match (unit, moment.year, moment.month) {
                (Unit::Day, Some(_), Some(month)) if !(1..=12).contains(&month) => return Ok(false),
                (Unit::Day, Some(_), Some(_)) => self.max_for(unit, calendar, moment)?,
                (Unit::Day, _, _) => match self.day.max {
                    MaxBound::Fixed(max) => max.min(31),
                    MaxBound::Dynamic => 31,
                },
                _ => self.max_for(unit, calendar, moment)?,
            };
            if value > max {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn validate(&self) -> Result<()> {
        let check = |name: &str, bounds: UnitBounds, lo: i32, hi: i32| -> Result<()> {
            let max = match bounds.max {
                MaxBound::Fixed(max) => max,
                MaxBound::Dynamic if name == "day" => hi,
                MaxBound::Dynamic => {
                    return Err(EngineError::InvalidConfig(format!(
                        "{name} cannot have a dynamic maximum"
                    )))
                }
            };
            if bounds.min < lo || max > hi || bounds.min > max {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} bounds {}..={max} must lie within {lo}..={hi}",
                    bounds.min
                )));
            }
            Ok(())
        };
        check("year", self.year, -4000, 99_999)?;
        check("month", self.month, 1, 12)?;
        check("day", self.day, 1, 31)?;
        check("hour", self.hour, 0, 23)?;
        check("minute", self.minute, 0, 59)?;
        check("second", self.second, 0, 59)?;
        check("weekday", self.weekday, 1, 7)
    }
}

/// Configuration consumed by a [`Resolver`](crate::Resolver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub calendar: CalendarSystem,
    /// IANA time zone the clues are expressed in (e.g. `"America/New_York"`).
    pub timezone: String,
    /// Year assumed when no clue mentions the year. Defaults to the current
    /// year in [`timezone`](Self::timezone).
    pub default_year: Option<i32>,
    pub bounds: BoundsTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            calendar: CalendarSystem::Gregorian,
            timezone: "UTC".to_string(),
            default_year: None,
            bounds: BoundsTable::default(),
        }
    }
}

impl EngineConfig {
    /// Check the configuration and return the parsed time zone.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTimezone`] for an unknown IANA name and
    /// [`EngineError::InvalidConfig`] for inconsistent bounds.
    pub fn validate(&self) -> Result<Tz> {
        let tz = parse_timezone(&self.timezone)?;
        self.bounds.validate()?;
        if let Some(year) = self.default_year {
            let (lo, hi) = match self.bounds.year.max {
                MaxBound::Fixed(max) => (self.bounds.year.min, max),
                MaxBound::Dynamic => (self.bounds.year.min, i32::MAX),
            };
            if !(lo..=hi).contains(&year) {
                return Err(EngineError::InvalidConfig(format!(
                    "default year {year} is outside the year bounds {lo}..={hi}"
                )));
            }
        }
        Ok(tz)
    }

    /// The configured default year, or the current year in `tz`.
    pub fn default_year_in(&self, tz: Tz) -> i32 {
        self.default_year
            .unwrap_or_else(|| Utc::now().with_timezone(&tz).year())
    }
}

/// Parse an IANA timezone string into `Tz`.
pub(crate) fn parse_timezone(s: &str) -> Result<Tz> {
    s.parse::<Tz>()
        .map_err(|_| EngineError::InvalidTimezone(format!("'{}'", s)))
}

// ── Tests ───────────────────────────────────────────────────────────────────
