//! Clues and the clue set that classifies them per unit.
//!
//! A [`Clue`] is one piece of structured evidence: a [`FilterKind`] applied
//! to exactly one unit (a moment unit, the weekday, or a registered
//! [`CompoundUnit`]). A [`ClueSet`] aggregates clues into per-unit
//! [`Evidence`]: a whitelist, a blacklist, and the most restrictive
//! before/after bounds.

use std::cell::OnceCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{EngineError, Result};
use crate::moment::{PartialMoment, Unit};

/// How a clue constrains its unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// The unit has this value (several whitelist clues mean "one of these").
    Whitelist,
    /// The unit does not have this value.
    Blacklist,
    /// The unit is this value or later.
    #[serde(alias = "after")]
    AfterOrEqual,
    /// The unit is this value or earlier.
    #[serde(alias = "before")]
    BeforeOrEqual,
}

/// A registered combination of units that a single clue may address together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundUnit {
    /// A day of the year, e.g. "after March 12th".
    MonthDay,
}

impl CompoundUnit {
    pub const REGISTERED: [CompoundUnit; 1] = [CompoundUnit::MonthDay];

    /// The units a clue on this compound carries, in significance order.
    pub fn constituents(self) -> &'static [Unit] {
        match self {
            CompoundUnit::MonthDay => &[Unit::Month, Unit::Day],
        }
    }

    /// The least significant constituent; the compound is applied right after it.
    pub fn finest(self) -> Unit {
        match self {
            CompoundUnit::MonthDay => Unit::Day,
        }
    }

    fn matching(units: &[Unit]) -> Option<CompoundUnit> {
        CompoundUnit::REGISTERED
            .into_iter()
            .find(|c| c.constituents() == units)
    }
}

impl fmt::Display for CompoundUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompoundUnit::MonthDay => f.write_str("month-day"),
        }
    }
}

/// The unit a clue addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClueUnit {
    Moment(Unit),
    Weekday,
    Compound(CompoundUnit),
}

impl fmt::Display for ClueUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClueUnit::Moment(unit) => unit.fmt(f),
            ClueUnit::Weekday => f.write_str("weekday"),
            ClueUnit::Compound(compound) => compound.fmt(f),
        }
    }
}

// ── Clue ────────────────────────────────────────────────────────────────────

/// One validated piece of evidence about the unknown moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawClue", into = "RawClue")]
pub struct Clue {
    kind: FilterKind,
    unit: ClueUnit,
    moment: PartialMoment,
    weekday: Option<i32>,
}

impl Clue {
    /// Build a clue from the units it carries.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidClue`] if the clue carries no value, a
    /// weekday mixed with calendar units, a weekday outside `1..=7`, or more
    /// than one unit that does not form a registered [`CompoundUnit`].
    pub fn new(kind: FilterKind, moment: PartialMoment, weekday: Option<i32>) -> Result<Self> {
        let units = moment.populated();
        let unit = match (weekday, units.as_slice()) {
            (Some(day), []) if (1..=7).contains(&day) => ClueUnit::Weekday,
            (Some(day), []) => {
                return Err(EngineError::InvalidClue(format!(
                    "weekday {day} is outside 1 (Monday)..=7 (Sunday)"
                )))
            }
            (Some(_), _) => {
                return Err(EngineError::InvalidClue(format!(
                    "a weekday clue cannot also carry {moment}"
                )))
            }
            (None, []) => {
                return Err(EngineError::InvalidClue("clue carries no value".to_string()))
            }
            (None, [single]) => ClueUnit::Moment(*single),
            (None, many) => match CompoundUnit::matching(many) {
                Some(compound) => ClueUnit::Compound(compound),
                None => {
                    let names: Vec<&str> = many.iter().map(|u| u.name()).collect();
                    return Err(EngineError::InvalidClue(format!(
                        "unregistered unit combination: {}",
                        names.join(", ")
                    )));
                }
            },
        };
        Ok(Self {
            kind,
            unit,
            moment,
            weekday,
        })
    }

    /// A clue on a single moment unit.
    pub fn unit(kind: FilterKind, unit: Unit, value: i32) -> Self {
        Self {
            kind,
            unit: ClueUnit::Moment(unit),
            moment: PartialMoment::new().with(unit, value),
            weekday: None,
        }
    }

    /// A clue on the weekday.
    pub fn weekday(kind: FilterKind, weekday: Weekday) -> Self {
        Self {
            kind,
            unit: ClueUnit::Weekday,
            moment: PartialMoment::new(),
            weekday: Some(weekday.number_from_monday() as i32),
        }
    }

    /// A clue on a day of the year.
    pub fn month_day(kind: FilterKind, month: i32, day: i32) -> Self {
        Self {
            kind,
            unit: ClueUnit::Compound(CompoundUnit::MonthDay),
            moment: PartialMoment::new()
                .with(Unit::Month, month)
                .with(Unit::Day, day),
            weekday: None,
        }
    }

    /// "The unit was `value`."
    pub fn is(unit: Unit, value: i32) -> Self {
        Self::unit(FilterKind::Whitelist, unit, value)
    }

    /// "The unit was not `value`."
    pub fn not(unit: Unit, value: i32) -> Self {
        Self::unit(FilterKind::Blacklist, unit, value)
    }

    /// "The unit was `value` or later."
    pub fn after(unit: Unit, value: i32) -> Self {
        Self::unit(FilterKind::AfterOrEqual, unit, value)
    }

    /// "The unit was `value` or earlier."
    pub fn before(unit: Unit, value: i32) -> Self {
        Self::unit(FilterKind::BeforeOrEqual, unit, value)
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn target(&self) -> ClueUnit {
        self.unit
    }

    /// The units carried by the clue (empty for weekday clues).
    pub fn moment(&self) -> &PartialMoment {
        &self.moment
    }

    /// The single integer a moment-unit or weekday clue carries.
    pub fn scalar(&self) -> Option<i32> {
        match self.unit {
            ClueUnit::Moment(unit) => self.moment.get(unit),
            ClueUnit::Weekday => self.weekday,
            ClueUnit::Compound(_) => None,
        }
    }
}

impl fmt::Display for Clue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FilterKind::Whitelist => "is",
            FilterKind::Blacklist => "is not",
            FilterKind::AfterOrEqual => "is at or after",
            FilterKind::BeforeOrEqual => "is at or before",
        };
        match self.scalar() {
            Some(value) => write!(f, "{} {kind} {value}", self.unit),
            None => write!(f, "{} {kind} {}", self.unit, self.moment),
        }
    }
}

/// Wire form of a [`Clue`]: a kind plus whichever units it carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawClue {
    pub kind: Option<FilterKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekday: Option<i32>,
}

impl TryFrom<RawClue> for Clue {
    type Error = EngineError;

    fn try_from(raw: RawClue) -> Result<Self> {
        let kind = raw
            .kind
            .ok_or_else(|| EngineError::InvalidClue("clue has no kind".to_string()))?;
        let mut moment = PartialMoment::new();
        moment.year = raw.year;
        moment.month = raw.month;
        moment.day = raw.day;
        moment.hour = raw.hour;
        moment.minute = raw.minute;
        moment.second = raw.second;
        Clue::new(kind, moment, raw.weekday)
    }
}

impl From<Clue> for RawClue {
    fn from(clue: Clue) -> Self {
        let m = clue.moment;
        RawClue {
            kind: Some(clue.kind),
            year: m.year,
            month: m.month,
            day: m.day,
            hour: m.hour,
            minute: m.minute,
            second: m.second,
            weekday: clue.weekday,
        }
    }
}

// ── Evidence ────────────────────────────────────────────────────────────────

/// Everything the clues say about one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence<T> {
    /// Sorted, de-duplicated allowed values. Empty means "no whitelist".
    pub whitelist: Vec<T>,
    /// Sorted, de-duplicated forbidden values.
    pub blacklist: Vec<T>,
    /// The smallest "before or equal" bound seen.
    pub before: Option<T>,
    /// The largest "after or equal" bound seen.
    pub after: Option<T>,
}

impl<T> Default for Evidence<T> {
    fn default() -> Self {
        Self {
            whitelist: Vec::new(),
            blacklist: Vec::new(),
            before: None,
            after: None,
        }
    }
}

impl<T> Evidence<T> {
    /// True iff any of the four views is non-empty.
    pub fn is_restricted(&self) -> bool {
        !self.whitelist.is_empty()
            || !self.blacklist.is_empty()
            || self.before.is_some()
            || self.after.is_some()
    }
}

impl<T: Clone> Evidence<T> {
    /// Fold one clue value into the evidence; `cmp` orders values of the unit.
    fn record<F>(&mut self, kind: FilterKind, value: &T, cmp: F) -> Result<()>
    where
        F: Fn(&T, &T) -> Result<Ordering>,
    {
        match kind {
            FilterKind::Whitelist => self.whitelist.push(value.clone()),
            FilterKind::Blacklist => self.blacklist.push(value.clone()),
            FilterKind::BeforeOrEqual => {
                let tighter = match &self.before {
                    Some(current) => cmp(value, current)? == Ordering::Less,
                    None => true,
                };
                if tighter {
                    self.before = Some(value.clone());
                }
            }
            FilterKind::AfterOrEqual => {
                let tighter = match &self.after {
                    Some(current) => cmp(value, current)? == Ordering::Greater,
                    None => true,
                };
                if tighter {
                    self.after = Some(value.clone());
                }
            }
        }
        Ok(())
    }
}

impl Evidence<i32> {
    fn finish(&mut self) {
        for list in [&mut self.whitelist, &mut self.blacklist] {
            list.sort_unstable();
            list.dedup();
        }
    }
}

impl Evidence<PartialMoment> {
    fn finish(&mut self) {
        for list in [&mut self.whitelist, &mut self.blacklist] {
            list.sort_by_key(PartialMoment::sort_key);
            list.dedup();
        }
    }
}

// ── ClueSet ─────────────────────────────────────────────────────────────────

/// Per-unit views derived from the clue list.
#[derive(Debug, Clone, Default)]
struct DerivedViews {
    units: [Evidence<i32>; 6],
    weekday: Evidence<i32>,
    compounds: BTreeMap<CompoundUnit, Evidence<PartialMoment>>,
}

/// All clues known about the unknown moment.
///
/// The per-unit views are derived lazily and memoized until the next
/// mutation. The memo lives in a [`OnceCell`], so a `ClueSet` cannot be shared
/// across threads without external synchronization.
#[derive(Debug, Clone, Default)]
pub struct ClueSet {
    clues: Vec<Clue>,
    default_year: Option<i32>,
    derived: OnceCell<DerivedViews>,
}

impl ClueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clue set that assumes `year` when no clue mentions the year.
    pub fn with_default_year(year: i32) -> Self {
        Self {
            default_year: Some(year),
            ..Self::default()
        }
    }

    /// Change the assumed year; `None` means the current year.
    pub fn set_default_year(&mut self, year: Option<i32>) {
        self.default_year = year;
        self.derived = OnceCell::new();
    }

    pub fn add(&mut self, clue: Clue) -> &mut Self {
        debug!(%clue, "adding clue");
        self.clues.push(clue);
        self.derived = OnceCell::new();
        self
    }

    pub fn len(&self) -> usize {
        self.clues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clues.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Clue> {
        self.clues.iter()
    }

    fn views(&self) -> Result<&DerivedViews> {
        if let Some(views) = self.derived.get() {
            return Ok(views);
        }
        let views = self.derive()?;
        Ok(self.derived.get_or_init(|| views))
    }

    fn derive(&self) -> Result<DerivedViews> {
        let mut views = DerivedViews::default();
        for compound in CompoundUnit::REGISTERED {
            views.compounds.insert(compound, Evidence::default());
        }
        let by_value = |a: &i32, b: &i32| Ok(a.cmp(b));

        for clue in &self.clues {
            match (clue.unit, clue.scalar()) {
                (ClueUnit::Moment(unit), Some(value)) => {
                    views.units[unit as usize].record(clue.kind, &value, by_value)?
                }
                (ClueUnit::Weekday, Some(value)) => {
                    views.weekday.record(clue.kind, &value, by_value)?
                }
                (ClueUnit::Compound(compound), _) => views
                    .compounds
                    .entry(compound)
                    .or_default()
                    .record(clue.kind, &clue.moment, |a, b| a.try_cmp(b))?,
                (unit, None) => {
                    return Err(EngineError::InvalidState(format!(
                        "{unit} clue carries no value"
                    )))
                }
            }
        }

        let year = &mut views.units[Unit::Year as usize];
        if !year.is_restricted() {
            let default_year = self.default_year.unwrap_or_else(|| Utc::now().year());
            year.whitelist.push(default_year);
        }

        for evidence in &mut views.units {
            evidence.finish();
        }
        views.weekday.finish();
        for evidence in views.compounds.values_mut() {
            evidence.finish();
        }
        trace!(clues = self.clues.len(), "derived per-unit evidence");
        Ok(views)
    }

    /// Evidence about a single moment unit.
    pub fn evidence(&self, unit: Unit) -> Result<&Evidence<i32>> {
        Ok(&self.views()?.units[unit as usize])
    }

    /// Evidence about the weekday (ISO numbers, 1 = Monday).
    pub fn weekday_evidence(&self) -> Result<&Evidence<i32>> {
        Ok(&self.views()?.weekday)
    }

    /// Evidence about a compound unit; values carry exactly its constituents.
    pub fn compound_evidence(&self, compound: CompoundUnit) -> Result<&Evidence<PartialMoment>> {
        self.views()?.compounds.get(&compound).ok_or_else(|| {
            EngineError::Unsupported(format!("{compound} is not a registered compound unit"))
        })
    }

    fn scalar_evidence(&self, unit: ClueUnit) -> Result<&Evidence<i32>> {
        match unit {
            ClueUnit::Moment(unit) => self.evidence(unit),
            ClueUnit::Weekday => self.weekday_evidence(),
            ClueUnit::Compound(compound) => Err(EngineError::Unsupported(format!(
                "{compound} values are not scalars; use compound_evidence"
            ))),
        }
    }

    pub fn whitelist(&self, unit: ClueUnit) -> Result<&[i32]> {
        Ok(&self.scalar_evidence(unit)?.whitelist)
    }

    pub fn blacklist(&self, unit: ClueUnit) -> Result<&[i32]> {
        Ok(&self.scalar_evidence(unit)?.blacklist)
    }

    pub fn before(&self, unit: ClueUnit) -> Result<Option<i32>> {
        Ok(self.scalar_evidence(unit)?.before)
    }

    pub fn after(&self, unit: ClueUnit) -> Result<Option<i32>> {
        Ok(self.scalar_evidence(unit)?.after)
    }

    /// Whether any clue (or the injected default year) restricts `unit`.
    pub fn unit_has_restrictions(&self, unit: ClueUnit) -> Result<bool> {
        match unit {
            ClueUnit::Compound(compound) => Ok(self.compound_evidence(compound)?.is_restricted()),
            scalar => Ok(self.scalar_evidence(scalar)?.is_restricted()),
        }
    }
}

impl Extend<Clue> for ClueSet {
    fn extend<I: IntoIterator<Item = Clue>>(&mut self, iter: I) {
        for clue in iter {
            self.add(clue);
        }
    }
}

impl FromIterator<Clue> for ClueSet {
    fn from_iter<I: IntoIterator<Item = Clue>>(iter: I) -> Self {
        let mut set = ClueSet::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a ClueSet {
    type Item = &'a Clue;
    type IntoIter = std::slice::Iter<'a, Clue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
