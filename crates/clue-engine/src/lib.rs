//! # clue-engine
//!
//! Resolve structured clues about an unknown moment into the exact set of
//! moments they leave possible.
//!
//! "The year was 1985", "not in October", "after March 12th", "a Tuesday":
//! each clue constrains one calendar unit. The engine aggregates the clues
//! per unit, turns each unit's evidence into its allowed values, and narrows
//! an accumulator of moment-to-moment ranges unit by unit, from the year down
//! to the second. Month lengths follow the year and the calendar system, and
//! weekdays are derived from concrete dates.
//!
//! ## Modules
//!
//! - [`moment`] — Units, calendar systems, and partially known moments
//! - [`clue`] — Clues and the per-unit evidence a clue set derives
//! - [`range`] — Closed ranges and the range algebra (merge, fillet, coalesce)
//! - [`filter`] — Per-unit option filters (numeric, day, weekday, compound)
//! - [`resolver`] — Runs the filter passes and answers queries
//! - [`interval`] — Span between the earliest and latest possible moments
//! - [`config`] — Calendar system, time zone, default year, unit bounds
//! - [`error`] — Error types

pub mod clue;
pub mod config;
pub mod error;
pub mod filter;
pub mod interval;
pub mod moment;
pub mod range;
pub mod resolver;

pub use clue::{Clue, ClueSet, ClueUnit, CompoundUnit, Evidence, FilterKind};
pub use config::{BoundsTable, EngineConfig, MaxBound, UnitBounds};
pub use error::EngineError;
pub use filter::{filter_for, FilterContext, OptionFilter};
pub use interval::{compute_interval, IntervalInfo};
pub use moment::{CalendarSystem, MomentContext, PartialMoment, Unit};
pub use range::{Range, Ranges};
pub use resolver::Resolver;
