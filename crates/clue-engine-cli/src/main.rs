use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use clue_engine::{
    CalendarSystem, Clue, EngineConfig, EngineError, IntervalInfo, PartialMoment, Ranges, Resolver,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Resolve structured clues about an unknown moment.
///
/// Clues are read as a JSON array such as
/// `[{"kind": "whitelist", "year": 1985}, {"kind": "blacklist", "month": 10}]`.
#[derive(Debug, Parser)]
#[command(name = "clue", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a JSON engine configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// IANA time zone the clues are expressed in (overrides the config file).
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Calendar system (overrides the config file).
    #[arg(long, global = true, value_enum)]
    calendar: Option<CalendarArg>,

    /// Year assumed when no clue mentions the year (overrides the config file).
    #[arg(long, global = true, allow_hyphen_values = true)]
    default_year: Option<i32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the earliest and latest possible moments and every candidate range.
    Resolve {
        /// JSON file with the clues, or `-` for stdin.
        #[arg(default_value = "-")]
        clues: String,

        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Report whether a moment is consistent with the clues.
    Check {
        /// A partial moment (`1985-03`, `2001-09-11T08:46`) or an RFC 3339 instant.
        #[arg(long)]
        at: String,

        /// JSON file with the clues, or `-` for stdin.
        #[arg(default_value = "-")]
        clues: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CalendarArg {
    Gregorian,
    Julian,
}

impl From<CalendarArg> for CalendarSystem {
    fn from(arg: CalendarArg) -> Self {
        match arg {
            CalendarArg::Gregorian => CalendarSystem::Gregorian,
            CalendarArg::Julian => CalendarSystem::Julian,
        }
    }
}

/// What `clue resolve --json` prints.
#[derive(Debug, Serialize)]
struct Report<'a> {
    possible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    earliest: Option<PartialMoment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest: Option<PartialMoment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    earliest_utc: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest_utc: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interval: Option<IntervalInfo>,
    ranges: &'a Ranges,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = load_config(&cli)?;
    tracing::debug!(?config, "loaded configuration");

    match &cli.command {
        Commands::Resolve { clues, json } => {
            let resolver = build_resolver(config, clues)?;
            resolve(&resolver, *json)
        }
        Commands::Check { at, clues } => {
            let resolver = build_resolver(config, clues)?;
            check(&resolver, at)
        }
    }
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    if let Some(timezone) = &cli.timezone {
        config.timezone = timezone.clone();
    }
    if let Some(calendar) = cli.calendar {
        config.calendar = calendar.into();
    }
    if cli.default_year.is_some() {
        config.default_year = cli.default_year;
    }
    Ok(config)
}

fn read_clues(source: &str) -> Result<Vec<Clue>> {
    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read clues from stdin")?;
        buf
    } else {
        std::fs::read_to_string(Path::new(source))
            .with_context(|| format!("failed to read clues from {source}"))?
    };
    serde_json::from_str(&text).context("invalid clues")
}

fn build_resolver(config: EngineConfig, source: &str) -> Result<Resolver> {
    let clues = read_clues(source)?;
    tracing::debug!(count = clues.len(), "read clues");
    let mut resolver = Resolver::new(config).context("invalid configuration")?;
    resolver.add_clues(clues);
    Ok(resolver)
}

fn resolve(resolver: &Resolver, json: bool) -> Result<()> {
    let ranges = resolver.ranges().context("failed to resolve clues")?;
    let report = if ranges.is_empty() {
        Report {
            possible: false,
            earliest: None,
            latest: None,
            earliest_utc: None,
            latest_utc: None,
            interval: None,
            ranges,
        }
    } else {
        Report {
            possible: true,
            earliest: Some(resolver.earliest()?),
            latest: Some(resolver.latest()?),
            earliest_utc: wall_clock(resolver.earliest_utc())?,
            latest_utc: wall_clock(resolver.latest_utc())?,
            interval: Some(resolver.interval()?),
            ranges,
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_report(&report);
    Ok(())
}

/// A bound outside chrono's representable range has no UTC instant; leave it out.
fn wall_clock(result: clue_engine::error::Result<DateTime<Utc>>) -> Result<Option<DateTime<Utc>>> {
    match result {
        Ok(instant) => Ok(Some(instant)),
        Err(EngineError::InvalidDatetime(reason)) => {
            tracing::debug!(%reason, "bound has no UTC instant");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_report(report: &Report<'_>) {
    let (Some(earliest), Some(latest)) = (report.earliest, report.latest) else {
        println!("no possible moments");
        return;
    };
    println!("earliest: {earliest}");
    println!("latest:   {latest}");
    if let Some(interval) = &report.interval {
        println!("span:     {}", interval.human_readable);
    }
    println!("ranges:   {}", report.ranges.len());
    for range in report.ranges {
        println!("  {} .. {}", range.start(), range.end());
    }
}

fn check(resolver: &Resolver, at: &str) -> Result<()> {
    let possible = match DateTime::parse_from_rfc3339(at) {
        Ok(instant) => resolver.is_possible_at(instant.with_timezone(&Utc))?,
        Err(_) => {
            let moment: PartialMoment = at
                .parse()
                .with_context(|| format!("invalid moment '{at}'"))?;
            resolver.is_possible(&moment)?
        }
    };
    println!("{}", if possible { "possible" } else { "impossible" });
    Ok(())
}
