//! Subcommands and the state they share.

pub mod classify;
pub mod config;
pub mod evolution;
pub mod metrics;
pub mod period_match;
pub mod periods;
pub mod profile;
pub mod snapshot;

use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use competency_core::{
    CollaboratorId, Granularity, TimePeriod, find_period, generate_periods_with, parse_instant,
};
use serde::Serialize;
use tracing::debug;

use crate::config::{CompetencyConfig, OutputFormat};
use crate::dataset::{Dataset, Team};

/// Settings resolved from flags and configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: CompetencyConfig,
    pub data: PathBuf,
    pub now: DateTime<Utc>,
    pub format: OutputFormat,
}

impl Context {
    pub fn load_team(&self) -> Result<Team> {
        debug!(path = %self.data.display(), "Loading dataset");
        let team = Dataset::load(&self.data)?.into_team(self.now)?;
        Ok(team)
    }

    /// Periods offered for the team's history as of `now`.
    pub fn periods(&self, team: &Team) -> Vec<TimePeriod> {
        generate_periods_with(&team.log, self.now, self.config.periods.limits())
    }

    /// Resolve a collaborator argument, failing with a readable message.
    pub fn collaborator(&self, team: &Team, query: &str) -> Result<CollaboratorId> {
        team.resolve(query)
            .with_context(|| format!("Collaborator '{query}' not found in {}", self.data.display()))
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

/// Point in time to view the team at: an explicit instant, the end of a
/// period, or now.
#[derive(Args, Debug, Clone, Default)]
pub struct CutoffArgs {
    /// View as of this instant (RFC 3339 or YYYY-MM-DD)
    #[arg(long, conflicts_with = "period")]
    pub at: Option<String>,

    /// View as of the end of this period (e.g. Q-2024-1)
    #[arg(long)]
    pub period: Option<String>,
}

impl CutoffArgs {
    pub fn resolve(&self, ctx: &Context, periods: &[TimePeriod]) -> Result<DateTime<Utc>> {
        resolve_cutoff(self.at.as_deref(), self.period.as_deref(), ctx.now, periods)
    }
}

fn resolve_cutoff(
    at: Option<&str>,
    period: Option<&str>,
    now: DateTime<Utc>,
    periods: &[TimePeriod],
) -> Result<DateTime<Utc>> {
    match (at, period) {
        (Some(at), _) => match parse_instant(at) {
            Some(instant) => Ok(instant),
            None => bail!("Invalid instant '{at}'"),
        },
        (None, Some(id)) => match find_period(id, periods) {
            Some(period) => Ok(period.end),
            None => bail!("Unknown period '{id}'. Run `competency periods` to list them"),
        },
        (None, None) => Ok(now),
    }
}

/// Period size, by name or letter code
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GranularityArg {
    #[value(alias = "y")]
    Year,
    #[value(alias = "q")]
    Quarter,
    #[value(alias = "m")]
    Month,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Year => Granularity::Year,
            GranularityArg::Quarter => Granularity::Quarter,
            GranularityArg::Month => Granularity::Month,
        }
    }
}

/// Table with the CLI's preset and cyan headers.
pub fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d %H:%M").to_string()
}

pub fn format_optional_instant(instant: Option<DateTime<Utc>>) -> String {
    instant.map(format_instant).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn periods() -> Vec<TimePeriod> {
        vec![
            TimePeriod::containing(Granularity::Year, now()).unwrap(),
            TimePeriod::containing(Granularity::Quarter, now()).unwrap(),
        ]
    }

    // ==================== Cutoff Tests ====================

    #[test]
    fn test_cutoff_defaults_to_now() {
        let cutoff = resolve_cutoff(None, None, now(), &periods()).unwrap();
        assert_eq!(cutoff, now());
    }

    #[test]
    fn test_cutoff_from_instant() {
        let cutoff = resolve_cutoff(Some("2024-01-31"), None, now(), &periods()).unwrap();
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_cutoff_from_period_is_period_end() {
        let periods = periods();

        let cutoff = resolve_cutoff(None, Some("Q-2024-2"), now(), &periods).unwrap();

        assert_eq!(cutoff, periods[1].end);
        assert!(cutoff < Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_cutoff_rejects_bad_input() {
        assert!(resolve_cutoff(Some("yesterday"), None, now(), &periods()).is_err());
        assert!(resolve_cutoff(None, Some("Q-1999-1"), now(), &periods()).is_err());
    }

    // ==================== Granularity Tests ====================

    #[test]
    fn test_granularity_arg_accepts_letters() {
        let parsed = GranularityArg::from_str("Q", true).unwrap();

        assert_eq!(parsed, GranularityArg::Quarter);
        assert_eq!(Granularity::from(parsed), Granularity::Quarter);
        assert!(GranularityArg::from_str("week", true).is_err());
    }

    // ==================== Formatting Tests ====================

    #[test]
    fn test_format_optional_instant() {
        assert_eq!(format_optional_instant(None), "-");
        assert_eq!(format_optional_instant(Some(now())), "2024-06-15 12:00");
    }
}
