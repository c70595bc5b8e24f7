//! Calendar periods to view the team at.
//!
//! Periods are generated from the timestamps in the log and an injected
//! "now"; they are never stored. Every period is calendar-aligned and both of
//! its bounds are inclusive (`end` is one nanosecond before the next period
//! starts), so periods of one granularity never overlap.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::assessment::EvaluationSession;

/// Size of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Year,
    Quarter,
    Month,
}

impl Granularity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Quarter => "quarter",
            Self::Month => "month",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "year" | "y" => Some(Self::Year),
            "quarter" | "q" => Some(Self::Quarter),
            "month" | "m" => Some(Self::Month),
            _ => None,
        }
    }

    fn months(self) -> u32 {
        match self {
            Self::Year => 12,
            Self::Quarter => 3,
            Self::Month => 1,
        }
    }

    /// First day of the period of this size containing `date`.
    fn align(self, date: NaiveDate) -> Option<NaiveDate> {
        let month = match self {
            Self::Year => 1,
            Self::Quarter => date.month0() / 3 * 3 + 1,
            Self::Month => date.month(),
        };
        NaiveDate::from_ymd_opt(date.year(), month, 1)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A calendar year, quarter or month with inclusive bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriod {
    /// `Y-2024`, `Q-2024-1` or `M-2024-01`.
    pub id: String,
    /// `2024`, `Q1 2024` or `January 2024`.
    pub label: String,
    pub granularity: Granularity,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimePeriod {
    /// The period of `granularity` containing `instant`.
    #[must_use]
    pub fn containing(granularity: Granularity, instant: DateTime<Utc>) -> Option<Self> {
        let start = granularity.align(instant.date_naive())?;
        Self::starting(granularity, start)
    }

    fn starting(granularity: Granularity, start: NaiveDate) -> Option<Self> {
        let next = start.checked_add_months(Months::new(granularity.months()))?;
        let year = start.year();

        let (id, label) = match granularity {
            Granularity::Year => (format!("Y-{year}"), year.to_string()),
            Granularity::Quarter => {
                let quarter = start.month0() / 3 + 1;
                (format!("Q-{year}-{quarter}"), format!("Q{quarter} {year}"))
            }
            Granularity::Month => (
                format!("M-{}", start.format("%Y-%m")),
                start.format("%B %Y").to_string(),
            ),
        };

        Some(Self {
            id,
            label,
            granularity,
            start: start.and_hms_opt(0, 0, 0)?.and_utc(),
            end: next.and_hms_opt(0, 0, 0)?.and_utc() - Duration::nanoseconds(1),
        })
    }

    /// Returns true if `instant` falls within this period (bounds inclusive).
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// Returns true if `other` lies entirely within this period.
    #[must_use]
    pub fn contains_period(&self, other: &TimePeriod) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// How far back quarter and month periods reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodLimits {
    pub quarters_back: usize,
    pub months_back: usize,
}

impl Default for PeriodLimits {
    fn default() -> Self {
        Self {
            quarters_back: 8,
            months_back: 18,
        }
    }
}

/// Whether a timestamp is usable for period generation: not later than the
/// year after `now`.
#[must_use]
pub fn is_valid_instant(instant: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    instant.year() <= now.year() + 1
}

/// Generate periods with the default look-back limits.
#[must_use]
pub fn generate_periods<'a, I>(sessions: I, now: DateTime<Utc>) -> Vec<TimePeriod>
where
    I: IntoIterator<Item = &'a EvaluationSession>,
{
    generate_periods_with(sessions, now, PeriodLimits::default())
}

/// Generate years, then quarters, then months, each newest first.
///
/// Years run from the earliest valid timestamp's year through `now`'s year.
/// Quarters and months step back from `now` until one starts at or before the
/// earliest timestamp or the limit is reached; at least one of each is
/// produced. No valid timestamps means no periods.
#[must_use]
pub fn generate_periods_with<'a, I>(
    sessions: I,
    now: DateTime<Utc>,
    limits: PeriodLimits,
) -> Vec<TimePeriod>
where
    I: IntoIterator<Item = &'a EvaluationSession>,
{
    let earliest = sessions
        .into_iter()
        .filter_map(|s| s.evaluated_at)
        .filter(|at| {
            let valid = is_valid_instant(*at, now);
            if !valid {
                trace!(instant = %at, "Ignoring far-future timestamp");
            }
            valid
        })
        .min();

    let Some(earliest) = earliest else {
        return Vec::new();
    };

    let mut periods: Vec<TimePeriod> = (earliest.year()..=now.year())
        .rev()
        .filter_map(|year| NaiveDate::from_ymd_opt(year, 1, 1))
        .filter_map(|start| TimePeriod::starting(Granularity::Year, start))
        .collect();

    walk_back(Granularity::Quarter, now, earliest, limits.quarters_back, &mut periods);
    walk_back(Granularity::Month, now, earliest, limits.months_back, &mut periods);

    debug!(count = periods.len(), %earliest, %now, "Generated periods");
    periods
}

fn walk_back(
    granularity: Granularity,
    now: DateTime<Utc>,
    earliest: DateTime<Utc>,
    limit: usize,
    out: &mut Vec<TimePeriod>,
) {
    let mut start = granularity.align(now.date_naive());

    for _ in 0..limit.max(1) {
        let Some(period) = start.and_then(|s| TimePeriod::starting(granularity, s)) else {
            break;
        };
        let reached_earliest = period.start <= earliest;
        out.push(period);
        if reached_earliest {
            break;
        }
        start = start.and_then(|s| s.checked_sub_months(Months::new(granularity.months())));
    }
}
