//! Team evolution over a date range, and category changes between two views.
//!
//! The evolution report scores every session in a window by its role-relevant
//! average, then derives per-collaborator growth, a month-by-month team series
//! and the follow-up lists built on them. Category changes and distributions
//! compare or break down already reconstructed snapshots.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::CategoryAverage;
use crate::assessment::{Criticality, EvaluationSession};
use crate::catalog::Catalog;
use crate::classify::classify;
use crate::insights::{BEGINNER_BELOW, EXPERT_FROM, Trend};
use crate::log::EvaluationLog;
use crate::period::{Granularity, TimePeriod};
use crate::snapshot::CollaboratorSnapshot;
use crate::types::{CategoryId, CollaboratorId, RoleId, SkillId};

/// Growth and velocity closer to zero than this count as stable.
pub const STABLE_WITHIN: f64 = 0.1;

/// Number of improvements and regressions reported by default.
pub const TOP_CHANGES: usize = 3;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn trend_of(delta: f64) -> Trend {
    if delta > STABLE_WITHIN {
        Trend::Up
    } else if delta < -STABLE_WITHIN {
        Trend::Down
    } else {
        Trend::Neutral
    }
}

// ==================== Windows ====================

/// Preset look-back for the evolution report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvolutionRange {
    #[serde(rename = "6m")]
    SixMonths,
    #[default]
    #[serde(rename = "12m")]
    TwelveMonths,
    #[serde(rename = "24m")]
    TwentyFourMonths,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "all")]
    All,
}

impl EvolutionRange {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SixMonths => "6m",
            Self::TwelveMonths => "12m",
            Self::TwentyFourMonths => "24m",
            Self::YearToDate => "ytd",
            Self::All => "all",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "6m" => Some(Self::SixMonths),
            "12m" => Some(Self::TwelveMonths),
            "24m" => Some(Self::TwentyFourMonths),
            "ytd" => Some(Self::YearToDate),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    /// First instant covered when looking back from `now`.
    ///
    /// `All` reaches back to 2000-01-01.
    #[must_use]
    pub fn start(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let months_back = |months| now.checked_sub_months(Months::new(months));
        match self {
            Self::SixMonths => months_back(6),
            Self::TwelveMonths => months_back(12),
            Self::TwentyFourMonths => months_back(24),
            Self::YearToDate => midnight(NaiveDate::from_ymd_opt(now.year(), 1, 1)?),
            Self::All => midnight(NaiveDate::from_ymd_opt(2000, 1, 1)?),
        }
    }
}

impl fmt::Display for EvolutionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// Inclusive date range an evolution report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl EvolutionWindow {
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window from `range`'s start through `now`.
    #[must_use]
    pub fn for_range(range: EvolutionRange, now: DateTime<Utc>) -> Option<Self> {
        Some(Self::new(range.start(now)?, now))
    }

    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// Calendar months touched by the window, oldest first.
    fn months(&self) -> Vec<TimePeriod> {
        let mut months = Vec::new();
        let mut current = TimePeriod::containing(Granularity::Month, self.start);
        while let Some(month) = current {
            if month.start > self.end {
                break;
            }
            current = TimePeriod::containing(Granularity::Month, month.end + Duration::nanoseconds(1));
            months.push(month);
        }
        months
    }
}

// ==================== Scores ====================

/// Standing of a score on the 0-5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Attention,
    Competent,
    Strength,
}

impl Status {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= EXPERT_FROM {
            Self::Strength
        } else if score >= BEGINNER_BELOW {
            Self::Competent
        } else {
            Self::Attention
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attention => "attention",
            Self::Competent => "competent",
            Self::Strength => "strength",
        }
    }
}

/// Role-relevant average of one session, rounded to one decimal.
///
/// Only evaluated levels count. Skills the catalog marks inactive are left
/// out, and so are skills the collaborator's role profile does not list.
/// `None` when nothing is left.
#[must_use]
pub fn session_score(session: &EvaluationSession, catalog: &Catalog) -> Option<f64> {
    let profile = catalog.profile_for(session.collaborator_id);
    let levels: Vec<f64> = session
        .assessments
        .iter()
        .filter(|a| a.level.is_evaluated())
        .filter(|a| catalog.skill(a.skill_id).is_none_or(|s| s.active))
        .filter(|a| profile.is_none_or(|p| p.criticality_for(a.skill_id) != Criticality::NotApplicable))
        .map(|a| a.level.value())
        .collect();

    (!levels.is_empty()).then(|| round1(crate::mean(levels)))
}

// ==================== Report ====================

/// Start and current score of one collaborator over the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorGrowth {
    pub collaborator_id: CollaboratorId,
    pub name: String,
    pub role: Option<RoleId>,
    pub start_score: f64,
    pub current_score: f64,
    /// `current_score - start_score`, rounded to one decimal.
    pub growth: f64,
    pub trend: Trend,
    /// Joined on or after the window start.
    pub is_new_hire: bool,
    /// Fewer than two scored sessions, for someone who is not a new hire.
    pub insufficient_data: bool,
    pub joined_at: Option<DateTime<Utc>>,
    pub last_evaluated: DateTime<Utc>,
    /// Every session score in the window, oldest first.
    pub sparkline: Vec<f64>,
    pub status: Status,
}

impl CollaboratorGrowth {
    #[must_use]
    pub fn evaluations(&self) -> usize {
        self.sparkline.len()
    }
}

/// Team average of one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAverage {
    /// `M-2024-01`.
    pub period_id: String,
    pub label: String,
    pub average: f64,
    /// Distinct collaborators scored this month, `0` for carried-over months.
    pub collaborators: usize,
    /// Names of active collaborators who joined this month.
    pub new_hires: Vec<String>,
    /// No sessions this month; the previous month's average is repeated.
    pub carried_over: bool,
}

/// The collaborator who grew the most, excluding new hires and thin data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopImprover {
    pub collaborator_id: CollaboratorId,
    pub name: String,
    pub growth: f64,
}

/// A collaborator below competent on critical skills of their role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportCase {
    pub collaborator_id: CollaboratorId,
    pub name: String,
    pub role: Option<RoleId>,
    /// Critical skills under the competent threshold in the latest session.
    pub critical_gaps: Vec<SkillId>,
    pub current_score: f64,
}

/// Evolution of the team over one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionReport {
    pub window: EvolutionWindow,
    /// Latest point of the monthly series.
    pub maturity_index: Option<f64>,
    /// Last monthly average minus the first; `None` below two months.
    pub velocity: Option<f64>,
    pub velocity_trend: Trend,
    /// Sorted by growth, largest first.
    pub collaborators: Vec<CollaboratorGrowth>,
    pub monthly: Vec<MonthlyAverage>,
    pub top_improver: Option<TopImprover>,
    /// Sorted by number of critical gaps, largest first.
    pub support: Vec<SupportCase>,
}

struct Scored<'a> {
    session: &'a EvaluationSession,
    at: DateTime<Utc>,
    score: f64,
}

/// Build the evolution report for `window`.
///
/// Sessions outside the window or without a timestamp are ignored. Only
/// active collaborators appear in the growth list; collaborators the catalog
/// does not know count as active.
#[must_use]
pub fn team_evolution(log: &EvaluationLog, catalog: &Catalog, window: &EvolutionWindow) -> EvolutionReport {
    let mut in_window: Vec<(&EvaluationSession, DateTime<Utc>)> = log
        .iter()
        .filter_map(|s| s.evaluated_at.map(|at| (s, at)))
        .filter(|(_, at)| window.contains(*at))
        .collect();
    in_window.sort_by_key(|(s, _)| s.order_key());

    let scored: Vec<Scored<'_>> = in_window
        .iter()
        .filter_map(|&(session, at)| {
            session_score(session, catalog).map(|score| Scored { session, at, score })
        })
        .collect();

    let mut by_collaborator: BTreeMap<CollaboratorId, Vec<&Scored<'_>>> = BTreeMap::new();
    for entry in &scored {
        by_collaborator
            .entry(entry.session.collaborator_id)
            .or_default()
            .push(entry);
    }

    let is_active =
        |id: CollaboratorId| catalog.collaborator(id).is_none_or(|c| c.active);

    let mut collaborators: Vec<CollaboratorGrowth> = by_collaborator
        .into_iter()
        .filter(|(id, _)| is_active(*id))
        .filter_map(|(id, entries)| growth_of(id, &entries, catalog, window))
        .collect();
    collaborators.sort_by(|a, b| b.growth.total_cmp(&a.growth));

    let monthly = monthly_series(&scored, catalog, window);
    let maturity_index = monthly.last().map(|m| m.average);
    let velocity = match (monthly.first(), monthly.last()) {
        (Some(first), Some(last)) if monthly.len() > 1 => Some(round1(last.average - first.average)),
        _ => None,
    };

    let top_improver = collaborators
        .iter()
        .find(|c| !c.is_new_hire && !c.insufficient_data && c.growth > 0.0)
        .map(|c| TopImprover {
            collaborator_id: c.collaborator_id,
            name: c.name.clone(),
            growth: c.growth,
        });

    let support = support_cases(&collaborators, &in_window, catalog);

    debug!(
        start = %window.start,
        end = %window.end,
        sessions = scored.len(),
        collaborators = collaborators.len(),
        months = monthly.len(),
        "Built evolution report"
    );

    EvolutionReport {
        window: *window,
        maturity_index,
        velocity,
        velocity_trend: velocity.map_or(Trend::Neutral, trend_of),
        collaborators,
        monthly,
        top_improver,
        support,
    }
}

fn growth_of(
    id: CollaboratorId,
    entries: &[&Scored<'_>],
    catalog: &Catalog,
    window: &EvolutionWindow,
) -> Option<CollaboratorGrowth> {
    let first = entries.first()?;
    let last = entries.last()?;
    let entry = catalog.collaborator(id);
    let joined_at = entry.and_then(|c| c.joined_at);
    let is_new_hire = joined_at.is_some_and(|at| at >= window.start);
    let growth = round1(last.score - first.score);

    Some(CollaboratorGrowth {
        collaborator_id: id,
        name: entry.map_or_else(|| format!("Collaborator {id}"), |c| c.name.clone()),
        role: entry.and_then(|c| c.role.clone()),
        start_score: first.score,
        current_score: last.score,
        growth,
        trend: trend_of(growth),
        is_new_hire,
        insufficient_data: entries.len() < 2 && !is_new_hire,
        joined_at,
        last_evaluated: last.at,
        sparkline: entries.iter().map(|e| e.score).collect(),
        status: Status::from_score(last.score),
    })
}

fn monthly_series(scored: &[Scored<'_>], catalog: &Catalog, window: &EvolutionWindow) -> Vec<MonthlyAverage> {
    let mut new_hires: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for collaborator in catalog.collaborators().filter(|c| c.active) {
        if let Some(joined) = collaborator.joined_at
            && window.contains(joined)
            && let Some(month) = TimePeriod::containing(Granularity::Month, joined)
        {
            new_hires.entry(month.id).or_default().push(collaborator.name.clone());
        }
    }

    let mut series = Vec::new();
    let mut last_average: Option<f64> = None;

    for month in window.months() {
        let in_month: Vec<&Scored<'_>> = scored.iter().filter(|s| month.contains(s.at)).collect();
        let hires = new_hires.remove(&month.id).unwrap_or_default();

        if in_month.is_empty() {
            // Nothing to carry before the first month with data.
            let Some(average) = last_average else {
                continue;
            };
            series.push(MonthlyAverage {
                period_id: month.id,
                label: month.label,
                average,
                collaborators: 0,
                new_hires: hires,
                carried_over: true,
            });
            continue;
        }

        let average = round1(crate::mean(in_month.iter().map(|s| s.score)));
        let distinct: BTreeSet<CollaboratorId> =
            in_month.iter().map(|s| s.session.collaborator_id).collect();
        last_average = Some(average);
        series.push(MonthlyAverage {
            period_id: month.id,
            label: month.label,
            average,
            collaborators: distinct.len(),
            new_hires: hires,
            carried_over: false,
        });
    }

    series
}

fn support_cases(
    collaborators: &[CollaboratorGrowth],
    in_window: &[(&EvaluationSession, DateTime<Utc>)],
    catalog: &Catalog,
) -> Vec<SupportCase> {
    let mut cases: Vec<SupportCase> = collaborators
        .iter()
        .filter_map(|growth| {
            let profile = catalog.profile_for(growth.collaborator_id)?;
            let (latest, _) = in_window
                .iter()
                .rev()
                .find(|(s, _)| s.collaborator_id == growth.collaborator_id)?;

            let critical_gaps: Vec<SkillId> = profile
                .required(Criticality::Critical)
                .filter(|skill| {
                    let level = latest
                        .assessments
                        .iter()
                        .find(|a| a.skill_id == *skill)
                        .map_or(0.0, |a| a.level.value());
                    level < BEGINNER_BELOW
                })
                .collect();

            (!critical_gaps.is_empty()).then(|| SupportCase {
                collaborator_id: growth.collaborator_id,
                name: growth.name.clone(),
                role: growth.role.clone(),
                critical_gaps,
                current_score: growth.current_score,
            })
        })
        .collect();
    cases.sort_by(|a, b| b.critical_gaps.len().cmp(&a.critical_gaps.len()));
    cases
}

// ==================== Category Changes ====================

/// Team-wide average of each category across `snapshots`.
///
/// Only evaluated levels of active skills that are relevant to each
/// collaborator's role count.
#[must_use]
pub fn team_category_averages(snapshots: &[CollaboratorSnapshot], catalog: &Catalog) -> Vec<CategoryAverage> {
    catalog
        .categories()
        .map(|category| {
            let levels: Vec<f64> = snapshots
                .iter()
                .flat_map(|snapshot| {
                    snapshot.assessments().filter(move |a| {
                        a.level.is_evaluated()
                            && catalog
                                .skill(a.skill_id)
                                .is_some_and(|s| s.active && s.category_id == category.id)
                            && catalog.role_criticality(snapshot.collaborator_id, a.skill_id)
                                != Criticality::NotApplicable
                    })
                })
                .map(|a| a.level.value())
                .collect();
            CategoryAverage {
                category_id: category.id,
                name: category.name.clone(),
                evaluated: levels.len(),
                average: crate::mean(levels),
            }
        })
        .collect()
}

/// Movement of one category's average between two views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryChange {
    pub category_id: CategoryId,
    pub name: String,
    pub previous: f64,
    pub current: f64,
    pub delta: f64,
}

/// The categories that moved the most, each way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryChanges {
    /// Largest rise first.
    pub improvements: Vec<CategoryChange>,
    /// Largest drop first.
    pub regressions: Vec<CategoryChange>,
}

/// Top `limit` improvements and regressions between two sets of averages.
///
/// Categories without evaluated levels on either side are skipped, as are
/// unchanged ones.
#[must_use]
pub fn category_changes(current: &[CategoryAverage], previous: &[CategoryAverage], limit: usize) -> CategoryChanges {
    let changes: Vec<CategoryChange> = current
        .iter()
        .filter(|c| c.evaluated > 0)
        .filter_map(|c| {
            let before = previous
                .iter()
                .find(|p| p.category_id == c.category_id && p.evaluated > 0)?;
            Some(CategoryChange {
                category_id: c.category_id,
                name: c.name.clone(),
                previous: before.average,
                current: c.average,
                delta: c.average - before.average,
            })
        })
        .collect();

    let mut improvements: Vec<CategoryChange> = changes.iter().filter(|c| c.delta > 0.0).cloned().collect();
    improvements.sort_by(|a, b| b.delta.total_cmp(&a.delta));
    improvements.truncate(limit);

    let mut regressions: Vec<CategoryChange> = changes.into_iter().filter(|c| c.delta < 0.0).collect();
    regressions.sort_by(|a, b| a.delta.total_cmp(&b.delta));
    regressions.truncate(limit);

    CategoryChanges {
        improvements,
        regressions,
    }
}

// ==================== Category Distribution ====================

/// How the team's evaluated skills in one category classify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDistribution {
    pub category_id: CategoryId,
    pub short_name: String,
    pub name: String,
    /// Critical gaps and improvement areas.
    pub gaps: usize,
    pub competent: usize,
    /// Strengths and key strengths.
    pub experts: usize,
    pub total: usize,
}

/// Classify every evaluated skill of every snapshot, bucketed by category.
///
/// Every category is listed, including those with nothing evaluated.
#[must_use]
pub fn category_distribution(snapshots: &[CollaboratorSnapshot], catalog: &Catalog) -> Vec<CategoryDistribution> {
    catalog
        .categories()
        .map(|category| {
            let mut row = CategoryDistribution {
                category_id: category.id,
                short_name: category.short_name().to_string(),
                name: category.name.clone(),
                gaps: 0,
                competent: 0,
                experts: 0,
                total: 0,
            };

            let evaluated = snapshots.iter().flat_map(|s| s.assessments()).filter(|a| {
                a.level.is_evaluated()
                    && catalog
                        .skill(a.skill_id)
                        .is_some_and(|s| s.category_id == category.id)
            });
            for assessment in evaluated {
                let state = classify(assessment.level, assessment.frequency, assessment.criticality).state;
                row.total += 1;
                if state.is_gap() {
                    row.gaps += 1;
                } else if state.is_strength() {
                    row.experts += 1;
                } else {
                    row.competent += 1;
                }
            }
            row
        })
        .collect()
}
