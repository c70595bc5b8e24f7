//! Skill competency tracking.
//!
//! This crate derives skill classifications, team KPIs and historical views
//! from an append-only log of evaluation sessions.
//!
//! # Architecture
//!
//! The log is the only source of truth; everything else is recomputed on
//! demand:
//!
//! - **Log** ([`EvaluationLog`]) holds immutable [`EvaluationSession`]s
//! - **Snapshots** ([`reconstruct`]) fold a collaborator's sessions up to a cutoff
//! - **Classification** ([`classify`]) labels each reconstructed skill
//! - **Aggregation** ([`profile_collaborator`], [`aggregate_team_metrics`])
//!   rolls snapshots up into per-person and team figures
//! - **Evolution** ([`team_evolution`], [`category_changes`]) tracks scores
//!   across a date range and categories across two views
//! - **Periods** ([`generate_periods`], [`match_period`]) turn the log's
//!   timestamps into calendar windows to view the team at
//!
//! Nothing here reads the clock. Callers inject "now".

mod aggregate;
mod assessment;
mod cache;
mod catalog;
mod classify;
mod error;
mod evolution;
mod insights;
mod log;
mod matcher;
mod metrics;
mod period;
mod snapshot;
mod types;

// Assessment types
pub use assessment::{
    Criticality, EvaluationSession, Frequency, Level, SkillAssessment, parse_instant,
};

// Classifier
pub use classify::{ClassificationResult, SkillState, classify, classify_codes, combined_weight};

// Catalogs
pub use catalog::{Catalog, Category, Collaborator, RoleProfile, Skill};

// Log
pub use error::LogError;
pub use log::EvaluationLog;

// Snapshots
pub use cache::{CacheStats, SnapshotCache};
pub use snapshot::{
    CollaboratorSnapshot, SkillSnapshot, reconstruct, reconstruct_team, reconstruct_team_with,
    reconstruct_with,
};

// Periods
pub use matcher::{find_period, match_period};
pub use period::{
    Granularity, PeriodLimits, TimePeriod, generate_periods, generate_periods_with,
    is_valid_instant,
};

// Aggregation
pub use aggregate::{
    CategoryAverage, CollaboratorProfile, MaturityRatio, RiskLevel, SkillInsight,
    profile_collaborator,
};
pub use insights::{
    BusFactorRisk, CategoryGap, LevelDistribution, Severity, Sparkline, Trend, bus_factor_risks,
    level_distribution, prioritize_category_gaps, sparkline,
};
pub use evolution::{
    CategoryChange, CategoryChanges, CategoryDistribution, CollaboratorGrowth, EvolutionRange,
    EvolutionReport, EvolutionWindow, MonthlyAverage, STABLE_WITHIN, Status, SupportCase,
    TOP_CHANGES, TopImprover, category_changes, category_distribution, session_score,
    team_category_averages, team_evolution,
};
pub use metrics::{
    MetricDefinition, MetricDelta, MetricDirection, MetricKind, MetricTrend, MetricUnit,
    TeamMetrics, TeamMetricsReport, aggregate_team_metrics,
};

// ID types
pub use types::{CategoryId, CollaboratorId, RoleId, SessionId, SkillId};

/// Arithmetic mean, `0` for an empty input.
pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// `part / whole` as a percentage, `0` when `whole` is zero.
pub(crate) fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
