//! Team KPIs and period-over-period deltas.

use serde::Serialize;

use crate::assessment::Criticality;
use crate::catalog::Catalog;
use crate::classify::{SkillState, classify};
use crate::snapshot::CollaboratorSnapshot;

/// Unit of measurement for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    /// Level on the 0-5 scale
    Level,
    /// Raw count
    Count,
    /// Percentage value (0.0 - 100.0)
    Percentage,
}

/// Which way a metric should move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricDirection {
    HigherIsBetter,
    LowerIsBetter,
}

/// The KPIs a [`TeamMetrics`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    TeamSize,
    TeamAverage,
    CriticalGaps,
    ExpertDensity,
    RoleCoverage,
}

/// Definition of a team metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricDefinition {
    pub kind: MetricKind,
    /// Name of the metric (e.g., "team_average")
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    pub unit: MetricUnit,
    pub direction: MetricDirection,
}

impl MetricDefinition {
    pub const TEAM_SIZE: Self = Self {
        kind: MetricKind::TeamSize,
        name: "team_size",
        description: "Collaborators with at least one evaluation",
        unit: MetricUnit::Count,
        direction: MetricDirection::HigherIsBetter,
    };

    pub const TEAM_AVERAGE: Self = Self {
        kind: MetricKind::TeamAverage,
        name: "team_average",
        description: "Mean of collaborator averages",
        unit: MetricUnit::Level,
        direction: MetricDirection::HigherIsBetter,
    };

    pub const CRITICAL_GAPS: Self = Self {
        kind: MetricKind::CriticalGaps,
        name: "critical_gaps",
        description: "Skills classified as critical gaps",
        unit: MetricUnit::Count,
        direction: MetricDirection::LowerIsBetter,
    };

    pub const EXPERT_DENSITY: Self = Self {
        kind: MetricKind::ExpertDensity,
        name: "expert_density",
        description: "Evaluated skills at level 4 or above",
        unit: MetricUnit::Percentage,
        direction: MetricDirection::HigherIsBetter,
    };

    pub const ROLE_COVERAGE: Self = Self {
        kind: MetricKind::RoleCoverage,
        name: "role_coverage",
        description: "Collaborators meeting every critical skill of their role",
        unit: MetricUnit::Percentage,
        direction: MetricDirection::HigherIsBetter,
    };

    pub const ALL: [Self; 5] = [
        Self::TEAM_SIZE,
        Self::TEAM_AVERAGE,
        Self::CRITICAL_GAPS,
        Self::EXPERT_DENSITY,
        Self::ROLE_COVERAGE,
    ];
}

/// Movement of a metric between two periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricTrend {
    Improved,
    Declined,
    Stable,
}

/// Changes smaller than this are reported as stable.
pub const STABLE_THRESHOLD: f64 = 0.05;

/// Change of one metric against a previous period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricDelta {
    pub metric: MetricDefinition,
    pub current: f64,
    pub previous: f64,
    pub delta: f64,
    /// Relative change in percent, `0` when the previous value was `0`.
    pub percent_change: f64,
    pub trend: MetricTrend,
}

impl MetricDelta {
    #[must_use]
    pub fn new(metric: MetricDefinition, current: f64, previous: f64) -> Self {
        let delta = current - previous;
        let percent_change = if previous == 0.0 {
            0.0
        } else {
            delta / previous * 100.0
        };

        let trend = if delta.abs() < STABLE_THRESHOLD {
            MetricTrend::Stable
        } else if (delta > 0.0) == (metric.direction == MetricDirection::HigherIsBetter) {
            MetricTrend::Improved
        } else {
            MetricTrend::Declined
        };

        Self {
            metric,
            current,
            previous,
            delta,
            percent_change,
            trend,
        }
    }
}

/// KPIs of a team at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TeamMetrics {
    pub team_size: usize,
    pub team_average: f64,
    pub critical_gaps: usize,
    pub expert_density: f64,
    pub role_coverage: f64,
}

impl TeamMetrics {
    /// Compute KPIs over the collaborators that have data.
    #[must_use]
    pub fn compute(snapshots: &[CollaboratorSnapshot], catalog: &Catalog) -> Self {
        let active: Vec<&CollaboratorSnapshot> = snapshots.iter().filter(|s| s.has_data).collect();

        let team_average = crate::mean(active.iter().map(|s| s.average));

        let critical_gaps = active
            .iter()
            .flat_map(|s| s.assessments())
            .filter(|a| {
                classify(a.level, a.frequency, a.criticality).state == SkillState::CriticalGap
            })
            .count();

        let (evaluated, experts) = active
            .iter()
            .flat_map(|s| s.assessments())
            .filter(|a| a.level.is_evaluated())
            .fold((0, 0), |(evaluated, experts), a| {
                (evaluated + 1, experts + usize::from(a.level.value() >= 4.0))
            });

        let covered = active
            .iter()
            .filter(|s| meets_role_requirements(s, catalog))
            .count();

        Self {
            team_size: active.len(),
            team_average,
            critical_gaps,
            expert_density: crate::percent(experts, evaluated),
            role_coverage: crate::percent(covered, active.len()),
        }
    }

    /// Value of one of the metrics in [`MetricDefinition::ALL`].
    #[must_use]
    pub fn value(&self, metric: &MetricDefinition) -> f64 {
        match metric.kind {
            MetricKind::TeamSize => self.team_size as f64,
            MetricKind::TeamAverage => self.team_average,
            MetricKind::CriticalGaps => self.critical_gaps as f64,
            MetricKind::ExpertDensity => self.expert_density,
            MetricKind::RoleCoverage => self.role_coverage,
        }
    }

    /// Delta of every metric against `previous`.
    #[must_use]
    pub fn compare(&self, previous: &TeamMetrics) -> Vec<MetricDelta> {
        MetricDefinition::ALL
            .iter()
            .map(|metric| MetricDelta::new(*metric, self.value(metric), previous.value(metric)))
            .collect()
    }
}

/// The role profile requires at least one critical skill and every one of
/// them is at level 3 or above.
fn meets_role_requirements(snapshot: &CollaboratorSnapshot, catalog: &Catalog) -> bool {
    let Some(profile) = catalog.profile_for(snapshot.collaborator_id) else {
        return false;
    };

    let mut required = profile.required(Criticality::Critical).peekable();
    required.peek().is_some() && required.all(|skill| snapshot.level(skill) >= 3.0)
}

/// Team KPIs, with deltas when a previous period was given.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamMetricsReport {
    pub current: TeamMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<TeamMetrics>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deltas: Vec<MetricDelta>,
}

/// Compute team KPIs for `current`, and deltas against `previous` if given.
#[must_use]
pub fn aggregate_team_metrics(
    current: &[CollaboratorSnapshot],
    previous: Option<&[CollaboratorSnapshot]>,
    catalog: &Catalog,
) -> TeamMetricsReport {
    let current = TeamMetrics::compute(current, catalog);
    let previous = previous.map(|snapshots| TeamMetrics::compute(snapshots, catalog));
    let deltas = previous
        .as_ref()
        .map(|previous| current.compare(previous))
        .unwrap_or_default();

    TeamMetricsReport {
        current,
        previous,
        deltas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{EvaluationSession, Frequency, SkillAssessment};
    use crate::catalog::{Collaborator, RoleProfile};
    use crate::log::EvaluationLog;
    use crate::snapshot::reconstruct_team;
    use crate::types::{CollaboratorId, SessionId, SkillId};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn rating(skill: u64, level: f64, c: Criticality, f: Frequency) -> SkillAssessment {
        SkillAssessment::new(SkillId(skill), level, c, f)
    }

    fn catalog() -> Catalog {
        Catalog::new()
            .with_profile(
                RoleProfile::new("backend")
                    .with_skill(1, Criticality::Critical)
                    .with_skill(2, Criticality::Critical)
                    .with_skill(3, Criticality::Important),
            )
            .with_profile(RoleProfile::new("intern").with_skill(3, Criticality::Desirable))
            .with_collaborator(Collaborator::new(1, "Ana").with_role("backend"))
            .with_collaborator(Collaborator::new(2, "Luis").with_role("backend"))
            .with_collaborator(Collaborator::new(3, "Eva").with_role("intern"))
            .with_collaborator(Collaborator::new(4, "Sin datos").with_role("backend"))
    }

    fn log() -> EvaluationLog {
        EvaluationLog::from_sessions(vec![
            EvaluationSession::new(
                SessionId(1),
                CollaboratorId(1),
                at(2024, 1, 10),
                vec![
                    rating(1, 4.0, Criticality::Critical, Frequency::Daily),
                    rating(2, 3.0, Criticality::Critical, Frequency::Daily),
                ],
            ),
            EvaluationSession::new(
                SessionId(2),
                CollaboratorId(2),
                at(2024, 1, 10),
                vec![
                    rating(1, 2.0, Criticality::Critical, Frequency::Daily),
                    rating(2, 0.0, Criticality::Critical, Frequency::Never),
                ],
            ),
            EvaluationSession::new(
                SessionId(3),
                CollaboratorId(3),
                at(2024, 1, 10),
                vec![rating(3, 5.0, Criticality::Desirable, Frequency::Weekly)],
            ),
            EvaluationSession::new(
                SessionId(4),
                CollaboratorId(2),
                at(2024, 6, 10),
                vec![rating(1, 3.0, Criticality::Critical, Frequency::Daily)],
            ),
        ])
        .unwrap()
    }

    fn team(cutoff: DateTime<Utc>) -> Vec<CollaboratorSnapshot> {
        reconstruct_team(&log(), &catalog().roster(), cutoff)
    }

    // ==================== Compute Tests ====================

    #[test]
    fn compute_over_collaborators_with_data() {
        let metrics = TeamMetrics::compute(&team(at(2024, 3, 1)), &catalog());

        assert_eq!(metrics.team_size, 3);
        // Averages: 3.5, 1.0, 5.0
        assert!((metrics.team_average - 9.5 / 3.0).abs() < 1e-9);
        assert_eq!(metrics.critical_gaps, 1);
        // Evaluated instances: 4, 3, 2, 5 → two at 4+
        assert_eq!(metrics.expert_density, 50.0);
        // Only Ana meets both critical skills; Eva's role requires none.
        assert!((metrics.role_coverage - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn compute_on_empty_input_is_zero_not_nan() {
        let metrics = TeamMetrics::compute(&[], &catalog());

        assert_eq!(metrics, TeamMetrics::default());
        assert!(!metrics.team_average.is_nan());
    }

    #[test]
    fn role_coverage_needs_a_profile_with_critical_skills() {
        let catalog = Catalog::new().with_collaborator(Collaborator::new(1, "Ana"));
        let log = EvaluationLog::from_sessions(vec![EvaluationSession::new(
            SessionId(1),
            CollaboratorId(1),
            at(2024, 1, 1),
            vec![rating(1, 5.0, Criticality::Critical, Frequency::Daily)],
        )])
        .unwrap();

        let snapshots = reconstruct_team(&log, &[CollaboratorId(1)], at(2024, 2, 1));

        assert_eq!(TeamMetrics::compute(&snapshots, &catalog).role_coverage, 0.0);
    }

    #[test]
    fn every_definition_reads_its_own_field() {
        let metrics = TeamMetrics {
            team_size: 4,
            team_average: 3.25,
            critical_gaps: 2,
            expert_density: 40.0,
            role_coverage: 75.0,
        };

        let values: Vec<f64> = MetricDefinition::ALL.iter().map(|m| metrics.value(m)).collect();

        assert_eq!(values, vec![4.0, 3.25, 2.0, 40.0, 75.0]);
        let kinds: std::collections::HashSet<_> =
            MetricDefinition::ALL.iter().map(|m| m.kind).collect();
        assert_eq!(kinds.len(), MetricDefinition::ALL.len());
    }

    // ==================== Delta Tests ====================

    #[test]
    fn fewer_critical_gaps_is_an_improvement() {
        let delta = MetricDelta::new(MetricDefinition::CRITICAL_GAPS, 2.0, 5.0);

        assert_eq!(delta.delta, -3.0);
        assert_eq!(delta.percent_change, -60.0);
        assert_eq!(delta.trend, MetricTrend::Improved);
    }

    #[test]
    fn lower_average_is_a_decline() {
        let delta = MetricDelta::new(MetricDefinition::TEAM_AVERAGE, 3.0, 3.5);
        assert_eq!(delta.trend, MetricTrend::Declined);
    }

    #[test]
    fn small_changes_are_stable() {
        let delta = MetricDelta::new(MetricDefinition::TEAM_AVERAGE, 3.04, 3.0);
        assert_eq!(delta.trend, MetricTrend::Stable);
    }

    #[test]
    fn percent_change_from_zero_is_zero() {
        let delta = MetricDelta::new(MetricDefinition::EXPERT_DENSITY, 40.0, 0.0);

        assert_eq!(delta.percent_change, 0.0);
        assert_eq!(delta.trend, MetricTrend::Improved);
    }

    // ==================== Report Tests ====================

    #[test]
    fn report_without_previous_has_no_deltas() {
        let report = aggregate_team_metrics(&team(at(2024, 3, 1)), None, &catalog());

        assert!(report.previous.is_none());
        assert!(report.deltas.is_empty());
    }

    #[test]
    fn report_with_previous_has_a_delta_per_metric() {
        let current = team(at(2024, 12, 31));
        let previous = team(at(2024, 3, 1));

        let report = aggregate_team_metrics(&current, Some(previous.as_slice()), &catalog());

        assert_eq!(report.deltas.len(), MetricDefinition::ALL.len());
        let gaps = report
            .deltas
            .iter()
            .find(|d| d.metric == MetricDefinition::CRITICAL_GAPS)
            .unwrap();
        assert_eq!(gaps.previous, 1.0);
        assert_eq!(gaps.current, 0.0);
        assert_eq!(gaps.trend, MetricTrend::Improved);
    }
}
