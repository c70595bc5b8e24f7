//! Team-level insights drawn from a set of snapshots.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assessment::Criticality;
use crate::catalog::Catalog;
use crate::classify::{SkillState, classify};
use crate::log::EvaluationLog;
use crate::snapshot::CollaboratorSnapshot;
use crate::types::{CategoryId, CollaboratorId, SkillId};

// ==================== Level Distribution ====================

/// Average below which a collaborator counts as a beginner.
pub const BEGINNER_BELOW: f64 = 2.5;
/// Average from which a collaborator counts as an expert.
pub const EXPERT_FROM: f64 = 3.5;

/// Collaborators bucketed by average level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDistribution {
    pub beginners: Vec<CollaboratorId>,
    pub competent: Vec<CollaboratorId>,
    pub experts: Vec<CollaboratorId>,
}

/// Bucket collaborators with data by their snapshot average.
#[must_use]
pub fn level_distribution(snapshots: &[CollaboratorSnapshot]) -> LevelDistribution {
    let mut distribution = LevelDistribution::default();
    for snapshot in snapshots.iter().filter(|s| s.has_data) {
        let bucket = if snapshot.average < BEGINNER_BELOW {
            &mut distribution.beginners
        } else if snapshot.average < EXPERT_FROM {
            &mut distribution.competent
        } else {
            &mut distribution.experts
        };
        bucket.push(snapshot.collaborator_id);
    }
    distribution
}

// ==================== Category Gaps ====================

/// How urgent a category's gaps are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// `critical` above 20, `warning` above 10.
    #[must_use]
    pub fn from_impact(impact: f64) -> Self {
        if impact > 20.0 {
            Self::Critical
        } else if impact > 10.0 {
            Self::Warning
        } else {
            Self::Info
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Critical gaps of one category across the team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGap {
    pub category_id: CategoryId,
    pub name: String,
    pub affected: Vec<CollaboratorId>,
    pub gap_count: usize,
    /// Sum of combined weights of the gaps.
    pub impact_score: f64,
    pub severity: Severity,
}

/// Categories with at least one critical gap, highest impact first.
#[must_use]
pub fn prioritize_category_gaps(
    snapshots: &[CollaboratorSnapshot],
    catalog: &Catalog,
) -> Vec<CategoryGap> {
    let mut gaps: Vec<CategoryGap> = catalog
        .categories()
        .filter_map(|category| {
            let mut affected = BTreeSet::new();
            let mut gap_count = 0;
            let mut impact_score = 0.0;

            for snapshot in snapshots.iter().filter(|s| s.has_data) {
                for skill in catalog.skills_in(category.id) {
                    let Some(assessment) = snapshot.skill(skill.id) else {
                        continue;
                    };
                    let result =
                        classify(assessment.level, assessment.frequency, assessment.criticality);
                    if result.state == SkillState::CriticalGap {
                        gap_count += 1;
                        impact_score += result.combined_weight;
                        affected.insert(snapshot.collaborator_id);
                    }
                }
            }

            (gap_count > 0).then(|| CategoryGap {
                category_id: category.id,
                name: category.name.clone(),
                affected: affected.into_iter().collect(),
                gap_count,
                impact_score,
                severity: Severity::from_impact(impact_score),
            })
        })
        .collect();

    gaps.sort_by(|a, b| b.impact_score.total_cmp(&a.impact_score));
    gaps
}

// ==================== Bus Factor ====================

/// A critical skill held at expert level by a single person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusFactorRisk {
    pub skill_id: SkillId,
    pub skill_name: String,
    pub holder: CollaboratorId,
    pub level: f64,
}

/// Skills rated critical where exactly one collaborator is at level 4+.
#[must_use]
pub fn bus_factor_risks(snapshots: &[CollaboratorSnapshot], catalog: &Catalog) -> Vec<BusFactorRisk> {
    catalog
        .skills()
        .filter(|skill| skill.active)
        .filter_map(|skill| {
            let mut holders = snapshots.iter().filter(|s| s.has_data).filter_map(|s| {
                s.skill(skill.id)
                    .filter(|a| a.criticality == Criticality::Critical && a.level.value() >= 4.0)
                    .map(|a| (s.collaborator_id, a.level.value()))
            });

            match (holders.next(), holders.next()) {
                (Some((holder, level)), None) => Some(BusFactorRisk {
                    skill_id: skill.id,
                    skill_name: skill.name.clone(),
                    holder,
                    level,
                }),
                _ => None,
            }
        })
        .collect()
}

// ==================== Sparkline ====================

/// Direction of a collaborator's recent averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

/// Session averages of the latest sessions, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sparkline {
    pub points: Vec<f64>,
    pub trend: Trend,
}

/// Number of sessions in a sparkline.
pub const SPARKLINE_POINTS: usize = 3;

/// Sparkline of the last three sessions up to `cutoff`.
///
/// Points are session averages (evaluated levels only) rounded to one
/// decimal. The trend is up or down when the last point differs from the
/// first by more than 0.1.
#[must_use]
pub fn sparkline(log: &EvaluationLog, collaborator: CollaboratorId, cutoff: DateTime<Utc>) -> Sparkline {
    let sessions: Vec<_> = log
        .sessions_for(collaborator)
        .into_iter()
        .filter(|s| s.evaluated_at.is_some_and(|at| at <= cutoff))
        .collect();

    let points: Vec<f64> = sessions[sessions.len().saturating_sub(SPARKLINE_POINTS)..]
        .iter()
        .map(|s| (s.average_level() * 10.0).round() / 10.0)
        .collect();

    let trend = match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() > 1 && *last > first + 0.1 => Trend::Up,
        (Some(first), Some(last)) if points.len() > 1 && *last < first - 0.1 => Trend::Down,
        _ => Trend::Neutral,
    };

    Sparkline { points, trend }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{EvaluationSession, Frequency, SkillAssessment};
    use crate::catalog::{Category, Skill};
    use crate::snapshot::reconstruct_team;
    use crate::types::SessionId;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn rating(skill: u64, level: f64, c: Criticality, f: Frequency) -> SkillAssessment {
        SkillAssessment::new(SkillId(skill), level, c, f)
    }

    fn session(id: u64, collaborator: u64, when: DateTime<Utc>, ratings: Vec<SkillAssessment>) -> EvaluationSession {
        EvaluationSession::new(SessionId(id), CollaboratorId(collaborator), when, ratings)
    }

    fn catalog() -> Catalog {
        Catalog::new()
            .with_category(Category::new(1, "Backend"))
            .with_category(Category::new(2, "Data"))
            .with_category(Category::new(3, "People"))
            .with_skill(Skill::new(1, "Rust", 1))
            .with_skill(Skill::new(2, "SQL", 2))
            .with_skill(Skill::new(3, "Spark", 2))
            .with_skill(Skill::new(4, "Mentoring", 3))
    }

    fn team(log: &EvaluationLog) -> Vec<CollaboratorSnapshot> {
        reconstruct_team(
            log,
            &[CollaboratorId(1), CollaboratorId(2), CollaboratorId(3), CollaboratorId(4)],
            at(2024, 12, 31),
        )
    }

    // ==================== Distribution Tests ====================

    #[test]
    fn distribution_buckets_by_average() {
        let log = EvaluationLog::from_sessions(vec![
            session(1, 1, at(2024, 1, 1), vec![rating(1, 2.0, Criticality::Important, Frequency::Daily)]),
            session(2, 2, at(2024, 1, 1), vec![rating(1, 2.5, Criticality::Important, Frequency::Daily)]),
            session(3, 3, at(2024, 1, 1), vec![rating(1, 3.5, Criticality::Important, Frequency::Daily)]),
        ])
        .unwrap();

        let distribution = level_distribution(&team(&log));

        assert_eq!(distribution.beginners, vec![CollaboratorId(1)]);
        assert_eq!(distribution.competent, vec![CollaboratorId(2)]);
        assert_eq!(distribution.experts, vec![CollaboratorId(3)]);
    }

    // ==================== Category Gap Tests ====================

    #[test]
    fn category_gaps_are_sorted_by_impact_with_severity() {
        let critical_daily = |skill| rating(skill, 1.0, Criticality::Critical, Frequency::Daily);
        let log = EvaluationLog::from_sessions(vec![
            session(1, 1, at(2024, 1, 1), vec![critical_daily(1), critical_daily(2), critical_daily(3)]),
            session(2, 2, at(2024, 1, 1), vec![critical_daily(2), critical_daily(3)]),
            session(3, 3, at(2024, 1, 1), vec![rating(4, 1.0, Criticality::Critical, Frequency::Monthly)]),
        ])
        .unwrap();

        let gaps = prioritize_category_gaps(&team(&log), &catalog());

        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0].name, "Data");
        assert_eq!(gaps[0].gap_count, 4);
        assert_eq!(gaps[0].impact_score, 36.0);
        assert_eq!(gaps[0].severity, Severity::Critical);
        assert_eq!(gaps[0].affected, vec![CollaboratorId(1), CollaboratorId(2)]);
        assert_eq!(gaps[1].name, "Backend");
        assert_eq!(gaps[1].severity, Severity::Info);
    }

    #[test]
    fn severity_thresholds_are_exclusive() {
        assert_eq!(Severity::from_impact(20.0), Severity::Warning);
        assert_eq!(Severity::from_impact(20.5), Severity::Critical);
        assert_eq!(Severity::from_impact(10.0), Severity::Info);
    }

    // ==================== Bus Factor Tests ====================

    #[test]
    fn single_expert_on_critical_skill_is_a_risk() {
        let log = EvaluationLog::from_sessions(vec![
            session(
                1,
                1,
                at(2024, 1, 1),
                vec![
                    rating(1, 4.5, Criticality::Critical, Frequency::Daily),
                    rating(2, 4.0, Criticality::Critical, Frequency::Daily),
                    rating(4, 5.0, Criticality::Desirable, Frequency::Daily),
                ],
            ),
            session(2, 2, at(2024, 1, 1), vec![rating(2, 4.0, Criticality::Critical, Frequency::Weekly)]),
        ])
        .unwrap();

        let risks = bus_factor_risks(&team(&log), &catalog());

        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].skill_id, SkillId(1));
        assert_eq!(risks[0].holder, CollaboratorId(1));
        assert_eq!(risks[0].level, 4.5);
    }

    // ==================== Sparkline Tests ====================

    #[test]
    fn sparkline_uses_last_three_sessions_oldest_first() {
        let log = EvaluationLog::from_sessions(vec![
            session(1, 1, at(2024, 1, 1), vec![rating(1, 1.0, Criticality::Important, Frequency::Daily)]),
            session(2, 1, at(2024, 2, 1), vec![rating(1, 2.0, Criticality::Important, Frequency::Daily)]),
            session(
                3,
                1,
                at(2024, 3, 1),
                vec![
                    rating(1, 3.0, Criticality::Important, Frequency::Daily),
                    rating(2, 0.0, Criticality::Important, Frequency::Never),
                ],
            ),
            session(4, 1, at(2024, 4, 1), vec![rating(1, 4.0, Criticality::Important, Frequency::Daily)]),
        ])
        .unwrap();

        let line = sparkline(&log, CollaboratorId(1), at(2024, 12, 31));

        assert_eq!(line.points, vec![2.0, 3.0, 4.0]);
        assert_eq!(line.trend, Trend::Up);
    }

    #[test]
    fn sparkline_respects_cutoff_and_small_changes_are_neutral() {
        let log = EvaluationLog::from_sessions(vec![
            session(1, 1, at(2024, 1, 1), vec![rating(1, 3.0, Criticality::Important, Frequency::Daily)]),
            session(2, 1, at(2024, 2, 1), vec![rating(1, 3.0, Criticality::Important, Frequency::Daily)]),
            session(3, 1, at(2024, 3, 1), vec![rating(1, 1.0, Criticality::Important, Frequency::Daily)]),
        ])
        .unwrap();

        let before_drop = sparkline(&log, CollaboratorId(1), at(2024, 2, 15));
        let after_drop = sparkline(&log, CollaboratorId(1), at(2024, 12, 31));

        assert_eq!(before_drop.points, vec![3.0, 3.0]);
        assert_eq!(before_drop.trend, Trend::Neutral);
        assert_eq!(after_drop.trend, Trend::Down);
    }

    #[test]
    fn sparkline_without_sessions_is_empty() {
        let line = sparkline(&EvaluationLog::new(), CollaboratorId(1), at(2024, 1, 1));

        assert!(line.points.is_empty());
        assert_eq!(line.trend, Trend::Neutral);
    }
}
