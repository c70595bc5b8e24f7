//! Per-collaborator roll-up of a snapshot.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assessment::{Criticality, Frequency};
use crate::catalog::Catalog;
use crate::classify::{ClassificationResult, SkillState, classify};
use crate::snapshot::CollaboratorSnapshot;
use crate::types::{CategoryId, CollaboratorId, RoleId, SkillId};

/// One classified skill of a collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillInsight {
    pub skill_id: SkillId,
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub level: f64,
    pub criticality: Criticality,
    pub frequency: Frequency,
    pub classification: ClassificationResult,
}

impl SkillInsight {
    #[must_use]
    pub fn state(&self) -> SkillState {
        self.classification.state
    }
}

/// Average level of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAverage {
    pub category_id: CategoryId,
    pub name: String,
    pub average: f64,
    /// Number of relevant skills with level > 0 that went into the average.
    pub evaluated: usize,
}

/// Share of required skills at level 3 or above.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaturityRatio {
    pub required: usize,
    pub met: usize,
    pub percent: f64,
}

impl MaturityRatio {
    fn new(required: usize, met: usize) -> Self {
        Self {
            required,
            met,
            percent: crate::percent(met, required),
        }
    }
}

/// Overall risk of a collaborator, from their gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    LowModerate,
    Moderate,
    Critical,
}

impl RiskLevel {
    /// Any critical gap is critical; more than two improvement areas is
    /// moderate; one or two is low-moderate.
    #[must_use]
    pub fn from_gaps(critical_gaps: usize, improvement_areas: usize) -> Self {
        if critical_gaps > 0 {
            Self::Critical
        } else if improvement_areas > 2 {
            Self::Moderate
        } else if improvement_areas > 0 {
            Self::LowModerate
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::LowModerate => "low_moderate",
            Self::Moderate => "moderate",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "Low",
            Self::LowModerate => "Low-Moderate",
            Self::Moderate => "Moderate",
            Self::Critical => "Critical",
        })
    }
}

/// Everything derived for one collaborator from one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorProfile {
    pub collaborator_id: CollaboratorId,
    pub name: String,
    pub role: Option<RoleId>,
    pub as_of: DateTime<Utc>,
    pub has_data: bool,
    pub last_evaluated: Option<DateTime<Utc>>,
    /// Mean level over relevant, evaluated skills.
    pub overall_average: f64,
    pub category_averages: Vec<CategoryAverage>,
    /// Every reconstructed skill, by skill id.
    pub skills: Vec<SkillInsight>,
    /// Critical gaps and improvement areas, heaviest first.
    pub gaps: Vec<SkillInsight>,
    /// Strengths and key strengths, highest level first.
    pub strengths: Vec<SkillInsight>,
    /// Underutilized talent, highest level first.
    pub underutilized: Vec<SkillInsight>,
    pub critical_maturity: MaturityRatio,
    pub important_maturity: MaturityRatio,
    pub risk: RiskLevel,
}

impl CollaboratorProfile {
    #[must_use]
    pub fn count(&self, state: SkillState) -> usize {
        self.skills.iter().filter(|s| s.state() == state).count()
    }
}

/// Roll a snapshot up into averages, classified lists, maturity and risk.
///
/// Classification uses each assessment's own criticality and frequency.
/// Averages and maturity use the collaborator's role profile: skills that are
/// not applicable to the role are left out of the averages.
#[must_use]
pub fn profile_collaborator(snapshot: &CollaboratorSnapshot, catalog: &Catalog) -> CollaboratorProfile {
    let collaborator = snapshot.collaborator_id;
    let relevant = |skill: SkillId| {
        catalog.role_criticality(collaborator, skill) != Criticality::NotApplicable
    };

    let skills: Vec<SkillInsight> = snapshot
        .assessments()
        .map(|assessment| {
            let catalog_skill = catalog.skill(assessment.skill_id);
            SkillInsight {
                skill_id: assessment.skill_id,
                name: catalog_skill
                    .map_or_else(|| format!("Skill {}", assessment.skill_id), |s| s.name.clone()),
                category_id: catalog_skill.map(|s| s.category_id),
                level: assessment.level.value(),
                criticality: assessment.criticality,
                frequency: assessment.frequency,
                classification: classify(
                    assessment.level,
                    assessment.frequency,
                    assessment.criticality,
                ),
            }
        })
        .collect();

    let counted = |insight: &&SkillInsight| insight.level > 0.0 && relevant(insight.skill_id);

    let category_averages = catalog
        .categories()
        .map(|category| {
            let levels: Vec<f64> = skills
                .iter()
                .filter(|s| s.category_id == Some(category.id))
                .filter(counted)
                .map(|s| s.level)
                .collect();
            CategoryAverage {
                category_id: category.id,
                name: category.name.clone(),
                evaluated: levels.len(),
                average: crate::mean(levels),
            }
        })
        .collect();

    let overall_average = crate::mean(skills.iter().filter(counted).map(|s| s.level));

    let mut gaps: Vec<SkillInsight> = skills.iter().filter(|s| s.state().is_gap()).cloned().collect();
    gaps.sort_by(|a, b| {
        b.classification
            .combined_weight
            .total_cmp(&a.classification.combined_weight)
    });

    let by_level_desc = |a: &SkillInsight, b: &SkillInsight| b.level.total_cmp(&a.level);
    let mut strengths: Vec<SkillInsight> = skills
        .iter()
        .filter(|s| s.state().is_strength())
        .cloned()
        .collect();
    strengths.sort_by(by_level_desc);
    let mut underutilized: Vec<SkillInsight> = skills
        .iter()
        .filter(|s| s.state() == SkillState::UnderutilizedTalent)
        .cloned()
        .collect();
    underutilized.sort_by(by_level_desc);

    let critical_gaps = gaps.iter().filter(|s| s.state() == SkillState::CriticalGap).count();
    let risk = RiskLevel::from_gaps(critical_gaps, gaps.len() - critical_gaps);

    let collaborator_entry = catalog.collaborator(collaborator);

    CollaboratorProfile {
        collaborator_id: collaborator,
        name: collaborator_entry
            .map_or_else(|| format!("Collaborator {collaborator}"), |c| c.name.clone()),
        role: collaborator_entry.and_then(|c| c.role.clone()),
        as_of: snapshot.as_of,
        has_data: snapshot.has_data,
        last_evaluated: snapshot.last_evaluated,
        overall_average,
        category_averages,
        critical_maturity: maturity(snapshot, catalog, Criticality::Critical),
        important_maturity: maturity(snapshot, catalog, Criticality::Important),
        skills,
        gaps,
        strengths,
        underutilized,
        risk,
    }
}

/// Maturity of one criticality tier of the collaborator's role.
fn maturity(snapshot: &CollaboratorSnapshot, catalog: &Catalog, tier: Criticality) -> MaturityRatio {
    let collaborator = snapshot.collaborator_id;

    let mut universe: BTreeSet<SkillId> =
        catalog.skills().filter(|s| s.active).map(|s| s.id).collect();
    if let Some(profile) = catalog.profile_for(collaborator) {
        universe.extend(profile.skills.keys().copied());
    }

    let required: Vec<SkillId> = universe
        .into_iter()
        .filter(|skill| catalog.role_criticality(collaborator, *skill) == tier)
        .collect();
    let met = required
        .iter()
        .filter(|skill| snapshot.level(**skill) >= 3.0)
        .count();

    MaturityRatio::new(required.len(), met)
}
