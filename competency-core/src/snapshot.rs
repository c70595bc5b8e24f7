//! Point-in-time reconstruction of a collaborator's skills.
//!
//! A snapshot is a pure fold over the collaborator's sessions with a valid
//! timestamp at or before the cutoff, in `(evaluated_at, id)` order, keeping
//! the last assessment seen for each skill. The live view is simply the
//! snapshot at "now".
//!
//! Cost is O(sessions × assessments) per collaborator; there is no
//! incremental index.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::assessment::{EvaluationSession, SkillAssessment};
use crate::log::EvaluationLog;
use crate::period::is_valid_instant;
use crate::types::{CollaboratorId, SessionId, SkillId};

/// The assessment that currently defines one skill, with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillSnapshot {
    pub assessment: SkillAssessment,
    pub evaluated_at: DateTime<Utc>,
    pub session_id: SessionId,
}

/// State of one collaborator as of an instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorSnapshot {
    pub collaborator_id: CollaboratorId,
    pub as_of: DateTime<Utc>,
    pub skills: BTreeMap<SkillId, SkillSnapshot>,
    /// Unweighted mean of all reconstructed levels.
    pub average: f64,
    pub last_evaluated: Option<DateTime<Utc>>,
    pub has_data: bool,
    pub sessions_applied: usize,
}

impl CollaboratorSnapshot {
    /// Snapshot of a collaborator with nothing recorded up to `as_of`.
    #[must_use]
    pub fn empty(collaborator_id: CollaboratorId, as_of: DateTime<Utc>) -> Self {
        Self {
            collaborator_id,
            as_of,
            skills: BTreeMap::new(),
            average: 0.0,
            last_evaluated: None,
            has_data: false,
            sessions_applied: 0,
        }
    }

    #[must_use]
    pub fn skill(&self, skill: SkillId) -> Option<&SkillAssessment> {
        self.skills.get(&skill).map(|s| &s.assessment)
    }

    /// Reconstructed level of `skill`, `0` when never assessed.
    #[must_use]
    pub fn level(&self, skill: SkillId) -> f64 {
        self.skill(skill).map_or(0.0, |a| a.level.value())
    }

    pub fn assessments(&self) -> impl Iterator<Item = &SkillAssessment> {
        self.skills.values().map(|s| &s.assessment)
    }
}

/// Reconstruct `collaborator` as of `cutoff` from any sequence of sessions.
///
/// Sessions of other collaborators, sessions without a timestamp and
/// sessions after the cutoff are ignored. Input order does not matter.
#[must_use]
pub fn reconstruct<'a, I>(
    collaborator: CollaboratorId,
    sessions: I,
    cutoff: DateTime<Utc>,
) -> CollaboratorSnapshot
where
    I: IntoIterator<Item = &'a EvaluationSession>,
{
    // Anything at or before the cutoff is valid relative to it.
    reconstruct_with(collaborator, sessions, cutoff, cutoff)
}

/// Like [`reconstruct`], also dropping timestamps that are not valid relative
/// to `now` (see [`is_valid_instant`]). Use this when the cutoff may lie past
/// the present.
#[must_use]
pub fn reconstruct_with<'a, I>(
    collaborator: CollaboratorId,
    sessions: I,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> CollaboratorSnapshot
where
    I: IntoIterator<Item = &'a EvaluationSession>,
{
    let mut applicable: Vec<(DateTime<Utc>, &EvaluationSession)> = sessions
        .into_iter()
        .filter(|s| s.collaborator_id == collaborator)
        .filter_map(|s| match s.evaluated_at {
            Some(at) if is_valid_instant(at, now) => Some((at, s)),
            Some(at) => {
                trace!(session = %s.id, instant = %at, "Skipping far-future session");
                None
            }
            None => {
                trace!(session = %s.id, "Skipping session without a valid timestamp");
                None
            }
        })
        .filter(|(at, _)| *at <= cutoff)
        .collect();

    if applicable.is_empty() {
        debug!(%collaborator, %cutoff, "No sessions up to cutoff");
        return CollaboratorSnapshot::empty(collaborator, cutoff);
    }

    applicable.sort_by_key(|(at, s)| (*at, s.id));

    let skills = applicable
        .iter()
        .fold(BTreeMap::new(), |mut skills, (at, session)| {
            for assessment in &session.assessments {
                skills.insert(
                    assessment.skill_id,
                    SkillSnapshot {
                        assessment: *assessment,
                        evaluated_at: *at,
                        session_id: session.id,
                    },
                );
            }
            skills
        });

    let average = crate::mean(skills.values().map(|s| s.assessment.level.value()));
    let last_evaluated = applicable.last().map(|(at, _)| *at);

    debug!(
        %collaborator,
        %cutoff,
        sessions = applicable.len(),
        skills = skills.len(),
        "Reconstructed snapshot"
    );

    CollaboratorSnapshot {
        collaborator_id: collaborator,
        as_of: cutoff,
        skills,
        average,
        last_evaluated,
        has_data: true,
        sessions_applied: applicable.len(),
    }
}

/// Reconstruct every collaborator of `roster` as of `cutoff`, in roster order.
#[must_use]
pub fn reconstruct_team(
    log: &EvaluationLog,
    roster: &[CollaboratorId],
    cutoff: DateTime<Utc>,
) -> Vec<CollaboratorSnapshot> {
    reconstruct_team_with(log, roster, cutoff, cutoff)
}

/// [`reconstruct_team`] with timestamp validity judged against `now`.
#[must_use]
pub fn reconstruct_team_with(
    log: &EvaluationLog,
    roster: &[CollaboratorId],
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<CollaboratorSnapshot> {
    roster
        .iter()
        .map(|collaborator| reconstruct_with(*collaborator, log, cutoff, now))
        .collect()
}
