//! Dataset file loading.
//!
//! A dataset is one JSON document holding the catalog and the evaluation log:
//!
//! ```json
//! {
//!   "categories": [{ "id": 1, "name": "Backend", "abbreviation": "BE" }],
//!   "skills": [{ "id": 10, "name": "Rust", "category_id": 1 }],
//!   "role_profiles": [{ "role": "Engineer", "skills": { "10": "C" } }],
//!   "collaborators": [{ "id": 1, "name": "Ana", "role": "Engineer" }],
//!   "sessions": [{
//!     "id": 1, "collaborator_id": 1, "evaluated_at": "2024-01-10T00:00:00Z",
//!     "assessments": [{ "skill_id": 10, "level": 3, "criticality": "C", "frequency": "D" }]
//!   }]
//! }
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use competency_core::{
    Catalog, Category, Collaborator, CollaboratorId, CollaboratorSnapshot, EvaluationLog,
    EvaluationSession, LogError, RoleProfile, Skill, SnapshotCache,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while loading a dataset file.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid dataset {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Log(#[from] LogError),
}

/// On-disk form of a dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub categories: Vec<Category>,

    #[serde(default)]
    pub skills: Vec<Skill>,

    #[serde(default)]
    pub role_profiles: Vec<RoleProfile>,

    #[serde(default)]
    pub collaborators: Vec<Collaborator>,

    #[serde(default)]
    pub sessions: Vec<EvaluationSession>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let contents = std::fs::read_to_string(path).map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| DatasetError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Build the catalog and the evaluation log, viewed from `now`.
    pub fn into_team(self, now: DateTime<Utc>) -> Result<Team, DatasetError> {
        let mut catalog = Catalog::new();
        for category in self.categories {
            catalog.insert_category(category);
        }
        for skill in self.skills {
            catalog.insert_skill(skill);
        }
        for profile in self.role_profiles {
            catalog.insert_profile(profile);
        }
        for collaborator in self.collaborators {
            catalog.insert_collaborator(collaborator);
        }

        let log = EvaluationLog::from_sessions(self.sessions)?;

        info!(
            skills = catalog.skills().count(),
            collaborators = catalog.collaborators().count(),
            sessions = log.len(),
            "Loaded dataset"
        );

        Ok(Team::new(catalog, log, now))
    }
}

/// A loaded dataset, with a snapshot cache shared by the commands of one run.
#[derive(Debug)]
pub struct Team {
    pub catalog: Catalog,
    pub log: EvaluationLog,
    cache: SnapshotCache,
}

impl Team {
    pub fn new(catalog: Catalog, log: EvaluationLog, now: DateTime<Utc>) -> Self {
        Self {
            catalog,
            log,
            cache: SnapshotCache::default().with_now(now),
        }
    }

    /// Active collaborators, plus anyone in the log missing from the roster.
    pub fn roster(&self) -> Vec<CollaboratorId> {
        let mut roster = self.catalog.roster();
        for collaborator in self.log.collaborators() {
            if self.catalog.collaborator(collaborator).is_none() && !roster.contains(&collaborator)
            {
                roster.push(collaborator);
            }
        }
        roster.sort();
        roster
    }

    /// Find a collaborator by numeric id or by name (case-insensitive).
    pub fn resolve(&self, query: &str) -> Option<CollaboratorId> {
        let query = query.trim();
        if let Ok(raw) = query.parse::<u64>() {
            let id = CollaboratorId(raw);
            let known = self.catalog.collaborator(id).is_some()
                || self.log.collaborators().contains(&id);
            return known.then_some(id);
        }

        self.catalog
            .collaborators()
            .find(|c| c.name.eq_ignore_ascii_case(query))
            .map(|c| c.id)
    }

    /// Display name of a collaborator, falling back to the id.
    pub fn name_of(&self, collaborator: CollaboratorId) -> String {
        self.catalog
            .collaborator(collaborator)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("#{collaborator}"))
    }

    pub fn snapshot(
        &mut self,
        collaborator: CollaboratorId,
        cutoff: DateTime<Utc>,
    ) -> CollaboratorSnapshot {
        self.cache
            .get_or_reconstruct(&self.log, collaborator, cutoff)
            .clone()
    }

    /// Snapshots of the whole roster as of `cutoff`.
    pub fn snapshots(&mut self, cutoff: DateTime<Utc>) -> Vec<CollaboratorSnapshot> {
        let snapshots: Vec<_> = self
            .roster()
            .into_iter()
            .map(|collaborator| self.snapshot(collaborator, cutoff))
            .collect();

        let stats = self.cache.stats();
        debug!(
            %cutoff,
            hits = stats.hits,
            misses = stats.misses,
            "Team snapshots ready"
        );
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "categories": [{ "id": 1, "name": "Backend", "abbreviation": "BE" }],
        "skills": [
            { "id": 10, "name": "Rust", "category_id": 1 },
            { "id": 11, "name": "SQL", "category_id": 1 }
        ],
        "role_profiles": [{ "role": "Engineer", "skills": { "10": "C", "11": "I" } }],
        "collaborators": [
            { "id": 1, "name": "Ana", "role": "Engineer" },
            { "id": 2, "name": "Bruno", "active": false }
        ],
        "sessions": [
            {
                "id": 1, "collaborator_id": 1, "evaluated_at": "2024-01-10T00:00:00Z",
                "assessments": [{ "skill_id": 10, "level": 1, "criticality": "C", "frequency": "D" }]
            },
            {
                "id": 2, "collaborator_id": 1, "evaluated_at": "2024-06-10",
                "assessments": [{ "skill_id": 10, "level": "4", "criticality": "C", "frequency": "D" }]
            },
            {
                "id": 3, "collaborator_id": 7, "evaluated_at": "2024-03-01T00:00:00Z",
                "assessments": [{ "skill_id": 11, "level": 2, "criticality": "I", "frequency": "W" }]
            }
        ]
    }"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap()
    }

    fn sample_team() -> Team {
        Dataset::parse(SAMPLE).unwrap().into_team(now()).unwrap()
    }

    // ==================== Load Tests ====================

    #[test]
    fn test_parse_sample_dataset() {
        let dataset = Dataset::parse(SAMPLE).unwrap();

        assert_eq!(dataset.categories.len(), 1);
        assert_eq!(dataset.skills.len(), 2);
        assert_eq!(dataset.role_profiles.len(), 1);
        assert_eq!(dataset.collaborators.len(), 2);
        assert_eq!(dataset.sessions.len(), 3);
        assert!(dataset.skills[0].active);
        assert!(!dataset.collaborators[1].active);
    }

    #[test]
    fn test_parse_empty_object_uses_defaults() {
        let dataset = Dataset::parse("{}").unwrap();
        assert!(dataset.sessions.is_empty());
        assert!(dataset.collaborators.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("team.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{SAMPLE}").unwrap();

        let dataset = Dataset::load(&path).unwrap();

        assert_eq!(dataset.sessions.len(), 3);
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = Dataset::load(&temp_dir.path().join("missing.json"));
        assert!(matches!(result, Err(DatasetError::Read { .. })));
    }

    #[test]
    fn test_load_malformed_file_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("team.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = Dataset::load(&path);

        assert!(matches!(result, Err(DatasetError::Parse { .. })));
    }

    #[test]
    fn test_duplicate_session_ids_are_rejected() {
        let json = r#"{ "sessions": [
            { "id": 1, "collaborator_id": 1, "evaluated_at": "2024-01-01",
              "assessments": [{ "skill_id": 1, "level": 1 }] },
            { "id": 1, "collaborator_id": 2, "evaluated_at": "2024-01-02",
              "assessments": [{ "skill_id": 1, "level": 2 }] }
        ] }"#;

        let result = Dataset::parse(json).unwrap().into_team(now());

        assert!(matches!(result, Err(DatasetError::Log(LogError::DuplicateSession(_)))));
    }

    #[test]
    fn test_session_without_assessments_does_not_block_the_dataset() {
        let json = r#"{ "sessions": [
            { "id": 1, "collaborator_id": 1, "evaluated_at": "2024-01-01",
              "assessments": [{ "skill_id": 1, "level": 3 }] },
            { "id": 2, "collaborator_id": 2, "evaluated_at": "2024-01-02",
              "assessments": [] }
        ] }"#;

        let mut team = Dataset::parse(json).unwrap().into_team(now()).unwrap();
        let snapshots = team.snapshots(now());

        assert_eq!(team.log.len(), 2);
        assert_eq!(snapshots[0].level(competency_core::SkillId(1)), 3.0);
        assert!(snapshots[1].has_data);
        assert!(snapshots[1].skills.is_empty());
    }

    // ==================== Team Tests ====================

    #[test]
    fn test_roster_includes_unknown_log_collaborators() {
        let team = sample_team();
        // Bruno is inactive; collaborator 7 only appears in the log
        assert_eq!(team.roster(), vec![CollaboratorId(1), CollaboratorId(7)]);
    }

    #[test]
    fn test_resolve_by_id_and_name() {
        let team = sample_team();

        assert_eq!(team.resolve("1"), Some(CollaboratorId(1)));
        assert_eq!(team.resolve("ana"), Some(CollaboratorId(1)));
        assert_eq!(team.resolve("7"), Some(CollaboratorId(7)));
        assert_eq!(team.resolve("99"), None);
        assert_eq!(team.resolve("nobody"), None);
    }

    #[test]
    fn test_name_of_falls_back_to_id() {
        let team = sample_team();
        assert_eq!(team.name_of(CollaboratorId(1)), "Ana");
        assert_eq!(team.name_of(CollaboratorId(7)), "#7");
    }

    #[test]
    fn test_snapshots_use_cutoff() {
        let mut team = sample_team();
        let cutoff = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();

        let snapshots = team.snapshots(cutoff);

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].level(competency_core::SkillId(10)), 1.0);
        assert!(snapshots[1].has_data);
    }

    #[test]
    fn test_far_future_sessions_are_ignored_past_now() {
        let json = r#"{ "sessions": [
            { "id": 1, "collaborator_id": 1, "evaluated_at": "2024-01-01",
              "assessments": [{ "skill_id": 1, "level": 2 }] },
            { "id": 2, "collaborator_id": 1, "evaluated_at": "2099-01-01",
              "assessments": [{ "skill_id": 1, "level": 5 }] }
        ] }"#;
        let mut team = Dataset::parse(json).unwrap().into_team(now()).unwrap();

        let snapshot = team.snapshot(
            CollaboratorId(1),
            Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap(),
        );

        assert_eq!(snapshot.level(competency_core::SkillId(1)), 2.0);
    }

    #[test]
    fn test_repeated_snapshot_is_served_from_cache() {
        let mut team = sample_team();
        let cutoff = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();

        let first = team.snapshot(CollaboratorId(1), cutoff);
        let second = team.snapshot(CollaboratorId(1), cutoff);

        assert_eq!(first, second);
        assert_eq!(first.level(competency_core::SkillId(10)), 4.0);
        assert_eq!(team.cache.stats().hits, 1);
    }
}
