//! Reference data: skills, categories, role profiles and the roster.
//!
//! The catalog is owned by the caller and handed to the aggregations by
//! reference. It never changes the event log; it only says what a skill is,
//! where it belongs and how much it matters for a given role.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assessment::Criticality;
use crate::types::{CategoryId, CollaboratorId, RoleId, SkillId};

fn active_by_default() -> bool {
    true
}

/// A skill category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
}

impl Category {
    #[must_use]
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            abbreviation: None,
        }
    }

    #[must_use]
    pub fn with_abbreviation(mut self, abbreviation: impl Into<String>) -> Self {
        self.abbreviation = Some(abbreviation.into());
        self
    }

    /// Abbreviation when present, otherwise the full name.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.abbreviation.as_deref().unwrap_or(&self.name)
    }
}

/// A skill in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    pub category_id: CategoryId,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

impl Skill {
    #[must_use]
    pub fn new(
        id: impl Into<SkillId>,
        name: impl Into<String>,
        category_id: impl Into<CategoryId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category_id: category_id.into(),
            active: true,
        }
    }
}

/// Expected criticality of each skill for one role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleProfile {
    pub role: RoleId,
    #[serde(default)]
    pub skills: BTreeMap<SkillId, Criticality>,
}

impl RoleProfile {
    #[must_use]
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: RoleId::new(role),
            skills: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_skill(mut self, skill: impl Into<SkillId>, criticality: Criticality) -> Self {
        self.skills.insert(skill.into(), criticality);
        self
    }

    /// Criticality of `skill` for this role. Skills the profile does not list
    /// are not applicable.
    #[must_use]
    pub fn criticality_for(&self, skill: SkillId) -> Criticality {
        self.skills
            .get(&skill)
            .copied()
            .unwrap_or(Criticality::NotApplicable)
    }

    /// Skills this role requires at exactly `tier`.
    pub fn required(&self, tier: Criticality) -> impl Iterator<Item = SkillId> + '_ {
        self.skills
            .iter()
            .filter(move |(_, criticality)| **criticality == tier)
            .map(|(skill, _)| *skill)
    }
}

/// A member of the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub id: CollaboratorId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleId>,
    #[serde(default = "active_by_default")]
    pub active: bool,
    /// When they joined the team, if known.
    #[serde(
        default,
        deserialize_with = "crate::assessment::deserialize_instant",
        skip_serializing_if = "Option::is_none"
    )]
    pub joined_at: Option<DateTime<Utc>>,
}

impl Collaborator {
    #[must_use]
    pub fn new(id: impl Into<CollaboratorId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: None,
            active: true,
            joined_at: None,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(RoleId::new(role));
        self
    }

    #[must_use]
    pub fn joined(mut self, at: DateTime<Utc>) -> Self {
        self.joined_at = Some(at);
        self
    }
}

/// Skills, categories, role profiles and collaborators.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    categories: BTreeMap<CategoryId, Category>,
    skills: BTreeMap<SkillId, Skill>,
    profiles: BTreeMap<RoleId, RoleProfile>,
    collaborators: BTreeMap<CollaboratorId, Collaborator>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Builders ====================

    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.insert_category(category);
        self
    }

    #[must_use]
    pub fn with_skill(mut self, skill: Skill) -> Self {
        self.insert_skill(skill);
        self
    }

    #[must_use]
    pub fn with_profile(mut self, profile: RoleProfile) -> Self {
        self.insert_profile(profile);
        self
    }

    #[must_use]
    pub fn with_collaborator(mut self, collaborator: Collaborator) -> Self {
        self.insert_collaborator(collaborator);
        self
    }

    pub fn insert_category(&mut self, category: Category) {
        self.categories.insert(category.id, category);
    }

    pub fn insert_skill(&mut self, skill: Skill) {
        self.skills.insert(skill.id, skill);
    }

    pub fn insert_profile(&mut self, profile: RoleProfile) {
        self.profiles.insert(profile.role.clone(), profile);
    }

    pub fn insert_collaborator(&mut self, collaborator: Collaborator) {
        self.collaborators.insert(collaborator.id, collaborator);
    }

    // ==================== Lookups ====================

    #[must_use]
    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.get(&id)
    }

    #[must_use]
    pub fn skill(&self, id: SkillId) -> Option<&Skill> {
        self.skills.get(&id)
    }

    #[must_use]
    pub fn collaborator(&self, id: CollaboratorId) -> Option<&Collaborator> {
        self.collaborators.get(&id)
    }

    #[must_use]
    pub fn profile(&self, role: &RoleId) -> Option<&RoleProfile> {
        self.profiles.get(role)
    }

    /// Role profile of a collaborator, if they have a role and it is profiled.
    #[must_use]
    pub fn profile_for(&self, collaborator: CollaboratorId) -> Option<&RoleProfile> {
        self.collaborator(collaborator)
            .and_then(|c| c.role.as_ref())
            .and_then(|role| self.profile(role))
    }

    /// Criticality of `skill` for the collaborator's role.
    ///
    /// Without a role profile every skill counts as `Important`; with one,
    /// skills it does not list are `NotApplicable`.
    #[must_use]
    pub fn role_criticality(&self, collaborator: CollaboratorId, skill: SkillId) -> Criticality {
        match self.profile_for(collaborator) {
            Some(profile) => profile.criticality_for(skill),
            None => Criticality::Important,
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn skills(&self) -> impl Iterator<Item = &Skill> {
        self.skills.values()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &RoleProfile> {
        self.profiles.values()
    }

    pub fn collaborators(&self) -> impl Iterator<Item = &Collaborator> {
        self.collaborators.values()
    }

    /// Active skills of one category.
    pub fn skills_in(&self, category: CategoryId) -> impl Iterator<Item = &Skill> {
        self.skills
            .values()
            .filter(move |skill| skill.active && skill.category_id == category)
    }

    /// Ids of active collaborators, ascending.
    #[must_use]
    pub fn roster(&self) -> Vec<CollaboratorId> {
        self.collaborators
            .values()
            .filter(|c| c.active)
            .map(|c| c.id)
            .collect()
    }
}
