//! Append-only evaluation log.
//!
//! The log is the write side of the model: sessions go in, nothing is ever
//! edited or removed, and every derived view is rebuilt from it.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::assessment::EvaluationSession;
use crate::error::LogError;
use crate::types::{CollaboratorId, SessionId};

/// Position of a session in the log.
pub type Offset = usize;

/// In-memory, append-only sequence of evaluation sessions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationLog {
    sessions: Vec<EvaluationSession>,
    ids: HashSet<SessionId>,
}

impl EvaluationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from sessions, rejecting the whole set on the first error.
    pub fn from_sessions(
        sessions: impl IntoIterator<Item = EvaluationSession>,
    ) -> Result<Self, LogError> {
        let mut log = Self::new();
        log.append_batch(sessions.into_iter().collect())?;
        Ok(log)
    }

    /// Append one session and return its offset.
    pub fn append(&mut self, session: EvaluationSession) -> Result<Offset, LogError> {
        self.check(&session)?;

        debug!(
            session = %session.id,
            collaborator = %session.collaborator_id,
            assessments = session.assessments.len(),
            "Appended evaluation session"
        );

        self.ids.insert(session.id);
        self.sessions.push(session);
        Ok(self.sessions.len() - 1)
    }

    /// Append several sessions at once. Either all are appended or none are.
    ///
    /// Returns the offset of the last appended session, or `None` for an
    /// empty batch.
    pub fn append_batch(
        &mut self,
        sessions: Vec<EvaluationSession>,
    ) -> Result<Option<Offset>, LogError> {
        let mut batch_ids = HashSet::with_capacity(sessions.len());
        for session in &sessions {
            self.check(session)?;
            if !batch_ids.insert(session.id) {
                return Err(LogError::DuplicateSession(session.id));
            }
        }

        if sessions.is_empty() {
            return Ok(None);
        }

        debug!(count = sessions.len(), "Appended session batch");
        self.ids.extend(batch_ids);
        self.sessions.extend(sessions);
        Ok(Some(self.sessions.len() - 1))
    }

    fn check(&self, session: &EvaluationSession) -> Result<(), LogError> {
        if self.ids.contains(&session.id) {
            return Err(LogError::DuplicateSession(session.id));
        }
        Ok(())
    }

    /// Sessions of one collaborator in canonical `(evaluated_at, id)` order.
    ///
    /// Sessions without a valid timestamp sort first.
    #[must_use]
    pub fn sessions_for(&self, collaborator: CollaboratorId) -> Vec<&EvaluationSession> {
        let mut sessions: Vec<_> = self
            .sessions
            .iter()
            .filter(|s| s.collaborator_id == collaborator)
            .collect();
        sessions.sort_by_key(|s| s.order_key());
        sessions
    }

    /// Collaborators with at least one session, ascending.
    #[must_use]
    pub fn collaborators(&self) -> Vec<CollaboratorId> {
        self.sessions
            .iter()
            .map(|s| s.collaborator_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sessions in append order.
    pub fn iter(&self) -> impl Iterator<Item = &EvaluationSession> {
        self.sessions.iter()
    }

    #[must_use]
    pub fn get(&self, offset: Offset) -> Option<&EvaluationSession> {
        self.sessions.get(offset)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<'a> IntoIterator for &'a EvaluationLog {
    type Item = &'a EvaluationSession;
    type IntoIter = std::slice::Iter<'a, EvaluationSession>;

    fn into_iter(self) -> Self::IntoIter {
        self.sessions.iter()
    }
}
