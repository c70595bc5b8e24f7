//! Error types for the evaluation log.

use thiserror::Error;

use crate::types::SessionId;

/// Errors returned when appending to an [`EvaluationLog`](crate::EvaluationLog).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    #[error("session {0} is already in the log")]
    DuplicateSession(SessionId),
}
