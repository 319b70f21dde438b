//! Error types for the cycle engine
//!
//! A small closed set of kinds so callers can branch on `kind()` instead of
//! matching message text.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("pipeline stage failed: {stage} - {reason}")]
    PipelineStageFailed { stage: String, reason: String },

    #[error("resolution declined: {strategy} on {conflict} - {reason}")]
    ResolutionDeclined {
        conflict: String,
        strategy: String,
        reason: String,
    },

    #[error("paradox cascade unrecoverable: {active} active conflicts exceed capacity {capacity}")]
    CascadeUnrecoverable { active: usize, capacity: usize },

    #[error("collaborator unavailable: {collaborator} after {attempts} attempts - {reason}")]
    CollaboratorUnavailable {
        collaborator: String,
        attempts: u32,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Discriminant of [`Error`], cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PipelineStageFailed,
    ResolutionDeclined,
    CascadeUnrecoverable,
    CollaboratorUnavailable,
}

impl Error {
    pub fn stage_failed(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PipelineStageFailed {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    pub fn declined(
        conflict: impl Into<String>,
        strategy: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ResolutionDeclined {
            conflict: conflict.into(),
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }

    pub fn unavailable(collaborator: impl Into<String>, attempts: u32, reason: impl Into<String>) -> Self {
        Self::CollaboratorUnavailable {
            collaborator: collaborator.into(),
            attempts,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PipelineStageFailed { .. } => ErrorKind::PipelineStageFailed,
            Self::ResolutionDeclined { .. } => ErrorKind::ResolutionDeclined,
            Self::CascadeUnrecoverable { .. } => ErrorKind::CascadeUnrecoverable,
            Self::CollaboratorUnavailable { .. } => ErrorKind::CollaboratorUnavailable,
        }
    }

    /// Whether the cycle loop must stop when this error reaches it.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::CascadeUnrecoverable | ErrorKind::CollaboratorUnavailable
        )
    }
}
