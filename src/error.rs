use thiserror::Error;

use crate::domain::CommitId;
use crate::publish::PublishStep;

/// Unified error type for git-semrel operations
#[derive(Error, Debug)]
pub enum SemrelError {
    #[error("Invalid release instruction: {0}")]
    InvalidInstruction(String),

    #[error("No release needed: {0}")]
    NothingToRelease(String),

    #[error("Tag conflict: '{tag}' already points at {existing}, refusing to move it to {target}")]
    TagConflict {
        tag: String,
        existing: CommitId,
        target: CommitId,
    },

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Partial publish: step '{failed_step}' failed after {} completed step(s): {source}", .completed.len())]
    PartialPublish {
        failed_step: PublishStep,
        completed: Vec<PublishStep>,
        #[source]
        source: Box<SemrelError>,
    },

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Version parsing error: {0}")]
    Version(String),

    #[error("Hosted VCS error: {0}")]
    Hvcs(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in git-semrel
pub type Result<T> = std::result::Result<T, SemrelError>;

impl SemrelError {
    /// Create an invalid-instruction error with context
    pub fn invalid_instruction(msg: impl Into<String>) -> Self {
        SemrelError::InvalidInstruction(msg.into())
    }

    /// Create a nothing-to-release signal with context
    pub fn nothing_to_release(msg: impl Into<String>) -> Self {
        SemrelError::NothingToRelease(msg.into())
    }

    /// Create a transport error with context
    pub fn transport(msg: impl Into<String>) -> Self {
        SemrelError::Transport(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        SemrelError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        SemrelError::Version(msg.into())
    }

    /// Create a hosted VCS error with context
    pub fn hvcs(msg: impl Into<String>) -> Self {
        SemrelError::Hvcs(msg.into())
    }

    /// True when some publish step already changed state before the failure.
    ///
    /// A partial failure needs an idempotent re-run rather than a blind restart.
    pub fn is_partial(&self) -> bool {
        matches!(self, SemrelError::PartialPublish { .. })
    }
}
