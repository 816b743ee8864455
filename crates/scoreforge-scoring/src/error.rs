//! Error types for constraint networks and sessions.

use scoreforge_core::{DomainError, ExprError, ScoreParseError};
use thiserror::Error;

/// Errors raised while building networks or running sessions.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The stream graph cannot be compiled.
    #[error("invalid constraint stream {stream}: {reason}")]
    Definition { stream: String, reason: String },

    /// A filter, key, collector or weight expression failed on a tuple.
    #[error("evaluating {node} for constraint(s) {constraints} on tuple [{tuple}] failed: {source}")]
    Evaluation {
        constraints: String,
        node: String,
        tuple: String,
        #[source]
        source: ExprError,
    },

    /// Incremental state disagrees with itself. Always a defect.
    #[error("internal consistency fault in {node}: {message}")]
    Internal { node: String, message: String },

    #[error("score corruption: incremental score {incremental} differs from recomputed score {from_scratch}")]
    ScoreCorruption {
        incremental: String,
        from_scratch: String,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{0} fact change(s) are pending; flush before reading the score")]
    PendingEvents(usize),

    #[error("session is unusable after an earlier fatal error")]
    Poisoned,

    #[error("constraint match tracking is disabled for this session")]
    ConstraintMatchDisabled,

    #[error("unknown constraint {0}")]
    UnknownConstraint(String),

    #[error("invalid weight for constraint {constraint}: {source}")]
    InvalidWeight {
        constraint: String,
        #[source]
        source: ScoreParseError,
    },
}

impl EngineError {
    pub(crate) fn internal(node: impl ToString, message: impl Into<String>) -> Self {
        EngineError::Internal {
            node: node.to_string(),
            message: message.into(),
        }
    }

    /// Errors after which a session's incremental state can no longer be
    /// trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::Evaluation { .. }
                | EngineError::Internal { .. }
                | EngineError::ScoreCorruption { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
