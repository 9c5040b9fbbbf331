//! Error taxonomy for pipeline orchestration.
//!
//! Gate failures carry their full diagnostic reports so callers always learn
//! which stage, which item, and which field failed; nothing is collapsed
//! into a generic failure.

use crate::checklist::EvaluationReport;
use crate::core::Stage;
use crate::schema::ValidationReport;
use thiserror::Error;

/// The main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The requested stage is not the immediate successor of the current
    /// one. User error; never retried.
    #[error("illegal transition: '{to}' does not follow '{from}'")]
    IllegalTransition {
        /// The project's current stage.
        from: Stage,
        /// The requested target stage.
        to: Stage,
    },

    /// A blocking entry-checklist item failed before execution.
    #[error("precondition failed for '{stage}': {report}")]
    PreconditionFailed {
        /// The stage being entered.
        stage: Stage,
        /// Full evaluation report, including passing items.
        report: EvaluationReport,
    },

    /// A blocking exit-checklist item failed against the candidate artifact.
    #[error("postcondition failed for '{stage}': {report}")]
    PostconditionFailed {
        /// The stage that executed.
        stage: Stage,
        /// Full evaluation report, including passing items.
        report: EvaluationReport,
    },

    /// The external stage executor returned an error or timed out.
    #[error("stage '{stage}' execution failed: {message}")]
    StageExecutionFailed {
        /// The stage whose executor failed.
        stage: Stage,
        /// Rendered cause chain from the executor.
        message: String,
    },

    /// The executor's output failed structural schema validation. Indicates
    /// executor/schema drift; never coerced.
    #[error("invalid artifact for '{stage}': {report}")]
    InvalidArtifact {
        /// The producing stage.
        stage: Stage,
        /// Itemized missing-field and type-error report.
        report: ValidationReport,
    },

    /// The persisted state document failed schema-version validation or
    /// could not be parsed. Requires manual intervention.
    #[error("pipeline state is corrupt: {0}")]
    CorruptState(String),

    /// No state document exists; the caller must initialize first.
    #[error("no pipeline state found; initialize the project first")]
    NotFound,

    /// Initialization was requested but state already exists.
    #[error("pipeline state already exists for this project")]
    AlreadyInitialized,

    /// Another transition holds the project's critical section.
    #[error("another transition is already in progress for this project")]
    TransitionInProgress,

    /// The in-flight transition was cancelled; no commit occurred.
    #[error("transition to '{stage}' was cancelled: {reason}")]
    Cancelled {
        /// The stage being entered when cancellation arrived.
        stage: Stage,
        /// Cancellation reason from the token.
        reason: String,
    },

    /// Rollback was requested to a stage that is not in the completed
    /// history.
    #[error("cannot roll back to '{stage}': not a completed stage")]
    RollbackTarget {
        /// The requested rollback target.
        stage: Stage,
    },

    /// A normal commit attempted to shrink or rewrite completed history.
    #[error("commit would rewrite completed-stage history; use rollback instead")]
    NonMonotonicCommit,

    /// Filesystem error from the state store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// State document (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// True when the caller may retry after fixing the root cause; gate and
    /// executor failures qualify, order violations and corruption do not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PreconditionFailed { .. }
                | Self::PostconditionFailed { .. }
                | Self::StageExecutionFailed { .. }
                | Self::TransitionInProgress
                | Self::Cancelled { .. }
        )
    }

    /// The stage a gate or execution failure is attached to, if any.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::IllegalTransition { to, .. } => Some(*to),
            Self::PreconditionFailed { stage, .. }
            | Self::PostconditionFailed { stage, .. }
            | Self::StageExecutionFailed { stage, .. }
            | Self::InvalidArtifact { stage, .. }
            | Self::Cancelled { stage, .. }
            | Self::RollbackTarget { stage } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illegal_transition_display() {
        let err = PipelineError::IllegalTransition {
            from: Stage::Scan,
            to: Stage::Annotate,
        };
        assert_eq!(
            err.to_string(),
            "illegal transition: 'annotate' does not follow 'scan'"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(PipelineError::TransitionInProgress.is_retryable());
        assert!(PipelineError::StageExecutionFailed {
            stage: Stage::TrainExec,
            message: "oom".to_string(),
        }
        .is_retryable());
        assert!(!PipelineError::NotFound.is_retryable());
        assert!(!PipelineError::IllegalTransition {
            from: Stage::Init,
            to: Stage::Deploy,
        }
        .is_retryable());
        assert!(!PipelineError::CorruptState("bad version".to_string()).is_retryable());
    }

    #[test]
    fn test_stage_accessor() {
        let err = PipelineError::Cancelled {
            stage: Stage::TrainExec,
            reason: "operator abort".to_string(),
        };
        assert_eq!(err.stage(), Some(Stage::TrainExec));
        assert_eq!(PipelineError::NotFound.stage(), None);
    }
}
