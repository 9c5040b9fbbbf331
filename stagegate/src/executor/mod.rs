//! Stage executor boundary.
//!
//! Executors are the opaque external collaborators that do a stage's actual
//! work (scanning, training, deployment). The core trusts nothing about
//! their output: raw results pass through schema validation and exit
//! checklists before anything is committed.

use crate::cancellation::CancelToken;
use crate::core::{HandoffArtifact, PipelineState, Stage};
use async_trait::async_trait;

/// Untrusted raw output of a stage executor, keyed by field name.
pub type RawResult = serde_json::Map<String, serde_json::Value>;

/// Read-only view handed to an executor for one run.
#[derive(Debug, Clone)]
pub struct ExecutionInput<'a> {
    /// The stage being executed.
    pub stage: Stage,
    /// Committed pipeline state at the time the transition was admitted.
    pub state: &'a PipelineState,
    /// Cooperative cancellation signal; long-running executors should poll
    /// or await it.
    pub cancel: CancelToken,
}

impl ExecutionInput<'_> {
    /// The committed artifact of an upstream stage, if present.
    #[must_use]
    pub fn prior(&self, stage: Stage) -> Option<&HandoffArtifact> {
        self.state.artifact(stage)
    }
}

/// An external collaborator that performs one stage's work.
///
/// Implementations may run for minutes to hours; they must stop promptly
/// when the input's cancel token fires. Errors are opaque to the core and
/// surfaced with their full cause chain.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// The stage this executor serves.
    fn stage(&self) -> Stage;

    /// Runs the stage and returns its raw, unvalidated result.
    async fn run(&self, input: ExecutionInput<'_>) -> anyhow::Result<RawResult>;
}

/// Adapts a synchronous closure into a [`StageExecutor`].
pub struct FnExecutor<F>
where
    F: Fn(&ExecutionInput<'_>) -> anyhow::Result<RawResult> + Send + Sync,
{
    stage: Stage,
    func: F,
}

impl<F> FnExecutor<F>
where
    F: Fn(&ExecutionInput<'_>) -> anyhow::Result<RawResult> + Send + Sync,
{
    /// Wraps `func` as the executor for `stage`.
    pub fn new(stage: Stage, func: F) -> Self {
        Self { stage, func }
    }
}

impl<F> std::fmt::Debug for FnExecutor<F>
where
    F: Fn(&ExecutionInput<'_>) -> anyhow::Result<RawResult> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnExecutor")
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> StageExecutor for FnExecutor<F>
where
    F: Fn(&ExecutionInput<'_>) -> anyhow::Result<RawResult> + Send + Sync,
{
    fn stage(&self) -> Stage {
        self.stage
    }

    async fn run(&self, input: ExecutionInput<'_>) -> anyhow::Result<RawResult> {
        (self.func)(&input)
    }
}

/// An executor that returns a canned payload, useful for replays and tests.
#[derive(Debug, Clone)]
pub struct FixedExecutor {
    stage: Stage,
    payload: RawResult,
}

impl FixedExecutor {
    /// Creates an executor for `stage` that always returns `payload`.
    #[must_use]
    pub fn new(stage: Stage, payload: RawResult) -> Self {
        Self { stage, payload }
    }
}

#[async_trait]
impl StageExecutor for FixedExecutor {
    fn stage(&self) -> Stage {
        self.stage
    }

    async fn run(&self, _input: ExecutionInput<'_>) -> anyhow::Result<RawResult> {
        Ok(self.payload.clone())
    }
}
