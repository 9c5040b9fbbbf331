//! The stage transition state machine.
//!
//! `advance` is the single mutation path for a project: it gates entry,
//! invokes the external executor, validates and gates the candidate
//! artifact, and commits atomically. Failure at any step leaves persisted
//! state untouched, so no partial transition is ever observable.


use crate::cancellation::CancelToken;
use crate::checklist::{GateSet, ItemOutcome};
use crate::core::{HandoffArtifact, PipelinePhase, PipelineState, ProjectMetadata, Stage};
use crate::errors::PipelineError;
use crate::events::{EventSink, NoOpEventSink, PipelineEvent};
use crate::executor::{ExecutionInput, StageExecutor};
use crate::schema::SchemaRegistry;
use crate::store::StateStore;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Caller-supplied knobs for one `advance` attempt.
#[derive(Debug, Clone, Default)]
pub struct TransitionOptions {
    /// Upper bound on executor runtime; expiry is treated as executor
    /// failure.
    pub timeout: Option<Duration>,
    /// Cancellation signal; firing it guarantees no commit occurs.
    pub cancel: Option<CancelToken>,
}

impl TransitionOptions {
    /// Creates default options: no timeout, fresh implicit cancel token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds the executor runtime.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Outcome of a committed transition.
#[derive(Debug, Clone)]
pub struct TransitionResult {
    /// The stage that completed.
    pub stage: Stage,
    /// The committed handoff artifact.
    pub artifact: HandoffArtifact,
    /// Failed warning-severity checklist items from both gates.
    pub warnings: Vec<ItemOutcome>,
}

/// Owns a project's transition protocol: gating, execution, validation,
/// and the atomic commit.
pub struct TransitionController {
    store: Arc<dyn StateStore>,
    schemas: Arc<SchemaRegistry>,
    gates: Arc<GateSet>,
    events: Arc<dyn EventSink>,
    /// Critical section: one transition or rollback at a time per project.
    mutation: Mutex<()>,
    /// Target of the most recent aborted transition, for `phase()`.
    last_failed: RwLock<Option<Stage>>,
}

impl std::fmt::Debug for TransitionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionController")
            .field("store", &self.store)
            .field("last_failed", &*self.last_failed.read())
            .finish_non_exhaustive()
    }
}

impl TransitionController {
    /// Creates a controller over `store` with the standard schemas and
    /// gates and no event sink.
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            schemas: Arc::new(SchemaRegistry::standard()),
            gates: Arc::new(GateSet::standard()),
            events: Arc::new(NoOpEventSink),
            mutation: Mutex::new(()),
            last_failed: RwLock::new(None),
        }
    }

    /// Replaces the schema registry.
    #[must_use]
    pub fn with_schemas(mut self, schemas: Arc<SchemaRegistry>) -> Self {
        self.schemas = schemas;
        self
    }

    /// Replaces the gate set.
    #[must_use]
    pub fn with_gates(mut self, gates: Arc<GateSet>) -> Self {
        self.gates = gates;
        self
    }

    /// Attaches an event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Initializes the project.
    ///
    /// # Errors
    ///
    /// [`PipelineError::AlreadyInitialized`] when state already exists.
    pub fn init(&self, project: ProjectMetadata) -> Result<PipelineState, PipelineError> {
        self.store.init(project)
    }

    /// Returns a read-only snapshot of the committed state. Never blocks on
    /// an in-flight transition.
    ///
    /// # Errors
    ///
    /// Store-level errors (`NotFound`, `CorruptState`).
    pub fn status(&self) -> Result<PipelineState, PipelineError> {
        self.store.load()
    }

    /// The controller-visible phase, including the virtual `NotStarted` and
    /// `Failed` states.
    #[must_use]
    pub fn phase(&self) -> PipelinePhase {
        if let Some(stage) = *self.last_failed.read() {
            return PipelinePhase::Failed(stage);
        }
        match self.store.load() {
            Ok(state) => PipelinePhase::At(state.current_stage),
            Err(_) => PipelinePhase::NotStarted,
        }
    }

    /// Advances the project to `target` by running `executor` behind the
    /// stage's gates. See the module docs for the step-by-step protocol.
    ///
    /// # Errors
    ///
    /// The full taxonomy: `IllegalTransition`, `PreconditionFailed`,
    /// `StageExecutionFailed`, `InvalidArtifact`, `PostconditionFailed`,
    /// `Cancelled`, `TransitionInProgress`, and store-level errors. Every
    /// failure leaves persisted state untouched.
    pub async fn advance(
        &self,
        target: Stage,
        executor: &dyn StageExecutor,
        options: TransitionOptions,
    ) -> Result<TransitionResult, PipelineError> {
        let Ok(_guard) = self.mutation.try_lock() else {
            return Err(PipelineError::TransitionInProgress);
        };

        let result = self.advance_locked(target, executor, options).await;
        match &result {
            Ok(committed) => {
                *self.last_failed.write() = None;
                self.events
                    .emit(&PipelineEvent::TransitionCommitted {
                        stage: target,
                        warnings: committed.warnings.len(),
                    })
                    .await;
            }
            Err(error) => {
                *self.last_failed.write() = Some(target);
                warn!(stage = %target, error = %error, "transition aborted");
                self.events
                    .emit(&PipelineEvent::TransitionAborted {
                        stage: target,
                        reason: error.to_string(),
                    })
                    .await;
            }
        }
        result
    }

    async fn advance_locked(
        &self,
        target: Stage,
        executor: &dyn StageExecutor,
        options: TransitionOptions,
    ) -> Result<TransitionResult, PipelineError> {
        // Step 1: load the committed state.
        let state = self.store.load()?;

        // Step 2: only the immediate successor is legal; completed stages
        // are re-entered through rollback, never directly.
        if state.current_stage.successor() != Some(target) {
            return Err(PipelineError::IllegalTransition {
                from: state.current_stage,
                to: target,
            });
        }

        if executor.stage() != target {
            return Err(PipelineError::StageExecutionFailed {
                stage: target,
                message: format!(
                    "executor serves stage '{}', not '{target}'",
                    executor.stage()
                ),
            });
        }

        let mut warnings = Vec::new();

        // Step 3: entry checklist against the committed state.
        if let Some(checklist) = self.gates.entry(target) {
            let report = checklist.evaluate(&state, None);
            warnings.extend(report.warnings());
            if !report.passed() {
                return Err(PipelineError::PreconditionFailed {
                    stage: target,
                    report,
                });
            }
        }

        self.events
            .emit(&PipelineEvent::TransitionStarted { stage: target })
            .await;
        info!(stage = %target, "entry checklist passed, invoking executor");

        // Step 4: run the executor, raced against cancellation and the
        // optional deadline. The raw result is untrusted.
        let timeout = options.timeout;
        let cancel = options.cancel.unwrap_or_default();
        let raw = {
            let input = ExecutionInput {
                stage: target,
                state: &state,
                cancel: cancel.clone(),
            };
            let run = executor.run(input);
            tokio::pin!(run);

            let deadline = async {
                match timeout {
                    Some(t) => tokio::time::sleep(t).await,
                    None => futures::future::pending::<()>().await,
                }
            };

            tokio::select! {
                result = &mut run => result,
                () = cancel.cancelled() => {
                    return Err(PipelineError::Cancelled {
                        stage: target,
                        reason: cancel
                            .reason()
                            .unwrap_or_else(|| "cancellation requested".to_string()),
                    });
                }
                () = deadline => {
                    return Err(PipelineError::StageExecutionFailed {
                        stage: target,
                        message: format!(
                            "executor exceeded timeout of {:.1}s",
                            timeout.unwrap_or_default().as_secs_f64()
                        ),
                    });
                }
            }
        };
        let raw = raw.map_err(|e| PipelineError::StageExecutionFailed {
            stage: target,
            message: format!("{e:#}"),
        })?;

        // Step 5: structural validation builds the candidate artifact.
        let artifact = self
            .schemas
            .build_artifact(target, raw)
            .map_err(|report| PipelineError::InvalidArtifact {
                stage: target,
                report,
            })?;

        // Step 6: exit checklist against the candidate.
        if let Some(checklist) = self.gates.exit(target) {
            let report = checklist.evaluate(&state, Some(&artifact));
            warnings.extend(report.warnings());
            if !report.passed() {
                return Err(PipelineError::PostconditionFailed {
                    stage: target,
                    report,
                });
            }
        }

        // Step 7: the single commit point.
        let mut next = state;
        next.record_completion(target, artifact.clone());
        self.store.commit(&next)?;
        debug!(stage = %target, "transition committed");

        // Step 8.
        Ok(TransitionResult {
            stage: target,
            artifact,
            warnings,
        })
    }

    /// Explicit, audited regression: removes every stage after `to` from the
    /// completed history along with its artifact, and resets the current
    /// stage.
    ///
    /// # Errors
    ///
    /// [`PipelineError::RollbackTarget`] when `to` is neither `init` nor a
    /// completed stage; [`PipelineError::TransitionInProgress`] when a
    /// transition holds the critical section; store-level errors.
    pub async fn rollback(&self, to: Stage) -> Result<PipelineState, PipelineError> {
        let Ok(_guard) = self.mutation.try_lock() else {
            return Err(PipelineError::TransitionInProgress);
        };

        let state = self.store.load()?;
        if to != Stage::Init && !state.is_completed(to) {
            return Err(PipelineError::RollbackTarget { stage: to });
        }

        let next = state.rolled_back_to(to);
        let removed: Vec<Stage> = state
            .stages_completed
            .iter()
            .filter(|s| !next.stages_completed.contains(s))
            .copied()
            .collect();

        self.store.commit_rollback(&next)?;
        warn!(to = %to, removed = ?removed, "pipeline rolled back");
        self.events
            .emit(&PipelineEvent::RollbackApplied {
                to,
                removed,
            })
            .await;
        *self.last_failed.write() = None;

        Ok(next)
    }
}
