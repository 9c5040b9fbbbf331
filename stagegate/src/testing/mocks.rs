//! Scripted stage executors.

use crate::core::Stage;
use crate::executor::{ExecutionInput, RawResult, StageExecutor};
use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;

/// What a [`MockExecutor`] does when invoked.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return the payload.
    Succeed(RawResult),
    /// Fail with the message.
    Fail(String),
    /// Never return; relies on the caller's cancel token or timeout.
    Hang,
}

/// A stage executor with scripted behavior and call tracking.
pub struct MockExecutor {
    stage: Stage,
    behavior: Mutex<MockBehavior>,
    calls: Mutex<usize>,
}

impl MockExecutor {
    /// Creates a mock with the given behavior.
    #[must_use]
    pub fn new(stage: Stage, behavior: MockBehavior) -> Self {
        Self {
            stage,
            behavior: Mutex::new(behavior),
            calls: Mutex::new(0),
        }
    }

    /// A mock that returns `payload`.
    #[must_use]
    pub fn succeeding(stage: Stage, payload: RawResult) -> Self {
        Self::new(stage, MockBehavior::Succeed(payload))
    }

    /// A mock that fails with `message`.
    #[must_use]
    pub fn failing(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, MockBehavior::Fail(message.into()))
    }

    /// A mock that never returns.
    #[must_use]
    pub fn hanging(stage: Stage) -> Self {
        Self::new(stage, MockBehavior::Hang)
    }

    /// Rescripts the behavior for subsequent calls.
    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock() = behavior;
    }

    /// Number of times `run` was invoked.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

impl std::fmt::Debug for MockExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockExecutor")
            .field("stage", &self.stage)
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StageExecutor for MockExecutor {
    fn stage(&self) -> Stage {
        self.stage
    }

    async fn run(&self, _input: ExecutionInput<'_>) -> anyhow::Result<RawResult> {
        *self.calls.lock() += 1;
        let behavior = self.behavior.lock().clone();
        match behavior {
            MockBehavior::Succeed(payload) => Ok(payload),
            MockBehavior::Fail(message) => Err(anyhow!(message)),
            MockBehavior::Hang => {
                futures::future::pending::<()>().await;
                unreachable!("pending future resolved")
            }
        }
    }
}
