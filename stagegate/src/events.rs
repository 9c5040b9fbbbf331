//! Typed lifecycle events emitted by the transition controller.

use crate::core::Stage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One observable step in a project's pipeline lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A transition was admitted past its entry checklist.
    TransitionStarted {
        /// Target stage.
        stage: Stage,
    },
    /// A transition committed; the stage is complete.
    TransitionCommitted {
        /// Completed stage.
        stage: Stage,
        /// Number of warning-severity items surfaced.
        warnings: usize,
    },
    /// A transition aborted at a gate, executor failure, or cancellation.
    TransitionAborted {
        /// Target stage of the aborted transition.
        stage: Stage,
        /// Rendered abort cause.
        reason: String,
    },
    /// An explicit rollback was committed.
    RollbackApplied {
        /// Stage rolled back to.
        to: Stage,
        /// Stages removed from the completed history.
        removed: Vec<Stage>,
    },
}

/// Receiver for pipeline lifecycle events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers an event. Implementations must not fail the pipeline;
    /// delivery errors are their own to swallow.
    async fn emit(&self, event: &PipelineEvent);
}

/// Discards all events; the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: &PipelineEvent) {}
}

/// Logs events through the `tracing` framework.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventSink;

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::TransitionStarted { stage } => {
                info!(stage = %stage, "transition started");
            }
            PipelineEvent::TransitionCommitted { stage, warnings } => {
                info!(stage = %stage, warnings, "transition committed");
            }
            PipelineEvent::TransitionAborted { stage, reason } => {
                info!(stage = %stage, reason = %reason, "transition aborted");
            }
            PipelineEvent::RollbackApplied { to, removed } => {
                info!(
                    to = %to,
                    removed = removed.len(),
                    "rollback applied"
                );
            }
        }
    }
}

/// Collects events in memory for assertions in tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<PipelineEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.read().clone()
    }

    /// Number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true when nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: &PipelineEvent) {
        self.events.write().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collecting_sink_records_in_order() {
        let sink = CollectingEventSink::new();
        sink.emit(&PipelineEvent::TransitionStarted { stage: Stage::Scan })
            .await;
        sink.emit(&PipelineEvent::TransitionCommitted {
            stage: Stage::Scan,
            warnings: 0,
        })
        .await;

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            PipelineEvent::TransitionStarted { stage: Stage::Scan }
        );
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = PipelineEvent::TransitionAborted {
            stage: Stage::TrainExec,
            reason: "executor failed".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "transition_aborted");
        assert_eq!(json["stage"], "train_exec");
    }
}
