//! Checklist evaluation for stage gates.
//!
//! Checklists are both a gate and a diagnostic surface: every item is
//! evaluated even after a blocking failure so callers receive a complete
//! report, and predicate errors or panics fail closed as blocking failures.

mod builtin;

pub use builtin::GateSet;

use crate::core::{HandoffArtifact, PipelineState};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// How a failed item affects the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Failure aborts the transition.
    Blocking,
    /// Failure is surfaced to the caller but never blocks.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocking => f.write_str("blocking"),
            Self::Warning => f.write_str("warning"),
        }
    }
}

/// A named condition over the pipeline state and, for exit checklists, the
/// candidate artifact. Returning `Err` marks the item failed with a detail
/// message.
pub type Predicate =
    Box<dyn Fn(&PipelineState, Option<&HandoffArtifact>) -> Result<bool, String> + Send + Sync>;

/// One named precondition or postcondition.
pub struct ChecklistItem {
    /// Stable identifier surfaced in reports and errors.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Declared severity.
    pub severity: Severity,
    predicate: Predicate,
}

impl ChecklistItem {
    /// Creates an item with an explicit severity.
    pub fn new<F>(
        id: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        predicate: F,
    ) -> Self
    where
        F: Fn(&PipelineState, Option<&HandoffArtifact>) -> Result<bool, String>
            + Send
            + Sync
            + 'static,
    {
        Self {
            id: id.into(),
            description: description.into(),
            severity,
            predicate: Box::new(predicate),
        }
    }

    /// Creates a blocking item.
    pub fn blocking<F>(id: impl Into<String>, description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&PipelineState, Option<&HandoffArtifact>) -> Result<bool, String>
            + Send
            + Sync
            + 'static,
    {
        Self::new(id, description, Severity::Blocking, predicate)
    }

    /// Creates a warning item.
    pub fn warning<F>(id: impl Into<String>, description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&PipelineState, Option<&HandoffArtifact>) -> Result<bool, String>
            + Send
            + Sync
            + 'static,
    {
        Self::new(id, description, Severity::Warning, predicate)
    }
}

impl fmt::Debug for ChecklistItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChecklistItem")
            .field("id", &self.id)
            .field("severity", &self.severity)
            .finish_non_exhaustive()
    }
}

/// An ordered, named set of checklist items.
#[derive(Debug, Default)]
pub struct Checklist {
    /// Checklist name, surfaced in reports.
    pub name: String,
    items: Vec<ChecklistItem>,
}

impl Checklist {
    /// Creates an empty checklist.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    /// Appends an item, preserving declaration order.
    #[must_use]
    pub fn with_item(mut self, item: ChecklistItem) -> Self {
        self.items.push(item);
        self
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true when the checklist has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Evaluates every item in declaration order against `state` and the
    /// optional candidate artifact.
    ///
    /// Predicate `Err` results and panics are recorded as blocking failures
    /// of the item regardless of its declared severity.
    #[must_use]
    pub fn evaluate(
        &self,
        state: &PipelineState,
        artifact: Option<&HandoffArtifact>,
    ) -> EvaluationReport {
        let mut items = Vec::with_capacity(self.items.len());
        let mut blocking_failures = Vec::new();

        for item in &self.items {
            let verdict = catch_unwind(AssertUnwindSafe(|| (item.predicate)(state, artifact)));

            let (passed, severity, detail) = match verdict {
                Ok(Ok(passed)) => (passed, item.severity, None),
                Ok(Err(message)) => (false, Severity::Blocking, Some(message)),
                Err(_) => (
                    false,
                    Severity::Blocking,
                    Some("predicate panicked during evaluation".to_string()),
                ),
            };

            if !passed && severity == Severity::Blocking {
                blocking_failures.push(item.id.clone());
            }

            items.push(ItemOutcome {
                id: item.id.clone(),
                description: item.description.clone(),
                passed,
                severity,
                detail,
            });
        }

        EvaluationReport {
            checklist: self.name.clone(),
            items,
            blocking_failures,
        }
    }
}

/// Outcome of a single checklist item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    /// Item identifier.
    pub id: String,
    /// Item description.
    pub description: String,
    /// Whether the predicate held.
    pub passed: bool,
    /// Effective severity (`blocking` when the predicate errored).
    pub severity: Severity,
    /// Failure detail, when the predicate errored or panicked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Complete diagnostic report for one checklist evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Name of the evaluated checklist.
    pub checklist: String,
    /// Per-item outcomes in declaration order.
    pub items: Vec<ItemOutcome>,
    /// Ids of items whose failure blocks the transition.
    pub blocking_failures: Vec<String>,
}

impl EvaluationReport {
    /// True when no blocking item failed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.blocking_failures.is_empty()
    }

    /// Failed warning-severity items, surfaced to the caller without
    /// blocking.
    #[must_use]
    pub fn warnings(&self) -> Vec<ItemOutcome> {
        self.items
            .iter()
            .filter(|item| !item.passed && item.severity == Severity::Warning)
            .cloned()
            .collect()
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            write!(f, "checklist '{}' passed", self.checklist)
        } else {
            write!(
                f,
                "checklist '{}' blocked by: {}",
                self.checklist,
                self.blocking_failures.join(", ")
            )
        }
    }
}
