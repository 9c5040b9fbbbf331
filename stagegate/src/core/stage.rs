//! The canonical stage set and its ordering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One phase of the project pipeline.
///
/// Declaration order is the canonical pipeline order; a project advances
/// through these stages strictly one at a time, starting at [`Stage::Init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Project initialized, nothing executed yet.
    Init,
    /// Raw images discovered on disk.
    Scan,
    /// Image quality and integrity checks.
    Validate,
    /// Label acquisition (managed service or classic tooling).
    Annotate,
    /// Train/val/test split construction.
    Split,
    /// Training configuration resolved (architecture, hyperparameters).
    TrainConfig,
    /// Training run executed.
    TrainExec,
    /// Model evaluated against the held-out split.
    Evaluate,
    /// Model shipped to a cloud or edge target.
    Deploy,
}

/// All stages in canonical order.
pub const STAGE_ORDER: [Stage; 9] = [
    Stage::Init,
    Stage::Scan,
    Stage::Validate,
    Stage::Annotate,
    Stage::Split,
    Stage::TrainConfig,
    Stage::TrainExec,
    Stage::Evaluate,
    Stage::Deploy,
];

impl Stage {
    /// Returns the zero-based position in the canonical order.
    #[must_use]
    pub fn index(self) -> usize {
        STAGE_ORDER
            .iter()
            .position(|s| *s == self)
            .unwrap_or_default()
    }

    /// Returns the immediate successor stage, or `None` for the last stage.
    #[must_use]
    pub fn successor(self) -> Option<Self> {
        STAGE_ORDER.get(self.index() + 1).copied()
    }

    /// Returns the immediate predecessor stage, or `None` for `Init`.
    #[must_use]
    pub fn predecessor(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| STAGE_ORDER[i])
    }

    /// Returns true for the last stage in the canonical order.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.successor().is_none()
    }

    /// Stable string identifier, matching the serde representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Scan => "scan",
            Self::Validate => "validate",
            Self::Annotate => "annotate",
            Self::Split => "split",
            Self::TrainConfig => "train_config",
            Self::TrainExec => "train_exec",
            Self::Evaluate => "evaluate",
            Self::Deploy => "deploy",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown stage identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stage identifier: '{0}'")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        STAGE_ORDER
            .iter()
            .find(|stage| stage.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// The controller-visible phase of a project.
///
/// `Failed` is never persisted: failed transitions leave the stored state
/// untouched, so the failure record lives only in the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    /// No state document exists yet.
    NotStarted,
    /// The project sits at a committed stage.
    At(Stage),
    /// The most recent transition attempt toward `stage` aborted.
    Failed(Stage),
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => f.write_str("not_started"),
            Self::At(stage) => write!(f, "at:{stage}"),
            Self::Failed(stage) => write!(f, "failed:{stage}"),
        }
    }
}
