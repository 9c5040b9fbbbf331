//! The pipeline state document: a project's single source of truth.

use super::{HandoffArtifact, Stage, STAGE_ORDER};
use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Schema version of the persisted state document.
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// Immutable project identity recorded at initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Human-readable project name.
    pub name: String,
    /// Stable project identifier.
    pub id: Uuid,
    /// When the project was initialized.
    pub created_at: Timestamp,
}

impl ProjectMetadata {
    /// Creates metadata for a new project.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: Uuid::new_v4(),
            created_at: now_utc(),
        }
    }
}

/// Durable record of a project's progress through the pipeline.
///
/// Mutated exclusively by the transition controller through atomic store
/// commits; everything else holds read-only snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// State document schema version, for forward-compatible loading.
    pub version: u32,

    /// Project identity.
    pub project: ProjectMetadata,

    /// The stage the project currently sits at.
    pub current_stage: Stage,

    /// Completed stages in completion order. Invariant: always a prefix of
    /// the canonical post-`init` order.
    pub stages_completed: Vec<Stage>,

    /// Committed handoff artifact per completed stage.
    pub artifacts: BTreeMap<Stage, HandoffArtifact>,

    /// Timestamp of the last successful commit.
    pub updated_at: Timestamp,
}

impl PipelineState {
    /// Creates the initial state for a freshly initialized project.
    #[must_use]
    pub fn new(project: ProjectMetadata) -> Self {
        Self {
            version: STATE_SCHEMA_VERSION,
            project,
            current_stage: Stage::Init,
            stages_completed: Vec::new(),
            artifacts: BTreeMap::new(),
            updated_at: now_utc(),
        }
    }

    /// Returns true if `stage` has been completed and committed.
    #[must_use]
    pub fn is_completed(&self, stage: Stage) -> bool {
        self.stages_completed.contains(&stage)
    }

    /// Returns the committed artifact for `stage`, if any.
    #[must_use]
    pub fn artifact(&self, stage: Stage) -> Option<&HandoffArtifact> {
        self.artifacts.get(&stage)
    }

    /// Records a completed stage on a working copy: appends to the history,
    /// stores the artifact, and advances the current stage.
    ///
    /// Callers are expected to commit the result atomically; this method
    /// never touches persistent storage.
    pub fn record_completion(&mut self, stage: Stage, artifact: HandoffArtifact) {
        self.stages_completed.push(stage);
        self.artifacts.insert(stage, artifact);
        self.current_stage = stage;
        self.updated_at = now_utc();
    }

    /// Produces the state this project would have after rolling back to
    /// `to`: stages after it are removed from the history along with their
    /// artifacts, and the current stage is reset.
    #[must_use]
    pub fn rolled_back_to(&self, to: Stage) -> Self {
        let mut next = self.clone();
        next.stages_completed.retain(|s| *s <= to);
        next.artifacts.retain(|s, _| *s <= to);
        next.current_stage = to;
        next.updated_at = now_utc();
        next
    }

    /// Returns true if this state is a monotonic extension of `previous`:
    /// the completed-stage history is preserved as a prefix and no committed
    /// artifact has been altered or dropped.
    #[must_use]
    pub fn extends(&self, previous: &Self) -> bool {
        if !self.stages_completed.starts_with(&previous.stages_completed) {
            return false;
        }
        previous.artifacts.iter().all(|(stage, artifact)| {
            self.artifacts
                .get(stage)
                .is_some_and(|kept| kept.checksum == artifact.checksum)
        })
    }

    /// Structural self-check: history is a prefix of the canonical order,
    /// the current stage matches the last completed one, and every completed
    /// stage carries an artifact produced by it.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let prefix_ok = self
            .stages_completed
            .iter()
            .enumerate()
            .all(|(i, stage)| STAGE_ORDER.get(i + 1) == Some(stage));

        let current_ok =
            self.current_stage == self.stages_completed.last().copied().unwrap_or(Stage::Init);

        let artifacts_ok = self.stages_completed.iter().all(|stage| {
            self.artifacts
                .get(stage)
                .is_some_and(|a| a.source_stage == *stage)
        }) && self.artifacts.len() == self.stages_completed.len();

        prefix_ok && current_ok && artifacts_ok
    }

    /// Returns the last completed stage whose artifact is present, i.e. the
    /// safe resumption point after an interruption.
    #[must_use]
    pub fn last_backed_stage(&self) -> Stage {
        self.stages_completed
            .iter()
            .rev()
            .find(|stage| self.artifacts.contains_key(stage))
            .copied()
            .unwrap_or(Stage::Init)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact_for(stage: Stage) -> HandoffArtifact {
        let mut payload = serde_json::Map::new();
        payload.insert("marker".to_string(), json!(stage.as_str()));
        HandoffArtifact::new(stage, payload)
    }

    fn state_through(last: Stage) -> PipelineState {
        let mut state = PipelineState::new(ProjectMetadata::new("frogspot"));
        for stage in STAGE_ORDER.iter().skip(1).copied() {
            state.record_completion(stage, artifact_for(stage));
            if stage == last {
                break;
            }
        }
        state
    }

    #[test]
    fn test_new_state_is_at_init() {
        let state = PipelineState::new(ProjectMetadata::new("frogspot"));
        assert_eq!(state.current_stage, Stage::Init);
        assert!(state.stages_completed.is_empty());
        assert!(state.artifacts.is_empty());
        assert_eq!(state.version, STATE_SCHEMA_VERSION);
        assert!(state.is_well_formed());
    }

    #[test]
    fn test_record_completion_advances() {
        let mut state = PipelineState::new(ProjectMetadata::new("frogspot"));
        state.record_completion(Stage::Scan, artifact_for(Stage::Scan));

        assert_eq!(state.current_stage, Stage::Scan);
        assert_eq!(state.stages_completed, vec![Stage::Scan]);
        assert!(state.artifact(Stage::Scan).is_some());
        assert!(state.is_well_formed());
    }

    #[test]
    fn test_rolled_back_to_truncates() {
        let state = state_through(Stage::Annotate);
        let rolled = state.rolled_back_to(Stage::Scan);

        assert_eq!(rolled.stages_completed, vec![Stage::Scan]);
        assert_eq!(rolled.current_stage, Stage::Scan);
        assert!(rolled.artifact(Stage::Validate).is_none());
        assert!(rolled.artifact(Stage::Annotate).is_none());
        assert!(rolled.artifact(Stage::Scan).is_some());
        assert!(rolled.is_well_formed());
    }

    #[test]
    fn test_extends_accepts_append() {
        let previous = state_through(Stage::Scan);
        let mut next = previous.clone();
        next.record_completion(Stage::Validate, artifact_for(Stage::Validate));

        assert!(next.extends(&previous));
        assert!(!previous.extends(&next));
    }

    #[test]
    fn test_extends_rejects_altered_artifact() {
        let previous = state_through(Stage::Scan);
        let mut next = previous.clone();
        next.artifacts
            .insert(Stage::Scan, artifact_for(Stage::Scan));
        // Same stage, different payload marker would keep the checksum equal
        // here, so tamper with it directly.
        if let Some(a) = next.artifacts.get_mut(&Stage::Scan) {
            a.checksum = "0000".to_string();
        }
        assert!(!next.extends(&previous));
    }

    #[test]
    fn test_well_formed_rejects_gap() {
        let mut state = PipelineState::new(ProjectMetadata::new("frogspot"));
        // Validate without scan violates the prefix invariant.
        state.record_completion(Stage::Validate, artifact_for(Stage::Validate));
        assert!(!state.is_well_formed());
    }

    #[test]
    fn test_last_backed_stage_with_dangling_current() {
        let mut state = state_through(Stage::Validate);
        // Simulate an older writer that advanced current_stage without
        // committing the artifact.
        state.current_stage = Stage::Annotate;
        assert_eq!(state.last_backed_stage(), Stage::Validate);
    }

    #[test]
    fn test_serde_round_trip() {
        let state = state_through(Stage::Split);
        let json = serde_json::to_string_pretty(&state).unwrap();
        let back: PipelineState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }
}
